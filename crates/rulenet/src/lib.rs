//! # rulenet
//!
//! Rule-based reaction network generation: species discovery by graph
//! rewriting, reaction classes with pathway selection, and BNGL export.
//!
//! This crate re-exports the library crates and provides catalog readers
//! and command-line argument groups for the binaries.

pub mod catalog_parsers;
pub mod network_parsers;

pub mod structure {
    pub use ::rn_structure::*;
}

pub mod rewrite {
    pub use ::rn_rewrite::*;
}

pub mod network {
    pub use ::rn_network::*;
}
