pub mod export;
pub mod explore;

mod error;
mod config;
mod species;
mod species_container;
mod rxn_class;
mod rxn_container;
mod engine;

pub use error::*;
pub use config::*;
pub use species::*;
pub use species_container::*;
pub use rxn_class::*;
pub use rxn_container::*;
pub use engine::*;

/// Species ids are dense and never reassigned, even after defragmentation.
pub type SpeciesId = usize;
pub type RxnClassId = usize;
/// Species with the same set of (rule, reactant pattern) memberships
/// share a reactant class.
pub type ReactantClassId = usize;
