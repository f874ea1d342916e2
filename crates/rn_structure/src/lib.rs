mod error;
mod flags;
mod catalog;
mod cplx;
mod canonical;
mod builder;
mod rxn_rule;

pub use error::*;
pub use flags::*;
pub use catalog::*;
pub use cplx::*;
pub use canonical::*;
pub use builder::*;
pub use rxn_rule::*;

/// All catalog entries are addressed by their position in the respective
/// table. Ids are never reused: tables only grow during parsing and are
/// frozen afterwards.
pub type StateId = usize;
pub type ComponentTypeId = usize;
pub type ElemMolTypeId = usize;
pub type CompartmentId = usize;
pub type RxnRuleId = usize;

