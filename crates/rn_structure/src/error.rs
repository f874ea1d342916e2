use std::fmt;

use crate::ElemMolTypeId;
use crate::ComponentTypeId;
use crate::CompartmentId;

/// Errors raised while describing complexes against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    UnknownMoleculeType(String),
    UnknownComponent { molecule: String, component: String },
    UnknownState { component: String, state: String },
    UnknownCompartment(String),
    ComponentWithoutMolecule(String),
    StateWithoutComponent(String),
    BondWithoutComponent(u32),
    BondLabelReused(u32),
    UnclosedBond(u32),
    CompartmentIdMismatch { name: String, id: CompartmentId, index: usize },
    UnknownParentCompartment { compartment: String, parent: CompartmentId },
    CyclicCompartments(String),
    InvalidSeedSpecies { index: usize, reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::UnknownMoleculeType(name) =>
                write!(f, "Unknown molecule type '{}'", name),
            CatalogError::UnknownComponent { molecule, component } =>
                write!(f, "Molecule type '{}' has no component '{}'", molecule, component),
            CatalogError::UnknownState { component, state } =>
                write!(f, "State '{}' is not allowed for component '{}'", state, component),
            CatalogError::UnknownCompartment(name) =>
                write!(f, "Unknown compartment '{}'", name),
            CatalogError::ComponentWithoutMolecule(name) =>
                write!(f, "Component '{}' was given before any molecule", name),
            CatalogError::StateWithoutComponent(name) =>
                write!(f, "State '{}' was given before any component", name),
            CatalogError::BondWithoutComponent(label) =>
                write!(f, "Bond !{} was given before any component", label),
            CatalogError::BondLabelReused(label) =>
                write!(f, "Bond label !{} is used more than twice", label),
            CatalogError::UnclosedBond(label) =>
                write!(f, "Bond label !{} has only one endpoint", label),
            CatalogError::CompartmentIdMismatch { name, id, index } =>
                write!(f, "Compartment '{}' has id {} but is stored at index {}", name, id, index),
            CatalogError::UnknownParentCompartment { compartment, parent } =>
                write!(f, "Compartment '{}' has unknown parent id {}", compartment, parent),
            CatalogError::CyclicCompartments(name) =>
                write!(f, "Compartment '{}' is its own ancestor", name),
            CatalogError::InvalidSeedSpecies { index, reason } =>
                write!(f, "Seed species {}: {}", index, reason),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Errors raised when a rule template is checked before first use.
/// Rules failing these checks never contribute reaction pathways.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    InvalidRate { rule: String, rate: f64 },
    ReactantCount { rule: String, found: usize },
    UnknownMoleculeType { rule: String, id: ElemMolTypeId },
    UnknownComponentType { rule: String, molecule: String, id: ComponentTypeId },
    UnknownCompartment { rule: String, id: CompartmentId },
    MalformedBond { rule: String },
    InvalidMapping { rule: String, reason: String },
    DroppedComponent { rule: String, molecule: String },
    DanglingBond { rule: String, molecule: String, component: String },
    IncompleteCreatedMolecule { rule: String, molecule: String },
    UnresolvableCompartment { rule: String },
    AmbiguousOrientation { rule: String },
    InvalidBoundaryRule { rule: String, reason: String },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidRate { rule, rate } =>
                write!(f, "Rule '{}': rate constant {} must be finite and non-negative", rule, rate),
            RuleError::ReactantCount { rule, found } =>
                write!(f, "Rule '{}': expected one or two reactants, found {}", rule, found),
            RuleError::UnknownMoleculeType { rule, id } =>
                write!(f, "Rule '{}': unknown molecule type id {}", rule, id),
            RuleError::UnknownComponentType { rule, molecule, id } =>
                write!(f, "Rule '{}': molecule '{}' has no component type id {}", rule, molecule, id),
            RuleError::UnknownCompartment { rule, id } =>
                write!(f, "Rule '{}': unknown compartment id {}", rule, id),
            RuleError::MalformedBond { rule } =>
                write!(f, "Rule '{}': bond endpoints do not point at each other", rule),
            RuleError::InvalidMapping { rule, reason } =>
                write!(f, "Rule '{}': invalid molecule mapping ({})", rule, reason),
            RuleError::DroppedComponent { rule, molecule } =>
                write!(f, "Rule '{}': molecule '{}' gains or loses components", rule, molecule),
            RuleError::DanglingBond { rule, molecule, component } =>
                write!(f, "Rule '{}': product bond on {}({}) has no resolvable partner",
                    rule, molecule, component),
            RuleError::IncompleteCreatedMolecule { rule, molecule } =>
                write!(f, "Rule '{}': created molecule '{}' must list all components", rule, molecule),
            RuleError::UnresolvableCompartment { rule } =>
                write!(f, "Rule '{}': @IN/@OUT requires a surface reactant", rule),
            RuleError::AmbiguousOrientation { rule } =>
                write!(f, "Rule '{}': orientation requires a surface reactant", rule),
            RuleError::InvalidBoundaryRule { rule, reason } =>
                write!(f, "Rule '{}': invalid boundary rule ({})", rule, reason),
        }
    }
}

impl std::error::Error for RuleError {}

