use std::collections::BTreeMap;
use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};
use log::{debug, warn};

use crate::Flags;
use crate::Cplx;
use crate::RxnRule;
use crate::StateId;
use crate::ComponentTypeId;
use crate::ElemMolTypeId;
use crate::CompartmentId;
use crate::RxnRuleId;
use crate::CompartmentRef;
use crate::CatalogError;

/// Effective thickness (in um) of a surface compartment when it is
/// counted as a volume.
pub const SURFACE_COMPARTMENT_THICKNESS: f64 = 0.01;
pub const DEFAULT_COMPARTMENT_NAME: &str = "default_compartment";

pub const ALL_MOLECULES: &str = "ALL_MOLECULES";
pub const ALL_VOLUME_MOLECULES: &str = "ALL_VOLUME_MOLECULES";
pub const ALL_SURFACE_MOLECULES: &str = "ALL_SURFACE_MOLECULES";

/// Molecule types that match a whole category of molecules in patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MolWildcard {
    AllMolecules,
    AllVolumeMolecules,
    AllSurfaceMolecules,
}

impl MolWildcard {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            ALL_MOLECULES => Some(MolWildcard::AllMolecules),
            ALL_VOLUME_MOLECULES => Some(MolWildcard::AllVolumeMolecules),
            ALL_SURFACE_MOLECULES => Some(MolWildcard::AllSurfaceMolecules),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MolWildcard::AllMolecules => ALL_MOLECULES,
            MolWildcard::AllVolumeMolecules => ALL_VOLUME_MOLECULES,
            MolWildcard::AllSurfaceMolecules => ALL_SURFACE_MOLECULES,
        }
    }

    /// Reactive surfaces are never matched by a wildcard.
    pub fn accepts(&self, flags: Flags) -> bool {
        match self {
            MolWildcard::AllMolecules => !flags.is_reactive_surface(),
            MolWildcard::AllVolumeMolecules => flags.is_vol(),
            MolWildcard::AllSurfaceMolecules => flags.is_surf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentType {
    pub name: String,
    pub elem_mol_type_name: String,
    pub allowed_state_ids: BTreeSet<StateId>,
}

impl ComponentType {
    pub fn new(name: &str, elem_mol_type_name: &str) -> Self {
        ComponentType {
            name: name.to_string(),
            elem_mol_type_name: elem_mol_type_name.to_string(),
            allowed_state_ids: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElemMolType {
    pub name: String,
    /// The same component type may appear several times.
    pub component_type_ids: Vec<ComponentTypeId>,
    #[serde(default)]
    pub diffusion_constant: f64,
    #[serde(default)]
    pub custom_time_step: f64,
    #[serde(default)]
    pub custom_space_step: f64,
    #[serde(default)]
    pub flags: Flags,
    /// Set by the engine from the diffusion constant and unit config.
    #[serde(skip)]
    pub time_step: f64,
    #[serde(skip)]
    pub space_step: f64,
}

impl PartialEq for ElemMolType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.component_type_ids == other.component_type_ids
    }
}

impl ElemMolType {
    pub fn new(name: &str, component_type_ids: Vec<ComponentTypeId>) -> Self {
        ElemMolType {
            name: name.to_string(),
            component_type_ids,
            diffusion_constant: 0.0,
            custom_time_step: 0.0,
            custom_space_step: 0.0,
            flags: Flags::EMPTY,
            time_step: 0.0,
            space_step: 0.0,
        }
    }

    pub fn has_custom_time_or_space_step(&self) -> bool {
        self.custom_time_step > 0.0 || self.custom_space_step > 0.0
    }

    pub fn is_surf(&self) -> bool {
        self.flags.is_surf()
    }

    pub fn is_vol(&self) -> bool {
        self.flags.is_vol()
    }

    pub fn is_reactive_surface(&self) -> bool {
        self.flags.is_reactive_surface()
    }

    pub fn cant_initiate(&self) -> bool {
        self.flags.cant_initiate()
    }

    pub fn wildcard(&self) -> Option<MolWildcard> {
        MolWildcard::from_name(&self.name)
    }

    /// Position of the first declaration of a component type.
    pub fn component_position(&self, ct: ComponentTypeId) -> usize {
        self.component_type_ids.iter()
            .position(|&c| c == ct)
            .unwrap_or(self.component_type_ids.len())
    }

    pub fn get_component_uses_count(&self, ct: ComponentTypeId) -> usize {
        self.component_type_ids.iter().filter(|&&c| c == ct).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: CompartmentId,
    pub name: String,
    pub is_3d: bool,
    volume_or_area: Option<f64>,
    pub parent_compartment_id: Option<CompartmentId>,
    #[serde(default)]
    pub children_compartments: BTreeSet<CompartmentId>,
}

impl Compartment {
    pub fn new_volume(name: &str, volume: Option<f64>) -> Self {
        Compartment {
            id: 0,
            name: name.to_string(),
            is_3d: true,
            volume_or_area: volume,
            parent_compartment_id: None,
            children_compartments: BTreeSet::new(),
        }
    }

    pub fn new_surface(name: &str, area: Option<f64>) -> Self {
        Compartment { is_3d: false, ..Self::new_volume(name, area) }
    }

    pub fn with_parent(mut self, parent: CompartmentId) -> Self {
        self.parent_compartment_id = Some(parent);
        self
    }

    pub fn is_volume_or_area_set(&self) -> bool {
        self.volume_or_area.is_some()
    }

    pub fn get_volume(&self) -> Option<f64> {
        assert!(self.is_3d, "compartment {} is a surface", self.name);
        self.volume_or_area
    }

    pub fn get_area(&self) -> Option<f64> {
        assert!(!self.is_3d, "compartment {} is a volume", self.name);
        self.volume_or_area
    }

    pub fn set_volume(&mut self, volume: f64) {
        assert!(self.is_3d, "compartment {} is a surface", self.name);
        self.volume_or_area = Some(volume);
    }

    pub fn set_area(&mut self, area: f64) {
        assert!(!self.is_3d, "compartment {} is a volume", self.name);
        self.volume_or_area = Some(area);
    }

    pub fn has_parent(&self) -> bool {
        self.parent_compartment_id.is_some()
    }

    pub fn has_children(&self) -> bool {
        !self.children_compartments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSpecies {
    pub cplx: Cplx,
    pub count: f64,
}

/// Catalog of everything a model declares: state names, component types,
/// molecule types, compartments, rule templates, parameters and seed
/// species. Populated while parsing, read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    state_names: Vec<String>,
    #[serde(default)]
    component_types: Vec<ComponentType>,
    #[serde(default)]
    elem_mol_types: Vec<ElemMolType>,
    #[serde(default)]
    compartments: Vec<Compartment>,
    #[serde(default)]
    rxn_rules: Vec<RxnRule>,
    #[serde(default)]
    parameters: BTreeMap<String, f64>,
    #[serde(default)]
    seed_species: Vec<SeedSpecies>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_add_state_name(&mut self, name: &str) -> StateId {
        match self.find_state_id(name) {
            Some(id) => id,
            None => {
                self.state_names.push(name.to_string());
                self.state_names.len() - 1
            }
        }
    }

    pub fn find_state_id(&self, name: &str) -> Option<StateId> {
        self.state_names.iter().position(|s| s == name)
    }

    pub fn get_state_name(&self, id: StateId) -> &str {
        &self.state_names[id]
    }

    /// Component types are keyed by (name, molecule type name). An
    /// existing entry with a different set of allowed states is a conflict
    /// unless `merge` is set, in which case the states are united.
    pub fn find_or_add_component_type(&mut self, ct: ComponentType, merge: bool) -> Option<ComponentTypeId> {
        let existing = self.component_types.iter()
            .position(|c| c.name == ct.name && c.elem_mol_type_name == ct.elem_mol_type_name);
        match existing {
            Some(id) => {
                let known = &mut self.component_types[id];
                if known.allowed_state_ids == ct.allowed_state_ids {
                    Some(id)
                } else if merge {
                    known.allowed_state_ids.extend(ct.allowed_state_ids);
                    Some(id)
                } else {
                    warn!("Component type {} of {} redefined with different states.",
                        ct.name, ct.elem_mol_type_name);
                    None
                }
            }
            None => {
                self.component_types.push(ct);
                Some(self.component_types.len() - 1)
            }
        }
    }

    pub fn find_component_type_id(&self, mt: &ElemMolType, name: &str) -> Option<ComponentTypeId> {
        mt.component_type_ids.iter()
            .copied()
            .find(|&ct| self.component_types[ct].name == name)
    }

    pub fn get_component_type(&self, id: ComponentTypeId) -> &ComponentType {
        &self.component_types[id]
    }

    pub fn get_component_types(&self) -> &[ComponentType] {
        &self.component_types
    }

    /// Returns None if a type with this name but a different component
    /// list already exists.
    pub fn find_or_add_elem_mol_type(&mut self, mt: ElemMolType) -> Option<ElemMolTypeId> {
        match self.find_elem_mol_type_id(&mt.name) {
            Some(id) if self.elem_mol_types[id] == mt => Some(id),
            Some(_) => {
                warn!("Molecule type {} redefined with different components.", mt.name);
                None
            }
            None => {
                self.elem_mol_types.push(mt);
                Some(self.elem_mol_types.len() - 1)
            }
        }
    }

    pub fn find_elem_mol_type_id(&self, name: &str) -> Option<ElemMolTypeId> {
        self.elem_mol_types.iter().position(|m| m.name == name)
    }

    pub fn get_elem_mol_type(&self, id: ElemMolTypeId) -> &ElemMolType {
        &self.elem_mol_types[id]
    }

    pub fn get_elem_mol_type_mut(&mut self, id: ElemMolTypeId) -> &mut ElemMolType {
        &mut self.elem_mol_types[id]
    }

    pub fn get_elem_mol_types(&self) -> &[ElemMolType] {
        &self.elem_mol_types
    }

    pub fn get_elem_mol_types_mut(&mut self) -> &mut [ElemMolType] {
        &mut self.elem_mol_types
    }

    /// Declares a molecule type from component names and their allowed
    /// state names.
    pub fn define_molecule_type(
        &mut self,
        name: &str,
        components: &[(&str, &[&str])],
        diffusion_constant: f64,
        flags: Flags,
    ) -> Option<ElemMolTypeId> {
        let mut ct_ids = Vec::with_capacity(components.len());
        for (cname, states) in components {
            let mut ct = ComponentType::new(cname, name);
            for s in states.iter() {
                ct.allowed_state_ids.insert(self.find_or_add_state_name(s));
            }
            ct_ids.push(self.find_or_add_component_type(ct, false)?);
        }
        let mut mt = ElemMolType::new(name, ct_ids);
        mt.diffusion_constant = diffusion_constant;
        mt.flags = flags;
        let id = self.find_or_add_elem_mol_type(mt)?;
        debug!("Defined molecule type {} as id {}.", name, id);
        Some(id)
    }

    /// The three category wildcards used in patterns.
    pub fn add_superclass_molecule_types(&mut self) -> [ElemMolTypeId; 3] {
        [ALL_MOLECULES, ALL_VOLUME_MOLECULES, ALL_SURFACE_MOLECULES].map(|name| {
            match self.find_elem_mol_type_id(name) {
                Some(id) => id,
                None => {
                    self.elem_mol_types.push(ElemMolType::new(name, vec![]));
                    self.elem_mol_types.len() - 1
                }
            }
        })
    }

    /// Adds a compartment and links it to its parent. The id field of the
    /// argument is overwritten. Returns None if the name is taken or the
    /// parent is unknown.
    pub fn add_compartment(&mut self, mut c: Compartment) -> Option<CompartmentId> {
        if self.find_compartment_id(&c.name).is_some() {
            warn!("Compartment {} is defined twice.", c.name);
            return None;
        }
        let id = self.compartments.len();
        c.id = id;
        if let Some(parent) = c.parent_compartment_id {
            self.compartments.get_mut(parent)?.children_compartments.insert(id);
        }
        self.compartments.push(c);
        Some(id)
    }

    /// Rebuilds the child sets from the parent ids, e.g. after
    /// deserialization. Fails on ids that differ from the table index,
    /// unknown parents and parent cycles.
    pub fn link_compartments(&mut self) -> Result<(), CatalogError> {
        let n = self.compartments.len();
        for (index, c) in self.compartments.iter().enumerate() {
            if c.id != index {
                return Err(CatalogError::CompartmentIdMismatch { name: c.name.clone(), id: c.id, index });
            }
            if let Some(parent) = c.parent_compartment_id {
                if parent >= n {
                    return Err(CatalogError::UnknownParentCompartment { compartment: c.name.clone(), parent });
                }
            }
        }
        for c in &self.compartments {
            let mut steps = 0;
            let mut current = c.parent_compartment_id;
            while let Some(p) = current {
                steps += 1;
                if p == c.id || steps > n {
                    return Err(CatalogError::CyclicCompartments(c.name.clone()));
                }
                current = self.compartments[p].parent_compartment_id;
            }
        }
        for c in self.compartments.iter_mut() {
            c.children_compartments.clear();
        }
        for id in 0..n {
            if let Some(parent) = self.compartments[id].parent_compartment_id {
                self.compartments[parent].children_compartments.insert(id);
            }
        }
        Ok(())
    }

    pub fn find_compartment_id(&self, name: &str) -> Option<CompartmentId> {
        self.compartments.iter().position(|c| c.name == name)
    }

    pub fn get_compartment(&self, id: CompartmentId) -> &Compartment {
        &self.compartments[id]
    }

    pub fn get_compartment_mut(&mut self, id: CompartmentId) -> &mut Compartment {
        &mut self.compartments[id]
    }

    pub fn get_compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    /// Every compartment appears after its parent.
    pub fn get_compartments_sorted_by_parents_first(&self) -> Vec<&Compartment> {
        let mut result: Vec<&Compartment> = Vec::with_capacity(self.compartments.len());
        let mut stack: Vec<CompartmentId> = self.compartments.iter()
            .filter(|c| !c.has_parent())
            .map(|c| c.id)
            .rev()
            .collect();
        while let Some(id) = stack.pop() {
            let c = &self.compartments[id];
            result.push(c);
            stack.extend(c.children_compartments.iter().rev());
        }
        result
    }

    /// Volume of a compartment and all nested compartments. Surfaces are
    /// counted as thin shells only if `count_surface` is set. None if any
    /// contributing volume or area is unset.
    pub fn get_volume_including_children(&self, id: CompartmentId, count_surface: bool) -> Option<f64> {
        let c = &self.compartments[id];
        let mut total = if c.is_3d {
            c.get_volume()?
        } else if count_surface {
            c.get_area()? * SURFACE_COMPARTMENT_THICKNESS
        } else {
            0.0
        };
        for &child in &c.children_compartments {
            total += self.get_volume_including_children(child, count_surface)?;
        }
        Some(total)
    }

    /// Resolves @IN/@OUT against a surface compartment. @IN is the unique
    /// child, @OUT is the parent. Any other combination is ambiguous.
    pub fn resolve_relative_compartment(&self, inside: bool, reference: CompartmentId) -> Option<CompartmentId> {
        let c = self.compartments.get(reference)?;
        if inside {
            if c.children_compartments.len() == 1 {
                c.children_compartments.iter().next().copied()
            } else {
                None
            }
        } else {
            c.parent_compartment_id
        }
    }

    pub fn find_or_add_rxn_rule(&mut self, rule: RxnRule) -> RxnRuleId {
        match self.rxn_rules.iter().position(|r| r.eq_template(&rule)) {
            Some(id) => id,
            None => {
                self.rxn_rules.push(rule);
                self.rxn_rules.len() - 1
            }
        }
    }

    pub fn get_rxn_rules(&self) -> &[RxnRule] {
        &self.rxn_rules
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) {
        self.parameters.insert(name.to_string(), value);
    }

    pub fn get_parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    pub fn get_parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }

    pub fn add_seed_species(&mut self, cplx: Cplx, count: f64) {
        self.seed_species.push(SeedSpecies { cplx, count });
    }

    pub fn get_seed_species(&self) -> &[SeedSpecies] {
        &self.seed_species
    }

    /// Every seed must be a non-empty, concrete complex over declared
    /// types, states and compartments, with a finite non-negative count.
    pub fn check_seed_species(&self) -> Result<(), CatalogError> {
        for (index, seed) in self.seed_species.iter().enumerate() {
            self.check_seed(seed).map_err(|reason| CatalogError::InvalidSeedSpecies { index, reason })?;
        }
        Ok(())
    }

    fn check_seed(&self, seed: &SeedSpecies) -> Result<(), String> {
        if !seed.count.is_finite() || seed.count < 0.0 {
            return Err(format!("invalid count {}", seed.count));
        }
        if seed.cplx.is_empty() {
            return Err("empty complex".to_string());
        }
        for mol in &seed.cplx.elem_mols {
            let Some(mt) = self.elem_mol_types.get(mol.elem_mol_type_id) else {
                return Err(format!("unknown molecule type id {}", mol.elem_mol_type_id));
            };
            for comp in &mol.components {
                if !mt.component_type_ids.contains(&comp.component_type_id) {
                    return Err(format!("molecule type {} has no component type id {}",
                        mt.name, comp.component_type_id));
                }
                if let Some(st) = comp.state_id {
                    if !self.component_types[comp.component_type_id].allowed_state_ids.contains(&st) {
                        return Err(format!("state id {} is not allowed for component type id {}",
                            st, comp.component_type_id));
                    }
                }
                if comp.bond.is_wildcard() {
                    return Err(format!("bond wildcard {} in molecule {}", comp.bond.marker(), mt.name));
                }
            }
            match mol.compartment {
                CompartmentRef::Exact(id) if id >= self.compartments.len() =>
                    return Err(format!("unknown compartment id {}", id)),
                CompartmentRef::Inside | CompartmentRef::Outside =>
                    return Err("relative compartment".to_string()),
                _ => (),
            }
        }
        if !seed.cplx.has_consistent_bonds() {
            return Err("bond endpoints do not point at each other".to_string());
        }
        Ok(())
    }

    /// Component type names and allowed states, e.g. `A(b,y~U~P)`.
    pub fn elem_mol_type_to_str(&self, id: ElemMolTypeId) -> String {
        let mt = &self.elem_mol_types[id];
        let comps: Vec<String> = mt.component_type_ids.iter().map(|&ct| {
            let ct = &self.component_types[ct];
            let mut s = ct.name.clone();
            for &st in &ct.allowed_state_ids {
                s.push('~');
                s.push_str(&self.state_names[st]);
            }
            s
        }).collect();
        format!("{}({})", mt.name, comps.join(","))
    }
}
