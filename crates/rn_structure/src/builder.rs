use std::collections::BTreeMap;

use crate::Bond;
use crate::Cplx;
use crate::Site;
use crate::ElemMol;
use crate::Catalog;
use crate::Component;
use crate::Orientation;
use crate::CatalogError;
use crate::CompartmentRef;

/// Assembles a complex from names, resolving everything against the
/// catalog. Errors are collected and reported by `build`.
///
/// ```
/// use rn_structure::{Catalog, CplxBuilder, Flags};
/// let mut cat = Catalog::new();
/// cat.define_molecule_type("A", &[("b", &[])], 0.0, Flags::EMPTY).unwrap();
/// cat.define_molecule_type("B", &[("a", &[])], 0.0, Flags::EMPTY).unwrap();
/// let ab = CplxBuilder::new(&cat)
///     .mol("A").comp("b").bond(1)
///     .mol("B").comp("a").bond(1)
///     .build().unwrap();
/// assert_eq!(ab.to_str(&cat), "A(b!1).B(a!1)");
/// ```
pub struct CplxBuilder<'a> {
    catalog: &'a Catalog,
    cplx: Cplx,
    open_bonds: BTreeMap<u32, Site>,
    closed_bonds: Vec<u32>,
    shared_compartment: Option<CompartmentRef>,
    error: Option<CatalogError>,
}

impl<'a> CplxBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        CplxBuilder {
            catalog,
            cplx: Cplx::new(),
            open_bonds: BTreeMap::new(),
            closed_bonds: Vec::new(),
            shared_compartment: None,
            error: None,
        }
    }

    fn fail(mut self, e: CatalogError) -> Self {
        if self.error.is_none() {
            self.error = Some(e);
        }
        self
    }

    fn last_site(&self) -> Option<Site> {
        let mol = self.cplx.elem_mols.len().checked_sub(1)?;
        let comp = self.cplx.elem_mols[mol].components.len().checked_sub(1)?;
        Some(Site::new(mol, comp))
    }

    fn resolve_compartment(&self, name: &str) -> Option<CompartmentRef> {
        match name {
            "IN" => Some(CompartmentRef::Inside),
            "OUT" => Some(CompartmentRef::Outside),
            _ => self.catalog.find_compartment_id(name).map(CompartmentRef::Exact),
        }
    }

    pub fn mol(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.catalog.find_elem_mol_type_id(name) {
            Some(id) => {
                let mut mol = ElemMol::new(id);
                mol.flags = self.catalog.get_elem_mol_type(id).flags;
                self.cplx.add_mol(mol);
                self
            }
            None => self.fail(CatalogError::UnknownMoleculeType(name.to_string())),
        }
    }

    pub fn comp(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(mol) = self.cplx.elem_mols.last_mut() else {
            return self.fail(CatalogError::ComponentWithoutMolecule(name.to_string()));
        };
        let mt = self.catalog.get_elem_mol_type(mol.elem_mol_type_id);
        match self.catalog.find_component_type_id(mt, name) {
            Some(ct) => {
                mol.components.push(Component::new(ct));
                self
            }
            None => {
                let molecule = mt.name.clone();
                self.fail(CatalogError::UnknownComponent { molecule, component: name.to_string() })
            }
        }
    }

    pub fn state(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(site) = self.last_site() else {
            return self.fail(CatalogError::StateWithoutComponent(name.to_string()));
        };
        let ct_id = self.cplx.component(site).component_type_id;
        let ct = self.catalog.get_component_type(ct_id);
        match self.catalog.find_state_id(name).filter(|s| ct.allowed_state_ids.contains(s)) {
            Some(st) => {
                self.cplx.component_mut(site).state_id = Some(st);
                self
            }
            None => {
                let component = ct.name.clone();
                self.fail(CatalogError::UnknownState { component, state: name.to_string() })
            }
        }
    }

    /// Numbered bond; the label must occur exactly twice.
    pub fn bond(mut self, label: u32) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(site) = self.last_site() else {
            return self.fail(CatalogError::BondWithoutComponent(label));
        };
        if self.closed_bonds.contains(&label) {
            return self.fail(CatalogError::BondLabelReused(label));
        }
        match self.open_bonds.remove(&label) {
            Some(other) => {
                self.cplx.bind(other, site);
                self.closed_bonds.push(label);
            }
            None => {
                self.open_bonds.insert(label, site);
            }
        }
        self
    }

    fn set_bond(mut self, bond: Bond) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.last_site() {
            Some(site) => {
                self.cplx.component_mut(site).bond = bond;
                self
            }
            None => self.fail(CatalogError::BondWithoutComponent(0)),
        }
    }

    /// `!+`
    pub fn any_bond(self) -> Self {
        self.set_bond(Bond::Any)
    }

    /// `!?`
    pub fn maybe_bond(self) -> Self {
        self.set_bond(Bond::Unspecified)
    }

    /// Compartment of the last molecule. `IN` and `OUT` are relative.
    pub fn compartment(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(c) = self.resolve_compartment(name) else {
            return self.fail(CatalogError::UnknownCompartment(name.to_string()));
        };
        match self.cplx.elem_mols.last_mut() {
            Some(mol) => {
                mol.compartment = c;
                self
            }
            None => self.fail(CatalogError::UnknownCompartment(name.to_string())),
        }
    }

    /// Compartment of every molecule that has none of its own, the
    /// `@C:` prefix in BNGL.
    pub fn cplx_compartment(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.resolve_compartment(name) {
            Some(c) => {
                self.shared_compartment = Some(c);
                self
            }
            None => self.fail(CatalogError::UnknownCompartment(name.to_string())),
        }
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.cplx.orientation = orientation;
        self
    }

    pub fn build(mut self) -> Result<Cplx, CatalogError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if let Some((&label, _)) = self.open_bonds.iter().next() {
            return Err(CatalogError::UnclosedBond(label));
        }
        if let Some(c) = self.shared_compartment {
            for mol in self.cplx.elem_mols.iter_mut() {
                if mol.compartment == CompartmentRef::Any {
                    mol.compartment = c;
                }
            }
        }
        Ok(self.cplx)
    }
}
