use serde::{Serialize, Deserialize};

use crate::Flags;
use crate::Catalog;
use crate::StateId;
use crate::CompartmentId;
use crate::ComponentTypeId;
use crate::ElemMolTypeId;

/// A component slot inside a complex: molecule index and component index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    pub mol: usize,
    pub comp: usize,
}

impl Site {
    pub fn new(mol: usize, comp: usize) -> Self {
        Site { mol, comp }
    }
}

/// Bond state of a component. Concrete bonds are stored on both
/// endpoints. The two wildcards only appear in patterns.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bond {
    #[default]
    Free,
    /// `!+`: bound to something outside the pattern.
    Any,
    /// `!?`: bound or unbound.
    Unspecified,
    To(Site),
}

impl Bond {
    pub fn partner(&self) -> Option<Site> {
        match self {
            Bond::To(site) => Some(*site),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Bond::Any | Bond::Unspecified)
    }

    /// Bond marker without the partner, used for invariant labels.
    pub fn marker(&self) -> &'static str {
        match self {
            Bond::Free => "",
            Bond::Any => "!+",
            Bond::Unspecified => "!?",
            Bond::To(_) => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub component_type_id: ComponentTypeId,
    /// None means "any state" in patterns and "stateless" in species.
    pub state_id: Option<StateId>,
    pub bond: Bond,
}

impl Component {
    pub fn new(component_type_id: ComponentTypeId) -> Self {
        Component { component_type_id, state_id: None, bond: Bond::Free }
    }
}

/// Compartment annotation of a molecule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompartmentRef {
    #[default]
    Any,
    Exact(CompartmentId),
    /// `@IN`, relative to the surface compartment of a reactant.
    Inside,
    /// `@OUT`, relative to the surface compartment of a reactant.
    Outside,
}

impl CompartmentRef {
    pub fn id(&self) -> Option<CompartmentId> {
        match self {
            CompartmentRef::Exact(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, CompartmentRef::Inside | CompartmentRef::Outside)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Down,
    #[default]
    None,
    Up,
}

impl Orientation {
    pub fn suffix(&self) -> &'static str {
        match self {
            Orientation::Down => ",",
            Orientation::None => "",
            Orientation::Up => "'",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElemMol {
    pub elem_mol_type_id: ElemMolTypeId,
    pub components: Vec<Component>,
    #[serde(default)]
    pub compartment: CompartmentRef,
    /// Copied from the molecule type when the complex is finalized.
    #[serde(skip)]
    pub flags: Flags,
}

impl ElemMol {
    pub fn new(elem_mol_type_id: ElemMolTypeId) -> Self {
        ElemMol {
            elem_mol_type_id,
            components: Vec::new(),
            compartment: CompartmentRef::Any,
            flags: Flags::EMPTY,
        }
    }

    pub fn is_surf(&self) -> bool {
        self.flags.is_surf()
    }

    pub fn is_reactive_surface(&self) -> bool {
        self.flags.is_reactive_surface()
    }
}

/// A complex: elementary molecules connected by bonds between their
/// components. Used both for concrete species and for rule patterns.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cplx {
    pub elem_mols: Vec<ElemMol>,
    #[serde(default)]
    pub orientation: Orientation,
}

impl Cplx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elem_mols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elem_mols.is_empty()
    }

    pub fn num_components(&self) -> usize {
        self.elem_mols.iter().map(|m| m.components.len()).sum()
    }

    pub fn add_mol(&mut self, mol: ElemMol) -> usize {
        self.elem_mols.push(mol);
        self.elem_mols.len() - 1
    }

    pub fn component(&self, site: Site) -> &Component {
        &self.elem_mols[site.mol].components[site.comp]
    }

    pub fn component_mut(&mut self, site: Site) -> &mut Component {
        &mut self.elem_mols[site.mol].components[site.comp]
    }

    /// Connects two free components.
    pub fn bind(&mut self, a: Site, b: Site) {
        assert!(a != b, "cannot bind a component to itself");
        self.component_mut(a).bond = Bond::To(b);
        self.component_mut(b).bond = Bond::To(a);
    }

    /// Releases the component and its partner, if any.
    pub fn unbind(&mut self, site: Site) {
        if let Bond::To(partner) = self.component(site).bond {
            self.component_mut(partner).bond = Bond::Free;
        }
        self.component_mut(site).bond = Bond::Free;
    }

    /// Appends all molecules of other and returns the index offset.
    pub fn append(&mut self, other: &Cplx) -> usize {
        let offset = self.elem_mols.len();
        for mol in &other.elem_mols {
            let mut mol = mol.clone();
            for comp in mol.components.iter_mut() {
                if let Bond::To(site) = comp.bond {
                    comp.bond = Bond::To(Site::new(site.mol + offset, site.comp));
                }
            }
            self.elem_mols.push(mol);
        }
        offset
    }

    /// Removes the marked molecules. Bonds into removed molecules are
    /// released on the surviving side. Returns the old-to-new index map.
    pub fn remove_mols(&mut self, remove: &[bool]) -> Vec<Option<usize>> {
        assert_eq!(remove.len(), self.elem_mols.len());
        let mut remap = Vec::with_capacity(remove.len());
        let mut next = 0;
        for &r in remove {
            if r {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }

        let old = std::mem::take(&mut self.elem_mols);
        for (i, mut mol) in old.into_iter().enumerate() {
            if remove[i] {
                continue;
            }
            for comp in mol.components.iter_mut() {
                if let Bond::To(site) = comp.bond {
                    comp.bond = match remap[site.mol] {
                        Some(m) => Bond::To(Site::new(m, site.comp)),
                        None => Bond::Free,
                    };
                }
            }
            self.elem_mols.push(mol);
        }
        remap
    }

    /// Groups of molecule indices that are connected through bonds.
    /// Groups are ordered by their smallest member, members ascending.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.elem_mols.len();
        let mut group = vec![usize::MAX; n];
        let mut groups = Vec::new();
        for start in 0..n {
            if group[start] != usize::MAX {
                continue;
            }
            let gid = groups.len();
            let mut members = vec![start];
            group[start] = gid;
            let mut stack = vec![start];
            while let Some(m) = stack.pop() {
                for comp in &self.elem_mols[m].components {
                    if let Bond::To(site) = comp.bond {
                        if group[site.mol] == usize::MAX {
                            group[site.mol] = gid;
                            members.push(site.mol);
                            stack.push(site.mol);
                        }
                    }
                }
            }
            members.sort_unstable();
            groups.push(members);
        }
        groups
    }

    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    /// Copies the given molecules (in the given order) into a new complex.
    /// Bonds leaving the selection are released.
    pub fn extract(&self, mols: &[usize]) -> Cplx {
        let mut remap = vec![None; self.elem_mols.len()];
        for (new, &old) in mols.iter().enumerate() {
            remap[old] = Some(new);
        }
        let mut result = Cplx { elem_mols: Vec::with_capacity(mols.len()), orientation: self.orientation };
        for &old in mols {
            let mut mol = self.elem_mols[old].clone();
            for comp in mol.components.iter_mut() {
                if let Bond::To(site) = comp.bond {
                    comp.bond = match remap[site.mol] {
                        Some(m) => Bond::To(Site::new(m, site.comp)),
                        None => Bond::Free,
                    };
                }
            }
            result.elem_mols.push(mol);
        }
        result
    }

    /// Bond endpoints are symmetric and in range.
    pub fn has_consistent_bonds(&self) -> bool {
        for (mi, mol) in self.elem_mols.iter().enumerate() {
            for (ci, comp) in mol.components.iter().enumerate() {
                if let Bond::To(site) = comp.bond {
                    let Some(pmol) = self.elem_mols.get(site.mol) else {
                        return false;
                    };
                    let Some(pcomp) = pmol.components.get(site.comp) else {
                        return false;
                    };
                    if pcomp.bond != Bond::To(Site::new(mi, ci)) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Copies molecule-type flags into each molecule.
    pub fn finalize_flags(&mut self, catalog: &Catalog) {
        for mol in self.elem_mols.iter_mut() {
            mol.flags = catalog.get_elem_mol_type(mol.elem_mol_type_id).flags;
        }
    }

    pub fn is_surf(&self) -> bool {
        self.elem_mols.iter().any(|m| m.is_surf())
    }

    pub fn is_reactive_surface(&self) -> bool {
        self.elem_mols.len() == 1 && self.elem_mols[0].is_reactive_surface()
    }

    pub fn is_vol(&self) -> bool {
        !self.is_surf() && !self.is_reactive_surface()
    }

    /// One molecule without components.
    pub fn is_simple(&self) -> bool {
        self.elem_mols.len() == 1 && self.elem_mols[0].components.is_empty()
    }

    /// No state wildcards, no bond wildcards, no relative compartments,
    /// and every molecule lists all components of its type.
    pub fn is_fully_specified(&self, catalog: &Catalog) -> bool {
        self.elem_mols.iter().all(|mol| {
            let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
            !mol.compartment.is_relative()
                && mol.components.len() == mt.component_type_ids.len()
                && mol.components.iter().all(|c| {
                    !c.bond.is_wildcard() && (c.state_id.is_some()
                        || catalog.get_component_type(c.component_type_id).allowed_state_ids.is_empty())
                })
        })
    }

    /// The compartment shared by all molecules, if any.
    pub fn get_primary_compartment_id(&self) -> Option<CompartmentId> {
        let first = self.elem_mols.first()?.compartment.id()?;
        self.elem_mols.iter()
            .all(|m| m.compartment == CompartmentRef::Exact(first))
            .then_some(first)
    }

    pub fn has_compartment(&self) -> bool {
        self.elem_mols.iter().any(|m| m.compartment != CompartmentRef::Any)
    }

    /// Overwrites the compartment of every molecule.
    pub fn set_compartment(&mut self, compartment: CompartmentRef) {
        for mol in self.elem_mols.iter_mut() {
            mol.compartment = compartment;
        }
    }

    /// Surface compartment of the first surface molecule. Relative
    /// compartments in rules are resolved against it.
    pub fn get_surface_compartment_id(&self) -> Option<CompartmentId> {
        self.elem_mols.iter()
            .find(|m| m.is_surf())
            .and_then(|m| m.compartment.id())
    }

    /// Number of molecules of each type, sorted by type id.
    pub fn mol_type_counts(&self) -> Vec<(ElemMolTypeId, usize)> {
        let mut counts: Vec<(ElemMolTypeId, usize)> = Vec::new();
        for mol in &self.elem_mols {
            match counts.iter_mut().find(|(t, _)| *t == mol.elem_mol_type_id) {
                Some((_, c)) => *c += 1,
                None => counts.push((mol.elem_mol_type_id, 1)),
            }
        }
        counts.sort_unstable();
        counts
    }

    /// BNGL rendering in storage order.
    pub fn to_str(&self, catalog: &Catalog) -> String {
        let mol_order: Vec<usize> = (0..self.elem_mols.len()).collect();
        let comp_order: Vec<Vec<usize>> = self.elem_mols.iter()
            .map(|m| (0..m.components.len()).collect())
            .collect();
        crate::render_bngl(self, catalog, &mol_order, &comp_order)
    }
}
