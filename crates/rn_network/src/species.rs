use log::warn;

use rn_structure::Cplx;
use rn_structure::Flags;
use rn_structure::Catalog;

use crate::SpeciesId;
use crate::EngineConfig;
use crate::ReactantClassId;

/// A fully specified complex in canonical form with its derived
/// diffusion properties.
#[derive(Debug, Clone)]
pub struct Species {
    /// Assigned by the species container.
    pub id: Option<SpeciesId>,
    /// Canonical BNGL rendering of the complex.
    pub name: String,
    pub cplx: Cplx,
    pub flags: Flags,
    pub diffusion_constant: f64,
    pub time_step: f64,
    pub space_step: f64,
    num_instantiations: u64,
    reactant_class_id: Option<ReactantClassId>,
    removable: bool,
    defunct: bool,
}

impl Species {
    pub fn new(mut cplx: Cplx, catalog: &Catalog, config: &EngineConfig) -> Self {
        cplx.finalize_flags(catalog);
        cplx.canonicalize(catalog);
        let name = cplx.to_str(catalog);

        let mut flags = Flags::EMPTY;
        flags.set(Flags::SURF, cplx.is_surf());
        flags.set(Flags::REACTIVE_SURFACE, cplx.is_reactive_surface());
        flags.set(Flags::ONE_MOL_NO_COMPONENTS, cplx.is_simple());
        flags.set(Flags::TARGET_ONLY, cplx.elem_mols.iter()
            .any(|m| catalog.get_elem_mol_type(m.elem_mol_type_id).cant_initiate()));

        let diffusion_constant = species_diffusion_constant(&cplx, catalog);
        if diffusion_constant == 0.0 && config.debug_requires_diffusion_constants && !cplx.is_reactive_surface() {
            warn!("Species {} has a diffusion constant of 0.", name);
        }

        let (custom_time, custom_space) = match cplx.elem_mols.as_slice() {
            [mol] => {
                let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
                (mt.custom_time_step, mt.custom_space_step)
            }
            _ => (0.0, 0.0),
        };
        let (time_step, space_step) = config.get_space_and_time_step(
            cplx.is_surf(), diffusion_constant, custom_time, custom_space);

        Species {
            id: None,
            name,
            cplx,
            flags,
            diffusion_constant,
            time_step,
            space_step,
            num_instantiations: 0,
            reactant_class_id: None,
            removable: false,
            defunct: false,
        }
    }

    pub fn get_id(&self) -> SpeciesId {
        self.id.expect("species was not added to a container")
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

    pub fn is_simple(&self) -> bool {
        self.flags.is_simple()
    }

    pub fn cant_initiate(&self) -> bool {
        self.flags.cant_initiate()
    }

    pub fn inc_num_instantiations(&mut self) {
        self.num_instantiations += 1;
    }

    pub fn dec_num_instantiations(&mut self) {
        assert!(self.num_instantiations > 0, "species {} has no instances", self.name);
        self.num_instantiations -= 1;
    }

    pub fn get_num_instantiations(&self) -> u64 {
        self.num_instantiations
    }

    pub fn was_instantiated(&self) -> bool {
        self.num_instantiations > 0
    }

    pub fn has_valid_reactant_class_id(&self) -> bool {
        self.reactant_class_id.is_some()
    }

    pub fn get_reactant_class_id(&self) -> Option<ReactantClassId> {
        self.reactant_class_id
    }

    pub fn set_reactant_class_id(&mut self, id: ReactantClassId) {
        self.reactant_class_id = Some(id);
    }

    pub fn is_removable(&self) -> bool {
        self.removable
    }

    pub fn set_removable(&mut self, removable: bool) {
        self.removable = removable;
    }

    pub fn is_defunct(&self) -> bool {
        self.defunct
    }

    pub(crate) fn set_defunct(&mut self) {
        self.defunct = true;
    }
}

/// Volume complexes diffuse with 1/sum(1/D) over their molecules and do
/// not move if any molecule does not. Surface complexes move with their
/// slowest surface molecule.
fn species_diffusion_constant(cplx: &Cplx, catalog: &Catalog) -> f64 {
    let d = |m: &rn_structure::ElemMol| catalog.get_elem_mol_type(m.elem_mol_type_id).diffusion_constant;
    if cplx.is_reactive_surface() {
        0.0
    } else if cplx.is_surf() {
        cplx.elem_mols.iter()
            .filter(|m| m.is_surf())
            .map(d)
            .fold(f64::INFINITY, f64::min)
    } else if cplx.elem_mols.iter().any(|m| d(m) == 0.0) {
        0.0
    } else {
        1.0 / cplx.elem_mols.iter().map(|m| 1.0 / d(m)).sum::<f64>()
    }
}
