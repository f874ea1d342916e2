use ahash::AHashMap;
use nohash_hasher::IntMap;
use log::debug;

use rn_structure::Cplx;
use rn_structure::Flags;
use rn_structure::Catalog;
use rn_structure::CompartmentId;
use rn_structure::CompartmentRef;
use rn_structure::ElemMol;
use rn_structure::ALL_MOLECULES;
use rn_structure::ALL_VOLUME_MOLECULES;
use rn_structure::ALL_SURFACE_MOLECULES;
use rn_structure::canonical_string;
use rn_rewrite::cplx_matches_fully;

use crate::Species;
use crate::SpeciesId;
use crate::EngineConfig;

/// Owner of all species. Lookup by structure goes through the canonical
/// name, so there is never more than one species per isomorphism class.
///
/// Removed species stay in storage, marked defunct, until `defragment`
/// compacts the storage. Their ids are never reissued.
#[derive(Debug, Default)]
pub struct SpeciesContainer {
    next_species_id: SpeciesId,
    /// Storage index of each id ever issued, None once compacted away.
    species_id_to_index: Vec<Option<usize>>,
    species: Vec<Species>,
    canonical_species_map: AHashMap<String, SpeciesId>,
    species_with_compartment: AHashMap<(SpeciesId, CompartmentId), SpeciesId>,
    species_without_compartment: IntMap<SpeciesId, SpeciesId>,
    superclass_ids: Option<[SpeciesId; 3]>,
    max_time_step: f64,
}

impl SpeciesContainer {
    pub fn new() -> Self {
        SpeciesContainer {
            max_time_step: 1.0,
            ..Default::default()
        }
    }

    /// Returns the id of the species with the same canonical form, or
    /// registers `new_species` under the next free id.
    pub fn find_or_add(&mut self, mut new_species: Species, removable: bool) -> SpeciesId {
        if let Some(&id) = self.canonical_species_map.get(&new_species.name) {
            return id;
        }
        let id = self.next_species_id;
        self.next_species_id += 1;
        new_species.id = Some(id);
        new_species.set_removable(removable);
        if new_species.time_step > self.max_time_step && new_species.diffusion_constant > 0.0 {
            self.max_time_step = new_species.time_step;
        }
        debug!("New species {}: {}.", id, new_species.name);
        self.canonical_species_map.insert(new_species.name.clone(), id);
        self.species_id_to_index.push(Some(self.species.len()));
        self.species.push(new_species);
        id
    }

    /// Lookup by structure.
    pub fn find(&self, cplx: &Cplx, catalog: &Catalog) -> Option<SpeciesId> {
        let mut cplx = cplx.clone();
        cplx.finalize_flags(catalog);
        self.canonical_species_map.get(&canonical_string(&cplx, catalog)).copied()
    }

    /// Lookup by canonical name.
    pub fn find_by_name(&self, name: &str) -> Option<SpeciesId> {
        self.canonical_species_map.get(name).copied()
    }

    /// Lookup by isomorphism test against every species, without going
    /// through the canonical form.
    pub fn find_full_match(&self, cplx: &Cplx, catalog: &Catalog) -> Option<SpeciesId> {
        let mut cplx = cplx.clone();
        cplx.finalize_flags(catalog);
        self.iter()
            .find(|s| cplx_matches_fully(catalog, &cplx, &s.cplx))
            .map(|s| s.get_id())
    }

    /// Removes a species from all lookup tables and marks it defunct.
    pub fn remove(&mut self, id: SpeciesId) {
        assert!(self.does_species_exist(id), "species {} does not exist", id);
        let index = self.index_of(id);
        let name = self.species[index].name.clone();
        self.canonical_species_map.remove(&name);
        self.species_with_compartment.retain(|&(plain, _), specialized| plain != id && *specialized != id);
        self.species_without_compartment.retain(|&specialized, plain| specialized != id && *plain != id);
        self.species[index].set_defunct();
        debug!("Removed species {}: {}.", id, name);
    }

    /// Drops defunct species from storage. Ids of remaining species are
    /// unchanged.
    pub fn defragment(&mut self) {
        self.species.retain(|s| !s.is_defunct());
        self.species_id_to_index.iter_mut().for_each(|i| *i = None);
        for (index, s) in self.species.iter().enumerate() {
            self.species_id_to_index[s.get_id()] = Some(index);
        }
    }

    /// False for ids that were removed or never issued.
    pub fn does_species_exist(&self, id: SpeciesId) -> bool {
        match self.species_id_to_index.get(id) {
            Some(Some(index)) => !self.species[*index].is_defunct(),
            _ => false,
        }
    }

    /// True for every id this container has issued.
    pub fn is_valid_id(&self, id: SpeciesId) -> bool {
        id < self.next_species_id
    }

    fn index_of(&self, id: SpeciesId) -> usize {
        match self.species_id_to_index.get(id) {
            Some(Some(index)) => *index,
            _ => panic!("species id {} is not in storage", id),
        }
    }

    pub fn get(&self, id: SpeciesId) -> &Species {
        let s = &self.species[self.index_of(id)];
        assert!(!s.is_defunct(), "species {} is defunct", id);
        s
    }

    pub fn get_mut(&mut self, id: SpeciesId) -> &mut Species {
        let index = self.index_of(id);
        let s = &mut self.species[index];
        assert!(!s.is_defunct(), "species {} is defunct", id);
        s
    }

    /// The variant of a species with every molecule placed in
    /// `compartment`, created if needed.
    pub fn get_species_id_with_compartment(
        &mut self,
        id: SpeciesId,
        compartment: CompartmentId,
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> SpeciesId {
        if let Some(&cached) = self.species_with_compartment.get(&(id, compartment)) {
            return cached;
        }
        let s = self.get(id);
        let mut cplx = s.cplx.clone();
        cplx.set_compartment(CompartmentRef::Exact(compartment));
        let removable = s.is_removable();
        let specialized = self.find_or_add(Species::new(cplx, catalog, config), removable);
        self.species_with_compartment.insert((id, compartment), specialized);
        self.species_without_compartment.insert(specialized, id);
        specialized
    }

    /// The variant of a species without compartments, created if needed.
    pub fn get_species_id_without_compartment(
        &mut self,
        id: SpeciesId,
        catalog: &Catalog,
        config: &EngineConfig,
    ) -> SpeciesId {
        if let Some(&cached) = self.species_without_compartment.get(&id) {
            return cached;
        }
        let s = self.get(id);
        if !s.cplx.has_compartment() {
            return id;
        }
        let mut cplx = s.cplx.clone();
        cplx.set_compartment(CompartmentRef::Any);
        let removable = s.is_removable();
        let plain = self.find_or_add(Species::new(cplx, catalog, config), removable);
        self.species_without_compartment.insert(id, plain);
        if let Some(c) = self.get(id).cplx.get_primary_compartment_id() {
            self.species_with_compartment.insert((plain, c), id);
        }
        plain
    }

    /// Registers one species per category wildcard molecule type.
    /// The molecule types must already be in the catalog.
    pub fn initialize_superclass_species(&mut self, catalog: &Catalog, config: &EngineConfig) -> [SpeciesId; 3] {
        if let Some(ids) = self.superclass_ids {
            return ids;
        }
        let ids = [ALL_MOLECULES, ALL_VOLUME_MOLECULES, ALL_SURFACE_MOLECULES].map(|name| {
            let mt = catalog.find_elem_mol_type_id(name)
                .unwrap_or_else(|| panic!("molecule type {} is missing", name));
            let mut cplx = Cplx::new();
            cplx.add_mol(ElemMol::new(mt));
            let mut s = Species::new(cplx, catalog, config);
            if name == ALL_SURFACE_MOLECULES {
                s.flags.insert(Flags::SURF);
            }
            self.find_or_add(s, false)
        });
        self.superclass_ids = Some(ids);
        ids
    }

    pub fn is_species_superclass(&self, id: SpeciesId) -> bool {
        self.superclass_ids.is_some_and(|ids| ids.contains(&id))
    }

    pub fn get_all_molecules_species_id(&self) -> Option<SpeciesId> {
        self.superclass_ids.map(|ids| ids[0])
    }

    pub fn get_all_volume_molecules_species_id(&self) -> Option<SpeciesId> {
        self.superclass_ids.map(|ids| ids[1])
    }

    pub fn get_all_surface_molecules_species_id(&self) -> Option<SpeciesId> {
        self.superclass_ids.map(|ids| ids[2])
    }

    /// Largest time step of any diffusing species, at least 1.
    pub fn get_max_time_step(&self) -> f64 {
        self.max_time_step
    }

    pub fn next_species_id(&self) -> SpeciesId {
        self.next_species_id
    }

    /// Number of live species.
    pub fn len(&self) -> usize {
        self.species.iter().filter(|s| !s.is_defunct()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live species in order of their ids.
    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter().filter(|s| !s.is_defunct())
    }

    pub fn ids(&self) -> Vec<SpeciesId> {
        self.iter().map(|s| s.get_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_structure::CplxBuilder;
    use rn_structure::Compartment;

    fn catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[("b", &[]), ("y", &["U", "P"])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[("a", &[])], 1e-6, Flags::EMPTY).unwrap();
        cat.add_superclass_molecule_types();
        cat.add_compartment(Compartment::new_volume("EC", Some(1.0))).unwrap();
        cat.add_compartment(Compartment::new_volume("CP", Some(1.0))).unwrap();
        cat
    }

    fn species(cat: &Catalog, cplx: Cplx) -> Species {
        Species::new(cplx, cat, &EngineConfig::default())
    }

    #[test]
    fn test_find_or_add_identity() {
        let cat = catalog();
        let mut sc = SpeciesContainer::new();
        let ab = CplxBuilder::new(&cat)
            .mol("A").comp("b").bond(1).comp("y").state("U")
            .mol("B").comp("a").bond(1)
            .build().unwrap();
        let ba = CplxBuilder::new(&cat)
            .mol("B").comp("a").bond(7)
            .mol("A").comp("y").state("U").comp("b").bond(7)
            .build().unwrap();
        let ap = CplxBuilder::new(&cat)
            .mol("A").comp("b").bond(1).comp("y").state("P")
            .mol("B").comp("a").bond(1)
            .build().unwrap();

        let i1 = sc.find_or_add(species(&cat, ab.clone()), false);
        let i2 = sc.find_or_add(species(&cat, ba.clone()), false);
        let i3 = sc.find_or_add(species(&cat, ap), true);
        assert_eq!(i1, i2);
        assert_ne!(i1, i3);
        assert_eq!(sc.len(), 2);
        assert!(sc.get(i3).is_removable());
        assert_eq!(sc.find(&ba, &cat), Some(i1));
        assert_eq!(sc.find_full_match(&ba, &cat), Some(i1));
        assert_eq!(sc.find_by_name(&sc.get(i1).name.clone()), Some(i1));
    }

    #[test]
    fn test_remove_and_defragment() {
        let cat = catalog();
        let mut sc = SpeciesContainer::new();
        let a = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap()), true);
        let b = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap()), true);
        let c = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("P").build().unwrap()), true);

        sc.remove(b);
        assert!(!sc.does_species_exist(b));
        assert!(sc.is_valid_id(b));
        assert_eq!(sc.find_by_name("B(a)"), None);
        assert_eq!(sc.len(), 2);

        sc.defragment();
        assert!(sc.does_species_exist(a));
        assert!(!sc.does_species_exist(b));
        assert!(sc.does_species_exist(c));
        assert_eq!(sc.get(c).name, "A(b,y~P)");

        // A removed structure gets a fresh id.
        let b2 = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap()), true);
        assert_ne!(b, b2);
        assert!(!sc.does_species_exist(99));
    }

    #[test]
    #[should_panic]
    fn test_get_removed_species() {
        let cat = catalog();
        let mut sc = SpeciesContainer::new();
        let b = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap()), true);
        sc.remove(b);
        sc.get(b);
    }

    #[test]
    fn test_compartment_specialization_cache() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let ec = cat.find_compartment_id("EC").unwrap();
        let cp = cat.find_compartment_id("CP").unwrap();
        let b = sc.find_or_add(species(&cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap()), false);

        let b_ec = sc.get_species_id_with_compartment(b, ec, &cat, &config);
        let b_cp = sc.get_species_id_with_compartment(b, cp, &cat, &config);
        assert_ne!(b_ec, b_cp);
        assert_eq!(sc.get(b_ec).name, "@EC:B(a)");
        assert_eq!(sc.get_species_id_with_compartment(b, ec, &cat, &config), b_ec);
        assert_eq!(sc.get_species_id_without_compartment(b_cp, &cat, &config), b);
        assert_eq!(sc.get_species_id_without_compartment(b, &cat, &config), b);
        assert_eq!(sc.len(), 3);
    }

    #[test]
    fn test_superclass_species() {
        let cat = catalog();
        let mut sc = SpeciesContainer::new();
        let ids = sc.initialize_superclass_species(&cat, &EngineConfig::default());
        assert!(ids.iter().all(|&id| sc.is_species_superclass(id)));
        assert!(sc.get(ids[2]).is_surf());
        assert_eq!(sc.get(ids[0]).name, "ALL_MOLECULES");
        assert_eq!(sc.initialize_superclass_species(&cat, &EngineConfig::default()), ids);
    }
}
