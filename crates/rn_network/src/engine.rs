use std::collections::BTreeSet;
use log::{info, warn};

use rn_structure::Cplx;
use rn_structure::Flags;
use rn_structure::Catalog;
use rn_structure::RuleError;
use rn_structure::RxnRuleId;
use rn_structure::Orientation;
use rn_structure::CompartmentRef;
use rn_rewrite::matches_pattern_incl_all_mols_ignore_orientation;

use crate::Species;
use crate::SpeciesId;
use crate::RxnClass;
use crate::RxnClassId;
use crate::RxnContainer;
use crate::EngineConfig;
use crate::SpeciesContainer;
use crate::ProductSpeciesWIndices;

/// A rule template that failed finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    pub name: String,
    pub error: RuleError,
}

/// Owns the catalog, all species and all reactions of one network.
///
/// The catalog is frozen once the engine exists. Everything the host asks
/// for goes through species and class ids.
#[derive(Debug)]
pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
    all_species: SpeciesContainer,
    all_rxns: RxnContainer,
    rejected_rules: Vec<RejectedRule>,
    seed_species_ids: Vec<SpeciesId>,
    initialized: bool,
}

impl Engine {
    /// Adds the wildcard molecule types to the catalog and computes the
    /// molecule type steps.
    pub fn new(mut catalog: Catalog, config: EngineConfig) -> Self {
        catalog.add_superclass_molecule_types();
        config.initialize_elem_mol_type_steps(&mut catalog);
        Engine {
            catalog,
            config,
            all_species: SpeciesContainer::new(),
            all_rxns: RxnContainer::new(),
            rejected_rules: Vec::new(),
            seed_species_ids: Vec::new(),
            initialized: false,
        }
    }

    /// Finalizes all rules of the catalog and registers the superclass
    /// and seed species. Rules that fail are recorded and left out.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        for rule in self.catalog.get_rxn_rules().to_vec() {
            let name = rule.name.clone();
            if let Err(error) = self.all_rxns.add_and_finalize(rule, &self.catalog) {
                warn!("{}", error);
                self.rejected_rules.push(RejectedRule { name, error });
            }
        }
        self.all_species.initialize_superclass_species(&self.catalog, &self.config);
        for seed in self.catalog.get_seed_species() {
            let s = Species::new(seed.cplx.clone(), &self.catalog, &self.config);
            let id = self.all_species.find_or_add(s, false);
            if !self.seed_species_ids.contains(&id) {
                self.seed_species_ids.push(id);
            }
        }
        self.initialized = true;
        info!("Engine initialized with {} rules ({} rejected) and {} seed species.",
            self.all_rxns.get_rxn_rules().len(), self.rejected_rules.len(), self.seed_species_ids.len());
    }

    pub fn get_data(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn get_all_species(&self) -> &SpeciesContainer {
        &self.all_species
    }

    pub fn get_all_species_mut(&mut self) -> &mut SpeciesContainer {
        &mut self.all_species
    }

    pub fn get_all_rxns(&self) -> &RxnContainer {
        &self.all_rxns
    }

    pub fn get_rejected_rules(&self) -> &[RejectedRule] {
        &self.rejected_rules
    }

    /// Rules that matched a reactant set but lost to another rule of an
    /// incompatible type, as (class, rule) pairs.
    pub fn get_ignored_rules(&self) -> Vec<(RxnClassId, RxnRuleId)> {
        self.all_rxns.get_ignored_rules()
    }

    pub fn seed_species_ids(&self) -> &[SpeciesId] {
        &self.seed_species_ids
    }

    pub fn find_or_add_species(&mut self, cplx: Cplx) -> SpeciesId {
        let s = Species::new(cplx, &self.catalog, &self.config);
        self.all_species.find_or_add(s, false)
    }

    /// Drops the species and every reaction class it takes part in.
    pub fn remove_species(&mut self, id: SpeciesId) {
        self.all_rxns.remove_species(id);
        self.all_species.remove(id);
    }

    /// A copy of the species' complex with the given orientation and
    /// compartment.
    pub fn create_cplx_from_species(&self, id: SpeciesId, orientation: Orientation, compartment: CompartmentRef) -> Cplx {
        let mut cplx = self.all_species.get(id).cplx.clone();
        cplx.orientation = orientation;
        cplx.set_compartment(compartment);
        cplx
    }

    pub fn matches_pattern_incl_all_mols_ignore_orientation(&self, pattern: &Cplx, id: SpeciesId) -> bool {
        matches_pattern_incl_all_mols_ignore_orientation(&self.catalog, pattern, &self.all_species.get(id).cplx)
    }

    pub fn get_unimol_rxn_class(&mut self, id: SpeciesId) -> Option<RxnClassId> {
        self.all_rxns.get_unimol_rxn_class(id, &mut self.all_species, &self.catalog)
    }

    pub fn get_bimol_rxn_class(&mut self, a: SpeciesId, b: SpeciesId) -> Option<RxnClassId> {
        self.all_rxns.get_bimol_rxn_class(a, b, &mut self.all_species, &self.catalog)
    }

    /// Partner species and the class of each pair.
    pub fn get_bimol_rxns_for_reactant(&mut self, id: SpeciesId) -> Vec<(SpeciesId, RxnClassId)> {
        self.all_rxns.get_bimol_rxns_for_reactant(id, &mut self.all_species, &self.catalog)
            .classes.iter()
            .map(|(&partner, &class)| (partner, class))
            .collect()
    }

    pub fn init_rxn_pathways_and_rates(&mut self, class_id: RxnClassId, force_update: bool) {
        self.all_rxns.init_rxn_pathways_and_rates(
            class_id, &mut self.all_species, &self.catalog, &self.config, force_update);
    }

    pub fn rxn_class(&self, class_id: RxnClassId) -> &RxnClass {
        self.all_rxns.get_rxn_class(class_id)
    }

    /// Initializes the class if needed.
    pub fn get_max_fixed_p(&mut self, class_id: RxnClassId) -> f64 {
        self.init_rxn_pathways_and_rates(class_id, false);
        self.rxn_class(class_id).get_max_fixed_p()
    }

    pub fn get_num_pathways(&mut self, class_id: RxnClassId) -> usize {
        self.init_rxn_pathways_and_rates(class_id, false);
        self.rxn_class(class_id).get_num_pathways()
    }

    pub fn get_rxn_products_for_pathway(&mut self, class_id: RxnClassId, pathway_index: usize) -> &[ProductSpeciesWIndices] {
        self.init_rxn_pathways_and_rates(class_id, false);
        self.all_rxns.get_rxn_class(class_id).get_rxn_products_for_pathway(pathway_index)
    }

    pub fn get_rxn_product_species_id(&mut self, class_id: RxnClassId, pathway_index: usize, product_index: usize) -> SpeciesId {
        self.get_rxn_products_for_pathway(class_id, pathway_index)[product_index].product_species_id
    }

    pub fn get_pathway_index_for_probability(&mut self, class_id: RxnClassId, prob: f64, local_prob_factor: f64) -> Option<usize> {
        self.init_rxn_pathways_and_rates(class_id, false);
        self.rxn_class(class_id).get_pathway_index_for_probability(prob, local_prob_factor)
    }

    pub fn update_rxn_rates_if_needed(&mut self, class_id: RxnClassId, time: f64) -> bool {
        self.init_rxn_pathways_and_rates(class_id, false);
        self.all_rxns.update_rxn_rates_if_needed(class_id, time)
    }

    pub fn get_next_time_of_rxn_rate_update(&self, class_id: RxnClassId) -> f64 {
        self.all_rxns.get_next_time_of_rxn_rate_update(class_id)
    }

    /// Sets the reaction capability flags of every live species.
    pub fn recompute_species_flags(&mut self) {
        for id in self.all_species.ids() {
            if self.all_species.is_species_superclass(id) {
                continue;
            }
            let flags = self.all_rxns.species_rxn_flags(id, &mut self.all_species, &self.catalog);
            let s = self.all_species.get_mut(id);
            s.flags.remove(Flags::RXN_FLAGS);
            s.flags.insert(flags);
        }
    }

    pub fn get_stats_report(&self) -> String {
        let mut active_reactant_classes = BTreeSet::new();
        let mut num_active_species = 0;
        for s in self.all_species.iter() {
            if s.was_instantiated() {
                num_active_species += 1;
                if let Some(rc) = s.get_reactant_class_id() {
                    active_reactant_classes.insert(rc);
                }
            }
        }
        format!("[active/total species {}/{}, rxn classes {}, active/total reactant classes {}/{}]",
            num_active_species,
            self.all_species.len(),
            self.all_rxns.get_num_rxn_classes(),
            active_reactant_classes.len(),
            self.all_rxns.get_num_existing_reactant_classes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_structure::RxnRule;
    use rn_structure::Compartment;
    use rn_structure::CplxBuilder;
    use rn_structure::SURFACE_COMPARTMENT_THICKNESS;

    fn scenario_a() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[], 1e-6, Flags::EMPTY).unwrap();
        let a = CplxBuilder::new(&cat).mol("A").build().unwrap();
        let b = CplxBuilder::new(&cat).mol("B").build().unwrap();
        cat.find_or_add_rxn_rule(RxnRule::new("a_to_b", vec![a.clone()], vec![b], 3.0));
        cat.add_seed_species(a, 10.0);
        cat
    }

    #[test]
    fn test_single_conversion() {
        let mut engine = Engine::new(scenario_a(), EngineConfig::default());
        engine.initialize();
        let a = engine.seed_species_ids()[0];
        let class = engine.get_unimol_rxn_class(a).unwrap();
        assert_eq!(engine.get_num_pathways(class), 1);
        assert_eq!(engine.get_max_fixed_p(class), 3.0);
        let b = engine.get_rxn_product_species_id(class, 0, 0);
        assert_eq!(engine.get_all_species().get(b).name, "B");
        assert_eq!(engine.get_pathway_index_for_probability(class, 0.0, 1.0), Some(0));
        assert_eq!(engine.get_unimol_rxn_class(b), None);
    }

    #[test]
    fn test_rejected_rules_are_recorded() {
        let mut cat = scenario_a();
        let a = CplxBuilder::new(&cat).mol("A").build().unwrap();
        cat.find_or_add_rxn_rule(RxnRule::new("three", vec![a.clone(), a.clone(), a], vec![], 1.0));
        let mut engine = Engine::new(cat, EngineConfig::default());
        engine.initialize();
        assert_eq!(engine.get_all_rxns().get_rxn_rules().len(), 1);
        let rejected = engine.get_rejected_rules();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].name, "three");
        assert!(matches!(rejected[0].error, RuleError::ReactantCount { found: 3, .. }));
    }

    #[test]
    fn test_superclass_species_exist() {
        let mut engine = Engine::new(scenario_a(), EngineConfig::default());
        engine.initialize();
        let all = engine.get_all_species().get_all_molecules_species_id().unwrap();
        assert!(engine.get_all_species().is_species_superclass(all));
        assert_eq!(engine.get_unimol_rxn_class(all), None);
    }

    #[test]
    fn test_compartment_volumes() {
        let mut cat = Catalog::new();
        let ec = cat.add_compartment(Compartment::new_volume("EC", Some(8.0))).unwrap();
        let pm = cat.add_compartment(Compartment::new_surface("PM", Some(6.0)).with_parent(ec)).unwrap();
        cat.add_compartment(Compartment::new_volume("CP", Some(1.0)).with_parent(pm)).unwrap();
        let engine = Engine::new(cat, EngineConfig::default());
        let total = engine.get_data().get_volume_including_children(ec, true).unwrap();
        assert!((total - (8.0 + 6.0 * SURFACE_COMPARTMENT_THICKNESS + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_create_cplx_from_species() {
        let mut cat = scenario_a();
        let ec = cat.add_compartment(Compartment::new_volume("EC", Some(1.0))).unwrap();
        let mut engine = Engine::new(cat, EngineConfig::default());
        engine.initialize();
        let a = engine.seed_species_ids()[0];
        let cplx = engine.create_cplx_from_species(a, Orientation::Up, CompartmentRef::Exact(ec));
        assert_eq!(cplx.orientation, Orientation::Up);
        assert_eq!(cplx.get_primary_compartment_id(), Some(ec));
        assert!(engine.get_all_species().get(a).cplx.get_primary_compartment_id().is_none());
    }

    #[test]
    fn test_recompute_flags_and_stats() {
        let mut engine = Engine::new(scenario_a(), EngineConfig::default());
        engine.initialize();
        let a = engine.seed_species_ids()[0];
        engine.get_all_species_mut().get_mut(a).inc_num_instantiations();
        engine.recompute_species_flags();
        assert!(engine.get_all_species().get(a).flags.has_unimol_rxn());
        let report = engine.get_stats_report();
        assert!(report.starts_with("[active/total species 1/4, rxn classes 1,"));
    }
}
