use rn_structure::RxnRule;
use rn_structure::RxnType;
use rn_structure::RxnRuleId;
use rn_structure::Orientation;

use crate::SpeciesId;
use crate::RxnClassId;
use crate::SpeciesContainer;

/// Lifecycle of the pathways of a reaction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathwayState {
    /// Reactants and candidate rules are known, pathways are not.
    Uninitialized,
    /// Pathways and the probability ladder were built from current rates.
    PathwaysComputed,
    /// A rule rate changed after the ladder was built.
    Stale,
    /// The ladder was rebuilt after a rate change.
    RatesCurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSpeciesWIndices {
    pub product_species_id: SpeciesId,
    /// The declared product of the rule, None for fragments that were
    /// only carried along as context.
    pub rule_product_index: Option<usize>,
    /// Orientation of the declared product. Species themselves are
    /// registered without one.
    pub orientation: Orientation,
}

/// One distinct outcome of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RxnClassPathway {
    pub rxn_rule_id: RxnRuleId,
    /// Number of distinct embeddings that lead to this outcome.
    pub multiplicity: usize,
    pub weight: f64,
    /// Upper end of this pathway's interval in probability space.
    pub cumulative_probability: f64,
    pub product_species_w_indices: Vec<ProductSpeciesWIndices>,
}

/// All reactions of one reactant species or one pair of reactant species.
///
/// Created by the reaction container with reactants and candidate rules
/// only. The pathway vector is built on demand by
/// `RxnContainer::init_rxn_pathways_and_rates`, which is the only place
/// that changes it.
#[derive(Debug, Clone)]
pub struct RxnClass {
    pub id: RxnClassId,
    pub rxn_type: RxnType,
    pub reactant_ids: Vec<SpeciesId>,
    rxn_rule_ids: Vec<RxnRuleId>,
    /// Rules that match the reactants but conflict with the class type.
    ignored_rxn_rule_ids: Vec<RxnRuleId>,
    pathways: Vec<RxnClassPathway>,
    max_fixed_p: f64,
    state: PathwayState,
    bimol_vol_rxn: bool,
}

impl RxnClass {
    pub fn new(id: RxnClassId, reactant_ids: Vec<SpeciesId>, rxn_type: RxnType) -> Self {
        assert!(matches!(reactant_ids.len(), 1 | 2));
        RxnClass {
            id,
            rxn_type,
            reactant_ids,
            rxn_rule_ids: Vec::new(),
            ignored_rxn_rule_ids: Vec::new(),
            pathways: Vec::new(),
            max_fixed_p: 0.0,
            state: PathwayState::Uninitialized,
            bimol_vol_rxn: false,
        }
    }

    /// Rules are kept in insertion order, which is also the order of the
    /// pathways.
    pub fn add_rxn_rule_no_update(&mut self, rule_id: RxnRuleId, rule: &RxnRule) {
        assert_eq!(rule.num_reactants(), self.reactant_ids.len());
        assert_eq!(self.state, PathwayState::Uninitialized);
        self.bimol_vol_rxn |= rule.is_bimol_vol_rxn();
        self.rxn_rule_ids.push(rule_id);
    }

    pub fn ignore_rxn_rule(&mut self, rule_id: RxnRuleId) {
        self.ignored_rxn_rule_ids.push(rule_id);
    }

    pub fn get_ignored_rxn_rule_ids(&self) -> &[RxnRuleId] {
        &self.ignored_rxn_rule_ids
    }

    pub fn get_num_reactions(&self) -> usize {
        self.rxn_rule_ids.len()
    }

    pub fn get_rxn_rule_id(&self, index: usize) -> RxnRuleId {
        self.rxn_rule_ids[index]
    }

    pub fn get_rxn_rule_ids(&self) -> &[RxnRuleId] {
        &self.rxn_rule_ids
    }

    pub fn state(&self) -> PathwayState {
        self.state
    }

    pub fn are_pathways_initialized(&self) -> bool {
        self.state != PathwayState::Uninitialized
    }

    fn assert_initialized(&self) {
        assert!(self.are_pathways_initialized(),
            "pathways of rxn class {} were not initialized", self.id);
    }

    pub fn pathways(&self) -> &[RxnClassPathway] {
        self.assert_initialized();
        &self.pathways
    }

    pub fn get_num_pathways(&self) -> usize {
        self.pathways().len()
    }

    /// Sum of all pathway weights.
    pub fn get_max_fixed_p(&self) -> f64 {
        self.assert_initialized();
        self.max_fixed_p
    }

    pub fn get_rxn_for_pathway(&self, pathway_index: usize) -> RxnRuleId {
        self.pathways()[pathway_index].rxn_rule_id
    }

    pub fn get_rxn_products_for_pathway(&self, pathway_index: usize) -> &[ProductSpeciesWIndices] {
        &self.pathways()[pathway_index].product_species_w_indices
    }

    /// Index of the pathway whose interval, scaled by
    /// `local_prob_factor`, contains `prob`. None if `prob` lies beyond
    /// the last interval.
    pub fn get_pathway_index_for_probability(&self, prob: f64, local_prob_factor: f64) -> Option<usize> {
        let pathways = self.pathways();
        let index = pathways.partition_point(|p| p.cumulative_probability * local_prob_factor <= prob);
        (index < pathways.len()).then_some(index)
    }

    pub(crate) fn set_pathways(&mut self, pathways: Vec<RxnClassPathway>) {
        self.pathways = pathways;
        self.max_fixed_p = self.rebuild_ladder();
        self.state = PathwayState::PathwaysComputed;
    }

    /// Recomputes pathway weights from the current rule rates without
    /// enumerating outcomes again.
    pub(crate) fn update_rates(&mut self, rules: &[RxnRule]) {
        self.assert_initialized();
        for p in self.pathways.iter_mut() {
            p.weight = rules[p.rxn_rule_id].current_rate() * p.multiplicity as f64;
        }
        self.max_fixed_p = self.rebuild_ladder();
        self.state = PathwayState::RatesCurrent;
    }

    pub(crate) fn mark_stale(&mut self) {
        if self.are_pathways_initialized() {
            self.state = PathwayState::Stale;
        }
    }

    fn rebuild_ladder(&mut self) -> f64 {
        let mut total = 0.0;
        for p in self.pathways.iter_mut() {
            total += p.weight;
            p.cumulative_probability = total;
        }
        total
    }

    pub fn is_unimol(&self) -> bool {
        self.reactant_ids.len() == 1
    }

    pub fn is_bimol(&self) -> bool {
        self.reactant_ids.len() == 2
    }

    pub fn is_bimol_vol_rxn_class(&self) -> bool {
        self.bimol_vol_rxn
    }

    pub fn is_standard(&self) -> bool {
        self.rxn_type == RxnType::Standard
    }

    pub fn is_reflect_type(&self) -> bool {
        self.rxn_type == RxnType::Reflect
    }

    pub fn is_transparent_type(&self) -> bool {
        self.rxn_type == RxnType::Transparent
    }

    pub fn is_absorb_region_border_type(&self) -> bool {
        self.rxn_type == RxnType::AbsorbRegionBorder
    }

    pub fn is_reactant_species_id(&self, id: SpeciesId) -> bool {
        self.reactant_ids.contains(&id)
    }

    pub fn get_second_species_id(&self, id: SpeciesId) -> SpeciesId {
        assert!(self.is_bimol());
        assert!(self.is_reactant_species_id(id));
        if self.reactant_ids[0] != id {
            self.reactant_ids[0]
        } else {
            self.reactant_ids[1]
        }
    }

    /// Reactant names joined by ` + `.
    pub fn reactants_to_str(&self, all_species: &SpeciesContainer) -> String {
        self.reactant_ids.iter()
            .map(|&id| all_species.get(id).name.as_str())
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// One line per pathway, e.g. `A(b) + B(a) -> A(b!1).B(a!1) 2`, or
    /// the reactants and rule ids before initialization.
    pub fn to_str(&self, all_species: &SpeciesContainer) -> String {
        let reactants = self.reactants_to_str(all_species);
        if !self.are_pathways_initialized() {
            return format!("{} : rules {:?}", reactants, self.rxn_rule_ids);
        }
        if !self.is_standard() {
            return format!("{} : {:?}", reactants, self.rxn_type);
        }
        self.pathways.iter().map(|p| {
            let products = if p.product_species_w_indices.is_empty() {
                "0".to_string()
            } else {
                p.product_species_w_indices.iter()
                    .map(|ps| all_species.get(ps.product_species_id).name.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            };
            format!("{} -> {} {}", reactants, products, p.weight)
        }).collect::<Vec<_>>().join("\n")
    }
}
