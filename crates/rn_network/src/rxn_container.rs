use std::collections::BTreeMap;
use ahash::AHashMap;
use nohash_hasher::IntMap;
use log::{debug, warn};

use rn_structure::Cplx;
use rn_structure::Flags;
use rn_structure::Catalog;
use rn_structure::RxnRule;
use rn_structure::RxnRuleId;
use rn_structure::RuleError;
use rn_rewrite::rule_outcomes;
use rn_rewrite::matches_pattern_incl_all_mols_ignore_orientation;

use crate::Species;
use crate::SpeciesId;
use crate::RxnClass;
use crate::RxnClassId;
use crate::EngineConfig;
use crate::PathwayState;
use crate::RxnClassPathway;
use crate::ReactantClassId;
use crate::SpeciesContainer;
use crate::ProductSpeciesWIndices;

/// Bimolecular reaction classes of one species, keyed by the partner.
#[derive(Debug, Default, Clone)]
pub struct SpeciesRxnClassesMap {
    pub classes: BTreeMap<SpeciesId, RxnClassId>,
    /// Species ids below this value were already tested as partners.
    scanned_up_to: SpeciesId,
}

/// Owner of all finalized rules and all reaction classes.
///
/// Classes are created on first request for a reactant or a reactant pair
/// and cached by species id, including the negative result.
#[derive(Debug, Default)]
pub struct RxnContainer {
    rxn_rules: Vec<RxnRule>,
    /// Classes that contain each rule.
    rule_users: Vec<Vec<RxnClassId>>,
    rxn_classes: Vec<Option<RxnClass>>,
    unimol_rxn_class_map: IntMap<SpeciesId, Option<RxnClassId>>,
    bimol_rxn_class_map: AHashMap<(SpeciesId, SpeciesId), Option<RxnClassId>>,
    bimol_rxns_per_reactant: IntMap<SpeciesId, SpeciesRxnClassesMap>,
    /// Sorted (rule, reactant pattern) pairs matched by the members of
    /// each reactant class.
    reactant_classes: Vec<Vec<(RxnRuleId, usize)>>,
    reactant_class_map: AHashMap<Vec<(RxnRuleId, usize)>, ReactantClassId>,
}

impl RxnContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalizes a rule template and takes ownership of it. All rules
    /// must be added before the first reaction class is requested.
    pub fn add_and_finalize(&mut self, mut rule: RxnRule, catalog: &Catalog) -> Result<RxnRuleId, RuleError> {
        assert!(self.rxn_classes.is_empty() && self.reactant_classes.is_empty(),
            "rules must be added before reaction classes are created");
        rule.finalize(catalog)?;
        let id = self.rxn_rules.len();
        debug!("Rule {}: {}", id, rule.to_str(catalog));
        self.rxn_rules.push(rule);
        self.rule_users.push(Vec::new());
        Ok(id)
    }

    pub fn get_rxn_rules(&self) -> &[RxnRule] {
        &self.rxn_rules
    }

    pub fn get_rxn_rule(&self, id: RxnRuleId) -> &RxnRule {
        &self.rxn_rules[id]
    }

    pub fn get_rxn_class(&self, id: RxnClassId) -> &RxnClass {
        match self.rxn_classes.get(id) {
            Some(Some(class)) => class,
            _ => panic!("rxn class {} does not exist", id),
        }
    }

    fn get_rxn_class_mut(&mut self, id: RxnClassId) -> &mut RxnClass {
        match self.rxn_classes.get_mut(id) {
            Some(Some(class)) => class,
            _ => panic!("rxn class {} does not exist", id),
        }
    }

    pub fn get_num_rxn_classes(&self) -> usize {
        self.rxn_classes.iter().flatten().count()
    }

    pub fn get_num_existing_reactant_classes(&self) -> usize {
        self.reactant_classes.len()
    }

    pub fn rxn_classes(&self) -> impl Iterator<Item = &RxnClass> {
        self.rxn_classes.iter().flatten()
    }

    /// Rules left out of an existing class because the class already holds
    /// a rule of another type or a boundary rule. The first matching rule
    /// in catalog order wins.
    pub fn get_ignored_rules(&self) -> Vec<(RxnClassId, RxnRuleId)> {
        self.rxn_classes()
            .flat_map(|c| c.get_ignored_rxn_rule_ids().iter().map(move |&ri| (c.id, ri)))
            .collect()
    }

    /// Species that match the same reactant patterns share a reactant
    /// class. The result is stored on the species.
    pub fn get_reactant_class(
        &mut self,
        id: SpeciesId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
    ) -> ReactantClassId {
        if let Some(rc) = all_species.get(id).get_reactant_class_id() {
            return rc;
        }
        let mut memberships: Vec<(RxnRuleId, usize)> = Vec::new();
        if !all_species.is_species_superclass(id) {
            let cplx = &all_species.get(id).cplx;
            for (ri, rule) in self.rxn_rules.iter().enumerate() {
                for (slot, pattern) in rule.reactants.iter().enumerate() {
                    if matches_pattern_incl_all_mols_ignore_orientation(catalog, pattern, cplx) {
                        memberships.push((ri, slot));
                    }
                }
            }
        }
        let rc = match self.reactant_class_map.get(&memberships) {
            Some(&rc) => rc,
            None => {
                let rc = self.reactant_classes.len();
                self.reactant_classes.push(memberships.clone());
                self.reactant_class_map.insert(memberships, rc);
                rc
            }
        };
        all_species.get_mut(id).set_reactant_class_id(rc);
        rc
    }

    fn create_rxn_class(&mut self, reactant_ids: Vec<SpeciesId>, rule_ids: &[RxnRuleId]) -> Option<RxnClassId> {
        let &first = rule_ids.first()?;
        let rxn_type = self.rxn_rules[first].rxn_type;
        let id = self.rxn_classes.len();
        let mut class = RxnClass::new(id, reactant_ids, rxn_type);
        for &ri in rule_ids {
            let rule = &self.rxn_rules[ri];
            if rule.rxn_type != rxn_type {
                warn!("Rule {} ({:?}) cannot share a reaction class with {:?} rules, ignored.",
                    rule.name, rule.rxn_type, rxn_type);
                class.ignore_rxn_rule(ri);
                continue;
            }
            if rxn_type.is_special() && class.get_num_reactions() > 0 {
                warn!("Rule {} is a second boundary rule for the same reactants, ignored.", rule.name);
                class.ignore_rxn_rule(ri);
                continue;
            }
            class.add_rxn_rule_no_update(ri, rule);
            self.rule_users[ri].push(id);
        }
        debug!("Created rxn class {} for species {:?} with rules {:?}.",
            id, class.reactant_ids, class.get_rxn_rule_ids());
        self.rxn_classes.push(Some(class));
        Some(id)
    }

    /// The class of all unimolecular rules that apply to a species, None
    /// if there are none.
    pub fn get_unimol_rxn_class(
        &mut self,
        id: SpeciesId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
    ) -> Option<RxnClassId> {
        if let Some(&cached) = self.unimol_rxn_class_map.get(&id) {
            return cached;
        }
        let rc = self.get_reactant_class(id, all_species, catalog);
        let rule_ids: Vec<RxnRuleId> = self.reactant_classes[rc].iter()
            .filter(|&&(ri, _)| self.rxn_rules[ri].is_unimol())
            .map(|&(ri, _)| ri)
            .collect();
        let class = self.create_rxn_class(vec![id], &rule_ids);
        self.unimol_rxn_class_map.insert(id, class);
        class
    }

    /// The class of all bimolecular rules for a pair of species in any
    /// order. A reactive surface is always stored as the second reactant.
    pub fn get_bimol_rxn_class(
        &mut self,
        a: SpeciesId,
        b: SpeciesId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
    ) -> Option<RxnClassId> {
        let key = (a.min(b), a.max(b));
        if let Some(&cached) = self.bimol_rxn_class_map.get(&key) {
            return cached;
        }
        let rc_a = self.get_reactant_class(a, all_species, catalog);
        let rc_b = self.get_reactant_class(b, all_species, catalog);
        let (ma, mb) = (&self.reactant_classes[rc_a], &self.reactant_classes[rc_b]);
        let (sa, sb) = (all_species.get(a), all_species.get(b));

        let rule_ids: Vec<RxnRuleId> = if sa.cant_initiate() && sb.cant_initiate() {
            Vec::new()
        } else {
            (0..self.rxn_rules.len())
                .filter(|&ri| self.rxn_rules[ri].is_bimol())
                .filter(|&ri| {
                    (ma.contains(&(ri, 0)) && mb.contains(&(ri, 1)))
                        || (ma.contains(&(ri, 1)) && mb.contains(&(ri, 0)))
                })
                .collect()
        };
        let reactants = if sa.is_reactive_surface() && !sb.is_reactive_surface() {
            vec![b, a]
        } else {
            vec![a, b]
        };
        let class = self.create_rxn_class(reactants, &rule_ids);
        self.bimol_rxn_class_map.insert(key, class);
        class
    }

    /// All bimolecular classes of a species with any live species. Species
    /// registered since the previous call are tested first.
    pub fn get_bimol_rxns_for_reactant(
        &mut self,
        id: SpeciesId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
    ) -> &SpeciesRxnClassesMap {
        let scanned = self.bimol_rxns_per_reactant.get(&id).map_or(0, |m| m.scanned_up_to);
        let next = all_species.next_species_id();
        if scanned < next {
            let rc = self.get_reactant_class(id, all_species, catalog);
            let has_bimol = self.reactant_classes[rc].iter().any(|&(ri, _)| self.rxn_rules[ri].is_bimol());
            let mut found = Vec::new();
            if has_bimol {
                let partners: Vec<SpeciesId> = all_species.iter()
                    .map(|s| s.get_id())
                    .filter(|&p| p >= scanned && !all_species.is_species_superclass(p))
                    .collect();
                for p in partners {
                    if let Some(class) = self.get_bimol_rxn_class(id, p, all_species, catalog) {
                        found.push((p, class));
                    }
                }
            }
            let entry = self.bimol_rxns_per_reactant.entry(id).or_default();
            entry.classes.extend(found);
            entry.scanned_up_to = next;
        }
        self.bimol_rxns_per_reactant.entry(id).or_default()
    }

    /// Builds the pathways of a class, or refreshes its rates if it went
    /// stale. Products are registered as new removable species. Does
    /// nothing for an up-to-date class unless `force_update` is set.
    pub fn init_rxn_pathways_and_rates(
        &mut self,
        class_id: RxnClassId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
        config: &EngineConfig,
        force_update: bool,
    ) {
        let class = self.get_rxn_class(class_id);
        match class.state() {
            PathwayState::PathwaysComputed | PathwayState::RatesCurrent if !force_update => return,
            PathwayState::Stale if !force_update => {
                let rules = &self.rxn_rules;
                if let Some(Some(class)) = self.rxn_classes.get_mut(class_id) {
                    class.update_rates(rules);
                }
                return;
            }
            _ => (),
        }

        let reactant_ids = class.reactant_ids.clone();
        let rule_ids = class.get_rxn_rule_ids().to_vec();
        let pathways = if !class.is_standard() {
            let rule_id = rule_ids[0];
            vec![RxnClassPathway {
                rxn_rule_id: rule_id,
                multiplicity: 1,
                weight: self.rxn_rules[rule_id].current_rate(),
                cumulative_probability: 0.0,
                product_species_w_indices: Vec::new(),
            }]
        } else {
            let reactants: Vec<Cplx> = reactant_ids.iter()
                .map(|&id| all_species.get(id).cplx.clone())
                .collect();
            let reactants: Vec<&Cplx> = reactants.iter().collect();
            let mut pathways = Vec::new();
            for rule_id in rule_ids {
                let rule = &self.rxn_rules[rule_id];
                for outcome in rule_outcomes(catalog, rule, &reactants) {
                    let product_species_w_indices = outcome.products.into_iter().map(|p| {
                        let mut cplx = p.cplx;
                        let orientation = std::mem::take(&mut cplx.orientation);
                        let s = Species::new(cplx, catalog, config);
                        ProductSpeciesWIndices {
                            product_species_id: all_species.find_or_add(s, true),
                            rule_product_index: p.rule_product_index,
                            orientation,
                        }
                    }).collect();
                    pathways.push(RxnClassPathway {
                        rxn_rule_id: rule_id,
                        multiplicity: outcome.multiplicity,
                        weight: rule.current_rate() * outcome.multiplicity as f64,
                        cumulative_probability: 0.0,
                        product_species_w_indices,
                    });
                }
            }
            pathways
        };
        debug!("Rxn class {} has {} pathways.", class_id, pathways.len());
        self.get_rxn_class_mut(class_id).set_pathways(pathways);
    }

    /// Applies scheduled rate changes of the class's rules up to `time`.
    /// Every class that uses a changed rule goes stale, this one is
    /// refreshed right away. Returns true if this class's rates changed.
    pub fn update_rxn_rates_if_needed(&mut self, class_id: RxnClassId, time: f64) -> bool {
        let rule_ids = self.get_rxn_class(class_id).get_rxn_rule_ids().to_vec();
        for ri in rule_ids {
            if self.rxn_rules[ri].get_next_time_of_rate_update() > time {
                continue;
            }
            if self.rxn_rules[ri].update_variable_rate(time) {
                for &user in &self.rule_users[ri] {
                    if let Some(Some(class)) = self.rxn_classes.get_mut(user) {
                        class.mark_stale();
                    }
                }
            }
        }
        if self.get_rxn_class(class_id).state() == PathwayState::Stale {
            let rules = &self.rxn_rules;
            if let Some(Some(class)) = self.rxn_classes.get_mut(class_id) {
                class.update_rates(rules);
            }
            true
        } else {
            false
        }
    }

    /// Earliest scheduled rate change among the class's rules.
    pub fn get_next_time_of_rxn_rate_update(&self, class_id: RxnClassId) -> f64 {
        self.get_rxn_class(class_id).get_rxn_rule_ids().iter()
            .map(|&ri| self.rxn_rules[ri].get_next_time_of_rate_update())
            .fold(f64::INFINITY, f64::min)
    }

    /// Drops every class that has the species as a reactant.
    pub fn remove_species(&mut self, id: SpeciesId) {
        let mut removed: Vec<RxnClassId> = Vec::new();
        if let Some(Some(class)) = self.unimol_rxn_class_map.remove(&id) {
            removed.push(class);
        }
        self.bimol_rxn_class_map.retain(|&(a, b), class| {
            if a != id && b != id {
                return true;
            }
            removed.extend(*class);
            false
        });
        self.bimol_rxns_per_reactant.remove(&id);
        for m in self.bimol_rxns_per_reactant.values_mut() {
            m.classes.remove(&id);
        }
        for class_id in removed {
            if let Some(class) = self.rxn_classes[class_id].take() {
                for &ri in class.get_rxn_rule_ids() {
                    self.rule_users[ri].retain(|&u| u != class_id);
                }
            }
        }
    }

    /// Reaction capability flags of a species derived from the rules it
    /// can take part in.
    pub fn species_rxn_flags(
        &mut self,
        id: SpeciesId,
        all_species: &mut SpeciesContainer,
        catalog: &Catalog,
    ) -> Flags {
        let mut flags = Flags::EMPTY;
        if self.get_unimol_rxn_class(id, all_species, catalog).is_some() {
            flags.insert(Flags::HAS_UNIMOL_RXN);
        }
        let rc = self.get_reactant_class(id, all_species, catalog);
        let species = all_species.get(id);
        for &(ri, slot) in &self.reactant_classes[rc] {
            let rule = &self.rxn_rules[ri];
            if !rule.is_bimol() {
                continue;
            }
            let partner = &rule.reactants[1 - slot];
            if rule.rxn_type.is_special() || partner.is_reactive_surface() {
                flags.insert(if species.is_surf() { Flags::CAN_REGION_BORDER } else { Flags::CAN_VOLWALL });
            } else if species.is_vol() && partner.is_vol() {
                flags.insert(Flags::CAN_VOLVOL | Flags::HAS_BIMOL_VOL_RXN);
            } else if species.is_surf() && partner.is_surf() {
                flags.insert(Flags::CAN_SURFSURF);
            } else {
                flags.insert(Flags::CAN_VOLSURF);
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_structure::RxnType;
    use rn_structure::RateChange;
    use rn_structure::CplxBuilder;
    use rn_structure::Orientation;

    fn catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[("b", &[]), ("y", &["U", "P"])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[("a", &[])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("W", &[], 0.0, Flags::REACTIVE_SURFACE).unwrap();
        cat.add_superclass_molecule_types();
        cat
    }

    fn add(sc: &mut SpeciesContainer, cat: &Catalog, cplx: Cplx) -> SpeciesId {
        sc.find_or_add(Species::new(cplx, cat, &EngineConfig::default()), false)
    }

    fn phosphorylation(cat: &Catalog) -> RxnRule {
        RxnRule::new(
            "phos",
            vec![CplxBuilder::new(cat).mol("A").comp("y").state("U").build().unwrap()],
            vec![CplxBuilder::new(cat).mol("A").comp("y").state("P").build().unwrap()],
            1.0,
        )
    }

    fn binding(cat: &Catalog) -> RxnRule {
        RxnRule::new(
            "bind",
            vec![
                CplxBuilder::new(cat).mol("A").comp("b").build().unwrap(),
                CplxBuilder::new(cat).mol("B").comp("a").build().unwrap(),
            ],
            vec![CplxBuilder::new(cat)
                .mol("A").comp("b").bond(1)
                .mol("B").comp("a").bond(1)
                .build().unwrap()],
            2.0,
        )
    }

    #[test]
    fn test_unimol_class_is_cached() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        rc.add_and_finalize(phosphorylation(&cat), &cat).unwrap();

        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let b = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap());
        let class = rc.get_unimol_rxn_class(a, &mut sc, &cat).unwrap();
        assert_eq!(rc.get_unimol_rxn_class(a, &mut sc, &cat), Some(class));
        assert_eq!(rc.get_unimol_rxn_class(b, &mut sc, &cat), None);
        assert_eq!(rc.get_num_rxn_classes(), 1);

        assert_eq!(rc.get_rxn_class(class).state(), PathwayState::Uninitialized);
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        let c = rc.get_rxn_class(class);
        assert_eq!(c.get_num_pathways(), 1);
        let product = c.get_rxn_products_for_pathway(0)[0].product_species_id;
        assert_eq!(sc.get(product).name, "A(b,y~P)");
        assert!(sc.get(product).is_removable());
    }

    #[test]
    fn test_bimol_classes_for_reactant() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        rc.add_and_finalize(binding(&cat), &cat).unwrap();

        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let b = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap());

        let partners: Vec<SpeciesId> = rc.get_bimol_rxns_for_reactant(b, &mut sc, &cat).classes.keys().copied().collect();
        assert_eq!(partners, vec![a]);
        let class = rc.get_bimol_rxn_class(a, b, &mut sc, &cat).unwrap();
        assert_eq!(rc.get_bimol_rxn_class(b, a, &mut sc, &cat), Some(class));
        assert_eq!(rc.get_bimol_rxn_class(a, a, &mut sc, &cat), None);

        // A species registered later is picked up on the next request.
        let a2 = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("P").build().unwrap());
        let partners: Vec<SpeciesId> = rc.get_bimol_rxns_for_reactant(b, &mut sc, &cat).classes.keys().copied().collect();
        assert_eq!(partners, vec![a, a2]);

        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        let c = rc.get_rxn_class(class);
        assert_eq!(c.get_num_pathways(), 1);
        assert_eq!(c.get_max_fixed_p(), 2.0);
        assert!(c.is_bimol_vol_rxn_class());
    }

    #[test]
    fn test_init_is_idempotent() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        rc.add_and_finalize(binding(&cat), &cat).unwrap();
        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let b = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap());
        let class = rc.get_bimol_rxn_class(a, b, &mut sc, &cat).unwrap();

        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        let first = rc.get_rxn_class(class).pathways().to_vec();
        let num_species = sc.len();
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        assert_eq!(rc.get_rxn_class(class).pathways(), first.as_slice());
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, true);
        assert_eq!(rc.get_rxn_class(class).pathways(), first.as_slice());
        assert_eq!(sc.len(), num_species);
    }

    #[test]
    fn test_variable_rates() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        let rule = phosphorylation(&cat).with_variable_rates(vec![
            RateChange { time: 2.0, rate: 0.5 },
            RateChange { time: 1.0, rate: 5.0 },
        ]);
        rc.add_and_finalize(rule, &cat).unwrap();
        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let class = rc.get_unimol_rxn_class(a, &mut sc, &cat).unwrap();
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);

        assert_eq!(rc.get_next_time_of_rxn_rate_update(class), 1.0);
        assert!(!rc.update_rxn_rates_if_needed(class, 0.5));
        assert_eq!(rc.get_rxn_class(class).get_max_fixed_p(), 1.0);

        assert!(rc.update_rxn_rates_if_needed(class, 1.0));
        assert_eq!(rc.get_rxn_class(class).state(), PathwayState::RatesCurrent);
        assert_eq!(rc.get_rxn_class(class).get_max_fixed_p(), 5.0);
        assert_eq!(rc.get_next_time_of_rxn_rate_update(class), 2.0);

        assert!(rc.update_rxn_rates_if_needed(class, 10.0));
        assert_eq!(rc.get_rxn_class(class).get_max_fixed_p(), 0.5);
        assert_eq!(rc.get_next_time_of_rxn_rate_update(class), f64::INFINITY);
    }

    #[test]
    fn test_boundary_class_has_single_pathway() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        let reflect = RxnRule::new(
            "reflect",
            vec![
                CplxBuilder::new(&cat).mol("A").comp("b").build().unwrap(),
                CplxBuilder::new(&cat).mol("W").build().unwrap(),
            ],
            vec![],
            0.0,
        ).with_type(RxnType::Reflect);
        rc.add_and_finalize(reflect, &cat).unwrap();

        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let w = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("W").build().unwrap());
        let class = rc.get_bimol_rxn_class(w, a, &mut sc, &cat).unwrap();
        assert_eq!(rc.get_rxn_class(class).reactant_ids, vec![a, w]);
        assert!(rc.get_rxn_class(class).is_reflect_type());

        let num_species = sc.len();
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        assert_eq!(rc.get_rxn_class(class).get_num_pathways(), 1);
        assert!(rc.get_rxn_class(class).get_rxn_products_for_pathway(0).is_empty());
        assert_eq!(sc.len(), num_species);

        let flags = rc.species_rxn_flags(a, &mut sc, &cat);
        assert!(flags.contains(Flags::CAN_VOLWALL));
    }

    #[test]
    fn test_product_orientation_is_kept_on_pathway() {
        let mut cat = catalog();
        cat.define_molecule_type("R", &[("l", &[])], 1e-8, Flags::SURF).unwrap();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        let flip = RxnRule::new(
            "flip",
            vec![CplxBuilder::new(&cat).mol("R").comp("l").build().unwrap()],
            vec![CplxBuilder::new(&cat).mol("R").comp("l").orientation(Orientation::Up).build().unwrap()],
            1.0,
        );
        rc.add_and_finalize(flip, &cat).unwrap();

        let r = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("R").comp("l").build().unwrap());
        let class = rc.get_unimol_rxn_class(r, &mut sc, &cat).unwrap();
        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        let products = rc.get_rxn_class(class).get_rxn_products_for_pathway(0);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].orientation, Orientation::Up);
        assert_eq!(products[0].product_species_id, r);
        assert_eq!(sc.get(r).cplx.orientation, Orientation::None);
    }

    #[test]
    fn test_conflicting_boundary_rules_are_reported() {
        let cat = catalog();
        let config = EngineConfig::default();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        let boundary = |name: &str, rxn_type: RxnType| RxnRule::new(
            name,
            vec![
                CplxBuilder::new(&cat).mol("A").comp("b").build().unwrap(),
                CplxBuilder::new(&cat).mol("W").build().unwrap(),
            ],
            vec![],
            0.0,
        ).with_type(rxn_type);
        let reflect = rc.add_and_finalize(boundary("reflect", RxnType::Reflect), &cat).unwrap();
        let pass = rc.add_and_finalize(boundary("pass", RxnType::Transparent), &cat).unwrap();
        let again = rc.add_and_finalize(boundary("reflect_again", RxnType::Reflect), &cat).unwrap();

        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let w = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("W").build().unwrap());
        let class = rc.get_bimol_rxn_class(a, w, &mut sc, &cat).unwrap();
        assert_eq!(rc.get_rxn_class(class).get_rxn_rule_ids(), &[reflect]);
        assert_eq!(rc.get_ignored_rules(), vec![(class, pass), (class, again)]);

        rc.init_rxn_pathways_and_rates(class, &mut sc, &cat, &config, false);
        assert_eq!(rc.get_rxn_class(class).get_num_pathways(), 1);
        assert_eq!(rc.get_rxn_class(class).get_rxn_for_pathway(0), reflect);
    }

    #[test]
    fn test_remove_species_drops_classes() {
        let cat = catalog();
        let mut sc = SpeciesContainer::new();
        let mut rc = RxnContainer::new();
        rc.add_and_finalize(binding(&cat), &cat).unwrap();
        rc.add_and_finalize(phosphorylation(&cat), &cat).unwrap();
        let a = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap());
        let b = add(&mut sc, &cat, CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap());
        rc.get_unimol_rxn_class(a, &mut sc, &cat).unwrap();
        rc.get_bimol_rxns_for_reactant(b, &mut sc, &cat);
        assert_eq!(rc.get_num_rxn_classes(), 2);

        rc.remove_species(a);
        assert_eq!(rc.get_num_rxn_classes(), 0);
        assert!(rc.rxn_classes().next().is_none());
    }

    #[test]
    fn test_rejected_rule() {
        let cat = catalog();
        let mut rc = RxnContainer::new();
        let bad = RxnRule::new("bad", vec![CplxBuilder::new(&cat).mol("B").build().unwrap()], vec![], -1.0);
        assert!(matches!(rc.add_and_finalize(bad, &cat), Err(RuleError::InvalidRate { .. })));
        assert!(rc.get_rxn_rules().is_empty());
    }
}
