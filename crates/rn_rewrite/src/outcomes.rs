use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::debug;

use rn_structure::Cplx;
use rn_structure::Catalog;
use rn_structure::RxnRule;

use crate::Embedding;
use crate::MatchOptions;
use crate::apply_rule;
use crate::find_embeddings;
use crate::cplx_matches_fully;
use crate::pattern_automorphisms;

/// A canonical product complex and the declared product it realizes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCplx {
    pub rule_product_index: Option<usize>,
    pub name: String,
    pub cplx: Cplx,
}

/// One distinct result of applying a rule to a reactant tuple, with the
/// number of distinct embeddings that produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub products: Vec<ProductCplx>,
    pub multiplicity: usize,
}

/// Embeddings of pattern into target, one per class of embeddings that
/// differ only by a symmetry of the pattern.
pub fn distinct_embeddings(catalog: &Catalog, pattern: &Cplx, target: &Cplx, opts: MatchOptions) -> Vec<Embedding> {
    let symmetries = pattern_automorphisms(catalog, pattern);
    let mut seen: AHashSet<Embedding> = AHashSet::new();
    let mut result = Vec::new();
    for e in find_embeddings(catalog, pattern, target, opts) {
        let key = symmetries.iter()
            .map(|sigma| e.compose(sigma))
            .min()
            .unwrap_or_else(|| e.clone());
        if seen.insert(key) {
            result.push(e);
        }
    }
    result
}

/// Assignments of reactant patterns to the given reactants. A swapped
/// assignment is only a different event if neither the patterns nor the
/// reactants are interchangeable.
fn reactant_assignments(catalog: &Catalog, rule: &RxnRule, reactants: &[&Cplx]) -> Vec<[usize; 2]> {
    if rule.is_unimol() {
        return vec![[0, 0]];
    }
    let symmetric_patterns = cplx_matches_fully(catalog, &rule.reactants[0], &rule.reactants[1]);
    let same_reactants = cplx_matches_fully(catalog, reactants[0], reactants[1]);
    if symmetric_patterns || same_reactants {
        vec![[0, 1]]
    } else {
        vec![[0, 1], [1, 0]]
    }
}

/// All distinct outcomes of a finalized standard rule on the given
/// reactants, in order of discovery. Outcomes with the same multiset of
/// canonical products are merged and their multiplicities add up.
pub fn rule_outcomes(catalog: &Catalog, rule: &RxnRule, reactants: &[&Cplx]) -> Vec<RuleOutcome> {
    if !rule.is_finalized() || rule.rxn_type.is_special() || reactants.len() != rule.num_reactants() {
        return Vec::new();
    }
    let reference = reactants.iter().find_map(|c| c.get_surface_compartment_id());
    let opts = MatchOptions { ignore_orientation: true, reference_compartment: reference, exact: false };

    let mut outcomes: Vec<RuleOutcome> = Vec::new();
    let mut index: AHashMap<Vec<(Option<usize>, String)>, usize> = AHashMap::new();

    for assignment in reactant_assignments(catalog, rule, reactants) {
        let targets: Vec<&Cplx> = (0..rule.num_reactants()).map(|i| reactants[assignment[i]]).collect();
        let per_pattern: Vec<Vec<Embedding>> = targets.iter().enumerate()
            .map(|(i, t)| distinct_embeddings(catalog, &rule.reactants[i], t, opts))
            .collect();

        for combination in per_pattern.iter().multi_cartesian_product() {
            let Some(products) = apply_rule(catalog, rule, &targets, &combination, reference) else {
                continue;
            };
            let mut products: Vec<ProductCplx> = products.into_iter().map(|(pi, mut cplx)| {
                cplx.canonicalize(catalog);
                let name = cplx.to_str(catalog);
                ProductCplx { rule_product_index: pi, name, cplx }
            }).collect();
            products.sort_by(|a, b| (a.rule_product_index, &a.name).cmp(&(b.rule_product_index, &b.name)));

            let key: Vec<(Option<usize>, String)> = products.iter()
                .map(|p| (p.rule_product_index, p.name.clone()))
                .collect();
            match index.get(&key) {
                Some(&i) => outcomes[i].multiplicity += 1,
                None => {
                    index.insert(key, outcomes.len());
                    outcomes.push(RuleOutcome { products, multiplicity: 1 });
                }
            }
        }
    }
    debug!("Rule {} has {} distinct outcomes.", rule.name, outcomes.len());
    outcomes
}
