//! Breadth-first generation of the reaction network reachable from the
//! seed species.

use std::collections::BTreeSet;
use std::fmt::Write;
use log::{debug, info};

use crate::Engine;
use crate::SpeciesId;
use crate::RxnClassId;
use crate::ExploreError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplorationLimits {
    pub max_species: Option<usize>,
    /// Number of species whose reactions are expanded.
    pub max_iterations: Option<usize>,
}

/// Species and reaction classes reachable from the seeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Network {
    pub species: BTreeSet<SpeciesId>,
    pub rxn_classes: BTreeSet<RxnClassId>,
}

impl Network {
    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_rxn_classes(&self) -> usize {
        self.rxn_classes.len()
    }

    pub fn num_pathways(&self, engine: &Engine) -> usize {
        self.rxn_classes.iter().map(|&c| engine.rxn_class(c).get_num_pathways()).sum()
    }

    /// One line per pathway.
    pub fn report(&self, engine: &Engine) -> String {
        self.rxn_classes.iter()
            .map(|&c| engine.rxn_class(c).to_str(engine.get_all_species()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The network in the species/reactions layout of BioNetGen `.net`
    /// files. Indices are 1-based positions in this network; boundary
    /// classes have no reaction and are left out.
    pub fn to_net(&self, engine: &Engine) -> String {
        let all_species = engine.get_all_species();

        let mut out = String::from("begin species\n");
        for (i, &id) in self.species.iter().enumerate() {
            let _ = writeln!(out, "  {} {}", i + 1, all_species.get(id).name);
        }
        out.push_str("end species\nbegin reactions\n");
        let mut n = 0;
        for &c in &self.rxn_classes {
            let class = engine.rxn_class(c);
            if !class.is_standard() {
                continue;
            }
            for p in class.pathways() {
                n += 1;
                let reactants = self.net_indices(class.reactant_ids.iter().copied());
                let products = self.net_indices(p.product_species_w_indices.iter().map(|ps| ps.product_species_id));
                let rule = engine.get_all_rxns().get_rxn_rule(p.rxn_rule_id);
                let _ = writeln!(out, "  {} {} {} {} #{}", n, reactants, products, p.weight, rule.name);
            }
        }
        out.push_str("end reactions\n");
        out
    }

    fn net_indices(&self, ids: impl Iterator<Item = SpeciesId>) -> String {
        let s = ids
            .map(|id| self.species.iter().position(|&s| s == id).map_or(0, |i| i + 1).to_string())
            .collect::<Vec<_>>()
            .join(",");
        if s.is_empty() { "0".to_string() } else { s }
    }
}

/// See `generate_network_with`.
pub fn generate_network(engine: &mut Engine, limits: &ExplorationLimits) -> Result<Network, ExploreError> {
    generate_network_with(engine, limits, |_, _| {})
}

/// Expands species in id order until no new products appear. Every
/// unimolecular class and every bimolecular class between two network
/// species gets its pathways computed, which registers the products.
/// `progress` is called with the number of processed and queued species
/// after each expansion.
pub fn generate_network_with<F>(
    engine: &mut Engine,
    limits: &ExplorationLimits,
    mut progress: F,
) -> Result<Network, ExploreError>
where
    F: FnMut(usize, usize),
{
    engine.initialize();
    let mut network = Network::default();
    let mut remaining: BTreeSet<SpeciesId> = engine.seed_species_ids().iter().copied().collect();
    let mut iterations = 0;

    while let Some(id) = remaining.pop_first() {
        if let Some(limit) = limits.max_iterations {
            if iterations >= limit {
                return Err(ExploreError::TooManyIterations { limit });
            }
        }
        iterations += 1;
        network.species.insert(id);

        let mut classes: Vec<RxnClassId> = engine.get_unimol_rxn_class(id).into_iter().collect();
        for (partner, class) in engine.get_bimol_rxns_for_reactant(id) {
            if network.species.contains(&partner) || remaining.contains(&partner) {
                classes.push(class);
            }
        }

        for class in classes {
            engine.init_rxn_pathways_and_rates(class, false);
            network.rxn_classes.insert(class);
            for p in engine.rxn_class(class).pathways() {
                for ps in &p.product_species_w_indices {
                    let pid = ps.product_species_id;
                    if !network.species.contains(&pid) && remaining.insert(pid) {
                        debug!("New species {}.", engine.get_all_species().get(pid).name);
                    }
                }
            }
        }

        let found = network.species.len() + remaining.len();
        if let Some(limit) = limits.max_species {
            if found > limit {
                return Err(ExploreError::TooManySpecies { limit, found });
            }
        }
        progress(network.species.len(), remaining.len());
    }

    info!("Generated network with {} species and {} reaction classes.",
        network.num_species(), network.num_rxn_classes());
    Ok(network)
}
