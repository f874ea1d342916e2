//! Subgraph matching of rule patterns into complexes.
//!
//! Pattern molecules are visited in breadth-first order along bonds, so
//! each molecule after the first one of a connected part has a mapped
//! neighbor that pins down its candidate. For each candidate molecule the
//! pattern components are assigned injectively to target components of
//! the same type, and bonds to already mapped molecules are verified.

use std::collections::VecDeque;

use rn_structure::Bond;
use rn_structure::Cplx;
use rn_structure::Site;
use rn_structure::Catalog;
use rn_structure::Component;
use rn_structure::Orientation;
use rn_structure::CompartmentId;
use rn_structure::CompartmentRef;

/// Injective map of pattern molecules and components into a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Embedding {
    pub mol_map: Vec<usize>,
    pub comp_map: Vec<Vec<usize>>,
}

impl Embedding {
    pub fn target_site(&self, site: Site) -> Site {
        Site::new(self.mol_map[site.mol], self.comp_map[site.mol][site.comp])
    }

    /// The embedding `self ∘ sigma`, where sigma maps the pattern onto
    /// itself.
    pub fn compose(&self, sigma: &Embedding) -> Embedding {
        let mol_map = sigma.mol_map.iter().map(|&m| self.mol_map[m]).collect();
        let comp_map = sigma.mol_map.iter().enumerate().map(|(pm, &m)| {
            sigma.comp_map[pm].iter().map(|&c| self.comp_map[m][c]).collect()
        }).collect();
        Embedding { mol_map, comp_map }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub ignore_orientation: bool,
    /// Surface compartment against which @IN/@OUT are resolved.
    pub reference_compartment: Option<CompartmentId>,
    /// Labels must be identical instead of pattern-compatible. Used for
    /// isomorphism tests and pattern symmetries.
    pub exact: bool,
}

struct MatchState<'a> {
    catalog: &'a Catalog,
    pattern: &'a Cplx,
    target: &'a Cplx,
    opts: MatchOptions,
    order: Vec<usize>,
    core_pattern: Vec<Option<usize>>,
    core_target: Vec<Option<usize>>,
    comp_assign: Vec<Vec<usize>>,
    matches: Vec<Embedding>,
    early_exit: bool,
}

impl<'a> MatchState<'a> {
    fn new(catalog: &'a Catalog, pattern: &'a Cplx, target: &'a Cplx, opts: MatchOptions, early_exit: bool) -> Self {
        MatchState {
            catalog,
            pattern,
            target,
            opts,
            order: visiting_order(pattern),
            core_pattern: vec![None; pattern.len()],
            core_target: vec![None; target.len()],
            comp_assign: pattern.elem_mols.iter().map(|m| vec![0; m.components.len()]).collect(),
            matches: Vec::new(),
            early_exit,
        }
    }

    fn done(&self) -> bool {
        self.early_exit && !self.matches.is_empty()
    }

    fn search(&mut self) {
        if self.pattern.is_empty() || self.pattern.len() > self.target.len() {
            return;
        }
        if self.opts.exact {
            if self.pattern.len() != self.target.len()
                || self.pattern.num_components() != self.target.num_components()
                || self.pattern.orientation != self.target.orientation {
                return;
            }
        } else if !self.opts.ignore_orientation
            && self.pattern.orientation != Orientation::None
            && self.pattern.orientation != self.target.orientation {
            return;
        }
        self.match_recursive(0);
    }

    fn match_recursive(&mut self, depth: usize) {
        if self.done() {
            return;
        }
        if depth == self.order.len() {
            let mol_map = self.core_pattern.iter().map(|t| t.unwrap_or(usize::MAX)).collect();
            self.matches.push(Embedding { mol_map, comp_map: self.comp_assign.clone() });
            return;
        }

        let pm = self.order[depth];
        for tm in self.find_candidates(pm) {
            if self.core_target[tm].is_some() || !self.mol_compatible(pm, tm) {
                continue;
            }
            let mut used = vec![false; self.target.elem_mols[tm].components.len()];
            self.assign_components(depth, pm, tm, 0, &mut used);
            if self.done() {
                return;
            }
        }
    }

    fn assign_components(&mut self, depth: usize, pm: usize, tm: usize, ci: usize, used: &mut [bool]) {
        let (pattern, target) = (self.pattern, self.target);
        let pcomps = &pattern.elem_mols[pm].components;
        if ci == pcomps.len() {
            if self.bonds_feasible(pm, tm) {
                self.core_pattern[pm] = Some(tm);
                self.core_target[tm] = Some(pm);
                self.match_recursive(depth + 1);
                self.core_pattern[pm] = None;
                self.core_target[tm] = None;
            }
            return;
        }
        let pc = &pcomps[ci];
        for tc in 0..used.len() {
            if used[tc] || !self.component_compatible(pc, &target.elem_mols[tm].components[tc]) {
                continue;
            }
            used[tc] = true;
            self.comp_assign[pm][ci] = tc;
            self.assign_components(depth, pm, tm, ci + 1, used);
            used[tc] = false;
            if self.done() {
                return;
            }
        }
    }

    /// A bond to an already mapped molecule leaves a single candidate.
    fn find_candidates(&self, pm: usize) -> Vec<usize> {
        for pc in &self.pattern.elem_mols[pm].components {
            let Bond::To(psite) = pc.bond else {
                continue;
            };
            if psite.mol == pm {
                continue;
            }
            if let Some(tq) = self.core_pattern[psite.mol] {
                let tsite = Site::new(tq, self.comp_assign[psite.mol][psite.comp]);
                return match self.target.component(tsite).bond {
                    Bond::To(partner) if self.core_target[partner.mol].is_none() => vec![partner.mol],
                    _ => vec![],
                };
            }
        }
        (0..self.target.len())
            .filter(|&t| self.core_target[t].is_none())
            .collect()
    }

    fn mol_compatible(&self, pm: usize, tm: usize) -> bool {
        let pmol = &self.pattern.elem_mols[pm];
        let tmol = &self.target.elem_mols[tm];
        if self.opts.exact {
            return pmol.elem_mol_type_id == tmol.elem_mol_type_id
                && pmol.compartment == tmol.compartment
                && pmol.components.len() == tmol.components.len();
        }

        if pmol.elem_mol_type_id != tmol.elem_mol_type_id {
            let pmt = self.catalog.get_elem_mol_type(pmol.elem_mol_type_id);
            match pmt.wildcard() {
                Some(w) if w.accepts(tmol.flags) => (),
                _ => return false,
            }
        }
        if pmol.components.len() > tmol.components.len() {
            return false;
        }

        match pmol.compartment {
            CompartmentRef::Any => true,
            CompartmentRef::Exact(c) => tmol.compartment == CompartmentRef::Exact(c),
            CompartmentRef::Inside | CompartmentRef::Outside => {
                let inside = pmol.compartment == CompartmentRef::Inside;
                self.opts.reference_compartment
                    .and_then(|r| self.catalog.resolve_relative_compartment(inside, r))
                    .is_some_and(|c| tmol.compartment == CompartmentRef::Exact(c))
            }
        }
    }

    fn component_compatible(&self, pc: &Component, tc: &Component) -> bool {
        if pc.component_type_id != tc.component_type_id {
            return false;
        }
        if self.opts.exact {
            return pc.state_id == tc.state_id && pc.bond.marker() == tc.bond.marker();
        }
        if pc.state_id.is_some() && pc.state_id != tc.state_id {
            return false;
        }
        match pc.bond {
            Bond::Free => tc.bond == Bond::Free,
            Bond::Any => matches!(tc.bond, Bond::To(_) | Bond::Any),
            Bond::Unspecified => true,
            Bond::To(_) => matches!(tc.bond, Bond::To(_)),
        }
    }

    /// Concrete pattern bonds must land on the image of their partner.
    fn bonds_feasible(&self, pm: usize, tm: usize) -> bool {
        for (ci, pc) in self.pattern.elem_mols[pm].components.iter().enumerate() {
            let Bond::To(psite) = pc.bond else {
                continue;
            };
            let Bond::To(tsite) = self.target.component(Site::new(tm, self.comp_assign[pm][ci])).bond else {
                return false;
            };
            let ok = if psite.mol == pm {
                tsite == Site::new(tm, self.comp_assign[pm][psite.comp])
            } else if let Some(tq) = self.core_pattern[psite.mol] {
                tsite == Site::new(tq, self.comp_assign[psite.mol][psite.comp])
            } else {
                tsite.mol != tm && self.core_target[tsite.mol].is_none()
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

/// Breadth-first order over bonds, restarting at the lowest unvisited
/// molecule for disconnected patterns.
fn visiting_order(pattern: &Cplx) -> Vec<usize> {
    let mut seen = vec![false; pattern.len()];
    let mut order = Vec::with_capacity(pattern.len());
    for start in 0..pattern.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(m) = queue.pop_front() {
            order.push(m);
            for comp in &pattern.elem_mols[m].components {
                if let Bond::To(site) = comp.bond {
                    if !seen[site.mol] {
                        seen[site.mol] = true;
                        queue.push_back(site.mol);
                    }
                }
            }
        }
    }
    order
}

/// All embeddings of pattern into target.
pub fn find_embeddings(catalog: &Catalog, pattern: &Cplx, target: &Cplx, opts: MatchOptions) -> Vec<Embedding> {
    let mut state = MatchState::new(catalog, pattern, target, opts, false);
    state.search();
    state.matches
}

pub fn matches_pattern(catalog: &Catalog, pattern: &Cplx, target: &Cplx, opts: MatchOptions) -> bool {
    let mut state = MatchState::new(catalog, pattern, target, opts, true);
    state.search();
    !state.matches.is_empty()
}

/// Pattern test used to sort species into reactant classes: category
/// wildcards are honored, orientation is ignored, and @IN/@OUT are
/// resolved against the target's own surface compartment.
pub fn matches_pattern_incl_all_mols_ignore_orientation(catalog: &Catalog, pattern: &Cplx, target: &Cplx) -> bool {
    let opts = MatchOptions {
        ignore_orientation: true,
        reference_compartment: target.get_surface_compartment_id(),
        exact: false,
    };
    matches_pattern(catalog, pattern, target, opts)
}

/// Isomorphism test on the labeled graphs.
pub fn cplx_matches_fully(catalog: &Catalog, a: &Cplx, b: &Cplx) -> bool {
    let opts = MatchOptions { exact: true, ..MatchOptions::default() };
    matches_pattern(catalog, a, b, opts)
}

/// All maps of a pattern onto itself that keep every label.
pub fn pattern_automorphisms(catalog: &Catalog, pattern: &Cplx) -> Vec<Embedding> {
    let opts = MatchOptions { exact: true, ..MatchOptions::default() };
    find_embeddings(catalog, pattern, pattern, opts)
}
