//! Canonical naming of complexes.
//!
//! A complex is turned into a colored graph with one vertex per molecule
//! and one vertex per component. Colors start from local labels (type
//! names, states, bond markers, compartments) and are refined by the
//! sorted colors of the neighbors. If refinement stops before every
//! vertex has its own color, one vertex of the first ambiguous cell is
//! individualized and the search branches. Each leaf yields an ordering of
//! molecules and components, which is rendered as BNGL. The smallest
//! rendering over all leaves is the canonical name.
//!
//! Vertices with the same color and the same neighbors (apart from each
//! other) are interchangeable, so only one of them is branched on.

use std::fmt::Write;
use itertools::Itertools;

use crate::Bond;
use crate::Cplx;
use crate::Site;
use crate::Catalog;
use crate::CompartmentRef;
use crate::DEFAULT_COMPARTMENT_NAME;

/// Order of molecules, and per molecule the order of its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLabeling {
    pub mol_order: Vec<usize>,
    pub comp_order: Vec<Vec<usize>>,
}

fn compartment_label(catalog: &Catalog, c: CompartmentRef) -> &str {
    match c {
        CompartmentRef::Any => "",
        CompartmentRef::Exact(id) => {
            let name = catalog.get_compartment(id).name.as_str();
            if name == DEFAULT_COMPARTMENT_NAME { "" } else { name }
        }
        CompartmentRef::Inside => "IN",
        CompartmentRef::Outside => "OUT",
    }
}

/// Renders a complex as BNGL with the given molecule and component order.
/// Bond labels are numbered by first appearance.
pub fn render_bngl(cplx: &Cplx, catalog: &Catalog, mol_order: &[usize], comp_order: &[Vec<usize>]) -> String {
    let mut labels: Vec<Vec<u32>> = cplx.elem_mols.iter()
        .map(|m| vec![0; m.components.len()])
        .collect();
    let mut next_label = 1;

    let shared = cplx.get_primary_compartment_id()
        .map(|id| compartment_label(catalog, CompartmentRef::Exact(id)))
        .unwrap_or("");

    let mut result = String::new();
    if !shared.is_empty() {
        let _ = write!(result, "@{}:", shared);
    }

    let mut mols: Vec<String> = Vec::with_capacity(mol_order.len());
    for &mi in mol_order {
        let mol = &cplx.elem_mols[mi];
        let mut s = catalog.get_elem_mol_type(mol.elem_mol_type_id).name.clone();
        if !mol.components.is_empty() {
            let mut comps: Vec<String> = Vec::with_capacity(mol.components.len());
            for &ci in &comp_order[mi] {
                let comp = &mol.components[ci];
                let mut cs = catalog.get_component_type(comp.component_type_id).name.clone();
                if let Some(st) = comp.state_id {
                    cs.push('~');
                    cs.push_str(catalog.get_state_name(st));
                }
                match comp.bond {
                    Bond::Free => (),
                    Bond::Any | Bond::Unspecified => cs.push_str(comp.bond.marker()),
                    Bond::To(partner) => {
                        let mut label = labels[partner.mol][partner.comp];
                        if label == 0 {
                            label = next_label;
                            next_label += 1;
                            labels[mi][ci] = label;
                            labels[partner.mol][partner.comp] = label;
                        }
                        let _ = write!(cs, "!{}", label);
                    }
                }
                comps.push(cs);
            }
            let _ = write!(s, "({})", comps.join(","));
        }
        if shared.is_empty() {
            let c = compartment_label(catalog, mol.compartment);
            if !c.is_empty() {
                let _ = write!(s, "@{}", c);
            }
        }
        mols.push(s);
    }
    result.push_str(&mols.iter().join("."));
    result.push_str(cplx.orientation.suffix());
    result
}

struct CplxGraph {
    adj: Vec<Vec<usize>>,
    /// Vertex of each component; molecule i is vertex i.
    comp_vertex: Vec<Vec<usize>>,
    labels: Vec<String>,
    num_mols: usize,
}

impl CplxGraph {
    fn new(cplx: &Cplx, catalog: &Catalog) -> Self {
        let num_mols = cplx.len();
        let mut labels: Vec<String> = Vec::with_capacity(num_mols + cplx.num_components());
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); num_mols];
        let mut comp_vertex: Vec<Vec<usize>> = Vec::with_capacity(num_mols);

        for mol in &cplx.elem_mols {
            labels.push(format!("M:{}:{}",
                catalog.get_elem_mol_type(mol.elem_mol_type_id).name,
                compartment_label(catalog, mol.compartment)));
        }
        for (mi, mol) in cplx.elem_mols.iter().enumerate() {
            let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
            let mut vertices = Vec::with_capacity(mol.components.len());
            for comp in &mol.components {
                let v = labels.len();
                let state = comp.state_id.map(|s| catalog.get_state_name(s)).unwrap_or("");
                labels.push(format!("C:{:04}:{}:{}:{}",
                    mt.component_position(comp.component_type_id),
                    catalog.get_component_type(comp.component_type_id).name,
                    state,
                    comp.bond.marker()));
                adj.push(vec![mi]);
                adj[mi].push(v);
                vertices.push(v);
            }
            comp_vertex.push(vertices);
        }
        for (mi, mol) in cplx.elem_mols.iter().enumerate() {
            for (ci, comp) in mol.components.iter().enumerate() {
                if let Bond::To(Site { mol: pm, comp: pc }) = comp.bond {
                    let v = comp_vertex[mi][ci];
                    adj[v].push(comp_vertex[pm][pc]);
                }
            }
        }
        for list in adj.iter_mut() {
            list.sort_unstable();
        }
        CplxGraph { adj, comp_vertex, labels, num_mols }
    }

    fn initial_colors(&self) -> Vec<usize> {
        let sorted: Vec<&String> = self.labels.iter().sorted().dedup().collect();
        self.labels.iter()
            .map(|l| match sorted.binary_search(&l) { Ok(i) | Err(i) => i })
            .collect()
    }

    /// Refines colors until the number of color classes is stable.
    fn refine(&self, colors: &mut Vec<usize>) {
        let mut num_colors = colors.iter().unique().count();
        loop {
            let keys: Vec<(usize, Vec<usize>)> = (0..self.adj.len()).map(|v| {
                let mut nb: Vec<usize> = self.adj[v].iter().map(|&w| colors[w]).collect();
                nb.sort_unstable();
                (colors[v], nb)
            }).collect();
            let sorted: Vec<&(usize, Vec<usize>)> = keys.iter().sorted().dedup().collect();
            *colors = keys.iter()
                .map(|k| match sorted.binary_search(&k) { Ok(i) | Err(i) => i })
                .collect();
            if sorted.len() == num_colors {
                break;
            }
            num_colors = sorted.len();
        }
    }

    /// Members of the non-singleton cell with the smallest color.
    fn target_cell(&self, colors: &[usize]) -> Option<Vec<usize>> {
        let mut counts = vec![0usize; colors.len()];
        for &c in colors {
            counts[c] += 1;
        }
        let target = counts.iter().position(|&n| n > 1)?;
        Some((0..colors.len()).filter(|&v| colors[v] == target).collect())
    }

    fn are_twins(&self, u: usize, v: usize) -> bool {
        let nu = self.adj[u].iter().filter(|&&w| w != v);
        let nv = self.adj[v].iter().filter(|&&w| w != u);
        nu.eq(nv)
    }

    fn labeling(&self, colors: &[usize], cplx: &Cplx, catalog: &Catalog) -> CanonicalLabeling {
        let mol_order: Vec<usize> = (0..self.num_mols).sorted_by_key(|&m| colors[m]).collect();
        let comp_order = cplx.elem_mols.iter().enumerate().map(|(mi, mol)| {
            let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
            (0..mol.components.len()).sorted_by_key(|&ci| {
                (mt.component_position(mol.components[ci].component_type_id),
                 colors[self.comp_vertex[mi][ci]])
            }).collect()
        }).collect();
        CanonicalLabeling { mol_order, comp_order }
    }

    fn search(
        &self,
        mut colors: Vec<usize>,
        cplx: &Cplx,
        catalog: &Catalog,
        best: &mut Option<(String, CanonicalLabeling)>,
    ) {
        self.refine(&mut colors);
        let Some(cell) = self.target_cell(&colors) else {
            let labeling = self.labeling(&colors, cplx, catalog);
            let name = render_bngl(cplx, catalog, &labeling.mol_order, &labeling.comp_order);
            if best.as_ref().is_none_or(|(b, _)| name < *b) {
                *best = Some((name, labeling));
            }
            return;
        };

        let mut tried: Vec<usize> = Vec::new();
        for &v in &cell {
            if tried.iter().any(|&u| self.are_twins(u, v)) {
                continue;
            }
            tried.push(v);
            let next: Vec<usize> = colors.iter().enumerate()
                .map(|(w, &c)| if w == v { 2 * c } else { 2 * c + 1 })
                .collect();
            self.search(next, cplx, catalog, best);
        }
    }
}

fn canonical_form(cplx: &Cplx, catalog: &Catalog) -> (String, CanonicalLabeling) {
    let graph = CplxGraph::new(cplx, catalog);
    let mut best = None;
    graph.search(graph.initial_colors(), cplx, catalog, &mut best);
    best.unwrap_or_else(|| (
        String::new(),
        CanonicalLabeling { mol_order: vec![], comp_order: vec![] },
    ))
}

pub fn canonical_labeling(cplx: &Cplx, catalog: &Catalog) -> CanonicalLabeling {
    canonical_form(cplx, catalog).1
}

/// Equal for two complexes exactly if they are isomorphic.
pub fn canonical_string(cplx: &Cplx, catalog: &Catalog) -> String {
    canonical_form(cplx, catalog).0
}

impl Cplx {
    /// Reorders molecules and components into canonical order.
    pub fn canonicalize(&mut self, catalog: &Catalog) {
        let labeling = canonical_labeling(self, catalog);
        let mut new_mol = vec![0; self.len()];
        for (new, &old) in labeling.mol_order.iter().enumerate() {
            new_mol[old] = new;
        }
        let new_comp: Vec<Vec<usize>> = labeling.comp_order.iter().map(|order| {
            let mut inv = vec![0; order.len()];
            for (new, &old) in order.iter().enumerate() {
                inv[old] = new;
            }
            inv
        }).collect();

        let mols = labeling.mol_order.iter().map(|&old| {
            let mut mol = self.elem_mols[old].clone();
            mol.components = labeling.comp_order[old].iter().map(|&ci| {
                let mut comp = self.elem_mols[old].components[ci].clone();
                if let Bond::To(site) = comp.bond {
                    comp.bond = Bond::To(Site::new(new_mol[site.mol], new_comp[site.mol][site.comp]));
                }
                comp
            }).collect();
            mol
        }).collect();
        self.elem_mols = mols;
    }

    pub fn canonical_name(&self, catalog: &Catalog) -> String {
        canonical_string(self, catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flags;
    use crate::CplxBuilder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[("b", &[])], 0.0, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[("a", &[]), ("c", &["0", "1"]), ("b", &[])], 0.0, Flags::EMPTY).unwrap();
        cat.define_molecule_type("R", &[("l", &[]), ("r", &[])], 0.0, Flags::EMPTY).unwrap();
        cat.define_molecule_type("S", &[("s", &["U", "P"]), ("s", &["U", "P"])], 0.0, Flags::EMPTY).unwrap();
        cat
    }

    /// Applies a random permutation to molecules and components.
    fn shuffled(cplx: &Cplx, rng: &mut StdRng) -> Cplx {
        let mut order: Vec<usize> = (0..cplx.len()).collect();
        order.shuffle(rng);
        let comp_orders: Vec<Vec<usize>> = cplx.elem_mols.iter().map(|m| {
            let mut o: Vec<usize> = (0..m.components.len()).collect();
            o.shuffle(rng);
            o
        }).collect();

        let mut new_mol = vec![0; cplx.len()];
        for (new, &old) in order.iter().enumerate() {
            new_mol[old] = new;
        }
        let new_comp: Vec<Vec<usize>> = comp_orders.iter().map(|o| {
            let mut inv = vec![0; o.len()];
            for (new, &old) in o.iter().enumerate() {
                inv[old] = new;
            }
            inv
        }).collect();

        let mut result = Cplx::new();
        for &old in &order {
            let mut mol = cplx.elem_mols[old].clone();
            mol.components = comp_orders[old].iter().map(|&ci| {
                let mut comp = cplx.elem_mols[old].components[ci].clone();
                if let Bond::To(s) = comp.bond {
                    comp.bond = Bond::To(Site::new(new_mol[s.mol], new_comp[s.mol][s.comp]));
                }
                comp
            }).collect();
            result.add_mol(mol);
        }
        result
    }

    fn ring(cat: &Catalog, n: usize) -> Cplx {
        let mut b = CplxBuilder::new(cat);
        for i in 0..n {
            let left = if i == 0 { n as u32 } else { i as u32 };
            b = b.mol("R").comp("l").bond(left).comp("r").bond(i as u32 + 1);
        }
        b.build().unwrap()
    }

    #[test]
    fn test_simple_names() {
        let cat = catalog();
        let a = CplxBuilder::new(&cat).mol("A").comp("b").build().unwrap();
        assert_eq!(canonical_string(&a, &cat), "A(b)");

        let ab = CplxBuilder::new(&cat)
            .mol("B").comp("a").bond(1).comp("c").state("0")
            .mol("A").comp("b").bond(1)
            .build().unwrap();
        assert_eq!(canonical_string(&ab, &cat), "A(b!1).B(a!1,c~0)");
    }

    #[test]
    fn test_chain_is_stable_under_relabeling() {
        let cat = catalog();
        let chain = CplxBuilder::new(&cat)
            .mol("A").comp("b").bond(1)
            .mol("B").comp("a").bond(1).comp("c").state("0").comp("b").bond(2)
            .mol("B").comp("b").bond(2).comp("a").comp("c").state("1")
            .build().unwrap();
        let name = canonical_string(&chain, &cat);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let other = shuffled(&chain, &mut rng);
            assert!(other.has_consistent_bonds());
            assert_eq!(canonical_string(&other, &cat), name);
        }
    }

    #[test]
    fn test_symmetric_structures() {
        let cat = catalog();
        let mut rng = StdRng::seed_from_u64(7);
        for n in [2, 3, 6] {
            let r = ring(&cat, n);
            let name = canonical_string(&r, &cat);
            for _ in 0..20 {
                assert_eq!(canonical_string(&shuffled(&r, &mut rng), &cat), name);
            }
        }
        // rings of different size are different species
        assert_ne!(canonical_string(&ring(&cat, 3), &cat), canonical_string(&ring(&cat, 4), &cat));
    }

    #[test]
    fn test_repeated_components() {
        let cat = catalog();
        let up = CplxBuilder::new(&cat).mol("S").comp("s").state("U").comp("s").state("P").build().unwrap();
        let pu = CplxBuilder::new(&cat).mol("S").comp("s").state("P").comp("s").state("U").build().unwrap();
        assert_eq!(canonical_string(&up, &cat), canonical_string(&pu, &cat));
        assert_eq!(canonical_string(&up, &cat), "S(s~P,s~U)");

        let uu = CplxBuilder::new(&cat).mol("S").comp("s").state("U").comp("s").state("U").build().unwrap();
        assert_ne!(canonical_string(&up, &cat), canonical_string(&uu, &cat));
    }

    #[test]
    fn test_distinguishes_bond_topology() {
        let cat = catalog();
        // the bound site carries the state in one case and not in the other
        let x = CplxBuilder::new(&cat)
            .mol("S").comp("s").state("P").bond(1).comp("s").state("U")
            .mol("A").comp("b").bond(1)
            .build().unwrap();
        let y = CplxBuilder::new(&cat)
            .mol("S").comp("s").state("U").bond(1).comp("s").state("P")
            .mol("A").comp("b").bond(1)
            .build().unwrap();
        assert_ne!(canonical_string(&x, &cat), canonical_string(&y, &cat));
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let cat = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = shuffled(&ring(&cat, 5), &mut rng);
        let name = canonical_string(&r, &cat);
        r.canonicalize(&cat);
        assert!(r.has_consistent_bonds());
        assert_eq!(r.to_str(&cat), name);
        let once = r.clone();
        r.canonicalize(&cat);
        assert_eq!(r.to_str(&cat), once.to_str(&cat));
    }

    #[test]
    fn test_empty_complex() {
        let cat = catalog();
        assert_eq!(canonical_string(&Cplx::new(), &cat), "");
    }
}

