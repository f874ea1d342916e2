use log::debug;

use rn_structure::Bond;
use rn_structure::Cplx;
use rn_structure::Site;
use rn_structure::Catalog;
use rn_structure::RxnRule;
use rn_structure::Orientation;
use rn_structure::CompartmentId;
use rn_structure::CompartmentRef;

use crate::Embedding;

/// Applies a finalized rule to concrete reactants. `targets[i]` is the
/// complex matched by reactant pattern i at `embeddings[i]`.
///
/// Returns the resulting connected complexes, each tagged with the
/// declared product it realizes and carrying its orientation. Fragments that contain no declared
/// product molecule are tagged None. Returns None if the outcome is not
/// realizable: a relative compartment cannot be resolved, two declared
/// products end up in one complex, or one declared product falls apart.
pub fn apply_rule(
    catalog: &Catalog,
    rule: &RxnRule,
    targets: &[&Cplx],
    embeddings: &[&Embedding],
    reference: Option<CompartmentId>,
) -> Option<Vec<(Option<usize>, Cplx)>> {
    assert_eq!(targets.len(), rule.num_reactants());
    assert_eq!(embeddings.len(), rule.num_reactants());

    let mut work = Cplx::new();
    let offsets: Vec<usize> = targets.iter().map(|t| work.append(t)).collect();
    let mut remove = vec![false; work.len()];

    let mut product_mol: Vec<Vec<Option<usize>>> = rule.products.iter()
        .map(|p| vec![None; p.len()])
        .collect();
    let mut product_comp: Vec<Vec<Vec<usize>>> = rule.products.iter()
        .map(|p| p.elem_mols.iter().map(|m| (0..m.components.len()).collect()).collect())
        .collect();

    // A reactant whose pattern molecules are all deleted takes its
    // whole complex along.
    for (ri, r) in rule.reactants.iter().enumerate() {
        let all_deleted = (0..r.len()).all(|rm| {
            rule.get_mapping_for_reactant((ri, rm)).is_some_and(|m| m.product.is_none())
        });
        if all_deleted {
            for m in 0..targets[ri].len() {
                remove[offsets[ri] + m] = true;
            }
        }
    }

    for m in &rule.mapping {
        let (ri, rm) = m.reactant;
        let w = offsets[ri] + embeddings[ri].mol_map[rm];
        match m.product {
            None => remove[w] = true,
            Some((pi, qm)) => {
                product_mol[pi][qm] = Some(w);
                for &(rc, qc) in &m.components {
                    product_comp[pi][qm][qc] = embeddings[ri].comp_map[rm][rc];
                }
            }
        }
    }

    // states and bond releases on surviving molecules
    for (pi, p) in rule.products.iter().enumerate() {
        for (qm, pmol) in p.elem_mols.iter().enumerate() {
            let Some(w) = product_mol[pi][qm] else {
                continue;
            };
            for (qc, comp) in pmol.components.iter().enumerate() {
                let site = Site::new(w, product_comp[pi][qm][qc]);
                if matches!(comp.bond, Bond::Free | Bond::To(_)) {
                    work.unbind(site);
                }
                if let Some(st) = comp.state_id {
                    work.component_mut(site).state_id = Some(st);
                }
            }
        }
    }

    let created = rule.created_product_mols();
    for &(pi, qm) in &created {
        let mut mol = rule.products[pi].elem_mols[qm].clone();
        for comp in mol.components.iter_mut() {
            comp.bond = Bond::Free;
        }
        mol.compartment = CompartmentRef::Any;
        product_mol[pi][qm] = Some(work.add_mol(mol));
        remove.push(false);
    }

    for (pi, p) in rule.products.iter().enumerate() {
        for (qm, pmol) in p.elem_mols.iter().enumerate() {
            for (qc, comp) in pmol.components.iter().enumerate() {
                let Bond::To(partner) = comp.bond else {
                    continue;
                };
                if (qm, qc) > (partner.mol, partner.comp) {
                    continue;
                }
                let a = Site::new(product_mol[pi][qm]?, product_comp[pi][qm][qc]);
                let b = Site::new(product_mol[pi][partner.mol]?, product_comp[pi][partner.mol][partner.comp]);
                if work.component(a).bond != Bond::Free || work.component(b).bond != Bond::Free {
                    debug!("Rule {}: bond target is already occupied.", rule.name);
                    return None;
                }
                work.bind(a, b);
            }
        }
    }

    // explicit compartments first, then inheritance for created molecules
    for (pi, p) in rule.products.iter().enumerate() {
        for (qm, pmol) in p.elem_mols.iter().enumerate() {
            let w = product_mol[pi][qm]?;
            match pmol.compartment {
                CompartmentRef::Any => (),
                CompartmentRef::Exact(c) => work.elem_mols[w].compartment = CompartmentRef::Exact(c),
                CompartmentRef::Inside | CompartmentRef::Outside => {
                    let inside = pmol.compartment == CompartmentRef::Inside;
                    let Some(c) = reference.and_then(|r| catalog.resolve_relative_compartment(inside, r)) else {
                        debug!("Rule {}: cannot resolve relative compartment.", rule.name);
                        return None;
                    };
                    work.elem_mols[w].compartment = CompartmentRef::Exact(c);
                }
            }
        }
    }
    for &(pi, qm) in &created {
        let pmol = &rule.products[pi].elem_mols[qm];
        if pmol.compartment != CompartmentRef::Any {
            continue;
        }
        let w = product_mol[pi][qm]?;
        let is_surf = work.elem_mols[w].is_surf();
        let sibling = product_mol[pi].iter().enumerate()
            .filter(|(q, _)| !created.contains(&(pi, *q)))
            .filter_map(|(_, w)| *w)
            .map(|s| &work.elem_mols[s])
            .find(|m| m.is_surf() == is_surf && m.compartment != CompartmentRef::Any)
            .map(|m| m.compartment);
        let inherited = sibling.or_else(|| {
            targets.iter()
                .flat_map(|t| t.elem_mols.iter())
                .find(|m| m.is_surf() == is_surf && m.compartment != CompartmentRef::Any)
                .map(|m| m.compartment)
        });
        if let Some(c) = inherited {
            work.elem_mols[w].compartment = c;
        }
    }

    let remap = work.remove_mols(&remove);
    let groups = work.connected_components();
    let mut group_of = vec![0; work.len()];
    for (g, members) in groups.iter().enumerate() {
        for &m in members {
            group_of[m] = g;
        }
    }

    let mut group_product: Vec<Option<usize>> = vec![None; groups.len()];
    for (pi, mols) in product_mol.iter().enumerate() {
        let mut product_group = None;
        for &w in mols.iter().flatten() {
            let g = group_of[remap.get(w).copied().flatten()?];
            if product_group.is_some_and(|pg| pg != g) {
                debug!("Rule {}: product {} is not connected.", rule.name, pi);
                return None;
            }
            product_group = Some(g);
            if group_product[g].is_some_and(|other| other != pi) {
                debug!("Rule {}: products {} and {} end up in one complex.",
                    rule.name, group_product[g].unwrap_or(pi), pi);
                return None;
            }
            group_product[g] = Some(pi);
        }
    }

    Some(groups.iter().zip(group_product).map(|(members, pi)| {
        let mut product = work.extract(members);
        product.orientation = pi.map_or(Orientation::None, |i| rule.products[i].orientation);
        (pi, product)
    }).collect())
}

