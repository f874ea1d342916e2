use serde::{Serialize, Deserialize};
use log::debug;

use crate::Bond;
use crate::Cplx;
use crate::Site;
use crate::Catalog;
use crate::RuleError;
use crate::Orientation;
use crate::CompartmentRef;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RxnType {
    #[default]
    Standard,
    Reflect,
    Transparent,
    AbsorbRegionBorder,
}

impl RxnType {
    /// Boundary interactions between a molecule and a reactive surface.
    pub fn is_special(&self) -> bool {
        !matches!(self, RxnType::Standard)
    }
}

/// Identity of one reactant molecule: pattern index and molecule index.
/// A molecule without product is deleted, product molecules that appear
/// in no mapping are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MolMapping {
    pub reactant: (usize, usize),
    pub product: Option<(usize, usize)>,
    /// Pairs of (reactant component, product component).
    #[serde(default)]
    pub components: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateChange {
    pub time: f64,
    pub rate: f64,
}

/// A graph-rewriting rule template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RxnRule {
    pub name: String,
    #[serde(default)]
    pub rxn_type: RxnType,
    pub base_rate_constant: f64,
    #[serde(default)]
    pub variable_rates: Vec<RateChange>,
    pub reactants: Vec<Cplx>,
    #[serde(default)]
    pub products: Vec<Cplx>,
    /// Inferred from molecule types if left empty.
    #[serde(default)]
    pub mapping: Vec<MolMapping>,
    #[serde(skip)]
    current_rate: f64,
    #[serde(skip)]
    next_variable_rate_index: usize,
    #[serde(skip)]
    finalized: bool,
}

fn unmapped_product_mols(products: &[Cplx], mapping: &[MolMapping]) -> Vec<(usize, usize)> {
    let mut result = Vec::new();
    for (pi, p) in products.iter().enumerate() {
        for qm in 0..p.len() {
            if !mapping.iter().any(|m| m.product == Some((pi, qm))) {
                result.push((pi, qm));
            }
        }
    }
    result
}

impl RxnRule {
    pub fn new(name: &str, reactants: Vec<Cplx>, products: Vec<Cplx>, rate: f64) -> Self {
        RxnRule {
            name: name.to_string(),
            rxn_type: RxnType::Standard,
            base_rate_constant: rate,
            variable_rates: Vec::new(),
            reactants,
            products,
            mapping: Vec::new(),
            current_rate: rate,
            next_variable_rate_index: 0,
            finalized: false,
        }
    }

    pub fn with_type(mut self, rxn_type: RxnType) -> Self {
        self.rxn_type = rxn_type;
        self
    }

    pub fn with_mapping(mut self, mapping: Vec<MolMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_variable_rates(mut self, rates: Vec<RateChange>) -> Self {
        self.variable_rates = rates;
        self
    }

    /// Same template, ignoring the runtime rate state.
    pub fn eq_template(&self, other: &RxnRule) -> bool {
        self.rxn_type == other.rxn_type
            && self.base_rate_constant == other.base_rate_constant
            && self.variable_rates == other.variable_rates
            && self.reactants == other.reactants
            && self.products == other.products
            && self.mapping == other.mapping
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_reactants(&self) -> usize {
        self.reactants.len()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    pub fn is_unimol(&self) -> bool {
        self.reactants.len() == 1
    }

    pub fn is_bimol(&self) -> bool {
        self.reactants.len() == 2
    }

    pub fn is_surf_rxn(&self) -> bool {
        self.reactants.iter().chain(self.products.iter()).any(|c| c.is_surf())
    }

    pub fn is_reactive_surface_rxn(&self) -> bool {
        self.reactants.iter().any(|c| c.is_reactive_surface())
    }

    pub fn is_bimol_vol_rxn(&self) -> bool {
        self.is_bimol() && self.reactants.iter().all(|c| c.is_vol())
    }

    pub fn is_simple(&self) -> bool {
        self.reactants.iter().chain(self.products.iter()).all(|c| c.is_simple())
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn may_have_time_varying_rate(&self) -> bool {
        !self.variable_rates.is_empty()
    }

    /// Time of the next scheduled rate change, infinity if none is left.
    pub fn get_next_time_of_rate_update(&self) -> f64 {
        self.variable_rates.get(self.next_variable_rate_index)
            .map(|r| r.time)
            .unwrap_or(f64::INFINITY)
    }

    /// Applies all scheduled rate changes up to `time`. Returns true if
    /// the current rate changed.
    pub fn update_variable_rate(&mut self, time: f64) -> bool {
        let old = self.current_rate;
        while let Some(change) = self.variable_rates.get(self.next_variable_rate_index) {
            if change.time > time {
                break;
            }
            self.current_rate = change.rate;
            self.next_variable_rate_index += 1;
        }
        if self.current_rate != old {
            debug!("Rate of rule {} changed from {} to {} at time {}.",
                self.name, old, self.current_rate, time);
            true
        } else {
            false
        }
    }

    pub fn get_mapping_for_reactant(&self, reactant: (usize, usize)) -> Option<&MolMapping> {
        self.mapping.iter().find(|m| m.reactant == reactant)
    }

    /// Product molecules that have no reactant counterpart.
    pub fn created_product_mols(&self) -> Vec<(usize, usize)> {
        unmapped_product_mols(&self.products, &self.mapping)
    }

    pub fn deleted_reactant_mols(&self) -> Vec<(usize, usize)> {
        self.mapping.iter()
            .filter(|m| m.product.is_none())
            .map(|m| m.reactant)
            .collect()
    }

    /// Checks the template against the catalog, copies molecule flags and
    /// infers the molecule mapping. Must succeed before the rule is used.
    pub fn finalize(&mut self, catalog: &Catalog) -> Result<(), RuleError> {
        if self.finalized {
            return Ok(());
        }
        self.check_rates()?;
        self.check_catalog_references(catalog)?;
        for c in self.reactants.iter_mut().chain(self.products.iter_mut()) {
            c.finalize_flags(catalog);
            if !c.has_consistent_bonds() {
                return Err(RuleError::MalformedBond { rule: self.name.clone() });
            }
        }

        if self.rxn_type.is_special() {
            self.check_boundary_rule()?;
        } else {
            if self.reactants.is_empty() || self.reactants.len() > 2 {
                return Err(RuleError::ReactantCount { rule: self.name.clone(), found: self.reactants.len() });
            }
            if self.mapping.is_empty() {
                self.infer_mapping();
            }
            self.check_mapping(catalog)?;
            self.check_product_bonds(catalog)?;
        }
        self.check_compartments()?;
        self.check_orientation()?;

        self.current_rate = self.base_rate_constant;
        self.next_variable_rate_index = 0;
        self.finalized = true;
        Ok(())
    }

    fn check_rates(&mut self) -> Result<(), RuleError> {
        let invalid = |r: f64| !r.is_finite() || r < 0.0;
        if invalid(self.base_rate_constant) {
            return Err(RuleError::InvalidRate { rule: self.name.clone(), rate: self.base_rate_constant });
        }
        if let Some(c) = self.variable_rates.iter().find(|c| invalid(c.rate) || !c.time.is_finite()) {
            return Err(RuleError::InvalidRate { rule: self.name.clone(), rate: c.rate });
        }
        self.variable_rates.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(())
    }

    fn check_catalog_references(&self, catalog: &Catalog) -> Result<(), RuleError> {
        let num_types = catalog.get_elem_mol_types().len();
        let num_compartments = catalog.get_compartments().len();
        for c in self.reactants.iter().chain(self.products.iter()) {
            for mol in &c.elem_mols {
                if mol.elem_mol_type_id >= num_types {
                    return Err(RuleError::UnknownMoleculeType {
                        rule: self.name.clone(), id: mol.elem_mol_type_id });
                }
                let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
                for comp in &mol.components {
                    if !mt.component_type_ids.contains(&comp.component_type_id) {
                        return Err(RuleError::UnknownComponentType {
                            rule: self.name.clone(), molecule: mt.name.clone(), id: comp.component_type_id });
                    }
                }
                if let CompartmentRef::Exact(id) = mol.compartment {
                    if id >= num_compartments {
                        return Err(RuleError::UnknownCompartment { rule: self.name.clone(), id });
                    }
                }
            }
        }
        Ok(())
    }

    fn check_boundary_rule(&self) -> Result<(), RuleError> {
        let reason = if self.reactants.len() != 2 {
            "expected a molecule and a reactive surface"
        } else if !self.reactants[1].is_reactive_surface() {
            "second reactant must be a reactive surface"
        } else if self.reactants[0].is_reactive_surface() {
            "first reactant must be a molecule"
        } else {
            return Ok(());
        };
        Err(RuleError::InvalidBoundaryRule { rule: self.name.clone(), reason: reason.to_string() })
    }

    /// Pairs product molecules with reactant molecules of the same type,
    /// in order, preferring identical component lists. Components are
    /// paired in order within their type.
    fn infer_mapping(&mut self) {
        let sorted_comps = |c: &Cplx, m: usize| {
            let mut v: Vec<usize> = c.elem_mols[m].components.iter().map(|x| x.component_type_id).collect();
            v.sort_unstable();
            v
        };
        let reactant_mols: Vec<(usize, usize)> = self.reactants.iter().enumerate()
            .flat_map(|(ri, r)| (0..r.len()).map(move |m| (ri, m)))
            .collect();
        let mut used = vec![false; reactant_mols.len()];
        let mut pairs: Vec<((usize, usize), (usize, usize))> = Vec::new();

        for exact in [true, false] {
            for (pi, p) in self.products.iter().enumerate() {
                for qm in 0..p.len() {
                    if pairs.iter().any(|(_, q)| *q == (pi, qm)) {
                        continue;
                    }
                    let qmol = &p.elem_mols[qm];
                    let found = reactant_mols.iter().enumerate().position(|(k, &(ri, rm))| {
                        let rmol = &self.reactants[ri].elem_mols[rm];
                        !used[k] && rmol.elem_mol_type_id == qmol.elem_mol_type_id
                            && (!exact || sorted_comps(&self.reactants[ri], rm) == sorted_comps(p, qm))
                    });
                    if let Some(k) = found {
                        used[k] = true;
                        pairs.push((reactant_mols[k], (pi, qm)));
                    }
                }
            }
        }

        let mut mapping = Vec::with_capacity(reactant_mols.len());
        for (k, &(ri, rm)) in reactant_mols.iter().enumerate() {
            if !used[k] {
                mapping.push(MolMapping { reactant: (ri, rm), product: None, components: vec![] });
                continue;
            }
            let Some(&(_, (pi, qm))) = pairs.iter().find(|(r, _)| *r == (ri, rm)) else {
                continue;
            };
            let rcomps = &self.reactants[ri].elem_mols[rm].components;
            let qcomps = &self.products[pi].elem_mols[qm].components;
            let mut taken = vec![false; rcomps.len()];
            let mut components = Vec::with_capacity(qcomps.len());
            for (qc, qcomp) in qcomps.iter().enumerate() {
                if let Some(rc) = (0..rcomps.len())
                    .find(|&rc| !taken[rc] && rcomps[rc].component_type_id == qcomp.component_type_id)
                {
                    taken[rc] = true;
                    components.push((rc, qc));
                }
            }
            mapping.push(MolMapping { reactant: (ri, rm), product: Some((pi, qm)), components });
        }
        debug!("Inferred mapping for rule {}: {} molecules, {} created.",
            self.name, mapping.len(), unmapped_product_mols(&self.products, &mapping).len());
        self.mapping = mapping;
    }

    fn invalid_mapping(&self, reason: &str) -> RuleError {
        RuleError::InvalidMapping { rule: self.name.clone(), reason: reason.to_string() }
    }

    /// Every reactant molecule is mentioned at most once, every product
    /// molecule at most once, and mapped molecules keep their type and
    /// their full component list. Unmentioned reactant molecules are
    /// added as deleted.
    fn check_mapping(&mut self, catalog: &Catalog) -> Result<(), RuleError> {
        let mut seen_reactants = Vec::new();
        let mut seen_products = Vec::new();
        for m in &self.mapping {
            let (ri, rm) = m.reactant;
            if ri >= self.reactants.len() || rm >= self.reactants[ri].len() {
                return Err(self.invalid_mapping("reactant molecule out of range"));
            }
            if seen_reactants.contains(&m.reactant) {
                return Err(self.invalid_mapping("reactant molecule mapped twice"));
            }
            seen_reactants.push(m.reactant);

            let Some((pi, qm)) = m.product else {
                continue;
            };
            if pi >= self.products.len() || qm >= self.products[pi].len() {
                return Err(self.invalid_mapping("product molecule out of range"));
            }
            if seen_products.contains(&(pi, qm)) {
                return Err(self.invalid_mapping("product molecule mapped twice"));
            }
            seen_products.push((pi, qm));

            let rmol = &self.reactants[ri].elem_mols[rm];
            let qmol = &self.products[pi].elem_mols[qm];
            if rmol.elem_mol_type_id != qmol.elem_mol_type_id {
                return Err(self.invalid_mapping("mapped molecules differ in type"));
            }
            let molecule = catalog.get_elem_mol_type(rmol.elem_mol_type_id).name.clone();
            let dropped = || RuleError::DroppedComponent { rule: self.name.clone(), molecule: molecule.clone() };
            if m.components.len() != rmol.components.len() || m.components.len() != qmol.components.len() {
                return Err(dropped());
            }
            let mut rseen = vec![false; rmol.components.len()];
            let mut qseen = vec![false; qmol.components.len()];
            for &(rc, qc) in &m.components {
                if rc >= rseen.len() || qc >= qseen.len() || rseen[rc] || qseen[qc] {
                    return Err(dropped());
                }
                rseen[rc] = true;
                qseen[qc] = true;
                if rmol.components[rc].component_type_id != qmol.components[qc].component_type_id {
                    return Err(self.invalid_mapping("mapped components differ in type"));
                }
            }
        }

        for (ri, r) in self.reactants.iter().enumerate() {
            for rm in 0..r.len() {
                if !seen_reactants.contains(&(ri, rm)) {
                    self.mapping.push(MolMapping { reactant: (ri, rm), product: None, components: vec![] });
                }
            }
        }
        Ok(())
    }

    /// Wildcard bonds in products must be carried over unchanged, new
    /// bonds need a known prior bond state, and created molecules must be
    /// fully specified.
    fn check_product_bonds(&self, catalog: &Catalog) -> Result<(), RuleError> {
        let dangling = |pi: usize, qm: usize, qc: usize| {
            let mol = &self.products[pi].elem_mols[qm];
            RuleError::DanglingBond {
                rule: self.name.clone(),
                molecule: catalog.get_elem_mol_type(mol.elem_mol_type_id).name.clone(),
                component: catalog.get_component_type(mol.components[qc].component_type_id).name.clone(),
            }
        };

        for m in &self.mapping {
            let Some((pi, qm)) = m.product else {
                continue;
            };
            let (ri, rm) = m.reactant;
            for &(rc, qc) in &m.components {
                let rbond = self.reactants[ri].component(Site::new(rm, rc)).bond;
                let qbond = self.products[pi].component(Site::new(qm, qc)).bond;
                let ok = match qbond {
                    Bond::Any | Bond::Unspecified => rbond == qbond,
                    Bond::To(_) => !rbond.is_wildcard(),
                    Bond::Free => true,
                };
                if !ok {
                    return Err(dangling(pi, qm, qc));
                }
            }
        }

        for (pi, qm) in self.created_product_mols() {
            let mol = &self.products[pi].elem_mols[qm];
            let mt = catalog.get_elem_mol_type(mol.elem_mol_type_id);
            if let Some(qc) = mol.components.iter().position(|c| c.bond.is_wildcard()) {
                return Err(dangling(pi, qm, qc));
            }
            let complete = mol.components.len() == mt.component_type_ids.len()
                && mol.components.iter().all(|c| c.state_id.is_some()
                    || catalog.get_component_type(c.component_type_id).allowed_state_ids.is_empty());
            if !complete || mt.wildcard().is_some() {
                return Err(RuleError::IncompleteCreatedMolecule {
                    rule: self.name.clone(), molecule: mt.name.clone() });
            }
        }
        Ok(())
    }

    fn check_compartments(&self) -> Result<(), RuleError> {
        let relative = self.reactants.iter().chain(self.products.iter())
            .flat_map(|c| c.elem_mols.iter())
            .any(|m| m.compartment.is_relative());
        let has_surface = self.reactants.iter()
            .flat_map(|c| c.elem_mols.iter())
            .any(|m| m.is_surf());
        if relative && !has_surface {
            return Err(RuleError::UnresolvableCompartment { rule: self.name.clone() });
        }
        Ok(())
    }

    fn check_orientation(&self) -> Result<(), RuleError> {
        let oriented = self.reactants.iter().chain(self.products.iter())
            .any(|c| c.orientation != Orientation::None);
        let has_surface = self.reactants.iter().any(|c| c.is_surf() || c.is_reactive_surface());
        if oriented && !has_surface {
            return Err(RuleError::AmbiguousOrientation { rule: self.name.clone() });
        }
        Ok(())
    }

    /// BNGL rendering, e.g. `A(b) + B(a) -> A(b!1).B(a!1)`.
    pub fn to_str(&self, catalog: &Catalog) -> String {
        let side = |cs: &[Cplx]| {
            if cs.is_empty() {
                "0".to_string()
            } else {
                cs.iter().map(|c| c.to_str(catalog)).collect::<Vec<_>>().join(" + ")
            }
        };
        format!("{} -> {}", side(&self.reactants), side(&self.products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flags;
    use crate::Compartment;
    use crate::CplxBuilder;

    fn catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[("b", &[]), ("y", &["U", "P"])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[("a", &[])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("S", &[("r", &[])], 1e-8, Flags::SURF).unwrap();
        cat.define_molecule_type("W", &[], 0.0, Flags::REACTIVE_SURFACE).unwrap();
        let ec = cat.add_compartment(Compartment::new_volume("EC", Some(1.0))).unwrap();
        cat.add_compartment(Compartment::new_surface("PM", Some(1.0)).with_parent(ec)).unwrap();
        cat
    }

    fn a(cat: &Catalog) -> CplxBuilder<'_> {
        CplxBuilder::new(cat)
    }

    #[test]
    fn test_binding_rule_mapping() {
        let cat = catalog();
        let mut rule = RxnRule::new("bind",
            vec![a(&cat).mol("A").comp("b").build().unwrap(),
                 a(&cat).mol("B").comp("a").build().unwrap()],
            vec![a(&cat).mol("A").comp("b").bond(1).mol("B").comp("a").bond(1).build().unwrap()],
            1e6);
        rule.finalize(&cat).unwrap();

        assert!(rule.is_finalized());
        assert!(rule.is_bimol());
        assert!(rule.is_bimol_vol_rxn());
        assert_eq!(rule.get_mapping_for_reactant((0, 0)).unwrap().product, Some((0, 0)));
        assert_eq!(rule.get_mapping_for_reactant((1, 0)).unwrap().product, Some((0, 1)));
        assert!(rule.created_product_mols().is_empty());
        assert!(rule.deleted_reactant_mols().is_empty());
        assert_eq!(rule.to_str(&cat), "A(b) + B(a) -> A(b!1).B(a!1)");
    }

    #[test]
    fn test_degradation_and_synthesis() {
        let cat = catalog();
        let mut deg = RxnRule::new("deg", vec![a(&cat).mol("B").build().unwrap()], vec![], 1.0);
        deg.finalize(&cat).unwrap();
        assert_eq!(deg.deleted_reactant_mols(), vec![(0, 0)]);
        assert_eq!(deg.to_str(&cat), "B -> 0");

        let mut syn = RxnRule::new("syn",
            vec![a(&cat).mol("B").comp("a").build().unwrap()],
            vec![a(&cat).mol("B").comp("a").build().unwrap(),
                 a(&cat).mol("A").comp("b").comp("y").state("U").build().unwrap()],
            1.0);
        syn.finalize(&cat).unwrap();
        assert_eq!(syn.created_product_mols(), vec![(1, 0)]);

        let mut bad = RxnRule::new("syn",
            vec![a(&cat).mol("B").comp("a").build().unwrap()],
            vec![a(&cat).mol("B").comp("a").build().unwrap(),
                 a(&cat).mol("A").comp("b").build().unwrap()],
            1.0);
        assert!(matches!(bad.finalize(&cat), Err(RuleError::IncompleteCreatedMolecule { .. })));
    }

    #[test]
    fn test_invalid_rates() {
        let cat = catalog();
        let b = || vec![a(&cat).mol("B").build().unwrap()];
        let mut r = RxnRule::new("neg", b(), vec![], -1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::InvalidRate { .. })));
        let mut r = RxnRule::new("nan", b(), vec![], f64::NAN);
        assert!(matches!(r.finalize(&cat), Err(RuleError::InvalidRate { .. })));
        let mut r = RxnRule::new("var", b(), vec![], 1.0)
            .with_variable_rates(vec![RateChange { time: 1.0, rate: f64::INFINITY }]);
        assert!(matches!(r.finalize(&cat), Err(RuleError::InvalidRate { .. })));
    }

    #[test]
    fn test_reactant_count() {
        let cat = catalog();
        let b = || a(&cat).mol("B").build().unwrap();
        let mut r = RxnRule::new("tri", vec![b(), b(), b()], vec![], 1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::ReactantCount { found: 3, .. })));
        let mut r = RxnRule::new("zero", vec![], vec![b()], 1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::ReactantCount { found: 0, .. })));
    }

    #[test]
    fn test_dangling_bonds() {
        let cat = catalog();
        // a wildcard appears in the product only
        let mut r = RxnRule::new("wild",
            vec![a(&cat).mol("A").comp("b").build().unwrap()],
            vec![a(&cat).mol("A").comp("b").any_bond().build().unwrap()],
            1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::DanglingBond { .. })));

        // binding a site whose bond state is unknown
        let mut r = RxnRule::new("rebind",
            vec![a(&cat).mol("A").comp("b").maybe_bond().build().unwrap(),
                 a(&cat).mol("B").comp("a").build().unwrap()],
            vec![a(&cat).mol("A").comp("b").bond(1).mol("B").comp("a").bond(1).build().unwrap()],
            1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::DanglingBond { .. })));

        // releasing a context bond is fine
        let mut r = RxnRule::new("release",
            vec![a(&cat).mol("A").comp("b").any_bond().build().unwrap()],
            vec![a(&cat).mol("A").comp("b").build().unwrap()],
            1.0);
        assert!(r.finalize(&cat).is_ok());
    }

    #[test]
    fn test_dropped_component() {
        let cat = catalog();
        let mut r = RxnRule::new("drop",
            vec![a(&cat).mol("A").comp("b").comp("y").build().unwrap()],
            vec![a(&cat).mol("A").comp("b").build().unwrap()],
            1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::DroppedComponent { .. })));
    }

    #[test]
    fn test_explicit_mapping_type_mismatch() {
        let cat = catalog();
        let mut r = RxnRule::new("convert",
            vec![a(&cat).mol("A").build().unwrap()],
            vec![a(&cat).mol("B").build().unwrap()],
            1.0).with_mapping(vec![MolMapping { reactant: (0, 0), product: Some((0, 0)), components: vec![] }]);
        assert!(matches!(r.finalize(&cat), Err(RuleError::InvalidMapping { .. })));
    }

    #[test]
    fn test_relative_compartment_needs_surface() {
        let cat = catalog();
        let mut r = RxnRule::new("in",
            vec![a(&cat).mol("B").compartment("IN").build().unwrap()],
            vec![], 1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::UnresolvableCompartment { .. })));

        let mut r = RxnRule::new("in",
            vec![a(&cat).mol("S").comp("r").compartment("PM").build().unwrap()],
            vec![a(&cat).mol("S").comp("r").compartment("PM").build().unwrap(),
                 a(&cat).mol("B").comp("a").compartment("IN").build().unwrap()],
            1.0);
        assert!(r.finalize(&cat).is_ok());
        assert!(r.is_surf_rxn());
    }

    #[test]
    fn test_orientation_needs_surface() {
        let cat = catalog();
        let mut r = RxnRule::new("up",
            vec![a(&cat).mol("B").orientation(Orientation::Up).build().unwrap()],
            vec![], 1.0);
        assert!(matches!(r.finalize(&cat), Err(RuleError::AmbiguousOrientation { .. })));
    }

    #[test]
    fn test_boundary_rule() {
        let cat = catalog();
        let mut ok = RxnRule::new("refl",
            vec![a(&cat).mol("B").build().unwrap(), a(&cat).mol("W").build().unwrap()],
            vec![], 0.0).with_type(RxnType::Reflect);
        assert!(ok.finalize(&cat).is_ok());
        assert!(ok.is_reactive_surface_rxn());

        let mut bad = RxnRule::new("refl",
            vec![a(&cat).mol("B").build().unwrap()],
            vec![], 0.0).with_type(RxnType::Transparent);
        assert!(matches!(bad.finalize(&cat), Err(RuleError::InvalidBoundaryRule { .. })));
    }

    #[test]
    fn test_variable_rates() {
        let cat = catalog();
        let mut r = RxnRule::new("var", vec![a(&cat).mol("B").build().unwrap()], vec![], 1.0)
            .with_variable_rates(vec![
                RateChange { time: 2.0, rate: 3.0 },
                RateChange { time: 1.0, rate: 2.0 },
            ]);
        r.finalize(&cat).unwrap();
        assert_eq!(r.current_rate(), 1.0);
        assert_eq!(r.get_next_time_of_rate_update(), 1.0);
        assert!(!r.update_variable_rate(0.5));
        assert!(r.update_variable_rate(1.5));
        assert_eq!(r.current_rate(), 2.0);
        assert!(r.update_variable_rate(10.0));
        assert_eq!(r.current_rate(), 3.0);
        assert_eq!(r.get_next_time_of_rate_update(), f64::INFINITY);
    }

    #[test]
    fn test_template_equality() {
        let cat = catalog();
        let mut cat2 = cat.clone();
        let r = RxnRule::new("x", vec![a(&cat).mol("B").build().unwrap()], vec![], 1.0);
        let id = cat2.find_or_add_rxn_rule(r.clone());
        assert_eq!(cat2.find_or_add_rxn_rule(r.clone()), id);
        let other = RxnRule::new("x", vec![a(&cat).mol("B").build().unwrap()], vec![], 2.0);
        assert_ne!(cat2.find_or_add_rxn_rule(other), id);
    }
}

