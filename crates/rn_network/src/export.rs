//! BNGL export of an initialized engine.
//!
//! Produces the parameter, molecule type, compartment, seed species and
//! reaction rule sections. Bimolecular volume rates are given per molar
//! concentration and are converted for single-molecule semantics through
//! the `NA_V` and `VOL_RXN` parameters when the consumer is stochastic.
//! The `MCELL_REDEFINE_` prefix lets MCell use its own value for
//! `VOL_RXN` when the file is imported back.

use std::fmt;
use std::fmt::Write;

use rn_structure::MolWildcard;
use rn_structure::SURFACE_COMPARTMENT_THICKNESS;

use crate::Engine;

const IND: &str = "  ";
const PARAM_V: &str = "V";
const PARAM_NA_V: &str = "NA_V";
const PARAM_VOL_RXN: &str = "VOL_RXN";
const NA_VALUE_STR: &str = "6.02214e23";
const MCELL_REDEFINE_PREFIX: &str = "MCELL_REDEFINE_";
const MCELL_TIME_STEP: &str = "MCELL_TIME_STEP";
const MCELL_DIFFUSION_CONSTANT_3D_PREFIX: &str = "MCELL_DIFFUSION_CONSTANT_3D_";
const MCELL_DIFFUSION_CONSTANT_2D_PREFIX: &str = "MCELL_DIFFUSION_CONSTANT_2D_";
const COMPARTMENT_VOLUME_PREFIX: &str = "vol_";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Convert bimolecular volume rates for a stochastic consumer.
    /// Deterministic consumers get the rates unchanged.
    pub rates_for_nfsim: bool,
    /// Reaction volume in um^3. Defaults to the volume of the outermost
    /// compartments, or 1 if there are none.
    pub volume_um3: Option<f64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions { rates_for_nfsim: true, volume_um3: None }
    }
}

/// The exported sections. `error` holds the first problem found; the
/// sections are still complete apart from the offending entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BnglExport {
    pub parameters: String,
    pub molecule_types: String,
    pub compartments: String,
    pub seed_species: String,
    pub reaction_rules: String,
    pub error: Option<String>,
}

impl BnglExport {
    fn report(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(msg);
        }
    }
}

impl fmt::Display for BnglExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            &self.parameters,
            &self.molecule_types,
            &self.compartments,
            &self.seed_species,
            &self.reaction_rules,
        ];
        let mut first = true;
        for s in sections.into_iter().filter(|s| !s.is_empty()) {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", s)?;
            first = false;
        }
        Ok(())
    }
}

/// Short float rendering: plain notation for moderate magnitudes,
/// scientific otherwise.
fn f_to_str(x: f64) -> String {
    let a = x.abs();
    if x == 0.0 || (1e-3..1e6).contains(&a) {
        format!("{}", x)
    } else {
        format!("{:e}", x)
    }
}

fn default_volume(engine: &Engine) -> Result<f64, String> {
    let catalog = engine.get_data();
    let roots: Vec<_> = catalog.get_compartments().iter().filter(|c| !c.has_parent()).collect();
    if roots.is_empty() {
        return Ok(1.0);
    }
    let mut total = 0.0;
    for c in roots {
        total += catalog.get_volume_including_children(c.id, true)
            .ok_or_else(|| format!("Volume of compartment {} or one of its children is not set.", c.name))?;
    }
    Ok(total)
}

/// Serializes the engine's catalog and finalized rules.
pub fn export_to_bngl(engine: &Engine, opts: &ExportOptions) -> BnglExport {
    let catalog = engine.get_data();
    let config = engine.get_config();
    let mut out = BnglExport::default();
    let mut params = String::new();

    let volume = match opts.volume_um3 {
        Some(v) => v,
        None => default_volume(engine).unwrap_or_else(|e| {
            out.report(e);
            1.0
        }),
    };
    let _ = writeln!(params, "begin parameters");
    let _ = writeln!(params, "{IND}{PARAM_V} {} * 1e-15 # volume in litres", f_to_str(volume));
    let _ = writeln!(params, "{IND}{MCELL_TIME_STEP} {}", f_to_str(config.time_unit));
    for (name, value) in catalog.get_parameters() {
        let _ = writeln!(params, "{IND}{} {}", name, f_to_str(*value));
    }

    // Molecule types and their diffusion constants.
    let _ = writeln!(params, "\n{IND}# diffusion constants");
    let mut mol_types = String::from("begin molecule types\n");
    for (id, mt) in catalog.get_elem_mol_types().iter().enumerate() {
        if mt.is_reactive_surface() || MolWildcard::from_name(&mt.name).is_some() {
            continue;
        }
        let _ = writeln!(mol_types, "{IND}{}", catalog.elem_mol_type_to_str(id));
        let prefix = if mt.is_surf() {
            MCELL_DIFFUSION_CONSTANT_2D_PREFIX
        } else {
            MCELL_DIFFUSION_CONSTANT_3D_PREFIX
        };
        let _ = writeln!(params, "{IND}{}{} {}", prefix, mt.name, f_to_str(mt.diffusion_constant));
    }
    mol_types.push_str("end molecule types\n");
    out.molecule_types = mol_types;

    // Compartments, surfaces are counted as thin shells.
    if !catalog.get_compartments().is_empty() {
        let _ = writeln!(params, "\n{IND}# compartment volumes");
        let mut comps = String::from("begin compartments\n");
        for c in catalog.get_compartments_sorted_by_parents_first() {
            let param = format!("{}{}", COMPARTMENT_VOLUME_PREFIX, c.name);
            let size = if c.is_3d { c.get_volume() } else { c.get_area() };
            let Some(size) = size else {
                out.report(format!("Volume or area of compartment {} is not set.", c.name));
                continue;
            };
            if c.is_3d {
                let _ = writeln!(params, "{IND}{} {}", param, f_to_str(size));
            } else {
                let _ = writeln!(params, "{IND}{} {} * {}", param, f_to_str(size), SURFACE_COMPARTMENT_THICKNESS);
            }
            let dim = if c.is_3d { 3 } else { 2 };
            match c.parent_compartment_id {
                Some(p) => {
                    let _ = writeln!(comps, "{IND}{} {} {} {}", c.name, dim, param, catalog.get_compartment(p).name);
                }
                None => {
                    let _ = writeln!(comps, "{IND}{} {} {}", c.name, dim, param);
                }
            }
        }
        comps.push_str("end compartments\n");
        out.compartments = comps;
    }

    if !catalog.get_seed_species().is_empty() {
        let mut seeds = String::from("begin seed species\n");
        for seed in catalog.get_seed_species() {
            let _ = writeln!(seeds, "{IND}{} {}", seed.cplx.to_str(catalog), f_to_str(seed.count));
        }
        seeds.push_str("end seed species\n");
        out.seed_species = seeds;
    }

    // Rates and rules.
    let _ = writeln!(params, "\n{IND}# parameters to control rates in MCell and BioNetGen");
    let _ = writeln!(params, "{IND}{PARAM_NA_V} {NA_VALUE_STR} * {PARAM_V}");
    if opts.rates_for_nfsim {
        let _ = writeln!(params, "{IND}{PARAM_VOL_RXN} 1");
        let _ = writeln!(params, "{IND}{MCELL_REDEFINE_PREFIX}{PARAM_VOL_RXN} {PARAM_NA_V}");
    }
    let _ = writeln!(params, "\n{IND}# reaction rates");
    let mut rules = String::from("begin reaction rules\n");
    for (i, rule) in engine.get_all_rxns().get_rxn_rules().iter().enumerate() {
        let rxn_as_bngl = rule.to_str(catalog);
        if rule.rxn_type.is_special() || rule.is_surf_rxn() || rule.is_reactive_surface_rxn() {
            out.report(format!("Export of surface reactions to BNGL is not supported yet, error for {}.", rxn_as_bngl));
            continue;
        }
        let rate_param = format!("k{}", i);
        let conversion = if opts.rates_for_nfsim && rule.is_bimol_vol_rxn() {
            format!(" / {PARAM_NA_V} * {PARAM_VOL_RXN}")
        } else {
            String::new()
        };
        let rate = if rule.is_bimol_vol_rxn() {
            config.bimol_rate_in_mcell_units(rule.base_rate_constant, false)
        } else {
            rule.base_rate_constant
        };
        let _ = writeln!(params, "{IND}{} {}{}", rate_param, f_to_str(rate), conversion);
        let _ = writeln!(rules, "{IND}{} {}", rxn_as_bngl, rate_param);
    }
    rules.push_str("end reaction rules\n");
    out.reaction_rules = rules;

    params.push_str("end parameters\n");
    out.parameters = params;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_structure::Flags;
    use rn_structure::Catalog;
    use rn_structure::RxnRule;
    use rn_structure::RxnType;
    use rn_structure::Compartment;
    use rn_structure::CplxBuilder;
    use crate::EngineConfig;

    fn binding_catalog() -> Catalog {
        let mut cat = Catalog::new();
        cat.define_molecule_type("A", &[("b", &[]), ("y", &["U", "P"])], 1e-6, Flags::EMPTY).unwrap();
        cat.define_molecule_type("B", &[("a", &[])], 2e-6, Flags::EMPTY).unwrap();
        let bind = RxnRule::new(
            "bind",
            vec![
                CplxBuilder::new(&cat).mol("A").comp("b").build().unwrap(),
                CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap(),
            ],
            vec![CplxBuilder::new(&cat).mol("A").comp("b").bond(1).mol("B").comp("a").bond(1).build().unwrap()],
            1e6,
        );
        let phos = RxnRule::new(
            "phos",
            vec![CplxBuilder::new(&cat).mol("A").comp("y").state("U").build().unwrap()],
            vec![CplxBuilder::new(&cat).mol("A").comp("y").state("P").build().unwrap()],
            0.5,
        );
        cat.find_or_add_rxn_rule(bind);
        cat.find_or_add_rxn_rule(phos);
        let seed = CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap();
        cat.add_seed_species(seed, 100.0);
        cat
    }

    fn engine(cat: Catalog) -> Engine {
        let mut engine = Engine::new(cat, EngineConfig::default());
        engine.initialize();
        engine
    }

    #[test]
    fn test_export_sections() {
        let e = engine(binding_catalog());
        let out = export_to_bngl(&e, &ExportOptions { rates_for_nfsim: true, volume_um3: Some(0.125) });
        assert_eq!(out.error, None);

        assert_eq!(out.molecule_types, "begin molecule types\n  A(b,y~U~P)\n  B(a)\nend molecule types\n");
        assert_eq!(out.reaction_rules,
            "begin reaction rules\n  A(b) + B(a) -> A(b!1).B(a!1) k0\n  A(y~U) -> A(y~P) k1\nend reaction rules\n");
        assert_eq!(out.seed_species, "begin seed species\n  B(a) 100\nend seed species\n");
        assert!(out.compartments.is_empty());

        let p = &out.parameters;
        assert!(p.starts_with("begin parameters\n  V 0.125 * 1e-15 # volume in litres\n"));
        assert!(p.contains("  MCELL_DIFFUSION_CONSTANT_3D_A 1e-6\n"));
        assert!(p.contains("  MCELL_DIFFUSION_CONSTANT_3D_B 2e-6\n"));
        assert!(p.contains("  NA_V 6.02214e23 * V\n"));
        assert!(p.contains("  VOL_RXN 1\n"));
        assert!(p.contains("  MCELL_REDEFINE_VOL_RXN NA_V\n"));
        assert!(p.contains("  k0 1e6 / NA_V * VOL_RXN\n"));
        assert!(p.contains("  k1 0.5\n"));
        assert!(p.ends_with("end parameters\n"));
        assert!(!p.contains("ALL_MOLECULES"));

        let text = out.to_string();
        assert!(text.contains("end parameters\n\nbegin molecule types"));
    }

    #[test]
    fn test_deterministic_rates() {
        let e = engine(binding_catalog());
        let out = export_to_bngl(&e, &ExportOptions { rates_for_nfsim: false, volume_um3: None });
        assert!(out.parameters.contains("  k0 1e6\n"));
        assert!(!out.parameters.contains("VOL_RXN"));
        assert!(out.parameters.contains("  V 1 * 1e-15"));
    }

    #[test]
    fn test_bng_units_are_converted() {
        let config = EngineConfig { use_bng_units: true, ..EngineConfig::default() };
        let mut e = Engine::new(binding_catalog(), config);
        e.initialize();
        let out = export_to_bngl(&e, &ExportOptions { rates_for_nfsim: false, volume_um3: Some(1.0) });
        let k0 = 1e6 * 6.02214076e23 * 1e-15;
        assert!(out.parameters.contains(&format!("  k0 {:e}\n", k0)));
        assert!(out.parameters.contains("  k1 0.5\n"));
    }

    #[test]
    fn test_compartments() {
        let mut cat = binding_catalog();
        let ec = cat.add_compartment(Compartment::new_volume("EC", Some(10.0))).unwrap();
        let pm = cat.add_compartment(Compartment::new_surface("PM", Some(2.0)).with_parent(ec)).unwrap();
        cat.add_compartment(Compartment::new_volume("CP", Some(1.0)).with_parent(pm)).unwrap();
        let e = engine(cat);
        assert!((default_volume(&e).unwrap() - 11.02).abs() < 1e-12);
        let out = export_to_bngl(&e, &ExportOptions::default());
        assert_eq!(out.error, None);
        assert_eq!(out.compartments,
            "begin compartments\n  EC 3 vol_EC\n  PM 2 vol_PM EC\n  CP 3 vol_CP PM\nend compartments\n");
        assert!(out.parameters.contains("  vol_PM 2 * 0.01\n"));
    }

    #[test]
    fn test_unset_compartment_volume_is_an_error() {
        let mut cat = binding_catalog();
        cat.add_compartment(Compartment::new_volume("EC", None)).unwrap();
        let out = export_to_bngl(&engine(cat), &ExportOptions { rates_for_nfsim: true, volume_um3: Some(1.0) });
        assert_eq!(out.error.as_deref(), Some("Volume or area of compartment EC is not set."));
        assert_eq!(out.compartments, "begin compartments\nend compartments\n");
        assert!(out.reaction_rules.contains("k1"));
    }

    #[test]
    fn test_surface_rules_are_not_exported() {
        let mut cat = binding_catalog();
        cat.define_molecule_type("W", &[], 0.0, Flags::REACTIVE_SURFACE).unwrap();
        let reflect = RxnRule::new(
            "reflect",
            vec![
                CplxBuilder::new(&cat).mol("B").comp("a").build().unwrap(),
                CplxBuilder::new(&cat).mol("W").build().unwrap(),
            ],
            vec![],
            0.0,
        ).with_type(RxnType::Reflect);
        cat.find_or_add_rxn_rule(reflect);
        let out = export_to_bngl(&engine(cat), &ExportOptions::default());
        assert_eq!(out.error.as_deref(),
            Some("Export of surface reactions to BNGL is not supported yet, error for B(a) + W -> 0."));
        assert!(out.reaction_rules.contains("A(y~U) -> A(y~P) k1"));
        assert!(!out.molecule_types.contains("W"));
    }
}
