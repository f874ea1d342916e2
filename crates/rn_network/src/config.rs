use serde::{Serialize, Deserialize};
use log::debug;

use rn_structure::Catalog;
use rn_structure::SURFACE_COMPARTMENT_THICKNESS;

/// Conversion of cm^2/s into um^2/s.
const CM2_TO_UM2: f64 = 1.0e8;
const AVOGADRO: f64 = 6.02214076e23;
/// Litres per um^3.
const UM3_TO_L: f64 = 1.0e-15;

/// Units and switches shared by every part of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation time unit in seconds.
    pub time_unit: f64,
    /// Internal length unit in um.
    pub length_unit: f64,
    /// Rates are given in BioNetGen units (um^3 N^-1 s^-1) instead of
    /// M^-1 s^-1.
    pub use_bng_units: bool,
    /// Warn about species that do not diffuse.
    pub debug_requires_diffusion_constants: bool,
    pub verbosity: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            time_unit: 1e-6,
            length_unit: 0.01,
            use_bng_units: false,
            debug_requires_diffusion_constants: false,
            verbosity: 0,
        }
    }
}

impl EngineConfig {
    pub fn rcp_length_unit(&self) -> f64 {
        1.0 / self.length_unit
    }

    /// Time step (in time units) and space step (in length units) of a
    /// molecule with diffusion constant `d` (cm^2/s). A positive custom
    /// time step (s) or custom space step (um) takes precedence over the
    /// default time step of one time unit.
    pub fn get_space_and_time_step(
        &self,
        is_surf: bool,
        d: f64,
        custom_time_step: f64,
        custom_space_step: f64,
    ) -> (f64, f64) {
        if d == 0.0 {
            return (1.0, 0.0);
        }
        if custom_time_step > 0.0 {
            let space = (4.0 * CM2_TO_UM2 * d * custom_time_step).sqrt() * self.rcp_length_unit();
            (custom_time_step / self.time_unit, space)
        } else if custom_space_step > 0.0 {
            let s2 = custom_space_step * custom_space_step;
            let seconds = if is_surf {
                s2 * std::f64::consts::PI / (4.0 * CM2_TO_UM2 * d)
            } else {
                s2 * std::f64::consts::PI / (16.0 * CM2_TO_UM2 * d)
            };
            (seconds / self.time_unit, custom_space_step * self.rcp_length_unit())
        } else {
            let space = (4.0 * CM2_TO_UM2 * d * self.time_unit).sqrt() * self.rcp_length_unit();
            (1.0, space)
        }
    }

    /// A bimolecular rate constant in M^-1 s^-1 for volume reactions, or
    /// um^2 N^-1 s^-1 between two surface molecules. Rates given in
    /// BioNetGen units are converted, everything else is returned as is.
    pub fn bimol_rate_in_mcell_units(&self, rate: f64, surf_surf: bool) -> f64 {
        if !self.use_bng_units {
            rate
        } else if surf_surf {
            rate / SURFACE_COMPARTMENT_THICKNESS
        } else {
            rate * AVOGADRO * UM3_TO_L
        }
    }

    /// Fills in the time and space steps of all molecule types.
    pub fn initialize_elem_mol_type_steps(&self, catalog: &mut Catalog) {
        for mt in catalog.get_elem_mol_types_mut() {
            let (t, s) = self.get_space_and_time_step(
                mt.is_surf(), mt.diffusion_constant, mt.custom_time_step, mt.custom_space_step);
            mt.time_step = t;
            mt.space_step = s;
            debug!("Molecule type {}: time step {}, space step {}.", mt.name, t, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rn_structure::Flags;

    #[test]
    fn test_default_steps() {
        let config = EngineConfig::default();
        let (t, s) = config.get_space_and_time_step(false, 1e-6, 0.0, 0.0);
        assert_eq!(t, 1.0);
        // sqrt(4 * 1e8 * 1e-6 * 1e-6) um = 0.02 um = 2 length units
        assert!((s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_steps() {
        let config = EngineConfig::default();
        let (t, s) = config.get_space_and_time_step(false, 1e-6, 4e-6, 0.0);
        assert!((t - 4.0).abs() < 1e-9);
        assert!((s - 4.0).abs() < 1e-9);

        let (t_vol, s_vol) = config.get_space_and_time_step(false, 1e-6, 0.0, 0.05);
        let (t_surf, s_surf) = config.get_space_and_time_step(true, 1e-6, 0.0, 0.05);
        assert!((s_vol - 5.0).abs() < 1e-9);
        assert_eq!(s_vol, s_surf);
        assert!((t_surf / t_vol - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_diffusing() {
        let config = EngineConfig::default();
        assert_eq!(config.get_space_and_time_step(true, 0.0, 1e-3, 0.0), (1.0, 0.0));
    }

    #[test]
    fn test_initialize_catalog_steps() {
        let mut cat = Catalog::new();
        let a = cat.define_molecule_type("A", &[], 1e-6, Flags::EMPTY).unwrap();
        let config = EngineConfig::default();
        config.initialize_elem_mol_type_steps(&mut cat);
        assert_eq!(cat.get_elem_mol_type(a).time_step, 1.0);
        assert!(cat.get_elem_mol_type(a).space_step > 0.0);
    }

    #[test]
    fn test_bng_units() {
        let mut config = EngineConfig::default();
        assert_eq!(config.bimol_rate_in_mcell_units(1e6, false), 1e6);
        config.use_bng_units = true;
        assert!((config.bimol_rate_in_mcell_units(1.0, false) - 6.02214076e8).abs() < 1e-3);
        assert!((config.bimol_rate_in_mcell_units(1.0, true) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{ "time_unit": 1e-5 }"#).unwrap();
        assert_eq!(config.time_unit, 1e-5);
        assert_eq!(config.length_unit, 0.01);
        assert!(!config.use_bng_units);
    }
}
