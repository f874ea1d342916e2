use std::path::PathBuf;
use clap::Args;
use anyhow::Result;
use anyhow::bail;
use log::debug;

use rn_network::EngineConfig;
use rn_network::explore::ExplorationLimits;
use rn_network::export::ExportOptions;

use crate::catalog_parsers::read_engine_config_file;

/// Units of the engine.
#[derive(Debug, Args)]
pub struct EngineArguments {
    /// Engine configuration (JSON). Command-line values override it.
    #[arg(long, value_name = "FILE")]
    pub engine_config: Option<PathBuf>,

    /// Time unit in seconds
    #[arg(long)]
    pub time_unit: Option<f64>,

    /// Length unit in um
    #[arg(long)]
    pub length_unit: Option<f64>,

    /// Bimolecular rates are given in um^3 N^-1 s^-1
    #[arg(long)]
    pub bng_units: bool,
}

impl EngineArguments {
    pub fn build_config(&self, verbosity: u8) -> Result<EngineConfig> {
        let mut config = if let Some(path) = &self.engine_config {
            debug!("Using engine configuration: {:?}", path);
            read_engine_config_file(path)?
        } else {
            EngineConfig::default()
        };
        if let Some(t) = self.time_unit {
            config.time_unit = t;
        }
        if let Some(l) = self.length_unit {
            config.length_unit = l;
        }
        config.use_bng_units |= self.bng_units;
        config.verbosity = verbosity;
        if !(config.time_unit > 0.0 && config.length_unit > 0.0) {
            bail!("time-unit ({}) and length-unit ({}) must be positive", config.time_unit, config.length_unit);
        }
        Ok(config)
    }
}

/// Caps on the combinatorial expansion.
#[derive(Debug, Args)]
pub struct ExplorationArguments {
    /// Stop when more species than this were found.
    #[arg(long, default_value_t = 10_000)]
    pub max_species: usize,

    /// Stop after expanding this many species (0 = no limit).
    #[arg(long, default_value_t = 0)]
    pub max_iterations: usize,
}

impl ExplorationArguments {
    pub fn build_limits(&self) -> Result<ExplorationLimits> {
        if self.max_species == 0 {
            bail!("max-species must be > 0");
        }
        Ok(ExplorationLimits {
            max_species: Some(self.max_species),
            max_iterations: (self.max_iterations > 0).then_some(self.max_iterations),
        })
    }
}

/// BNGL export parameters.
#[derive(Debug, Args)]
pub struct ExportArguments {
    /// Keep bimolecular rates in M^-1 s^-1 (for ODE-based tools).
    #[arg(long)]
    pub ode: bool,

    /// Reaction volume in um^3 (defaults to the outermost compartments).
    #[arg(long)]
    pub volume: Option<f64>,
}

impl ExportArguments {
    pub fn build_options(&self) -> Result<ExportOptions> {
        if let Some(v) = self.volume {
            if !(v > 0.0) {
                bail!("volume must be > 0 (got {})", v);
            }
        }
        Ok(ExportOptions { rates_for_nfsim: !self.ode, volume_um3: self.volume })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        engine: EngineArguments,
        #[command(flatten)]
        exploration: ExplorationArguments,
        #[command(flatten)]
        export: ExportArguments,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.engine.build_config(0).unwrap(), EngineConfig::default());
        let limits = cli.exploration.build_limits().unwrap();
        assert_eq!(limits.max_species, Some(10_000));
        assert_eq!(limits.max_iterations, None);
        assert_eq!(cli.export.build_options().unwrap(), ExportOptions::default());
    }

    #[test]
    fn test_overrides() {
        let cli = TestCli::parse_from([
            "test", "--time-unit", "1e-5", "--bng-units", "--max-iterations", "3", "--ode", "--volume", "2.5",
        ]);
        let config = cli.engine.build_config(2).unwrap();
        assert_eq!(config.time_unit, 1e-5);
        assert!(config.use_bng_units);
        assert_eq!(config.verbosity, 2);
        assert_eq!(cli.exploration.build_limits().unwrap().max_iterations, Some(3));
        let opts = cli.export.build_options().unwrap();
        assert!(!opts.rates_for_nfsim);
        assert_eq!(opts.volume_um3, Some(2.5));
    }

    #[test]
    fn test_invalid_values() {
        let cli = TestCli::parse_from(["test", "--length-unit=-1", "--max-species", "0", "--volume", "0"]);
        assert!(cli.engine.build_config(0).is_err());
        assert!(cli.exploration.build_limits().is_err());
        assert!(cli.export.build_options().is_err());
    }
}
