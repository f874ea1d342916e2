use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Cursor};
use std::path::Path;

use anyhow::{bail, Result};
use log::debug;
use paste::paste;

use rn_structure::Catalog;
use rn_network::EngineConfig;

// ============================================================
//  Base readers
// ============================================================

/// Reads a catalog serialized as JSON. The compartment forest is rebuilt
/// from the parent ids and the seed species are checked against the
/// declared types.
pub fn read_catalog<R: BufRead>(reader: R) -> Result<Catalog> {
    let mut catalog: Catalog = serde_json::from_reader(reader)?;
    catalog.link_compartments()?;
    catalog.check_seed_species()?;
    debug!("Read catalog with {} molecule types, {} compartments, {} rules and {} seed species.",
        catalog.get_elem_mol_types().len(), catalog.get_compartments().len(),
        catalog.get_rxn_rules().len(), catalog.get_seed_species().len());
    Ok(catalog)
}

/// Reads an engine configuration, missing fields take their defaults.
pub fn read_engine_config<R: BufRead>(reader: R) -> Result<EngineConfig> {
    let config: EngineConfig = serde_json::from_reader(reader)?;
    if !(config.time_unit > 0.0 && config.length_unit > 0.0) {
        bail!("Time and length units must be positive (got {} and {})", config.time_unit, config.length_unit);
    }
    Ok(config)
}

// ============================================================
//  Macro generating file/string/stdin/input helpers
// ============================================================

/// Generate input adapters for a base reader `fn base<R: BufRead>(R) -> Result<T>`.
///
/// This expands into:
/// - `base_string(&str)`
/// - `base_file<P: AsRef<Path>>(P)`
/// - `base_stdin()`
/// - `base_input(&str)`  (dispatches "-" → stdin, otherwise → file)
macro_rules! define_input_variants {
    ($base:ident, $ret:ty) => {
        paste! {
            /// Read from a string buffer.
            pub fn [<$base _string>](s: &str) -> $ret {
                $base(Cursor::new(s))
            }

            /// Read from a file path.
            pub fn [<$base _file>]<P: AsRef<Path>>(path: P) -> $ret {
                let reader = BufReader::new(File::open(path)?);
                $base(reader)
            }

            /// Read from stdin.
            pub fn [<$base _stdin>]() -> $ret {
                let reader = BufReader::new(stdin());
                $base(reader)
            }

            /// Read either from stdin ("-") or a file path.
            pub fn [<$base _input>](s: &str) -> $ret {
                if s == "-" {
                    [<$base _stdin>]()
                } else {
                    [<$base _file>](s)
                }
            }
        }
    };
}

define_input_variants!(read_catalog, Result<Catalog>);
define_input_variants!(read_engine_config, Result<EngineConfig>);
