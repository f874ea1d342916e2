use std::io::Write;
use std::path::PathBuf;
use colored::*;
use env_logger::Builder;
use clap::Parser;
use clap::ArgAction;
use anyhow::Result;
use anyhow::bail;

use rn_network::Engine;
use rn_network::export::export_to_bngl;

use rulenet::catalog_parsers::read_catalog_input;
use rulenet::network_parsers::EngineArguments;
use rulenet::network_parsers::ExportArguments;

#[derive(Debug, Parser)]
#[command(name = "rn-export")]
#[command(version, about = "Export a catalog and its rules as BNGL")]
pub struct Cli {
    /// Catalog file (JSON), or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Output file, stdout if not given.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten, next_help_heading = "Engine parameters")]
    engine: EngineArguments,

    #[command(flatten, next_help_heading = "Export parameters")]
    export: ExportArguments,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.engine.build_config(cli.verbose)?;
    let options = cli.export.build_options()?;
    let catalog = read_catalog_input(&cli.input)?;

    let mut engine = Engine::new(catalog, config);
    engine.initialize();
    for rejected in engine.get_rejected_rules() {
        eprintln!("{} {}", "Rejected rule".red(), rejected.error);
    }

    let bngl = export_to_bngl(&engine, &options);
    match &cli.output {
        Some(path) => std::fs::write(path, bngl.to_string())?,
        None => print!("{}", bngl),
    }

    if let Some(msg) = bngl.error {
        bail!("{}", msg);
    }
    Ok(())
}
