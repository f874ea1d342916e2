use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use log::info;
use colored::*;
use env_logger::Builder;
use clap::Parser;
use clap::ArgAction;
use anyhow::Result;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;

use rn_network::Engine;
use rn_network::explore::generate_network_with;

use rulenet::catalog_parsers::read_catalog_input;
use rulenet::network_parsers::EngineArguments;
use rulenet::network_parsers::ExplorationArguments;

#[derive(Debug, Parser)]
#[command(name = "rn-network")]
#[command(version, about = "Generate the reaction network reachable from the seed species")]
pub struct Cli {
    /// Catalog file (JSON), or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Write the network in .net layout to this file.
    #[arg(long, value_name = "FILE")]
    net: Option<PathBuf>,

    /// Verbosity (-v = info, -vv = debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(flatten, next_help_heading = "Engine parameters")]
    engine: EngineArguments,

    #[command(flatten, next_help_heading = "Exploration limits")]
    exploration: ExplorationArguments,
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
    let limits = cli.exploration.build_limits()?;
    let catalog = read_catalog_input(&cli.input)?;
    info!("Engine configuration: {:?}", config);

    let mut engine = Engine::new(catalog, config);
    engine.initialize();
    for rejected in engine.get_rejected_rules() {
        println!("{} {}", "Rejected rule".red(), rejected.error);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")?
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = generate_network_with(&mut engine, &limits, |done, queued| {
        pb.set_message(format!("{} species expanded, {} queued", done, queued));
    });
    pb.finish_and_clear();
    let network = result?;
    for (class, rule) in engine.get_ignored_rules() {
        let rule = engine.get_all_rxns().get_rxn_rule(rule);
        println!("{} {} for {}", "Ignored rule".yellow(), rule.name,
            engine.rxn_class(class).reactants_to_str(engine.get_all_species()));
    }

    println!("{}", "Reactions:".yellow());
    println!("{}", network.report(&engine));
    println!("{} {} species, {} reaction classes, {} pathways",
        "Network:".green(),
        network.num_species(),
        network.num_rxn_classes(),
        network.num_pathways(&engine));
    info!("{}", engine.get_stats_report());

    if let Some(path) = cli.net {
        std::fs::write(&path, network.to_net(&engine))?;
        println!("Network written to {}", path.display());
    }
    Ok(())
}
