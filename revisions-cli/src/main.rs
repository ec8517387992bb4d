//! Revisions CLI
//!
//! Creates, lists, applies and reverts hash-chained revisions. Exits 0 on success and 1
//! on any error.

use clap::Parser;
use revisions::config::RevisionsConfig;
use revisions_cli::cli::{Cli, Commands, GlobalArgs};
use revisions_cli::commands;
use revisions_cli::settings::Settings;
use std::process;

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.global.quiet {
        "error"
    } else if cli.global.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let global = &cli.global;
    match cli.command {
        Commands::Init { force } => init(global, force),
        Commands::New { description } => {
            let path = commands::new_revision(&settings(global)?, &description)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Version { json } => commands::version(&settings(global)?, json),
        Commands::List { json } => commands::list(&settings(global)?, json),
        Commands::Up { dry_run } => commands::up(&settings(global)?, dry_run),
        Commands::Down { dry_run } => commands::down(&settings(global)?, dry_run),
    }
}

fn settings(global: &GlobalArgs) -> anyhow::Result<Settings> {
    let settings = Settings::resolve(global)?;
    log::debug!(
        "namespace {} in {}",
        settings.config.namespace,
        settings.directory().display()
    );
    Ok(settings)
}

fn init(global: &GlobalArgs, force: bool) -> anyhow::Result<()> {
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(RevisionsConfig::config_path);
    let report = commands::init(&config_path, global, force)?;
    if !global.quiet {
        println!("✅ Wrote {}", report.config_path.display());
        println!("   Revisions go in {}", report.directory.display());
    }
    Ok(())
}
