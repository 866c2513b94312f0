mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // .env is optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::loader::load_config(&cli.config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    observability::apply_logging_level(&cfg.logging.level);

    let registry = cfg.registry().context("Failed to compile access contexts")?;
    tracing::debug!(contexts = registry.len(), "Loaded access contexts");

    match &cli.command {
        Commands::Compile(args) => commands::compile::run(&registry, args)?,
        Commands::Check(args) => commands::check::run(&registry, args)?,
        Commands::Contexts => commands::contexts::run(&registry)?,
    }

    Ok(())
}
