use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "myberkeley-dynamiclist")]
#[command(about = "Compile and check myBerkeley dynamic list criteria")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file with the access contexts
    #[arg(
        short,
        long,
        global = true,
        env = "MYBERKELEY_CONFIG",
        default_value = "myberkeley.toml"
    )]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile criteria into a demographic search query
    Compile(CompileArgs),
    /// Check whether paths are allowed by a context
    Check(CheckArgs),
    /// List configured contexts
    Contexts,
}

#[derive(clap::Args)]
pub struct CompileArgs {
    /// Context id (e.g. myb-ced-students)
    #[arg(long)]
    pub context: String,
    /// Criteria expression, or a single bare path
    pub criteria: String,
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Context id
    #[arg(long)]
    pub context: String,
    /// Check against the allowed filters instead of the allowed criteria
    #[arg(long)]
    pub filter: bool,
    /// Demographic paths to check
    #[arg(required = true)]
    pub paths: Vec<String>,
}
