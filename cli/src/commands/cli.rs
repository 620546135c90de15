use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "agentstack", version, about = "Run declarative agent stacks")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file. Defaults to ~/.agentstack/config.toml, then ./agentstack.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    /// Stack spec file (.toml or .json)
    pub spec: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    pub spec: PathBuf,

    /// Print the batches as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    pub spec: PathBuf,

    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Stop starting new batches after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Default per-agent timeout
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value = "echo")]
    pub adapter: String,

    /// Keep the context store after the run
    #[arg(long)]
    pub retain_context: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a stack for duplicate ids, unknown dependencies and cycles
    Validate(ValidateArgs),
    /// Show the execution batches
    Plan(PlanArgs),
    /// Execute a stack
    Run(RunArgs),
}
