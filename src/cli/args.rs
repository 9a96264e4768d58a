//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    breakeven::BreakevenArgs, completions::CompletionsArgs, cost::CostArgs, derive::DeriveArgs,
    finance::FinanceArgs, init::InitArgs, list::ListArgs, params::ParamsArgs, report::ReportArgs,
    simulate::SimulateArgs,
};

#[derive(Parser)]
#[command(name = "pbfe")]
#[command(author, version, about = "Powder-bed-fusion economics")]
#[command(long_about = "Cost, financial, break-even and Monte Carlo analysis of metal powder-bed-fusion builds described in plain YAML job files.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// YAML file with the global default parameters
    #[arg(long, global = true, env = "PBFE_DEFAULTS")]
    pub defaults: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter job file
    Init(InitArgs),

    /// Build time, layer count and powder mass
    Derive(DeriveArgs),

    /// Cost breakdown by category
    Cost(CostArgs),

    /// Profitability, investment metrics and viability
    Finance(FinanceArgs),

    /// Break-even scenarios, risk and price what-ifs
    #[command(alias = "be")]
    Breakeven(BreakevenArgs),

    /// Monte Carlo simulation of cost and investment outcomes
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Markdown report combining every analysis
    Report(ReportArgs),

    /// One-line economics summary for every job under a directory
    List(ListArgs),

    /// Print the resolved global default parameters
    Params(ParamsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary on a terminal
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Md,
}

impl OutputFormat {
    /// Parse a config-file format name
    pub fn from_config(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}
