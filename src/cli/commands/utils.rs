//! Shared utilities for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use crate::analysis::break_even::{BreakEvenAnalyzer, BreakEvenSummary};
use crate::analysis::cost::CostBreakdown;
use crate::analysis::financial::FinancialSummary;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::loader;
use crate::core::ModelError;
use crate::entities::{EffectiveParameters, Job, JobInputs};

/// Resolved configuration shared by every command invocation
pub struct Session {
    pub config: Config,
    /// Global default parameters jobs fall back to
    pub parameters: EffectiveParameters,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Session {
    /// Merge config layers with the global flags and load the default parameters
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let mut config = Config::load();
        if let Some(path) = &global.defaults {
            config.defaults_file = Some(path.clone());
        }
        let parameters = config.global_parameters()?;

        let format = match global.format {
            OutputFormat::Auto => config
                .default_format
                .as_deref()
                .and_then(OutputFormat::from_config)
                .unwrap_or(OutputFormat::Auto),
            explicit => explicit,
        };

        Ok(Self {
            config,
            parameters,
            format,
            quiet: global.quiet,
        })
    }

    /// Load a job from a path or a (partial) ID under the working directory
    pub fn load_job(&self, arg: &str) -> Result<(PathBuf, Job)> {
        let cwd = std::env::current_dir().into_diagnostic()?;
        let path = loader::resolve_job(arg, &cwd)?;
        let job = Job::load(&path)?;
        debug!(path = %path.display(), job = %job.id, "loaded job");
        Ok((path, job))
    }

    /// Status line on stdout unless `--quiet` or a machine-readable format
    pub fn status(&self, symbol: &str, message: impl std::fmt::Display) {
        if !self.quiet && !matches!(self.format, OutputFormat::Json | OutputFormat::Yaml) {
            println!("{} {}", style(symbol).cyan(), message);
        }
    }
}

/// Deterministic outputs of one job
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub cost: CostBreakdown,
    pub financial: FinancialSummary,
    pub break_even: BreakEvenSummary,
}

impl Analysis {
    pub fn run(inputs: &JobInputs<'_>) -> Result<Self, ModelError> {
        let cost = CostBreakdown::compute(inputs)?;
        let financial = FinancialSummary::compute(inputs, &cost)?;
        let break_even = BreakEvenAnalyzer::new(inputs, &cost, &financial)?.summary();
        Ok(Self {
            cost,
            financial,
            break_even,
        })
    }
}
