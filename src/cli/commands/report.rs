//! `pbfe report` command - Combined economics report

use chrono::Utc;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::analysis::monte_carlo::{
    default_workers, MonteCarloSimulator, SimulationSettings, SimulationSummary,
};
use crate::cli::commands::utils::{Analysis, Session};
use crate::cli::commands::{breakeven, cost, derive, finance, simulate};
use crate::cli::output::key_value_table;
use crate::cli::OutputFormat;
use crate::entities::Job;

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Job file path or job ID
    pub job: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Monte Carlo iterations (default: from config, then the job parameters)
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Seed for a reproducible simulation section
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (default: available cores minus one)
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// SQLite cache file shared with `pbfe simulate`
    #[arg(long, value_name = "FILE", conflicts_with = "no_cache")]
    pub cache: Option<PathBuf>,

    /// Always sample afresh, never read or write cached results
    #[arg(long)]
    pub no_cache: bool,

    /// Leave out the simulation section
    #[arg(long)]
    pub no_simulation: bool,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    job: &'a Job,
    #[serde(flatten)]
    analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<ReportSimulation>,
}

#[derive(Debug, Serialize)]
struct ReportSimulation {
    from_cache: bool,
    #[serde(flatten)]
    summary: SimulationSummary,
}

pub fn run(args: ReportArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let inputs = job.inputs(&session.parameters);
    let analysis = Analysis::run(&inputs)?;

    let simulation = if args.no_simulation {
        None
    } else {
        let settings = SimulationSettings {
            workers: args
                .workers
                .or(session.config.workers)
                .unwrap_or_else(default_workers),
            seed: args.seed,
            ..SimulationSettings::new(
                args.iterations
                    .or(session.config.iterations)
                    .unwrap_or(inputs.parameters.monte_carlo_iterations),
            )
        };
        let simulator = MonteCarloSimulator::new(inputs, settings)?;
        let run = match simulate::open_cache(args.cache.clone(), args.no_cache, session) {
            Some(cache) => simulator.run_cached(cache.as_ref(), &job.id, None)?,
            None => simulator.run(None)?,
        };
        Some(ReportSimulation {
            from_cache: run.from_cache,
            summary: run.results.summarize(None),
        })
    };

    let report = Report {
        job: &job,
        analysis,
        simulation,
    };

    let content = match session.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report).into_diagnostic()? + "\n",
        OutputFormat::Yaml => serde_yml::to_string(&report).into_diagnostic()?,
        OutputFormat::Md | OutputFormat::Auto => markdown(&report),
    };
    write_output(&content, args.output, session)
}

fn markdown(report: &Report<'_>) -> String {
    let job = report.job;
    let a = &report.analysis;
    let mut out = format!("# Economics Report: {}\n\n", job.label());
    out.push_str(&key_value_table(&[
        ("Job", job.id.to_string()),
        ("Part", job.part.name.clone()),
        ("Machine", job.machine.name.clone()),
        ("Material", job.material.name.clone()),
        ("Parts per build", job.part.parts_per_build.to_string()),
        (
            "Parameters",
            if job.parameters.is_custom() { "custom" } else { "global defaults" }.to_string(),
        ),
        ("Generated", Utc::now().format("%Y-%m-%d %H:%M UTC").to_string()),
    ]));

    for section in [
        derive::markdown(&a.cost.derived),
        cost::markdown(&a.cost, true),
        finance::markdown(&a.financial, true),
        breakeven::markdown(&a.break_even),
    ] {
        out.push('\n');
        out.push_str(&section);
    }
    if let Some(sim) = &report.simulation {
        out.push('\n');
        out.push_str(&simulate::markdown(&sim.summary));
        if sim.from_cache {
            out.push_str("\n_Simulation results served from the cache._\n");
        }
    }
    out
}

fn write_output(content: &str, output_path: Option<PathBuf>, session: &Session) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            session.status("✓", format!("Report written to {}", path.display()));
        }
        None => print!("{}", content),
    }
    Ok(())
}
