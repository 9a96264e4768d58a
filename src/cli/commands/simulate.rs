//! `pbfe simulate` command - Monte Carlo simulation

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::warn;

use crate::analysis::monte_carlo::{
    default_workers, write_records_csv, MonteCarloSimulator, SimulationSettings, SimulationSummary,
};
use crate::analysis::statistics::{Histogram, MetricSummary, DEFAULT_BINS};
use crate::cli::commands::utils::Session;
use crate::cli::helpers::{format_money, format_percent};
use crate::cli::output::{emit, markdown_table};
use crate::core::cache::{SimulationCache, SqliteCache};
use crate::core::identity::EntityId;

#[derive(clap::Args, Debug)]
pub struct SimulateArgs {
    /// Job file path or job ID
    pub job: String,

    /// Number of iterations (default: from config, then the job parameters)
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (default: available cores minus one)
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Include histograms of every output metric
    #[arg(long)]
    pub histogram: bool,

    /// Histogram bucket count
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Write every iteration to a CSV file
    #[arg(long, value_name = "FILE")]
    pub samples: Option<PathBuf>,

    /// SQLite cache file (default: user cache directory)
    #[arg(long, value_name = "FILE", conflicts_with = "no_cache")]
    pub cache: Option<PathBuf>,

    /// Always run, never read or write cached results
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Serialize)]
struct SimulateOutput {
    job: EntityId,
    from_cache: bool,
    #[serde(flatten)]
    summary: SimulationSummary,
}

pub fn run(args: SimulateArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let params = job.effective_parameters(&session.parameters);

    let settings = SimulationSettings {
        workers: args
            .workers
            .or(session.config.workers)
            .unwrap_or_else(default_workers),
        seed: args.seed,
        keep_records: args.samples.is_some(),
        ..SimulationSettings::new(
            args.iterations
                .or(session.config.iterations)
                .unwrap_or(params.monte_carlo_iterations),
        )
    };

    session.status(
        "⚙",
        format!(
            "Simulating {} ({} iterations, {} workers)...",
            style(job.label()).cyan(),
            settings.iterations,
            settings.workers
        ),
    );

    let simulator = MonteCarloSimulator::new(job.inputs(&session.parameters), settings)?;
    let cache = open_cache(
        args.cache.clone(),
        args.no_cache || args.samples.is_some(),
        session,
    );
    let run = match cache {
        Some(cache) => simulator.run_cached(cache.as_ref(), &job.id, None)?,
        None => simulator.run(None)?,
    };

    if let (Some(path), Some(records)) = (&args.samples, &run.records) {
        let file = File::create(path).into_diagnostic()?;
        write_records_csv(BufWriter::new(file), records).into_diagnostic()?;
        session.status("✓", format!("Samples written to {}", path.display()));
    }

    let output = SimulateOutput {
        job: job.id.clone(),
        from_cache: run.from_cache,
        summary: run.results.summarize(args.histogram.then_some(args.bins)),
    };

    emit(
        &output,
        session.format,
        |o| markdown(&o.summary),
        |o| {
            let s = &o.summary;
            println!(
                "{} for {} ({} iterations{})",
                style("Monte Carlo").bold(),
                style(job.label()).yellow(),
                s.iterations,
                if o.from_cache { ", cached" } else { "" }
            );
            println!();
            println!(
                "   {:<16} {:>14} {:>14} {:>14} {:>14} {:>14}",
                "", "Mean", "Std Dev", "P5", "P50", "P95"
            );
            for (label, summary, money) in metric_rows(s) {
                let Some(m) = summary else {
                    println!("   {:<16} {:>14}", label, "n/a");
                    continue;
                };
                let fmt = |v: f64| if money { format_money(v) } else { format!("{:.2}", v) };
                println!(
                    "   {:<16} {:>14} {:>14} {:>14} {:>14} {:>14}",
                    label,
                    fmt(m.mean),
                    fmt(m.std_dev),
                    fmt(m.p5),
                    fmt(m.p50),
                    fmt(m.p95)
                );
            }
            println!();
            println!(
                "   P(NPV > 0): {}",
                style(format_percent(s.npv_positive_probability)).cyan()
            );
            let omitted_irr = s.iterations - s.irr.map_or(0, |m| m.count);
            let omitted_payback = s.iterations - s.payback_period.map_or(0, |m| m.count);
            if omitted_irr > 0 || omitted_payback > 0 {
                println!(
                    "   {} iterations without IRR, {} without payback",
                    omitted_irr, omitted_payback
                );
            }

            if let Some(h) = s.histograms.as_ref().and_then(|h| h.cost_per_part.as_ref()) {
                println!();
                println!("   {}", style("Cost per part").bold());
                print_histogram(h);
            }
        },
    )
}

/// Cache selected by flags and config; failures degrade to an uncached run
pub(crate) fn open_cache(
    explicit: Option<PathBuf>,
    disabled: bool,
    session: &Session,
) -> Option<Box<dyn SimulationCache>> {
    if disabled {
        return None;
    }
    let path = explicit.or_else(|| session.config.cache_path())?;
    match SqliteCache::open(&path) {
        Ok(cache) => Some(Box::new(cache)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "simulation cache unavailable");
            None
        }
    }
}

fn metric_rows(s: &SimulationSummary) -> [(&'static str, Option<MetricSummary>, bool); 5] {
    [
        ("Cost per part", s.cost_per_part, true),
        ("NPV", s.npv, true),
        ("IRR (%)", s.irr, false),
        ("ROI (%)", s.roi, false),
        ("Payback (years)", s.payback_period, false),
    ]
}

fn print_histogram(h: &Histogram) {
    let peak = h.frequencies.iter().copied().max().unwrap_or(0).max(1);
    for (center, freq) in h.bin_centers.iter().zip(&h.frequencies) {
        let width = (*freq as f64 / peak as f64 * 40.0).round() as usize;
        println!("   {:>14} {:>6} {}", format_money(*center), freq, "█".repeat(width));
    }
}

/// Markdown simulation section, shared with `pbfe report`
pub(crate) fn markdown(s: &SimulationSummary) -> String {
    let mut out = format!("## Monte Carlo Simulation\n\n{} iterations.\n\n", s.iterations);
    out.push_str(&markdown_table(
        &["Metric", "Mean", "Std Dev", "P5", "P50", "P95", "N"],
        metric_rows(s).into_iter().map(|(label, m, _)| match m {
            Some(m) => vec![
                label.to_string(),
                format!("{:.2}", m.mean),
                format!("{:.2}", m.std_dev),
                format!("{:.2}", m.p5),
                format!("{:.2}", m.p50),
                format!("{:.2}", m.p95),
                m.count.to_string(),
            ],
            None => vec![
                label.to_string(),
                "n/a".to_string(),
                "n/a".to_string(),
                "n/a".to_string(),
                "n/a".to_string(),
                "n/a".to_string(),
                "0".to_string(),
            ],
        }),
    ));
    out.push_str(&format!(
        "\nProbability of positive NPV: **{}**\n",
        format_percent(s.npv_positive_probability)
    ));
    out
}
