//! `pbfe list` command - Summarize every job under a directory

use console::style;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::analysis::break_even::RiskLevel;
use crate::analysis::financial::ViabilityRating;
use crate::cli::commands::utils::{Analysis, Session};
use crate::cli::helpers::{format_money, format_opt, format_short_id, styled_rating, truncate_str};
use crate::cli::output::{emit, markdown_table};
use crate::core::identity::EntityId;
use crate::core::loader;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Directory to scan for *.job.yaml files
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct JobRow {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost_per_part: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    npv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    viability: Option<ViabilityRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pessimistic_risk: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: ListArgs, session: &Session) -> Result<()> {
    let rows: Vec<JobRow> = loader::load_all(&args.dir)
        .into_iter()
        .map(|(path, loaded)| {
            let mut row = JobRow {
                path,
                id: None,
                title: None,
                cost_per_part: None,
                npv: None,
                viability: None,
                pessimistic_risk: None,
                error: None,
            };
            let job = match loaded {
                Ok(job) => job,
                Err(e) => {
                    row.error = Some(e.to_string());
                    return row;
                }
            };
            row.id = Some(job.id.clone());
            row.title = Some(job.label().to_string());
            match Analysis::run(&job.inputs(&session.parameters)) {
                Ok(a) => {
                    row.cost_per_part = Some(a.cost.total_cost_per_part);
                    row.npv = Some(a.financial.investment.npv);
                    row.viability = Some(a.financial.viability.rating);
                    row.pessimistic_risk = Some(a.break_even.scenarios.maximum.risk_level);
                }
                Err(e) => row.error = Some(e.to_string()),
            }
            row
        })
        .collect();

    emit(
        &rows,
        session.format,
        |rows| {
            markdown_table(
                &["ID", "Title", "Cost/Part", "NPV", "Viability", "Risk"],
                rows.iter().map(|r| {
                    vec![
                        r.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| r.path.display().to_string()),
                        r.title.clone().unwrap_or_default(),
                        format_opt(r.cost_per_part, format_money),
                        format_opt(r.npv, format_money),
                        format_opt(r.viability, |v| v.to_string()),
                        r.error
                            .clone()
                            .unwrap_or_else(|| format_opt(r.pessimistic_risk, |l| l.to_string())),
                    ]
                }),
            )
        },
        |rows| {
            for r in rows {
                match (&r.id, &r.error) {
                    (Some(id), None) => println!(
                        "{:<17} {:<28} {:>12} {:>16}  {}",
                        style(format_short_id(id)).cyan(),
                        truncate_str(r.title.as_deref().unwrap_or(""), 28),
                        format_opt(r.cost_per_part, format_money),
                        format_opt(r.npv, format_money),
                        r.viability.map(|v| styled_rating(v).to_string()).unwrap_or_default()
                    ),
                    (_, Some(err)) => eprintln!(
                        "{} {}: {}",
                        style("✗").red(),
                        r.path.display(),
                        err
                    ),
                    (None, None) => {}
                }
            }
            if !session.quiet {
                println!();
                println!("{} job(s) found", style(rows.len()).cyan());
            }
        },
    )
}
