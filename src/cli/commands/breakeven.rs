//! `pbfe breakeven` command - Break-even scenarios and price what-ifs

use console::style;
use miette::Result;
use serde::Serialize;

use crate::analysis::break_even::{
    BreakEvenAnalyzer, BreakEvenSummary, PriceWhatIf, RequiredPrice,
};
use crate::analysis::cost::CostBreakdown;
use crate::analysis::financial::FinancialSummary;
use crate::cli::commands::utils::Session;
use crate::cli::helpers::{format_money, format_months, format_opt, format_percent, styled_risk};
use crate::cli::output::{emit, key_value_table, markdown_table};

#[derive(clap::Args, Debug)]
pub struct BreakevenArgs {
    /// Job file path or job ID
    pub job: String,

    /// Break-even units if the part sold at this price
    #[arg(long, value_name = "PRICE")]
    pub at_price: Option<f64>,

    /// Price needed to break even within this many months at current output
    #[arg(long, value_name = "MONTHS")]
    pub target_months: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BreakevenOutput {
    #[serde(flatten)]
    summary: BreakEvenSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    at_price: Option<PriceWhatIf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_price: Option<RequiredPrice>,
}

pub fn run(args: BreakevenArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let inputs = job.inputs(&session.parameters);
    let cost = CostBreakdown::compute(&inputs)?;
    let financial = FinancialSummary::compute(&inputs, &cost)?;
    let analyzer = BreakEvenAnalyzer::new(&inputs, &cost, &financial)?;

    if let Some(months) = args.target_months {
        if months <= 0.0 {
            return Err(miette::miette!("--target-months must be greater than zero"));
        }
    }

    let output = BreakevenOutput {
        summary: analyzer.summary(),
        at_price: args.at_price.and_then(|p| analyzer.break_even_at_price(p)),
        required_price: args
            .target_months
            .and_then(|m| analyzer.price_required_for_break_even_in_months(m)),
    };

    emit(
        &output,
        session.format,
        |o| {
            let mut md = markdown(&o.summary);
            md.push_str(&what_if_markdown(o.at_price.as_ref(), o.required_price.as_ref()));
            md
        },
        |o| {
            let s = &o.summary;
            let f = &s.fundamentals;
            println!(
                "{} for {}",
                style("Break-Even Analysis").bold(),
                style(job.label()).yellow()
            );
            println!();
            println!("   Fixed costs:         {} /year", format_money(f.fixed_costs_annual));
            println!("   Variable cost:       {} /part", format_money(f.variable_cost_per_part));
            println!("   Price:               {} /part", format_money(f.selling_price_per_part));
            println!(
                "   Contribution margin: {} /part ({})",
                format_money(f.contribution_margin_per_part),
                format_percent(f.contribution_margin_ratio)
            );
            println!();
            for sc in s.scenarios.iter() {
                println!(
                    "   {:<26} {:>10} units  {:>14}  {}",
                    sc.scenario,
                    format_opt(sc.break_even_units, |u| u.to_string()),
                    format_months(sc.break_even_months),
                    styled_risk(sc.risk_level)
                );
            }
            println!();
            println!("   {}", s.risk_analysis.overall_assessment);
            let rec = style(&s.risk_analysis.shutdown_recommendation);
            if s.risk_analysis.should_shutdown {
                println!("   {}", rec.red().bold());
            } else {
                println!("   {}", rec.green());
            }

            if let Some(w) = &o.at_price {
                println!();
                println!(
                    "   At {}: {} units ({} revenue) to break even",
                    format_money(w.price),
                    w.break_even_units,
                    format_money(w.break_even_revenue)
                );
            } else if let Some(p) = args.at_price {
                println!();
                println!("   At {}: price does not cover variable cost", format_money(p));
            }
            if let Some(r) = &o.required_price {
                println!(
                    "   Break even in {} months: price {} ({} / {})",
                    r.target_months,
                    format_money(r.required_price),
                    format_money(r.price_increase_needed),
                    format_percent(r.price_increase_percentage)
                );
            }
        },
    )
}

/// Markdown break-even section, shared with `pbfe report`
pub(crate) fn markdown(s: &BreakEvenSummary) -> String {
    let f = &s.fundamentals;
    let c = &s.capacity_metrics;
    let mut out = String::from("## Break-Even Analysis\n\n");
    out.push_str(&key_value_table(&[
        ("Fixed costs (annual)", format_money(f.fixed_costs_annual)),
        ("Variable cost per part", format_money(f.variable_cost_per_part)),
        ("Selling price per part", format_money(f.selling_price_per_part)),
        ("Contribution margin", format_money(f.contribution_margin_per_part)),
        ("Contribution margin ratio", format_percent(f.contribution_margin_ratio)),
        (
            "Capacity used at break-even",
            format_opt(c.capacity_utilization_at_break_even, format_percent),
        ),
        (
            "Profitability buffer",
            format_opt(c.profitability_buffer_percentage, format_percent),
        ),
    ]));
    out.push_str("\n### Scenarios\n\n");
    out.push_str(&markdown_table(
        &["Scenario", "Fixed Costs", "Units", "Builds", "Months", "Risk"],
        s.scenarios.iter().map(|sc| {
            vec![
                sc.scenario.clone(),
                format_money(sc.fixed_costs),
                format_opt(sc.break_even_units, |u| u.to_string()),
                format_opt(sc.break_even_builds, |b| b.to_string()),
                format_months(sc.break_even_months),
                sc.risk_level.to_string(),
            ]
        }),
    ));
    out.push_str(&format!(
        "\n{}\n\n**{}**\n",
        s.risk_analysis.overall_assessment, s.risk_analysis.shutdown_recommendation
    ));
    out
}

fn what_if_markdown(at_price: Option<&PriceWhatIf>, required: Option<&RequiredPrice>) -> String {
    let mut rows = Vec::new();
    if let Some(w) = at_price {
        rows.push((
            "Break-even units at price",
            format!("{} at {}", w.break_even_units, format_money(w.price)),
        ));
    }
    if let Some(r) = required {
        rows.push((
            "Required price",
            format!(
                "{} to break even in {} months ({})",
                format_money(r.required_price),
                r.target_months,
                format_percent(r.price_increase_percentage)
            ),
        ));
    }
    if rows.is_empty() {
        return String::new();
    }
    format!("\n### What-If\n\n{}", key_value_table(&rows))
}
