//! `pbfe finance` command - Profitability and investment metrics

use console::style;
use miette::Result;

use crate::analysis::cost::CostBreakdown;
use crate::analysis::financial::FinancialSummary;
use crate::cli::commands::utils::Session;
use crate::cli::helpers::{format_money, format_opt, format_percent, format_years, styled_rating};
use crate::cli::output::{emit, key_value_table, markdown_table};

#[derive(clap::Args, Debug)]
pub struct FinanceArgs {
    /// Job file path or job ID
    pub job: String,

    /// Show the year-by-year cash-flow table
    #[arg(long)]
    pub cash_flows: bool,
}

pub fn run(args: FinanceArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let inputs = job.inputs(&session.parameters);
    let cost = CostBreakdown::compute(&inputs)?;
    let summary = FinancialSummary::compute(&inputs, &cost)?;

    emit(
        &summary,
        session.format,
        |s| markdown(s, args.cash_flows),
        |s| {
            println!(
                "{} for {}",
                style("Financial Summary").bold(),
                style(job.label()).yellow()
            );
            println!();
            println!(
                "   Revenue:  {} /part  {} /year",
                format_money(s.revenue.per_part),
                format_money(s.revenue.annual)
            );
            println!(
                "   Costs:    {} /part  {} /year",
                format_money(s.costs.per_part),
                format_money(s.costs.annual)
            );
            println!(
                "   Profit:   {} /part  {} /year ({} margin)",
                format_money(s.profitability.profit_per_part),
                format_money(s.profitability.annual_profit),
                format_percent(s.profitability.profit_margin)
            );
            println!(
                "   Output:   {:.1} builds/year, {:.0} parts/year",
                s.operations.builds_per_year, s.operations.parts_per_year
            );

            let inv = &s.investment;
            println!();
            println!("   {}", style("Investment").bold());
            println!("     NPV:            {}", style(format_money(inv.npv)).cyan());
            println!("     IRR:            {}", format_opt(inv.irr, format_percent));
            println!("     MIRR:           {}", format_opt(inv.mirr, format_percent));
            println!("     ROI:            {}", format_percent(inv.roi));
            println!("     Payback:        {}", format_years(inv.payback_period));
            println!("     Disc. payback:  {}", format_years(inv.discounted_payback_period));
            println!("     PI:             {:.2}", inv.profitability_index);

            println!();
            println!(
                "   Viability: {} (score {})",
                styled_rating(s.viability.rating),
                s.viability.score
            );

            if args.cash_flows {
                println!();
                println!("   {}", style("Cash Flows").bold());
                for y in &s.cash_flows {
                    println!(
                        "     Year {:>2}  net {:>16}  cumulative {:>16}",
                        y.year,
                        format_money(y.net_cash_flow),
                        format_money(y.cumulative_cash_flow)
                    );
                }
            }
        },
    )
}

/// Markdown financial section, shared with `pbfe report`
pub(crate) fn markdown(s: &FinancialSummary, cash_flows: bool) -> String {
    let inv = &s.investment;
    let mut out = String::from("## Financial Summary\n\n");
    out.push_str(&markdown_table(
        &["", "Per Part", "Per Build", "Annual"],
        [
            vec![
                "Revenue".to_string(),
                format_money(s.revenue.per_part),
                format_money(s.revenue.per_build),
                format_money(s.revenue.annual),
            ],
            vec![
                "Costs".to_string(),
                format_money(s.costs.per_part),
                format_money(s.costs.per_build),
                format_money(s.costs.annual),
            ],
            vec![
                "Profit".to_string(),
                format_money(s.profitability.profit_per_part),
                format_money(s.profitability.profit_per_build),
                format_money(s.profitability.annual_profit),
            ],
        ],
    ));
    out.push_str("\n### Investment Metrics\n\n");
    out.push_str(&key_value_table(&[
        ("NPV", format_money(inv.npv)),
        ("IRR", format_opt(inv.irr, format_percent)),
        ("MIRR", format_opt(inv.mirr, format_percent)),
        ("ROI", format_percent(inv.roi)),
        ("Payback period", format_years(inv.payback_period)),
        ("Discounted payback", format_years(inv.discounted_payback_period)),
        ("Profitability index", format!("{:.2}", inv.profitability_index)),
        (
            "Break-even parts/year",
            format_opt(inv.break_even_parts_per_year, |n| n.to_string()),
        ),
        ("Profit margin", format_percent(s.profitability.profit_margin)),
        (
            "Viability",
            format!("{} (score {})", s.viability.rating, s.viability.score),
        ),
    ]));

    if cash_flows {
        out.push_str("\n### Cash Flows\n\n");
        out.push_str(&markdown_table(
            &["Year", "Revenue", "Costs", "Net", "Cumulative"],
            s.cash_flows.iter().map(|y| {
                vec![
                    y.year.to_string(),
                    format_money(y.revenue),
                    format_money(y.costs),
                    format_money(y.net_cash_flow),
                    format_money(y.cumulative_cash_flow),
                ]
            }),
        ));
    }
    out
}
