//! `pbfe cost` command - Cost breakdown by category

use console::style;
use miette::Result;

use crate::analysis::cost::CostBreakdown;
use crate::cli::commands::utils::Session;
use crate::cli::helpers::{format_money, format_percent};
use crate::cli::output::{emit, key_value_table, markdown_table};
use crate::entities::CostCategory;

#[derive(clap::Args, Debug)]
pub struct CostArgs {
    /// Job file path or job ID
    pub job: String,

    /// Show every line item under its category
    #[arg(long)]
    pub items: bool,
}

pub fn run(args: CostArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let breakdown = CostBreakdown::compute(&job.inputs(&session.parameters))?;

    emit(
        &breakdown,
        session.format,
        |b| markdown(b, args.items),
        |b| {
            println!(
                "{} for {} ({} parts/build, {})",
                style("Cost Breakdown").bold(),
                style(job.label()).yellow(),
                b.parts_per_build,
                if b.standard_items { "standard model" } else { "custom line items" }
            );
            println!();
            for category in CostCategory::all() {
                let Some(cost) = b.categories.get(category) else {
                    continue;
                };
                let pct = b.percentages.get(category).copied().unwrap_or(0.0);
                println!(
                    "   {:<24} {:>14} /build {:>12} /part {:>7}",
                    category.display_name(),
                    format_money(cost.per_build),
                    format_money(cost.per_part),
                    format_percent(pct)
                );
                if args.items {
                    for item in &cost.items {
                        println!(
                            "     {} {:<30} {:>12}",
                            style("·").dim(),
                            item.name,
                            format_money(item.total_per_build)
                        );
                    }
                }
            }
            println!();
            println!(
                "   {:<24} {:>14} /build {:>12} /part",
                style("Total").bold(),
                format_money(b.total_cost_per_build),
                style(format_money(b.total_cost_per_part)).cyan()
            );

            let s = &b.sustainability;
            println!();
            println!("   {}", style("Sustainability").bold());
            println!("     Energy:          {:.1} kWh/build", s.energy_consumption_kwh);
            println!("     Carbon:          {:.2} kg CO2e", s.carbon_footprint);
            println!("     Recycled powder: {:.1}%", s.effective_recycling_rate * 100.0);
        },
    )
}

/// Markdown cost section, shared with `pbfe report`
pub(crate) fn markdown(b: &CostBreakdown, items: bool) -> String {
    let mut out = String::from("## Cost Breakdown\n\n");
    out.push_str(&markdown_table(
        &["Category", "Per Build", "Per Part", "Share"],
        CostCategory::all().iter().filter_map(|c| {
            b.categories.get(c).map(|cost| {
                vec![
                    c.display_name().to_string(),
                    format_money(cost.per_build),
                    format_money(cost.per_part),
                    format_percent(b.percentages.get(c).copied().unwrap_or(0.0)),
                ]
            })
        }),
    ));
    out.push_str(&format!(
        "\n**Total:** {} per build, {} per part\n",
        format_money(b.total_cost_per_build),
        format_money(b.total_cost_per_part)
    ));

    if items {
        out.push_str("\n### Line Items\n\n");
        out.push_str(&markdown_table(
            &["Category", "Item", "Unit Cost", "Quantity", "Unit", "Per Build"],
            CostCategory::all().iter().flat_map(|c| {
                b.categories
                    .get(c)
                    .map(|cost| cost.items.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .map(move |i| {
                        vec![
                            c.as_str().to_string(),
                            i.name.clone(),
                            format!("{:.2}", i.unit_cost),
                            format!("{:.3}", i.quantity),
                            i.unit_type.clone(),
                            format_money(i.total_per_build),
                        ]
                    })
            }),
        ));
    }

    let s = &b.sustainability;
    out.push_str("\n### Sustainability\n\n");
    out.push_str(&key_value_table(&[
        ("Energy (kWh/build)", format!("{:.1}", s.energy_consumption_kwh)),
        ("Carbon footprint (kg CO2e)", format!("{:.2}", s.carbon_footprint)),
        ("Carbon per kg part", format!("{:.2}", s.carbon_footprint_per_kg)),
        ("Recycled powder share", format!("{:.1}%", s.effective_recycling_rate * 100.0)),
        ("Waste ratio", format!("{:.1}%", s.waste_ratio * 100.0)),
        ("Energy per kg (kWh)", format!("{:.1}", s.energy_per_kg)),
        ("Consumables per kg", format_money(s.consumables_cost_per_kg)),
    ]));
    out
}
