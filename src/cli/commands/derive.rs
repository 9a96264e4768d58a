//! `pbfe derive` command - Physical build quantities

use console::style;
use miette::Result;

use crate::analysis::derivation::DerivedQuantities;
use crate::cli::commands::utils::Session;
use crate::cli::output::{emit, key_value_table};

#[derive(clap::Args, Debug)]
pub struct DeriveArgs {
    /// Job file path or job ID
    pub job: String,
}

pub fn run(args: DeriveArgs, session: &Session) -> Result<()> {
    let (_, job) = session.load_job(&args.job)?;
    let derived = DerivedQuantities::compute(&job.part, &job.machine, &job.material)?;

    emit(&derived, session.format, markdown, |d| {
        println!(
            "{} {} on {} in {}",
            style("Build").bold(),
            style(job.label()).yellow(),
            job.machine.name,
            job.material.name
        );
        println!();
        println!("   Parts per build: {}", job.part.parts_per_build);
        println!("   Layers:          {}", d.num_layers);
        println!("   Build rate:      {:.1} mm³/s", d.build_rate_mm3_s);
        println!("   Scanning time:   {:.0} s", d.scanning_time_s);
        println!("   Recoating time:  {:.0} s", d.recoating_time_s);
        println!("   Build time:      {} h", style(format!("{:.2}", d.build_time_hours)).cyan());
        println!("   Part mass:       {:.4} kg", d.part_mass_kg);
        println!("   Powder per part: {:.4} kg", d.total_powder_mass_kg);
    })
}

pub(crate) fn markdown(d: &DerivedQuantities) -> String {
    format!(
        "## Build Quantities\n\n{}",
        key_value_table(&[
            ("Layers", d.num_layers.to_string()),
            ("Melt volume (mm³)", format!("{:.0}", d.total_melt_volume_mm3)),
            ("Build rate (mm³/s)", format!("{:.1}", d.build_rate_mm3_s)),
            ("Scanning time (s)", format!("{:.0}", d.scanning_time_s)),
            ("Recoating time (s)", format!("{:.0}", d.recoating_time_s)),
            ("Build time (h)", format!("{:.2}", d.build_time_hours)),
            ("Part mass (kg)", format!("{:.4}", d.part_mass_kg)),
            ("Powder per part (kg)", format!("{:.4}", d.total_powder_mass_kg)),
        ])
    )
}
