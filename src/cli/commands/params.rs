//! `pbfe params` command - Print the resolved global default parameters

use miette::{IntoDiagnostic, Result};

use crate::cli::commands::utils::Session;
use crate::cli::helpers::format_money;
use crate::cli::output::{emit, key_value_table};
use crate::entities::EffectiveParameters;

#[derive(clap::Args, Debug)]
pub struct ParamsArgs {
    /// Print as JSON regardless of --format
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ParamsArgs, session: &Session) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(&session.parameters).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }

    // A defaults file is YAML, so `auto` prints something that can be saved as one
    let yaml = |p: &EffectiveParameters| serde_yml::to_string(p).unwrap_or_default();
    emit(
        &session.parameters,
        session.format,
        |p| {
            format!(
                "## Global Default Parameters\n\n```yaml\n{}```\n\n### Annual Overheads\n\n{}",
                yaml(p),
                key_value_table(&[
                    ("Facility (rent, utilities, admin)", format_money(p.annual_facility_cost())),
                    ("Digital (software, HPC)", format_money(p.annual_digital_cost())),
                    ("Maintenance (preventive, corrective)", format_money(p.total_annual_maintenance())),
                ])
            )
        },
        |p| print!("{}", yaml(p)),
    )
}
