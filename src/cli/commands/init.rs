//! `pbfe init` command - Write a starter job file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::utils::Session;
use crate::entities::catalog;
use crate::entities::job::{Job, JOB_FILE_SUFFIX};
use crate::entities::PartSpec;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Output file (default: <JOB-ID>.job.yaml in the current directory)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Catalog machine, by model number or name
    #[arg(long, default_value = "SLM280")]
    pub machine: String,

    /// Catalog material, by alloy code or name
    #[arg(long, default_value = "Ti-6Al-4V")]
    pub material: String,

    /// Job title
    #[arg(long)]
    pub title: Option<String>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, session: &Session) -> Result<()> {
    let machine = catalog::find_machine(&args.machine).ok_or_else(|| {
        let known: Vec<String> = catalog::builtin_machines()
            .into_iter()
            .filter_map(|m| m.model_number)
            .collect();
        miette::miette!(
            help = format!("known machines: {}", known.join(", ")),
            "Unknown machine '{}'",
            args.machine
        )
    })?;
    let material = catalog::find_material(&args.material).ok_or_else(|| {
        let known: Vec<String> = catalog::builtin_materials()
            .into_iter()
            .filter_map(|m| m.code)
            .collect();
        miette::miette!(
            help = format!("known materials: {}", known.join(", ")),
            "Unknown material '{}'",
            args.material
        )
    })?;

    let mut job = Job::new(starter_part(), machine, material);
    job.title = args.title;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}{}", job.id, JOB_FILE_SUFFIX)));
    if path.exists() && !args.force {
        return Err(miette::miette!(
            help = "pass --force to overwrite",
            "{} already exists",
            path.display()
        ));
    }

    let yaml = serde_yml::to_string(&job).into_diagnostic()?;
    std::fs::write(&path, yaml).into_diagnostic()?;

    session.status(
        "✓",
        format!(
            "Created job {} at {}",
            style(&job.id).cyan(),
            style(path.display()).cyan()
        ),
    );
    if !session.quiet {
        println!();
        println!("Next steps:");
        println!("  {} Edit the part geometry", style(format!("$EDITOR {}", path.display())).yellow());
        println!("  {} Cost the build", style(format!("pbfe cost {}", path.display())).yellow());
    }
    Ok(())
}

/// Placeholder bracket geometry for a new job
fn starter_part() -> PartSpec {
    PartSpec {
        name: "Bracket".to_string(),
        volume_mm3: 50_000.0,
        height_mm: 50.0,
        surface_area_mm2: 12_000.0,
        support_volume_mm3: 5_000.0,
        layer_thickness_mm: 0.03,
        parts_per_build: 4,
        material_utilization: 0.6,
    }
}
