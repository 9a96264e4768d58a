//! Shared fixtures for integration tests

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use pbfe::entities::catalog;
use pbfe::entities::job::JOB_FILE_SUFFIX;
use pbfe::entities::{EffectiveParameters, Job, ParameterSource, PartSpec};

/// Helper to get a pbfe command isolated inside `dir`
///
/// Config and cache directories point into `dir` so tests never touch the
/// user's files.
pub fn pbfe(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pbfe").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("XDG_CACHE_HOME", dir.join(".cache"))
        .env_remove("PBFE_DEFAULTS")
        .env_remove("PBFE_ITERATIONS")
        .env_remove("PBFE_WORKERS")
        .env_remove("PBFE_CACHE")
        .env_remove("RUST_LOG");
    cmd
}

/// 50 cm³ titanium bracket, four per build: 1667 layers, about 7.54 h
pub fn bracket_part() -> PartSpec {
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

/// Bracket job on an SLM 280 in Ti-6Al-4V using the global defaults.
///
/// At the default price of 1000 it loses money on every part.
pub fn bracket_job() -> Job {
    Job::new(
        bracket_part(),
        catalog::find_machine("SLM280").unwrap(),
        catalog::find_material("Ti-6Al-4V").unwrap(),
    )
}

/// The bracket job priced at 3000 per part through a custom parameter block
pub fn profitable_job() -> Job {
    let mut job = bracket_job();
    job.title = Some("Profitable bracket".to_string());
    job.parameters = ParameterSource::Custom(EffectiveParameters {
        price_per_part: 3000.0,
        ..EffectiveParameters::default()
    });
    job
}

/// Write `job` as `<ID>.job.yaml` under `dir`
pub fn write_job(dir: &Path, job: &Job) -> PathBuf {
    let path = dir.join(format!("{}{}", job.id, JOB_FILE_SUFFIX));
    fs::write(&path, serde_yml::to_string(job).unwrap()).unwrap();
    path
}

/// Temp directory holding one written job
pub fn setup_with_job(job: &Job) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = write_job(tmp.path(), job);
    (tmp, path)
}
