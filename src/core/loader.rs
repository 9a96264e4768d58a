//! Job file discovery and loading
//!
//! Job files end in `.job.yaml` and may sit anywhere under a directory tree.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::entities::job::{Job, JOB_FILE_SUFFIX};
use crate::yaml::YamlError;

/// Whether `path` names a job file
pub fn is_job_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(JOB_FILE_SUFFIX))
}

/// Every job file under `dir`, sorted by path
pub fn find_job_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_job_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "scanned for job files");
    files
}

/// Load every job under `dir`.
///
/// Files that fail to parse are returned with their error rather than skipped.
pub fn load_all(dir: &Path) -> Vec<(PathBuf, Result<Job, YamlError>)> {
    find_job_files(dir)
        .into_iter()
        .map(|path| {
            let job = Job::load(&path);
            (path, job)
        })
        .collect()
}

/// Failure to turn a command-line job argument into a single file
#[derive(Debug, Error, Diagnostic)]
pub enum JobLookupError {
    #[error("No job file found matching '{0}'")]
    #[diagnostic(
        code(pbfe::job::not_found),
        help("pass a path or a job ID prefix of a *.job.yaml file in this directory")
    )]
    NotFound(String),

    #[error("Ambiguous job '{query}' matches {count} files. Please be more specific.")]
    #[diagnostic(code(pbfe::job::ambiguous), help("candidates:\n{candidates}"))]
    Ambiguous {
        query: String,
        count: usize,
        candidates: String,
    },
}

/// Job files under `dir` whose name starts with `id` (case-insensitive)
pub fn find_job_files_matching(dir: &Path, id: &str) -> Vec<PathBuf> {
    let needle = id.to_ascii_uppercase();
    find_job_files(dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_ascii_uppercase().starts_with(&needle))
        })
        .collect()
}

/// The one job file under `dir` whose name starts with `id` (supports partial IDs)
pub fn find_job_file(dir: &Path, id: &str) -> Result<PathBuf, JobLookupError> {
    let mut matches = find_job_files_matching(dir, id);
    match matches.len() {
        0 => Err(JobLookupError::NotFound(id.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(JobLookupError::Ambiguous {
            query: id.to_string(),
            count,
            candidates: matches
                .iter()
                .map(|p| format!("  {}", p.display()))
                .collect::<Vec<_>>()
                .join("\n"),
        }),
    }
}

/// Resolve a command-line job argument: an existing path, or an ID looked up under `dir`
pub fn resolve_job(arg: &str, dir: &Path) -> Result<PathBuf, JobLookupError> {
    let path = PathBuf::from(arg);
    if path.is_file() {
        return Ok(path);
    }
    find_job_file(dir, arg)
}
