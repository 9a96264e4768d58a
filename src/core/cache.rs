//! Simulation result cache
//!
//! Results are keyed by job ID and a SHA-256 hash of every input that
//! influences them. A lookup whose stored hash differs from the requested
//! one drops the stale entry and reports a miss.
//!
//! The SQLite cache is user-local and disposable; deleting the file only
//! costs a re-run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use miette::Diagnostic;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::analysis::monte_carlo::SimulationResultSet;
use crate::core::identity::EntityId;

/// Current schema version; a mismatch drops and recreates the table
const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    #[diagnostic(code(pbfe::cache::sqlite), help("delete the cache file to rebuild it"))]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot encode cached results: {0}")]
    #[diagnostic(code(pbfe::cache::encoding))]
    Encoding(#[from] serde_json::Error),

    #[error("cannot create cache directory: {0}")]
    #[diagnostic(code(pbfe::cache::io))]
    Io(#[from] std::io::Error),

    #[error("cache lock poisoned")]
    #[diagnostic(code(pbfe::cache::poisoned))]
    Poisoned,
}

/// Identifies one set of simulation inputs for one job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub job_id: EntityId,
    pub input_hash: String,
}

impl CacheKey {
    /// Hash the JSON form of `inputs`
    pub fn for_inputs<T: Serialize>(job_id: EntityId, inputs: &T) -> Result<Self, CacheError> {
        let json = serde_json::to_vec(inputs)?;
        Ok(Self {
            job_id,
            input_hash: compute_hash(&json),
        })
    }
}

/// Hex SHA-256 digest
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Storage for simulation results, injectable into the Monte Carlo engine
pub trait SimulationCache: Send + Sync {
    /// Results stored under `key`, `None` on a miss or stale hash
    fn get(&self, key: &CacheKey) -> Result<Option<SimulationResultSet>, CacheError>;

    /// Store results, replacing whatever the job had before
    fn put(&self, key: &CacheKey, results: &SimulationResultSet) -> Result<(), CacheError>;

    /// Drop any results held for a job
    fn invalidate(&self, job_id: &EntityId) -> Result<(), CacheError>;
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<EntityId, (String, SimulationResultSet)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<EntityId, (String, SimulationResultSet)>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::Poisoned)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimulationCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<SimulationResultSet>, CacheError> {
        let mut entries = self.lock()?;
        match entries.get(&key.job_id) {
            Some((hash, results)) if *hash == key.input_hash => Ok(Some(results.clone())),
            Some(_) => {
                debug!(target: "pbfe::cache", job = %key.job_id, "dropping stale entry");
                entries.remove(&key.job_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, results: &SimulationResultSet) -> Result<(), CacheError> {
        self.lock()?
            .insert(key.job_id.clone(), (key.input_hash.clone(), results.clone()));
        Ok(())
    }

    fn invalidate(&self, job_id: &EntityId) -> Result<(), CacheError> {
        self.lock()?.remove(job_id);
        Ok(())
    }
}

/// Cache persisted in a SQLite database
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Database that lives only as long as the value
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Number of jobs with stored results
    pub fn entry_count(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM simulations", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Drop every stored result
    pub fn clear(&self) -> Result<(), CacheError> {
        self.lock()?.execute("DELETE FROM simulations", [])?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<(), CacheError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);")?;
    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;

    if version != Some(SCHEMA_VERSION) {
        conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS simulations;
            DELETE FROM schema_version;
            "#,
        )?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS simulations (
            job_id TEXT PRIMARY KEY,
            input_hash TEXT NOT NULL,
            results TEXT NOT NULL,
            stored_at TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

impl SimulationCache for SqliteCache {
    fn get(&self, key: &CacheKey) -> Result<Option<SimulationResultSet>, CacheError> {
        let conn = self.lock()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT input_hash, results FROM simulations WHERE job_id = ?1",
                params![key.job_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((hash, json)) if hash == key.input_hash => Ok(Some(serde_json::from_str(&json)?)),
            Some(_) => {
                debug!(target: "pbfe::cache", job = %key.job_id, "dropping stale entry");
                conn.execute(
                    "DELETE FROM simulations WHERE job_id = ?1",
                    params![key.job_id.to_string()],
                )?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, results: &SimulationResultSet) -> Result<(), CacheError> {
        let json = serde_json::to_string(results)?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO simulations (job_id, input_hash, results, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key.job_id.to_string(),
                key.input_hash,
                json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn invalidate(&self, job_id: &EntityId) -> Result<(), CacheError> {
        self.lock()?.execute(
            "DELETE FROM simulations WHERE job_id = ?1",
            params![job_id.to_string()],
        )?;
        Ok(())
    }
}
