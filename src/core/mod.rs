//! Core module - identity, errors, configuration, job discovery and caching

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod loader;

pub use cache::{CacheError, CacheKey, MemoryCache, SimulationCache, SqliteCache};
pub use config::Config;
pub use error::{ModelError, SimulationError};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use loader::JobLookupError;
