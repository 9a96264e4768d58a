//! CLI command implementations

pub mod utils;

pub mod breakeven;
pub mod completions;
pub mod cost;
pub mod derive;
pub mod finance;
pub mod init;
pub mod list;
pub mod params;
pub mod report;
pub mod simulate;
