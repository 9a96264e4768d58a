//! pbfe: powder-bed-fusion economics
//!
//! Cost, financial, break-even and Monte Carlo analysis of metal
//! powder-bed-fusion builds described in plain YAML job files.

pub mod analysis;
pub mod cli;
pub mod core;
pub mod entities;
pub mod yaml;
