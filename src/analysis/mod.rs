//! Computation engines
//!
//! - [`derivation`] - build time, layers and powder mass from part geometry
//! - [`cost`] - line-item cost model and sustainability metrics
//! - [`cashflow`] - multi-year projection and discounted-cash-flow metrics
//! - [`financial`] - profitability, investment metrics and viability rating
//! - [`break_even`] - break-even scenarios, risk classification and what-ifs
//! - [`monte_carlo`] - parallel uncertainty simulation
//! - [`statistics`] - summaries, percentiles and histograms

pub mod break_even;
pub mod cashflow;
pub mod cost;
pub mod derivation;
pub mod financial;
pub mod monte_carlo;
pub mod statistics;

pub use break_even::{BreakEvenAnalyzer, BreakEvenSummary, RiskLevel};
pub use cost::{CostBreakdown, CostDrivers};
pub use derivation::DerivedQuantities;
pub use financial::{FinancialSummary, ViabilityRating};
pub use monte_carlo::{
    CancellationToken, MonteCarloSimulator, SimulationResultSet, SimulationSettings,
    SimulationSummary, UncertaintyProfile,
};
pub use statistics::{Histogram, MetricSummary};
