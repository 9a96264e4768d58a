//! Break-even engine: three-scenario break-even, risk and shutdown analysis

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::cost::{round1, round2, CostBreakdown};
use crate::analysis::financial::FinancialSummary;
use crate::core::error::ModelError;
use crate::entities::JobInputs;

/// Break-even within this many months is low risk (inclusive)
pub const LOW_RISK_THRESHOLD_MONTHS: f64 = 6.0;
/// Break-even within this many months is moderate risk (inclusive)
pub const MODERATE_RISK_THRESHOLD_MONTHS: f64 = 18.0;
/// A pessimistic break-even beyond this triggers a shutdown recommendation
pub const SHUTDOWN_THRESHOLD_MONTHS: f64 = 36.0;

/// Risk band of a break-even time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Unknown,
}

impl RiskLevel {
    /// Months ≤ 6 are low, ≤ 18 moderate, anything longer high
    pub fn from_months(months: Option<f64>) -> Self {
        match months {
            None => RiskLevel::Unknown,
            Some(m) if m <= LOW_RISK_THRESHOLD_MONTHS => RiskLevel::Low,
            Some(m) if m <= MODERATE_RISK_THRESHOLD_MONTHS => RiskLevel::Moderate,
            Some(_) => RiskLevel::High,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// The three break-even scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Minimum,
    Median,
    Maximum,
}

impl ScenarioKind {
    pub fn all() -> [ScenarioKind; 3] {
        [ScenarioKind::Minimum, ScenarioKind::Median, ScenarioKind::Maximum]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Minimum => "Best Case (Optimistic)",
            ScenarioKind::Median => "Standard (Expected)",
            ScenarioKind::Maximum => "Worst Case (Pessimistic)",
        }
    }

    pub fn assumptions(&self) -> &'static str {
        match self {
            ScenarioKind::Minimum => "80% of planned fixed costs, 120% utilization rate",
            ScenarioKind::Median => "Planned fixed costs, standard utilization rate",
            ScenarioKind::Maximum => "130% of planned fixed costs, 70% utilization rate",
        }
    }

    pub fn fixed_cost_multiplier(&self) -> f64 {
        match self {
            ScenarioKind::Minimum => 0.80,
            ScenarioKind::Median => 1.00,
            ScenarioKind::Maximum => 1.30,
        }
    }

    /// Utilization assumed when converting units into months
    pub fn utilization(&self, nominal: f64) -> f64 {
        match self {
            ScenarioKind::Minimum => (nominal * 1.2).min(1.0),
            ScenarioKind::Median => nominal,
            ScenarioKind::Maximum => nominal * 0.70,
        }
    }
}

/// Break-even figures of one scenario; all absent when the margin is not positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub scenario: String,
    pub fixed_costs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_units: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_builds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_months: Option<f64>,
    pub risk_level: RiskLevel,
    pub assumptions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenarios {
    pub minimum: Scenario,
    pub median: Scenario,
    pub maximum: Scenario,
}

impl Scenarios {
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        [&self.minimum, &self.median, &self.maximum].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub fixed_costs_annual: f64,
    pub variable_cost_per_part: f64,
    pub selling_price_per_part: f64,
    pub contribution_margin_per_part: f64,
    /// Percent of price
    pub contribution_margin_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub overall_assessment: String,
    pub shutdown_recommendation: String,
    pub should_shutdown: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityMetrics {
    /// Median break-even units as a percent of full-utilization capacity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_utilization_at_break_even: Option<f64>,
    /// Percent sales can drop before reaching break-even
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profitability_buffer_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_of_safety_units: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_of_safety_revenue: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub low_risk_threshold_months: f64,
    pub moderate_risk_threshold_months: f64,
    pub current_annual_capacity_parts: f64,
}

/// Output of the break-even engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenSummary {
    pub fundamentals: Fundamentals,
    pub scenarios: Scenarios,
    pub risk_analysis: RiskAnalysis,
    pub capacity_metrics: CapacityMetrics,
    pub benchmarks: Benchmarks,
}

/// Break-even at an alternative price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceWhatIf {
    pub price: f64,
    pub contribution_margin: f64,
    pub break_even_units: u64,
    pub break_even_revenue: f64,
}

/// Price needed to break even within a target time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequiredPrice {
    pub target_months: f64,
    pub target_units: u64,
    pub required_price: f64,
    pub current_price: f64,
    pub price_increase_needed: f64,
    pub price_increase_percentage: f64,
}

/// Break-even model for one costed job
#[derive(Debug, Clone, PartialEq)]
pub struct BreakEvenAnalyzer {
    fixed_costs_annual: f64,
    variable_cost_per_part: f64,
    price_per_part: f64,
    parts_per_build: u32,
    build_time_hours: f64,
    annual_operating_hours: f64,
    utilization: f64,
    current_annual_parts: f64,
}

impl BreakEvenAnalyzer {
    pub fn new(
        inputs: &JobInputs<'_>,
        cost: &CostBreakdown,
        financial: &FinancialSummary,
    ) -> Result<Self, ModelError> {
        let params = inputs.parameters;
        let horizon =
            ModelError::require_nonzero("analysis_horizon_years", params.analysis_horizon_years)?;
        let build_time_hours =
            ModelError::require_positive("build_time_hours", cost.derived.build_time_hours)?;

        Ok(Self {
            fixed_costs_annual: params.upfront_investment / f64::from(horizon),
            variable_cost_per_part: cost.total_cost_per_part,
            price_per_part: params.price_per_part,
            parts_per_build: cost.parts_per_build,
            build_time_hours,
            annual_operating_hours: params.annual_operating_hours,
            utilization: params.machine_utilization_rate,
            current_annual_parts: financial.operations.parts_per_year,
        })
    }

    pub fn fixed_costs_annual(&self) -> f64 {
        self.fixed_costs_annual
    }

    pub fn contribution_margin(&self) -> f64 {
        self.price_per_part - self.variable_cost_per_part
    }

    /// Annual part capacity at a given utilization
    fn annual_capacity(&self, utilization: f64) -> f64 {
        self.annual_operating_hours * utilization / self.build_time_hours
            * f64::from(self.parts_per_build)
    }

    fn units_for(&self, fixed_costs: f64) -> Option<u64> {
        let margin = self.contribution_margin();
        if margin <= 0.0 {
            return None;
        }
        Some((fixed_costs / margin).ceil().max(0.0) as u64)
    }

    pub fn scenario(&self, kind: ScenarioKind) -> Scenario {
        let fixed_costs = self.fixed_costs_annual * kind.fixed_cost_multiplier();
        let units = self.units_for(fixed_costs);
        let capacity = self.annual_capacity(kind.utilization(self.utilization));

        let months = units.and_then(|u| {
            if capacity > 0.0 {
                Some(round1(u as f64 / capacity * 12.0))
            } else {
                None
            }
        });

        Scenario {
            kind,
            scenario: kind.label().to_string(),
            fixed_costs,
            break_even_units: units,
            break_even_revenue: units.map(|u| u as f64 * self.price_per_part),
            break_even_builds: units
                .map(|u| (u as f64 / f64::from(self.parts_per_build)).ceil() as u64),
            break_even_months: months,
            risk_level: RiskLevel::from_months(months),
            assumptions: kind.assumptions().to_string(),
        }
    }

    pub fn scenarios(&self) -> Scenarios {
        Scenarios {
            minimum: self.scenario(ScenarioKind::Minimum),
            median: self.scenario(ScenarioKind::Median),
            maximum: self.scenario(ScenarioKind::Maximum),
        }
    }

    /// Median break-even as a percent of capacity at full utilization
    pub fn capacity_utilization_at_break_even(&self) -> Option<f64> {
        let units = self.units_for(self.fixed_costs_annual)?;
        let max_capacity = self.annual_capacity(1.0);
        if max_capacity <= 0.0 {
            return None;
        }
        Some(round1(units as f64 / max_capacity * 100.0))
    }

    pub fn should_shutdown(&self, scenarios: &Scenarios) -> bool {
        if self.contribution_margin() <= 0.0 {
            return true;
        }
        if self
            .capacity_utilization_at_break_even()
            .is_some_and(|c| c > 100.0)
        {
            return true;
        }
        scenarios
            .maximum
            .break_even_months
            .is_some_and(|m| m > SHUTDOWN_THRESHOLD_MONTHS)
    }

    pub fn summary(&self) -> BreakEvenSummary {
        let scenarios = self.scenarios();
        let should_shutdown = self.should_shutdown(&scenarios);
        let median_units = scenarios.median.break_even_units;

        let shutdown_recommendation = if should_shutdown {
            "RECOMMEND SHUTDOWN: Break-even is not achievable within reasonable timeframe or production capacity."
        } else if scenarios.maximum.risk_level == RiskLevel::High {
            "CAUTION: Consider alternative cost structures or pricing strategies before proceeding."
        } else {
            "PROCEED: Break-even analysis supports business viability."
        };

        let current = self.current_annual_parts;
        let margin_of_safety_units = median_units.map(|u| (current - u as f64).max(0.0));
        let profitability_buffer_percentage = median_units
            .filter(|_| current > 0.0)
            .map(|u| round1((current - u as f64) / current * 100.0));

        let margin = self.contribution_margin();
        BreakEvenSummary {
            fundamentals: Fundamentals {
                fixed_costs_annual: self.fixed_costs_annual,
                variable_cost_per_part: self.variable_cost_per_part,
                selling_price_per_part: self.price_per_part,
                contribution_margin_per_part: margin,
                contribution_margin_ratio: if self.price_per_part == 0.0 {
                    0.0
                } else {
                    margin / self.price_per_part * 100.0
                },
            },
            risk_analysis: RiskAnalysis {
                overall_assessment: overall_assessment(scenarios.maximum.break_even_months)
                    .to_string(),
                shutdown_recommendation: shutdown_recommendation.to_string(),
                should_shutdown,
            },
            capacity_metrics: CapacityMetrics {
                capacity_utilization_at_break_even: self.capacity_utilization_at_break_even(),
                profitability_buffer_percentage,
                margin_of_safety_units,
                margin_of_safety_revenue: margin_of_safety_units.map(|u| u * self.price_per_part),
            },
            benchmarks: Benchmarks {
                low_risk_threshold_months: LOW_RISK_THRESHOLD_MONTHS,
                moderate_risk_threshold_months: MODERATE_RISK_THRESHOLD_MONTHS,
                current_annual_capacity_parts: current,
            },
            scenarios,
        }
    }

    /// Median break-even if the price were `price`
    pub fn break_even_at_price(&self, price: f64) -> Option<PriceWhatIf> {
        let margin = price - self.variable_cost_per_part;
        if margin <= 0.0 {
            return None;
        }
        let units = (self.fixed_costs_annual / margin).ceil().max(0.0) as u64;
        Some(PriceWhatIf {
            price,
            contribution_margin: margin,
            break_even_units: units,
            break_even_revenue: units as f64 * price,
        })
    }

    /// Price at which current output covers fixed costs within `target_months`
    pub fn price_required_for_break_even_in_months(&self, target_months: f64) -> Option<RequiredPrice> {
        let target_parts = self.current_annual_parts * (target_months / 12.0);
        if target_parts <= 0.0 || !target_parts.is_finite() {
            return None;
        }

        let required_price = self.variable_cost_per_part + self.fixed_costs_annual / target_parts;
        let current = self.price_per_part;
        let pct = if current == 0.0 {
            0.0
        } else {
            round1((required_price / current - 1.0) * 100.0)
        };

        Some(RequiredPrice {
            target_months,
            target_units: target_parts.ceil() as u64,
            required_price: round2(required_price),
            current_price: current,
            price_increase_needed: round2(required_price - current),
            price_increase_percentage: pct,
        })
    }
}

fn overall_assessment(pessimistic_months: Option<f64>) -> &'static str {
    match pessimistic_months {
        None => "Unable to assess",
        Some(m) if m > MODERATE_RISK_THRESHOLD_MONTHS => {
            "HIGH RISK: Maximum break-even period exceeds 18 months. Project requires substantial sales volume and extended time to become profitable."
        }
        Some(m) if m > LOW_RISK_THRESHOLD_MONTHS => {
            "MODERATE RISK: Break-even achievable within 18 months under normal conditions, but vulnerable to market fluctuations."
        }
        Some(_) => {
            "LOW RISK: Break-even achievable within 6 months even under pessimistic conditions. Sustainable business model."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(price: f64, variable: f64) -> BreakEvenAnalyzer {
        BreakEvenAnalyzer {
            fixed_costs_annual: 1_000_000.0,
            variable_cost_per_part: variable,
            price_per_part: price,
            parts_per_build: 4,
            build_time_hours: 8.0,
            annual_operating_hours: 2000.0,
            utilization: 0.75,
            // 2000 × 0.75 / 8 × 4
            current_annual_parts: 750.0,
        }
    }

    #[test]
    fn test_risk_boundaries_are_upper_inclusive() {
        assert_eq!(RiskLevel::from_months(Some(0.0)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_months(Some(6.0)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_months(Some(6.1)), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_months(Some(18.0)), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_months(Some(18.1)), RiskLevel::High);
        assert_eq!(RiskLevel::from_months(None), RiskLevel::Unknown);
    }

    #[test]
    fn test_median_units_example() {
        let a = analyzer(1000.0, 400.0);
        let median = a.scenario(ScenarioKind::Median);
        assert_eq!(median.break_even_units, Some(1667));
        assert_eq!(median.break_even_revenue, Some(1_667_000.0));
        assert_eq!(median.break_even_builds, Some(417));
    }

    #[test]
    fn test_scenario_fixed_costs_are_ordered() {
        let s = analyzer(1000.0, 400.0).scenarios();
        assert!(s.minimum.fixed_costs < s.median.fixed_costs);
        assert!(s.median.fixed_costs < s.maximum.fixed_costs);
        assert!(s.minimum.break_even_units <= s.median.break_even_units);
    }

    #[test]
    fn test_scenario_months_use_scenario_utilization() {
        let s = analyzer(1000.0, 400.0).scenarios();
        // 1334 units at 900 parts/year
        assert_eq!(s.minimum.break_even_months, Some(17.8));
        // 1667 units at 750 parts/year
        assert_eq!(s.median.break_even_months, Some(26.7));
        // 2167 units at 525 parts/year
        assert_eq!(s.maximum.break_even_months, Some(49.5));
        assert_eq!(s.maximum.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_non_positive_margin_is_undefined_everywhere() {
        let a = analyzer(400.0, 400.0);
        let summary = a.summary();
        for scenario in summary.scenarios.iter() {
            assert!(scenario.break_even_units.is_none());
            assert!(scenario.break_even_months.is_none());
            assert_eq!(scenario.risk_level, RiskLevel::Unknown);
        }
        assert!(summary.risk_analysis.should_shutdown);
        assert!(summary.risk_analysis.shutdown_recommendation.starts_with("RECOMMEND SHUTDOWN"));
        assert_eq!(summary.risk_analysis.overall_assessment, "Unable to assess");
        assert!(summary.capacity_metrics.margin_of_safety_units.is_none());
    }

    #[test]
    fn test_long_pessimistic_break_even_shuts_down() {
        let summary = analyzer(1000.0, 400.0).summary();
        assert!(summary.risk_analysis.should_shutdown);
        assert!(summary.risk_analysis.overall_assessment.starts_with("HIGH RISK"));
    }

    #[test]
    fn test_comfortable_job_proceeds() {
        let mut a = analyzer(1000.0, 400.0);
        a.fixed_costs_annual = 100_000.0;
        let summary = a.summary();
        // pessimistic: 217 units at 525 parts/year is 5.0 months
        assert!(!summary.risk_analysis.should_shutdown);
        assert!(summary.risk_analysis.shutdown_recommendation.starts_with("PROCEED"));
        assert_eq!(summary.capacity_metrics.margin_of_safety_units, Some(583.0));
        assert_eq!(summary.capacity_metrics.profitability_buffer_percentage, Some(77.7));
    }

    #[test]
    fn test_margin_of_safety_floors_at_zero() {
        let summary = analyzer(1000.0, 400.0).summary();
        assert_eq!(summary.capacity_metrics.margin_of_safety_units, Some(0.0));
        assert_eq!(summary.capacity_metrics.margin_of_safety_revenue, Some(0.0));
    }

    #[test]
    fn test_break_even_at_price() {
        let a = analyzer(1000.0, 400.0);
        let what_if = a.break_even_at_price(1400.0).unwrap();
        assert_eq!(what_if.break_even_units, 1000);
        assert_eq!(what_if.break_even_revenue, 1_400_000.0);
        assert!(a.break_even_at_price(300.0).is_none());
    }

    #[test]
    fn test_price_required_in_months() {
        let a = analyzer(1000.0, 400.0);
        let required = a.price_required_for_break_even_in_months(12.0).unwrap();
        assert_eq!(required.target_units, 750);
        // 400 + 1,000,000 / 750
        assert_eq!(required.required_price, 1733.33);
        assert_eq!(required.price_increase_needed, 733.33);
        assert_eq!(required.price_increase_percentage, 73.3);
        assert!(a.price_required_for_break_even_in_months(0.0).is_none());
    }
}
