//! Financial engine: revenue, profit, investment metrics and viability

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::cashflow::{self, Projection, ProjectionInputs};
use crate::analysis::cost::CostBreakdown;
use crate::core::error::ModelError;
use crate::entities::{EffectiveParameters, JobInputs};

/// Viability rating band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViabilityRating {
    Excellent,
    Good,
    Moderate,
    Poor,
    NotViable,
}

impl ViabilityRating {
    pub fn from_score(score: u32) -> Self {
        match score {
            80..=u32::MAX => ViabilityRating::Excellent,
            60..=79 => ViabilityRating::Good,
            40..=59 => ViabilityRating::Moderate,
            20..=39 => ViabilityRating::Poor,
            _ => ViabilityRating::NotViable,
        }
    }
}

impl fmt::Display for ViabilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViabilityRating::Excellent => "Excellent",
            ViabilityRating::Good => "Good",
            ViabilityRating::Moderate => "Moderate",
            ViabilityRating::Poor => "Poor",
            ViabilityRating::NotViable => "Not Viable",
        };
        write!(f, "{}", s)
    }
}

/// A value at part, build and annual granularity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Granular {
    pub per_part: f64,
    pub per_build: f64,
    pub annual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profitability {
    pub profit_per_part: f64,
    pub profit_per_build: f64,
    pub annual_profit: f64,
    /// Percent of revenue
    pub profit_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentMetrics {
    pub npv: f64,
    /// Percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<f64>,
    /// Percent
    pub roi: f64,
    /// Years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<u32>,
    /// Years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_payback_period: Option<u32>,
    pub profitability_index: f64,
    /// Percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirr: Option<f64>,
    /// Parts per year needed to cover the amortized investment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_parts_per_year: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viability {
    /// 0 to 100
    pub score: u32,
    pub rating: ViabilityRating,
    pub is_viable: bool,
}

/// Percent change in profit per part for a +10% move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub price_sensitivity: f64,
    pub cost_sensitivity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operations {
    pub builds_per_year: f64,
    pub parts_per_year: f64,
}

/// One row of the year-by-year table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: u32,
    pub revenue: f64,
    pub costs: f64,
    pub net_cash_flow: f64,
    pub cumulative_cash_flow: f64,
}

/// Output of the financial engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub revenue: Granular,
    pub costs: Granular,
    pub profitability: Profitability,
    pub investment: InvestmentMetrics,
    pub viability: Viability,
    pub sensitivity: Sensitivity,
    pub operations: Operations,
    pub cash_flows: Vec<CashFlowYear>,
}

impl FinancialSummary {
    /// Evaluate the investment case for a costed job
    pub fn compute(inputs: &JobInputs<'_>, cost: &CostBreakdown) -> Result<Self, ModelError> {
        let params = inputs.parameters;
        let projection = cashflow::project(&projection_inputs(params, cost))?;
        let ppb = f64::from(cost.parts_per_build);

        let price = params.price_per_part;
        let cost_per_part = cost.total_cost_per_part;
        let profit_per_part = price - cost_per_part;

        let profit_margin = if projection.revenue_per_build == 0.0 {
            0.0
        } else {
            projection.profit_per_build / projection.revenue_per_build * 100.0
        };

        let horizon = f64::from(params.analysis_horizon_years);
        let upfront = params.upfront_investment;

        let profitability_index = if upfront == 0.0 {
            0.0
        } else {
            (projection.npv + upfront) / upfront
        };

        let break_even_parts_per_year = if profit_per_part > 0.0 {
            Some((upfront / horizon / profit_per_part).ceil() as u64)
        } else {
            None
        };

        let investment = InvestmentMetrics {
            npv: projection.npv,
            irr: projection.irr,
            roi: projection.roi,
            payback_period: projection.payback_period,
            discounted_payback_period: cashflow::discounted_payback_period(
                &projection.cash_flows,
                params.discount_rate,
            ),
            profitability_index,
            mirr: cashflow::mirr(&projection.cash_flows, params.discount_rate, params.discount_rate)
                .map(|r| r * 100.0),
            break_even_parts_per_year,
        };

        let viability = viability(&investment, params);

        let sensitivity = sensitivity(price, cost_per_part);

        Ok(Self {
            revenue: Granular {
                per_part: price,
                per_build: projection.revenue_per_build,
                annual: projection.annual_revenue,
            },
            costs: Granular {
                per_part: cost_per_part,
                per_build: cost.total_cost_per_build,
                annual: projection.annual_costs,
            },
            profitability: Profitability {
                profit_per_part,
                profit_per_build: projection.profit_per_build,
                annual_profit: projection.annual_profit,
                profit_margin,
            },
            investment,
            viability,
            sensitivity,
            operations: Operations {
                builds_per_year: projection.builds_per_year,
                parts_per_year: projection.builds_per_year * ppb,
            },
            cash_flows: cash_flow_table(&projection, upfront),
        })
    }
}

/// Projection inputs at the job's nominal values
pub fn projection_inputs(params: &EffectiveParameters, cost: &CostBreakdown) -> ProjectionInputs {
    ProjectionInputs {
        parts_per_build: cost.parts_per_build,
        price_per_part: params.price_per_part,
        cost_per_build: cost.total_cost_per_build,
        build_time_hours: cost.derived.build_time_hours,
        annual_operating_hours: params.annual_operating_hours,
        utilization: params.machine_utilization_rate,
        upfront_investment: params.upfront_investment,
        horizon_years: params.analysis_horizon_years,
        discount_rate: params.discount_rate,
    }
}

fn viability(investment: &InvestmentMetrics, params: &EffectiveParameters) -> Viability {
    let horizon = params.analysis_horizon_years;
    let payback_in_horizon = investment.payback_period.filter(|p| *p <= horizon);

    let mut score = 0.0;
    if investment.npv > 0.0 {
        score += 30.0;
        let npv_bonus = if params.upfront_investment > 0.0 {
            investment.npv / params.upfront_investment * 10.0
        } else {
            f64::INFINITY
        };
        score += npv_bonus.min(20.0);
    }
    if investment.roi > 0.0 {
        score += (investment.roi / 4.0).min(25.0);
    }
    if let Some(payback) = payback_in_horizon {
        score += 25.0 * (1.0 - f64::from(payback) / f64::from(horizon));
    }

    let score = score.round().clamp(0.0, 100.0) as u32;
    let is_viable = investment.npv > 0.0
        && investment.roi > params.minimum_acceptable_return
        && payback_in_horizon.is_some();

    Viability {
        score,
        rating: ViabilityRating::from_score(score),
        is_viable,
    }
}

fn sensitivity(price: f64, cost_per_part: f64) -> Sensitivity {
    let base = price - cost_per_part;
    if base == 0.0 {
        return Sensitivity {
            price_sensitivity: 0.0,
            cost_sensitivity: 0.0,
        };
    }
    let with_price = price * 1.1 - cost_per_part;
    let with_cost = price - cost_per_part * 1.1;
    Sensitivity {
        price_sensitivity: (with_price - base) / base * 100.0,
        cost_sensitivity: (with_cost - base) / base * 100.0,
    }
}

fn cash_flow_table(projection: &Projection, upfront: f64) -> Vec<CashFlowYear> {
    let mut rows = vec![CashFlowYear {
        year: 0,
        revenue: 0.0,
        costs: upfront,
        net_cash_flow: -upfront,
        cumulative_cash_flow: -upfront,
    }];
    let mut cumulative = -upfront;
    for (year, net) in projection.cash_flows.iter().enumerate().skip(1) {
        cumulative += net;
        rows.push(CashFlowYear {
            year: year as u32,
            revenue: projection.annual_revenue,
            costs: projection.annual_costs,
            net_cash_flow: *net,
            cumulative_cash_flow: cumulative,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{catalog, CostCategory, CostLineItem, Job, PartSpec};

    fn job_with_cost(per_part_cost: f64) -> Job {
        let part = PartSpec {
            name: "Bracket".to_string(),
            volume_mm3: 50_000.0,
            height_mm: 50.0,
            surface_area_mm2: 12_000.0,
            support_volume_mm3: 5_000.0,
            layer_thickness_mm: 0.03,
            parts_per_build: 4,
            material_utilization: 0.6,
        };
        let mut job = Job::new(
            part,
            catalog::find_machine("SLM280").unwrap(),
            catalog::find_material("Ti-6Al-4V").unwrap(),
        );
        job.line_items = Some(vec![CostLineItem::new(
            CostCategory::Consumables,
            "All-in",
            per_part_cost,
            1.0,
            "part",
            false,
        )]);
        job
    }

    fn summarize(job: &Job, params: &EffectiveParameters) -> FinancialSummary {
        let inputs = job.inputs(params);
        let cost = CostBreakdown::compute(&inputs).unwrap();
        FinancialSummary::compute(&inputs, &cost).unwrap()
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(ViabilityRating::from_score(100), ViabilityRating::Excellent);
        assert_eq!(ViabilityRating::from_score(80), ViabilityRating::Excellent);
        assert_eq!(ViabilityRating::from_score(79), ViabilityRating::Good);
        assert_eq!(ViabilityRating::from_score(40), ViabilityRating::Moderate);
        assert_eq!(ViabilityRating::from_score(20), ViabilityRating::Poor);
        assert_eq!(ViabilityRating::from_score(19), ViabilityRating::NotViable);
        assert_eq!(ViabilityRating::NotViable.to_string(), "Not Viable");
    }

    #[test]
    fn test_revenue_and_profit() {
        let params = EffectiveParameters::default();
        let s = summarize(&job_with_cost(400.0), &params);
        assert_eq!(s.revenue.per_build, 4000.0);
        assert_eq!(s.costs.per_build, 1600.0);
        assert_eq!(s.profitability.profit_per_part, 600.0);
        assert!((s.profitability.profit_margin - 60.0).abs() < 1e-9);
        assert_eq!(s.cash_flows.len(), 6);
        let last = s.cash_flows.last().unwrap();
        assert!((last.cumulative_cash_flow - (-5_000_000.0 + 5.0 * s.profitability.annual_profit)).abs() < 1e-3);
    }

    #[test]
    fn test_sensitivity_holds_other_side_fixed() {
        let params = EffectiveParameters::default();
        let s = summarize(&job_with_cost(400.0), &params);
        // +100 on a 600 profit
        assert!((s.sensitivity.price_sensitivity - 16.666_666_666).abs() < 1e-6);
        // -40 on a 600 profit
        assert!((s.sensitivity.cost_sensitivity + 6.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_zero_profit_sensitivity_is_zero() {
        let params = EffectiveParameters::default();
        let s = summarize(&job_with_cost(1000.0), &params);
        assert_eq!(s.sensitivity.price_sensitivity, 0.0);
        assert_eq!(s.sensitivity.cost_sensitivity, 0.0);
        assert!(s.investment.break_even_parts_per_year.is_none());
    }

    #[test]
    fn test_losing_job_is_not_viable() {
        let params = EffectiveParameters::default();
        let s = summarize(&job_with_cost(1200.0), &params);
        assert!(s.investment.npv < 0.0);
        assert!(s.investment.payback_period.is_none());
        assert!(s.investment.irr.is_none());
        assert_eq!(s.viability.score, 0);
        assert_eq!(s.viability.rating, ViabilityRating::NotViable);
        assert!(!s.viability.is_viable);
    }

    #[test]
    fn test_no_upfront_investment() {
        let params = EffectiveParameters {
            upfront_investment: 0.0,
            ..EffectiveParameters::default()
        };
        let s = summarize(&job_with_cost(400.0), &params);
        assert_eq!(s.investment.roi, 0.0);
        assert_eq!(s.investment.profitability_index, 0.0);
        // 30 + capped NPV bonus 20 + payback in year 1 of 5
        assert_eq!(s.viability.score, 70);
        // ROI of 0 never clears the minimum return
        assert!(!s.viability.is_viable);
    }

    #[test]
    fn test_break_even_parts_shortcut() {
        let params = EffectiveParameters::default();
        let s = summarize(&job_with_cost(400.0), &params);
        assert_eq!(s.investment.break_even_parts_per_year, Some(1667));
    }
}
