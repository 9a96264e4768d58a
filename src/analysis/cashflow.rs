//! Cash-flow projection and discounted-cash-flow metrics
//!
//! Shared by the financial engine and every Monte Carlo iteration.

use serde::{Deserialize, Serialize};

use crate::core::error::ModelError;

/// Lower bound of the IRR search bracket
pub const IRR_LOWER_BOUND: f64 = -0.99;
/// Upper bound of the IRR search bracket
pub const IRR_UPPER_BOUND: f64 = 10.0;
/// Bisection stops once the bracket is narrower than this
pub const IRR_TOLERANCE: f64 = 1e-10;
pub const IRR_MAX_ITERATIONS: u32 = 200;

/// Net present value, with `cash_flows[0]` at t = 0
pub fn npv(rate: f64, cash_flows: &[f64]) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .sum()
}

/// Internal rate of return as a fraction.
///
/// Bracketed bisection over [`IRR_LOWER_BOUND`], [`IRR_UPPER_BOUND`].
/// Returns `None` when NPV has the same sign at both ends of the bracket.
pub fn irr(cash_flows: &[f64]) -> Option<f64> {
    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut npv_lo = npv(lo, cash_flows);
    let npv_hi = npv(hi, cash_flows);

    if !npv_lo.is_finite() || !npv_hi.is_finite() {
        return None;
    }
    if npv_lo == 0.0 {
        return Some(lo);
    }
    if npv_hi == 0.0 {
        return Some(hi);
    }
    if npv_lo.signum() == npv_hi.signum() {
        return None;
    }

    for _ in 0..IRR_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let npv_mid = npv(mid, cash_flows);
        if npv_mid == 0.0 || (hi - lo) < IRR_TOLERANCE {
            return Some(mid);
        }
        if npv_mid.signum() == npv_lo.signum() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }

    Some(0.5 * (lo + hi))
}

/// Modified IRR as a fraction.
///
/// Negative flows are discounted to t = 0 at `finance_rate`, positive flows
/// compounded to the final year at `reinvest_rate`. `None` without at least
/// one outflow and one inflow.
pub fn mirr(cash_flows: &[f64], finance_rate: f64, reinvest_rate: f64) -> Option<f64> {
    let n = cash_flows.len().checked_sub(1)?;
    if n == 0 {
        return None;
    }

    let mut pv_outflows = 0.0;
    let mut fv_inflows = 0.0;
    for (t, cf) in cash_flows.iter().enumerate() {
        if *cf < 0.0 {
            pv_outflows += cf / (1.0 + finance_rate).powi(t as i32);
        } else {
            fv_inflows += cf * (1.0 + reinvest_rate).powi((n - t) as i32);
        }
    }

    if pv_outflows >= 0.0 || fv_inflows <= 0.0 {
        return None;
    }

    Some((fv_inflows / -pv_outflows).powf(1.0 / n as f64) - 1.0)
}

/// First year t ≥ 1 whose cumulative undiscounted cash flow is ≥ 0
pub fn payback_period(cash_flows: &[f64]) -> Option<u32> {
    first_non_negative_year(cash_flows.iter().copied())
}

/// First year t ≥ 1 whose cumulative discounted cash flow is ≥ 0
pub fn discounted_payback_period(cash_flows: &[f64], rate: f64) -> Option<u32> {
    first_non_negative_year(
        cash_flows
            .iter()
            .enumerate()
            .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32)),
    )
}

fn first_non_negative_year(flows: impl Iterator<Item = f64>) -> Option<u32> {
    let mut cumulative = 0.0;
    for (t, cf) in flows.enumerate() {
        cumulative += cf;
        if t >= 1 && cumulative >= 0.0 {
            return u32::try_from(t).ok();
        }
    }
    None
}

/// Operating and investment figures a projection is run from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInputs {
    pub parts_per_build: u32,
    pub price_per_part: f64,
    pub cost_per_build: f64,
    pub build_time_hours: f64,
    pub annual_operating_hours: f64,
    pub utilization: f64,
    pub upfront_investment: f64,
    pub horizon_years: u32,
    pub discount_rate: f64,
}

/// Flat-profit multi-year projection and its headline metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub revenue_per_build: f64,
    pub profit_per_build: f64,
    pub builds_per_year: f64,
    pub annual_revenue: f64,
    pub annual_costs: f64,
    pub annual_profit: f64,
    /// `[-upfront, annual_profit × horizon]`
    pub cash_flows: Vec<f64>,
    pub npv: f64,
    /// Percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<f64>,
    /// Percent, 0 without upfront investment
    pub roi: f64,
    /// Years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<u32>,
}

/// Project annual profit over the horizon and evaluate it
pub fn project(inputs: &ProjectionInputs) -> Result<Projection, ModelError> {
    let build_time = ModelError::require_positive("build_time_hours", inputs.build_time_hours)?;
    let hours = ModelError::require_positive("annual_operating_hours", inputs.annual_operating_hours)?;
    let horizon = ModelError::require_nonzero("analysis_horizon_years", inputs.horizon_years)?;

    let revenue_per_build = f64::from(inputs.parts_per_build) * inputs.price_per_part;
    let profit_per_build = revenue_per_build - inputs.cost_per_build;
    let builds_per_year = hours * inputs.utilization / build_time;

    let annual_revenue = builds_per_year * revenue_per_build;
    let annual_costs = builds_per_year * inputs.cost_per_build;
    let annual_profit = builds_per_year * profit_per_build;

    let mut cash_flows = Vec::with_capacity(horizon as usize + 1);
    cash_flows.push(-inputs.upfront_investment);
    cash_flows.extend(std::iter::repeat(annual_profit).take(horizon as usize));

    let roi = if inputs.upfront_investment > 0.0 {
        annual_profit * f64::from(horizon) / inputs.upfront_investment * 100.0
    } else {
        0.0
    };

    Ok(Projection {
        revenue_per_build,
        profit_per_build,
        builds_per_year,
        annual_revenue,
        annual_costs,
        annual_profit,
        npv: npv(inputs.discount_rate, &cash_flows),
        irr: irr(&cash_flows).map(|r| r * 100.0),
        roi,
        payback_period: payback_period(&cash_flows),
        cash_flows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npv_known_value() {
        // -1000 + 500/1.1 + 500/1.21 + 500/1.331
        let flows = [-1000.0, 500.0, 500.0, 500.0];
        assert!((npv(0.10, &flows) - 243.4259954921).abs() < 1e-6);
    }

    #[test]
    fn test_irr_solves_npv_zero() {
        let flows = [-1000.0, 500.0, 500.0, 500.0];
        let r = irr(&flows).unwrap();
        assert!(npv(r, &flows).abs() < 1e-6);
        assert!((r - 0.2337519).abs() < 1e-6);
    }

    #[test]
    fn test_irr_absent_without_sign_change() {
        assert!(irr(&[-1000.0, -10.0, -10.0]).is_none());
        assert!(irr(&[1000.0, 10.0]).is_none());
    }

    #[test]
    fn test_mirr_flat_profile() {
        let flows = [-1000.0, 500.0, 500.0, 500.0];
        // FV of inflows at 10% = 500 × (1.21 + 1.1 + 1) = 1655
        let expected = (1655.0_f64 / 1000.0).powf(1.0 / 3.0) - 1.0;
        assert!((mirr(&flows, 0.10, 0.10).unwrap() - expected).abs() < 1e-12);
        assert!(mirr(&[-1000.0], 0.1, 0.1).is_none());
        assert!(mirr(&[-1000.0, -5.0], 0.1, 0.1).is_none());
    }

    #[test]
    fn test_payback_periods() {
        let flows = [-1000.0, 400.0, 400.0, 400.0];
        assert_eq!(payback_period(&flows), Some(3));
        assert_eq!(discounted_payback_period(&flows, 0.10), None);
        assert_eq!(payback_period(&[-1000.0, 100.0, 100.0]), None);
    }

    #[test]
    fn test_payback_ignores_year_zero() {
        // No upfront outlay: payback is still reported from year 1
        assert_eq!(payback_period(&[0.0, 10.0]), Some(1));
    }

    #[test]
    fn test_project_flat_profit() {
        let p = project(&ProjectionInputs {
            parts_per_build: 4,
            price_per_part: 1000.0,
            cost_per_build: 2000.0,
            build_time_hours: 10.0,
            annual_operating_hours: 2000.0,
            utilization: 0.5,
            upfront_investment: 100_000.0,
            horizon_years: 5,
            discount_rate: 0.1,
        })
        .unwrap();

        assert_eq!(p.builds_per_year, 100.0);
        assert_eq!(p.annual_profit, 200_000.0);
        assert_eq!(p.cash_flows.len(), 6);
        assert_eq!(p.cash_flows[0], -100_000.0);
        assert_eq!(p.roi, 1000.0);
        assert_eq!(p.payback_period, Some(1));
        assert!(p.irr.unwrap() > 100.0);
    }

    #[test]
    fn test_project_without_investment_has_zero_roi() {
        let p = project(&ProjectionInputs {
            parts_per_build: 1,
            price_per_part: 100.0,
            cost_per_build: 50.0,
            build_time_hours: 1.0,
            annual_operating_hours: 100.0,
            utilization: 1.0,
            upfront_investment: 0.0,
            horizon_years: 3,
            discount_rate: 0.1,
        })
        .unwrap();
        assert_eq!(p.roi, 0.0);
        assert!(p.irr.is_none());
    }

    #[test]
    fn test_project_rejects_zero_build_time() {
        let err = project(&ProjectionInputs {
            parts_per_build: 1,
            price_per_part: 100.0,
            cost_per_build: 50.0,
            build_time_hours: 0.0,
            annual_operating_hours: 100.0,
            utilization: 1.0,
            upfront_investment: 0.0,
            horizon_years: 3,
            discount_rate: 0.1,
        })
        .unwrap_err();
        assert_eq!(err.field(), "build_time_hours");
    }
}
