//! Economic, financial and simulation parameters
//!
//! A job either carries its own complete parameter set or inherits the single
//! global default record. There is no per-field merging between the two.

use serde::{Deserialize, Serialize};

/// A recurring maintenance activity: events per year and cost per event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
    /// Events per year
    pub frequency_per_year: f64,

    /// Cost of one event
    pub cost_per_event: f64,
}

impl MaintenanceSchedule {
    /// Annual spend on this activity
    pub fn annual_cost(&self) -> f64 {
        self.frequency_per_year * self.cost_per_event
    }
}

/// Fully resolved parameter record used by every engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveParameters {
    // ----- Economic -----
    /// Electricity price per kWh
    pub electricity_rate: f64,

    /// Labor rate per hour
    pub labor_rate: f64,

    /// Machine hours available per year
    pub annual_operating_hours: f64,

    /// Inert gas price per m³
    pub inert_gas_price: f64,

    /// Inert gas consumption in m³ per build hour
    pub gas_consumption_per_hour: f64,

    pub annual_rent: f64,
    pub annual_utilities: f64,
    pub annual_admin: f64,
    pub annual_software_cost: f64,
    pub annual_hpc_cost: f64,

    pub preventive_maintenance: MaintenanceSchedule,
    pub corrective_maintenance: MaintenanceSchedule,

    /// Grid emission factor in kg CO₂e per kWh
    pub grid_emission_factor: f64,

    /// Disposal cost per kg of non-recyclable powder
    pub waste_disposal_cost_per_kg: f64,

    /// Machine power draw in kW while building
    pub machine_power_kw: f64,

    /// Setup time per build in hours
    pub setup_time_hours: f64,

    /// Post-processing labor per part in hours
    pub post_processing_hours_per_part: f64,

    // ----- Financial -----
    /// Selling price per part
    pub price_per_part: f64,

    /// Discount rate, (0, 1)
    pub discount_rate: f64,

    /// Analysis horizon in years
    pub analysis_horizon_years: u32,

    /// Capital outlay at year 0
    pub upfront_investment: f64,

    /// Share of operating hours the machine is actually building, (0, 1]
    pub machine_utilization_rate: f64,

    /// Minimum acceptable ROI in percent
    pub minimum_acceptable_return: f64,

    // ----- Simulation -----
    /// Relative standard deviation applied to powder, electricity and labor prices
    pub cost_volatility: f64,

    /// Relative standard deviation applied to the selling price
    pub revenue_volatility: f64,

    /// Monte Carlo iteration count
    pub monte_carlo_iterations: u32,
}

impl EffectiveParameters {
    /// Facility overhead (rent + utilities + admin) per year
    pub fn annual_facility_cost(&self) -> f64 {
        self.annual_rent + self.annual_utilities + self.annual_admin
    }

    /// Software and compute cost per year
    pub fn annual_digital_cost(&self) -> f64 {
        self.annual_software_cost + self.annual_hpc_cost
    }

    /// Preventive plus corrective maintenance per year
    pub fn total_annual_maintenance(&self) -> f64 {
        self.preventive_maintenance.annual_cost() + self.corrective_maintenance.annual_cost()
    }
}

impl Default for EffectiveParameters {
    fn default() -> Self {
        Self {
            electricity_rate: 2.5,
            labor_rate: 150.0,
            annual_operating_hours: 2000.0,
            inert_gas_price: 25.0,
            gas_consumption_per_hour: 0.5,
            annual_rent: 120_000.0,
            annual_utilities: 60_000.0,
            annual_admin: 80_000.0,
            annual_software_cost: 15_000.0,
            annual_hpc_cost: 10_000.0,
            preventive_maintenance: MaintenanceSchedule {
                frequency_per_year: 4.0,
                cost_per_event: 5_000.0,
            },
            corrective_maintenance: MaintenanceSchedule {
                frequency_per_year: 2.0,
                cost_per_event: 12_000.0,
            },
            grid_emission_factor: 0.95,
            waste_disposal_cost_per_kg: 2.5,
            machine_power_kw: 8.0,
            setup_time_hours: 2.0,
            post_processing_hours_per_part: 1.5,
            price_per_part: 1000.0,
            discount_rate: 0.10,
            analysis_horizon_years: 5,
            upfront_investment: 5_000_000.0,
            machine_utilization_rate: 0.75,
            minimum_acceptable_return: 15.0,
            cost_volatility: 0.10,
            revenue_volatility: 0.10,
            monte_carlo_iterations: 10_000,
        }
    }
}

/// Where a job takes its parameters from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// Inherit the global default record unchanged
    #[default]
    UseGlobalDefault,
    /// A complete job-specific override
    Custom(EffectiveParameters),
}

impl ParameterSource {
    /// Pick the record that applies to this job
    pub fn resolve<'a>(&'a self, global: &'a EffectiveParameters) -> &'a EffectiveParameters {
        match self {
            ParameterSource::UseGlobalDefault => global,
            ParameterSource::Custom(params) => params,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ParameterSource::Custom(_))
    }
}
