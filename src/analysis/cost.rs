//! Cost engine
//!
//! Line items are aggregated per category into per-build and per-part totals.
//! When a job carries no explicit items, [`standard_line_items`] builds them
//! from a [`CostDrivers`] bundle. The Monte Carlo engine calls the same
//! function with sampled rates, so both paths share one set of formulas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::derivation::DerivedQuantities;
use crate::core::error::ModelError;
use crate::entities::{CostCategory, CostLineItem, EffectiveParameters, JobInputs, MachineSpec, MaterialSpec};

/// Compute load of the digital thread in kW, charged for the whole build
pub const DIGITAL_LOAD_KW: f64 = 0.5;

/// Rates and quantities the standard cost model is evaluated at
#[derive(Debug, Clone, Copy)]
pub struct CostDrivers<'a> {
    pub params: &'a EffectiveParameters,
    pub machine: &'a MachineSpec,
    pub material: &'a MaterialSpec,
    pub parts_per_build: u32,
    pub build_time_hours: f64,
    pub part_mass_kg: f64,
    pub total_powder_mass_kg: f64,
    pub recycling_efficiency: f64,
    pub powder_price_per_kg: f64,
    pub electricity_rate: f64,
    pub labor_rate: f64,
}

impl<'a> CostDrivers<'a> {
    /// Drivers at the job's nominal values
    pub fn nominal(inputs: &JobInputs<'a>, derived: &DerivedQuantities) -> Self {
        Self {
            params: inputs.parameters,
            machine: inputs.machine,
            material: inputs.material,
            parts_per_build: inputs.part.parts_per_build,
            build_time_hours: derived.build_time_hours,
            part_mass_kg: derived.part_mass_kg,
            total_powder_mass_kg: derived.total_powder_mass_kg,
            recycling_efficiency: inputs.material.recycling_efficiency,
            powder_price_per_kg: inputs.material.price_per_kg,
            electricity_rate: inputs.parameters.electricity_rate,
            labor_rate: inputs.parameters.labor_rate,
        }
    }

    /// Unused powder recovered by sieving, per part
    pub fn recycled_powder_kg(&self) -> f64 {
        (self.total_powder_mass_kg - self.part_mass_kg) * self.recycling_efficiency
    }

    /// Unused powder sent to disposal, per part
    pub fn non_recycled_powder_kg(&self) -> f64 {
        self.total_powder_mass_kg - self.part_mass_kg - self.recycled_powder_kg()
    }
}

/// Build the standard bill of costs for a set of drivers
pub fn standard_line_items(d: &CostDrivers<'_>) -> Result<Vec<CostLineItem>, ModelError> {
    let p = d.params;
    let hours = ModelError::require_positive("annual_operating_hours", p.annual_operating_hours)?;
    ModelError::require_nonzero("lifespan_years", d.machine.lifespan_years)?;
    let build_hours = d.build_time_hours;

    let hourly = |annual: f64| annual / hours;
    let per_build_hour = |category, name: &str, annual: f64| {
        CostLineItem::new(category, name, hourly(annual), build_hours, "hours", true)
    };

    Ok(vec![
        CostLineItem::new(CostCategory::Labor, "Setup Labor", d.labor_rate, p.setup_time_hours, "hours", true)
            .with_description("Machine setup and preparation"),
        CostLineItem::new(CostCategory::Labor, "Build Supervision", d.labor_rate, build_hours, "hours", true)
            .with_description("Operator supervision during build"),
        CostLineItem::new(
            CostCategory::Labor,
            "Post-Processing Labor",
            d.labor_rate,
            p.post_processing_hours_per_part,
            "hours",
            false,
        )
        .with_description("Part removal, cleaning, finishing"),
        CostLineItem::new(
            CostCategory::Consumables,
            "Metal Powder",
            d.powder_price_per_kg,
            d.total_powder_mass_kg,
            "kg",
            false,
        )
        .with_description(format!("{} powder", d.material.name)),
        CostLineItem::new(
            CostCategory::Consumables,
            "Inert Gas (Argon/N2)",
            p.inert_gas_price,
            build_hours * p.gas_consumption_per_hour,
            "m³",
            true,
        )
        .with_description("Build chamber atmosphere"),
        CostLineItem::new(
            CostCategory::Consumables,
            "Waste Disposal",
            p.waste_disposal_cost_per_kg,
            d.non_recycled_powder_kg().max(0.0),
            "kg",
            false,
        )
        .with_description("Non-recyclable powder disposal"),
        CostLineItem::new(
            CostCategory::Energy,
            "Electrical Energy",
            d.electricity_rate,
            build_hours * p.machine_power_kw,
            "kWh",
            true,
        )
        .with_description("Machine power consumption"),
        per_build_hour(
            CostCategory::Equipment,
            "Machine Depreciation",
            d.machine.annual_depreciation(),
        )
        .with_description(format!("{} amortization", d.machine.name)),
        per_build_hour(
            CostCategory::Equipment,
            "Machine Service Contract",
            d.machine.annual_maintenance_cost,
        ),
        per_build_hour(CostCategory::Facility, "Facility Rent", p.annual_rent)
            .with_description("Allocated facility rent"),
        per_build_hour(CostCategory::Facility, "Utilities", p.annual_utilities)
            .with_description("Water, HVAC, general power"),
        per_build_hour(CostCategory::Facility, "Administrative Overhead", p.annual_admin)
            .with_description("Admin, insurance, general overhead"),
        per_build_hour(CostCategory::Digital, "Software Licenses", p.annual_software_cost)
            .with_description("CAD, slicing, simulation software"),
        per_build_hour(CostCategory::Digital, "HPC Systems", p.annual_hpc_cost)
            .with_description("High-performance computing"),
        per_build_hour(
            CostCategory::Maintenance,
            "Preventive Maintenance",
            p.preventive_maintenance.annual_cost(),
        )
        .with_description("Scheduled maintenance activities"),
        per_build_hour(
            CostCategory::Maintenance,
            "Corrective Maintenance",
            p.corrective_maintenance.annual_cost(),
        )
        .with_description("Repair and corrective actions"),
    ])
}

/// Per-build and per-part totals of each category, all seven always present
pub fn category_totals(items: &[CostLineItem], parts_per_build: u32) -> BTreeMap<CostCategory, (f64, f64)> {
    let mut totals: BTreeMap<CostCategory, (f64, f64)> =
        CostCategory::all().iter().map(|c| (*c, (0.0, 0.0))).collect();
    for item in items {
        let entry = totals.entry(item.category).or_insert((0.0, 0.0));
        entry.0 += item.total_per_build(parts_per_build);
        entry.1 += item.total_per_part(parts_per_build);
    }
    totals
}

/// Total cost of one build: the sum of the seven category totals
pub fn cost_per_build(items: &[CostLineItem], parts_per_build: u32) -> f64 {
    category_totals(items, parts_per_build)
        .values()
        .map(|(per_build, _)| per_build)
        .sum()
}

/// One line of the itemised breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit_cost: f64,
    pub quantity: f64,
    pub unit_type: String,
    pub is_per_build: bool,
    pub total_per_build: f64,
    pub total_per_part: f64,
}

/// Totals and items of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub per_build: f64,
    pub per_part: f64,
    pub items: Vec<LineItemDetail>,
}

/// Powder, energy and carbon figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityMetrics {
    /// Electrical energy per build, kWh
    pub energy_consumption_kwh: f64,
    pub recycled_powder_mass_kg: f64,
    pub non_recycled_powder_mass_kg: f64,
    pub carbon_footprint_energy: f64,
    pub carbon_footprint_material: f64,
    pub carbon_footprint_digital: f64,
    /// kg CO₂e
    pub carbon_footprint: f64,
    pub carbon_footprint_per_kg: f64,
    /// Share of charged powder that is neither in the part nor recycled
    pub waste_ratio: f64,
    /// Share of charged powder that is recycled
    pub effective_recycling_rate: f64,
    pub energy_per_kg: f64,
    pub consumables_cost_per_kg: f64,
}

/// Output of the cost engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub derived: DerivedQuantities,
    pub parts_per_build: u32,
    /// True when the items came from the standard cost model
    pub standard_items: bool,
    pub categories: BTreeMap<CostCategory, CategoryCost>,
    pub total_cost_per_build: f64,
    pub total_cost_per_part: f64,
    /// Category share of the per-build total in percent, one decimal; empty when the total is zero
    pub percentages: BTreeMap<CostCategory, f64>,
    pub sustainability: SustainabilityMetrics,
}

impl CostBreakdown {
    /// Derive quantities and cost the job
    pub fn compute(inputs: &JobInputs<'_>) -> Result<Self, ModelError> {
        let derived = DerivedQuantities::compute(inputs.part, inputs.machine, inputs.material)?;
        match inputs.line_items {
            Some(items) => Self::from_items(inputs, derived, items, false),
            None => {
                let items = standard_line_items(&CostDrivers::nominal(inputs, &derived))?;
                Self::from_items(inputs, derived, &items, true)
            }
        }
    }

    fn from_items(
        inputs: &JobInputs<'_>,
        derived: DerivedQuantities,
        items: &[CostLineItem],
        standard_items: bool,
    ) -> Result<Self, ModelError> {
        let ppb = ModelError::require_nonzero("parts_per_build", inputs.part.parts_per_build)?;

        let mut categories: BTreeMap<CostCategory, CategoryCost> = category_totals(items, ppb)
            .into_iter()
            .map(|(category, (per_build, per_part))| {
                (
                    category,
                    CategoryCost {
                        per_build,
                        per_part,
                        items: Vec::new(),
                    },
                )
            })
            .collect();

        for item in items {
            if let Some(cat) = categories.get_mut(&item.category) {
                cat.items.push(LineItemDetail {
                    name: item.name.clone(),
                    description: item.description.clone(),
                    unit_cost: item.unit_cost,
                    quantity: item.quantity,
                    unit_type: item.unit_type.clone(),
                    is_per_build: item.is_per_build,
                    total_per_build: item.total_per_build(ppb),
                    total_per_part: item.total_per_part(ppb),
                });
            }
        }

        let total_cost_per_build: f64 = categories.values().map(|c| c.per_build).sum();
        let total_cost_per_part: f64 = categories.values().map(|c| c.per_part).sum();

        let percentages = if total_cost_per_build == 0.0 {
            BTreeMap::new()
        } else {
            categories
                .iter()
                .map(|(c, cost)| (*c, round1(cost.per_build / total_cost_per_build * 100.0)))
                .collect()
        };

        let energy_consumption_kwh: f64 = items
            .iter()
            .filter(|i| i.category == CostCategory::Energy)
            .map(|i| {
                if i.is_per_build {
                    i.quantity
                } else {
                    i.quantity * f64::from(ppb)
                }
            })
            .sum();

        let consumables_per_build = categories
            .get(&CostCategory::Consumables)
            .map_or(0.0, |c| c.per_build);

        let sustainability = sustainability(
            inputs,
            &derived,
            energy_consumption_kwh,
            consumables_per_build,
        );

        Ok(Self {
            derived,
            parts_per_build: ppb,
            standard_items,
            categories,
            total_cost_per_build,
            total_cost_per_part,
            percentages,
            sustainability,
        })
    }

    /// Per-build total of one category
    pub fn category_total(&self, category: CostCategory) -> f64 {
        self.categories.get(&category).map_or(0.0, |c| c.per_build)
    }
}

fn sustainability(
    inputs: &JobInputs<'_>,
    derived: &DerivedQuantities,
    energy_consumption_kwh: f64,
    consumables_per_build: f64,
) -> SustainabilityMetrics {
    let params = inputs.parameters;
    let part_mass = derived.part_mass_kg;
    let powder_mass = derived.total_powder_mass_kg;

    let recycled = (powder_mass - part_mass) * inputs.material.recycling_efficiency;
    let non_recycled = powder_mass - part_mass - recycled;

    let carbon_energy = energy_consumption_kwh * params.grid_emission_factor;
    let carbon_material = part_mass * inputs.material.embodied_carbon_per_kg;
    let carbon_digital = derived.build_time_hours * DIGITAL_LOAD_KW * params.grid_emission_factor;
    let carbon_total = carbon_energy + carbon_material + carbon_digital;

    SustainabilityMetrics {
        energy_consumption_kwh,
        recycled_powder_mass_kg: recycled,
        non_recycled_powder_mass_kg: non_recycled,
        carbon_footprint_energy: carbon_energy,
        carbon_footprint_material: carbon_material,
        carbon_footprint_digital: carbon_digital,
        carbon_footprint: carbon_total,
        carbon_footprint_per_kg: carbon_total / part_mass,
        waste_ratio: non_recycled / powder_mass,
        effective_recycling_rate: recycled / powder_mass,
        energy_per_kg: energy_consumption_kwh / part_mass,
        consumables_cost_per_kg: consumables_per_build
            / (part_mass * f64::from(inputs.part.parts_per_build)),
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{catalog, Job, PartSpec};

    fn bracket_job() -> Job {
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
        Job::new(
            part,
            catalog::find_machine("SLM280").unwrap(),
            catalog::find_material("Ti-6Al-4V").unwrap(),
        )
    }

    #[test]
    fn test_standard_items_cover_every_category() {
        let job = bracket_job();
        let global = EffectiveParameters::default();
        let breakdown = CostBreakdown::compute(&job.inputs(&global)).unwrap();

        assert!(breakdown.standard_items);
        assert_eq!(breakdown.categories.len(), 7);
        for category in CostCategory::all() {
            assert!(breakdown.category_total(*category) > 0.0, "{} is empty", category);
        }
    }

    #[test]
    fn test_total_is_sum_of_categories() {
        let job = bracket_job();
        let global = EffectiveParameters::default();
        let b = CostBreakdown::compute(&job.inputs(&global)).unwrap();

        let sum: f64 = CostCategory::all().iter().map(|c| b.category_total(*c)).sum();
        assert_eq!(b.total_cost_per_build, sum);
        assert!((b.total_cost_per_part * 4.0 - b.total_cost_per_build).abs() < 1e-9);
    }

    #[test]
    fn test_energy_category_matches_hand_calculation() {
        let job = bracket_job();
        let global = EffectiveParameters::default();
        let b = CostBreakdown::compute(&job.inputs(&global)).unwrap();

        let expected = b.derived.build_time_hours * 8.0 * 2.5;
        assert!((b.category_total(CostCategory::Energy) - expected).abs() < 1e-9);
        assert!((b.sustainability.energy_consumption_kwh - b.derived.build_time_hours * 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_items_replace_standard_model() {
        let mut job = bracket_job();
        job.line_items = Some(vec![
            CostLineItem::new(CostCategory::Labor, "Setup", 100.0, 2.0, "hours", true),
            CostLineItem::new(CostCategory::Consumables, "Powder", 50.0, 1.0, "kg", false),
        ]);
        let global = EffectiveParameters::default();
        let b = CostBreakdown::compute(&job.inputs(&global)).unwrap();

        assert!(!b.standard_items);
        // 200 per build + 4 × 50
        assert_eq!(b.total_cost_per_build, 400.0);
        assert_eq!(b.total_cost_per_part, 100.0);
        assert_eq!(b.percentages[&CostCategory::Labor], 50.0);
        assert_eq!(b.percentages[&CostCategory::Energy], 0.0);
        assert_eq!(b.categories[&CostCategory::Labor].items.len(), 1);
    }

    #[test]
    fn test_zero_total_gives_empty_percentages() {
        let mut job = bracket_job();
        job.line_items = Some(vec![CostLineItem::new(
            CostCategory::Digital,
            "Free license",
            0.0,
            1.0,
            "seat",
            true,
        )]);
        let global = EffectiveParameters::default();
        let b = CostBreakdown::compute(&job.inputs(&global)).unwrap();
        assert_eq!(b.total_cost_per_build, 0.0);
        assert!(b.percentages.is_empty());
    }

    #[test]
    fn test_powder_mass_balance() {
        let job = bracket_job();
        let global = EffectiveParameters::default();
        let b = CostBreakdown::compute(&job.inputs(&global)).unwrap();
        let s = &b.sustainability;
        let unused = b.derived.total_powder_mass_kg - b.derived.part_mass_kg;
        assert!((s.recycled_powder_mass_kg + s.non_recycled_powder_mass_kg - unused).abs() < 1e-12);
        assert!(s.waste_ratio > 0.0 && s.waste_ratio < 1.0);
    }

    #[test]
    fn test_zero_operating_hours_rejected() {
        let mut job = bracket_job();
        let global = EffectiveParameters {
            annual_operating_hours: 0.0,
            ..EffectiveParameters::default()
        };
        job.line_items = None;
        let err = CostBreakdown::compute(&job.inputs(&global)).unwrap_err();
        assert_eq!(err.field(), "annual_operating_hours");
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(round2(1.005_1), 1.01);
    }
}
