//! End-to-end tests of the computation engines through the library API

mod common;

use common::{bracket_job, profitable_job};
use pbfe::analysis::break_even::{BreakEvenAnalyzer, RiskLevel};
use pbfe::analysis::monte_carlo::{
    CancellationToken, MonteCarloSimulator, SimulationSettings, UncertaintyProfile,
};
use pbfe::analysis::statistics::{percentile, Histogram, MetricSummary};
use pbfe::analysis::{CostBreakdown, DerivedQuantities, FinancialSummary};
use pbfe::core::{MemoryCache, SimulationError};
use pbfe::entities::{CostCategory, CostLineItem, EffectiveParameters, Job, ParameterSource};
use pbfe::yaml::parse_yaml;

const HANDWRITTEN_JOB: &str = r#"
id: JOB-01HQ3K5M7N8P9R2S4T6V8W0X1Y
title: Handwritten impeller
part:
  name: Impeller
  volume_mm3: 50000
  height_mm: 50
  surface_area_mm2: 12000
  support_volume_mm3: 5000
  layer_thickness_mm: 0.03
  parts_per_build: 4
machine:
  name: SLM 280
  scan_speed_mm_s: 7000
  purchase_price: 750000
  lifespan_years: 7
material:
  name: Titanium Ti-6Al-4V
  density_g_cm3: 4.43
  price_per_kg: 350
  recycling_efficiency: 0.9
line_items:
  - category: labor
    name: Operator
    unit_cost: 100
    quantity: 2
    unit_type: hours
    is_per_build: true
  - category: consumables
    name: Powder
    unit_cost: 50
    quantity: 1
    unit_type: kg
    is_per_build: false
"#;

fn defaults() -> EffectiveParameters {
    EffectiveParameters::default()
}

// ============================================================================
// Build Derivation
// ============================================================================

#[test]
fn test_handwritten_job_derives_worked_example() {
    let job: Job = parse_yaml(HANDWRITTEN_JOB, "impeller.job.yaml").unwrap();
    assert_eq!(job.label(), "Handwritten impeller");
    assert!(!job.parameters.is_custom());

    let d = DerivedQuantities::compute(&job.part, &job.machine, &job.material).unwrap();
    assert_eq!(d.num_layers, 1667);
    assert!((d.build_rate_mm3_s - 21.0).abs() < 1e-9);
    assert!((d.scanning_time_s - 220_000.0 / 21.0).abs() < 1e-6);
    assert!((d.recoating_time_s - 16_670.0).abs() < 1e-9);
    assert!((d.build_time_hours - 7.5406).abs() < 1e-3);
}

#[test]
fn test_missing_required_field_is_a_yaml_error() {
    let broken = HANDWRITTEN_JOB.replace("  height_mm: 50\n", "");
    let err = parse_yaml::<Job>(&broken, "impeller.job.yaml").unwrap_err();
    assert!(err.to_string().contains("height_mm"));
}

// ============================================================================
// Cost Model
// ============================================================================

#[test]
fn test_custom_line_items_replace_standard_model() {
    let job: Job = parse_yaml(HANDWRITTEN_JOB, "impeller.job.yaml").unwrap();
    let params = defaults();
    let cost = CostBreakdown::compute(&job.inputs(&params)).unwrap();

    assert!(!cost.standard_items);
    // 2 h × 100 per build plus 50 per part × 4 parts
    assert!((cost.total_cost_per_build - 400.0).abs() < 1e-9);
    assert!((cost.total_cost_per_part - 100.0).abs() < 1e-9);
    assert!((cost.category_total(CostCategory::Labor) - 200.0).abs() < 1e-9);
}

#[test]
fn test_standard_categories_sum_to_total() {
    let job = bracket_job();
    let params = defaults();
    let cost = CostBreakdown::compute(&job.inputs(&params)).unwrap();

    assert!(cost.standard_items);
    let sum: f64 = cost.categories.values().map(|c| c.per_build).sum();
    assert!((sum - cost.total_cost_per_build).abs() < 1e-6);

    let pct: f64 = cost.percentages.values().sum();
    assert!((pct - 100.0).abs() < 0.5, "percentages sum to {}", pct);

    for category in CostCategory::all() {
        assert!(cost.categories.contains_key(category), "missing {:?}", category);
    }
}

#[test]
fn test_custom_parameters_override_global() {
    let job = profitable_job();
    let mut global = defaults();
    global.price_per_part = 1.0;
    assert_eq!(job.effective_parameters(&global).price_per_part, 3000.0);

    let mut inheriting = job.clone();
    inheriting.parameters = ParameterSource::UseGlobalDefault;
    assert_eq!(inheriting.effective_parameters(&global).price_per_part, 1.0);
}

// ============================================================================
// Financial and Break-Even
// ============================================================================

#[test]
fn test_positive_npv_implies_irr_above_discount_rate() {
    let job = profitable_job();
    let params = defaults();
    let inputs = job.inputs(&params);
    let cost = CostBreakdown::compute(&inputs).unwrap();
    let fin = FinancialSummary::compute(&inputs, &cost).unwrap();

    assert!(fin.investment.npv > 0.0);
    let irr = fin.investment.irr.unwrap();
    assert!(irr > params.discount_rate * 100.0, "irr {}", irr);
    assert!(fin.investment.profitability_index > 1.0);
}

#[test]
fn test_scenarios_ordered_by_fixed_costs() {
    let job = profitable_job();
    let params = defaults();
    let inputs = job.inputs(&params);
    let cost = CostBreakdown::compute(&inputs).unwrap();
    let fin = FinancialSummary::compute(&inputs, &cost).unwrap();
    let summary = BreakEvenAnalyzer::new(&inputs, &cost, &fin).unwrap().summary();

    let s = &summary.scenarios;
    assert!(s.minimum.fixed_costs < s.median.fixed_costs);
    assert!(s.median.fixed_costs < s.maximum.fixed_costs);

    let months: Vec<f64> = s.iter().map(|sc| sc.break_even_months.unwrap()).collect();
    assert!(months[0] <= months[1] && months[1] <= months[2]);
    assert!(!summary.risk_analysis.should_shutdown);
}

#[test]
fn test_break_even_worked_example() {
    let mut job = bracket_job();
    job.line_items = Some(vec![CostLineItem::new(
        CostCategory::Consumables,
        "Flat unit cost",
        400.0,
        1.0,
        "part",
        false,
    )]);
    let params = defaults();
    let inputs = job.inputs(&params);
    let cost = CostBreakdown::compute(&inputs).unwrap();
    assert!((cost.total_cost_per_part - 400.0).abs() < 1e-9);

    let fin = FinancialSummary::compute(&inputs, &cost).unwrap();
    let analyzer = BreakEvenAnalyzer::new(&inputs, &cost, &fin).unwrap();
    assert!((analyzer.contribution_margin() - 600.0).abs() < 1e-9);
    assert!((analyzer.fixed_costs_annual() - 1_000_000.0).abs() < 1e-6);

    let summary = analyzer.summary();
    assert_eq!(summary.scenarios.median.break_even_units, Some(1667));
}

#[test]
fn test_undefined_break_even_means_shutdown() {
    let job = bracket_job();
    let params = defaults();
    let inputs = job.inputs(&params);
    let cost = CostBreakdown::compute(&inputs).unwrap();
    assert!(cost.total_cost_per_part > params.price_per_part);

    let fin = FinancialSummary::compute(&inputs, &cost).unwrap();
    let summary = BreakEvenAnalyzer::new(&inputs, &cost, &fin).unwrap().summary();

    for sc in summary.scenarios.iter() {
        assert!(sc.break_even_units.is_none());
        assert!(sc.break_even_months.is_none());
        assert_eq!(sc.risk_level, RiskLevel::Unknown);
    }
    assert!(summary.risk_analysis.should_shutdown);
    assert!(fin.investment.break_even_parts_per_year.is_none());
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_odd_length_median_is_middle_value() {
    assert_eq!(percentile(&[5.0, 1.0, 3.0, 2.0, 4.0], 50.0), Some(3.0));
    let m = MetricSummary::from_values(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
    assert_eq!(m.p50, 3.0);
    assert_eq!(m.min, 1.0);
    assert_eq!(m.max, 5.0);
}

#[test]
fn test_histogram_counts_every_value() {
    let values: Vec<f64> = (0..997).map(|i| (i as f64 * 0.37).sin() * 100.0).collect();
    let h = Histogram::from_values(&values, 25).unwrap();
    assert_eq!(h.frequencies.len(), 25);
    assert_eq!(h.total(), 997);
}

// ============================================================================
// Monte Carlo
// ============================================================================

fn seeded(iterations: u32, seed: u64, workers: usize) -> SimulationSettings {
    SimulationSettings {
        workers,
        seed: Some(seed),
        batch_size: 64,
        ..SimulationSettings::new(iterations)
    }
}

#[test]
fn test_zero_volatility_matches_deterministic_cost() {
    let mut job = profitable_job();
    job.parameters = ParameterSource::Custom(EffectiveParameters {
        price_per_part: 3000.0,
        cost_volatility: 0.0,
        revenue_volatility: 0.0,
        ..EffectiveParameters::default()
    });
    let params = defaults();
    let inputs = job.inputs(&params);
    let expected = CostBreakdown::compute(&inputs).unwrap().total_cost_per_part;

    let settings = SimulationSettings {
        profile: UncertaintyProfile::none(),
        ..seeded(50, 1, 2)
    };
    let run = MonteCarloSimulator::new(inputs, settings).unwrap().run(None).unwrap();

    assert_eq!(run.results.iterations(), 50);
    for c in &run.results.cost_per_part {
        assert!((c - expected).abs() < 1e-6 * expected);
    }
    let npv = run.results.summarize(None).npv.unwrap();
    assert!(npv.std_dev < 1e-6);
}

#[test]
fn test_seeded_simulation_independent_of_workers() {
    let job = profitable_job();
    let params = defaults();

    let one = MonteCarloSimulator::new(job.inputs(&params), seeded(300, 42, 1))
        .unwrap()
        .run(None)
        .unwrap();
    let four = MonteCarloSimulator::new(job.inputs(&params), seeded(300, 42, 4))
        .unwrap()
        .run(None)
        .unwrap();

    assert_eq!(one.results, four.results);
}

#[test]
fn test_simulation_summary_histograms_sum_to_iterations() {
    let job = profitable_job();
    let params = defaults();
    let run = MonteCarloSimulator::new(job.inputs(&params), seeded(400, 9, 2))
        .unwrap()
        .run(None)
        .unwrap();

    let summary = run.results.summarize(Some(30));
    let hist = summary.histograms.unwrap();
    assert_eq!(hist.cost_per_part.unwrap().total(), 400);
    assert_eq!(hist.npv.unwrap().total(), 400);
    assert_eq!(summary.iterations, 400);
    assert!((0.0..=100.0).contains(&summary.npv_positive_probability));
}

#[test]
fn test_cancelled_simulation_reports_progress() {
    let job = profitable_job();
    let params = defaults();
    let token = CancellationToken::new();
    token.cancel();

    let err = MonteCarloSimulator::new(job.inputs(&params), seeded(100, 1, 1))
        .unwrap()
        .run(Some(&token))
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Cancelled {
            completed: 0,
            requested: 100
        }
    ));
}

#[test]
fn test_cached_simulation_served_second_time() {
    let job = profitable_job();
    let params = defaults();
    let cache = MemoryCache::new();
    let simulator = MonteCarloSimulator::new(job.inputs(&params), seeded(80, 5, 2)).unwrap();

    let first = simulator.run_cached(&cache, &job.id, None).unwrap();
    let second = simulator.run_cached(&cache, &job.id, None).unwrap();
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.results, second.results);
}
