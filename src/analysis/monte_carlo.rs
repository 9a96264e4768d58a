//! Monte Carlo engine
//!
//! Each iteration draws the uncertain inputs independently, re-runs the
//! standard cost model and the cash-flow projection on them, and records the
//! scalar outcomes. Iterations run on a rayon pool in batches; a
//! [`CancellationToken`] is checked between batches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::cashflow::{self, ProjectionInputs};
use crate::analysis::cost::{self, CostDrivers};
use crate::analysis::derivation::DerivedQuantities;
use crate::analysis::statistics::{Histogram, MetricSummary};
use crate::core::cache::{CacheKey, SimulationCache};
use crate::core::error::{ModelError, SimulationError};
use crate::entities::JobInputs;

/// Lower bound applied to the sampled build-time multiplier
pub const MIN_BUILD_TIME_MULTIPLIER: f64 = 0.05;
pub const DISCOUNT_RATE_BOUNDS: (f64, f64) = (0.01, 0.30);
pub const UTILIZATION_BOUNDS: (f64, f64) = (0.50, 0.95);
pub const MATERIAL_UTILIZATION_FLOOR: f64 = 0.5;
pub const RECYCLING_BOUNDS: (f64, f64) = (0.5, 0.95);
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Spread of the inputs whose uncertainty is not set per job
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyProfile {
    /// Standard deviation of the build-time multiplier around 1.0
    pub build_time_std: f64,
    /// Absolute standard deviation of the discount rate
    pub discount_rate_std: f64,
    /// Absolute standard deviation of machine utilization
    pub utilization_std: f64,
    /// Half-width of the recycling-efficiency band around nominal
    pub recycling_band: f64,
    /// Draw material utilization uniformly instead of using the part's value
    pub sample_material_utilization: bool,
}

impl Default for UncertaintyProfile {
    fn default() -> Self {
        Self {
            build_time_std: 0.15,
            discount_rate_std: 0.02,
            utilization_std: 0.05,
            recycling_band: 0.05,
            sample_material_utilization: true,
        }
    }
}

impl UncertaintyProfile {
    /// No spread at all; together with zero cost and revenue volatility every
    /// iteration reproduces the deterministic result
    pub fn none() -> Self {
        Self {
            build_time_std: 0.0,
            discount_rate_std: 0.0,
            utilization_std: 0.0,
            recycling_band: 0.0,
            sample_material_utilization: false,
        }
    }
}

/// Cooperative cancellation flag shared with a running simulation
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a simulation is executed
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub iterations: u32,
    pub workers: usize,
    /// Fixed seed; iteration `i` is drawn from `seed + i` so results do not
    /// depend on scheduling
    pub seed: Option<u64>,
    pub batch_size: usize,
    pub profile: UncertaintyProfile,
    /// Keep every record, not just the five output sequences
    pub keep_records: bool,
}

impl SimulationSettings {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations,
            workers: default_workers(),
            seed: None,
            batch_size: DEFAULT_BATCH_SIZE,
            profile: UncertaintyProfile::default(),
            keep_records: false,
        }
    }
}

/// Hardware parallelism minus one, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Inputs drawn for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledParameters {
    pub powder_price: f64,
    pub electricity_rate: f64,
    pub labor_rate: f64,
    pub build_time_multiplier: f64,
    pub material_utilization: f64,
    pub recycling_efficiency: f64,
    pub price_per_part: f64,
    pub discount_rate: f64,
    pub machine_utilization: f64,
}

/// One iteration: the draw and its outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub iteration: u64,
    pub sampled: SampledParameters,
    pub cost_per_part: f64,
    pub npv: f64,
    /// Percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr: Option<f64>,
    /// Percent
    pub roi: f64,
    /// Years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<f64>,
}

/// The five output sequences. IRR and payback omit iterations where they
/// are undefined, so they may be shorter than the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResultSet {
    pub cost_per_part: Vec<f64>,
    pub npv: Vec<f64>,
    pub irr: Vec<f64>,
    pub roi: Vec<f64>,
    pub payback_period: Vec<f64>,
}

impl SimulationResultSet {
    pub fn from_records(records: &[SimulationRecord]) -> Self {
        Self {
            cost_per_part: records.iter().map(|r| r.cost_per_part).collect(),
            npv: records.iter().map(|r| r.npv).collect(),
            irr: records.iter().filter_map(|r| r.irr).collect(),
            roi: records.iter().map(|r| r.roi).collect(),
            payback_period: records.iter().filter_map(|r| r.payback_period).collect(),
        }
    }

    pub fn iterations(&self) -> usize {
        self.cost_per_part.len()
    }

    /// Percent of NPV draws above zero
    pub fn npv_positive_probability(&self) -> f64 {
        if self.npv.is_empty() {
            return 0.0;
        }
        let positive = self.npv.iter().filter(|v| **v > 0.0).count();
        positive as f64 / self.npv.len() as f64 * 100.0
    }

    /// Aggregate statistics, with histograms when `bins` is given
    pub fn summarize(&self, bins: Option<usize>) -> SimulationSummary {
        let histograms = bins.map(|b| Histograms {
            cost_per_part: Histogram::from_values(&self.cost_per_part, b),
            npv: Histogram::from_values(&self.npv, b),
            irr: Histogram::from_values(&self.irr, b),
            roi: Histogram::from_values(&self.roi, b),
            payback_period: Histogram::from_values(&self.payback_period, b),
        });

        SimulationSummary {
            iterations: self.iterations(),
            cost_per_part: MetricSummary::from_values(&self.cost_per_part),
            npv: MetricSummary::from_values(&self.npv),
            irr: MetricSummary::from_values(&self.irr),
            roi: MetricSummary::from_values(&self.roi),
            payback_period: MetricSummary::from_values(&self.payback_period),
            npv_positive_probability: self.npv_positive_probability(),
            histograms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histograms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_part: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npv: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<Histogram>,
}

/// Output of the Monte Carlo engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_part: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npv: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_period: Option<MetricSummary>,
    /// Percent
    pub npv_positive_probability: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<Histograms>,
}

/// A completed run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRun {
    pub results: SimulationResultSet,
    /// Present when records were requested and the run was not served from cache
    pub records: Option<Vec<SimulationRecord>>,
    pub from_cache: bool,
}

/// Draw from normal(mean, std_dev) with the Box–Muller transform.
///
/// A non-positive `std_dev` returns `mean` without consuming randomness.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return mean;
    }
    // 1 - u keeps u1 in (0, 1] so ln(u1) is finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    let z = (-2.0_f64 * u1.ln()).sqrt() * (2.0_f64 * std::f64::consts::PI * u2).cos();
    mean + z * std_dev
}

/// Draw from uniform(min, max)
pub fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let r: f64 = rng.random();
    min + r * (max - min)
}

/// Simulator bound to one job's nominal inputs
pub struct MonteCarloSimulator<'a> {
    inputs: JobInputs<'a>,
    derived: DerivedQuantities,
    settings: SimulationSettings,
}

impl<'a> MonteCarloSimulator<'a> {
    /// Validate the nominal inputs once so iterations cannot fail on them
    pub fn new(inputs: JobInputs<'a>, settings: SimulationSettings) -> Result<Self, SimulationError> {
        if settings.iterations == 0 {
            return Err(SimulationError::NoIterations);
        }
        let derived = DerivedQuantities::compute(inputs.part, inputs.machine, inputs.material)?;
        let simulator = Self {
            inputs,
            derived,
            settings,
        };
        simulator.evaluate(0, &simulator.nominal_sample())?;
        Ok(simulator)
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// The draw every iteration would make with all spreads at zero
    pub fn nominal_sample(&self) -> SampledParameters {
        let params = self.inputs.parameters;
        SampledParameters {
            powder_price: self.inputs.material.price_per_kg,
            electricity_rate: params.electricity_rate,
            labor_rate: params.labor_rate,
            build_time_multiplier: 1.0,
            material_utilization: self.inputs.part.material_utilization,
            recycling_efficiency: self.inputs.material.recycling_efficiency,
            price_per_part: params.price_per_part,
            discount_rate: params.discount_rate,
            machine_utilization: params.machine_utilization_rate,
        }
    }

    /// Draw the uncertain inputs for one iteration
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledParameters {
        let params = self.inputs.parameters;
        let material = self.inputs.material;
        let profile = &self.settings.profile;
        let cost_vol = params.cost_volatility;

        let powder_price = sample_normal(rng, material.price_per_kg, material.price_per_kg * cost_vol);
        let electricity_rate =
            sample_normal(rng, params.electricity_rate, params.electricity_rate * cost_vol);
        let labor_rate = sample_normal(rng, params.labor_rate, params.labor_rate * cost_vol);
        let build_time_multiplier =
            sample_normal(rng, 1.0, profile.build_time_std).max(MIN_BUILD_TIME_MULTIPLIER);

        let material_utilization = if profile.sample_material_utilization {
            sample_uniform(
                rng,
                MATERIAL_UTILIZATION_FLOOR,
                material.recycling_efficiency.min(RECYCLING_BOUNDS.1),
            )
        } else {
            self.inputs.part.material_utilization
        };

        let nominal_rec = material.recycling_efficiency;
        let recycling_efficiency = if profile.recycling_band > 0.0 {
            sample_uniform(
                rng,
                (nominal_rec - profile.recycling_band).max(RECYCLING_BOUNDS.0),
                (nominal_rec + profile.recycling_band).min(RECYCLING_BOUNDS.1),
            )
        } else {
            nominal_rec
        };

        let price_per_part = sample_normal(
            rng,
            params.price_per_part,
            params.price_per_part * params.revenue_volatility,
        );
        let discount_rate = sample_normal(rng, params.discount_rate, profile.discount_rate_std)
            .clamp(DISCOUNT_RATE_BOUNDS.0, DISCOUNT_RATE_BOUNDS.1);
        let machine_utilization =
            sample_normal(rng, params.machine_utilization_rate, profile.utilization_std)
                .clamp(UTILIZATION_BOUNDS.0, UTILIZATION_BOUNDS.1);

        SampledParameters {
            powder_price,
            electricity_rate,
            labor_rate,
            build_time_multiplier,
            material_utilization,
            recycling_efficiency,
            price_per_part,
            discount_rate,
            machine_utilization,
        }
    }

    /// Re-run the cost and cash-flow formulas on one draw
    pub fn evaluate(&self, iteration: u64, s: &SampledParameters) -> Result<SimulationRecord, ModelError> {
        let params = self.inputs.parameters;
        let ppb = ModelError::require_nonzero("parts_per_build", self.inputs.part.parts_per_build)?;
        let utilization = ModelError::require_positive("material_utilization", s.material_utilization)?;
        let build_time_hours = self.derived.build_time_hours * s.build_time_multiplier;

        let drivers = CostDrivers {
            params,
            machine: self.inputs.machine,
            material: self.inputs.material,
            parts_per_build: ppb,
            build_time_hours,
            part_mass_kg: self.derived.part_mass_kg,
            total_powder_mass_kg: self.derived.part_mass_kg / utilization,
            recycling_efficiency: s.recycling_efficiency,
            powder_price_per_kg: s.powder_price,
            electricity_rate: s.electricity_rate,
            labor_rate: s.labor_rate,
        };
        let cost_per_build = cost::cost_per_build(&cost::standard_line_items(&drivers)?, ppb);

        let projection = cashflow::project(&ProjectionInputs {
            parts_per_build: ppb,
            price_per_part: s.price_per_part,
            cost_per_build,
            build_time_hours,
            annual_operating_hours: params.annual_operating_hours,
            utilization: s.machine_utilization,
            upfront_investment: params.upfront_investment,
            horizon_years: params.analysis_horizon_years,
            discount_rate: s.discount_rate,
        })?;

        Ok(SimulationRecord {
            iteration,
            sampled: *s,
            cost_per_part: cost_per_build / f64::from(ppb),
            npv: projection.npv,
            irr: projection.irr,
            roi: projection.roi,
            payback_period: projection.payback_period.map(f64::from),
        })
    }

    /// Run every iteration
    pub fn run(&self, cancel: Option<&CancellationToken>) -> Result<SimulationRun, SimulationError> {
        self.run_with_progress(cancel, |_, _| {})
    }

    /// Run every iteration, calling `progress(completed, requested)` after each batch
    pub fn run_with_progress<F>(
        &self,
        cancel: Option<&CancellationToken>,
        mut progress: F,
    ) -> Result<SimulationRun, SimulationError>
    where
        F: FnMut(u64, u64),
    {
        let requested = u64::from(self.settings.iterations);
        let workers = self.settings.workers.max(1);
        let batch_size = self.settings.batch_size.max(1) as u64;
        let seed = self.settings.seed;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SimulationError::WorkerPool(e.to_string()))?;

        info!(
            target: "pbfe::simulation",
            iterations = requested,
            workers,
            seeded = seed.is_some(),
            "starting Monte Carlo simulation"
        );
        let started = Instant::now();

        let mut records: Vec<SimulationRecord> = Vec::with_capacity(requested as usize);
        let mut start = 0u64;
        while start < requested {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                warn!(target: "pbfe::simulation", completed = start, requested, "simulation cancelled");
                return Err(SimulationError::Cancelled {
                    completed: start,
                    requested,
                });
            }

            let end = (start + batch_size).min(requested);
            let batch: Result<Vec<SimulationRecord>, ModelError> = pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map_init(StdRng::from_os_rng, |rng, i| {
                        let sampled = match seed {
                            Some(seed) => self.sample(&mut StdRng::seed_from_u64(seed.wrapping_add(i))),
                            None => self.sample(rng),
                        };
                        self.evaluate(i, &sampled)
                    })
                    .collect()
            });
            records.extend(batch?);
            debug!(target: "pbfe::simulation", completed = end, requested, "batch finished");
            progress(end, requested);
            start = end;
        }

        let results = SimulationResultSet::from_records(&records);
        info!(
            target: "pbfe::simulation",
            elapsed_ms = started.elapsed().as_millis() as u64,
            omitted_irr = results.iterations() - results.irr.len(),
            omitted_payback = results.iterations() - results.payback_period.len(),
            "simulation finished"
        );

        Ok(SimulationRun {
            results,
            records: self.settings.keep_records.then_some(records),
            from_cache: false,
        })
    }

    /// Cache key covering every value that influences the result
    pub fn cache_key(&self, job_id: &crate::core::identity::EntityId) -> Option<CacheKey> {
        #[derive(Serialize)]
        struct HashedInputs<'b> {
            inputs: &'b JobInputs<'b>,
            iterations: u32,
            seed: Option<u64>,
            profile: &'b UncertaintyProfile,
        }

        let hashed = HashedInputs {
            inputs: &self.inputs,
            iterations: self.settings.iterations,
            seed: self.settings.seed,
            profile: &self.settings.profile,
        };
        match CacheKey::for_inputs(job_id.clone(), &hashed) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(target: "pbfe::cache", error = %e, "cannot hash simulation inputs");
                None
            }
        }
    }

    /// Serve from `cache` when the stored inputs match, otherwise run and store.
    ///
    /// Cache failures are logged and never fail the simulation.
    pub fn run_cached(
        &self,
        cache: &dyn SimulationCache,
        job_id: &crate::core::identity::EntityId,
        cancel: Option<&CancellationToken>,
    ) -> Result<SimulationRun, SimulationError> {
        let Some(key) = self.cache_key(job_id) else {
            return self.run(cancel);
        };

        match cache.get(&key) {
            Ok(Some(results)) => {
                info!(target: "pbfe::cache", job = %key.job_id, "simulation cache hit");
                return Ok(SimulationRun {
                    results,
                    records: None,
                    from_cache: true,
                });
            }
            Ok(None) => debug!(target: "pbfe::cache", job = %key.job_id, "simulation cache miss"),
            Err(e) => warn!(target: "pbfe::cache", error = %e, "simulation cache read failed"),
        }

        let run = self.run(cancel)?;
        if let Err(e) = cache.put(&key, &run.results) {
            warn!(target: "pbfe::cache", error = %e, "simulation cache write failed");
        }
        Ok(run)
    }
}

/// Write every record as CSV, one row per iteration
pub fn write_records_csv<W: Write>(writer: W, records: &[SimulationRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "iteration",
        "powder_price",
        "electricity_rate",
        "labor_rate",
        "build_time_multiplier",
        "material_utilization",
        "recycling_efficiency",
        "price_per_part",
        "discount_rate",
        "machine_utilization",
        "cost_per_part",
        "npv",
        "irr",
        "roi",
        "payback_period",
    ])?;

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for r in records {
        let s = &r.sampled;
        wtr.write_record([
            r.iteration.to_string(),
            s.powder_price.to_string(),
            s.electricity_rate.to_string(),
            s.labor_rate.to_string(),
            s.build_time_multiplier.to_string(),
            s.material_utilization.to_string(),
            s.recycling_efficiency.to_string(),
            s.price_per_part.to_string(),
            s.discount_rate.to_string(),
            s.machine_utilization.to_string(),
            r.cost_per_part.to_string(),
            r.npv.to_string(),
            opt(r.irr),
            r.roi.to_string(),
            opt(r.payback_period),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
