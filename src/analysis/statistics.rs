//! Descriptive statistics over simulation output sequences

use serde::{Deserialize, Serialize};

/// Default number of histogram buckets
pub const DEFAULT_BINS: usize = 50;

/// Distribution summary of one output metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of observations that survived for this metric
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1); 0 for a single observation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
}

impl MetricSummary {
    /// Summarize a sequence; `None` when it is empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted(values);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std_dev = if sorted.len() > 1 {
            (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: sorted.len(),
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p5: percentile_sorted(&sorted, 5.0)?,
            p50: percentile_sorted(&sorted, 50.0)?,
            p95: percentile_sorted(&sorted, 95.0)?,
        })
    }
}

/// Ascending copy of `values`
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Nearest-rank percentile of an ascending sequence.
///
/// `index = ceil(p/100 × n) − 1`, clamped to `[0, n − 1]`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (p / 100.0 * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    Some(sorted[index])
}

/// Nearest-rank percentile of an unsorted sequence
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    percentile_sorted(&sorted(values), p)
}

/// Fixed-width histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_centers: Vec<f64>,
    pub frequencies: Vec<u64>,
}

impl Histogram {
    /// Bucket `values` into `bins` equal-width buckets spanning min..max.
    ///
    /// A zero range collapses to a single bucket at the common value.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let bins = bins.max(1);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        if range == 0.0 {
            return Some(Self {
                bin_centers: vec![min],
                frequencies: vec![values.len() as u64],
            });
        }

        let width = range / bins as f64;
        let mut frequencies = vec![0u64; bins];
        for v in values {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            frequencies[idx] += 1;
        }
        let bin_centers = (0..bins).map(|i| min + (i as f64 + 0.5) * width).collect();

        Some(Self {
            bin_centers,
            frequencies,
        })
    }

    pub fn total(&self) -> u64 {
        self.frequencies.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p50_of_odd_sequence_is_middle() {
        let values = [9.0, 1.0, 5.0, 3.0, 7.0];
        assert_eq!(percentile(&values, 50.0), Some(5.0));
    }

    #[test]
    fn test_percentile_clamps() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(3.0));
        assert_eq!(percentile_sorted(&sorted, 150.0), Some(3.0));
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn test_nearest_rank_p5_p95() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let s = MetricSummary::from_values(&values).unwrap();
        assert_eq!(s.p5, 5.0);
        assert_eq!(s.p95, 95.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 100.0);
        assert!((s.mean - 50.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_std_dev() {
        let s = MetricSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        // sum of squares 32 over 7
        assert!((s.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        let single = MetricSummary::from_values(&[3.0]).unwrap();
        assert_eq!(single.std_dev, 0.0);
        assert!(MetricSummary::from_values(&[]).is_none());
    }

    #[test]
    fn test_histogram_counts_every_observation() {
        let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.37).sin() * 100.0).collect();
        let h = Histogram::from_values(&values, DEFAULT_BINS).unwrap();
        assert_eq!(h.frequencies.len(), 50);
        assert_eq!(h.bin_centers.len(), 50);
        assert_eq!(h.total(), 1000);
    }

    #[test]
    fn test_histogram_max_lands_in_last_bin() {
        let h = Histogram::from_values(&[0.0, 10.0], 5).unwrap();
        assert_eq!(h.frequencies, vec![1, 0, 0, 0, 1]);
        assert_eq!(h.bin_centers[0], 1.0);
    }

    #[test]
    fn test_degenerate_histogram() {
        let h = Histogram::from_values(&[4.2, 4.2, 4.2], 50).unwrap();
        assert_eq!(h.bin_centers, vec![4.2]);
        assert_eq!(h.frequencies, vec![3]);
    }
}
