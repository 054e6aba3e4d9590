//! Feature extraction from sample windows.
//!
//! A window of samples is reduced to six scalars in a fixed order. The HRV
//! features are proxies computed from the pre-aggregated HRV stream, not from
//! raw inter-beat intervals; the model weights were calibrated against exactly
//! these definitions.

use crate::core::types::Sample;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Number of features produced per window.
pub const FEATURE_COUNT: usize = 6;

/// Feature names in vector order, as they appear in a model's `feature_order`.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["mean_hr", "std_hr", "min_hr", "max_hr", "sdnn", "rmssd"];

/// Fixed-length feature vector: `[meanHR, stdHR, minHR, maxHR, SDNN, RMSSD]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// The all-zero vector returned for an empty window.
    pub fn zeros() -> Self {
        Self([0.0; FEATURE_COUNT])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn mean_hr(&self) -> f64 {
        self.0[0]
    }

    pub fn std_hr(&self) -> f64 {
        self.0[1]
    }

    pub fn min_hr(&self) -> f64 {
        self.0[2]
    }

    pub fn max_hr(&self) -> f64 {
        self.0[3]
    }

    /// Mean HRV over the window (reported as "SDNN").
    pub fn sdnn(&self) -> f64 {
        self.0[4]
    }

    pub fn rmssd(&self) -> f64 {
        self.0[5]
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// Stateless window-to-features reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, window: &[Sample]) -> FeatureVector {
        extract_features(window)
    }
}

/// Compute the feature vector for a window of samples.
///
/// Never fails: an empty window yields all zeros, a single sample yields zero
/// spread and zero RMSSD.
pub fn extract_features(window: &[Sample]) -> FeatureVector {
    if window.is_empty() {
        return FeatureVector::zeros();
    }

    let hr: Vec<f64> = window.iter().map(|s| s.hr).collect();
    let hrv: Vec<f64> = window.iter().map(|s| s.hrv).collect();

    let mean_hr = hr.iter().mean();
    // Population std (divide by N)
    let std_hr = if hr.len() < 2 {
        0.0
    } else {
        hr.iter().population_std_dev()
    };
    let min_hr = Statistics::min(hr.iter());
    let max_hr = Statistics::max(hr.iter());

    let sdnn = hrv.iter().mean();
    let rmssd = rmssd(&hrv);

    FeatureVector([mean_hr, std_hr, min_hr, max_hr, sdnn, rmssd])
}

/// Root mean square of successive differences. Zero below two values.
fn rmssd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let sum_sq: f64 = values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn make_window(values: &[(f64, f64)]) -> Vec<Sample> {
        let start = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &(hr, hrv))| Sample::new(hr, hrv, start + Duration::seconds(i as i64), 0.0))
            .collect()
    }

    #[test]
    fn test_empty_window_is_zero() {
        let features = extract_features(&[]);
        assert_eq!(features.as_slice().len(), FEATURE_COUNT);
        assert!(features.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_sample() {
        let features = extract_features(&make_window(&[(72.0, 48.0)]));
        assert_eq!(features.mean_hr(), 72.0);
        assert_eq!(features.min_hr(), 72.0);
        assert_eq!(features.max_hr(), 72.0);
        assert_eq!(features.std_hr(), 0.0);
        assert_eq!(features.sdnn(), 48.0);
        assert_eq!(features.rmssd(), 0.0);
    }

    #[test]
    fn test_population_std() {
        let window = make_window(&[
            (2.0, 0.0),
            (4.0, 0.0),
            (4.0, 0.0),
            (4.0, 0.0),
            (5.0, 0.0),
            (5.0, 0.0),
            (7.0, 0.0),
            (9.0, 0.0),
        ]);
        let features = extract_features(&window);
        assert!((features.mean_hr() - 5.0).abs() < 1e-9);
        // Population std of this set is exactly 2 (sample std would be ~2.14)
        assert!((features.std_hr() - 2.0).abs() < 1e-9);
        assert_eq!(features.min_hr(), 2.0);
        assert_eq!(features.max_hr(), 9.0);
    }

    #[test]
    fn test_hrv_features() {
        let window = make_window(&[(70.0, 40.0), (70.0, 50.0), (70.0, 40.0), (70.0, 50.0)]);
        let features = extract_features(&window);
        assert!((features.sdnn() - 45.0).abs() < 1e-9);
        // Three successive differences of magnitude 10
        assert!((features.rmssd() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rmssd_uses_n_minus_one_terms() {
        // Differences: 3, 4 -> sqrt((9 + 16) / 2)
        let value = rmssd(&[0.0, 3.0, 7.0]);
        assert!((value - (12.5f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_length_is_fixed_for_any_window() {
        for n in [0usize, 1, 2, 10, 300] {
            let window: Vec<(f64, f64)> = (0..n).map(|i| (60.0 + i as f64, 40.0)).collect();
            let features = FeatureExtractor::new().extract(&make_window(&window));
            assert_eq!(features.as_slice().len(), FEATURE_COUNT);
        }
    }
}
