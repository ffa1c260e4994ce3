//! Classical additive seasonal decomposition.
//!
//! The series is split into three components:
//! - Trend: a centered moving average over one period
//! - Seasonal: the centered mean of the detrended values at each phase
//! - Residual: what remains after removing trend and seasonal

use crate::analyzers::types::DecompositionResult;
use crate::analyzers::utility::mean;
use crate::error::DecompositionError;

/// Additive decomposition with a fixed seasonal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdditiveDecomposer {
    period: usize,
}

impl AdditiveDecomposer {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of points at each end without a trend value.
    pub fn edge_len(&self) -> usize {
        self.period / 2
    }

    /// Decompose `series`, which must hold at least two full periods of finite values.
    pub fn decompose(&self, series: &[f64]) -> Result<DecompositionResult, DecompositionError> {
        let period = self.period;
        if period < 2 {
            return Err(DecompositionError::InvalidPeriod(period));
        }

        let n = series.len();
        if n < 2 * period {
            return Err(DecompositionError::InsufficientData {
                needed: 2 * period,
                got: n,
            });
        }

        if let Some(index) = series.iter().position(|v| !v.is_finite()) {
            return Err(DecompositionError::NonFiniteValue { index });
        }

        let trend = self.moving_average(series);

        let detrended: Vec<Option<f64>> = series
            .iter()
            .zip(trend.iter())
            .map(|(y, t)| t.map(|t| y - t))
            .collect();

        let phase_means = self.phase_means(&detrended);
        let seasonal: Vec<f64> = (0..n).map(|i| phase_means[i % period]).collect();

        let residual = detrended
            .iter()
            .zip(seasonal.iter())
            .map(|(d, s)| d.map(|d| d - s))
            .collect();

        Ok(DecompositionResult {
            period,
            trend,
            seasonal,
            residual,
        })
    }

    /// Centered moving average. An even period uses a 2xP filter so the
    /// window stays symmetric: `P + 1` weights with halved end weights.
    fn moving_average(&self, series: &[f64]) -> Vec<Option<f64>> {
        let period = self.period;
        let p = period as f64;
        let weights: Vec<f64> = if period % 2 == 0 {
            let mut w = vec![1.0 / p; period + 1];
            w[0] = 0.5 / p;
            w[period] = 0.5 / p;
            w
        } else {
            vec![1.0 / p; period]
        };

        let half = self.edge_len();
        let n = series.len();

        (0..n)
            .map(|i| {
                if i < half || i + half >= n {
                    return None;
                }
                let window = &series[i - half..=i + half];
                Some(window.iter().zip(weights.iter()).map(|(y, w)| y * w).sum())
            })
            .collect()
    }

    /// Mean detrended value per phase, shifted so the phases sum to zero.
    fn phase_means(&self, detrended: &[Option<f64>]) -> Vec<f64> {
        let period = self.period;
        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];

        for (i, d) in detrended.iter().enumerate() {
            if let Some(d) = d {
                sums[i % period] += d;
                counts[i % period] += 1;
            }
        }

        // n >= 2P guarantees every phase has at least one defined value
        let means: Vec<f64> = sums
            .iter()
            .zip(counts.iter())
            .map(|(s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
            .collect();

        let center = mean(&means);
        means.into_iter().map(|m| m - center).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const PATTERN: [f64; 5] = [0.4, -0.1, 0.3, -0.2, -0.4];

    fn seasonal_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.5 + 0.02 * i as f64 + PATTERN[i % 5])
            .collect()
    }

    #[test]
    fn test_components_reconstruct_series() {
        let series: Vec<f64> = (0..36)
            .map(|i| 1.0 + (i as f64 * 0.7).sin() + 0.01 * (i * i) as f64)
            .collect();
        let result = AdditiveDecomposer::new(5).decompose(&series).unwrap();

        for i in 0..series.len() {
            if let (Some(t), Some(r)) = (result.trend[i], result.residual[i]) {
                let rebuilt = t + result.seasonal[i] + r;
                assert!((rebuilt - series[i]).abs() < 1e-10, "index {i}");
            }
        }
    }

    #[test]
    fn test_edge_points_are_undefined() {
        for period in [2usize, 4, 5, 7] {
            let series = seasonal_series(30);
            let result = AdditiveDecomposer::new(period).decompose(&series).unwrap();
            let edge = period / 2;

            let missing_trend: Vec<usize> = (0..series.len())
                .filter(|&i| result.trend[i].is_none())
                .collect();
            let expected: Vec<usize> = (0..edge).chain(series.len() - edge..series.len()).collect();
            assert_eq!(missing_trend, expected, "period {period}");

            let missing_resid = result.residual.iter().filter(|r| r.is_none()).count();
            assert_eq!(missing_resid, 2 * edge);
            assert_eq!(result.seasonal.len(), series.len());
        }
    }

    #[test]
    fn test_recovers_linear_trend_and_pattern() {
        let series = seasonal_series(40);
        let result = AdditiveDecomposer::new(5).decompose(&series).unwrap();

        for i in 2..38 {
            let expected = 0.5 + 0.02 * i as f64;
            assert!((result.trend[i].unwrap() - expected).abs() < 1e-10);
            assert!(result.residual[i].unwrap().abs() < 1e-10);
        }
        for (i, s) in result.seasonal.iter().enumerate() {
            assert!((s - PATTERN[i % 5]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_seasonal_phases_sum_to_zero() {
        let series: Vec<f64> = (0..24).map(|i| ((i * 7) % 11) as f64).collect();
        let result = AdditiveDecomposer::new(4).decompose(&series).unwrap();
        let cycle: f64 = result.seasonal[..4].iter().sum();
        assert!(cycle.abs() < 1e-10);
    }

    #[test]
    fn test_even_period_uses_half_weights() {
        let series: Vec<f64> = (0..8).map(|i| i as f64 * i as f64).collect();
        let result = AdditiveDecomposer::new(2).decompose(&series).unwrap();
        // 0.25 * x[i-1] + 0.5 * x[i] + 0.25 * x[i+1] for x = i^2
        assert!((result.trend[1].unwrap() - 1.5).abs() < 1e-12);
        assert!((result.trend[3].unwrap() - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_short_series_fails() {
        let series = seasonal_series(9);
        assert_matches!(
            AdditiveDecomposer::new(5).decompose(&series),
            Err(DecompositionError::InsufficientData { needed: 10, got: 9 })
        );
    }

    #[test]
    fn test_non_finite_value_fails() {
        let mut series = seasonal_series(20);
        series[7] = f64::NAN;
        assert_matches!(
            AdditiveDecomposer::new(5).decompose(&series),
            Err(DecompositionError::NonFiniteValue { index: 7 })
        );
    }

    #[test]
    fn test_invalid_period() {
        assert_matches!(
            AdditiveDecomposer::new(1).decompose(&[1.0, 2.0, 3.0]),
            Err(DecompositionError::InvalidPeriod(1))
        );
    }
}
