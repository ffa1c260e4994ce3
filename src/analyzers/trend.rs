//! Linear trend of chlorophyll against fractional year.

use crate::analyzers::types::TrendFit;
use crate::error::TrendFitError;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Fits `y = intercept + slope * x` by ordinary least squares.
///
/// Pairs where either value is not finite are skipped. The correlation is
/// clamped to [-1, 1], so `r_squared` always lies in [0, 1]; a constant `y`
/// gives `r = 0`.
///
/// # Errors
///
/// Fails with fewer than two usable points or when every `x` is identical.
pub fn fit_trend(x: &[f64], y: &[f64]) -> Result<TrendFit, TrendFitError> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .collect();

    let n = pairs.len();
    if n < 2 {
        return Err(TrendFitError::InsufficientData(n));
    }

    let nf = n as f64;
    let x_mean = pairs.iter().map(|(a, _)| a).sum::<f64>() / nf;
    let y_mean = pairs.iter().map(|(_, b)| b).sum::<f64>() / nf;

    let (mut ss_x, mut ss_y, mut ss_xy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - x_mean;
        let dy = b - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }

    if ss_x == 0.0 {
        return Err(TrendFitError::ConstantX);
    }

    let r = if ss_y == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    };

    let slope = ss_xy / ss_x;
    let intercept = y_mean - slope * x_mean;
    let r_squared = r * r;

    let slope_stderr =
        (n > 2).then(|| ((1.0 - r_squared) * ss_y / ss_x / (nf - 2.0)).max(0.0).sqrt());
    let p_value = slope_stderr.and_then(|se| slope_p_value(slope, se, n));

    Ok(TrendFit {
        slope,
        intercept,
        r,
        r_squared,
        slope_stderr,
        p_value,
        n,
    })
}

/// Two-sided p-value of `t = slope / stderr` under Student's t with `n - 2`
/// degrees of freedom.
fn slope_p_value(slope: f64, stderr: f64, n: usize) -> Option<f64> {
    if stderr == 0.0 {
        // exact fit: any nonzero slope is certain, a flat one is not
        return Some(if slope == 0.0 { 1.0 } else { 0.0 });
    }
    let df = (n - 2) as f64;
    let t_dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let t = (slope / stderr).abs();
    Some((2.0 * (1.0 - t_dist.cdf(t))).clamp(0.0, 1.0))
}

impl TrendFit {
    /// Evaluates the fitted line at each `x`.
    pub fn line(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.predict(v)).collect()
    }
}
