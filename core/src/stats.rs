//! Population statistics and standardized deviations.
//!
//! Missing values are represented as `None` and never coerced to zero:
//! they are excluded from mean/std and propagate as missing z-scores.

use serde::{Deserialize, Serialize};

/// Standard deviations at or below this fraction of the mean's magnitude
/// are treated as zero variance.
const DEGENERATE_STD_REL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count:   usize,
    pub mean:    f64,
    /// Population standard deviation (divides by n).
    pub std_dev: f64,
}

impl ColumnStats {
    pub fn is_degenerate(&self) -> bool {
        !self.mean.is_finite()
            || !self.std_dev.is_finite()
            || self.std_dev <= DEGENERATE_STD_REL * self.mean.abs().max(1.0)
    }

    /// Absolute z-score of a single value, `None` when undefined.
    pub fn abs_z(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || self.is_degenerate() {
            return None;
        }
        Some(((value - self.mean) / self.std_dev).abs()).filter(|z| z.is_finite())
    }
}

/// Mean and population std over the finite values. `None` if there are none.
/// Columns whose squared deviations overflow are recomputed on values
/// scaled by their largest magnitude.
pub fn population_stats(values: &[f64]) -> Option<ColumnStats> {
    let count = values.iter().filter(|v| v.is_finite()).count();
    if count == 0 {
        return None;
    }
    let (mean, std_dev) = match moments(values, 1.0) {
        (mean, std_dev) if mean.is_finite() && std_dev.is_finite() => (mean, std_dev),
        _ => {
            let scale = values
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .fold(0.0f64, |m, v| m.max(v.abs()));
            let (mean, std_dev) = moments(values, scale);
            (mean * scale, std_dev * scale)
        }
    };
    Some(ColumnStats { count, mean, std_dev })
}

fn moments(values: &[f64], scale: f64) -> (f64, f64) {
    let finite = || values.iter().copied().filter(|v| v.is_finite()).map(|v| v / scale);
    let n = finite().count() as f64;
    let mean = finite().sum::<f64>() / n;
    let variance = finite().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Absolute z-score for every value in the column.
pub fn abs_zscores(values: &[f64]) -> Vec<Option<f64>> {
    match population_stats(values) {
        Some(stats) if !stats.is_degenerate() => {
            values.iter().map(|&v| stats.abs_z(v)).collect()
        }
        _ => vec![None; values.len()],
    }
}

/// Mean of the defined entries, `None` if all are missing.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().flatten().copied().collect();
    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Max of the defined entries, `None` if all are missing.
pub fn max_defined(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_std_divides_by_n() {
        let stats = population_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn non_finite_values_are_excluded_not_zeroed() {
        let z = abs_zscores(&[1.0, f64::NAN, 3.0]);
        assert_eq!(z[0], Some(1.0));
        assert_eq!(z[1], None);
        assert_eq!(z[2], Some(1.0));
    }

    #[test]
    fn huge_outlier_still_stands_out() {
        let mut column = vec![1.0; 100];
        column.push(1e160);
        let z = abs_zscores(&column);
        let outlier = z[100].unwrap();
        let normal = z[0].unwrap();
        assert!((outlier - 10.0).abs() < 1e-6, "outlier z = {outlier}");
        assert!(normal < 0.2, "normal z = {normal}");
    }

    #[test]
    fn non_finite_moments_are_degenerate() {
        let stats = ColumnStats { count: 2, mean: 1.0, std_dev: f64::INFINITY };
        assert!(stats.is_degenerate());
        assert_eq!(stats.abs_z(5.0), None);
    }

    #[test]
    fn constant_column_is_undefined() {
        let v = 1.0 / (1.0 + 1e-6);
        assert!(abs_zscores(&[v; 5]).iter().all(Option::is_none));
        assert!(abs_zscores(&[]).is_empty());
    }

    #[test]
    fn row_reductions_skip_missing() {
        assert_eq!(mean_defined(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(max_defined(&[None, Some(0.5), Some(4.0)]), Some(4.0));
        assert_eq!(mean_defined(&[None, None]), None);
        assert_eq!(max_defined(&[None]), None);
    }
}
