use anyhow::bail;

/// Summary statistics for one numeric column.
#[derive(Debug, Clone)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for a single value.
    pub std_dev: f64,
}

impl SeriesStats {
    /// Compute statistics from values, filtering out NaN and infinities.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = vals.iter().sum::<f64>() / count as f64;

        vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        let std_dev = if count > 1 {
            let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(SeriesStats { count, min, max, mean, median, std_dev })
    }

    /// Min/max over several columns at once.
    pub fn global_range<'a>(columns: impl IntoIterator<Item = &'a [f64]>) -> Option<(f64, f64)> {
        columns
            .into_iter()
            .filter_map(SeriesStats::compute)
            .fold(None, |acc, s| match acc {
                None => Some((s.min, s.max)),
                Some((lo, hi)) => Some((lo.min(s.min), hi.max(s.max))),
            })
    }

    /// Format as a one-line summary.
    pub fn report(&self, label: &str) -> String {
        format!(
            "{}: n={} min={:.3} max={:.3} mean={:.3} median={:.3} std={:.3}",
            label, self.count, self.min, self.max, self.mean, self.median, self.std_dev
        )
    }
}

/// What to do with a column whose standard deviation is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ZeroVariancePolicy {
    /// Subtract the mean only; the column becomes all zeros.
    #[default]
    Center,
    /// Divide by zero anyway and let NaN/inf flow through.
    Propagate,
    /// Refuse to continue.
    Fail,
}

/// Parameters applied by [`standardize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub mean: f64,
    pub std_dev: f64,
}

/// Z-score `values` in place: `(v - mean) / std`, with the sample
/// standard deviation over finite values. Non-finite inputs stay NaN.
pub fn standardize(values: &mut [f64], policy: ZeroVariancePolicy) -> anyhow::Result<Scaling> {
    let (mean, std_dev) = match SeriesStats::compute(values) {
        Some(stats) => (stats.mean, stats.std_dev),
        None => (f64::NAN, f64::NAN),
    };

    let divisor = if std_dev > 0.0 {
        std_dev
    } else {
        match policy {
            ZeroVariancePolicy::Center => 1.0,
            ZeroVariancePolicy::Propagate => std_dev,
            ZeroVariancePolicy::Fail => {
                bail!("Zero variance column ({} finite values), cannot standardize", finite_count(values))
            }
        }
    };

    for v in values.iter_mut() {
        *v = if v.is_finite() { (*v - mean) / divisor } else { f64::NAN };
    }

    Ok(Scaling { mean, std_dev })
}

fn finite_count(values: &[f64]) -> usize {
    values.iter().filter(|v| v.is_finite()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_standardize_mean_zero_std_one() {
        let mut values = vec![10.0, 20.0, 30.0, 45.0, 12.5];
        standardize(&mut values, ZeroVariancePolicy::Center).unwrap();
        let stats = SeriesStats::compute(&values).unwrap();
        assert!(stats.mean.abs() < TOL);
        assert!((stats.std_dev - 1.0).abs() < TOL);
    }

    #[test]
    fn test_standardize_uses_sample_std() {
        let mut values = vec![10.0, 20.0, 30.0];
        let scaling = standardize(&mut values, ZeroVariancePolicy::Center).unwrap();
        assert!((scaling.mean - 20.0).abs() < TOL);
        assert!((scaling.std_dev - 10.0).abs() < TOL);
        assert!((values[0] + 1.0).abs() < TOL);
        assert!(values[1].abs() < TOL);
        assert!((values[2] - 1.0).abs() < TOL);
    }

    #[test]
    fn test_standardize_skips_nan() {
        let mut values = vec![1.0, f64::NAN, 3.0];
        standardize(&mut values, ZeroVariancePolicy::Center).unwrap();
        assert!(values[1].is_nan());
        assert!((values[0] + values[2]).abs() < TOL);
    }

    #[test]
    fn test_zero_variance_center() {
        let mut values = vec![5.0, 5.0, 5.0];
        standardize(&mut values, ZeroVariancePolicy::Center).unwrap();
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_variance_propagate() {
        let mut values = vec![5.0, 5.0];
        standardize(&mut values, ZeroVariancePolicy::Propagate).unwrap();
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_zero_variance_fail() {
        let mut values = vec![5.0, 5.0];
        assert!(standardize(&mut values, ZeroVariancePolicy::Fail).is_err());
        assert_eq!(values, vec![5.0, 5.0]);
    }

    #[test]
    fn test_global_range() {
        let a = [1.0, 5.0];
        let b = [-2.0, f64::NAN, 3.0];
        let range = SeriesStats::global_range([&a[..], &b[..]]).unwrap();
        assert_eq!(range, (-2.0, 5.0));
    }

    #[test]
    fn test_stats_median() {
        let stats = SeriesStats::compute(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.count, 4);
    }
}
