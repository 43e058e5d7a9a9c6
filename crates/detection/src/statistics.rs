//! Window Statistics

use crate::types::Trend;

/// Statistical summary of one parameter's series
#[derive(Debug, Clone, Default)]
pub struct SeriesStats {
    /// Mean value
    pub mean: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean absolute change per step
    pub rate_of_change: f64,
}

impl SeriesStats {
    /// Compute summary statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let rate_of_change = if values.len() >= 2 {
            let mut total_change = 0.0;
            for i in 1..values.len() {
                total_change += (values[i] - values[i - 1]).abs();
            }
            total_change / (values.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            mean,
            std_dev,
            min,
            max,
            rate_of_change,
        }
    }
}

/// Z-score of a value against a series; zero when variance is zero.
pub fn z_score(value: f64, stats: &SeriesStats) -> f64 {
    if stats.std_dev > 0.0 {
        (value - stats.mean) / stats.std_dev
    } else {
        0.0
    }
}

/// Trend over the recent window: mean of the last five readings against
/// the mean of the prior five. A relative change above +10% is worsening,
/// below -10% improving, otherwise stable. Fewer than ten values is
/// always stable.
pub fn compute_trend(values: &[f64]) -> Trend {
    if values.len() < 10 {
        return Trend::Stable;
    }

    let recent = &values[values.len() - 5..];
    let prior = &values[values.len() - 10..values.len() - 5];

    let recent_mean = recent.iter().sum::<f64>() / 5.0;
    let prior_mean = prior.iter().sum::<f64>() / 5.0;

    if prior_mean.abs() < f64::EPSILON {
        return if recent_mean.abs() < f64::EPSILON {
            Trend::Stable
        } else {
            Trend::Worsening
        };
    }

    let relative = (recent_mean - prior_mean) / prior_mean.abs();
    if relative > 0.10 {
        Trend::Worsening
    } else if relative < -0.10 {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = SeriesStats::compute(&values);
        assert!((stats.mean - 5.0).abs() < 0.001);
        assert!((stats.std_dev - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_series() {
        let stats = SeriesStats::compute(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_z_score_constant_series() {
        let stats = SeriesStats::compute(&[5.0, 5.0, 5.0, 5.0]);
        // Constant data must not divide by zero
        assert_eq!(z_score(9.0, &stats), 0.0);
    }

    #[test]
    fn test_z_score() {
        let stats = SeriesStats {
            mean: 10.0,
            std_dev: 2.0,
            ..Default::default()
        };
        assert!((z_score(14.0, &stats) - 2.0).abs() < 0.001);
        assert!((z_score(4.0, &stats) + 3.0).abs() < 0.001);
    }

    #[test]
    fn test_trend_worsening() {
        let mut values = vec![10.0; 5];
        values.extend(vec![12.0; 5]); // +20% over prior five
        assert_eq!(compute_trend(&values), Trend::Worsening);
    }

    #[test]
    fn test_trend_improving() {
        let mut values = vec![10.0; 5];
        values.extend(vec![8.0; 5]); // -20%
        assert_eq!(compute_trend(&values), Trend::Improving);
    }

    #[test]
    fn test_trend_stable_within_band() {
        let mut values = vec![10.0; 5];
        values.extend(vec![10.5; 5]); // +5%, inside the band
        assert_eq!(compute_trend(&values), Trend::Stable);
    }

    #[test]
    fn test_trend_insufficient_history() {
        assert_eq!(compute_trend(&[1.0, 2.0, 3.0]), Trend::Stable);
    }
}
