//! Seasonality detection and classical seasonal decomposition.

use crate::core::{Frequency, SeasonalityMode};
use crate::error::{ForecastError, Result};
use crate::utils::stats::{acf, normal_quantile};
use chrono::Duration;
use tracing::debug;

/// Conventional seasonal period for common sampling frequencies.
///
/// Monthly data cycles yearly (12), quarterly data yearly (4), daily data
/// weekly (7) and hourly data daily (24).
pub fn conventional_period(frequency: Frequency) -> Option<usize> {
    match frequency {
        Frequency::Months(1) | Frequency::MonthEnd(1) => Some(12),
        Frequency::Months(3) | Frequency::MonthEnd(3) => Some(4),
        Frequency::Fixed(step) if step == Duration::days(1) => Some(7),
        Frequency::Fixed(step) if step == Duration::hours(1) => Some(24),
        _ => None,
    }
}

/// Test whether `values` are seasonal.
///
/// Candidate periods are the strict local maxima of the sample ACF up to
/// `max_lag`, tried in ascending order. Lag 0 is dropped from the ACF before
/// testing. A candidate `m` is accepted when `acf[m]` exceeds Bartlett's
/// standard error `sqrt((1 + 2 * sum(acf[1..m-1]^2)) / n)` scaled by the
/// band `mean + z * var` of the remaining ACF values, with `z` the two-sided
/// normal quantile at level `alpha`. When `m` is given only that period is
/// tested, and it must itself be a local maximum.
///
/// Returns the first accepted period, or `None` when the series is not
/// seasonal.
pub fn check_seasonality(
    values: &[f64],
    m: Option<usize>,
    max_lag: usize,
    alpha: f64,
) -> Result<Option<usize>> {
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(ForecastError::InvalidParameter(format!(
            "alpha must lie in (0, 1), got {alpha}"
        )));
    }
    if let Some(m) = m {
        if m < 2 || m > max_lag {
            return Err(ForecastError::InvalidParameter(format!(
                "period {m} must lie in [2, max_lag = {max_lag}]"
            )));
        }
    }
    if values.len() < 3 {
        return Ok(None);
    }

    let r = acf(values, max_lag);
    let mut candidates: Vec<usize> = (1..r.len().saturating_sub(1))
        .filter(|&k| r[k] > r[k - 1] && r[k] > r[k + 1])
        .collect();

    if let Some(m) = m {
        if !candidates.contains(&m) {
            return Ok(None);
        }
        candidates = vec![m];
    }
    if candidates.is_empty() {
        return Ok(None);
    }

    let lagged = &r[1..];
    let count = lagged.len() as f64;
    let mean = lagged.iter().sum::<f64>() / count;
    let var = lagged.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count;
    let band = mean + normal_quantile(1.0 - alpha / 2.0) * var;

    let n = values.len() as f64;
    for candidate in candidates {
        let spread: f64 = r[1..candidate.saturating_sub(1).max(1)]
            .iter()
            .map(|x| x * x)
            .sum();
        let stat = ((1.0 + 2.0 * spread) / n).sqrt();
        if r[candidate] > stat * band {
            debug!(period = candidate, acf = r[candidate], "seasonality detected");
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Seasonal indices estimated by classical decomposition.
///
/// Index `i` applies to every observation whose position (counted from the
/// start of the fitted data) is congruent to `i` modulo the period.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalPattern {
    mode: SeasonalityMode,
    indices: Vec<f64>,
}

impl SeasonalPattern {
    /// Estimate indices from a centered moving-average trend.
    ///
    /// Needs at least two full periods. Multiplicative mode requires
    /// strictly positive data.
    pub fn estimate(values: &[f64], period: usize, mode: SeasonalityMode) -> Result<Self> {
        if period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal period must be at least 2, got {period}"
            )));
        }
        if values.len() < 2 * period {
            return Err(ForecastError::InsufficientData {
                needed: 2 * period,
                got: values.len(),
            });
        }
        if mode == SeasonalityMode::Multiplicative && values.iter().any(|&v| v <= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "multiplicative seasonality requires strictly positive values".into(),
            ));
        }
        if mode == SeasonalityMode::None {
            return Ok(Self {
                mode,
                indices: vec![0.0; period],
            });
        }

        let trend = centered_moving_average(values, period);

        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for (i, (&y, t)) in values.iter().zip(&trend).enumerate() {
            let Some(t) = t else { continue };
            let detrended = match mode {
                SeasonalityMode::Multiplicative => y / t,
                _ => y - t,
            };
            sums[i % period] += detrended;
            counts[i % period] += 1;
        }

        let mut indices: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { f64::NAN })
            .collect();
        let center = indices.iter().sum::<f64>() / period as f64;
        match mode {
            SeasonalityMode::Multiplicative => indices.iter_mut().for_each(|s| *s /= center),
            _ => indices.iter_mut().for_each(|s| *s -= center),
        }

        if indices.iter().any(|s| !s.is_finite()) {
            return Err(ForecastError::ComputationError(
                "seasonal indices are not finite".into(),
            ));
        }

        Ok(Self { mode, indices })
    }

    pub fn period(&self) -> usize {
        self.indices.len()
    }

    pub fn mode(&self) -> SeasonalityMode {
        self.mode
    }

    pub fn indices(&self) -> &[f64] {
        &self.indices
    }

    /// Remove the pattern from the fitted data.
    pub fn deseasonalize(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| self.unapply(y, i))
            .collect()
    }

    /// Restore the pattern on values starting at position `offset`.
    ///
    /// For a forecast continuing `n` fitted observations, `offset` is `n`.
    pub fn reseasonalize(&self, values: &[f64], offset: usize) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| self.apply(y, offset + i))
            .collect()
    }

    fn apply(&self, y: f64, position: usize) -> f64 {
        let s = self.indices[position % self.period()];
        match self.mode {
            SeasonalityMode::Multiplicative => y * s,
            SeasonalityMode::Additive => y + s,
            SeasonalityMode::None => y,
        }
    }

    fn unapply(&self, y: f64, position: usize) -> f64 {
        let s = self.indices[position % self.period()];
        match self.mode {
            SeasonalityMode::Multiplicative => y / s,
            SeasonalityMode::Additive => y - s,
            SeasonalityMode::None => y,
        }
    }
}

/// Centered moving average; `2 x m` weighting for even `m`.
fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let half = period / 2;
    let n = values.len();
    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let avg = if period % 2 == 0 {
                let inner: f64 = values[i + 1 - half..i + half].iter().sum();
                (inner + 0.5 * (values[i - half] + values[i + half])) / period as f64
            } else {
                values[i - half..=i + half].iter().sum::<f64>() / period as f64
            };
            Some(avg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_data::AIR_PASSENGERS_TRAIN;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.1 * i as f64 + 20.0 * (2.0 * PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn detects_monthly_seasonality() {
        let values = seasonal_series(96, 12);
        let period = check_seasonality(&values, None, 48, 0.05).unwrap();
        assert_eq!(period, Some(12));

        let given = check_seasonality(&values, Some(12), 24, 0.05).unwrap();
        assert_eq!(given, Some(12));
    }

    #[test]
    fn detects_yearly_cycle_in_air_passengers() {
        let values = AIR_PASSENGERS_TRAIN;
        assert_eq!(check_seasonality(&values, None, 48, 0.05).unwrap(), Some(12));
        assert_eq!(check_seasonality(&values, None, 24, 0.05).unwrap(), Some(12));
        assert_eq!(check_seasonality(&values, Some(12), 48, 0.05).unwrap(), Some(12));
    }

    #[test]
    fn constant_series_is_not_seasonal() {
        assert_eq!(check_seasonality(&[4.0; 40], None, 20, 0.05).unwrap(), None);
    }

    #[test]
    fn trend_alone_is_not_seasonal() {
        let values: Vec<f64> = (0..60).map(|i| 2.0 * i as f64).collect();
        assert_eq!(check_seasonality(&values, None, 24, 0.05).unwrap(), None);
        assert_eq!(check_seasonality(&values, Some(12), 24, 0.05).unwrap(), None);
    }

    #[test]
    fn conventional_periods() {
        assert_eq!(conventional_period(Frequency::monthly()), Some(12));
        assert_eq!(conventional_period(Frequency::Months(3)), Some(4));
        assert_eq!(conventional_period(Frequency::daily()), Some(7));
        assert_eq!(conventional_period(Frequency::Months(2)), None);
    }

    #[test]
    fn rejects_invalid_arguments() {
        let values = seasonal_series(48, 12);
        assert!(check_seasonality(&values, Some(1), 24, 0.05).is_err());
        assert!(check_seasonality(&values, Some(30), 24, 0.05).is_err());
        assert!(check_seasonality(&values, None, 24, 1.5).is_err());
    }

    #[test]
    fn additive_pattern_round_trips() {
        let values = seasonal_series(48, 4);
        let pattern = SeasonalPattern::estimate(&values, 4, SeasonalityMode::Additive).unwrap();
        assert_eq!(pattern.period(), 4);
        assert_relative_eq!(pattern.indices().iter().sum::<f64>(), 0.0, epsilon = 1e-9);

        let adjusted = pattern.deseasonalize(&values);
        let restored = pattern.reseasonalize(&adjusted, 0);
        for (a, b) in values.iter().zip(&restored) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn multiplicative_indices_average_to_one() {
        let values: Vec<f64> = (0..36)
            .map(|i| (50.0 + i as f64) * [0.8, 1.0, 1.2][i % 3])
            .collect();
        let pattern =
            SeasonalPattern::estimate(&values, 3, SeasonalityMode::Multiplicative).unwrap();
        assert_relative_eq!(pattern.indices().iter().sum::<f64>() / 3.0, 1.0, epsilon = 1e-9);
        assert!(pattern.indices()[0] < 1.0 && pattern.indices()[2] > 1.0);

        // Forecast positions continue the phase of the fitted data
        let restored = pattern.reseasonalize(&[1.0, 1.0, 1.0], 36);
        assert_eq!(restored, pattern.indices().to_vec());
    }

    #[test]
    fn multiplicative_requires_positive_data() {
        let values: Vec<f64> = (0..24).map(|i| i as f64 - 5.0).collect();
        assert!(matches!(
            SeasonalPattern::estimate(&values, 4, SeasonalityMode::Multiplicative),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(matches!(
            SeasonalPattern::estimate(&values[..6], 4, SeasonalityMode::Additive),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
