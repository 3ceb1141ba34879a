//! Pieces shared by the Theta variants: simple exponential smoothing and
//! optional seasonal adjustment.

use crate::core::SeasonalityMode;
use crate::error::Result;
use crate::utils::optimization::golden_section;
use crate::utils::seasonality::{check_seasonality, SeasonalPattern};
use tracing::warn;

/// Simple exponential smoothing with an optimized smoothing level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Ses {
    pub alpha: f64,
    /// Smoothed level after the last observation; also the flat forecast.
    pub level: f64,
}

impl Ses {
    /// Choose `alpha` in `(0, 1)` minimizing the one-step squared error,
    /// starting from the first observation as initial level.
    pub fn fit(values: &[f64]) -> Self {
        let (alpha, _) = golden_section(|a| ses_run(values, a).1, 0.0001, 0.9999, 1e-6);
        Self {
            alpha,
            level: ses_run(values, alpha).0,
        }
    }
}

fn ses_run(values: &[f64], alpha: f64) -> (f64, f64) {
    let mut level = values[0];
    let mut sse = 0.0;
    for &y in &values[1..] {
        let error = y - level;
        sse += error * error;
        level += alpha * error;
    }
    (level, sse)
}

/// Seasonal pattern to remove before fitting, if any.
///
/// An explicit `period` of 0 or 1 disables seasonality; `None` runs the
/// seasonality test with lags up to half the series. Multiplicative mode on
/// data that is not strictly positive falls back to additive.
pub(crate) fn seasonal_component(
    model: &str,
    values: &[f64],
    period: Option<usize>,
    mode: SeasonalityMode,
) -> Result<Option<SeasonalPattern>> {
    if mode == SeasonalityMode::None {
        return Ok(None);
    }
    let period = match period {
        Some(m) => Some(m).filter(|&m| m > 1),
        None => check_seasonality(values, None, (values.len() / 2).max(2), 0.05)?,
    };
    let Some(period) = period else {
        return Ok(None);
    };

    let mode = if mode == SeasonalityMode::Multiplicative && values.iter().any(|&v| v <= 0.0) {
        warn!(
            model,
            "series is not strictly positive; falling back to additive seasonality"
        );
        SeasonalityMode::Additive
    } else {
        mode
    };

    SeasonalPattern::estimate(values, period, mode).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ses_on_constant_series() {
        let ses = Ses::fit(&[4.0; 20]);
        assert_relative_eq!(ses.level, 4.0);
        assert!(ses.alpha > 0.0 && ses.alpha < 1.0);
    }

    #[test]
    fn ses_tracks_a_level_shift() {
        let mut values = vec![10.0; 20];
        values.extend(vec![20.0; 20]);

        let ses = Ses::fit(&values);
        assert!(ses.alpha > 0.9);
        assert_relative_eq!(ses.level, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn explicit_period_of_one_is_not_seasonal() {
        let values: Vec<f64> = (0..24).map(|i| 1.0 + (i % 4) as f64).collect();
        let pattern =
            seasonal_component("test", &values, Some(1), SeasonalityMode::Additive).unwrap();
        assert!(pattern.is_none());

        let pattern =
            seasonal_component("test", &values, Some(4), SeasonalityMode::None).unwrap();
        assert!(pattern.is_none());
    }

    #[test]
    fn multiplicative_falls_back_on_non_positive_data() {
        let values: Vec<f64> = (0..24).map(|i| (i % 4) as f64 - 1.0).collect();
        let pattern =
            seasonal_component("test", &values, Some(4), SeasonalityMode::Multiplicative)
                .unwrap()
                .unwrap();
        assert_eq!(pattern.mode(), SeasonalityMode::Additive);
        assert_eq!(pattern.period(), 4);
    }
}
