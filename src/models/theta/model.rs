//! Theta forecasting model.
//!
//! The series is (optionally) seasonally adjusted, a simple exponential
//! smoothing forecast is made, and a drift derived from the least-squares
//! slope is added:
//!
//! `ŷ_{n+1+i} = l_n + (1 - 1/θ) · b · (i + (1 - (1 - α)^n) / α)`
//!
//! θ = 2 is the classical method (half the slope); θ = 1 reduces to plain
//! SES; θ < 1 extrapolates the trend more strongly than the slope.

use crate::core::SeasonalityMode;
use crate::error::{ForecastError, Result};
use crate::models::theta::common::{seasonal_component, Ses};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::seasonality::SeasonalPattern;
use crate::utils::stats::linear_fit;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Theta method configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theta {
    /// Weight of the theta line; must be non-zero.
    pub theta: f64,
    /// Seasonal period; detected automatically when unset. A value of 0 or
    /// 1 disables seasonal adjustment.
    pub seasonality_period: Option<usize>,
    pub season_mode: SeasonalityMode,
}

impl Default for Theta {
    fn default() -> Self {
        Self {
            theta: 2.0,
            seasonality_period: None,
            season_mode: SeasonalityMode::Multiplicative,
        }
    }
}

impl Theta {
    pub fn new(theta: f64) -> Self {
        Self {
            theta,
            ..Self::default()
        }
    }

    pub fn with_seasonality_period(mut self, period: usize) -> Self {
        self.seasonality_period = Some(period);
        self
    }

    pub fn with_season_mode(mut self, mode: SeasonalityMode) -> Self {
        self.season_mode = mode;
        self
    }
}

/// Fitted Theta state.
#[derive(Debug, Clone)]
pub struct FittedTheta {
    ses: Ses,
    /// Drift per step.
    coef: f64,
    n: usize,
    season: Option<SeasonalPattern>,
}

impl FittedTheta {
    pub fn alpha(&self) -> f64 {
        self.ses.alpha
    }

    pub fn drift(&self) -> f64 {
        self.coef
    }

    pub fn seasonal_period(&self) -> Option<usize> {
        self.season.as_ref().map(SeasonalPattern::period)
    }
}

impl Estimator for Theta {
    type Fitted = FittedTheta;

    fn name(&self) -> String {
        format!("Theta({})", self.theta)
    }

    fn min_train_len(&self) -> usize {
        3
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedTheta> {
        if self.theta == 0.0 || !self.theta.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "theta must be finite and non-zero, got {}",
                self.theta
            )));
        }
        let values = data.target_values()?;
        let season =
            seasonal_component(&self.name(), values, self.seasonality_period, self.season_mode)?;
        let adjusted = match &season {
            Some(pattern) => pattern.deseasonalize(values),
            None => values.to_vec(),
        };

        let ses = Ses::fit(&adjusted);
        let (_, slope) = linear_fit(&adjusted)?;
        let coef = slope * (1.0 - 1.0 / self.theta);

        debug!(
            theta = self.theta,
            alpha = ses.alpha,
            drift = coef,
            period = season.as_ref().map(SeasonalPattern::period),
            "Theta fitted"
        );

        Ok(FittedTheta {
            ses,
            coef,
            n: values.len(),
            season,
        })
    }
}

impl FittedEstimator for FittedTheta {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let alpha = self.ses.alpha;
        let offset = (1.0 - (1.0 - alpha).powi(self.n as i32)) / alpha;
        let forecast: Vec<f64> = (0..horizon)
            .map(|i| self.ses.level + self.coef * (i as f64 + offset))
            .collect();

        Ok(vec![match &self.season {
            Some(pattern) => pattern.reseasonalize(&forecast, self.n),
            None => forecast,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Frequency, TimeSeries};
    use crate::models::Forecaster;
    use crate::utils::test_data::AIR_PASSENGERS_TRAIN;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn monthly(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        (0..n as u32)
            .map(|i| Frequency::monthly().advance(start, i).unwrap())
            .collect()
    }

    fn line(n: usize) -> TimeSeries {
        let values = (0..n).map(|i| 10.0 + 2.0 * i as f64).collect();
        TimeSeries::univariate(monthly(n), values).unwrap()
    }

    #[test]
    fn theta_one_is_plain_ses() {
        let mut model = Theta::new(1.0).with_seasonality_period(0).into_model();
        model.fit(&line(30)).unwrap();

        let fitted = model.fitted().unwrap();
        assert_relative_eq!(fitted.drift(), 0.0);

        let v = model.predict(4).unwrap().univariate_values().unwrap().to_vec();
        assert!(v.iter().all(|x| (x - v[0]).abs() < 1e-12));
    }

    #[test]
    fn classical_theta_uses_half_the_slope() {
        let mut model = Theta::default().with_seasonality_period(0).into_model();
        model.fit(&line(30)).unwrap();

        let fitted = model.fitted().unwrap();
        assert_relative_eq!(fitted.drift(), 1.0, epsilon = 1e-9);

        let v = model.predict(3).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[1] - v[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_theta_extrapolates_harder() {
        let mut model = Theta::new(-1.0).with_seasonality_period(0).into_model();
        model.fit(&line(30)).unwrap();
        assert_relative_eq!(model.fitted().unwrap().drift(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn seasonal_pattern_is_restored() {
        let pattern = [1.2, 0.8, 1.1, 0.9];
        let values: Vec<f64> = (0..40).map(|i| 100.0 * pattern[i % 4]).collect();
        let series = TimeSeries::univariate(monthly(40), values.clone()).unwrap();

        let mut model = Theta::default().with_seasonality_period(4).into_model();
        model.fit(&series).unwrap();
        assert_eq!(model.fitted().unwrap().seasonal_period(), Some(4));

        let forecast = model.predict(4).unwrap();
        for (f, a) in forecast.univariate_values().unwrap().iter().zip(&values[..4]) {
            assert_relative_eq!(f, a, max_relative = 1e-6);
        }
    }

    #[test]
    fn detects_the_yearly_cycle_without_a_period() {
        let n = AIR_PASSENGERS_TRAIN.len();
        let series = TimeSeries::univariate(monthly(n), AIR_PASSENGERS_TRAIN.to_vec()).unwrap();

        let mut model = Theta::default().into_model();
        model.fit(&series).unwrap();
        assert_eq!(model.fitted().unwrap().seasonal_period(), Some(12));
    }

    #[test]
    fn zero_theta_is_invalid() {
        let mut model = Theta::new(0.0).into_model();
        assert!(matches!(
            model.fit(&line(30)),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert_eq!(Theta::default().name(), "Theta(2)");
    }
}
