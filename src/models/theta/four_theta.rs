//! Generalized Theta method (4Theta).
//!
//! Extends [`Theta`](super::Theta) with a choice of trend (linear or
//! exponential) and of how the theta line combines the data with that trend:
//!
//! - Additive: `Z = θ·y + (1 - θ)·T`, forecast `w·SES(Z) + (1 - w)·T`
//! - Multiplicative: `Z = y^θ · T^(1 - θ)`, forecast `SES(Z)^w · T^(1 - w)`
//!
//! with `w = 1/θ` (0 when θ = 0). Data is divided by its mean before
//! fitting when `normalization` is set.

use crate::core::{ModelMode, SeasonalityMode, TrendMode};
use crate::error::{ForecastError, Result};
use crate::models::theta::common::{seasonal_component, Ses};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::seasonality::SeasonalPattern;
use crate::utils::stats::{linear_fit, mean};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 4Theta configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FourTheta {
    pub theta: f64,
    /// Seasonal period; detected automatically when unset. A value of 0 or
    /// 1 disables seasonal adjustment.
    pub seasonality_period: Option<usize>,
    pub season_mode: SeasonalityMode,
    /// Additive or multiplicative theta line. `ModelMode::None` is rejected.
    pub model_mode: ModelMode,
    pub trend_mode: TrendMode,
    pub normalization: bool,
}

impl Default for FourTheta {
    fn default() -> Self {
        Self {
            theta: 2.0,
            seasonality_period: None,
            season_mode: SeasonalityMode::Multiplicative,
            model_mode: ModelMode::Additive,
            trend_mode: TrendMode::Linear,
            normalization: true,
        }
    }
}

impl FourTheta {
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

    pub fn with_model_mode(mut self, mode: ModelMode) -> Self {
        self.model_mode = mode;
        self
    }

    pub fn with_trend_mode(mut self, mode: TrendMode) -> Self {
        self.trend_mode = mode;
        self
    }

    pub fn with_normalization(mut self, normalization: bool) -> Self {
        self.normalization = normalization;
        self
    }
}

/// Trend line in the observation index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trend {
    mode: TrendMode,
    intercept: f64,
    slope: f64,
}

impl Trend {
    fn fit(values: &[f64], mode: TrendMode) -> Result<Self> {
        let (intercept, slope) = match mode {
            TrendMode::Linear => linear_fit(values)?,
            TrendMode::Exponential => {
                let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
                linear_fit(&logs)?
            }
        };
        Ok(Self {
            mode,
            intercept,
            slope,
        })
    }

    fn at(&self, t: usize) -> f64 {
        let linear = self.intercept + self.slope * t as f64;
        match self.mode {
            TrendMode::Linear => linear,
            TrendMode::Exponential => linear.exp(),
        }
    }
}

/// Fitted 4Theta state.
#[derive(Debug, Clone)]
pub struct FittedFourTheta {
    theta: f64,
    model_mode: ModelMode,
    trend: Trend,
    ses: Ses,
    scale: f64,
    n: usize,
    season: Option<SeasonalPattern>,
}

impl FittedFourTheta {
    /// Modes actually used, after any fallback for non-positive data.
    pub fn modes(&self) -> (ModelMode, TrendMode) {
        (self.model_mode, self.trend.mode)
    }

    pub fn alpha(&self) -> f64 {
        self.ses.alpha
    }

    pub fn seasonal_period(&self) -> Option<usize> {
        self.season.as_ref().map(SeasonalPattern::period)
    }

    fn ses_weight(&self) -> f64 {
        if self.theta == 0.0 {
            0.0
        } else {
            1.0 / self.theta
        }
    }
}

impl Estimator for FourTheta {
    type Fitted = FittedFourTheta;

    fn name(&self) -> String {
        format!("4Theta({})", self.theta)
    }

    fn min_train_len(&self) -> usize {
        3
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedFourTheta> {
        if !self.theta.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "theta must be finite, got {}",
                self.theta
            )));
        }
        if self.model_mode == ModelMode::None {
            return Err(ForecastError::InvalidParameter(
                "4Theta needs an additive or multiplicative model mode".into(),
            ));
        }

        let name = self.name();
        let values = data.target_values()?;
        let season =
            seasonal_component(&name, values, self.seasonality_period, self.season_mode)?;
        let mut adjusted = match &season {
            Some(pattern) => pattern.deseasonalize(values),
            None => values.to_vec(),
        };

        let scale = if self.normalization {
            mean(&adjusted)
        } else {
            1.0
        };
        if scale == 0.0 || !scale.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{name} cannot normalize a series with mean {scale}"
            )));
        }
        adjusted.iter_mut().for_each(|v| *v /= scale);

        let (mut model_mode, mut trend_mode) = (self.model_mode, self.trend_mode);
        let needs_positive =
            model_mode == ModelMode::Multiplicative || trend_mode == TrendMode::Exponential;
        if needs_positive && adjusted.iter().any(|&v| v <= 0.0) {
            warn!(
                model = %name,
                "series is not strictly positive; falling back to additive model and linear trend"
            );
            model_mode = ModelMode::Additive;
            trend_mode = TrendMode::Linear;
        }

        let trend = Trend::fit(&adjusted, trend_mode)?;
        let theta_line: Vec<f64> = adjusted
            .iter()
            .enumerate()
            .map(|(t, &y)| match model_mode {
                ModelMode::Multiplicative => {
                    y.powf(self.theta) * trend.at(t).powf(1.0 - self.theta)
                }
                _ => self.theta * y + (1.0 - self.theta) * trend.at(t),
            })
            .collect();
        if theta_line.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(format!(
                "{name} theta line is not finite"
            )));
        }
        let ses = Ses::fit(&theta_line);

        debug!(
            theta = self.theta,
            alpha = ses.alpha,
            model_mode = ?model_mode,
            trend_mode = ?trend_mode,
            period = season.as_ref().map(SeasonalPattern::period),
            "4Theta fitted"
        );

        Ok(FittedFourTheta {
            theta: self.theta,
            model_mode,
            trend,
            ses,
            scale,
            n: values.len(),
            season,
        })
    }
}

impl FittedEstimator for FittedFourTheta {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let w = self.ses_weight();
        let forecast: Vec<f64> = (0..horizon)
            .map(|h| {
                let trend = self.trend.at(self.n + h);
                let combined = match self.model_mode {
                    ModelMode::Multiplicative => self.ses.level.powf(w) * trend.powf(1.0 - w),
                    _ => w * self.ses.level + (1.0 - w) * trend,
                };
                combined * self.scale
            })
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
    use crate::models::theta::Theta;
    use crate::models::Forecaster;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn monthly(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        (0..n as u32)
            .map(|i| Frequency::monthly().advance(start, i).unwrap())
            .collect()
    }

    fn series(values: Vec<f64>) -> TimeSeries {
        TimeSeries::univariate(monthly(values.len()), values).unwrap()
    }

    #[test]
    fn theta_one_matches_plain_theta() {
        let values: Vec<f64> = (0..36).map(|i| 50.0 + i as f64 + (i % 3) as f64).collect();
        let s = series(values);

        let mut four = FourTheta::new(1.0).with_seasonality_period(0).into_model();
        let mut plain = Theta::new(1.0).with_seasonality_period(0).into_model();
        four.fit(&s).unwrap();
        plain.fit(&s).unwrap();

        let a = four.predict(6).unwrap();
        let b = plain.predict(6).unwrap();
        for (x, y) in a
            .univariate_values()
            .unwrap()
            .iter()
            .zip(b.univariate_values().unwrap())
        {
            assert_relative_eq!(x, y, max_relative = 1e-4);
        }
    }

    #[test]
    fn theta_zero_follows_the_trend() {
        let values: Vec<f64> = (0..30).map(|i| 10.0 + 3.0 * i as f64).collect();
        let mut model = FourTheta::new(0.0).with_seasonality_period(0).into_model();
        model.fit(&series(values)).unwrap();

        let v = model.predict(2).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[0], 100.0, epsilon = 1e-9);
        assert_relative_eq!(v[1], 103.0, epsilon = 1e-9);
    }

    #[test]
    fn exponential_trend_extrapolates_growth() {
        let values: Vec<f64> = (0..30).map(|i| 5.0 * 1.05f64.powi(i)).collect();
        let mut model = FourTheta::new(0.0)
            .with_seasonality_period(0)
            .with_trend_mode(TrendMode::Exponential)
            .with_model_mode(ModelMode::Multiplicative)
            .into_model();
        model.fit(&series(values)).unwrap();

        let v = model.predict(1).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[0], 5.0 * 1.05f64.powi(30), max_relative = 1e-9);
    }

    #[test]
    fn non_positive_data_falls_back_to_additive_linear() {
        let values: Vec<f64> = (0..30).map(|i| i as f64 - 5.0).collect();
        let mut model = FourTheta::default()
            .with_seasonality_period(0)
            .with_normalization(false)
            .with_trend_mode(TrendMode::Exponential)
            .with_model_mode(ModelMode::Multiplicative)
            .into_model();
        model.fit(&series(values)).unwrap();

        assert_eq!(
            model.fitted().unwrap().modes(),
            (ModelMode::Additive, TrendMode::Linear)
        );
        assert!(model.predict(3).is_ok());
    }

    #[test]
    fn model_mode_none_is_rejected() {
        let mut model = FourTheta::default().with_model_mode(ModelMode::None).into_model();
        let values: Vec<f64> = (1..=30).map(f64::from).collect();
        assert!(matches!(
            model.fit(&series(values)),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
