//! Automatic ARIMA order selection.

use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{
    seasonal_difference, seasonal_integrate, suggest_differencing, suggest_seasonal_differencing,
};
use crate::models::arima::model::{Arima, FittedArima};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::seasonality::{check_seasonality, conventional_period};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search space for [`AutoArima`].
///
/// The differencing order is chosen first (variance-ratio test, optionally
/// preceded by one round of seasonal differencing), then every `(p, q)` up
/// to the maxima is fitted and the lowest AIC wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoArima {
    /// Maximum AR order.
    pub max_p: usize,
    /// Maximum differencing order.
    pub max_d: usize,
    /// Maximum MA order.
    pub max_q: usize,
    /// Whether to consider seasonal differencing at all.
    pub seasonal: bool,
    /// Seasonal period; inferred from the frequency or the ACF when unset.
    pub seasonal_period: Option<usize>,
}

impl Default for AutoArima {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 3,
            seasonal: true,
            seasonal_period: None,
        }
    }
}

impl AutoArima {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum non-seasonal orders.
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = Some(period);
        self
    }

    /// Never apply seasonal differencing.
    pub fn non_seasonal(mut self) -> Self {
        self.seasonal = false;
        self
    }

    fn seasonal_lag(&self, values: &[f64], data: &TrainingData<'_>) -> Result<Option<usize>> {
        if !self.seasonal {
            return Ok(None);
        }
        let period = match self.seasonal_period {
            Some(m) => Some(m),
            None => match data.input.frequency().and_then(conventional_period) {
                Some(m) => Some(m),
                None => check_seasonality(values, None, (values.len() / 2).max(2), 0.05)?,
            },
        };
        Ok(period.filter(|&m| suggest_seasonal_differencing(values, m)))
    }
}

/// Selected ARIMA fit plus what is needed to undo seasonal differencing.
#[derive(Debug, Clone)]
pub struct FittedAutoArima {
    inner: FittedArima,
    seasonal_period: Option<usize>,
    /// Last season of the training series.
    history: Vec<f64>,
    candidates: Vec<(Arima, f64)>,
}

impl FittedAutoArima {
    /// Selected `(p, d, q)`.
    pub fn selected_order(&self) -> Arima {
        self.inner.order()
    }

    /// Lag of the seasonal differencing applied before the ARIMA fit.
    pub fn seasonal_period(&self) -> Option<usize> {
        self.seasonal_period
    }

    /// Every fitted candidate with its AIC.
    pub fn candidates(&self) -> &[(Arima, f64)] {
        &self.candidates
    }
}

impl Estimator for AutoArima {
    type Fitted = FittedAutoArima;

    fn name(&self) -> String {
        "AutoARIMA".to_string()
    }

    fn min_train_len(&self) -> usize {
        self.max_d + 3
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedAutoArima> {
        let values = data.target_values()?;
        let seasonal_period = self.seasonal_lag(values, data)?;
        let working = match seasonal_period {
            Some(m) => seasonal_difference(values, m),
            None => values.to_vec(),
        };

        let d = suggest_differencing(&working, self.max_d);
        let mut candidates = Vec::new();
        let mut best: Option<FittedArima> = None;
        let mut last_error = None;
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                let order = Arima::new(p, d, q);
                if working.len() < order.min_train_len() {
                    continue;
                }
                let fitted = match FittedArima::estimate(&working, order) {
                    Ok(fitted) => fitted,
                    Err(err) => {
                        debug!(order = %order.name(), error = %err, "AutoARIMA candidate rejected");
                        last_error = Some(err);
                        continue;
                    }
                };
                candidates.push((order, fitted.aic()));
                if best.as_ref().map_or(true, |b| fitted.aic() < b.aic()) {
                    best = Some(fitted);
                }
            }
        }

        // A failed fit outranks the length error
        let inner = match (best, last_error) {
            (Some(inner), _) => inner,
            (None, Some(err)) => return Err(err),
            (None, None) => {
                return Err(ForecastError::InsufficientData {
                    needed: Arima::new(0, d, 0).min_train_len() + seasonal_period.unwrap_or(0),
                    got: values.len(),
                })
            }
        };

        debug!(
            order = ?(inner.order().p, inner.order().d, inner.order().q),
            seasonal_period,
            aic = inner.aic(),
            candidates = candidates.len(),
            "AutoARIMA order selected"
        );

        let tail = seasonal_period.unwrap_or(0);
        Ok(FittedAutoArima {
            inner,
            seasonal_period,
            history: values[values.len() - tail..].to_vec(),
            candidates,
        })
    }
}

impl FittedEstimator for FittedAutoArima {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let forecast = self.inner.forecast(horizon);
        Ok(vec![match self.seasonal_period {
            Some(m) => seasonal_integrate(&forecast, &self.history, m),
            None => forecast,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Frequency, TimeSeries};
    use crate::models::Forecaster;
    use crate::utils::generation::{linear_timeseries, TimeAxis};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    #[test]
    fn linear_trend_selects_first_differences() {
        let axis = TimeAxis::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            40,
            Frequency::hourly(),
        );
        let series = linear_timeseries(axis, 0.0, 78.0).unwrap();

        let mut model = AutoArima::new().into_model();
        model.fit(&series).unwrap();

        let fitted = model.fitted().unwrap();
        assert_eq!(fitted.selected_order().d, 1);
        assert_eq!(fitted.seasonal_period(), None);
        assert_eq!(fitted.candidates().len(), 16);

        let forecast = model.predict(2).unwrap();
        let v = forecast.univariate_values().unwrap();
        assert_relative_eq!(v[0], 80.0, epsilon = 1e-6);
        assert_relative_eq!(v[1], 82.0, epsilon = 1e-6);
    }

    #[test]
    fn repeating_monthly_pattern_is_seasonally_differenced() {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..48)
            .map(|i| Frequency::monthly().advance(start, i).unwrap())
            .collect();
        let pattern = [5.0, -3.0, 8.0, 0.0, -6.0, 2.0, 10.0, -4.0, 1.0, -7.0, 3.0, -9.0];
        let values: Vec<f64> = (0..48).map(|i| 50.0 + pattern[i % 12]).collect();
        let series = TimeSeries::univariate(timestamps, values.clone()).unwrap();

        let mut model = AutoArima::new().into_model();
        model.fit(&series).unwrap();
        assert_eq!(model.fitted().unwrap().seasonal_period(), Some(12));

        let forecast = model.predict(12).unwrap();
        for (f, a) in forecast.univariate_values().unwrap().iter().zip(&values[..12]) {
            assert_relative_eq!(f, a, epsilon = 1e-6);
        }
    }

    #[test]
    fn failed_candidates_surface_their_error() {
        let axis = TimeAxis::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            5,
            Frequency::daily(),
        );
        let values = vec![1e300, 2e300, 1.5e300, 3e300, 2.5e300];
        let series = TimeSeries::univariate(axis.timestamps().unwrap(), values).unwrap();

        let mut model = AutoArima::new().into_model();
        let err = model.fit(&series).unwrap_err();
        assert!(matches!(err, ForecastError::ComputationError(_)), "{err}");
        assert!(!model.is_fitted());
    }

    #[test]
    fn seasonal_search_can_be_disabled() {
        let config = AutoArima::new().non_seasonal().with_max_orders(1, 1, 1);
        assert!(!config.seasonal);
        assert_eq!(config.max_p, 1);
        assert_eq!(config.name(), "AutoARIMA");
    }
}
