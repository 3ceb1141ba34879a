//! Naive seasonal forecasting model.
//!
//! Forecasts by repeating the last `k` observations. With `k = 1` this is
//! the plain naive (last value) forecast.

use crate::error::{ForecastError, Result};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use serde::{Deserialize, Serialize};

/// Naive seasonal forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveSeasonal {
    /// Seasonal period; the forecast repeats the last `k` observations.
    pub k: usize,
}

impl NaiveSeasonal {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Default for NaiveSeasonal {
    fn default() -> Self {
        Self::new(1)
    }
}

/// The last season of the training data.
#[derive(Debug, Clone)]
pub struct FittedNaiveSeasonal {
    last_season: Vec<f64>,
}

impl Estimator for NaiveSeasonal {
    type Fitted = FittedNaiveSeasonal;

    fn name(&self) -> String {
        format!("NaiveSeasonal({})", self.k)
    }

    fn min_train_len(&self) -> usize {
        self.k.max(1)
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedNaiveSeasonal> {
        if self.k == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal period k must be at least 1".into(),
            ));
        }
        let values = data.target_values()?;
        Ok(FittedNaiveSeasonal {
            last_season: values[values.len() - self.k..].to_vec(),
        })
    }
}

impl FittedEstimator for FittedNaiveSeasonal {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let forecast = self
            .last_season
            .iter()
            .copied()
            .cycle()
            .take(horizon)
            .collect();
        Ok(vec![forecast])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeSeries;
    use crate::models::Forecaster;
    use chrono::{Duration, TimeZone, Utc};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let timestamps = (0..values.len())
            .map(|i| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn default_repeats_last_value() {
        let mut model = NaiveSeasonal::default().into_model();
        model.fit(&make_series(vec![1.0, 2.0, 3.0])).unwrap();

        let forecast = model.predict(3).unwrap();
        assert_eq!(forecast.univariate_values().unwrap(), &[3.0, 3.0, 3.0]);
        assert_eq!(model.name(), "NaiveSeasonal(1)");
    }

    #[test]
    fn repeats_last_season() {
        let mut model = NaiveSeasonal::new(4).into_model();
        let values = vec![10.0, 20.0, 30.0, 40.0, 11.0, 21.0, 31.0, 41.0];
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict(6).unwrap();
        assert_eq!(
            forecast.univariate_values().unwrap(),
            &[11.0, 21.0, 31.0, 41.0, 11.0, 21.0]
        );
    }

    #[test]
    fn needs_a_full_season() {
        let mut model = NaiveSeasonal::new(12).into_model();
        let err = model.fit(&make_series(vec![1.0; 5])).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { needed: 12, got: 5 });
    }

    #[test]
    fn zero_period_is_invalid() {
        let mut model = NaiveSeasonal::new(0).into_model();
        assert!(matches!(
            model.fit(&make_series(vec![1.0, 2.0])),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}
