//! Expanding-window historical forecasts.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::metrics::mape;
use tracing::debug;

/// Where and how often to refit during a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    /// Number of observations in the first training window.
    pub start: usize,
    /// Steps ahead of each training window that are kept.
    pub horizon: usize,
    /// Observations added to the training window between refits.
    pub stride: usize,
}

impl BacktestConfig {
    pub fn new(start: usize, horizon: usize) -> Self {
        Self {
            start,
            horizon,
            stride: 1,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    fn validate(&self, len: usize) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidHorizon(0));
        }
        if self.stride == 0 {
            return Err(ForecastError::InvalidParameter(
                "stride must be positive".into(),
            ));
        }
        if self.start == 0 || self.start + self.horizon > len {
            return Err(ForecastError::OutOfRange(format!(
                "first window of {} points plus horizon {} does not fit a series of {len}",
                self.start, self.horizon
            )));
        }
        Ok(())
    }

    /// Training-window lengths, one per refit.
    fn windows(&self, len: usize) -> impl Iterator<Item = usize> {
        (self.start..=len - self.horizon).step_by(self.stride)
    }
}

/// Refit `model` on growing prefixes of `series` and keep the
/// `horizon`-th forecast point of each fit.
///
/// The result has one row per refit, stamped with the forecast timestamp,
/// and the components the model forecasts. The model is left fitted on the
/// last training window.
pub fn historical_forecasts(
    model: &mut dyn Forecaster,
    series: &TimeSeries,
    config: &BacktestConfig,
) -> Result<TimeSeries> {
    config.validate(series.len())?;

    let mut timestamps = Vec::new();
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for train_len in config.windows(series.len()) {
        let train = series.slice(0, train_len)?;
        model.fit(&train)?;
        let forecast = model.predict(config.horizon)?;
        timestamps.push(forecast.end_time());
        rows.push(forecast.row(config.horizon - 1)?);
        labels = forecast.labels().to_vec();
    }

    debug!(
        model = model.name(),
        refits = rows.len(),
        horizon = config.horizon,
        "historical forecasts computed"
    );

    let width = labels.len();
    let columns = (0..width)
        .map(|c| rows.iter().map(|r| r[c]).collect())
        .collect();
    TimeSeries::new(timestamps, columns, labels, None)
}

/// MAPE of [`historical_forecasts`] against the matching points of `series`.
pub fn backtest_mape(
    model: &mut dyn Forecaster,
    series: &TimeSeries,
    config: &BacktestConfig,
) -> Result<f64> {
    let forecasts = historical_forecasts(model, series, config)?;
    let observed = series.select_many(forecasts.labels())?;

    let indices: Vec<usize> = config
        .windows(series.len())
        .map(|train_len| train_len + config.horizon - 1)
        .collect();
    let timestamps = indices.iter().map(|&i| observed.timestamps()[i]).collect();
    let columns = observed
        .values_by_component()
        .iter()
        .map(|c| indices.iter().map(|&i| c[i]).collect())
        .collect();
    let actual = TimeSeries::new(timestamps, columns, observed.labels().to_vec(), None)?;

    mape(&actual, &forecasts)
}
