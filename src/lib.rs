//! # tsforecast
//!
//! Forecasting models behind one fit/predict contract.
//!
//! A [`TimeSeries`](core::TimeSeries) holds named components on a regular
//! UTC time axis. Every model (exponential smoothing, ARIMA, AutoARIMA,
//! Theta, 4Theta, FFT, naive seasonal and a covariate-capable lag
//! regression) implements [`Forecaster`](models::Forecaster), which
//! validates input shapes identically for all of them. Forecasts are time
//! series continuing the training axis and are scored with the metrics in
//! [`utils::metrics`].
//!
//! ```
//! use tsforecast::prelude::*;
//! use tsforecast::utils::generation::{sine_timeseries, TimeAxis};
//! use chrono::{TimeZone, Utc};
//!
//! let axis = TimeAxis::new(
//!     Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
//!     60,
//!     Frequency::monthly(),
//! );
//! let series = sine_timeseries(axis, 1.0 / 12.0, 10.0, 0.0, 50.0).unwrap();
//! let (train, test) = series.split_after(series.timestamps()[47]).unwrap();
//!
//! let mut model = NaiveSeasonal::new(12).into_model();
//! model.fit(&train).unwrap();
//! let forecast = model.predict(test.len()).unwrap();
//! assert!(mape(&test, &forecast).unwrap() < 1e-6);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod models;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{Frequency, TimeSeries, TimeSeriesBuilder};
    pub use crate::error::{ErrorKind, ForecastError, Result};
    pub use crate::models::{BoxedForecaster, Estimator, Forecaster, NaiveSeasonal, Target};
    pub use crate::utils::{mape, AccuracyMetrics};
}
