//! Forecasting models.
//!
//! Every model is an [`Estimator`] wrapped in a [`Model`], which provides
//! the shared [`Forecaster`] lifecycle. [`registry`] collects them into a
//! catalog.

mod traits;

pub mod arima;
pub mod artifacts;
pub mod baseline;
pub mod exponential;
pub mod fft;
pub mod registry;
pub mod regression;
pub mod theta;

pub use baseline::NaiveSeasonal;
pub use registry::{default_catalog, Backend, ModelConfig, ModelRegistry, ModelSpec};
pub use traits::{
    BoxedForecaster, Estimator, FittedEstimator, Forecaster, InputSpec, Model, Target,
    TrainingData,
};
