//! Exponential smoothing models.

mod exponential_smoothing;

pub use exponential_smoothing::{
    ExponentialSmoothing, FittedExponentialSmoothing, SmoothingParams,
};
