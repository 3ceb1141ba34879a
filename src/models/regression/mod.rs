//! Regression models that can use covariates.

mod lag_regression;

pub use lag_regression::{Checkpoint, FittedLagRegression, LagRegression};
