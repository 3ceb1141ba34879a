//! Baseline forecasting models.

mod naive_seasonal;

pub use naive_seasonal::{FittedNaiveSeasonal, NaiveSeasonal};
