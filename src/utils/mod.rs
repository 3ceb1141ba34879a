//! Utility functions for forecasting models.

pub mod backtest;
pub mod generation;
pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod seasonality;
pub mod stats;
#[cfg(test)]
pub(crate) mod test_data;

pub use backtest::{backtest_mape, historical_forecasts, BacktestConfig};
pub use metrics::{accuracy, mae, mape, mase, mse, r2_score, rmse, smape, AccuracyMetrics};
pub use ols::{ols_fit, OlsFit};
pub use optimization::{golden_section, nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use seasonality::{check_seasonality, conventional_period, SeasonalPattern};
pub use stats::normal_quantile;
