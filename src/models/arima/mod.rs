//! ARIMA models.
//!
//! - [`Arima`]: fixed (p, d, q) order, conditional-sum-of-squares fit
//! - [`AutoArima`]: order search by AIC (feature `auto-arima`)

#[cfg(feature = "auto-arima")]
mod auto_arima;
mod diff;
mod model;

#[cfg(feature = "auto-arima")]
pub use auto_arima::{AutoArima, FittedAutoArima};
pub use diff::{
    anchors, difference, integrate, seasonal_difference, seasonal_integrate, suggest_differencing,
    suggest_seasonal_differencing,
};
pub use model::{Arima, FittedArima};
