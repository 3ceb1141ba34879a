//! Theta model family.
//!
//! - [`Theta`]: SES plus a drift derived from the linear trend
//! - [`FourTheta`]: generalized variant with linear or exponential trend and
//!   additive or multiplicative combination
//!
//! Both seasonally adjust the series first (multiplicative by default) when
//! a seasonal period is given or detected.

mod common;
mod four_theta;
mod model;

pub use four_theta::{FittedFourTheta, FourTheta};
pub use model::{FittedTheta, Theta};
