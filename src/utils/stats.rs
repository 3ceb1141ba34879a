//! Statistical utility functions.

use crate::error::{ForecastError, Result};
use crate::utils::ols::ols_fit;
use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile of the standard normal distribution.
///
/// ```
/// use tsforecast::utils::stats::normal_quantile;
///
/// let z = normal_quantile(0.975);
/// assert!((z - 1.96).abs() < 0.01);
/// ```
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(standard) => standard.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Sample autocorrelation function for lags `0..=max_lag`.
///
/// Uses the biased estimator (every lag normalized by the lag-0
/// autocovariance). A constant series has no autocorrelation structure and
/// yields `1.0` at lag 0 and zeros elsewhere.
pub fn acf(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    let max_lag = max_lag.min(n.saturating_sub(1));
    if n == 0 {
        return vec![];
    }

    let m = mean(values);
    let centered: Vec<f64> = values.iter().map(|x| x - m).collect();
    let c0: f64 = centered.iter().map(|x| x * x).sum();

    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                return 1.0;
            }
            if c0 == 0.0 {
                return 0.0;
            }
            let ck: f64 = centered[lag..]
                .iter()
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum();
            ck / c0
        })
        .collect()
}

/// Least-squares line through `(i, values[i])`; returns `(intercept, slope)`.
pub fn linear_fit(values: &[f64]) -> Result<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return Err(ForecastError::InsufficientData { needed: 2, got: n });
    }
    let t_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (y - y_mean);
        sxx += dt * dt;
    }
    let slope = sxy / sxx;
    Ok((y_mean - slope * t_mean, slope))
}

/// Polynomial in the observation index, fitted by least squares.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients of `u^0, u^1, ...` where `u = x / scale`.
    coefficients: Vec<f64>,
    scale: f64,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate at observation index `x` (may lie beyond the fitted range).
    pub fn eval(&self, x: f64) -> f64 {
        let u = x / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * u + c)
    }
}

/// Fit a polynomial of `degree` through `(i, values[i])`.
///
/// The index is rescaled to `[0, 1]` internally so high degrees stay
/// well conditioned on long series.
pub fn polyfit(values: &[f64], degree: usize) -> Result<Polynomial> {
    let n = values.len();
    if n <= degree {
        return Err(ForecastError::InsufficientData {
            needed: degree + 1,
            got: n,
        });
    }

    let scale = (n.max(2) - 1) as f64;
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let u = i as f64 / scale;
            (1..=degree).map(|p| u.powi(p as i32)).collect()
        })
        .collect();

    let fit = ols_fit(values, &rows)?;
    let mut coefficients = Vec::with_capacity(degree + 1);
    coefficients.push(fit.intercept);
    coefficients.extend(fit.coefficients);

    Ok(Polynomial {
        coefficients,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normal_quantile_known_values() {
        assert_relative_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(normal_quantile(0.975), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(normal_quantile(0.025), -1.959964, epsilon = 1e-5);
        assert_eq!(normal_quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(normal_quantile(1.0), f64::INFINITY);
    }

    #[test]
    fn mean_and_variance() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
        assert_relative_eq!(std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn acf_of_trend_decays_slowly() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let r = acf(&values, 3);
        assert_eq!(r.len(), 4);
        assert_relative_eq!(r[0], 1.0);
        assert!(r[1] > 0.8);
        assert!(r[1] > r[2] && r[2] > r[3]);
    }

    #[test]
    fn acf_peaks_at_seasonal_lag() {
        let values: Vec<f64> = (0..48)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        let r = acf(&values, 13);
        assert!(r[12] > 0.7);
        assert!(r[6] < -0.7);
    }

    #[test]
    fn acf_of_constant_series() {
        let r = acf(&[3.0; 10], 2);
        assert_eq!(r, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn linear_fit_recovers_line() {
        let values: Vec<f64> = (0..10).map(|i| 4.0 + 0.5 * i as f64).collect();
        let (intercept, slope) = linear_fit(&values).unwrap();
        assert_relative_eq!(intercept, 4.0, epsilon = 1e-10);
        assert_relative_eq!(slope, 0.5, epsilon = 1e-10);
        assert!(linear_fit(&[1.0]).is_err());
    }

    #[test]
    fn polyfit_recovers_cubic_and_extrapolates() {
        let f = |x: f64| 2.0 - 0.5 * x + 0.01 * x.powi(3);
        let values: Vec<f64> = (0..40).map(|i| f(i as f64)).collect();

        let poly = polyfit(&values, 3).unwrap();
        assert_eq!(poly.degree(), 3);
        assert_relative_eq!(poly.eval(10.0), f(10.0), epsilon = 1e-3);
        assert_relative_eq!(poly.eval(45.0), f(45.0), max_relative = 1e-3);
        assert!(polyfit(&values[..3], 3).is_err());
    }
}
