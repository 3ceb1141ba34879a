//! ARIMA (Autoregressive Integrated Moving Average) model.

use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{anchors, difference, integrate};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// ARIMA(p, d, q) configuration.
///
/// - AR(p): autoregression on the last `p` differenced values
/// - I(d): `d` rounds of differencing
/// - MA(q): regression on the last `q` one-step errors
///
/// Coefficients are estimated by minimizing the conditional sum of squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arima {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Arima {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of estimated parameters (AR + MA + intercept).
    pub fn num_params(&self) -> usize {
        self.p + self.q + 1
    }
}

impl Default for Arima {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl Estimator for Arima {
    type Fitted = FittedArima;

    fn name(&self) -> String {
        format!("ARIMA({}, {}, {})", self.p, self.d, self.q)
    }

    fn min_train_len(&self) -> usize {
        self.d + self.p.max(self.q) + 2
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedArima> {
        let fitted = FittedArima::estimate(data.target_values()?, *self)?;
        debug!(
            order = ?(self.p, self.d, self.q),
            ar = ?fitted.ar,
            ma = ?fitted.ma,
            intercept = fitted.intercept,
            aic = fitted.aic,
            "ARIMA coefficients estimated"
        );
        Ok(fitted)
    }
}

/// Estimated ARIMA coefficients plus the end of the training series.
#[derive(Debug, Clone)]
pub struct FittedArima {
    order: Arima,
    ar: Vec<f64>,
    ma: Vec<f64>,
    intercept: f64,
    sigma2: f64,
    aic: f64,
    /// Last observed value at each differencing order.
    anchors: Vec<f64>,
    /// Differenced training series.
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

impl FittedArima {
    pub(crate) fn estimate(values: &[f64], order: Arima) -> Result<Self> {
        let Arima { p, q, d } = order;
        let differenced = difference(values, d);
        if differenced.len() <= p.max(q) + 1 {
            return Err(ForecastError::InsufficientData {
                needed: order.min_train_len(),
                got: values.len(),
            });
        }
        let mean = differenced.iter().sum::<f64>() / differenced.len() as f64;

        let (intercept, ar, ma) = if p == 0 && q == 0 {
            (mean, vec![], vec![])
        } else {
            let mut initial = vec![mean];
            initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
            initial.extend((0..q).map(|i| 0.1 / (i + 1) as f64));

            // Keep AR stationary and MA invertible coefficient-wise
            let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
            bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

            let result = nelder_mead(
                |x| {
                    let (ar, ma) = x[1..].split_at(p);
                    conditional_residuals(&differenced, x[0], ar, ma).1
                },
                &initial,
                Some(&bounds),
                NelderMeadConfig::default(),
            );
            let x = result.optimal_point;
            (x[0], x[1..1 + p].to_vec(), x[1 + p..].to_vec())
        };

        let (residuals, css) = conditional_residuals(&differenced, intercept, &ar, &ma);
        let n_eff = (differenced.len() - p.max(q)) as f64;
        let sigma2 = css / n_eff;
        if !sigma2.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} residual variance is not finite",
                order.name()
            )));
        }
        let log_likelihood = -0.5
            * n_eff
            * (1.0 + sigma2.max(f64::MIN_POSITIVE).ln() + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * order.num_params() as f64;

        Ok(Self {
            order,
            ar,
            ma,
            intercept,
            sigma2,
            aic,
            anchors: anchors(values, d),
            differenced,
            residuals,
        })
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Residual variance on the differenced scale.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Akaike information criterion of the conditional fit.
    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn order(&self) -> Arima {
        self.order
    }

    pub(crate) fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut extended = self.differenced.clone();
        let mut errors = self.residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let next = one_step(&extended, &errors, t, self.intercept, &self.ar, &self.ma);
            extended.push(next);
            // Future shocks have zero expectation
            errors.push(0.0);
        }

        integrate(&extended[self.differenced.len()..], &self.anchors)
    }
}

impl FittedEstimator for FittedArima {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        Ok(vec![self.forecast(horizon)])
    }
}

fn one_step(
    series: &[f64],
    errors: &[f64],
    t: usize,
    intercept: f64,
    ar: &[f64],
    ma: &[f64],
) -> f64 {
    let autoregressive: f64 = ar
        .iter()
        .enumerate()
        .map(|(i, phi)| phi * (series[t - 1 - i] - intercept))
        .sum();
    let moving_average: f64 = ma
        .iter()
        .enumerate()
        .map(|(i, theta)| theta * errors[t - 1 - i])
        .sum();
    intercept + autoregressive + moving_average
}

/// One-step errors and their sum of squares, conditioning on the first
/// `max(p, q)` observations (whose errors are taken as zero).
fn conditional_residuals(
    series: &[f64],
    intercept: f64,
    ar: &[f64],
    ma: &[f64],
) -> (Vec<f64>, f64) {
    let start = ar.len().max(ma.len());
    let mut residuals = vec![0.0; series.len()];
    let mut css = 0.0;

    for t in start..series.len() {
        let error = series[t] - one_step(series, &residuals, t, intercept, ar, ma);
        residuals[t] = error;
        css += error * error;
    }

    (residuals, css)
}
