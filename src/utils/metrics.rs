//! Accuracy metrics over aligned series.
//!
//! Every metric takes the observed series first and the forecast second.
//! Both must cover exactly the same time axis (same length, same timestamps
//! in the same order) and have the same number of components; otherwise the
//! metric fails with [`ForecastError::MisalignedSeries`]. Errors are pooled
//! over every timestep of every component.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};

/// Bundle of the standard accuracy metrics for one forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    /// `None` when an actual value is zero.
    pub mape: Option<f64>,
    pub smape: f64,
    pub r_squared: f64,
}

fn check_aligned(actual: &TimeSeries, forecast: &TimeSeries) -> Result<()> {
    if !actual.has_same_time_index(forecast) {
        return Err(ForecastError::MisalignedSeries(format!(
            "actual covers {} points from {} to {}, forecast covers {} points from {} to {}",
            actual.len(),
            actual.start_time(),
            actual.end_time(),
            forecast.len(),
            forecast.start_time(),
            forecast.end_time()
        )));
    }
    if actual.width() != forecast.width() {
        return Err(ForecastError::MisalignedSeries(format!(
            "actual has {} components, forecast has {}",
            actual.width(),
            forecast.width()
        )));
    }
    Ok(())
}

/// Pairs `(actual, forecast)` over all components, component by component.
fn pairs<'a>(
    actual: &'a TimeSeries,
    forecast: &'a TimeSeries,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    actual
        .values_by_component()
        .iter()
        .zip(forecast.values_by_component())
        .flat_map(|(a, f)| a.iter().copied().zip(f.iter().copied()))
}

fn mean_of<F>(actual: &TimeSeries, forecast: &TimeSeries, f: F) -> Result<f64>
where
    F: Fn(f64, f64) -> f64,
{
    check_aligned(actual, forecast)?;
    let count = (actual.len() * actual.width()) as f64;
    Ok(pairs(actual, forecast).map(|(a, p)| f(a, p)).sum::<f64>() / count)
}

/// Mean absolute percentage error, in percent.
///
/// Zero actual values are not guarded against: a zero actual with a
/// non-zero forecast makes the result infinite, and a zero actual matched
/// by a zero forecast makes it NaN. Callers with zeros in their data should
/// pick another metric such as [`smape`] or [`mae`].
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tsforecast::core::TimeSeries;
/// use tsforecast::utils::metrics::mape;
///
/// let t: Vec<_> = (1..=2).map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()).collect();
/// let actual = TimeSeries::univariate(t.clone(), vec![100.0, 200.0]).unwrap();
/// let forecast = TimeSeries::univariate(t, vec![110.0, 180.0]).unwrap();
/// assert!((mape(&actual, &forecast).unwrap() - 10.0).abs() < 1e-9);
/// ```
pub fn mape(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    Ok(100.0 * mean_of(actual, forecast, |a, p| ((a - p) / a).abs())?)
}

/// Mean absolute error.
pub fn mae(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    mean_of(actual, forecast, |a, p| (a - p).abs())
}

/// Mean squared error.
pub fn mse(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    mean_of(actual, forecast, |a, p| (a - p).powi(2))
}

/// Root mean squared error.
pub fn rmse(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    Ok(mse(actual, forecast)?.sqrt())
}

/// Symmetric mean absolute percentage error, in percent (0 to 200).
///
/// Points where both values are zero contribute no error.
pub fn smape(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    let v = mean_of(actual, forecast, |a, p| {
        let denom = a.abs() + p.abs();
        if denom == 0.0 {
            0.0
        } else {
            2.0 * (a - p).abs() / denom
        }
    })?;
    Ok(100.0 * v)
}

/// Coefficient of determination, pooled over all components.
///
/// A constant actual series has no variance to explain: the score is 1 for
/// a perfect forecast and negative infinity otherwise.
pub fn r2_score(actual: &TimeSeries, forecast: &TimeSeries) -> Result<f64> {
    check_aligned(actual, forecast)?;
    let count = (actual.len() * actual.width()) as f64;
    let mean = pairs(actual, forecast).map(|(a, _)| a).sum::<f64>() / count;
    let ss_tot: f64 = pairs(actual, forecast).map(|(a, _)| (a - mean).powi(2)).sum();
    let ss_res: f64 = pairs(actual, forecast).map(|(a, p)| (a - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { f64::NEG_INFINITY });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Mean absolute scaled error.
///
/// Forecast MAE divided, per component, by the in-sample MAE of the
/// seasonal naive forecast with period `m` (1 for the plain naive), then
/// averaged over components. `insample` must have the forecast's width.
pub fn mase(
    actual: &TimeSeries,
    forecast: &TimeSeries,
    insample: &TimeSeries,
    m: usize,
) -> Result<f64> {
    check_aligned(actual, forecast)?;
    if insample.width() != actual.width() {
        return Err(ForecastError::MisalignedSeries(format!(
            "insample has {} components, actual has {}",
            insample.width(),
            actual.width()
        )));
    }
    if insample.end_time() >= actual.start_time() {
        return Err(ForecastError::MisalignedSeries(
            "insample series must end before the evaluated period".into(),
        ));
    }
    if m == 0 || insample.len() <= m {
        return Err(ForecastError::InsufficientData {
            needed: m.max(1) + 1,
            got: insample.len(),
        });
    }

    let mut total = 0.0;
    for c in 0..actual.width() {
        let history = insample.component(c)?;
        let naive = history
            .iter()
            .skip(m)
            .zip(history)
            .map(|(cur, prev)| (cur - prev).abs())
            .sum::<f64>()
            / (history.len() - m) as f64;
        if naive == 0.0 {
            return Err(ForecastError::ComputationError(format!(
                "component {c}: naive in-sample error is zero, MASE is undefined"
            )));
        }
        let err = actual
            .component(c)?
            .iter()
            .zip(forecast.component(c)?)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / actual.len() as f64;
        total += err / naive;
    }
    Ok(total / actual.width() as f64)
}

/// Compute every metric of [`AccuracyMetrics`] at once.
pub fn accuracy(actual: &TimeSeries, forecast: &TimeSeries) -> Result<AccuracyMetrics> {
    let mse = mse(actual, forecast)?;
    let has_zero = actual.values_by_component().iter().flatten().any(|&a| a == 0.0);
    Ok(AccuracyMetrics {
        mae: mae(actual, forecast)?,
        mse,
        rmse: mse.sqrt(),
        mape: if has_zero {
            None
        } else {
            Some(mape(actual, forecast)?)
        },
        smape: smape(actual, forecast)?,
        r_squared: r2_score(actual, forecast)?,
    })
}
