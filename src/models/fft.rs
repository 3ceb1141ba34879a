//! Fourier extrapolation.
//!
//! The series is detrended, cropped so it starts in the same season as the
//! first forecast step, and transformed with an FFT. Only the strongest
//! frequencies are kept; the inverse transform is then repeated
//! periodically into the future and the trend is added back.

use crate::core::{DatetimeAttribute, Frequency};
use crate::error::{ForecastError, Result};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::stats::{linear_fit, polyfit, Polynomial};
use chrono::{DateTime, Duration, Utc};
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Trend removed before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftTrend {
    /// Polynomial of `trend_poly_degree`.
    Poly,
    /// Exponential growth, fitted on the log of the series.
    Exponential,
}

/// FFT model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fft {
    /// Frequencies kept after filtering; `None` keeps the full spectrum.
    pub nr_freqs_to_keep: Option<usize>,
    /// Calendar attributes the first training timestamp must share with the
    /// first forecast timestamp. Inferred from the frequency when unset.
    pub required_matches: Option<Vec<DatetimeAttribute>>,
    pub trend: Option<FftTrend>,
    pub trend_poly_degree: usize,
}

impl Default for Fft {
    fn default() -> Self {
        Self {
            nr_freqs_to_keep: Some(10),
            required_matches: None,
            trend: None,
            trend_poly_degree: 3,
        }
    }
}

impl Fft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nr_freqs_to_keep(mut self, n: Option<usize>) -> Self {
        self.nr_freqs_to_keep = n;
        self
    }

    pub fn with_required_matches(mut self, attributes: Vec<DatetimeAttribute>) -> Self {
        self.required_matches = Some(attributes);
        self
    }

    pub fn with_trend(mut self, trend: FftTrend) -> Self {
        self.trend = Some(trend);
        self
    }

    pub fn with_trend_poly_degree(mut self, degree: usize) -> Self {
        self.trend_poly_degree = degree;
        self
    }

    fn matches_for(&self, frequency: Frequency) -> Vec<DatetimeAttribute> {
        if let Some(matches) = &self.required_matches {
            return matches.clone();
        }
        match frequency {
            Frequency::Months(_) | Frequency::MonthEnd(_) => vec![DatetimeAttribute::Month],
            Frequency::Fixed(step) if step == Duration::days(1) => {
                vec![DatetimeAttribute::Weekday]
            }
            Frequency::Fixed(step) if step == Duration::hours(1) => vec![DatetimeAttribute::Hour],
            Frequency::Fixed(_) => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TrendCurve {
    Flat,
    Poly(Polynomial),
    Exponential { intercept: f64, slope: f64 },
}

impl TrendCurve {
    fn at(&self, t: usize) -> f64 {
        match self {
            TrendCurve::Flat => 0.0,
            TrendCurve::Poly(poly) => poly.eval(t as f64),
            TrendCurve::Exponential { intercept, slope } => (intercept + slope * t as f64).exp(),
        }
    }
}

/// Filtered periodic signal plus trend.
#[derive(Debug, Clone)]
pub struct FittedFft {
    trend: TrendCurve,
    /// One period of the filtered signal, aligned with the first forecast step.
    signal: Vec<f64>,
    n: usize,
}

impl FittedFft {
    /// Length of the repeated period.
    pub fn period(&self) -> usize {
        self.signal.len()
    }
}

impl Estimator for Fft {
    type Fitted = FittedFft;

    fn name(&self) -> String {
        "FFT".to_string()
    }

    fn min_train_len(&self) -> usize {
        match self.trend {
            Some(FftTrend::Poly) => self.trend_poly_degree + 1,
            Some(FftTrend::Exponential) => 2,
            None => 1,
        }
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedFft> {
        if self.nr_freqs_to_keep == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "nr_freqs_to_keep must be positive".into(),
            ));
        }
        let values = data.target_values()?;
        let trend = match self.trend {
            None => TrendCurve::Flat,
            Some(FftTrend::Poly) => TrendCurve::Poly(polyfit(values, self.trend_poly_degree)?),
            Some(FftTrend::Exponential) => {
                if values.iter().any(|&v| v <= 0.0) {
                    return Err(ForecastError::InvalidParameter(
                        "an exponential trend requires strictly positive values".into(),
                    ));
                }
                let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
                let (intercept, slope) = linear_fit(&logs)?;
                TrendCurve::Exponential { intercept, slope }
            }
        };
        let detrended: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(t, y)| y - trend.at(t))
            .collect();

        let frequency = data.input.frequency().ok_or_else(|| {
            ForecastError::FrequencyInference("FFT needs a regular time axis".into())
        })?;
        let first_forecast = frequency.advance(data.input.end_time(), 1).ok_or_else(|| {
            ForecastError::OutOfRange("forecast start lies beyond the calendar".into())
        })?;
        let matches = self.matches_for(frequency);
        let start = season_start(data.input.timestamps(), first_forecast, &matches);

        let signal = filtered_signal(&detrended[start..], self.nr_freqs_to_keep);
        debug!(
            cropped = start,
            period = signal.len(),
            kept = ?self.nr_freqs_to_keep,
            "FFT fitted"
        );

        Ok(FittedFft {
            trend,
            signal,
            n: values.len(),
        })
    }
}

impl FittedEstimator for FittedFft {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let period = self.signal.len();
        Ok(vec![(0..horizon)
            .map(|h| self.signal[h % period] + self.trend.at(self.n + h))
            .collect()])
    }
}

/// Index of the first timestamp agreeing with `target` on every attribute.
fn season_start(
    timestamps: &[DateTime<Utc>],
    target: DateTime<Utc>,
    matches: &[DatetimeAttribute],
) -> usize {
    let found = timestamps
        .iter()
        .position(|t| matches.iter().all(|a| a.value(t) == a.value(&target)));
    match found {
        Some(i) => i,
        None => {
            warn!(
                ?matches,
                "no training timestamp matches the forecast season; using the whole series"
            );
            0
        }
    }
}

/// Inverse transform after zeroing all but the `keep` largest coefficients.
fn filtered_signal(values: &[f64], keep: Option<usize>) -> Vec<f64> {
    let n = values.len();
    let mut planner = FftPlanner::<f64>::new();
    let mut spectrum: Vec<Complex64> = values.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    if let Some(keep) = keep.filter(|&k| k < n) {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            spectrum[b]
                .norm()
                .partial_cmp(&spectrum[a].norm())
                .unwrap_or(Ordering::Equal)
        });
        for &k in &order[keep..] {
            spectrum[k] = Complex64::new(0.0, 0.0);
        }
    }

    planner.plan_fft_inverse(n).process(&mut spectrum);
    spectrum.iter().map(|c| c.re / n as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeSeries;
    use crate::models::Forecaster;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn monthly(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        (0..n as u32)
            .map(|i| Frequency::monthly().advance(start, i).unwrap())
            .collect()
    }

    #[test]
    fn full_spectrum_repeats_the_cropped_history() {
        let pattern = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0, 8.0];
        let values: Vec<f64> = (0..30).map(|i| pattern[i % 12]).collect();
        let series = TimeSeries::univariate(monthly(30), values).unwrap();

        let mut model = Fft::new().with_nr_freqs_to_keep(None).into_model();
        model.fit(&series).unwrap();

        // Training ends in June; the crop starts at the first July
        assert_eq!(model.fitted().unwrap().period(), 24);
        let forecast = model.predict(12).unwrap();
        for (i, v) in forecast.univariate_values().unwrap().iter().enumerate() {
            assert_relative_eq!(*v, pattern[(i + 6) % 12], epsilon = 1e-9);
        }
    }

    #[test]
    fn filtering_keeps_the_dominant_cycle() {
        let values: Vec<f64> = (0..48)
            .map(|i| 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        let series = TimeSeries::univariate(monthly(48), values.clone()).unwrap();

        // The sine occupies two conjugate bins
        let mut model = Fft::new().with_nr_freqs_to_keep(Some(2)).into_model();
        model.fit(&series).unwrap();

        let forecast = model.predict(12).unwrap();
        for (f, a) in forecast.univariate_values().unwrap().iter().zip(&values[..12]) {
            assert_relative_eq!(f, a, epsilon = 1e-9);
        }
    }

    #[test]
    fn polynomial_trend_is_extrapolated() {
        let values: Vec<f64> = (0..36).map(|i| 5.0 + 0.5 * i as f64).collect();
        let series = TimeSeries::univariate(monthly(36), values).unwrap();

        let mut model = Fft::new()
            .with_trend(FftTrend::Poly)
            .with_trend_poly_degree(1)
            .into_model();
        model.fit(&series).unwrap();

        let v = model.predict(3).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[0], 23.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 24.0, epsilon = 1e-6);
    }

    #[test]
    fn exponential_trend_needs_positive_values() {
        let values: Vec<f64> = (0..24).map(|i| i as f64 - 1.0).collect();
        let series = TimeSeries::univariate(monthly(24), values).unwrap();
        let mut model = Fft::new().with_trend(FftTrend::Exponential).into_model();
        assert!(matches!(
            model.fit(&series),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn zero_frequencies_is_invalid() {
        let series = TimeSeries::univariate(monthly(24), vec![1.0; 24]).unwrap();
        let mut model = Fft::new().with_nr_freqs_to_keep(Some(0)).into_model();
        assert!(model.fit(&series).is_err());
    }
}
