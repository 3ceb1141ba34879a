//! Holt-Winters exponential smoothing.
//!
//! Level, optional (damped) trend and optional seasonality, each combined
//! additively or multiplicatively. Smoothing parameters are chosen by
//! minimizing the one-step-ahead squared error with Nelder-Mead, started
//! from the best points of a coarse parameter grid.
//!
//! With additive trend and additive seasonality the recursions are:
//! - Level: `l_t = α(y_t - s_{t-m}) + (1-α)(l_{t-1} + φb_{t-1})`
//! - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)φb_{t-1}`
//! - Seasonal: `s_t = γ(y_t - l_{t-1} - φb_{t-1}) + (1-γ)s_{t-m}`
//! - Forecast: `ŷ_{t+h} = l_t + (φ + ... + φ^h)b_t + s_{t+h-m}`

use crate::core::{Frequency, ModelMode, SeasonalityMode};
use crate::error::{ForecastError, Result};
use crate::models::{Estimator, FittedEstimator, TrainingData};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::seasonality::{check_seasonality, conventional_period};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

const PARAM_BOUNDS: (f64, f64) = (0.0001, 0.9999);
const PHI_BOUNDS: (f64, f64) = (0.8, 0.98);
const GRID_LEVELS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
/// Grid points refined with Nelder-Mead.
const GRID_STARTS: usize = 3;

/// Every combination of [`GRID_LEVELS`] in `dim` dimensions.
fn coarse_grid(dim: usize) -> Vec<Vec<f64>> {
    (0..dim).fold(vec![vec![]], |points, _| {
        points
            .iter()
            .flat_map(|point| {
                GRID_LEVELS.iter().map(move |&level| {
                    let mut next = point.clone();
                    next.push(level);
                    next
                })
            })
            .collect()
    })
}

/// Exponential smoothing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExponentialSmoothing {
    pub trend: ModelMode,
    pub damped: bool,
    pub seasonal: SeasonalityMode,
    /// Seasonal period; inferred from the series frequency (or, failing
    /// that, from the autocorrelation) when unset.
    pub seasonal_periods: Option<usize>,
}

impl Default for ExponentialSmoothing {
    fn default() -> Self {
        Self {
            trend: ModelMode::Additive,
            damped: false,
            seasonal: SeasonalityMode::Additive,
            seasonal_periods: None,
        }
    }
}

impl ExponentialSmoothing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trend(mut self, trend: ModelMode) -> Self {
        self.trend = trend;
        self
    }

    pub fn with_damped(mut self, damped: bool) -> Self {
        self.damped = damped;
        self
    }

    pub fn with_seasonal(mut self, seasonal: SeasonalityMode) -> Self {
        self.seasonal = seasonal;
        self
    }

    pub fn with_seasonal_periods(mut self, period: usize) -> Self {
        self.seasonal_periods = Some(period);
        self
    }

    fn resolve_period(&self, values: &[f64], frequency: Option<Frequency>) -> Result<Option<usize>> {
        if self.seasonal == SeasonalityMode::None {
            return Ok(None);
        }
        if let Some(m) = self.seasonal_periods {
            return if m >= 2 {
                Ok(Some(m))
            } else {
                Err(ForecastError::InvalidParameter(format!(
                    "seasonal period must be at least 2, got {m}"
                )))
            };
        }

        let from_frequency = frequency.and_then(conventional_period);
        if let Some(m) = from_frequency {
            if values.len() >= 2 * m {
                return Ok(Some(m));
            }
        }

        let max_lag = (values.len() / 2).max(2);
        check_seasonality(values, None, max_lag, 0.05)
    }
}

/// Smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub phi: f64,
}

#[derive(Debug, Clone, Copy)]
struct Structure {
    trend: ModelMode,
    seasonal: SeasonalityMode,
    period: usize,
}

#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
}

impl Structure {
    fn damped_trend(&self, trend: f64, phi: f64) -> f64 {
        match self.trend {
            ModelMode::Additive => phi * trend,
            ModelMode::Multiplicative => trend.powf(phi),
            ModelMode::None => 0.0,
        }
    }

    /// `l ⊕ b`: the level carried forward one step.
    fn base(&self, level: f64, damped: f64) -> f64 {
        match self.trend {
            ModelMode::Additive => level + damped,
            ModelMode::Multiplicative => level * damped,
            ModelMode::None => level,
        }
    }

    fn seasonal_index(&self, t: usize) -> usize {
        if self.period == 0 {
            0
        } else {
            t % self.period
        }
    }

    fn combine(&self, base: f64, s: f64) -> f64 {
        match self.seasonal {
            SeasonalityMode::Additive => base + s,
            SeasonalityMode::Multiplicative => base * s,
            SeasonalityMode::None => base,
        }
    }

    /// Observations consumed by initialization.
    fn warmup(&self) -> usize {
        match (self.period, self.trend) {
            (0, ModelMode::None) => 1,
            (0, _) => 2,
            (m, _) => m,
        }
    }

    fn initial_state(&self, values: &[f64]) -> State {
        if self.period == 0 {
            let level = values[0];
            let trend = match self.trend {
                ModelMode::Additive => values[1] - values[0],
                ModelMode::Multiplicative => values[1] / values[0],
                ModelMode::None => 0.0,
            };
            let level = match self.trend {
                ModelMode::None => level,
                _ => values[1],
            };
            return State {
                level,
                trend,
                seasonals: vec![],
            };
        }

        let m = self.period;
        let first = &values[..m];
        let level = first.iter().sum::<f64>() / m as f64;
        let trend = match self.trend {
            ModelMode::Additive => {
                (0..m).map(|i| values[m + i] - values[i]).sum::<f64>() / (m * m) as f64
            }
            ModelMode::Multiplicative => {
                let second = values[m..2 * m].iter().sum::<f64>() / m as f64;
                (second / level).powf(1.0 / m as f64)
            }
            ModelMode::None => 0.0,
        };

        let mut seasonals: Vec<f64> = match self.seasonal {
            SeasonalityMode::Multiplicative => first.iter().map(|y| y / level).collect(),
            _ => first.iter().map(|y| y - level).collect(),
        };
        let center = seasonals.iter().sum::<f64>() / m as f64;
        match self.seasonal {
            SeasonalityMode::Multiplicative => seasonals.iter_mut().for_each(|s| *s /= center),
            _ => seasonals.iter_mut().for_each(|s| *s -= center),
        }

        State {
            level,
            trend,
            seasonals,
        }
    }

    /// Run the recursions over `values`; returns the final state and the
    /// sum of squared one-step errors.
    fn filter(&self, values: &[f64], p: &SmoothingParams) -> (State, f64) {
        let mut state = self.initial_state(values);
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate().skip(self.warmup()) {
            let idx = self.seasonal_index(t);
            let s = state.seasonals.get(idx).copied().unwrap_or(0.0);
            let damped = self.damped_trend(state.trend, p.phi);
            let base = self.base(state.level, damped);

            let error = y - self.combine(base, s);
            sse += error * error;

            let deseasonalized = match self.seasonal {
                SeasonalityMode::Additive => y - s,
                SeasonalityMode::Multiplicative => y / s,
                SeasonalityMode::None => y,
            };
            let previous = state.level;
            state.level = p.alpha * deseasonalized + (1.0 - p.alpha) * base;
            state.trend = match self.trend {
                ModelMode::Additive => p.beta * (state.level - previous) + (1.0 - p.beta) * damped,
                ModelMode::Multiplicative => {
                    p.beta * (state.level / previous) + (1.0 - p.beta) * damped
                }
                ModelMode::None => 0.0,
            };
            if let Some(seasonal) = state.seasonals.get_mut(idx) {
                *seasonal = match self.seasonal {
                    SeasonalityMode::Multiplicative => p.gamma * (y / base) + (1.0 - p.gamma) * s,
                    _ => p.gamma * (y - base) + (1.0 - p.gamma) * s,
                };
            }
        }

        (state, sse)
    }
}

/// Fitted exponential smoothing state.
#[derive(Debug, Clone)]
pub struct FittedExponentialSmoothing {
    structure: Structure,
    params: SmoothingParams,
    state: State,
    sse: f64,
    /// Position of the first forecast step in the seasonal cycle.
    next_index: usize,
}

impl FittedExponentialSmoothing {
    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    /// Sum of squared one-step errors over the training series.
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Seasonal period in use, `None` for a non-seasonal fit.
    pub fn seasonal_period(&self) -> Option<usize> {
        (self.structure.period > 0).then_some(self.structure.period)
    }
}

impl Estimator for ExponentialSmoothing {
    type Fitted = FittedExponentialSmoothing;

    fn name(&self) -> String {
        "ExponentialSmoothing".to_string()
    }

    fn min_train_len(&self) -> usize {
        match (self.seasonal, self.seasonal_periods) {
            (SeasonalityMode::None, _) | (_, None) => 3,
            (_, Some(m)) => (2 * m).max(3),
        }
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedExponentialSmoothing> {
        let values = data.target_values()?;
        let needs_positive = self.trend == ModelMode::Multiplicative
            || self.seasonal == SeasonalityMode::Multiplicative;
        if needs_positive && values.iter().any(|&v| v <= 0.0) {
            return Err(ForecastError::InvalidParameter(
                "multiplicative components require strictly positive values".into(),
            ));
        }

        let period = self.resolve_period(values, data.input.frequency())?;
        let structure = Structure {
            trend: self.trend,
            seasonal: if period.is_some() {
                self.seasonal
            } else {
                SeasonalityMode::None
            },
            period: period.unwrap_or(0),
        };
        if let Some(m) = period {
            if values.len() < 2 * m {
                return Err(ForecastError::InsufficientData {
                    needed: 2 * m,
                    got: values.len(),
                });
            }
        }

        let has_trend = structure.trend != ModelMode::None;
        let has_season = structure.period > 0;
        let damped = self.damped && has_trend;

        // Free parameters in a fixed order: alpha, [beta], [gamma], [phi]
        let mut bounds = vec![PARAM_BOUNDS];
        if has_trend {
            bounds.push(PARAM_BOUNDS);
        }
        if has_season {
            bounds.push(PARAM_BOUNDS);
        }
        if damped {
            bounds.push(PHI_BOUNDS);
        }

        let unpack = |x: &[f64]| {
            let mut it = x.iter().copied();
            let alpha = it.next().unwrap_or(0.3);
            let beta = if has_trend { it.next().unwrap_or(0.1) } else { 0.0 };
            let gamma = if has_season { it.next().unwrap_or(0.1) } else { 0.0 };
            let phi = if damped { it.next().unwrap_or(0.9) } else { 1.0 };
            SmoothingParams {
                alpha,
                beta,
                gamma,
                phi,
            }
        };
        let objective = |x: &[f64]| structure.filter(values, &unpack(x)).1;

        // Refine the best few points of a coarse grid, keep the lowest SSE
        let smoothing = bounds.len() - usize::from(damped);
        let mut starts: Vec<(Vec<f64>, f64)> = coarse_grid(smoothing)
            .into_iter()
            .map(|mut point| {
                if damped {
                    point.push(0.9);
                }
                let sse = objective(&point[..]);
                (point, if sse.is_finite() { sse } else { f64::INFINITY })
            })
            .collect();
        starts.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let result = starts
            .iter()
            .take(GRID_STARTS)
            .map(|(start, _)| {
                nelder_mead(&objective, start, Some(&bounds), NelderMeadConfig::default())
            })
            .min_by(|a, b| {
                a.optimal_value
                    .partial_cmp(&b.optimal_value)
                    .unwrap_or(Ordering::Equal)
            })
            .ok_or_else(|| {
                ForecastError::ComputationError("no starting point for exponential smoothing".into())
            })?;
        let params = unpack(&result.optimal_point);
        let (state, sse) = structure.filter(values, &params);
        if !sse.is_finite() {
            return Err(ForecastError::ComputationError(
                "exponential smoothing diverged".into(),
            ));
        }

        debug!(
            alpha = params.alpha,
            beta = params.beta,
            gamma = params.gamma,
            phi = params.phi,
            period = structure.period,
            sse,
            "exponential smoothing parameters selected"
        );

        Ok(FittedExponentialSmoothing {
            structure,
            params,
            state,
            sse,
            next_index: structure.seasonal_index(values.len()),
        })
    }
}

impl FittedEstimator for FittedExponentialSmoothing {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let s = &self.structure;
        let phi = self.params.phi;
        let mut phi_sum = 0.0;
        let mut phi_power = 1.0;

        let forecast = (0..horizon)
            .map(|h| {
                phi_power *= phi;
                phi_sum += phi_power;
                let base = match s.trend {
                    ModelMode::Additive => self.state.level + phi_sum * self.state.trend,
                    ModelMode::Multiplicative => self.state.level * self.state.trend.powf(phi_sum),
                    ModelMode::None => self.state.level,
                };
                let seasonal = self
                    .state
                    .seasonals
                    .get(s.seasonal_index(self.next_index + h))
                    .copied()
                    .unwrap_or(0.0);
                s.combine(base, seasonal)
            })
            .collect();

        Ok(vec![forecast])
    }
}
