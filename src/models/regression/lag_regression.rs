//! Covariate-aware autoregression on lagged values.
//!
//! Every component (input columns plus any target columns not among them)
//! is regressed by ordinary least squares on the last `lags` values of all
//! components. Forecasts roll the joint system forward one step at a time
//! and return only the target components.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::artifacts::ArtifactDir;
use crate::models::{Estimator, FittedEstimator, InputSpec, TrainingData};
use crate::utils::ols::{ols_fit, OlsFit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Lag regression configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagRegression {
    /// Past steps of every component used as regressors.
    pub lags: usize,
    /// Required input width; any width is accepted when unset.
    pub input_size: Option<usize>,
    /// Number of target components.
    pub output_size: usize,
    /// Write the fitted coefficients as JSON into a temporary directory
    /// owned by the fitted model.
    pub save_checkpoints: bool,
}

impl Default for LagRegression {
    fn default() -> Self {
        Self {
            lags: 12,
            input_size: None,
            output_size: 1,
            save_checkpoints: false,
        }
    }
}

impl LagRegression {
    pub fn new(lags: usize) -> Self {
        Self {
            lags,
            ..Self::default()
        }
    }

    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = Some(input_size);
        self
    }

    pub fn with_output_size(mut self, output_size: usize) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn with_checkpoints(mut self, save: bool) -> Self {
        self.save_checkpoints = save;
        self
    }
}

/// Serialized form of a fitted lag regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub lags: usize,
    /// Names of the modelled components, in regression order.
    pub components: Vec<String>,
    /// Positions of the target components in `components`.
    pub targets: Vec<usize>,
    /// One regression per component.
    pub fits: Vec<OlsFit>,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Fitted coefficients plus the last `lags` observations of every component.
#[derive(Debug)]
pub struct FittedLagRegression {
    checkpoint: Checkpoint,
    /// Most recent `lags` values, one column per component.
    history: Vec<Vec<f64>>,
    artifacts: Option<ArtifactDir>,
}

impl FittedLagRegression {
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Where the checkpoint was written, when checkpoints are enabled.
    pub fn checkpoint_path(&self) -> Option<PathBuf> {
        self.artifacts
            .as_ref()
            .map(|dir| dir.path().join(CHECKPOINT_FILE))
    }

    /// Number of jointly modelled components.
    pub fn width(&self) -> usize {
        self.history.len()
    }
}

impl Estimator for LagRegression {
    type Fitted = FittedLagRegression;

    fn name(&self) -> String {
        format!("LagRegression(lags={})", self.lags)
    }

    fn input_spec(&self) -> InputSpec {
        InputSpec::Covariates {
            input_size: self.input_size,
            output_size: self.output_size,
        }
    }

    fn min_train_len(&self) -> usize {
        self.lags + 1
    }

    fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedLagRegression> {
        if self.lags == 0 {
            return Err(ForecastError::InvalidParameter(
                "lags must be positive".into(),
            ));
        }
        let (components, columns, targets) = joint_components(data.input, data.target);

        let n = data.input.len();
        let regressors = self.lags * columns.len();
        if n < self.lags + regressors + 1 {
            return Err(ForecastError::InsufficientData {
                needed: self.lags + regressors + 1,
                got: n,
            });
        }

        let rows: Vec<Vec<f64>> = (self.lags..n)
            .map(|t| lagged_row(&columns, t, self.lags))
            .collect();
        let fits = columns
            .iter()
            .map(|column| ols_fit(&column[self.lags..], &rows))
            .collect::<Result<Vec<_>>>()?;

        let checkpoint = Checkpoint {
            lags: self.lags,
            components,
            targets,
            fits,
        };
        let artifacts = if self.save_checkpoints {
            let dir = ArtifactDir::create("lag-regression-")?;
            dir.write_json(CHECKPOINT_FILE, &checkpoint)?;
            Some(dir)
        } else {
            None
        };

        debug!(
            lags = self.lags,
            components = ?checkpoint.components,
            targets = ?checkpoint.targets,
            checkpoint = artifacts.is_some(),
            "lag regression fitted"
        );

        Ok(FittedLagRegression {
            history: columns.iter().map(|c| c[n - self.lags..].to_vec()).collect(),
            checkpoint,
            artifacts,
        })
    }
}

impl FittedEstimator for FittedLagRegression {
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
        let lags = self.checkpoint.lags;
        let mut extended = self.history.clone();
        for _ in 0..horizon {
            let t = extended[0].len();
            let row = lagged_row(&extended, t, lags);
            let next = self
                .checkpoint
                .fits
                .iter()
                .map(|fit| fit.predict_row(&row))
                .collect::<Result<Vec<_>>>()?;
            for (column, value) in extended.iter_mut().zip(next) {
                column.push(value);
            }
        }

        Ok(self
            .checkpoint
            .targets
            .iter()
            .map(|&c| extended[c][lags..].to_vec())
            .collect())
    }
}

/// Union of input and target columns.
///
/// A target column counts as an input column when both the name and the
/// values agree; otherwise it is modelled as an extra component.
fn joint_components(
    input: &TimeSeries,
    target: &TimeSeries,
) -> (Vec<String>, Vec<Vec<f64>>, Vec<usize>) {
    let mut names = input.labels().to_vec();
    let mut columns = input.values_by_component().to_vec();
    let mut targets = Vec::with_capacity(target.width());

    for (label, values) in target.labels().iter().zip(target.values_by_component()) {
        let existing = names
            .iter()
            .zip(&columns)
            .position(|(name, column)| name == label && column == values);
        let index = existing.unwrap_or_else(|| {
            names.push(label.clone());
            columns.push(values.clone());
            columns.len() - 1
        });
        targets.push(index);
    }

    (names, columns, targets)
}

/// Regressors for predicting time `t`: lags `1..=lags` of every column.
fn lagged_row(columns: &[Vec<f64>], t: usize, lags: usize) -> Vec<f64> {
    columns
        .iter()
        .flat_map(|column| (1..=lags).map(move |l| column[t - l]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Frequency, TimeSeriesBuilder};
    use crate::models::{Forecaster, Target};
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn monthly(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        (0..n as u32)
            .map(|i| Frequency::monthly().advance(start, i).unwrap())
            .collect()
    }

    /// `y` follows `x` with a one-step delay; `x` alternates.
    fn leading_indicator(n: usize) -> TimeSeries {
        let x: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let y: Vec<f64> = (0..n)
            .map(|i| if i == 0 { 0.0 } else { 3.0 * x[i - 1] + 5.0 })
            .collect();
        TimeSeriesBuilder::new()
            .timestamps(monthly(n))
            .component("x", x)
            .component("y", y)
            .build()
            .unwrap()
    }

    #[test]
    fn learns_lagged_dependency() {
        let series = leading_indicator(40);
        let mut model = LagRegression::new(1).with_input_size(2).into_model();
        model.fit_with_target(&series, Target::from("y")).unwrap();

        let forecast = model.predict(4).unwrap();
        assert_eq!(forecast.labels(), &["y"]);
        // x[40] = 1, so y[40] = 3 * x[39] + 5 = 2 and y[41] = 8
        let v = forecast.univariate_values().unwrap();
        assert_relative_eq!(v[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(v[1], 8.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn separate_target_series_is_modelled_jointly() {
        let series = leading_indicator(40);
        let input = series.select("x").unwrap();
        let target = series.select("y").unwrap();

        let mut model = LagRegression::new(1).into_model();
        model.fit_with_target(&input, Target::from(target)).unwrap();

        let fitted = model.fitted().unwrap();
        assert_eq!(fitted.checkpoint().components, vec!["x", "y"]);
        assert_eq!(fitted.checkpoint().targets, vec![1]);
        assert_eq!(fitted.width(), 2);

        let v = model.predict(2).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[0], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn univariate_use_is_plain_autoregression() {
        let values: Vec<f64> = (0..30).map(|i| 2.0 * i as f64 + 1.0).collect();
        let series = TimeSeries::univariate(monthly(30), values).unwrap();

        let mut model = LagRegression::new(2).into_model();
        model.fit(&series).unwrap();
        let v = model.predict(2).unwrap().univariate_values().unwrap().to_vec();
        assert_relative_eq!(v[0], 61.0, epsilon = 1e-4);
        assert_relative_eq!(v[1], 63.0, epsilon = 1e-4);
    }

    #[test]
    fn checkpoints_live_with_the_fitted_state() {
        let series = leading_indicator(40);
        let mut model = LagRegression::new(1).with_checkpoints(true).into_model();
        model.fit_with_target(&series, Target::from("y")).unwrap();

        let path = model.fitted().unwrap().checkpoint_path().unwrap();
        let saved = Checkpoint::load(&path).unwrap();
        assert_eq!(&saved, model.fitted().unwrap().checkpoint());

        // Refitting replaces the fitted state and its directory
        model.fit_with_target(&series, Target::from("y")).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn too_short_for_the_regressors() {
        let series = leading_indicator(10);
        let mut model = LagRegression::new(4).into_model();
        assert!(matches!(
            model.fit_with_target(&series, Target::from("y")),
            Err(ForecastError::InsufficientData { needed: 13, got: 10 })
        ));
    }
}
