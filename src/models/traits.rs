//! Forecaster trait and the shared fit/predict lifecycle.
//!
//! Concrete algorithms implement [`Estimator`] (how to learn from validated
//! training data) and [`FittedEstimator`] (how to extrapolate). [`Model`]
//! wraps an estimator and owns everything the algorithms have in common:
//! input-shape validation, target resolution, the `Created -> Fitted` state
//! machine and construction of the forecast [`TimeSeries`].

use crate::core::{Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Which inputs a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSpec {
    /// Only width-1 series, and no separate target.
    Univariate,
    /// Any input width (or exactly `input_size` when set); the target has
    /// `output_size` components.
    Covariates {
        input_size: Option<usize>,
        output_size: usize,
    },
}

/// What a covariate-capable model should learn to predict.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Components of the input series, by name.
    Names(Vec<String>),
    /// A separate series on the same time axis as the input.
    Series(TimeSeries),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Names(vec![name.to_string()])
    }
}

impl From<Vec<String>> for Target {
    fn from(names: Vec<String>) -> Self {
        Target::Names(names)
    }
}

impl From<&[&str]> for Target {
    fn from(names: &[&str]) -> Self {
        Target::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(names: [&str; N]) -> Self {
        Target::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<TimeSeries> for Target {
    fn from(series: TimeSeries) -> Self {
        Target::Series(series)
    }
}

/// Validated input handed to [`Estimator::fit_core`].
///
/// For univariate models `input` and `target` are the same width-1 series.
/// For covariate models `target` shares the time axis of `input`.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub input: &'a TimeSeries,
    pub target: &'a TimeSeries,
}

impl TrainingData<'_> {
    /// Values of a univariate target.
    pub fn target_values(&self) -> Result<&[f64]> {
        self.target.univariate_values()
    }
}

/// Learning half of a forecasting algorithm.
pub trait Estimator: Send {
    type Fitted: FittedEstimator;

    /// Display name, including distinguishing parameters.
    fn name(&self) -> String;

    fn input_spec(&self) -> InputSpec {
        InputSpec::Univariate
    }

    /// Fewest observations `fit_core` can learn from.
    fn min_train_len(&self) -> usize {
        1
    }

    /// Learn from data that already passed the shared validation.
    fn fit_core(&self, data: &TrainingData<'_>) -> Result<Self::Fitted>;

    /// Wrap into a [`Model`] with the shared lifecycle.
    fn into_model(self) -> Model<Self>
    where
        Self: Sized,
    {
        Model::new(self)
    }

    fn boxed(self) -> BoxedForecaster
    where
        Self: Sized + 'static,
    {
        Box::new(Model::new(self))
    }
}

/// Learned state of an [`Estimator`].
pub trait FittedEstimator: Send {
    /// One column of `horizon` values per target component.
    fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>>;
}

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster: Send {
    fn name(&self) -> &str;

    fn input_spec(&self) -> InputSpec;

    /// Fit on `series`; the whole series is the target.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Fit to predict `target` using `series` as context.
    ///
    /// Univariate-only models reject any target with
    /// [`ForecastError::InputShape`].
    fn fit_with_target(&mut self, series: &TimeSeries, target: Target) -> Result<()>;

    /// Forecast `horizon` steps past the end of the training series.
    fn predict(&self, horizon: usize) -> Result<TimeSeries>;

    fn is_fitted(&self) -> bool;

    fn supports_covariates(&self) -> bool {
        matches!(self.input_spec(), InputSpec::Covariates { .. })
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// ```
/// use tsforecast::models::{BoxedForecaster, Estimator, NaiveSeasonal};
///
/// let model: BoxedForecaster = NaiveSeasonal::new(12).boxed();
/// assert_eq!(model.name(), "NaiveSeasonal(12)");
/// assert!(!model.is_fitted());
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;

struct FittedState<F> {
    fitted: F,
    labels: Vec<String>,
    last: DateTime<Utc>,
    frequency: Frequency,
}

enum ModelState<F> {
    Created,
    Fitted(FittedState<F>),
}

/// An estimator plus the shared lifecycle.
pub struct Model<E: Estimator> {
    estimator: E,
    name: String,
    state: ModelState<E::Fitted>,
}

impl<E: Estimator> Model<E> {
    pub fn new(estimator: E) -> Self {
        let name = estimator.name();
        Self {
            estimator,
            name,
            state: ModelState::Created,
        }
    }

    /// The (immutable) configuration.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Learned state, once fitted.
    pub fn fitted(&self) -> Option<&E::Fitted> {
        match &self.state {
            ModelState::Fitted(state) => Some(&state.fitted),
            ModelState::Created => None,
        }
    }

    fn fit_inner(&mut self, series: &TimeSeries, target: Option<Target>) -> Result<()> {
        // A failed fit must not leave an earlier fitted state behind
        self.state = ModelState::Created;

        let target = self.resolve_target(series, target)?;

        let needed = self.estimator.min_train_len();
        if series.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: series.len(),
            });
        }

        let frequency = series.frequency().ok_or_else(|| {
            ForecastError::FrequencyInference(format!(
                "{} cannot extend an irregular or single-point time axis",
                self.name
            ))
        })?;

        let data = TrainingData {
            input: series,
            target: &target,
        };
        let fitted = self.estimator.fit_core(&data)?;

        debug!(
            model = %self.name,
            observations = series.len(),
            input_width = series.width(),
            targets = ?target.labels(),
            "model fitted"
        );

        self.state = ModelState::Fitted(FittedState {
            fitted,
            labels: target.labels().to_vec(),
            last: series.end_time(),
            frequency,
        });
        Ok(())
    }

    fn resolve_target(&self, series: &TimeSeries, target: Option<Target>) -> Result<TimeSeries> {
        match self.estimator.input_spec() {
            InputSpec::Univariate => {
                if target.is_some() {
                    return Err(ForecastError::InputShape(format!(
                        "{} is univariate and does not accept a separate target",
                        self.name
                    )));
                }
                if !series.is_univariate() {
                    return Err(ForecastError::InputShape(format!(
                        "{} only supports univariate series, got width {}",
                        self.name,
                        series.width()
                    )));
                }
                Ok(series.clone())
            }
            InputSpec::Covariates {
                input_size,
                output_size,
            } => {
                if let Some(expected) = input_size {
                    if series.width() != expected {
                        return Err(ForecastError::InputShape(format!(
                            "{} expects {expected} input components, got {}",
                            self.name,
                            series.width()
                        )));
                    }
                }

                let resolved = match target {
                    None => series.clone(),
                    Some(Target::Names(names)) => series.select_many(&names)?,
                    Some(Target::Series(t)) => {
                        if !t.has_same_time_index(series) {
                            return Err(ForecastError::MisalignedSeries(format!(
                                "target of {} must share the input time axis",
                                self.name
                            )));
                        }
                        t
                    }
                };

                if resolved.width() != output_size {
                    return Err(ForecastError::InputShape(format!(
                        "{} predicts {output_size} component(s), target has {}",
                        self.name,
                        resolved.width()
                    )));
                }
                Ok(resolved)
            }
        }
    }
}

impl<E: Estimator> Forecaster for Model<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_spec(&self) -> InputSpec {
        self.estimator.input_spec()
    }

    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        self.fit_inner(series, None)
    }

    fn fit_with_target(&mut self, series: &TimeSeries, target: Target) -> Result<()> {
        self.fit_inner(series, Some(target))
    }

    fn predict(&self, horizon: usize) -> Result<TimeSeries> {
        let ModelState::Fitted(state) = &self.state else {
            return Err(ForecastError::FitRequired);
        };
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon(horizon));
        }

        let columns = state.fitted.predict_core(horizon)?;
        if columns.len() != state.labels.len() || columns.iter().any(|c| c.len() != horizon) {
            return Err(ForecastError::ComputationError(format!(
                "{} produced {} column(s) for {} target component(s) over horizon {horizon}",
                self.name,
                columns.len(),
                state.labels.len()
            )));
        }

        let timestamps = state.frequency.future_timestamps(state.last, horizon)?;
        TimeSeries::from_generated_axis(timestamps, columns, state.labels.clone(), state.frequency)
    }

    fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fitted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimeSeriesBuilder;
    use chrono::{Duration, TimeZone};

    /// Forecasts the training mean of each target component.
    struct MeanEstimator {
        spec: InputSpec,
    }

    struct FittedMean(Vec<f64>);

    impl Estimator for MeanEstimator {
        type Fitted = FittedMean;

        fn name(&self) -> String {
            "Mean".to_string()
        }

        fn input_spec(&self) -> InputSpec {
            self.spec
        }

        fn min_train_len(&self) -> usize {
            3
        }

        fn fit_core(&self, data: &TrainingData<'_>) -> Result<FittedMean> {
            let means = data
                .target
                .values_by_component()
                .iter()
                .map(|c| c.iter().sum::<f64>() / c.len() as f64)
                .collect();
            Ok(FittedMean(means))
        }
    }

    impl FittedEstimator for FittedMean {
        fn predict_core(&self, horizon: usize) -> Result<Vec<Vec<f64>>> {
            Ok(self.0.iter().map(|&m| vec![m; horizon]).collect())
        }
    }

    fn univariate_model() -> Model<MeanEstimator> {
        MeanEstimator {
            spec: InputSpec::Univariate,
        }
        .into_model()
    }

    fn covariate_model(input_size: Option<usize>, output_size: usize) -> Model<MeanEstimator> {
        MeanEstimator {
            spec: InputSpec::Covariates {
                input_size,
                output_size,
            },
        }
        .into_model()
    }

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64))
            .collect()
    }

    fn make_series(n: usize) -> TimeSeries {
        TimeSeries::univariate(make_timestamps(n), (1..=n).map(|i| i as f64).collect()).unwrap()
    }

    fn make_wide_series(n: usize) -> TimeSeries {
        TimeSeriesBuilder::new()
            .timestamps(make_timestamps(n))
            .component("#Passengers", (1..=n).map(|i| i as f64).collect())
            .component("Month", vec![1.0; n])
            .build()
            .unwrap()
    }

    #[test]
    fn forecast_continues_the_training_axis() {
        let mut model = univariate_model();
        let ts = make_series(10);

        model.fit(&ts).unwrap();
        let forecast = model.predict(4).unwrap();

        assert_eq!(forecast.len(), 4);
        assert_eq!(forecast.labels(), ts.labels());
        assert_eq!(forecast.start_time(), ts.end_time() + Duration::days(1));
        assert_eq!(forecast.frequency(), ts.frequency());
        assert_eq!(forecast.univariate_values().unwrap(), &[5.5; 4]);
    }

    #[test]
    fn single_step_forecast_keeps_frequency() {
        let mut model = univariate_model();
        model.fit(&make_series(5)).unwrap();

        let forecast = model.predict(1).unwrap();
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast.frequency(), Some(Frequency::daily()));
    }

    #[test]
    fn predict_is_idempotent() {
        let mut model = univariate_model();
        model.fit(&make_series(10)).unwrap();

        assert_eq!(model.predict(3).unwrap(), model.predict(3).unwrap());
    }

    #[test]
    fn predict_before_fit_is_recoverable() {
        let mut model = univariate_model();
        assert!(!model.is_fitted());
        assert_eq!(model.predict(3).unwrap_err(), ForecastError::FitRequired);

        model.fit(&make_series(10)).unwrap();
        assert!(model.is_fitted());
        assert!(model.predict(3).is_ok());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let mut model = univariate_model();
        model.fit(&make_series(10)).unwrap();
        assert_eq!(model.predict(0).unwrap_err(), ForecastError::InvalidHorizon(0));
    }

    #[test]
    fn univariate_model_rejects_wide_input_and_targets() {
        let mut model = univariate_model();
        let wide = make_wide_series(10);

        let err = model.fit(&wide).unwrap_err();
        assert!(matches!(err, ForecastError::InputShape(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Assertion);

        let err = model
            .fit_with_target(&make_series(10), Target::from("0"))
            .unwrap_err();
        assert!(matches!(err, ForecastError::InputShape(_)));

        // A single selected component is fine
        assert!(model.fit(&wide.select("#Passengers").unwrap()).is_ok());
    }

    #[test]
    fn failed_fit_discards_previous_state() {
        let mut model = univariate_model();
        model.fit(&make_series(10)).unwrap();
        assert!(model.is_fitted());

        assert!(model.fit(&make_wide_series(10)).is_err());
        assert!(!model.is_fitted());
        assert!(model.fitted().is_none());
        assert_eq!(model.predict(1).unwrap_err(), ForecastError::FitRequired);
    }

    #[test]
    fn short_or_irregular_series_are_rejected() {
        let mut model = univariate_model();
        assert!(matches!(
            model.fit(&make_series(2)),
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        ));

        let irregular = TimeSeries::univariate(
            vec![
                Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2020, 1, 5, 0, 0, 0).unwrap(),
            ],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        assert!(matches!(
            model.fit(&irregular),
            Err(ForecastError::FrequencyInference(_))
        ));
    }

    #[test]
    fn covariate_input_width_is_checked_before_target() {
        let mut model = covariate_model(Some(2), 1);
        let narrow = make_series(10);

        // Input width mismatch wins over the unknown target name
        let err = model.fit_with_target(&narrow, Target::from("2")).unwrap_err();
        assert!(matches!(err, ForecastError::InputShape(_)));
    }

    #[test]
    fn covariate_target_lookup_failures_are_key_errors() {
        let mut model = covariate_model(Some(2), 1);
        let wide = make_wide_series(10);

        let err = model.fit_with_target(&wide, Target::from("2")).unwrap_err();
        assert!(err.is_key_not_found());

        let mut model = covariate_model(Some(2), 2);
        let err = model
            .fit_with_target(&wide, Target::from(["#Passengers", "2"]))
            .unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[test]
    fn covariate_target_width_must_match_output_size() {
        let mut model = covariate_model(Some(2), 1);
        let wide = make_wide_series(10);

        // Without a target the whole width-2 series is the target
        assert!(matches!(model.fit(&wide), Err(ForecastError::InputShape(_))));

        model
            .fit_with_target(&wide, Target::from(wide.select("Month").unwrap()))
            .unwrap();
        let forecast = model.predict(2).unwrap();
        assert_eq!(forecast.labels(), &["Month"]);

        let mut model = covariate_model(Some(2), 2);
        model
            .fit_with_target(&wide, Target::from(["#Passengers", "Month"]))
            .unwrap();
        assert_eq!(model.predict(3).unwrap().width(), 2);
    }

    #[test]
    fn covariate_target_series_must_share_the_axis() {
        let mut model = covariate_model(None, 1);
        let wide = make_wide_series(10);
        let shorter = make_series(8);

        assert!(matches!(
            model.fit_with_target(&wide, Target::from(shorter)),
            Err(ForecastError::MisalignedSeries(_))
        ));
    }

    #[test]
    fn boxed_models_are_independent() {
        let mut a: BoxedForecaster = MeanEstimator {
            spec: InputSpec::Univariate,
        }
        .boxed();
        let b: BoxedForecaster = MeanEstimator {
            spec: InputSpec::Univariate,
        }
        .boxed();

        a.fit(&make_series(10)).unwrap();
        assert!(a.is_fitted());
        assert!(!b.is_fitted());
        assert_eq!(a.name(), "Mean");
        assert!(!a.supports_covariates());
    }
}
