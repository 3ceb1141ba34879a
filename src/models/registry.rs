//! Model catalog: named factories tagged with the backend they need.
//!
//! Optional backends are cargo features. A catalog always lists every
//! model; [`Backend::is_available`] tells at runtime whether the one a
//! model needs was compiled in, and creating an unavailable model fails
//! with an error instead of the crate failing to build or load.

use crate::core::{ModelMode, SeasonalityMode, TrendMode};
use crate::error::{ForecastError, Result};
use crate::models::arima::Arima;
#[cfg(feature = "auto-arima")]
use crate::models::arima::AutoArima;
use crate::models::baseline::NaiveSeasonal;
use crate::models::exponential::ExponentialSmoothing;
use crate::models::fft::{Fft, FftTrend};
use crate::models::regression::LagRegression;
use crate::models::theta::{FourTheta, Theta};
use crate::models::{BoxedForecaster, Estimator};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Implementation a model depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Always compiled.
    Builtin,
    /// Automatic ARIMA order search (feature `auto-arima`).
    AutoArima,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Builtin, Backend::AutoArima];

    pub fn is_available(&self) -> bool {
        match self {
            Backend::Builtin => true,
            Backend::AutoArima => cfg!(feature = "auto-arima"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Builtin => f.write_str("builtin"),
            Backend::AutoArima => f.write_str("auto-arima"),
        }
    }
}

/// Serializable model configuration, tagged by `"model"`.
///
/// ```
/// use tsforecast::models::ModelConfig;
///
/// let config: ModelConfig =
///     serde_json::from_str(r#"{"model": "arima", "p": 0, "d": 1, "q": 1}"#).unwrap();
/// let model = config.build().unwrap();
/// assert_eq!(model.name(), "ARIMA(0, 1, 1)");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelConfig {
    NaiveSeasonal(NaiveSeasonal),
    ExponentialSmoothing(ExponentialSmoothing),
    Arima(Arima),
    #[cfg(feature = "auto-arima")]
    AutoArima(AutoArima),
    Theta(Theta),
    FourTheta(FourTheta),
    Fft(Fft),
    LagRegression(LagRegression),
}

impl ModelConfig {
    pub fn backend(&self) -> Backend {
        match self {
            #[cfg(feature = "auto-arima")]
            ModelConfig::AutoArima(_) => Backend::AutoArima,
            _ => Backend::Builtin,
        }
    }

    /// Display name of the model this configuration builds.
    pub fn name(&self) -> String {
        match self {
            ModelConfig::NaiveSeasonal(c) => c.name(),
            ModelConfig::ExponentialSmoothing(c) => c.name(),
            ModelConfig::Arima(c) => c.name(),
            #[cfg(feature = "auto-arima")]
            ModelConfig::AutoArima(c) => c.name(),
            ModelConfig::Theta(c) => c.name(),
            ModelConfig::FourTheta(c) => c.name(),
            ModelConfig::Fft(c) => c.name(),
            ModelConfig::LagRegression(c) => c.name(),
        }
    }

    /// Fresh, unfitted model.
    pub fn build(&self) -> Result<BoxedForecaster> {
        Ok(match self.clone() {
            ModelConfig::NaiveSeasonal(c) => c.boxed(),
            ModelConfig::ExponentialSmoothing(c) => c.boxed(),
            ModelConfig::Arima(c) => c.boxed(),
            #[cfg(feature = "auto-arima")]
            ModelConfig::AutoArima(c) => c.boxed(),
            ModelConfig::Theta(c) => c.boxed(),
            ModelConfig::FourTheta(c) => c.boxed(),
            ModelConfig::Fft(c) => c.boxed(),
            ModelConfig::LagRegression(c) => c.boxed(),
        })
    }
}

type Factory = Box<dyn Fn() -> Result<BoxedForecaster> + Send + Sync>;

/// Named model factory.
///
/// ```
/// use tsforecast::models::{Backend, Estimator, ModelSpec, NaiveSeasonal};
///
/// let spec = ModelSpec::new("Naive", Backend::Builtin, || Ok(NaiveSeasonal::new(1).boxed()));
/// let model = spec.create().unwrap();
/// assert_eq!(model.name(), "NaiveSeasonal(1)");
/// assert!(!model.is_fitted());
/// ```
pub struct ModelSpec {
    pub name: String,
    pub backend: Backend,
    factory: Factory,
}

impl ModelSpec {
    pub fn new<F>(name: impl Into<String>, backend: Backend, factory: F) -> Self
    where
        F: Fn() -> Result<BoxedForecaster> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            backend,
            factory: Box::new(factory),
        }
    }

    /// Spec building `config`, tagged with the backend it needs.
    pub fn from_config(name: impl Into<String>, config: ModelConfig) -> Self {
        let backend = config.backend();
        Self::new(name, backend, move || config.build())
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Create a fresh model instance.
    pub fn create(&self) -> Result<BoxedForecaster> {
        if !self.is_available() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} needs the {} backend, which is not compiled in",
                self.name, self.backend
            )));
        }
        (self.factory)()
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of model specs.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<ModelSpec>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ModelSpec) {
        self.models.push(spec);
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    /// Specs whose backend is compiled in.
    pub fn available(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter().filter(|spec| spec.is_available())
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|spec| spec.name == name)
    }

    /// Create the model registered under `name`.
    pub fn create(&self, name: &str) -> Result<BoxedForecaster> {
        self.get(name)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("no model named {name:?}")))?
            .create()
    }
}

/// Every model variant in its reference configuration.
///
/// Univariate models first, then the covariate-capable ones. The AutoARIMA
/// entry is listed even when its backend is not compiled in.
pub fn default_catalog() -> ModelRegistry {
    for backend in Backend::ALL {
        info!(%backend, available = backend.is_available(), "forecasting backend");
    }

    let four_theta = FourTheta::default();
    let mut registry = ModelRegistry::new();
    let univariate = [
        (
            "ExponentialSmoothing",
            ModelConfig::ExponentialSmoothing(ExponentialSmoothing::new()),
        ),
        ("ARIMA(0, 1, 1)", ModelConfig::Arima(Arima::new(0, 1, 1))),
        ("ARIMA(1, 1, 1)", ModelConfig::Arima(Arima::new(1, 1, 1))),
        ("Theta(2)", ModelConfig::Theta(Theta::default())),
        ("Theta(1)", ModelConfig::Theta(Theta::new(1.0))),
        ("Theta(-1)", ModelConfig::Theta(Theta::new(-1.0))),
        ("4Theta(1)", ModelConfig::FourTheta(FourTheta::new(1.0))),
        ("4Theta(-1)", ModelConfig::FourTheta(FourTheta::new(-1.0))),
        (
            "4Theta(exponential trend)",
            ModelConfig::FourTheta(four_theta.with_trend_mode(TrendMode::Exponential)),
        ),
        (
            "4Theta(multiplicative)",
            ModelConfig::FourTheta(four_theta.with_model_mode(ModelMode::Multiplicative)),
        ),
        (
            "4Theta(additive season)",
            ModelConfig::FourTheta(four_theta.with_season_mode(SeasonalityMode::Additive)),
        ),
        (
            "FFT(poly trend)",
            ModelConfig::Fft(Fft::new().with_trend(FftTrend::Poly)),
        ),
        ("NaiveSeasonal(12)", ModelConfig::NaiveSeasonal(NaiveSeasonal::new(12))),
        ("NaiveSeasonal(1)", ModelConfig::NaiveSeasonal(NaiveSeasonal::new(1))),
    ];
    for (name, config) in univariate {
        registry.register(ModelSpec::from_config(name, config));
    }

    registry.register(auto_arima_spec());
    registry.register(ModelSpec::from_config(
        "LagRegression(lags=12)",
        ModelConfig::LagRegression(LagRegression::default()),
    ));
    registry
}

#[cfg(feature = "auto-arima")]
fn auto_arima_spec() -> ModelSpec {
    ModelSpec::from_config("AutoARIMA", ModelConfig::AutoArima(AutoArima::new()))
}

#[cfg(not(feature = "auto-arima"))]
fn auto_arima_spec() -> ModelSpec {
    ModelSpec::new("AutoARIMA", Backend::AutoArima, || {
        Err(ForecastError::InvalidParameter(
            "AutoARIMA requires the auto-arima feature".into(),
        ))
    })
}
