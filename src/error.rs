//! Error types for the tsforecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Coarse failure kind of a [`ForecastError`].
///
/// Callers that only care about the family of a failure (for example "a
/// lookup did not find its key") match on the kind instead of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Construction-time data integrity violation.
    MalformedInput,
    /// Boundary outside the valid time axis.
    OutOfRange,
    /// A named lookup did not find its key.
    KeyNotFound,
    /// Input shape does not match what the model declares it accepts.
    Assertion,
    /// Operation not valid in the current model state.
    State,
    /// Invalid argument or configuration value.
    InvalidArgument,
    /// Two series that must share a time axis do not.
    Misaligned,
    /// Numerical failure inside an algorithm.
    Numerical,
    /// Failure reading or writing temporary artifacts.
    Io,
}

/// Errors that can occur during forecasting operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Tabular input or constructor arguments violate a data invariant.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A split boundary or index lies outside the series.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Component lookup by name failed.
    #[error("unknown component: {0:?}")]
    UnknownComponent(String),

    /// Input width does not match the model's declared capability.
    #[error("input shape error: {0}")]
    InputShape(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Forecast horizon must be a positive number of steps.
    #[error("invalid horizon {0}: must be a positive number of steps")]
    InvalidHorizon(usize),

    /// Series that must share a time axis do not.
    #[error("misaligned series: {0}")]
    MisalignedSeries(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Frequency inference failed.
    #[error("could not infer frequency: {0}")]
    FrequencyInference(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Temporary model artifact could not be written or read.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl ForecastError {
    /// Failure kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::MalformedInput(_) | ForecastError::FrequencyInference(_) => {
                ErrorKind::MalformedInput
            }
            ForecastError::OutOfRange(_) => ErrorKind::OutOfRange,
            ForecastError::UnknownComponent(_) => ErrorKind::KeyNotFound,
            ForecastError::InputShape(_) => ErrorKind::Assertion,
            ForecastError::FitRequired => ErrorKind::State,
            ForecastError::InvalidHorizon(_)
            | ForecastError::InvalidParameter(_)
            | ForecastError::InsufficientData { .. } => ErrorKind::InvalidArgument,
            ForecastError::MisalignedSeries(_) => ErrorKind::Misaligned,
            ForecastError::ComputationError(_) => ErrorKind::Numerical,
            ForecastError::Artifact(_) => ErrorKind::Io,
        }
    }

    /// True for "missing key" failures.
    pub fn is_key_not_found(&self) -> bool {
        self.kind() == ErrorKind::KeyNotFound
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Artifact(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Artifact(err.to_string())
    }
}
