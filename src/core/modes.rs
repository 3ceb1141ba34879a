//! Component modes shared by the decomposition-based models.

use serde::{Deserialize, Serialize};

/// How a trend (or the theta lines) combine with the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    #[default]
    Additive,
    Multiplicative,
    None,
}

/// How a seasonal pattern combines with the rest of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    Additive,
    #[default]
    Multiplicative,
    None,
}

/// Shape of a fitted trend line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMode {
    #[default]
    Linear,
    Exponential,
}
