//! Core data structures for time series forecasting.

mod datetime;
mod frequency;
mod modes;
mod tabular;
mod time_series;

pub use datetime::DatetimeAttribute;
pub use frequency::Frequency;
pub use modes::{ModelMode, SeasonalityMode, TrendMode};
pub use tabular::{parse_timestamp, parse_value, Table};
pub use time_series::{TimeSeries, TimeSeriesBuilder};
