//! Calendar attributes derivable from a time axis.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A deterministic calendar attribute of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatetimeAttribute {
    Year,
    /// Quarter of the year, 1..=4.
    Quarter,
    /// Month of the year, 1..=12.
    Month,
    /// ISO week number.
    Week,
    /// Day of the month.
    Day,
    /// Day of the year, 1..=366.
    DayOfYear,
    /// Day of the week, Monday = 0.
    Weekday,
    Hour,
    Minute,
    Second,
}

impl DatetimeAttribute {
    /// Component name used when the attribute is added to a series.
    pub fn name(&self) -> &'static str {
        match self {
            DatetimeAttribute::Year => "Year",
            DatetimeAttribute::Quarter => "Quarter",
            DatetimeAttribute::Month => "Month",
            DatetimeAttribute::Week => "Week",
            DatetimeAttribute::Day => "Day",
            DatetimeAttribute::DayOfYear => "DayOfYear",
            DatetimeAttribute::Weekday => "Weekday",
            DatetimeAttribute::Hour => "Hour",
            DatetimeAttribute::Minute => "Minute",
            DatetimeAttribute::Second => "Second",
        }
    }

    /// Value of the attribute at `t`.
    pub fn value(&self, t: &DateTime<Utc>) -> f64 {
        let v = match self {
            DatetimeAttribute::Year => t.year() as i64,
            DatetimeAttribute::Quarter => (t.month0() / 3 + 1) as i64,
            DatetimeAttribute::Month => t.month() as i64,
            DatetimeAttribute::Week => t.iso_week().week() as i64,
            DatetimeAttribute::Day => t.day() as i64,
            DatetimeAttribute::DayOfYear => t.ordinal() as i64,
            DatetimeAttribute::Weekday => t.weekday().num_days_from_monday() as i64,
            DatetimeAttribute::Hour => t.hour() as i64,
            DatetimeAttribute::Minute => t.minute() as i64,
            DatetimeAttribute::Second => t.second() as i64,
        };
        v as f64
    }
}

impl fmt::Display for DatetimeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatetimeAttribute {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "year" => Ok(DatetimeAttribute::Year),
            "quarter" => Ok(DatetimeAttribute::Quarter),
            "month" => Ok(DatetimeAttribute::Month),
            "week" | "weekofyear" => Ok(DatetimeAttribute::Week),
            "day" => Ok(DatetimeAttribute::Day),
            "dayofyear" => Ok(DatetimeAttribute::DayOfYear),
            "weekday" | "dayofweek" => Ok(DatetimeAttribute::Weekday),
            "hour" => Ok(DatetimeAttribute::Hour),
            "minute" => Ok(DatetimeAttribute::Minute),
            "second" => Ok(DatetimeAttribute::Second),
            _ => Err(ForecastError::InvalidParameter(format!(
                "unknown datetime attribute '{s}'"
            ))),
        }
    }
}
