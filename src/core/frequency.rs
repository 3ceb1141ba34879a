//! Sampling frequency of a regular time axis.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use std::fmt;

/// Step between consecutive timestamps of a regular series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Constant absolute step (seconds, hours, days, weeks, ...).
    Fixed(Duration),
    /// Calendar months on the same day of month, `k` months apart.
    Months(u32),
    /// Last day of the month, `k` months apart.
    MonthEnd(u32),
}

impl Frequency {
    /// Daily frequency.
    pub fn daily() -> Self {
        Frequency::Fixed(Duration::days(1))
    }

    /// Hourly frequency.
    pub fn hourly() -> Self {
        Frequency::Fixed(Duration::hours(1))
    }

    /// Monthly frequency, keeping the day of month.
    pub fn monthly() -> Self {
        Frequency::Months(1)
    }

    /// Infer a frequency from a strictly increasing axis.
    ///
    /// Returns `None` for fewer than two timestamps or an irregular axis.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Option<Self> {
        if timestamps.len() < 2 {
            return None;
        }

        let step = timestamps[1] - timestamps[0];
        if step > Duration::zero() && timestamps.windows(2).all(|w| w[1] - w[0] == step) {
            return Some(Frequency::Fixed(step));
        }

        let months = month_index(&timestamps[1]) - month_index(&timestamps[0]);
        if months <= 0 {
            return None;
        }
        let months = months as u32;

        if timestamps.iter().all(|t| is_month_end(t) && t.time() == timestamps[0].time()) {
            let regular = timestamps
                .windows(2)
                .all(|w| month_index(&w[1]) - month_index(&w[0]) == months as i64);
            return regular.then_some(Frequency::MonthEnd(months));
        }

        let candidate = Frequency::Months(months);
        let regular = timestamps
            .windows(2)
            .all(|w| candidate.advance(w[0], 1) == Some(w[1]));
        regular.then_some(candidate)
    }

    /// Timestamp `steps` periods after `from`.
    pub fn advance(&self, from: DateTime<Utc>, steps: u32) -> Option<DateTime<Utc>> {
        match *self {
            Frequency::Fixed(step) => {
                let total = step.checked_mul(i32::try_from(steps).ok()?)?;
                from.checked_add_signed(total)
            }
            Frequency::Months(k) => from.checked_add_months(Months::new(k.checked_mul(steps)?)),
            Frequency::MonthEnd(k) => {
                let first = from.with_day(1)?;
                let next_first =
                    first.checked_add_months(Months::new(k.checked_mul(steps)?.checked_add(1)?))?;
                next_first.checked_sub_signed(Duration::days(1))
            }
        }
    }

    /// The `horizon` timestamps following `last`.
    pub fn future_timestamps(
        &self,
        last: DateTime<Utc>,
        horizon: usize,
    ) -> Result<Vec<DateTime<Utc>>> {
        (1..=horizon)
            .map(|step| {
                u32::try_from(step)
                    .ok()
                    .and_then(|s| self.advance(last, s))
                    .ok_or_else(|| {
                        ForecastError::OutOfRange(format!(
                            "cannot advance {last} by {step} steps of {self}"
                        ))
                    })
            })
            .collect()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Fixed(step) => write!(f, "every {}s", step.num_seconds()),
            Frequency::Months(k) => write!(f, "every {k} month(s)"),
            Frequency::MonthEnd(k) => write!(f, "every {k} month end(s)"),
        }
    }
}

fn month_index(t: &DateTime<Utc>) -> i64 {
    t.year() as i64 * 12 + t.month0() as i64
}

fn is_month_end(t: &DateTime<Utc>) -> bool {
    (*t + Duration::days(1)).month() != t.month()
}
