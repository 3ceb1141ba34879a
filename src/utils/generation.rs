//! Synthetic series for tests, benchmarks and smoke checks.

use crate::core::{Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Regular time axis of a generated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub start: DateTime<Utc>,
    pub length: usize,
    pub frequency: Frequency,
}

impl TimeAxis {
    pub fn new(start: DateTime<Utc>, length: usize, frequency: Frequency) -> Self {
        Self {
            start,
            length,
            frequency,
        }
    }

    /// Every timestamp of the axis, starting at `start`.
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        if self.length == 0 {
            return Err(ForecastError::InvalidParameter(
                "a generated series needs a positive length".into(),
            ));
        }
        let mut timestamps = Vec::with_capacity(self.length);
        timestamps.push(self.start);
        timestamps.extend(
            self.frequency
                .future_timestamps(self.start, self.length - 1)?,
        );
        Ok(timestamps)
    }

    fn build(&self, values: Vec<f64>) -> Result<TimeSeries> {
        TimeSeries::from_generated_axis(self.timestamps()?, vec![values], vec![], self.frequency)
    }
}

/// Series holding `value` at every step.
pub fn constant_timeseries(axis: TimeAxis, value: f64) -> Result<TimeSeries> {
    axis.build(vec![value; axis.length])
}

/// Straight line from `start_value` at the first step to `end_value` at the last.
pub fn linear_timeseries(axis: TimeAxis, start_value: f64, end_value: f64) -> Result<TimeSeries> {
    let steps = (axis.length.max(2) - 1) as f64;
    let slope = (end_value - start_value) / steps;
    axis.build(
        (0..axis.length)
            .map(|i| start_value + slope * i as f64)
            .collect(),
    )
}

/// `y_offset + amplitude * sin(2 * pi * value_frequency * t + phase)` with `t` the step index.
///
/// `value_frequency` is in cycles per step, so 1/12 on a monthly axis gives
/// a yearly cycle.
pub fn sine_timeseries(
    axis: TimeAxis,
    value_frequency: f64,
    amplitude: f64,
    phase: f64,
    y_offset: f64,
) -> Result<TimeSeries> {
    let omega = 2.0 * std::f64::consts::PI * value_frequency;
    axis.build(
        (0..axis.length)
            .map(|t| y_offset + amplitude * (omega * t as f64 + phase).sin())
            .collect(),
    )
}

/// Independent normal draws with the given mean and standard deviation.
pub fn gaussian_timeseries(axis: TimeAxis, mean: f64, std: f64, seed: u64) -> Result<TimeSeries> {
    let normal = normal(mean, std)?;
    let mut rng = StdRng::seed_from_u64(seed);
    axis.build(
        (0..axis.length)
            .map(|_| normal.sample(&mut rng))
            .collect(),
    )
}

/// Cumulative sum of normal steps, starting from the first step.
pub fn random_walk_timeseries(
    axis: TimeAxis,
    mean: f64,
    std: f64,
    seed: u64,
) -> Result<TimeSeries> {
    let normal = normal(mean, std)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..axis.length)
        .scan(0.0, |level, _| {
            *level += normal.sample(&mut rng);
            Some(*level)
        })
        .collect();
    axis.build(values)
}

fn normal(mean: f64, std: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std).map_err(|e| {
        ForecastError::InvalidParameter(format!("normal({mean}, {std}): {e}"))
    })
}
