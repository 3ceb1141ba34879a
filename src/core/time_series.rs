//! TimeSeries data structure for representing temporal data.

use crate::core::datetime::DatetimeAttribute;
use crate::core::frequency::Frequency;
use crate::core::tabular::{parse_timestamp, parse_value, Table};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// An immutable, time-indexed sequence of one or more named components.
///
/// The time axis is strictly increasing and never empty, every component
/// has exactly one value per timestamp and component names are unique.
/// Every derived operation (selection, splitting, slicing, attribute
/// augmentation) returns a new instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    /// Values stored in column-major format: values[component][observation]
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

/// Builder for constructing TimeSeries.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    frequency: Option<Frequency>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Set univariate values.
    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = vec![values];
        self
    }

    /// Append a named component.
    pub fn component(mut self, label: impl Into<String>, values: Vec<f64>) -> Self {
        self.labels.push(label.into());
        self.values.push(values);
        self
    }

    /// Set all components at once (column-major).
    pub fn columns(mut self, values: Vec<Vec<f64>>) -> Self {
        self.values = values;
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the frequency explicitly (needed for single-point series).
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn build(self) -> Result<TimeSeries> {
        TimeSeries::new(self.timestamps, self.values, self.labels, self.frequency)
    }
}

impl TimeSeries {
    /// Create a new TimeSeries, validating every invariant.
    ///
    /// Empty `labels` default to `"0"`, `"1"`, .... Without an explicit
    /// frequency one is inferred from the axis when it is regular.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
        labels: Vec<String>,
        frequency: Option<Frequency>,
    ) -> Result<Self> {
        if timestamps.is_empty() {
            return Err(ForecastError::MalformedInput(
                "a time series needs at least one observation".to_string(),
            ));
        }

        if let Some(i) = (1..timestamps.len()).find(|&i| timestamps[i] <= timestamps[i - 1]) {
            return Err(ForecastError::MalformedInput(format!(
                "timestamps must be strictly increasing ({} follows {})",
                timestamps[i],
                timestamps[i - 1]
            )));
        }

        if values.is_empty() {
            return Err(ForecastError::MalformedInput(
                "a time series needs at least one component".to_string(),
            ));
        }

        for (component, column) in values.iter().enumerate() {
            if column.len() != timestamps.len() {
                return Err(ForecastError::MalformedInput(format!(
                    "component {component} has {} values for {} timestamps",
                    column.len(),
                    timestamps.len()
                )));
            }
        }

        let labels = if labels.is_empty() {
            (0..values.len()).map(|i| i.to_string()).collect()
        } else {
            labels
        };
        if labels.len() != values.len() {
            return Err(ForecastError::MalformedInput(format!(
                "{} labels for {} components",
                labels.len(),
                values.len()
            )));
        }
        check_unique(&labels)?;

        let frequency = match frequency {
            Some(freq) => {
                let consistent = timestamps
                    .windows(2)
                    .all(|w| freq.advance(w[0], 1) == Some(w[1]));
                if !consistent {
                    return Err(ForecastError::MalformedInput(format!(
                        "time axis does not follow declared frequency {freq}"
                    )));
                }
                Some(freq)
            }
            None => Frequency::infer(&timestamps),
        };

        Ok(Self {
            timestamps,
            values,
            labels,
            frequency,
        })
    }

    /// Build a series whose axis was generated by stepping `frequency` from
    /// an anchor, so the frequency is recorded as-is rather than re-derived
    /// from consecutive timestamps.
    pub(crate) fn from_generated_axis(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
        labels: Vec<String>,
        frequency: Frequency,
    ) -> Result<Self> {
        let mut series = Self::new(timestamps, values, labels, None)?;
        series.frequency = Some(frequency);
        Ok(series)
    }

    /// Create a simple univariate time series.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        Self::new(timestamps, vec![values], vec![], None)
    }

    /// Build a series from row-oriented tabular data.
    ///
    /// Rows are ordered by their parsed timestamp. Fails with
    /// [`ForecastError::MalformedInput`] if the time column or any value
    /// column is missing, a timestamp cannot be parsed, timestamps repeat,
    /// a value cannot be parsed, or the table is empty.
    pub fn from_tabular<S: AsRef<str>>(
        table: &Table,
        time_column: &str,
        value_columns: &[S],
    ) -> Result<Self> {
        let time_idx = table.column_index(time_column).ok_or_else(|| {
            ForecastError::MalformedInput(format!("missing time column '{time_column}'"))
        })?;

        if value_columns.is_empty() {
            return Err(ForecastError::MalformedInput(
                "at least one value column is required".to_string(),
            ));
        }
        let value_idx = value_columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                table.column_index(name).ok_or_else(|| {
                    ForecastError::MalformedInput(format!("missing value column '{name}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(table.len());
        for (row_no, row) in table.rows().iter().enumerate() {
            let cell = &row[time_idx];
            let timestamp = parse_timestamp(cell).ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "row {row_no}: cannot parse timestamp '{cell}'"
                ))
            })?;
            let values = value_idx
                .iter()
                .map(|&col| {
                    parse_value(&row[col]).ok_or_else(|| {
                        ForecastError::MalformedInput(format!(
                            "row {row_no}: cannot parse value '{}' in column '{}'",
                            row[col],
                            table.columns()[col]
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push((timestamp, values));
        }

        rows.sort_by_key(|(t, _)| *t);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::MalformedInput(format!(
                "duplicate timestamp {}",
                w[0].0
            )));
        }

        let timestamps = rows.iter().map(|(t, _)| *t).collect();
        let values = (0..value_idx.len())
            .map(|c| rows.iter().map(|(_, v)| v[c]).collect())
            .collect();
        let labels = value_columns.iter().map(|s| s.as_ref().to_string()).collect();

        Self::new(timestamps, values, labels, None)
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false for a constructed series; kept for slice-like symmetry.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of components.
    pub fn width(&self) -> usize {
        self.values.len()
    }

    pub fn is_univariate(&self) -> bool {
        self.values.len() == 1
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Component names, in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    /// Position of a component by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Values of a component by name.
    pub fn values(&self, name: &str) -> Result<&[f64]> {
        self.position(name)
            .map(|i| self.values[i].as_slice())
            .ok_or_else(|| ForecastError::UnknownComponent(name.to_string()))
    }

    /// Values of a component by position.
    pub fn component(&self, index: usize) -> Result<&[f64]> {
        self.values
            .get(index)
            .map(|v| v.as_slice())
            .ok_or_else(|| {
                ForecastError::OutOfRange(format!(
                    "component {index} of a series with width {}",
                    self.width()
                ))
            })
    }

    /// The single component of a univariate series.
    pub fn univariate_values(&self) -> Result<&[f64]> {
        if !self.is_univariate() {
            return Err(ForecastError::InputShape(format!(
                "expected a univariate series, got width {}",
                self.width()
            )));
        }
        Ok(&self.values[0])
    }

    /// All values organized by component.
    pub fn values_by_component(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Observation at `index` across all components.
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(ForecastError::OutOfRange(format!(
                "row {index} of a series of length {}",
                self.len()
            )));
        }
        Ok(self.values.iter().map(|c| c[index]).collect())
    }

    /// True when both series share exactly the same time axis.
    pub fn has_same_time_index(&self, other: &TimeSeries) -> bool {
        self.timestamps == other.timestamps
    }

    /// Restrict the series to one component.
    ///
    /// Fails with [`ForecastError::UnknownComponent`] (a key-not-found
    /// failure) if `name` is absent.
    pub fn select(&self, name: &str) -> Result<TimeSeries> {
        self.select_many(&[name])
    }

    /// Restrict the series to the named components, in the requested order.
    pub fn select_many<S: AsRef<str>>(&self, names: &[S]) -> Result<TimeSeries> {
        let indices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.position(name)
                    .ok_or_else(|| ForecastError::UnknownComponent(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.select_indices(&indices)
    }

    /// Restrict the series to components by position.
    pub fn select_indices(&self, indices: &[usize]) -> Result<TimeSeries> {
        if indices.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "select at least one component".to_string(),
            ));
        }
        let mut values = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            values.push(self.component(i)?.to_vec());
            labels.push(self.labels[i].clone());
        }
        check_unique(&labels)?;

        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            labels,
            frequency: self.frequency,
        })
    }

    /// Extract observations `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start >= end || end > self.len() {
            return Err(ForecastError::OutOfRange(format!(
                "slice {start}..{end} of a series of length {}",
                self.len()
            )));
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values.iter().map(|c| c[start..end].to_vec()).collect(),
            labels: self.labels.clone(),
            frequency: self.frequency,
        })
    }

    /// Split into `(history, future)`, with `ts` (if present) in `history`.
    pub fn split_after(&self, ts: DateTime<Utc>) -> Result<(TimeSeries, TimeSeries)> {
        self.check_within(ts)?;
        let idx = self.timestamps.partition_point(|t| *t <= ts);
        self.split_at_index(idx, ts)
    }

    /// Split into `(history, future)`, with `ts` (if present) in `future`.
    pub fn split_before(&self, ts: DateTime<Utc>) -> Result<(TimeSeries, TimeSeries)> {
        self.check_within(ts)?;
        let idx = self.timestamps.partition_point(|t| *t < ts);
        self.split_at_index(idx, ts)
    }

    fn check_within(&self, ts: DateTime<Utc>) -> Result<()> {
        if ts < self.start_time() || ts > self.end_time() {
            return Err(ForecastError::OutOfRange(format!(
                "{ts} is outside the series axis [{}, {}]",
                self.start_time(),
                self.end_time()
            )));
        }
        Ok(())
    }

    fn split_at_index(&self, idx: usize, ts: DateTime<Utc>) -> Result<(TimeSeries, TimeSeries)> {
        if idx == 0 || idx == self.len() {
            return Err(ForecastError::OutOfRange(format!(
                "splitting at {ts} would leave one side empty"
            )));
        }
        Ok((self.slice(0, idx)?, self.slice(idx, self.len())?))
    }

    /// Concatenate `other` after this series.
    ///
    /// Both series must have the same components and `other` must start
    /// strictly after this series ends.
    pub fn append(&self, other: &TimeSeries) -> Result<TimeSeries> {
        if self.labels != other.labels {
            return Err(ForecastError::MisalignedSeries(format!(
                "cannot append components {:?} to {:?}",
                other.labels, self.labels
            )));
        }
        if other.start_time() <= self.end_time() {
            return Err(ForecastError::MisalignedSeries(format!(
                "appended series starts at {}, not after {}",
                other.start_time(),
                self.end_time()
            )));
        }

        let mut timestamps = self.timestamps.clone();
        timestamps.extend_from_slice(&other.timestamps);
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a.iter().chain(b).copied().collect())
            .collect();

        TimeSeries::new(timestamps, values, self.labels.clone(), None)
    }

    /// Return a copy with an extra component derived from the time axis.
    ///
    /// The new component is named after the attribute (e.g. `"Month"`).
    pub fn add_datetime_attribute(&self, attribute: DatetimeAttribute) -> Result<TimeSeries> {
        let name = attribute.name();
        if self.contains(name) {
            return Err(ForecastError::MalformedInput(format!(
                "component '{name}' already exists"
            )));
        }

        let mut values = self.values.clone();
        values.push(self.timestamps.iter().map(|t| attribute.value(t)).collect());
        let mut labels = self.labels.clone();
        labels.push(name.to_string());

        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            labels,
            frequency: self.frequency,
        })
    }

    /// Rename components, keeping values and axis.
    pub fn with_labels<I, S>(&self, labels: I) -> Result<TimeSeries>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.width() {
            return Err(ForecastError::MalformedInput(format!(
                "{} labels for {} components",
                labels.len(),
                self.width()
            )));
        }
        check_unique(&labels)?;
        Ok(TimeSeries {
            labels,
            ..self.clone()
        })
    }
}

fn check_unique(labels: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(ForecastError::MalformedInput(format!(
                "duplicate component name '{label}'"
            )));
        }
    }
    Ok(())
}
