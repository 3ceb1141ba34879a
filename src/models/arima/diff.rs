//! Differencing and its inverse for the ARIMA family.

use crate::utils::stats::variance;

/// Difference `series` `d` times.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Last value of `series` at each differencing order `0..d`.
///
/// These are the starting points [`integrate`] needs to undo `d` rounds of
/// differencing at the end of the series.
pub fn anchors(series: &[f64], d: usize) -> Vec<f64> {
    let mut current = series.to_vec();
    let mut result = Vec::with_capacity(d);
    for _ in 0..d {
        result.push(current.last().copied().unwrap_or(0.0));
        current = difference(&current, 1);
    }
    result
}

/// Undo differencing for values that continue a differenced series.
///
/// `anchors` are the last observed values at each order, as returned by
/// [`anchors`]; its length is the differencing order.
pub fn integrate(differenced: &[f64], anchors: &[f64]) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for &start in anchors.iter().rev() {
        result = result
            .iter()
            .scan(start, |level, &step| {
                *level += step;
                Some(*level)
            })
            .collect();
    }
    result
}

/// Lag-`period` differences: `y[t] - y[t - period]`.
pub fn seasonal_difference(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.len() <= period {
        return series.to_vec();
    }
    series
        .iter()
        .skip(period)
        .zip(series)
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// Undo one round of seasonal differencing for values following `history`.
///
/// `history` must hold at least the last `period` observations.
pub fn seasonal_integrate(differenced: &[f64], history: &[f64], period: usize) -> Vec<f64> {
    let mut extended = history[history.len().saturating_sub(period)..].to_vec();
    for &w in differenced {
        let previous = extended[extended.len() - period];
        extended.push(previous + w);
    }
    extended.split_off(extended.len() - differenced.len())
}

/// Differencing order (up to `max_d`) suggested by a variance-ratio test:
/// keep differencing while it cuts the variance by at least 10%.
pub fn suggest_differencing(series: &[f64], max_d: usize) -> usize {
    let mut current = series.to_vec();
    let mut current_var = variance(&current);
    let mut d = 0;

    while d < max_d && current.len() > 3 {
        let next = difference(&current, 1);
        let next_var = variance(&next);
        if current_var <= 0.0 || next_var / current_var >= 0.9 {
            break;
        }
        current = next;
        current_var = next_var;
        d += 1;
    }
    d
}

/// Whether lag-`period` differencing removes at least 30% of the variance.
pub fn suggest_seasonal_differencing(series: &[f64], period: usize) -> bool {
    if period < 2 || series.len() < 2 * period {
        return false;
    }
    let original = variance(series);
    original > 0.0 && variance(&seasonal_difference(series, period)) < 0.7 * original
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn difference_orders() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(difference(&series, 0), series);
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(difference(&series, 2), vec![1.0, 1.0, 1.0]);
        assert!(difference(&[], 1).is_empty());
    }

    #[test]
    fn integrate_continues_the_series() {
        let original = vec![10.0, 12.0, 15.0, 19.0, 24.0];
        let integrated = integrate(&[6.0, 7.0], &anchors(&original, 1));
        assert_relative_eq!(integrated[0], 30.0, epsilon = 1e-10);
        assert_relative_eq!(integrated[1], 37.0, epsilon = 1e-10);
    }

    #[test]
    fn integrate_second_order() {
        // Second differences of the triangular numbers are all 1
        let original = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        assert_eq!(anchors(&original, 2), vec![15.0, 5.0]);

        let integrated = integrate(&[1.0, 1.0], &anchors(&original, 2));
        assert_eq!(integrated, vec![21.0, 28.0]);
    }

    #[test]
    fn seasonal_round_trip() {
        let series = vec![100.0, 120.0, 80.0, 90.0, 110.0, 130.0, 90.0, 100.0];
        assert_eq!(seasonal_difference(&series, 4), vec![10.0; 4]);

        let next_year = seasonal_integrate(&[10.0; 5], &series, 4);
        assert_eq!(next_year, vec![120.0, 140.0, 100.0, 110.0, 130.0]);
    }

    #[test]
    fn suggested_orders() {
        let noise = vec![1.0, 0.5, 1.2, 0.8, 1.1, 0.9, 1.0, 1.1];
        assert_eq!(suggest_differencing(&noise, 2), 0);

        let trend: Vec<f64> = (0..20).map(|i| 10.0 + 2.0 * i as f64).collect();
        assert_eq!(suggest_differencing(&trend, 2), 1);
        assert_eq!(suggest_differencing(&trend, 0), 0);

        let quadratic: Vec<f64> = (0..20).map(|i| (i * i) as f64).collect();
        assert_eq!(suggest_differencing(&quadratic, 2), 2);
    }

    #[test]
    fn seasonal_differencing_detects_repeating_pattern() {
        let seasonal: Vec<f64> = (0..48).map(|i| [5.0, -3.0, 8.0, -10.0][i % 4]).collect();
        assert!(suggest_seasonal_differencing(&seasonal, 4));
        assert!(!suggest_seasonal_differencing(&seasonal, 0));
    }
}
