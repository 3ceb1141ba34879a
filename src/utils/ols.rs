//! Ordinary least squares on a row-major design matrix.
//!
//! Used by the lag-regression model and the polynomial trend fits. The
//! intercept is always estimated and kept apart from the slope coefficients.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Fitted linear model `y = intercept + x . coefficients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl OlsFit {
    /// Prediction for a single row of regressors.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "expected {} regressors, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }
        Ok(self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(x, b)| x * b)
                .sum::<f64>())
    }

    /// Residuals `y - y_hat` over a design matrix.
    pub fn residuals(&self, y: &[f64], rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        if y.len() != rows.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} targets for {} design rows",
                y.len(),
                rows.len()
            )));
        }
        y.iter()
            .zip(rows)
            .map(|(yi, row)| Ok(yi - self.predict_row(row)?))
            .collect()
    }
}

/// Fit `y` against the design matrix `rows` (one row per observation).
///
/// Solves the normal equations by Cholesky decomposition with a tiny ridge
/// on the diagonal. Zero regressors reduce to the sample mean.
pub fn ols_fit(y: &[f64], rows: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    if rows.len() != n {
        return Err(ForecastError::InvalidParameter(format!(
            "{n} targets for {} design rows",
            rows.len()
        )));
    }

    let k = rows[0].len();
    if let Some(bad) = rows.iter().position(|r| r.len() != k) {
        return Err(ForecastError::InvalidParameter(format!(
            "design row {bad} has {} columns, expected {k}",
            rows[bad].len()
        )));
    }

    // Normal equations over the augmented row [1, x_1, ..., x_k]
    let p = k + 1;
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    let mut augmented = vec![1.0; p];
    for (row, &target) in rows.iter().zip(y) {
        augmented[1..].copy_from_slice(row);
        for i in 0..p {
            xty[i] += augmented[i] * target;
            for j in 0..=i {
                xtx[i][j] += augmented[i] * augmented[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += 1e-10 * xtx[i][i].max(1.0);
    }

    let beta = solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError("normal equations are not positive definite".into())
    })?;

    Ok(OlsFit {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
    })
}

/// Solve `A x = b` for symmetric positive definite `A`.
pub fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // A = L L'
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][i] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        z[i] = (b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>()) / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = (z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>()) / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_linear_relation() {
        // y = 1 + 2*x1 + 3*x2
        let x1 = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = [0.5, 2.5, 1.0, 3.0, 1.5, 3.5, 2.0, 4.0];
        let rows: Vec<Vec<f64>> = x1.iter().zip(&x2).map(|(a, b)| vec![*a, *b]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] + 3.0 * r[1]).collect();

        let fit = ols_fit(&y, &rows).unwrap();
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-4);
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-4);
        assert_relative_eq!(fit.predict_row(&[10.0, 1.0]).unwrap(), 24.0, epsilon = 1e-3);
    }

    #[test]
    fn no_regressors_gives_mean() {
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let rows = vec![vec![]; 5];

        let fit = ols_fit(&y, &rows).unwrap();
        assert_relative_eq!(fit.intercept, 6.0, epsilon = 1e-6);
        assert!(fit.coefficients.is_empty());
    }

    #[test]
    fn residuals_of_noisy_fit_sum_to_zero() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 * 0.1]).collect();
        let y: Vec<f64> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| 2.5 + 1.7 * r[0] + (i as f64 * 0.13).sin() * 0.1)
            .collect();

        let fit = ols_fit(&y, &rows).unwrap();
        let residuals = fit.residuals(&y, &rows).unwrap();
        assert!(residuals.iter().sum::<f64>().abs() < 1e-4);
        assert_relative_eq!(fit.coefficients[0], 1.7, epsilon = 0.1);
    }

    #[test]
    fn rejects_shape_mismatches() {
        assert!(ols_fit(&[1.0, 2.0, 3.0], &[vec![1.0], vec![2.0]]).is_err());
        assert!(ols_fit(&[1.0, 2.0], &[vec![1.0], vec![2.0, 3.0]]).is_err());
        assert!(ols_fit(&[], &[]).is_err());

        let fit = ols_fit(&[1.0, 2.0, 4.0], &[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        assert!(fit.predict_row(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn collinear_design_still_solves_with_ridge() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();

        let fit = ols_fit(&y, &rows).unwrap();
        let predicted = fit.predict_row(&[4.0, 8.0]).unwrap();
        assert_relative_eq!(predicted, 12.0, epsilon = 1e-2);
    }
}
