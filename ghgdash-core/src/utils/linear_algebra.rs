//! Ordinary least squares.
//!
//! The fit solves the normal equations $X^T X \beta = X^T y$ through a singular value
//! decomposition of the design matrix, which gives the same solution as the normal
//! equations while tolerating predictors on very different scales (calendar years next
//! to populations in the hundreds of millions). Predictors are used as given: no
//! centering, no scaling and no regularization.

use crate::utils::distributions::student_t_quantile;
use nalgebra::{DMatrix, DVector, SVD};

/// Relative threshold below which a singular value is treated as zero
const RANK_TOLERANCE: f64 = 1e-12;

/// A fitted linear model
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    coefficients: DVector<f64>,
    /// $(X^T X)^{-1}$
    normal_inverse: DMatrix<f64>,
    /// Residual variance $\hat\sigma^2 = SSR / (n - p)$
    scale: f64,
    residual_df: usize,
}

/// Cumulative probability of the upper bound of a two-sided interval
pub fn upper_tail(confidence: f64) -> f64 {
    1.0 - (1.0 - confidence) / 2.0
}

/// Point prediction with a two-sided prediction interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OlsFit {
    /// Fit `target ~ design`.
    ///
    /// Returns `None` when the model cannot be estimated: fewer observations than
    /// predictors plus one (no residual degrees of freedom), non-finite inputs, or a
    /// rank-deficient design matrix.
    ///
    /// # Panics
    ///
    /// Panics if `design` and `target` have different numbers of rows.
    pub fn fit(design: &DMatrix<f64>, target: &DVector<f64>) -> Option<Self> {
        assert_eq!(
            design.nrows(),
            target.len(),
            "design and target must have the same number of rows"
        );
        let (n, p) = design.shape();
        if p == 0 || n <= p {
            return None;
        }
        if design.iter().chain(target.iter()).any(|v| !v.is_finite()) {
            return None;
        }

        let svd = SVD::new(design.clone(), true, true);
        let u = svd.u.as_ref()?;
        let v_t = svd.v_t.as_ref()?;
        let singular_values = &svd.singular_values;

        let max_singular = singular_values.max();
        if max_singular <= 0.0
            || singular_values
                .iter()
                .any(|s| *s <= RANK_TOLERANCE * max_singular)
        {
            return None;
        }

        // beta = V S^-1 U^T y
        let inverse_singular = singular_values.map(|s| 1.0 / s);
        let projected = u.transpose() * target;
        let coefficients = v_t.transpose() * projected.component_mul(&inverse_singular);

        // (X^T X)^-1 = V S^-2 V^T
        let scaled_v = v_t.transpose() * DMatrix::from_diagonal(&inverse_singular);
        let normal_inverse = &scaled_v * scaled_v.transpose();

        let residuals = target - design * &coefficients;
        let residual_df = n - p;
        let scale = residuals.norm_squared() / residual_df as f64;

        Some(Self {
            coefficients,
            normal_inverse,
            scale,
            residual_df,
        })
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    /// Residual variance
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn residual_df(&self) -> usize {
        self.residual_df
    }

    /// Point prediction for a single row of predictors
    ///
    /// # Panics
    ///
    /// Panics if `row` does not have one value per coefficient.
    pub fn predict(&self, row: &DVector<f64>) -> f64 {
        assert_eq!(row.len(), self.coefficients.len(), "predictor count mismatch");
        self.coefficients.dot(row)
    }

    /// Standard error of a new observation at `row`
    ///
    /// $$ se = \sqrt{\hat\sigma^2 \left(1 + x^T (X^T X)^{-1} x\right)} $$
    pub fn prediction_std(&self, row: &DVector<f64>) -> f64 {
        let leverage = (row.transpose() * &self.normal_inverse * row)[(0, 0)];
        (self.scale * (1.0 + leverage)).sqrt()
    }

    /// Prediction with a two-sided interval at the given confidence level
    ///
    /// # Panics
    ///
    /// Panics unless `upper_tail(confidence)` lies strictly between 0 and 1.
    pub fn predict_interval(&self, row: &DVector<f64>, confidence: f64) -> Prediction {
        let estimate = self.predict(row);
        let critical = student_t_quantile(upper_tail(confidence), self.residual_df as f64);
        let half_width = critical * self.prediction_std(row);
        Prediction {
            estimate,
            lower: estimate - half_width,
            upper: estimate + half_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_design(xs: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(xs.len(), 2, |i, j| if j == 0 { 1.0 } else { xs[i] })
    }

    #[test]
    fn exact_fit_recovers_coefficients() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let design = line_design(&xs);
        let target = DVector::from_iterator(xs.len(), xs.iter().map(|x| 3.0 + 2.0 * x));

        let fit = OlsFit::fit(&design, &target).unwrap();
        assert_relative_eq!(fit.coefficients()[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients()[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(fit.scale(), 0.0, epsilon = 1e-12);
        assert_eq!(fit.residual_df(), 3);
    }

    #[test]
    fn prediction_interval_matches_textbook_formula() {
        // y = 1 + x with residuals +1, -1, -1, +1
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [2.0, 1.0, 2.0, 5.0];
        let design = line_design(&xs);
        let target = DVector::from_row_slice(&ys);

        let fit = OlsFit::fit(&design, &target).unwrap();
        assert_relative_eq!(fit.coefficients()[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients()[1], 1.0, epsilon = 1e-10);
        // SSR = 4, n - p = 2
        assert_relative_eq!(fit.scale(), 2.0, epsilon = 1e-10);

        let x0 = 4.0;
        let row = DVector::from_row_slice(&[1.0, x0]);
        let prediction = fit.predict_interval(&row, 0.95);

        let mean_x = 1.5;
        let sxx = 5.0;
        let leverage = 1.0 / 4.0 + (x0 - mean_x) * (x0 - mean_x) / sxx;
        let se = (2.0 * (1.0 + leverage)).sqrt();
        let critical = student_t_quantile(0.975, 2.0);

        assert_relative_eq!(prediction.estimate, 5.0, epsilon = 1e-10);
        assert_relative_eq!(prediction.upper - prediction.estimate, critical * se, epsilon = 1e-9);
        assert_relative_eq!(prediction.estimate - prediction.lower, critical * se, epsilon = 1e-9);
    }

    #[test]
    fn badly_scaled_predictors() {
        let years: Vec<f64> = (1990..2010).map(f64::from).collect();
        let design = DMatrix::from_fn(years.len(), 2, |i, j| {
            if j == 0 {
                years[i]
            } else {
                5.0e8 + 1.0e6 * (i as f64) + 3.0e5 * ((i % 3) as f64)
            }
        });
        let target = DVector::from_fn(years.len(), |i, _| {
            0.5 * design[(i, 0)] + 2.0e-6 * design[(i, 1)]
        });

        let fit = OlsFit::fit(&design, &target).unwrap();
        assert_relative_eq!(fit.coefficients()[0], 0.5, max_relative = 1e-6);
        assert_relative_eq!(fit.coefficients()[1], 2.0e-6, max_relative = 1e-6);
    }

    #[test]
    fn too_few_rows() {
        let design = line_design(&[1.0, 2.0]);
        let target = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(OlsFit::fit(&design, &target).is_none());
    }

    #[test]
    fn collinear_predictors() {
        let design = DMatrix::from_fn(5, 2, |i, j| (i as f64 + 1.0) * (j as f64 + 1.0));
        let target = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(OlsFit::fit(&design, &target).is_none());
    }

    #[test]
    fn missing_values_are_rejected() {
        let design = line_design(&[1.0, 2.0, f64::NAN, 4.0]);
        let target = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert!(OlsFit::fit(&design, &target).is_none());
    }

    #[test]
    fn upper_tail_of_interval() {
        assert_relative_eq!(upper_tail(0.95), 0.975, epsilon = 1e-15);
        assert!(upper_tail(0.999999) < 1.0);
        assert_eq!(upper_tail(0.9999999999999999), 1.0);
    }
}
