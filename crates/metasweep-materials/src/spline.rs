//! Natural cubic spline interpolation for optical-constant tables.
//!
//! Index tables are sampled at discrete wavelengths; the spline gives a
//! smooth $n(\lambda)$ and $k(\lambda)$ in between with continuous first and
//! second derivatives.

use crate::provider::MaterialError;

/// A natural cubic spline over strictly increasing knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at each knot.
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Construct a natural cubic spline through `(xs[i], ys[i])`.
    ///
    /// Fails if the lengths differ, fewer than two knots are given, or `xs`
    /// is not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::DataError(format!(
                "spline knots and values differ in length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(MaterialError::DataError(
                "at least two data points are needed for interpolation".into(),
            ));
        }
        if let Some(i) = (1..xs.len()).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(MaterialError::DataError(format!(
                "wavelengths must be strictly increasing (row {}: {} after {})",
                i + 1,
                xs[i],
                xs[i - 1]
            )));
        }

        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n - 1];

        // Tridiagonal forward sweep
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            let slope_diff = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope_diff / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }

        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 1] * y2s[k + 2] + u[k + 1];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// First and last knot.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the spline at `x`. Outside the knots the boundary cubic is
    /// extended; callers range-check first.
    pub fn evaluate(&self, x: f64) -> f64 {
        let hi = self.xs.partition_point(|&knot| knot <= x).clamp(1, self.xs.len() - 1);
        let lo = hi - 1;

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_passes_through_knots() {
        let xs = vec![400.0, 500.0, 650.0, 800.0, 1000.0];
        let ys = vec![3.9, 3.7, 3.6, 3.55, 3.52];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert_relative_eq!(spline.evaluate(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_data_is_reproduced_between_knots() {
        let spline = CubicSpline::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0]).unwrap();
        assert_relative_eq!(spline.evaluate(1.5), 4.0, epsilon = 1e-12);
        assert_relative_eq!(spline.evaluate(2.25), 5.5, epsilon = 1e-12);
    }

    #[test]
    fn test_unsorted_knots_are_rejected() {
        let err = CubicSpline::new(vec![500.0, 400.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, MaterialError::DataError(_)));
        assert!(CubicSpline::new(vec![500.0], vec![1.0]).is_err());
    }
}
