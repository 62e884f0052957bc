// ============================================================
// Layer 7 — Optional Linear Alignment
// ============================================================
// Fits an affine map  Y ≈ X·W + b  from the English embeddings
// (X) to the Indic embeddings (Y) on a prefix of the aligned
// rows, then maps the remaining English rows into the Indic
// space before they are scored.
//
// Off unless `--align-rows N` is given. Scores produced with
// alignment are NOT comparable to plain accuracy@100 runs: the
// first N rows are spent on fitting and only the rest are scored.
//
// Solver: ridge-regularised normal equations
//   (XaᵀXa + λI) W = XaᵀY      Xa = [X | 1]
// solved with Gaussian elimination and partial pivoting.
// λ keeps the system invertible when N is smaller than the
// embedding width, where plain least squares has no unique fit.

use crate::domain::error::EvalError;
use crate::scoring::dense::DenseMatrix;

/// Diagonal ridge term added to the normal equations.
pub const RIDGE_LAMBDA: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct LinearAlignment {
    /// (in_dim + 1) × out_dim; the last row is the intercept.
    weights: DenseMatrix,
}

impl LinearAlignment {
    /// Least-squares fit of `y` from `x`, row i of `x` paired with row i of `y`.
    pub fn fit(x: &DenseMatrix, y: &DenseMatrix) -> Result<Self, EvalError> {
        if x.rows() != y.rows() {
            return Err(EvalError::RowMismatch { left: x.rows(), right: y.rows() });
        }
        if x.rows() == 0 {
            return Err(EvalError::Empty);
        }

        let p = x.cols() + 1;
        let q = y.cols();
        let mut gram = DenseMatrix::zeros(p, p);
        let mut rhs  = DenseMatrix::zeros(p, q);
        let mut xa   = vec![0.0; p];

        for r in 0..x.rows() {
            xa[..p - 1].copy_from_slice(x.row(r));
            xa[p - 1] = 1.0;
            let yr = y.row(r);
            for i in 0..p {
                let xi = xa[i];
                if xi == 0.0 {
                    continue;
                }
                let g = gram.row_mut(i);
                for j in i..p {
                    g[j] += xi * xa[j];
                }
                for (acc, yv) in rhs.row_mut(i).iter_mut().zip(yr) {
                    *acc += xi * yv;
                }
            }
        }

        // Only the upper triangle was accumulated.
        for i in 0..p {
            for j in 0..i {
                let v = gram.get(j, i);
                gram.set(i, j, v);
            }
            let d = gram.get(i, i);
            gram.set(i, i, d + RIDGE_LAMBDA);
        }

        let weights = solve(gram, rhs)?;
        tracing::debug!("Fitted linear alignment on {} rows ({} → {} dims)", x.rows(), p - 1, q);
        Ok(Self { weights })
    }

    /// Map each row of `x` through the fitted affine transform.
    pub fn apply(&self, x: &DenseMatrix) -> DenseMatrix {
        let p = self.weights.rows();
        let q = self.weights.cols();
        let mut out = DenseMatrix::zeros(x.rows(), q);
        for r in 0..x.rows() {
            let dst = out.row_mut(r);
            dst.copy_from_slice(self.weights.row(p - 1));
            for (i, &xi) in x.row(r).iter().enumerate() {
                if xi == 0.0 {
                    continue;
                }
                for (d, w) in dst.iter_mut().zip(self.weights.row(i)) {
                    *d += xi * w;
                }
            }
        }
        out
    }
}

/// Solve `a · x = b` for square `a`, overwriting both inputs.
fn solve(mut a: DenseMatrix, mut b: DenseMatrix) -> Result<DenseMatrix, EvalError> {
    let n = a.rows();
    let q = b.cols();

    let scale = (0..n).map(|i| a.get(i, i).abs()).fold(0.0_f64, f64::max).max(1.0);
    let tol   = f64::EPSILON * scale;

    for col in 0..n {
        let mut pivot = col;
        for r in col + 1..n {
            if a.get(r, col).abs() > a.get(pivot, col).abs() {
                pivot = r;
            }
        }
        let pv = a.get(pivot, col);
        if !pv.is_finite() || pv.abs() <= tol {
            return Err(EvalError::SingularSystem);
        }
        a.swap_rows(col, pivot);
        b.swap_rows(col, pivot);

        let pivot_a: Vec<f64> = a.row(col)[col..].to_vec();
        let pivot_b: Vec<f64> = b.row(col).to_vec();
        for r in col + 1..n {
            let f = a.get(r, col) / pv;
            if f == 0.0 {
                continue;
            }
            for (x, p) in a.row_mut(r)[col..].iter_mut().zip(&pivot_a) {
                *x -= f * p;
            }
            for (x, p) in b.row_mut(r).iter_mut().zip(&pivot_b) {
                *x -= f * p;
            }
        }
    }

    let mut x = DenseMatrix::zeros(n, q);
    for r in (0..n).rev() {
        let diag = a.get(r, r);
        for c in 0..q {
            let mut s = b.get(r, c);
            for k in r + 1..n {
                s -= a.get(r, k) * x.get(k, c);
            }
            x.set(r, c, s / diag);
        }
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::EmbeddingMatrix;

    fn dense(rows: Vec<Vec<f32>>) -> DenseMatrix {
        DenseMatrix::from_embeddings(&EmbeddingMatrix::from_rows(rows).unwrap())
    }

    #[test]
    fn test_recovers_exact_affine_map() {
        // y = [2x0 + 1, x0 - x1 - 3]
        let xs: Vec<Vec<f32>> = (0..12)
            .map(|i| vec![i as f32 * 0.5, (i % 5) as f32])
            .collect();
        let ys: Vec<Vec<f32>> = xs
            .iter()
            .map(|r| vec![2.0 * r[0] + 1.0, r[0] - r[1] - 3.0])
            .collect();
        let x = dense(xs);
        let y = dense(ys);

        let fit = LinearAlignment::fit(&x, &y).unwrap();
        let pred = fit.apply(&dense(vec![vec![10.0, 2.0]]));
        assert!((pred.get(0, 0) - 21.0).abs() < 1e-3);
        assert!((pred.get(0, 1) - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_underdetermined_fit_still_solves() {
        // Fewer rows than dimensions: ridge keeps the system invertible
        let x = dense(vec![vec![1.0, 0.0, 2.0, 0.0], vec![0.0, 1.0, 0.0, 3.0]]);
        let y = dense(vec![vec![1.0], vec![2.0]]);
        assert!(LinearAlignment::fit(&x, &y).is_ok());
    }

    #[test]
    fn test_zero_system_is_singular() {
        let a = DenseMatrix::zeros(3, 3);
        let b = DenseMatrix::zeros(3, 1);
        assert_eq!(solve(a, b).unwrap_err(), EvalError::SingularSystem);
    }

    #[test]
    fn test_row_mismatch_rejected() {
        let x = dense(vec![vec![1.0], vec![2.0]]);
        let y = dense(vec![vec![1.0]]);
        assert!(matches!(
            LinearAlignment::fit(&x, &y),
            Err(EvalError::RowMismatch { left: 2, right: 1 })
        ));
    }
}
