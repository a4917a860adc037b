//! Small dense linear algebra helpers

use ndarray::{Array1, Array2};

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `a` is singular to working precision.
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    if a.dim() != (n, n) {
        return None;
    }

    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
        if m[[pivot, col]].abs() < 1e-14 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                m.swap([col, k], [pivot, k]);
            }
            rhs.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[[row, k]] * x[k]).sum();
        x[row] = (rhs[row] - tail) / m[[row, row]];
    }
    Some(x)
}
