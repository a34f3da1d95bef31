//! Dense linear solves used by the interpolation and fitting stages.
//!
//! Right-hand sides are lists of 3D vectors; every coordinate is solved
//! against the same factorisation.

use nalgebra::DMatrix;

use super::Vector3;

/// Ratio between the smallest and largest LU pivot below which a system is
/// treated as singular.
const PIVOT_RATIO: f64 = 1e-14;

/// Solves the square system `a * x = rhs`.
///
/// Returns `None` when the shapes disagree or the matrix is numerically
/// singular.
#[must_use]
pub fn solve(a: DMatrix<f64>, rhs: &[Vector3]) -> Option<Vec<Vector3>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n || rhs.len() != n {
        return None;
    }
    let b = DMatrix::from_fn(n, 3, |r, c| rhs[r][c]);
    let lu = a.lu();
    if is_near_singular(&lu.u()) {
        return None;
    }
    let x = lu.solve(&b)?;
    Some(rows_to_vectors(&x, n))
}

/// Minimises `|a * x - b|` subject to the hard constraints `c * x = d`.
///
/// Solved through the KKT system
/// `[aᵀa cᵀ; c 0] [x; λ] = [aᵀb; d]`. Without constraints this is the plain
/// normal-equation least-squares fit.
#[must_use]
pub fn solve_constrained_least_squares(
    a: &DMatrix<f64>,
    b: &[Vector3],
    c: &DMatrix<f64>,
    d: &[Vector3],
) -> Option<Vec<Vector3>> {
    let n = a.ncols();
    let m = c.nrows();
    if a.nrows() != b.len() || c.nrows() != d.len() || (m > 0 && c.ncols() != n) {
        return None;
    }

    let at = a.transpose();
    let bm = DMatrix::from_fn(b.len(), 3, |r, col| b[r][col]);
    let atb = &at * &bm;

    let mut kkt = DMatrix::<f64>::zeros(n + m, n + m);
    kkt.view_mut((0, 0), (n, n)).copy_from(&(&at * a));
    if m > 0 {
        kkt.view_mut((0, n), (n, m)).copy_from(&c.transpose());
        kkt.view_mut((n, 0), (m, n)).copy_from(c);
    }

    let mut rhs = DMatrix::<f64>::zeros(n + m, 3);
    rhs.view_mut((0, 0), (n, 3)).copy_from(&atb);
    for (r, value) in d.iter().enumerate() {
        for col in 0..3 {
            rhs[(n + r, col)] = value[col];
        }
    }

    let lu = kkt.lu();
    if is_near_singular(&lu.u()) {
        return None;
    }
    let x = lu.solve(&rhs)?;
    Some(rows_to_vectors(&x, n))
}

fn is_near_singular(u: &DMatrix<f64>) -> bool {
    let diagonal = u.diagonal();
    let max = diagonal.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let min = diagonal.iter().fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
    max <= 0.0 || !min.is_finite() || min <= PIVOT_RATIO * max
}

fn rows_to_vectors(x: &DMatrix<f64>, rows: usize) -> Vec<Vector3> {
    (0..rows)
        .map(|r| Vector3::new(x[(r, 0)], x[(r, 1)], x[(r, 2)]))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn solves_diagonal_system() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let rhs = [Vector3::new(2.0, 4.0, 6.0), Vector3::new(4.0, 8.0, 12.0)];
        let x = solve(a, &rhs).unwrap();
        assert!((x[0] - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!((x[1] - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn singular_system_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let rhs = [Vector3::x(), Vector3::y()];
        assert!(solve(a, &rhs).is_none());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        assert!(solve(a, &[Vector3::x()]).is_none());
    }

    #[test]
    fn constrained_fit_honours_constraints() {
        // Fit a constant to samples 0, 1, 2 while pinning it to 5.
        let a = DMatrix::from_element(3, 1, 1.0);
        let b = [Vector3::zeros(), Vector3::x(), Vector3::x() * 2.0];
        let c = DMatrix::from_element(1, 1, 1.0);
        let d = [Vector3::x() * 5.0];
        let x = solve_constrained_least_squares(&a, &b, &c, &d).unwrap();
        assert!((x[0].x - 5.0).abs() < 1e-12);
    }

    #[test]
    fn unconstrained_fit_is_least_squares() {
        let a = DMatrix::from_element(3, 1, 1.0);
        let b = [Vector3::zeros(), Vector3::x(), Vector3::x() * 2.0];
        let c = DMatrix::<f64>::zeros(0, 1);
        let x = solve_constrained_least_squares(&a, &b, &c, &[]).unwrap();
        assert!((x[0].x - 1.0).abs() < 1e-12);
    }
}
