//! B-spline basis functions (Cox–de Boor recursion).

use nalgebra::DMatrix;

/// Finds the knot span index `i` with `knots[i] <= t < knots[i + 1]`.
///
/// `n_ctrl` is the number of control points. Parameters at or beyond the end
/// of the domain map to the last non-empty span.
#[must_use]
pub fn find_span(degree: usize, knots: &[f64], n_ctrl: usize, t: f64) -> usize {
    let n = n_ctrl - 1;
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// The `degree + 1` non-vanishing basis functions `N[span - degree..=span]` at `t`.
#[must_use]
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Non-vanishing basis functions and their derivatives up to `order` at `t`.
///
/// Row `k` of the result holds the `k`-th derivatives; rows above `degree`
/// are zero.
#[must_use]
pub fn basis_function_derivatives(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            // Lower triangle holds knot differences.
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; order + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = order.min(p);
    let mut a = vec![vec![0.0; p + 1]; 2];
    for r in 0..=p {
        let (mut s1, mut s2) = (0, 1);
        a[0][0] = 1.0;
        for k in 1..=top {
            let mut d = 0.0;
            let pk = p - k;
            if r >= k {
                a[s2][0] = a[s1][0] / ndu[pk + 1][r - k];
                d = a[s2][0] * ndu[r - k][pk];
            }
            let j1 = if r + 1 >= k { 1 } else { k - r };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };
            for j in j1..=j2 {
                let idx = r + j - k;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }
            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }
            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mut factor = p as f64;
    for k in 1..=top {
        for value in &mut ders[k] {
            *value *= factor;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            factor *= (p - k) as f64;
        }
    }
    ders
}

/// Dense matrix of the `derivative`-th basis functions, one row per parameter
/// and one column per control point.
#[must_use]
pub fn basis_matrix(
    degree: usize,
    knots: &[f64],
    n_ctrl: usize,
    params: &[f64],
    derivative: usize,
) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(params.len(), n_ctrl);
    for (row, &t) in params.iter().enumerate() {
        let span = find_span(degree, knots, n_ctrl, t);
        let ders = basis_function_derivatives(degree, knots, span, t, derivative);
        for (offset, value) in ders[derivative].iter().enumerate() {
            matrix[(row, span - degree + offset)] = *value;
        }
    }
    matrix
}
