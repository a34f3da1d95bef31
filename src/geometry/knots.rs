//! Knot vector construction and inspection.

use crate::error::{GeometryError, Result};

/// Knots closer than this fraction of the domain length are treated as equal.
pub const KNOT_TOLERANCE: f64 = 1e-10;

/// Checks that `knots` is a clamped, non-decreasing knot vector for a curve
/// of `degree` with `n_ctrl` control points.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidKnotVector`] describing the first violated
/// rule.
pub fn validate(degree: usize, knots: &[f64], n_ctrl: usize) -> Result<()> {
    if degree == 0 {
        return Err(GeometryError::InvalidKnotVector("degree must be at least 1".into()).into());
    }
    if n_ctrl < degree + 1 {
        return Err(GeometryError::InvalidControlPoints(format!(
            "degree {degree} needs at least {} control points, got {n_ctrl}",
            degree + 1
        ))
        .into());
    }
    if knots.len() != n_ctrl + degree + 1 {
        return Err(GeometryError::InvalidKnotVector(format!(
            "expected {} knots for {n_ctrl} control points of degree {degree}, got {}",
            n_ctrl + degree + 1,
            knots.len()
        ))
        .into());
    }
    if knots.iter().any(|k| !k.is_finite()) {
        return Err(GeometryError::InvalidKnotVector("knots must be finite".into()).into());
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(GeometryError::InvalidKnotVector("knots must be non-decreasing".into()).into());
    }

    let (start, end) = domain(degree, knots);
    if end - start <= 0.0 {
        return Err(GeometryError::InvalidKnotVector("empty parameter domain".into()).into());
    }
    let tol = KNOT_TOLERANCE * (end - start);
    if knots[..=degree].iter().any(|k| (k - start).abs() > tol)
        || knots[n_ctrl..].iter().any(|k| (k - end).abs() > tol)
    {
        return Err(GeometryError::InvalidKnotVector(format!(
            "ends must be clamped with multiplicity {}",
            degree + 1
        ))
        .into());
    }
    for (value, mult) in distinct(knots, tol) {
        if value > start && value < end && mult > degree + 1 {
            return Err(GeometryError::InvalidKnotVector(format!(
                "interior knot {value} has multiplicity {mult} > {}",
                degree + 1
            ))
            .into());
        }
    }
    Ok(())
}

/// Parameter domain `[knots[degree], knots[len - degree - 1]]`.
#[must_use]
pub fn domain(degree: usize, knots: &[f64]) -> (f64, f64) {
    (knots[degree], knots[knots.len() - degree - 1])
}

/// Distinct knot values with their multiplicities.
#[must_use]
pub fn distinct(knots: &[f64], tol: f64) -> Vec<(f64, usize)> {
    let mut result: Vec<(f64, usize)> = Vec::new();
    for &k in knots {
        match result.last_mut() {
            Some((value, mult)) if (k - *value).abs() <= tol => *mult += 1,
            _ => result.push((k, 1)),
        }
    }
    result
}

/// Multiplicity of `t` in `knots`.
#[must_use]
pub fn multiplicity(knots: &[f64], t: f64, tol: f64) -> usize {
    knots.iter().filter(|k| (*k - t).abs() <= tol).count()
}

/// Interior distinct knots (strictly inside the domain) with multiplicities.
#[must_use]
pub fn interior(degree: usize, knots: &[f64]) -> Vec<(f64, usize)> {
    let (start, end) = domain(degree, knots);
    let tol = KNOT_TOLERANCE * (end - start);
    distinct(knots, tol)
        .into_iter()
        .filter(|(value, _)| *value > start + tol && *value < end - tol)
        .collect()
}

/// Clamped knot vector on `[start, end]` with the given interior knots.
#[must_use]
pub fn clamped(degree: usize, interior: &[f64], start: f64, end: f64) -> Vec<f64> {
    let mut knots = Vec::with_capacity(interior.len() + 2 * (degree + 1));
    knots.extend(std::iter::repeat_n(start, degree + 1));
    knots.extend_from_slice(interior);
    knots.extend(std::iter::repeat_n(end, degree + 1));
    knots
}

/// Knot vector for global interpolation at `params` by averaging.
///
/// Interior knot `j` is the mean of `params[j..j + degree]`, which keeps every
/// parameter inside the support of its basis function.
#[must_use]
pub fn averaged(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let start = params[0];
    let end = params[n - 1];
    let interior: Vec<f64> = (1..n - degree)
        .map(|j| {
            let sum: f64 = params[j..j + degree].iter().sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / degree as f64;
            mean
        })
        .collect();
    clamped(degree, &interior, start, end)
}

/// Knot vector of the reversed curve.
#[must_use]
pub fn reversed(knots: &[f64]) -> Vec<f64> {
    let first = knots[0];
    let last = knots[knots.len() - 1];
    knots.iter().rev().map(|k| first + last - k).collect()
}

/// Union of several interior knot sets, keeping the maximum multiplicity of
/// each value.
#[must_use]
pub fn union(sets: &[Vec<(f64, usize)>], tol: f64) -> Vec<(f64, usize)> {
    let mut merged: Vec<(f64, usize)> = Vec::new();
    for set in sets {
        for &(value, mult) in set {
            match merged.iter_mut().find(|(v, _)| (v - value).abs() <= tol) {
                Some(entry) => entry.1 = entry.1.max(mult),
                None => merged.push((value, mult)),
            }
        }
    }
    merged.sort_by(|a, b| a.0.total_cmp(&b.0));
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn validates_clamped_vector() {
        let knots = [0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        assert!(validate(2, &knots, 4).is_ok());
    }

    #[test]
    fn rejects_wrong_length_and_decreasing() {
        assert!(validate(2, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0], 4).is_err());
        assert!(validate(1, &[0.0, 0.0, 0.6, 0.4, 1.0, 1.0], 4).is_err());
    }

    #[test]
    fn rejects_unclamped_ends() {
        assert!(validate(2, &[0.0, 0.1, 0.2, 0.5, 0.8, 0.9, 1.0], 4).is_err());
    }

    #[test]
    fn rejects_excess_interior_multiplicity() {
        let knots = [0.0, 0.0, 0.5, 0.5, 0.5, 1.0, 1.0];
        assert!(validate(1, &knots, 5).is_err());
        let knots = [0.0, 0.0, 0.5, 0.5, 1.0, 1.0];
        assert!(validate(1, &knots, 4).is_ok());
    }

    #[test]
    fn distinct_counts_multiplicity() {
        let knots = [0.0, 0.0, 0.5, 0.5, 1.0];
        assert_eq!(distinct(&knots, 1e-12), vec![(0.0, 2), (0.5, 2), (1.0, 1)]);
        assert_eq!(multiplicity(&knots, 0.5, 1e-12), 2);
    }

    #[test]
    fn averaged_knots_of_cubic() {
        let params = [0.0, 0.2, 0.5, 0.7, 1.0];
        let knots = averaged(&params, 3);
        assert_eq!(knots.len(), params.len() + 4);
        assert_relative_eq!(knots[4], (0.2 + 0.5 + 0.7) / 3.0);
        assert_relative_eq!(knots[3], 0.0);
        assert_relative_eq!(knots[5], 1.0);
    }

    #[test]
    fn reversed_knots_mirror_the_domain() {
        let knots = [0.0, 0.0, 1.0, 4.0, 4.0];
        let rev = reversed(&knots);
        assert_eq!(rev, vec![0.0, 0.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn union_keeps_max_multiplicity() {
        let a = vec![(0.25, 1), (0.5, 2)];
        let b = vec![(0.5, 1), (0.75, 1)];
        let merged = union(&[a, b], 1e-12);
        assert_eq!(merged, vec![(0.25, 1), (0.5, 2), (0.75, 1)]);
    }
}
