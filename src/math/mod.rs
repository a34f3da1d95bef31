pub mod linalg;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Homogeneous 4D vector type, used for weighted control points.
pub type Vector4 = nalgebra::Vector4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Binomial coefficient `n choose k` as a float.
#[must_use]
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut value = 1.0;
    for i in 0..k {
        #[allow(clippy::cast_precision_loss)]
        {
            value = value * (n - i) as f64 / (i + 1) as f64;
        }
    }
    value
}

/// `count` evenly spaced values from `start` to `end` inclusive.
///
/// Returns `[start]` for `count == 1` and nothing for `count == 0`.
#[must_use]
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let step = (end - start) / (count - 1) as f64;
            let mut values: Vec<f64> = (0..count)
                .map(|i| {
                    #[allow(clippy::cast_precision_loss)]
                    let offset = step * i as f64;
                    start + offset
                })
                .collect();
            values[count - 1] = end;
            values
        }
    }
}

/// Angle between two vectors in radians, or zero when either is degenerate.
#[must_use]
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    let na = a.norm();
    let nb = b.norm();
    if na < TOLERANCE || nb < TOLERANCE {
        return 0.0;
    }
    (a.dot(b) / (na * nb)).clamp(-1.0, 1.0).acos()
}
