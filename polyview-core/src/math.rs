/// Vector helpers shared by the pipeline stages
use nalgebra::{Point3, Vector3};

/// Lengths at or below this are treated as zero when normalizing.
pub const EPSILON: f64 = 1e-12;

/// Normalization that never divides by zero.
///
/// `nalgebra`'s `normalize` yields NaN components for a zero vector. Every
/// stage of the pipeline (face normals, look-at basis, light direction)
/// can legitimately meet one, so they go through this instead.
pub trait SafeNormalize {
    /// Unit vector in the same direction, or `self` unchanged when the
    /// length is zero.
    fn safe_normalize(&self) -> Self;
}

impl SafeNormalize for Vector3<f64> {
    fn safe_normalize(&self) -> Self {
        self.try_normalize(EPSILON).unwrap_or(*self)
    }
}

/// Arithmetic mean of a set of points, or the origin for an empty set.
pub fn centroid<'a, I>(points: I) -> Point3<f64>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p.coords;
        count += 1;
    }
    if count == 0 {
        return Point3::origin();
    }
    Point3::from(sum / count as f64)
}
