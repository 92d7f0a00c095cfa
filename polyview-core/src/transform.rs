/// 4x4 homogeneous affine transforms
///
/// Every builder is a pure function returning a fresh matrix. Matrices act on
/// column vectors, so `b * a` applies `a` first; [`Transform::compose`] spells
/// that order out.
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Point3, Vector3};

use crate::geometry::Polyhedron;
use crate::math::SafeNormalize;

/// Below this, a direction component is treated as zero when aligning a line
/// with a principal axis.
const ALIGN_EPSILON: f64 = 1e-12;

/// A principal coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown axis {0:?}, expected one of x, y, z")]
pub struct ParseAxisError(pub String);

impl FromStr for Axis {
    type Err = ParseAxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(ParseAxisError(s.to_string())),
        }
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// `first` followed by `then`.
    pub fn compose(first: &Matrix4<f64>, then: &Matrix4<f64>) -> Matrix4<f64> {
        then * first
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(dx, dy, dz))
    }

    #[rustfmt::skip]
    pub fn rotation_x(angle: f64) -> Matrix4<f64> {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    pub fn rotation_y(angle: f64) -> Matrix4<f64> {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    pub fn rotation_z(angle: f64) -> Matrix4<f64> {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            c, -s, 0.0, 0.0,
            s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation(axis: Axis, angle: f64) -> Matrix4<f64> {
        match axis {
            Axis::X => Self::rotation_x(angle),
            Axis::Y => Self::rotation_y(angle),
            Axis::Z => Self::rotation_z(angle),
        }
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Matrix4<f64> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Mirror through the XY plane (negates z).
    pub fn reflection_xy() -> Matrix4<f64> {
        Self::scaling(1.0, 1.0, -1.0)
    }

    /// Mirror through the XZ plane (negates y).
    pub fn reflection_xz() -> Matrix4<f64> {
        Self::scaling(1.0, -1.0, 1.0)
    }

    /// Mirror through the YZ plane (negates x).
    pub fn reflection_yz() -> Matrix4<f64> {
        Self::scaling(-1.0, 1.0, 1.0)
    }

    /// Rodrigues rotation about an axis through the origin.
    ///
    /// `axis` is expected to be unit length. A non-unit axis is not rejected;
    /// the result is then a rotation mixed with a shear, not a crash.
    #[rustfmt::skip]
    pub fn rotation_around_axis(axis: &Vector3<f64>, angle: f64) -> Matrix4<f64> {
        let (u, v, w) = (axis.x, axis.y, axis.z);
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        Matrix4::new(
            c + u * u * t, u * v * t - w * s, u * w * t + v * s, 0.0,
            u * v * t + w * s, c + v * v * t, v * w * t - u * s, 0.0,
            u * w * t - v * s, v * w * t + u * s, c + w * w * t, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation by `angle` (right-handed about `direction`) around the line
    /// through `point` with the given direction.
    ///
    /// Built as translate-to-origin, align the line with +Z (a turn about X
    /// into the XZ plane, then a turn about Y), rotate about Z, undo the
    /// alignment, undo the translation. When the direction has no Y or Z
    /// component the X turn is skipped (identity) and the Y turn alone maps
    /// ±X onto +Z. A zero direction yields the identity.
    pub fn rotation_around_line(
        point: &Point3<f64>,
        direction: &Vector3<f64>,
        angle: f64,
    ) -> Matrix4<f64> {
        let dir = direction.safe_normalize();
        if dir.norm() < ALIGN_EPSILON {
            return Matrix4::identity();
        }
        let (u, v, w) = (dir.x, dir.y, dir.z);
        let d = (v * v + w * w).sqrt();

        let to_origin = Self::translation(-point.x, -point.y, -point.z);
        let back = Self::translation(point.x, point.y, point.z);

        #[rustfmt::skip]
        let align_x = if d > ALIGN_EPSILON {
            Matrix4::new(
                1.0, 0.0, 0.0, 0.0,
                0.0, w / d, -v / d, 0.0,
                0.0, v / d, w / d, 0.0,
                0.0, 0.0, 0.0, 1.0,
            )
        } else {
            Matrix4::identity()
        };
        #[rustfmt::skip]
        let align_y = Matrix4::new(
            d, 0.0, -u, 0.0,
            0.0, 1.0, 0.0, 0.0,
            u, 0.0, d, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        // Both alignment matrices are orthonormal: inverse == transpose.
        back * align_x.transpose()
            * align_y.transpose()
            * Self::rotation_z(angle)
            * align_y
            * align_x
            * to_origin
    }

    /// Rotation around the line through two points, directed from `p1` to `p2`.
    pub fn rotation_around_segment(p1: &Point3<f64>, p2: &Point3<f64>, angle: f64) -> Matrix4<f64> {
        Self::rotation_around_line(p1, &(p2 - p1), angle)
    }

    /// Rotation around the line through the polyhedron's current centroid,
    /// parallel to a principal axis.
    pub fn rotation_around_line_through_center(
        polyhedron: &Polyhedron,
        axis: Axis,
        angle: f64,
    ) -> Matrix4<f64> {
        Self::about_point(&polyhedron.center(), &Self::rotation(axis, angle))
    }

    /// Conjugate `m` so that it acts around `pivot` instead of the origin:
    /// translate(-pivot), then `m`, then translate(+pivot).
    pub fn about_point(pivot: &Point3<f64>, m: &Matrix4<f64>) -> Matrix4<f64> {
        Self::translation(pivot.x, pivot.y, pivot.z)
            * m
            * Self::translation(-pivot.x, -pivot.y, -pivot.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn apply(m: &Matrix4<f64>, p: Point3<f64>) -> Point3<f64> {
        m.transform_point(&p)
    }

    #[test]
    fn test_translation_moves_points() {
        let m = Transform::translation(1.0, -2.0, 3.0);
        assert_eq!(apply(&m, Point3::origin()), Point3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_axis_rotations_quarter_turn() {
        let p = apply(&Transform::rotation_z(FRAC_PI_2), Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        let p = apply(&Transform::rotation_x(FRAC_PI_2), Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);

        let p = apply(&Transform::rotation_y(FRAC_PI_2), Point3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(p, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_reflections() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(apply(&Transform::reflection_xy(), p), Point3::new(1.0, 2.0, -3.0));
        assert_eq!(apply(&Transform::reflection_xz(), p), Point3::new(1.0, -2.0, 3.0));
        assert_eq!(apply(&Transform::reflection_yz(), p), Point3::new(-1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rodrigues_matches_axis_rotations() {
        for angle in [0.3, 1.0, -2.2, PI] {
            assert_relative_eq!(
                Transform::rotation_around_axis(&Vector3::x(), angle),
                Transform::rotation_x(angle),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                Transform::rotation_around_axis(&Vector3::y(), angle),
                Transform::rotation_y(angle),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                Transform::rotation_around_axis(&Vector3::z(), angle),
                Transform::rotation_z(angle),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_line_through_origin_matches_rodrigues() {
        let axis = Vector3::new(1.0, 2.0, -0.5).normalize();
        assert_relative_eq!(
            Transform::rotation_around_line(&Point3::origin(), &axis, 0.7),
            Transform::rotation_around_axis(&axis, 0.7),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_line_along_x_is_special_cased() {
        for dir in [Vector3::x(), -Vector3::x()] {
            let m = Transform::rotation_around_line(&Point3::new(0.0, 1.0, 0.0), &dir, FRAC_PI_2);
            assert!(m.iter().all(|c| c.is_finite()));
            let expected = Transform::about_point(
                &Point3::new(0.0, 1.0, 0.0),
                &Transform::rotation_around_axis(&dir, FRAC_PI_2),
            );
            assert_relative_eq!(m, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_line_along_negative_z_flips() {
        let m = Transform::rotation_around_line(&Point3::origin(), &-Vector3::z(), 0.4);
        assert_relative_eq!(m, Transform::rotation_z(-0.4), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_direction_is_identity() {
        let m = Transform::rotation_around_line(&Point3::new(1.0, 1.0, 1.0), &Vector3::zeros(), 1.0);
        assert_eq!(m, Matrix4::identity());
    }

    #[test]
    fn test_points_on_line_are_fixed() {
        let p1 = Point3::new(1.0, 2.0, 3.0);
        let p2 = Point3::new(-1.0, 0.5, 4.0);
        let m = Transform::rotation_around_segment(&p1, &p2, 1.3);
        assert_relative_eq!(apply(&m, p1), p1, epsilon = 1e-12);
        assert_relative_eq!(apply(&m, p2), p2, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_order() {
        let a = Transform::translation(1.0, 0.0, 0.0);
        let b = Transform::scaling(2.0, 2.0, 2.0);
        let p = apply(&Transform::compose(&a, &b), Point3::origin());
        assert_eq!(p, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("x".parse::<Axis>(), Ok(Axis::X));
        assert_eq!(" Y ".parse::<Axis>(), Ok(Axis::Y));
        assert_eq!("z".parse::<Axis>(), Ok(Axis::Z));
        assert!("w".parse::<Axis>().is_err());
        assert_eq!(Axis::Y.to_string(), "y");
    }
}
