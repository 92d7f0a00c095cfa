/// Faces and polyhedra in object space
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

use crate::color::Rgb;
use crate::math::{centroid, SafeNormalize};
use crate::transform::Transform;

/// A planar polygon with a winding-defined normal
///
/// Points are ordered; `(p1 - p0) x (p2 - p0)` gives the outward normal.
/// The per-vertex attribute vectors, when present, are parallel to `points`.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub points: Vec<Point3<f64>>,
    pub color: Rgb,
    /// Lit colors filled in by the Gouraud stage.
    pub vertex_colors: Option<Vec<Rgb>>,
    /// Smoothed normals filled in by the shading stage.
    pub vertex_normals: Option<Vec<Vector3<f64>>>,
    /// Texture coordinates supplied by the geometry producer.
    pub tex_coords: Option<Vec<Vector2<f64>>>,
}

impl Face {
    pub fn new(points: Vec<Point3<f64>>, color: Rgb) -> Self {
        Self {
            points,
            color,
            vertex_colors: None,
            vertex_normals: None,
            tex_coords: None,
        }
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<Vector2<f64>>) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn with_vertex_colors(mut self, colors: Vec<Rgb>) -> Self {
        self.vertex_colors = Some(colors);
        self
    }

    pub fn with_vertex_normals(mut self, normals: Vec<Vector3<f64>>) -> Self {
        self.vertex_normals = Some(normals);
        self
    }

    pub fn center(&self) -> Point3<f64> {
        centroid(&self.points)
    }

    /// Unnormalized `(p1 - p0) x (p2 - p0)`; zero for fewer than three points.
    pub fn raw_normal(&self) -> Vector3<f64> {
        match self.points.as_slice() {
            [p0, p1, p2, ..] => (p1 - p0).cross(&(p2 - p0)),
            _ => Vector3::zeros(),
        }
    }

    /// Unit normal from the first three points, which stands for the whole
    /// face only when the face is planar and convex.
    ///
    /// Faces with fewer than three points have no defined normal; they report
    /// +Z rather than failing. A collinear first triple yields the zero vector.
    pub fn normal(&self) -> Vector3<f64> {
        if self.points.len() < 3 {
            return Vector3::z();
        }
        self.raw_normal().safe_normalize()
    }

    /// Back-face test against a camera position: true when the normal
    /// points back toward the camera.
    pub fn is_visible(&self, camera_position: &Point3<f64>) -> bool {
        let view = (self.center() - camera_position).safe_normalize();
        self.normal().dot(&view) < 0.0
    }

    /// Back-face test against a fixed viewing direction (orthographic views).
    pub fn is_facing(&self, view_direction: &Vector3<f64>) -> bool {
        self.normal().dot(view_direction) < 0.0
    }

    /// Same face with reversed winding.
    ///
    /// The normal is exactly negated for triangles and for planar convex
    /// polygons. A non-planar or concave polygon can pick up a different
    /// first triple after reversal.
    pub fn reversed(&self) -> Face {
        fn rev<T: Clone>(v: &Option<Vec<T>>) -> Option<Vec<T>> {
            v.as_ref().map(|v| v.iter().rev().cloned().collect())
        }
        Face {
            points: self.points.iter().rev().copied().collect(),
            color: self.color,
            vertex_colors: rev(&self.vertex_colors),
            vertex_normals: rev(&self.vertex_normals),
            tex_coords: rev(&self.tex_coords),
        }
    }

    /// New face with every point mapped through `m`, including the
    /// homogeneous divide when `w` is neither 1 nor 0.
    ///
    /// Lighting attributes are not carried over; they belong to the space
    /// they were computed in.
    pub fn transformed(&self, m: &Matrix4<f64>) -> Face {
        let points = self
            .points
            .iter()
            .map(|p| {
                let h = m * p.to_homogeneous();
                if h.w != 0.0 && h.w != 1.0 {
                    Point3::new(h.x / h.w, h.y / h.w, h.z / h.w)
                } else {
                    Point3::new(h.x, h.y, h.z)
                }
            })
            .collect();
        Face {
            points,
            color: self.color,
            vertex_colors: None,
            vertex_normals: None,
            tex_coords: self.tex_coords.clone(),
        }
    }

    /// Fan triangulation `(0, i, i + 1)` as index triples into `points`.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (1..self.points.len().saturating_sub(1)).map(|i| [0, i, i + 1])
    }
}

/// A list of faces plus one accumulated object-to-world transform
#[derive(Debug, Clone)]
pub struct Polyhedron {
    pub faces: Vec<Face>,
    transform: Matrix4<f64>,
}

impl Polyhedron {
    pub fn new(faces: Vec<Face>) -> Self {
        Self {
            faces,
            transform: Matrix4::identity(),
        }
    }

    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Compose `m` after the transforms applied so far.
    pub fn apply_transform(&mut self, m: &Matrix4<f64>) {
        self.transform = m * self.transform;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Matrix4::identity();
    }

    /// World-space faces under the current transform. The stored faces are
    /// left untouched.
    pub fn transformed_faces(&self) -> Vec<Face> {
        self.faces
            .iter()
            .map(|face| face.transformed(&self.transform))
            .collect()
    }

    /// Mean of every face point in world space.
    ///
    /// Vertices shared by several faces are counted once per face, which
    /// biases the result toward densely connected vertices. This is the
    /// pivot used by the scale and centre-rotation operations.
    pub fn center(&self) -> Point3<f64> {
        let local = centroid(self.faces.iter().flat_map(|f| f.points.iter()));
        self.transform.transform_point(&local)
    }

    /// Uniform scale about [`Polyhedron::center`], applied as one transform.
    pub fn scale_about_center(&mut self, factor: f64) {
        let m = Transform::about_point(&self.center(), &Transform::scaling(factor, factor, factor));
        self.apply_transform(&m);
    }

    /// Axis-aligned cube centred on the origin with outward winding and a
    /// full 0..1 texture square on every face.
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let p = Point3::new;
        let quads = [
            // Front (-Z)
            ([p(-h, -h, -h), p(-h, h, -h), p(h, h, -h), p(h, -h, -h)], Rgb::new(255, 0, 0)),
            // Back (+Z)
            ([p(-h, -h, h), p(h, -h, h), p(h, h, h), p(-h, h, h)], Rgb::new(0, 255, 0)),
            // Top (+Y)
            ([p(-h, h, -h), p(-h, h, h), p(h, h, h), p(h, h, -h)], Rgb::new(0, 0, 255)),
            // Bottom (-Y)
            ([p(-h, -h, -h), p(h, -h, -h), p(h, -h, h), p(-h, -h, h)], Rgb::new(255, 255, 0)),
            // Right (+X)
            ([p(h, -h, -h), p(h, h, -h), p(h, h, h), p(h, -h, h)], Rgb::new(255, 0, 255)),
            // Left (-X)
            ([p(-h, -h, -h), p(-h, -h, h), p(-h, h, h), p(-h, h, -h)], Rgb::new(0, 255, 255)),
        ];
        let uv = vec![
            Vector2::new(0.0, 1.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
        ];
        let faces = quads
            .into_iter()
            .map(|(points, color)| Face::new(points.to_vec(), color).with_tex_coords(uv.clone()))
            .collect();
        Self::new(faces)
    }
}

impl Default for Polyhedron {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
