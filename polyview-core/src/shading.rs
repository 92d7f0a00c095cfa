/// Point-light shading: vertex normals, Lambert (Gouraud) and Phong models
use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::geometry::Face;
use crate::math::SafeNormalize;
use crate::transform::Transform;

/// Which lighting model a lit render pass uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadingMode {
    /// Light each vertex, interpolate colors across the triangle.
    #[default]
    Gouraud,
    /// Interpolate normals and positions, light every pixel.
    Phong,
}

/// A single point light with its material coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Point3<f64>,
    pub color: Rgb,
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub shininess: f64,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Point3::new(5.0, 5.0, -5.0),
            color: Rgb::WHITE,
            ambient: 0.2,
            diffuse: 0.8,
            specular: 0.5,
            shininess: 32.0,
        }
    }
}

impl PointLight {
    /// Swing the light around the vertical line through `center`.
    pub fn orbit_around(&mut self, center: &Point3<f64>, angle: f64) {
        let m = Transform::about_point(center, &Transform::rotation_y(angle));
        self.position = m.transform_point(&self.position);
    }

    /// Unit vector from `point` to the light; zero when they coincide.
    fn direction_from(&self, point: &Point3<f64>) -> Vector3<f64> {
        (self.position - point).safe_normalize()
    }

    fn ambient_diffuse(&self, point: &Point3<f64>, normal: &Vector3<f64>, base: &Vector3<f64>) -> (Vector3<f64>, f64) {
        let to_light = self.direction_from(point);
        let n_dot_l = normal.safe_normalize().dot(&to_light);
        let light = self.color.to_vector() / 255.0;
        let ambient = base * self.ambient;
        let diffuse = base.component_mul(&light) * self.diffuse * n_dot_l.max(0.0);
        (ambient + diffuse, n_dot_l)
    }
}

/// Lambert color at one surface point:
/// `base * ambient + base * light / 255 * diffuse * max(0, n . l)`, clamped.
pub fn lambert(light: &PointLight, point: &Point3<f64>, normal: &Vector3<f64>, base: Rgb) -> Rgb {
    let (color, _) = light.ambient_diffuse(point, normal, &base.to_vector());
    Rgb::from_vector(&color)
}

/// Lambert plus a specular highlight.
///
/// `reflect = 2 (N . L) N - L`; the highlight is
/// `light * specular * max(0, reflect . to_camera) ^ shininess` and only
/// appears on the lit side (`N . L > 0`).
pub fn phong(
    light: &PointLight,
    point: &Point3<f64>,
    normal: &Vector3<f64>,
    camera_position: &Point3<f64>,
    base: Rgb,
) -> Rgb {
    let n = normal.safe_normalize();
    let (mut color, n_dot_l) = light.ambient_diffuse(point, &n, &base.to_vector());
    if n_dot_l > 0.0 && light.specular > 0.0 {
        let to_light = light.direction_from(point);
        let reflect = n * (2.0 * n_dot_l) - to_light;
        let to_camera = (camera_position - point).safe_normalize();
        let highlight = reflect.dot(&to_camera).max(0.0).powf(light.shininess);
        color += light.color.to_vector() * light.specular * highlight;
    }
    Rgb::from_vector(&color)
}

/// Exact-position key; `+ 0.0` folds -0.0 into 0.0.
type VertexKey = [u64; 3];

fn vertex_key(p: &Point3<f64>) -> VertexKey {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

/// Smoothed normal per unique vertex position
///
/// Each vertex gets the normalized sum of the unit normals of every face
/// that uses it. Every adjacent face counts equally, regardless of its area
/// or the angle it makes at the vertex, so vertices shared by faces of very
/// different sizes lean toward the small faces.
#[derive(Debug, Clone, Default)]
pub struct VertexNormals {
    normals: HashMap<VertexKey, Vector3<f64>>,
}

impl VertexNormals {
    pub fn from_faces(faces: &[Face]) -> Self {
        let mut normals: HashMap<VertexKey, Vector3<f64>> = HashMap::new();
        for face in faces.iter().filter(|f| f.points.len() >= 3) {
            let n = face.normal();
            for p in &face.points {
                *normals.entry(vertex_key(p)).or_insert_with(Vector3::zeros) += n;
            }
        }
        for n in normals.values_mut() {
            *n = n.safe_normalize();
        }
        Self { normals }
    }

    pub fn get(&self, p: &Point3<f64>) -> Option<Vector3<f64>> {
        self.normals.get(&vertex_key(p)).copied()
    }

    /// Normal at each point of `face`, falling back to the face normal for
    /// positions that were not part of the source set.
    pub fn for_face(&self, face: &Face) -> Vec<Vector3<f64>> {
        let fallback = face.normal();
        face.points
            .iter()
            .map(|p| self.get(p).unwrap_or(fallback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }
}

/// Gouraud stage: new faces carrying smoothed normals and per-vertex
/// Lambert colors. `base` picks the material color lit at each face.
pub fn apply_gouraud<F>(faces: &[Face], light: &PointLight, base: F) -> Vec<Face>
where
    F: Fn(&Face) -> Rgb,
{
    let normals = VertexNormals::from_faces(faces);
    faces
        .iter()
        .map(|face| {
            let vertex_normals = normals.for_face(face);
            let material = base(face);
            let colors = face
                .points
                .iter()
                .zip(&vertex_normals)
                .map(|(p, n)| lambert(light, p, n, material))
                .collect();
            face.clone()
                .with_vertex_normals(vertex_normals)
                .with_vertex_colors(colors)
        })
        .collect()
}

/// Phong stage: new faces carrying smoothed normals; lighting itself happens
/// per pixel during rasterization.
pub fn attach_vertex_normals(faces: &[Face]) -> Vec<Face> {
    let normals = VertexNormals::from_faces(faces);
    faces
        .iter()
        .map(|face| face.clone().with_vertex_normals(normals.for_face(face)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polyhedron;
    use approx::assert_relative_eq;

    fn grey() -> Rgb {
        Rgb::new(200, 100, 50)
    }

    #[test]
    fn test_cube_corner_normals_are_diagonals() {
        let faces = Polyhedron::cube(2.0).faces;
        let normals = VertexNormals::from_faces(&faces);
        assert_eq!(normals.len(), 8);
        let n = normals.get(&Point3::new(1.0, 1.0, -1.0)).unwrap();
        assert_relative_eq!(n, Vector3::new(1.0, 1.0, -1.0).normalize(), epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_normals_ignore_face_area() {
        let shared = Point3::origin();
        let big = Face::new(
            vec![shared, Point3::new(100.0, 0.0, 0.0), Point3::new(0.0, 100.0, 0.0)],
            Rgb::WHITE,
        );
        let small = Face::new(
            vec![shared, Point3::new(0.0, 0.0, 0.01), Point3::new(0.01, 0.0, 0.0)],
            Rgb::WHITE,
        );
        let normals = VertexNormals::from_faces(&[big.clone(), small.clone()]);
        let expected = (big.normal() + small.normal()).normalize();
        assert_relative_eq!(normals.get(&shared).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_zero_shares_a_key() {
        assert_eq!(vertex_key(&Point3::new(-0.0, 1.0, 0.0)), vertex_key(&Point3::new(0.0, 1.0, -0.0)));
    }

    #[test]
    fn test_lambert_facing_light() {
        let light = PointLight::default();
        let point = Point3::origin();
        let normal = (light.position - point).normalize();
        // ambient + diffuse == 1.0
        assert_eq!(lambert(&light, &point, &normal, grey()), grey());

        let strong = PointLight { ambient: 0.6, ..light };
        assert_eq!(lambert(&strong, &point, &normal, grey()), Rgb::new(255, 140, 70));
    }

    #[test]
    fn test_lambert_facing_away_is_ambient_only() {
        let light = PointLight::default();
        let point = Point3::origin();
        let away = (point - light.position).normalize();
        assert_eq!(lambert(&light, &point, &away, grey()), Rgb::new(40, 20, 10));
    }

    #[test]
    fn test_light_at_vertex_contributes_nothing() {
        let light = PointLight::default();
        let c = lambert(&light, &light.position, &Vector3::y(), grey());
        assert_eq!(c, Rgb::new(40, 20, 10));
        let p = phong(&light, &light.position, &Vector3::y(), &Point3::origin(), grey());
        assert_eq!(p, Rgb::new(40, 20, 10));
    }

    #[test]
    fn test_phong_without_specular_matches_lambert() {
        let light = PointLight { specular: 0.0, ..PointLight::default() };
        let point = Point3::new(0.3, -0.2, 0.1);
        let normal = Vector3::new(0.2, 0.5, -1.0);
        let camera = Point3::new(0.0, 0.0, -5.0);
        assert_eq!(
            phong(&light, &point, &normal, &camera, grey()),
            lambert(&light, &point, &normal, grey())
        );
    }

    #[test]
    fn test_phong_highlight_on_mirror_direction() {
        let light = PointLight {
            position: Point3::new(0.0, 5.0, -5.0),
            ..PointLight::default()
        };
        let point = Point3::origin();
        let normal = Vector3::y();
        // Mirror of the light about the normal
        let camera = Point3::new(0.0, 5.0, 5.0);
        let lit = phong(&light, &point, &normal, &camera, grey());
        let matte = lambert(&light, &point, &normal, grey());
        assert!(lit.r >= matte.r && lit.g > matte.g && lit.b > matte.b);
    }

    #[test]
    fn test_apply_gouraud_returns_new_faces() {
        let faces = Polyhedron::cube(1.0).faces;
        let lit = apply_gouraud(&faces, &PointLight::default(), |f| f.color);
        assert!(faces.iter().all(|f| f.vertex_colors.is_none()));
        for (src, face) in faces.iter().zip(&lit) {
            assert_eq!(face.points, src.points);
            assert_eq!(face.vertex_colors.as_ref().map(Vec::len), Some(src.points.len()));
            assert_eq!(face.vertex_normals.as_ref().map(Vec::len), Some(src.points.len()));
        }
    }

    #[test]
    fn test_attach_vertex_normals() {
        let faces = Polyhedron::cube(1.0).faces;
        let smooth = attach_vertex_normals(&faces);
        assert!(smooth.iter().all(|f| f.vertex_colors.is_none()));
        let n = &smooth[0].vertex_normals.as_ref().unwrap()[0];
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_light_orbit_keeps_height_and_radius() {
        let mut light = PointLight::default();
        let center = Point3::new(1.0, 0.0, 1.0);
        let radius = |l: &PointLight| (l.position.xz() - center.xz()).norm();
        let before = radius(&light);
        light.orbit_around(&center, 45f64.to_radians());
        assert_relative_eq!(light.position.y, 5.0, epsilon = 1e-12);
        assert_relative_eq!(radius(&light), before, epsilon = 1e-12);
    }
}
