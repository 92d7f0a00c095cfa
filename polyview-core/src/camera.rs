/// Look-at camera with perspective and orthographic projection
///
/// World space is left-handed: with the default camera at (0, 0, -5) looking
/// at the origin, +X is screen right, +Y is screen up and +Z points into the
/// screen. Camera space keeps that orientation with the eye at the origin,
/// so a visible point has positive camera-space z, which is the depth the
/// rasterizer works with.
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::math::{SafeNormalize, EPSILON};

/// Orbit polar angle is kept this far (radians) from either pole.
pub const POLAR_EPSILON: f64 = 0.1;

/// Homogeneous w at or below this is treated as behind the eye.
const W_EPSILON: f64 = 1e-9;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Parallel (axonometric) projection; depth interpolates linearly.
    Orthographic,
    #[default]
    Perspective,
}

/// A projected vertex: pixel coordinates plus camera-space depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

/// Camera configuration for 3D rendering
///
/// All inputs are private so the view and projection matrices can never go
/// stale: every setter recomputes them before returning.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Point3<f64>,
    target: Point3<f64>,
    up: Vector3<f64>,
    fov: f64,
    aspect: f64,
    near: f64,
    far: f64,
    mode: ProjectionMode,
    polar: f64,
    azimuth: f64,
    view: Matrix4<f64>,
    projection: Matrix4<f64>,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        };
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, -5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 60f64.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
            polar: 0.0,
            azimuth: 0.0,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        };
        camera.set_aspect_ratio(aspect);
        camera.update_angles_from_position();
        camera.update_matrices();
        camera
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn target(&self) -> Point3<f64> {
        self.target
    }

    pub fn up(&self) -> Vector3<f64> {
        self.up
    }

    /// Vertical field of view in radians.
    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect
    }

    pub fn clip_planes(&self) -> (f64, f64) {
        (self.near, self.far)
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Orbit angles `(polar, azimuth)` of `position - target`; polar is
    /// measured from +Y, azimuth in the XZ plane from +X toward +Z.
    pub fn orbit_angles(&self) -> (f64, f64) {
        (self.polar, self.azimuth)
    }

    pub fn distance(&self) -> f64 {
        (self.position - self.target).norm()
    }

    pub fn view_matrix(&self) -> &Matrix4<f64> {
        &self.view
    }

    pub fn projection_matrix(&self) -> &Matrix4<f64> {
        &self.projection
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f64> {
        self.projection * self.view
    }

    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
        self.update_angles_from_position();
        self.update_matrices();
    }

    pub fn set_target(&mut self, target: Point3<f64>) {
        self.target = target;
        self.update_angles_from_position();
        self.update_matrices();
    }

    pub fn set_up(&mut self, up: Vector3<f64>) {
        self.up = up;
        self.update_matrices();
    }

    /// Vertical field of view in radians, kept inside (0, pi).
    pub fn set_fov(&mut self, fov: f64) {
        self.fov = if fov.is_finite() {
            fov.clamp(1e-3, std::f64::consts::PI - 1e-3)
        } else {
            60f64.to_radians()
        };
        self.update_matrices();
    }

    /// Non-positive or non-finite ratios fall back to 1.
    pub fn set_aspect_ratio(&mut self, aspect: f64) {
        self.aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        self.update_matrices();
    }

    /// `near` is kept positive and `far` strictly beyond it.
    pub fn set_clip_planes(&mut self, near: f64, far: f64) {
        self.near = near.max(1e-6);
        self.far = far.max(self.near + 1e-6);
        self.update_matrices();
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        self.mode = mode;
        self.update_matrices();
    }

    /// Back to the default pose, keeping projection parameters.
    pub fn reset(&mut self) {
        self.position = Point3::new(0.0, 0.0, -5.0);
        self.target = Point3::origin();
        self.up = Vector3::y();
        self.update_angles_from_position();
        self.update_matrices();
    }

    /// Orthonormal `(right, up, forward)` basis of the current pose.
    ///
    /// `forward` falls back to +Z when position and target coincide, and
    /// `right` falls back to another reference axis when `up` is parallel to
    /// `forward`.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let forward = (self.target - self.position)
            .try_normalize(EPSILON)
            .unwrap_or_else(Vector3::z);
        let right = [self.up, Vector3::y(), Vector3::z(), Vector3::x()]
            .iter()
            .find_map(|reference| reference.cross(&forward).try_normalize(EPSILON))
            .unwrap_or_else(Vector3::x);
        let up = forward.cross(&right);
        (right, up, forward)
    }

    pub fn forward(&self) -> Vector3<f64> {
        self.basis().2
    }

    pub fn right(&self) -> Vector3<f64> {
        self.basis().0
    }

    pub fn update_matrices(&mut self) {
        self.view = self.calculate_view_matrix();
        self.projection = self.calculate_projection_matrix();
    }

    #[rustfmt::skip]
    fn calculate_view_matrix(&self) -> Matrix4<f64> {
        let (r, u, f) = self.basis();
        let eye = self.position.coords;
        Matrix4::new(
            r.x, r.y, r.z, -r.dot(&eye),
            u.x, u.y, u.z, -u.dot(&eye),
            f.x, f.y, f.z, -f.dot(&eye),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    fn calculate_projection_matrix(&self) -> Matrix4<f64> {
        let (n, far) = (self.near, self.far);
        match self.mode {
            ProjectionMode::Perspective => {
                let f = 1.0 / (self.fov / 2.0).tan();
                Matrix4::new(
                    f / self.aspect, 0.0, 0.0, 0.0,
                    0.0, f, 0.0, 0.0,
                    0.0, 0.0, (far + n) / (far - n), -2.0 * far * n / (far - n),
                    0.0, 0.0, 1.0, 0.0,
                )
            }
            ProjectionMode::Orthographic => {
                let height = match self.distance() {
                    d if d > EPSILON => d,
                    _ => 1.0,
                };
                let width = height * self.aspect;
                Matrix4::new(
                    2.0 / width, 0.0, 0.0, 0.0,
                    0.0, 2.0 / height, 0.0, 0.0,
                    0.0, 0.0, 2.0 / (far - n), -(far + n) / (far - n),
                    0.0, 0.0, 0.0, 1.0,
                )
            }
        }
    }

    fn update_angles_from_position(&mut self) {
        let direction = self.position - self.target;
        let distance = direction.norm();
        if distance > EPSILON {
            let dir = direction / distance;
            self.polar = dir.y.clamp(-1.0, 1.0).acos();
            self.azimuth = dir.z.atan2(dir.x);
        } else {
            self.polar = 30f64.to_radians();
            self.azimuth = 45f64.to_radians();
        }
        self.polar = clamp_polar(self.polar);
    }

    /// Orbit around the target, keeping the target and the distance fixed.
    pub fn rotate_around_target(&mut self, d_polar: f64, d_azimuth: f64) {
        let distance = self.distance();
        self.polar = clamp_polar(self.polar + d_polar);
        self.azimuth += d_azimuth;

        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        let offset = Vector3::new(sp * ca, cp, sp * sa) * distance;
        self.position = self.target + offset;
        self.update_matrices();
    }

    /// Dolly along the view direction; negative values move back.
    pub fn move_forward(&mut self, dist: f64) {
        let forward = self.forward();
        self.translate(forward * dist);
    }

    /// Move along the up vector.
    pub fn move_vertical(&mut self, dist: f64) {
        let up = self.up.safe_normalize();
        self.translate(up * dist);
    }

    /// Move sideways along the camera's right vector.
    pub fn strafe(&mut self, dist: f64) {
        let right = self.right();
        self.translate(right * dist);
    }

    fn translate(&mut self, offset: Vector3<f64>) {
        self.position += offset;
        self.target += offset;
        self.update_angles_from_position();
        self.update_matrices();
    }

    /// World point to camera space.
    pub fn to_camera_space(&self, point: &Point3<f64>) -> Point3<f64> {
        self.view.transform_point(point)
    }

    /// Project a world-space point to pixel coordinates.
    ///
    /// Returns `None` when the homogeneous w is not positive (the point is
    /// at or behind the eye), so callers skip rather than divide by zero.
    /// Points outside the viewport are still returned; the rasterizer clips.
    pub fn project_to_screen(
        &self,
        point: &Point3<f64>,
        width: u32,
        height: u32,
    ) -> Option<ScreenPoint> {
        let camera_space = self.to_camera_space(point);
        let clip = self.projection * camera_space.to_homogeneous();

        if clip.w <= W_EPSILON {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;

        Some(ScreenPoint {
            x: (ndc_x + 1.0) * 0.5 * width as f64,
            y: (1.0 - ndc_y) * 0.5 * height as f64,
            depth: camera_space.z,
        })
    }
}

fn clamp_polar(polar: f64) -> f64 {
    polar.clamp(POLAR_EPSILON, std::f64::consts::PI - POLAR_EPSILON)
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode(), ProjectionMode::Perspective);
        assert!((camera.aspect_ratio() - 800.0 / 600.0).abs() < 1e-12);
        assert_relative_eq!(camera.forward(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(camera.right(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_view_matrix_matches_left_handed_look_at() {
        let mut camera = Camera::default();
        camera.set_position(Point3::new(3.0, 2.0, -4.0));
        camera.set_target(Point3::new(0.5, -0.2, 1.0));
        let expected = Matrix4::look_at_lh(&camera.position(), &camera.target(), &Vector3::y());
        assert_relative_eq!(*camera.view_matrix(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::new(800, 600);
        let p = camera.project_to_screen(&Point3::origin(), 800, 600).unwrap();
        assert_relative_eq!(p.x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 300.0, epsilon = 1e-9);
        assert_relative_eq!(p.depth, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_space_depth_matches_projection() {
        let mut camera = Camera::new(800, 600);
        let p = Point3::new(1.0, 2.0, 0.0);
        assert_relative_eq!(camera.to_camera_space(&p), Point3::new(1.0, 2.0, 5.0), epsilon = 1e-12);

        camera.rotate_around_target(0.3, -0.8);
        let q = Point3::new(0.4, -0.7, 1.2);
        let eye = camera.to_camera_space(&q);
        let screen = camera.project_to_screen(&q, 800, 600).unwrap();
        assert_relative_eq!(screen.depth, eye.z, epsilon = 1e-12);
        assert_relative_eq!(
            eye.coords.norm(),
            (q - camera.position()).norm(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_screen_axes() {
        let camera = Camera::new(800, 600);
        let right = camera.project_to_screen(&Point3::new(1.0, 0.0, 0.0), 800, 600).unwrap();
        let up = camera.project_to_screen(&Point3::new(0.0, 1.0, 0.0), 800, 600).unwrap();
        assert!(right.x > 400.0);
        assert!(up.y < 300.0);
    }

    #[test]
    fn test_near_far_map_to_unit_range() {
        let mut camera = Camera::default();
        camera.set_clip_planes(0.5, 50.0);
        let vp = camera.view_projection_matrix();
        let ndc_z = |z: f64| {
            let clip = vp * Point3::new(0.0, 0.0, z - 5.0).to_homogeneous();
            clip.z / clip.w
        };
        assert_relative_eq!(ndc_z(0.5), -1.0, epsilon = 1e-9);
        assert_relative_eq!(ndc_z(50.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_point_behind_camera_is_rejected() {
        let camera = Camera::default();
        assert!(camera.project_to_screen(&Point3::new(0.0, 0.0, -6.0), 800, 600).is_none());
        assert!(camera.project_to_screen(&Point3::new(0.0, 0.0, -5.0), 800, 600).is_none());
    }

    #[test]
    fn test_matrices_refresh_on_every_setter() {
        let mut camera = Camera::default();
        let before = camera.view_projection_matrix();
        camera.set_fov(1.0);
        let after_fov = camera.view_projection_matrix();
        assert!((before - after_fov).norm() > 1e-6);
        camera.set_aspect_ratio(2.0);
        assert!((after_fov - camera.view_projection_matrix()).norm() > 1e-6);
    }

    #[test]
    fn test_orbit_keeps_distance_and_target() {
        let mut camera = Camera::default();
        camera.rotate_around_target(0.3, 0.7);
        assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-9);
        assert_eq!(camera.target(), Point3::origin());
        let (polar, azimuth) = camera.orbit_angles();

        // Setting the same position directly derives the same angles.
        let mut other = Camera::default();
        other.set_position(camera.position());
        let (p2, a2) = other.orbit_angles();
        assert_relative_eq!(polar, p2, epsilon = 1e-9);
        assert_relative_eq!(azimuth, a2, epsilon = 1e-9);
    }

    #[test]
    fn test_orbit_clamps_at_poles() {
        let mut camera = Camera::default();
        camera.rotate_around_target(-10.0, 0.0);
        assert_relative_eq!(camera.orbit_angles().0, POLAR_EPSILON);
        camera.rotate_around_target(10.0, 0.0);
        assert_relative_eq!(camera.orbit_angles().0, std::f64::consts::PI - POLAR_EPSILON);
        assert!(camera.view_matrix().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_motion_preserves_view_direction() {
        let mut camera = Camera::default();
        camera.rotate_around_target(0.2, 0.4);
        let forward = camera.forward();

        camera.move_forward(1.5);
        camera.strafe(-0.7);
        camera.move_vertical(2.0);

        assert_relative_eq!(camera.forward(), forward, epsilon = 1e-12);
        assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_strafe_and_vertical_directions() {
        let mut camera = Camera::default();
        camera.strafe(1.0);
        assert_relative_eq!(camera.position(), Point3::new(1.0, 0.0, -5.0), epsilon = 1e-12);
        camera.move_vertical(2.0);
        assert_relative_eq!(camera.target(), Point3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
        camera.move_forward(1.0);
        assert_relative_eq!(camera.position(), Point3::new(1.0, 2.0, -4.0), epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_position_and_target_falls_back() {
        let mut camera = Camera::default();
        camera.set_position(Point3::origin());
        assert_relative_eq!(camera.forward(), Vector3::z(), epsilon = 1e-12);
        assert!(camera.view_matrix().iter().all(|c| c.is_finite()));
        assert!(camera.projection_matrix().iter().all(|c| c.is_finite()));
        let (polar, azimuth) = camera.orbit_angles();
        assert_relative_eq!(polar, 30f64.to_radians());
        assert_relative_eq!(azimuth, 45f64.to_radians());
    }

    #[test]
    fn test_up_parallel_to_forward() {
        let mut camera = Camera::default();
        camera.set_up(Vector3::z());
        let (r, u, f) = camera.basis();
        assert_relative_eq!(r.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.dot(&f), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.dot(&f), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_orthographic_depth_is_camera_z() {
        let mut camera = Camera::default();
        camera.set_projection_mode(ProjectionMode::Orthographic);
        let near = camera.project_to_screen(&Point3::new(0.5, 0.0, -1.0), 800, 600).unwrap();
        let far = camera.project_to_screen(&Point3::new(0.5, 0.0, 1.0), 800, 600).unwrap();
        assert_relative_eq!(near.x, far.x, epsilon = 1e-9);
        assert_relative_eq!(near.depth, 4.0, epsilon = 1e-12);
        assert_relative_eq!(far.depth, 6.0, epsilon = 1e-12);
    }
}
