/// Z-buffered triangle rasterizer
///
/// The frame buffer owns a depth grid and a parallel color grid. Triangles
/// arrive in screen space; for every covered pixel the rasterizer computes
/// barycentric weights, resolves depth, runs the depth test and only then
/// asks the caller's shader for a color, so hidden pixels are never shaded.
use std::ops::{Add, Mul};

use crate::camera::ScreenPoint;
use crate::color::Rgb;

/// Pixels whose barycentric weights are all at least `-INSIDE_EPSILON` are
/// drawn; the slack closes seams between triangles sharing an edge.
pub const INSIDE_EPSILON: f64 = 1e-3;

/// Triangles whose doubled signed screen area is at most this are skipped.
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// How depth (and the weights derived from it) vary across a triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthInterpolation {
    /// Interpolate `1/depth`, then invert. Required under perspective
    /// projection, where depth is not linear in screen space.
    Perspective,
    /// Interpolate depth directly (orthographic / axonometric views).
    Linear,
}

/// One covered pixel that passed the depth test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    pub depth: f64,
    /// Screen-space barycentric weights.
    pub weights: [f64; 3],
    /// Weights corrected for perspective; equal to `weights` in linear mode.
    pub perspective_weights: [f64; 3],
}

impl Fragment {
    /// Affine (screen-space) interpolation of a per-vertex attribute.
    pub fn lerp<T>(&self, values: &[T; 3]) -> T
    where
        T: Copy + Add<Output = T> + Mul<f64, Output = T>,
    {
        interpolate(self.weights, values)
    }

    /// Perspective-correct interpolation of a per-vertex attribute.
    pub fn lerp_perspective<T>(&self, values: &[T; 3]) -> T
    where
        T: Copy + Add<Output = T> + Mul<f64, Output = T>,
    {
        interpolate(self.perspective_weights, values)
    }
}

/// Weighted sum of three vertex attributes.
pub fn interpolate<T>(weights: [f64; 3], values: &[T; 3]) -> T
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    values[0] * weights[0] + values[1] * weights[1] + values[2] * weights[2]
}

/// Calculate barycentric coordinates for a point in a triangle
///
/// Returns `None` for a degenerate (zero-area) triangle. The weights always
/// sum to one; a point is inside when all three are non-negative.
pub fn barycentric(
    v0: (f64, f64),
    v1: (f64, f64),
    v2: (f64, f64),
    p: (f64, f64),
) -> Option<[f64; 3]> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() <= DEGENERATE_EPSILON {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some([w0, w1, w2])
}

/// Turn screen-space weights into perspective-correct ones: each weight is
/// divided by its vertex depth and the result renormalized. Also returns
/// the interpolated depth `1 / sum(w_i / z_i)`. `None` when that sum is not
/// positive (a vertex at or behind the eye).
pub fn perspective_weights(weights: [f64; 3], depths: [f64; 3]) -> Option<([f64; 3], f64)> {
    let scaled = [
        weights[0] / depths[0],
        weights[1] / depths[1],
        weights[2] / depths[2],
    ];
    let inv_depth = scaled[0] + scaled[1] + scaled[2];
    if !inv_depth.is_finite() || inv_depth <= f64::EPSILON {
        return None;
    }
    Some((
        [scaled[0] / inv_depth, scaled[1] / inv_depth, scaled[2] / inv_depth],
        1.0 / inv_depth,
    ))
}

/// Depth and color buffers for software rendering
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f64>,
    color_buffer: Vec<Rgb>,
    background: Rgb,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize, background: Rgb) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f64::INFINITY; size],
            color_buffer: vec![background; size],
            background,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Takes effect at the next [`FrameBuffer::clear`].
    pub fn set_background(&mut self, background: Rgb) {
        self.background = background;
    }

    /// Reset every pixel to "nothing drawn": infinite depth, background color.
    pub fn clear(&mut self) {
        self.depth_buffer.fill(f64::INFINITY);
        self.color_buffer.fill(self.background);
    }

    /// Resize and clear.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f64::INFINITY; width * height];
        self.color_buffer = vec![self.background; width * height];
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f64 {
        self.depth_buffer[y * self.width + x]
    }

    pub fn color_at(&self, x: usize, y: usize) -> Rgb {
        self.color_buffer[y * self.width + x]
    }

    /// Row-major colors, `width * height` entries.
    pub fn pixels(&self) -> &[Rgb] {
        &self.color_buffer
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.color_buffer.chunks(self.width.max(1))
    }

    /// Row-major RGB bytes, three per pixel.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.color_buffer.iter().flat_map(|c| c.to_array()).collect()
    }

    /// Scan-convert one triangle.
    ///
    /// With `depth_test` a pixel is written only when its depth is strictly
    /// less than the stored one, so on exact ties the first triangle drawn
    /// wins. Without it every covered pixel is overwritten (painter's order
    /// is then the caller's job). Returns the number of pixels written.
    pub fn rasterize_triangle<F>(
        &mut self,
        vertices: &[ScreenPoint; 3],
        interpolation: DepthInterpolation,
        depth_test: bool,
        mut shade: F,
    ) -> usize
    where
        F: FnMut(&Fragment) -> Rgb,
    {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let [v0, v1, v2] = vertices;
        if vertices
            .iter()
            .any(|v| !(v.x.is_finite() && v.y.is_finite() && v.depth.is_finite()))
        {
            return 0;
        }
        let (p0, p1, p2) = ((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y));
        let area = (p1.0 - p0.0) * (p2.1 - p0.1) - (p2.0 - p0.0) * (p1.1 - p0.1);
        if area.abs() <= DEGENERATE_EPSILON {
            return 0;
        }
        let depths = [v0.depth, v1.depth, v2.depth];

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as usize;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil().min((self.width - 1) as f64);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as usize;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil().min((self.height - 1) as f64);
        if max_x < 0.0 || max_y < 0.0 {
            return 0;
        }
        let (max_x, max_y) = (max_x as usize, max_y as usize);

        let mut written = 0;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f64 + 0.5;
                let py = y as f64 + 0.5;

                let Some(weights) = barycentric(p0, p1, p2, (px, py)) else {
                    return written;
                };
                if weights.iter().any(|w| *w < -INSIDE_EPSILON) {
                    continue;
                }

                let (perspective, depth) = match interpolation {
                    DepthInterpolation::Perspective => match perspective_weights(weights, depths) {
                        Some(found) => found,
                        None => continue,
                    },
                    DepthInterpolation::Linear => (weights, interpolate(weights, &depths)),
                };

                let idx = y * self.width + x;
                if depth_test && depth >= self.depth_buffer[idx] {
                    continue;
                }

                let fragment = Fragment {
                    x,
                    y,
                    depth,
                    weights,
                    perspective_weights: perspective,
                };
                self.depth_buffer[idx] = depth;
                self.color_buffer[idx] = shade(&fragment);
                written += 1;
            }
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn sp(x: f64, y: f64, depth: f64) -> ScreenPoint {
        ScreenPoint { x, y, depth }
    }

    fn flat(color: Rgb) -> impl FnMut(&Fragment) -> Rgb {
        move |_| color
    }

    #[test]
    fn test_barycentric_partition() {
        let (a, b, c) = ((1.0, 1.0), (9.0, 2.0), (3.0, 8.0));
        for p in [(4.0, 3.0), (3.0, 2.0), (4.3, 5.1)] {
            let w = barycentric(a, b, c, p).unwrap();
            assert_relative_eq!(w[0] + w[1] + w[2], 1.0, epsilon = 1e-12);
            assert!(w.iter().all(|w| *w >= 0.0));
        }
        let vertex = barycentric(a, b, c, b).unwrap();
        assert_relative_eq!(vertex[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_degenerate_triangle_draws_nothing() {
        let mut fb = FrameBuffer::new(16, 16, Rgb::BLACK);
        let tri = [sp(1.0, 1.0, 1.0), sp(8.0, 8.0, 1.0), sp(15.0, 15.0, 1.0)];
        let written = fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        assert_eq!(written, 0);
        assert!(fb.pixels().iter().all(|c| *c == Rgb::BLACK));
    }

    #[test]
    fn test_nearer_triangle_wins_regardless_of_order() {
        let tri = |d| [sp(0.0, 0.0, d), sp(16.0, 0.0, d), sp(0.0, 16.0, d)];
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);

        let mut fb = FrameBuffer::new(16, 16, Rgb::BLACK);
        fb.rasterize_triangle(&tri(5.0), DepthInterpolation::Perspective, true, flat(red));
        fb.rasterize_triangle(&tri(2.0), DepthInterpolation::Perspective, true, flat(blue));
        assert_eq!(fb.color_at(2, 2), blue);

        fb.clear();
        fb.rasterize_triangle(&tri(2.0), DepthInterpolation::Perspective, true, flat(blue));
        let written = fb.rasterize_triangle(&tri(5.0), DepthInterpolation::Perspective, true, flat(red));
        assert_eq!(written, 0);
        assert_eq!(fb.color_at(2, 2), blue);
        assert_relative_eq!(fb.depth_at(2, 2), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_equal_depth_first_drawn_wins() {
        let tri = [sp(0.0, 0.0, 3.0), sp(16.0, 0.0, 3.0), sp(0.0, 16.0, 3.0)];
        let mut fb = FrameBuffer::new(16, 16, Rgb::BLACK);
        fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::new(1, 2, 3)));
        fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        assert_eq!(fb.color_at(1, 1), Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_painter_mode_overwrites() {
        let tri = |d| [sp(0.0, 0.0, d), sp(16.0, 0.0, d), sp(0.0, 16.0, d)];
        let mut fb = FrameBuffer::new(16, 16, Rgb::BLACK);
        fb.rasterize_triangle(&tri(1.0), DepthInterpolation::Linear, false, flat(Rgb::WHITE));
        fb.rasterize_triangle(&tri(9.0), DepthInterpolation::Linear, false, flat(Rgb::new(9, 9, 9)));
        assert_eq!(fb.color_at(1, 1), Rgb::new(9, 9, 9));
    }

    #[test]
    fn test_clear_resets_buffers() {
        let tri = [sp(0.0, 0.0, 1.0), sp(8.0, 0.0, 1.0), sp(0.0, 8.0, 1.0)];
        let mut fb = FrameBuffer::new(8, 8, Rgb::new(10, 20, 30));
        fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        fb.clear();
        assert!(fb.pixels().iter().all(|c| *c == Rgb::new(10, 20, 30)));
        assert_eq!(fb.depth_at(1, 1), f64::INFINITY);
    }

    #[test]
    fn test_triangle_clipped_to_buffer() {
        let tri = [sp(-50.0, -50.0, 1.0), sp(100.0, 4.0, 1.0), sp(4.0, 100.0, 1.0)];
        let mut fb = FrameBuffer::new(10, 10, Rgb::BLACK);
        let written = fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        assert_eq!(written, 100);

        let offscreen = [sp(-50.0, -50.0, 1.0), sp(-10.0, -50.0, 1.0), sp(-30.0, -20.0, 1.0)];
        assert_eq!(
            fb.rasterize_triangle(&offscreen, DepthInterpolation::Linear, true, flat(Rgb::WHITE)),
            0
        );
    }

    #[test]
    fn test_shared_edge_leaves_no_gaps() {
        let a = sp(0.0, 0.0, 1.0);
        let b = sp(20.0, 0.0, 1.0);
        let c = sp(20.0, 20.0, 1.0);
        let d = sp(0.0, 20.0, 1.0);
        let mut fb = FrameBuffer::new(20, 20, Rgb::BLACK);
        fb.rasterize_triangle(&[a, b, c], DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        fb.rasterize_triangle(&[a, c, d], DepthInterpolation::Linear, true, flat(Rgb::WHITE));
        assert!(fb.pixels().iter().all(|c| *c == Rgb::WHITE));
    }

    #[test]
    fn test_perspective_depth_interpolation() {
        let (w, depth) = perspective_weights([0.5, 0.5, 0.0], [1.0, 3.0, 7.0]).unwrap();
        // 1 / (0.5 / 1 + 0.5 / 3)
        assert_relative_eq!(depth, 1.5, epsilon = 1e-12);
        assert_relative_eq!(w[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.0, epsilon = 1e-12);
        assert!(perspective_weights([0.3, 0.3, 0.4], [1.0, 0.0, -2.0]).is_none());
    }

    #[test]
    fn test_perspective_uv_differs_from_linear() {
        let uv = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        let centroid = [1.0 / 3.0; 3];

        let linear = interpolate(centroid, &uv);
        let (w, _) = perspective_weights(centroid, [1.0, 2.0, 4.0]).unwrap();
        let correct = interpolate(w, &uv);
        assert!((correct - linear).norm() > 0.05);
        assert_relative_eq!(correct.x, 2.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(correct.y, 1.0 / 7.0, epsilon = 1e-12);

        let mut previous = f64::INFINITY;
        for spread in [1.0, 0.1, 0.01, 0.0] {
            let depths = [2.0, 2.0 + spread, 2.0 + 2.0 * spread];
            let (w, _) = perspective_weights(centroid, depths).unwrap();
            let gap = (interpolate(w, &uv) - linear).norm();
            assert!(gap <= previous);
            previous = gap;
        }
        assert_relative_eq!(previous, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fragment_reports_perspective_weights() {
        let tri = [sp(0.0, 0.0, 1.0), sp(30.0, 0.0, 2.0), sp(0.0, 30.0, 4.0)];
        let mut fb = FrameBuffer::new(30, 30, Rgb::BLACK);
        let mut seen = Vec::new();
        fb.rasterize_triangle(&tri, DepthInterpolation::Perspective, true, |f| {
            seen.push(*f);
            Rgb::WHITE
        });
        assert!(!seen.is_empty());
        for f in &seen {
            let sum: f64 = f.perspective_weights.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
            assert!(f.depth >= 1.0 - 1e-3);
            assert_eq!(fb.depth_at(f.x, f.y), f.depth);
        }
        let linear = seen.iter().find(|f| f.weights != f.perspective_weights);
        assert!(linear.is_some());
    }

    #[test]
    fn test_empty_buffer_is_safe() {
        let mut fb = FrameBuffer::new(0, 0, Rgb::BLACK);
        let tri = [sp(0.0, 0.0, 1.0), sp(8.0, 0.0, 1.0), sp(0.0, 8.0, 1.0)];
        assert_eq!(fb.rasterize_triangle(&tri, DepthInterpolation::Linear, true, flat(Rgb::WHITE)), 0);
    }
}
