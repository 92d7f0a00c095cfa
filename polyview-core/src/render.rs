/// Frame rendering: world-space faces through the camera into a frame buffer
use std::ops::AddAssign;

use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, trace};

use crate::camera::{Camera, ProjectionMode, ScreenPoint};
use crate::color::Rgb;
use crate::geometry::{Face, Polyhedron};
use crate::raster::{DepthInterpolation, Fragment, FrameBuffer};
use crate::shading::{apply_gouraud, attach_vertex_normals, phong, PointLight, ShadingMode};
use crate::texture::Texture;

/// Per-pass switches, mirrored by the viewer's toggles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub use_lighting: bool,
    pub shading_mode: ShadingMode,
    /// Off: painter's order, far to near, with no depth test.
    pub use_z_buffer: bool,
    pub cull_back_faces: bool,
    /// Sample the renderer's texture on faces that carry UVs.
    pub use_texture: bool,
    pub background: Rgb,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            use_lighting: true,
            shading_mode: ShadingMode::Gouraud,
            use_z_buffer: true,
            cull_back_faces: true,
            use_texture: false,
            background: Rgb::BLACK,
        }
    }
}

/// Counters for one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub faces_drawn: usize,
    pub faces_culled: usize,
    /// Triangles with a vertex behind the eye or the near plane.
    pub triangles_skipped: usize,
    pub pixels_written: usize,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, other: Self) {
        self.faces_drawn += other.faces_drawn;
        self.faces_culled += other.faces_culled;
        self.triangles_skipped += other.triangles_skipped;
        self.pixels_written += other.pixels_written;
    }
}

/// Explicit render context: owns the frame buffer, light, settings and
/// optional texture. One `render` call is one frame.
#[derive(Debug, Clone)]
pub struct Renderer {
    buffer: FrameBuffer,
    pub settings: RenderSettings,
    pub light: PointLight,
    texture: Option<Texture>,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_settings(width, height, RenderSettings::default())
    }

    pub fn with_settings(width: usize, height: usize, settings: RenderSettings) -> Self {
        Self {
            buffer: FrameBuffer::new(width, height, settings.background),
            settings,
            light: PointLight::default(),
            texture: None,
        }
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn width(&self) -> usize {
        self.buffer.width()
    }

    pub fn height(&self) -> usize {
        self.buffer.height()
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.buffer.resize(width, height);
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Texture>) {
        self.texture = texture;
    }

    /// Reset depth to +inf and color to the configured background.
    pub fn clear(&mut self) {
        self.buffer.set_background(self.settings.background);
        self.buffer.clear();
    }

    /// Clear, then draw every polyhedron as seen by `camera`.
    pub fn render(&mut self, scene: &[&Polyhedron], camera: &Camera) -> FrameStats {
        let span = info_span!("render", objects = scene.len());
        let _guard = span.enter();

        self.clear();
        let mut faces: Vec<Face> = scene.iter().flat_map(|p| self.shaded_faces(p)).collect();

        if !self.settings.use_z_buffer {
            let eye = camera.position();
            faces.sort_by(|a, b| {
                let da = (a.center() - eye).norm();
                let db = (b.center() - eye).norm();
                db.total_cmp(&da)
            });
        }

        let mut stats = FrameStats::default();
        for face in &faces {
            stats += self.draw_face(face, camera);
        }
        debug!(
            faces = faces.len(),
            drawn = stats.faces_drawn,
            culled = stats.faces_culled,
            skipped = stats.triangles_skipped,
            pixels = stats.pixels_written,
            "frame rendered"
        );
        stats
    }

    fn texturing(&self) -> bool {
        self.settings.use_texture && self.texture.is_some()
    }

    /// World-space faces of `poly` with the lighting stage applied.
    fn shaded_faces(&self, poly: &Polyhedron) -> Vec<Face> {
        let faces = poly.transformed_faces();
        if !self.settings.use_lighting {
            return faces;
        }
        match self.settings.shading_mode {
            ShadingMode::Gouraud => {
                let textured = self.texturing();
                apply_gouraud(&faces, &self.light, |f| {
                    if textured && has_uvs(f) {
                        Rgb::WHITE
                    } else {
                        f.color
                    }
                })
            }
            ShadingMode::Phong => attach_vertex_normals(&faces),
        }
    }

    fn is_culled(&self, face: &Face, camera: &Camera) -> bool {
        if !self.settings.cull_back_faces {
            return false;
        }
        match camera.mode() {
            ProjectionMode::Perspective => !face.is_visible(&camera.position()),
            ProjectionMode::Orthographic => !face.is_facing(&camera.forward()),
        }
    }

    fn draw_face(&mut self, face: &Face, camera: &Camera) -> FrameStats {
        let mut stats = FrameStats::default();
        if face.points.len() < 3 {
            trace!(points = face.points.len(), "degenerate face skipped");
            return stats;
        }
        if self.is_culled(face, camera) {
            stats.faces_culled += 1;
            return stats;
        }

        let (width, height) = (self.buffer.width() as u32, self.buffer.height() as u32);
        let (near, _) = camera.clip_planes();
        let interpolation = match camera.mode() {
            ProjectionMode::Perspective => DepthInterpolation::Perspective,
            ProjectionMode::Orthographic => DepthInterpolation::Linear,
        };
        let projected: Vec<Option<ScreenPoint>> = face
            .points
            .iter()
            .map(|p| {
                camera.project_to_screen(p, width, height).filter(|s| {
                    interpolation == DepthInterpolation::Linear || s.depth >= near
                })
            })
            .collect();

        let kind = if !self.settings.use_lighting {
            ShadeKind::Unlit
        } else {
            match self.settings.shading_mode {
                ShadingMode::Gouraud => ShadeKind::Gouraud,
                ShadingMode::Phong => ShadeKind::Phong,
            }
        };
        let texture = if self.settings.use_texture && has_uvs(face) {
            self.texture.as_ref()
        } else {
            None
        };
        let depth_test = self.settings.use_z_buffer;
        let eye = camera.position();

        for [a, b, c] in face.triangles() {
            let (Some(sa), Some(sb), Some(sc)) = (projected[a], projected[b], projected[c]) else {
                trace!("triangle behind the eye skipped");
                stats.triangles_skipped += 1;
                continue;
            };
            let shader = TriangleShader::new(face, [a, b, c], kind, &self.light, eye, texture);
            stats.pixels_written += self.buffer.rasterize_triangle(
                &[sa, sb, sc],
                interpolation,
                depth_test,
                |fragment| shader.shade(fragment),
            );
        }
        stats.faces_drawn += 1;
        stats
    }
}

fn has_uvs(face: &Face) -> bool {
    face.tex_coords
        .as_ref()
        .is_some_and(|uv| uv.len() == face.points.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShadeKind {
    Unlit,
    Gouraud,
    Phong,
}

/// Per-triangle attributes gathered once, sampled per fragment
struct TriangleShader<'a> {
    kind: ShadeKind,
    base: Rgb,
    light: &'a PointLight,
    eye: Point3<f64>,
    texture: Option<&'a Texture>,
    uvs: [Vector2<f64>; 3],
    colors: [Vector3<f64>; 3],
    normals: [Vector3<f64>; 3],
    positions: [Vector3<f64>; 3],
}

impl<'a> TriangleShader<'a> {
    fn new(
        face: &Face,
        idx: [usize; 3],
        kind: ShadeKind,
        light: &'a PointLight,
        eye: Point3<f64>,
        texture: Option<&'a Texture>,
    ) -> Self {
        let normal = face.normal();
        let base = face.color;
        let uvs = idx.map(|i| {
            face.tex_coords
                .as_ref()
                .and_then(|uv| uv.get(i))
                .copied()
                .unwrap_or_else(Vector2::zeros)
        });
        let colors = idx.map(|i| {
            face.vertex_colors
                .as_ref()
                .and_then(|c| c.get(i))
                .copied()
                .unwrap_or(base)
                .to_vector()
        });
        let normals = idx.map(|i| {
            face.vertex_normals
                .as_ref()
                .and_then(|n| n.get(i))
                .copied()
                .unwrap_or(normal)
        });
        let positions = idx.map(|i| face.points[i].coords);
        Self {
            kind,
            base,
            light,
            eye,
            texture,
            uvs,
            colors,
            normals,
            positions,
        }
    }

    fn shade(&self, fragment: &Fragment) -> Rgb {
        let texel = self.texture.map(|t| {
            let uv = fragment.lerp_perspective(&self.uvs);
            t.sample(uv.x, uv.y)
        });
        let base = texel.unwrap_or(self.base);
        match self.kind {
            ShadeKind::Unlit => base,
            ShadeKind::Gouraud => {
                // Colors interpolate in screen space; only depth is corrected.
                let lit = fragment.lerp(&self.colors);
                match texel {
                    Some(t) => Rgb::from_vector(&(t.to_vector().component_mul(&lit) / 255.0)),
                    None => Rgb::from_vector(&lit),
                }
            }
            ShadeKind::Phong => {
                let normal = fragment.lerp_perspective(&self.normals);
                let position = Point3::from(fragment.lerp_perspective(&self.positions));
                phong(self.light, &position, &normal, &self.eye, base)
            }
        }
    }
}
