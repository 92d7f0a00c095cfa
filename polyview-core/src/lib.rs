/// Polyview Core Library - software rendering pipeline for polyhedral scenes
///
/// Geometry flows from a `Polyhedron` in object space, through its
/// accumulated transform, into world-space faces; the `Camera` projects them
/// to the screen and the `Renderer` resolves visibility with a Z-buffer and
/// lights each pixel with Gouraud or Phong shading. Nothing here touches a
/// GPU or a window: the result is an RGB grid in a `FrameBuffer`.
pub mod camera;
pub mod color;
pub mod config;
pub mod geometry;
pub mod math;
pub mod obj;
pub mod raster;
pub mod render;
pub mod shading;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, ProjectionMode, ScreenPoint};
pub use color::Rgb;
pub use config::{ConfigError, SceneConfig};
pub use geometry::{Face, Polyhedron};
pub use math::SafeNormalize;
pub use obj::{load_obj, parse_obj, save_obj, write_obj, ObjError, ObjOptions};
pub use raster::{DepthInterpolation, FrameBuffer};
pub use render::{FrameStats, RenderSettings, Renderer};
pub use shading::{PointLight, ShadingMode, VertexNormals};
pub use texture::{Texture, TextureError};
pub use transform::{Axis, ParseAxisError, Transform};
