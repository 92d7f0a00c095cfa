/// Scene configuration loaded from JSON
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, ProjectionMode};
use crate::render::{RenderSettings, Renderer};
use crate::shading::PointLight;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid viewport {width}x{height}")]
    Viewport { width: usize, height: usize },
    #[error("camera position and target coincide")]
    CameraAtTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Point3<f64>,
    pub target: Point3<f64>,
    pub fov_degrees: f64,
    pub near: f64,
    pub far: f64,
    pub projection: ProjectionMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, -5.0),
            target: Point3::origin(),
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            projection: ProjectionMode::Perspective,
        }
    }
}

/// Everything needed to set up a renderer and camera
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub viewport: ViewportConfig,
    pub camera: CameraConfig,
    pub light: PointLight,
    pub render: RenderSettings,
}

impl SceneConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ViewportConfig { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Err(ConfigError::Viewport { width, height });
        }
        if self.camera.position == self.camera.target {
            return Err(ConfigError::CameraAtTarget);
        }
        Ok(())
    }

    pub fn camera(&self) -> Camera {
        let c = &self.camera;
        let mut camera = Camera::new(self.viewport.width as u32, self.viewport.height as u32);
        camera.set_position(c.position);
        camera.set_target(c.target);
        camera.set_fov(c.fov_degrees.to_radians());
        camera.set_clip_planes(c.near, c.far);
        camera.set_projection_mode(c.projection);
        camera
    }

    pub fn renderer(&self) -> Renderer {
        let mut renderer =
            Renderer::with_settings(self.viewport.width, self.viewport.height, self.render);
        renderer.light = self.light;
        renderer
    }
}
