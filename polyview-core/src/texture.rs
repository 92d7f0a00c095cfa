/// RGB textures sampled by wrapped UV coordinates
use thiserror::Error;

use crate::color::Rgb;

/// Edge length of one checkerboard tile in pixels.
pub const CHECKER_TILE: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture has zero size")]
    Empty,
    #[error("expected {expected} pixels for {width}x{height}, got {actual}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// Row-major pixel grid, row 0 at the top
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Texture {
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Rgb>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        let expected = width * height;
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Packed `RGBRGB...` bytes, as produced by most image decoders.
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, TextureError> {
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    /// White and mid-grey tiles of `CHECKER_TILE` pixels.
    pub fn checkerboard(width: usize, height: usize) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let grey = Rgb::new(128, 128, 128);
        let pixels = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    if (x / CHECKER_TILE + y / CHECKER_TILE) % 2 == 0 {
                        Rgb::WHITE
                    } else {
                        grey
                    }
                })
            })
            .collect();
        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Nearest texel at `(u, v)`; coordinates wrap, so the texture tiles.
    pub fn sample(&self, u: f64, v: f64) -> Rgb {
        if !(u.is_finite() && v.is_finite()) {
            return Rgb::WHITE;
        }
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);
        let x = ((u * (self.width - 1) as f64) as usize).min(self.width - 1);
        let y = ((v * (self.height - 1) as f64) as usize).min(self.height - 1);
        self.pixels[y * self.width + x]
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self::checkerboard(256, 256)
    }
}
