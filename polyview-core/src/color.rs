/// 8-bit RGB color and conversions to the floating accumulator used by shading
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// RGB color (0-255 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as floats in 0..=255.
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.r as f64, self.g as f64, self.b as f64)
    }

    /// Clamp each channel to 0..=255 and round to the nearest integer.
    /// NaN channels become 0.
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        fn channel(c: f64) -> u8 {
            if c.is_nan() {
                return 0;
            }
            c.clamp(0.0, 255.0).round() as u8
        }
        Self {
            r: channel(v.x),
            g: channel(v.y),
            b: channel(v.z),
        }
    }

    /// Mean of the three channels, 0.0..=1.0.
    pub fn intensity(self) -> f64 {
        (self.r as f64 + self.g as f64 + self.b as f64) / (3.0 * 255.0)
    }

    /// Perceptual luminance, 0.0..=1.0.
    pub fn luminance(self) -> f64 {
        (0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64) / 255.0
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}
