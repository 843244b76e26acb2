//! RGB color used for clear colors.

use serde::{Deserialize, Serialize};

/// RGB color with values in 0.0-1.0 range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red component (0.0 to 1.0).
    pub r: f32,
    /// Green component (0.0 to 1.0).
    pub g: f32,
    /// Blue component (0.0 to 1.0).
    pub b: f32,
}

impl Color {
    /// Black (0, 0, 0).
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };
    /// White (1, 1, 1).
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };
    /// Gray (0.5, 0.5, 0.5).
    pub const GRAY: Self = Self { r: 0.5, g: 0.5, b: 0.5 };

    /// Create a new color from RGB values (0.0-1.0).
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Convert to a wgpu clear color with the given alpha.
    #[inline]
    pub fn to_wgpu(&self, alpha: f32) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: alpha as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wgpu_keeps_alpha() {
        let c = Color::new(0.25, 0.5, 1.0).to_wgpu(0.5);
        assert_eq!(c.a, 0.5);
        assert_eq!(c.g, 0.5);
    }
}
