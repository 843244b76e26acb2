//! # Math Module
//!
//! Small math helpers for the post-processing pipeline. Vector types come
//! from `glam`.

mod color;

pub use color::Color;

/// Common math constants.
pub mod consts {
    /// Pi constant.
    pub const PI: f32 = std::f32::consts::PI;
}

/// Normalized 1D Gaussian weight (without the normalization constant).
#[inline]
pub fn gauss(x: f32, sigma: f32) -> f32 {
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauss_peak() {
        assert_eq!(gauss(0.0, 4.0), 1.0);
        assert!(gauss(4.0, 4.0) < gauss(1.0, 4.0));
    }
}
