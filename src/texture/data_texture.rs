//! CPU-side float textures uploaded by the backend on first use.

use super::{FilterMode, SamplerDescriptor};
use crate::core::Id;

/// A float RGBA texture whose texels live in host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTexture {
    id: Id,
    width: u32,
    height: u32,
    /// RGBA texels, row-major.
    data: Vec<f32>,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Flip rows on upload.
    pub flip_y: bool,
}

impl DataTexture {
    /// Create from RGB float texels. An opaque alpha channel is added.
    ///
    /// Missing texels are filled with black and extra ones are dropped.
    pub fn from_rgb(width: u32, height: u32, rgb: &[f32]) -> Self {
        let texels = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(texels * 4);
        for i in 0..texels {
            let px = rgb.get(i * 3..i * 3 + 3).unwrap_or(&[0.0, 0.0, 0.0]);
            data.extend_from_slice(&[px[0], px[1], px[2], 1.0]);
        }

        Self {
            id: Id::new(),
            width,
            height,
            data,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            flip_y: false,
        }
    }

    /// Set both filters.
    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.min_filter = filter;
        self.mag_filter = filter;
        self
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Width in texels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA texels.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Texel at `(x, y)` as RGBA.
    pub fn texel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Texels converted to `Rgba16Float` bytes for upload, honoring `flip_y`.
    pub fn to_rgba16f_bytes(&self) -> Vec<u8> {
        let row = (self.width * 4) as usize;
        let mut halves: Vec<half::f16> = Vec::with_capacity(self.data.len());
        for y in 0..self.height as usize {
            let src = if self.flip_y { self.height as usize - 1 - y } else { y };
            halves.extend(self.data[src * row..(src + 1) * row].iter().map(|&v| half::f16::from_f32(v)));
        }
        bytemuck::cast_slice(&halves).to_vec()
    }

    /// Sampler used when the texture is read.
    pub fn sampler(&self) -> SamplerDescriptor {
        SamplerDescriptor {
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_adds_alpha() {
        let tex = DataTexture::from_rgb(2, 1, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(tex.data().len(), 8);
        assert_eq!(tex.texel(1, 0), Some([0.4, 0.5, 0.6, 1.0]));
        assert_eq!(tex.texel(2, 0), None);
    }

    #[test]
    fn test_short_input_is_black() {
        let tex = DataTexture::from_rgb(2, 2, &[1.0, 1.0, 1.0]);
        assert_eq!(tex.texel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(tex.texel(1, 1), Some([0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_half_float_upload_flips_rows() {
        let mut tex = DataTexture::from_rgb(1, 2, &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        tex.flip_y = true;
        let bytes = tex.to_rgba16f_bytes();
        assert_eq!(bytes.len(), 2 * 4 * 2);
        let halves: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect();
        assert_eq!(halves[0], 0.0);
        assert_eq!(halves[4], 1.0);
    }
}
