//! Texture filtering and addressing configuration.

use serde::{Deserialize, Serialize};

/// Texture addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// Clamp to edge pixel.
    #[default]
    ClampToEdge,
    /// Repeat the texture.
    Repeat,
    /// Mirror and repeat.
    MirrorRepeat,
}

impl From<AddressMode> for wgpu::AddressMode {
    fn from(mode: AddressMode) -> Self {
        match mode {
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Texture filtering mode.
///
/// The mipmap variants are only meaningful as a minification filter; they
/// make a render target allocate a full mip chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Nearest neighbor (pixelated).
    Nearest,
    /// Linear interpolation (smooth).
    #[default]
    Linear,
    /// Nearest texel of the nearest mip level.
    NearestMipmapNearest,
    /// Linear within a level, linear between levels.
    LinearMipmapLinear,
}

impl FilterMode {
    /// Whether sampling with this filter reads from a mip chain.
    #[inline]
    pub fn uses_mipmaps(&self) -> bool {
        matches!(self, FilterMode::NearestMipmapNearest | FilterMode::LinearMipmapLinear)
    }

    /// Texel filter applied within a single mip level.
    #[inline]
    pub fn texel_filter(&self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest | FilterMode::NearestMipmapNearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear | FilterMode::LinearMipmapLinear => wgpu::FilterMode::Linear,
        }
    }

    /// Filter applied between mip levels.
    #[inline]
    pub fn mipmap_filter(&self) -> wgpu::FilterMode {
        match self {
            FilterMode::LinearMipmapLinear => wgpu::FilterMode::Linear,
            _ => wgpu::FilterMode::Nearest,
        }
    }
}

/// Sampler configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDescriptor {
    /// Address mode for U coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for V coordinate.
    pub address_mode_v: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
        }
    }
}

impl SamplerDescriptor {
    /// Create a nearest-neighbor (pixelated) sampler.
    pub fn nearest() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        }
    }

    /// Build the equivalent wgpu sampler descriptor.
    pub fn to_wgpu(&self) -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: Some("Post-Process Sampler"),
            address_mode_u: self.address_mode_u.into(),
            address_mode_v: self.address_mode_v.into(),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: self.mag_filter.texel_filter(),
            min_filter: self.min_filter.texel_filter(),
            mipmap_filter: self.min_filter.mipmap_filter(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mipmap_filters() {
        assert!(FilterMode::LinearMipmapLinear.uses_mipmaps());
        assert!(!FilterMode::Linear.uses_mipmaps());
        assert_eq!(FilterMode::LinearMipmapLinear.texel_filter(), wgpu::FilterMode::Linear);
        assert_eq!(FilterMode::NearestMipmapNearest.mipmap_filter(), wgpu::FilterMode::Nearest);
    }

    #[test]
    fn test_nearest_descriptor() {
        let desc = SamplerDescriptor::nearest().to_wgpu();
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Nearest);
    }
}
