//! Render target descriptors and handles.

use super::{FilterMode, SamplerDescriptor, TextureSource};
use crate::core::Id;
use serde::{Deserialize, Serialize};

/// Channel layout of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Color without alpha. Stored with an opaque alpha channel.
    Rgb,
    /// Color with alpha.
    #[default]
    Rgba,
}

/// Component type of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureDataType {
    /// 8-bit normalized.
    #[default]
    UnsignedByte,
    /// 16-bit float.
    HalfFloat,
    /// 32-bit float.
    Float,
}

/// Describes a render target to be created by a [`Renderer`](crate::core::Renderer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTargetDescriptor {
    /// Width in pixels (at least 1).
    pub width: u32,
    /// Height in pixels (at least 1).
    pub height: u32,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Channel layout.
    pub format: PixelFormat,
    /// Component type.
    pub data_type: TextureDataType,
    /// Allocate a depth buffer.
    pub depth_buffer: bool,
    /// Allocate a stencil buffer.
    pub stencil_buffer: bool,
    /// Regenerate the mip chain after every draw when the minification
    /// filter samples mipmaps.
    pub generate_mipmaps: bool,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            format: PixelFormat::Rgba,
            data_type: TextureDataType::UnsignedByte,
            depth_buffer: true,
            stencil_buffer: false,
            generate_mipmaps: true,
        }
    }
}

impl RenderTargetDescriptor {
    /// Create a linear-filtered RGBA descriptor of the given size.
    ///
    /// Zero dimensions are clamped to 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self::default().with_size(width, height)
    }

    /// Copy this descriptor with new dimensions, clamped to at least 1.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = clamp_dimension(width, "width");
        self.height = clamp_dimension(height, "height");
        self
    }

    /// Set the minification and magnification filters.
    pub fn with_filters(mut self, min_filter: FilterMode, mag_filter: FilterMode) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }

    /// Set the channel layout.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the component type.
    pub fn with_data_type(mut self, data_type: TextureDataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Enable or disable the stencil buffer.
    pub fn with_stencil(mut self, stencil_buffer: bool) -> Self {
        self.stencil_buffer = stencil_buffer;
        self
    }

    /// Enable or disable the depth buffer.
    pub fn with_depth(mut self, depth_buffer: bool) -> Self {
        self.depth_buffer = depth_buffer;
        self
    }

    /// Enable or disable automatic mip generation.
    pub fn with_mipmaps(mut self, generate_mipmaps: bool) -> Self {
        self.generate_mipmaps = generate_mipmaps;
        self
    }

    /// Number of mip levels the target allocates.
    pub fn mip_level_count(&self) -> u32 {
        if self.generate_mipmaps && self.min_filter.uses_mipmaps() {
            32 - self.width.max(self.height).max(1).leading_zeros()
        } else {
            1
        }
    }

    /// Color texture format of the target.
    ///
    /// 32-bit float targets are stored as 16-bit floats so they stay
    /// filterable on every adapter.
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        match self.data_type {
            TextureDataType::UnsignedByte => wgpu::TextureFormat::Rgba8Unorm,
            TextureDataType::HalfFloat | TextureDataType::Float => wgpu::TextureFormat::Rgba16Float,
        }
    }

    /// Depth/stencil attachment format, if any.
    pub fn depth_stencil_format(&self) -> Option<wgpu::TextureFormat> {
        match (self.depth_buffer, self.stencil_buffer) {
            (_, true) => Some(wgpu::TextureFormat::Depth24PlusStencil8),
            (true, false) => Some(wgpu::TextureFormat::Depth32Float),
            (false, false) => None,
        }
    }

    /// Sampler used when the target is read as a texture.
    pub fn sampler(&self) -> SamplerDescriptor {
        SamplerDescriptor {
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            ..Default::default()
        }
    }
}

/// Clamp a texture dimension to at least 1.
///
/// A zero-area target would make the backend fail, so invalid sizes are
/// corrected here instead of being reported.
pub fn clamp_dimension(value: u32, axis: &str) -> u32 {
    if value == 0 {
        log::warn!("texture {axis} of 0 clamped to 1");
        1
    } else {
        value
    }
}

/// A handle to a backend-owned render target.
///
/// Handles are created by [`Renderer::create_render_target`](crate::core::Renderer::create_render_target)
/// and must be returned through
/// [`Renderer::dispose_render_target`](crate::core::Renderer::dispose_render_target)
/// by whoever owns them. The handle is not `Clone`: cloning a
/// target means creating a second one from [`RenderTarget::descriptor`].
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    id: Id,
    descriptor: RenderTargetDescriptor,
}

impl RenderTarget {
    /// Mint a handle. Backends call this after allocating the surface.
    pub fn new(descriptor: RenderTargetDescriptor) -> Self {
        Self {
            id: Id::new(),
            descriptor,
        }
    }

    /// Unique id of the target.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Descriptor the target was created from.
    #[inline]
    pub fn descriptor(&self) -> &RenderTargetDescriptor {
        &self.descriptor
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Component type.
    #[inline]
    pub fn data_type(&self) -> TextureDataType {
        self.descriptor.data_type
    }

    /// Reference to this target's color texture, for use as a uniform.
    #[inline]
    pub fn texture(&self) -> TextureSource {
        TextureSource::RenderTarget(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_clamped() {
        let desc = RenderTargetDescriptor::new(0, 0);
        assert_eq!((desc.width, desc.height), (1, 1));
    }

    #[test]
    fn test_mip_level_count() {
        let plain = RenderTargetDescriptor::new(256, 256);
        assert_eq!(plain.mip_level_count(), 1);

        let mipped = plain.with_filters(FilterMode::LinearMipmapLinear, FilterMode::Linear);
        assert_eq!(mipped.mip_level_count(), 9);
        assert_eq!(mipped.with_mipmaps(false).mip_level_count(), 1);
        assert_eq!(mipped.with_size(300, 17).mip_level_count(), 9);
    }

    #[test]
    fn test_depth_stencil_format() {
        let desc = RenderTargetDescriptor::new(4, 4);
        assert_eq!(desc.depth_stencil_format(), Some(wgpu::TextureFormat::Depth32Float));
        assert_eq!(
            desc.with_stencil(true).depth_stencil_format(),
            Some(wgpu::TextureFormat::Depth24PlusStencil8)
        );
        assert_eq!(desc.with_depth(false).depth_stencil_format(), None);
    }

    #[test]
    fn test_handles_are_unique() {
        let desc = RenderTargetDescriptor::new(8, 8);
        let a = RenderTarget::new(desc);
        let b = RenderTarget::new(desc);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.descriptor(), b.descriptor());
        assert_eq!(a.texture(), TextureSource::RenderTarget(a.id()));
    }

    #[test]
    fn test_descriptor_from_toml() {
        let desc: RenderTargetDescriptor =
            toml::from_str("width = 640\nheight = 480\nstencil_buffer = true\nmin_filter = \"nearest\"").unwrap();
        assert_eq!(desc.width, 640);
        assert!(desc.stencil_buffer);
        assert_eq!(desc.min_filter, FilterMode::Nearest);
        assert_eq!(desc.mag_filter, FilterMode::Linear);
    }
}
