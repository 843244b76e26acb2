//! Render targets, data textures and sampling configuration.

mod data_texture;
mod render_target;
mod sampler;

pub use data_texture::DataTexture;
pub use render_target::{
    clamp_dimension, PixelFormat, RenderTarget, RenderTargetDescriptor, TextureDataType,
};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};

use crate::core::Id;
use std::rc::Rc;

/// A texture a shader can sample.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// The color attachment of a render target.
    RenderTarget(Id),
    /// A host-memory float texture.
    Data(Rc<DataTexture>),
}

impl TextureSource {
    /// Id of the referenced texture.
    pub fn id(&self) -> Id {
        match self {
            TextureSource::RenderTarget(id) => *id,
            TextureSource::Data(texture) => texture.id(),
        }
    }
}
