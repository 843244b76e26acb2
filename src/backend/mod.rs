//! # wgpu Backend
//!
//! [`WgpuRenderer`] implements [`Renderer`](crate::core::Renderer) on top of
//! wgpu. Render targets become textures with optional depth/stencil
//! attachments, [`ShaderMaterial`](crate::material::ShaderMaterial)s become
//! cached render pipelines and host scenes are drawn through a
//! [`SceneEncoder`].

mod mipmap;
mod pipeline;
mod quad;
mod wgpu_renderer;

pub use mipmap::MipmapGenerator;
pub use pipeline::{
    layout_entries, override_constants, validate_wgsl, CachedPipeline, PipelineCache, PipelineKey,
};
pub use quad::{FullscreenQuad, FullscreenVertex, FULLSCREEN_QUAD_VERTICES};
pub use wgpu_renderer::{SceneEncoder, SceneTarget, WgpuRenderer};
