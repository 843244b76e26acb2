//! # Ren PostFX - Post-processing composer for wgpu
//!
//! Runs an ordered chain of screen-space passes over two ping-pong render
//! targets, with stencil masking, a library of named shaders and a wgpu
//! backend. A headless recording renderer drives the same passes without a
//! GPU.
//!
//! ## Features
//!
//! - **Composer**: ping-pong buffering, enable/disable, mask compensation
//! - **Effects**: bloom, film grain, digital glitch, bokeh depth of field,
//!   adaptive tone mapping, dot screen, masks, save/texture/copy passes
//! - **Shaders**: WGSL sources with defines as pipeline-overridable constants
//! - **Backends**: [`WgpuRenderer`](backend::WgpuRenderer) and
//!   [`HeadlessRenderer`](core::HeadlessRenderer)
//!
//! ## Example
//!
//! ```ignore
//! use ren_postfx::prelude::*;
//! use std::rc::Rc;
//!
//! let library = ShaderLibrary::builtin();
//! let mut composer = EffectComposer::new(renderer, &library)?;
//! composer.add_pass(RenderPass::new(Rc::new(scene), Rc::new(camera)));
//! let bloom = BloomPass::new(composer.renderer_mut(), &library)?;
//! composer.add_pass(bloom);
//! let mut film = FilmPass::new(&library)?;
//! film.state_mut().render_to_screen = true;
//! composer.add_pass(film);
//!
//! composer.render(delta_time)?;
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod core;
pub mod material;
pub mod math;
pub mod postprocessing;
pub mod shaders;
pub mod texture;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::core::*;
    pub use crate::material::*;
    pub use crate::math::*;
    pub use crate::postprocessing::*;
    pub use crate::shaders::ShaderLibrary;
    pub use crate::texture::*;
}

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
