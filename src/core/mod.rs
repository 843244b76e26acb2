//! # Core Module
//!
//! The renderer interface the composer drives, its headless recording
//! implementation, wgpu context management, ids and error types.

mod context;
mod error;
mod headless;
mod id;
mod renderer;

pub use context::{Context, ContextError, Surface};
pub use error::{ComposerError, ConfigError, PassError, RenderError};
pub use headless::{Destination, HeadlessRenderer, RecordedOverride, RenderCommand};
pub use id::Id;
pub use renderer::{
    GpuState, OverrideMaterial, RenderDestination, RenderInfo, Renderer, StencilFunc, StencilOp,
    StencilState,
};
