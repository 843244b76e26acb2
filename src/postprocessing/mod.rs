//! Post-processing passes and the effect composer.
//!
//! An [`EffectComposer`] owns two ping-pong render targets and runs an
//! ordered chain of [`Pass`]es over them every frame.

mod config;
mod effect_composer;
pub mod effects;
mod pass;

pub use config::*;
pub use effect_composer::*;
pub use effects::*;
pub use pass::*;
