//! # Shader Library
//!
//! Registry of [`ShaderDefinition`]s that passes resolve at construction.
//! [`ShaderLibrary::builtin`] ships the WGSL sources of every built-in effect;
//! hosts may replace or remove entries before building passes.

mod bokeh;
mod convolution;
mod copy;
mod digital_glitch;
mod dot_screen;
mod film;
mod fullscreen;
mod luminosity;
mod tone_map;

pub use convolution::{build_kernel, BLUR_X, BLUR_Y, MAX_KERNEL_SIZE};
pub use fullscreen::FULLSCREEN_VERTEX_SHADER;

use crate::core::PassError;
use crate::material::ShaderDefinition;
use std::collections::HashMap;

/// Opacity-scaled texture copy.
pub const COPY_SHADER: &str = "copy";
/// One-dimensional Gaussian convolution.
pub const CONVOLUTION_SHADER: &str = "convolution";
/// Film grain and scanlines.
pub const FILM_SHADER: &str = "film";
/// Digital glitch distortion.
pub const DIGITAL_GLITCH_SHADER: &str = "digital_glitch";
/// Depth-of-field composite.
pub const BOKEH_SHADER: &str = "bokeh";
/// Per-pixel luminance.
pub const LUMINOSITY_SHADER: &str = "luminosity";
/// Temporal luminance adaptation.
pub const ADAPTIVE_LUMINANCE_SHADER: &str = "adaptive_luminance";
/// Luminance-based tone mapping.
pub const TONE_MAP_SHADER: &str = "tone_map";
/// Halftone dot screen.
pub const DOT_SCREEN_SHADER: &str = "dot_screen";

/// A named collection of shader definitions.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    definitions: HashMap<String, ShaderDefinition>,
}

impl ShaderLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library holding every built-in definition.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        library.register(copy::definition());
        library.register(convolution::definition(MAX_KERNEL_SIZE, 4.0));
        library.register(film::definition());
        library.register(digital_glitch::definition());
        library.register(bokeh::definition());
        library.register(luminosity::definition());
        library.register(tone_map::adaptive_luminance_definition());
        library.register(tone_map::tone_map_definition());
        library.register(dot_screen::definition());
        library
    }

    /// Register a definition under its name, returning the one it replaces.
    pub fn register(&mut self, definition: ShaderDefinition) -> Option<ShaderDefinition> {
        self.definitions
            .insert(definition.name.to_string(), definition)
    }

    /// Remove a definition.
    pub fn remove(&mut self, name: &str) -> Option<ShaderDefinition> {
        self.definitions.remove(name)
    }

    /// Look up a definition.
    pub fn get(&self, name: &str) -> Option<&ShaderDefinition> {
        self.definitions.get(name)
    }

    /// Whether a definition is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Look up a definition a pass depends on.
    pub fn require(&self, name: &str, pass: &'static str) -> Result<&ShaderDefinition, PassError> {
        self.get(name).ok_or_else(|| PassError::MissingDependency {
            pass,
            shader: name.to_string(),
        })
    }
}
