//! Film grain and scanlines.

use crate::core::{PassError, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, FILM_SHADER};
use crate::texture::RenderTarget;
use serde::{Deserialize, Serialize};

/// Film effect settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmSettings {
    /// Noise intensity.
    pub noise_intensity: f32,
    /// Scanline intensity.
    pub scanlines_intensity: f32,
    /// Number of scanlines.
    pub scanlines_count: f32,
    /// Convert to grayscale.
    pub grayscale: bool,
}

impl Default for FilmSettings {
    fn default() -> Self {
        Self {
            noise_intensity: 0.5,
            scanlines_intensity: 0.05,
            scanlines_count: 4096.0,
            grayscale: true,
        }
    }
}

/// Overlays animated noise and scanlines. The noise is driven by the
/// accumulated frame time.
#[derive(Debug)]
pub struct FilmPass {
    state: PassState,
    settings: FilmSettings,
    material: ShaderMaterial,
}

impl FilmPass {
    /// Create a film pass with default settings.
    pub fn new(library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::with_settings(library, FilmSettings::default())
    }

    /// Create with custom settings.
    pub fn with_settings(library: &ShaderLibrary, settings: FilmSettings) -> Result<Self, PassError> {
        let definition = library.require(FILM_SHADER, "FilmPass")?;
        let mut pass = Self {
            state: PassState::default(),
            settings,
            material: ShaderMaterial::from_definition(definition),
        };
        pass.apply_settings();
        Ok(pass)
    }

    /// Get settings.
    pub fn settings(&self) -> &FilmSettings {
        &self.settings
    }

    /// Set settings.
    pub fn set_settings(&mut self, settings: FilmSettings) {
        self.settings = settings;
        self.apply_settings();
    }

    /// Accumulated time in seconds.
    pub fn time(&self) -> f32 {
        self.material.uniforms.float("time").unwrap_or(0.0)
    }

    fn apply_settings(&mut self) {
        let uniforms = &mut self.material.uniforms;
        uniforms.set("nIntensity", self.settings.noise_intensity);
        uniforms.set("sIntensity", self.settings.scanlines_intensity);
        uniforms.set("sCount", self.settings.scanlines_count);
        uniforms.set("grayscale", self.settings.grayscale as i32);
    }
}

impl<R: Renderer> Pass<R> for FilmPass {
    fn name(&self) -> &str {
        "FilmPass"
    }

    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn render(
        &mut self,
        renderer: &mut R,
        write: &RenderTarget,
        read: &RenderTarget,
        delta_time: f32,
        _mask_active: bool,
    ) -> Result<(), RenderError> {
        let time = self.time() + delta_time;
        self.material.uniforms.set_texture("tDiffuse", Some(read.texture()));
        self.material.uniforms.set("time", time);

        renderer.render_fullscreen(&self.material, self.state.destination(write), self.state.clear)
    }
}
