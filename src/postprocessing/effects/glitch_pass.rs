//! Digital glitch effect.
//!
//! Every `trigger` frames (a random count between 120 and 240) the image is
//! torn apart by a big glitch. The first fifth of every cycle gets weaker
//! glitches, the rest passes through untouched.

use crate::core::{PassError, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::math::consts::PI;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, DIGITAL_GLITCH_SHADER};
use crate::texture::{clamp_dimension, DataTexture, FilterMode, RenderTarget, TextureSource};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Glitch effect settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchSettings {
    /// Side of the square displacement heightmap.
    pub dt_size: u32,
    /// Glitch hard on every frame.
    pub go_wild: bool,
    /// Seed for reproducible glitches.
    pub seed: Option<u64>,
}

impl Default for GlitchSettings {
    fn default() -> Self {
        Self {
            dt_size: 64,
            go_wild: false,
            seed: None,
        }
    }
}

/// Which glitch the last frame rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlitchRegime {
    /// Strong distortion. Restarts the cycle.
    Big,
    /// Weak distortion.
    Small,
    /// No distortion (`byp = 1`).
    Bypass,
}

/// Randomized digital distortion.
#[derive(Debug)]
pub struct GlitchPass {
    state: PassState,
    material: ShaderMaterial,
    rng: fastrand::Rng,
    heightmap: Rc<DataTexture>,
    /// Glitch hard on every frame.
    pub go_wild: bool,
    frame: u32,
    trigger: u32,
    last_regime: Option<GlitchRegime>,
}

impl GlitchPass {
    /// Create a glitch pass with default settings.
    pub fn new(library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::with_settings(library, GlitchSettings::default())
    }

    /// Create with custom settings.
    pub fn with_settings(library: &ShaderLibrary, settings: GlitchSettings) -> Result<Self, PassError> {
        let definition = library.require(DIGITAL_GLITCH_SHADER, "GlitchPass")?;
        let mut rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let size = clamp_dimension(settings.dt_size, "dt_size");
        let heightmap = Rc::new(generate_heightmap(&mut rng, size));
        let mut material = ShaderMaterial::from_definition(definition);
        material
            .uniforms
            .set_texture("tDisp", Some(TextureSource::Data(heightmap.clone())));

        let trigger = generate_trigger(&mut rng);
        Ok(Self {
            state: PassState::default(),
            material,
            rng,
            heightmap,
            go_wild: settings.go_wild,
            frame: 0,
            trigger,
            last_regime: None,
        })
    }

    /// Displacement heightmap.
    pub fn heightmap(&self) -> &Rc<DataTexture> {
        &self.heightmap
    }

    /// Frames since the last big glitch.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Length of the current glitch cycle in frames.
    pub fn trigger(&self) -> u32 {
        self.trigger
    }

    /// Regime of the last rendered frame.
    pub fn last_regime(&self) -> Option<GlitchRegime> {
        self.last_regime
    }

    /// Pick the uniforms for the next frame and advance the frame counter.
    fn advance(&mut self) -> GlitchRegime {
        let rng = &mut self.rng;
        let uniforms = &mut self.material.uniforms;
        uniforms.set("seed", rng.f32());
        uniforms.set("byp", 0);

        let regime = if self.frame % self.trigger == 0 || self.go_wild {
            uniforms.set("amount", (1.0 - rng.f32()) / 30.0);
            uniforms.set("angle", rand_range(rng, -PI, PI));
            uniforms.set("seed_x", rand_range(rng, -1.0, 1.0));
            uniforms.set("seed_y", rand_range(rng, -1.0, 1.0));
            uniforms.set("distortion_x", rng.f32());
            uniforms.set("distortion_y", rng.f32());
            self.frame = 0;
            self.trigger = generate_trigger(rng);
            GlitchRegime::Big
        } else if self.frame % self.trigger <= self.trigger / 5 {
            uniforms.set("amount", (1.0 - rng.f32()) / 90.0);
            uniforms.set("angle", rand_range(rng, -PI, PI));
            uniforms.set("distortion_x", rng.f32());
            uniforms.set("distortion_y", rng.f32());
            uniforms.set("seed_x", rand_range(rng, -0.3, 0.3));
            uniforms.set("seed_y", rand_range(rng, -0.3, 0.3));
            GlitchRegime::Small
        } else {
            uniforms.set("byp", 1);
            GlitchRegime::Bypass
        };

        self.frame += 1;
        regime
    }
}

impl<R: Renderer> Pass<R> for GlitchPass {
    fn name(&self) -> &str {
        "GlitchPass"
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
        _delta_time: f32,
        _mask_active: bool,
    ) -> Result<(), RenderError> {
        self.material.uniforms.set_texture("tDiffuse", Some(read.texture()));
        let regime = self.advance();
        self.last_regime = Some(regime);
        log::trace!("glitch {regime:?} (frame {}/{})", self.frame, self.trigger);

        renderer.render_fullscreen(&self.material, self.state.destination(write), self.state.clear)
    }
}

fn rand_range(rng: &mut fastrand::Rng, low: f32, high: f32) -> f32 {
    low + rng.f32() * (high - low)
}

fn generate_trigger(rng: &mut fastrand::Rng) -> u32 {
    rng.u32(120..=240)
}

/// Grey noise texture of `size x size` texels in `[0, 1)`.
fn generate_heightmap(rng: &mut fastrand::Rng, size: u32) -> DataTexture {
    let texels = (size as usize) * (size as usize);
    let mut rgb = Vec::with_capacity(texels * 3);
    for _ in 0..texels {
        let value = rng.f32();
        rgb.extend_from_slice(&[value, value, value]);
    }
    DataTexture::from_rgb(size, size, &rgb).with_filter(FilterMode::Nearest)
}
