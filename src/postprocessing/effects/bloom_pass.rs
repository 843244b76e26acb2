//! Bloom post-processing effect.

use crate::core::{PassError, RenderDestination, RenderError, Renderer};
use crate::material::{Blending, ShaderMaterial, UniformValue};
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{build_kernel, ShaderLibrary, BLUR_X, BLUR_Y, CONVOLUTION_SHADER, COPY_SHADER, MAX_KERNEL_SIZE};
use crate::texture::{PixelFormat, RenderTarget, RenderTargetDescriptor};
use serde::{Deserialize, Serialize};

/// Bloom effect settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Opacity of the blurred image added back onto the read buffer.
    pub strength: f32,
    /// Convolution taps, at most 25.
    pub kernel_size: u32,
    /// Gaussian standard deviation.
    pub sigma: f32,
    /// Side of the square blur targets in pixels.
    pub resolution: u32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.0,
            kernel_size: 25,
            sigma: 4.0,
            resolution: 256,
        }
    }
}

/// Blurs the read buffer with a separable Gaussian and adds the result back
/// onto it in place.
pub struct BloomPass {
    state: PassState,
    settings: BloomSettings,
    render_target_x: Option<RenderTarget>,
    render_target_y: Option<RenderTarget>,
    material_convolution: ShaderMaterial,
    material_copy: ShaderMaterial,
}

impl BloomPass {
    /// Create a bloom pass with default settings.
    pub fn new<R: Renderer>(renderer: &mut R, library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::with_settings(renderer, library, BloomSettings::default())
    }

    /// Create with custom settings.
    pub fn with_settings<R: Renderer>(
        renderer: &mut R,
        library: &ShaderLibrary,
        settings: BloomSettings,
    ) -> Result<Self, PassError> {
        let copy = library.require(COPY_SHADER, "BloomPass")?;
        let convolution = library.require(CONVOLUTION_SHADER, "BloomPass")?;

        let mut material_copy = ShaderMaterial::from_definition(copy).with_blending(Blending::Additive);
        material_copy.uniforms.set("opacity", settings.strength);

        let kernel_size = (settings.kernel_size as usize).clamp(1, MAX_KERNEL_SIZE);
        if kernel_size != settings.kernel_size as usize {
            log::warn!("bloom kernel size {} clamped to {kernel_size}", settings.kernel_size);
        }
        let mut material_convolution = ShaderMaterial::from_definition(convolution);
        material_convolution.set_define("KERNEL_SIZE_FLOAT", kernel_size as f64);
        material_convolution.set_define("KERNEL_SIZE_INT", kernel_size as f64);
        material_convolution.uniforms.set("uImageIncrement", BLUR_X);
        material_convolution
            .uniforms
            .set("cKernel", UniformValue::FloatArray(build_kernel(settings.sigma)));

        let descriptor = RenderTargetDescriptor::new(settings.resolution, settings.resolution)
            .with_format(PixelFormat::Rgb);

        Ok(Self {
            state: PassState::in_place(),
            settings,
            render_target_x: Some(renderer.create_render_target(&descriptor)),
            render_target_y: Some(renderer.create_render_target(&descriptor)),
            material_convolution,
            material_copy,
        })
    }

    /// Get settings.
    pub fn settings(&self) -> &BloomSettings {
        &self.settings
    }

    /// Set the strength of the composite.
    pub fn set_strength(&mut self, strength: f32) {
        self.settings.strength = strength;
        self.material_copy.uniforms.set("opacity", strength);
    }

    /// Horizontal and vertical blur targets.
    pub fn blur_targets(&self) -> Option<(&RenderTarget, &RenderTarget)> {
        self.render_target_x.as_ref().zip(self.render_target_y.as_ref())
    }
}

impl<R: Renderer> Pass<R> for BloomPass {
    fn name(&self) -> &str {
        "BloomPass"
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
        _write: &RenderTarget,
        read: &RenderTarget,
        _delta_time: f32,
        mask_active: bool,
    ) -> Result<(), RenderError> {
        let (Some(target_x), Some(target_y)) = (&self.render_target_x, &self.render_target_y) else {
            log::warn!("BloomPass rendered after dispose; skipping");
            return Ok(());
        };

        if mask_active {
            renderer.set_stencil_test(false);
        }

        let convolution = &mut self.material_convolution;
        convolution.uniforms.set_texture("tDiffuse", Some(read.texture()));
        convolution.uniforms.set("uImageIncrement", BLUR_X);
        renderer.render_fullscreen(convolution, RenderDestination::Target(target_x), true)?;

        convolution.uniforms.set_texture("tDiffuse", Some(target_x.texture()));
        convolution.uniforms.set("uImageIncrement", BLUR_Y);
        renderer.render_fullscreen(convolution, RenderDestination::Target(target_y), true)?;

        self.material_copy
            .uniforms
            .set_texture("tDiffuse", Some(target_y.texture()));

        if mask_active {
            renderer.set_stencil_test(true);
        }

        renderer.render_fullscreen(&self.material_copy, RenderDestination::Target(read), self.state.clear)
    }

    fn dispose(&mut self, renderer: &mut R) {
        for target in [self.render_target_x.take(), self.render_target_y.take()]
            .into_iter()
            .flatten()
        {
            renderer.dispose_render_target(target);
        }
    }
}
