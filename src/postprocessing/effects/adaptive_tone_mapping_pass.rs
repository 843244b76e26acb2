//! Adaptive tone mapping.
//!
//! Measures the luminance of the read buffer, adapts it over time toward the
//! current scene brightness, and tone maps the image against the adapted
//! value, much like an eye adjusting to a dark room.

use crate::core::{PassError, RenderDestination, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{
    ShaderLibrary, ADAPTIVE_LUMINANCE_SHADER, COPY_SHADER, LUMINOSITY_SHADER, TONE_MAP_SHADER,
};
use crate::texture::{
    clamp_dimension, FilterMode, PixelFormat, RenderTarget, RenderTargetDescriptor, TextureDataType,
};
use serde::{Deserialize, Serialize};

/// Tone mapping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMappingSettings {
    /// Adapt the luminance over time instead of using `average_luminance`.
    pub adaptive: bool,
    /// Side of the square luminance targets. A power of two.
    pub resolution: u32,
    /// Adaptation rate.
    pub adaption_rate: f32,
    /// Luminance mapped to middle grey.
    pub middle_grey: f32,
    /// Lower luminance bound.
    pub min_luminance: f32,
    /// Luminance mapped to white.
    pub max_luminance: f32,
    /// Scene luminance used when not adaptive.
    pub average_luminance: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            adaptive: true,
            resolution: 256,
            adaption_rate: 1.0,
            middle_grey: 0.6,
            min_luminance: 0.01,
            max_luminance: 16.0,
            average_luminance: 1.0,
        }
    }
}

struct LuminanceTargets {
    /// Adapted luminance of this frame.
    luminance: RenderTarget,
    /// Adapted luminance of the previous frame.
    previous: RenderTarget,
    /// Raw luminance of this frame, mipmapped down to 1x1.
    current: RenderTarget,
}

/// Luminance-adaptive tone mapping pass.
pub struct AdaptiveToneMappingPass {
    state: PassState,
    settings: ToneMappingSettings,
    data_type: TextureDataType,
    targets: Option<LuminanceTargets>,
    material_copy: ShaderMaterial,
    material_luminance: ShaderMaterial,
    material_adaptive_lum: ShaderMaterial,
    material_tone_map: ShaderMaterial,
}

impl AdaptiveToneMappingPass {
    /// Create a tone mapping pass with default settings.
    pub fn new(library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::with_settings(library, ToneMappingSettings::default())
    }

    /// Create with custom settings.
    ///
    /// Luminance targets are allocated on the first render, once the read
    /// buffer's data type is known.
    pub fn with_settings(
        library: &ShaderLibrary,
        settings: ToneMappingSettings,
    ) -> Result<Self, PassError> {
        const PASS: &str = "AdaptiveToneMappingPass";
        let copy = library.require(COPY_SHADER, PASS)?;
        let luminosity = library.require(LUMINOSITY_SHADER, PASS)?;
        let adaptive_luminance = library.require(ADAPTIVE_LUMINANCE_SHADER, PASS)?;
        let tone_map = library.require(TONE_MAP_SHADER, PASS)?;

        let resolution = clamp_dimension(settings.resolution, "resolution");
        let mut material_adaptive_lum = ShaderMaterial::from_definition(adaptive_luminance);
        material_adaptive_lum.set_define("MIP_LEVEL_1X1", (resolution as f64).log2());
        material_adaptive_lum.uniforms.set("tau", settings.adaption_rate.abs());

        let mut material_tone_map = ShaderMaterial::from_definition(tone_map);
        let uniforms = &mut material_tone_map.uniforms;
        uniforms.set("middleGrey", settings.middle_grey);
        uniforms.set("minLuminance", settings.min_luminance);
        uniforms.set("maxLuminance", settings.max_luminance);
        uniforms.set("averageLuminance", settings.average_luminance);

        let mut pass = Self {
            state: PassState::default(),
            settings: ToneMappingSettings {
                resolution,
                ..settings
            },
            data_type: TextureDataType::default(),
            targets: None,
            material_copy: ShaderMaterial::from_definition(copy),
            material_luminance: ShaderMaterial::from_definition(luminosity),
            material_adaptive_lum,
            material_tone_map,
        };
        pass.set_adaptive(settings.adaptive);
        Ok(pass)
    }

    /// Get settings.
    pub fn settings(&self) -> &ToneMappingSettings {
        &self.settings
    }

    /// Whether luminance adapts over time.
    pub fn adaptive(&self) -> bool {
        self.settings.adaptive
    }

    /// Switch between adapted and fixed average luminance.
    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.settings.adaptive = adaptive;
        if adaptive {
            self.material_tone_map.set_define("ADAPTED_LUMINANCE", 1.0);
            let luminance = self.targets.as_ref().map(|t| t.luminance.texture());
            self.material_tone_map.uniforms.set_texture("luminanceMap", luminance);
        } else {
            self.material_tone_map.remove_define("ADAPTED_LUMINANCE");
            self.material_tone_map.uniforms.set_texture("luminanceMap", None);
        }
    }

    /// Set the adaptation rate. Zero is ignored; negative rates adapt at
    /// their absolute value.
    pub fn set_adaption_rate(&mut self, rate: f32) {
        if rate != 0.0 {
            self.settings.adaption_rate = rate.abs();
            self.material_adaptive_lum.uniforms.set("tau", rate.abs());
        }
    }

    /// Set the luminance mapped to white. Zero is ignored.
    pub fn set_max_luminance(&mut self, max_luminance: f32) {
        if max_luminance != 0.0 {
            self.settings.max_luminance = max_luminance;
            self.material_tone_map.uniforms.set("maxLuminance", max_luminance);
        }
    }

    /// Set the fixed scene luminance. Zero is ignored.
    pub fn set_average_luminance(&mut self, average_luminance: f32) {
        if average_luminance != 0.0 {
            self.settings.average_luminance = average_luminance;
            self.material_tone_map
                .uniforms
                .set("averageLuminance", average_luminance);
        }
    }

    /// Set the luminance mapped to middle grey. Zero is ignored.
    pub fn set_middle_grey(&mut self, middle_grey: f32) {
        if middle_grey != 0.0 {
            self.settings.middle_grey = middle_grey;
            self.material_tone_map.uniforms.set("middleGrey", middle_grey);
        }
    }

    /// Recreate the luminance targets, releasing the previous ones.
    pub fn reset<R: Renderer>(&mut self, renderer: &mut R) {
        self.release_targets(renderer);

        let resolution = self.settings.resolution;
        let descriptor = RenderTargetDescriptor::new(resolution, resolution)
            .with_format(PixelFormat::Rgb)
            .with_data_type(self.data_type)
            .with_mipmaps(false);
        let current = descriptor
            .with_filters(FilterMode::LinearMipmapLinear, FilterMode::Linear)
            .with_mipmaps(true);

        let targets = LuminanceTargets {
            luminance: renderer.create_render_target(&descriptor),
            previous: renderer.create_render_target(&descriptor),
            current: renderer.create_render_target(&current),
        };
        log::debug!(
            "tone mapping luminance targets {resolution}x{resolution} ({:?})",
            self.data_type
        );

        if self.settings.adaptive {
            self.material_tone_map
                .uniforms
                .set_texture("luminanceMap", Some(targets.luminance.texture()));
        }
        self.targets = Some(targets);
    }

    fn release_targets<R: Renderer>(&mut self, renderer: &mut R) {
        if let Some(targets) = self.targets.take() {
            renderer.dispose_render_target(targets.luminance);
            renderer.dispose_render_target(targets.previous);
            renderer.dispose_render_target(targets.current);
        }
    }

    /// Adapted luminance target, once allocated.
    pub fn luminance_target(&self) -> Option<&RenderTarget> {
        self.targets.as_ref().map(|t| &t.luminance)
    }
}

impl<R: Renderer> Pass<R> for AdaptiveToneMappingPass {
    fn name(&self) -> &str {
        "AdaptiveToneMappingPass"
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
        if self.targets.is_none() {
            self.data_type = read.data_type();
            self.reset(renderer);
        }

        if let (true, Some(targets)) = (self.settings.adaptive, &self.targets) {
            self.material_luminance
                .uniforms
                .set_texture("tDiffuse", Some(read.texture()));
            renderer.render_fullscreen(
                &self.material_luminance,
                RenderDestination::Target(&targets.current),
                false,
            )?;

            let adapt = &mut self.material_adaptive_lum.uniforms;
            adapt.set("delta", delta_time);
            adapt.set_texture("lastLum", Some(targets.previous.texture()));
            adapt.set_texture("currentLum", Some(targets.current.texture()));
            renderer.render_fullscreen(
                &self.material_adaptive_lum,
                RenderDestination::Target(&targets.luminance),
                false,
            )?;

            self.material_copy
                .uniforms
                .set_texture("tDiffuse", Some(targets.luminance.texture()));
            renderer.render_fullscreen(
                &self.material_copy,
                RenderDestination::Target(&targets.previous),
                false,
            )?;
        }

        self.material_tone_map
            .uniforms
            .set_texture("tDiffuse", Some(read.texture()));
        renderer.render_fullscreen(&self.material_tone_map, self.state.destination(write), self.state.clear)
    }

    fn dispose(&mut self, renderer: &mut R) {
        self.release_targets(renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, RenderCommand};
    use crate::texture::TextureSource;

    fn setup(data_type: TextureDataType) -> (HeadlessRenderer, RenderTarget, RenderTarget) {
        let mut renderer = HeadlessRenderer::new(32, 32);
        let descriptor = RenderTargetDescriptor::new(32, 32).with_data_type(data_type);
        let write = renderer.create_render_target(&descriptor);
        let read = renderer.create_render_target(&descriptor);
        (renderer, write, read)
    }

    fn materials(renderer: &HeadlessRenderer) -> Vec<String> {
        renderer
            .draws()
            .filter_map(|c| match c {
                RenderCommand::Fullscreen { material, .. } => Some(material.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_lazy_targets_adopt_read_type() {
        let (mut renderer, write, read) = setup(TextureDataType::HalfFloat);
        let mut pass = AdaptiveToneMappingPass::new(&ShaderLibrary::builtin()).ok().unwrap();
        assert!(pass.luminance_target().is_none());

        pass.render(&mut renderer, &write, &read, 0.016, false).unwrap();
        let luminance = pass.luminance_target().unwrap();
        assert_eq!(luminance.data_type(), TextureDataType::HalfFloat);
        assert_eq!(luminance.width(), 256);
        assert_eq!(renderer.live_target_count(), 5);

        let current = pass.targets.as_ref().unwrap().current.descriptor();
        assert_eq!(current.mip_level_count(), 9);
        assert_eq!(luminance.descriptor().mip_level_count(), 1);
    }

    #[test]
    fn test_adaptive_chain() {
        let (mut renderer, write, read) = setup(TextureDataType::UnsignedByte);
        let mut pass = AdaptiveToneMappingPass::new(&ShaderLibrary::builtin()).ok().unwrap();
        pass.render(&mut renderer, &write, &read, 0.05, false).unwrap();

        assert_eq!(
            materials(&renderer),
            [LUMINOSITY_SHADER, ADAPTIVE_LUMINANCE_SHADER, COPY_SHADER, TONE_MAP_SHADER]
        );
        let targets = pass.targets.as_ref().unwrap();
        let RenderCommand::Fullscreen { uniforms, .. } = renderer.draws().nth(1).unwrap() else {
            panic!("expected a fullscreen draw");
        };
        assert_eq!(uniforms.float("delta"), Some(0.05));
        assert_eq!(
            uniforms.texture("lastLum"),
            Some(&TextureSource::RenderTarget(targets.previous.id()))
        );

        let RenderCommand::Fullscreen { destination, uniforms, .. } = renderer.draws().last().unwrap() else {
            panic!("expected a fullscreen draw");
        };
        assert_eq!(*destination, Destination::Target(write.id()));
        assert_eq!(
            uniforms.texture("luminanceMap"),
            Some(&TextureSource::RenderTarget(targets.luminance.id()))
        );
        assert!(pass.material_tone_map.has_define("ADAPTED_LUMINANCE"));
        assert_eq!(pass.material_adaptive_lum.defines().get("MIP_LEVEL_1X1"), Some(&8.0));
    }

    #[test]
    fn test_non_adaptive_tone_maps_directly() {
        let (mut renderer, write, read) = setup(TextureDataType::UnsignedByte);
        let mut pass = AdaptiveToneMappingPass::with_settings(
            &ShaderLibrary::builtin(),
            ToneMappingSettings {
                adaptive: false,
                resolution: 64,
                ..Default::default()
            },
        )
        .ok()
        .unwrap();
        pass.set_average_luminance(0.7);
        pass.render(&mut renderer, &write, &read, 0.016, false).unwrap();

        assert_eq!(materials(&renderer), [TONE_MAP_SHADER]);
        assert!(!pass.material_tone_map.has_define("ADAPTED_LUMINANCE"));
        assert_eq!(pass.material_tone_map.uniforms.float("averageLuminance"), Some(0.7));
        assert_eq!(pass.material_tone_map.uniforms.texture("luminanceMap"), None);
        assert_eq!(pass.material_adaptive_lum.defines().get("MIP_LEVEL_1X1"), Some(&6.0));
    }

    #[test]
    fn test_setters_ignore_zero() {
        let mut pass = AdaptiveToneMappingPass::new(&ShaderLibrary::builtin()).ok().unwrap();
        pass.set_adaption_rate(-2.0);
        pass.set_adaption_rate(0.0);
        pass.set_middle_grey(0.0);
        pass.set_max_luminance(0.0);
        pass.set_max_luminance(8.0);
        assert_eq!(pass.material_adaptive_lum.uniforms.float("tau"), Some(2.0));
        assert_eq!(pass.material_tone_map.uniforms.float("middleGrey"), Some(0.6));
        assert_eq!(pass.material_tone_map.uniforms.float("maxLuminance"), Some(8.0));
    }

    #[test]
    fn test_reset_and_dispose_release_targets() {
        let (mut renderer, write, read) = setup(TextureDataType::UnsignedByte);
        let mut pass = AdaptiveToneMappingPass::new(&ShaderLibrary::builtin()).ok().unwrap();
        pass.render(&mut renderer, &write, &read, 0.016, false).unwrap();
        let old = pass.luminance_target().unwrap().id();

        pass.reset(&mut renderer);
        assert!(!renderer.is_live(old));
        assert_eq!(renderer.live_target_count(), 5);

        Pass::<HeadlessRenderer>::dispose(&mut pass, &mut renderer);
        assert_eq!(renderer.live_target_count(), 2);
    }

    #[test]
    fn test_toggle_adaptive_after_init() {
        let (mut renderer, write, read) = setup(TextureDataType::UnsignedByte);
        let mut pass = AdaptiveToneMappingPass::new(&ShaderLibrary::builtin()).ok().unwrap();
        pass.render(&mut renderer, &write, &read, 0.016, false).unwrap();
        let version = pass.material_tone_map.version();

        pass.set_adaptive(false);
        assert!(pass.material_tone_map.version() > version);
        pass.set_adaptive(true);
        let luminance = pass.luminance_target().unwrap().id();
        assert_eq!(
            pass.material_tone_map.uniforms.texture("luminanceMap"),
            Some(&TextureSource::RenderTarget(luminance))
        );
    }
}
