//! Composer configuration loaded from TOML.
//!
//! ```toml
//! [render_target]
//! data_type = "half_float"
//!
//! [[effects]]
//! kind = "bloom"
//! strength = 1.5
//!
//! [[effects]]
//! kind = "film"
//! render_to_screen = true
//! ```

use super::effect_composer::default_descriptor;
use super::effects::{
    AdaptiveToneMappingPass, BloomPass, BloomSettings, DotScreenPass, DotScreenSettings, FilmPass,
    FilmSettings, GlitchPass, GlitchSettings, ShaderPass, ToneMappingSettings,
};
use super::pass::{Pass, PassState};
use crate::core::{ConfigError, PassError, Renderer};
use crate::shaders::ShaderLibrary;
use crate::texture::{FilterMode, PixelFormat, RenderTargetDescriptor, TextureDataType};
use serde::{Deserialize, Serialize};

/// Composer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Ping-pong target settings.
    pub render_target: RenderTargetConfig,
    /// Effect chain in order.
    pub effects: Vec<EffectConfig>,
}

impl ComposerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges the passes cannot correct themselves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for effect in &self.effects {
            match &effect.kind {
                EffectKind::Bloom(settings) => {
                    if settings.kernel_size == 0 {
                        return Err(invalid("bloom.kernel_size", "must be at least 1"));
                    }
                    if settings.resolution == 0 {
                        return Err(invalid("bloom.resolution", "must be at least 1"));
                    }
                }
                EffectKind::Glitch(settings) if settings.dt_size == 0 => {
                    return Err(invalid("glitch.dt_size", "must be at least 1"));
                }
                EffectKind::ToneMapping(settings) if !settings.resolution.is_power_of_two() => {
                    return Err(invalid(
                        "tone_mapping.resolution",
                        format!("{} is not a power of two", settings.resolution),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

/// Ping-pong target settings. Unset dimensions follow the display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderTargetConfig {
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Channel layout.
    pub format: PixelFormat,
    /// Component type.
    pub data_type: TextureDataType,
    /// Allocate a stencil buffer. Masks need one.
    pub stencil_buffer: bool,
}

impl Default for RenderTargetConfig {
    fn default() -> Self {
        let descriptor = default_descriptor(1, 1);
        Self {
            width: None,
            height: None,
            min_filter: descriptor.min_filter,
            mag_filter: descriptor.mag_filter,
            format: descriptor.format,
            data_type: descriptor.data_type,
            stencil_buffer: descriptor.stencil_buffer,
        }
    }
}

impl RenderTargetConfig {
    /// Descriptor of target A, given the display size.
    pub fn descriptor(&self, display_size: (u32, u32)) -> RenderTargetDescriptor {
        default_descriptor(
            self.width.unwrap_or(display_size.0),
            self.height.unwrap_or(display_size.1),
        )
        .with_filters(self.min_filter, self.mag_filter)
        .with_format(self.format)
        .with_data_type(self.data_type)
        .with_stencil(self.stencil_buffer)
    }
}

/// Settings of the copy effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySettings {
    /// Output opacity.
    pub opacity: f32,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

/// Which effect an entry builds, with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    /// [`ShaderPass`] with the copy shader.
    Copy(CopySettings),
    /// [`BloomPass`].
    Bloom(BloomSettings),
    /// [`FilmPass`].
    Film(FilmSettings),
    /// [`GlitchPass`].
    Glitch(GlitchSettings),
    /// [`DotScreenPass`].
    DotScreen(DotScreenSettings),
    /// [`AdaptiveToneMappingPass`].
    ToneMapping(ToneMappingSettings),
}

fn enabled_default() -> bool {
    true
}

/// One entry of the effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Effect and settings.
    #[serde(flatten)]
    pub kind: EffectKind,
    /// Whether the pass starts enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Draw to the screen instead of the write buffer.
    #[serde(default)]
    pub render_to_screen: bool,
}

impl EffectConfig {
    /// Build the pass this entry describes.
    pub fn build<R: Renderer>(
        &self,
        renderer: &mut R,
        library: &ShaderLibrary,
    ) -> Result<Box<dyn Pass<R>>, PassError> {
        let mut pass: Box<dyn Pass<R>> = match &self.kind {
            EffectKind::Copy(settings) => {
                let mut copy = ShaderPass::copy(library)?;
                copy.uniforms_mut().set("opacity", settings.opacity);
                Box::new(copy)
            }
            EffectKind::Bloom(settings) => {
                Box::new(BloomPass::with_settings(renderer, library, *settings)?)
            }
            EffectKind::Film(settings) => Box::new(FilmPass::with_settings(library, *settings)?),
            EffectKind::Glitch(settings) => Box::new(GlitchPass::with_settings(library, *settings)?),
            EffectKind::DotScreen(settings) => {
                Box::new(DotScreenPass::with_settings(library, *settings)?)
            }
            EffectKind::ToneMapping(settings) => {
                Box::new(AdaptiveToneMappingPass::with_settings(library, *settings)?)
            }
        };

        let state: &mut PassState = pass.state_mut();
        state.enabled = self.enabled;
        state.render_to_screen = self.render_to_screen;
        Ok(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ComposerError, HeadlessRenderer};
    use crate::postprocessing::EffectComposer;

    const CHAIN: &str = r#"
        [render_target]
        data_type = "half_float"
        width = 320

        [[effects]]
        kind = "bloom"
        strength = 1.5
        resolution = 128

        [[effects]]
        kind = "glitch"
        seed = 7
        enabled = false

        [[effects]]
        kind = "dot_screen"
        center = [10.0, 20.0]

        [[effects]]
        kind = "film"
        grayscale = false
        render_to_screen = true
    "#;

    #[test]
    fn test_parse_chain() {
        let config = ComposerConfig::from_toml(CHAIN).unwrap();
        assert_eq!(config.render_target.data_type, TextureDataType::HalfFloat);
        assert_eq!(config.render_target.width, Some(320));
        assert!(config.render_target.stencil_buffer);
        assert_eq!(config.effects.len(), 4);

        let EffectKind::Bloom(bloom) = &config.effects[0].kind else {
            panic!("expected bloom");
        };
        assert_eq!(bloom.strength, 1.5);
        assert_eq!(bloom.kernel_size, 25);
        assert_eq!(bloom.resolution, 128);

        assert_eq!(
            config.effects[1].kind,
            EffectKind::Glitch(GlitchSettings {
                seed: Some(7),
                ..Default::default()
            })
        );
        assert!(!config.effects[1].enabled);
        assert!(config.effects[3].render_to_screen);
        assert!(config.effects[2].enabled);
    }

    #[test]
    fn test_empty_config() {
        let config = ComposerConfig::from_toml("").unwrap();
        assert_eq!(config, ComposerConfig::default());
        assert_eq!(
            config.render_target.descriptor((64, 48)),
            RenderTargetDescriptor::new(64, 48).with_stencil(true)
        );
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let err = ComposerConfig::from_toml("[[effects]]\nkind = \"sepia\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            ("[[effects]]\nkind = \"bloom\"\nkernel_size = 0\n", "bloom.kernel_size"),
            ("[[effects]]\nkind = \"glitch\"\ndt_size = 0\n", "glitch.dt_size"),
            ("[[effects]]\nkind = \"tone_mapping\"\nresolution = 100\n", "tone_mapping.resolution"),
        ];
        for (source, expected) in cases {
            match ComposerConfig::from_toml(source) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_composer_from_config() {
        let config = ComposerConfig::from_toml(CHAIN).unwrap();
        let renderer = HeadlessRenderer::new(200, 100);
        let mut composer =
            EffectComposer::from_config(renderer, &ShaderLibrary::builtin(), &config).unwrap();

        assert_eq!(composer.size(), (320, 100));
        let names: Vec<_> = composer.passes().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["BloomPass", "GlitchPass", "DotScreenPass", "FilmPass"]);
        assert!(!composer.passes()[1].enabled());
        assert!(composer.passes()[3].state().render_to_screen);

        composer.render(0.016).unwrap();
        // bloom (3 draws), dot screen, film
        assert_eq!(composer.renderer().draw_count(), 5);
    }

    #[test]
    fn test_from_config_reports_missing_shader() {
        let config = ComposerConfig::from_toml(CHAIN).unwrap();
        let mut library = ShaderLibrary::builtin();
        library.remove(crate::shaders::FILM_SHADER);
        let err = EffectComposer::from_config(HeadlessRenderer::new(8, 8), &library, &config).err();
        assert!(matches!(
            err,
            Some(ComposerError::Pass(PassError::MissingDependency { pass: "FilmPass", .. }))
        ));
    }
}
