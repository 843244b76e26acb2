//! Halftone dot screen.

use crate::core::{PassError, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, DOT_SCREEN_SHADER};
use crate::texture::RenderTarget;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Dot screen settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotScreenSettings {
    /// Pattern origin in pixels.
    pub center: Vec2,
    /// Pattern rotation in radians.
    pub angle: f32,
    /// Dot frequency.
    pub scale: f32,
}

impl Default for DotScreenSettings {
    fn default() -> Self {
        Self {
            center: Vec2::new(0.5, 0.5),
            angle: 1.57,
            scale: 1.0,
        }
    }
}

/// Renders the read buffer as a grey halftone pattern.
#[derive(Debug)]
pub struct DotScreenPass {
    state: PassState,
    material: ShaderMaterial,
}

impl DotScreenPass {
    /// Create a dot screen pass with default settings.
    pub fn new(library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::with_settings(library, DotScreenSettings::default())
    }

    /// Create with custom settings.
    pub fn with_settings(
        library: &ShaderLibrary,
        settings: DotScreenSettings,
    ) -> Result<Self, PassError> {
        let definition = library.require(DOT_SCREEN_SHADER, "DotScreenPass")?;
        let mut material = ShaderMaterial::from_definition(definition);
        material.uniforms.set("center", settings.center);
        material.uniforms.set("angle", settings.angle);
        material.uniforms.set("scale", settings.scale);

        Ok(Self {
            state: PassState::default(),
            material,
        })
    }
}

impl<R: Renderer> Pass<R> for DotScreenPass {
    fn name(&self) -> &str {
        "DotScreenPass"
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
        let uniforms = &mut self.material.uniforms;
        uniforms.set_texture("tDiffuse", Some(read.texture()));
        uniforms.set("tSize", Vec2::new(read.width() as f32, read.height() as f32));

        renderer.render_fullscreen(&self.material, self.state.destination(write), self.state.clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, RenderCommand};
    use crate::texture::{RenderTargetDescriptor, TextureSource};

    #[test]
    fn test_size_follows_read_buffer() {
        let mut renderer = HeadlessRenderer::new(64, 32);
        let write = renderer.create_render_target(&RenderTargetDescriptor::new(64, 32));
        let read = renderer.create_render_target(&RenderTargetDescriptor::new(64, 32));
        let mut pass = DotScreenPass::with_settings(
            &ShaderLibrary::builtin(),
            DotScreenSettings {
                scale: 0.8,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(Pass::<HeadlessRenderer>::state(&pass).needs_swap);

        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();
        let RenderCommand::Fullscreen { destination, uniforms, clear, .. } = renderer.draws().last().unwrap() else {
            panic!("expected a fullscreen draw");
        };
        assert_eq!(*destination, Destination::Target(write.id()));
        assert!(!*clear);
        assert_eq!(uniforms.vec2("tSize"), Some(Vec2::new(64.0, 32.0)));
        assert_eq!(uniforms.float("scale"), Some(0.8));
        assert_eq!(uniforms.float("angle"), Some(1.57));
        assert_eq!(uniforms.texture("tDiffuse"), Some(&TextureSource::RenderTarget(read.id())));
    }

    #[test]
    fn test_render_to_screen() {
        let mut renderer = HeadlessRenderer::new(8, 8);
        let write = renderer.create_render_target(&RenderTargetDescriptor::new(8, 8));
        let read = renderer.create_render_target(&RenderTargetDescriptor::new(8, 8));
        let mut pass = DotScreenPass::new(&ShaderLibrary::builtin()).unwrap();
        Pass::<HeadlessRenderer>::state_mut(&mut pass).render_to_screen = true;

        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();
        assert_eq!(renderer.draws().last().unwrap().destination(), Some(Destination::Screen));
    }
}
