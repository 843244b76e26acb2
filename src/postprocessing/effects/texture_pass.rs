//! Draws a fixed texture into the read buffer.

use crate::core::{PassError, RenderDestination, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, COPY_SHADER};
use crate::texture::{RenderTarget, TextureSource};

/// Copies a fixed texture into the read buffer, scaled by an opacity.
#[derive(Debug)]
pub struct TexturePass {
    state: PassState,
    material: ShaderMaterial,
}

impl TexturePass {
    /// Create a pass drawing `texture` with the given opacity.
    pub fn new(
        library: &ShaderLibrary,
        texture: TextureSource,
        opacity: f32,
    ) -> Result<Self, PassError> {
        let definition = library.require(COPY_SHADER, "TexturePass")?;
        let mut material = ShaderMaterial::from_definition(definition);
        material.uniforms.set("opacity", opacity);
        material.uniforms.set_texture("tDiffuse", Some(texture));

        Ok(Self {
            state: PassState::in_place(),
            material,
        })
    }

    /// Current opacity.
    pub fn opacity(&self) -> f32 {
        self.material.uniforms.float("opacity").unwrap_or(1.0)
    }

    /// Set the opacity.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.material.uniforms.set("opacity", opacity);
    }

    /// Replace the drawn texture.
    pub fn set_texture(&mut self, texture: TextureSource) {
        self.material.uniforms.set_texture("tDiffuse", Some(texture));
    }
}

impl<R: Renderer> Pass<R> for TexturePass {
    fn name(&self) -> &str {
        "TexturePass"
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
        _mask_active: bool,
    ) -> Result<(), RenderError> {
        renderer.render_fullscreen(&self.material, RenderDestination::Target(read), self.state.clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, RenderCommand};
    use crate::texture::{DataTexture, RenderTargetDescriptor};
    use std::rc::Rc;

    #[test]
    fn test_draws_fixed_texture_into_read() {
        let library = ShaderLibrary::builtin();
        let mut renderer = HeadlessRenderer::new(4, 4);
        let write = renderer.create_render_target(&RenderTargetDescriptor::new(4, 4));
        let read = renderer.create_render_target(&RenderTargetDescriptor::new(4, 4));

        let texture = TextureSource::Data(Rc::new(DataTexture::from_rgb(1, 1, &[1.0, 0.0, 0.0])));
        let mut pass = TexturePass::new(&library, texture.clone(), 0.5).unwrap();
        assert_eq!(pass.opacity(), 0.5);
        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();

        match renderer.draws().last().unwrap() {
            RenderCommand::Fullscreen {
                destination,
                uniforms,
                ..
            } => {
                assert_eq!(*destination, Destination::Target(read.id()));
                assert_eq!(uniforms.texture("tDiffuse"), Some(&texture));
                assert_eq!(uniforms.float("opacity"), Some(0.5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
