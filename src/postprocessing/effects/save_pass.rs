//! Snapshot of the read buffer into a pass-owned target.

use crate::core::{PassError, RenderDestination, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, COPY_SHADER};
use crate::texture::{PixelFormat, RenderTarget, RenderTargetDescriptor, TextureSource};

/// Copies the read buffer into its own render target so later passes (or
/// the host) can sample the image as it was at this point of the chain.
#[derive(Debug)]
pub struct SavePass {
    state: PassState,
    material: ShaderMaterial,
    render_target: Option<RenderTarget>,
}

impl SavePass {
    /// Create a pass saving into a new target sized like the drawing buffer.
    pub fn new<R: Renderer>(renderer: &mut R, library: &ShaderLibrary) -> Result<Self, PassError> {
        let definition = library.require(COPY_SHADER, "SavePass")?;
        let (width, height) = renderer.drawing_buffer_size();
        let descriptor = RenderTargetDescriptor::new(width, height)
            .with_format(PixelFormat::Rgb)
            .with_stencil(false);

        Ok(Self {
            state: PassState::in_place(),
            material: ShaderMaterial::from_definition(definition),
            render_target: Some(renderer.create_render_target(&descriptor)),
        })
    }

    /// Create a pass saving into a caller-created target. The pass takes
    /// ownership and releases it in [`Pass::dispose`].
    pub fn with_render_target(
        library: &ShaderLibrary,
        render_target: RenderTarget,
    ) -> Result<Self, PassError> {
        let definition = library.require(COPY_SHADER, "SavePass")?;
        Ok(Self {
            state: PassState::in_place(),
            material: ShaderMaterial::from_definition(definition),
            render_target: Some(render_target),
        })
    }

    /// The saved image.
    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.render_target.as_ref()
    }

    /// Texture of the saved image, for use as a uniform in later passes.
    pub fn texture(&self) -> Option<TextureSource> {
        self.render_target.as_ref().map(RenderTarget::texture)
    }
}

impl<R: Renderer> Pass<R> for SavePass {
    fn name(&self) -> &str {
        "SavePass"
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
        let Some(target) = &self.render_target else {
            return Ok(());
        };

        self.material.uniforms.set_texture("tDiffuse", Some(read.texture()));
        renderer.render_fullscreen(&self.material, RenderDestination::Target(target), self.state.clear)
    }

    fn dispose(&mut self, renderer: &mut R) {
        if let Some(target) = self.render_target.take() {
            renderer.dispose_render_target(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer};

    #[test]
    fn test_saves_read_buffer() {
        let library = ShaderLibrary::builtin();
        let mut renderer = HeadlessRenderer::new(32, 16);
        let write = renderer.create_render_target(&RenderTargetDescriptor::new(32, 16));
        let read = renderer.create_render_target(&RenderTargetDescriptor::new(32, 16));

        let mut pass = SavePass::new(&mut renderer, &library).unwrap();
        let saved = pass.render_target().unwrap().id();
        assert_eq!(renderer.target_descriptor(saved).unwrap().width, 32);
        assert!(!renderer.target_descriptor(saved).unwrap().stencil_buffer);

        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();
        let draw = renderer.draws().last().unwrap();
        assert_eq!(draw.destination(), Some(Destination::Target(saved)));
        assert!(!Pass::<HeadlessRenderer>::state(&pass).needs_swap);
        assert_eq!(pass.texture(), Some(TextureSource::RenderTarget(saved)));
    }

    #[test]
    fn test_dispose_releases_target() {
        let library = ShaderLibrary::builtin();
        let mut renderer = HeadlessRenderer::new(4, 4);
        let target = renderer.create_render_target(&RenderTargetDescriptor::new(4, 4));
        let id = target.id();

        let mut pass = SavePass::with_render_target(&library, target).unwrap();
        pass.dispose(&mut renderer);
        assert!(!renderer.is_live(id));
        assert!(pass.render_target().is_none());
    }
}
