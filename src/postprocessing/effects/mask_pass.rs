//! Stencil masking: restrict the passes between a [`MaskPass`] and a
//! [`ClearMaskPass`] to the pixels covered by a scene.

use crate::core::{RenderDestination, RenderError, Renderer, StencilFunc, StencilOp};
use crate::postprocessing::pass::{Pass, PassRole, PassState};
use crate::texture::RenderTarget;
use std::rc::Rc;

/// Writes a scene's coverage into the stencil buffers of both ping-pong
/// targets and arms the stencil test.
///
/// Color and depth writes are disabled while the mask is drawn. With
/// `inverse` set, the mask covers everything except the scene.
pub struct MaskPass<R: Renderer> {
    state: PassState,
    scene: Rc<R::Scene>,
    camera: Rc<R::Camera>,
    /// Mask everything the scene does not cover.
    pub inverse: bool,
}

impl<R: Renderer> MaskPass<R> {
    /// Create a mask from `scene` seen through `camera`.
    pub fn new(scene: Rc<R::Scene>, camera: Rc<R::Camera>) -> Self {
        Self {
            state: PassState {
                clear: true,
                needs_swap: false,
                ..Default::default()
            },
            scene,
            camera,
            inverse: false,
        }
    }

    /// Create an inverted mask.
    pub fn inverted(scene: Rc<R::Scene>, camera: Rc<R::Camera>) -> Self {
        Self {
            inverse: true,
            ..Self::new(scene, camera)
        }
    }
}

impl<R: Renderer> Pass<R> for MaskPass<R> {
    fn name(&self) -> &str {
        "MaskPass"
    }

    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn role(&self) -> PassRole {
        PassRole::MaskSet
    }

    fn render(
        &mut self,
        renderer: &mut R,
        write: &RenderTarget,
        read: &RenderTarget,
        _delta_time: f32,
        _mask_active: bool,
    ) -> Result<(), RenderError> {
        let (write_value, clear_value) = if self.inverse { (0, 1) } else { (1, 0) };

        renderer.set_color_mask(false);
        renderer.set_depth_mask(false);

        renderer.set_stencil_test(true);
        renderer.set_stencil_op(StencilOp::Replace, StencilOp::Replace, StencilOp::Replace);
        renderer.set_stencil_func(StencilFunc::Always, write_value, 0xffff_ffff);
        renderer.set_clear_stencil(clear_value);

        let clear = self.state.clear;
        renderer.render_scene(&self.scene, &self.camera, RenderDestination::Target(read), clear, None)?;
        renderer.render_scene(&self.scene, &self.camera, RenderDestination::Target(write), clear, None)?;

        renderer.set_color_mask(true);
        renderer.set_depth_mask(true);

        // only draw where the stencil holds 1
        renderer.set_stencil_func(StencilFunc::Equal, 1, 0xffff_ffff);
        renderer.set_stencil_op(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        Ok(())
    }
}

/// Disarms the stencil test armed by a [`MaskPass`].
#[derive(Debug)]
pub struct ClearMaskPass {
    state: PassState,
}

impl ClearMaskPass {
    /// Create the pass.
    pub fn new() -> Self {
        Self {
            state: PassState::in_place(),
        }
    }
}

impl Default for ClearMaskPass {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderer> Pass<R> for ClearMaskPass {
    fn name(&self) -> &str {
        "ClearMaskPass"
    }

    fn state(&self) -> &PassState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PassState {
        &mut self.state
    }

    fn role(&self) -> PassRole {
        PassRole::MaskClear
    }

    fn render(
        &mut self,
        renderer: &mut R,
        _write: &RenderTarget,
        _read: &RenderTarget,
        _delta_time: f32,
        _mask_active: bool,
    ) -> Result<(), RenderError> {
        renderer.set_stencil_test(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, RenderCommand};
    use crate::texture::RenderTargetDescriptor;

    fn setup() -> (HeadlessRenderer, RenderTarget, RenderTarget) {
        let mut renderer = HeadlessRenderer::new(4, 4);
        let descriptor = RenderTargetDescriptor::new(4, 4).with_stencil(true);
        let write = renderer.create_render_target(&descriptor);
        let read = renderer.create_render_target(&descriptor);
        renderer.take_commands();
        (renderer, write, read)
    }

    #[test]
    fn test_mask_draws_stencil_into_both_buffers() {
        let (mut renderer, write, read) = setup();
        let mut pass = MaskPass::<HeadlessRenderer>::new(Rc::from("mask"), Rc::from("camera"));
        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();

        let draws: Vec<_> = renderer.draws().cloned().collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].destination(), Some(Destination::Target(read.id())));
        assert_eq!(draws[1].destination(), Some(Destination::Target(write.id())));
        for draw in &draws {
            let RenderCommand::Scene { state, clear, .. } = draw else {
                panic!("unexpected command {draw:?}");
            };
            assert!(*clear);
            assert!(!state.color_write);
            assert!(!state.depth_write);
            assert!(state.stencil.enabled);
            assert_eq!(state.stencil.func, StencilFunc::Always);
            assert_eq!(state.stencil.reference, 1);
            assert_eq!(state.stencil.pass, StencilOp::Replace);
            assert_eq!(state.clear_stencil, 0);
        }

        let state = renderer.state();
        assert!(state.color_write && state.depth_write);
        assert!(state.stencil.enabled);
        assert_eq!(state.stencil.func, StencilFunc::Equal);
        assert_eq!(state.stencil.reference, 1);
        assert_eq!(state.stencil.pass, StencilOp::Keep);
        assert_eq!(Pass::<HeadlessRenderer>::role(&pass), PassRole::MaskSet);
    }

    #[test]
    fn test_inverse_mask_swaps_values() {
        let (mut renderer, write, read) = setup();
        let mut pass = MaskPass::<HeadlessRenderer>::inverted(Rc::from("mask"), Rc::from("camera"));
        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();

        let RenderCommand::Scene { state, .. } = renderer.draws().next().unwrap().clone() else {
            panic!("expected a scene render");
        };
        assert_eq!(state.stencil.reference, 0);
        assert_eq!(state.clear_stencil, 1);
    }

    #[test]
    fn test_clear_mask_disables_stencil() {
        let (mut renderer, write, read) = setup();
        renderer.set_stencil_test(true);

        let mut pass = ClearMaskPass::new();
        pass.render(&mut renderer, &write, &read, 0.0, true).unwrap();
        assert!(!renderer.state().stencil.enabled);
        assert_eq!(renderer.draw_count(), 0);
        assert_eq!(Pass::<HeadlessRenderer>::role(&pass), PassRole::MaskClear);
    }
}
