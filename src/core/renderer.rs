//! Renderer interface consumed by the composer and its passes.

use super::{Id, RenderError};
use crate::material::ShaderMaterial;
use crate::math::Color;
use crate::texture::{clamp_dimension, RenderTarget, RenderTargetDescriptor};

/// Render statistics accumulated by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderInfo {
    /// Number of draw calls.
    pub draw_calls: u32,
    /// Number of triangles rendered.
    pub triangles: u32,
    /// Number of scene renders.
    pub scene_renders: u32,
    /// Number of full-screen draws.
    pub fullscreen_draws: u32,
    /// Render targets currently alive.
    pub live_targets: u32,
}

impl RenderInfo {
    /// Reset the per-draw counters. Target bookkeeping is kept.
    pub fn reset(&mut self) {
        self.draw_calls = 0;
        self.triangles = 0;
        self.scene_renders = 0;
        self.fullscreen_draws = 0;
    }
}

/// Where a draw lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDestination<'a> {
    /// The display surface.
    Screen,
    /// An offscreen render target.
    Target(&'a RenderTarget),
}

impl<'a> RenderDestination<'a> {
    /// Screen when `to_screen` is set, `target` otherwise.
    #[inline]
    pub fn screen_or(to_screen: bool, target: &'a RenderTarget) -> Self {
        if to_screen {
            RenderDestination::Screen
        } else {
            RenderDestination::Target(target)
        }
    }

    /// Id of the target, `None` for the screen.
    pub fn target_id(&self) -> Option<Id> {
        match self {
            RenderDestination::Screen => None,
            RenderDestination::Target(target) => Some(target.id()),
        }
    }
}

/// Material replacing every scene material for one scene render.
#[derive(Debug)]
pub enum OverrideMaterial<'a, M: ?Sized> {
    /// Encode normalized view depth as color.
    Depth,
    /// A host material.
    Custom(&'a M),
}

impl<M: ?Sized> Clone for OverrideMaterial<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized> Copy for OverrideMaterial<'_, M> {}

/// Stencil comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilFunc {
    /// Never pass.
    Never,
    /// Pass if `ref < stencil`.
    Less,
    /// Pass if `ref == stencil`.
    Equal,
    /// Pass if `ref <= stencil`.
    LessEqual,
    /// Pass if `ref > stencil`.
    Greater,
    /// Pass if `ref != stencil`.
    NotEqual,
    /// Pass if `ref >= stencil`.
    GreaterEqual,
    /// Always pass.
    #[default]
    Always,
}

impl From<StencilFunc> for wgpu::CompareFunction {
    fn from(func: StencilFunc) -> Self {
        match func {
            StencilFunc::Never => wgpu::CompareFunction::Never,
            StencilFunc::Less => wgpu::CompareFunction::Less,
            StencilFunc::Equal => wgpu::CompareFunction::Equal,
            StencilFunc::LessEqual => wgpu::CompareFunction::LessEqual,
            StencilFunc::Greater => wgpu::CompareFunction::Greater,
            StencilFunc::NotEqual => wgpu::CompareFunction::NotEqual,
            StencilFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            StencilFunc::Always => wgpu::CompareFunction::Always,
        }
    }
}

/// Stencil update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    /// Keep the current value.
    #[default]
    Keep,
    /// Set to zero.
    Zero,
    /// Set to the reference value.
    Replace,
    /// Increment, clamping at the maximum.
    Increment,
    /// Decrement, clamping at zero.
    Decrement,
    /// Increment with wrap-around.
    IncrementWrap,
    /// Decrement with wrap-around.
    DecrementWrap,
    /// Bitwise invert.
    Invert,
}

impl From<StencilOp> for wgpu::StencilOperation {
    fn from(op: StencilOp) -> Self {
        match op {
            StencilOp::Keep => wgpu::StencilOperation::Keep,
            StencilOp::Zero => wgpu::StencilOperation::Zero,
            StencilOp::Replace => wgpu::StencilOperation::Replace,
            StencilOp::Increment => wgpu::StencilOperation::IncrementClamp,
            StencilOp::Decrement => wgpu::StencilOperation::DecrementClamp,
            StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
            StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
            StencilOp::Invert => wgpu::StencilOperation::Invert,
        }
    }
}

/// Stencil test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// Whether the stencil test runs.
    pub enabled: bool,
    /// Comparison function.
    pub func: StencilFunc,
    /// Reference value.
    pub reference: u32,
    /// Mask applied to both operands before comparing.
    pub read_mask: u32,
    /// Operation when the stencil test fails.
    pub fail: StencilOp,
    /// Operation when the stencil test passes and the depth test fails.
    pub depth_fail: StencilOp,
    /// Operation when both tests pass.
    pub pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            func: StencilFunc::Always,
            reference: 0,
            read_mask: 0xffff_ffff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

impl StencilState {
    /// Equivalent wgpu per-face state.
    pub fn face_state(&self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.func.into(),
            fail_op: self.fail.into(),
            depth_fail_op: self.depth_fail.into(),
            pass_op: self.pass.into(),
        }
    }
}

/// Fixed-function state applied to every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuState {
    /// Stencil test.
    pub stencil: StencilState,
    /// Value the stencil buffer is cleared to.
    pub clear_stencil: u32,
    /// Whether color channels are written.
    pub color_write: bool,
    /// Whether depth is written.
    pub depth_write: bool,
}

impl Default for GpuState {
    fn default() -> Self {
        Self {
            stencil: StencilState::default(),
            clear_stencil: 0,
            color_write: true,
            depth_write: true,
        }
    }
}

/// The host rendering engine as seen by the composer.
///
/// Backends own the GPU: they allocate render targets, draw host scenes and
/// full-screen [`ShaderMaterial`]s, and hold the stencil and write-mask state
/// that mask passes toggle between draws.
pub trait Renderer {
    /// Host scene type.
    type Scene: ?Sized;
    /// Host camera type.
    type Camera: ?Sized;
    /// Host material type, used for override renders.
    type Material: ?Sized;

    /// Allocate a render target.
    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> RenderTarget;

    /// Release a render target and its GPU memory.
    fn dispose_render_target(&mut self, target: RenderTarget);

    /// Render a scene, optionally replacing every material.
    fn render_scene(
        &mut self,
        scene: &Self::Scene,
        camera: &Self::Camera,
        destination: RenderDestination<'_>,
        clear: bool,
        override_material: Option<OverrideMaterial<'_, Self::Material>>,
    ) -> Result<(), RenderError>;

    /// Draw a full-screen quad with a shader material.
    fn render_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        destination: RenderDestination<'_>,
        clear: bool,
    ) -> Result<(), RenderError>;

    /// Enable or disable the stencil test.
    fn set_stencil_test(&mut self, enabled: bool);

    /// Set the stencil comparison.
    fn set_stencil_func(&mut self, func: StencilFunc, reference: u32, mask: u32);

    /// Set the stencil update operations.
    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);

    /// Set the value stencil clears write.
    fn set_clear_stencil(&mut self, value: u32);

    /// Enable or disable color writes.
    fn set_color_mask(&mut self, write: bool);

    /// Enable or disable depth writes.
    fn set_depth_mask(&mut self, write: bool);

    /// Current clear color and alpha.
    fn clear_color(&self) -> (Color, f32);

    /// Set the clear color and alpha.
    fn set_clear_color(&mut self, color: Color, alpha: f32);

    /// Size of the display surface in physical pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Physical pixels per logical pixel.
    fn pixel_ratio(&self) -> f32;

    /// Display size in logical pixels, each axis at least 1.
    fn display_size(&self) -> (u32, u32) {
        let (width, height) = self.drawing_buffer_size();
        let ratio = if self.pixel_ratio() > 0.0 { self.pixel_ratio() } else { 1.0 };
        (
            clamp_dimension((width as f32 / ratio).floor() as u32, "width"),
            clamp_dimension((height as f32 / ratio).floor() as u32, "height"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stencil_conversions() {
        assert_eq!(
            wgpu::CompareFunction::from(StencilFunc::NotEqual),
            wgpu::CompareFunction::NotEqual
        );
        assert_eq!(
            wgpu::StencilOperation::from(StencilOp::Replace),
            wgpu::StencilOperation::Replace
        );
        let face = StencilState::default().face_state();
        assert_eq!(face.compare, wgpu::CompareFunction::Always);
    }

    #[test]
    fn test_screen_or() {
        let target = RenderTarget::new(RenderTargetDescriptor::new(4, 4));
        assert_eq!(RenderDestination::screen_or(true, &target), RenderDestination::Screen);
        assert_eq!(
            RenderDestination::screen_or(false, &target).target_id(),
            Some(target.id())
        );
    }

    #[test]
    fn test_info_reset_keeps_targets() {
        let mut info = RenderInfo {
            draw_calls: 3,
            triangles: 6,
            scene_renders: 1,
            fullscreen_draws: 2,
            live_targets: 2,
        };
        info.reset();
        assert_eq!(info.draw_calls, 0);
        assert_eq!(info.live_targets, 2);
    }
}
