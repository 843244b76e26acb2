//! A renderer without a GPU.
//!
//! [`HeadlessRenderer`] keeps the same bookkeeping a real backend does
//! (live render targets, stencil and write-mask state, clear color) and
//! records every call as a [`RenderCommand`]. Scenes, cameras and override
//! materials are plain names.

use super::{
    GpuState, Id, OverrideMaterial, RenderDestination, RenderError, RenderInfo, Renderer,
    StencilFunc, StencilOp,
};
use crate::material::{Blending, ShaderMaterial, Uniforms};
use crate::math::Color;
use crate::texture::{RenderTarget, RenderTargetDescriptor, TextureSource};
use std::collections::HashMap;

/// Owned form of a [`RenderDestination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The display surface.
    Screen,
    /// A render target.
    Target(Id),
}

impl From<RenderDestination<'_>> for Destination {
    fn from(destination: RenderDestination<'_>) -> Self {
        match destination {
            RenderDestination::Screen => Destination::Screen,
            RenderDestination::Target(target) => Destination::Target(target.id()),
        }
    }
}

/// Owned form of an [`OverrideMaterial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOverride {
    /// Depth material.
    Depth,
    /// Named host material.
    Custom(String),
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// A render target was allocated.
    CreateTarget {
        /// Target id.
        id: Id,
        /// Descriptor it was created from.
        descriptor: RenderTargetDescriptor,
    },
    /// A render target was released.
    DisposeTarget(Id),
    /// A scene render.
    Scene {
        /// Scene name.
        scene: String,
        /// Camera name.
        camera: String,
        /// Destination.
        destination: Destination,
        /// Whether the destination was cleared first.
        clear: bool,
        /// Material override.
        override_material: Option<RecordedOverride>,
        /// Fixed-function state at draw time.
        state: GpuState,
    },
    /// A full-screen draw.
    Fullscreen {
        /// Material (shader definition) name.
        material: String,
        /// Destination.
        destination: Destination,
        /// Whether the destination was cleared first.
        clear: bool,
        /// Uniform values at draw time.
        uniforms: Uniforms,
        /// Blend mode.
        blending: Blending,
        /// Fixed-function state at draw time.
        state: GpuState,
    },
    /// `set_stencil_test`.
    StencilTest(bool),
    /// `set_stencil_func`.
    StencilFunc {
        /// Comparison.
        func: StencilFunc,
        /// Reference value.
        reference: u32,
        /// Read mask.
        mask: u32,
    },
    /// `set_stencil_op`.
    StencilOp {
        /// Stencil fail.
        fail: StencilOp,
        /// Depth fail.
        depth_fail: StencilOp,
        /// Both pass.
        pass: StencilOp,
    },
    /// `set_clear_stencil`.
    ClearStencil(u32),
    /// `set_color_mask`.
    ColorMask(bool),
    /// `set_depth_mask`.
    DepthMask(bool),
    /// `set_clear_color`.
    ClearColor(Color, f32),
}

impl RenderCommand {
    /// Whether the command is a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, RenderCommand::Scene { .. } | RenderCommand::Fullscreen { .. })
    }

    /// Whether the command touches stencil state.
    pub fn is_stencil(&self) -> bool {
        matches!(
            self,
            RenderCommand::StencilTest(_)
                | RenderCommand::StencilFunc { .. }
                | RenderCommand::StencilOp { .. }
                | RenderCommand::ClearStencil(_)
        )
    }

    /// Destination of a draw.
    pub fn destination(&self) -> Option<Destination> {
        match self {
            RenderCommand::Scene { destination, .. }
            | RenderCommand::Fullscreen { destination, .. } => Some(*destination),
            _ => None,
        }
    }
}

/// Recording renderer backend.
#[derive(Debug)]
pub struct HeadlessRenderer {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    targets: HashMap<Id, RenderTargetDescriptor>,
    state: GpuState,
    clear_color: (Color, f32),
    commands: Vec<RenderCommand>,
    info: RenderInfo,
    fail_after: Option<u32>,
}

impl HeadlessRenderer {
    /// Create a renderer with a `width x height` drawing buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            targets: HashMap::new(),
            state: GpuState::default(),
            clear_color: (Color::BLACK, 1.0),
            commands: Vec::new(),
            info: RenderInfo::default(),
            fail_after: None,
        }
    }

    /// Set the device pixel ratio.
    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Change the drawing buffer size, as a window resize would.
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Make every draw after the next `draws` fail.
    pub fn fail_after(&mut self, draws: u32) {
        self.fail_after = Some(self.info.draw_calls + draws);
    }

    /// Recorded commands.
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draws.
    pub fn draws(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter().filter(|c| c.is_draw())
    }

    /// Number of recorded draws.
    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    /// Render statistics.
    pub fn info(&self) -> &RenderInfo {
        &self.info
    }

    /// Current fixed-function state.
    pub fn state(&self) -> &GpuState {
        &self.state
    }

    /// Whether a target is alive.
    pub fn is_live(&self, id: Id) -> bool {
        self.targets.contains_key(&id)
    }

    /// Number of live targets.
    pub fn live_target_count(&self) -> usize {
        self.targets.len()
    }

    /// Descriptor of a live target.
    pub fn target_descriptor(&self, id: Id) -> Option<&RenderTargetDescriptor> {
        self.targets.get(&id)
    }

    fn check_destination(&self, destination: RenderDestination<'_>) -> Result<(), RenderError> {
        match destination.target_id() {
            Some(id) if !self.is_live(id) => Err(RenderError::UnknownRenderTarget(id)),
            _ => Ok(()),
        }
    }

    fn begin_draw(&mut self) -> Result<(), RenderError> {
        if let Some(limit) = self.fail_after {
            if self.info.draw_calls >= limit {
                return Err(RenderError::Backend(format!(
                    "injected failure after {limit} draws"
                )));
            }
        }
        self.info.draw_calls += 1;
        Ok(())
    }
}

impl Renderer for HeadlessRenderer {
    type Scene = str;
    type Camera = str;
    type Material = str;

    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> RenderTarget {
        let target = RenderTarget::new(*descriptor);
        log::debug!(
            "created render target {} ({}x{})",
            target.id(),
            descriptor.width,
            descriptor.height
        );
        self.targets.insert(target.id(), *descriptor);
        self.info.live_targets = self.targets.len() as u32;
        self.commands.push(RenderCommand::CreateTarget {
            id: target.id(),
            descriptor: *descriptor,
        });
        target
    }

    fn dispose_render_target(&mut self, target: RenderTarget) {
        if self.targets.remove(&target.id()).is_none() {
            log::warn!("render target {} disposed twice", target.id());
        }
        self.info.live_targets = self.targets.len() as u32;
        self.commands.push(RenderCommand::DisposeTarget(target.id()));
    }

    fn render_scene(
        &mut self,
        scene: &str,
        camera: &str,
        destination: RenderDestination<'_>,
        clear: bool,
        override_material: Option<OverrideMaterial<'_, str>>,
    ) -> Result<(), RenderError> {
        self.check_destination(destination)?;
        self.begin_draw()?;
        self.info.scene_renders += 1;

        self.commands.push(RenderCommand::Scene {
            scene: scene.to_string(),
            camera: camera.to_string(),
            destination: destination.into(),
            clear,
            override_material: override_material.map(|m| match m {
                OverrideMaterial::Depth => RecordedOverride::Depth,
                OverrideMaterial::Custom(name) => RecordedOverride::Custom(name.to_string()),
            }),
            state: self.state,
        });
        Ok(())
    }

    fn render_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        destination: RenderDestination<'_>,
        clear: bool,
    ) -> Result<(), RenderError> {
        self.check_destination(destination)?;
        for (_, texture) in material.uniforms.textures() {
            if let Some(TextureSource::RenderTarget(id)) = texture {
                if !self.is_live(*id) {
                    return Err(RenderError::UnknownRenderTarget(*id));
                }
            }
        }
        self.begin_draw()?;
        self.info.fullscreen_draws += 1;
        self.info.triangles += 2;

        log::trace!("fullscreen `{}` -> {:?}", material.name(), destination.target_id());
        self.commands.push(RenderCommand::Fullscreen {
            material: material.name().to_string(),
            destination: destination.into(),
            clear,
            uniforms: material.uniforms.clone(),
            blending: material.blending,
            state: self.state,
        });
        Ok(())
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.state.stencil.enabled = enabled;
        self.commands.push(RenderCommand::StencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: StencilFunc, reference: u32, mask: u32) {
        self.state.stencil.func = func;
        self.state.stencil.reference = reference;
        self.state.stencil.read_mask = mask;
        self.commands.push(RenderCommand::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.state.stencil.fail = fail;
        self.state.stencil.depth_fail = depth_fail;
        self.state.stencil.pass = pass;
        self.commands.push(RenderCommand::StencilOp {
            fail,
            depth_fail,
            pass,
        });
    }

    fn set_clear_stencil(&mut self, value: u32) {
        self.state.clear_stencil = value;
        self.commands.push(RenderCommand::ClearStencil(value));
    }

    fn set_color_mask(&mut self, write: bool) {
        self.state.color_write = write;
        self.commands.push(RenderCommand::ColorMask(write));
    }

    fn set_depth_mask(&mut self, write: bool) {
        self.state.depth_write = write;
        self.commands.push(RenderCommand::DepthMask(write));
    }

    fn clear_color(&self) -> (Color, f32) {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: Color, alpha: f32) {
        self.clear_color = (color, alpha);
        self.commands.push(RenderCommand::ClearColor(color, alpha));
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::ShaderDefinition;
    use crate::shaders::{ShaderLibrary, COPY_SHADER};

    fn copy_material() -> ShaderMaterial {
        let library = ShaderLibrary::builtin();
        let def: &ShaderDefinition = library.get(COPY_SHADER).unwrap();
        ShaderMaterial::from_definition(def)
    }

    #[test]
    fn test_target_lifecycle() {
        let mut r = HeadlessRenderer::new(8, 8);
        let target = r.create_render_target(&RenderTargetDescriptor::new(4, 2));
        let id = target.id();
        assert!(r.is_live(id));
        assert_eq!(r.target_descriptor(id).map(|d| d.height), Some(2));
        r.dispose_render_target(target);
        assert!(!r.is_live(id));
        assert_eq!(r.info().live_targets, 0);
    }

    #[test]
    fn test_draw_into_disposed_target_fails() {
        let mut r = HeadlessRenderer::new(8, 8);
        let target = r.create_render_target(&RenderTargetDescriptor::new(4, 4));
        let stale = RenderTarget::new(*target.descriptor());
        let err = r
            .render_fullscreen(&copy_material(), RenderDestination::Target(&stale), false)
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownRenderTarget(id) if id == stale.id()));
        assert_eq!(r.draw_count(), 0);
    }

    #[test]
    fn test_fail_after() {
        let mut r = HeadlessRenderer::new(8, 8);
        r.fail_after(1);
        let material = copy_material();
        assert!(r.render_fullscreen(&material, RenderDestination::Screen, false).is_ok());
        assert!(matches!(
            r.render_fullscreen(&material, RenderDestination::Screen, false),
            Err(RenderError::Backend(_))
        ));
    }

    #[test]
    fn test_state_is_snapshotted_per_draw() {
        let mut r = HeadlessRenderer::new(8, 8);
        r.set_stencil_test(true);
        r.set_stencil_func(StencilFunc::Equal, 1, 0xffff_ffff);
        r.render_scene("scene", "camera", RenderDestination::Screen, true, Some(OverrideMaterial::Depth))
            .unwrap();
        match &r.draws().next().unwrap() {
            RenderCommand::Scene {
                state,
                override_material,
                ..
            } => {
                assert!(state.stencil.enabled);
                assert_eq!(state.stencil.func, StencilFunc::Equal);
                assert_eq!(override_material, &Some(RecordedOverride::Depth));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(r.commands().iter().filter(|c| c.is_stencil()).count(), 2);
    }

    #[test]
    fn test_display_size_uses_pixel_ratio() {
        let r = HeadlessRenderer::new(801, 600).with_pixel_ratio(2.0);
        assert_eq!(r.display_size(), (400, 300));
        let tiny = HeadlessRenderer::new(1, 1).with_pixel_ratio(2.0);
        assert_eq!(tiny.display_size(), (1, 1));
    }
}
