//! Effect composer for managing the post-processing pipeline.

use super::config::ComposerConfig;
use super::effects::ShaderPass;
use super::pass::{Pass, PassRole};
use crate::core::{ComposerError, PassError, RenderError, Renderer, StencilFunc};
use crate::shaders::ShaderLibrary;
use crate::texture::{clamp_dimension, RenderTarget, RenderTargetDescriptor};

/// Runs a chain of post-processing passes over two ping-pong targets.
///
/// Every frame starts writing into target A and reading from target B.
/// Passes that need a swap exchange the two afterwards, so each pass reads
/// what the previous one wrote.
pub struct EffectComposer<R: Renderer> {
    renderer: R,
    /// Ping-pong render targets A and B.
    targets: [RenderTarget; 2],
    /// Index of the current write buffer in `targets`.
    write_index: usize,
    /// Render passes in order.
    passes: Vec<Box<dyn Pass<R>>>,
    /// Restores the unmasked region when swapping inside a mask.
    copy_pass: ShaderPass,
}

impl<R: Renderer> EffectComposer<R> {
    /// Create a composer with targets matching the renderer's display size.
    pub fn new(mut renderer: R, library: &ShaderLibrary) -> Result<Self, PassError> {
        let copy_pass = ShaderPass::copy(library)?;
        let (width, height) = renderer.display_size();
        let target = renderer.create_render_target(&default_descriptor(width, height));
        Ok(Self::assemble(renderer, target, copy_pass))
    }

    /// Create a composer around a caller-created target A.
    ///
    /// Target B is created with the same descriptor.
    pub fn with_render_target(
        renderer: R,
        library: &ShaderLibrary,
        target: RenderTarget,
    ) -> Result<Self, PassError> {
        let copy_pass = ShaderPass::copy(library)?;
        Ok(Self::assemble(renderer, target, copy_pass))
    }

    /// Create a composer and its effect chain from a parsed configuration.
    pub fn from_config(
        mut renderer: R,
        library: &ShaderLibrary,
        config: &ComposerConfig,
    ) -> Result<Self, ComposerError> {
        config.validate()?;
        let copy_pass = ShaderPass::copy(library)?;

        let mut passes = Vec::with_capacity(config.effects.len());
        for effect in &config.effects {
            passes.push(effect.build(&mut renderer, library)?);
        }

        let descriptor = config.render_target.descriptor(renderer.display_size());
        let target = renderer.create_render_target(&descriptor);
        let mut composer = Self::assemble(renderer, target, copy_pass);
        composer.passes = passes;
        log::debug!("composer built with {} passes from config", composer.passes.len());
        Ok(composer)
    }

    fn assemble(mut renderer: R, target: RenderTarget, copy_pass: ShaderPass) -> Self {
        let target_b = renderer.create_render_target(target.descriptor());
        log::debug!(
            "composer targets {}x{} created",
            target.width(),
            target.height()
        );
        Self {
            renderer,
            targets: [target, target_b],
            write_index: 0,
            passes: Vec::new(),
            copy_pass,
        }
    }

    /// Append a pass to the chain.
    pub fn add_pass<P: Pass<R> + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    /// Insert a pass at `index`. Indices past the end append.
    pub fn insert_pass<P: Pass<R> + 'static>(&mut self, pass: P, index: usize) {
        let index = index.min(self.passes.len());
        self.passes.insert(index, Box::new(pass));
    }

    /// Remove the pass at `index` and hand it back.
    ///
    /// The pass keeps its auxiliary targets; dispose them through
    /// [`Pass::dispose`] with [`EffectComposer::renderer_mut`].
    pub fn remove_pass(&mut self, index: usize) -> Option<Box<dyn Pass<R>>> {
        (index < self.passes.len()).then(|| self.passes.remove(index))
    }

    /// Get a mutable pass by index.
    pub fn pass_mut(&mut self, index: usize) -> Option<&mut Box<dyn Pass<R>>> {
        self.passes.get_mut(index)
    }

    /// Passes in order.
    pub fn passes(&self) -> &[Box<dyn Pass<R>>] {
        &self.passes
    }

    /// Number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Exchange the write and read buffers.
    pub fn swap_buffers(&mut self) {
        self.write_index = 1 - self.write_index;
    }

    /// Run every enabled pass in order.
    ///
    /// The first failing pass aborts the frame and its error is returned.
    pub fn render(&mut self, delta_time: f32) -> Result<(), RenderError> {
        self.write_index = 0;
        let mut mask_active = false;

        for pass in &mut self.passes {
            if !pass.enabled() {
                continue;
            }

            let write = &self.targets[self.write_index];
            let read = &self.targets[1 - self.write_index];
            log::trace!("{} (mask {mask_active})", pass.name());
            pass.render(&mut self.renderer, write, read, delta_time, mask_active)?;

            if pass.state().needs_swap {
                if mask_active {
                    // keep the previous image outside the mask
                    self.renderer.set_stencil_func(StencilFunc::NotEqual, 1, 0xffff_ffff);
                    Pass::<R>::render(
                        &mut self.copy_pass,
                        &mut self.renderer,
                        write,
                        read,
                        delta_time,
                        false,
                    )?;
                    self.renderer.set_stencil_func(StencilFunc::Equal, 1, 0xffff_ffff);
                }
                self.write_index = 1 - self.write_index;
            }

            match pass.role() {
                PassRole::MaskSet => mask_active = true,
                PassRole::MaskClear => mask_active = false,
                PassRole::Normal => {}
            }
        }
        Ok(())
    }

    /// Replace both targets.
    ///
    /// Adopts `target` as the new target A, or creates one like the current
    /// A sized to the display. B is recreated with A's descriptor and the
    /// old targets are released.
    pub fn reset(&mut self, target: Option<RenderTarget>) {
        let target_a = match target {
            Some(target) => target,
            None => {
                let (width, height) = self.renderer.display_size();
                let descriptor = self.targets[0].descriptor().with_size(width, height);
                self.renderer.create_render_target(&descriptor)
            }
        };
        let target_b = self.renderer.create_render_target(target_a.descriptor());

        let old = std::mem::replace(&mut self.targets, [target_a, target_b]);
        for target in old {
            self.renderer.dispose_render_target(target);
        }
        self.write_index = 0;
    }

    /// Resize both targets and every pass.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let width = clamp_dimension(width, "width");
        let height = clamp_dimension(height, "height");
        let descriptor = self.targets[0].descriptor().with_size(width, height);
        let target = self.renderer.create_render_target(&descriptor);
        self.reset(Some(target));

        for pass in &mut self.passes {
            pass.resize(&mut self.renderer, width, height);
        }
        log::info!("composer resized to {width}x{height}");
    }

    /// Current write buffer.
    pub fn write_buffer(&self) -> &RenderTarget {
        &self.targets[self.write_index]
    }

    /// Current read buffer.
    pub fn read_buffer(&self) -> &RenderTarget {
        &self.targets[1 - self.write_index]
    }

    /// Target A.
    pub fn render_target_a(&self) -> &RenderTarget {
        &self.targets[0]
    }

    /// Target B.
    pub fn render_target_b(&self) -> &RenderTarget {
        &self.targets[1]
    }

    /// Size of the targets.
    pub fn size(&self) -> (u32, u32) {
        (self.targets[0].width(), self.targets[0].height())
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Dispose every pass and empty the chain. The targets stay usable.
    pub fn dispose(&mut self) {
        for mut pass in self.passes.drain(..) {
            pass.dispose(&mut self.renderer);
        }
        Pass::<R>::dispose(&mut self.copy_pass, &mut self.renderer);
    }

    /// Release every pass and both targets and hand back the renderer.
    pub fn into_renderer(mut self) -> R {
        self.dispose();
        let Self {
            mut renderer,
            targets,
            ..
        } = self;
        for target in targets {
            renderer.dispose_render_target(target);
        }
        renderer
    }
}

/// Descriptor of the composer's default targets.
pub(crate) fn default_descriptor(width: u32, height: u32) -> RenderTargetDescriptor {
    RenderTargetDescriptor::new(width, height).with_stencil(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, Id, RenderCommand};
    use crate::postprocessing::effects::{
        BloomPass, BokehPass, BokehSettings, ClearMaskPass, MaskPass, RenderPass,
    };
    use crate::postprocessing::pass::PassState;
    use crate::texture::{FilterMode, PixelFormat};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Seen = Rc<RefCell<Vec<(Id, Id, bool)>>>;

    /// Records the buffers and mask flag it is rendered with.
    struct Probe {
        state: PassState,
        seen: Seen,
    }

    impl Probe {
        fn new(needs_swap: bool) -> (Self, Seen) {
            let seen = Seen::default();
            let probe = Self {
                state: PassState {
                    needs_swap,
                    ..Default::default()
                },
                seen: seen.clone(),
            };
            (probe, seen)
        }
    }

    impl<R: Renderer> Pass<R> for Probe {
        fn name(&self) -> &str {
            "Probe"
        }

        fn state(&self) -> &PassState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut PassState {
            &mut self.state
        }

        fn render(
            &mut self,
            _renderer: &mut R,
            write: &RenderTarget,
            read: &RenderTarget,
            _delta_time: f32,
            mask_active: bool,
        ) -> Result<(), RenderError> {
            self.seen.borrow_mut().push((write.id(), read.id(), mask_active));
            Ok(())
        }
    }

    fn composer(width: u32, height: u32) -> (EffectComposer<HeadlessRenderer>, ShaderLibrary) {
        let library = ShaderLibrary::builtin();
        let composer = EffectComposer::new(HeadlessRenderer::new(width, height), &library).unwrap();
        (composer, library)
    }

    fn copy_to_screen(library: &ShaderLibrary) -> ShaderPass {
        let mut copy = ShaderPass::copy(library).unwrap();
        Pass::<HeadlessRenderer>::state_mut(&mut copy).render_to_screen = true;
        copy
    }

    #[test]
    fn test_default_targets() {
        let library = ShaderLibrary::builtin();
        let renderer = HeadlessRenderer::new(200, 101).with_pixel_ratio(2.0);
        let composer = EffectComposer::new(renderer, &library).unwrap();
        assert_eq!(composer.size(), (100, 50));

        let a = composer.render_target_a().descriptor();
        assert!(a.stencil_buffer);
        assert!(a.depth_buffer);
        assert_eq!(a.min_filter, FilterMode::Linear);
        assert_eq!(a.format, PixelFormat::Rgba);
        assert_eq!(composer.render_target_b().descriptor(), a);
        assert_ne!(composer.render_target_a().id(), composer.render_target_b().id());
        assert_eq!(composer.write_buffer().id(), composer.render_target_a().id());
        assert_eq!(composer.read_buffer().id(), composer.render_target_b().id());
    }

    #[test]
    fn test_missing_copy_shader() {
        let err = EffectComposer::new(HeadlessRenderer::new(4, 4), &ShaderLibrary::new()).err();
        assert!(matches!(err, Some(PassError::MissingDependency { pass: "ShaderPass", .. })));
    }

    #[test]
    fn test_swap_parity() {
        for count in 0..5 {
            let (mut composer, library) = composer(8, 8);
            for _ in 0..count {
                composer.add_pass(ShaderPass::copy(&library).unwrap());
            }
            composer.render(0.016).unwrap();

            let read_is_a = composer.read_buffer().id() == composer.render_target_a().id();
            assert_eq!(read_is_a, count % 2 == 1, "{count} passes");
            assert_eq!(composer.renderer().draw_count(), count);
        }
    }

    #[test]
    fn test_each_frame_starts_writing_a() {
        let (mut composer, _) = composer(8, 8);
        let (probe, seen) = Probe::new(true);
        composer.add_pass(probe);
        let a = composer.render_target_a().id();
        let b = composer.render_target_b().id();

        composer.render(0.016).unwrap();
        composer.render(0.016).unwrap();
        assert_eq!(*seen.borrow(), [(a, b, false), (a, b, false)]);
    }

    #[test]
    fn test_disabled_pass_is_skipped() {
        let (mut composer, library) = composer(8, 8);
        composer.add_pass(ShaderPass::copy(&library).unwrap());
        composer.pass_mut(0).unwrap().set_enabled(false);
        composer.render(0.016).unwrap();

        assert_eq!(composer.renderer().draw_count(), 0);
        assert_eq!(composer.write_buffer().id(), composer.render_target_a().id());
    }

    #[test]
    fn test_insert_and_remove() {
        let (mut composer, library) = composer(8, 8);
        composer.add_pass(ClearMaskPass::new());
        composer.insert_pass(ShaderPass::copy(&library).unwrap(), 0);
        composer.insert_pass(Probe::new(false).0, 99);

        let names: Vec<_> = composer.passes().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["copy", "ClearMaskPass", "Probe"]);

        let removed = composer.remove_pass(1).unwrap();
        assert_eq!(removed.name(), "ClearMaskPass");
        assert!(composer.remove_pass(5).is_none());
        assert_eq!(composer.pass_count(), 2);
    }

    #[test]
    fn test_reset_adopts_new_target() {
        let (mut composer, _) = composer(8, 8);
        let (probe, seen) = Probe::new(true);
        composer.add_pass(probe);
        let old = [composer.render_target_a().id(), composer.render_target_b().id()];

        let target = composer
            .renderer_mut()
            .create_render_target(&RenderTargetDescriptor::new(10, 20));
        let new_a = target.id();
        composer.reset(Some(target));
        composer.render(0.016).unwrap();

        assert_eq!(composer.render_target_a().id(), new_a);
        for target in [composer.render_target_a(), composer.render_target_b()] {
            assert_eq!((target.width(), target.height()), (10, 20));
        }
        assert_eq!(seen.borrow()[0].0, new_a);
        let renderer = composer.renderer();
        assert!(old.iter().all(|id| !renderer.is_live(*id)));
        assert_eq!(renderer.live_target_count(), 2);
    }

    #[test]
    fn test_reset_without_target_follows_display() {
        let (mut composer, _) = composer(8, 8);
        composer.renderer_mut().set_drawing_buffer_size(30, 12);
        composer.reset(None);
        assert_eq!(composer.size(), (30, 12));
        assert!(composer.render_target_b().descriptor().stencil_buffer);
    }

    #[test]
    fn test_set_size_resizes_targets_and_passes() {
        let (mut composer, library) = composer(16, 16);
        let renderer = composer.renderer_mut();
        let bokeh = BokehPass::new(
            renderer,
            &library,
            Rc::from("scene"),
            Rc::from("camera"),
            BokehSettings::default(),
        )
        .unwrap();
        composer.add_pass(bokeh);

        composer.set_size(64, 0);
        assert_eq!(composer.size(), (64, 1));
        let b = composer.render_target_b();
        assert_eq!((b.width(), b.height()), (64, 1));
        // two composer targets and the resized depth target
        assert_eq!(composer.renderer().live_target_count(), 3);
        let depth_sizes: Vec<_> = composer
            .renderer()
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::CreateTarget { descriptor, .. } => Some((descriptor.width, descriptor.height)),
                _ => None,
            })
            .collect();
        assert_eq!(depth_sizes.last(), Some(&(64, 1)));
    }

    #[test]
    fn test_render_bloom_copy_scenario() {
        let (mut composer, library) = composer(32, 32);
        composer.add_pass(RenderPass::new(Rc::from("scene"), Rc::from("camera")));
        let bloom = BloomPass::new(composer.renderer_mut(), &library).unwrap();
        composer.add_pass(bloom);
        composer.add_pass(copy_to_screen(&library));

        composer.render(0.016).unwrap();
        let renderer = composer.renderer();
        let scenes = renderer
            .draws()
            .filter(|c| matches!(c, RenderCommand::Scene { .. }))
            .count();
        let convolutions = renderer
            .draws()
            .filter(|c| matches!(c, RenderCommand::Fullscreen { material, .. } if material == "convolution"))
            .count();
        assert_eq!(scenes, 1);
        assert_eq!(convolutions, 2);
        assert_eq!(renderer.draw_count(), 5);
        assert_eq!(
            renderer.draws().filter(|c| c.destination() == Some(Destination::Screen)).count(),
            1
        );
        assert!(!renderer.commands().iter().any(RenderCommand::is_stencil));
    }

    #[test]
    fn test_masked_scenario() {
        let (mut composer, library) = composer(32, 32);
        let scene: Rc<str> = Rc::from("scene");
        let camera: Rc<str> = Rc::from("camera");
        composer.add_pass(RenderPass::new(scene.clone(), camera.clone()));
        composer.add_pass(MaskPass::new(scene, camera.clone()));
        let mut inner = RenderPass::new(Rc::from("inverse"), camera);
        Pass::<HeadlessRenderer>::state_mut(&mut inner).clear = false;
        composer.add_pass(inner);
        composer.add_pass(ClearMaskPass::new());
        let (probe, seen) = Probe::new(false);
        composer.add_pass(probe);
        composer.add_pass(copy_to_screen(&library));

        composer.render(0.016).unwrap();
        let commands = composer.renderer().commands();
        let enabled_at = commands
            .iter()
            .position(|c| *c == RenderCommand::StencilTest(true))
            .unwrap();
        let inner_at = commands
            .iter()
            .position(|c| matches!(c, RenderCommand::Scene { scene, .. } if scene == "inverse"))
            .unwrap();
        let disabled_at = commands
            .iter()
            .position(|c| *c == RenderCommand::StencilTest(false))
            .unwrap();
        assert!(enabled_at < inner_at);
        assert!(inner_at < disabled_at);

        let RenderCommand::Scene { state, .. } = &commands[inner_at] else {
            unreachable!();
        };
        assert!(state.stencil.enabled);
        assert_eq!(state.stencil.func, StencilFunc::Equal);

        assert_eq!(seen.borrow()[0].2, false);
        let RenderCommand::Fullscreen { destination, state, .. } = commands.last().unwrap() else {
            panic!("expected the screen copy last");
        };
        assert_eq!(*destination, Destination::Screen);
        assert!(!state.stencil.enabled);
    }

    #[test]
    fn test_swap_inside_mask_copies_outside_region() {
        let (mut composer, library) = composer(16, 16);
        composer.add_pass(MaskPass::new(Rc::from("mask"), Rc::from("camera")));
        let (probe, seen) = Probe::new(true);
        composer.add_pass(probe);
        composer.add_pass(ClearMaskPass::new());
        let a = composer.render_target_a().id();
        let b = composer.render_target_b().id();

        composer.renderer_mut().take_commands();
        composer.render(0.016).unwrap();
        assert_eq!(*seen.borrow(), [(a, b, true)]);

        let commands = composer.renderer().commands();
        let copy_at = commands
            .iter()
            .position(|c| matches!(c, RenderCommand::Fullscreen { .. }))
            .unwrap();
        assert_eq!(
            commands[copy_at - 1],
            RenderCommand::StencilFunc {
                func: StencilFunc::NotEqual,
                reference: 1,
                mask: 0xffff_ffff,
            }
        );
        assert_eq!(
            commands[copy_at + 1],
            RenderCommand::StencilFunc {
                func: StencilFunc::Equal,
                reference: 1,
                mask: 0xffff_ffff,
            }
        );
        let RenderCommand::Fullscreen { destination, uniforms, .. } = &commands[copy_at] else {
            unreachable!();
        };
        assert_eq!(*destination, Destination::Target(a));
        assert_eq!(uniforms.texture("tDiffuse").map(|t| t.id()), Some(b));
        assert_eq!(composer.read_buffer().id(), a);
    }

    #[test]
    fn test_failing_pass_aborts_frame() {
        let (mut composer, library) = composer(8, 8);
        composer.add_pass(ShaderPass::copy(&library).unwrap());
        composer.add_pass(ShaderPass::copy(&library).unwrap());
        let (probe, seen) = Probe::new(true);
        composer.add_pass(probe);
        composer.renderer_mut().fail_after(1);

        let err = composer.render(0.016).unwrap_err();
        assert!(matches!(err, RenderError::Backend(_)));
        assert_eq!(composer.renderer().draw_count(), 1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_into_renderer_releases_everything() {
        let (mut composer, library) = composer(8, 8);
        let bloom = BloomPass::new(composer.renderer_mut(), &library).unwrap();
        composer.add_pass(bloom);
        assert_eq!(composer.renderer().live_target_count(), 4);

        composer.dispose();
        assert_eq!(composer.pass_count(), 0);
        assert_eq!(composer.renderer().live_target_count(), 2);

        let renderer = composer.into_renderer();
        assert_eq!(renderer.live_target_count(), 0);
    }
}
