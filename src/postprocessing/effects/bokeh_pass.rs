//! Depth-of-field post-process with a bokeh shader.

use crate::core::{OverrideMaterial, PassError, RenderDestination, RenderError, Renderer};
use crate::material::ShaderMaterial;
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, BOKEH_SHADER};
use crate::texture::{PixelFormat, RenderTarget, RenderTargetDescriptor};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Bokeh settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BokehSettings {
    /// Focal distance in normalized depth.
    pub focus: f32,
    /// Aperture size.
    pub aperture: f32,
    /// Maximum blur radius.
    pub maxblur: f32,
    /// Aspect ratio. Follows the depth target when unset.
    pub aspect: Option<f32>,
    /// Depth target width. The display width when unset.
    pub width: Option<u32>,
    /// Depth target height. The display height when unset.
    pub height: Option<u32>,
}

impl Default for BokehSettings {
    fn default() -> Self {
        Self {
            focus: 1.0,
            aperture: 0.025,
            maxblur: 1.0,
            aspect: None,
            width: None,
            height: None,
        }
    }
}

/// Renders scene depth, then blurs the read buffer according to each
/// pixel's distance from the focal plane.
pub struct BokehPass<R: Renderer> {
    state: PassState,
    settings: BokehSettings,
    scene: Rc<R::Scene>,
    camera: Rc<R::Camera>,
    render_target_depth: Option<RenderTarget>,
    material: ShaderMaterial,
}

impl<R: Renderer> BokehPass<R> {
    /// Create a bokeh pass for `scene` seen through `camera`.
    pub fn new(
        renderer: &mut R,
        library: &ShaderLibrary,
        scene: Rc<R::Scene>,
        camera: Rc<R::Camera>,
        settings: BokehSettings,
    ) -> Result<Self, PassError> {
        let definition = library.require(BOKEH_SHADER, "BokehPass")?;

        let (display_width, display_height) = renderer.display_size();
        let width = settings.width.unwrap_or(display_width).max(1);
        let height = settings.height.unwrap_or(display_height).max(1);

        let mut material = ShaderMaterial::from_definition(definition);
        let uniforms = &mut material.uniforms;
        uniforms.set("focus", settings.focus);
        uniforms.set("aperture", settings.aperture);
        uniforms.set("maxblur", settings.maxblur);
        uniforms.set("aspect", settings.aspect.unwrap_or(width as f32 / height as f32));

        let depth = renderer.create_render_target(&depth_descriptor(width, height));
        material.uniforms.set_texture("tDepth", Some(depth.texture()));

        Ok(Self {
            state: PassState::in_place(),
            settings,
            scene,
            camera,
            render_target_depth: Some(depth),
            material,
        })
    }

    /// Get settings.
    pub fn settings(&self) -> &BokehSettings {
        &self.settings
    }

    /// Set the focal distance.
    pub fn set_focus(&mut self, focus: f32) {
        self.settings.focus = focus;
        self.material.uniforms.set("focus", focus);
    }

    /// Set the aperture.
    pub fn set_aperture(&mut self, aperture: f32) {
        self.settings.aperture = aperture;
        self.material.uniforms.set("aperture", aperture);
    }

    /// Set the maximum blur.
    pub fn set_maxblur(&mut self, maxblur: f32) {
        self.settings.maxblur = maxblur;
        self.material.uniforms.set("maxblur", maxblur);
    }

    /// The depth target.
    pub fn depth_target(&self) -> Option<&RenderTarget> {
        self.render_target_depth.as_ref()
    }
}

fn depth_descriptor(width: u32, height: u32) -> RenderTargetDescriptor {
    RenderTargetDescriptor::new(width, height).with_format(PixelFormat::Rgb)
}

impl<R: Renderer> Pass<R> for BokehPass<R> {
    fn name(&self) -> &str {
        "BokehPass"
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
        let Some(depth) = &self.render_target_depth else {
            log::warn!("BokehPass rendered after dispose; skipping");
            return Ok(());
        };

        renderer.render_scene(
            &self.scene,
            &self.camera,
            RenderDestination::Target(depth),
            true,
            Some(OverrideMaterial::Depth),
        )?;

        self.material.uniforms.set_texture("tColor", Some(read.texture()));
        renderer.render_fullscreen(&self.material, self.state.destination(write), self.state.clear)
    }

    fn resize(&mut self, renderer: &mut R, width: u32, height: u32) {
        if self.settings.width.is_some() || self.settings.height.is_some() {
            return;
        }

        if let Some(old) = self.render_target_depth.take() {
            renderer.dispose_render_target(old);
        }
        let depth = renderer.create_render_target(&depth_descriptor(width, height));
        self.material.uniforms.set_texture("tDepth", Some(depth.texture()));
        if self.settings.aspect.is_none() {
            self.material
                .uniforms
                .set("aspect", width as f32 / height.max(1) as f32);
        }
        self.render_target_depth = Some(depth);
    }

    fn dispose(&mut self, renderer: &mut R) {
        if let Some(depth) = self.render_target_depth.take() {
            renderer.dispose_render_target(depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destination, HeadlessRenderer, RecordedOverride, RenderCommand};
    use crate::texture::TextureSource;

    fn bokeh(renderer: &mut HeadlessRenderer, settings: BokehSettings) -> BokehPass<HeadlessRenderer> {
        BokehPass::new(
            renderer,
            &ShaderLibrary::builtin(),
            Rc::from("scene"),
            Rc::from("camera"),
            settings,
        )
        .ok()
        .unwrap()
    }

    #[test]
    fn test_defaults_follow_display() {
        let mut renderer = HeadlessRenderer::new(200, 100).with_pixel_ratio(2.0);
        let pass = bokeh(&mut renderer, BokehSettings::default());
        let depth = pass.depth_target().unwrap();
        assert_eq!((depth.width(), depth.height()), (100, 50));
        assert_eq!(pass.material.uniforms.float("aspect"), Some(2.0));
        assert_eq!(pass.material.uniforms.float("aperture"), Some(0.025));
        assert!(!Pass::<HeadlessRenderer>::state(&pass).needs_swap);
    }

    #[test]
    fn test_depth_prepass_then_composite() {
        let mut renderer = HeadlessRenderer::new(16, 16);
        let write = renderer.create_render_target(&RenderTargetDescriptor::new(16, 16));
        let read = renderer.create_render_target(&RenderTargetDescriptor::new(16, 16));
        let mut pass = bokeh(&mut renderer, BokehSettings::default());
        let depth = pass.depth_target().unwrap().id();

        pass.render(&mut renderer, &write, &read, 0.0, false).unwrap();
        let draws: Vec<_> = renderer.draws().cloned().collect();
        assert_eq!(draws.len(), 2);
        assert!(matches!(
            &draws[0],
            RenderCommand::Scene {
                destination: Destination::Target(id),
                clear: true,
                override_material: Some(RecordedOverride::Depth),
                ..
            } if *id == depth
        ));
        let RenderCommand::Fullscreen { destination, uniforms, .. } = &draws[1] else {
            panic!("expected a fullscreen draw");
        };
        assert_eq!(*destination, Destination::Target(write.id()));
        assert_eq!(uniforms.texture("tColor"), Some(&TextureSource::RenderTarget(read.id())));
        assert_eq!(uniforms.texture("tDepth"), Some(&TextureSource::RenderTarget(depth)));
    }

    #[test]
    fn test_resize_recreates_depth_target() {
        let mut renderer = HeadlessRenderer::new(16, 16);
        let mut pass = bokeh(&mut renderer, BokehSettings::default());
        let old = pass.depth_target().unwrap().id();

        pass.resize(&mut renderer, 40, 20);
        let depth = pass.depth_target().unwrap();
        assert!(!renderer.is_live(old));
        assert_eq!((depth.width(), depth.height()), (40, 20));
        assert_eq!(pass.material.uniforms.float("aspect"), Some(2.0));

        pass.dispose(&mut renderer);
        assert_eq!(renderer.live_target_count(), 0);
    }

    #[test]
    fn test_explicit_size_is_kept_on_resize() {
        let mut renderer = HeadlessRenderer::new(16, 16);
        let mut pass = bokeh(
            &mut renderer,
            BokehSettings {
                width: Some(8),
                height: Some(8),
                aspect: Some(1.5),
                ..Default::default()
            },
        );
        pass.resize(&mut renderer, 40, 20);
        assert_eq!(pass.depth_target().unwrap().width(), 8);
        assert_eq!(pass.material.uniforms.float("aspect"), Some(1.5));
    }
}
