//! Renders the host scene into the read buffer.

use crate::core::{OverrideMaterial, RenderDestination, RenderError, Renderer};
use crate::math::Color;
use crate::postprocessing::pass::{Pass, PassState};
use crate::texture::RenderTarget;
use std::rc::Rc;

/// Renders a scene into the read buffer, usually as the first pass of a
/// chain.
///
/// An optional clear color replaces the renderer's for the duration of the
/// draw; the previous one is restored afterwards.
pub struct RenderPass<R: Renderer> {
    state: PassState,
    scene: Rc<R::Scene>,
    camera: Rc<R::Camera>,
    override_material: Option<Rc<R::Material>>,
    clear_color: Option<(Color, f32)>,
}

impl<R: Renderer> RenderPass<R> {
    /// Create a pass rendering `scene` through `camera`.
    pub fn new(scene: Rc<R::Scene>, camera: Rc<R::Camera>) -> Self {
        Self {
            state: PassState {
                clear: true,
                needs_swap: false,
                ..Default::default()
            },
            scene,
            camera,
            override_material: None,
            clear_color: None,
        }
    }

    /// Replace every scene material with `material`.
    pub fn with_override_material(mut self, material: Rc<R::Material>) -> Self {
        self.override_material = Some(material);
        self
    }

    /// Clear with `color` and `alpha` instead of the renderer's clear color.
    pub fn with_clear_color(mut self, color: Color, alpha: f32) -> Self {
        self.clear_color = Some((color, alpha));
        self
    }

    /// The rendered scene.
    pub fn scene(&self) -> &Rc<R::Scene> {
        &self.scene
    }

    /// The camera.
    pub fn camera(&self) -> &Rc<R::Camera> {
        &self.camera
    }

    /// Set or remove the override material.
    pub fn set_override_material(&mut self, material: Option<Rc<R::Material>>) {
        self.override_material = material;
    }

    /// Set or remove the clear color override.
    pub fn set_clear_color(&mut self, clear_color: Option<(Color, f32)>) {
        self.clear_color = clear_color;
    }
}

impl<R: Renderer> Pass<R> for RenderPass<R> {
    fn name(&self) -> &str {
        "RenderPass"
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
        let previous = self.clear_color.map(|(color, alpha)| {
            let previous = renderer.clear_color();
            renderer.set_clear_color(color, alpha);
            previous
        });

        let result = renderer.render_scene(
            &self.scene,
            &self.camera,
            RenderDestination::Target(read),
            self.state.clear,
            self.override_material.as_deref().map(OverrideMaterial::Custom),
        );

        if let Some((color, alpha)) = previous {
            renderer.set_clear_color(color, alpha);
        }
        result
    }
}
