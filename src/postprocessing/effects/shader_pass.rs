//! Generic full-screen shader pass.

use crate::core::{PassError, RenderError, Renderer};
use crate::material::{ShaderDefinition, ShaderMaterial, Uniforms};
use crate::postprocessing::pass::{Pass, PassState};
use crate::shaders::{ShaderLibrary, COPY_SHADER};
use crate::texture::RenderTarget;

/// Uniform the read buffer is bound to unless configured otherwise.
pub const DEFAULT_TEXTURE_ID: &str = "tDiffuse";

/// Draws a full-screen quad with its own material, reading the previous
/// pass' output through a texture uniform.
#[derive(Debug)]
pub struct ShaderPass {
    state: PassState,
    material: ShaderMaterial,
    texture_id: String,
}

impl ShaderPass {
    /// Create a pass from a shader definition, binding the read buffer to
    /// `tDiffuse`.
    pub fn new(definition: &ShaderDefinition) -> Self {
        Self::with_texture_id(definition, DEFAULT_TEXTURE_ID)
    }

    /// Create a pass binding the read buffer to a custom uniform.
    pub fn with_texture_id(definition: &ShaderDefinition, texture_id: &str) -> Self {
        Self {
            state: PassState::default(),
            material: ShaderMaterial::from_definition(definition),
            texture_id: texture_id.to_string(),
        }
    }

    /// Create a pass for a shader registered in `library`.
    pub fn from_library(library: &ShaderLibrary, shader: &str) -> Result<Self, PassError> {
        library.require(shader, "ShaderPass").map(Self::new)
    }

    /// Create a copy pass.
    pub fn copy(library: &ShaderLibrary) -> Result<Self, PassError> {
        Self::from_library(library, COPY_SHADER)
    }

    /// Uniform the read buffer is bound to.
    pub fn texture_id(&self) -> &str {
        &self.texture_id
    }

    /// The pass material.
    pub fn material(&self) -> &ShaderMaterial {
        &self.material
    }

    /// Mutable access to the pass material.
    pub fn material_mut(&mut self) -> &mut ShaderMaterial {
        &mut self.material
    }

    /// Uniforms of the pass material.
    pub fn uniforms(&self) -> &Uniforms {
        &self.material.uniforms
    }

    /// Mutable uniforms of the pass material.
    pub fn uniforms_mut(&mut self) -> &mut Uniforms {
        &mut self.material.uniforms
    }
}

impl<R: Renderer> Pass<R> for ShaderPass {
    fn name(&self) -> &str {
        self.material.name()
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
        if self.material.uniforms.contains(&self.texture_id) {
            self.material
                .uniforms
                .set_texture(&self.texture_id, Some(read.texture()));
        }

        renderer.render_fullscreen(&self.material, self.state.destination(write), self.state.clear)
    }
}
