//! Full-screen shader materials.

use super::{Blending, Uniforms};
use crate::core::Id;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Named compile-time constants of a shader.
///
/// The wgpu backend feeds them to the pipeline as overridable constants; a
/// flag-style define is stored as `1.0`.
pub type Defines = BTreeMap<String, f64>;

/// A shader program description: uniform template, sources and defines.
///
/// Definitions are templates. Passes never draw with a definition directly;
/// they build a [`ShaderMaterial`], which clones the uniform block.
#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    /// Name the definition is registered under.
    pub name: Cow<'static, str>,
    /// Uniform template.
    pub uniforms: Uniforms,
    /// WGSL vertex stage (`vs_main`), including the shared vertex output struct.
    pub vertex_shader: Cow<'static, str>,
    /// WGSL fragment stage (`fs_main`).
    pub fragment_shader: Cow<'static, str>,
    /// Default defines.
    pub defines: Defines,
}

/// A material drawing a full-screen quad with a shader.
#[derive(Debug)]
pub struct ShaderMaterial {
    id: Id,
    version: u64,
    name: String,
    /// Uniform values owned by this material.
    pub uniforms: Uniforms,
    vertex_shader: Cow<'static, str>,
    fragment_shader: Cow<'static, str>,
    defines: Defines,
    /// Blend mode used when drawing.
    pub blending: Blending,
    /// Whether the draw tests against the depth buffer.
    pub depth_test: bool,
}

impl ShaderMaterial {
    /// Build a material from a definition, cloning its uniform template.
    pub fn from_definition(definition: &ShaderDefinition) -> Self {
        Self {
            id: Id::new(),
            version: 0,
            name: definition.name.to_string(),
            uniforms: definition.uniforms.clone(),
            vertex_shader: definition.vertex_shader.clone(),
            fragment_shader: definition.fragment_shader.clone(),
            defines: definition.defines.clone(),
            blending: Blending::None,
            depth_test: false,
        }
    }

    /// Set the blend mode.
    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Unique id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Program version, bumped whenever a define changes.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Name of the definition the material was built from.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current defines.
    #[inline]
    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    /// Whether a define is set.
    pub fn has_define(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Set a define and mark the program for recompilation.
    pub fn set_define(&mut self, name: &str, value: f64) {
        if self.defines.get(name) != Some(&value) {
            self.defines.insert(name.to_string(), value);
            self.needs_update();
        }
    }

    /// Remove a define and mark the program for recompilation.
    pub fn remove_define(&mut self, name: &str) {
        if self.defines.remove(name).is_some() {
            self.needs_update();
        }
    }

    /// Force the backend to rebuild the program.
    #[inline]
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    /// Complete WGSL module source.
    pub fn source(&self) -> String {
        format!("{}\n{}", self.vertex_shader, self.fragment_shader)
    }
}
