//! Per-pixel luminance.

use super::{FULLSCREEN_VERTEX_SHADER, LUMINOSITY_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const FRAGMENT: &str = r#"
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(t_diffuse, s_diffuse, in.uv);
    let v = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    return vec4<f32>(v, v, v, texel.a);
}
"#;

/// Build the luminosity shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: LUMINOSITY_SHADER.into(),
        uniforms: Uniforms::new().with_texture_slot("tDiffuse"),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
