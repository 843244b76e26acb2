//! Copy shader: samples `tDiffuse` and scales it by `opacity`.

use super::{COPY_SHADER, FULLSCREEN_VERTEX_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const FRAGMENT: &str = r#"
struct CopyParams {
    opacity: f32,
}

@group(0) @binding(0) var<uniform> params: CopyParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(t_diffuse, s_diffuse, in.uv);
    return params.opacity * texel;
}
"#;

/// Build the copy shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: COPY_SHADER.into(),
        uniforms: Uniforms::new().with_texture_slot("tDiffuse").with("opacity", 1.0),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
