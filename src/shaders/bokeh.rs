//! Depth-of-field composite.

use super::{BOKEH_SHADER, FULLSCREEN_VERTEX_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const FRAGMENT: &str = r#"
struct BokehParams {
    focus: f32,
    aspect: f32,
    aperture: f32,
    maxblur: f32,
}

@group(0) @binding(0) var<uniform> params: BokehParams;
@group(0) @binding(1) var t_color: texture_2d<f32>;
@group(0) @binding(2) var s_color: sampler;
@group(0) @binding(3) var t_depth: texture_2d<f32>;
@group(0) @binding(4) var s_depth: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var ring = array<vec2<f32>, 16>(
        vec2<f32>(0.0, 0.4), vec2<f32>(0.15, 0.37), vec2<f32>(0.29, 0.29), vec2<f32>(-0.37, 0.15),
        vec2<f32>(0.4, 0.0), vec2<f32>(0.37, -0.15), vec2<f32>(0.29, -0.29), vec2<f32>(-0.15, -0.37),
        vec2<f32>(0.0, -0.4), vec2<f32>(-0.15, 0.37), vec2<f32>(-0.29, 0.29), vec2<f32>(0.37, 0.15),
        vec2<f32>(-0.4, 0.0), vec2<f32>(-0.37, -0.15), vec2<f32>(-0.29, -0.29), vec2<f32>(0.15, -0.37),
    );
    var diagonals = array<vec2<f32>, 8>(
        vec2<f32>(0.15, 0.37), vec2<f32>(-0.37, 0.15), vec2<f32>(0.37, -0.15), vec2<f32>(-0.15, -0.37),
        vec2<f32>(-0.15, 0.37), vec2<f32>(0.37, 0.15), vec2<f32>(-0.37, -0.15), vec2<f32>(0.15, -0.37),
    );
    var axes = array<vec2<f32>, 8>(
        vec2<f32>(0.29, 0.29), vec2<f32>(0.4, 0.0), vec2<f32>(0.29, -0.29), vec2<f32>(0.0, -0.4),
        vec2<f32>(-0.29, 0.29), vec2<f32>(-0.4, 0.0), vec2<f32>(-0.29, -0.29), vec2<f32>(0.0, 0.4),
    );

    let aspect_correct = vec2<f32>(1.0, params.aspect);
    let depth = textureSample(t_depth, s_depth, in.uv);
    let factor = depth.x - params.focus;
    let dofblur = vec2<f32>(clamp(factor * params.aperture, -params.maxblur, params.maxblur));

    var col = textureSampleLevel(t_color, s_color, in.uv, 0.0);
    for (var i = 0; i < 16; i++) {
        col += textureSampleLevel(t_color, s_color, in.uv + ring[i] * aspect_correct * dofblur, 0.0);
    }
    for (var i = 0; i < 8; i++) {
        col += textureSampleLevel(t_color, s_color, in.uv + diagonals[i] * aspect_correct * dofblur * 0.9, 0.0);
        col += textureSampleLevel(t_color, s_color, in.uv + diagonals[i] * aspect_correct * dofblur * 0.7, 0.0);
        col += textureSampleLevel(t_color, s_color, in.uv + axes[i] * aspect_correct * dofblur * 0.4, 0.0);
    }

    return vec4<f32>(col.rgb / 41.0, 1.0);
}
"#;

/// Build the bokeh shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: BOKEH_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tColor")
            .with_texture_slot("tDepth")
            .with("focus", 1.0)
            .with("aspect", 1.0)
            .with("aperture", 0.025)
            .with("maxblur", 1.0),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
