//! Halftone dot-screen effect.

use super::{DOT_SCREEN_SHADER, FULLSCREEN_VERTEX_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};
use glam::Vec2;

const FRAGMENT: &str = r#"
struct DotScreenParams {
    t_size: vec2<f32>,
    center: vec2<f32>,
    angle: f32,
    scale: f32,
}

@group(0) @binding(0) var<uniform> params: DotScreenParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;

fn pattern(uv: vec2<f32>) -> f32 {
    let s = sin(params.angle);
    let c = cos(params.angle);
    let tex = uv * params.t_size - params.center;
    let point = vec2<f32>(c * tex.x - s * tex.y, s * tex.x + c * tex.y) * params.scale;
    return (sin(point.x) * sin(point.y)) * 4.0;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_diffuse, s_diffuse, in.uv);
    let average = (color.r + color.g + color.b) / 3.0;
    return vec4<f32>(vec3<f32>(average * 10.0 - 5.0 + pattern(in.uv)), color.a);
}
"#;

/// Build the dot-screen shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: DOT_SCREEN_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with("tSize", Vec2::new(256.0, 256.0))
            .with("center", Vec2::new(0.5, 0.5))
            .with("angle", 1.57)
            .with("scale", 1.0),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
