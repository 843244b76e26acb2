//! Digital glitch: heightmap-driven displacement with RGB split and snow.

use super::{DIGITAL_GLITCH_SHADER, FULLSCREEN_VERTEX_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const FRAGMENT: &str = r#"
struct GlitchParams {
    byp: i32,
    amount: f32,
    angle: f32,
    seed: f32,
    seed_x: f32,
    seed_y: f32,
    distortion_x: f32,
    distortion_y: f32,
    col_s: f32,
}

@group(0) @binding(0) var<uniform> params: GlitchParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;
@group(0) @binding(3) var t_disp: texture_2d<f32>;
@group(0) @binding(4) var s_disp: sampler;

fn rand(co: vec2<f32>) -> f32 {
    return fract(sin(dot(co, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if params.byp != 0 {
        return textureSampleLevel(t_diffuse, s_diffuse, in.uv, 0.0);
    }

    var p = in.uv;
    let xs = floor(in.position.x / 0.5);
    let ys = floor(in.position.y / 0.5);
    let normal = textureSampleLevel(t_disp, s_disp, p * params.seed * params.seed, 0.0);

    if p.y < params.distortion_x + params.col_s && p.y > params.distortion_x - params.col_s * params.seed {
        if params.seed_x > 0.0 {
            p.y = 1.0 - (p.y + params.distortion_y);
        } else {
            p.y = params.distortion_y;
        }
    }
    if p.x < params.distortion_y + params.col_s && p.x > params.distortion_y - params.col_s * params.seed {
        if params.seed_y > 0.0 {
            p.x = params.distortion_x;
        } else {
            p.x = 1.0 - (p.x + params.distortion_x);
        }
    }
    p.x += normal.x * params.seed_x * (params.seed / 5.0);
    p.y += normal.y * params.seed_y * (params.seed / 5.0);

    let offset = params.amount * vec2<f32>(cos(params.angle), sin(params.angle));
    let cr = textureSampleLevel(t_diffuse, s_diffuse, p + offset, 0.0);
    let cga = textureSampleLevel(t_diffuse, s_diffuse, p, 0.0);
    let cb = textureSampleLevel(t_diffuse, s_diffuse, p - offset, 0.0);

    let snow = 200.0 * params.amount * vec4<f32>(rand(vec2<f32>(xs * params.seed, ys * params.seed * 50.0)) * 0.2);
    return vec4<f32>(cr.r, cga.g, cb.b, cga.a) + snow;
}
"#;

/// Build the digital glitch shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: DIGITAL_GLITCH_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with_texture_slot("tDisp")
            .with("byp", 0)
            .with("amount", 0.08)
            .with("angle", 0.02)
            .with("seed", 0.02)
            .with("seed_x", 0.02)
            .with("seed_y", 0.02)
            .with("distortion_x", 0.5)
            .with("distortion_y", 0.6)
            .with("col_s", 0.05),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
