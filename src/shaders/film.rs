//! Film grain: noise, scanlines and optional grayscale.

use super::{FILM_SHADER, FULLSCREEN_VERTEX_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const FRAGMENT: &str = r#"
struct FilmParams {
    time: f32,
    n_intensity: f32,
    s_intensity: f32,
    s_count: f32,
    grayscale: i32,
}

@group(0) @binding(0) var<uniform> params: FilmParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let screen = textureSample(t_diffuse, s_diffuse, in.uv);

    var x = in.uv.x * in.uv.y * params.time * 1000.0;
    x = (x % 13.0) * (x % 123.0);
    let dx = x % 0.01;

    var result = screen.rgb + screen.rgb * clamp(0.1 + dx * 100.0, 0.0, 1.0);
    let sc = vec2<f32>(sin(in.uv.y * params.s_count), cos(in.uv.y * params.s_count));
    result += screen.rgb * vec3<f32>(sc.x, sc.y, sc.x) * params.s_intensity;
    result = screen.rgb + clamp(params.n_intensity, 0.0, 1.0) * (result - screen.rgb);

    if params.grayscale != 0 {
        result = vec3<f32>(result.r * 0.3 + result.g * 0.59 + result.b * 0.11);
    }

    return vec4<f32>(result, screen.a);
}
"#;

/// Build the film shader definition.
pub fn definition() -> ShaderDefinition {
    ShaderDefinition {
        name: FILM_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with("time", 0.0)
            .with("nIntensity", 0.5)
            .with("sIntensity", 0.05)
            .with("sCount", 4096.0)
            .with("grayscale", 1),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: FRAGMENT.into(),
        defines: Defines::new(),
    }
}
