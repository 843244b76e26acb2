//! Luminance adaptation and tone mapping.

use super::{ADAPTIVE_LUMINANCE_SHADER, FULLSCREEN_VERTEX_SHADER, TONE_MAP_SHADER};
use crate::material::{Defines, ShaderDefinition, Uniforms};

const ADAPTIVE_LUMINANCE_FRAGMENT: &str = r#"
override MIP_LEVEL_1X1: f32 = 8.0;

struct AdaptParams {
    delta: f32,
    tau: f32,
}

@group(0) @binding(0) var<uniform> params: AdaptParams;
@group(0) @binding(1) var last_lum: texture_2d<f32>;
@group(0) @binding(2) var s_last_lum: sampler;
@group(0) @binding(3) var current_lum: texture_2d<f32>;
@group(0) @binding(4) var s_current_lum: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let last = textureSampleLevel(last_lum, s_last_lum, in.uv, MIP_LEVEL_1X1).r;
    var current = textureSampleLevel(current_lum, s_current_lum, in.uv, MIP_LEVEL_1X1).r;

    // squaring behaves better across extreme lighting differences
    current *= current;

    let adapted = last + (current - last) * (1.0 - exp(-params.delta * params.tau));
    return vec4<f32>(vec3<f32>(adapted), 1.0);
}
"#;

const TONE_MAP_FRAGMENT: &str = r#"
override ADAPTED_LUMINANCE: bool = false;

struct ToneMapParams {
    average_luminance: f32,
    max_luminance: f32,
    min_luminance: f32,
    middle_grey: f32,
}

@group(0) @binding(0) var<uniform> params: ToneMapParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;
@group(0) @binding(3) var luminance_map: texture_2d<f32>;
@group(0) @binding(4) var s_luminance_map: sampler;

fn tone_map(color: vec3<f32>) -> vec3<f32> {
    var lum_avg = params.average_luminance;
    if ADAPTED_LUMINANCE {
        lum_avg = textureSampleLevel(luminance_map, s_luminance_map, vec2<f32>(0.5, 0.5), 0.0).r;
    }

    let lum_pixel = dot(color, vec3<f32>(0.299, 0.587, 0.114));
    let lum_scaled = (lum_pixel * params.middle_grey) / max(params.min_luminance, lum_avg);
    let max_sq = params.max_luminance * params.max_luminance;
    let lum_compressed = (lum_scaled * (1.0 + (lum_scaled / max_sq))) / (1.0 + lum_scaled);
    return lum_compressed * color;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(t_diffuse, s_diffuse, in.uv);
    return vec4<f32>(tone_map(texel.rgb), texel.a);
}
"#;

/// Build the luminance adaptation shader definition.
///
/// `MIP_LEVEL_1X1` defaults to the 1x1 level of a 256 px luminance target.
pub fn adaptive_luminance_definition() -> ShaderDefinition {
    let mut defines = Defines::new();
    defines.insert("MIP_LEVEL_1X1".into(), 8.0);

    ShaderDefinition {
        name: ADAPTIVE_LUMINANCE_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("lastLum")
            .with_texture_slot("currentLum")
            .with("delta", 0.016)
            .with("tau", 1.0),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: ADAPTIVE_LUMINANCE_FRAGMENT.into(),
        defines,
    }
}

/// Build the tone mapping shader definition.
pub fn tone_map_definition() -> ShaderDefinition {
    ShaderDefinition {
        name: TONE_MAP_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with("averageLuminance", 1.0)
            .with_texture_slot("luminanceMap")
            .with("maxLuminance", 16.0)
            .with("minLuminance", 0.01)
            .with("middleGrey", 0.6),
        vertex_shader: FULLSCREEN_VERTEX_SHADER.into(),
        fragment_shader: TONE_MAP_FRAGMENT.into(),
        defines: Defines::new(),
    }
}
