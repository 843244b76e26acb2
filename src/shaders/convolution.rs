//! Separable convolution shader and Gaussian kernel construction.

use super::CONVOLUTION_SHADER;
use crate::material::{Defines, ShaderDefinition, UniformValue, Uniforms};
use crate::math::gauss;
use glam::Vec2;

/// Largest kernel the convolution shader can evaluate.
pub const MAX_KERNEL_SIZE: usize = 25;

/// One texel step at the 512 px reference resolution, horizontally.
pub const BLUR_X: Vec2 = Vec2::new(0.001953125, 0.0);
/// One texel step at the 512 px reference resolution, vertically.
pub const BLUR_Y: Vec2 = Vec2::new(0.0, 0.001953125);

const VERTEX: &str = r#"
override KERNEL_SIZE_FLOAT: f32 = 25.0;
override KERNEL_SIZE_INT: i32 = 25;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

struct ConvolutionParams {
    image_increment: vec2<f32>,
    kernel: array<vec4<f32>, 7>,
}

@group(0) @binding(0) var<uniform> params: ConvolutionParams;
@group(0) @binding(1) var t_diffuse: texture_2d<f32>;
@group(0) @binding(2) var s_diffuse: sampler;

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv - ((KERNEL_SIZE_FLOAT - 1.0) / 2.0) * params.image_increment;
    return out;
}
"#;

const FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var coord = in.uv;
    var sum = vec4<f32>(0.0);
    let taps = min(KERNEL_SIZE_INT, 25);
    for (var i = 0; i < taps; i++) {
        let weight = params.kernel[i / 4][i % 4];
        sum += textureSampleLevel(t_diffuse, s_diffuse, coord, 0.0) * weight;
        coord += params.image_increment;
    }
    return sum;
}
"#;

/// Build a normalized Gaussian kernel for `sigma`.
///
/// The kernel spans `2 * ceil(3 * sigma) + 1` taps, capped at
/// [`MAX_KERNEL_SIZE`], and is zero-padded to [`MAX_KERNEL_SIZE`] entries.
pub fn build_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma.abs().max(f32::EPSILON);
    let size = ((2.0 * (sigma * 3.0).ceil() + 1.0) as usize).min(MAX_KERNEL_SIZE);
    let half_width = (size as f32 - 1.0) * 0.5;

    let mut values: Vec<f32> = (0..size).map(|i| gauss(i as f32 - half_width, sigma)).collect();
    let sum: f32 = values.iter().sum();
    for v in &mut values {
        *v /= sum;
    }

    values.resize(MAX_KERNEL_SIZE, 0.0);
    values
}

/// Build the convolution shader definition for `kernel_size` taps.
pub fn definition(kernel_size: usize, sigma: f32) -> ShaderDefinition {
    let kernel_size = kernel_size.clamp(1, MAX_KERNEL_SIZE);
    let mut defines = Defines::new();
    defines.insert("KERNEL_SIZE_FLOAT".into(), kernel_size as f64);
    defines.insert("KERNEL_SIZE_INT".into(), kernel_size as f64);

    ShaderDefinition {
        name: CONVOLUTION_SHADER.into(),
        uniforms: Uniforms::new()
            .with_texture_slot("tDiffuse")
            .with("uImageIncrement", BLUR_X)
            .with("cKernel", UniformValue::FloatArray(build_kernel(sigma))),
        vertex_shader: VERTEX.into(),
        fragment_shader: FRAGMENT.into(),
        defines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_padded() {
        let kernel = build_kernel(1.0);
        assert_eq!(kernel.len(), MAX_KERNEL_SIZE);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        // sigma 1 spans 7 taps
        assert!(kernel[6] > 0.0);
        assert!(kernel[7..].iter().all(|&v| v == 0.0));
        assert_eq!(kernel[0], kernel[6]);
        assert!(kernel[3] > kernel[2]);
    }

    #[test]
    fn test_large_sigma_is_capped() {
        let kernel = build_kernel(4.0);
        assert!(kernel.iter().all(|&v| v > 0.0));
        assert_eq!(kernel[0], kernel[24]);
        assert!(kernel[12] > kernel[0]);
    }

    #[test]
    fn test_defines_follow_kernel_size() {
        let def = definition(40, 4.0);
        assert_eq!(def.defines.get("KERNEL_SIZE_INT"), Some(&25.0));
        assert_eq!(def.uniforms.vec2("uImageIncrement"), Some(BLUR_X));
    }
}
