//! Shared full-screen vertex stage.

/// Vertex stage used by every full-screen shader.
///
/// Declares `VertexInput`, `VertexOutput` and `vs_main`; fragment stages
/// receive `VertexOutput` and must not redeclare it.
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(in.position, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}
"#;
