//! Full-screen quad geometry.

use wgpu::util::DeviceExt;

/// Vertex for fullscreen quad (position + uv).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FullscreenVertex {
    /// Position (x, y).
    pub position: [f32; 2],
    /// UV coordinates.
    pub uv: [f32; 2],
}

impl FullscreenVertex {
    /// Vertex buffer layout matching `VertexInput` of the full-screen vertex stage.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Fullscreen quad vertices (two triangles). UV `v` grows downwards.
pub const FULLSCREEN_QUAD_VERTICES: [FullscreenVertex; 6] = [
    FullscreenVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    FullscreenVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    FullscreenVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    FullscreenVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    FullscreenVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    FullscreenVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Vertex buffer holding [`FULLSCREEN_QUAD_VERTICES`].
pub struct FullscreenQuad {
    buffer: wgpu::Buffer,
}

impl FullscreenQuad {
    /// Upload the quad.
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad Buffer"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    /// Bind the quad and draw both triangles.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.buffer.slice(..));
        pass.draw(0..FULLSCREEN_QUAD_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_stride() {
        assert_eq!(FullscreenVertex::layout().array_stride, 16);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&FULLSCREEN_QUAD_VERTICES).len(), 96);
    }

    #[test]
    fn test_quad_covers_clip_space() {
        let (min, max) = FULLSCREEN_QUAD_VERTICES.iter().fold(
            ([f32::MAX; 2], [f32::MIN; 2]),
            |(min, max), v| {
                (
                    [min[0].min(v.position[0]), min[1].min(v.position[1])],
                    [max[0].max(v.position[0]), max[1].max(v.position[1])],
                )
            },
        );
        assert_eq!(min, [-1.0, -1.0]);
        assert_eq!(max, [1.0, 1.0]);
    }
}
