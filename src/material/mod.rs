//! Material module: shader materials, uniforms and blend modes.

mod shader_material;
mod uniforms;

pub use shader_material::{Defines, ShaderDefinition, ShaderMaterial};
pub use uniforms::{UniformValue, Uniforms};

use serde::{Deserialize, Serialize};

/// How a draw combines with the existing contents of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Blending {
    /// Overwrite the target.
    #[default]
    None,
    /// Standard alpha blending.
    Normal,
    /// `src * src_alpha + dst`.
    Additive,
}

impl Blending {
    /// Equivalent wgpu blend state.
    pub fn to_wgpu(&self) -> Option<wgpu::BlendState> {
        match self {
            Blending::None => None,
            Blending::Normal => Some(wgpu::BlendState::ALPHA_BLENDING),
            Blending::Additive => {
                let component = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: component,
                    alpha: component,
                })
            }
        }
    }

    /// Blend a source color over a destination color on the CPU.
    ///
    /// Mirrors [`Blending::to_wgpu`]; used to reason about composites
    /// without a GPU.
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        match self {
            Blending::None => src,
            Blending::Normal => {
                let a = src[3];
                [
                    src[0] * a + dst[0] * (1.0 - a),
                    src[1] * a + dst[1] * (1.0 - a),
                    src[2] * a + dst[2] * (1.0 - a),
                    a + dst[3] * (1.0 - a),
                ]
            }
            Blending::Additive => {
                let a = src[3];
                [
                    src[0] * a + dst[0],
                    src[1] * a + dst[1],
                    src[2] * a + dst[2],
                    src[3] * a + dst[3],
                ]
            }
        }
    }
}
