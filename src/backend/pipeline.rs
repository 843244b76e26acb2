//! Render pipelines for [`ShaderMaterial`]s.
//!
//! Pipelines are keyed by everything that is baked into a wgpu pipeline:
//! the material program version, attachment formats, blending, color writes
//! and the stencil configuration in effect when the material is drawn.

use super::quad::FullscreenVertex;
use crate::core::{GpuState, Id, RenderError, StencilState};
use crate::material::{Blending, Defines, ShaderMaterial};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    /// Material id.
    pub material: Id,
    /// Material program version.
    pub version: u64,
    /// Color attachment format.
    pub color_format: wgpu::TextureFormat,
    /// Depth/stencil attachment format.
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    /// Blend mode.
    pub blending: Blending,
    /// Depth test.
    pub depth_test: bool,
    /// Stencil test, when it applies to the attachment.
    pub stencil: Option<StencilState>,
    /// Color writes.
    pub color_write: bool,
    /// Depth writes.
    pub depth_write: bool,
}

impl PipelineKey {
    /// Build the key for drawing `material` into the given attachments.
    pub fn new(
        material: &ShaderMaterial,
        color_format: wgpu::TextureFormat,
        depth_stencil_format: Option<wgpu::TextureFormat>,
        state: &GpuState,
    ) -> Self {
        let has_stencil = depth_stencil_format.is_some_and(|f| f.has_stencil_aspect());
        Self {
            material: material.id(),
            version: material.version(),
            color_format,
            depth_stencil_format,
            blending: material.blending,
            depth_test: material.depth_test,
            stencil: (state.stencil.enabled && has_stencil).then_some(state.stencil),
            color_write: state.color_write,
            depth_write: state.depth_write,
        }
    }

    fn depth_stencil_state(&self) -> Option<wgpu::DepthStencilState> {
        let format = self.depth_stencil_format?;
        let stencil = match self.stencil {
            Some(stencil) => wgpu::StencilState {
                front: stencil.face_state(),
                back: stencil.face_state(),
                read_mask: stencil.read_mask,
                write_mask: 0xff,
            },
            None => wgpu::StencilState::default(),
        };

        Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_test && self.depth_write,
            depth_compare: if self.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil,
            bias: wgpu::DepthBiasState::default(),
        })
    }
}

/// A compiled pipeline and the layout of its bind group.
pub struct CachedPipeline {
    /// The pipeline.
    pub pipeline: wgpu::RenderPipeline,
    /// Layout of bind group 0.
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Parse and validate a WGSL module.
pub fn validate_wgsl(name: &str, source: &str) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompilation {
        name: name.to_string(),
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::ShaderCompilation {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    Ok(module)
}

/// Pipeline-overridable constants for the defines the module declares.
///
/// Defines without a matching `override` are dropped with a debug log.
pub fn override_constants(module: &naga::Module, defines: &Defines) -> HashMap<String, f64> {
    let declared: Vec<&str> = module
        .overrides
        .iter()
        .filter_map(|(_, o)| o.name.as_deref())
        .collect();

    defines
        .iter()
        .filter(|(name, _)| {
            let known = declared.contains(&name.as_str());
            if !known {
                log::debug!("define `{name}` has no matching override");
            }
            known
        })
        .map(|(name, value)| (name.clone(), *value))
        .collect()
}

/// Bind group layout entries for a material with `texture_count` textures.
pub fn layout_entries(texture_count: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(1 + texture_count * 2);
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });

    for k in 0..texture_count as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1 + 2 * k,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 + 2 * k,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    entries
}

/// Cache of compiled material pipelines.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: HashMap<PipelineKey, CachedPipeline>,
}

impl PipelineCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached pipelines.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Get the pipeline for `key`, compiling it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        material: &ShaderMaterial,
        key: PipelineKey,
    ) -> Result<&CachedPipeline, RenderError> {
        if !self.pipelines.contains_key(&key) {
            // a new version supersedes every pipeline built from older sources
            self.pipelines
                .retain(|k, _| k.material != key.material || k.version == key.version);
        }

        match self.pipelines.entry(key) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let pipeline = create_pipeline(device, material, &key)?;
                Ok(&*entry.insert(pipeline))
            }
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    material: &ShaderMaterial,
    key: &PipelineKey,
) -> Result<CachedPipeline, RenderError> {
    let source = material.source();
    let module = validate_wgsl(material.name(), &source)?;
    let constants = override_constants(&module, material.defines());
    log::debug!(
        "compiling pipeline for `{}` v{} ({:?})",
        material.name(),
        material.version(),
        key.color_format
    );

    let texture_count = material.uniforms.textures().count();
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(material.name()),
        entries: &layout_entries(texture_count),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(material.name()),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(material.name()),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let compilation_options = || wgpu::PipelineCompilationOptions {
        constants: &constants,
        zero_initialize_workgroup_memory: true,
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(material.name()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[FullscreenVertex::layout()],
            compilation_options: compilation_options(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: key.blending.to_wgpu(),
                write_mask: if key.color_write {
                    wgpu::ColorWrites::ALL
                } else {
                    wgpu::ColorWrites::empty()
                },
            })],
            compilation_options: compilation_options(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: key.depth_stencil_state(),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    Ok(CachedPipeline {
        pipeline,
        bind_group_layout,
    })
}
