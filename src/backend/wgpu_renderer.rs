//! wgpu implementation of [`Renderer`].

use super::mipmap::MipmapGenerator;
use super::pipeline::{PipelineCache, PipelineKey};
use super::quad::FullscreenQuad;
use crate::core::{
    Context, GpuState, Id, OverrideMaterial, RenderDestination, RenderError, RenderInfo, Renderer,
    StencilFunc, StencilOp,
};
use crate::material::ShaderMaterial;
use crate::math::Color;
use crate::texture::{DataTexture, RenderTarget, RenderTargetDescriptor, SamplerDescriptor, TextureSource};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Attachments and state a host scene is drawn with.
#[derive(Debug, Clone, Copy)]
pub struct SceneTarget {
    /// Color attachment format.
    pub color_format: wgpu::TextureFormat,
    /// Depth/stencil attachment format.
    pub depth_stencil_format: Option<wgpu::TextureFormat>,
    /// Attachment width.
    pub width: u32,
    /// Attachment height.
    pub height: u32,
    /// Stencil and write-mask state the host pipelines must honour.
    pub state: GpuState,
}

/// Host hook that records scene draws into a render pass.
///
/// The renderer owns attachments, clears and submission; the host only binds
/// its own pipelines and issues draws. Pipelines must be built against
/// [`SceneTarget`] so stencil masks and write masks take effect.
pub trait SceneEncoder {
    /// Host scene type.
    type Scene: ?Sized;
    /// Host camera type.
    type Camera: ?Sized;
    /// Host material type.
    type Material: ?Sized;

    /// Record draws for `scene` seen from `camera`.
    #[allow(clippy::too_many_arguments)]
    fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pass: &mut wgpu::RenderPass<'_>,
        target: &SceneTarget,
        scene: &Self::Scene,
        camera: &Self::Camera,
        override_material: Option<OverrideMaterial<'_, Self::Material>>,
    ) -> Result<(), RenderError>;
}

struct GpuRenderTarget {
    descriptor: RenderTargetDescriptor,
    texture: wgpu::Texture,
    /// Every mip level, for sampling.
    sample_view: wgpu::TextureView,
    /// Level 0, for drawing.
    attachment_view: wgpu::TextureView,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
}

struct ScreenFrame {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

struct Attachment<'a> {
    color: &'a wgpu::TextureView,
    color_format: wgpu::TextureFormat,
    depth_stencil: Option<(&'a wgpu::TextureView, wgpu::TextureFormat)>,
    width: u32,
    height: u32,
    mipmaps: Option<(&'a wgpu::Texture, u32)>,
}

fn resolve<'a>(
    targets: &'a HashMap<Id, GpuRenderTarget>,
    screen: &'a Option<ScreenFrame>,
    screen_size: (u32, u32),
    destination: RenderDestination<'_>,
) -> Result<Attachment<'a>, RenderError> {
    match destination {
        RenderDestination::Screen => {
            let frame = screen.as_ref().ok_or(RenderError::NoScreenTarget)?;
            Ok(Attachment {
                color: &frame.view,
                color_format: frame.format,
                depth_stencil: None,
                width: screen_size.0,
                height: screen_size.1,
                mipmaps: None,
            })
        }
        RenderDestination::Target(target) => {
            let gpu = targets
                .get(&target.id())
                .ok_or(RenderError::UnknownRenderTarget(target.id()))?;
            let descriptor = &gpu.descriptor;
            let levels = descriptor.mip_level_count();
            Ok(Attachment {
                color: &gpu.attachment_view,
                color_format: descriptor.texture_format(),
                depth_stencil: gpu
                    .depth
                    .as_ref()
                    .zip(descriptor.depth_stencil_format())
                    .map(|((_, view), format)| (view, format)),
                width: descriptor.width,
                height: descriptor.height,
                mipmaps: (levels > 1).then_some((&gpu.texture, levels)),
            })
        }
    }
}

/// Load operations of one pass. Clears honour the color and depth write
/// masks, so a stencil-only draw keeps the color and depth contents.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LoadOps {
    color: wgpu::LoadOp<wgpu::Color>,
    depth: wgpu::LoadOp<f32>,
    stencil: wgpu::LoadOp<u32>,
}

fn load_ops(clear: bool, state: &GpuState, clear_color: wgpu::Color) -> LoadOps {
    let pick = |write: bool| clear && write;
    LoadOps {
        color: if pick(state.color_write) {
            wgpu::LoadOp::Clear(clear_color)
        } else {
            wgpu::LoadOp::Load
        },
        depth: if pick(state.depth_write) {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        },
        stencil: if clear {
            wgpu::LoadOp::Clear(state.clear_stencil)
        } else {
            wgpu::LoadOp::Load
        },
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    attachment: &Attachment<'_>,
    clear: bool,
    clear_color: wgpu::Color,
    state: &GpuState,
) -> wgpu::RenderPass<'e> {
    let ops = load_ops(clear, state, clear_color);

    let depth_stencil_attachment = attachment.depth_stencil.map(|(view, format)| {
        wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: format.has_depth_aspect().then_some(wgpu::Operations {
                load: ops.depth,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: format.has_stencil_aspect().then_some(wgpu::Operations {
                load: ops.stencil,
                store: wgpu::StoreOp::Store,
            }),
        }
    });

    encoder
        .begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("PostFx Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: ops.color,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
}

/// Renderer drawing with wgpu.
///
/// Every draw is recorded into its own command buffer and submitted before
/// the call returns, so passes observe each other's results in order.
/// Screen draws go to the view installed with [`WgpuRenderer::begin_frame`].
pub struct WgpuRenderer<E: SceneEncoder> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    scene_encoder: E,
    screen: Option<ScreenFrame>,
    screen_size: (u32, u32),
    pixel_ratio: f32,
    targets: HashMap<Id, GpuRenderTarget>,
    data_textures: HashMap<Id, (wgpu::Texture, wgpu::TextureView)>,
    samplers: HashMap<SamplerDescriptor, wgpu::Sampler>,
    white: (wgpu::Texture, wgpu::TextureView),
    pipelines: PipelineCache,
    mipmaps: MipmapGenerator,
    quad: FullscreenQuad,
    state: GpuState,
    clear_color: (Color, f32),
    info: RenderInfo,
}

impl<E: SceneEncoder> WgpuRenderer<E> {
    /// Create a renderer on `context`, drawing a `width x height` display.
    pub fn new(context: &Context, scene_encoder: E, width: u32, height: u32) -> Self {
        Self::from_device(
            context.device.clone(),
            context.queue.clone(),
            scene_encoder,
            width,
            height,
        )
    }

    /// Create a renderer from an existing device and queue.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        scene_encoder: E,
        width: u32,
        height: u32,
    ) -> Self {
        let white_texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("White Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let white_view = white_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let quad = FullscreenQuad::new(&device);
        let mipmaps = MipmapGenerator::new(&device);

        Self {
            device,
            queue,
            scene_encoder,
            screen: None,
            screen_size: (width, height),
            pixel_ratio: 1.0,
            targets: HashMap::new(),
            data_textures: HashMap::new(),
            samplers: HashMap::new(),
            white: (white_texture, white_view),
            pipelines: PipelineCache::new(),
            mipmaps,
            quad,
            state: GpuState::default(),
            clear_color: (Color::BLACK, 1.0),
            info: RenderInfo::default(),
        }
    }

    /// Set the device pixel ratio.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    /// Update the display size, e.g. after the window surface was resized.
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        log::info!("drawing buffer resized to {width}x{height}");
        self.screen_size = (width, height);
    }

    /// Install the view screen draws go to until [`end_frame`](Self::end_frame).
    pub fn begin_frame(&mut self, view: wgpu::TextureView, format: wgpu::TextureFormat) {
        self.info.reset();
        self.screen = Some(ScreenFrame { view, format });
    }

    /// Release the screen view.
    pub fn end_frame(&mut self) -> Option<wgpu::TextureView> {
        self.screen.take().map(|frame| frame.view)
    }

    /// The wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The host scene encoder.
    pub fn scene_encoder(&self) -> &E {
        &self.scene_encoder
    }

    /// Mutable access to the host scene encoder.
    pub fn scene_encoder_mut(&mut self) -> &mut E {
        &mut self.scene_encoder
    }

    /// Render statistics.
    pub fn info(&self) -> &RenderInfo {
        &self.info
    }

    /// Color texture view of a live render target, covering every mip level.
    pub fn texture_view(&self, target: &RenderTarget) -> Option<&wgpu::TextureView> {
        self.targets.get(&target.id()).map(|t| &t.sample_view)
    }

    fn ensure_sampler(&mut self, descriptor: SamplerDescriptor) {
        let device = &self.device;
        self.samplers
            .entry(descriptor)
            .or_insert_with(|| device.create_sampler(&descriptor.to_wgpu()));
    }

    fn ensure_data_texture(&mut self, texture: &DataTexture) {
        if self.data_textures.contains_key(&texture.id()) {
            return;
        }

        let size = wgpu::Extent3d {
            width: texture.width().max(1),
            height: texture.height().max(1),
            depth_or_array_layers: 1,
        };
        let gpu = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Data Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texture.to_rgba16f_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 8),
                rows_per_image: Some(size.height),
            },
            size,
        );
        let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("uploaded data texture {} ({}x{})", texture.id(), size.width, size.height);
        self.data_textures.insert(texture.id(), (gpu, view));
    }

    /// Upload data textures and create samplers the material will bind.
    fn prepare_bindings(&mut self, material: &ShaderMaterial) -> Result<(), RenderError> {
        self.ensure_sampler(SamplerDescriptor::default());
        for (_, texture) in material.uniforms.textures() {
            match texture {
                Some(TextureSource::RenderTarget(id)) => {
                    let descriptor = self
                        .targets
                        .get(id)
                        .map(|t| t.descriptor.sampler())
                        .ok_or(RenderError::UnknownRenderTarget(*id))?;
                    self.ensure_sampler(descriptor);
                }
                Some(TextureSource::Data(data)) => {
                    self.ensure_data_texture(data);
                    self.ensure_sampler(data.sampler());
                }
                None => {}
            }
        }
        Ok(())
    }

    fn finish(&mut self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        self.info.draw_calls += 1;
    }
}

impl<E: SceneEncoder> Renderer for WgpuRenderer<E> {
    type Scene = E::Scene;
    type Camera = E::Camera;
    type Material = E::Material;

    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> RenderTarget {
        let size = wgpu::Extent3d {
            width: descriptor.width.max(1),
            height: descriptor.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Render Target"),
            size,
            mip_level_count: descriptor.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.texture_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let attachment_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Render Target Attachment"),
            base_mip_level: 0,
            mip_level_count: Some(1),
            ..Default::default()
        });

        let depth = descriptor.depth_stencil_format().map(|format| {
            let depth_texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Render Target Depth"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
            (depth_texture, view)
        });

        let target = RenderTarget::new(*descriptor);
        log::debug!(
            "created render target {} ({}x{}, {:?})",
            target.id(),
            size.width,
            size.height,
            descriptor.texture_format()
        );
        self.targets.insert(
            target.id(),
            GpuRenderTarget {
                descriptor: *descriptor,
                texture,
                sample_view,
                attachment_view,
                depth,
            },
        );
        self.info.live_targets = self.targets.len() as u32;
        target
    }

    fn dispose_render_target(&mut self, target: RenderTarget) {
        match self.targets.remove(&target.id()) {
            Some(gpu) => {
                gpu.texture.destroy();
                if let Some((depth, _)) = gpu.depth {
                    depth.destroy();
                }
                log::debug!("disposed render target {}", target.id());
            }
            None => log::warn!("render target {} disposed twice", target.id()),
        }
        self.info.live_targets = self.targets.len() as u32;
    }

    fn render_scene(
        &mut self,
        scene: &E::Scene,
        camera: &E::Camera,
        destination: RenderDestination<'_>,
        clear: bool,
        override_material: Option<OverrideMaterial<'_, E::Material>>,
    ) -> Result<(), RenderError> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });

        {
            let Self {
                device,
                queue,
                scene_encoder,
                screen,
                screen_size,
                targets,
                mipmaps,
                state,
                clear_color,
                ..
            } = self;

            let attachment = resolve(targets, screen, *screen_size, destination)?;
            let target = SceneTarget {
                color_format: attachment.color_format,
                depth_stencil_format: attachment.depth_stencil.map(|(_, f)| f),
                width: attachment.width,
                height: attachment.height,
                state: *state,
            };

            {
                let mut pass = begin_pass(
                    &mut encoder,
                    &attachment,
                    clear,
                    clear_color.0.to_wgpu(clear_color.1),
                    state,
                );
                if state.stencil.enabled {
                    pass.set_stencil_reference(state.stencil.reference);
                }
                scene_encoder.encode(
                    device,
                    queue,
                    &mut pass,
                    &target,
                    scene,
                    camera,
                    override_material,
                )?;
            }

            if let Some((texture, levels)) = attachment.mipmaps {
                mipmaps.generate(device, &mut encoder, texture, target.color_format, levels);
            }
        }

        self.info.scene_renders += 1;
        self.finish(encoder);
        Ok(())
    }

    fn render_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        destination: RenderDestination<'_>,
        clear: bool,
    ) -> Result<(), RenderError> {
        self.prepare_bindings(material)?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Fullscreen Encoder"),
        });

        {
            let Self {
                device,
                screen,
                screen_size,
                targets,
                data_textures,
                samplers,
                white,
                pipelines,
                mipmaps,
                quad,
                state,
                clear_color,
                ..
            } = self;

            let attachment = resolve(targets, screen, *screen_size, destination)?;
            let key = PipelineKey::new(
                material,
                attachment.color_format,
                attachment.depth_stencil.map(|(_, f)| f),
                state,
            );
            let cached = pipelines.get_or_create(device, material, key)?;

            let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Uniforms"),
                contents: &material.uniforms.pack(),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let default_sampler = samplers
                .get(&SamplerDescriptor::default())
                .ok_or_else(|| RenderError::Backend("default sampler missing".into()))?;

            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }];
            for (k, (name, texture)) in material.uniforms.textures().enumerate() {
                let (view, sampler) = match texture {
                    Some(TextureSource::RenderTarget(id)) => {
                        let gpu = targets.get(id).ok_or(RenderError::UnknownRenderTarget(*id))?;
                        (&gpu.sample_view, samplers.get(&gpu.descriptor.sampler()))
                    }
                    Some(TextureSource::Data(data)) => {
                        let (_, view) = data_textures.get(&data.id()).ok_or_else(|| {
                            RenderError::Backend(format!("data texture for `{name}` not uploaded"))
                        })?;
                        (view, samplers.get(&data.sampler()))
                    }
                    None => (&white.1, None),
                };
                let binding = 1 + 2 * k as u32;
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(view),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: binding + 1,
                    resource: wgpu::BindingResource::Sampler(sampler.unwrap_or(default_sampler)),
                });
            }

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(material.name()),
                layout: &cached.bind_group_layout,
                entries: &entries,
            });

            {
                let mut pass = begin_pass(
                    &mut encoder,
                    &attachment,
                    clear,
                    clear_color.0.to_wgpu(clear_color.1),
                    state,
                );
                pass.set_pipeline(&cached.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                if key.stencil.is_some() {
                    pass.set_stencil_reference(state.stencil.reference);
                }
                quad.draw(&mut pass);
            }

            if let Some((texture, levels)) = attachment.mipmaps {
                mipmaps.generate(device, &mut encoder, texture, attachment.color_format, levels);
            }
        }

        log::trace!("fullscreen `{}` -> {:?}", material.name(), destination.target_id());
        self.info.fullscreen_draws += 1;
        self.info.triangles += 2;
        self.finish(encoder);
        Ok(())
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.state.stencil.enabled = enabled;
    }

    fn set_stencil_func(&mut self, func: StencilFunc, reference: u32, mask: u32) {
        self.state.stencil.func = func;
        self.state.stencil.reference = reference;
        self.state.stencil.read_mask = mask;
    }

    fn set_stencil_op(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.state.stencil.fail = fail;
        self.state.stencil.depth_fail = depth_fail;
        self.state.stencil.pass = pass;
    }

    fn set_clear_stencil(&mut self, value: u32) {
        self.state.clear_stencil = value;
    }

    fn set_color_mask(&mut self, write: bool) {
        self.state.color_write = write;
    }

    fn set_depth_mask(&mut self, write: bool) {
        self.state.depth_write = write;
    }

    fn clear_color(&self) -> (Color, f32) {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: Color, alpha: f32) {
        self.clear_color = (color, alpha);
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.screen_size
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: wgpu::Color = wgpu::Color {
        r: 0.1,
        g: 0.2,
        b: 0.3,
        a: 1.0,
    };

    #[test]
    fn test_clear_resets_all_aspects() {
        let state = GpuState {
            clear_stencil: 3,
            ..Default::default()
        };
        let ops = load_ops(true, &state, CLEAR);
        assert_eq!(ops.color, wgpu::LoadOp::Clear(CLEAR));
        assert_eq!(ops.depth, wgpu::LoadOp::Clear(1.0));
        assert_eq!(ops.stencil, wgpu::LoadOp::Clear(3));
    }

    #[test]
    fn test_masked_clear_only_touches_stencil() {
        // State a mask pass draws with.
        let state = GpuState {
            color_write: false,
            depth_write: false,
            ..Default::default()
        };
        let ops = load_ops(true, &state, CLEAR);
        assert_eq!(ops.color, wgpu::LoadOp::Load);
        assert_eq!(ops.depth, wgpu::LoadOp::Load);
        assert_eq!(ops.stencil, wgpu::LoadOp::Clear(0));
    }

    #[test]
    fn test_no_clear_loads_everything() {
        let ops = load_ops(false, &GpuState::default(), CLEAR);
        assert_eq!(ops.color, wgpu::LoadOp::Load);
        assert_eq!(ops.depth, wgpu::LoadOp::Load);
        assert_eq!(ops.stencil, wgpu::LoadOp::Load);
    }
}
