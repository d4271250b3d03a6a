//! Renderer: replays an engine [`DrawList`] with wgpu.
//! wgpu = 26.x, winit = 0.30.x

pub mod cache;
pub mod pipeline;
pub mod resources;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::AtlasId;
use engine::{DrawCommand, DrawList, MeshId, ShaderKind, ShaderManager};
use wgpu::{
    AddressMode, Backends, CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d, Features,
    FilterMode, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, Sampler,
    SamplerDescriptor, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureDescriptor,
    TextureDimension, TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::cache::FrameCache;
use crate::pipeline::{DEPTH_FORMAT, Layouts, ShaderPipeline, create_pipeline};
use crate::resources::{GpuAtlas, GpuMesh, UniformRing, VertexStream};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// One resolved draw, ready for the render pass.
enum Step<'a> {
    Mesh {
        shader: &'a str,
        mesh: MeshId,
        uniform_offset: u32,
    },
    Text {
        shader: &'a str,
        atlas: AtlasId,
        uniform_offset: u32,
        bytes: Range<u64>,
        vertex_count: u32,
    },
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipelines by shader name
    layouts: Layouts,
    pipelines: HashMap<String, ShaderPipeline>,
    mesh_sampler: Sampler,
    atlas_sampler: Sampler,

    // Per-frame data
    mesh_uniforms: UniformRing,
    text_uniforms: UniformRing,
    text_vertices: VertexStream,

    // Uploaded resources
    meshes: FrameCache<MeshId, GpuMesh>,
    atlases: FrameCache<AtlasId, Option<GpuAtlas>>,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Engine Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        let layouts = Layouts::new(&device);
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let mesh_uniforms = UniformRing::new(
            &device,
            &layouts.mesh_uniforms,
            "Mesh UBO",
            std::mem::size_of::<engine::MeshUniforms>() as u64,
            alignment,
        );
        let text_uniforms = UniformRing::new(
            &device,
            &layouts.text_uniforms,
            "Text UBO",
            std::mem::size_of::<engine::TextUniforms>() as u64,
            alignment,
        );
        let text_vertices = VertexStream::new(&device);

        let mesh_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Mesh sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let atlas_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Atlas sampler"),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            layouts,
            pipelines: HashMap::new(),
            mesh_sampler,
            atlas_sampler,
            mesh_uniforms,
            text_uniforms,
            text_vertices,
            meshes: FrameCache::new(),
            atlases: FrameCache::new(),
            depth_view,
            width,
            height,
        })
    }

    /// Compile every registered shader that has no pipeline yet. Failures
    /// are logged; draws naming that shader are skipped.
    pub fn prepare_shaders(&mut self, shaders: &ShaderManager) -> usize {
        let format = self.surface_config.format;
        let mut compiled = 0;
        for shader in shaders.iter() {
            if self.pipelines.contains_key(&shader.name) {
                continue;
            }
            match create_pipeline(&self.device, &self.layouts, shader, format) {
                Ok(pipeline) => {
                    log::info!("Compiled {:?} shader '{}'", shader.kind, shader.name);
                    self.pipelines.insert(shader.name.clone(), pipeline);
                    compiled += 1;
                }
                Err(err) => log::error!("{err:#}"),
            }
        }
        compiled
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: clear, then replay `list` in order.
    pub fn render(&mut self, list: &DrawList) -> Result<(), SurfaceError> {
        let steps = self.prepare(list);

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for step in &steps {
                match step {
                    Step::Mesh {
                        shader,
                        mesh,
                        uniform_offset,
                    } => {
                        let (Some(p), Some(gpu)) = (self.pipelines.get(*shader), self.meshes.get(mesh)) else {
                            continue;
                        };
                        rpass.set_pipeline(&p.pipeline);
                        rpass.set_bind_group(0, self.mesh_uniforms.bind_group(), &[*uniform_offset]);
                        rpass.set_bind_group(1, &gpu.texture_bg, &[]);
                        rpass.set_vertex_buffer(0, gpu.vertex_buf.slice(..));
                        rpass.set_index_buffer(gpu.index_buf.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..gpu.index_count, 0, 0..1);
                    }
                    Step::Text {
                        shader,
                        atlas,
                        uniform_offset,
                        bytes,
                        vertex_count,
                    } => {
                        let gpu = self.atlases.get(atlas).and_then(Option::as_ref);
                        let (Some(p), Some(gpu)) = (self.pipelines.get(*shader), gpu) else {
                            continue;
                        };
                        rpass.set_pipeline(&p.pipeline);
                        rpass.set_bind_group(0, self.text_uniforms.bind_group(), &[*uniform_offset]);
                        rpass.set_bind_group(1, &gpu.bind_group, &[]);
                        rpass.set_vertex_buffer(0, self.text_vertices.buffer().slice(bytes.clone()));
                        rpass.draw(0..*vertex_count, 0..1);
                    }
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Upload whatever `list` needs and stage its uniforms.
    fn prepare<'a>(&mut self, list: &'a DrawList) -> Vec<Step<'a>> {
        let evicted = self.meshes.begin_frame() + self.atlases.begin_frame();
        if evicted > 0 {
            log::debug!("Evicted {} unused GPU resource(s)", evicted);
        }
        self.mesh_uniforms.clear();
        self.text_uniforms.clear();
        self.text_vertices.clear();

        let device = &self.device;
        let queue = &self.queue;
        let mut steps = Vec::with_capacity(list.len());
        for command in list.commands() {
            let shader = command.shader();
            let Some(pipeline) = self.pipelines.get(shader) else {
                log::debug!("No pipeline for shader '{}'; draw skipped", shader);
                continue;
            };

            match command {
                DrawCommand::Mesh { mesh, uniforms, .. } => {
                    if pipeline.kind != ShaderKind::Mesh {
                        log::warn!("Shader '{}' cannot draw meshes", shader);
                        continue;
                    }
                    if mesh.mesh().mesh.indices.is_empty() {
                        continue;
                    }
                    let layout = &self.layouts.texture;
                    let sampler = &self.mesh_sampler;
                    self.meshes.touch_or_insert_with(mesh.id(), || {
                        GpuMesh::upload(device, queue, layout, sampler, mesh.mesh())
                    });
                    steps.push(Step::Mesh {
                        shader,
                        mesh: mesh.id(),
                        uniform_offset: self.mesh_uniforms.push(bytemuck::bytes_of(uniforms)),
                    });
                }
                DrawCommand::Text {
                    atlas,
                    uniforms,
                    vertices,
                    ..
                } => {
                    if pipeline.kind != ShaderKind::Text {
                        log::warn!("Shader '{}' cannot draw text", shader);
                        continue;
                    }
                    if vertices.is_empty() {
                        continue;
                    }
                    let layout = &self.layouts.texture;
                    let sampler = &self.atlas_sampler;
                    self.atlases.touch_or_insert_with(atlas.id, || {
                        GpuAtlas::upload(device, queue, layout, sampler, atlas)
                    });
                    if !matches!(self.atlases.get(&atlas.id), Some(Some(_))) {
                        continue;
                    }
                    steps.push(Step::Text {
                        shader,
                        atlas: atlas.id,
                        uniform_offset: self.text_uniforms.push(bytemuck::bytes_of(uniforms)),
                        bytes: self.text_vertices.push(vertices.as_slice()),
                        vertex_count: vertices.len() as u32,
                    });
                }
            }
        }

        self.mesh_uniforms
            .flush(device, queue, &self.layouts.mesh_uniforms);
        self.text_uniforms
            .flush(device, queue, &self.layouts.text_uniforms);
        self.text_vertices.flush(device, queue);
        steps
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
