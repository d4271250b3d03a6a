//! Bind group layouts and render pipelines for the engine's shader kinds.
//!
//! Group 0 is the shader's uniform block (dynamic offset), group 1 is a
//! texture + sampler pair.

use std::num::NonZeroU64;

use anyhow::{Result, anyhow};
use bytemuck::{Pod, Zeroable};
use engine::{MeshUniforms, Shader, ShaderKind, TextUniforms, TextVertex};
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, CompareFunction, DepthBiasState,
    DepthStencilState, Device, FragmentState, PipelineLayoutDescriptor, RenderPipeline,
    RenderPipelineDescriptor, SamplerBindingType, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, TextureFormat, TextureSampleType, TextureViewDimension, VertexBufferLayout,
    VertexState, VertexStepMode,
};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Mesh vertex as laid out in GPU memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

impl From<&asset::MeshVertex> for GpuVertex {
    fn from(v: &asset::MeshVertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

const TEXT_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<TextVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x4],
};

pub struct Layouts {
    pub mesh_uniforms: BindGroupLayout,
    pub text_uniforms: BindGroupLayout,
    pub texture: BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &Device) -> Self {
        Self {
            mesh_uniforms: uniform_layout(
                device,
                "Mesh uniforms BGL",
                std::mem::size_of::<MeshUniforms>() as u64,
                ShaderStages::VERTEX_FRAGMENT,
            ),
            text_uniforms: uniform_layout(
                device,
                "Text uniforms BGL",
                std::mem::size_of::<TextUniforms>() as u64,
                ShaderStages::VERTEX_FRAGMENT,
            ),
            texture: device.create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Texture BGL"),
                entries: &[
                    BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Texture {
                            sample_type: TextureSampleType::Float { filterable: true },
                            view_dimension: TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Sampler(SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            }),
        }
    }

    pub fn uniforms(&self, kind: ShaderKind) -> &BindGroupLayout {
        match kind {
            ShaderKind::Mesh => &self.mesh_uniforms,
            ShaderKind::Text => &self.text_uniforms,
        }
    }
}

fn uniform_layout(device: &Device, label: &str, size: u64, visibility: ShaderStages) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        }],
    })
}

/// A compiled shader.
pub struct ShaderPipeline {
    pub kind: ShaderKind,
    pub pipeline: RenderPipeline,
}

/// Compile `shader` into a pipeline for its kind. Meshes are depth-tested
/// and back-face culled; text is alpha-blended over everything.
pub fn create_pipeline(
    device: &Device,
    layouts: &Layouts,
    shader: &Shader,
    color_format: TextureFormat,
) -> Result<ShaderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(&shader.name),
        source: ShaderSource::Wgsl(shader.source.as_str().into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(&shader.name),
        bind_group_layouts: &[layouts.uniforms(shader.kind), &layouts.texture],
        push_constant_ranges: &[],
    });

    let (buffers, blend, cull_mode, depth_stencil) = match shader.kind {
        ShaderKind::Mesh => (
            [GpuVertex::LAYOUT],
            BlendState::REPLACE,
            Some(wgpu::Face::Back),
            DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            },
        ),
        ShaderKind::Text => (
            [TEXT_VERTEX_LAYOUT],
            BlendState::ALPHA_BLENDING,
            None,
            // The pass always has a depth attachment; text ignores it.
            DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            },
        ),
    };

    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(&shader.name),
        layout: Some(&layout),
        vertex: VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: color_format,
                blend: Some(blend),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(depth_stencil),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("shader '{}' failed to compile: {err}", shader.name));
    }
    Ok(ShaderPipeline {
        kind: shader.kind,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layouts_match_cpu_structs() {
        assert_eq!(GpuVertex::LAYOUT.array_stride, 32);
        assert_eq!(GpuVertex::LAYOUT.attributes[2].offset, 24);
        assert_eq!(TEXT_VERTEX_LAYOUT.array_stride, 16);
    }

    #[test]
    fn gpu_vertex_copies_every_attribute() {
        let v = asset::MeshVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.25, 0.75]);
        let g = GpuVertex::from(&v);
        assert_eq!(g.position, [1.0, 2.0, 3.0]);
        assert_eq!(g.normal, [0.0, 1.0, 0.0]);
        assert_eq!(g.uv, [0.25, 0.75]);
    }
}
