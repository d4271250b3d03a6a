//! GPU-side copies of meshes, textures and per-frame uniform data.

use std::num::NonZeroU64;

use asset::{GlyphAtlas, ModelMesh, TextureData};
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindingResource, Buffer,
    BufferBinding, BufferDescriptor, BufferUsages, Device, Extent3d, Origin3d, Queue, Sampler,
    TexelCopyBufferLayout, TexelCopyTextureInfo, TextureAspect, TextureDescriptor,
    TextureDimension, TextureUsages, TextureView, TextureViewDescriptor,
};

use crate::pipeline::GpuVertex;

/// Round `size` up to a multiple of `alignment`.
pub fn align_to(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

fn wgpu_format(format: asset::TextureFormat) -> wgpu::TextureFormat {
    match format {
        asset::TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
        asset::TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// Whether a `width` x `height` texture is within a device's
/// `max_texture_dimension_2d`.
pub fn fits_texture_limit(width: u32, height: u32, max_dimension: u32) -> bool {
    width.max(1) <= max_dimension && height.max(1) <= max_dimension
}

/// Create a sampled texture and fill it from `data`. The caller checks the
/// size against the device limits first.
pub fn upload_texture(device: &Device, queue: &Queue, data: &TextureData, label: &str) -> TextureView {
    let size = Extent3d {
        width: data.width.max(1),
        height: data.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: wgpu_format(data.format),
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });

    if data.width > 0 && data.height > 0 && data.is_valid() {
        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &data.data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.stride()),
                rows_per_image: Some(data.height),
            },
            size,
        );
    } else {
        log::warn!("Texture '{}' has no usable pixels; uploading blank", label);
    }
    texture.create_view(&TextureViewDescriptor::default())
}

fn texture_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    view: &TextureView,
    sampler: &Sampler,
    label: &str,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(view),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(sampler),
            },
        ],
    })
}

pub struct GpuMesh {
    pub vertex_buf: Buffer,
    pub index_buf: Buffer,
    pub index_count: u32,
    pub texture_bg: BindGroup,
}

impl GpuMesh {
    /// Upload vertices, indices and the base texture (white if the mesh has
    /// none, so the base color passes through unchanged).
    pub fn upload(
        device: &Device,
        queue: &Queue,
        texture_layout: &BindGroupLayout,
        sampler: &Sampler,
        mesh: &ModelMesh,
    ) -> Self {
        let vertices: Vec<GpuVertex> = mesh.mesh.vertices.iter().map(GpuVertex::from).collect();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh IB"),
            contents: bytemuck::cast_slice(&mesh.mesh.indices),
            usage: BufferUsages::INDEX,
        });

        let max_dimension = device.limits().max_texture_dimension_2d;
        let white;
        let texture = match &mesh.texture {
            Some(texture) if fits_texture_limit(texture.width, texture.height, max_dimension) => texture,
            other => {
                if let Some(texture) = other {
                    log::warn!(
                        "Mesh texture {}x{} exceeds the device limit of {}px; drawing untextured",
                        texture.width,
                        texture.height,
                        max_dimension
                    );
                }
                white = TextureData::white();
                &white
            }
        };
        let view = upload_texture(device, queue, texture, "Mesh base texture");
        let texture_bg = texture_bind_group(device, texture_layout, &view, sampler, "Mesh texture BG");

        Self {
            vertex_buf,
            index_buf,
            index_count: mesh.mesh.indices.len() as u32,
            texture_bg,
        }
    }
}

pub struct GpuAtlas {
    pub bind_group: BindGroup,
}

impl GpuAtlas {
    /// Upload the atlas texture. `None` when the device cannot hold a
    /// texture that large; text using the atlas is then not drawn.
    pub fn upload(
        device: &Device,
        queue: &Queue,
        texture_layout: &BindGroupLayout,
        sampler: &Sampler,
        atlas: &GlyphAtlas,
    ) -> Option<Self> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        if !fits_texture_limit(atlas.width(), atlas.height(), max_dimension) {
            log::error!(
                "Glyph atlas {:?} is {}x{}, over the device limit of {}px; its text is skipped",
                atlas.id,
                atlas.width(),
                atlas.height(),
                max_dimension
            );
            return None;
        }
        log::debug!(
            "Uploading glyph atlas {:?} ({}x{}, {} glyphs)",
            atlas.id,
            atlas.width(),
            atlas.height(),
            atlas.glyphs.len()
        );
        let view = upload_texture(device, queue, &atlas.texture, "Glyph atlas");
        Some(Self {
            bind_group: texture_bind_group(device, texture_layout, &view, sampler, "Glyph atlas BG"),
        })
    }
}

const INITIAL_BLOCKS: u64 = 64;

/// One uniform buffer holding every block of a kind for the current frame,
/// addressed with dynamic offsets.
pub struct UniformRing {
    label: &'static str,
    block_size: u64,
    stride: u64,
    capacity: u64,
    staging: Vec<u8>,
    buffer: Buffer,
    bind_group: BindGroup,
}

impl UniformRing {
    pub fn new(
        device: &Device,
        layout: &BindGroupLayout,
        label: &'static str,
        block_size: u64,
        alignment: u64,
    ) -> Self {
        let stride = align_to(block_size, alignment);
        let (buffer, bind_group) = allocate_ring(device, layout, label, block_size, stride * INITIAL_BLOCKS);
        Self {
            label,
            block_size,
            stride,
            capacity: INITIAL_BLOCKS,
            staging: Vec::new(),
            buffer,
            bind_group,
        }
    }

    pub fn clear(&mut self) {
        self.staging.clear();
    }

    /// Stage one block; returns its dynamic offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.staging.len();
        self.staging.extend_from_slice(block);
        self.staging.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    /// Upload staged blocks, growing the buffer when they do not fit.
    pub fn flush(&mut self, device: &Device, queue: &Queue, layout: &BindGroupLayout) {
        if self.staging.is_empty() {
            return;
        }
        let needed = self.staging.len() as u64 / self.stride;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            log::debug!("Growing {} to {} blocks", self.label, self.capacity);
            let (buffer, bind_group) = allocate_ring(
                device,
                layout,
                self.label,
                self.block_size,
                self.stride * self.capacity,
            );
            self.buffer = buffer;
            self.bind_group = bind_group;
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }
}

fn allocate_ring(
    device: &Device,
    layout: &BindGroupLayout,
    label: &str,
    block_size: u64,
    size: u64,
) -> (Buffer, BindGroup) {
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: BindingResource::Buffer(BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(block_size),
            }),
        }],
    });
    (buffer, bind_group)
}

/// Growable vertex buffer rewritten every frame.
pub struct VertexStream {
    staging: Vec<u8>,
    buffer: Buffer,
    capacity: u64,
}

impl VertexStream {
    const INITIAL_BYTES: u64 = 64 * 1024;

    pub fn new(device: &Device) -> Self {
        Self {
            staging: Vec::new(),
            buffer: allocate_stream(device, Self::INITIAL_BYTES),
            capacity: Self::INITIAL_BYTES,
        }
    }

    pub fn clear(&mut self) {
        self.staging.clear();
    }

    /// Append vertices; returns the byte range they occupy.
    pub fn push<T: bytemuck::Pod>(&mut self, vertices: &[T]) -> std::ops::Range<u64> {
        let start = self.staging.len() as u64;
        self.staging.extend_from_slice(bytemuck::cast_slice(vertices));
        start..self.staging.len() as u64
    }

    pub fn flush(&mut self, device: &Device, queue: &Queue) {
        if self.staging.is_empty() {
            return;
        }
        let needed = self.staging.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            log::debug!("Growing text vertex stream to {} bytes", self.capacity);
            self.buffer = allocate_stream(device, self.capacity);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

fn allocate_stream(device: &Device, size: u64) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some("Text VB"),
        size,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
