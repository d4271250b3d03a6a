//! Recorded draw commands. Renderables and text providers append to a
//! [`DrawList`]; the renderer replays it in order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use asset::{GlyphAtlas, ModelMesh};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, Vec3};

use crate::shader::ShaderManager;
use crate::world::World;

/// What a renderable may look at while drawing.
pub struct DrawContext<'a> {
    pub world: &'a World,
    pub shaders: &'a ShaderManager,
}

/// Identity of uploaded mesh data for GPU-side caching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

/// Shared handle to CPU mesh data. Cloning keeps the same id, so the
/// renderer uploads the mesh once no matter how often it is drawn.
#[derive(Clone, Debug)]
pub struct MeshHandle {
    id: MeshId,
    mesh: Arc<ModelMesh>,
}

impl MeshHandle {
    pub fn new(mesh: ModelMesh) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self {
            id: MeshId(NEXT.fetch_add(1, Ordering::Relaxed)),
            mesh: Arc::new(mesh),
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn mesh(&self) -> &ModelMesh {
        &self.mesh
    }
}

/// Uniform block of `BasicMeshShader` (std140-compatible, 224 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub selected: u32,
    pub _pad: [u32; 3],
}

impl MeshUniforms {
    pub fn new(projection: Mat4, view: Mat4, model: Mat4, base_color: [f32; 4], selected: bool) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            base_color,
            selected: u32::from(selected),
            _pad: [0; 3],
        }
    }
}

/// Uniform block of `BasicTextShader`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TextUniforms {
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl TextUniforms {
    pub fn new(projection: Mat4, color: Vec3) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            color: color.extend(1.0).to_array(),
        }
    }
}

/// `xy` screen position in pixels, `zw` atlas texture coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub pos_uv: [f32; 4],
}

impl TextVertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { pos_uv: [x, y, u, v] }
    }
}

#[derive(Clone, Debug)]
pub enum DrawCommand {
    Mesh {
        shader: String,
        mesh: MeshHandle,
        uniforms: MeshUniforms,
    },
    Text {
        shader: String,
        atlas: Arc<GlyphAtlas>,
        uniforms: TextUniforms,
        vertices: Vec<TextVertex>,
    },
}

impl DrawCommand {
    pub fn shader(&self) -> &str {
        match self {
            DrawCommand::Mesh { shader, .. } | DrawCommand::Text { shader, .. } => shader,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Empty the list but keep its allocation for the next frame.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::{MeshData, MeshVertex};

    #[test]
    fn uniform_blocks_have_std140_sizes() {
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 224);
        assert_eq!(std::mem::size_of::<TextUniforms>(), 80);
        assert_eq!(std::mem::size_of::<TextVertex>(), 16);
    }

    #[test]
    fn cloned_handles_share_identity() {
        let mesh = ModelMesh::new(MeshData::new(vec![MeshVertex::default(); 3], vec![0, 1, 2]));
        let a = MeshHandle::new(mesh.clone());
        let b = a.clone();
        let c = MeshHandle::new(mesh);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn selected_flag_is_encoded_as_integer() {
        let u = MeshUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, [1.0; 4], true);
        assert_eq!(u.selected, 1);
    }
}
