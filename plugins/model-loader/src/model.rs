use std::path::Path;

use anyhow::Result;
use asset::{Model, load_model};
use corelib::geometry::intersect_triangles;
use corelib::{BoundingSphere, Segment, Vec3};
use engine::shader::BASIC_MESH_SHADER;
use engine::{DrawCommand, DrawContext, DrawList, MeshHandle, MeshUniforms, Renderable, ShaderKind};

/// Triangles of one mesh kept CPU-side for picking.
struct PickMesh {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

/// Imported model ready for drawing and picking. Bounds are computed once.
pub struct MeshModel {
    name: String,
    handles: Vec<MeshHandle>,
    pick: Vec<PickMesh>,
    bounds: BoundingSphere,
}

impl MeshModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_model(load_model(path)?))
    }

    pub fn from_model(model: Model) -> Self {
        let bounds = model.bounding_sphere();
        let pick = model
            .meshes
            .iter()
            .map(|m| PickMesh {
                positions: m.mesh.positions().collect(),
                indices: m.mesh.indices.clone(),
            })
            .collect();
        let handles = model.meshes.into_iter().map(MeshHandle::new).collect();
        Self {
            name: model.name,
            handles,
            pick,
            bounds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[MeshHandle] {
        &self.handles
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounds
    }

    /// Nearest parametric hit over every mesh.
    pub fn test_intersection(&self, start: Vec3, end: Vec3) -> Option<f32> {
        let segment = Segment::new(start, end);
        self.pick
            .iter()
            .filter_map(|m| intersect_triangles(&segment, &m.positions, &m.indices))
            .min_by(f32::total_cmp)
    }
}

pub struct MeshModelRenderable {
    model: MeshModel,
    selected: bool,
    last_hit: Option<Vec3>,
}

impl MeshModelRenderable {
    pub fn new(model: MeshModel) -> Self {
        Self {
            model,
            selected: false,
            last_hit: None,
        }
    }

    pub fn model(&self) -> &MeshModel {
        &self.model
    }

    /// Model-space point where the current selection hit.
    pub fn selection_point(&self) -> Option<Vec3> {
        self.last_hit
    }
}

impl Renderable for MeshModelRenderable {
    fn draw(&self, ctx: &DrawContext<'_>, list: &mut DrawList) {
        let shader = match ctx.shaders.get_kind(BASIC_MESH_SHADER, ShaderKind::Mesh) {
            Ok(shader) => shader,
            Err(err) => {
                log::warn!("Cannot draw '{}': {}", self.model.name, err);
                return;
            }
        };

        let projection = ctx.world.projection_matrix();
        let view = ctx.world.view_matrix();
        let model = ctx.world.model_matrix();
        for handle in &self.model.handles {
            list.push(DrawCommand::Mesh {
                shader: shader.name.clone(),
                uniforms: MeshUniforms::new(
                    projection,
                    view,
                    model,
                    handle.mesh().base_color,
                    self.selected,
                ),
                mesh: handle.clone(),
            });
        }
    }

    fn selectable(&self) -> bool {
        true
    }

    fn hit_test(&self, start: Vec3, end: Vec3) -> Option<f32> {
        self.model.test_intersection(start, end)
    }

    fn bounding_sphere(&self) -> BoundingSphere {
        self.model.bounding_sphere()
    }

    fn assign_selection(&mut self, _start: Vec3, _end: Vec3, intersection: Vec3) {
        self.selected = true;
        self.last_hit = Some(intersection);
    }

    fn unassign_selection(&mut self) {
        self.selected = false;
        self.last_hit = None;
    }

    fn is_selected(&self) -> bool {
        self.selected
    }
}
