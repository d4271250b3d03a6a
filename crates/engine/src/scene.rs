//! Scene: renderables with per-object transforms, drawing and picking.

use corelib::transform::Transform;
use corelib::{Mat4, Segment};

use crate::draw::{DrawContext, DrawList};
use crate::renderable::Renderable;
use crate::shader::ShaderManager;
use crate::world::World;

/// Dense object id; slots of despawned objects are not reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub u32);

struct Entry {
    transform: Transform,
    renderable: Box<dyn Renderable>,
}

#[derive(Default)]
pub struct Scene {
    entries: Vec<Option<Entry>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, renderable: Box<dyn Renderable>, transform: Transform) -> SceneId {
        let id = SceneId(self.entries.len() as u32);
        self.entries.push(Some(Entry {
            transform,
            renderable,
        }));
        id
    }

    pub fn despawn(&mut self, id: SceneId) -> Option<Box<dyn Renderable>> {
        self.entries
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .map(|e| e.renderable)
    }

    #[inline]
    pub fn is_alive(&self, id: SceneId) -> bool {
        self.entry(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: SceneId) -> Option<&Entry> {
        self.entries.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get(&self, id: SceneId) -> Option<&dyn Renderable> {
        self.entry(id).map(|e| e.renderable.as_ref())
    }

    fn iter(&self) -> impl Iterator<Item = (SceneId, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (SceneId(i as u32), e)))
    }

    /// Ids of every selected object.
    pub fn selected(&self) -> Vec<SceneId> {
        self.iter()
            .filter(|(_, e)| e.renderable.is_selected())
            .map(|(id, _)| id)
            .collect()
    }

    /// Record every object. Each draws with the world's camera and its own
    /// transform as the model matrix.
    pub fn draw_all(&self, world: &World, shaders: &ShaderManager, list: &mut DrawList) {
        for (_, entry) in self.iter() {
            let object_world = World {
                camera: world.camera,
                model: entry.transform,
            };
            let ctx = DrawContext {
                world: &object_world,
                shaders,
            };
            entry.renderable.draw(&ctx, list);
        }
    }

    /// Select the nearest selectable object hit by `segment` (world space) and
    /// deselect everything else. Returns the picked id and the parametric hit
    /// distance along `segment`.
    pub fn pick(&mut self, segment: &Segment) -> Option<(SceneId, f32)> {
        let mut best: Option<(SceneId, f32, Segment)> = None;

        for (id, entry) in self.iter() {
            let renderable = &entry.renderable;
            if !renderable.selectable() {
                continue;
            }
            // Affine maps keep the segment parameter, so t values from
            // different objects stay comparable.
            let to_model: Mat4 = entry.transform.matrix().inverse();
            let local = segment.transformed(&to_model);
            let sphere = renderable.bounding_sphere();
            if sphere.radius > 0.0 && !sphere.intersects_segment(&local) {
                continue;
            }
            if let Some(t) = renderable.hit_test(local.start, local.end) {
                if best.is_none_or(|(_, best_t, _)| t < best_t) {
                    best = Some((id, t, local));
                }
            }
        }

        for (i, slot) in self.entries.iter_mut().enumerate() {
            let Some(entry) = slot else { continue };
            match best {
                Some((id, t, local)) if id.0 as usize == i => {
                    entry
                        .renderable
                        .assign_selection(local.start, local.end, local.point_at(t));
                }
                _ => entry.renderable.unassign_selection(),
            }
        }

        if let Some((id, t, _)) = best {
            log::debug!("Picked object {:?} at t={:.4}", id, t);
        }
        best.map(|(id, t, _)| (id, t))
    }

    pub fn clear_selection(&mut self) {
        for entry in self.entries.iter_mut().flatten() {
            entry.renderable.unassign_selection();
        }
    }
}
