//! Drawable objects and the factories that build them from files.

use std::path::Path;

use corelib::{BoundingSphere, Vec3};

use crate::draw::{DrawContext, DrawList};
use crate::error::EngineError;

/// Something the scene can draw and, optionally, pick.
pub trait Renderable: Send {
    fn draw(&self, ctx: &DrawContext<'_>, list: &mut DrawList);

    fn selectable(&self) -> bool {
        false
    }

    /// Parametric distance in [0, 1] of the nearest hit along the segment
    /// `start..end` (model space), or `None` on a miss.
    fn hit_test(&self, _start: Vec3, _end: Vec3) -> Option<f32> {
        None
    }

    /// Sphere around the object in model space. The default has radius 0,
    /// which the scene treats as unbounded: picking goes straight to
    /// [`Renderable::hit_test`].
    fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::default()
    }

    fn assign_selection(&mut self, _start: Vec3, _end: Vec3, _intersection: Vec3) {}

    fn unassign_selection(&mut self) {}

    fn is_selected(&self) -> bool {
        false
    }
}

/// Builds renderables for the file extensions it accepts.
pub trait RenderableFactory: Send {
    fn name(&self) -> &str;

    /// `ext` comes without the leading dot, in whatever case the file uses.
    fn accept_extension(&self, ext: &str) -> bool;

    fn create(&self, path: &Path) -> anyhow::Result<Box<dyn Renderable>>;
}

#[derive(Default)]
pub struct RenderableManager {
    factories: Vec<Box<dyn RenderableFactory>>,
}

impl RenderableManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factory(&mut self, factory: Box<dyn RenderableFactory>) {
        log::info!("Registered renderable factory '{}'", factory.name());
        self.factories.push(factory);
    }

    pub fn factories(&self) -> impl Iterator<Item = &dyn RenderableFactory> {
        self.factories.iter().map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn factory_for(&self, path: &Path) -> Result<&dyn RenderableFactory, EngineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| EngineError::MissingExtension(path.to_path_buf()))?;
        self.factories()
            .find(|f| f.accept_extension(ext))
            .ok_or_else(|| EngineError::NoFactory(ext.to_owned()))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.factory_for(path).is_ok()
    }

    /// Create a renderable with the first registered factory accepting the
    /// file's extension.
    pub fn create(&self, path: &Path) -> Result<Box<dyn Renderable>, EngineError> {
        let factory = self.factory_for(path)?;
        log::debug!("Loading {} with '{}'", path.display(), factory.name());
        factory.create(path).map_err(|source| EngineError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}
