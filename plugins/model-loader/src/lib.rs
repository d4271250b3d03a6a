//! Mesh-model plugin: imports model files and exposes them as selectable
//! renderables.

mod model;

use std::path::Path;

use asset::ModelFormat;
use engine::{Application, PluginError, Renderable, RenderableFactory};

pub use model::{MeshModel, MeshModelRenderable};

/// Creates [`MeshModelRenderable`]s for every format the import layer reads.
#[derive(Debug, Default)]
pub struct MeshModelFactory;

impl RenderableFactory for MeshModelFactory {
    fn name(&self) -> &str {
        "mesh-model"
    }

    fn accept_extension(&self, ext: &str) -> bool {
        ModelFormat::from_extension(ext).is_some()
    }

    fn create(&self, path: &Path) -> anyhow::Result<Box<dyn Renderable>> {
        log::info!("MeshModelRenderable::load {}", path.display());
        let model = MeshModel::load(path)?;
        Ok(Box::new(MeshModelRenderable::new(model)))
    }
}

pub fn register(app: &mut Application) -> Result<(), PluginError> {
    app.renderable_manager_mut()
        .add_factory(Box::new(MeshModelFactory));
    Ok(())
}

engine::export_plugin!(register);
