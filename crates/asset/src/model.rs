//! Imported models: one or more meshes with a simple material each.

use std::path::Path;

use anyhow::{Result, anyhow};
use corelib::BoundingSphere;

use crate::mesh::MeshData;
use crate::texture::TextureData;

/// Mesh plus the material bits the basic mesh shader understands.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMesh {
    pub mesh: MeshData,
    pub base_color: [f32; 4],
    pub texture: Option<TextureData>,
}

impl ModelMesh {
    pub fn new(mesh: MeshData) -> Self {
        Self {
            mesh,
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    pub fn new(name: impl Into<String>, meshes: Vec<ModelMesh>) -> Self {
        Self {
            name: name.into(),
            meshes,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.mesh.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.mesh.triangle_count()).sum()
    }

    /// Sphere around every vertex of every mesh.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_points(self.meshes.iter().flat_map(|m| m.mesh.positions()))
    }
}

/// File formats the import layer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
    Stl,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 3] = [ModelFormat::Obj, ModelFormat::Gltf, ModelFormat::Stl];

    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            ModelFormat::Obj => &["obj"],
            ModelFormat::Gltf => &["gltf", "glb"],
            ModelFormat::Stl => &["stl"],
        }
    }

    /// Match an extension case-insensitively, with or without a leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        Self::ALL.into_iter().find(|format| {
            format
                .extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Import a model, picking the importer from the file extension.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let format = ModelFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unsupported model format: {}", path.display()))?;
    log::info!("Importing {:?} model from {}", format, path.display());

    let model = match format {
        ModelFormat::Obj => crate::obj::load_obj_from_path(path)?,
        ModelFormat::Gltf => crate::gltf_model::load_gltf(path)?,
        ModelFormat::Stl => crate::stl::load_stl(path)?,
    };

    log::info!(
        "Imported '{}': {} meshes, {} vertices, {} triangles",
        model.name,
        model.meshes.len(),
        model.vertex_count(),
        model.triangle_count()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extension_matching_ignores_case_and_dot() {
        assert_eq!(ModelFormat::from_extension("OBJ"), Some(ModelFormat::Obj));
        assert_eq!(ModelFormat::from_extension(".glb"), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_extension("Stl"), Some(ModelFormat::Stl));
        assert_eq!(ModelFormat::from_extension("fbx"), None);
        assert_eq!(ModelFormat::from_extension(""), None);
    }

    #[test]
    fn load_model_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.OBJ");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3").unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.name, "tri");
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = load_model("scene.blend").unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }
}
