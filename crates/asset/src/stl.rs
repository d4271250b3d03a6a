//! STL import (ASCII and binary). Faces keep their own vertices so the facet
//! normals stay flat.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result, bail};
use corelib::Vec3;

use crate::mesh::{MeshData, MeshVertex};
use crate::model::{Model, ModelMesh};

pub fn load_stl(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open STL file: {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    load_stl_from_reader(&mut BufReader::new(file), name)
}

pub fn load_stl_from_reader<R: Read + Seek>(reader: &mut R, name: &str) -> Result<Model> {
    let stl = stl_io::read_stl(reader).context("Failed to parse STL")?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    for face in &stl.faces {
        let corners = face.vertices.map(|i| {
            let v = stl.vertices[i];
            Vec3::new(v[0], v[1], v[2])
        });
        let stored = Vec3::new(face.normal[0], face.normal[1], face.normal[2]);
        // Exporters frequently write zero normals; derive one from the winding.
        let normal = stored
            .try_normalize()
            .or_else(|| (corners[1] - corners[0]).cross(corners[2] - corners[0]).try_normalize())
            .unwrap_or(Vec3::Z);

        for corner in corners {
            indices.push(vertices.len() as u32);
            vertices.push(MeshVertex::new(corner.to_array(), normal.to_array(), [0.0, 0.0]));
        }
    }

    if indices.is_empty() {
        bail!("STL contained no triangles");
    }
    Ok(Model::new(name, vec![ModelMesh::new(MeshData::new(vertices, indices))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ASCII_TRIANGLE: &str = "\
solid tri
  facet normal 0 0 0
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";

    #[test]
    fn ascii_stl_with_zero_normal_gets_winding_normal() {
        let model = load_stl_from_reader(&mut Cursor::new(ASCII_TRIANGLE), "tri").unwrap();
        let mesh = &model.meshes[0].mesh;
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_stl_from_reader(&mut Cursor::new("not an stl"), "x").is_err());
    }

    fn facet(normal: [f32; 3], corners: [[f32; 3]; 3]) -> stl_io::Triangle {
        stl_io::Triangle {
            normal: stl_io::Normal::new(normal),
            vertices: corners.map(stl_io::Vertex::new),
        }
    }

    #[test]
    fn binary_stl_keeps_facets_and_stored_normals() {
        let facets = [
            facet([0.0, 0.0, 1.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
            facet([0.0, 0.0, 0.0], [[0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 0.0, 1.0]]),
        ];
        let mut bytes = Cursor::new(Vec::new());
        stl_io::write_stl(&mut bytes, facets.iter()).unwrap();
        bytes.set_position(0);

        let model = load_stl_from_reader(&mut bytes, "pair").unwrap();
        assert_eq!(model.name, "pair");
        assert_eq!(model.triangle_count(), 2);
        let mesh = &model.meshes[0].mesh;
        // faces do not share vertices
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[5].position, [1.0, 0.0, 1.0]);
        assert!(mesh.vertices[..3].iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        // the second facet is wound clockwise seen from +Z
        assert!(mesh.vertices[3..].iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
    }
}
