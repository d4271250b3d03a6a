//! glTF/GLB import. Node transforms are baked into vertex data so each
//! primitive becomes a self-contained mesh in model space.

use std::path::Path;

use anyhow::{Context, Result, bail};
use corelib::{Mat3, Mat4, Vec3};

use crate::mesh::{MeshData, MeshVertex};
use crate::model::{Model, ModelMesh};
use crate::texture::TextureData;

pub fn load_gltf(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)
        .with_context(|| format!("Failed to import glTF file: {}", path.display()))?;

    let mut meshes = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                process_node(&node, Mat4::IDENTITY, &buffers, &images, &mut meshes)?;
            }
        }
        None => {
            // Scene-less files still carry meshes; draw them untransformed.
            for mesh in document.meshes() {
                process_mesh(&mesh, Mat4::IDENTITY, &buffers, &images, &mut meshes)?;
            }
        }
    }

    if meshes.is_empty() {
        bail!("glTF file {} contained no triangle meshes", path.display());
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    Ok(Model::new(name, meshes))
}

fn process_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    out: &mut Vec<ModelMesh>,
) -> Result<()> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, world, buffers, images, out)?;
    }
    for child in node.children() {
        process_node(&child, world, buffers, images, out)?;
    }
    Ok(())
}

fn process_mesh(
    mesh: &gltf::Mesh,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    out: &mut Vec<ModelMesh>,
) -> Result<()> {
    let name = mesh.name().unwrap_or("unnamed");
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive in mesh '{}': only triangles are drawn",
                primitive.mode(),
                name
            );
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Primitive in mesh '{}' has no positions", name);
            continue;
        };
        let positions: Vec<Vec3> = positions
            .map(|p| world.transform_point3(Vec3::from(p)))
            .collect();

        let normals: Option<Vec<Vec3>> = reader.read_normals().map(|iter| {
            iter.map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero())
                .collect()
        });
        let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|tc| tc.into_f32().collect());
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let normal = normals.as_ref().and_then(|n| n.get(i)).copied().unwrap_or(Vec3::ZERO);
                let uv = uvs.as_ref().and_then(|t| t.get(i)).copied().unwrap_or([0.0, 0.0]);
                MeshVertex::new(p.to_array(), normal.to_array(), uv)
            })
            .collect();

        let mut data = MeshData::new(vertices, indices);
        if normals.is_none() {
            data.recompute_normals();
        }
        if !data.is_valid() {
            continue;
        }

        let pbr = primitive.material().pbr_metallic_roughness();
        let texture = pbr
            .base_color_texture()
            .and_then(|info| images.get(info.texture().source().index()))
            .and_then(|image| convert_image(image, name));

        out.push(ModelMesh {
            mesh: data,
            base_color: pbr.base_color_factor(),
            texture,
        });
    }
    Ok(())
}

/// Expand decoded glTF images to RGBA8. 16-bit and float images are skipped.
fn convert_image(image: &gltf::image::Data, mesh: &str) -> Option<TextureData> {
    use gltf::image::Format;

    let rgba: Vec<u8> = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => {
            log::warn!("Unsupported texture format {:?} on mesh '{}'", other, mesh);
            return None;
        }
    };

    match TextureData::new_rgba8(image.width, image.height, rgba) {
        Ok(texture) => Some(texture),
        Err(err) => {
            log::warn!("Dropping texture on mesh '{}': {:#}", mesh, err);
            None
        }
    }
}
