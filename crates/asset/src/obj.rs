//! OBJ parser supporting positions, normals, texture coordinates, `o`/`g`
//! groups and MTL materials. Each group or material change starts a new mesh
//! of the resulting [`Model`].

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use crate::mesh::{MeshData, MeshVertex};
use crate::model::{Model, ModelMesh};
use crate::mtl::{self, Material};

/// Load an OBJ model from a file path. `mtllib` files resolve against the
/// OBJ's directory.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    let parser = ObjParser {
        base_dir: Some(path.parent().map(PathBuf::from).unwrap_or_default()),
        ..ObjParser::default()
    };
    parser.parse(BufReader::new(file), name)
}

/// Load an OBJ model from a [`BufRead`] implementation. Without a file to
/// resolve against, `mtllib` statements are ignored.
pub fn load_obj_from_reader<R: BufRead>(reader: R, name: &str) -> Result<Model> {
    ObjParser::default().parse(reader, name)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<Model> {
    load_obj_from_reader(io::Cursor::new(contents), "inline")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct Key(usize, Option<usize>, Option<usize>);

/// Geometry of the group currently being filled.
#[derive(Default)]
struct Group {
    unique: HashMap<Key, u32>,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    has_normals: bool,
}

impl Group {
    fn finish(self) -> Option<MeshData> {
        if self.indices.is_empty() {
            return None;
        }
        let mut mesh = MeshData::new(self.vertices, self.indices);
        if !self.has_normals {
            mesh.recompute_normals();
        }
        Some(mesh)
    }
}

#[derive(Default)]
struct ObjParser {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    group: Group,
    meshes: Vec<ModelMesh>,
    base_dir: Option<PathBuf>,
    materials: HashMap<String, Material>,
    material: Option<String>,
}

impl ObjParser {
    fn parse<R: BufRead>(mut self, reader: R, name: &str) -> Result<Model> {
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut parts = trimmed.split_whitespace();
            let Some(tag) = parts.next() else { continue };
            match tag {
                "v" => {
                    let p = parse_vec3(&mut parts, line_no)?;
                    self.positions.push(p);
                }
                "vn" => {
                    let n = parse_vec3(&mut parts, line_no)?;
                    self.normals.push(n);
                }
                "vt" => {
                    let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                    // OBJ's v axis points up; textures are sampled top-down.
                    let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                    self.texcoords.push([u, 1.0 - v]);
                }
                "f" => self.face(parts, line_no)?,
                "o" | "g" => self.flush_group(),
                "mtllib" => self.load_libraries(parts),
                "usemtl" => {
                    self.flush_group();
                    self.material = parts.next().map(str::to_owned);
                }
                // s, l, p and friends carry nothing we draw
                _ => {}
            }
        }
        self.flush_group();

        if self.meshes.is_empty() {
            anyhow::bail!("OBJ contained no triangles");
        }
        Ok(Model::new(name, self.meshes))
    }

    fn flush_group(&mut self) {
        let Some(mesh) = std::mem::take(&mut self.group).finish() else {
            return;
        };
        let mut model_mesh = ModelMesh::new(mesh);
        if let Some(name) = &self.material {
            match self.materials.get(name) {
                Some(material) => {
                    model_mesh.base_color = material.base_color;
                    model_mesh.texture = material.texture.clone();
                }
                None => log::warn!("Unknown OBJ material '{}'; using white", name),
            }
        }
        self.meshes.push(model_mesh);
    }

    fn load_libraries<'a>(&mut self, files: impl Iterator<Item = &'a str>) {
        let Some(dir) = self.base_dir.clone() else {
            log::debug!("OBJ read from a stream; mtllib ignored");
            return;
        };
        for file in files {
            match mtl::load_mtl(&dir.join(file)) {
                Ok(materials) => {
                    log::debug!("Loaded {} material(s) from {}", materials.len(), file);
                    self.materials.extend(materials);
                }
                Err(err) => log::warn!("{:#}", err),
            }
        }
    }

    fn face<'a>(&mut self, parts: impl Iterator<Item = &'a str>, line_no: usize) -> Result<()> {
        let mut corners: Vec<u32> = Vec::new();
        for token in parts {
            let (vi, vti, vni) = parse_face_vertex(
                token,
                self.positions.len(),
                self.texcoords.len(),
                self.normals.len(),
                line_no,
            )?;
            let key = Key(vi, vti, vni);
            let index = match self.group.unique.get(&key) {
                Some(&idx) => idx,
                None => {
                    let position = self.positions[vi];
                    let uv = vti.map_or([0.0, 0.0], |i| self.texcoords[i]);
                    let normal = match vni {
                        Some(i) => {
                            self.group.has_normals = true;
                            self.normals[i]
                        }
                        None => [0.0, 0.0, 0.0],
                    };
                    let idx = u32::try_from(self.group.vertices.len())
                        .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
                    self.group.vertices.push(MeshVertex::new(position, normal, uv));
                    self.group.unique.insert(key, idx);
                    idx
                }
            };
            corners.push(index);
        }

        if corners.len() < 3 {
            log::debug!("Skipping degenerate OBJ face on line {}", line_no + 1);
            return Ok(());
        }
        for tri in 1..(corners.len() - 1) {
            self.group
                .indices
                .extend_from_slice(&[corners[0], corners[tri], corners[tri + 1]]);
        }
        Ok(())
    }
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>, line_no: usize) -> Result<[f32; 3]> {
    Ok([
        parse_f32(parts.next(), line_no, "x component")?,
        parse_f32(parts.next(), line_no, "y component")?,
        parse_f32(parts.next(), line_no, "z component")?,
    ])
}

pub(crate) fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

/// Split `v`, `v/vt`, `v//vn` or `v/vt/vn` into resolved zero-based indices.
fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let mut optional = |count| match split.next() {
        Some(value) if !value.is_empty() => resolve_index(value, count, line_no).map(Some),
        _ => Ok(None),
    };
    let tex_idx = optional(tex_count)?;
    let norm_idx = optional(norm_count)?;

    Ok((pos_idx, tex_idx, norm_idx))
}

/// OBJ indices are 1-based; negative values count back from the latest element.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    let idx = match raw {
        0 => anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1),
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }
    Ok(idx as usize)
}
