//! MTL material libraries referenced by OBJ files. Only what the mesh shader
//! uses is read: diffuse colour (`Kd`), opacity (`d`/`Tr`) and the diffuse
//! map (`map_Kd`).

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};

use crate::obj::parse_f32;
use crate::texture::TextureData;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Material {
    pub base_color: [f32; 4],
    pub texture: Option<TextureData>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
        }
    }
}

/// Read a material library; texture paths resolve against its directory.
pub(crate) fn load_mtl(path: &Path) -> Result<HashMap<String, Material>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open MTL file: {}", path.display()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_mtl(BufReader::new(file), dir)
        .with_context(|| format!("Failed to parse MTL file: {}", path.display()))
}

pub(crate) fn parse_mtl<R: BufRead>(reader: R, dir: &Path) -> Result<HashMap<String, Material>> {
    let mut materials = HashMap::new();
    let mut current: Option<(String, Material)> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (tag, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((tag, rest)) => (tag, rest.trim()),
            None => (trimmed, ""),
        };

        if tag == "newmtl" {
            if let Some((name, material)) = current.take() {
                materials.insert(name, material);
            }
            current = Some((rest.to_owned(), Material::default()));
            continue;
        }
        let Some((name, material)) = current.as_mut() else {
            log::debug!("MTL statement '{}' before any newmtl on line {}", tag, line_no + 1);
            continue;
        };

        let mut parts = rest.split_whitespace();
        match tag {
            "Kd" => {
                for channel in &mut material.base_color[..3] {
                    *channel = parse_f32(parts.next(), line_no, "Kd component")?;
                }
            }
            "d" => material.base_color[3] = parse_f32(parts.next(), line_no, "dissolve")?,
            "Tr" => material.base_color[3] = 1.0 - parse_f32(parts.next(), line_no, "transparency")?,
            "map_Kd" => {
                // options such as `-s 1 1 1` come first; the file is last
                let Some(file) = parts.last() else {
                    log::warn!("map_Kd without a file for material '{}'", name);
                    continue;
                };
                match TextureData::load(dir.join(file)) {
                    Ok(texture) => material.texture = Some(texture),
                    Err(err) => log::warn!("Material '{}' drawn without its texture: {:#}", name, err),
                }
            }
            _ => {}
        }
    }
    if let Some((name, material)) = current {
        materials.insert(name, material);
    }
    Ok(materials)
}
