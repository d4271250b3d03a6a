//! Named shaders. Plugins look shaders up by name and record commands
//! against them; the renderer compiles one pipeline per registered shader.

use std::collections::BTreeMap;

use crate::error::EngineError;

pub const BASIC_MESH_SHADER: &str = "BasicMeshShader";
pub const BASIC_TEXT_SHADER: &str = "BasicTextShader";

/// Which vertex layout and bind groups a shader expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderKind {
    /// `MeshVertex` input, `MeshUniforms` + base texture.
    Mesh,
    /// `TextVertex` input, `TextUniforms` + glyph atlas.
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    pub name: String,
    pub kind: ShaderKind,
    /// WGSL with `vs_main` and `fs_main` entry points.
    pub source: String,
}

#[derive(Debug, Default)]
pub struct ShaderManager {
    shaders: BTreeMap<String, Shader>,
}

impl ShaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager.add(BASIC_MESH_SHADER, ShaderKind::Mesh, include_str!("shaders/basic_mesh.wgsl"));
        manager.add(BASIC_TEXT_SHADER, ShaderKind::Text, include_str!("shaders/basic_text.wgsl"));
        manager
    }

    /// Register or replace a shader.
    pub fn add(&mut self, name: &str, kind: ShaderKind, source: impl Into<String>) {
        let shader = Shader {
            name: name.to_owned(),
            kind,
            source: source.into(),
        };
        if self.shaders.insert(name.to_owned(), shader).is_some() {
            log::info!("Replaced shader '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Shader> {
        self.shaders.get(name)
    }

    /// Look up a shader and check it matches the kind of draw being recorded.
    pub fn get_kind(&self, name: &str, kind: ShaderKind) -> Result<&Shader, EngineError> {
        let shader = self
            .get(name)
            .ok_or_else(|| EngineError::MissingShader(name.to_owned()))?;
        if shader.kind != kind {
            return Err(EngineError::WrongShaderKind {
                name: name.to_owned(),
                expected: kind,
                actual: shader.kind,
            });
        }
        Ok(shader)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shader> {
        self.shaders.values()
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_with_entry_points() {
        let shaders = ShaderManager::with_builtins();
        for name in [BASIC_MESH_SHADER, BASIC_TEXT_SHADER] {
            let shader = shaders.get(name).unwrap();
            assert!(shader.source.contains("fn vs_main"));
            assert!(shader.source.contains("fn fs_main"));
        }
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let shaders = ShaderManager::with_builtins();
        assert!(shaders.get_kind(BASIC_MESH_SHADER, ShaderKind::Mesh).is_ok());
        assert!(matches!(
            shaders.get_kind(BASIC_MESH_SHADER, ShaderKind::Text),
            Err(EngineError::WrongShaderKind { .. })
        ));
        assert!(matches!(
            shaders.get_kind("Nope", ShaderKind::Text),
            Err(EngineError::MissingShader(_))
        ));
    }
}
