use std::path::PathBuf;

use thiserror::Error;

use crate::shader::ShaderKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("'{0}' has no file extension")]
    MissingExtension(PathBuf),

    #[error("no renderable factory accepts '.{0}' files")]
    NoFactory(String),

    #[error("failed to load '{path}'")]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("shader '{0}' is not registered")]
    MissingShader(String),

    #[error("shader '{name}' is a {actual:?} shader, expected {expected:?}")]
    WrongShaderKind {
        name: String,
        expected: ShaderKind,
        actual: ShaderKind,
    },
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to open plugin library {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin {path} does not export `{symbol}`")]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
    },

    #[error("plugin '{name}' targets engine API {found}, host provides {expected}")]
    VersionMismatch {
        name: String,
        expected: i32,
        found: i32,
    },

    #[error("plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("plugin '{name}' failed to register (status {status})")]
    RegistrationFailed { name: String, status: i32 },

    #[error("plugin registration failed: {0:#}")]
    Setup(#[from] anyhow::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
