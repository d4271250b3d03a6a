//! Nova3D host API: the abstractions plugins are written against.
//!
//! A plugin receives the [`Application`] at registration time and adds
//! renderable factories, text providers or shaders to it. Nothing here talks
//! to the GPU; drawing is recorded into a [`DrawList`] that the renderer
//! executes.

pub mod app;
pub mod draw;
pub mod error;
pub mod plugin;
pub mod renderable;
pub mod scene;
pub mod shader;
pub mod text;
pub mod world;

/// Bumped whenever a type crossing the plugin boundary changes.
pub const API_VERSION: i32 = 1;

pub use app::{Application, EngineSettings};
pub use draw::{DrawCommand, DrawContext, DrawList, MeshHandle, MeshId, MeshUniforms, TextUniforms, TextVertex};
pub use error::{EngineError, PluginError};
pub use plugin::{HostLogger, PluginInfo, RegisterFn};
pub use renderable::{Renderable, RenderableFactory, RenderableManager};
pub use scene::{Scene, SceneId};
pub use shader::{Shader, ShaderKind, ShaderManager};
pub use text::{TextRenderer, TextRenderingService};
pub use world::World;
