//! Asset loading: model import (OBJ/glTF/STL), textures, font rasterization
//! and glyph atlas packing. Everything here is CPU-side; GPU upload lives in
//! the renderer.

pub mod atlas;
pub mod font;
pub mod gltf_model;
pub mod mesh;
pub mod model;
mod mtl;
pub mod obj;
pub mod stl;
pub mod texture;

pub use atlas::{AtlasId, AtlasRegion, Glyph, GlyphAtlas};
pub use font::{FontFace, GlyphBitmap};
pub use mesh::{MeshData, MeshVertex};
pub use model::{Model, ModelFormat, ModelMesh, load_model};
pub use texture::{TextureData, TextureFormat};
