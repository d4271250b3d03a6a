//! Core types: math re-exports, Transform, Camera, picking geometry.

pub use glam::{EulerRot, IVec2, Mat3, Mat4, Quat, Vec2, Vec3, Vec4, ivec2, vec2, vec3, vec4};

pub mod camera;
pub mod geometry;
pub mod transform;

pub use geometry::{BoundingSphere, GeometryError, Segment};

