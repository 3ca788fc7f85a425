//! # void_math - Shadow Renderer Math
//!
//! Bounding volumes, frustum intersection, transforms and the power-of-two
//! grid used to lay out shadow atlases. Vector and matrix types come from
//! `glam` and are re-exported here.

pub mod bounds;
pub mod frustum;
pub mod grid;
pub mod transform;

pub use bounds::*;
pub use frustum::*;
pub use grid::*;
pub use transform::*;

pub use glam;
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::bounds::{Aabb, BoundingSphere};
    pub use crate::frustum::{Frustum, Plane};
    pub use crate::grid::{subdivision_for_element_count, GridError, GridLike};
    pub use crate::transform::Transform;
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
