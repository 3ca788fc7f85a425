//! Rigid transform with scale for scene objects, lights and cameras

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale
///
/// Local forward is -Z, right is +X, up is +Y.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Position at `position`, local -Z pointing along `forward`
    pub fn looking_to(position: Vec3, forward: Vec3) -> Self {
        let forward = forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return Self::from_position(position);
        }
        // look_to_rh builds world -> view, its inverse rotation is local -> world
        let view = Mat4::look_to_rh(Vec3::ZERO, forward, stable_up_vector(forward));
        let rotation = Quat::from_mat4(&view).inverse();
        Self::from_position_rotation(position, rotation)
    }

    /// Local-to-world matrix (translation * rotation * scale)
    #[inline]
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Local-to-world matrix ignoring scale
    ///
    /// Light volumes are sized by range and cone angle, never by the
    /// transform's scale.
    #[inline]
    pub fn local_to_world_without_scale(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Forward direction (-Z in local space)
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Up vector for building a view looking along `direction`
///
/// Falls back to +Z when the direction is nearly parallel to +Y.
#[inline]
pub fn stable_up_vector(direction: Vec3) -> Vec3 {
    if direction.normalize_or_zero().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}
