//! Read-only scene snapshots
//!
//! Lights, cameras and static meshes as seen by culling and shadow
//! allocation for one frame. The scene graph hands over world transforms
//! and bounds; nothing here is mutated while a frame is being prepared.

use serde::{Deserialize, Serialize};
use void_math::{Aabb, Frustum, Mat4, Transform, Vec3};

/// Light type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum LightKind {
    Directional = 0,
    Spot = 1,
    Point = 2,
}

/// Light source snapshot
///
/// Local forward (-Z) is the light direction for directional and spot
/// lights. Cone angles are full angles in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    /// Linear RGB
    pub color: Vec3,
    pub intensity: f32,
    pub transform: Transform,
    /// Reach of spot and point lights
    pub range: f32,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub casts_shadow: bool,
    pub shadow_near_plane: f32,
    pub shadow_normal_bias: f32,
    pub shadow_depth_bias: f32,
    /// Extra depth toward a directional light captured by its cascades
    pub shadow_extension: f32,
}

impl Light {
    pub const MIN_INTENSITY: f32 = 0.0;
    pub const MIN_RANGE: f32 = 0.0;
    pub const MIN_SHADOW_NEAR_PLANE: f32 = 0.1;
    pub const MIN_SHADOW_EXTENSION: f32 = 0.0;
    pub const MAX_ANGLE: f32 = 179.0 * core::f32::consts::PI / 180.0;

    /// Create a light of the given kind with engine defaults
    pub fn new(kind: LightKind) -> Self {
        let thirty_degrees = core::f32::consts::PI / 6.0;
        Self {
            kind,
            color: Vec3::ONE,
            intensity: 1.0,
            transform: Transform::IDENTITY,
            range: 10.0,
            inner_angle: thirty_degrees,
            outer_angle: thirty_degrees,
            casts_shadow: false,
            shadow_near_plane: Self::MIN_SHADOW_NEAR_PLANE,
            shadow_normal_bias: 0.0,
            shadow_depth_bias: 0.0,
            shadow_extension: Self::MIN_SHADOW_EXTENSION,
        }
    }

    /// Directional light shining along `direction`
    pub fn directional(direction: Vec3) -> Self {
        Self {
            transform: Transform::looking_to(Vec3::ZERO, direction),
            ..Self::new(LightKind::Directional)
        }
    }

    /// Spot light at `position` pointing along `direction`, hard-edged cone
    pub fn spot(position: Vec3, direction: Vec3, range: f32, outer_angle: f32) -> Self {
        Self::new(LightKind::Spot)
            .with_transform(Transform::looking_to(position, direction))
            .with_range(range)
            .with_cone(outer_angle, outer_angle)
    }

    /// Point light at `position`
    pub fn point(position: Vec3, range: f32) -> Self {
        Self::new(LightKind::Point)
            .with_transform(Transform::from_position(position))
            .with_range(range)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vec3, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity.max(Self::MIN_INTENSITY);
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range.max(Self::MIN_RANGE);
        self
    }

    /// Set inner and outer cone angles, keeping `0 <= inner <= outer <= 179°`
    pub fn with_cone(mut self, inner_angle: f32, outer_angle: f32) -> Self {
        self.outer_angle = outer_angle.clamp(0.0, Self::MAX_ANGLE);
        self.inner_angle = inner_angle.clamp(0.0, self.outer_angle);
        self
    }

    pub fn with_shadows(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }

    pub fn with_shadow_near_plane(mut self, near: f32) -> Self {
        self.shadow_near_plane = near.max(Self::MIN_SHADOW_NEAR_PLANE);
        self
    }

    pub fn with_shadow_bias(mut self, depth_bias: f32, normal_bias: f32) -> Self {
        self.shadow_depth_bias = depth_bias;
        self.shadow_normal_bias = normal_bias;
        self
    }

    pub fn with_shadow_extension(mut self, extension: f32) -> Self {
        self.shadow_extension = extension.max(Self::MIN_SHADOW_EXTENSION);
        self
    }

    /// Clamp fields written directly back into their valid ranges
    pub fn validate(&mut self) {
        self.intensity = self.intensity.max(Self::MIN_INTENSITY);
        self.range = self.range.max(Self::MIN_RANGE);
        self.shadow_near_plane = self.shadow_near_plane.max(Self::MIN_SHADOW_NEAR_PLANE);
        self.shadow_extension = self.shadow_extension.max(Self::MIN_SHADOW_EXTENSION);
        self.outer_angle = self.outer_angle.clamp(0.0, Self::MAX_ANGLE);
        self.inner_angle = self.inner_angle.clamp(0.0, self.outer_angle);
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Normalized light direction (local -Z)
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.transform.forward().normalize_or_zero()
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightKind::Directional)
    }
}

/// Camera projection
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Vertical field of view in radians
    Perspective { fov_y: f32 },
    /// Vertical extent of the view volume in world units
    Orthographic { height: f32 },
}

/// Camera snapshot
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub transform: Transform,
    pub near: f32,
    pub far: f32,
    pub projection: Projection,
}

impl Camera {
    pub fn perspective(transform: Transform, fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            transform,
            near,
            far,
            projection: Projection::Perspective { fov_y },
        }
    }

    pub fn orthographic(transform: Transform, height: f32, near: f32, far: f32) -> Self {
        Self {
            transform,
            near,
            far,
            projection: Projection::Orthographic { height },
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.transform.forward().normalize_or_zero()
    }

    /// World to view (scale is ignored)
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.local_to_world_without_scale().inverse()
    }

    /// View to clip, right-handed with zero-to-one depth
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh(fov_y, aspect, self.near, self.far)
            }
            Projection::Orthographic { height } => {
                let half_height = height * 0.5;
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World-space view frustum
    pub fn frustum(&self, aspect: f32) -> Frustum {
        Frustum::from_view_projection(&self.view_projection(aspect))
    }
}

/// Static mesh instance registered with the renderer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticMeshInstance {
    /// Object-space bounds of the whole mesh
    pub local_bounds: Aabb,
    pub local_to_world: Mat4,
    /// Object-space bounds of the drawn submesh, if narrower than the mesh
    pub submesh_bounds: Option<Aabb>,
}

impl StaticMeshInstance {
    pub fn new(local_bounds: Aabb, local_to_world: Mat4) -> Self {
        Self {
            local_bounds,
            local_to_world,
            submesh_bounds: None,
        }
    }

    pub fn with_submesh_bounds(mut self, bounds: Aabb) -> Self {
        self.submesh_bounds = Some(bounds);
        self
    }

    #[inline]
    pub fn world_bounds(&self) -> Aabb {
        self.local_bounds.transform(&self.local_to_world)
    }

    #[inline]
    pub fn world_submesh_bounds(&self) -> Option<Aabb> {
        self.submesh_bounds
            .map(|bounds| bounds.transform(&self.local_to_world))
    }
}

/// Everything culling and shadow allocation read for one frame
#[derive(Clone, Copy, Debug, Default)]
pub struct SceneSnapshot<'a> {
    pub lights: &'a [Light],
    pub static_meshes: &'a [StaticMeshInstance],
}

impl<'a> SceneSnapshot<'a> {
    pub fn new(lights: &'a [Light], static_meshes: &'a [StaticMeshInstance]) -> Self {
        Self { lights, static_meshes }
    }
}
