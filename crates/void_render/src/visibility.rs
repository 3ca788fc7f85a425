//! Frustum culling for lights and static meshes
//!
//! Produces the per-frame [`Visibility`] consumed by the light buffer, both
//! shadow atlases and the main pass. Indices always refer to positions in
//! the scene snapshot slices, in ascending order.

use void_math::{Aabb, BoundingSphere, Frustum, Vec3};

use crate::scene::{Light, LightKind, StaticMeshInstance};

/// Lights and meshes that passed culling for one camera
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    /// Indices into the scene's light list
    pub light_indices: Vec<usize>,
    /// Indices into the scene's static mesh list
    pub static_mesh_indices: Vec<usize>,
}

impl Visibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.light_indices.clear();
        self.static_mesh_indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.light_indices.is_empty() && self.static_mesh_indices.is_empty()
    }
}

/// Local-space spot light pyramid: the apex followed by the four far corners
///
/// The cone points down local -Z. Each far corner sits at
/// `(±r, ±r, -range)` with `r = tan(outer_angle / 2) * range`.
pub fn spot_light_local_vertices(range: f32, outer_angle: f32) -> [Vec3; 5] {
    let r = (outer_angle * 0.5).tan() * range;
    [
        Vec3::ZERO,
        Vec3::new(-r, -r, -range),
        Vec3::new(r, -r, -range),
        Vec3::new(r, r, -range),
        Vec3::new(-r, r, -range),
    ]
}

/// World-space bounds of a spot light's pyramid (rotation and translation only)
pub fn spot_light_world_bounds(light: &Light) -> Aabb {
    let local_to_world = light.transform.local_to_world_without_scale();
    let vertices = spot_light_local_vertices(light.range, light.outer_angle)
        .map(|vertex| local_to_world.transform_point3(vertex));
    Aabb::from_points(&vertices)
}

/// World-space bounding sphere of a point light
#[inline]
pub fn point_light_bounding_sphere(light: &Light) -> BoundingSphere {
    BoundingSphere::new(light.position(), light.range)
}

/// Whether a light can affect anything inside the frustum
pub fn is_light_visible(frustum: &Frustum, light: &Light) -> bool {
    match light.kind {
        LightKind::Directional => true,
        LightKind::Spot => frustum.intersects_aabb(&spot_light_world_bounds(light)),
        LightKind::Point => frustum.intersects_sphere(&point_light_bounding_sphere(light)),
    }
}

/// Whether a mesh instance (and its submesh, if any) intersects the frustum
pub fn is_static_mesh_visible(frustum: &Frustum, mesh: &StaticMeshInstance) -> bool {
    frustum.intersects_aabb(&mesh.world_bounds())
        && mesh
            .world_submesh_bounds()
            .map_or(true, |bounds| frustum.intersects_aabb(&bounds))
}

/// Replace `visibility.light_indices` with the lights that touch the frustum
pub fn cull_lights(frustum: &Frustum, lights: &[Light], visibility: &mut Visibility) {
    visibility.light_indices.clear();
    visibility.light_indices.extend(
        lights
            .iter()
            .enumerate()
            .filter(|(_, light)| is_light_visible(frustum, light))
            .map(|(idx, _)| idx),
    );
}

/// Replace `visibility.static_mesh_indices` with the meshes inside the frustum
pub fn cull_static_mesh_components(
    frustum: &Frustum,
    meshes: &[StaticMeshInstance],
    visibility: &mut Visibility,
) {
    visibility.static_mesh_indices.clear();
    visibility
        .static_mesh_indices
        .extend(static_meshes_in_frustum(frustum, meshes));
}

/// Indices of the meshes inside the frustum, ascending
pub fn static_meshes_in_frustum<'a>(
    frustum: &'a Frustum,
    meshes: &'a [StaticMeshInstance],
) -> impl Iterator<Item = usize> + 'a {
    meshes
        .iter()
        .enumerate()
        .filter(move |(_, mesh)| is_static_mesh_visible(frustum, mesh))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;
    use void_math::{Mat4, Transform};

    fn camera_frustum() -> Frustum {
        let camera =
            Camera::perspective(Transform::IDENTITY, core::f32::consts::FRAC_PI_2, 0.1, 100.0);
        camera.frustum(1.0)
    }

    #[test]
    fn test_spot_local_vertices() {
        let vertices = spot_light_local_vertices(10.0, core::f32::consts::FRAC_PI_2);
        assert_eq!(vertices[0], Vec3::ZERO);
        for vertex in &vertices[1..] {
            assert!((vertex.x.abs() - 10.0).abs() < 1e-4);
            assert!((vertex.y.abs() - 10.0).abs() < 1e-4);
            assert_eq!(vertex.z, -10.0);
        }
    }

    #[test]
    fn test_directional_always_visible() {
        let frustum = camera_frustum();
        let lights = [Light::directional(Vec3::Z)];
        let mut visibility = Visibility::new();
        cull_lights(&frustum, &lights, &mut visibility);
        assert_eq!(visibility.light_indices, vec![0]);
    }

    #[test]
    fn test_cull_lights_mixed() {
        let frustum = camera_frustum();
        let lights = [
            Light::point(Vec3::new(0.0, 0.0, -10.0), 2.0),
            // Far behind the camera
            Light::point(Vec3::new(0.0, 0.0, 50.0), 2.0),
            // Behind the camera but reaching into the view
            Light::spot(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, 20.0, 0.5),
            // Behind the camera pointing away
            Light::spot(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, 20.0, 0.5),
            Light::directional(Vec3::NEG_Y),
        ];
        let mut visibility = Visibility::new();
        cull_lights(&frustum, &lights, &mut visibility);
        assert_eq!(visibility.light_indices, vec![0, 2, 4]);
    }

    #[test]
    fn test_spot_bounds_ignore_scale() {
        let mut light = Light::spot(Vec3::ZERO, Vec3::NEG_Z, 10.0, core::f32::consts::FRAC_PI_2);
        let unscaled = spot_light_world_bounds(&light);
        light.transform.scale = Vec3::splat(5.0);
        assert_eq!(spot_light_world_bounds(&light), unscaled);
    }

    #[test]
    fn test_cull_static_meshes() {
        let frustum = camera_frustum();
        let unit = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let meshes = [
            StaticMeshInstance::new(unit, Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))),
            StaticMeshInstance::new(unit, Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0))),
            StaticMeshInstance::new(unit, Mat4::from_translation(Vec3::new(0.0, 0.0, -200.0))),
            // Mesh is in view but the drawn submesh sits behind the camera
            StaticMeshInstance::new(
                Aabb::new(Vec3::splat(-20.0), Vec3::splat(20.0)),
                Mat4::IDENTITY,
            )
            .with_submesh_bounds(Aabb::new(Vec3::new(-1.0, -1.0, 10.0), Vec3::new(1.0, 1.0, 12.0))),
        ];
        let mut visibility = Visibility::new();
        cull_static_mesh_components(&frustum, &meshes, &mut visibility);
        assert_eq!(visibility.static_mesh_indices, vec![0]);
    }

    #[test]
    fn test_empty_scene() {
        let frustum = camera_frustum();
        let mut visibility = Visibility {
            light_indices: vec![3],
            static_mesh_indices: vec![7],
        };
        cull_lights(&frustum, &[], &mut visibility);
        cull_static_mesh_components(&frustum, &[], &mut visibility);
        assert!(visibility.is_empty());
    }
}
