//! Cascaded Shadow Map Calculations
//!
//! Cascade split calculations and light space matrix fitting for
//! directional light shadows. Backend-agnostic, math only.
//!
//! # Cascade Shadow Maps (CSM)
//!
//! CSM divides the view frustum into depth slices (cascades) and renders a
//! separate shadow map for each. Near cascades cover less of the scene, so
//! their texels are smaller on screen and shadows near the camera stay sharp.

use serde::{Deserialize, Serialize};
use void_math::{lerp, stable_up_vector, Aabb, Frustum, Mat4, Vec2, Vec3};

/// Cascades per directional light
pub const CASCADE_COUNT: usize = 4;

/// View-depth range covered by one cascade
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeBounds {
    pub near: f32,
    pub far: f32,
}

/// Split `[near, far]` into cascades using the practical split scheme
///
/// Each split blends a logarithmic and a uniform distribution:
/// - lambda = 0: uniform in view space
/// - lambda = 1: logarithmic
///
/// Every cascade but the last reaches `overlap` (a fraction of its far
/// split) into the next one so that filtering does not show seams.
pub fn compute_cascade_bounds(
    near: f32,
    far: f32,
    lambda: f32,
    overlap: f32,
) -> [CascadeBounds; CASCADE_COUNT] {
    let far = far.max(near);
    let lambda = lambda.clamp(0.0, 1.0);
    let count = CASCADE_COUNT as f32;

    let split = |i: usize| {
        let p = i as f32 / count;
        let uniform = lerp(near, far, p);
        if near <= 0.0 {
            // Logarithmic splits need a positive near plane
            return uniform;
        }
        let logarithmic = near * (far / near).powf(p);
        lerp(uniform, logarithmic, lambda)
    };

    let mut bounds = [CascadeBounds::default(); CASCADE_COUNT];
    bounds[0].near = near;

    for i in 0..CASCADE_COUNT - 1 {
        let next_near = split(i + 1);
        bounds[i + 1].near = next_near;
        bounds[i].far = (next_near * (1.0 + overlap)).min(far);
    }

    bounds[CASCADE_COUNT - 1].far = far;
    bounds
}

/// Index of the first cascade whose far bound reaches `view_depth`
///
/// Returns `None` in front of the first cascade or beyond the last.
pub fn cascade_for_depth(
    bounds: &[CascadeBounds; CASCADE_COUNT],
    view_depth: f32,
) -> Option<usize> {
    if view_depth < bounds[0].near {
        return None;
    }
    bounds.iter().position(|cascade| view_depth <= cascade.far)
}

/// World-space corners of one cascade's slice of the camera frustum
///
/// The camera frustum corners are interpolated between its near and far
/// planes; `camera_near`/`camera_far` are the planes those corners lie on.
pub fn cascade_corners(
    camera_frustum: &Frustum,
    camera_near: f32,
    camera_far: f32,
    cascade: &CascadeBounds,
) -> [Vec3; 8] {
    let depth = (camera_far - camera_near).max(f32::EPSILON);
    let near_t = (cascade.near - camera_near) / depth;
    let far_t = (cascade.far - camera_near) / depth;

    let corners = camera_frustum.corners();
    let mut result = [Vec3::ZERO; 8];

    for i in 0..4 {
        let from = corners[i];
        let to = corners[i + 4];
        result[i] = from.lerp(to, near_t);
        result[i + 4] = from.lerp(to, far_t);
    }

    result
}

/// Light view matrix for a directional light, placed at the origin
#[inline]
pub fn directional_light_view(light_direction: Vec3) -> Mat4 {
    Mat4::look_to_rh(Vec3::ZERO, light_direction, stable_up_vector(light_direction))
}

/// Fit an orthographic light view-projection around a cascade
///
/// The depth range spans the cascade and is extended toward the light by
/// `extension`. With `snap_resolution` set, the footprint becomes a square
/// sized by the cascade's bounding sphere and its center moves in whole
/// texels of a map that many texels wide, so the shadow does not shimmer as
/// the camera moves or turns. Without it the footprint is the tight bounds
/// of the corners.
pub fn fit_cascade_view_projection(
    corners: &[Vec3; 8],
    light_direction: Vec3,
    extension: f32,
    snap_resolution: Option<u32>,
) -> Mat4 {
    let view = directional_light_view(light_direction);
    let light_space = Aabb::from_points(&corners.map(|corner| view.transform_point3(corner)));

    let (min, max) = match snap_resolution {
        Some(resolution) if resolution > 0 => {
            let center = corners.iter().copied().sum::<Vec3>() / 8.0;
            let radius = corners
                .iter()
                .map(|corner| corner.distance(center))
                .fold(0.0_f32, f32::max);

            let texel = (radius * 2.0 / resolution as f32).max(f32::EPSILON);
            let center_ls = view.transform_point3(center).truncate();
            let snapped = (center_ls / texel).floor() * texel;

            // One texel of slack keeps the slice inside after snapping
            let half_extent = Vec2::splat(radius + texel);
            (snapped - half_extent, snapped + half_extent)
        }
        _ => (light_space.min.truncate(), light_space.max.truncate()),
    };

    // View space looks down -Z: the slice closest to the light has the
    // largest z.
    let near = -light_space.max.z - extension;
    let far = -light_space.min.z;

    let projection = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, near, far);
    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;
    use void_math::Transform;

    #[test]
    fn test_bounds_cover_range() {
        let bounds = compute_cascade_bounds(0.1, 100.0, 0.75, 0.005);
        assert_eq!(bounds[0].near, 0.1);
        assert_eq!(bounds[CASCADE_COUNT - 1].far, 100.0);

        for pair in bounds.windows(2) {
            // Strictly increasing and overlapping
            assert!(pair[0].far < pair[1].far);
            assert!(pair[0].near < pair[1].near);
            assert!(pair[0].far > pair[1].near);
            assert!((pair[0].far - pair[1].near * 1.005).abs() < 1e-4);
        }
    }

    #[test]
    fn test_uniform_splits() {
        let bounds = compute_cascade_bounds(0.0, 40.0, 0.0, 0.0);
        let nears: Vec<f32> = bounds.iter().map(|b| b.near).collect();
        assert_eq!(nears, vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(bounds[1].far, 20.0);
    }

    #[test]
    fn test_logarithmic_splits() {
        let bounds = compute_cascade_bounds(1.0, 10000.0, 1.0, 0.0);
        assert!((bounds[1].near - 10.0).abs() < 1e-2);
        assert!((bounds[2].near - 100.0).abs() < 1e-1);
        assert!((bounds[3].near - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_cascade_for_depth() {
        let bounds = compute_cascade_bounds(1.0, 100.0, 0.5, 0.0);
        assert_eq!(cascade_for_depth(&bounds, 0.5), None);
        assert_eq!(cascade_for_depth(&bounds, 1.0), Some(0));
        assert_eq!(cascade_for_depth(&bounds, bounds[1].near + 0.01), Some(1));
        assert_eq!(cascade_for_depth(&bounds, 99.0), Some(3));
        assert_eq!(cascade_for_depth(&bounds, 150.0), None);
    }

    #[test]
    fn test_cascade_corners_interpolate() {
        let camera =
            Camera::perspective(Transform::IDENTITY, core::f32::consts::FRAC_PI_2, 1.0, 11.0);
        let frustum = camera.frustum(1.0);
        let corners = cascade_corners(&frustum, 1.0, 11.0, &CascadeBounds { near: 1.0, far: 6.0 });

        assert!((corners[0] - frustum.corners()[0]).length() < 1e-3);
        // Halfway along the corner ray: depth 6, half-width 6 for a 90° FOV
        assert!((corners[6] - Vec3::new(6.0, 6.0, -6.0)).length() < 1e-3);
    }

    #[test]
    fn test_fit_contains_cascade() {
        let camera = Camera::perspective(Transform::IDENTITY, 1.0, 0.1, 50.0);
        let frustum = camera.frustum(16.0 / 9.0);
        let corners = cascade_corners(&frustum, 0.1, 50.0, &CascadeBounds { near: 0.1, far: 12.0 });
        let light_direction = Vec3::new(0.3, -1.0, 0.2).normalize();

        for snap in [None, Some(1024)] {
            let view_proj = fit_cascade_view_projection(&corners, light_direction, 5.0, snap);
            for corner in corners {
                let clip = view_proj.project_point3(corner);
                assert!(clip.x >= -1.0 - 1e-4 && clip.x <= 1.0 + 1e-4, "{snap:?} {clip:?}");
                assert!(clip.y >= -1.0 - 1e-4 && clip.y <= 1.0 + 1e-4, "{snap:?} {clip:?}");
                assert!(clip.z >= -1e-4 && clip.z <= 1.0 + 1e-4, "{snap:?} {clip:?}");
            }
        }
    }

    #[test]
    fn test_extension_reaches_toward_light() {
        let corners = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)).corners();
        let view_proj = fit_cascade_view_projection(&corners, Vec3::NEG_Y, 10.0, None);

        // A caster above the slice, between it and the light
        let above = view_proj.project_point3(Vec3::new(0.0, 8.0, 0.0));
        assert!(above.z >= 0.0 && above.z < 0.5);
    }

    #[test]
    fn test_snapping_moves_in_whole_texels() {
        let corners = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)).corners();
        let shifted = corners.map(|corner| corner + Vec3::new(0.0001, 0.0, 0.0));

        let a = fit_cascade_view_projection(&corners, Vec3::NEG_Z, 0.0, Some(256));
        let b = fit_cascade_view_projection(&shifted, Vec3::NEG_Z, 0.0, Some(256));
        assert!(a.abs_diff_eq(b, 1e-6));

        let unsnapped_a = fit_cascade_view_projection(&corners, Vec3::NEG_Z, 0.0, None);
        let unsnapped_b = fit_cascade_view_projection(&shifted, Vec3::NEG_Z, 0.0, None);
        assert!(!unsnapped_a.abs_diff_eq(unsnapped_b, 1e-6));
    }
}
