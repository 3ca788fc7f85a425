//! View frustum described by its 8 corners
//!
//! Frustums are kept as corner sets because both culling and cascade
//! fitting need the corners, and the separating axis test needs the edges.
//! Planes are derived from the corners with normals pointing inward.

use glam::{Mat4, Vec3};

use crate::bounds::{Aabb, BoundingSphere};

/// Plane in 3D space (normal · p + distance = 0)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Plane through `point` with the given normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Plane through three points (counter-clockwise winding)
    pub fn from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        Self::from_point_normal(p0, (p1 - p0).cross(p2 - p0))
    }

    /// Positive in front of the plane, negative behind
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    #[inline]
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }
}

/// Convex view volume
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    corners: [Vec3; 8],
    planes: [Plane; 6],
}

impl Frustum {
    pub const NEAR_BOTTOM_LEFT: usize = 0;
    pub const NEAR_BOTTOM_RIGHT: usize = 1;
    pub const NEAR_TOP_RIGHT: usize = 2;
    pub const NEAR_TOP_LEFT: usize = 3;
    pub const FAR_BOTTOM_LEFT: usize = 4;
    pub const FAR_BOTTOM_RIGHT: usize = 5;
    pub const FAR_TOP_RIGHT: usize = 6;
    pub const FAR_TOP_LEFT: usize = 7;

    /// Plane order returned by [`Frustum::planes`]
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;

    /// NDC cube corners for zero-to-one depth, in corner order
    const NDC_CORNERS: [Vec3; 8] = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
    ];

    /// Build from corners ordered near (bl, br, tr, tl) then far (bl, br, tr, tl)
    pub fn from_corners(corners: [Vec3; 8]) -> Self {
        let centroid = corners.iter().copied().sum::<Vec3>() / 8.0;

        let face = |a: usize, b: usize, c: usize| {
            let plane = Plane::from_points(corners[a], corners[b], corners[c]);
            if plane.distance_to_point(centroid) < 0.0 {
                plane.flipped()
            } else {
                plane
            }
        };

        let planes = [
            face(Self::NEAR_BOTTOM_LEFT, Self::FAR_BOTTOM_LEFT, Self::FAR_TOP_LEFT),
            face(Self::NEAR_BOTTOM_RIGHT, Self::NEAR_TOP_RIGHT, Self::FAR_TOP_RIGHT),
            face(Self::NEAR_BOTTOM_LEFT, Self::NEAR_BOTTOM_RIGHT, Self::FAR_BOTTOM_RIGHT),
            face(Self::NEAR_TOP_LEFT, Self::FAR_TOP_LEFT, Self::FAR_TOP_RIGHT),
            face(Self::NEAR_BOTTOM_LEFT, Self::NEAR_TOP_LEFT, Self::NEAR_TOP_RIGHT),
            face(Self::FAR_BOTTOM_LEFT, Self::FAR_BOTTOM_RIGHT, Self::FAR_TOP_RIGHT),
        ];

        Self { corners, planes }
    }

    /// Unproject the zero-to-one NDC cube through an inverse view-projection
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let inv = view_proj.inverse();
        Self::from_corners(Self::NDC_CORNERS.map(|ndc| inv.project_point3(ndc)))
    }

    #[inline]
    pub fn corners(&self) -> &[Vec3; 8] {
        &self.corners
    }

    #[inline]
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Distinct edge directions: the 4 lateral edges plus the near-plane
    /// horizontal and vertical edges (far edges are parallel to them)
    pub fn edge_directions(&self) -> [Vec3; 6] {
        let c = &self.corners;
        [
            c[Self::FAR_BOTTOM_LEFT] - c[Self::NEAR_BOTTOM_LEFT],
            c[Self::FAR_BOTTOM_RIGHT] - c[Self::NEAR_BOTTOM_RIGHT],
            c[Self::FAR_TOP_RIGHT] - c[Self::NEAR_TOP_RIGHT],
            c[Self::FAR_TOP_LEFT] - c[Self::NEAR_TOP_LEFT],
            c[Self::NEAR_BOTTOM_RIGHT] - c[Self::NEAR_BOTTOM_LEFT],
            c[Self::NEAR_TOP_LEFT] - c[Self::NEAR_BOTTOM_LEFT],
        ]
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Separating axis test against an AABB
    ///
    /// Candidate axes are the box axes, the frustum face normals and the
    /// cross products of box axes with frustum edges. Touching counts as
    /// intersecting.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }

        let box_axes = [Vec3::X, Vec3::Y, Vec3::Z];

        if box_axes.iter().any(|&axis| self.separated_along(axis, aabb)) {
            return false;
        }

        if self
            .planes
            .iter()
            .any(|plane| self.separated_along(plane.normal, aabb))
        {
            return false;
        }

        for edge in self.edge_directions() {
            for &box_axis in &box_axes {
                let axis = box_axis.cross(edge);
                if axis.length_squared() > 1e-12 && self.separated_along(axis, aabb) {
                    return false;
                }
            }
        }

        true
    }

    /// Plane-distance test against a sphere
    ///
    /// Conservative near frustum edges and corners: a sphere just outside
    /// two planes at once may still report intersecting.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }

    fn separated_along(&self, axis: Vec3, aabb: &Aabb) -> bool {
        let (frustum_min, frustum_max) = self
            .corners
            .iter()
            .map(|corner| corner.dot(axis))
            .fold((f32::MAX, f32::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)));

        let center = aabb.center().dot(axis);
        let radius = aabb.half_extents().dot(axis.abs());

        frustum_max < center - radius || center + radius < frustum_min
    }
}
