//! Punctual Shadow Atlas
//!
//! Shadow maps for spot and point lights. The atlas is a 2x2 grid of cells
//! with 1, 2, 4 and 8 subcells per side, giving four quality tiers: a tier 0
//! shadow map gets a quarter of the atlas, a tier 3 map 1/256 of it.
//!
//! Every update classifies each shadow map by how much of the screen its
//! light volume covers, then fills the tiers nearest light first. Maps that
//! do not fit a tier move down to the next, finer one; whatever is left
//! after the last tier gets no shadow this frame.

use void_math::{stable_up_vector, Aabb, GridLike, Mat4, Vec2, Vec3, Vec4};

use crate::error::Result;
use crate::scene::{Light, LightKind};
use crate::shadow::atlas::{AtlasStats, CameraFrame, ShadowAtlas};
use crate::shadow::cell::{ShadowAtlasCell, ShadowAtlasSubcellData};
use crate::shadow::config::ShadowConfig;
use crate::shadow::texture::{AtlasTexture, DepthAtlasDesc, DepthFormat, ShadowTextureAllocator};
use crate::visibility::{spot_light_local_vertices, Visibility};

/// Subcells per side of each tier's cell
pub const TIER_SUBDIVISIONS: [u32; 4] = [1, 2, 4, 8];

/// Minimum fraction of the viewport a light volume must cover for each tier
pub const TIER_COVERAGE_THRESHOLDS: [f32; 4] = [1.0, 0.25, 0.0625, 0.015625];

/// Cube face view directions and up vectors, ordered +X, -X, +Y, -Y, +Z, -Z
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y),
];

/// Smallest field of view used for a spot light shadow projection
const MIN_SPOT_SHADOW_FOV: f32 = 1e-3;

/// World-space shadow volume of one cube face: the four far corners at
/// distance `range` followed by the light position
pub fn point_light_face_vertices(position: Vec3, range: f32, face: usize) -> [Vec3; 5] {
    let (direction, up) = CUBE_FACES[face % CUBE_FACES.len()];
    let right = direction.cross(up).normalize_or_zero() * range;
    let up = up * range;
    let far = position + direction * range;
    [
        far + right + up,
        far - right + up,
        far - right - up,
        far + right - up,
        position,
    ]
}

/// Quality tier for a light volume, or `None` if it is off screen or too
/// small on screen
///
/// A camera inside the volume's bounds always gets tier 0. Otherwise the
/// volume is clipped against the camera near plane and the screen rectangle
/// of what remains is measured.
pub fn screen_coverage_tier(vertices: &[Vec3], camera: &CameraFrame) -> Option<usize> {
    let bounds = Aabb::from_points(vertices);
    if !camera.frustum.intersects_aabb(&bounds) {
        return None;
    }
    if bounds.contains_point(camera.position) {
        return Some(0);
    }

    let clip: Vec<Vec4> = vertices
        .iter()
        .map(|vertex| camera.view_projection * vertex.extend(1.0))
        .collect();

    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    let mut include = |point: Vec4| {
        let ndc = Vec2::new(point.x, point.y) / point.w;
        min = min.min(ndc);
        max = max.max(ndc);
    };

    // Zero-to-one depth: clip z >= 0 is in front of the near plane. Any
    // segment between two vertices lies inside the volume, so its near
    // plane crossing belongs to the clipped volume.
    for (i, &a) in clip.iter().enumerate() {
        if a.z >= 0.0 {
            include(a);
        }
        for &b in &clip[i + 1..] {
            if (a.z >= 0.0) != (b.z >= 0.0) {
                include(a.lerp(b, a.z / (a.z - b.z)));
            }
        }
    }

    if min.x > max.x {
        return None;
    }

    let min = min.clamp(Vec2::NEG_ONE, Vec2::ONE);
    let max = max.clamp(Vec2::NEG_ONE, Vec2::ONE);
    let extent = (max - min).max(Vec2::ZERO);
    let coverage = extent.x * extent.y / 4.0;

    TIER_COVERAGE_THRESHOLDS
        .iter()
        .position(|&threshold| coverage >= threshold)
}

/// Spot light shadow view-projection
pub fn spot_light_view_projection(light: &Light) -> Mat4 {
    let direction = light.direction();
    let view = Mat4::look_to_rh(light.position(), direction, stable_up_vector(direction));
    let projection = Mat4::perspective_rh(
        light.outer_angle.max(MIN_SPOT_SHADOW_FOV),
        1.0,
        light.shadow_near_plane,
        shadow_far_plane(light),
    );
    projection * view
}

/// Point light shadow view-projection for one cube face
pub fn point_light_face_view_projection(light: &Light, face: usize) -> Mat4 {
    let (direction, up) = CUBE_FACES[face % CUBE_FACES.len()];
    let view = Mat4::look_to_rh(light.position(), direction, up);
    let projection = Mat4::perspective_rh(
        core::f32::consts::FRAC_PI_2,
        1.0,
        light.shadow_near_plane,
        shadow_far_plane(light),
    );
    projection * view
}

#[inline]
fn shadow_far_plane(light: &Light) -> f32 {
    light.range.max(light.shadow_near_plane + 1e-3)
}

/// One shadow map waiting for a subcell
#[derive(Clone, Copy, Debug)]
struct ShadowCandidate<'a> {
    light: &'a Light,
    visible_light_idx: usize,
    shadow_idx: usize,
    /// Camera to light position
    distance: f32,
}

impl ShadowCandidate<'_> {
    /// Nearest first; equal distances keep visibility then face order
    fn priority(&self, other: &Self) -> core::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.visible_light_idx.cmp(&other.visible_light_idx))
            .then(self.shadow_idx.cmp(&other.shadow_idx))
    }

    fn to_subcell(&self) -> ShadowAtlasSubcellData {
        let shadow_view_proj = match self.light.kind {
            LightKind::Point => point_light_face_view_projection(self.light, self.shadow_idx),
            _ => spot_light_view_projection(self.light),
        };

        ShadowAtlasSubcellData {
            shadow_view_proj,
            visible_light_idx: self.visible_light_idx,
            shadow_idx: self.shadow_idx,
            normal_bias: self.light.shadow_normal_bias,
            cascade_far_bound_view: self.light.range,
        }
    }
}

/// Shadow atlas for spot and point lights
#[derive(Debug)]
pub struct PunctualShadowAtlas {
    texture: AtlasTexture,
    grid: GridLike,
    cells: Vec<ShadowAtlasCell>,
    shadow_distance: Option<f32>,
    stats: AtlasStats,
}

impl PunctualShadowAtlas {
    /// Create the atlas and its `size`×`size` depth texture
    pub fn new(
        allocator: &mut dyn ShadowTextureAllocator,
        size: u32,
        format: DepthFormat,
    ) -> Result<Self> {
        let cells = TIER_SUBDIVISIONS
            .iter()
            .map(|&subdiv| ShadowAtlasCell::new(subdiv))
            .collect::<Result<Vec<_>>>()?;

        let texture = AtlasTexture::create(
            allocator,
            DepthAtlasDesc {
                label: "Punctual Shadow Atlas".into(),
                size,
                format,
            },
        )?;

        Ok(Self {
            texture,
            grid: GridLike::new(2)?,
            cells,
            shadow_distance: None,
            stats: AtlasStats::default(),
        })
    }

    pub fn from_config(
        allocator: &mut dyn ShadowTextureAllocator,
        config: &ShadowConfig,
    ) -> Result<Self> {
        let mut atlas = Self::new(allocator, config.punctual_atlas_size, config.depth_format)?;
        atlas.set_shadow_distance(config.shadow_distance);
        Ok(atlas)
    }

    /// Lights whose bounds are all farther than this get no shadow
    pub fn set_shadow_distance(&mut self, shadow_distance: Option<f32>) {
        self.shadow_distance = shadow_distance;
    }

    pub fn shadow_distance(&self) -> Option<f32> {
        self.shadow_distance
    }

    fn beyond_shadow_distance(&self, light: &Light, camera_position: Vec3) -> bool {
        self.shadow_distance.is_some_and(|max_distance| {
            let nearest = (light.position().distance(camera_position) - light.range).max(0.0);
            nearest > max_distance
        })
    }

    /// Sort this frame's shadow maps into per-tier pools
    fn classify<'a>(
        &self,
        lights: &'a [Light],
        visibility: &Visibility,
        camera: &CameraFrame,
        stats: &mut AtlasStats,
    ) -> [Vec<ShadowCandidate<'a>>; 4] {
        let mut tiers: [Vec<ShadowCandidate<'a>>; 4] = Default::default();

        for (visible_light_idx, &light_idx) in visibility.light_indices.iter().enumerate() {
            let Some(light) = lights.get(light_idx) else {
                log::warn!(
                    "Visible light index {} outside the scene's {} lights",
                    light_idx,
                    lights.len()
                );
                continue;
            };

            if !light.casts_shadow || light.kind == LightKind::Directional {
                continue;
            }

            if self.beyond_shadow_distance(light, camera.position) {
                continue;
            }

            let distance = light.position().distance(camera.position);
            let mut push = |shadow_idx: usize, vertices: &[Vec3]| {
                stats.candidates += 1;
                match screen_coverage_tier(vertices, camera) {
                    Some(tier) => tiers[tier].push(ShadowCandidate {
                        light,
                        visible_light_idx,
                        shadow_idx,
                        distance,
                    }),
                    None => stats.dropped += 1,
                }
            };

            match light.kind {
                LightKind::Spot => {
                    let local_to_world = light.transform.local_to_world_without_scale();
                    let vertices = spot_light_local_vertices(light.range, light.outer_angle)
                        .map(|vertex| local_to_world.transform_point3(vertex));
                    push(0, &vertices);
                }
                LightKind::Point => {
                    for face in 0..CUBE_FACES.len() {
                        push(face, &point_light_face_vertices(light.position(), light.range, face));
                    }
                }
                LightKind::Directional => {}
            }
        }

        tiers
    }
}

impl ShadowAtlas for PunctualShadowAtlas {
    fn texture(&self) -> &AtlasTexture {
        &self.texture
    }

    fn grid(&self) -> &GridLike {
        &self.grid
    }

    fn cell(&self, idx: usize) -> Result<&ShadowAtlasCell> {
        self.grid.check_index(idx)?;
        Ok(&self.cells[idx])
    }

    fn update(
        &mut self,
        lights: &[Light],
        visibility: &Visibility,
        camera: &CameraFrame,
    ) -> Result<()> {
        let mut stats = AtlasStats::default();
        let mut tiers = self.classify(lights, visibility, camera, &mut stats);
        let tier_count = tiers.len();

        for (tier, cell) in self.cells.iter_mut().enumerate() {
            cell.clear();

            let mut pool = core::mem::take(&mut tiers[tier]);
            pool.sort_by(ShadowCandidate::priority);

            let overflow = pool.split_off(pool.len().min(cell.element_count()));

            for (subcell_idx, candidate) in pool.iter().enumerate() {
                log::trace!(
                    "Punctual shadow: visible light {} slot {} -> tier {} subcell {}",
                    candidate.visible_light_idx,
                    candidate.shadow_idx,
                    tier,
                    subcell_idx
                );
                *cell.subcell_mut(subcell_idx)? = Some(candidate.to_subcell());
            }
            stats.assigned += pool.len() as u32;

            if tier + 1 < tier_count {
                tiers[tier + 1].extend(overflow);
            } else if !overflow.is_empty() {
                log::warn!(
                    "Punctual shadow atlas full: {} shadow maps dropped this frame",
                    overflow.len()
                );
                stats.dropped += overflow.len() as u32;
            }
        }

        log::debug!(
            "Punctual shadow atlas: {} of {} shadow maps assigned, {} dropped",
            stats.assigned,
            stats.candidates,
            stats.dropped
        );

        self.stats = stats;
        Ok(())
    }

    fn stats(&self) -> &AtlasStats {
        &self.stats
    }

    fn release(&mut self, allocator: &mut dyn ShadowTextureAllocator) {
        self.texture.release(allocator);
    }
}
