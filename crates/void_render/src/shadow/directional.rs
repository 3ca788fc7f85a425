//! Directional Shadow Atlas
//!
//! Cascaded shadow maps for directional lights. The atlas holds a single
//! cell whose subdivision grows with the number of shadow-casting
//! directional lights, so every light always gets all of its cascades.
//! Light `k` owns subcells `k * CASCADE_COUNT ..= k * CASCADE_COUNT + 3`.

use void_math::{subdivision_for_element_count, GridLike};

use crate::error::Result;
use crate::scene::{Light, LightKind};
use crate::shadow::atlas::{AtlasStats, CameraFrame, ShadowAtlas};
use crate::shadow::cascade::{
    cascade_corners, compute_cascade_bounds, fit_cascade_view_projection, CascadeBounds,
    CASCADE_COUNT,
};
use crate::shadow::cell::{ShadowAtlasCell, ShadowAtlasSubcellData};
use crate::shadow::config::ShadowConfig;
use crate::shadow::texture::{AtlasTexture, DepthAtlasDesc, DepthFormat, ShadowTextureAllocator};
use crate::visibility::Visibility;

/// Cascade splitting parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeSettings {
    pub split_lambda: f32,
    pub overlap: f32,
    pub shadow_distance: Option<f32>,
    pub texel_snapping: bool,
}

impl CascadeSettings {
    /// End of the shadowed range for a camera with the given far plane
    #[inline]
    pub fn effective_shadow_distance(&self, camera_far: f32) -> f32 {
        self.shadow_distance
            .map_or(camera_far, |distance| distance.min(camera_far))
    }
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self::from(&ShadowConfig::default())
    }
}

impl From<&ShadowConfig> for CascadeSettings {
    fn from(config: &ShadowConfig) -> Self {
        Self {
            split_lambda: config.cascade_split_lambda,
            overlap: config.cascade_overlap,
            shadow_distance: config.shadow_distance,
            texel_snapping: config.texel_snapping,
        }
    }
}

/// Shadow atlas for directional lights
#[derive(Debug)]
pub struct DirectionalShadowAtlas {
    texture: AtlasTexture,
    grid: GridLike,
    cell: ShadowAtlasCell,
    settings: CascadeSettings,
    cascade_bounds: [CascadeBounds; CASCADE_COUNT],
    stats: AtlasStats,
}

impl DirectionalShadowAtlas {
    pub fn new(
        allocator: &mut dyn ShadowTextureAllocator,
        size: u32,
        format: DepthFormat,
    ) -> Result<Self> {
        let texture = AtlasTexture::create(
            allocator,
            DepthAtlasDesc {
                label: "Directional Shadow Atlas".into(),
                size,
                format,
            },
        )?;

        Ok(Self {
            texture,
            grid: GridLike::new(1)?,
            cell: ShadowAtlasCell::new(1)?,
            settings: CascadeSettings::default(),
            cascade_bounds: [CascadeBounds::default(); CASCADE_COUNT],
            stats: AtlasStats::default(),
        })
    }

    pub fn from_config(
        allocator: &mut dyn ShadowTextureAllocator,
        config: &ShadowConfig,
    ) -> Result<Self> {
        let mut atlas = Self::new(allocator, config.directional_atlas_size, config.depth_format)?;
        atlas.set_settings(CascadeSettings::from(config));
        Ok(atlas)
    }

    pub fn settings(&self) -> &CascadeSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CascadeSettings) {
        self.settings = settings;
    }

    /// Cascade depth ranges from the last update, in camera view depth
    pub fn cascade_bounds(&self) -> &[CascadeBounds; CASCADE_COUNT] {
        &self.cascade_bounds
    }

    /// Texels along one side of a subcell at the current subdivision
    fn subcell_resolution(&self) -> u32 {
        (self.texture.size() / self.cell.subdivision_size()).max(1)
    }
}

impl ShadowAtlas for DirectionalShadowAtlas {
    fn texture(&self) -> &AtlasTexture {
        &self.texture
    }

    fn grid(&self) -> &GridLike {
        &self.grid
    }

    fn cell(&self, idx: usize) -> Result<&ShadowAtlasCell> {
        self.grid.check_index(idx)?;
        Ok(&self.cell)
    }

    fn update(
        &mut self,
        lights: &[Light],
        visibility: &Visibility,
        camera: &CameraFrame,
    ) -> Result<()> {
        let casters: Vec<(usize, &Light)> = visibility
            .light_indices
            .iter()
            .enumerate()
            .filter_map(|(visible_light_idx, &light_idx)| {
                lights
                    .get(light_idx)
                    .filter(|light| light.kind == LightKind::Directional && light.casts_shadow)
                    .map(|light| (visible_light_idx, light))
            })
            .collect();

        let required = casters.len() * CASCADE_COUNT;
        self.cell.resize(subdivision_for_element_count(required))?;

        self.cascade_bounds = compute_cascade_bounds(
            camera.near,
            self.settings.effective_shadow_distance(camera.far),
            self.settings.split_lambda,
            self.settings.overlap,
        );

        let snap_resolution = self.settings.texel_snapping.then(|| self.subcell_resolution());

        for (ordinal, (visible_light_idx, light)) in casters.iter().enumerate() {
            let direction = light.direction();

            for (cascade_idx, bounds) in self.cascade_bounds.iter().enumerate() {
                let corners = cascade_corners(&camera.frustum, camera.near, camera.far, bounds);
                let shadow_view_proj = fit_cascade_view_projection(
                    &corners,
                    direction,
                    light.shadow_extension,
                    snap_resolution,
                );

                let subcell_idx = ordinal * CASCADE_COUNT + cascade_idx;
                *self.cell.subcell_mut(subcell_idx)? = Some(ShadowAtlasSubcellData {
                    shadow_view_proj,
                    visible_light_idx: *visible_light_idx,
                    shadow_idx: cascade_idx,
                    normal_bias: light.shadow_normal_bias,
                    cascade_far_bound_view: bounds.far,
                });
            }
        }

        self.stats = AtlasStats {
            candidates: required as u32,
            assigned: required as u32,
            dropped: 0,
        };

        log::debug!(
            "Directional shadow atlas: {} lights, subdivision {}, cascades end at {:?}",
            casters.len(),
            self.cell.subdivision_size(),
            self.cascade_bounds.map(|bounds| bounds.far)
        );

        Ok(())
    }

    fn stats(&self) -> &AtlasStats {
        &self.stats
    }

    fn release(&mut self, allocator: &mut dyn ShadowTextureAllocator) {
        self.texture.release(allocator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Camera;
    use crate::shadow::texture::tests::CountingAllocator;
    use void_math::{Transform, Vec3};

    fn atlas() -> DirectionalShadowAtlas {
        let mut allocator = CountingAllocator::default();
        DirectionalShadowAtlas::new(&mut allocator, 4096, DepthFormat::Depth32Float).unwrap()
    }

    fn camera_frame() -> CameraFrame {
        let transform = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));
        let camera = Camera::perspective(transform, 1.0, 0.1, 100.0);
        CameraFrame::new(&camera, 16.0 / 9.0)
    }

    fn sun() -> Light {
        Light::directional(Vec3::new(0.2, -1.0, 0.1).normalize()).with_shadows(true)
    }

    fn all_visible(count: usize) -> Visibility {
        Visibility {
            light_indices: (0..count).collect(),
            static_mesh_indices: Vec::new(),
        }
    }

    #[test]
    fn test_single_light_fills_four_subcells() {
        let mut atlas = atlas();
        atlas.update(&[sun()], &all_visible(1), &camera_frame()).unwrap();

        let cell = atlas.cell(0).unwrap();
        assert_eq!(cell.subdivision_size(), 2);
        assert_eq!(cell.populated_count(), 4);

        let fars: Vec<f32> =
            cell.populated().map(|(_, data)| data.cascade_far_bound_view).collect();
        for pair in fars.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(fars[3], 100.0);

        let cascades: Vec<usize> = cell.populated().map(|(_, data)| data.shadow_idx).collect();
        assert_eq!(cascades, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_subdivision_grows_with_lights() {
        let mut atlas = atlas();
        for (count, subdiv) in [(0, 1), (1, 2), (2, 4), (4, 4), (5, 8)] {
            let lights = vec![sun(); count];
            atlas.update(&lights, &all_visible(count), &camera_frame()).unwrap();
            let cell = atlas.cell(0).unwrap();
            assert_eq!(cell.subdivision_size(), subdiv, "{count} lights");
            assert_eq!(cell.populated_count(), count * CASCADE_COUNT);
        }
    }

    #[test]
    fn test_subcell_layout_per_light() {
        let mut atlas = atlas();
        let lights = [
            sun(),
            Light::point(Vec3::ZERO, 5.0).with_shadows(true),
            Light::directional(Vec3::NEG_Y).with_shadows(true),
        ];
        atlas.update(&lights, &all_visible(3), &camera_frame()).unwrap();

        let cell = atlas.cell(0).unwrap();
        assert_eq!(cell.subdivision_size(), 4);
        for idx in 0..8 {
            let data = cell.subcell(idx).unwrap().unwrap();
            // The point light is skipped, the second sun is visible light 2
            assert_eq!(data.visible_light_idx, if idx < 4 { 0 } else { 2 });
            assert_eq!(data.shadow_idx, idx % 4);
        }
        assert!(cell.subcell(8).unwrap().is_none());
    }

    #[test]
    fn test_ignores_non_casters() {
        let mut atlas = atlas();
        let lights = [Light::directional(Vec3::NEG_Y)];
        atlas.update(&lights, &all_visible(1), &camera_frame()).unwrap();
        assert_eq!(atlas.cell(0).unwrap().populated_count(), 0);
        assert_eq!(atlas.stats().candidates, 0);
    }

    #[test]
    fn test_effective_shadow_distance() {
        let mut settings = CascadeSettings::default();
        assert_eq!(settings.effective_shadow_distance(100.0), 100.0);
        settings.shadow_distance = Some(40.0);
        assert_eq!(settings.effective_shadow_distance(100.0), 40.0);
        assert_eq!(settings.effective_shadow_distance(20.0), 20.0);
    }

    #[test]
    fn test_nine_lights_stay_in_bounds() {
        let mut atlas = atlas();
        let lights = vec![sun(); 9];
        atlas.update(&lights, &all_visible(9), &camera_frame()).unwrap();

        let cell = atlas.cell(0).unwrap();
        assert_eq!(cell.subdivision_size(), 8);
        assert_eq!(cell.populated_count(), 36);
        for idx in 32..36 {
            let data = cell.subcell(idx).unwrap().unwrap();
            assert_eq!(data.visible_light_idx, 8);
            assert_eq!(data.shadow_idx, idx - 32);
        }
        assert!(cell.subcell(36).unwrap().is_none());
        for batch in atlas.shadow_draw_batches(&[]).unwrap() {
            let viewport = batch.viewport;
            assert!(viewport.x + viewport.width <= 4096);
            assert!(viewport.y + viewport.height <= 4096);
        }
    }

    #[test]
    fn test_shadow_distance_limits_cascades() {
        let mut atlas = atlas();
        atlas.set_settings(CascadeSettings {
            shadow_distance: Some(40.0),
            ..CascadeSettings::default()
        });
        atlas.update(&[sun()], &all_visible(1), &camera_frame()).unwrap();

        assert_eq!(atlas.cascade_bounds()[0].near, 0.1);
        assert_eq!(atlas.cascade_bounds()[CASCADE_COUNT - 1].far, 40.0);
    }

    #[test]
    fn test_cascades_cover_their_slices() {
        let mut atlas = atlas();
        let frame = camera_frame();
        atlas.update(&[sun()], &all_visible(1), &frame).unwrap();

        // A point on the camera axis inside each cascade lands in that
        // cascade's shadow map
        for (_, data) in atlas.cell(0).unwrap().populated() {
            let bounds = atlas.cascade_bounds()[data.shadow_idx];
            let depth = (bounds.near + bounds.far) * 0.5;
            let point = frame.position + frame.forward * depth;
            let clip = data.shadow_view_proj.project_point3(point);
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0, "{clip:?}");
            assert!((0.0..=1.0).contains(&clip.z), "{clip:?}");
        }
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut atlas = atlas();
        let lights = [sun(), sun()];
        atlas.update(&lights, &all_visible(2), &camera_frame()).unwrap();
        let first = atlas.cell(0).unwrap().clone();
        atlas.update(&lights, &all_visible(2), &camera_frame()).unwrap();
        assert_eq!(&first, atlas.cell(0).unwrap());
    }
}
