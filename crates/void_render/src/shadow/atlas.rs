//! Shadow Atlas Interface
//!
//! An atlas is one square depth texture split into a grid of cells, each
//! cell split again into subcells. Every subcell holds at most one shadow
//! map per frame. Concrete atlases decide which lights land where; the
//! shared parts here turn those assignments into shading look-up data and
//! depth-pass draw batches.

use serde::{Deserialize, Serialize};
use void_math::{Frustum, GridLike, Mat4, Vec3};

use crate::error::Result;
use crate::light_buffer::{ShaderLight, MAX_PER_LIGHT_SHADOW_MAP_COUNT};
use crate::scene::{Camera, Light, StaticMeshInstance};
use crate::shadow::cell::{ShadowAtlasCell, ShadowAtlasSubcellData};
use crate::shadow::texture::{AtlasTexture, ShadowTextureAllocator};
use crate::visibility::{static_meshes_in_frustum, Visibility};

/// Camera state an atlas update depends on
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub position: Vec3,
    pub forward: Vec3,
    pub near: f32,
    pub far: f32,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub frustum: Frustum,
}

impl CameraFrame {
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix(aspect);
        let view_projection = projection * view;
        Self {
            position: camera.position(),
            forward: camera.forward(),
            near: camera.near,
            far: camera.far,
            view,
            projection,
            view_projection,
            frustum: camera.frustum(aspect),
        }
    }
}

/// Allocation counters from the last update
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasStats {
    /// Shadow maps requested this frame
    pub candidates: u32,
    /// Shadow maps placed in a subcell
    pub assigned: u32,
    /// Shadow maps that did not fit or were too small on screen
    pub dropped: u32,
}

/// Texel rectangle of a subcell inside the atlas texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtlasViewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One depth-only draw batch, rendering a single subcell
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowDrawBatch {
    pub viewport: AtlasViewport,
    pub view_proj: Mat4,
    pub visible_light_idx: usize,
    pub shadow_idx: usize,
    /// Static meshes touching the subcell's shadow volume
    pub mesh_indices: Vec<usize>,
}

/// Common behaviour of punctual and directional atlases
pub trait ShadowAtlas {
    /// Depth texture backing this atlas
    fn texture(&self) -> &AtlasTexture;

    /// Top-level grid the cells are laid out in
    fn grid(&self) -> &GridLike;

    /// Cell by atlas-relative index
    fn cell(&self, idx: usize) -> Result<&ShadowAtlasCell>;

    /// Re-partition this frame's shadow casters into the grid
    ///
    /// Depends only on its arguments: calling it twice with the same
    /// inputs yields identical subcell contents.
    fn update(
        &mut self,
        lights: &[Light],
        visibility: &Visibility,
        camera: &CameraFrame,
    ) -> Result<()>;

    /// Counters from the last update
    fn stats(&self) -> &AtlasStats;

    /// Return the depth texture to the backend
    fn release(&mut self, allocator: &mut dyn ShadowTextureAllocator);

    /// Atlas edge in texels
    fn size(&self) -> u32 {
        self.texture().size()
    }

    fn cell_count(&self) -> usize {
        self.grid().element_count()
    }

    /// Visit every populated subcell with its normalized atlas rectangle
    ///
    /// The callback receives the subcell, its UV offset and its UV size.
    fn for_each_populated_subcell(
        &self,
        f: &mut dyn FnMut(&ShadowAtlasSubcellData, [f32; 2], f32),
    ) -> Result<()> {
        let cell_size = self.grid().normalized_element_size();

        for cell_idx in 0..self.cell_count() {
            let cell_offset = self.grid().normalized_element_offset(cell_idx)?;
            let cell = self.cell(cell_idx)?;

            for (subcell_idx, data) in cell.populated() {
                let offset = cell_offset + cell.subcell_offset(subcell_idx)? * cell_size;
                f(data, offset.to_array(), cell_size * cell.subcell_size());
            }
        }

        Ok(())
    }

    /// Write shadow sampling parameters into the lights' shading records
    ///
    /// Must run after [`ShadowAtlas::update`] and after the light buffer was
    /// populated for the frame. Lights the buffer had no room for are
    /// skipped.
    fn set_look_up_info(&self, records: &mut [ShaderLight]) -> Result<()> {
        let record_count = records.len();

        self.for_each_populated_subcell(&mut |data, offset, size| {
            let Some(record) = records.get_mut(data.visible_light_idx) else {
                log::warn!(
                    "Shadow map for visible light {} has no light record (buffer holds {})",
                    data.visible_light_idx,
                    record_count
                );
                return;
            };

            let slot = data.shadow_idx;
            if slot >= MAX_PER_LIGHT_SHADOW_MAP_COUNT {
                log::warn!("Shadow slot {} exceeds per-light limit", slot);
                return;
            }

            record.is_casting_shadow = 1;
            record.sample_shadow_map[slot] = 1;
            record.shadow_view_proj_matrices[slot] = data.shadow_view_proj.to_cols_array_2d();
            record.shadow_atlas_cell_offsets[slot] = offset;
            record.shadow_atlas_cell_sizes[slot] = size;
            record.shadow_far_bounds[slot] = data.cascade_far_bound_view;
        })
    }

    /// One draw batch per populated subcell, in cell then subcell order
    ///
    /// Meshes are culled against each subcell's own shadow frustum.
    fn shadow_draw_batches(&self, meshes: &[StaticMeshInstance]) -> Result<Vec<ShadowDrawBatch>> {
        let atlas_size = self.size() as f32;
        let mut batches = Vec::new();

        self.for_each_populated_subcell(&mut |data, offset, size| {
            let frustum = Frustum::from_view_projection(&data.shadow_view_proj);
            let extent = (size * atlas_size).round() as u32;

            batches.push(ShadowDrawBatch {
                viewport: AtlasViewport {
                    x: (offset[0] * atlas_size).round() as u32,
                    y: (offset[1] * atlas_size).round() as u32,
                    width: extent,
                    height: extent,
                },
                view_proj: data.shadow_view_proj,
                visible_light_idx: data.visible_light_idx,
                shadow_idx: data.shadow_idx,
                mesh_indices: static_meshes_in_frustum(&frustum, meshes).collect(),
            });
        })?;

        Ok(batches)
    }
}
