//! Atlas cells and their subcell assignments

use void_math::{GridLike, Mat4, Vec2};

use crate::error::Result;

/// One shadow map assigned to a subcell for the current frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowAtlasSubcellData {
    /// World to light clip space
    pub shadow_view_proj: Mat4,
    /// Position in this frame's visible light list (not a scene light index)
    pub visible_light_idx: usize,
    /// Cascade index for directional lights, cube face for point lights,
    /// always 0 for spot lights
    pub shadow_idx: usize,
    pub normal_bias: f32,
    /// Far end of the cascade in camera view depth; the light's range for
    /// punctual lights
    pub cascade_far_bound_view: f32,
}

/// Square grid of optional subcell assignments
///
/// Contents are rebuilt from scratch by every atlas update.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowAtlasCell {
    grid: GridLike,
    subcells: Vec<Option<ShadowAtlasSubcellData>>,
}

impl ShadowAtlasCell {
    /// Create an empty cell with `subdiv_size` subcells per side
    pub fn new(subdiv_size: u32) -> Result<Self> {
        let grid = GridLike::new(subdiv_size)?;
        Ok(Self {
            subcells: vec![None; grid.element_count()],
            grid,
        })
    }

    #[inline]
    pub fn grid(&self) -> &GridLike {
        &self.grid
    }

    #[inline]
    pub fn subdivision_size(&self) -> u32 {
        self.grid.subdivision_size()
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.grid.element_count()
    }

    /// Change the subdivision; every subcell is cleared
    ///
    /// On failure the cell keeps its previous size and contents.
    pub fn resize(&mut self, subdiv_size: u32) -> Result<()> {
        self.grid.set_subdivision_size(subdiv_size)?;
        self.subcells.clear();
        self.subcells.resize(self.grid.element_count(), None);
        Ok(())
    }

    /// Empty every subcell
    pub fn clear(&mut self) {
        self.subcells.fill(None);
    }

    pub fn subcell(&self, idx: usize) -> Result<&Option<ShadowAtlasSubcellData>> {
        self.grid.check_index(idx)?;
        Ok(&self.subcells[idx])
    }

    pub fn subcell_mut(&mut self, idx: usize) -> Result<&mut Option<ShadowAtlasSubcellData>> {
        self.grid.check_index(idx)?;
        Ok(&mut self.subcells[idx])
    }

    /// Normalized offset of a subcell inside this cell
    pub fn subcell_offset(&self, idx: usize) -> Result<Vec2> {
        Ok(self.grid.normalized_element_offset(idx)?)
    }

    /// Normalized size of a subcell inside this cell
    #[inline]
    pub fn subcell_size(&self) -> f32 {
        self.grid.normalized_element_size()
    }

    /// Populated subcells with their indices
    pub fn populated(&self) -> impl Iterator<Item = (usize, &ShadowAtlasSubcellData)> {
        self.subcells
            .iter()
            .enumerate()
            .filter_map(|(idx, subcell)| subcell.as_ref().map(|data| (idx, data)))
    }

    pub fn populated_count(&self) -> usize {
        self.subcells.iter().filter(|subcell| subcell.is_some()).count()
    }
}
