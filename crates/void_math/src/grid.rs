//! Square power-of-two grids over the unit square
//!
//! Maps a linear element index of an N×N grid onto a normalized offset and
//! size inside `[0, 1)²`. Shadow atlases use this for both their top-level
//! cells and the subcells inside each cell.

use glam::Vec2;
use thiserror::Error;

/// Errors produced by grid construction and indexing
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// Subdivision size was zero or not a power of two
    #[error("grid subdivision size {0} is not a power of two")]
    NonPowerOfTwo(u32),

    /// Element index outside `[0, count)`
    #[error("grid element index {index} out of range (element count {count})")]
    IndexOutOfRange { index: usize, count: usize },
}

/// N×N grid with N a power of two
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLike {
    subdiv_size: u32,
}

impl GridLike {
    /// Create a grid with `subdiv_size` elements per side
    pub fn new(subdiv_size: u32) -> Result<Self, GridError> {
        let mut grid = Self { subdiv_size: 1 };
        grid.set_subdivision_size(subdiv_size)?;
        Ok(grid)
    }

    /// Change the number of elements per side
    ///
    /// On failure the previous size is kept.
    pub fn set_subdivision_size(&mut self, subdiv_size: u32) -> Result<(), GridError> {
        if !subdiv_size.is_power_of_two() {
            return Err(GridError::NonPowerOfTwo(subdiv_size));
        }
        self.subdiv_size = subdiv_size;
        Ok(())
    }

    /// Elements per side
    #[inline]
    pub fn subdivision_size(&self) -> u32 {
        self.subdiv_size
    }

    /// Total element count (N²)
    #[inline]
    pub fn element_count(&self) -> usize {
        let n = self.subdiv_size as usize;
        n * n
    }

    /// Side length of one element in normalized units (1/N)
    #[inline]
    pub fn normalized_element_size(&self) -> f32 {
        1.0 / self.subdiv_size as f32
    }

    /// Fail with `IndexOutOfRange` unless `idx` addresses an element
    #[inline]
    pub fn check_index(&self, idx: usize) -> Result<(), GridError> {
        if idx >= self.element_count() {
            return Err(GridError::IndexOutOfRange {
                index: idx,
                count: self.element_count(),
            });
        }
        Ok(())
    }

    /// Normalized top-left offset of element `idx`, row-major
    pub fn normalized_element_offset(&self, idx: usize) -> Result<Vec2, GridError> {
        self.check_index(idx)?;
        let n = self.subdiv_size as usize;
        let column = (idx % n) as f32;
        let row = (idx / n) as f32;
        Ok(Vec2::new(column, row) * self.normalized_element_size())
    }
}

/// Smallest power of two `n` such that `n * n >= element_count`
///
/// Returns 1 for an empty demand.
pub fn subdivision_for_element_count(element_count: usize) -> u32 {
    let mut subdiv: u32 = 1;
    while (subdiv as usize) * (subdiv as usize) < element_count {
        subdiv *= 2;
    }
    subdiv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        for n in [0u32, 3, 5, 6, 7, 12, 100, 1023] {
            assert_eq!(GridLike::new(n), Err(GridError::NonPowerOfTwo(n)));
        }

        let mut grid = GridLike::new(4).unwrap();
        assert_eq!(grid.set_subdivision_size(6), Err(GridError::NonPowerOfTwo(6)));
        assert_eq!(grid.subdivision_size(), 4);
    }

    #[test]
    fn test_counts_and_sizes() {
        let grid = GridLike::new(8).unwrap();
        assert_eq!(grid.element_count(), 64);
        assert_eq!(grid.normalized_element_size(), 0.125);
    }

    #[test]
    fn test_offset_row_major() {
        let grid = GridLike::new(2).unwrap();
        assert_eq!(grid.normalized_element_offset(0).unwrap(), Vec2::new(0.0, 0.0));
        assert_eq!(grid.normalized_element_offset(1).unwrap(), Vec2::new(0.5, 0.0));
        assert_eq!(grid.normalized_element_offset(2).unwrap(), Vec2::new(0.0, 0.5));
        assert_eq!(grid.normalized_element_offset(3).unwrap(), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_offset_out_of_range() {
        let grid = GridLike::new(4).unwrap();
        assert_eq!(
            grid.normalized_element_offset(16),
            Err(GridError::IndexOutOfRange { index: 16, count: 16 })
        );
    }

    #[test]
    fn test_offsets_tile_unit_square() {
        for n in [1u32, 2, 4, 8, 16] {
            let grid = GridLike::new(n).unwrap();
            let size = grid.normalized_element_size();
            let mut seen = std::collections::HashSet::new();

            for idx in 0..grid.element_count() {
                let offset = grid.normalized_element_offset(idx).unwrap();
                assert!(offset.x + size <= 1.0 && offset.y + size <= 1.0);

                // Offsets are exact multiples of the element size, so they map
                // back onto distinct integer grid coordinates.
                let cell = ((offset.x / size) as u32, (offset.y / size) as u32);
                assert!(seen.insert(cell), "element {idx} overlaps another");
            }

            assert_eq!(seen.len(), grid.element_count());
        }
    }

    #[test]
    fn test_subdivision_for_element_count() {
        assert_eq!(subdivision_for_element_count(0), 1);
        assert_eq!(subdivision_for_element_count(1), 1);
        assert_eq!(subdivision_for_element_count(4), 2);
        assert_eq!(subdivision_for_element_count(5), 4);
        assert_eq!(subdivision_for_element_count(16), 4);
        assert_eq!(subdivision_for_element_count(17), 8);
        assert_eq!(subdivision_for_element_count(64), 8);
    }
}
