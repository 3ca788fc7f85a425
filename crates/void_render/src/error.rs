//! Error types for the shadow subsystem

use thiserror::Error;
use void_math::GridError;

/// Shadow atlas and culling errors
///
/// Capacity overflow is not an error: casters that do not fit are dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShadowError {
    /// Grid or atlas subdivision that is not a power of two
    #[error("Subdivision size {value} is not a power of two")]
    NonPowerOfTwo { value: u32 },

    /// Cell or subcell index outside its grid
    #[error("Index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Backend failed to create the atlas depth texture
    #[error("Failed to create shadow atlas texture: {0}")]
    AtlasTextureCreation(String),
}

impl From<GridError> for ShadowError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::NonPowerOfTwo(value) => ShadowError::NonPowerOfTwo { value },
            GridError::IndexOutOfRange { index, count } => {
                ShadowError::IndexOutOfRange { index, count }
            }
        }
    }
}

/// Result type for shadow operations
pub type Result<T> = std::result::Result<T, ShadowError>;
