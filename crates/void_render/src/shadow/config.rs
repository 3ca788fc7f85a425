//! Shadow Configuration
//!
//! Atlas sizes, cascade splitting and light buffer limits, with serde
//! support for hot-reload.

use serde::{Deserialize, Serialize};

use crate::light_buffer::DEFAULT_MAX_LIGHTS;
use crate::shadow::texture::DepthFormat;

/// Smallest allowed atlas edge in texels
pub const MIN_ATLAS_SIZE: u32 = 256;
/// Largest allowed atlas edge in texels
pub const MAX_ATLAS_SIZE: u32 = 16384;

/// Global shadow configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Enable shadows globally
    pub enabled: bool,

    /// Punctual (spot/point) atlas edge in texels (power of 2)
    pub punctual_atlas_size: u32,

    /// Directional atlas edge in texels (power of 2)
    pub directional_atlas_size: u32,

    /// Depth format of both atlas textures
    pub depth_format: DepthFormat,

    /// Cascade split lambda (0 = uniform, 1 = logarithmic)
    pub cascade_split_lambda: f32,

    /// Fraction by which each cascade reaches into the next
    pub cascade_overlap: f32,

    /// Maximum shadow distance from camera (None = camera far plane)
    pub shadow_distance: Option<f32>,

    /// Light buffer capacity
    pub max_lights: usize,

    /// Snap cascade bounds to whole shadow-map texels
    pub texel_snapping: bool,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            punctual_atlas_size: 4096,
            directional_atlas_size: 4096,
            depth_format: DepthFormat::Depth32Float,
            cascade_split_lambda: 0.75,
            cascade_overlap: 0.005,
            shadow_distance: None,
            max_lights: DEFAULT_MAX_LIGHTS,
            texel_snapping: true,
        }
    }
}

impl ShadowConfig {
    /// Create a high-quality shadow configuration
    pub fn high_quality() -> Self {
        Self {
            punctual_atlas_size: 8192,
            directional_atlas_size: 8192,
            cascade_split_lambda: 0.8,
            ..Default::default()
        }
    }

    /// Create a low-quality shadow configuration for performance
    pub fn low_quality() -> Self {
        Self {
            punctual_atlas_size: 2048,
            directional_atlas_size: 2048,
            depth_format: DepthFormat::Depth16Unorm,
            cascade_split_lambda: 0.5,
            shadow_distance: Some(50.0),
            max_lights: 64,
            ..Default::default()
        }
    }

    /// Create a configuration with shadows disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Validate configuration and clamp values to valid ranges
    pub fn validate(&mut self) {
        self.punctual_atlas_size = clamp_atlas_size(self.punctual_atlas_size);
        self.directional_atlas_size = clamp_atlas_size(self.directional_atlas_size);
        self.cascade_split_lambda = self.cascade_split_lambda.clamp(0.0, 1.0);
        self.cascade_overlap = self.cascade_overlap.clamp(0.0, 0.5);
        self.shadow_distance = self.shadow_distance.map(|distance| distance.max(1.0));
        self.max_lights = self.max_lights.max(1);
    }
}

fn clamp_atlas_size(size: u32) -> u32 {
    size.clamp(MIN_ATLAS_SIZE, MAX_ATLAS_SIZE).next_power_of_two()
}
