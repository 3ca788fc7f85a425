//! GPU Light Buffer Management
//!
//! Per-frame shading records for visible lights:
//! - GPU-ready light record (Pod/Zeroable) shared with the shaders
//! - Fixed-capacity light buffer with overflow accounting
//!
//! Record `i` belongs to the `i`-th entry of the frame's visible light list,
//! which is how shadow atlases address lights when writing look-up data.

use serde::{Deserialize, Serialize};

use crate::scene::{Light, LightKind};
use crate::visibility::Visibility;

/// Shadow slots per light: 6 cube faces, up to 4 cascades or 1 spot map
pub const MAX_PER_LIGHT_SHADOW_MAP_COUNT: usize = 6;
/// Default light buffer capacity
pub const DEFAULT_MAX_LIGHTS: usize = 128;

/// GPU-ready light record
///
/// Matches the shader struct layout. Shadow fields stay zeroed until an
/// atlas writes its look-up info for the light.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderLight {
    /// Shadow view-projection per slot (4x4 column-major)
    pub shadow_view_proj_matrices: [[[f32; 4]; 4]; MAX_PER_LIGHT_SHADOW_MAP_COUNT],
    /// Light color (linear RGB)
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light direction (normalized, world space)
    pub direction: [f32; 3],
    /// `LightKind` discriminant
    pub light_type: u32,
    /// Nonzero once any slot of this light has a shadow map
    pub is_casting_shadow: u32,
    pub range: f32,
    pub half_inner_angle_cos: f32,
    pub half_outer_angle_cos: f32,
    /// Normalized atlas UV offset per slot
    pub shadow_atlas_cell_offsets: [[f32; 2]; MAX_PER_LIGHT_SHADOW_MAP_COUNT],
    /// Normalized atlas UV size per slot
    pub shadow_atlas_cell_sizes: [f32; MAX_PER_LIGHT_SHADOW_MAP_COUNT],
    /// Nonzero for slots that hold a shadow map this frame
    pub sample_shadow_map: [u32; MAX_PER_LIGHT_SHADOW_MAP_COUNT],
    /// Cascade far bound in camera view depth (directional lights)
    pub shadow_far_bounds: [f32; MAX_PER_LIGHT_SHADOW_MAP_COUNT],
    /// World position
    pub position: [f32; 3],
    pub depth_bias: f32,
    pub normal_bias: f32,
    /// Padding
    pub _pad: f32,
}

impl ShaderLight {
    /// Size in bytes (must be 16-byte aligned)
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Lighting fields from a light; shadow fields start cleared
    pub fn from_light(light: &Light) -> Self {
        Self {
            color: light.color.to_array(),
            intensity: light.intensity,
            direction: light.direction().to_array(),
            light_type: light.kind as u32,
            range: light.range,
            half_inner_angle_cos: (light.inner_angle * 0.5).cos(),
            half_outer_angle_cos: (light.outer_angle * 0.5).cos(),
            position: light.position().to_array(),
            depth_bias: light.shadow_depth_bias,
            normal_bias: light.shadow_normal_bias,
            ..Self::default()
        }
    }

    /// Whether slot `idx` should be sampled
    #[inline]
    pub fn samples_shadow_map(&self, idx: usize) -> bool {
        self.sample_shadow_map.get(idx).is_some_and(|&flag| flag != 0)
    }
}

/// Light buffer statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightBufferStats {
    /// Directional lights written
    pub directional_count: u32,
    /// Spot lights written
    pub spot_count: u32,
    /// Point lights written
    pub point_count: u32,
    /// Visible lights over capacity (dropped)
    pub overflow_count: u32,
}

/// CPU-side light buffer, uploaded once per frame
///
/// Actual GPU buffer creation is handled by the rendering backend.
#[derive(Clone, Debug)]
pub struct LightBuffer {
    records: Vec<ShaderLight>,
    max_lights: usize,
    stats: LightBufferStats,
}

impl LightBuffer {
    /// Create a buffer holding at most `max_lights` records
    pub fn new(max_lights: usize) -> Self {
        Self {
            records: Vec::with_capacity(max_lights),
            max_lights,
            stats: LightBufferStats::default(),
        }
    }

    /// Clear all records
    pub fn clear(&mut self) {
        self.records.clear();
        self.stats = LightBufferStats::default();
    }

    /// Write one record per visible light, in visibility order
    ///
    /// Lights beyond capacity are dropped and counted. Returns the number
    /// of records written.
    pub fn populate(&mut self, lights: &[Light], visibility: &Visibility) -> usize {
        self.clear();

        for &light_idx in &visibility.light_indices {
            if self.records.len() >= self.max_lights {
                self.stats.overflow_count += 1;
                continue;
            }

            let Some(light) = lights.get(light_idx) else {
                // Keep record i aligned with visible light i
                log::warn!(
                    "Visible light index {} outside the scene's {} lights",
                    light_idx,
                    lights.len()
                );
                self.records.push(ShaderLight::default());
                continue;
            };

            match light.kind {
                LightKind::Directional => self.stats.directional_count += 1,
                LightKind::Spot => self.stats.spot_count += 1,
                LightKind::Point => self.stats.point_count += 1,
            }
            self.records.push(ShaderLight::from_light(light));
        }

        if self.stats.overflow_count > 0 {
            log::warn!(
                "Light buffer full: dropped {} of {} visible lights (capacity {})",
                self.stats.overflow_count,
                visibility.light_indices.len(),
                self.max_lights
            );
        }

        self.records.len()
    }

    #[inline]
    pub fn records(&self) -> &[ShaderLight] {
        &self.records
    }

    /// Mutable records, for writing shadow look-up info
    #[inline]
    pub fn records_mut(&mut self) -> &mut [ShaderLight] {
        &mut self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_lights
    }

    /// Records as bytes for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Get current statistics
    pub fn stats(&self) -> &LightBufferStats {
        &self.stats
    }
}

impl Default for LightBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LIGHTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_math::Vec3;

    #[test]
    fn test_shader_light_size() {
        // Verify 16-byte alignment
        assert_eq!(ShaderLight::SIZE % 16, 0);
        assert_eq!(ShaderLight::SIZE, 576);
    }

    #[test]
    fn test_from_light() {
        let cone = core::f32::consts::FRAC_PI_2;
        let light = Light::spot(Vec3::new(1.0, 2.0, 3.0), Vec3::NEG_Y, 15.0, cone)
            .with_shadow_bias(0.01, 0.5);
        let record = ShaderLight::from_light(&light);

        assert_eq!(record.light_type, LightKind::Spot as u32);
        assert_eq!(record.position, [1.0, 2.0, 3.0]);
        assert_eq!(record.range, 15.0);
        assert!((record.half_outer_angle_cos - core::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((record.direction[1] + 1.0).abs() < 1e-4);
        assert_eq!(record.depth_bias, 0.01);
        assert_eq!(record.normal_bias, 0.5);
        assert_eq!(record.is_casting_shadow, 0);
        assert!(!record.samples_shadow_map(0));
    }

    #[test]
    fn test_populate_follows_visibility_order() {
        let lights = [
            Light::point(Vec3::ZERO, 1.0),
            Light::directional(Vec3::NEG_Y),
            Light::point(Vec3::X, 2.0),
        ];
        let visibility = Visibility {
            light_indices: vec![2, 1],
            static_mesh_indices: Vec::new(),
        };

        let mut buffer = LightBuffer::default();
        assert_eq!(buffer.populate(&lights, &visibility), 2);

        assert_eq!(buffer.records()[0].range, 2.0);
        assert_eq!(buffer.records()[1].light_type, LightKind::Directional as u32);
        assert_eq!(buffer.stats().point_count, 1);
        assert_eq!(buffer.stats().directional_count, 1);
        assert_eq!(buffer.as_bytes().len(), 2 * ShaderLight::SIZE);
    }

    #[test]
    fn test_populate_overflow() {
        let lights: Vec<_> = (0..5).map(|i| Light::point(Vec3::splat(i as f32), 1.0)).collect();
        let visibility = Visibility {
            light_indices: (0..5).collect(),
            static_mesh_indices: Vec::new(),
        };

        let mut buffer = LightBuffer::new(3);
        assert_eq!(buffer.populate(&lights, &visibility), 3);
        assert_eq!(buffer.stats().overflow_count, 2);

        // Repopulating starts over
        assert_eq!(buffer.populate(&lights, &Visibility::default()), 0);
        assert_eq!(buffer.stats().overflow_count, 0);
    }
}
