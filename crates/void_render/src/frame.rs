//! Per-frame shadow and visibility preparation
//!
//! [`ShadowRenderer`] runs the CPU side of a frame in a fixed order:
//!
//! 1. Cull lights against the camera frustum
//! 2. Write one shading record per visible light
//! 3. Re-partition both shadow atlases
//! 4. Write shadow look-up data into the shading records
//! 5. Build one depth-only draw batch per populated subcell
//! 6. Cull static meshes for the main pass
//!
//! The returned [`FramePlan`] is everything the backend needs to record the
//! shadow and color passes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::light_buffer::{LightBuffer, LightBufferStats};
use crate::scene::{Camera, SceneSnapshot};
use crate::shadow::{
    AtlasStats, CameraFrame, CascadeBounds, CascadeSettings, DirectionalShadowAtlas,
    PunctualShadowAtlas, ShadowAtlas, ShadowConfig, ShadowDrawBatch, ShadowTextureAllocator,
    CASCADE_COUNT,
};
use crate::visibility::{cull_lights, cull_static_mesh_components, Visibility};

/// Counters for one prepared frame
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    pub visible_lights: u32,
    pub visible_static_meshes: u32,
    pub light_buffer: LightBufferStats,
    pub punctual: AtlasStats,
    pub directional: AtlasStats,
}

/// Output of [`ShadowRenderer::prepare_frame`]
#[derive(Clone, Debug)]
pub struct FramePlan {
    /// Lights and static meshes visible to the camera
    pub visibility: Visibility,
    /// Depth passes into the punctual atlas
    pub punctual_batches: Vec<ShadowDrawBatch>,
    /// Depth passes into the directional atlas
    pub directional_batches: Vec<ShadowDrawBatch>,
    /// Cascade depth ranges used this frame
    pub cascade_bounds: [CascadeBounds; CASCADE_COUNT],
    pub stats: FrameStats,
}

impl FramePlan {
    /// All shadow depth passes, punctual first
    pub fn shadow_batches(&self) -> impl Iterator<Item = &ShadowDrawBatch> {
        self.punctual_batches.iter().chain(self.directional_batches.iter())
    }
}

/// Owns both shadow atlases and the light buffer
#[derive(Debug)]
pub struct ShadowRenderer {
    config: ShadowConfig,
    punctual: PunctualShadowAtlas,
    directional: DirectionalShadowAtlas,
    light_buffer: LightBuffer,
}

impl ShadowRenderer {
    /// Create both atlas textures through `allocator`
    pub fn new(
        mut config: ShadowConfig,
        allocator: &mut dyn ShadowTextureAllocator,
    ) -> Result<Self> {
        config.validate();

        let mut punctual = PunctualShadowAtlas::from_config(allocator, &config)?;
        let directional = match DirectionalShadowAtlas::from_config(allocator, &config) {
            Ok(atlas) => atlas,
            Err(err) => {
                punctual.release(allocator);
                return Err(err);
            }
        };

        log::info!(
            "Shadow renderer ready (punctual {}, directional {}, {} lights, enabled: {})",
            config.punctual_atlas_size,
            config.directional_atlas_size,
            config.max_lights,
            config.enabled
        );

        Ok(Self {
            light_buffer: LightBuffer::new(config.max_lights),
            config,
            punctual,
            directional,
        })
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    /// Apply a new configuration
    ///
    /// Atlases whose size or depth format changed are recreated. If the
    /// backend fails to create a texture, the renderer keeps its current
    /// atlases and configuration.
    pub fn reconfigure(
        &mut self,
        mut config: ShadowConfig,
        allocator: &mut dyn ShadowTextureAllocator,
    ) -> Result<()> {
        config.validate();

        let format_changed = config.depth_format != self.config.depth_format;
        let punctual_changed =
            format_changed || config.punctual_atlas_size != self.config.punctual_atlas_size;
        let directional_changed =
            format_changed || config.directional_atlas_size != self.config.directional_atlas_size;

        // Create every replacement texture before touching the current ones
        let punctual = if punctual_changed {
            Some(PunctualShadowAtlas::from_config(allocator, &config)?)
        } else {
            None
        };

        let directional = if directional_changed {
            match DirectionalShadowAtlas::from_config(allocator, &config) {
                Ok(atlas) => Some(atlas),
                Err(err) => {
                    if let Some(mut atlas) = punctual {
                        atlas.release(allocator);
                    }
                    return Err(err);
                }
            }
        } else {
            None
        };

        match punctual {
            Some(atlas) => {
                self.punctual.release(allocator);
                self.punctual = atlas;
            }
            None => self.punctual.set_shadow_distance(config.shadow_distance),
        }

        match directional {
            Some(atlas) => {
                self.directional.release(allocator);
                self.directional = atlas;
            }
            None => self.directional.set_settings(CascadeSettings::from(&config)),
        }

        if config.max_lights != self.config.max_lights {
            self.light_buffer = LightBuffer::new(config.max_lights);
        }

        log::debug!("Shadow configuration updated: {:?}", config);
        self.config = config;
        Ok(())
    }

    pub fn punctual_atlas(&self) -> &PunctualShadowAtlas {
        &self.punctual
    }

    pub fn directional_atlas(&self) -> &DirectionalShadowAtlas {
        &self.directional
    }

    /// Shading records of the last prepared frame
    pub fn light_buffer(&self) -> &LightBuffer {
        &self.light_buffer
    }

    /// Cull, allocate shadow maps and build the frame's draw lists
    pub fn prepare_frame(
        &mut self,
        scene: SceneSnapshot<'_>,
        camera: &Camera,
        aspect: f32,
    ) -> Result<FramePlan> {
        let camera_frame = CameraFrame::new(camera, aspect);
        let frustum = camera_frame.frustum;

        let mut visibility = Visibility::new();
        cull_lights(&frustum, scene.lights, &mut visibility);

        self.light_buffer.clear();
        let record_count = self.light_buffer.populate(scene.lights, &visibility);

        // Lights past the buffer's capacity have no record to sample from
        let mut shaded = visibility.clone();
        shaded.light_indices.truncate(record_count);

        let mut punctual_batches = Vec::new();
        let mut directional_batches = Vec::new();

        if self.config.enabled {
            self.punctual.update(scene.lights, &shaded, &camera_frame)?;
            self.directional.update(scene.lights, &shaded, &camera_frame)?;

            self.punctual.set_look_up_info(self.light_buffer.records_mut())?;
            self.directional.set_look_up_info(self.light_buffer.records_mut())?;

            punctual_batches = self.punctual.shadow_draw_batches(scene.static_meshes)?;
            directional_batches = self.directional.shadow_draw_batches(scene.static_meshes)?;
        } else {
            // Leave no stale assignments behind
            let nothing = Visibility::new();
            self.punctual.update(scene.lights, &nothing, &camera_frame)?;
            self.directional.update(scene.lights, &nothing, &camera_frame)?;
        }

        cull_static_mesh_components(&frustum, scene.static_meshes, &mut visibility);

        let stats = FrameStats {
            visible_lights: visibility.light_indices.len() as u32,
            visible_static_meshes: visibility.static_mesh_indices.len() as u32,
            light_buffer: self.light_buffer.stats().clone(),
            punctual: self.punctual.stats().clone(),
            directional: self.directional.stats().clone(),
        };

        log::debug!(
            "Frame prepared: {} lights, {} meshes visible, {} shadow passes",
            stats.visible_lights,
            stats.visible_static_meshes,
            punctual_batches.len() + directional_batches.len()
        );

        Ok(FramePlan {
            visibility,
            punctual_batches,
            directional_batches,
            cascade_bounds: *self.directional.cascade_bounds(),
            stats,
        })
    }

    /// Return both atlas textures to the backend
    pub fn release(&mut self, allocator: &mut dyn ShadowTextureAllocator) {
        self.punctual.release(allocator);
        self.directional.release(allocator);
    }
}
