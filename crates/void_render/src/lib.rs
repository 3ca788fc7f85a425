//! # void_render - Shadow Atlases and Visibility
//!
//! Backend-agnostic per-frame shadow and culling infrastructure with:
//! - Frustum culling of lights and static meshes
//! - A punctual shadow atlas with four screen-coverage quality tiers
//! - A directional shadow atlas with cascaded shadow maps
//! - GPU-ready light records carrying shadow look-up data
//!
//! ## Architecture
//!
//! The system is built on three main concepts:
//!
//! 1. **Visibility**: Per-camera index lists of the lights and meshes that
//!    touch the view frustum
//! 2. **Shadow atlases**: One depth texture each, re-partitioned every
//!    frame among the visible shadow casters
//! 3. **Light buffer**: One shading record per visible light, with shadow
//!    sampling parameters written by the atlases
//!
//! The scene is read through borrowed snapshots; nothing here owns lights,
//! meshes or GPU devices.
//!
//! ## Example
//!
//! ```ignore
//! use void_render::prelude::*;
//!
//! let mut shadows = ShadowRenderer::new(ShadowConfig::default(), &mut backend)?;
//!
//! // Every frame
//! let plan = shadows.prepare_frame(SceneSnapshot::new(&lights, &meshes), &camera, aspect)?;
//!
//! for batch in &plan.punctual_batches {
//!     backend.render_depth(punctual_target, batch);
//! }
//! for batch in &plan.directional_batches {
//!     backend.render_depth(directional_target, batch);
//! }
//!
//! backend.upload_lights(shadows.light_buffer().as_bytes());
//! backend.draw_meshes(&plan.visibility.static_mesh_indices);
//!
//! // Shutdown
//! shadows.release(&mut backend);
//! ```

pub mod error;
pub mod scene;
pub mod visibility;
pub mod light_buffer;
pub mod shadow;
pub mod frame;

pub use error::{Result, ShadowError};

pub use scene::{Camera, Light, LightKind, Projection, SceneSnapshot, StaticMeshInstance};

// Culling
pub use visibility::{
    cull_lights, cull_static_mesh_components, is_light_visible, is_static_mesh_visible,
    point_light_bounding_sphere, spot_light_world_bounds, Visibility,
};

// Lighting
pub use light_buffer::{
    LightBuffer, LightBufferStats, ShaderLight,
    DEFAULT_MAX_LIGHTS, MAX_PER_LIGHT_SHADOW_MAP_COUNT,
};

// Shadow Mapping
pub use shadow::{
    // Config
    ShadowConfig, DepthFormat,
    // Atlases
    ShadowAtlas, PunctualShadowAtlas, DirectionalShadowAtlas, AtlasStats,
    ShadowAtlasCell, ShadowAtlasSubcellData, ShadowDrawBatch, AtlasViewport, CameraFrame,
    // Cascades
    CascadeBounds, CASCADE_COUNT,
    // Backend seam
    ShadowTextureAllocator,
};

// Frame orchestration
pub use frame::{FramePlan, FrameStats, ShadowRenderer};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::error::ShadowError;
    pub use crate::scene::{Camera, Light, LightKind, Projection, SceneSnapshot, StaticMeshInstance};
    pub use crate::visibility::Visibility;
    pub use crate::light_buffer::{LightBuffer, ShaderLight};
    pub use crate::shadow::{
        ShadowAtlas, ShadowAtlasSubcellData, ShadowConfig, ShadowDrawBatch, ShadowTextureAllocator,
    };
    pub use crate::frame::{FramePlan, ShadowRenderer};
}
