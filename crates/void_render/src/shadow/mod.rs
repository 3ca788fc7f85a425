//! Shadow Mapping System
//!
//! Backend-agnostic shadow atlas allocation for directional, spot,
//! and point light shadows.
//!
//! # Architecture
//!
//! The shadow system is split into:
//!
//! - **Config**: Global shadow settings
//! - **Texture**: Atlas depth texture ownership through a backend seam
//! - **Cell**: Subcell assignments inside one atlas cell
//! - **Atlas**: Shared atlas interface, shading look-up and draw batches
//! - **Punctual**: Screen-coverage tiers for spot and point lights
//! - **Directional**: Cascaded shadow maps, one cell growing with demand
//! - **Cascade**: Cascade split and light-space fitting math
//!
//! # Usage
//!
//! ```ignore
//! use void_render::shadow::*;
//!
//! let mut config = ShadowConfig::default();
//! config.validate();
//!
//! let mut punctual = PunctualShadowAtlas::from_config(&mut backend, &config)?;
//! let mut directional = DirectionalShadowAtlas::from_config(&mut backend, &config)?;
//!
//! // Per frame, after culling and populating the light buffer
//! let camera_frame = CameraFrame::new(&camera, aspect);
//! punctual.update(&lights, &visibility, &camera_frame)?;
//! directional.update(&lights, &visibility, &camera_frame)?;
//!
//! punctual.set_look_up_info(light_buffer.records_mut())?;
//! directional.set_look_up_info(light_buffer.records_mut())?;
//!
//! // One depth-only pass per populated subcell
//! for batch in punctual.shadow_draw_batches(&meshes)? {
//!     backend.draw_shadow(&batch);
//! }
//! ```
//!
//! # Hot-Reload Support
//!
//! Shadow configuration and allocation statistics support serde
//! serialization. Atlas textures are created by the backend and need to be
//! recreated after a reload that changes their size or format.

pub mod config;
pub mod texture;
pub mod cell;
pub mod atlas;
pub mod cascade;
pub mod punctual;
pub mod directional;

// Re-exports
pub use config::{ShadowConfig, MAX_ATLAS_SIZE, MIN_ATLAS_SIZE};

pub use texture::{
    AtlasTexture,
    AtlasTextureViews,
    DepthAtlasDesc,
    DepthFormat,
    ShadowTextureAllocator,
    TextureViewHandle,
};

pub use cell::{ShadowAtlasCell, ShadowAtlasSubcellData};

pub use atlas::{
    AtlasStats,
    AtlasViewport,
    CameraFrame,
    ShadowAtlas,
    ShadowDrawBatch,
};

pub use cascade::{
    cascade_corners,
    cascade_for_depth,
    compute_cascade_bounds,
    fit_cascade_view_projection,
    CascadeBounds,
    CASCADE_COUNT,
};

pub use punctual::{
    screen_coverage_tier,
    PunctualShadowAtlas,
    CUBE_FACES,
    TIER_COVERAGE_THRESHOLDS,
    TIER_SUBDIVISIONS,
};

pub use directional::{CascadeSettings, DirectionalShadowAtlas};
