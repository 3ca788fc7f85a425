//! Atlas depth texture ownership
//!
//! Atlases never talk to a GPU API directly. A backend implements
//! [`ShadowTextureAllocator`]; each atlas asks it once for a square depth
//! texture with a sampled view and a depth-target view, and hands the
//! views back on release.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShadowError};

/// Depth texture formats usable for shadow atlases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFormat {
    Depth16Unorm,
    Depth24Plus,
    Depth32Float,
}

impl DepthFormat {
    /// Bytes per texel
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::Depth16Unorm => 2,
            Self::Depth24Plus | Self::Depth32Float => 4,
        }
    }
}

/// Atlas depth texture descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepthAtlasDesc {
    /// Debug label
    pub label: String,
    /// Edge length in texels (square, power of 2)
    pub size: u32,
    pub format: DepthFormat,
}

/// Backend handle of a texture view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub u64);

/// Views created by the backend for one atlas texture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasTextureViews {
    /// Sampled by the lighting pass
    pub shader_resource: TextureViewHandle,
    /// Rendered into by the shadow depth passes
    pub depth_target: TextureViewHandle,
}

/// GPU resource creation for shadow atlases
pub trait ShadowTextureAllocator {
    fn create_depth_atlas(
        &mut self,
        desc: &DepthAtlasDesc,
    ) -> std::result::Result<AtlasTextureViews, String>;

    fn destroy_depth_atlas(&mut self, views: AtlasTextureViews);
}

/// Depth texture owned by one atlas
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlasTexture {
    desc: DepthAtlasDesc,
    views: Option<AtlasTextureViews>,
}

impl AtlasTexture {
    /// Create the texture through the backend
    pub fn create(
        allocator: &mut dyn ShadowTextureAllocator,
        desc: DepthAtlasDesc,
    ) -> Result<Self> {
        if !desc.size.is_power_of_two() {
            return Err(ShadowError::NonPowerOfTwo { value: desc.size });
        }

        let views = allocator
            .create_depth_atlas(&desc)
            .map_err(ShadowError::AtlasTextureCreation)?;

        log::info!(
            "Created shadow atlas '{}' ({}x{}, {:?}, {} KiB)",
            desc.label,
            desc.size,
            desc.size,
            desc.format,
            desc.size as u64 * desc.size as u64 * desc.format.bytes_per_texel() as u64 / 1024
        );

        Ok(Self {
            desc,
            views: Some(views),
        })
    }

    /// Edge length in texels
    #[inline]
    pub fn size(&self) -> u32 {
        self.desc.size
    }

    #[inline]
    pub fn format(&self) -> DepthFormat {
        self.desc.format
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.desc.label
    }

    /// Views, or `None` after release
    #[inline]
    pub fn views(&self) -> Option<&AtlasTextureViews> {
        self.views.as_ref()
    }

    /// Return the views to the backend; later calls do nothing
    pub fn release(&mut self, allocator: &mut dyn ShadowTextureAllocator) {
        if let Some(views) = self.views.take() {
            allocator.destroy_depth_atlas(views);
            log::info!("Released shadow atlas '{}'", self.desc.label);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Allocator that hands out sequential handles and records releases
    #[derive(Default)]
    pub(crate) struct CountingAllocator {
        pub next: u64,
        pub live: Vec<AtlasTextureViews>,
        pub fail: bool,
        /// Fail only atlases whose label contains this
        pub fail_label: Option<&'static str>,
    }

    impl ShadowTextureAllocator for CountingAllocator {
        fn create_depth_atlas(
            &mut self,
            desc: &DepthAtlasDesc,
        ) -> std::result::Result<AtlasTextureViews, String> {
            if self.fail || self.fail_label.is_some_and(|label| desc.label.contains(label)) {
                return Err(format!("out of memory for {}", desc.label));
            }
            let views = AtlasTextureViews {
                shader_resource: TextureViewHandle(self.next),
                depth_target: TextureViewHandle(self.next + 1),
            };
            self.next += 2;
            self.live.push(views);
            Ok(views)
        }

        fn destroy_depth_atlas(&mut self, views: AtlasTextureViews) {
            self.live.retain(|live| *live != views);
        }
    }

    fn desc(size: u32) -> DepthAtlasDesc {
        DepthAtlasDesc {
            label: "test atlas".into(),
            size,
            format: DepthFormat::Depth32Float,
        }
    }

    #[test]
    fn test_create_and_release() {
        let mut allocator = CountingAllocator::default();
        let mut texture = AtlasTexture::create(&mut allocator, desc(1024)).unwrap();
        assert_eq!(texture.size(), 1024);
        assert_eq!(allocator.live.len(), 1);

        texture.release(&mut allocator);
        texture.release(&mut allocator);
        assert!(allocator.live.is_empty());
        assert!(texture.views().is_none());
    }

    #[test]
    fn test_create_rejects_non_power_of_two() {
        let mut allocator = CountingAllocator::default();
        assert_eq!(
            AtlasTexture::create(&mut allocator, desc(1000)),
            Err(ShadowError::NonPowerOfTwo { value: 1000 })
        );
        assert!(allocator.live.is_empty());
    }

    #[test]
    fn test_backend_failure() {
        let mut allocator = CountingAllocator {
            fail: true,
            ..Default::default()
        };
        let err = AtlasTexture::create(&mut allocator, desc(512)).unwrap_err();
        assert!(matches!(
            err,
            ShadowError::AtlasTextureCreation(msg) if msg.contains("test atlas")
        ));
    }
}
