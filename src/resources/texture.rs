//! Decoded texture data.
//!
//! Textures arrive already decoded (RGBA8) from the resource loaders. This
//! module only carries the pixels plus the per-texture feature block that
//! drives bumpmap frame cycling and environment mapping.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec4;

use crate::errors::{OdysseyError, Result};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity, used as the GPU cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    #[default]
    Image2D,
    /// Six square faces stored consecutively in +X, -X, +Y, -Y, +Z, -Z order.
    CubeMap,
}

/// Texture features parsed from the texture's info block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureFeatures {
    /// Frame grid columns for animated bumpmaps.
    pub num_x: u32,
    /// Frame grid rows for animated bumpmaps.
    pub num_y: u32,
    /// Playback rate of the frame grid.
    pub fps: f32,
    /// Single-channel height data stored in the red channel.
    pub grayscale: bool,
    pub bump_intensity: f32,
    /// Texture stores a reflection map sampled by direction.
    pub is_envmap: bool,
}

impl Default for TextureFeatures {
    fn default() -> Self {
        Self {
            num_x: 1,
            num_y: 1,
            fps: 0.0,
            grayscale: false,
            bump_intensity: 1.0,
            is_envmap: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    id: TextureId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    /// Tightly packed RGBA8 pixels.
    pub pixels: Vec<u8>,
    pub features: TextureFeatures,
}

impl Texture {
    pub fn new_2d(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(OdysseyError::InvalidAsset {
                name,
                reason: format!(
                    "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                    pixels.len()
                ),
            });
        }
        Ok(Self {
            id: TextureId::next(),
            name,
            width,
            height,
            kind: TextureKind::Image2D,
            pixels,
            features: TextureFeatures::default(),
        })
    }

    pub fn new_cube(name: impl Into<String>, size: u32, pixels: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let expected = size as usize * size as usize * 4 * 6;
        if size == 0 || pixels.len() != expected {
            return Err(OdysseyError::InvalidAsset {
                name,
                reason: format!("expected {expected} bytes for six {size}x{size} faces, got {}", pixels.len()),
            });
        }
        Ok(Self {
            id: TextureId::next(),
            name,
            width: size,
            height: size,
            kind: TextureKind::CubeMap,
            pixels,
            features: TextureFeatures {
                is_envmap: true,
                ..TextureFeatures::default()
            },
        })
    }

    /// 1x1 texture of a single color.
    #[must_use]
    pub fn solid(name: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            id: TextureId::next(),
            name: name.into(),
            width: 1,
            height: 1,
            kind: TextureKind::Image2D,
            pixels: rgba.to_vec(),
            features: TextureFeatures::default(),
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: TextureFeatures) -> Self {
        self.features = features;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[must_use]
    pub fn layer_count(&self) -> u32 {
        match self.kind {
            TextureKind::Image2D => 1,
            TextureKind::CubeMap => 6,
        }
    }

    #[must_use]
    pub fn frame_count(&self) -> u32 {
        (self.features.num_x * self.features.num_y).max(1)
    }

    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.frame_count() > 1 && self.features.fps > 0.0
    }

    /// Frame of the grid shown after `elapsed` seconds of playback.
    #[must_use]
    pub fn frame_at(&self, elapsed: f32) -> u32 {
        if !self.is_animated() {
            return 0;
        }
        let frame = (elapsed.max(0.0) * self.features.fps).floor() as u64;
        (frame % u64::from(self.frame_count())) as u32
    }

    /// UV rectangle of `frame` within the grid as `(offset.x, offset.y, scale.x, scale.y)`.
    #[must_use]
    pub fn frame_rect(&self, frame: u32) -> Vec4 {
        let num_x = self.features.num_x.max(1);
        let num_y = self.features.num_y.max(1);
        let frame = frame % self.frame_count();
        let scale_x = 1.0 / num_x as f32;
        let scale_y = 1.0 / num_y as f32;
        Vec4::new(
            (frame % num_x) as f32 * scale_x,
            (frame / num_x) as f32 * scale_y,
            scale_x,
            scale_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(num_x: u32, num_y: u32, fps: f32) -> Texture {
        Texture::solid("bump", [128, 128, 255, 255]).with_features(TextureFeatures {
            num_x,
            num_y,
            fps,
            grayscale: true,
            ..TextureFeatures::default()
        })
    }

    #[test]
    fn rejects_pixel_size_mismatch() {
        assert!(Texture::new_2d("bad", 2, 2, vec![0; 15]).is_err());
        assert!(Texture::new_cube("bad", 2, vec![0; 16]).is_err());
        assert!(Texture::new_2d("ok", 2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn ids_are_unique() {
        let a = Texture::solid("a", [0; 4]);
        let b = Texture::solid("b", [0; 4]);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn static_texture_stays_on_first_frame() {
        let tex = grid(1, 1, 10.0);
        assert_eq!(tex.frame_at(5.0), 0);
        let tex = grid(4, 2, 0.0);
        assert_eq!(tex.frame_at(5.0), 0);
    }

    #[test]
    fn animated_grid_wraps_frames() {
        let tex = grid(4, 2, 8.0);
        assert_eq!(tex.frame_count(), 8);
        assert_eq!(tex.frame_at(0.0), 0);
        assert_eq!(tex.frame_at(0.5), 4);
        assert_eq!(tex.frame_at(1.0), 0);
        assert_eq!(tex.frame_at(1.125), 1);
    }

    #[test]
    fn frame_rect_walks_rows() {
        let tex = grid(4, 2, 8.0);
        let rect = tex.frame_rect(5);
        assert!((rect.x - 0.25).abs() < 1e-6);
        assert!((rect.y - 0.5).abs() < 1e-6);
        assert!((rect.z - 0.25).abs() < 1e-6);
        assert!((rect.w - 0.5).abs() < 1e-6);
    }
}
