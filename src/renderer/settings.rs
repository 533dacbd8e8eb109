//! Graphics Options
//!
//! User-facing renderer configuration, loaded once at startup.
//!
//! Every toggle only selects between a real pass and a neutral placeholder
//! input (or a pass-through copy); binding layouts never change with the
//! options, so a pipeline built for one set of options stays valid.
//!
//! # Example
//!
//! ```rust,ignore
//! use odyssey::renderer::GraphicsOptions;
//!
//! let options = GraphicsOptions::from_json_str(r#"{ "ssao": true, "fxaa": true }"#)?;
//! assert_eq!(options.shadow_resolution, 2048);
//! ```
//!
//! | Field               | Description                              | Default  |
//! |---------------------|------------------------------------------|----------|
//! | `ssao`              | Screen-space ambient occlusion           | `false`  |
//! | `ssr`               | Screen-space reflections                 | `false`  |
//! | `fxaa`              | Post-process anti-aliasing               | `false`  |
//! | `sharpen`           | 3x3 sharpen after FXAA                   | `false`  |
//! | `pbr`               | GGX lighting instead of Blinn-Phong      | `false`  |
//! | `shadow_resolution` | Shadow map edge length in texels         | `2048`   |
//! | `anisotropy`        | Material sampler anisotropy clamp        | `1`      |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::resources::{SsaoSettings, SsrSettings};

pub const MIN_SHADOW_RESOLUTION: u32 = 256;
pub const MAX_SHADOW_RESOLUTION: u32 = 8192;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsOptions {
    pub ssao: bool,
    pub ssr: bool,
    pub fxaa: bool,
    pub sharpen: bool,
    /// Selects the GGX shading model at shader compile time.
    pub pbr: bool,
    pub shadow_resolution: u32,
    pub anisotropy: u16,
    pub ssr_quality: SsrSettings,
    pub ssao_settings: SsaoSettings,
}

impl Default for GraphicsOptions {
    fn default() -> Self {
        Self {
            ssao: false,
            ssr: false,
            fxaa: false,
            sharpen: false,
            pbr: false,
            shadow_resolution: 2048,
            anisotropy: 1,
            ssr_quality: SsrSettings::default(),
            ssao_settings: SsaoSettings::default(),
        }
    }
}

impl GraphicsOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options.sanitized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Loading graphics options from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Clamps out-of-range values into their supported ranges.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let requested = self.shadow_resolution;
        self.shadow_resolution = requested
            .clamp(MIN_SHADOW_RESOLUTION, MAX_SHADOW_RESOLUTION)
            .next_power_of_two()
            .min(MAX_SHADOW_RESOLUTION);
        if self.shadow_resolution != requested {
            log::warn!(
                "Shadow resolution {requested} unsupported, using {}",
                self.shadow_resolution
            );
        }
        self.anisotropy = self.anisotropy.clamp(1, 16);
        self.ssr_quality.max_steps = self.ssr_quality.max_steps.max(1);
        self.ssr_quality.pixel_stride = self.ssr_quality.pixel_stride.max(1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let options = GraphicsOptions::from_json_str(r#"{ "ssao": true }"#).unwrap();
        assert!(options.ssao);
        assert!(!options.ssr);
        assert_eq!(options.shadow_resolution, 2048);
    }

    #[test]
    fn shadow_resolution_is_clamped_to_power_of_two() {
        let options = GraphicsOptions::from_json_str(r#"{ "shadow_resolution": 3000 }"#).unwrap();
        assert_eq!(options.shadow_resolution, 4096);
        let options = GraphicsOptions::from_json_str(r#"{ "shadow_resolution": 16 }"#).unwrap();
        assert_eq!(options.shadow_resolution, MIN_SHADOW_RESOLUTION);
        let options = GraphicsOptions::from_json_str(r#"{ "shadow_resolution": 100000 }"#).unwrap();
        assert_eq!(options.shadow_resolution, MAX_SHADOW_RESOLUTION);
    }
}
