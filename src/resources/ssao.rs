//! Screen-space effect settings and SSAO sample data.
//!
//! # Algorithm
//!
//! The SSAO pass uses:
//! 1. A hemisphere kernel of [`NUM_SSAO_SAMPLES`] directions whose lengths grow
//!    quadratically with the sample index, concentrating samples near the
//!    shaded point
//! 2. A 4×4 tiled rotation noise texture that randomizes the kernel
//!    orientation per pixel
//! 3. A 4×4 box blur that removes the noise pattern
//!
//! SSR marches the reflected eye-space ray in screen space with a fixed pixel
//! stride and step budget, then blurs the result with a separable 9-tap
//! Gaussian.

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::resources::uniforms::{NUM_SSAO_SAMPLES, SsaoKernelUniforms};

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoSettings {
    /// Eye-space sampling radius.
    pub radius: f32,
    /// Depth comparison bias against self-occlusion.
    pub bias: f32,
    /// Exponent applied to the final ambient term.
    pub power: f32,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self {
            radius: 0.5,
            bias: 0.025,
            power: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrSettings {
    /// Depth tolerance for accepting a hit.
    pub bias: f32,
    /// Pixels advanced per ray-march step.
    pub pixel_stride: f32,
    pub max_steps: u32,
    /// Eye-space length of the reflected ray.
    pub max_distance: f32,
}

impl Default for SsrSettings {
    fn default() -> Self {
        Self {
            bias: 0.1,
            pixel_stride: 4.0,
            max_steps: 32,
            max_distance: 100.0,
        }
    }
}

// ============================================================================
// Kernel & Noise Generation
// ============================================================================

/// Generates the hemisphere sample kernel.
///
/// Uses a fixed seed so the kernel is identical across frames and sessions.
/// Sample `i` is a unit direction in the +Z hemisphere scaled by
/// `mix(0.1, 1.0, t²)` with `t = i / N`, so sample magnitudes never decrease
/// with the index.
#[must_use]
pub fn generate_ssao_kernel() -> SsaoKernelUniforms {
    let mut rng = StdRng::seed_from_u64(42);
    let mut samples = [Vec4::ZERO; NUM_SSAO_SAMPLES];

    for (i, slot) in samples.iter_mut().enumerate() {
        let direction = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(0.01..1.0),
        )
        .normalize();

        let t = i as f32 / NUM_SSAO_SAMPLES as f32;
        let scale = lerp(0.1, 1.0, t * t);
        *slot = (direction * scale).extend(0.0);
    }
    SsaoKernelUniforms { samples }
}

/// Generates a 4×4 rotation noise texture (16 RGBA8 pixels).
///
/// Each pixel encodes a random rotation vector in XY (Z = 0), remapped to
/// `[0, 255]`. Sampled with `Repeat` addressing and `Nearest` filtering.
#[must_use]
pub fn generate_ssao_noise() -> Vec<[u8; 4]> {
    let mut rng = StdRng::seed_from_u64(12345);
    (0..16)
        .map(|_| {
            let xy = Vec3::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), 0.0)
                .normalize_or(Vec3::X);
            [
                ((xy.x * 0.5 + 0.5) * 255.0) as u8,
                ((xy.y * 0.5 + 0.5) * 255.0) as u8,
                0,
                255,
            ]
        })
        .collect()
}

fn lerp(a: f32, b: f32, f: f32) -> f32 {
    a + f * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_stays_in_upper_hemisphere() {
        let kernel = generate_ssao_kernel();
        for s in kernel.samples {
            assert!(s.z > 0.0);
            assert!(s.truncate().length() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn kernel_is_deterministic() {
        assert_eq!(generate_ssao_kernel(), generate_ssao_kernel());
        assert_eq!(generate_ssao_noise(), generate_ssao_noise());
    }

    #[test]
    fn noise_has_sixteen_opaque_pixels() {
        let noise = generate_ssao_noise();
        assert_eq!(noise.len(), 16);
        assert!(noise.iter().all(|p| p[2] == 0 && p[3] == 255));
    }
}
