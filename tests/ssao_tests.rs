//! Screen-Space Effect Data Tests
//!
//! Tests for:
//! - SSAO kernel shape (hemisphere, growing magnitudes, determinism)
//! - Rotation noise texture
//! - Default SSR/SSAO parameters

use odyssey::resources::ssao::{generate_ssao_kernel, generate_ssao_noise};
use odyssey::resources::{NUM_SSAO_SAMPLES, SsaoSettings, SsrSettings};

const EPSILON: f32 = 1e-5;

// ============================================================================
// Kernel
// ============================================================================

#[test]
fn kernel_magnitudes_non_decreasing() {
    let kernel = generate_ssao_kernel();
    for i in 1..NUM_SSAO_SAMPLES {
        let previous = kernel.samples[i - 1].truncate().length();
        let current = kernel.samples[i].truncate().length();
        assert!(
            current + EPSILON >= previous,
            "Sample {i} magnitude {current} is smaller than sample {} magnitude {previous}",
            i - 1
        );
    }
}

#[test]
fn kernel_magnitudes_match_quadratic_scale() {
    let kernel = generate_ssao_kernel();
    for (i, sample) in kernel.samples.iter().enumerate() {
        let t = i as f32 / NUM_SSAO_SAMPLES as f32;
        let expected = 0.1 + (1.0 - 0.1) * t * t;
        let length = sample.truncate().length();
        assert!((length - expected).abs() < 1e-4, "Sample {i}: expected {expected}, got {length}");
    }
}

#[test]
fn kernel_points_into_the_normal_hemisphere() {
    let kernel = generate_ssao_kernel();
    assert!(kernel.samples.iter().all(|s| s.z > 0.0 && s.w == 0.0));
}

#[test]
fn kernel_is_deterministic() {
    assert_eq!(generate_ssao_kernel().samples, generate_ssao_kernel().samples);
}

// ============================================================================
// Noise
// ============================================================================

#[test]
fn noise_is_a_4x4_tile_of_xy_rotations() {
    let noise = generate_ssao_noise();
    assert_eq!(noise.len(), 16);
    for pixel in &noise {
        assert_eq!(pixel[2], 0, "Rotation vectors lie in the XY plane");
        assert_eq!(pixel[3], 255);
    }
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn default_settings_are_usable() {
    let ssr = SsrSettings::default();
    assert!(ssr.max_steps > 0);
    assert!(ssr.pixel_stride >= 1.0);
    let ssao = SsaoSettings::default();
    assert!(ssao.radius > 0.0);
    assert!(ssao.power > 0.0);
}
