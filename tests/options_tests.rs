//! Graphics Options Tests
//!
//! Tests for:
//! - JSON loading with defaults for missing fields
//! - Sanitizing out-of-range values
//! - Shader defines derived from options

use odyssey::renderer::settings::{MAX_SHADOW_RESOLUTION, MIN_SHADOW_RESOLUTION};
use odyssey::renderer::{GraphicsOptions, ShaderDefines};
use odyssey::OdysseyError;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn empty_object_gives_defaults() {
    let options = GraphicsOptions::from_json_str("{}").unwrap();
    assert_eq!(options, GraphicsOptions::default());
    assert!(!options.ssao && !options.ssr && !options.fxaa && !options.sharpen && !options.pbr);
    assert_eq!(options.shadow_resolution, 2048);
}

#[test]
fn nested_settings_merge_with_defaults() {
    let options = GraphicsOptions::from_json_str(
        r#"{ "ssr": true, "ssr_quality": { "max_steps": 64 }, "ssao_settings": { "radius": 1.5 } }"#,
    )
    .unwrap();
    assert!(options.ssr);
    assert_eq!(options.ssr_quality.max_steps, 64);
    assert_eq!(options.ssao_settings.radius, 1.5);
    assert_eq!(options.ssao_settings.power, GraphicsOptions::default().ssao_settings.power);
}

#[test]
fn malformed_json_is_an_error() {
    let result = GraphicsOptions::from_json_str("{ ssao: true");
    assert!(matches!(result, Err(OdysseyError::JsonError(_))), "Expected JSON error, got {result:?}");
}

#[test]
fn options_survive_a_json_round_trip() {
    let options = GraphicsOptions {
        ssao: true,
        fxaa: true,
        shadow_resolution: 1024,
        ..GraphicsOptions::default()
    };
    let json = serde_json::to_string(&options).unwrap();
    assert_eq!(GraphicsOptions::from_json_str(&json).unwrap(), options);
}

#[test]
fn missing_file_is_an_io_error() {
    let result = GraphicsOptions::from_json_file("/nonexistent/odyssey/graphics.json");
    assert!(matches!(result, Err(OdysseyError::IoError(_))));
}

// ============================================================================
// Sanitizing
// ============================================================================

#[test]
fn shadow_resolution_rounds_up_to_power_of_two() {
    let options = GraphicsOptions {
        shadow_resolution: 1500,
        ..GraphicsOptions::default()
    }
    .sanitized();
    assert_eq!(options.shadow_resolution, 2048);
}

#[test]
fn shadow_resolution_is_clamped() {
    let low = GraphicsOptions {
        shadow_resolution: 1,
        ..GraphicsOptions::default()
    }
    .sanitized();
    let high = GraphicsOptions {
        shadow_resolution: u32::MAX / 2,
        ..GraphicsOptions::default()
    }
    .sanitized();
    assert_eq!(low.shadow_resolution, MIN_SHADOW_RESOLUTION);
    assert_eq!(high.shadow_resolution, MAX_SHADOW_RESOLUTION);
}

#[test]
fn degenerate_ssr_parameters_are_raised() {
    let mut options = GraphicsOptions::default();
    options.ssr_quality.max_steps = 0;
    options.ssr_quality.pixel_stride = 0.0;
    options.anisotropy = 0;
    let options = options.sanitized();
    assert_eq!(options.ssr_quality.max_steps, 1);
    assert_eq!(options.ssr_quality.pixel_stride, 1.0);
    assert_eq!(options.anisotropy, 1);
}

// ============================================================================
// Shader defines
// ============================================================================

#[test]
fn pbr_option_selects_pbr_define() {
    let options = GraphicsOptions {
        pbr: true,
        ..GraphicsOptions::default()
    };
    assert!(ShaderDefines::from_options(&options).pbr);
    assert!(!ShaderDefines::from_options(&GraphicsOptions::default()).pbr);
}
