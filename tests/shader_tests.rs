//! Shader Template Tests
//!
//! Tests for:
//! - Every template renders with its variants and both lighting models
//! - Rendered WGSL parses and validates with naga
//! - Entry points expected by the pipeline passes are present
//!
//! No GPU is needed: validation runs entirely on the CPU.

use odyssey::renderer::shaders::{SHADER_TEMPLATES, ShaderDefines, ShaderManager};

/// Template name, variant, pbr, whether a fragment stage is expected.
const VARIANTS: &[(&str, &str, bool, bool)] = &[
    ("shadow", "cascade", false, false),
    ("shadow", "cube", false, true),
    ("gbuffer", "", false, true),
    ("ssao", "", false, true),
    ("ssr", "", false, true),
    ("blur", "box", false, true),
    ("blur", "gaussian9_h", false, true),
    ("blur", "gaussian9_v", false, true),
    ("blur", "gaussian13_h", false, true),
    ("blur", "gaussian13_v", false, true),
    ("combine", "", false, true),
    ("combine", "", true, true),
    ("depth_blit", "", false, true),
    ("oit", "", false, true),
    ("oit", "", true, true),
    ("compose", "", false, true),
    ("post", "fxaa", false, true),
    ("post", "sharpen", false, true),
    ("post", "copy", false, true),
    ("flare", "", false, true),
    ("present", "", false, true),
];

fn validate(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    let mut validator =
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    validator.validate(&module).map_err(|e| e.emit_to_string(source))?;
    Ok(module)
}

fn has_entry_point(module: &naga::Module, name: &str, stage: naga::ShaderStage) -> bool {
    module.entry_points.iter().any(|ep| ep.name == name && ep.stage == stage)
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn every_template_variant_validates() {
    let shaders = ShaderManager::new().expect("Template environment should build");
    for &(template, variant, pbr, has_fragment) in VARIANTS {
        let defines = ShaderDefines {
            pbr,
            ..ShaderDefines::default()
        }
        .with_variant(variant);
        let source = shaders
            .render_source(template, &defines)
            .unwrap_or_else(|e| panic!("Template '{template}' ({variant}) failed to render: {e}"));
        let module = validate(&source)
            .unwrap_or_else(|e| panic!("Template '{template}' ({variant}, pbr: {pbr}) is invalid:\n{e}"));

        assert!(
            has_entry_point(&module, "vs_main", naga::ShaderStage::Vertex),
            "Template '{template}' ({variant}) should have a vertex entry point"
        );
        assert_eq!(
            has_entry_point(&module, "fs_main", naga::ShaderStage::Fragment),
            has_fragment,
            "Template '{template}' ({variant}) fragment entry point mismatch"
        );
    }
}

#[test]
fn variant_list_covers_every_template() {
    for template in SHADER_TEMPLATES {
        assert!(
            VARIANTS.iter().any(|(name, ..)| name == template),
            "Template '{template}' has no validation case"
        );
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn constants_are_substituted() {
    let shaders = ShaderManager::new().unwrap();
    let defines = ShaderDefines::default();
    let source = shaders.render_source("combine", &defines).unwrap();

    assert!(source.contains(&format!("array<GpuLight, {}>", defines.max_lights)));
    assert!(source.contains(&format!("array<mat4x4<f32>, {}>", defines.num_cascades)));
    assert!(!source.contains("{{"), "No template syntax should survive rendering");
    assert!(!source.contains("$$"), "No line statements should survive rendering");
}

#[test]
fn blur_variants_select_direction_and_kernel() {
    let shaders = ShaderManager::new().unwrap();
    let render = |variant| {
        shaders
            .render_source("blur", &ShaderDefines::default().with_variant(variant))
            .unwrap()
    };

    assert!(render("gaussian9_h").contains("vec2<i32>(1, 0)"));
    assert!(render("gaussian13_v").contains("vec2<i32>(0, 1)"));
    assert!(render("gaussian13_v").contains("array<f32, 7>"));
    assert!(render("gaussian9_v").contains("array<f32, 5>"));
    assert!(!render("box").contains("weights"));
}

#[test]
fn shadow_cascade_variant_is_depth_only() {
    let shaders = ShaderManager::new().unwrap();
    let cascade = shaders
        .render_source("shadow", &ShaderDefines::default().with_variant("cascade"))
        .unwrap();
    let cube = shaders
        .render_source("shadow", &ShaderDefines::default().with_variant("cube"))
        .unwrap();

    assert!(!cascade.contains("frag_depth"));
    assert!(cube.contains("frag_depth"));
}
