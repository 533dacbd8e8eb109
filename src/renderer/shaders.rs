//! Shader Template Manager
//!
//! WGSL sources live in `src/renderer/shaders/` as minijinja templates and
//! are embedded into the binary with `rust-embed`. A template is rendered
//! with a [`ShaderDefines`] context, the resulting WGSL is hashed with
//! xxh3-128, and the compiled `ShaderModule` is cached under that hash.
//!
//! Template syntax:
//!
//! | Construct   | Delimiters        |
//! |-------------|-------------------|
//! | Block       | `{$ ... $}`       |
//! | Variable    | `{{ ... }}`       |
//! | Line        | `$$ ...`          |
//!
//! `{$ include 'common' $}` resolves to `chunks/common.wgsl`.

use std::borrow::Cow;
use std::sync::Arc;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::{OdysseyError, Result};
use crate::renderer::settings::GraphicsOptions;
use crate::resources::{MAX_BONES, MAX_LIGHTS, MAX_PARTICLES_PER_DRAW, NUM_SHADOW_CASCADES, NUM_SSAO_SAMPLES};

#[derive(RustEmbed)]
#[folder = "src/renderer/shaders"]
struct ShaderAssets;

/// Every top-level template shipped with the crate.
pub const SHADER_TEMPLATES: &[&str] = &[
    "shadow",
    "gbuffer",
    "ssao",
    "ssr",
    "blur",
    "combine",
    "depth_blit",
    "oit",
    "compose",
    "post",
    "flare",
    "present",
];

/// Compile-time constants and switches substituted into every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShaderDefines {
    pub pbr: bool,
    pub max_lights: usize,
    pub num_cascades: usize,
    pub num_ssao_samples: usize,
    pub max_bones: usize,
    pub max_particles: usize,
    /// Template-specific flavour, e.g. the blur kernel or the post filter.
    pub variant: &'static str,
}

impl Default for ShaderDefines {
    fn default() -> Self {
        Self {
            pbr: false,
            max_lights: MAX_LIGHTS,
            num_cascades: NUM_SHADOW_CASCADES,
            num_ssao_samples: NUM_SSAO_SAMPLES,
            max_bones: MAX_BONES,
            max_particles: MAX_PARTICLES_PER_DRAW,
            variant: "",
        }
    }
}

impl ShaderDefines {
    #[must_use]
    pub fn from_options(options: &GraphicsOptions) -> Self {
        Self {
            pbr: options.pbr,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_variant(self, variant: &'static str) -> Self {
        Self { variant, ..self }
    }
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("src/renderer/shaders")
            .join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(ErrorKind::TemplateNotFound, format!("Failed to read file: {e}"))
            });
        }
    }

    if let Some(file) = ShaderAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

/// Template environment plus the module cache.
///
/// Owned by [`GraphicsServices`](crate::renderer::GraphicsServices); only
/// the render thread touches it, between frames or during pass preparation.
pub struct ShaderManager {
    env: Environment<'static>,
    /// xxh3-128 of final WGSL → compiled module.
    module_cache: FxHashMap<u128, Arc<wgpu::ShaderModule>>,
}

impl ShaderManager {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()?;

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(shader_loader);
        env.set_path_join_callback(|name, _parent| format!("chunks/{name}").into());

        Ok(Self {
            env,
            module_cache: FxHashMap::default(),
        })
    }

    /// Renders a template to WGSL without compiling it.
    pub fn render_source(&self, template_name: &str, defines: &ShaderDefines) -> Result<String> {
        let template = self.env.get_template(template_name)?;
        let source = template.render(defines)?;
        Ok(source)
    }

    /// Renders and compiles a template, or returns the cached module.
    ///
    /// Compilation runs inside a validation error scope, so an invalid
    /// shader surfaces as [`OdysseyError::ShaderCompilation`] instead of an
    /// uncaptured device error.
    pub fn get_or_compile(
        &mut self,
        device: &wgpu::Device,
        template_name: &str,
        defines: &ShaderDefines,
    ) -> Result<Arc<wgpu::ShaderModule>> {
        let source = self.render_source(template_name, defines)?;
        let hash = xxh3_128(source.as_bytes());

        if let Some(module) = self.module_cache.get(&hash) {
            return Ok(Arc::clone(module));
        }

        log::debug!("Compiling shader '{template_name}' ({:?})", defines.variant);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("Shader Module {template_name}")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Shader '{template_name}' failed to compile: {error}");
            return Err(OdysseyError::ShaderCompilation {
                name: template_name.to_string(),
                message: error.to_string(),
            });
        }

        let module = Arc::new(module);
        self.module_cache.insert(hash, Arc::clone(&module));
        Ok(module)
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.module_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_resolve_to_chunks() {
        let shaders = ShaderManager::new().unwrap();
        let source = shaders.render_source("gbuffer", &ShaderDefines::default()).unwrap();
        assert!(source.contains("struct FrameUniforms"));
        assert!(source.contains("struct GeneralUniforms"));
    }

    #[test]
    fn pbr_define_switches_lighting_model() {
        let shaders = ShaderManager::new().unwrap();
        let phong = shaders.render_source("combine", &ShaderDefines::default()).unwrap();
        let pbr = shaders
            .render_source("combine", &ShaderDefines { pbr: true, ..ShaderDefines::default() })
            .unwrap();
        assert!(phong.contains("fn blinn_phong"));
        assert!(!phong.contains("fn ggx_distribution"));
        assert!(pbr.contains("fn ggx_distribution"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let shaders = ShaderManager::new().unwrap();
        assert!(shaders.render_source("does_not_exist", &ShaderDefines::default()).is_err());
    }
}
