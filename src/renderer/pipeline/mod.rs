//! Deferred Rendering Pipeline
//!
//! [`Pipeline`] turns a [`SceneGraph`] into a composed color texture of a
//! requested resolution. Each frame runs in two phases, as in a render graph:
//!
//! 1. **Prepare**: frame uniforms, per-draw uniforms and bind groups are
//!    built and uploaded ([`PrepareContext`]).
//! 2. **Execute**: every pass records into one command encoder, inside its
//!    own debug group ([`ExecuteContext`]), and the encoder is submitted once.
//!
//! Attachments are allocated lazily per exact resolution, so a GUI widget
//! and the world view never share a render target.

pub mod attachments;
pub mod builder;
pub mod context;
pub mod frame;
pub mod passes;
pub mod shadow_utils;

use glam::{Mat4, UVec4, Vec4};

use crate::errors::Result;
use crate::renderer::pass::DebugScope;
use crate::renderer::services::GraphicsServices;
use crate::renderer::settings::GraphicsOptions;
use crate::renderer::shaders::ShaderDefines;
use crate::resources::uniforms::ShadowViewUniforms;
use crate::resources::{FrameUniforms, MAX_LIGHTS, NUM_SHADOW_CASCADES};
use crate::scene::{CameraView, SceneGraph};

use self::attachments::{AttachmentCache, AttachmentKey, Attachments, RenderTexture, COLOR_FORMAT, SSAO_FORMAT};
use self::builder::Samplers;
use self::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext, ShadowMode};
use self::frame::{DrawLists, FrameResources, SHADOW_VIEW_COUNT};
use self::passes::{
    BlurPass, BlurStage, CombinePass, ComposePass, FlarePass, GBufferPass, PostPass, ShadowPass, SsaoPass,
    SsrPass, TransparentPass,
};

/// Depth bias compared against cascade depths in `[0, 1]`.
pub const DIRECTIONAL_SHADOW_BIAS: f32 = 0.0015;
/// Depth bias compared against distance over radius in the cube map.
pub const POINT_SHADOW_BIAS: f32 = 0.01;

// ============================================================================
// Frame uniforms
// ============================================================================

/// Everything the frame-global uniform blocks need, derived from the scene.
pub struct FrameSetup {
    pub uniforms: FrameUniforms,
    /// Cascades first, then cube faces.
    pub shadow_views: [ShadowViewUniforms; SHADOW_VIEW_COUNT],
    pub shadow: Option<ShadowMode>,
}

/// Builds the frame uniforms for drawing `scene` through `camera` at
/// `(width, height)`.
#[must_use]
pub fn build_frame_setup(
    scene: &SceneGraph,
    camera: &CameraView,
    (width, height): AttachmentKey,
    options: &GraphicsOptions,
) -> FrameSetup {
    let width_f = width.max(1) as f32;
    let height_f = height.max(1) as f32;

    let mut uniforms = FrameUniforms {
        projection: camera.projection,
        view: camera.view,
        inverse_view: camera.world,
        inverse_projection: camera.projection.inverse(),
        camera_position: camera.position.extend(1.0),
        screen: Vec4::new(width_f, height_f, 1.0 / width_f, 1.0 / height_f),
        time: Vec4::new(scene.time(), camera.camera.near, camera.camera.far, 0.0),
        ambient_color: scene.ambient_light_color().extend(1.0),
        fog_color: scene.fog_color().extend(1.0),
        fog_params: Vec4::new(scene.fog_near(), scene.fog_far(), 0.0, 0.0),
        ..FrameUniforms::default()
    };

    let shadow_node = scene.shadow_light_node();
    let lights = scene.active_lights();
    let count = lights.len().min(MAX_LIGHTS);
    for (slot, light) in uniforms.lights.iter_mut().zip(lights) {
        *slot = light.to_gpu();
        if Some(light.node) == shadow_node {
            slot.params.z = 1.0;
        }
    }

    let shadow = if scene.has_shadow_light() {
        Some(if scene.is_shadow_light_directional() {
            ShadowMode::Directional
        } else {
            ShadowMode::Point
        })
    } else {
        None
    };

    uniforms.counts = UVec4::new(
        count as u32,
        u32::from(shadow.is_some()),
        u32::from(shadow == Some(ShadowMode::Directional)),
        u32::from(scene.is_fog_enabled()),
    );

    let ssao = &options.ssao_settings;
    uniforms.ssao_params = Vec4::new(ssao.radius, ssao.bias, ssao.power, 0.0);
    let ssr = &options.ssr_quality;
    uniforms.ssr_params = Vec4::new(ssr.bias, ssr.pixel_stride, ssr.max_steps as f32, ssr.max_distance);

    let empty_view = ShadowViewUniforms {
        view_projection: Mat4::IDENTITY,
        light_position: Vec4::ZERO,
    };
    let mut shadow_views = [empty_view; SHADOW_VIEW_COUNT];
    let resolution = options.shadow_resolution;
    let light_position = scene.shadow_light_position();

    match shadow {
        Some(ShadowMode::Directional) => {
            let caster_extension = camera.camera.far * shadow_utils::CASCADE_DIVISORS[NUM_SHADOW_CASCADES - 1];
            let (matrices, far_planes) =
                shadow_utils::cascade_view_projections(camera, light_position, resolution, caster_extension);
            uniforms.cascade_view_projections = matrices;
            uniforms.cascade_far_planes = Vec4::from_array(far_planes);
            uniforms.shadow_light_position = light_position.extend(0.0);
            uniforms.shadow_params = Vec4::new(
                scene.shadow_strength(),
                0.0,
                DIRECTIONAL_SHADOW_BIAS,
                1.0 / resolution as f32,
            );
            for (view, matrix) in shadow_views.iter_mut().zip(matrices) {
                view.view_projection = matrix;
            }
        }
        Some(ShadowMode::Point) => {
            let radius = scene.shadow_radius().max(shadow_utils::CUBE_NEAR * 2.0);
            uniforms.shadow_light_position = light_position.extend(1.0);
            uniforms.shadow_params = Vec4::new(scene.shadow_strength(), radius, POINT_SHADOW_BIAS, 1.0 / resolution as f32);
            let faces = shadow_utils::cube_face_view_projections(light_position, radius);
            for (view, matrix) in shadow_views[NUM_SHADOW_CASCADES..].iter_mut().zip(faces) {
                view.view_projection = matrix;
                view.light_position = light_position.extend(radius);
            }
        }
        None => {}
    }

    FrameSetup {
        uniforms,
        shadow_views,
        shadow,
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline {
    frame: FrameResources,
    samplers: Samplers,
    passes: Vec<Box<dyn PipelinePass>>,
    attachments: AttachmentCache,
    shadow_resolution: u32,
}

impl Pipeline {
    /// Compiles every pass for the services' options.
    ///
    /// Shader or pipeline creation failures are fatal and returned.
    pub fn new(services: &mut GraphicsServices) -> Result<Self> {
        let device = &services.context.device;
        let frame = FrameResources::new(device);
        let samplers = Samplers::new(device);

        let mut setup = PassSetup {
            device,
            queue: &services.context.queue,
            shaders: &mut services.shaders,
            defines: ShaderDefines::from_options(&services.options),
            layouts: &frame.layouts,
            material_layout: services.textures.material_layout(),
        };

        let passes: Vec<Box<dyn PipelinePass>> = vec![
            Box::new(ShadowPass::new(&mut setup)?),
            Box::new(GBufferPass::new(&mut setup)?),
            Box::new(SsaoPass::new(&mut setup)?),
            Box::new(BlurPass::new(
                &mut setup,
                "SSAO Blur",
                |options| options.ssao,
                &[BlurStage {
                    variant: "box",
                    source: |a| &a.ssao,
                    target: |a| &a.ssao_blurred,
                    format: SSAO_FORMAT,
                }],
            )?),
            Box::new(SsrPass::new(&mut setup)?),
            Box::new(BlurPass::new(
                &mut setup,
                "SSR Blur",
                |options| options.ssr,
                &[
                    BlurStage {
                        variant: "gaussian9_h",
                        source: |a| &a.ssr,
                        target: |a| &a.ssr_ping,
                        format: COLOR_FORMAT,
                    },
                    BlurStage {
                        variant: "gaussian9_v",
                        source: |a| &a.ssr_ping,
                        target: |a| &a.ssr,
                        format: COLOR_FORMAT,
                    },
                ],
            )?),
            Box::new(CombinePass::new(&mut setup)?),
            Box::new(BlurPass::new(
                &mut setup,
                "Bloom",
                |_| true,
                &[
                    BlurStage {
                        variant: "gaussian13_h",
                        source: |a| &a.bright,
                        target: |a| &a.color_ping,
                        format: COLOR_FORMAT,
                    },
                    BlurStage {
                        variant: "gaussian13_v",
                        source: |a| &a.color_ping,
                        target: |a| &a.bright_blurred,
                        format: COLOR_FORMAT,
                    },
                ],
            )?),
            Box::new(BlurPass::new(
                &mut setup,
                "Backdrop Blur",
                |_| true,
                &[
                    BlurStage {
                        variant: "gaussian13_h",
                        source: |a| &a.opaque_color,
                        target: |a| &a.color_ping,
                        format: COLOR_FORMAT,
                    },
                    BlurStage {
                        variant: "gaussian13_v",
                        source: |a| &a.color_ping,
                        target: |a| &a.backdrop,
                        format: COLOR_FORMAT,
                    },
                ],
            )?),
            Box::new(TransparentPass::new(&mut setup)?),
            Box::new(ComposePass::new(&mut setup)?),
            Box::new(PostPass::new(&mut setup)?),
            Box::new(FlarePass::new(&mut setup)?),
        ];

        log::info!(
            "Pipeline ready: {} passes, {} shader modules",
            passes.len(),
            services.shaders.module_count()
        );

        Ok(Self {
            frame,
            samplers,
            passes,
            attachments: AttachmentCache::default(),
            shadow_resolution: services.options.shadow_resolution,
        })
    }

    /// Renders `scene` at `resolution` and returns the composed output.
    ///
    /// Returns `None` without recording anything when the scene has no
    /// active camera or the resolution is empty.
    pub fn draw(
        &mut self,
        services: &mut GraphicsServices,
        scene: &SceneGraph,
        resolution: AttachmentKey,
    ) -> Option<&RenderTexture> {
        let Some(camera) = scene.camera() else {
            log::debug!("Scene '{}' has no camera, nothing drawn", scene.name());
            return None;
        };
        let (width, height) = resolution;
        if width == 0 || height == 0 {
            log::warn!("Skipping draw at empty resolution {width}x{height}");
            return None;
        }

        let device = &services.context.device;
        let queue = &services.context.queue;
        let attachments = match self.attachments.get_or_create(device, resolution, self.shadow_resolution) {
            Ok(attachments) => attachments,
            Err(e) => {
                log::error!("Failed to create attachments: {e}");
                return None;
            }
        };

        let FrameSetup {
            uniforms,
            shadow_views,
            shadow,
        } = build_frame_setup(scene, &camera, resolution, &services.options);

        let lists = DrawLists {
            shadows: if shadow.is_some() { scene.draw_shadows() } else { Vec::new() },
            opaque: scene.draw_opaque(),
            transparent: scene.draw_transparent(),
        };
        let flares = scene.draw_lens_flares();

        self.frame.prepare(
            device,
            queue,
            &mut services.textures,
            &mut services.meshes,
            &uniforms,
            &shadow_views,
            &lists,
        );

        {
            let mut prepare = PrepareContext {
                device,
                queue,
                textures: &mut services.textures,
                attachments,
                frame: &self.frame,
                samplers: &self.samplers,
                options: &services.options,
                flares: &flares,
            };
            for pass in &mut self.passes {
                pass.prepare(&mut prepare);
            }
        }

        let execute = ExecuteContext {
            attachments,
            frame: &self.frame,
            textures: &services.textures,
            meshes: &services.meshes,
            options: &services.options,
            shadow,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pipeline Encoder"),
        });
        for pass in &self.passes {
            let mut scope = DebugScope::new(&mut encoder, pass.name());
            pass.run(&execute, &mut scope);
        }
        queue.submit(Some(encoder.finish()));

        Some(&attachments.output)
    }

    /// Attachment set of a resolution drawn before.
    #[must_use]
    pub fn attachments(&self, resolution: AttachmentKey) -> Option<&Attachments> {
        self.attachments.get(resolution)
    }

    /// Blurred opaque color of the last frame drawn at `resolution`, used as
    /// the backdrop of translucent GUI panels.
    #[must_use]
    pub fn backdrop(&self, resolution: AttachmentKey) -> Option<&RenderTexture> {
        self.attachments.get(resolution).map(|a| &a.backdrop)
    }

    #[must_use]
    pub fn attachment_set_count(&self) -> usize {
        self.attachments.len()
    }

    /// Frees every attachment set; the next draw allocates afresh.
    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::resources::LightDesc;
    use crate::scene::CameraNode;

    fn scene_with_light(desc: LightDesc, transform: Mat4) -> SceneGraph {
        let mut scene = SceneGraph::new("test");
        let camera = scene.add_camera(
            CameraNode::new_perspective(55.0, 1.0, 0.1, 100.0),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            None,
        );
        scene.set_active_camera(Some(camera));
        scene.add_light(desc, transform, None);
        scene.update(0.5);
        scene
    }

    #[test]
    fn directional_shadow_fills_cascades() {
        let scene = scene_with_light(
            LightDesc {
                directional: true,
                casts_shadows: true,
                ..LightDesc::default()
            },
            Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)),
        );
        let camera = scene.camera().unwrap();
        let setup = build_frame_setup(&scene, &camera, (64, 32), &GraphicsOptions::default());

        assert_eq!(setup.shadow, Some(ShadowMode::Directional));
        assert_eq!(setup.uniforms.counts, UVec4::new(1, 1, 1, 0));
        assert_eq!(setup.uniforms.lights[0].params.z, 1.0);
        assert_eq!(setup.uniforms.screen, Vec4::new(64.0, 32.0, 1.0 / 64.0, 1.0 / 32.0));
        assert_eq!(setup.uniforms.shadow_light_position.w, 0.0);
        for view in &setup.shadow_views[..NUM_SHADOW_CASCADES] {
            assert_ne!(view.view_projection, Mat4::IDENTITY);
            assert_eq!(view.light_position.w, 0.0);
        }
        assert!(setup.uniforms.cascade_far_planes.x < setup.uniforms.cascade_far_planes.w);
    }

    #[test]
    fn point_shadow_fills_cube_faces() {
        let scene = scene_with_light(
            LightDesc {
                casts_shadows: true,
                radius: 8.0,
                ..LightDesc::default()
            },
            Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0)),
        );
        let camera = scene.camera().unwrap();
        let setup = build_frame_setup(&scene, &camera, (16, 16), &GraphicsOptions::default());

        assert_eq!(setup.shadow, Some(ShadowMode::Point));
        assert_eq!(setup.uniforms.counts.z, 0);
        assert_eq!(setup.uniforms.shadow_params.y, 8.0);
        for view in &setup.shadow_views[NUM_SHADOW_CASCADES..] {
            assert_eq!(view.light_position, Vec4::new(1.0, 2.0, 0.0, 8.0));
        }
    }

    #[test]
    fn lights_without_shadows_leave_shadow_views_empty() {
        let scene = scene_with_light(LightDesc::default(), Mat4::IDENTITY);
        let camera = scene.camera().unwrap();
        let setup = build_frame_setup(&scene, &camera, (16, 16), &GraphicsOptions::default());

        assert_eq!(setup.shadow, None);
        assert_eq!(setup.uniforms.counts.x, 1);
        assert_eq!(setup.uniforms.lights[0].params.z, 0.0);
        assert!(setup.shadow_views.iter().all(|v| v.view_projection == Mat4::IDENTITY));
    }
}
