//! GPU-side uniform layouts.
//!
//! Every struct here is `#[repr(C)]` + `Pod` and mirrors a WGSL struct in
//! `renderer/shaders/common.wgsl`. Only `vec4`/`mat4` sized members are used
//! so the Rust and WGSL layouts agree without manual padding.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec4, Vec3, Vec4};

/// Upper bound on lights shaded per frame.
pub const MAX_LIGHTS: usize = 16;
/// Number of directional shadow cascades.
pub const NUM_SHADOW_CASCADES: usize = 4;
/// Hemisphere samples taken by the SSAO pass.
pub const NUM_SSAO_SAMPLES: usize = 16;
/// Bone slots available to a single skinned draw (slot 0 excluded).
pub const MAX_BONES: usize = 128;
/// Particles drawn by one instanced billboard draw.
pub const MAX_PARTICLES_PER_DRAW: usize = 64;
/// Byte stride between dynamic-offset uniform entries.
pub const UNIFORM_STRIDE: u64 = 256;

bitflags! {
    /// Per-draw feature switches read by the geometry shaders.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DrawFeatures: u32 {
        const DIFFUSE         = 1 << 0;
        const LIGHTMAP        = 1 << 1;
        const ENVMAP          = 1 << 2;
        const BUMPMAP         = 1 << 3;
        const GRAYSCALE_BUMP  = 1 << 4;
        const SKINNED         = 1 << 5;
        const DANGLYMESH      = 1 << 6;
        const PARTICLES       = 1 << 7;
        const FOG             = 1 << 8;
        const ADDITIVE        = 1 << 9;
    }
}

// ============================================================================
// Per-draw
// ============================================================================

/// General transform and material state of one draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GeneralUniforms {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    /// Diffuse color in rgb, alpha in w.
    pub color: Vec4,
    pub self_illum: Vec4,
    /// UV scroll offset in xy.
    pub uv_offset: Vec4,
    /// Bumpmap frame rect: offset in xy, scale in zw.
    pub bumpmap_rect: Vec4,
    /// Danglymesh stride in object space.
    pub dangly_stride: Vec4,
    /// x: `DrawFeatures` bits, y: first bone slot, z: first particle, w: particle count.
    pub params: UVec4,
}

impl Default for GeneralUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            color: Vec4::ONE,
            self_illum: Vec4::ZERO,
            uv_offset: Vec4::ZERO,
            bumpmap_rect: Vec4::new(0.0, 0.0, 1.0, 1.0),
            dangly_stride: Vec4::ZERO,
            params: UVec4::ZERO,
        }
    }
}

impl GeneralUniforms {
    #[must_use]
    pub fn from_transform(model: Mat4) -> Self {
        Self {
            model,
            normal_matrix: model.inverse().transpose(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn features(&self) -> DrawFeatures {
        DrawFeatures::from_bits_truncate(self.params.x)
    }

    #[inline]
    pub fn set_features(&mut self, features: DrawFeatures) {
        self.params.x = features.bits();
    }
}

/// One billboard instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// World position in xyz.
    pub position: Vec4,
    /// Billboard size in xy.
    pub size: Vec4,
    pub color: Vec4,
    /// Texture grid frame rect.
    pub uv_rect: Vec4,
}

/// CPU-side aggregate built right before a draw is recorded.
///
/// The optional sub-blocks are appended to frame-wide storage buffers by the
/// pipeline, which then patches the offsets into `general.params`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderUniforms {
    pub general: GeneralUniforms,
    /// Bone matrices (absolute bone transform times inverse bind pose).
    pub skeletal: Option<Vec<Mat4>>,
    pub particles: Option<Vec<ParticleInstance>>,
}

impl ShaderUniforms {
    #[must_use]
    pub fn new(general: GeneralUniforms) -> Self {
        Self {
            general,
            skeletal: None,
            particles: None,
        }
    }

    pub fn set_danglymesh_stride(&mut self, stride: Vec3) {
        self.general.dangly_stride = stride.extend(0.0);
        let features = self.general.features() | DrawFeatures::DANGLYMESH;
        self.general.set_features(features);
    }

    pub fn set_skeletal(&mut self, bones: Vec<Mat4>) {
        let features = self.general.features() | DrawFeatures::SKINNED;
        self.general.set_features(features);
        self.skeletal = Some(bones);
    }

    pub fn set_particles(&mut self, particles: Vec<ParticleInstance>) {
        let features = self.general.features() | DrawFeatures::PARTICLES;
        self.general.set_features(features);
        self.particles = Some(particles);
    }
}

// ============================================================================
// Per-frame
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz position (w = 1) or direction towards the light (w = 0).
    pub position: Vec4,
    /// rgb color times multiplier; w = 1 for ambient-only lights.
    pub color: Vec4,
    /// x: radius.
    pub params: Vec4,
}

/// Frame-global state shared by every pass of a frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub camera_position: Vec4,
    /// width, height, 1 / width, 1 / height of the full-resolution target.
    pub screen: Vec4,
    /// x: time, y: camera near, z: camera far.
    pub time: Vec4,
    pub ambient_color: Vec4,
    pub fog_color: Vec4,
    /// x: near, y: far.
    pub fog_params: Vec4,
    /// xyz position or direction; w = 0 for directional.
    pub shadow_light_position: Vec4,
    /// x: strength, y: radius, z: depth bias, w: 1 / shadow map resolution.
    pub shadow_params: Vec4,
    pub cascade_far_planes: Vec4,
    pub cascade_view_projections: [Mat4; NUM_SHADOW_CASCADES],
    /// x: radius, y: bias, z: power.
    pub ssao_params: Vec4,
    /// x: bias, y: pixel stride, z: max steps, w: max distance.
    pub ssr_params: Vec4,
    /// x: light count, y: has shadow light, z: shadow light directional, w: fog enabled.
    pub counts: UVec4,
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            inverse_projection: Mat4::IDENTITY,
            camera_position: Vec4::W,
            screen: Vec4::ONE,
            time: Vec4::ZERO,
            ambient_color: Vec4::ZERO,
            fog_color: Vec4::ZERO,
            fog_params: Vec4::ZERO,
            shadow_light_position: Vec4::ZERO,
            shadow_params: Vec4::ZERO,
            cascade_far_planes: Vec4::ZERO,
            cascade_view_projections: [Mat4::IDENTITY; NUM_SHADOW_CASCADES],
            ssao_params: Vec4::ZERO,
            ssr_params: Vec4::ZERO,
            counts: UVec4::ZERO,
            lights: [GpuLight::default(); MAX_LIGHTS],
        }
    }
}

/// View of one shadow render (cascade or cube face).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ShadowViewUniforms {
    pub view_projection: Mat4,
    /// xyz light position; w = distance normalisation (0 for orthographic views).
    pub light_position: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SsaoKernelUniforms {
    pub samples: [Vec4; NUM_SSAO_SAMPLES],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_draw_blocks_fit_dynamic_stride() {
        assert!(std::mem::size_of::<GeneralUniforms>() as u64 <= UNIFORM_STRIDE);
        assert!(std::mem::size_of::<ShadowViewUniforms>() as u64 <= UNIFORM_STRIDE);
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 64);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn sub_blocks_set_feature_bits() {
        let mut u = ShaderUniforms::new(GeneralUniforms::default());
        u.set_danglymesh_stride(Vec3::new(0.1, 0.0, 0.0));
        u.set_skeletal(vec![Mat4::IDENTITY]);
        let f = u.general.features();
        assert!(f.contains(DrawFeatures::DANGLYMESH | DrawFeatures::SKINNED));
        assert!(!f.contains(DrawFeatures::PARTICLES));
        assert_eq!(u.general.dangly_stride.x, 0.1);
    }
}
