//! Renderer module
//!
//! GPU side of the crate:
//! - [`GraphicsServices`]: context, textures, meshes, shaders and options
//! - [`Pipeline`]: the deferred frame (shadows, G-buffer, screen-space
//!   effects, combine, transparency, post-processing, lens flares)
//! - [`Presenter`]: blits a pipeline output into an arbitrary target
//!
//! Scenes are described by [`crate::scene::SceneGraph`]; the renderer only
//! reads its draw lists and light state.

pub mod context;
pub mod meshes;
pub mod pass;
pub mod pipeline;
pub mod present;
pub mod services;
pub mod settings;
pub mod shaders;
pub mod textures;

pub use context::GraphicsContext;
pub use meshes::{GpuMesh, Meshes};
pub use pass::{DebugScope, TrackedRenderPass};
pub use pipeline::attachments::{AttachmentKey, Attachments, RenderTexture};
pub use pipeline::context::ShadowMode;
pub use pipeline::Pipeline;
pub use present::{Presenter, Viewport};
pub use services::GraphicsServices;
pub use settings::GraphicsOptions;
pub use shaders::{ShaderDefines, ShaderManager};
pub use textures::{GpuTexture, Textures};
