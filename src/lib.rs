//! Deferred rendering core for Aurora/Odyssey engine content.
//!
//! - [`resources`]: decoded meshes, textures, models, animations and the
//!   GPU uniform layouts
//! - [`scene`]: arena scene graph producing ordered draw lists
//! - [`renderer`]: wgpu services, the deferred pipeline and the presenter
//!
//! ```rust,ignore
//! use odyssey::{GraphicsOptions, GraphicsServices, Pipeline, SceneGraph};
//!
//! let mut services = GraphicsServices::new_headless(GraphicsOptions::default())?;
//! let mut pipeline = Pipeline::new(&mut services)?;
//! let mut scene = SceneGraph::new("main");
//! // ... populate the scene ...
//! scene.update(1.0 / 60.0);
//! let output = pipeline.draw(&mut services, &scene, (1280, 720));
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{OdysseyError, Result};
pub use renderer::{GraphicsContext, GraphicsOptions, GraphicsServices, Pipeline, Presenter, RenderTexture, Viewport};
pub use resources::{Mesh, Model, Texture};
pub use scene::{CameraNode, NodeId, SceneGraph, SceneGraphs, SceneNode, SceneNodeKind};
