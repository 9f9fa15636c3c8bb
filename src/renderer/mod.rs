//! The frame pipeline.
//!
//! A deferred frame runs the geometry pass, an ambient pass, one lighting pass
//! per light (preceded by its shadow volumes), the system objects pass and the
//! final post-processing pass. A forward frame replaces the first three by a
//! single forward pass.

pub use self::config::{ClearFlags, RenderMode, RendererConfig};
pub use self::renderer::Renderer;

pub mod config;
pub mod draw_list;
pub mod final_pass;
pub mod forward_pass;
pub mod geometry_pass;
pub mod layouts;
pub mod lighting_pass;
pub mod pipeline;
pub mod shadow_pass;
pub mod sys_objects_pass;
pub mod uniforms;

mod renderer;
