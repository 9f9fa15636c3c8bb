//! GPU resources: geometry, textures, shader programs and render targets.

pub use crate::resource::dynamic_buffer::DynamicUniformBuffer;
pub use crate::resource::geometry::{Adjacency, GeometryBuffer, GeometryOptions, Vertex};
pub use crate::resource::render_targets::{
    Attachment, FrameBuffer, GBuffer, OffscreenBuffers, OutputFrame, RenderOutput, RenderTargets,
};
pub use crate::resource::shader_program::{ShaderProgram, ShaderSources, UniformSlot};
pub use crate::resource::shadow_volume::{LightRay, ShadowVolumeBuilder};
pub use crate::resource::texture::{
    CubeFace, CubeTexture, DefaultTextures, SamplerCache, Texture, TextureOptions,
    TextureWrapping,
};

pub mod dynamic_buffer;
pub mod geometry;
pub mod render_targets;
pub mod shader_program;
pub mod shadow_volume;
pub mod texture;
