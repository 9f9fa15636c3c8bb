//! Scene content: static meshes, their parts and materials, and the registries
//! the renderer draws from.

use std::sync::Arc;

pub use self::material::{Material, MaterialPreset, TextureMappingStd140, TextureSlot};
pub use self::mesh_part::{default_texture, MeshPart, TextureKind};
pub use self::registry::{Handle, Registry};
pub use self::static_mesh::{euler_zyx, model_matrix, StaticMesh};

use crate::light::Light;
use crate::resource::CubeTexture;

mod material;
mod mesh_part;
mod registry;
mod static_mesh;

/// Handle to a registered static mesh.
pub type MeshHandle = Handle<StaticMesh>;
/// Handle to a registered light.
pub type LightHandle = Handle<Light>;

/// Everything drawn by the renderer.
#[derive(Default)]
pub struct Scene {
    /// Static meshes, drawn in order.
    pub meshes: Registry<StaticMesh>,
    /// Lights, accumulated in order.
    pub lights: Registry<Light>,
    /// Optional environment cube map.
    pub skybox: Option<Arc<CubeTexture>>,
}
