/*!
# deferred3d

A small deferred renderer with stencil shadow volumes, built on wgpu.

A frame is drawn in a few well-defined passes:

* a **geometry pass** writing world position, normal and albedo/specular of
  every visible mesh part into a G-buffer;
* one **lighting pass** per light, additively accumulated into a floating point
  frame buffer, where pixels inside the light's **shadow volumes** (extruded
  from the silhouette of shadow casters and counted in the stencil buffer) are
  left unlit;
* a **system objects pass** drawing the skybox and the light gizmos;
* a **final pass** post-processing the frame into a window surface or an
  offscreen texture.

A forward mode, lighting each fragment with up to 32 lights of each type in a
single pass, is available too.

```no_run
use deferred3d::prelude::*;

# fn main() -> deferred3d::error::Result<()> {
let ctxt = Context::headless(&ContextConfig::default())?;
let config = RendererConfig::default();
let shaders = RendererShaders::builtin(&ctxt, &config)?;
let output = RenderOutput::offscreen(&ctxt, 640, 480);
let mut renderer = Renderer::new(&ctxt, output, 640, 480, config, shaders)?;

let (vertices, indices) = procedural::cube_fully_indexed(1.0);
let options = GeometryOptions::lit().with_adjacency(true);
let cube = GeometryBuffer::new(&ctxt, vertices, indices, options)?;
renderer.add_static_mesh(StaticMesh::new("cube", MeshPart::new(cube)));

renderer.add_light(Light::spot(Vec3::new(0.0, 2.0, 2.0), Vec3::new(-30.0, 0.0, 0.0)).with_shadows(true));

let mut camera = Camera::new(640.0 / 480.0);
camera.position = Vec3::new(0.0, 0.0, 3.0);
renderer.set_camera(&camera);

renderer.draw_frame(color::BLACK, ClearFlags::all());
let rgba = renderer.read_pixels()?;
# let _ = rgba;
# Ok(())
# }
```

Everything GPU-related goes through an explicit [`Context`](context::Context);
there is no global state. Errors raised while creating resources are reported
as [`RendererError`](error::RendererError); drawing a frame never fails, frames
that cannot be presented are skipped and logged.
*/
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]
#![warn(missing_docs)]

pub use glamx;

pub mod builtin;
pub mod camera;
pub mod color;
pub mod context;
pub mod error;
pub mod light;
pub mod procedural;
pub mod renderer;
pub mod resource;
pub mod scene;

/// The most commonly used types.
pub mod prelude {
    pub use crate::builtin::RendererShaders;
    pub use crate::camera::{Camera, ControllableCamera, Handedness};
    pub use crate::color::{self, Color};
    pub use crate::context::{Context, ContextConfig};
    pub use crate::error::{RendererError, Result};
    pub use crate::light::{Light, LightType};
    pub use crate::procedural;
    pub use crate::renderer::{ClearFlags, RenderMode, Renderer, RendererConfig};
    pub use crate::resource::{
        CubeFace, CubeTexture, GeometryBuffer, GeometryOptions, RenderOutput, ShaderProgram,
        Texture, TextureOptions, TextureWrapping, Vertex,
    };
    pub use crate::scene::{
        LightHandle, Material, MaterialPreset, MeshHandle, MeshPart, StaticMesh, TextureKind,
        TextureSlot,
    };
    pub use glamx::{Mat4, Vec2, Vec3, Vec4};
}
