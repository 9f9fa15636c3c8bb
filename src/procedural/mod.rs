//! Built-in geometry: planes, cubes and the skybox cube.
//!
//! Every generator returns a vertex array and an index array (empty for
//! non-indexed geometry) ready for [`GeometryBuffer::new`](crate::resource::GeometryBuffer::new).
//! Vertices are white with zero normals; let the geometry buffer compute them.
//! Front faces are clockwise.

pub use self::cube::{cube, cube_fully_indexed};
pub use self::plane::plane;
pub use self::skybox::skybox_cube;

mod cube;
mod plane;
mod skybox;

use glamx::{Vec2, Vec3};

use crate::resource::Vertex;

/// Vertices and indices of a generated shape.
pub type ShapeData = (Vec<Vertex>, Vec<u32>);

fn white(x: f32, y: f32, z: f32, u: f32, v: f32) -> Vertex {
    Vertex::new(Vec3::new(x, y, z), Vec3::ONE, Vec2::new(u, v))
}

/// Two triangles per quad of 4 consecutive vertices.
fn quad_indices(quads: u32) -> Vec<u32> {
    (0..quads)
        .flat_map(|q| {
            let b = q * 4;
            [b, b + 1, b + 2, b, b + 2, b + 3]
        })
        .collect()
}
