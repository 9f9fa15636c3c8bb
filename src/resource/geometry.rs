//! Static vertex/index storage for meshes.
//!
//! A [`GeometryBuffer`] is immutable once created. It may keep a CPU copy of its
//! data and, for shadow casters, the triangle-with-adjacency expansion used to
//! extrude shadow volumes.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glamx::{Vec2, Vec3};

use crate::context::Context;
use crate::error::{RendererError, Result};

/// A mesh vertex, laid out exactly as the vertex shaders read it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space.
    pub position: Vec3,
    /// Vertex color.
    pub color: Vec3,
    /// Texture coordinates.
    pub uv: Vec2,
    /// Normal.
    pub normal: Vec3,
    /// Tangent, aligned with increasing U.
    pub tangent: Vec3,
    /// Non-zero for synthetic vertices inserted by adjacency construction.
    pub phantom: u32,
}

impl Vertex {
    /// A regular vertex with zero normal and tangent.
    pub fn new(position: Vec3, color: Vec3, uv: Vec2) -> Self {
        Vertex {
            position,
            color,
            uv,
            ..Default::default()
        }
    }

    /// The zeroed, flagged vertex standing in for a missing adjacent triangle.
    pub fn phantom() -> Self {
        Vertex {
            phantom: 1,
            ..Default::default()
        }
    }

    /// Is this a synthetic adjacency vertex?
    #[inline]
    pub fn is_phantom(&self) -> bool {
        self.phantom != 0
    }

    /// Vertex buffer layout matching the attribute locations of the builtin shaders.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    };
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x3, // color
    2 => Float32x2, // uv
    3 => Float32x3, // normal
    4 => Float32x3, // tangent
    5 => Uint32,    // phantom
];

/// Construction flags of a [`GeometryBuffer`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GeometryOptions {
    /// Keep a CPU copy of the vertices and indices.
    pub store_data: bool,
    /// Recompute normals.
    pub calc_normals: bool,
    /// Recompute tangents.
    pub calc_tangents: bool,
    /// Counter-clockwise triangles are front facing.
    pub ccw: bool,
    /// Build the triangle-with-adjacency expansion (needed to cast shadows).
    pub build_adjacency: bool,
}

impl GeometryOptions {
    /// Recompute normals and tangents, nothing else.
    pub fn lit() -> Self {
        GeometryOptions {
            calc_normals: true,
            calc_tangents: true,
            ..Default::default()
        }
    }

    /// Sets whether a CPU copy is kept.
    pub fn with_store_data(mut self, store_data: bool) -> Self {
        self.store_data = store_data;
        self
    }

    /// Sets whether the adjacency expansion is built.
    pub fn with_adjacency(mut self, build_adjacency: bool) -> Self {
        self.build_adjacency = build_adjacency;
        self
    }

    /// Sets the front-face winding used for normals.
    pub fn with_ccw(mut self, ccw: bool) -> Self {
        self.ccw = ccw;
        self
    }
}

/// Triangles expanded to 6 indices each: `v0, adj01, v1, adj12, v2, adj20`.
///
/// `vertices` is the source vertex array followed by the phantom vertices that
/// close boundary edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Adjacency {
    /// Source vertices plus appended phantoms.
    pub vertices: Vec<Vertex>,
    /// Six indices per triangle.
    pub indices: Vec<u32>,
    /// Whether counter-clockwise triangles face the front, as in [`GeometryOptions::ccw`].
    pub ccw: bool,
}

impl Adjacency {
    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Number of phantom vertices that were appended.
    pub fn phantom_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_phantom()).count()
    }
}

/// GPU-resident vertex (and optional index) storage.
pub struct GeometryBuffer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
    vertices: Option<Vec<Vertex>>,
    indices: Option<Vec<u32>>,
    adjacency: Option<Adjacency>,
}

impl GeometryBuffer {
    /// Uploads `vertices` (and `indices`, if non-empty) to the GPU.
    ///
    /// Normals and tangents are recomputed according to `options` before upload.
    pub fn new(
        ctxt: &Context,
        mut vertices: Vec<Vertex>,
        indices: Vec<u32>,
        options: GeometryOptions,
    ) -> Result<Arc<GeometryBuffer>> {
        validate(&vertices, &indices)?;

        if options.calc_normals {
            calc_normals(&mut vertices, &indices, options.ccw);
        }

        if options.calc_tangents {
            calc_tangents(&mut vertices, &indices);
        }

        let adjacency = if options.build_adjacency {
            let mut adjacency_vertices = vertices.clone();
            let adjacency_indices = if indices.is_empty() {
                let sequential: Vec<u32> = (0..vertices.len() as u32).collect();
                build_adjacency(&mut adjacency_vertices, &sequential)
            } else {
                build_adjacency(&mut adjacency_vertices, &indices)
            };

            let adjacency = Adjacency {
                vertices: adjacency_vertices,
                indices: adjacency_indices,
                ccw: options.ccw,
            };
            log::debug!(
                "built adjacency: {} triangles, {} phantom vertices",
                adjacency.triangle_count(),
                adjacency.phantom_count()
            );
            Some(adjacency)
        } else {
            None
        };

        let vertex_buffer = ctxt.create_buffer_init(
            Some("geometry_vertex_buffer"),
            bytemuck::cast_slice(&vertices),
            wgpu::BufferUsages::VERTEX,
        );

        let index_buffer = if indices.is_empty() {
            None
        } else {
            Some(ctxt.create_buffer_init(
                Some("geometry_index_buffer"),
                bytemuck::cast_slice(&indices),
                wgpu::BufferUsages::INDEX,
            ))
        };

        let vertex_count = vertices.len() as u32;
        let index_count = indices.len() as u32;

        Ok(Arc::new(GeometryBuffer {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
            vertices: options.store_data.then_some(vertices),
            indices: options.store_data.then_some(indices),
            adjacency,
        }))
    }

    /// Number of vertices uploaded to the GPU.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices (zero for non-indexed geometry).
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Whether this geometry is drawn with an index buffer.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// The CPU copy of the vertices, if it was kept.
    pub fn vertices(&self) -> Option<&[Vertex]> {
        self.vertices.as_deref()
    }

    /// The CPU copy of the indices, if it was kept.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// The adjacency expansion, if it was built.
    pub fn adjacency(&self) -> Option<&Adjacency> {
        self.adjacency.as_ref()
    }

    /// Whether this geometry can cast shadow volumes.
    #[inline]
    pub fn has_adjacency(&self) -> bool {
        self.adjacency.is_some()
    }

    /// Binds the buffers to vertex slot 0 and issues the draw call.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        match &self.index_buffer {
            Some(index_buffer) => {
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..self.index_count, 0, 0..1);
            }
            None => render_pass.draw(0..self.vertex_count, 0..1),
        }
    }
}

impl std::fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("has_adjacency", &self.has_adjacency())
            .finish()
    }
}

fn validate(vertices: &[Vertex], indices: &[u32]) -> Result<()> {
    if indices.is_empty() {
        if vertices.len() % 3 != 0 {
            return Err(RendererError::InvalidGeometry(format!(
                "non-indexed geometry needs a multiple of 3 vertices, got {}",
                vertices.len()
            )));
        }
    } else {
        if indices.len() % 3 != 0 {
            return Err(RendererError::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }

        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RendererError::InvalidGeometry(format!(
                "index {} out of range ({} vertices)",
                bad,
                vertices.len()
            )));
        }
    }

    Ok(())
}

/// The normal of the triangle `(p0, p1, p2)`.
///
/// Clockwise triangles are front facing unless `ccw` is set.
pub fn face_normal(p0: Vec3, p1: Vec3, p2: Vec3, ccw: bool) -> Vec3 {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;

    if ccw {
        edge1.cross(edge2).normalize()
    } else {
        edge2.cross(edge1).normalize()
    }
}

/// The tangent of a triangle: the model-space direction of increasing U.
///
/// Degenerate texture coordinates yield NaN components.
pub fn uv_tangent(positions: [Vec3; 3], uvs: [Vec2; 3]) -> Vec3 {
    let edge1 = positions[1] - positions[0];
    let edge2 = positions[2] - positions[0];
    let delta_uv1 = uvs[1] - uvs[0];
    let delta_uv2 = uvs[2] - uvs[0];

    let f = 1.0 / (delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y);

    (f * (delta_uv2.y * edge1 - delta_uv1.y * edge2)).normalize()
}

fn triangles(vertex_count: usize, indices: &[u32]) -> Vec<[usize; 3]> {
    if indices.is_empty() {
        (0..vertex_count / 3)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect()
    } else {
        indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect()
    }
}

/// Recomputes vertex normals.
///
/// With indices, each vertex gets the normalized sum of the normals of every
/// triangle referencing it (smooth shading). Without indices, each group of
/// three vertices gets its own face normal (flat shading).
pub fn calc_normals(vertices: &mut [Vertex], indices: &[u32], ccw: bool) {
    let tris = triangles(vertices.len(), indices);

    if indices.is_empty() {
        for [a, b, c] in tris {
            let n = face_normal(vertices[a].position, vertices[b].position, vertices[c].position, ccw);
            vertices[a].normal = n;
            vertices[b].normal = n;
            vertices[c].normal = n;
        }
        return;
    }

    let mut sums = vec![Vec3::ZERO; vertices.len()];
    let mut referenced = vec![false; vertices.len()];

    for [a, b, c] in tris {
        let n = face_normal(vertices[a].position, vertices[b].position, vertices[c].position, ccw);
        for i in [a, b, c] {
            sums[i] += n;
            referenced[i] = true;
        }
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        if referenced[i] {
            vertex.normal = sums[i].normalize();
        }
    }
}

/// Recomputes vertex tangents, with the same sharing rules as [`calc_normals`].
pub fn calc_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let tris = triangles(vertices.len(), indices);
    let tangent_of = |vertices: &[Vertex], [a, b, c]: [usize; 3]| {
        uv_tangent(
            [vertices[a].position, vertices[b].position, vertices[c].position],
            [vertices[a].uv, vertices[b].uv, vertices[c].uv],
        )
    };

    if indices.is_empty() {
        for tri in tris {
            let t = tangent_of(vertices, tri);
            for i in tri {
                vertices[i].tangent = t;
            }
        }
        return;
    }

    let mut sums = vec![Vec3::ZERO; vertices.len()];
    let mut referenced = vec![false; vertices.len()];

    for tri in tris {
        let t = tangent_of(vertices, tri);
        for i in tri {
            sums[i] += t;
            referenced[i] = true;
        }
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        if referenced[i] {
            vertex.tangent = sums[i].normalize();
        }
    }
}

/// Expands every triangle of `indices` into a 6-index triangle-with-adjacency.
///
/// The vertex opposite each edge in the neighboring triangle is interleaved
/// after the edge's first vertex. Boundary edges get a phantom vertex appended
/// to `vertices`, one per edge.
pub fn build_adjacency(vertices: &mut Vec<Vertex>, indices: &[u32]) -> Vec<u32> {
    // Undirected edge -> (triangle, opposite vertex) for every triangle using it.
    let mut edges: HashMap<(u32, u32), Vec<(usize, u32)>> = HashMap::new();
    let edge_key = |a: u32, b: u32| if a < b { (a, b) } else { (b, a) };

    for (t, tri) in indices.chunks_exact(3).enumerate() {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];
            let opposite = tri[(k + 2) % 3];
            edges.entry(edge_key(a, b)).or_default().push((t, opposite));
        }
    }

    let mut result = Vec::with_capacity(indices.len() * 2);

    for (t, tri) in indices.chunks_exact(3).enumerate() {
        for k in 0..3 {
            let a = tri[k];
            let b = tri[(k + 1) % 3];

            let neighbor = edges
                .get(&edge_key(a, b))
                .and_then(|users| {
                    users
                        .iter()
                        .find(|(other, opposite)| *other != t && !tri.contains(opposite))
                })
                .map(|(_, opposite)| *opposite);

            let adjacent = match neighbor {
                Some(opposite) => opposite,
                None => {
                    vertices.push(Vertex::phantom());
                    (vertices.len() - 1) as u32
                }
            };

            result.push(a);
            result.push(adjacent);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
        assert_relative_eq!(actual.x, expected.x, epsilon = 1.0e-6);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1.0e-6);
        assert_relative_eq!(actual.z, expected.z, epsilon = 1.0e-6);
    }

    fn vertex(x: f32, y: f32, z: f32, u: f32, v: f32) -> Vertex {
        Vertex::new(Vec3::new(x, y, z), Vec3::ONE, Vec2::new(u, v))
    }

    fn quad() -> (Vec<Vertex>, Vec<u32>) {
        let vertices = vec![
            vertex(0.5, 0.5, 0.0, 1.0, 1.0),
            vertex(0.5, -0.5, 0.0, 1.0, 0.0),
            vertex(-0.5, -0.5, 0.0, 0.0, 0.0),
            vertex(-0.5, 0.5, 0.0, 0.0, 1.0),
        ];
        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn clockwise_quad_faces_positive_z() {
        let (vertices, _) = quad();
        let n = face_normal(vertices[0].position, vertices[1].position, vertices[2].position, false);
        assert_vec3_eq(n, Vec3::Z);

        let n_ccw = face_normal(vertices[0].position, vertices[1].position, vertices[2].position, true);
        assert_vec3_eq(n_ccw, -Vec3::Z);
    }

    #[test]
    fn single_triangle_normals_match_face_normal() {
        let mut vertices = vec![
            vertex(0.0, 0.0, 0.0, 0.0, 0.0),
            vertex(0.0, 1.0, 0.0, 0.0, 1.0),
            vertex(1.0, 0.0, 0.0, 1.0, 0.0),
        ];
        let expected = face_normal(vertices[0].position, vertices[1].position, vertices[2].position, false);
        calc_normals(&mut vertices, &[0, 1, 2], false);

        for v in &vertices {
            assert_vec3_eq(v.normal, expected);
        }
    }

    #[test]
    fn shared_vertices_get_the_normalized_sum() {
        // Two triangles folded along the edge (0, 1).
        let mut vertices = vec![
            vertex(0.0, 0.0, 0.0, 0.0, 0.0),
            vertex(0.0, 1.0, 0.0, 0.0, 1.0),
            vertex(1.0, 0.0, 0.0, 1.0, 0.0),
            vertex(-1.0, 0.0, 1.0, 1.0, 1.0),
        ];
        let indices = [0, 1, 2, 1, 0, 3];
        let n0 = face_normal(vertices[0].position, vertices[1].position, vertices[2].position, false);
        let n1 = face_normal(vertices[1].position, vertices[0].position, vertices[3].position, false);

        calc_normals(&mut vertices, &indices, false);

        let shared = (n0 + n1).normalize();
        assert_vec3_eq(vertices[0].normal, shared);
        assert_vec3_eq(vertices[1].normal, shared);
        assert_vec3_eq(vertices[2].normal, n0);
        assert_vec3_eq(vertices[3].normal, n1);
    }

    #[test]
    fn non_indexed_normals_are_flat() {
        let (quad_vertices, quad_indices) = quad();
        let mut vertices: Vec<Vertex> = quad_indices.iter().map(|&i| quad_vertices[i as usize]).collect();
        calc_normals(&mut vertices, &[], false);

        for v in &vertices {
            assert_vec3_eq(v.normal, Vec3::Z);
        }
    }

    #[test]
    fn tangent_follows_increasing_u() {
        let (mut vertices, indices) = quad();
        calc_tangents(&mut vertices, &indices);

        for v in &vertices {
            assert_vec3_eq(v.tangent, Vec3::X);
        }
    }

    #[test]
    fn degenerate_uvs_give_nan_tangent() {
        let t = uv_tangent([Vec3::ZERO, Vec3::X, Vec3::Y], [Vec2::ZERO; 3]);
        assert!(t.x.is_nan());
    }

    #[test]
    fn open_quad_gets_one_phantom_per_boundary_edge() {
        let (mut vertices, indices) = quad();
        let adjacency = build_adjacency(&mut vertices, &indices);

        assert_eq!(adjacency.len(), 12);
        // Four outer edges, the diagonal is shared.
        assert_eq!(vertices.len(), 8);
        assert!(vertices[4..].iter().all(Vertex::is_phantom));

        // Triangle (0, 1, 2): edge (2, 0) is the diagonal shared with (0, 2, 3).
        assert_eq!(adjacency[4], 2);
        assert_eq!(adjacency[5], 3);
        assert!(vertices[adjacency[1] as usize].is_phantom());
    }

    #[test]
    fn closed_tetrahedron_has_no_phantoms() {
        let mut vertices = vec![
            vertex(0.0, 0.0, 0.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0, 1.0, 0.0),
            vertex(0.0, 1.0, 0.0, 0.0, 1.0),
            vertex(0.0, 0.0, 1.0, 1.0, 1.0),
        ];
        let indices = [0, 1, 2, 0, 3, 1, 1, 3, 2, 2, 3, 0];
        let adjacency = build_adjacency(&mut vertices, &indices);

        assert_eq!(adjacency.len(), indices.len() * 2);
        assert_eq!(vertices.len(), 4);

        // Every adjacent vertex is the one missing from the triangle.
        for tri in adjacency.chunks_exact(6) {
            let own = [tri[0], tri[2], tri[4]];
            for adj in [tri[1], tri[3], tri[5]] {
                assert!(!own.contains(&adj));
            }
        }
    }

    #[test]
    fn validation_rejects_bad_indices() {
        let (vertices, _) = quad();
        assert!(validate(&vertices, &[0, 1, 4]).is_err());
        assert!(validate(&vertices, &[0, 1]).is_err());
        assert!(validate(&vertices[..2], &[]).is_err());
        assert!(validate(&vertices, &[0, 1, 2]).is_ok());
    }
}
