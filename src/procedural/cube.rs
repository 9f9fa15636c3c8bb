use super::{quad_indices, white, ShapeData};

/// An axis-aligned cube of side `size` centered at the origin.
///
/// Each face has its own 4 vertices so that normals and UVs stay per-face:
/// 24 vertices, 36 indices. Faces come in the order +Z, +X, +Y, -Z, -X, -Y.
pub fn cube(size: f32) -> ShapeData {
    let h = size / 2.0;

    #[rustfmt::skip]
    let vertices = vec![
        // +Z
        white( h,  h,  h, 1.0, 1.0),
        white( h, -h,  h, 1.0, 0.0),
        white(-h, -h,  h, 0.0, 0.0),
        white(-h,  h,  h, 0.0, 1.0),
        // +X
        white( h,  h, -h, 1.0, 1.0),
        white( h, -h, -h, 1.0, 0.0),
        white( h, -h,  h, 0.0, 0.0),
        white( h,  h,  h, 0.0, 1.0),
        // +Y
        white( h,  h, -h, 1.0, 1.0),
        white( h,  h,  h, 1.0, 0.0),
        white(-h,  h,  h, 0.0, 0.0),
        white(-h,  h, -h, 0.0, 1.0),
        // -Z
        white(-h,  h, -h, 0.0, 1.0),
        white(-h, -h, -h, 0.0, 0.0),
        white( h, -h, -h, 1.0, 0.0),
        white( h,  h, -h, 1.0, 1.0),
        // -X
        white(-h,  h,  h, 0.0, 1.0),
        white(-h, -h,  h, 0.0, 0.0),
        white(-h, -h, -h, 1.0, 0.0),
        white(-h,  h, -h, 1.0, 1.0),
        // -Y
        white(-h, -h, -h, 0.0, 1.0),
        white(-h, -h,  h, 0.0, 0.0),
        white( h, -h,  h, 1.0, 0.0),
        white( h, -h, -h, 1.0, 1.0),
    ];

    (vertices, quad_indices(6))
}

/// A cube sharing its 8 corners between faces.
///
/// The mesh is closed, so its adjacency has no phantom vertex: use it for
/// shadow casters. UVs are only meaningful on the ±Z faces.
pub fn cube_fully_indexed(size: f32) -> ShapeData {
    let h = size / 2.0;

    #[rustfmt::skip]
    let vertices = vec![
        white( h,  h,  h, 1.0, 1.0),
        white( h, -h,  h, 1.0, 0.0),
        white(-h, -h,  h, 0.0, 0.0),
        white(-h,  h,  h, 0.0, 1.0),
        white( h,  h, -h, 1.0, 1.0),
        white( h, -h, -h, 1.0, 0.0),
        white(-h, -h, -h, 0.0, 0.0),
        white(-h,  h, -h, 0.0, 1.0),
    ];

    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2, 2, 3, 0, // +Z
        4, 0, 3, 3, 7, 4, // +Y
        3, 2, 6, 6, 7, 3, // -X
        4, 5, 1, 1, 0, 4, // +X
        6, 2, 1, 1, 5, 6, // -Y
        7, 6, 5, 5, 4, 7, // -Z
    ];

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::geometry::{build_adjacency, calc_normals, face_normal};
    use approx::assert_relative_eq;

    fn assert_outward(shape: &ShapeData) {
        let (v, i) = shape;
        for tri in i.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|k| v[k as usize].position);
            let n = face_normal(a, b, c, false);
            let center = (a + b + c) / 3.0;
            assert!(n.dot(center) > 0.0, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn cube_counts_and_winding() {
        let shape = cube(2.0);
        assert_eq!(shape.0.len(), 24);
        assert_eq!(shape.1.len(), 36);
        assert_outward(&shape);
    }

    #[test]
    fn fully_indexed_cube_is_closed() {
        let shape = cube_fully_indexed(1.0);
        assert_eq!(shape.0.len(), 8);
        assert_outward(&shape);

        let (mut vertices, indices) = shape;
        let adjacency = build_adjacency(&mut vertices, &indices);
        assert_eq!(adjacency.len(), 72);
        assert_eq!(vertices.len(), 8);
    }

    #[test]
    fn per_face_normals_are_axis_aligned() {
        let (mut v, i) = cube(1.0);
        calc_normals(&mut v, &i, false);
        assert_relative_eq!(v[0].normal.z, 1.0, epsilon = 1.0e-6);
        assert_relative_eq!(v[4].normal.x, 1.0, epsilon = 1.0e-6);
        assert_relative_eq!(v[20].normal.y, -1.0, epsilon = 1.0e-6);
    }
}
