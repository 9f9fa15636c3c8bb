use super::{quad_indices, white, ShapeData};

/// A `size`×`size` square on the XY plane, facing +Z.
///
/// # Example
/// ```
/// # use deferred3d::procedural::plane;
/// let (vertices, indices) = plane(20.0);
/// assert_eq!(vertices.len(), 4);
/// assert_eq!(indices, vec![0, 1, 2, 0, 2, 3]);
/// ```
pub fn plane(size: f32) -> ShapeData {
    let h = size / 2.0;

    let vertices = vec![
        white(h, h, 0.0, 1.0, 1.0),
        white(h, -h, 0.0, 1.0, 0.0),
        white(-h, -h, 0.0, 0.0, 0.0),
        white(-h, h, 0.0, 0.0, 1.0),
    ];

    (vertices, quad_indices(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::geometry::face_normal;
    use glamx::Vec3;

    #[test]
    fn plane_faces_positive_z() {
        let (v, i) = plane(2.0);
        for tri in i.chunks_exact(3) {
            let n = face_normal(
                v[tri[0] as usize].position,
                v[tri[1] as usize].position,
                v[tri[2] as usize].position,
                false,
            );
            assert_eq!(n, Vec3::Z);
        }
        assert_eq!(v[0].position, Vec3::new(1.0, 1.0, 0.0));
    }
}
