use glamx::Vec3;

use super::ShapeData;
use crate::resource::Vertex;

#[rustfmt::skip]
const SKYBOX: [[f32; 3]; 36] = [
    [-1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0], [-1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0],

    [ 1.0, -1.0, -1.0], [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0],

    [-1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],

    [-1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0],
    [ 1.0,  1.0,  1.0], [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0],

    [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0],
    [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],
];

/// The unit cube seen from the inside, non-indexed (36 vertices).
///
/// The skybox shader samples the cube texture with the vertex position, so
/// UVs are left at zero.
pub fn skybox_cube() -> ShapeData {
    let vertices = SKYBOX
        .iter()
        .map(|&p| Vertex {
            position: Vec3::from_array(p),
            color: Vec3::ONE,
            ..Default::default()
        })
        .collect();

    (vertices, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skybox_is_non_indexed() {
        let (v, i) = skybox_cube();
        assert_eq!(v.len(), 36);
        assert!(i.is_empty());
        assert!(v.iter().all(|v| v.position.abs() == Vec3::ONE));
    }
}
