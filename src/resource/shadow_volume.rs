//! CPU extrusion of stencil shadow volumes.
//!
//! wgpu has no geometry stage, so the silhouette detection that would run on
//! triangle-with-adjacency primitives is done here instead. The output is a plain
//! triangle list in homogeneous world coordinates: points on the caster have
//! `w = 1`, points extruded to infinity away from the light have `w = 0`.
//!
//! The volume is closed (front cap, back cap at infinity and one quad per
//! silhouette edge) so it can be rendered with the depth-fail stencil method.

use glamx::{Mat4, Vec3};

use crate::resource::geometry::{face_normal, Adjacency};

/// Where the light rays come from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightRay {
    /// Rays leave from a point (point and spot lights).
    Point(Vec3),
    /// Parallel rays along a direction (directional lights).
    Directional(Vec3),
}

impl LightRay {
    /// Direction of the ray reaching `p`.
    #[inline]
    pub fn direction_to(&self, p: Vec3) -> Vec3 {
        match *self {
            LightRay::Point(origin) => p - origin,
            LightRay::Directional(dir) => dir,
        }
    }

    /// Whether the front of the triangle `(p0, p1, p2)` is lit. `ccw` selects the
    /// front-facing winding.
    pub fn lights(&self, p0: Vec3, p1: Vec3, p2: Vec3, ccw: bool) -> bool {
        let n = face_normal(p0, p1, p2, ccw);
        n.dot(-self.direction_to(p0)) > 0.0
    }
}

/// Reusable scratch space for volume extrusion.
#[derive(Default)]
pub struct ShadowVolumeBuilder {
    world: Vec<Vec3>,
}

impl ShadowVolumeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the shadow volume of `adjacency`, placed by `model`, to `out`.
    ///
    /// Returns the number of vertices appended.
    pub fn extrude(
        &mut self,
        adjacency: &Adjacency,
        model: &Mat4,
        light: LightRay,
        out: &mut Vec<[f32; 4]>,
    ) -> usize {
        let start = out.len();

        self.world.clear();
        self.world.extend(
            adjacency
                .vertices
                .iter()
                .map(|v| model.transform_point3(v.position)),
        );

        let world = &self.world;
        let ccw = adjacency.ccw;
        let is_phantom = |i: u32| adjacency.vertices[i as usize].is_phantom();
        let finite = |p: Vec3| p.extend(1.0).to_array();
        let infinite = |p: Vec3| light.direction_to(p).extend(0.0).to_array();

        for prim in adjacency.indices.chunks_exact(6) {
            let corners = [prim[0], prim[2], prim[4]];
            let neighbors = [prim[1], prim[3], prim[5]];
            let [p0, p1, p2] = corners.map(|i| world[i as usize]);

            if !light.lights(p0, p1, p2, ccw) {
                continue;
            }

            // Caps are emitted clockwise: front cap on the caster, back cap at
            // infinity with reversed winding.
            let (p1, p2) = if ccw { (p2, p1) } else { (p1, p2) };
            out.extend([finite(p0), finite(p1), finite(p2)]);
            out.extend([infinite(p0), infinite(p2), infinite(p1)]);

            for k in 0..3 {
                let a = world[corners[k] as usize];
                let b = world[corners[(k + 1) % 3] as usize];
                let c = world[corners[(k + 2) % 3] as usize];
                let adj = neighbors[k];

                let silhouette =
                    is_phantom(adj) || !light.lights(b, a, world[adj as usize], ccw);
                if !silhouette {
                    continue;
                }

                // Orient the side quad away from the triangle.
                let side = face_normal(a, b, b + light.direction_to(b), false);
                let (a, b) = if side.dot(c - a) > 0.0 { (b, a) } else { (a, b) };

                out.extend([finite(a), finite(b), infinite(b)]);
                out.extend([finite(a), infinite(b), infinite(a)]);
            }
        }

        out.len() - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::geometry::{build_adjacency, Vertex};
    use glamx::{Vec2, Vec4};

    fn adjacency_of(positions: &[Vec3], indices: &[u32]) -> Adjacency {
        let mut vertices: Vec<Vertex> = positions
            .iter()
            .map(|p| Vertex::new(*p, Vec3::ONE, Vec2::ZERO))
            .collect();
        let indices = build_adjacency(&mut vertices, indices);
        Adjacency {
            vertices,
            indices,
            ccw: false,
        }
    }

    fn floor_triangle() -> Adjacency {
        // Clockwise seen from above: faces +Y.
        adjacency_of(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            &[0, 1, 2],
        )
    }

    #[test]
    fn lit_open_triangle_gets_caps_and_three_sides() {
        let adjacency = floor_triangle();
        let mut out = Vec::new();
        let n = ShadowVolumeBuilder::new().extrude(
            &adjacency,
            &Mat4::IDENTITY,
            LightRay::Point(Vec3::new(0.2, 3.0, -0.2)),
            &mut out,
        );

        // 2 caps + 3 quads of 2 triangles.
        assert_eq!(n, 8 * 3);
        assert!(out[..3].iter().all(|p| p[3] == 1.0));
        assert!(out[3..6].iter().all(|p| p[3] == 0.0));
    }

    #[test]
    fn unlit_triangle_casts_nothing() {
        let adjacency = floor_triangle();
        let mut out = Vec::new();
        let n = ShadowVolumeBuilder::new().extrude(
            &adjacency,
            &Mat4::IDENTITY,
            LightRay::Point(Vec3::new(0.2, -3.0, -0.2)),
            &mut out,
        );

        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn extruded_points_follow_the_light_rays() {
        let adjacency = floor_triangle();
        let mut out = Vec::new();
        ShadowVolumeBuilder::new().extrude(
            &adjacency,
            &Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            LightRay::Directional(Vec3::new(0.0, -1.0, 0.0)),
            &mut out,
        );

        for p in out.iter().filter(|p| p[3] == 0.0) {
            assert_eq!(Vec4::from_array(*p), Vec4::new(0.0, -1.0, 0.0, 0.0));
        }
        for p in out.iter().filter(|p| p[3] == 1.0) {
            assert_eq!(p[1], 1.0);
        }
    }

    #[test]
    fn counter_clockwise_meshes_cast_the_same_volume() {
        let light = LightRay::Point(Vec3::new(0.2, 3.0, -0.2));
        let mut clockwise = Vec::new();
        ShadowVolumeBuilder::new().extrude(&floor_triangle(), &Mat4::IDENTITY, light, &mut clockwise);

        // Same triangle wound the other way, flagged as counter-clockwise.
        let mut mirrored = adjacency_of(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
            ],
            &[0, 1, 2],
        );
        mirrored.ccw = true;
        let mut counter_clockwise = Vec::new();
        ShadowVolumeBuilder::new().extrude(&mirrored, &Mat4::IDENTITY, light, &mut counter_clockwise);

        assert_eq!(counter_clockwise.len(), clockwise.len());
        assert_eq!(&counter_clockwise[..6], &clockwise[..6]);

        // Without the flag the triangle faces down and casts nothing.
        mirrored.ccw = false;
        let mut out = Vec::new();
        ShadowVolumeBuilder::new().extrude(&mirrored, &Mat4::IDENTITY, light, &mut out);
        assert!(out.is_empty());
    }
}
