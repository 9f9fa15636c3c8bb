//! Named, placed collections of mesh parts.

use glamx::{Mat4, Vec3};

use crate::error::{RendererError, Result};
use crate::scene::mesh_part::MeshPart;

/// A scene entity made of one or more [`MeshPart`]s sharing one transform.
#[derive(Clone, Debug)]
pub struct StaticMesh {
    /// Free-form name, for debugging.
    pub name: String,
    parts: Vec<MeshPart>,
    /// Skipped by every pass when `false`.
    pub visible: bool,
    /// Included in shadow volume passes.
    pub cast_shadows: bool,
    /// Pivot of rotation and scale, in model space.
    pub origin: Vec3,
    /// Translation.
    pub position: Vec3,
    /// Euler angles in degrees, applied around Z, then Y, then X.
    pub rotation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl StaticMesh {
    /// A mesh with a single part.
    pub fn new(name: impl Into<String>, part: MeshPart) -> Self {
        StaticMesh {
            name: name.into(),
            parts: vec![part],
            visible: true,
            cast_shadows: true,
            origin: Vec3::ZERO,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// A mesh made of `parts`, which must not be empty.
    pub fn from_parts(name: impl Into<String>, parts: Vec<MeshPart>) -> Result<Self> {
        let name = name.into();
        let mut parts = parts.into_iter();
        let first = parts.next().ok_or_else(|| {
            RendererError::InvalidGeometry(format!("static mesh '{}' has no parts", name))
        })?;

        let mut mesh = StaticMesh::new(name, first);
        mesh.parts.extend(parts);
        Ok(mesh)
    }

    /// Sets the position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation (degrees).
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the pivot.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Enables or disables shadow casting.
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    /// The parts, never empty.
    #[inline]
    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// The parts, mutably.
    #[inline]
    pub fn parts_mut(&mut self) -> &mut [MeshPart] {
        &mut self.parts
    }

    /// Appends a part.
    pub fn add_part(&mut self, part: MeshPart) {
        self.parts.push(part);
    }

    /// `translate(origin) * T * R * S * translate(-origin)`.
    pub fn model_matrix(&self) -> Mat4 {
        model_matrix(self.origin, self.position, self.rotation, self.scale)
    }
}

/// Rotation around Z, then Y, then X, from angles in degrees.
pub fn euler_zyx(rotation: Vec3) -> Mat4 {
    Mat4::from_rotation_z(rotation.z.to_radians())
        * Mat4::from_rotation_y(rotation.y.to_radians())
        * Mat4::from_rotation_x(rotation.x.to_radians())
}

/// Transform scaling and rotating around `origin`, then translating by `position`.
pub fn model_matrix(origin: Vec3, position: Vec3, rotation: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(origin)
        * Mat4::from_translation(position)
        * euler_zyx(rotation)
        * Mat4::from_scale(scale)
        * Mat4::from_translation(-origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_transform_gives_identity() {
        assert_eq!(
            model_matrix(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::ONE),
            Mat4::IDENTITY
        );
    }

    #[test]
    fn origin_is_the_pivot() {
        let origin = Vec3::new(1.0, 0.0, 0.0);
        let m = model_matrix(origin, Vec3::ZERO, Vec3::new(0.0, 0.0, 90.0), Vec3::splat(2.0));

        // The pivot itself does not move.
        let pivot = m.transform_point3(origin);
        assert_relative_eq!(pivot.x, 1.0, epsilon = 1.0e-6);
        assert_relative_eq!(pivot.y, 0.0, epsilon = 1.0e-6);

        // One unit right of the pivot ends two units above it.
        let p = m.transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1.0e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1.0e-5);
    }

    #[test]
    fn position_translates_after_rotation() {
        let m = model_matrix(
            Vec3::ZERO,
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(-90.0, 0.0, 0.0),
            Vec3::ONE,
        );
        let p = m.transform_point3(Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p.y, -1.0, epsilon = 1.0e-6);
        assert_relative_eq!(p.z, -1.0, epsilon = 1.0e-6);
    }
}
