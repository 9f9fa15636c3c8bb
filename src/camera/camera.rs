//! A perspective camera placed by a position and Euler angles.

use glamx::{Mat4, Vec3};

use crate::scene::euler_zyx;

/// Handedness of the world coordinate system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Handedness {
    /// Right-handed: -Z is forward.
    #[default]
    Right,
    /// Left-handed.
    Left,
}

/// A perspective camera.
///
/// The camera looks along its rotated -Z axis. Rotations are in degrees and
/// applied around Z, then Y, then X.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    /// Vertical field of view, in degrees.
    pub fov: f32,
    /// Near clipping plane.
    pub z_near: f32,
    /// Far clipping plane.
    pub z_far: f32,
    /// Width over height.
    pub aspect_ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            fov: 45.0,
            z_near: 0.1,
            z_far: 100.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Camera {
    /// A camera with the given aspect ratio and default frustum.
    pub fn new(aspect_ratio: f32) -> Self {
        Camera {
            aspect_ratio,
            ..Default::default()
        }
    }

    /// Rotation around Z, then Y, then X.
    pub fn rotation_matrix(&self) -> Mat4 {
        euler_zyx(self.rotation)
    }

    /// Unit view direction.
    pub fn direction(&self) -> Vec3 {
        self.rotation_matrix()
            .transform_vector3(Vec3::NEG_Z)
            .normalize()
    }

    /// `normalize(cross(Y, direction))`, the horizontal axis used for strafing.
    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.direction()).normalize_or_zero()
    }

    /// World to view transform.
    pub fn view_matrix(&self, handedness: Handedness) -> Mat4 {
        let target = self.position + self.direction();
        match handedness {
            Handedness::Right => Mat4::look_at_rh(self.position, target, Vec3::Y),
            Handedness::Left => Mat4::look_at_lh(self.position, target, Vec3::Y),
        }
    }

    /// View to clip transform, with a 0..1 depth range.
    pub fn projection_matrix(&self, handedness: Handedness) -> Mat4 {
        let fov = self.fov.to_radians();
        match handedness {
            Handedness::Right => {
                Mat4::perspective_rh(fov, self.aspect_ratio, self.z_near, self.z_far)
            }
            Handedness::Left => {
                Mat4::perspective_lh(fov, self.aspect_ratio, self.z_near, self.z_far)
            }
        }
    }

    /// Moves along the view direction (`movement.z`), the strafe axis
    /// (`movement.x`) and the world up axis (`movement.y`).
    pub fn translate_local(&mut self, movement: Vec3) {
        self.position +=
            self.direction() * movement.z + self.right() * movement.x + Vec3::Y * movement.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert_eq!(camera.direction(), Vec3::NEG_Z);
        assert_eq!(camera.right(), Vec3::NEG_X);
    }

    #[test]
    fn direction_is_unit_for_any_rotation() {
        let mut camera = Camera::default();
        for x in (-90..=90).step_by(15) {
            for y in (0..360).step_by(20) {
                camera.rotation = Vec3::new(x as f32, y as f32, 5.0);
                assert_relative_eq!(camera.direction().length(), 1.0, epsilon = 1.0e-5);
            }
        }
    }

    #[test]
    fn view_matrix_moves_the_eye_to_the_origin() {
        let camera = Camera {
            position: Vec3::new(0.0, 0.0, 3.0),
            rotation: Vec3::new(-10.0, 0.0, 0.0),
            ..Default::default()
        };

        for handedness in [Handedness::Right, Handedness::Left] {
            let eye = camera.view_matrix(handedness).transform_point3(camera.position);
            assert_relative_eq!(eye.length(), 0.0, epsilon = 1.0e-5);
        }
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let camera = Camera::new(16.0 / 9.0);
        let clip = camera.projection_matrix(Handedness::Right)
            * glamx::Vec4::new(0.0, 0.0, -camera.z_near, 1.0);
        assert_relative_eq!(clip.z / clip.w, 0.0, epsilon = 1.0e-6);
    }

    #[test]
    fn translate_local_moves_forward() {
        let mut camera = Camera::default();
        camera.translate_local(Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, -2.0));
    }
}
