//! Keyboard and mouse driven camera.

use glamx::{Vec2, Vec3};

use super::Camera;

/// A [`Camera`] moved by a held movement vector and rotated by mouse drags.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllableCamera {
    /// The driven camera.
    pub camera: Camera,
    /// Held movement: x strafes, y goes up, z goes forward. Each in -1..=1.
    pub movement: Vec3,
    /// Units per second.
    pub speed: f32,
    /// Degrees per dragged pixel.
    pub sensitivity: f32,
}

impl ControllableCamera {
    /// Wraps `camera`.
    pub fn new(camera: Camera, speed: f32, sensitivity: f32) -> Self {
        ControllableCamera {
            camera,
            movement: Vec3::ZERO,
            speed,
            sensitivity,
        }
    }

    /// Applies the held movement for a frame that lasted `frame_delta_ms`.
    pub fn update(&mut self, frame_delta_ms: f32) {
        if self.movement != Vec3::ZERO {
            let step = self.speed / 1000.0 * frame_delta_ms;
            self.camera.translate_local(self.movement * step);
        }
    }

    /// Rotates by a mouse drag of `delta` pixels (screen y down).
    pub fn drag(&mut self, delta: Vec2) {
        self.camera.rotation.x -= delta.y * self.sensitivity;
        self.camera.rotation.y -= delta.x * self.sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn movement_scales_with_frame_time() {
        let mut controls = ControllableCamera::new(Camera::default(), 1.5, 0.3);
        controls.movement = Vec3::new(0.0, 0.0, 1.0);
        controls.update(1000.0);
        assert_relative_eq!(controls.camera.position.z, -1.5, epsilon = 1.0e-6);

        controls.movement = Vec3::ZERO;
        controls.update(1000.0);
        assert_relative_eq!(controls.camera.position.z, -1.5, epsilon = 1.0e-6);
    }

    #[test]
    fn dragging_up_pitches_up() {
        let mut controls = ControllableCamera::new(Camera::default(), 1.5, 0.3);
        controls.drag(Vec2::new(10.0, -10.0));
        assert_relative_eq!(controls.camera.rotation.x, 3.0, epsilon = 1.0e-6);
        assert_relative_eq!(controls.camera.rotation.y, -3.0, epsilon = 1.0e-6);
    }
}
