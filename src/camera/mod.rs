//! Perspective camera and its interactive controller.

pub use self::camera::{Camera, Handedness};
pub use self::controllable::ControllableCamera;

mod camera;
mod controllable;
