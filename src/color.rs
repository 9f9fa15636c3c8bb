//! Linear RGBA colors.
//!
//! # Example
//! ```
//! # use deferred3d::color::{self, Color};
//! let dim = Color::new(0.8, 0.8, 0.8, 1.0);
//! assert!(dim.r < color::WHITE.r);
//! ```

pub use rgb::Rgba;

/// The color type used throughout the renderer. RGBA with f32 components in [0.0, 1.0].
pub type Color = Rgba<f32>;

/// Black (0, 0, 0)
pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// White (255, 255, 255)
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

/// Red (255, 0, 0)
pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);

/// Lime (0, 255, 0), pure green
pub const LIME: Color = Color::new(0.0, 1.0, 0.0, 1.0);

/// Blue (0, 0, 255)
pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

/// Yellow (255, 255, 0)
pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);

/// Orange (255, 165, 0), the default gizmo outline
pub const ORANGE: Color = Color::new(1.0, 165.0 / 255.0, 0.0, 1.0);

/// Transparent black
pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

/// RGB part of a color.
#[inline]
pub fn rgb(color: Color) -> glamx::Vec3 {
    glamx::Vec3::new(color.r, color.g, color.b)
}

/// Color as a `Vec4`.
#[inline]
pub fn to_vec4(color: Color) -> glamx::Vec4 {
    glamx::Vec4::new(color.r, color.g, color.b, color.a)
}
