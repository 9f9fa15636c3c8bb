//! Phong materials and per-slot texture mapping.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glamx::{Mat2, Mat4, Vec2, Vec3, Vec4};

use crate::resource::{Texture, TextureWrapping};

/// Phong reflection coefficients.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Ambient color.
    pub ambient: Vec3,
    /// Diffuse color.
    pub diffuse: Vec3,
    /// Specular color.
    pub specular: Vec3,
    /// Specular exponent: the larger, the smaller the highlight.
    pub shininess: f32,
}

/// Named materials.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialPreset {
    /// Light gray plastic.
    Default,
    /// Polished gold.
    Gold,
    /// Chrome.
    Chrome,
    /// Bronze.
    Bronze,
    /// Cyan plastic.
    CyanPlastic,
    /// Yellow rubber.
    YellowRubber,
}

impl Material {
    /// Light gray plastic.
    pub const DEFAULT: Material = Material {
        ambient: Vec3::splat(0.05),
        diffuse: Vec3::splat(0.8),
        specular: Vec3::splat(0.4),
        shininess: 16.0,
    };

    /// Polished gold.
    pub const GOLD: Material = Material {
        ambient: Vec3::new(0.24725, 0.1995, 0.0745),
        diffuse: Vec3::new(0.75164, 0.60648, 0.22648),
        specular: Vec3::new(0.628281, 0.555802, 0.366065),
        shininess: 0.4 * 128.0,
    };

    /// Chrome.
    pub const CHROME: Material = Material {
        ambient: Vec3::splat(0.25),
        diffuse: Vec3::splat(0.4),
        specular: Vec3::splat(0.774597),
        shininess: 0.6 * 128.0,
    };

    /// Bronze.
    pub const BRONZE: Material = Material {
        ambient: Vec3::new(0.2125, 0.1275, 0.054),
        diffuse: Vec3::new(0.714, 0.4284, 0.18144),
        specular: Vec3::new(0.393548, 0.271906, 0.166721),
        shininess: 0.2 * 128.0,
    };

    /// Cyan plastic.
    pub const CYAN_PLASTIC: Material = Material {
        ambient: Vec3::new(0.0, 0.1, 0.06),
        diffuse: Vec3::new(0.0, 0.50980392, 0.50980392),
        specular: Vec3::splat(0.50196078),
        shininess: 0.25 * 128.0,
    };

    /// Yellow rubber.
    pub const YELLOW_RUBBER: Material = Material {
        ambient: Vec3::new(0.05, 0.05, 0.0),
        diffuse: Vec3::new(0.5, 0.5, 0.4),
        specular: Vec3::new(0.7, 0.7, 0.04),
        shininess: 0.078125 * 128.0,
    };

    /// The material of a preset.
    pub const fn preset(preset: MaterialPreset) -> Material {
        match preset {
            MaterialPreset::Default => Self::DEFAULT,
            MaterialPreset::Gold => Self::GOLD,
            MaterialPreset::Chrome => Self::CHROME,
            MaterialPreset::Bronze => Self::BRONZE,
            MaterialPreset::CyanPlastic => Self::CYAN_PLASTIC,
            MaterialPreset::YellowRubber => Self::YELLOW_RUBBER,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<MaterialPreset> for Material {
    fn from(preset: MaterialPreset) -> Self {
        Material::preset(preset)
    }
}

/// A texture and how it is laid on the surface.
#[derive(Clone)]
pub struct TextureSlot {
    /// The texture, or `None` to use the renderer default.
    pub texture: Option<Arc<Texture>>,
    /// UV offset.
    pub offset: Vec2,
    /// UV scale (tiling).
    pub scale: Vec2,
    /// UV rotation, in degrees.
    pub rotation: f32,
    /// Horizontal wrapping.
    pub wrap_s: TextureWrapping,
    /// Vertical wrapping.
    pub wrap_t: TextureWrapping,
}

impl Default for TextureSlot {
    fn default() -> Self {
        TextureSlot {
            texture: None,
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            wrap_s: TextureWrapping::Repeat,
            wrap_t: TextureWrapping::Repeat,
        }
    }
}

impl std::fmt::Debug for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureSlot")
            .field("texture", &self.texture.as_ref().map(|t| t.size))
            .field("offset", &self.offset)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .field("wrap_s", &self.wrap_s)
            .field("wrap_t", &self.wrap_t)
            .finish()
    }
}

impl TextureSlot {
    /// A slot showing `texture` with the default mapping.
    pub fn new(texture: Arc<Texture>) -> Self {
        TextureSlot {
            texture: Some(texture),
            ..Default::default()
        }
    }

    /// Sets the UV scale.
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the UV offset.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the UV rotation, in degrees.
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets both wrapping modes.
    pub fn with_wrapping(mut self, wrap_s: TextureWrapping, wrap_t: TextureWrapping) -> Self {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self
    }

    /// The 2x2 UV rotation. Left-handed rotations turn the other way.
    pub fn rotation_matrix(&self, left_handed: bool) -> Mat2 {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let sign = if left_handed { -1.0 } else { 1.0 };
        Mat2::from_cols(Vec2::new(cos, sign * sin), Vec2::new(-sign * sin, cos))
    }

    /// Uniform block of this mapping.
    pub fn mapping(&self, left_handed: bool) -> TextureMappingStd140 {
        let rot = self.rotation_matrix(left_handed);
        TextureMappingStd140 {
            offset: self.offset,
            origin: Vec2::ZERO,
            scale: Vec4::new(self.scale.x, self.scale.y, 0.0, 0.0),
            rotation: Mat4::from_cols(
                rot.x_axis.extend(0.0).extend(0.0),
                rot.y_axis.extend(0.0).extend(0.0),
                Vec4::Z,
                Vec4::W,
            ),
        }
    }
}

/// GPU layout of a texture mapping: `uv' = rotation * ((uv - origin) * scale) + origin + offset`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TextureMappingStd140 {
    /// UV offset.
    pub offset: Vec2,
    /// Rotation and scale pivot.
    pub origin: Vec2,
    /// xy: UV scale.
    pub scale: Vec4,
    /// Upper-left 2x2 block: UV rotation.
    pub rotation: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn presets_match_constants() {
        assert_eq!(Material::default(), Material::DEFAULT);
        assert_eq!(Material::from(MaterialPreset::Gold), Material::GOLD);
        assert_relative_eq!(Material::YELLOW_RUBBER.shininess, 10.0);
        assert_relative_eq!(Material::CHROME.shininess, 76.8, epsilon = 1.0e-4);
    }

    #[test]
    fn quarter_turn_rotates_u_to_v() {
        let slot = TextureSlot::default().with_rotation(90.0);

        let right = slot.rotation_matrix(false) * Vec2::X;
        assert_relative_eq!(right.x, 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(right.y, 1.0, epsilon = 1.0e-6);

        let left = slot.rotation_matrix(true) * Vec2::X;
        assert_relative_eq!(left.y, -1.0, epsilon = 1.0e-6);
    }

    #[test]
    fn mapping_block_layout() {
        assert_eq!(std::mem::size_of::<TextureMappingStd140>(), 96);

        let mapping = TextureSlot::default()
            .with_scale(Vec2::new(10.0, 5.0))
            .mapping(false);
        assert_eq!(mapping.scale, Vec4::new(10.0, 5.0, 0.0, 0.0));
        assert_eq!(mapping.rotation, Mat4::IDENTITY);
        assert_eq!(mapping.origin, Vec2::ZERO);
    }
}
