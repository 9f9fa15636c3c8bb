//! Light sources.
//!
//! A light is a plain value placed in world space by its position and its
//! rotation (Euler angles in degrees). Its direction is the rotated -Z axis.

use bytemuck::{Pod, Zeroable};
use glamx::{Mat4, Vec3, Vec4};

use crate::color::{Color, WHITE};
use crate::resource::LightRay;
use crate::scene::euler_zyx;

/// The type of light source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightType {
    /// Emits in every direction from its position.
    Point,
    /// Parallel rays along its direction, position ignored (like the sun).
    Directional,
    /// A cone of light from its position along its direction.
    Spot,
}

/// Distance attenuation: `1 / (1 + linear * d + quadratic * d²)`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attenuation {
    /// Linear factor.
    pub linear: f32,
    /// Quadratic factor.
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation {
            linear: 0.22,
            quadratic: 0.20,
        }
    }
}

impl Attenuation {
    /// The attenuation factor at distance `d`.
    #[inline]
    pub fn at(&self, d: f32) -> f32 {
        1.0 / (1.0 + self.linear * d + self.quadratic * d * d)
    }
}

/// A light source.
///
/// # Examples
/// ```
/// # use deferred3d::prelude::*;
/// let lamp = Light::point(Vec3::new(2.0, -0.3, 1.0))
///     .with_color(Color::new(0.8, 0.8, 0.8, 1.0));
///
/// let torch = Light::spot(Vec3::new(0.0, 2.0, 1.0), Vec3::new(-30.0, 0.0, 0.0))
///     .with_cutoff(20.0, 25.0)
///     .with_shadows(true);
/// # assert!(torch.cast_shadows && lamp.render);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    light_type: LightType,
    /// Position in world space (ignored by directional lights).
    pub position: Vec3,
    /// Euler angles in degrees, applied around Z, then Y, then X.
    pub rotation: Vec3,
    /// Light color (alpha ignored).
    pub color: Color,
    /// Draw a gizmo cube at the light position.
    pub render: bool,
    /// Cast stencil shadows.
    pub cast_shadows: bool,
    /// Scale of the gizmo.
    pub render_scale: f32,
    /// Distance attenuation (point and spot lights).
    pub attenuation: Attenuation,
    /// Inner cone angle in degrees (spot lights): full intensity inside.
    pub cut_off_angle: f32,
    /// Outer cone angle in degrees (spot lights): no light outside.
    pub cut_off_outer_angle: f32,
}

impl Light {
    /// Creates a light of the given type at the origin, pointing along -Z.
    pub fn new(light_type: LightType) -> Self {
        Light {
            light_type,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            color: WHITE,
            render: true,
            cast_shadows: false,
            render_scale: 1.0,
            attenuation: Attenuation::default(),
            cut_off_angle: 40.0,
            cut_off_outer_angle: 45.0,
        }
    }

    /// A point light at `position`.
    pub fn point(position: Vec3) -> Self {
        Self::new(LightType::Point).with_position(position)
    }

    /// A directional light oriented by `rotation` (degrees).
    pub fn directional(rotation: Vec3) -> Self {
        Self::new(LightType::Directional).with_rotation(rotation)
    }

    /// A spot light at `position` oriented by `rotation` (degrees).
    pub fn spot(position: Vec3, rotation: Vec3) -> Self {
        Self::new(LightType::Spot)
            .with_position(position)
            .with_rotation(rotation)
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

    /// Sets the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Enables or disables shadow casting.
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    /// Shows or hides the gizmo.
    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Sets the gizmo scale.
    pub fn with_render_scale(mut self, render_scale: f32) -> Self {
        self.render_scale = render_scale;
        self
    }

    /// Sets the attenuation factors.
    pub fn with_attenuation(mut self, linear: f32, quadratic: f32) -> Self {
        self.attenuation = Attenuation { linear, quadratic };
        self
    }

    /// Sets the inner and outer cone angles (degrees).
    pub fn with_cutoff(mut self, inner: f32, outer: f32) -> Self {
        self.cut_off_angle = inner;
        self.cut_off_outer_angle = outer;
        self
    }

    /// The type of this light.
    #[inline]
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Rotation around Z, then Y, then X.
    pub fn rotation_matrix(&self) -> Mat4 {
        euler_zyx(self.rotation)
    }

    /// The rotated -Z axis.
    pub fn direction(&self) -> Vec3 {
        self.rotation_matrix()
            .transform_vector3(Vec3::NEG_Z)
            .normalize()
    }

    /// Gizmo transform: translation, rotation, then a scale stretched along the
    /// direction for directional and spot lights.
    pub fn model_matrix(&self) -> Mat4 {
        let stretch = match self.light_type {
            LightType::Point => Vec3::ONE,
            LightType::Directional | LightType::Spot => Vec3::new(1.0, 1.0, 2.0),
        };

        Mat4::from_translation(self.position)
            * self.rotation_matrix()
            * Mat4::from_scale(stretch * self.render_scale)
    }

    /// View from the light along its direction.
    pub fn view_matrix(&self) -> Mat4 {
        let dir = self.direction();
        let up = if dir.cross(Vec3::Y).length_squared() < 1.0e-12 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        Mat4::look_at_rh(self.position, self.position + dir, up)
    }

    /// Projection from the light: orthographic for directional lights, 90° perspective otherwise.
    pub fn projection_matrix(&self) -> Mat4 {
        const Z_NEAR: f32 = 0.1;
        const Z_FAR: f32 = 7.0;

        match self.light_type {
            LightType::Directional => Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, Z_NEAR, Z_FAR),
            LightType::Point | LightType::Spot => {
                Mat4::perspective_rh(90f32.to_radians(), 1.0, Z_NEAR, Z_FAR)
            }
        }
    }

    /// Origin of the rays, for shadow volume extrusion.
    pub fn ray(&self) -> LightRay {
        match self.light_type {
            LightType::Directional => LightRay::Directional(self.direction()),
            LightType::Point | LightType::Spot => LightRay::Point(self.position),
        }
    }

    fn color_vec(&self) -> Vec4 {
        Vec4::new(self.color.r, self.color.g, self.color.b, 1.0)
    }

    fn params(&self) -> Vec4 {
        Vec4::new(
            self.attenuation.linear,
            self.attenuation.quadratic,
            self.cut_off_angle.to_radians().cos(),
            self.cut_off_outer_angle.to_radians().cos(),
        )
    }
}

/// Per-light uniforms of the deferred lighting pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightStd140 {
    /// xyz: position.
    pub position: Vec4,
    /// xyz: normalized direction.
    pub direction: Vec4,
    /// rgb: color.
    pub color: Vec4,
    /// linear, quadratic, cos(inner cutoff), cos(outer cutoff).
    pub params: Vec4,
    /// Gizmo transform.
    pub model: Mat4,
}

impl From<&Light> for LightStd140 {
    fn from(light: &Light) -> Self {
        LightStd140 {
            position: light.position.extend(1.0),
            direction: light.direction().extend(0.0),
            color: light.color_vec(),
            params: light.params(),
            model: light.model_matrix(),
        }
    }
}

/// A point light in the forward light arrays.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct PointLightStd140 {
    /// xyz: position.
    pub position: Vec4,
    /// rgb: color.
    pub color: Vec4,
    /// Linear attenuation.
    pub linear: f32,
    /// Quadratic attenuation.
    pub quadratic: f32,
    _pad: [f32; 2],
}

impl From<&Light> for PointLightStd140 {
    fn from(light: &Light) -> Self {
        PointLightStd140 {
            position: light.position.extend(1.0),
            color: light.color_vec(),
            linear: light.attenuation.linear,
            quadratic: light.attenuation.quadratic,
            _pad: [0.0; 2],
        }
    }
}

/// A directional light in the forward light arrays.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct DirectionalLightStd140 {
    /// xyz: normalized direction.
    pub direction: Vec4,
    /// rgb: color.
    pub color: Vec4,
}

impl From<&Light> for DirectionalLightStd140 {
    fn from(light: &Light) -> Self {
        DirectionalLightStd140 {
            direction: light.direction().extend(0.0),
            color: light.color_vec(),
        }
    }
}

/// A spot light in the forward light arrays.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct SpotLightStd140 {
    /// xyz: position.
    pub position: Vec4,
    /// xyz: normalized direction.
    pub direction: Vec4,
    /// rgb: color.
    pub color: Vec4,
    /// linear, quadratic, cos(inner cutoff), cos(outer cutoff).
    pub params: Vec4,
}

impl From<&Light> for SpotLightStd140 {
    fn from(light: &Light) -> Self {
        SpotLightStd140 {
            position: light.position.extend(1.0),
            direction: light.direction().extend(0.0),
            color: light.color_vec(),
            params: light.params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults() {
        let light = Light::new(LightType::Spot);
        assert!(light.render);
        assert!(!light.cast_shadows);
        assert_eq!(light.render_scale, 1.0);
        assert_eq!(light.attenuation, Attenuation { linear: 0.22, quadratic: 0.20 });
        assert_eq!((light.cut_off_angle, light.cut_off_outer_angle), (40.0, 45.0));
    }

    #[test]
    fn direction_is_unit_for_any_rotation() {
        for x in (-180..=180).step_by(45) {
            for y in (-180..=180).step_by(60) {
                for z in (-90..=90).step_by(30) {
                    let light = Light::directional(Vec3::new(x as f32, y as f32, z as f32));
                    assert_relative_eq!(light.direction().length(), 1.0, epsilon = 1.0e-5);
                }
            }
        }
    }

    #[test]
    fn pitched_spot_points_down_and_forward() {
        let light = Light::spot(Vec3::ZERO, Vec3::new(-30.0, 0.0, 0.0));
        let dir = light.direction();
        assert_relative_eq!(dir.x, 0.0, epsilon = 1.0e-6);
        assert_relative_eq!(dir.y, -0.5, epsilon = 1.0e-6);
        assert_relative_eq!(dir.z, -(3f32.sqrt() / 2.0), epsilon = 1.0e-6);
    }

    #[test]
    fn model_matrix_stretches_directed_lights() {
        let point = Light::point(Vec3::new(1.0, 2.0, 3.0));
        let spot = Light::spot(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);

        assert_eq!(point.model_matrix(), Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            spot.model_matrix().transform_vector3(Vec3::Z),
            Vec3::new(0.0, 0.0, 2.0)
        );
    }

    #[test]
    fn view_matrix_survives_vertical_direction() {
        let light = Light::spot(Vec3::new(0.0, 3.0, 0.0), Vec3::new(-90.0, 0.0, 0.0));
        let view = light.view_matrix();
        assert!(view.is_finite());

        let below = view.transform_point3(Vec3::ZERO);
        assert_relative_eq!(below.z, -3.0, epsilon = 1.0e-5);
    }

    #[test]
    fn attenuation_decreases_with_distance() {
        let att = Attenuation::default();
        assert_eq!(att.at(0.0), 1.0);
        assert!(att.at(1.0) > att.at(2.0));
    }

    #[test]
    fn forward_structs_have_std140_sizes() {
        assert_eq!(std::mem::size_of::<PointLightStd140>(), 48);
        assert_eq!(std::mem::size_of::<DirectionalLightStd140>(), 32);
        assert_eq!(std::mem::size_of::<SpotLightStd140>(), 64);
        assert_eq!(std::mem::size_of::<LightStd140>(), 128);
    }
}
