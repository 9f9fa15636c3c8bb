//! Uniform blocks shared by the built-in programs.

use bytemuck::{Pod, Zeroable};
use glamx::{Mat3, Mat4, Vec3, Vec4};

use crate::color::{self, Color};
use crate::light::{
    DirectionalLightStd140, Light, LightType, PointLightStd140, SpotLightStd140,
};
use crate::scene::{Material, MeshPart, TextureKind, TextureMappingStd140};

/// Lights of each type the forward program can handle.
pub const MAX_FORWARD_LIGHTS: usize = 32;

/// Per-frame uniforms, bound at group 0 by every program.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    /// World to eye.
    pub view: Mat4,
    /// Eye to clip.
    pub projection: Mat4,
    /// xyz: eye position in world space.
    pub camera_position: Vec4,
    /// rgb: scene ambient light.
    pub ambient: Vec4,
    /// Width, height, sample count, 1 if left-handed.
    pub viewport: Vec4,
}

/// Per-draw uniforms, bound at group 1 with a dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ModelUniforms {
    /// Model to world.
    pub model: Mat4,
    /// Inverse transpose of the model rotation and scale.
    pub normal_matrix: Mat4,
    /// Flat color, for gizmos.
    pub color: Vec4,
    /// rgb: material ambient, w: shininess.
    pub ambient: Vec4,
    /// rgb: material diffuse.
    pub diffuse: Vec4,
    /// rgb: material specular.
    pub specular: Vec4,
    /// Diffuse texture mapping.
    pub diffuse_mapping: TextureMappingStd140,
    /// Specular texture mapping.
    pub specular_mapping: TextureMappingStd140,
    /// Bump texture mapping.
    pub bump_mapping: TextureMappingStd140,
    /// Displacement texture mapping.
    pub displacement_mapping: TextureMappingStd140,
}

impl ModelUniforms {
    /// Uniforms of a mesh part placed by `model`.
    pub fn for_part(model: Mat4, part: &MeshPart, left_handed: bool) -> Self {
        let mapping = |kind| part.slot(kind).mapping(left_handed);

        ModelUniforms {
            model,
            normal_matrix: normal_matrix(&model),
            color: Vec4::ONE,
            diffuse_mapping: mapping(TextureKind::Diffuse),
            specular_mapping: mapping(TextureKind::Specular),
            bump_mapping: mapping(TextureKind::Bump),
            displacement_mapping: mapping(TextureKind::Displacement),
            ..Self::material(&part.material)
        }
    }

    /// Uniforms of a flat colored shape placed by `model`.
    pub fn solid(model: Mat4, color: Color) -> Self {
        ModelUniforms {
            model,
            normal_matrix: normal_matrix(&model),
            color: color::to_vec4(color),
            ..Self::material(&Material::DEFAULT)
        }
    }

    fn material(material: &Material) -> Self {
        let identity = crate::scene::TextureSlot::default().mapping(false);

        ModelUniforms {
            model: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            color: Vec4::ONE,
            ambient: material.ambient.extend(material.shininess),
            diffuse: material.diffuse.extend(1.0),
            specular: material.specular.extend(1.0),
            diffuse_mapping: identity,
            specular_mapping: identity,
            bump_mapping: identity,
            displacement_mapping: identity,
        }
    }
}

/// The matrix transforming normals under `model`.
///
/// Singular models (zero scale) keep their rotation part.
pub fn normal_matrix(model: &Mat4) -> Mat4 {
    let linear = Mat3::from_mat4(*model);
    if linear.determinant().abs() < 1.0e-12 {
        Mat4::from_mat3(linear)
    } else {
        Mat4::from_mat3(linear.inverse().transpose())
    }
}

/// The light arrays of the forward program, bound at group 3.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ForwardLightsStd140 {
    /// Number of point, directional and spot lights.
    pub counts: [u32; 4],
    /// Point lights.
    pub points: [PointLightStd140; MAX_FORWARD_LIGHTS],
    /// Directional lights.
    pub directionals: [DirectionalLightStd140; MAX_FORWARD_LIGHTS],
    /// Spot lights.
    pub spots: [SpotLightStd140; MAX_FORWARD_LIGHTS],
}

impl ForwardLightsStd140 {
    /// Packs `lights` by type. Lights beyond the capacity of an array are dropped.
    ///
    /// Returns the block and the number of dropped lights.
    pub fn pack<'a>(lights: impl IntoIterator<Item = &'a Light>) -> (Self, usize) {
        let mut block = ForwardLightsStd140::zeroed();
        let mut dropped = 0;

        for light in lights {
            let slot = match light.light_type() {
                LightType::Point => 0,
                LightType::Directional => 1,
                LightType::Spot => 2,
            };
            let i = block.counts[slot] as usize;
            if i >= MAX_FORWARD_LIGHTS {
                dropped += 1;
                continue;
            }

            match light.light_type() {
                LightType::Point => block.points[i] = light.into(),
                LightType::Directional => block.directionals[i] = light.into(),
                LightType::Spot => block.spots[i] = light.into(),
            }
            block.counts[slot] += 1;
        }

        (block, dropped)
    }
}

impl FrameUniforms {
    /// Frame uniforms for the given camera.
    pub fn new(
        view: Mat4,
        projection: Mat4,
        camera_position: Vec3,
        ambient: Vec3,
        size: (u32, u32),
        sample_count: u32,
        left_handed: bool,
    ) -> Self {
        FrameUniforms {
            view,
            projection,
            camera_position: camera_position.extend(1.0),
            ambient: ambient.extend(1.0),
            viewport: Vec4::new(
                size.0 as f32,
                size.1 as f32,
                sample_count as f32,
                if left_handed { 1.0 } else { 0.0 },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn block_sizes_match_the_shaders() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 176);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 576);
        assert_eq!(std::mem::size_of::<ForwardLightsStd140>(), 16 + 32 * (48 + 32 + 64));
    }

    #[test]
    fn normals_follow_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(&model).transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(n.x, 0.5);
        assert_relative_eq!(n.y, 1.0);
    }

    #[test]
    fn forward_arrays_drop_overflowing_lights() {
        let lights: Vec<Light> = (0..MAX_FORWARD_LIGHTS + 3)
            .map(|i| Light::point(Vec3::new(i as f32, 0.0, 0.0)))
            .chain(std::iter::once(Light::directional(Vec3::ZERO)))
            .collect();

        let (block, dropped) = ForwardLightsStd140::pack(&lights);
        assert_eq!(dropped, 3);
        assert_eq!(block.counts, [MAX_FORWARD_LIGHTS as u32, 1, 0, 0]);
        assert_eq!(block.points[5].position, Vec4::new(5.0, 0.0, 0.0, 1.0));
    }
}
