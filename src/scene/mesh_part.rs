//! A drawable piece of a static mesh.

use std::sync::Arc;

use crate::resource::{DefaultTextures, GeometryBuffer, Texture};
use crate::scene::material::{Material, TextureSlot};

/// The texture slots of a [`MeshPart`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Base color.
    Diffuse,
    /// Specular intensity.
    Specular,
    /// Tangent-space normal map.
    Bump,
    /// Displacement or detail map.
    Displacement,
}

impl TextureKind {
    /// Every slot, in binding order.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Bump,
        TextureKind::Displacement,
    ];

    /// The RGBA texel of the 1x1 texture used when the slot is empty.
    pub fn default_texel(self) -> [u8; 4] {
        match self {
            TextureKind::Diffuse | TextureKind::Specular => [255, 255, 255, 255],
            TextureKind::Bump => [128, 128, 255, 255],
            TextureKind::Displacement => [0, 0, 0, 255],
        }
    }
}

/// Shared geometry plus its appearance.
#[derive(Clone, Debug)]
pub struct MeshPart {
    geometry: Arc<GeometryBuffer>,
    /// Phong coefficients.
    pub material: Material,
    /// Diffuse texture slot.
    pub diffuse: TextureSlot,
    /// Specular texture slot.
    pub specular: TextureSlot,
    /// Normal map slot.
    pub bump: TextureSlot,
    /// Displacement map slot.
    pub displacement: TextureSlot,
}

impl MeshPart {
    /// A part with the default material and empty texture slots.
    pub fn new(geometry: Arc<GeometryBuffer>) -> Self {
        MeshPart {
            geometry,
            material: Material::DEFAULT,
            diffuse: TextureSlot::default(),
            specular: TextureSlot::default(),
            bump: TextureSlot::default(),
            displacement: TextureSlot::default(),
        }
    }

    /// Sets the material.
    pub fn with_material(mut self, material: impl Into<Material>) -> Self {
        self.material = material.into();
        self
    }

    /// Replaces one texture slot.
    pub fn with_texture(mut self, kind: TextureKind, slot: TextureSlot) -> Self {
        *self.slot_mut(kind) = slot;
        self
    }

    /// The geometry drawn by this part.
    #[inline]
    pub fn geometry(&self) -> &Arc<GeometryBuffer> {
        &self.geometry
    }

    /// One texture slot.
    pub fn slot(&self, kind: TextureKind) -> &TextureSlot {
        match kind {
            TextureKind::Diffuse => &self.diffuse,
            TextureKind::Specular => &self.specular,
            TextureKind::Bump => &self.bump,
            TextureKind::Displacement => &self.displacement,
        }
    }

    /// One texture slot, mutably.
    pub fn slot_mut(&mut self, kind: TextureKind) -> &mut TextureSlot {
        match kind {
            TextureKind::Diffuse => &mut self.diffuse,
            TextureKind::Specular => &mut self.specular,
            TextureKind::Bump => &mut self.bump,
            TextureKind::Displacement => &mut self.displacement,
        }
    }

    /// The texture bound for `kind`: the slot's own, or the renderer default.
    pub fn effective_texture<'a>(
        &'a self,
        kind: TextureKind,
        defaults: &'a DefaultTextures,
    ) -> &'a Arc<Texture> {
        self.slot(kind)
            .texture
            .as_ref()
            .unwrap_or_else(|| default_texture(kind, defaults))
    }
}

/// The fallback texture of a slot.
pub fn default_texture(kind: TextureKind, defaults: &DefaultTextures) -> &Arc<Texture> {
    match kind {
        TextureKind::Diffuse => &defaults.diffuse,
        TextureKind::Specular => &defaults.specular,
        TextureKind::Bump => &defaults.bump,
        TextureKind::Displacement => &defaults.displacement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_fall_back_to_neutral_texels() {
        // Neutral for modulation: the material colors pass through unchanged.
        assert_eq!(TextureKind::Diffuse.default_texel(), [255; 4]);
        assert_eq!(TextureKind::Specular.default_texel(), [255; 4]);
        // A normal map texel decoding to the unperturbed +Z tangent-space normal.
        let [x, y, z, _] = TextureKind::Bump.default_texel();
        let decode = |c: u8| c as f32 / 255.0 * 2.0 - 1.0;
        assert!(decode(x).abs() < 0.01 && decode(y).abs() < 0.01);
        assert_eq!(decode(z), 1.0);
        // No parallax offset.
        assert_eq!(&TextureKind::Displacement.default_texel()[..3], &[0, 0, 0]);
    }
}
