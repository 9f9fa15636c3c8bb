//! Flattening of the scene into the draws of one frame.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Context;
use crate::resource::{DefaultTextures, GeometryBuffer, SamplerCache, Texture, TextureWrapping};
use crate::scene::{MeshPart, TextureKind};

/// One mesh part to draw.
pub struct PartDraw {
    /// Its geometry.
    pub geometry: Arc<GeometryBuffer>,
    /// Offset of its [`ModelUniforms`](super::uniforms::ModelUniforms) entry.
    pub model_offset: u32,
    /// Its textures.
    pub material: wgpu::BindGroup,
}

type SlotKey = (usize, TextureWrapping, TextureWrapping);

/// Material bind groups, keyed by texture identity and wrapping.
///
/// Entries keep their textures alive, so a key is never reused by another texture.
#[derive(Default)]
pub struct MaterialBindGroups {
    entries: HashMap<[SlotKey; 4], (wgpu::BindGroup, [Arc<Texture>; 4])>,
    samplers: SamplerCache,
}

impl MaterialBindGroups {
    const MAX_ENTRIES: usize = 256;

    /// The bind group of the textures of `part`, falling back to `defaults`.
    pub fn get(
        &mut self,
        ctxt: &Context,
        layout: &wgpu::BindGroupLayout,
        part: &MeshPart,
        defaults: &DefaultTextures,
    ) -> wgpu::BindGroup {
        let textures = TextureKind::ALL.map(|kind| part.effective_texture(kind, defaults).clone());
        let key = TextureKind::ALL.map(|kind| {
            let slot = part.slot(kind);
            let texture = part.effective_texture(kind, defaults);
            (Arc::as_ptr(texture) as usize, slot.wrap_s, slot.wrap_t)
        });

        if let Some((bind_group, _)) = self.entries.get(&key) {
            return bind_group.clone();
        }

        if self.entries.len() >= Self::MAX_ENTRIES {
            log::debug!("material bind group cache full, clearing it");
            self.entries.clear();
        }

        let samplers = key.map(|(_, wrap_s, wrap_t)| self.samplers.get(ctxt, wrap_s, wrap_t).clone());

        let entries: Vec<wgpu::BindGroupEntry<'_>> = textures
            .iter()
            .zip(samplers.iter())
            .enumerate()
            .flat_map(|(i, (texture, sampler))| {
                let binding = i as u32 * 2;
                [
                    wgpu::BindGroupEntry {
                        binding,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: binding + 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ]
            })
            .collect();

        let bind_group = ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout,
            entries: &entries,
        });
        drop(entries);

        self.entries.insert(key, (bind_group.clone(), textures));
        bind_group
    }

    /// Number of cached bind groups.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
