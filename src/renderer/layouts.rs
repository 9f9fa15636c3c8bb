//! Bind group layouts shared by the passes.
//!
//! | group | deferred geometry | lighting      | shadow | gizmo  | skybox | forward       | final  |
//! |-------|-------------------|---------------|--------|--------|--------|---------------|--------|
//! | 0     | frame             | frame         | frame  | frame  | frame  | frame         | screen |
//! | 1     | model             | light         |        | model  | cube   | model         |        |
//! | 2     | material          | G-buffer      |        |        |        | material      |        |
//! | 3     |                   |               |        |        |        | light arrays  |        |

use crate::context::Context;
use crate::light::LightStd140;
use crate::renderer::uniforms::{ForwardLightsStd140, FrameUniforms, ModelUniforms};
use crate::resource::DynamicUniformBuffer;

/// Every bind group layout of the renderer.
pub struct BindGroupLayouts {
    /// Frame uniforms.
    pub frame: wgpu::BindGroupLayout,
    /// Model uniforms, dynamic offset.
    pub model: wgpu::BindGroupLayout,
    /// Diffuse, specular, bump and displacement textures with their samplers.
    pub material: wgpu::BindGroupLayout,
    /// Light uniforms, dynamic offset.
    pub light: wgpu::BindGroupLayout,
    /// Position, normal and albedo-specular G-buffer textures.
    pub gbuffer: wgpu::BindGroupLayout,
    /// Forward light arrays.
    pub forward_lights: wgpu::BindGroupLayout,
    /// Cube texture and sampler.
    pub cube: wgpu::BindGroupLayout,
    /// Frame buffer texture and sampler.
    pub screen: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    /// Creates the layouts. The G-buffer layout depends on `multisampled`.
    pub fn new(ctxt: &Context, multisampled: bool) -> Self {
        let all = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

        let uniform = |label: &str, size: u64, dynamic: bool| {
            ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: all,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: dynamic,
                        min_binding_size: wgpu::BufferSize::new(size),
                    },
                    count: None,
                }],
            })
        };

        let material_entries: Vec<_> = (0..4)
            .flat_map(|i| [texture_entry(i * 2, wgpu::TextureViewDimension::D2), sampler_entry(i * 2 + 1)])
            .collect();

        let gbuffer_entries: Vec<_> = (0..3)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled,
                },
                count: None,
            })
            .collect();

        BindGroupLayouts {
            frame: uniform(
                "frame_bind_group_layout",
                std::mem::size_of::<FrameUniforms>() as u64,
                false,
            ),
            model: uniform(
                "model_bind_group_layout",
                DynamicUniformBuffer::<ModelUniforms>::binding_size().get(),
                true,
            ),
            light: uniform(
                "light_bind_group_layout",
                DynamicUniformBuffer::<LightStd140>::binding_size().get(),
                true,
            ),
            forward_lights: uniform(
                "forward_lights_bind_group_layout",
                std::mem::size_of::<ForwardLightsStd140>() as u64,
                false,
            ),
            material: ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("material_bind_group_layout"),
                entries: &material_entries,
            }),
            gbuffer: ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("gbuffer_bind_group_layout"),
                entries: &gbuffer_entries,
            }),
            cube: ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("cube_bind_group_layout"),
                entries: &[
                    texture_entry(0, wgpu::TextureViewDimension::Cube),
                    sampler_entry(1),
                ],
            }),
            screen: ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("screen_bind_group_layout"),
                entries: &[texture_entry(0, wgpu::TextureViewDimension::D2), sampler_entry(1)],
            }),
        }
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// A uniform buffer binding covering one entry of a dynamic buffer.
pub fn dynamic_entry<T: bytemuck::Pod>(buffer: &DynamicUniformBuffer<T>) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding: 0,
        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: buffer.buffer(),
            offset: 0,
            size: Some(DynamicUniformBuffer::<T>::binding_size()),
        }),
    }
}
