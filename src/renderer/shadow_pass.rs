//! Stencil shadow volumes.
//!
//! Volumes are extruded on the CPU (see [`ShadowVolumeBuilder`]) for every
//! shadow-casting light, uploaded once per frame, and rasterized at the start
//! of the light's lighting pass. Only the stencil buffer is written: it ends
//! up non-zero where the light is occluded.

use std::ops::Range;

use crate::context::Context;
use crate::light::Light;
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::RendererConfig;
use crate::renderer::pipeline::PipelineDesc;
use crate::resource::render_targets::FRAME_FORMAT;
use crate::resource::{ShaderProgram, ShadowVolumeBuilder};
use crate::scene::{Handle, StaticMesh};

const VOLUME_VERTEX_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x4],
}];

/// Depth-fail stencil updates for the faces of a shadow volume.
pub fn volume_stencil() -> wgpu::StencilState {
    let face = |depth_fail_op| wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op,
        pass_op: wgpu::StencilOperation::Keep,
    };

    wgpu::StencilState {
        front: face(wgpu::StencilOperation::DecrementWrap),
        back: face(wgpu::StencilOperation::IncrementWrap),
        read_mask: 0xff,
        write_mask: 0xff,
    }
}

/// Shadow volume geometry and pipeline.
pub struct ShadowPass {
    ctxt: Context,
    pipeline: wgpu::RenderPipeline,
    builder: ShadowVolumeBuilder,
    vertices: Vec<[f32; 4]>,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl ShadowPass {
    /// Creates the pipeline and an initial vertex buffer.
    pub fn new(
        ctxt: &Context,
        program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        config: &RendererConfig,
    ) -> Self {
        program.warn_unresolved(&["frame"]);

        let unclipped_depth = ctxt.supports_depth_clamp();
        if !unclipped_depth {
            log::warn!("depth clamping unavailable, shadow volumes rely on clamping in the shader");
        }

        // Color writes are masked: only the stencil changes.
        let targets = [Some(wgpu::ColorTargetState {
            format: FRAME_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::empty(),
        })];

        let pipeline = PipelineDesc {
            label: "shadow_volume_pipeline",
            program,
            fragment_entry: "fs_main",
            bind_group_layouts: &[&layouts.frame],
            vertex_buffers: VOLUME_VERTEX_BUFFERS,
            targets: &targets,
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: config.front_face(),
            cull_mode: None,
            unclipped_depth,
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Context::depth_stencil_format(),
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: volume_stencil(),
                bias: wgpu::DepthBiasState {
                    constant: 4,
                    slope_scale: 1.0,
                    clamp: 0.0,
                },
            }),
            sample_count: config.sample_count,
        }
        .build(ctxt);

        let capacity = 4096 * std::mem::size_of::<[f32; 4]>() as u64;

        ShadowPass {
            ctxt: ctxt.clone(),
            pipeline,
            builder: ShadowVolumeBuilder::new(),
            vertices: Vec::new(),
            buffer: create_volume_buffer(ctxt, capacity),
            capacity,
        }
    }

    /// Extrudes the volumes of `light` cast by the visible shadow casters of `meshes`.
    ///
    /// Returns the range of vertices to draw for this light; it is empty when
    /// nothing casts a shadow.
    pub fn extrude(&mut self, light: &Light, meshes: &[Handle<StaticMesh>]) -> Range<u32> {
        let start = self.vertices.len() as u32;
        let ray = light.ray();

        for mesh in meshes {
            let mesh = mesh.borrow();
            if !mesh.visible || !mesh.cast_shadows {
                continue;
            }

            let model = mesh.model_matrix();
            for part in mesh.parts() {
                if let Some(adjacency) = part.geometry().adjacency() {
                    self.builder
                        .extrude(adjacency, &model, ray, &mut self.vertices);
                }
            }
        }

        start..self.vertices.len() as u32
    }

    /// Discards the volumes of the previous frame.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Uploads the volumes of this frame.
    pub fn upload(&mut self) {
        if self.vertices.is_empty() {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let required = bytes.len() as u64;

        if required > self.capacity {
            self.capacity = required.next_power_of_two();
            log::debug!("growing the shadow volume buffer to {} bytes", self.capacity);
            self.buffer = create_volume_buffer(&self.ctxt, self.capacity);
        }

        self.ctxt.write_buffer(&self.buffer, 0, bytes);
    }

    /// Rasterizes the volume vertices in `range` into the stencil buffer.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, frame: &wgpu::BindGroup, range: Range<u32>) {
        if range.is_empty() {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame, &[]);
        pass.set_vertex_buffer(0, self.buffer.slice(..));
        pass.draw(range, 0..1);
    }
}

fn create_volume_buffer(ctxt: &Context, size: u64) -> wgpu::Buffer {
    ctxt.create_buffer(&wgpu::BufferDescriptor {
        label: Some("shadow_volume_buffer"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_faces_increment_front_faces_decrement() {
        let stencil = volume_stencil();
        assert_eq!(stencil.back.depth_fail_op, wgpu::StencilOperation::IncrementWrap);
        assert_eq!(stencil.front.depth_fail_op, wgpu::StencilOperation::DecrementWrap);
        assert_eq!(stencil.front.pass_op, wgpu::StencilOperation::Keep);
        assert!(stencil.is_enabled());
    }
}
