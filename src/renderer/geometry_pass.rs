//! Fills the G-buffer.

use crate::context::Context;
use crate::renderer::draw_list::PartDraw;
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::pipeline::{color_target, PipelineDesc};
use crate::renderer::{ClearFlags, RendererConfig};
use crate::resource::{GBuffer, RenderTargets, ShaderProgram};

/// Writes position, normal and albedo-specular of every visible mesh part.
pub struct GeometryPass {
    pipeline: wgpu::RenderPipeline,
}

impl GeometryPass {
    /// Creates the pipeline.
    pub fn new(
        ctxt: &Context,
        program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        config: &RendererConfig,
    ) -> Self {
        program.warn_unresolved(&["frame", "model", "diffuse_texture", "bump_texture"]);

        let targets = GBuffer::formats().map(|format| color_target(format, None));
        let pipeline = PipelineDesc::mesh(
            "gbuffer_pipeline",
            program,
            &[&layouts.frame, &layouts.model, &layouts.material],
            &targets,
            config.front_face(),
            config.sample_count,
        )
        .build(ctxt);

        GeometryPass { pipeline }
    }

    /// Clears the G-buffer and draws `parts` into it.
    ///
    /// The color attachments are always cleared: a zero normal marks pixels
    /// not covered by any geometry.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        clear: ClearFlags,
        frame: &wgpu::BindGroup,
        models: &wgpu::BindGroup,
        parts: &[PartDraw],
    ) {
        let (Some(gbuffer), Some(depth_stencil)) = (targets.gbuffer(), targets.depth_stencil())
        else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("geometry_pass"),
            color_attachments: &[
                cleared(&gbuffer.position.view),
                cleared(&gbuffer.normal.view),
                cleared(&gbuffer.albedo_spec.view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_stencil.view,
                depth_ops: Some(depth_ops(clear)),
                stencil_ops: Some(stencil_ops(clear)),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame, &[]);

        for part in parts {
            pass.set_bind_group(1, models, &[part.model_offset]);
            pass.set_bind_group(2, &part.material, &[]);
            part.geometry.draw(&mut pass);
        }
    }
}

fn cleared(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

/// Depth operations for `clear`.
pub fn depth_ops(clear: ClearFlags) -> wgpu::Operations<f32> {
    wgpu::Operations {
        load: if clear.contains(ClearFlags::DEPTH) {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        },
        store: wgpu::StoreOp::Store,
    }
}

/// Stencil operations for `clear`.
pub fn stencil_ops(clear: ClearFlags) -> wgpu::Operations<u32> {
    wgpu::Operations {
        load: if clear.contains(ClearFlags::STENCIL) {
            wgpu::LoadOp::Clear(0)
        } else {
            wgpu::LoadOp::Load
        },
        store: wgpu::StoreOp::Store,
    }
}
