//! Single-pass forward shading, lighting every fragment with all lights at once.

use crate::color::Color;
use crate::context::Context;
use crate::renderer::draw_list::PartDraw;
use crate::renderer::geometry_pass::{depth_ops, stencil_ops};
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::lighting_pass::to_wgpu_color;
use crate::renderer::pipeline::{color_target, PipelineDesc};
use crate::renderer::{ClearFlags, RendererConfig};
use crate::resource::render_targets::FRAME_FORMAT;
use crate::resource::{RenderTargets, ShaderProgram};

/// Draws mesh parts lit by the light arrays straight into the frame.
pub struct ForwardPass {
    pipeline: wgpu::RenderPipeline,
}

impl ForwardPass {
    /// Creates the pipeline.
    pub fn new(
        ctxt: &Context,
        program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        config: &RendererConfig,
    ) -> Self {
        program.warn_unresolved(&["frame", "model", "diffuse_texture", "lights"]);

        let targets = [color_target(FRAME_FORMAT, None)];
        let pipeline = PipelineDesc::mesh(
            "forward_pipeline",
            program,
            &[
                &layouts.frame,
                &layouts.model,
                &layouts.material,
                &layouts.forward_lights,
            ],
            &targets,
            config.front_face(),
            config.sample_count,
        )
        .build(ctxt);

        ForwardPass { pipeline }
    }

    /// Clears the frame according to `clear` and draws `parts`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        clear_color: Color,
        clear: ClearFlags,
        frame: &wgpu::BindGroup,
        models: &wgpu::BindGroup,
        lights: &wgpu::BindGroup,
        parts: &[PartDraw],
    ) {
        let (Some((color, _)), Some(depth_stencil)) =
            (targets.color_target(), targets.depth_stencil())
        else {
            return;
        };

        let load = if clear.contains(ClearFlags::COLOR) {
            wgpu::LoadOp::Clear(to_wgpu_color(clear_color))
        } else {
            wgpu::LoadOp::Load
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("forward_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
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
        pass.set_bind_group(3, lights, &[]);

        for part in parts {
            pass.set_bind_group(1, models, &[part.model_offset]);
            pass.set_bind_group(2, &part.material, &[]);
            part.geometry.draw(&mut pass);
        }
    }
}
