//! Copies the lit frame into the output through the post-processing program.

use crate::color::Color;
use crate::context::Context;
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::lighting_pass::to_wgpu_color;
use crate::renderer::pipeline::{color_target, PipelineDesc};
use crate::renderer::ClearFlags;
use crate::resource::{RenderTargets, ShaderProgram};

/// Full-screen post-processing into the output format.
pub struct FinalPass {
    pipeline: wgpu::RenderPipeline,
    screen: Option<wgpu::BindGroup>,
}

impl FinalPass {
    /// Creates the pipeline for outputs of `format`.
    pub fn new(
        ctxt: &Context,
        program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        program.warn_unresolved(&["screen_texture"]);

        let targets = [color_target(format, None)];
        let pipeline =
            PipelineDesc::full_screen("post_processing_pipeline", program, &[&layouts.screen], &targets, 1)
                .build(ctxt);

        FinalPass {
            pipeline,
            screen: None,
        }
    }

    /// Binds the frame buffer of `targets`. Must be called again after a resize.
    pub fn bind_frame(&mut self, ctxt: &Context, layouts: &BindGroupLayouts, targets: &RenderTargets) {
        self.screen = targets.frame().map(|frame| {
            ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("screen_bind_group"),
                layout: &layouts.screen,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&frame.color.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&frame.sampler),
                    },
                ],
            })
        });
    }

    /// Draws the frame into `output`.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        clear_color: Color,
        clear: ClearFlags,
    ) {
        let Some(screen) = &self.screen else {
            return;
        };

        let load = if clear.contains(ClearFlags::COLOR) {
            wgpu::LoadOp::Clear(to_wgpu_color(clear_color))
        } else {
            wgpu::LoadOp::Load
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("post_processing_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, screen, &[]);
        pass.draw(0..4, 0..1);
    }
}
