//! Deferred lighting: one full-screen pass per light, accumulated additively.

use std::ops::Range;

use crate::color::Color;
use crate::context::Context;
use crate::light::LightType;
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::pipeline::{color_target, PipelineDesc, ADDITIVE};
use crate::renderer::shadow_pass::ShadowPass;
use crate::renderer::{ClearFlags, RendererConfig};
use crate::resource::render_targets::FRAME_FORMAT;
use crate::resource::{RenderTargets, ShaderProgram};

/// Lights only where no shadow volume left a mark.
fn unshadowed_stencil() -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Equal,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };

    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xff,
        write_mask: 0,
    }
}

/// Reads the G-buffer and writes lit color into the frame.
pub struct LightingPass {
    ambient: wgpu::RenderPipeline,
    point: wgpu::RenderPipeline,
    directional: wgpu::RenderPipeline,
    spot: wgpu::RenderPipeline,
    gbuffer: Option<wgpu::BindGroup>,
}

impl LightingPass {
    /// Creates the ambient pipeline and one pipeline per light type.
    pub fn new(
        ctxt: &Context,
        program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        config: &RendererConfig,
    ) -> Self {
        program.warn_unresolved(&[
            "frame",
            "light",
            "position_texture",
            "normal_texture",
            "albedo_spec_texture",
        ]);

        let bind_group_layouts = [&layouts.frame, &layouts.light, &layouts.gbuffer];
        let replace = [color_target(FRAME_FORMAT, None)];
        let additive = [color_target(FRAME_FORMAT, Some(ADDITIVE))];

        let ambient = PipelineDesc {
            fragment_entry: "fs_ambient",
            ..PipelineDesc::full_screen(
                "lighting_ambient_pipeline",
                program,
                &bind_group_layouts,
                &replace,
                config.sample_count,
            )
        }
        .build(ctxt);

        let light_pipeline = |label: &'static str, fragment_entry: &'static str| {
            PipelineDesc {
                fragment_entry,
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: Context::depth_stencil_format(),
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: unshadowed_stencil(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                ..PipelineDesc::full_screen(
                    label,
                    program,
                    &bind_group_layouts,
                    &additive,
                    config.sample_count,
                )
            }
            .build(ctxt)
        };

        LightingPass {
            ambient,
            point: light_pipeline("lighting_point_pipeline", "fs_point"),
            directional: light_pipeline("lighting_directional_pipeline", "fs_directional"),
            spot: light_pipeline("lighting_spot_pipeline", "fs_spot"),
            gbuffer: None,
        }
    }

    /// Binds the G-buffer of `targets`. Must be called again after a resize.
    pub fn bind_gbuffer(
        &mut self,
        ctxt: &Context,
        layouts: &BindGroupLayouts,
        targets: &RenderTargets,
    ) {
        self.gbuffer = targets.gbuffer().map(|gbuffer| {
            ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("gbuffer_bind_group"),
                layout: &layouts.gbuffer,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.position.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&gbuffer.albedo_spec.view),
                    },
                ],
            })
        });
    }

    /// Clears the frame and writes the ambient term of every covered pixel.
    pub fn record_ambient(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        clear_color: Color,
        clear: ClearFlags,
        frame: &wgpu::BindGroup,
        lights: &wgpu::BindGroup,
    ) {
        let (Some((color, _)), Some(gbuffer)) = (targets.color_target(), &self.gbuffer) else {
            return;
        };

        let load = if clear.contains(ClearFlags::COLOR) {
            wgpu::LoadOp::Clear(to_wgpu_color(clear_color))
        } else {
            wgpu::LoadOp::Load
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lighting_ambient_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
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

        pass.set_pipeline(&self.ambient);
        pass.set_bind_group(0, frame, &[]);
        pass.set_bind_group(1, lights, &[0]);
        pass.set_bind_group(2, gbuffer, &[]);
        pass.draw(0..4, 0..1);
    }

    /// Adds the contribution of one light.
    ///
    /// When `shadow` holds a non-empty volume range, the volumes are rasterized
    /// into the freshly cleared stencil buffer first and the light only reaches
    /// pixels whose stencil stayed at zero.
    #[allow(clippy::too_many_arguments)]
    pub fn record_light(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        light_type: LightType,
        light_offset: u32,
        frame: &wgpu::BindGroup,
        lights: &wgpu::BindGroup,
        shadow: Option<(&ShadowPass, Range<u32>)>,
    ) {
        let (Some((color, _)), Some(depth_stencil), Some(gbuffer)) =
            (targets.color_target(), targets.depth_stencil(), &self.gbuffer)
        else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lighting_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_stencil.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some((shadow, range)) = shadow {
            shadow.draw(&mut pass, frame, range);
        }

        let pipeline = match light_type {
            LightType::Point => &self.point,
            LightType::Directional => &self.directional,
            LightType::Spot => &self.spot,
        };

        pass.set_pipeline(pipeline);
        pass.set_stencil_reference(0);
        pass.set_bind_group(0, frame, &[]);
        pass.set_bind_group(1, lights, &[light_offset]);
        pass.set_bind_group(2, gbuffer, &[]);
        pass.draw(0..4, 0..1);
    }
}

/// Converts a color to a clear value.
pub fn to_wgpu_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}
