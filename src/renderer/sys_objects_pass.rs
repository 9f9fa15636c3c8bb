//! Objects drawn on top of the lit frame: the skybox and the light gizmos.

use crate::context::Context;
use crate::renderer::layouts::BindGroupLayouts;
use crate::renderer::pipeline::{color_target, depth_state, PipelineDesc};
use crate::renderer::RendererConfig;
use crate::resource::render_targets::FRAME_FORMAT;
use crate::resource::{GeometryBuffer, RenderTargets, ShaderProgram};

const GIZMO_STENCIL: u32 = 1;

/// A light gizmo to draw.
#[derive(Copy, Clone, Debug)]
pub struct GizmoDraw {
    /// Model uniform offset of the gizmo itself.
    pub model_offset: u32,
    /// Model uniform offset of its enlarged outline, if outlined.
    pub outline_offset: Option<u32>,
}

fn stencil(compare: wgpu::CompareFunction, pass_op: wgpu::StencilOperation, write_mask: u32) -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };

    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xff,
        write_mask,
    }
}

/// Skybox and gizmo pipelines. This pass also resolves multisampled frames.
pub struct SysObjectsPass {
    skybox: wgpu::RenderPipeline,
    gizmo: wgpu::RenderPipeline,
    outline: Option<wgpu::RenderPipeline>,
}

impl SysObjectsPass {
    /// Creates the pipelines. The outline pipeline only exists when `config` outlines gizmos.
    pub fn new(
        ctxt: &Context,
        skybox_program: &ShaderProgram,
        solid_program: &ShaderProgram,
        layouts: &BindGroupLayouts,
        config: &RendererConfig,
    ) -> Self {
        skybox_program.warn_unresolved(&["frame", "sky_texture"]);
        solid_program.warn_unresolved(&["frame", "model"]);

        let targets = [color_target(FRAME_FORMAT, None)];
        let solid_layouts = [&layouts.frame, &layouts.model];

        let skybox = PipelineDesc {
            cull_mode: None,
            depth_stencil: Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
            ..PipelineDesc::mesh(
                "skybox_pipeline",
                skybox_program,
                &[&layouts.frame, &layouts.cube],
                &targets,
                config.front_face(),
                config.sample_count,
            )
        }
        .build(ctxt);

        let gizmo = PipelineDesc {
            depth_stencil: Some(wgpu::DepthStencilState {
                stencil: stencil(
                    wgpu::CompareFunction::Always,
                    wgpu::StencilOperation::Replace,
                    0xff,
                ),
                ..depth_state(true, wgpu::CompareFunction::Less)
            }),
            ..PipelineDesc::mesh(
                "gizmo_pipeline",
                solid_program,
                &solid_layouts,
                &targets,
                config.front_face(),
                config.sample_count,
            )
        }
        .build(ctxt);

        let outline = config.uses_gizmo_outline().then(|| {
            PipelineDesc {
                depth_stencil: Some(wgpu::DepthStencilState {
                    stencil: stencil(
                        wgpu::CompareFunction::NotEqual,
                        wgpu::StencilOperation::Keep,
                        0,
                    ),
                    ..depth_state(false, wgpu::CompareFunction::Always)
                }),
                ..PipelineDesc::mesh(
                    "gizmo_outline_pipeline",
                    solid_program,
                    &solid_layouts,
                    &targets,
                    config.front_face(),
                    config.sample_count,
                )
            }
            .build(ctxt)
        });

        SysObjectsPass {
            skybox,
            gizmo,
            outline,
        }
    }

    /// Draws the skybox behind the scene and the gizmos, then resolves the frame.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        frame: &wgpu::BindGroup,
        models: &wgpu::BindGroup,
        skybox: Option<(&wgpu::BindGroup, &GeometryBuffer)>,
        gizmo_geometry: &GeometryBuffer,
        gizmos: &[GizmoDraw],
    ) {
        let (Some((color, resolve_target)), Some(depth_stencil)) =
            (targets.color_target(), targets.depth_stencil())
        else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sys_objects_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                depth_slice: None,
                resolve_target,
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

        if let Some((sky, geometry)) = skybox {
            pass.set_pipeline(&self.skybox);
            pass.set_bind_group(0, frame, &[]);
            pass.set_bind_group(1, sky, &[]);
            geometry.draw(&mut pass);
        }

        if gizmos.is_empty() {
            return;
        }

        pass.set_stencil_reference(GIZMO_STENCIL);
        pass.set_pipeline(&self.gizmo);
        pass.set_bind_group(0, frame, &[]);
        for gizmo in gizmos {
            pass.set_bind_group(1, models, &[gizmo.model_offset]);
            gizmo_geometry.draw(&mut pass);
        }

        if let Some(outline) = &self.outline {
            pass.set_pipeline(outline);
            for offset in gizmos.iter().filter_map(|gizmo| gizmo.outline_offset) {
                pass.set_bind_group(1, models, &[offset]);
                gizmo_geometry.draw(&mut pass);
            }
        }
    }

    /// Whether gizmos get an outline.
    pub fn outlines_gizmos(&self) -> bool {
        self.outline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_is_kept_out_of_the_gizmo() {
        let gizmo = stencil(wgpu::CompareFunction::Always, wgpu::StencilOperation::Replace, 0xff);
        let outline = stencil(wgpu::CompareFunction::NotEqual, wgpu::StencilOperation::Keep, 0);

        assert_eq!(gizmo.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(outline.front.compare, wgpu::CompareFunction::NotEqual);
        assert_eq!(outline.write_mask, 0);
    }
}
