//! Render pipeline construction from a [`ShaderProgram`].

use crate::context::Context;
use crate::resource::{ShaderProgram, Vertex};

/// Everything that varies between the renderer's pipelines.
pub struct PipelineDesc<'a> {
    /// Debug label.
    pub label: &'a str,
    /// Program providing `vs_main` and the fragment entry point.
    pub program: &'a ShaderProgram,
    /// Fragment entry point.
    pub fragment_entry: &'a str,
    /// Bind group layouts, in group order.
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    /// Vertex buffers. Empty for full-screen passes.
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    /// Color targets.
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    /// Primitive topology.
    pub topology: wgpu::PrimitiveTopology,
    /// Front-face winding.
    pub front_face: wgpu::FrontFace,
    /// Culled faces.
    pub cull_mode: Option<wgpu::Face>,
    /// Depth clamping instead of clipping.
    pub unclipped_depth: bool,
    /// Depth and stencil state.
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    /// Samples per pixel.
    pub sample_count: u32,
}

impl<'a> PipelineDesc<'a> {
    /// A triangle-list pipeline drawing [`Vertex`] buffers with back-face culling.
    pub fn mesh(
        label: &'a str,
        program: &'a ShaderProgram,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
        targets: &'a [Option<wgpu::ColorTargetState>],
        front_face: wgpu::FrontFace,
        sample_count: u32,
    ) -> Self {
        PipelineDesc {
            label,
            program,
            fragment_entry: "fs_main",
            bind_group_layouts,
            vertex_buffers: MESH_VERTEX_BUFFERS,
            targets,
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            depth_stencil: Some(depth_state(true, wgpu::CompareFunction::Less)),
            sample_count,
        }
    }

    /// A 4-vertex triangle strip covering the target, without vertex buffers.
    pub fn full_screen(
        label: &'a str,
        program: &'a ShaderProgram,
        bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
        targets: &'a [Option<wgpu::ColorTargetState>],
        sample_count: u32,
    ) -> Self {
        PipelineDesc {
            label,
            program,
            fragment_entry: "fs_main",
            bind_group_layouts,
            vertex_buffers: &[],
            targets,
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            depth_stencil: None,
            sample_count,
        }
    }

    /// Creates the pipeline.
    pub fn build(&self, ctxt: &Context) -> wgpu::RenderPipeline {
        log::debug!("creating pipeline '{}'", self.label);

        let layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(self.label),
            bind_group_layouts: self.bind_group_layouts,
            push_constant_ranges: &[],
        });

        ctxt.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: self.program.vertex_module(),
                entry_point: Some("vs_main"),
                buffers: self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.program.fragment_module(),
                entry_point: Some(self.fragment_entry),
                targets: self.targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: self.topology,
                strip_index_format: None,
                front_face: self.front_face,
                cull_mode: self.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: self.unclipped_depth,
                conservative: false,
            },
            depth_stencil: self.depth_stencil.clone(),
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

const MESH_VERTEX_BUFFERS: &[wgpu::VertexBufferLayout<'static>] = &[Vertex::LAYOUT];

/// Depth test without stencil.
pub fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: Context::depth_stencil_format(),
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// One color target of `format`.
pub fn color_target(
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// `src + dst`, used to accumulate lights.
pub const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};
