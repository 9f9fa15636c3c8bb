//! Render targets of the frame pipeline.
//!
//! The deferred pipeline renders into a G-buffer (position, normal and
//! albedo/specular attachments sharing one depth-stencil attachment), accumulates
//! lighting into a floating point frame buffer, and finally post-processes that
//! frame buffer into the output, which is either a window surface or an
//! offscreen texture that can be read back.

use crate::context::Context;
use crate::error::{RendererError, Result};

/// Format of the G-buffer world position attachment.
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the G-buffer normal attachment.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the G-buffer albedo (rgb) and specular intensity (a) attachment.
pub const ALBEDO_SPEC_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the lighting accumulation buffer.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// A texture and its default view.
pub struct Attachment {
    /// The texture.
    pub texture: wgpu::Texture,
    /// Its view.
    pub view: wgpu::TextureView,
}

impl Attachment {
    fn new(
        ctxt: &Context,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> Attachment {
        log::debug!(
            "creating attachment '{}' {}x{} {:?} x{}",
            label,
            width,
            height,
            format,
            sample_count
        );

        let texture = ctxt.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Attachment { texture, view }
    }
}

/// The geometry pass outputs.
pub struct GBuffer {
    /// World-space position.
    pub position: Attachment,
    /// World-space normal, zero where nothing was drawn.
    pub normal: Attachment,
    /// Albedo in rgb, specular intensity in a.
    pub albedo_spec: Attachment,
}

impl GBuffer {
    fn new(ctxt: &Context, size: (u32, u32), sample_count: u32) -> GBuffer {
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        GBuffer {
            position: Attachment::new(ctxt, "gbuffer_position", size, POSITION_FORMAT, sample_count, usage),
            normal: Attachment::new(ctxt, "gbuffer_normal", size, NORMAL_FORMAT, sample_count, usage),
            albedo_spec: Attachment::new(ctxt, "gbuffer_albedo_spec", size, ALBEDO_SPEC_FORMAT, sample_count, usage),
        }
    }

    /// The geometry pass color targets, in attachment order.
    pub fn formats() -> [wgpu::TextureFormat; 3] {
        [POSITION_FORMAT, NORMAL_FORMAT, ALBEDO_SPEC_FORMAT]
    }
}

/// The lighting accumulation target, sampled by the final pass.
pub struct FrameBuffer {
    /// Single-sampled color (resolve target when multisampling).
    pub color: Attachment,
    /// Linear clamp sampler for post-processing.
    pub sampler: wgpu::Sampler,
}

impl FrameBuffer {
    fn new(ctxt: &Context, size: (u32, u32)) -> FrameBuffer {
        let color = Attachment::new(
            ctxt,
            "frame_color",
            size,
            FRAME_FORMAT,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );

        let sampler = ctxt.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        FrameBuffer { color, sampler }
    }
}

/// All intermediate targets, sized to the output.
pub struct RenderTargets {
    ctxt: Context,
    width: u32,
    height: u32,
    sample_count: u32,
    deferred: bool,
    gbuffer: Option<GBuffer>,
    depth_stencil: Option<Attachment>,
    msaa: Option<Attachment>,
    frame: Option<FrameBuffer>,
}

impl RenderTargets {
    /// Creates the targets. The G-buffer only exists when `deferred` is set.
    pub fn new(
        ctxt: &Context,
        width: u32,
        height: u32,
        sample_count: u32,
        deferred: bool,
    ) -> Result<RenderTargets> {
        validate_sample_count(ctxt, sample_count, deferred)?;

        let mut targets = RenderTargets {
            ctxt: ctxt.clone(),
            width,
            height,
            sample_count,
            deferred,
            gbuffer: None,
            depth_stencil: None,
            msaa: None,
            frame: None,
        };
        targets.init(width, height)?;
        Ok(targets)
    }

    fn init(&mut self, width: u32, height: u32) -> Result<()> {
        check_size(width, height)?;

        let ctxt = &self.ctxt;
        let size = (width, height);

        if self.deferred {
            self.gbuffer = Some(GBuffer::new(ctxt, size, self.sample_count));
        }

        self.depth_stencil = Some(Attachment::new(
            ctxt,
            "depth_stencil",
            size,
            Context::depth_stencil_format(),
            self.sample_count,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        ));

        if self.sample_count > 1 {
            self.msaa = Some(Attachment::new(
                ctxt,
                "msaa_color",
                size,
                FRAME_FORMAT,
                self.sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ));
        }

        self.frame = Some(FrameBuffer::new(ctxt, size));
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Destroys every target, in reverse creation order. Calling it twice is harmless.
    pub fn free(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.color.texture.destroy();
        }
        if let Some(msaa) = self.msaa.take() {
            msaa.texture.destroy();
        }
        if let Some(depth) = self.depth_stencil.take() {
            depth.texture.destroy();
        }
        if let Some(gbuffer) = self.gbuffer.take() {
            gbuffer.albedo_spec.texture.destroy();
            gbuffer.normal.texture.destroy();
            gbuffer.position.texture.destroy();
        }
    }

    /// Recreates every target at the new size. The current targets are kept if
    /// the size is invalid.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if (width, height) == (self.width, self.height) && self.frame.is_some() {
            return Ok(());
        }

        check_size(width, height)?;
        self.free();
        self.init(width, height)
    }

    /// Whether the targets are allocated.
    pub fn is_allocated(&self) -> bool {
        self.frame.is_some()
    }

    /// Size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Samples per pixel of the G-buffer, depth-stencil and lighting targets.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// The G-buffer (deferred mode only).
    pub fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    /// The shared depth-stencil attachment.
    pub fn depth_stencil(&self) -> Option<&Attachment> {
        self.depth_stencil.as_ref()
    }

    /// The single-sampled frame buffer.
    pub fn frame(&self) -> Option<&FrameBuffer> {
        self.frame.as_ref()
    }

    /// The view to render lit color into, and the view it resolves to, if multisampled.
    pub fn color_target(&self) -> Option<(&wgpu::TextureView, Option<&wgpu::TextureView>)> {
        let frame = self.frame.as_ref()?;
        match &self.msaa {
            Some(msaa) => Some((&msaa.view, Some(&frame.color.view))),
            None => Some((&frame.color.view, None)),
        }
    }
}

impl Drop for RenderTargets {
    fn drop(&mut self) {
        self.free();
    }
}

/// Fails with [`RendererError::IncompleteRenderTarget`] if either dimension is zero.
pub fn check_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RendererError::IncompleteRenderTarget {
            target: "frame",
            message: format!("invalid size {}x{}", width, height),
        });
    }
    Ok(())
}

fn validate_sample_count(ctxt: &Context, sample_count: u32, deferred: bool) -> Result<()> {
    if !sample_count.is_power_of_two() || sample_count > 16 {
        return Err(RendererError::UnsupportedSampleCount(sample_count));
    }

    let mut formats = vec![FRAME_FORMAT, Context::depth_stencil_format()];
    if deferred {
        formats.extend(GBuffer::formats());
    }

    if formats
        .into_iter()
        .all(|f| ctxt.supports_sample_count(f, sample_count))
    {
        Ok(())
    } else {
        Err(RendererError::UnsupportedSampleCount(sample_count))
    }
}

/// An offscreen, readable, output texture.
pub struct OffscreenBuffers {
    /// The color texture the final pass renders to.
    pub color: Attachment,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl OffscreenBuffers {
    /// Creates an output texture of the context surface format.
    pub fn new(ctxt: &Context, width: u32, height: u32) -> OffscreenBuffers {
        let width = width.max(1);
        let height = height.max(1);

        OffscreenBuffers {
            color: Attachment::new(
                ctxt,
                "offscreen_output",
                (width, height),
                ctxt.surface_format,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            ),
            width,
            height,
        }
    }
}

/// Where the final image goes.
pub enum RenderOutput {
    /// A window surface.
    Screen {
        /// The surface.
        surface: wgpu::Surface<'static>,
        /// Its current configuration.
        config: wgpu::SurfaceConfiguration,
    },
    /// A texture that can be read back with [`RenderOutput::read_pixels`].
    Offscreen(OffscreenBuffers),
}

/// The output image of one frame.
pub struct OutputFrame {
    /// View the final pass renders into.
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl OutputFrame {
    /// Presents the image if it belongs to a surface.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

impl RenderOutput {
    /// Configures `surface` and wraps it as an output.
    pub fn screen(
        ctxt: &Context,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> RenderOutput {
        let caps = surface.get_capabilities(&ctxt.adapter);
        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: ctxt.surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctxt.device, &config);

        RenderOutput::Screen { surface, config }
    }

    /// An offscreen output of the given size.
    pub fn offscreen(ctxt: &Context, width: u32, height: u32) -> RenderOutput {
        RenderOutput::Offscreen(OffscreenBuffers::new(ctxt, width, height))
    }

    /// Format of the output image.
    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            RenderOutput::Screen { config, .. } => config.format,
            RenderOutput::Offscreen(buffers) => buffers.color.texture.format(),
        }
    }

    /// Size in pixels.
    pub fn size(&self) -> (u32, u32) {
        match self {
            RenderOutput::Screen { config, .. } => (config.width, config.height),
            RenderOutput::Offscreen(buffers) => (buffers.width, buffers.height),
        }
    }

    /// Resizes the output.
    pub fn resize(&mut self, ctxt: &Context, width: u32, height: u32) {
        match self {
            RenderOutput::Screen { surface, config } => {
                config.width = width.max(1);
                config.height = height.max(1);
                surface.configure(&ctxt.device, config);
            }
            RenderOutput::Offscreen(buffers) => {
                if (buffers.width, buffers.height) != (width, height) {
                    buffers.color.texture.destroy();
                    *buffers = OffscreenBuffers::new(ctxt, width, height);
                }
            }
        }
    }

    /// Gets the image to render into, or `None` if this frame must be skipped.
    pub fn acquire(&mut self, ctxt: &Context) -> Option<OutputFrame> {
        match self {
            RenderOutput::Screen { surface, config } => match surface.get_current_texture() {
                Ok(texture) => {
                    let view = texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Some(OutputFrame {
                        view,
                        surface_texture: Some(texture),
                    })
                }
                Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    log::warn!("surface {}, reconfiguring", err);
                    surface.configure(&ctxt.device, config);
                    None
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("surface out of memory, frame skipped");
                    None
                }
                Err(err) => {
                    log::warn!("failed to acquire the surface texture: {}", err);
                    None
                }
            },
            RenderOutput::Offscreen(buffers) => Some(OutputFrame {
                view: buffers
                    .color
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            }),
        }
    }

    /// Reads the last rendered image back, as tightly packed RGBA8 rows, top row first.
    pub fn read_pixels(&self, ctxt: &Context) -> Result<Vec<u8>> {
        let RenderOutput::Offscreen(buffers) = self else {
            return Err(RendererError::Readback(
                "only offscreen outputs can be read back".to_string(),
            ));
        };

        let (width, height) = (buffers.width as usize, buffers.height as usize);
        let bytes_per_pixel = 4;
        let unpadded_bytes_per_row = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging_buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging_buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctxt.create_command_encoder(Some("readback_copy_encoder"));
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &buffers.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row as u32),
                    rows_per_image: Some(height as u32),
                },
            },
            wgpu::Extent3d {
                width: width as u32,
                height: height as u32,
                depth_or_array_layers: 1,
            },
        );
        ctxt.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        ctxt.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RendererError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| RendererError::Readback(e.to_string()))?
            .map_err(|e| RendererError::Readback(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let is_bgra = matches!(
            buffers.color.texture.format(),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );

        let mut out = Vec::with_capacity(unpadded_bytes_per_row * height);
        for row in data.chunks_exact(padded_bytes_per_row).take(height) {
            for px in row[..unpadded_bytes_per_row].chunks_exact(4) {
                if is_bgra {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                } else {
                    out.extend_from_slice(px);
                }
            }
        }

        drop(data);
        staging_buffer.unmap();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(check_size(1, 1).is_ok());
        assert!(matches!(
            check_size(0, 600),
            Err(RendererError::IncompleteRenderTarget { target: "frame", .. })
        ));
        assert!(check_size(800, 0).is_err());
    }
}
