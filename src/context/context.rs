//! wgpu rendering context.
//!
//! The context is created once, explicitly, and handed to every constructor that
//! allocates GPU resources. There is no global instance: a renderer, its targets
//! and its resources all hold a clone of the same `Context`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use winit::window::Window;

use crate::error::{RendererError, Result};

/// Options used when selecting the adapter and creating the device.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Backends the instance may pick an adapter from.
    pub backends: wgpu::Backends,
    /// Prefer the integrated or the discrete GPU.
    pub power_preference: wgpu::PowerPreference,
    /// Only accept a software (fallback) adapter.
    pub force_fallback_adapter: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
        }
    }
}

/// The wgpu rendering context containing all GPU objects needed for rendering.
///
/// This struct is cheap to clone: every member is reference counted.
#[derive(Clone)]
pub struct Context {
    /// The wgpu instance used for creating surfaces.
    pub instance: Arc<wgpu::Instance>,
    /// The wgpu device used for creating GPU resources.
    pub device: Arc<wgpu::Device>,
    /// The wgpu queue used for submitting commands.
    pub queue: Arc<wgpu::Queue>,
    /// The wgpu adapter the device was created from.
    pub adapter: Arc<wgpu::Adapter>,
    /// The format of the final presentation target.
    pub surface_format: wgpu::TextureFormat,
    depth_clamp: bool,
    next_program_id: Arc<AtomicU64>,
}

impl Context {
    /// Creates a context that renders without any window.
    ///
    /// The presentation format is `Rgba8Unorm`, which makes the final image
    /// directly readable with [`crate::resource::RenderOutput::read_pixels`].
    pub fn headless(config: &ContextConfig) -> Result<Context> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: config.force_fallback_adapter,
        }))?;

        Self::from_adapter(instance, adapter, wgpu::TextureFormat::Rgba8Unorm)
    }

    /// Creates a context able to present to `window`, and the window surface.
    pub fn for_window(
        window: Arc<Window>,
        config: &ContextConfig,
    ) -> Result<(Context, wgpu::Surface<'static>)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: config.force_fallback_adapter,
        }))?;

        // Non-sRGB formats are preferred: the post-processing shader outputs
        // the final values as they are.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RendererError::NoSurfaceFormat)?;

        let ctxt = Self::from_adapter(instance, adapter, surface_format)?;
        Ok((ctxt, surface))
    }

    fn from_adapter(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Context> {
        let info = adapter.get_info();
        log::info!(
            "using adapter '{}' ({:?}, {:?})",
            info.name,
            info.device_type,
            info.backend
        );

        let depth_clamp = adapter
            .features()
            .contains(wgpu::Features::DEPTH_CLIP_CONTROL);
        if !depth_clamp {
            log::warn!("adapter lacks depth clip control, shadow volumes clamp depth in the shader");
        }

        let required_features = if depth_clamp {
            wgpu::Features::DEPTH_CLIP_CONTROL
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("deferred3d device"),
            required_features,
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            trace: wgpu::Trace::Off,
        }))?;

        Ok(Context {
            instance: Arc::new(instance),
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter: Arc::new(adapter),
            surface_format,
            depth_clamp,
            next_program_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Whether pipelines may disable depth clipping (`unclipped_depth`).
    pub fn supports_depth_clamp(&self) -> bool {
        self.depth_clamp
    }

    /// Whether `format` can be multisampled with `sample_count` samples on this adapter.
    pub fn supports_sample_count(&self, format: wgpu::TextureFormat, sample_count: u32) -> bool {
        sample_count == 1
            || self
                .adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(sample_count)
    }

    /// Allocates a fresh, never zero, program handle.
    pub(crate) fn next_program_id(&self) -> u64 {
        self.next_program_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Creates a new buffer on the GPU using a descriptor.
    pub fn create_buffer(&self, desc: &wgpu::BufferDescriptor) -> wgpu::Buffer {
        self.device.create_buffer(desc)
    }

    /// Creates a new buffer initialized with data.
    ///
    /// # Arguments
    /// * `label` - Debug label for the buffer
    /// * `contents` - The data to initialize the buffer with
    /// * `usage` - Buffer usage flags
    pub fn create_buffer_init(
        &self,
        label: Option<&str>,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents,
                usage,
            })
    }

    /// Writes data to a buffer.
    pub fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    /// Creates a new texture on the GPU.
    pub fn create_texture(&self, desc: &wgpu::TextureDescriptor) -> wgpu::Texture {
        self.device.create_texture(desc)
    }

    /// Creates a new sampler.
    pub fn create_sampler(&self, desc: &wgpu::SamplerDescriptor) -> wgpu::Sampler {
        self.device.create_sampler(desc)
    }

    /// Creates a new bind group layout.
    pub fn create_bind_group_layout(
        &self,
        desc: &wgpu::BindGroupLayoutDescriptor,
    ) -> wgpu::BindGroupLayout {
        self.device.create_bind_group_layout(desc)
    }

    /// Creates a new bind group.
    pub fn create_bind_group(&self, desc: &wgpu::BindGroupDescriptor) -> wgpu::BindGroup {
        self.device.create_bind_group(desc)
    }

    /// Creates a new pipeline layout.
    pub fn create_pipeline_layout(
        &self,
        desc: &wgpu::PipelineLayoutDescriptor,
    ) -> wgpu::PipelineLayout {
        self.device.create_pipeline_layout(desc)
    }

    /// Creates a new render pipeline.
    pub fn create_render_pipeline(
        &self,
        desc: &wgpu::RenderPipelineDescriptor,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(desc)
    }

    /// Compiles WGSL source, returning the validation message on failure.
    ///
    /// # Arguments
    /// * `label` - Debug label for the shader
    /// * `source` - WGSL shader source code
    pub fn create_shader_module(
        &self,
        label: Option<&str>,
        source: &str,
    ) -> std::result::Result<wgpu::ShaderModule, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(module),
        }
    }

    /// Creates a new command encoder.
    pub fn create_command_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }

    /// Submits command buffers to the GPU queue.
    pub fn submit<I: IntoIterator<Item = wgpu::CommandBuffer>>(&self, command_buffers: I) {
        self.queue.submit(command_buffers);
    }

    /// Writes texture data to the GPU.
    pub fn write_texture(
        &self,
        texture: wgpu::TexelCopyTextureInfo,
        data: &[u8],
        data_layout: wgpu::TexelCopyBufferLayout,
        size: wgpu::Extent3d,
    ) {
        self.queue.write_texture(texture, data, data_layout, size);
    }

    /// The combined depth-stencil format shared by every depth attachment.
    pub fn depth_stencil_format() -> wgpu::TextureFormat {
        wgpu::TextureFormat::Depth24PlusStencil8
    }
}
