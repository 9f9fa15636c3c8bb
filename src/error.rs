//! Error types returned by resource construction and renderer setup.
//!
//! Everything that can fail does so at construction time. Per-frame rendering
//! never returns an error: surface problems are logged and the frame is skipped.

use thiserror::Error;

/// A shader stage, as delimited inside a program source blob.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
    /// The geometry stage.
    Geometry,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Geometry => write!(f, "geometry"),
        }
    }
}

/// Errors raised while creating the context, GPU resources or the renderer.
#[derive(Debug, Error)]
pub enum RendererError {
    /// No GPU adapter matches the requested options.
    #[error("no suitable GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    /// The device could not be created from the adapter.
    #[error("failed to create the GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    /// The window surface could not be created.
    #[error("failed to create the window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    /// The surface reports no usable texture format.
    #[error("the window surface does not expose any texture format")]
    NoSurfaceFormat,
    /// A shader stage failed to compile.
    #[error("{stage} stage of shader '{label}' failed to compile:\n{message}")]
    ShaderCompilation {
        /// Program label.
        label: String,
        /// The failing stage.
        stage: ShaderStage,
        /// Validation output.
        message: String,
    },
    /// The compiled stages cannot form a complete program.
    #[error("shader '{label}' failed to link: {message}")]
    ShaderLink {
        /// Program label.
        label: String,
        /// Reason.
        message: String,
    },
    /// The backend has no such pipeline stage.
    #[error("shader '{label}' contains a {stage} stage, which is not supported by the backend")]
    UnsupportedShaderStage {
        /// Program label.
        label: String,
        /// The offending stage.
        stage: ShaderStage,
    },
    /// A required program was not handed to the renderer.
    #[error("renderer requires the '{0}' shader program")]
    MissingShader(&'static str),
    /// A render target failed validation.
    #[error("render target '{target}' is incomplete: {message}")]
    IncompleteRenderTarget {
        /// Target name.
        target: &'static str,
        /// Reason.
        message: String,
    },
    /// The adapter cannot multisample the render target formats with this count.
    #[error("unsupported multisample count: {0}")]
    UnsupportedSampleCount(u32),
    /// Pixel data does not match the declared dimensions.
    #[error("texture data has {actual} bytes, expected {expected}")]
    InvalidTextureData {
        /// Expected byte count.
        expected: usize,
        /// Provided byte count.
        actual: usize,
    },
    /// Only RGB and RGBA images (3 or 4 bytes per pixel) are supported.
    #[error("unsupported pixel format: {0} bytes per pixel")]
    UnsupportedPixelFormat(u32),
    /// A cube texture needs exactly six faces.
    #[error("cube texture needs 6 faces, got {0}")]
    IncompleteCubeTexture(usize),
    /// A cube texture face differs in size from the first face.
    #[error("cube texture face {face} is {}x{}, expected {}x{}", .size.0, .size.1, .expected.0, .expected.1)]
    MismatchedCubeFace {
        /// Index of the offending face, in +X, -X, +Y, -Y, +Z, -Z order.
        face: usize,
        /// Its size.
        size: (u32, u32),
        /// The size of face 0.
        expected: (u32, u32),
    },
    /// Vertex or index data is inconsistent.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Reading pixels back from the GPU failed.
    #[error("pixel readback failed: {0}")]
    Readback(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RendererError>;
