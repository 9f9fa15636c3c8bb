//! The explicit wgpu context shared by every GPU resource.

pub use self::context::{Context, ContextConfig};

mod context;
