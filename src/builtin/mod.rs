//! Built-in shader programs.
//!
//! Every program is a single WGSL file with its stages delimited by the markers
//! understood by [`ShaderProgram`].

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::renderer::{RenderMode, RendererConfig};
use crate::resource::ShaderProgram;

/// G-buffer fill.
pub static GBUFFER_SRC: &str = include_str!("gbuffer.wgsl");
/// Deferred lighting, one fragment entry point per light type plus `fs_ambient`.
pub static LIGHTING_SRC: &str = include_str!("lighting.wgsl");
/// Shadow volume rasterization (stencil only).
pub static SHADOW_VOLUME_SRC: &str = include_str!("shadow_volume.wgsl");
/// Flat colored geometry, for light gizmos.
pub static SOLID_COLOR_SRC: &str = include_str!("solid_color.wgsl");
/// Cube-mapped background.
pub static SKYBOX_SRC: &str = include_str!("skybox.wgsl");
/// Forward lighting with light arrays.
pub static FORWARD_SRC: &str = include_str!("forward.wgsl");
/// Copy of the frame buffer to the output.
pub static POST_PROCESSING_SRC: &str = include_str!("post_processing.wgsl");

const SINGLE_SAMPLED_GBUFFER: (&str, &str) = (
    "alias GBufferTexture = texture_2d<f32>;",
    "textureLoad(t, coords, 0)",
);
const MULTISAMPLED_GBUFFER: (&str, &str) = (
    "alias GBufferTexture = texture_multisampled_2d<f32>;",
    "textureLoad(t, coords, sample_id)",
);

/// The lighting program source reading a G-buffer with `sample_count` samples.
pub fn lighting_source(sample_count: u32) -> String {
    if sample_count > 1 {
        LIGHTING_SRC
            .replace(SINGLE_SAMPLED_GBUFFER.0, MULTISAMPLED_GBUFFER.0)
            .replace(SINGLE_SAMPLED_GBUFFER.1, MULTISAMPLED_GBUFFER.1)
    } else {
        LIGHTING_SRC.to_string()
    }
}

/// The programs a [`Renderer`](crate::renderer::Renderer) draws with.
///
/// Programs not needed by the configured mode may be left to `None`.
#[derive(Clone, Default)]
pub struct RendererShaders {
    /// G-buffer fill (deferred).
    pub geometry: Option<Arc<ShaderProgram>>,
    /// Per-light lighting (deferred).
    pub lighting: Option<Arc<ShaderProgram>>,
    /// Final copy to the output.
    pub post_processing: Option<Arc<ShaderProgram>>,
    /// Lit meshes (forward).
    pub forward: Option<Arc<ShaderProgram>>,
    /// Light gizmos.
    pub solid_color: Option<Arc<ShaderProgram>>,
    /// Skybox.
    pub skybox: Option<Arc<ShaderProgram>>,
    /// Stencil shadow volumes (deferred, with shadows on).
    pub shadow_volume: Option<Arc<ShaderProgram>>,
}

impl RendererShaders {
    /// Compiles the built-in programs needed by `config`.
    pub fn builtin(ctxt: &Context, config: &RendererConfig) -> Result<RendererShaders> {
        let compile = |label: &str, source: &str| -> Result<Option<Arc<ShaderProgram>>> {
            Ok(Some(Arc::new(ShaderProgram::new(ctxt, label, source)?)))
        };

        let mut shaders = RendererShaders {
            post_processing: compile("post_processing", POST_PROCESSING_SRC)?,
            solid_color: compile("solid_color", SOLID_COLOR_SRC)?,
            skybox: compile("skybox", SKYBOX_SRC)?,
            ..Default::default()
        };

        match config.mode {
            RenderMode::Deferred => {
                shaders.geometry = compile("gbuffer", GBUFFER_SRC)?;
                shaders.lighting =
                    compile("lighting", &lighting_source(config.sample_count))?;

                if config.uses_shadow_volumes() {
                    shaders.shadow_volume = compile("shadow_volume", SHADOW_VOLUME_SRC)?;
                }
            }
            RenderMode::Forward => {
                shaders.forward = compile("forward", FORWARD_SRC)?;
            }
        }

        Ok(shaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::shader_program::{check_stages, parse_bindings, split_stages};

    const ALL: [(&str, &str); 7] = [
        ("gbuffer", GBUFFER_SRC),
        ("lighting", LIGHTING_SRC),
        ("shadow_volume", SHADOW_VOLUME_SRC),
        ("solid_color", SOLID_COLOR_SRC),
        ("skybox", SKYBOX_SRC),
        ("forward", FORWARD_SRC),
        ("post_processing", POST_PROCESSING_SRC),
    ];

    #[test]
    fn builtin_programs_have_both_stages() {
        for (label, source) in ALL {
            let sources = split_stages(source);
            assert!(check_stages(label, &sources).is_ok(), "{}", label);
            assert!(sources.vertex.unwrap().contains("fn vs_main"), "{}", label);
        }
    }

    fn validate_wgsl(label: &str, stage: &str, code: &str) {
        let module = naga::front::wgsl::parse_str(code)
            .unwrap_or_else(|e| panic!("{} ({}): {}", label, stage, e.emit_to_string(code)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{} ({}): {:?}", label, stage, e));
    }

    #[test]
    fn builtin_stages_are_valid_wgsl() {
        let multisampled = lighting_source(4);
        let programs = ALL
            .into_iter()
            .chain([("lighting (4 samples)", multisampled.as_str())]);

        for (label, source) in programs {
            let sources = split_stages(source);
            validate_wgsl(label, "vertex", sources.vertex.as_deref().unwrap());
            validate_wgsl(label, "fragment", sources.fragment.as_deref().unwrap());
        }
    }

    #[test]
    fn multisampled_lighting_reads_samples() {
        let single = lighting_source(1);
        assert_eq!(single, LIGHTING_SRC);

        let multi = lighting_source(4);
        assert!(multi.contains(MULTISAMPLED_GBUFFER.0));
        assert!(multi.contains(MULTISAMPLED_GBUFFER.1));
        assert!(!multi.contains(SINGLE_SAMPLED_GBUFFER.0));
    }

    #[test]
    fn material_textures_are_in_group_two() {
        let fragment = split_stages(GBUFFER_SRC).fragment.unwrap();
        let bindings = parse_bindings(&fragment);
        let diffuse = bindings
            .iter()
            .find(|(name, _)| name == "diffuse_texture")
            .map(|(_, slot)| *slot)
            .unwrap();
        assert_eq!((diffuse.group, diffuse.binding), (2, 0));
    }
}
