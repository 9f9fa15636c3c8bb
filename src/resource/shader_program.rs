//! Shader programs assembled from a single marked-up WGSL source.
//!
//! A program source holds its stages one after the other, each delimited by a
//! pair of comment markers:
//!
//! ```text
//! /*VERTEX-SHADER-BEGIN*/   ... WGSL ...   /*VERTEX-SHADER-END*/
//! /*FRAGMENT-SHADER-BEGIN*/ ... WGSL ...   /*FRAGMENT-SHADER-END*/
//! ```
//!
//! Every stage is a standalone WGSL module. The vertex entry point is `vs_main`,
//! fragment entry points are chosen by the pass using the program (`fs_main` by
//! default).

use std::collections::HashMap;

use crate::context::Context;
use crate::error::{RendererError, Result, ShaderStage};

const VERTEX_MARKERS: (&str, &str) = ("/*VERTEX-SHADER-BEGIN*/", "/*VERTEX-SHADER-END*/");
const FRAGMENT_MARKERS: (&str, &str) = ("/*FRAGMENT-SHADER-BEGIN*/", "/*FRAGMENT-SHADER-END*/");
const GEOMETRY_MARKERS: (&str, &str) = ("/*GEOMETRY-SHADER-BEGIN*/", "/*GEOMETRY-SHADER-END*/");

/// Per-stage sources extracted from a program blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderSources {
    /// The vertex stage, if present and non-empty.
    pub vertex: Option<String>,
    /// The fragment stage, if present and non-empty.
    pub fragment: Option<String>,
    /// The geometry stage, if present and non-empty.
    pub geometry: Option<String>,
}

impl ShaderSources {
    /// The source of `stage`, if any.
    pub fn stage(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_deref(),
            ShaderStage::Fragment => self.fragment.as_deref(),
            ShaderStage::Geometry => self.geometry.as_deref(),
        }
    }
}

/// Splits a program blob into its stages.
///
/// A stage runs from the end of its begin marker up to its end marker, or to the
/// end of the source if the end marker is missing. Stages that are absent or only
/// contain whitespace are `None`.
pub fn split_stages(source: &str) -> ShaderSources {
    ShaderSources {
        vertex: extract(source, VERTEX_MARKERS),
        fragment: extract(source, FRAGMENT_MARKERS),
        geometry: extract(source, GEOMETRY_MARKERS),
    }
}

fn extract(source: &str, (begin, end): (&str, &str)) -> Option<String> {
    let start = source.find(begin)? + begin.len();
    let body = &source[start..];
    let body = match body.find(end) {
        Some(stop) => &body[..stop],
        None => body,
    };

    if body.trim().is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Checks that the stages can form a program: vertex and fragment present, no geometry.
pub fn check_stages(label: &str, sources: &ShaderSources) -> Result<()> {
    if sources.geometry.is_some() {
        return Err(RendererError::UnsupportedShaderStage {
            label: label.to_string(),
            stage: ShaderStage::Geometry,
        });
    }

    for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
        if sources.stage(stage).is_none() {
            return Err(RendererError::ShaderLink {
                label: label.to_string(),
                message: format!("missing {} stage", stage),
            });
        }
    }

    Ok(())
}

/// Location of a named resource inside the program's bind groups.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformSlot {
    /// The `@group` index.
    pub group: u32,
    /// The `@binding` index.
    pub binding: u32,
}

/// Finds every `@group(g) @binding(b) var<...> name` declaration of a WGSL source.
pub fn parse_bindings(source: &str) -> Vec<(String, UniformSlot)> {
    let mut result = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find("@group(") {
        rest = &rest[at + "@group(".len()..];

        let Some((group, after)) = parse_index(rest) else {
            continue;
        };
        let Some(after) = after.trim_start().strip_prefix("@binding(") else {
            continue;
        };
        let Some((binding, after)) = parse_index(after) else {
            continue;
        };
        let Some(mut after) = after.trim_start().strip_prefix("var") else {
            continue;
        };

        // Skip the address space, e.g. `var<uniform>`.
        if let Some(space) = after.strip_prefix('<') {
            match space.find('>') {
                Some(close) => after = &space[close + 1..],
                None => break,
            }
        }

        let name: String = after
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();

        if !name.is_empty() {
            result.push((name, UniformSlot { group, binding }));
        }

        rest = after;
    }

    result
}

fn parse_index(s: &str) -> Option<(u32, &str)> {
    let close = s.find(')')?;
    let value = s[..close].trim().parse().ok()?;
    Some((value, &s[close + 1..]))
}

/// A compiled vertex + fragment program.
pub struct ShaderProgram {
    id: u64,
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    slots: HashMap<String, UniformSlot>,
}

impl ShaderProgram {
    /// Compiles a program from a marked-up source.
    pub fn new(ctxt: &Context, label: &str, source: &str) -> Result<ShaderProgram> {
        let sources = split_stages(source);
        check_stages(label, &sources)?;

        let compile = |stage: ShaderStage| -> Result<wgpu::ShaderModule> {
            let code = sources.stage(stage).unwrap_or_default();
            let stage_label = format!("{} ({})", label, stage);
            log::debug!("compiling {} stage of '{}'", stage, label);

            ctxt.create_shader_module(Some(&stage_label), code)
                .map_err(|message| RendererError::ShaderCompilation {
                    label: label.to_string(),
                    stage,
                    message,
                })
        };

        let vertex = compile(ShaderStage::Vertex)?;
        let fragment = compile(ShaderStage::Fragment)?;

        let slots = [&sources.vertex, &sources.fragment]
            .into_iter()
            .flatten()
            .flat_map(|code| parse_bindings(code))
            .collect();

        Ok(ShaderProgram {
            id: ctxt.next_program_id(),
            label: label.to_string(),
            vertex,
            fragment,
            slots,
        })
    }

    /// The program's unique, never zero, handle.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The label given at creation.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The compiled vertex stage.
    #[inline]
    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex
    }

    /// The compiled fragment stage.
    #[inline]
    pub fn fragment_module(&self) -> &wgpu::ShaderModule {
        &self.fragment
    }

    /// Where the resource called `name` is bound, if the program declares it.
    pub fn uniform_slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    /// Logs a warning for every name in `names` that the program does not declare.
    pub(crate) fn warn_unresolved(&self, names: &[&str]) {
        for name in names {
            if self.uniform_slot(name).is_none() {
                log::warn!("shader '{}' does not declare '{}'", self.label, name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "
/*VERTEX-SHADER-BEGIN*/
@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@vertex fn vs_main() {}
/*VERTEX-SHADER-END*/

/*FRAGMENT-SHADER-BEGIN*/
@group(2) @binding(1)
var diffuse_sampler: sampler;
@fragment fn fs_main() {}
/*FRAGMENT-SHADER-END*/
";

    #[test]
    fn stages_are_split_on_markers() {
        let sources = split_stages(PROGRAM);
        let vertex = sources.vertex.unwrap();
        let fragment = sources.fragment.unwrap();

        assert!(vertex.contains("vs_main"));
        assert!(!vertex.contains("fs_main"));
        assert!(fragment.contains("fs_main"));
        assert!(!fragment.contains("VERTEX"));
        assert_eq!(sources.geometry, None);
    }

    #[test]
    fn missing_end_marker_runs_to_the_end() {
        let sources = split_stages("/*FRAGMENT-SHADER-BEGIN*/ fn f() {}");
        assert_eq!(sources.fragment.as_deref(), Some(" fn f() {}"));
    }

    #[test]
    fn blank_stage_counts_as_missing() {
        let sources = split_stages("/*VERTEX-SHADER-BEGIN*/ \n /*VERTEX-SHADER-END*/");
        assert_eq!(sources.vertex, None);
    }

    #[test]
    fn missing_fragment_fails_to_link() {
        let sources = split_stages("/*VERTEX-SHADER-BEGIN*/ fn v() {} /*VERTEX-SHADER-END*/");
        assert!(matches!(
            check_stages("test", &sources),
            Err(RendererError::ShaderLink { .. })
        ));
    }

    #[test]
    fn geometry_stage_is_rejected() {
        let source = format!(
            "{}/*GEOMETRY-SHADER-BEGIN*/ fn g() {{}} /*GEOMETRY-SHADER-END*/",
            PROGRAM
        );
        assert!(matches!(
            check_stages("test", &split_stages(&source)),
            Err(RendererError::UnsupportedShaderStage {
                stage: ShaderStage::Geometry,
                ..
            })
        ));
    }

    #[test]
    fn bindings_are_parsed() {
        let sources = split_stages(PROGRAM);
        let mut bindings = parse_bindings(&sources.vertex.unwrap());
        bindings.extend(parse_bindings(&sources.fragment.unwrap()));

        assert_eq!(
            bindings,
            vec![
                ("frame".to_string(), UniformSlot { group: 0, binding: 0 }),
                (
                    "diffuse_sampler".to_string(),
                    UniformSlot { group: 2, binding: 1 }
                ),
            ]
        );
    }
}
