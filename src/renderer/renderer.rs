use std::sync::Arc;

use glamx::{Mat4, Vec3};

use crate::builtin::RendererShaders;
use crate::camera::{Camera, Handedness};
use crate::color::{self, Color};
use crate::context::Context;
use crate::error::{RendererError, Result};
use crate::light::{Light, LightStd140};
use crate::procedural;
use crate::renderer::draw_list::{MaterialBindGroups, PartDraw};
use crate::renderer::final_pass::FinalPass;
use crate::renderer::forward_pass::ForwardPass;
use crate::renderer::geometry_pass::GeometryPass;
use crate::renderer::layouts::{dynamic_entry, BindGroupLayouts};
use crate::renderer::lighting_pass::LightingPass;
use crate::renderer::shadow_pass::ShadowPass;
use crate::renderer::sys_objects_pass::{GizmoDraw, SysObjectsPass};
use crate::renderer::uniforms::{ForwardLightsStd140, FrameUniforms, ModelUniforms};
use crate::renderer::{ClearFlags, RenderMode, RendererConfig};
use crate::resource::render_targets;
use crate::resource::{
    CubeTexture, DefaultTextures, DynamicUniformBuffer, GeometryBuffer, GeometryOptions,
    RenderOutput, RenderTargets, ShaderProgram,
};
use crate::scene::{LightHandle, MeshHandle, Registry, Scene, StaticMesh};

/// Scale of a gizmo outline relative to its gizmo.
const OUTLINE_SCALE: f32 = 1.1;

enum Passes {
    Deferred {
        geometry: GeometryPass,
        lighting: LightingPass,
        shadow: Option<ShadowPass>,
    },
    Forward {
        forward: ForwardPass,
        lights: wgpu::Buffer,
        lights_bind_group: wgpu::BindGroup,
    },
}

/// Draws a [`Scene`] of static meshes and lights into a [`RenderOutput`].
///
/// # Example
///
/// ```no_run
/// use deferred3d::prelude::*;
///
/// # fn main() -> deferred3d::error::Result<()> {
/// let ctxt = Context::headless(&ContextConfig::default())?;
/// let config = RendererConfig::default();
/// let shaders = RendererShaders::builtin(&ctxt, &config)?;
/// let output = RenderOutput::offscreen(&ctxt, 320, 240);
/// let mut renderer = Renderer::new(&ctxt, output, 320, 240, config, shaders)?;
///
/// renderer.add_light(Light::point(Vec3::new(0.0, 1.0, 2.0)));
/// renderer.draw_frame(color::BLACK, ClearFlags::all());
/// let pixels = renderer.read_pixels()?;
/// # assert_eq!(pixels.len(), 320 * 240 * 4);
/// # Ok(())
/// # }
/// ```
pub struct Renderer {
    ctxt: Context,
    config: RendererConfig,
    output: RenderOutput,
    targets: RenderTargets,
    layouts: BindGroupLayouts,
    passes: Passes,
    sys_objects: SysObjectsPass,
    final_pass: FinalPass,

    frame_uniforms: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    models: DynamicUniformBuffer<ModelUniforms>,
    models_bind_group: wgpu::BindGroup,
    lights: DynamicUniformBuffer<LightStd140>,
    lights_bind_group: wgpu::BindGroup,

    default_textures: DefaultTextures,
    materials: MaterialBindGroups,
    gizmo_geometry: Arc<GeometryBuffer>,
    skybox_geometry: Arc<GeometryBuffer>,
    skybox_bind_group: Option<wgpu::BindGroup>,

    scene: Scene,
    view: Mat4,
    projection: Mat4,
    camera_position: Vec3,
}

fn require<'a>(
    program: &'a Option<Arc<ShaderProgram>>,
    name: &'static str,
) -> Result<&'a ShaderProgram> {
    program
        .as_deref()
        .ok_or(RendererError::MissingShader(name))
}

fn uniform_bind_group(
    ctxt: &Context,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    entry: wgpu::BindGroupEntry<'_>,
) -> wgpu::BindGroup {
    ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[entry],
    })
}

fn whole_buffer(buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding: 0,
        resource: buffer.as_entire_binding(),
    }
}

impl Renderer {
    /// Creates a renderer drawing into `output`, with intermediate targets of `width`×`height`.
    ///
    /// Fails with [`RendererError::MissingShader`] if `shaders` lacks a program
    /// required by `config`, or if the render targets cannot be created.
    pub fn new(
        ctxt: &Context,
        output: RenderOutput,
        width: u32,
        height: u32,
        config: RendererConfig,
        shaders: RendererShaders,
    ) -> Result<Renderer> {
        log::info!(
            "creating a {:?} renderer, {}x{}, {} sample(s)",
            config.mode,
            width,
            height,
            config.sample_count
        );

        let post_processing = require(&shaders.post_processing, "post_processing")?;
        let solid_color = require(&shaders.solid_color, "solid_color")?;
        let skybox = require(&shaders.skybox, "skybox")?;

        let deferred = config.mode == RenderMode::Deferred;
        let targets = RenderTargets::new(ctxt, width, height, config.sample_count, deferred)?;
        let layouts = BindGroupLayouts::new(ctxt, config.is_multisampled());

        let passes = match config.mode {
            RenderMode::Deferred => {
                let geometry = require(&shaders.geometry, "geometry")?;
                let lighting = require(&shaders.lighting, "lighting")?;
                let shadow = if config.uses_shadow_volumes() {
                    let program = require(&shaders.shadow_volume, "shadow_volume")?;
                    Some(ShadowPass::new(ctxt, program, &layouts, &config))
                } else {
                    None
                };

                let mut lighting = LightingPass::new(ctxt, lighting, &layouts, &config);
                lighting.bind_gbuffer(ctxt, &layouts, &targets);

                Passes::Deferred {
                    geometry: GeometryPass::new(ctxt, geometry, &layouts, &config),
                    lighting,
                    shadow,
                }
            }
            RenderMode::Forward => {
                let forward = require(&shaders.forward, "forward")?;
                let lights = ctxt.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("forward_lights_buffer"),
                    size: std::mem::size_of::<ForwardLightsStd140>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let lights_bind_group = uniform_bind_group(
                    ctxt,
                    "forward_lights_bind_group",
                    &layouts.forward_lights,
                    whole_buffer(&lights),
                );

                Passes::Forward {
                    forward: ForwardPass::new(ctxt, forward, &layouts, &config),
                    lights,
                    lights_bind_group,
                }
            }
        };

        let sys_objects = SysObjectsPass::new(ctxt, skybox, solid_color, &layouts, &config);
        let mut final_pass = FinalPass::new(ctxt, post_processing, &layouts, output.format());
        final_pass.bind_frame(ctxt, &layouts, &targets);

        let frame_uniforms = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms_buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = uniform_bind_group(
            ctxt,
            "frame_bind_group",
            &layouts.frame,
            whole_buffer(&frame_uniforms),
        );

        let models = DynamicUniformBuffer::new(ctxt, "model_uniforms_buffer");
        let models_bind_group =
            uniform_bind_group(ctxt, "model_bind_group", &layouts.model, dynamic_entry(&models));
        let lights = DynamicUniformBuffer::new(ctxt, "light_uniforms_buffer");
        let lights_bind_group =
            uniform_bind_group(ctxt, "light_bind_group", &layouts.light, dynamic_entry(&lights));

        let (vertices, indices) = procedural::cube(1.0);
        let gizmo_geometry = GeometryBuffer::new(ctxt, vertices, indices, GeometryOptions::lit())?;
        let (vertices, indices) = procedural::skybox_cube();
        let skybox_geometry =
            GeometryBuffer::new(ctxt, vertices, indices, GeometryOptions::default())?;

        let view = Mat4::IDENTITY;
        let projection = Camera::new(width as f32 / height.max(1) as f32)
            .projection_matrix(config.handedness);

        Ok(Renderer {
            ctxt: ctxt.clone(),
            config,
            output,
            targets,
            layouts,
            passes,
            sys_objects,
            final_pass,
            frame_uniforms,
            frame_bind_group,
            models,
            models_bind_group,
            lights,
            lights_bind_group,
            default_textures: DefaultTextures::new(ctxt)?,
            materials: MaterialBindGroups::default(),
            gizmo_geometry,
            skybox_geometry,
            skybox_bind_group: None,
            scene: Scene::default(),
            view,
            projection,
            camera_position: Vec3::ZERO,
        })
    }

    /// The configuration this renderer was created with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The render context.
    pub fn context(&self) -> &Context {
        &self.ctxt
    }

    /// Size of the render targets in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.targets.size()
    }

    /// Registers a mesh to draw.
    pub fn add_static_mesh(&mut self, mesh: StaticMesh) -> MeshHandle {
        self.scene.meshes.add(mesh)
    }

    /// Unregisters a mesh and clears `handle`. Unknown handles are ignored.
    pub fn remove_static_mesh(&mut self, handle: &mut Option<MeshHandle>) {
        self.scene.meshes.remove(handle);
    }

    /// Registers a light.
    pub fn add_light(&mut self, light: Light) -> LightHandle {
        self.scene.lights.add(light)
    }

    /// Unregisters a light and clears `handle`. Unknown handles are ignored.
    pub fn remove_light(&mut self, handle: &mut Option<LightHandle>) {
        self.scene.lights.remove(handle);
    }

    /// The registered meshes, in drawing order.
    pub fn static_meshes(&self) -> &Registry<StaticMesh> {
        &self.scene.meshes
    }

    /// The registered lights, in accumulation order.
    pub fn lights(&self) -> &Registry<Light> {
        &self.scene.lights
    }

    /// Sets or removes the environment cube map.
    pub fn set_skybox(&mut self, skybox: Option<Arc<CubeTexture>>) {
        self.skybox_bind_group = skybox.as_ref().map(|cube| {
            self.ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("skybox_bind_group"),
                layout: &self.layouts.cube,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&cube.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&cube.sampler),
                    },
                ],
            })
        });
        self.scene.skybox = skybox;
    }

    /// Sets the world-to-view transform.
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Sets the view-to-clip transform.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Sets the eye position used for specular highlights.
    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
    }

    /// Reads the view, projection and eye position from `camera`.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.view = camera.view_matrix(self.config.handedness);
        self.projection = camera.projection_matrix(self.config.handedness);
        self.camera_position = camera.position;
    }

    /// Resizes the output and every intermediate target. A zero dimension is an
    /// error and leaves the renderer untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        log::debug!("resizing the renderer to {}x{}", width, height);
        render_targets::check_size(width, height)?;

        self.output.resize(&self.ctxt, width, height);
        self.targets.resize(width, height)?;

        if let Passes::Deferred { lighting, .. } = &mut self.passes {
            lighting.bind_gbuffer(&self.ctxt, &self.layouts, &self.targets);
        }
        self.final_pass
            .bind_frame(&self.ctxt, &self.layouts, &self.targets);
        Ok(())
    }

    /// Reads the last frame back as RGBA8 rows, top row first. Offscreen outputs only.
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        self.output.read_pixels(&self.ctxt)
    }

    /// Renders and presents one frame.
    ///
    /// `clear` selects which buffers start the frame cleared; `clear_color` is
    /// used for the color buffers. The frame is skipped if the output has no
    /// image available.
    pub fn draw_frame(&mut self, clear_color: Color, clear: ClearFlags) {
        let Some(output) = self.output.acquire(&self.ctxt) else {
            return;
        };

        let left_handed = self.config.handedness == Handedness::Left;
        let frame = FrameUniforms::new(
            self.view,
            self.projection,
            self.camera_position,
            self.config.ambient,
            self.targets.size(),
            self.config.sample_count,
            left_handed,
        );
        self.ctxt
            .write_buffer(&self.frame_uniforms, 0, bytemuck::bytes_of(&frame));

        let parts = self.collect_parts(left_handed);
        let gizmos = self.collect_gizmos();
        let light_offsets = self.collect_lights();
        let shadow_ranges = self.extrude_shadows();
        self.flush_uniforms();

        let mut encoder = self.ctxt.create_command_encoder(Some("frame_encoder"));

        match &self.passes {
            Passes::Deferred {
                geometry,
                lighting,
                shadow,
            } => {
                geometry.record(
                    &mut encoder,
                    &self.targets,
                    clear,
                    &self.frame_bind_group,
                    &self.models_bind_group,
                    &parts,
                );
                lighting.record_ambient(
                    &mut encoder,
                    &self.targets,
                    clear_color,
                    clear,
                    &self.frame_bind_group,
                    &self.lights_bind_group,
                );

                for (light, (offset, range)) in self
                    .scene
                    .lights
                    .iter()
                    .zip(light_offsets.iter().zip(shadow_ranges))
                {
                    let volumes = shadow.as_ref().zip(range);
                    lighting.record_light(
                        &mut encoder,
                        &self.targets,
                        light.borrow().light_type(),
                        *offset,
                        &self.frame_bind_group,
                        &self.lights_bind_group,
                        volumes,
                    );
                }
            }
            Passes::Forward {
                forward,
                lights_bind_group,
                ..
            } => {
                forward.record(
                    &mut encoder,
                    &self.targets,
                    clear_color,
                    clear,
                    &self.frame_bind_group,
                    &self.models_bind_group,
                    lights_bind_group,
                    &parts,
                );
            }
        }

        let skybox = self
            .skybox_bind_group
            .as_ref()
            .map(|bind_group| (bind_group, &*self.skybox_geometry));
        self.sys_objects.record(
            &mut encoder,
            &self.targets,
            &self.frame_bind_group,
            &self.models_bind_group,
            skybox,
            &self.gizmo_geometry,
            &gizmos,
        );

        self.final_pass
            .record(&mut encoder, &output.view, clear_color, clear);

        self.ctxt.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    /// Pushes the model uniforms of every visible part and resolves its material.
    fn collect_parts(&mut self, left_handed: bool) -> Vec<PartDraw> {
        self.models.clear();

        let mut parts = Vec::new();
        for mesh in &self.scene.meshes {
            let mesh = mesh.borrow();
            if !mesh.visible {
                continue;
            }

            let model = mesh.model_matrix();
            for part in mesh.parts() {
                let model_offset = self
                    .models
                    .push(&ModelUniforms::for_part(model, part, left_handed));
                let material = self.materials.get(
                    &self.ctxt,
                    &self.layouts.material,
                    part,
                    &self.default_textures,
                );

                parts.push(PartDraw {
                    geometry: part.geometry().clone(),
                    model_offset,
                    material,
                });
            }
        }

        parts
    }

    /// Pushes the model uniforms of the gizmos of rendered lights.
    fn collect_gizmos(&mut self) -> Vec<GizmoDraw> {
        let scale = Mat4::from_scale(Vec3::splat(self.config.gizmo_size));
        let outline = Mat4::from_scale(Vec3::splat(OUTLINE_SCALE));
        let outlined = self.sys_objects.outlines_gizmos();

        self.scene
            .lights
            .iter()
            .filter_map(|light| {
                let light = light.borrow();
                if !light.render {
                    return None;
                }

                let model = light.model_matrix() * scale;
                let model_offset = self.models.push(&ModelUniforms::solid(model, light.color));
                let outline_offset = outlined.then(|| {
                    self.models
                        .push(&ModelUniforms::solid(model * outline, color::ORANGE))
                });

                Some(GizmoDraw {
                    model_offset,
                    outline_offset,
                })
            })
            .collect()
    }

    /// Writes the light uniforms. Returns the dynamic offset of each deferred light.
    fn collect_lights(&mut self) -> Vec<u32> {
        self.lights.clear();

        match &self.passes {
            Passes::Deferred { .. } => self
                .scene
                .lights
                .iter()
                .map(|light| self.lights.push(&LightStd140::from(&*light.borrow())))
                .collect(),
            Passes::Forward { lights, .. } => {
                let borrowed: Vec<_> = self.scene.lights.iter().map(|light| light.borrow()).collect();
                let (block, dropped) = ForwardLightsStd140::pack(borrowed.iter().map(|light| &**light));
                if dropped > 0 {
                    log::warn!(
                        "{} light(s) exceed the forward limit of {} per type and are ignored",
                        dropped,
                        crate::renderer::uniforms::MAX_FORWARD_LIGHTS
                    );
                }

                self.ctxt.write_buffer(lights, 0, bytemuck::bytes_of(&block));
                Vec::new()
            }
        }
    }

    /// Extrudes the shadow volumes of every shadow-casting light.
    fn extrude_shadows(&mut self) -> Vec<Option<std::ops::Range<u32>>> {
        let Passes::Deferred {
            shadow: Some(shadow),
            ..
        } = &mut self.passes
        else {
            return vec![None; self.scene.lights.len()];
        };

        shadow.clear();
        let meshes: Vec<MeshHandle> = self.scene.meshes.iter().cloned().collect();
        let ranges = self
            .scene
            .lights
            .iter()
            .map(|light| {
                let light = light.borrow();
                light
                    .cast_shadows
                    .then(|| shadow.extrude(&light, &meshes))
                    .filter(|range| !range.is_empty())
            })
            .collect();
        shadow.upload();

        ranges
    }

    /// Uploads the dynamic uniform buffers, recreating bind groups of reallocated ones.
    fn flush_uniforms(&mut self) {
        if self.models.flush() {
            self.models_bind_group = uniform_bind_group(
                &self.ctxt,
                "model_bind_group",
                &self.layouts.model,
                dynamic_entry(&self.models),
            );
        }

        if self.lights.flush() {
            self.lights_bind_group = uniform_bind_group(
                &self.ctxt,
                "light_bind_group",
                &self.layouts.light,
                dynamic_entry(&self.lights),
            );
        }
    }
}
