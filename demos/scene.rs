//! A floor, a brick wall and three cubes lit by a swinging shadow-casting spot
//! light and two point lights.
//!
//! Controls: W/S/A/D move, Space/C go up/down, left drag looks around.
//! Set `RUST_LOG=debug` for resource creation logs.

use std::sync::Arc;
use std::time::Instant;

use deferred3d::prelude::*;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const SPOT_SWING: f32 = 1.5;

struct Demo {
    window: Arc<Window>,
    renderer: Renderer,
    controls: ControllableCamera,
    spot: LightHandle,
    spot_speed: f32,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    last_frame: Instant,
}

#[derive(Default)]
struct App {
    demo: Option<Demo>,
}

/// A two-color checker board, `cells`×`cells` cells of `cell` pixels.
fn checker(ctxt: &Context, cells: u32, cell: u32, a: [u8; 3], b: [u8; 3]) -> Result<Arc<Texture>> {
    let size = cells * cell;
    let data: Vec<u8> = (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size / cell, i / size / cell);
            if (x + y) % 2 == 0 {
                a
            } else {
                b
            }
        })
        .collect();

    Texture::new(ctxt, &data, size, size, 3, TextureOptions::mipmapped())
}

/// Bricks with a tangent-space normal map bevelling their edges.
fn bricks(ctxt: &Context) -> Result<(Arc<Texture>, Arc<Texture>)> {
    const SIZE: u32 = 64;
    const ROW: u32 = 16;
    const BRICK: u32 = 32;

    let mut diffuse = Vec::with_capacity((SIZE * SIZE * 3) as usize);
    let mut bump = Vec::with_capacity((SIZE * SIZE * 3) as usize);

    for y in 0..SIZE {
        for x in 0..SIZE {
            let shift = if (y / ROW) % 2 == 0 { 0 } else { BRICK / 2 };
            let (bx, by) = ((x + shift) % BRICK, y % ROW);
            let mortar = bx < 2 || by < 2;

            diffuse.extend(if mortar { [190, 190, 180] } else { [150, 60, 40] });
            bump.extend(match (bx, by) {
                (0..=1, _) => [64, 128, 230],
                (_, 0..=1) => [128, 64, 230],
                _ => [128, 128, 255],
            });
        }
    }

    Ok((
        Texture::new(ctxt, &diffuse, SIZE, SIZE, 3, TextureOptions::mipmapped())?,
        Texture::new(ctxt, &bump, SIZE, SIZE, 3, TextureOptions::mipmapped())?,
    ))
}

/// A vertical gradient from the horizon to the zenith.
fn sky(ctxt: &Context) -> Result<Arc<CubeTexture>> {
    const SIZE: u32 = 16;
    let gradient = |top: [u8; 3], bottom: [u8; 3]| -> Vec<u8> {
        (0..SIZE * SIZE)
            .flat_map(|i| {
                let t = (i / SIZE) as f32 / (SIZE - 1) as f32;
                [0, 1, 2].map(|c| (top[c] as f32 * (1.0 - t) + bottom[c] as f32 * t) as u8)
            })
            .collect()
    };

    let side = gradient([90, 140, 210], [200, 220, 240]);
    let top = gradient([90, 140, 210], [90, 140, 210]);
    let bottom = gradient([60, 60, 60], [60, 60, 60]);
    fn face(data: &[u8]) -> CubeFace<'_> {
        CubeFace {
            data,
            width: SIZE,
            height: SIZE,
            bpp: 3,
        }
    }

    CubeTexture::new(
        ctxt,
        &[face(&side), face(&side), face(&top), face(&bottom), face(&side), face(&side)],
        false,
    )
}

fn populate(ctxt: &Context, renderer: &mut Renderer) -> Result<LightHandle> {
    let (vertices, indices) = procedural::plane(20.0);
    let ground = GeometryBuffer::new(ctxt, vertices, indices, GeometryOptions::lit())?;
    let (vertices, indices) = procedural::plane(10.0);
    let wall = GeometryBuffer::new(ctxt, vertices, indices, GeometryOptions::lit())?;
    let (vertices, indices) = procedural::cube_fully_indexed(1.0);
    let cube = GeometryBuffer::new(
        ctxt,
        vertices,
        indices,
        GeometryOptions::lit().with_adjacency(true),
    )?;

    let floor = checker(ctxt, 8, 8, [200, 200, 200], [120, 120, 120])?;
    let (brick, brick_normals) = bricks(ctxt)?;

    let ground = MeshPart::new(ground).with_texture(
        TextureKind::Diffuse,
        TextureSlot::new(floor).with_scale(Vec2::splat(10.0)),
    );
    renderer.add_static_mesh(
        StaticMesh::new("ground", ground)
            .with_position(Vec3::new(0.0, -1.0, 0.0))
            .with_rotation(Vec3::new(-90.0, 0.0, 0.0)),
    );

    let wall = MeshPart::new(wall)
        .with_texture(
            TextureKind::Diffuse,
            TextureSlot::new(brick).with_scale(Vec2::splat(5.0)),
        )
        .with_texture(
            TextureKind::Bump,
            TextureSlot::new(brick_normals).with_scale(Vec2::splat(5.0)),
        );
    renderer.add_static_mesh(StaticMesh::new("wall", wall).with_position(Vec3::new(0.0, 4.0, -2.0)));

    for (name, position, scale) in [
        ("cube", Vec3::new(0.0, -0.75, -1.0), 0.5),
        ("left cube", Vec3::new(-1.0, -0.88, -1.0), 0.25),
        ("right cube", Vec3::new(1.0, -0.88, -1.0), 0.25),
    ] {
        renderer.add_static_mesh(
            StaticMesh::new(name, MeshPart::new(cube.clone()).with_material(MaterialPreset::Default))
                .with_position(position)
                .with_scale(Vec3::splat(scale)),
        );
    }

    let spot = renderer.add_light(
        Light::spot(Vec3::ZERO, Vec3::new(-30.0, 0.0, 0.0)).with_shadows(true),
    );

    let dim = Color::new(0.8, 0.8, 0.8, 1.0);
    renderer.add_light(Light::point(Vec3::new(-2.0, -0.3, 1.0)).with_color(dim));
    renderer.add_light(Light::point(Vec3::new(2.0, -0.3, 1.0)).with_color(dim));

    renderer.set_skybox(Some(sky(ctxt)?));
    Ok(spot)
}

impl Demo {
    fn new(event_loop: &ActiveEventLoop) -> std::result::Result<Demo, Box<dyn std::error::Error>> {
        let attributes = Window::default_attributes()
            .with_title("deferred3d")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let (ctxt, surface) = Context::for_window(window.clone(), &ContextConfig::default())?;
        let config = RendererConfig::default().with_sample_count(4);
        let shaders = RendererShaders::builtin(&ctxt, &config)?;
        let output = RenderOutput::screen(&ctxt, surface, width, height, config.vsync);
        let mut renderer = Renderer::new(&ctxt, output, width, height, config, shaders)?;

        let spot = populate(&ctxt, &mut renderer)?;

        let mut camera = Camera::new(width as f32 / height as f32);
        camera.position = Vec3::new(0.0, 0.0, 3.0);
        camera.rotation.x = -10.0;

        Ok(Demo {
            window,
            renderer,
            controls: ControllableCamera::new(camera, 1.5, 0.3),
            spot,
            spot_speed: 0.001,
            dragging: false,
            cursor: None,
            last_frame: Instant::now(),
        })
    }

    fn key(&mut self, code: KeyCode, state: ElementState) {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        let movement = &mut self.controls.movement;

        match code {
            KeyCode::KeyW => movement.z = amount,
            KeyCode::KeyS => movement.z = -amount,
            KeyCode::KeyD => movement.x = -amount,
            KeyCode::KeyA => movement.x = amount,
            KeyCode::Space => movement.y = amount,
            KeyCode::KeyC => movement.y = -amount,
            _ => {}
        }
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if let (true, Some(last)) = (self.dragging, self.cursor) {
            let delta = Vec2::new((position.x - last.x) as f32, (position.y - last.y) as f32);
            self.controls.drag(delta);
        }
        self.cursor = Some(position);
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let frame_delta_ms = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;

        {
            let mut spot = self.spot.borrow_mut();
            if spot.position.x.abs() > SPOT_SWING {
                self.spot_speed = -self.spot_speed;
            }
            spot.position.x += self.spot_speed * frame_delta_ms;
        }

        self.controls.update(frame_delta_ms);
        self.renderer.set_camera(&self.controls.camera);
        self.renderer
            .draw_frame(Color::new(0.0, 0.0, 0.0, 1.0), ClearFlags::all());
        self.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }

        match Demo::new(event_loop) {
            Ok(demo) => {
                demo.window.request_redraw();
                self.demo = Some(demo);
            }
            Err(err) => {
                log::error!("failed to start the demo: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        let Some(demo) = &mut self.demo else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                if let Err(err) = demo.renderer.resize(size.width, size.height) {
                    log::error!("resize failed: {}", err);
                    event_loop.exit();
                }
                demo.controls.camera.aspect_ratio = size.width as f32 / size.height as f32;
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
                    event_loop.exit();
                } else if let PhysicalKey::Code(code) = event.physical_key {
                    demo.key(code, event.state);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => demo.dragging = state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => demo.cursor_moved(position),
            WindowEvent::RedrawRequested => demo.redraw(),
            _ => {}
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut App::default())?;
    Ok(())
}
