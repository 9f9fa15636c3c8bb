//! End-to-end frames rendered offscreen.
//!
//! These need a GPU adapter (a software one such as lavapipe or WARP is fine) and
//! are ignored by default. Run them with `cargo test --test render -- --ignored`.

use std::sync::Arc;

use deferred3d::prelude::*;
use deferred3d::resource::{DefaultTextures, RenderTargets};
use deferred3d::scene::default_texture;

const WIDTH: u32 = 64;
const HEIGHT: u32 = 64;

fn context() -> Context {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::headless(&ContextConfig::default()).expect("a GPU adapter is required by this test")
}

fn renderer(ctxt: &Context, config: RendererConfig) -> Renderer {
    let shaders = RendererShaders::builtin(ctxt, &config).expect("builtin shaders compile");
    let output = RenderOutput::offscreen(ctxt, WIDTH, HEIGHT);
    let mut renderer =
        Renderer::new(ctxt, output, WIDTH, HEIGHT, config, shaders).expect("renderer");

    let mut camera = Camera::new(WIDTH as f32 / HEIGHT as f32);
    camera.position = Vec3::ZERO;
    renderer.set_camera(&camera);
    renderer
}

fn plane(ctxt: &Context, size: f32, z: f32) -> StaticMesh {
    let (vertices, indices) = procedural::plane(size);
    let geometry = GeometryBuffer::new(ctxt, vertices, indices, GeometryOptions::lit())
        .expect("plane geometry");
    StaticMesh::new("plane", MeshPart::new(geometry))
        .with_position(Vec3::new(0.0, 0.0, z))
        .with_shadows(false)
}

fn blocker(ctxt: &Context, position: Vec3) -> StaticMesh {
    let (vertices, indices) = procedural::cube_fully_indexed(0.5);
    let options = GeometryOptions::lit().with_adjacency(true);
    let geometry = GeometryBuffer::new(ctxt, vertices, indices, options).expect("cube geometry");
    StaticMesh::new("blocker", MeshPart::new(geometry)).with_position(position)
}

fn brightness(pixels: &[u8], x: u32, y: u32) -> u32 {
    let i = ((y * WIDTH + x) * 4) as usize;
    pixels[i..i + 3].iter().map(|c| *c as u32).sum()
}

fn center(renderer: &mut Renderer) -> u32 {
    renderer.draw_frame(color::BLACK, ClearFlags::all());
    let pixels = renderer.read_pixels().expect("readback");
    assert_eq!(pixels.len(), (WIDTH * HEIGHT * 4) as usize);
    brightness(&pixels, WIDTH / 2, HEIGHT / 2)
}

#[test]
#[ignore = "needs a GPU adapter"]
fn lit_quad_center_is_not_black() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
    renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

    assert!(center(&mut renderer) > 0);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn empty_scene_is_cleared_to_the_clear_color() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    renderer.draw_frame(color::RED, ClearFlags::all());
    let pixels = renderer.read_pixels().expect("readback");
    assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn brightness_decreases_with_quadratic_attenuation() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
    let light = renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

    let mut previous = u32::MAX;
    for quadratic in [0.0, 0.5, 2.0, 8.0] {
        light.borrow_mut().attenuation.quadratic = quadratic;
        let value = center(&mut renderer);
        assert!(value < previous, "quadratic {}: {} >= {}", quadratic, value, previous);
        previous = value;
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn symmetric_lights_give_symmetric_brightness() {
    let ctxt = context();

    let render = |order: [f32; 2]| {
        let mut renderer = renderer(&ctxt, RendererConfig::default());
        renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
        for x in order {
            renderer.add_light(Light::point(Vec3::new(x, 0.0, -1.5)).with_render(false));
        }
        renderer.draw_frame(color::BLACK, ClearFlags::all());
        renderer.read_pixels().expect("readback")
    };

    let pixels = render([-0.5, 0.5]);
    for x in [4, WIDTH / 4, WIDTH / 2 - 3] {
        let left = brightness(&pixels, x, HEIGHT / 2) as i64;
        let right = brightness(&pixels, WIDTH - 1 - x, HEIGHT / 2) as i64;
        assert!((left - right).abs() <= 6, "x = {}: {} vs {}", x, left, right);
    }

    let reversed = render([0.5, -0.5]);
    for (a, b) in pixels.iter().zip(reversed.iter()) {
        assert!((*a as i32 - *b as i32).abs() <= 1);
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn shadow_casters_darken_the_receiver() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    // The point light, the blocker and the center of the receiver are aligned.
    renderer.add_static_mesh(plane(&ctxt, 8.0, -4.0));
    let blocker = renderer.add_static_mesh(blocker(&ctxt, Vec3::new(1.0, 0.0, -3.0)));
    renderer.add_light(
        Light::point(Vec3::new(2.0, 0.0, -2.0))
            .with_render(false)
            .with_shadows(true),
    );

    let shadowed = center(&mut renderer);
    blocker.borrow_mut().cast_shadows = false;
    let lit = center(&mut renderer);

    assert!(shadowed < lit, "{} >= {}", shadowed, lit);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn forward_mode_lights_the_quad() {
    let ctxt = context();
    let config = RendererConfig::default().with_mode(RenderMode::Forward);
    let mut renderer = renderer(&ctxt, config);

    renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
    renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

    assert!(center(&mut renderer) > 0);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn gizmos_are_drawn_with_the_light_color() {
    let ctxt = context();
    let config = RendererConfig::default().with_gizmo_size(1.0);
    let mut renderer = renderer(&ctxt, config);

    renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -3.0)).with_color(color::LIME));
    renderer.draw_frame(color::BLACK, ClearFlags::all());

    let pixels = renderer.read_pixels().expect("readback");
    let i = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 4) as usize;
    assert_eq!(&pixels[i..i + 4], &[0, 255, 0, 255]);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn untextured_parts_use_the_default_textures() {
    let ctxt = context();

    let render = |diffuse: Option<Arc<Texture>>| {
        let mut renderer = renderer(&ctxt, RendererConfig::default());
        let mut mesh = plane(&ctxt, 4.0, -2.0);
        mesh.parts_mut()[0].diffuse.texture = diffuse;
        renderer.add_static_mesh(mesh);
        renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

        renderer.draw_frame(color::BLACK, ClearFlags::all());
        let pixels = renderer.read_pixels().expect("readback");
        let i = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2]]
    };

    let [r, g, b] = render(None);
    assert!(r > 0);
    assert_eq!((r, r), (g, b));

    let red = Texture::solid(&ctxt, [255, 0, 0, 255]).expect("texture");
    let [r, g, _] = render(Some(red));
    assert!(r > g);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn skybox_fills_the_background() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    let blue = [0u8, 0, 255];
    let face = CubeFace {
        data: &blue,
        width: 1,
        height: 1,
        bpp: 3,
    };
    let sky = CubeTexture::new(&ctxt, &[face; 6], false).expect("cube texture");
    renderer.set_skybox(Some(Arc::clone(&sky)));

    renderer.draw_frame(color::BLACK, ClearFlags::all());
    let pixels = renderer.read_pixels().expect("readback");
    assert_eq!(&pixels[..4], &[0, 0, 255, 255]);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn resize_changes_the_readback_size() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    renderer.resize(32, 16).expect("resize");
    renderer.draw_frame(color::BLACK, ClearFlags::all());
    assert_eq!(renderer.read_pixels().expect("readback").len(), 32 * 16 * 4);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn missing_programs_are_reported() {
    let ctxt = context();
    let output = RenderOutput::offscreen(&ctxt, WIDTH, HEIGHT);
    let result = Renderer::new(
        &ctxt,
        output,
        WIDTH,
        HEIGHT,
        RendererConfig::default(),
        RendererShaders::default(),
    );

    assert!(matches!(result, Err(RendererError::MissingShader(_))));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn invalid_shaders_fail_to_compile() {
    let ctxt = context();
    let source = "/*VERTEX-SHADER-BEGIN*/ fn vs_main( /*VERTEX-SHADER-END*/\
                  /*FRAGMENT-SHADER-BEGIN*/ /*FRAGMENT-SHADER-END*/";

    let result = ShaderProgram::new(&ctxt, "broken", source);
    assert!(matches!(
        result,
        Err(RendererError::ShaderCompilation { .. }) | Err(RendererError::ShaderLink { .. })
    ));
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * WIDTH + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn frame(renderer: &mut Renderer, clear_color: Color) -> Vec<u8> {
    renderer.draw_frame(clear_color, ClearFlags::all());
    renderer.read_pixels().expect("readback")
}

#[test]
#[ignore = "needs a GPU adapter"]
fn multisampled_frames_are_resolved() {
    let ctxt = context();
    let config = RendererConfig::default().with_sample_count(4);
    let mut renderer = renderer(&ctxt, config);

    // Small enough to leave the corners on the background.
    renderer.add_static_mesh(plane(&ctxt, 1.0, -2.0));
    renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

    let pixels = frame(&mut renderer, color::RED);
    assert!(brightness(&pixels, WIDTH / 2, HEIGHT / 2) > 0);
    assert_eq!(pixel(&pixels, 0, 0), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, WIDTH - 1, HEIGHT - 1), [255, 0, 0, 255]);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn directional_lights_only_light_surfaces_facing_them() {
    let ctxt = context();

    let render = |rotation: Vec3| {
        let mut renderer = renderer(&ctxt, RendererConfig::default());
        renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
        renderer.add_light(Light::directional(rotation).with_render(false));
        center(&mut renderer)
    };

    // No rotation shines along -Z, onto the +Z facing plane. A half turn around
    // Y shines along +Z, onto its back.
    let facing = render(Vec3::ZERO);
    let behind = render(Vec3::new(0.0, 180.0, 0.0));
    let ambient = {
        let mut renderer = renderer(&ctxt, RendererConfig::default());
        renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
        center(&mut renderer)
    };

    assert!(facing > behind, "{} <= {}", facing, behind);
    assert!(behind.abs_diff(ambient) <= 3, "{} vs {}", behind, ambient);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn spot_lights_only_light_their_cone() {
    let ctxt = context();

    let render = |with_spot: bool| {
        let mut renderer = renderer(&ctxt, RendererConfig::default());
        renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
        if with_spot {
            // 1 unit away from the plane: the 45° outer cone covers a disc of
            // radius 1 around the center, the view corners are beyond it.
            renderer.add_light(Light::spot(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO).with_render(false));
        }
        frame(&mut renderer, color::BLACK)
    };

    let lit = render(true);
    let ambient = render(false);

    let center = brightness(&lit, WIDTH / 2, HEIGHT / 2);
    assert!(center > brightness(&ambient, WIDTH / 2, HEIGHT / 2));

    for (x, y) in [(0, 0), (WIDTH - 1, 0), (0, HEIGHT - 1), (WIDTH - 1, HEIGHT - 1)] {
        let corner = brightness(&lit, x, y);
        let unlit = brightness(&ambient, x, y);
        assert!(corner.abs_diff(unlit) <= 3, "({}, {}): {} vs {}", x, y, corner, unlit);
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn open_meshes_cast_shadows() {
    let ctxt = context();
    let mut renderer = renderer(&ctxt, RendererConfig::default());

    // A single quad has four boundary edges, all extruded into the volume.
    let (vertices, indices) = procedural::plane(0.5);
    let options = GeometryOptions::lit().with_adjacency(true);
    let geometry = GeometryBuffer::new(&ctxt, vertices, indices, options).expect("quad geometry");
    assert!(geometry.adjacency().expect("adjacency").phantom_count() > 0);

    renderer.add_static_mesh(plane(&ctxt, 8.0, -4.0));
    let occluder = renderer.add_static_mesh(
        StaticMesh::new("occluder", MeshPart::new(geometry)).with_position(Vec3::new(1.0, 0.0, -3.0)),
    );
    renderer.add_light(
        Light::point(Vec3::new(2.0, 0.0, -2.0))
            .with_render(false)
            .with_shadows(true),
    );

    let shadowed = center(&mut renderer);
    occluder.borrow_mut().cast_shadows = false;
    let lit = center(&mut renderer);

    assert!(shadowed < lit, "{} >= {}", shadowed, lit);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn zero_sized_resizes_keep_the_targets() {
    let ctxt = context();

    let mut targets = RenderTargets::new(&ctxt, WIDTH, HEIGHT, 1, true).expect("targets");
    assert!(targets.resize(0, HEIGHT).is_err());
    assert!(targets.resize(WIDTH, 0).is_err());
    assert!(targets.gbuffer().is_some());
    assert!(targets.frame().is_some());
    assert_eq!(targets.size(), (WIDTH, HEIGHT));

    let mut renderer = renderer(&ctxt, RendererConfig::default());
    renderer.add_static_mesh(plane(&ctxt, 4.0, -2.0));
    renderer.add_light(Light::point(Vec3::new(0.0, 0.0, -1.0)).with_render(false));

    assert!(matches!(
        renderer.resize(0, 16),
        Err(RendererError::IncompleteRenderTarget { .. })
    ));
    assert!(center(&mut renderer) > 0);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn empty_slots_resolve_to_the_default_textures() {
    let ctxt = context();
    let defaults = DefaultTextures::new(&ctxt).expect("default textures");
    let mut part = plane(&ctxt, 1.0, 0.0).parts_mut()[0].clone();

    for kind in TextureKind::ALL {
        let fallback = part.effective_texture(kind, &defaults);
        assert!(Arc::ptr_eq(fallback, default_texture(kind, &defaults)), "{:?}", kind);
    }

    let own = Texture::solid(&ctxt, [1, 2, 3, 4]).expect("texture");
    part.bump.texture = Some(own.clone());
    assert!(Arc::ptr_eq(part.effective_texture(TextureKind::Bump, &defaults), &own));
    assert!(Arc::ptr_eq(
        part.effective_texture(TextureKind::Diffuse, &defaults),
        &defaults.diffuse
    ));
}
