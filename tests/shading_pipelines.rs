use approx::assert_relative_eq;
use cgmath::{Point3, Vector3};

use puffscene::frame::gbuffer::DisplayMode;
use puffscene::frame::gpu_uniforms::FrameUniforms;
use puffscene::frame::program::{ProgramHandle, ProgramKind};
use puffscene::frame::recorder::RecordingBackend;
use puffscene::frame::shading::{
    forward_vertex, geometry_pass_texel, resolve_deferred, shade_deferred, shade_forward,
    GBufferTexel,
};
use puffscene::frame::RenderBackend;
use puffscene::object_3d_loader::primitives;
use puffscene::scene_pkg::camera::Camera;
use puffscene::scene_pkg::deferred::DeferredPipeline;
use puffscene::scene_pkg::light::{Light, PointLight, SpotLight};
use puffscene::scene_pkg::mesh::Mesh;
use puffscene::scene_pkg::object3d::Object3D;
use puffscene::scene_pkg::scene::Scene;
use puffscene::scene_pkg::transform::Transform;

struct Fixture {
    backend: RecordingBackend,
    scene: Scene,
    mesh: Mesh,
    geometry: ProgramHandle,
    lighting: ProgramHandle,
}

fn sphere_fixture(light: Light) -> Fixture {
    let mut backend = RecordingBackend::new(800, 600);
    let geometry = backend.programs_mut().load("geometry", ProgramKind::Geometry);
    let lighting = backend.programs_mut().load("lighting", ProgramKind::Lighting);
    let phong = backend.programs_mut().load("phong", ProgramKind::Phong);

    let mesh = primitives::sphere(1.0, 24);
    let handle = backend.upload_geometry(&mesh).expect("recording upload");

    let mut scene = Scene::new();
    let mut camera = Camera::new(Point3::new(1.0, 1.5, 5.0));
    camera.point_at(Point3::new(0.5, 0.0, 0.0));
    scene.add_camera(camera);
    scene.add_light(light);
    let transform = Transform {
        position: Vector3::new(0.5, 0.0, 0.0),
        rotation_angle: 0.7,
        rotation_axis: Vector3::new(0.0, 1.0, 0.0),
        scale: Vector3::new(1.5, 1.0, 1.0),
    };
    scene.add_object(
        Object3D::new(handle)
            .with_transform(transform)
            .with_color(Vector3::new(1.0, 0.5, 0.31)),
        phong,
    );

    Fixture {
        backend,
        scene,
        mesh,
        geometry,
        lighting,
    }
}

fn forward_colors(fixture: &mut Fixture) -> Vec<Vector3<f32>> {
    fixture.backend.clear_log();
    fixture.scene.render(&mut fixture.backend);
    let (_, block) = fixture.backend.draws().next().expect("forward draw");
    let uniforms = FrameUniforms::from_block(block);

    let mesh = &fixture.mesh;
    (0..mesh.vertex_count())
        .map(|i| {
            let (world_pos, world_normal) = forward_vertex(
                &uniforms,
                Vector3::from(mesh.vertices[i].position),
                Vector3::from(mesh.normals[i].normal),
            );
            shade_forward(&uniforms, world_pos, world_normal, Vector3::from(mesh.colors[i].color))
        })
        .collect()
}

fn deferred_colors(fixture: &mut Fixture) -> Vec<Vector3<f32>> {
    fixture.backend.clear_log();
    fixture.scene.render(&mut fixture.backend);
    let geometry = fixture.geometry;
    let (_, block) = fixture
        .backend
        .draws()
        .find(|(program, _)| *program == geometry)
        .expect("geometry pass draw");
    let geometry_uniforms = FrameUniforms::from_block(block);
    let (program, block) = fixture
        .backend
        .fullscreen_draws()
        .next()
        .expect("lighting pass draw");
    assert_eq!(program, fixture.lighting);
    let lighting_uniforms = FrameUniforms::from_block(block);

    let mesh = &fixture.mesh;
    (0..mesh.vertex_count())
        .map(|i| {
            let texel = geometry_pass_texel(
                &geometry_uniforms,
                Vector3::from(mesh.vertices[i].position),
                Vector3::from(mesh.normals[i].normal),
                Vector3::from(mesh.colors[i].color),
            );
            shade_deferred(&lighting_uniforms, &texel).expect("foreground texel")
        })
        .collect()
}

fn assert_pipelines_agree(mut fixture: Fixture) {
    let forward = forward_colors(&mut fixture);
    let pipeline = DeferredPipeline::new(fixture.geometry, fixture.lighting);
    fixture.scene.enable_deferred(&mut fixture.backend, pipeline);
    let deferred = deferred_colors(&mut fixture);

    assert_eq!(forward.len(), deferred.len());
    for (f, d) in forward.iter().zip(&deferred) {
        // the albedo target stores 8 bits per channel
        assert_relative_eq!(f.x, d.x, epsilon = 1e-2);
        assert_relative_eq!(f.y, d.y, epsilon = 1e-2);
        assert_relative_eq!(f.z, d.z, epsilon = 1e-2);
    }
}

#[test]
fn point_light_shades_the_same_in_both_pipelines() {
    let light = PointLight::new(Vector3::new(2.0, 2.0, 3.0), Vector3::new(1.0, 1.0, 1.0));
    assert_pipelines_agree(sphere_fixture(light.into()));
}

#[test]
fn spot_light_with_fog_shades_the_same_in_both_pipelines() {
    let mut spot = SpotLight::new(
        Vector3::new(0.0, 3.0, 3.0),
        Vector3::new(0.1, -0.7, -0.7),
        Vector3::new(0.9, 0.9, 1.0),
    );
    spot.set_outer_cut_off_degrees(30.0);
    let mut fixture = sphere_fixture(spot.into());
    fixture.scene.fog.enabled = true;
    fixture.scene.fog.start = 2.0;
    fixture.scene.fog.end = 9.0;
    assert_pipelines_agree(fixture);
}

#[test]
fn background_pixels_keep_the_clear_color() {
    let light = PointLight::new(Vector3::new(2.0, 2.0, 3.0), Vector3::new(1.0, 1.0, 1.0));
    let mut fixture = sphere_fixture(light.into());
    let pipeline = DeferredPipeline::new(fixture.geometry, fixture.lighting);
    fixture.scene.enable_deferred(&mut fixture.backend, pipeline);
    fixture.backend.clear_log();
    fixture.scene.render(&mut fixture.backend);

    let geometry = fixture.geometry;
    let (_, block) = fixture
        .backend
        .draws()
        .find(|(program, _)| *program == geometry)
        .expect("geometry pass draw");
    let geometry_uniforms = FrameUniforms::from_block(block);
    let mesh = &fixture.mesh;
    for i in 0..mesh.vertex_count() {
        let texel = geometry_pass_texel(
            &geometry_uniforms,
            Vector3::from(mesh.vertices[i].position),
            Vector3::from(mesh.normals[i].normal),
            Vector3::from(mesh.colors[i].color),
        );
        assert!(!texel.is_background());
    }

    let (_, block) = fixture.backend.fullscreen_draws().next().expect("lighting pass draw");
    let uniforms = FrameUniforms::from_block(block);
    let clear = fixture.scene.clear_color;
    let background = resolve_deferred(&uniforms, &GBufferTexel::background(), clear);
    assert_eq!(background, Vector3::new(clear[0], clear[1], clear[2]));
}

#[test]
fn display_mode_reaches_the_lighting_program() {
    let light = PointLight::new(Vector3::new(2.0, 2.0, 3.0), Vector3::new(1.0, 1.0, 1.0));
    let mut fixture = sphere_fixture(light.into());
    let pipeline = DeferredPipeline::new(fixture.geometry, fixture.lighting);
    fixture.scene.enable_deferred(&mut fixture.backend, pipeline);
    fixture.scene.set_display_mode(DisplayMode::Albedo);
    fixture.backend.clear_log();
    fixture.scene.render(&mut fixture.backend);

    let (_, block) = fixture.backend.fullscreen_draws().next().expect("lighting pass draw");
    assert_eq!(block.int("displayMode"), Some(DisplayMode::Albedo.as_uniform()));
    let uniforms = FrameUniforms::from_block(block);
    let texel = GBufferTexel {
        position: [0.0, 0.0, -3.0, 1.0],
        normal: [0.0, 0.0, 1.0, 1.0],
        albedo_spec: [0.2, 0.4, 0.6, 0.5],
    };
    let shown = shade_deferred(&uniforms, &texel).expect("foreground");
    assert_relative_eq!(shown.x, 0.2);
    assert_relative_eq!(shown.y, 0.4);
    assert_relative_eq!(shown.z, 0.6);
}
