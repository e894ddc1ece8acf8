use cgmath::Point3;

use puffscene::frame::gbuffer::{GBufferAttachment, GBufferLayout};
use puffscene::frame::program::ProgramKind;
use puffscene::frame::recorder::{RecordingBackend, RenderCommand};
use puffscene::frame::RenderBackend;
use puffscene::scene_pkg::camera::Camera;
use puffscene::scene_pkg::deferred::DeferredPipeline;
use puffscene::scene_pkg::scene::Scene;

fn deferred_scene(backend: &mut RecordingBackend) -> Scene {
    let geometry = backend.programs_mut().load("geometry", ProgramKind::Geometry);
    let lighting = backend.programs_mut().load("lighting", ProgramKind::Lighting);
    let mut scene = Scene::new();
    scene.add_camera(Camera::new(Point3::new(0.0, 0.0, 6.0)));
    scene.enable_deferred(backend, DeferredPipeline::new(geometry, lighting));
    scene
}

fn texture_bindings(backend: &RecordingBackend) -> usize {
    backend
        .commands()
        .iter()
        .filter(|c| matches!(c, RenderCommand::BindTexture { .. }))
        .count()
}

#[test]
fn attach_sizes_the_gbuffer_to_the_viewport() {
    let mut backend = RecordingBackend::new(1000, 800);
    let scene = deferred_scene(&mut backend);
    assert_eq!(backend.gbuffer(), Some(GBufferLayout::new(1000, 800)));
    assert_eq!(scene.deferred().and_then(|d| d.layout()), Some(GBufferLayout::new(1000, 800)));
    for attachment in GBufferAttachment::ALL {
        assert_eq!(backend.texture_unit(attachment.texture_unit()), Some(attachment));
    }
}

#[test]
fn same_size_resize_keeps_the_gbuffer() {
    let mut backend = RecordingBackend::new(1000, 800);
    let mut scene = deferred_scene(&mut backend);
    scene.resize(&mut backend, 1000, 800);
    scene.resize(&mut backend, 1000, 800);
    assert_eq!(backend.gbuffer_creations(), 1);
}

#[test]
fn new_size_recreates_without_rebinding_textures() {
    let mut backend = RecordingBackend::new(1000, 800);
    let mut scene = deferred_scene(&mut backend);
    let bound = texture_bindings(&backend);

    backend.set_viewport_dimensions(640, 480);
    scene.resize(&mut backend, 640, 480);
    scene.resize(&mut backend, 640, 480);
    backend.set_viewport_dimensions(1000, 800);
    scene.resize(&mut backend, 1000, 800);

    assert_eq!(backend.gbuffer_creations(), 3);
    assert_eq!(backend.gbuffer(), Some(GBufferLayout::new(1000, 800)));
    assert_eq!(texture_bindings(&backend), bound);
}

#[test]
fn empty_viewport_leaves_the_pipeline_degraded() {
    let mut backend = RecordingBackend::new(1000, 800);
    let mut scene = deferred_scene(&mut backend);
    scene.resize(&mut backend, 0, 0);
    assert_eq!(scene.deferred().map(|d| d.is_ready()), Some(false));

    // the frame is still issued in full
    backend.clear_log();
    scene.render(&mut backend);
    assert_eq!(backend.commands().last(), Some(&RenderCommand::BlitDepth));

    scene.resize(&mut backend, 800, 600);
    assert_eq!(scene.deferred().map(|d| d.is_ready()), Some(true));
}

#[test]
fn lighting_program_samples_the_bound_units() {
    let mut backend = RecordingBackend::new(320, 240);
    let scene = deferred_scene(&mut backend);
    backend.clear_log();
    scene.render(&mut backend);

    let (_, uniforms) = backend.fullscreen_draws().next().expect("lighting pass draw");
    for attachment in GBufferAttachment::ALL {
        let unit = uniforms.int(attachment.sampler_name()).expect("sampler uniform");
        assert_eq!(backend.texture_unit(unit as u32), Some(attachment));
    }
}
