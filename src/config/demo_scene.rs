use cgmath::{EuclideanSpace, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::gbuffer::DisplayMode;
use crate::frame::program::{ProgramHandle, ProgramKind, ProgramTable};
use crate::frame::{RenderBackend, RenderError};
use crate::object_3d_loader::mesh_converters::ObjFileToMeshConverter;
use crate::object_3d_loader::primitives;
use crate::scene_pkg::camera::Camera;
use crate::scene_pkg::deferred::DeferredPipeline;
use crate::scene_pkg::light::{DirectionalLight, Light, PointLight, SpotLight};
use crate::scene_pkg::object3d::Object3D;
use crate::scene_pkg::scene::Scene;
use crate::scene_pkg::transform::Transform;

use super::input::{InputAction, InputHandler};
use super::settings::{CameraSettings, PipelineKind, Settings};

const ORBIT_CENTER: Vector3<f32> = Vector3::new(6.0, 5.0, 0.0);
const ORBIT_RADIUS: f32 = 3.0;
const TETRAHEDRON_AXIS: Vector3<f32> = Vector3::new(0.5, 1.0, 0.0);

#[derive(Clone, Copy, Debug)]
pub struct DemoPrograms {
    pub geometry: ProgramHandle,
    pub lighting: ProgramHandle,
    pub phong: ProgramHandle,
    pub color: ProgramHandle,
    pub normal: ProgramHandle,
}

impl DemoPrograms {
    pub fn load(table: &mut ProgramTable) -> DemoPrograms {
        DemoPrograms {
            geometry: table.load("geometry", ProgramKind::Geometry),
            lighting: table.load("lighting", ProgramKind::Lighting),
            phong: table.load("phong", ProgramKind::Phong),
            color: table.load("color", ProgramKind::Color),
            normal: table.load("normal", ProgramKind::Normal),
        }
    }
}

/// The demo world: three shapes over a floor, an optional model, a sun, an
/// orbiting point light, a camera headlight and a scatter of small lights.
#[derive(Debug)]
pub struct DemoScene {
    pub scene: Scene,
    pub programs: DemoPrograms,
    /// Deferred pipeline set aside while the scene renders forward.
    parked: Option<DeferredPipeline>,
    tetrahedron: usize,
    orbit_light: usize,
    headlight: usize,
}

fn camera_from_settings(settings: &CameraSettings) -> Camera {
    let [x, y, z] = settings.position;
    let mut camera = Camera::new(Point3::new(x, y, z));
    camera.movement_speed = settings.movement_speed;
    camera.mouse_sensitivity = settings.mouse_sensitivity;
    camera.zoom = settings.fov;
    camera.projection = settings.projection;
    camera.ortho_height = settings.ortho_height;
    camera
}

impl DemoScene {
    pub fn build<B: RenderBackend + ?Sized>(
        backend: &mut B,
        settings: &Settings,
    ) -> Result<DemoScene, RenderError> {
        let programs = DemoPrograms::load(backend.programs_mut());
        let mut scene = Scene::new();
        scene.clear_color = settings.renderer.clear_color;
        scene.fog = settings.fog;

        scene.add_camera(camera_from_settings(&settings.camera));
        let mut overview = Camera::new(Point3::new(-8.0, 6.0, 10.0));
        overview.point_at(Point3::new(3.0, 0.0, 0.0));
        scene.add_camera(overview);

        let tetrahedron_mesh = backend.upload_geometry(&primitives::tetrahedron())?;
        let sphere_mesh = backend.upload_geometry(&primitives::sphere(1.0, 36))?;
        let cube_mesh = backend.upload_geometry(&primitives::cube())?;

        let tetrahedron = scene.add_object(Object3D::new(tetrahedron_mesh), programs.color);
        let at = |x: f32, y: f32, z: f32| Transform {
            position: Vector3::new(x, y, z),
            ..Transform::default()
        };
        scene.add_object(
            Object3D::new(sphere_mesh).with_transform(at(3.0, 0.0, 0.0)),
            programs.normal,
        );
        scene.add_object(
            Object3D::new(sphere_mesh).with_transform(at(6.0, 0.0, 0.0)),
            programs.phong,
        );
        let floor = Transform {
            scale: Vector3::new(40.0, 0.1, 40.0),
            ..at(0.0, -1.5, 0.0)
        };
        scene.add_object(
            Object3D::new(cube_mesh)
                .with_transform(floor)
                .with_color(Vector3::new(0.6, 0.6, 0.6)),
            programs.phong,
        );

        if let Some(path) = &settings.scene.model_path {
            match ObjFileToMeshConverter::new(path.clone()).create_mesh() {
                Ok(mesh) => match backend.upload_geometry(&mesh) {
                    Ok(model) => {
                        scene.add_object(
                            Object3D::new(model).with_transform(at(-4.0, 0.0, 0.0)),
                            programs.phong,
                        );
                    }
                    Err(e) => log::error!("skipping model {}: {}", path.display(), e),
                },
                Err(e) => log::error!("skipping model: {}", e),
            }
        }

        scene.add_light(DirectionalLight::new(
            Vector3::new(-0.2, -1.0, -0.3),
            Vector3::new(0.4, 0.4, 0.4),
        ));
        let orbit_light = scene.add_light(PointLight::new(ORBIT_CENTER, Vector3::new(1.0, 1.0, 1.0)));
        let camera = camera_from_settings(&settings.camera);
        let headlight = scene.add_light(SpotLight::new(
            camera.position.to_vec(),
            camera.front(),
            Vector3::new(1.0, 1.0, 0.9),
        ));
        scatter_point_lights(&mut scene, settings.scene.point_lights, settings.scene.seed);

        let mut pipeline = DeferredPipeline::new(programs.geometry, programs.lighting);
        pipeline.display_mode = settings.renderer.display_mode;
        let mut demo = DemoScene {
            scene,
            programs,
            parked: Some(pipeline),
            tetrahedron,
            orbit_light,
            headlight,
        };
        if settings.renderer.pipeline == PipelineKind::Deferred {
            demo.set_pipeline(backend, PipelineKind::Deferred);
        }
        log::info!(
            "demo scene: {} objects, {} lights, {} cameras",
            demo.scene.objects().len(),
            demo.scene.lights().len(),
            demo.scene.cameras().len()
        );
        Ok(demo)
    }

    pub fn pipeline(&self) -> PipelineKind {
        if self.scene.is_deferred() {
            PipelineKind::Deferred
        } else {
            PipelineKind::Forward
        }
    }

    pub fn set_pipeline<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, kind: PipelineKind) {
        match kind {
            PipelineKind::Deferred => {
                if let Some(pipeline) = self.parked.take() {
                    self.scene.enable_deferred(backend, pipeline);
                }
            }
            PipelineKind::Forward => {
                if let Some(pipeline) = self.scene.disable_deferred() {
                    self.parked = Some(pipeline);
                }
            }
        }
        log::info!("pipeline: {:?}", self.pipeline());
    }

    pub fn toggle_pipeline<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        let next = match self.pipeline() {
            PipelineKind::Deferred => PipelineKind::Forward,
            PipelineKind::Forward => PipelineKind::Deferred,
        };
        self.set_pipeline(backend, next);
    }

    /// Lighting-pass output, kept on the parked pipeline in forward mode.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.scene.set_display_mode(mode);
        if let Some(pipeline) = self.parked.as_mut() {
            pipeline.display_mode = mode;
        }
    }

    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.scene
            .deferred()
            .or(self.parked.as_ref())
            .map(|pipeline| pipeline.display_mode)
    }

    /// Scene-level input actions. Returns false for the ones the driver
    /// handles itself.
    pub fn apply_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::SetDisplayMode(mode) => {
                self.set_display_mode(mode);
                log::info!("display mode: {:?}", mode);
                true
            }
            other => other.apply_to_scene(&mut self.scene),
        }
    }

    /// Advances one frame: camera input first, so the headlight follows the
    /// camera it is drawn from.
    pub fn step(&mut self, input: &mut InputHandler, delta_time: f32) {
        self.scene.advance_frame(delta_time);
        if let Some(camera) = self.scene.active_camera_mut() {
            input.update_camera(camera, delta_time);
        } else {
            input.end_frame();
        }
        self.animate(self.scene.elapsed());
    }

    /// Poses the animated parts for scene time `time` in seconds.
    pub fn animate(&mut self, time: f32) {
        if let Some(object) = self.scene.object_mut(self.tetrahedron) {
            object.transform.rotation_angle = time;
            object.transform.rotation_axis = TETRAHEDRON_AXIS;
        }
        if let Some(Light::Point(light)) = self.scene.light_mut(self.orbit_light) {
            light.position =
                ORBIT_CENTER + Vector3::new(time.sin(), 0.0, time.cos()) * ORBIT_RADIUS;
        }
        let eye = self
            .scene
            .active_camera()
            .map(|camera| (camera.position.to_vec(), camera.front()));
        if let (Some((position, front)), Some(Light::Spot(light))) =
            (eye, self.scene.light_mut(self.headlight))
        {
            light.position = position;
            light.direction = front;
        }
    }
}

fn scatter_point_lights(scene: &mut Scene, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..count {
        let position = Vector3::new(
            rng.gen_range(-15.0..15.0),
            rng.gen_range(-1.0..1.5),
            rng.gen_range(-15.0..15.0),
        );
        let color = Vector3::new(
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
        );
        scene.add_light(PointLight::new(position, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::gbuffer::GBufferLayout;
    use crate::frame::recorder::{RecordingBackend, RenderCommand};
    use approx::assert_relative_eq;
    use winit::event::{ElementState, VirtualKeyCode};

    fn forward_settings() -> Settings {
        let mut settings = Settings::default();
        settings.renderer.pipeline = PipelineKind::Forward;
        settings
    }

    #[test]
    fn forward_demo_draws_every_object_once() {
        let mut backend = RecordingBackend::new(1000, 800);
        let demo = DemoScene::build(&mut backend, &forward_settings()).expect("demo builds");
        assert_eq!(demo.scene.objects().len(), 4);
        assert_eq!(demo.scene.lights().len(), 3 + 6);

        backend.clear_log();
        demo.scene.render(&mut backend);
        let programs: Vec<ProgramHandle> = backend.draws().map(|(program, _)| program).collect();
        let p = demo.programs;
        assert_eq!(programs, vec![p.color, p.normal, p.phong, p.phong]);
    }

    #[test]
    fn deferred_demo_builds_gbuffer_at_viewport_size() {
        let mut backend = RecordingBackend::new(1000, 800);
        let demo = DemoScene::build(&mut backend, &Settings::default()).expect("demo builds");
        assert_eq!(demo.pipeline(), PipelineKind::Deferred);
        assert_eq!(backend.gbuffer().map(|g| g.dimensions()), Some([1000, 800]));
    }

    #[test]
    fn toggling_pipeline_at_the_same_size_keeps_the_gbuffer() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut demo = DemoScene::build(&mut backend, &Settings::default()).expect("demo builds");
        demo.toggle_pipeline(&mut backend);
        assert_eq!(demo.pipeline(), PipelineKind::Forward);
        demo.toggle_pipeline(&mut backend);
        assert_eq!(demo.pipeline(), PipelineKind::Deferred);
        assert_eq!(backend.gbuffer_creations(), 1);
        assert_eq!(backend.gbuffer(), Some(GBufferLayout::new(640, 480)));
    }

    #[test]
    fn toggling_back_after_a_resize_follows_the_viewport() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut demo = DemoScene::build(&mut backend, &Settings::default()).expect("demo builds");
        demo.toggle_pipeline(&mut backend);
        backend.set_viewport_dimensions(800, 600);
        demo.toggle_pipeline(&mut backend);
        assert_eq!(backend.gbuffer_creations(), 2);
        assert_eq!(backend.gbuffer(), Some(GBufferLayout::new(800, 600)));
    }

    #[test]
    fn display_mode_chosen_in_forward_mode_survives_the_toggle() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut demo = DemoScene::build(&mut backend, &forward_settings()).expect("demo builds");
        assert!(demo.apply_action(InputAction::SetDisplayMode(DisplayMode::Albedo)));
        assert_eq!(demo.display_mode(), Some(DisplayMode::Albedo));

        demo.toggle_pipeline(&mut backend);
        assert_eq!(
            demo.scene.deferred().map(|d| d.display_mode),
            Some(DisplayMode::Albedo)
        );
    }

    #[test]
    fn animation_moves_orbit_light_and_headlight() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut demo = DemoScene::build(&mut backend, &forward_settings()).expect("demo builds");
        demo.animate(std::f32::consts::FRAC_PI_2);
        match demo.scene.light(1) {
            Some(Light::Point(light)) => {
                assert_relative_eq!(light.position.x, 9.0, epsilon = 1e-5);
                assert_relative_eq!(light.position.z, 0.0, epsilon = 1e-5);
            }
            other => panic!("expected the orbiting point light, got {:?}", other),
        }

        demo.scene.set_active_camera(1);
        demo.animate(0.0);
        let front = demo.scene.active_camera().map(|c| c.front()).expect("camera");
        match demo.scene.light(2) {
            Some(Light::Spot(light)) => {
                assert_relative_eq!(light.position.x, -8.0);
                assert_relative_eq!(light.direction.y, front.y);
            }
            other => panic!("expected the headlight, got {:?}", other),
        }
    }

    #[test]
    fn headlight_tracks_the_camera_in_the_same_frame() {
        let mut backend = RecordingBackend::new(640, 480);
        let mut demo = DemoScene::build(&mut backend, &forward_settings()).expect("demo builds");
        let mut input = InputHandler::new();
        input.handle_key(VirtualKeyCode::W, ElementState::Pressed);
        demo.step(&mut input, 0.5);

        let camera = demo.scene.active_camera().map(|c| c.position).expect("camera");
        assert_relative_eq!(camera.z, 6.0 - 2.5 * 0.5, epsilon = 1e-5);
        match demo.scene.light(2) {
            Some(Light::Spot(light)) => assert_relative_eq!(light.position.z, camera.z),
            other => panic!("expected the headlight, got {:?}", other),
        }
    }

    #[test]
    fn scattered_lights_are_reproducible() {
        let mut a = Scene::new();
        let mut b = Scene::new();
        scatter_point_lights(&mut a, 4, 99);
        scatter_point_lights(&mut b, 4, 99);
        assert_eq!(a.lights(), b.lights());
    }

    #[test]
    fn unreadable_model_is_skipped() {
        let mut settings = forward_settings();
        settings.scene.model_path = Some("/no/such/model.obj".into());
        let mut backend = RecordingBackend::new(640, 480);
        let demo = DemoScene::build(&mut backend, &settings).expect("demo builds");
        assert_eq!(demo.scene.objects().len(), 4);
        assert!(!backend
            .commands()
            .iter()
            .any(|c| matches!(c, RenderCommand::CreateGBuffer(_))));
    }
}
