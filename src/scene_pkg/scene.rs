use cgmath::{EuclideanSpace, Matrix4, Vector3};

use crate::frame::gbuffer::DisplayMode;
use crate::frame::program::ProgramHandle;
use crate::frame::{RenderBackend, RenderTarget};

use super::camera::Camera;
use super::deferred::DeferredPipeline;
use super::fog::Fog;
use super::light::{Light, LightSpace, MAX_LIGHTS};
use super::object3d::Object3D;

/// A drawable paired with the program it is shaded with in forward mode.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub object: Object3D,
    pub program: ProgramHandle,
}

/// Owns every camera, light and object; renders them through a backend.
///
/// Everything is stored in insertion order and addressed by index. Nothing
/// is ever removed, so an index stays valid for the scene lifetime.
#[derive(Clone, Debug)]
pub struct Scene {
    cameras: Vec<Camera>,
    active_camera: usize,
    lights: Vec<Light>,
    objects: Vec<SceneObject>,
    deferred: Option<DeferredPipeline>,
    elapsed: f32,
    pub fog: Fog,
    pub clear_color: [f32; 4],
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            cameras: vec![],
            active_camera: 0,
            lights: vec![],
            objects: vec![],
            deferred: None,
            elapsed: 0.0,
            fog: Fog::default(),
            clear_color: [0.2, 0.3, 0.3, 1.0],
        }
    }

    // cameras

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// Out-of-range indices leave the current selection untouched.
    pub fn set_active_camera(&mut self, index: usize) {
        if index < self.cameras.len() {
            self.active_camera = index;
        } else {
            log::debug!(
                "ignoring camera index {} ({} cameras registered)",
                index,
                self.cameras.len()
            );
        }
    }

    pub fn active_camera_index(&self) -> Option<usize> {
        if self.cameras.is_empty() {
            None
        } else {
            Some(self.active_camera)
        }
    }

    pub fn active_camera(&self) -> Option<&Camera> {
        self.cameras.get(self.active_camera)
    }

    pub fn active_camera_mut(&mut self) -> Option<&mut Camera> {
        self.cameras.get_mut(self.active_camera)
    }

    pub fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    // lights

    pub fn add_light(&mut self, light: impl Into<Light>) -> usize {
        self.lights.push(light.into());
        if self.lights.len() == MAX_LIGHTS + 1 {
            log::warn!("more than {} lights, the rest are not shaded", MAX_LIGHTS);
        }
        self.lights.len() - 1
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    // objects

    pub fn add_object(&mut self, object: Object3D, program: ProgramHandle) -> usize {
        self.objects.push(SceneObject { object, program });
        self.objects.len() - 1
    }

    pub fn object_mut(&mut self, index: usize) -> Option<&mut Object3D> {
        self.objects.get_mut(index).map(|entry| &mut entry.object)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    // pipeline selection

    /// Switches to deferred shading and builds the G-buffer.
    pub fn enable_deferred<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        mut pipeline: DeferredPipeline,
    ) {
        pipeline.attach(backend);
        self.deferred = Some(pipeline);
    }

    /// Back to forward shading. The detached pipeline can be re-enabled.
    pub fn disable_deferred(&mut self) -> Option<DeferredPipeline> {
        self.deferred.take()
    }

    pub fn deferred(&self) -> Option<&DeferredPipeline> {
        self.deferred.as_ref()
    }

    pub fn deferred_mut(&mut self) -> Option<&mut DeferredPipeline> {
        self.deferred.as_mut()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Sets the lighting-pass output. Ignored in forward mode.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if let Some(deferred) = self.deferred.as_mut() {
            deferred.display_mode = mode;
        }
    }

    pub fn resize<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, width: u32, height: u32) {
        if let Some(deferred) = self.deferred.as_mut() {
            deferred.resize(backend, width, height);
        }
    }

    // time

    pub fn advance_frame(&mut self, delta_time: f32) {
        self.elapsed += delta_time;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    // rendering

    /// Records one frame. Without an active camera nothing is drawn.
    pub fn render<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        let camera = match self.active_camera() {
            Some(camera) => camera,
            None => {
                log::warn!("no active camera, skipping frame");
                return;
            }
        };
        let [width, height] = backend.viewport_dimensions();
        let projection = camera.projection_matrix(width, height);
        let view = camera.view_matrix();

        match &self.deferred {
            Some(deferred) => self.render_deferred(backend, deferred, projection, view),
            None => self.render_forward(backend, camera, projection, view),
        }
    }

    fn shaded_lights(&self) -> &[Light] {
        &self.lights[..self.lights.len().min(MAX_LIGHTS)]
    }

    fn write_lights<B: RenderBackend + ?Sized>(&self, backend: &mut B, space: LightSpace) {
        let lights = self.shaded_lights();
        let uniforms = backend.uniforms();
        uniforms.set_int("numLights", lights.len() as i32);
        for (slot, light) in lights.iter().enumerate() {
            light.write_uniforms(uniforms, slot, space);
        }
    }

    fn render_forward<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        camera: &Camera,
        projection: Matrix4<f32>,
        view: Matrix4<f32>,
    ) {
        backend.bind_target(RenderTarget::Default);
        backend.clear(self.clear_color);

        for entry in &self.objects {
            backend.use_program(entry.program);
            {
                let uniforms = backend.uniforms();
                uniforms.set_mat4("projection", projection);
                uniforms.set_mat4("view", view);
                uniforms.set_vec3("viewPos", camera.position.to_vec());
            }
            self.write_lights(backend, LightSpace::World);
            self.fog.write_uniforms(backend.uniforms());
            entry.object.draw(backend);
        }
    }

    fn render_deferred<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        deferred: &DeferredPipeline,
        projection: Matrix4<f32>,
        view: Matrix4<f32>,
    ) {
        // geometry pass
        backend.bind_target(RenderTarget::GBuffer);
        backend.clear([0.0, 0.0, 0.0, 0.0]);
        backend.use_program(deferred.geometry_program);
        {
            let uniforms = backend.uniforms();
            uniforms.set_mat4("projection", projection);
            uniforms.set_mat4("view", view);
        }
        for entry in &self.objects {
            entry.object.draw(backend);
        }

        // lighting pass
        backend.bind_target(RenderTarget::Default);
        backend.clear(self.clear_color);
        backend.use_program(deferred.lighting_program);
        self.write_lights(backend, LightSpace::View(view));
        self.fog.write_uniforms(backend.uniforms());
        {
            let uniforms = backend.uniforms();
            // the eye sits at the origin of view space
            uniforms.set_vec3("viewPos", Vector3::new(0.0, 0.0, 0.0));
            uniforms.set_int("displayMode", deferred.display_mode.as_uniform());
        }
        backend.draw_fullscreen_quad();
        backend.blit_depth_to_default();
    }
}
