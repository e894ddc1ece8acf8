use cgmath::{Matrix4, Vector3};

use crate::frame::{GeometryHandle, RenderBackend};

use super::transform::Transform;

/// Uploaded geometry placed in the world, with an optional flat color.
#[derive(Clone, Debug)]
pub struct Object3D {
    pub geometry: GeometryHandle,
    pub transform: Transform,
    pub object_color: Vector3<f32>,
    pub use_object_color: bool,
}

impl Object3D {
    pub fn new(geometry: GeometryHandle) -> Object3D {
        Object3D {
            geometry,
            transform: Transform::default(),
            object_color: Vector3::new(1.0, 1.0, 1.0),
            use_object_color: false,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Object3D {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Vector3<f32>) -> Object3D {
        self.object_color = color;
        self.use_object_color = true;
        self
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.model_matrix()
    }

    /// Writes `model`, `useObjectColor` and `objectColor` on the bound program.
    pub fn write_uniforms<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        let uniforms = backend.uniforms();
        uniforms.set_mat4("model", self.model_matrix());
        uniforms.set_bool("useObjectColor", self.use_object_color);
        uniforms.set_vec3("objectColor", self.object_color);
    }

    pub fn draw<B: RenderBackend + ?Sized>(&self, backend: &mut B) {
        self.write_uniforms(backend);
        backend.draw_geometry(self.geometry);
    }
}
