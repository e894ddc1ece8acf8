use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
pub const SPEED: f32 = 2.5;
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

const PITCH_LIMIT: f32 = 89.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    #[default]
    Perspective,
    Orthographic,
}

impl ProjectionKind {
    pub fn toggled(self) -> ProjectionKind {
        match self {
            ProjectionKind::Perspective => ProjectionKind::Orthographic,
            ProjectionKind::Orthographic => ProjectionKind::Perspective,
        }
    }
}

/// First-person camera. Orientation is owned by `yaw`/`pitch` (degrees);
/// `front`, `right` and `up` are derived from them.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    pub world_up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,
    pub projection: ProjectionKind,
    pub ortho_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(Point3::new(0.0, 0.0, 0.0))
    }
}

impl Camera {
    pub fn new(position: Point3<f32>) -> Camera {
        Camera::with_orientation(position, Vector3::unit_y(), YAW, PITCH)
    }

    pub fn with_orientation(
        position: Point3<f32>,
        world_up: Vector3<f32>,
        yaw: f32,
        pitch: f32,
    ) -> Camera {
        let mut camera = Camera {
            position,
            front: Vector3::new(0.0, 0.0, -1.0),
            up: world_up,
            right: Vector3::unit_x(),
            world_up,
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
            projection: ProjectionKind::Perspective,
            ortho_height: 10.0,
        };
        camera.update_camera_vectors();
        camera
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self, width: u32, height: u32) -> Matrix4<f32> {
        let aspect_ratio = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        match self.projection {
            ProjectionKind::Perspective => {
                cgmath::perspective(Deg(self.zoom), aspect_ratio, Z_NEAR, Z_FAR)
            }
            ProjectionKind::Orthographic => {
                let half_height = self.ortho_height / 2.0;
                let half_width = half_height * aspect_ratio;
                cgmath::ortho(-half_width, half_width, -half_height, half_height, Z_NEAR, Z_FAR)
            }
        }
    }

    pub fn apply_movement(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        let offset = match direction {
            CameraMovement::Forward => self.front * velocity,
            CameraMovement::Backward => -self.front * velocity,
            CameraMovement::Left => -self.right * velocity,
            CameraMovement::Right => self.right * velocity,
            CameraMovement::Up => self.world_up * velocity,
            CameraMovement::Down => -self.world_up * velocity,
        };
        self.position += offset;
    }

    pub fn apply_look_delta(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_camera_vectors();
    }

    pub fn apply_zoom_delta(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(1.0, 90.0);
    }

    /// Turns towards `target`. Yaw/pitch are re-derived, so later look deltas
    /// continue smoothly from the new orientation. `front` aims exactly at
    /// the target unless it lies straight along `world_up`, where the pitch
    /// limit applies.
    pub fn point_at(&mut self, target: Point3<f32>) {
        let delta = target - self.position;
        if delta.magnitude2() <= f32::EPSILON {
            return;
        }
        let direction = delta.normalize();
        self.yaw = direction.z.atan2(direction.x).to_degrees();
        self.pitch = direction.y.clamp(-1.0, 1.0).asin().to_degrees();

        let right = direction.cross(self.world_up);
        if right.magnitude2() <= 1e-10 {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
            self.update_camera_vectors();
            return;
        }
        self.front = direction;
        self.right = right.normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    fn update_camera_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.front = front.normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
