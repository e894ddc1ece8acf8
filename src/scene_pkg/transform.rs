use cgmath::{InnerSpace, Matrix4, Rad, Vector3};

/// Position, axis-angle rotation (radians) and non-uniform scale.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation_angle: f32,
    pub rotation_axis: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation_angle: 0.0,
            rotation_axis: Vector3::new(0.0, 1.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// `translate * rotate * scale`. A zero axis contributes no rotation.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        let mut model = Matrix4::from_translation(self.position);
        if self.rotation_axis.magnitude2() > f32::EPSILON {
            model = model
                * Matrix4::from_axis_angle(self.rotation_axis.normalize(), Rad(self.rotation_angle));
        }
        model * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{SquareMatrix, Vector4, Zero};

    #[test]
    fn floor_corner_lands_where_expected() {
        let transform = Transform {
            position: Vector3::new(0.0, -0.1, 0.0),
            rotation_angle: 0.0,
            rotation_axis: Vector3::new(0.0, 1.0, 0.0),
            scale: Vector3::new(40.0, 0.1, 40.0),
        };
        let corner = transform.model_matrix() * Vector4::new(0.5, 0.5, 0.5, 1.0);
        assert_relative_eq!(corner.x, 20.0, epsilon = 1e-5);
        assert_relative_eq!(corner.y, -0.05, epsilon = 1e-5);
        assert_relative_eq!(corner.z, 20.0, epsilon = 1e-5);
    }

    #[test]
    fn scale_is_applied_before_rotation() {
        let transform = Transform {
            position: Vector3::zero(),
            rotation_angle: std::f32::consts::FRAC_PI_2,
            rotation_axis: Vector3::new(0.0, 0.0, 2.0),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        // x scaled to 2 then rotated a quarter turn about z onto +y
        let p = transform.model_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_axis_means_no_rotation() {
        let transform = Transform {
            rotation_angle: 1.3,
            rotation_axis: Vector3::zero(),
            ..Transform::default()
        };
        assert_eq!(transform.model_matrix(), Matrix4::identity());
    }
}
