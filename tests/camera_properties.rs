use approx::assert_relative_eq;
use cgmath::{InnerSpace, Point3, Vector3};

use puffscene::scene_pkg::camera::Camera;
use puffscene::scene_pkg::light::SpotLight;

const EPSILON: f32 = 1e-5;

#[test]
fn basis_stays_orthonormal_over_the_yaw_pitch_grid() {
    let mut yaw = -360.0;
    while yaw <= 360.0 {
        let mut pitch = -88.5;
        while pitch <= 88.5 {
            let camera = Camera::with_orientation(Point3::new(0.0, 0.0, 0.0), Vector3::unit_y(), yaw, pitch);
            let (f, r, u) = (camera.front(), camera.right(), camera.up());
            assert_relative_eq!(f.magnitude(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(r.magnitude(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(u.magnitude(), 1.0, epsilon = EPSILON);
            assert_relative_eq!(f.dot(r), 0.0, epsilon = EPSILON);
            assert_relative_eq!(f.dot(u), 0.0, epsilon = EPSILON);
            assert_relative_eq!(r.dot(u), 0.0, epsilon = EPSILON);
            pitch += 7.5;
        }
        yaw += 15.0;
    }
}

#[test]
fn look_deltas_keep_the_basis_orthonormal() {
    let mut camera = Camera::new(Point3::new(1.0, 2.0, 3.0));
    for step in 0..200 {
        let dx = (step as f32 * 0.37).sin() * 40.0;
        let dy = (step as f32 * 0.21).cos() * 60.0;
        camera.apply_look_delta(dx, dy, true);
        assert!(camera.pitch().abs() <= 89.0);
        assert_relative_eq!(camera.front().dot(camera.up()), 0.0, epsilon = EPSILON);
        assert_relative_eq!(camera.right().magnitude(), 1.0, epsilon = EPSILON);
    }
}

#[test]
fn view_matrix_after_point_at_faces_the_target() {
    let targets = [
        Point3::new(3.0, 0.0, 0.0),
        Point3::new(-2.0, 4.0, 1.0),
        Point3::new(0.5, -3.0, -7.0),
        Point3::new(10.0, 1.0, 10.0),
        // about 89.94 degrees above the camera
        Point3::new(-0.99, 10.5, 6.0),
        Point3::new(-1.0, -9.5, 5.99),
    ];
    for target in targets {
        let mut camera = Camera::new(Point3::new(-1.0, 0.5, 6.0));
        camera.point_at(target);
        let expected = (target - camera.position).normalize();

        // the third row of a right-handed view matrix is -forward
        let view = camera.view_matrix();
        let forward = -Vector3::new(view.x.z, view.y.z, view.z.z);
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-4);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-4);
    }
}

#[test]
fn spot_cone_edits_never_invert() {
    let mut spot = SpotLight::new(
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
    );
    let edits = [(true, 40.0), (false, 10.0), (true, 5.0), (false, 60.0), (true, 75.0)];
    for (inner, degrees) in edits {
        if inner {
            spot.set_cut_off_degrees(degrees);
        } else {
            spot.set_outer_cut_off_degrees(degrees);
        }
        assert!(spot.outer_cut_off() <= spot.cut_off(), "after {:?}", (inner, degrees));
    }
}
