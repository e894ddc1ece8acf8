pub mod camera;
pub mod deferred;
pub mod fog;
pub mod light;
pub mod mesh;
pub mod object3d;
pub mod scene;
pub mod transform;
