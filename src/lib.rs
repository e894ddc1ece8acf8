//! Small real-time renderer: a scene graph of cameras, lights and objects
//! drawn through a forward or a deferred shading pipeline.

pub mod config;
pub mod frame;
pub mod object_3d_loader;
pub mod scene_pkg;
pub mod system;
