pub mod demo_scene;
pub mod input;
pub mod settings;
pub mod vulkan;
