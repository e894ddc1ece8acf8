pub mod lighting_pass;
pub mod lighting_renderer;
