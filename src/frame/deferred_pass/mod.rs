pub mod deferred_map_renderer;
pub mod object_3d_deferred_pass;
