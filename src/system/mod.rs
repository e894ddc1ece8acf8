pub mod mesh;
pub mod object_3d_draw_system;
