pub mod mesh_converters;
pub mod primitives;
