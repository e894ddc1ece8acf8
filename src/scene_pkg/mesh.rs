use bytemuck::{Pod, Zeroable};
use vulkano::impl_vertex;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl_vertex!(Vertex, position);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Color {
    pub color: [f32; 3],
}

impl_vertex!(Color, color);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Normal {
    pub normal: [f32; 3],
}

impl_vertex!(Normal, normal);

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Uv {
    pub uv: [f32; 2],
}

impl_vertex!(Uv, uv);

/// CPU-side geometry: four parallel attribute streams and a triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub colors: Vec<Color>,
    pub normals: Vec<Normal>,
    pub uvs: Vec<Uv>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Mesh {
        Mesh::default()
    }

    /// Appends one vertex to every stream and returns its index.
    pub fn push_vertex(
        &mut self,
        position: [f32; 3],
        color: [f32; 3],
        normal: [f32; 3],
        uv: [f32; 2],
    ) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex { position });
        self.colors.push(Color { color });
        self.normals.push(Normal { normal });
        self.uvs.push(Uv { uv });
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Streams have equal length and every index addresses a vertex.
    pub fn is_consistent(&self) -> bool {
        let len = self.vertices.len();
        self.colors.len() == len
            && self.normals.len() == len
            && self.uvs.len() == len
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < len)
    }
}
