use std::sync::Arc;

use vulkano::buffer::{BufferUsage, CpuAccessibleBuffer, TypedBufferAccess};
use vulkano::device::Device;

use crate::frame::RenderError;
use crate::scene_pkg::mesh::{Color, Mesh, Normal, Uv, Vertex};

/// Device copy of a [`Mesh`]: one vertex buffer per attribute stream plus
/// the index buffer. Written once at upload.
#[derive(Clone)]
pub struct GeometryBuffer {
    pub vertex_buffer: Arc<CpuAccessibleBuffer<[Vertex]>>,
    pub color_buffer: Arc<CpuAccessibleBuffer<[Color]>>,
    pub normals_buffer: Arc<CpuAccessibleBuffer<[Normal]>>,
    pub uv_buffer: Arc<CpuAccessibleBuffer<[Uv]>>,
    pub index_buffer: Arc<CpuAccessibleBuffer<[u32]>>,
}

fn vertex_usage() -> BufferUsage {
    BufferUsage {
        vertex_buffer: true,
        ..BufferUsage::empty()
    }
}

impl GeometryBuffer {
    pub fn upload(device: Arc<Device>, mesh: &Mesh) -> Result<GeometryBuffer, RenderError> {
        if mesh.indices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }
        let vertex_buffer = CpuAccessibleBuffer::from_iter(
            device.clone(),
            vertex_usage(),
            false,
            mesh.vertices.iter().copied(),
        )
        .map_err(|e| RenderError::resource("vertex buffer", e))?;
        let color_buffer = CpuAccessibleBuffer::from_iter(
            device.clone(),
            vertex_usage(),
            false,
            mesh.colors.iter().copied(),
        )
        .map_err(|e| RenderError::resource("color buffer", e))?;
        let normals_buffer = CpuAccessibleBuffer::from_iter(
            device.clone(),
            vertex_usage(),
            false,
            mesh.normals.iter().copied(),
        )
        .map_err(|e| RenderError::resource("normal buffer", e))?;
        let uv_buffer = CpuAccessibleBuffer::from_iter(
            device.clone(),
            vertex_usage(),
            false,
            mesh.uvs.iter().copied(),
        )
        .map_err(|e| RenderError::resource("uv buffer", e))?;
        let index_buffer = CpuAccessibleBuffer::from_iter(
            device,
            BufferUsage {
                index_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            mesh.indices.iter().copied(),
        )
        .map_err(|e| RenderError::resource("index buffer", e))?;

        Ok(GeometryBuffer {
            vertex_buffer,
            color_buffer,
            normals_buffer,
            uv_buffer,
            index_buffer,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_buffer.len() as u32
    }
}
