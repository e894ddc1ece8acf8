//! Everything between the scene graph and the graphics context.
//!
//! The scene talks to a [`RenderBackend`] in the order a GL-style context
//! expects: bind a target, clear, bind a program, write named uniforms,
//! draw. [`recorder::RecordingBackend`] logs that sequence; the Vulkan
//! backend in [`scene_renderer`] turns it into one command buffer per frame.

pub mod deferred_pass;
pub mod gbuffer;
pub mod gpu_uniforms;
pub mod lighting_pass;
pub mod program;
pub mod recorder;
pub mod scene_renderer;
pub mod shading;
pub mod uniforms;

use thiserror::Error;

use crate::scene_pkg::mesh::Mesh;

use self::gbuffer::{GBufferAttachment, GBufferLayout};
use self::program::{ProgramHandle, ProgramTable};
use self::uniforms::ShaderProgram;

/// Non-owning reference to a geometry buffer held by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub(crate) usize);

impl GeometryHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    /// The presentable framebuffer with its own depth buffer.
    Default,
    GBuffer,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create {what}: {reason}")]
    Resource { what: &'static str, reason: String },
    #[error("mesh has no indices")]
    EmptyMesh,
    #[error("G-buffer resolution {width}x{height} is empty")]
    EmptyGBuffer { width: u32, height: u32 },
    #[error("command recording failed: {0}")]
    Command(String),
}

impl RenderError {
    pub fn resource(what: &'static str, reason: impl std::fmt::Display) -> RenderError {
        RenderError::Resource {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Graphics context seam. Every call executes in program order; nothing is
/// deferred past the end of the frame.
pub trait RenderBackend {
    /// Size of the default target in pixels.
    fn viewport_dimensions(&self) -> [u32; 2];

    /// Uploads an immutable vertex/index pair. The backend owns the memory.
    fn upload_geometry(&mut self, mesh: &Mesh) -> Result<GeometryHandle, RenderError>;

    /// (Re)creates the G-buffer attachments and their shared depth buffer.
    fn create_gbuffer(&mut self, layout: &GBufferLayout) -> Result<(), RenderError>;

    fn bind_target(&mut self, target: RenderTarget);

    /// Clears colour to `color` and depth to 1.0 on the bound target.
    fn clear(&mut self, color: [f32; 4]);

    fn programs_mut(&mut self) -> &mut ProgramTable;

    fn use_program(&mut self, program: ProgramHandle) {
        self.programs_mut().bind(program);
    }

    /// Uniform sink of the bound program.
    fn uniforms(&mut self) -> &mut dyn ShaderProgram {
        self.programs_mut().bound_uniforms()
    }

    /// Makes `attachment` readable through texture `unit`. Persistent.
    fn bind_texture(&mut self, unit: u32, attachment: GBufferAttachment);

    /// Indexed triangle-list draw with the bound program.
    fn draw_geometry(&mut self, geometry: GeometryHandle);

    /// Two triangles covering clip space with the bound program.
    fn draw_fullscreen_quad(&mut self);

    /// Copies the G-buffer depth into the default target's depth buffer.
    fn blit_depth_to_default(&mut self);
}
