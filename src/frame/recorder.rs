use std::collections::HashMap;

use crate::scene_pkg::mesh::Mesh;

use super::gbuffer::{GBufferAttachment, GBufferLayout};
use super::program::{ProgramHandle, ProgramTable};
use super::uniforms::UniformBlock;
use super::{GeometryHandle, RenderBackend, RenderError, RenderTarget};

#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    CreateGBuffer(GBufferLayout),
    BindTarget(RenderTarget),
    Clear([f32; 4]),
    UseProgram(ProgramHandle),
    BindTexture {
        unit: u32,
        attachment: GBufferAttachment,
    },
    DrawGeometry {
        program: ProgramHandle,
        geometry: GeometryHandle,
        uniforms: UniformBlock,
    },
    DrawFullscreenQuad {
        program: ProgramHandle,
        uniforms: UniformBlock,
    },
    BlitDepth,
}

/// Backend that executes nothing and logs every call. Draws carry a copy of
/// the bound program's uniforms at the time of the call.
#[derive(Debug)]
pub struct RecordingBackend {
    dimensions: [u32; 2],
    programs: ProgramTable,
    geometry: Vec<Mesh>,
    texture_units: HashMap<u32, GBufferAttachment>,
    gbuffer: Option<GBufferLayout>,
    commands: Vec<RenderCommand>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> RecordingBackend {
        RecordingBackend {
            dimensions: [width, height],
            programs: ProgramTable::new(),
            geometry: vec![],
            texture_units: HashMap::new(),
            gbuffer: None,
            commands: vec![],
        }
    }

    pub fn set_viewport_dimensions(&mut self, width: u32, height: u32) {
        self.dimensions = [width, height];
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// Geometry draws in order, with the program and uniform snapshot used.
    pub fn draws(&self) -> impl Iterator<Item = (ProgramHandle, &UniformBlock)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::DrawGeometry {
                program, uniforms, ..
            } => Some((*program, uniforms)),
            _ => None,
        })
    }

    pub fn fullscreen_draws(&self) -> impl Iterator<Item = (ProgramHandle, &UniformBlock)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::DrawFullscreenQuad { program, uniforms } => Some((*program, uniforms)),
            _ => None,
        })
    }

    pub fn mesh(&self, geometry: GeometryHandle) -> Option<&Mesh> {
        self.geometry.get(geometry.0)
    }

    pub fn gbuffer(&self) -> Option<GBufferLayout> {
        self.gbuffer
    }

    pub fn texture_unit(&self, unit: u32) -> Option<GBufferAttachment> {
        self.texture_units.get(&unit).copied()
    }

    pub fn gbuffer_creations(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::CreateGBuffer(_)))
            .count()
    }

    fn bound_snapshot(&self) -> Option<(ProgramHandle, UniformBlock)> {
        let handle = self.programs.bound()?;
        let program = self.programs.program(handle)?;
        Some((handle, program.uniforms.clone()))
    }
}

impl RenderBackend for RecordingBackend {
    fn viewport_dimensions(&self) -> [u32; 2] {
        self.dimensions
    }

    fn upload_geometry(&mut self, mesh: &Mesh) -> Result<GeometryHandle, RenderError> {
        if mesh.indices.is_empty() {
            return Err(RenderError::EmptyMesh);
        }
        self.geometry.push(mesh.clone());
        Ok(GeometryHandle(self.geometry.len() - 1))
    }

    fn create_gbuffer(&mut self, layout: &GBufferLayout) -> Result<(), RenderError> {
        self.commands.push(RenderCommand::CreateGBuffer(*layout));
        if layout.is_empty() {
            self.gbuffer = None;
            return Err(RenderError::EmptyGBuffer {
                width: layout.width,
                height: layout.height,
            });
        }
        self.gbuffer = Some(*layout);
        Ok(())
    }

    fn bind_target(&mut self, target: RenderTarget) {
        self.commands.push(RenderCommand::BindTarget(target));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(RenderCommand::Clear(color));
    }

    fn programs_mut(&mut self) -> &mut ProgramTable {
        &mut self.programs
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.programs.bind(program);
        self.commands.push(RenderCommand::UseProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, attachment: GBufferAttachment) {
        self.texture_units.insert(unit, attachment);
        self.commands
            .push(RenderCommand::BindTexture { unit, attachment });
    }

    fn draw_geometry(&mut self, geometry: GeometryHandle) {
        match self.bound_snapshot() {
            Some((program, uniforms)) => self.commands.push(RenderCommand::DrawGeometry {
                program,
                geometry,
                uniforms,
            }),
            None => log::warn!("draw of geometry {} with no program bound", geometry.0),
        }
    }

    fn draw_fullscreen_quad(&mut self) {
        match self.bound_snapshot() {
            Some((program, uniforms)) => self
                .commands
                .push(RenderCommand::DrawFullscreenQuad { program, uniforms }),
            None => log::warn!("full-screen draw with no program bound"),
        }
    }

    fn blit_depth_to_default(&mut self) {
        self.commands.push(RenderCommand::BlitDepth);
    }
}
