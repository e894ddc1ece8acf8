use std::collections::HashMap;

use super::uniforms::{DiscardUniforms, ShaderProgram, UniformBlock};

/// Non-owning reference to a program registered in a [`ProgramTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) usize);

impl ProgramHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which compiled shader a program stands for. Backends map each kind to a
/// pipeline compatible with the target the kind renders into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Deferred geometry pass, writes the G-buffer.
    Geometry,
    /// Deferred lighting composition over a full-screen quad.
    Lighting,
    /// Forward multi-light Phong.
    Phong,
    /// Forward unlit vertex/override color.
    Color,
    /// Forward normal visualisation.
    Normal,
}

impl ProgramKind {
    pub fn renders_to_gbuffer(self) -> bool {
        self == ProgramKind::Geometry
    }
}

#[derive(Debug)]
pub struct Program {
    pub name: String,
    pub kind: ProgramKind,
    pub uniforms: UniformBlock,
}

/// Registry of programs keyed by name, plus the currently bound one.
///
/// Loading a name twice returns the handle registered first.
#[derive(Debug, Default)]
pub struct ProgramTable {
    programs: Vec<Program>,
    by_name: HashMap<String, ProgramHandle>,
    bound: Option<ProgramHandle>,
    discard: DiscardUniforms,
}

impl ProgramTable {
    pub fn new() -> ProgramTable {
        ProgramTable::default()
    }

    pub fn load(&mut self, name: &str, kind: ProgramKind) -> ProgramHandle {
        if let Some(handle) = self.by_name.get(name) {
            return *handle;
        }
        let handle = ProgramHandle(self.programs.len());
        self.programs.push(Program {
            name: name.to_owned(),
            kind,
            uniforms: UniformBlock::new(),
        });
        self.by_name.insert(name.to_owned(), handle);
        log::debug!("registered program '{}' as {:?}", name, kind);
        handle
    }

    pub fn get(&self, name: &str) -> Option<ProgramHandle> {
        self.by_name.get(name).copied()
    }

    pub fn program(&self, handle: ProgramHandle) -> Option<&Program> {
        self.programs.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Binds `handle`. Unknown handles unbind, so later writes are dropped.
    pub fn bind(&mut self, handle: ProgramHandle) {
        self.bound = self.program(handle).map(|_| handle);
    }

    pub fn bound(&self) -> Option<ProgramHandle> {
        self.bound
    }

    pub fn bound_program(&self) -> Option<&Program> {
        self.bound.and_then(|handle| self.program(handle))
    }

    /// Uniform sink of the bound program, or a discarding sink.
    pub fn bound_uniforms(&mut self) -> &mut dyn ShaderProgram {
        match self.bound {
            Some(handle) => &mut self.programs[handle.0].uniforms,
            None => &mut self.discard,
        }
    }
}
