use crate::frame::gbuffer::{DisplayMode, GBufferAttachment, GBufferLayout};
use crate::frame::program::ProgramHandle;
use crate::frame::RenderBackend;

/// G-buffer description, the two deferred programs and the output selector.
#[derive(Clone, Debug)]
pub struct DeferredPipeline {
    pub geometry_program: ProgramHandle,
    pub lighting_program: ProgramHandle,
    pub display_mode: DisplayMode,
    layout: Option<GBufferLayout>,
}

impl DeferredPipeline {
    pub fn new(geometry_program: ProgramHandle, lighting_program: ProgramHandle) -> DeferredPipeline {
        DeferredPipeline {
            geometry_program,
            lighting_program,
            display_mode: DisplayMode::Combined,
            layout: None,
        }
    }

    /// Current G-buffer resolution, `None` until a buffer exists.
    pub fn layout(&self) -> Option<GBufferLayout> {
        self.layout
    }

    pub fn is_ready(&self) -> bool {
        self.layout.is_some()
    }

    /// Sizes the G-buffer to the viewport and wires the attachments to
    /// their texture units and sampler uniforms. A buffer already at that
    /// size is kept.
    pub fn attach<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        let [width, height] = backend.viewport_dimensions();
        self.resize(backend, width, height);

        for attachment in GBufferAttachment::ALL {
            backend.bind_texture(attachment.texture_unit(), attachment);
        }
        backend.use_program(self.lighting_program);
        let uniforms = backend.uniforms();
        for attachment in GBufferAttachment::ALL {
            uniforms.set_int(attachment.sampler_name(), attachment.texture_unit() as i32);
        }
    }

    /// Re-creates the G-buffer only when the resolution changes.
    pub fn resize<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, width: u32, height: u32) {
        let layout = GBufferLayout::new(width, height);
        if self.layout == Some(layout) {
            return;
        }
        self.recreate(backend, layout);
    }

    fn recreate<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, layout: GBufferLayout) {
        match backend.create_gbuffer(&layout) {
            Ok(()) => {
                log::debug!("G-buffer ready at {}x{}", layout.width, layout.height);
                self.layout = Some(layout);
            }
            Err(e) => {
                log::error!("G-buffer creation failed, deferred output degraded: {}", e);
                self.layout = None;
            }
        }
    }
}
