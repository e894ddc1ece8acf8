use std::collections::HashMap;
use std::sync::Arc;

use vulkano::{
    command_buffer::{
        AutoCommandBufferBuilder, CommandBufferUsage, CopyImageInfo, PrimaryAutoCommandBuffer,
        SecondaryAutoCommandBuffer,
    },
    device::Queue,
    format::Format,
    image::ImageViewAbstract,
    render_pass::Subpass,
};

use crate::scene_pkg::mesh::Mesh;
use crate::system::mesh::GeometryBuffer;
use crate::system::object_3d_draw_system::Object3DDrawSystem;

use super::deferred_pass::deferred_map_renderer::DeferredMapRenderer;
use super::deferred_pass::object_3d_deferred_pass::Object3DDeferredPass;
use super::gbuffer::{GBufferAttachment, GBufferLayout};
use super::gpu_uniforms::FrameUniforms;
use super::lighting_pass::lighting_pass::{sampler_binding, LightingPass};
use super::lighting_pass::lighting_renderer::{DefaultTarget, LightingRenderer};
use super::program::{ProgramKind, ProgramTable};
use super::uniforms::UniformBlock;
use super::{GeometryHandle, RenderBackend, RenderError, RenderTarget};

/// Recording state between `begin_frame` and `end_frame`.
struct FrameState {
    builder: AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
    default_target: DefaultTarget,
    target: RenderTarget,
    open_pass: Option<(RenderTarget, Subpass)>,
    default_written: bool,
    failure: Option<RenderError>,
}

impl FrameState {
    fn fail(&mut self, error: RenderError) {
        log::error!("{}", error);
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    fn end_pass(&mut self) {
        if self.open_pass.take().is_some() {
            if let Err(e) = self.builder.end_render_pass() {
                self.fail(RenderError::Command(e.to_string()));
            }
        }
    }

    fn execute(&mut self, command_buffer: Result<SecondaryAutoCommandBuffer, RenderError>) {
        match command_buffer {
            Ok(command_buffer) => {
                if let Err(e) = self.builder.execute_commands(command_buffer) {
                    self.fail(RenderError::Command(e.to_string()));
                }
            }
            Err(e) => self.fail(e),
        }
    }
}

/// Vulkan [`RenderBackend`]. Every call of a frame lands in one primary
/// command buffer; each draw is its own secondary buffer.
pub struct SceneRenderer {
    gfx_queue: Arc<Queue>,
    programs: ProgramTable,
    geometry: Vec<GeometryBuffer>,
    texture_units: HashMap<u32, GBufferAttachment>,
    viewport: [u32; 2],

    deferred_map_renderer: DeferredMapRenderer,
    object_3d_deferred_pass: Object3DDeferredPass,
    lighting_renderer: LightingRenderer,
    lighting_pass: LightingPass,
    object_3d_draw_system: Object3DDrawSystem,

    frame: Option<FrameState>,
}

impl SceneRenderer {
    pub fn new(
        gfx_queue: Arc<Queue>,
        final_output_format: Format,
        viewport: [u32; 2],
    ) -> Result<SceneRenderer, RenderError> {
        let deferred_map_renderer = DeferredMapRenderer::new(gfx_queue.clone())?;
        let object_3d_deferred_pass =
            Object3DDeferredPass::new(gfx_queue.clone(), deferred_map_renderer.subpass()?)?;
        let lighting_renderer = LightingRenderer::new(gfx_queue.clone(), final_output_format)?;
        let lighting_pass = LightingPass::new(gfx_queue.clone(), lighting_renderer.subpass()?)?;
        let object_3d_draw_system =
            Object3DDrawSystem::new(gfx_queue.clone(), lighting_renderer.subpass()?)?;

        Ok(SceneRenderer {
            gfx_queue,
            programs: ProgramTable::new(),
            geometry: vec![],
            texture_units: HashMap::new(),
            viewport,
            deferred_map_renderer,
            object_3d_deferred_pass,
            lighting_renderer,
            lighting_pass,
            object_3d_draw_system,
            frame: None,
        })
    }

    pub fn set_viewport_dimensions(&mut self, dimensions: [u32; 2]) {
        self.viewport = dimensions;
    }

    /// Starts recording a frame that ends on `final_image`.
    pub fn begin_frame(&mut self, final_image: Arc<dyn ImageViewAbstract>) -> Result<(), RenderError> {
        let default_target = self.lighting_renderer.prepare(final_image)?;
        let builder = AutoCommandBufferBuilder::primary(
            self.gfx_queue.device().clone(),
            self.gfx_queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )
        .map_err(|e| RenderError::Command(e.to_string()))?;
        self.frame = Some(FrameState {
            builder,
            default_target,
            target: RenderTarget::Default,
            open_pass: None,
            default_written: false,
            failure: None,
        });
        Ok(())
    }

    /// Closes the frame. Fails with the first recording error, if any.
    pub fn end_frame(&mut self) -> Result<PrimaryAutoCommandBuffer, RenderError> {
        let mut frame = self
            .frame
            .take()
            .ok_or_else(|| RenderError::Command("end_frame without begin_frame".to_string()))?;
        frame.end_pass();
        if !frame.default_written {
            // the presented image still has to be written once
            match self.lighting_renderer.begin_render_pass(
                &mut frame.builder,
                &frame.default_target,
                Some([0.0, 0.0, 0.0, 1.0]),
            ) {
                Ok(subpass) => {
                    frame.open_pass = Some((RenderTarget::Default, subpass));
                    frame.end_pass();
                }
                Err(e) => frame.fail(e),
            }
        }
        if let Some(error) = frame.failure.take() {
            return Err(error);
        }
        frame
            .builder
            .build()
            .map_err(|e| RenderError::Command(e.to_string()))
    }

    fn begin_pass(&mut self, clear_color: Option<[f32; 4]>) -> Option<Subpass> {
        let frame = self.frame.as_mut()?;
        let target = frame.target;
        if target == RenderTarget::GBuffer && self.deferred_map_renderer.targets().is_none() {
            log::debug!("no G-buffer, geometry pass skipped");
            return None;
        }
        let result = match target {
            RenderTarget::Default => {
                self.lighting_renderer
                    .begin_render_pass(&mut frame.builder, &frame.default_target, clear_color)
            }
            RenderTarget::GBuffer => self
                .deferred_map_renderer
                .begin_render_pass(&mut frame.builder, clear_color),
        };
        match result {
            Ok(subpass) => {
                if target == RenderTarget::Default {
                    frame.default_written = true;
                }
                frame.open_pass = Some((target, subpass.clone()));
                Some(subpass)
            }
            Err(e) => {
                frame.fail(e);
                None
            }
        }
    }

    /// Open pass on the bound target; draws without a clear keep the
    /// target's contents.
    fn current_subpass(&mut self) -> Option<Subpass> {
        let open = self
            .frame
            .as_ref()?
            .open_pass
            .as_ref()
            .map(|(_, subpass)| subpass.clone());
        match open {
            Some(subpass) => Some(subpass),
            None => self.begin_pass(None),
        }
    }

    /// Kind of the bound program, if it may draw into the bound target.
    fn bound_kind_for(&self, what: &str) -> Option<(ProgramKind, FrameUniforms)> {
        let frame = self.frame.as_ref()?;
        let program = match self.programs.bound_program() {
            Some(program) => program,
            None => {
                log::warn!("{} with no program bound", what);
                return None;
            }
        };
        let wanted = if program.kind.renders_to_gbuffer() {
            RenderTarget::GBuffer
        } else {
            RenderTarget::Default
        };
        if wanted != frame.target {
            log::warn!(
                "{} skipped: program '{}' renders to {:?} but {:?} is bound",
                what,
                program.name,
                wanted,
                frame.target
            );
            return None;
        }
        Some((program.kind, FrameUniforms::from_block(&program.uniforms).for_vulkan()))
    }

    fn target_dimensions(&self, target: RenderTarget) -> Option<[u32; 2]> {
        match target {
            RenderTarget::Default => self.frame.as_ref().map(|f| f.default_target.dimensions),
            RenderTarget::GBuffer => self
                .deferred_map_renderer
                .targets()
                .map(|targets| targets.layout.dimensions()),
        }
    }

    fn lighting_inputs(
        &self,
        block: &UniformBlock,
    ) -> Option<[(u32, Arc<dyn ImageViewAbstract>); 3]> {
        let targets = match self.deferred_map_renderer.targets() {
            Some(targets) => targets,
            None => {
                log::debug!("no G-buffer, lighting pass skipped");
                return None;
            }
        };
        let resolve = |sampler: GBufferAttachment| -> Option<(u32, Arc<dyn ImageViewAbstract>)> {
            let unit = block.int(sampler.sampler_name())?;
            let attachment = self.texture_units.get(&(unit as u32))?;
            Some((sampler_binding(sampler), targets.view(*attachment) as Arc<dyn ImageViewAbstract>))
        };
        let [a, b, c] = GBufferAttachment::ALL;
        match (resolve(a), resolve(b), resolve(c)) {
            (Some(a), Some(b), Some(c)) => Some([a, b, c]),
            _ => {
                log::warn!("lighting pass skipped: G-buffer samplers not bound to texture units");
                None
            }
        }
    }
}

impl RenderBackend for SceneRenderer {
    fn viewport_dimensions(&self) -> [u32; 2] {
        self.viewport
    }

    fn upload_geometry(&mut self, mesh: &Mesh) -> Result<GeometryHandle, RenderError> {
        let buffer = GeometryBuffer::upload(self.gfx_queue.device().clone(), mesh)?;
        self.geometry.push(buffer);
        Ok(GeometryHandle(self.geometry.len() - 1))
    }

    fn create_gbuffer(&mut self, layout: &GBufferLayout) -> Result<(), RenderError> {
        if let Some(frame) = self.frame.as_mut() {
            if matches!(frame.open_pass, Some((RenderTarget::GBuffer, _))) {
                frame.end_pass();
            }
        }
        self.deferred_map_renderer.recreate(layout)
    }

    fn bind_target(&mut self, target: RenderTarget) {
        if let Some(frame) = self.frame.as_mut() {
            if !matches!(&frame.open_pass, Some((open, _)) if *open == target) {
                frame.end_pass();
            }
            frame.target = target;
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        if let Some(frame) = self.frame.as_mut() {
            frame.end_pass();
        }
        self.begin_pass(Some(color));
    }

    fn programs_mut(&mut self) -> &mut ProgramTable {
        &mut self.programs
    }

    fn bind_texture(&mut self, unit: u32, attachment: GBufferAttachment) {
        self.texture_units.insert(unit, attachment);
    }

    fn draw_geometry(&mut self, geometry: GeometryHandle) {
        let (kind, uniforms) = match self.bound_kind_for("draw") {
            Some(bound) => bound,
            None => return,
        };
        if kind != ProgramKind::Geometry && !Object3DDrawSystem::supports(kind) {
            log::warn!("{:?} programs only draw full-screen quads", kind);
            return;
        }
        let buffer = match self.geometry.get(geometry.0) {
            Some(buffer) => buffer.clone(),
            None => {
                log::warn!("unknown geometry {}", geometry.0);
                return;
            }
        };
        let target = if kind.renders_to_gbuffer() {
            RenderTarget::GBuffer
        } else {
            RenderTarget::Default
        };
        let (subpass, dimensions) = match (self.current_subpass(), self.target_dimensions(target)) {
            (Some(subpass), Some(dimensions)) => (subpass, dimensions),
            _ => return,
        };
        let command_buffer = if kind == ProgramKind::Geometry {
            self.object_3d_deferred_pass
                .draw(subpass, dimensions, uniforms, &buffer)
        } else {
            self.object_3d_draw_system
                .draw(kind, subpass, dimensions, uniforms, &buffer)
        };
        if let Some(frame) = self.frame.as_mut() {
            frame.execute(command_buffer);
        }
    }

    fn draw_fullscreen_quad(&mut self) {
        let (kind, uniforms) = match self.bound_kind_for("full-screen draw") {
            Some(bound) => bound,
            None => return,
        };
        if kind != ProgramKind::Lighting {
            log::warn!("full-screen quads are drawn with the lighting program only");
            return;
        }
        let inputs = match self
            .programs
            .bound_program()
            .and_then(|program| self.lighting_inputs(&program.uniforms))
        {
            Some(inputs) => inputs,
            None => return,
        };
        let (subpass, dimensions) = match (
            self.current_subpass(),
            self.target_dimensions(RenderTarget::Default),
        ) {
            (Some(subpass), Some(dimensions)) => (subpass, dimensions),
            _ => return,
        };
        let command_buffer = self.lighting_pass.draw(subpass, dimensions, uniforms, inputs);
        if let Some(frame) = self.frame.as_mut() {
            frame.execute(command_buffer);
        }
    }

    fn blit_depth_to_default(&mut self) {
        let frame = match self.frame.as_mut() {
            Some(frame) => frame,
            None => return,
        };
        frame.end_pass();

        match (
            self.deferred_map_renderer.targets(),
            self.lighting_renderer.depth_image(),
        ) {
            (Some(targets), Some(default_depth))
                if targets.layout.dimensions() == frame.default_target.dimensions =>
            {
                let source = targets.depth_image.image().clone();
                let destination = default_depth.image().clone();
                if let Err(e) = frame
                    .builder
                    .copy_image(CopyImageInfo::images(source, destination))
                {
                    frame.fail(RenderError::Command(e.to_string()));
                }
            }
            (Some(_), Some(_)) => {
                log::warn!("depth blit skipped: G-buffer and default target differ in size")
            }
            _ => log::debug!("no G-buffer depth to blit"),
        }

        frame.target = RenderTarget::Default;
        self.begin_pass(None);
    }
}
