use std::sync::Arc;

use vulkano::{
    command_buffer::{
        AutoCommandBufferBuilder, PrimaryAutoCommandBuffer, RenderPassBeginInfo, SubpassContents,
    },
    device::Queue,
    format::Format,
    image::{view::ImageView, AttachmentImage, ImageAccess, ImageUsage, ImageViewAbstract},
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
};

use crate::frame::deferred_pass::deferred_map_renderer::vk_format;
use crate::frame::gbuffer::GBufferLayout;
use crate::frame::RenderError;

/// Framebuffers over this frame's presentable image and the default depth
/// buffer.
#[derive(Clone)]
pub struct DefaultTarget {
    pub dimensions: [u32; 2],
    clear_framebuffer: Arc<Framebuffer>,
    load_framebuffer: Arc<Framebuffer>,
}

/// Render passes of the default target and its depth buffer, which follows
/// the size of the presented image.
pub struct LightingRenderer {
    gfx_queue: Arc<Queue>,
    clear_render_pass: Arc<RenderPass>,
    load_render_pass: Arc<RenderPass>,
    depth_image: Option<Arc<ImageView<AttachmentImage>>>,
}

impl LightingRenderer {
    pub fn new(
        gfx_queue: Arc<Queue>,
        final_output_format: Format,
    ) -> Result<LightingRenderer, RenderError> {
        let device = gfx_queue.device().clone();
        let clear_render_pass = vulkano::ordered_passes_renderpass!(device.clone(),
            attachments: {
                final_color: {
                    load: Clear,
                    store: Store,
                    format: final_output_format,
                    samples: 1,
                },
                depth: {
                    load: Clear,
                    store: Store,
                    format: vk_format(GBufferLayout::DEPTH_FORMAT),
                    samples: 1,
                }
            },
            passes: [
                {
                    color: [final_color],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )
        .map_err(|e| RenderError::resource("default render pass", e))?;

        let load_render_pass = vulkano::ordered_passes_renderpass!(device,
            attachments: {
                final_color: {
                    load: Load,
                    store: Store,
                    format: final_output_format,
                    samples: 1,
                },
                depth: {
                    load: Load,
                    store: Store,
                    format: vk_format(GBufferLayout::DEPTH_FORMAT),
                    samples: 1,
                }
            },
            passes: [
                {
                    color: [final_color],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )
        .map_err(|e| RenderError::resource("default render pass", e))?;

        Ok(LightingRenderer {
            gfx_queue,
            clear_render_pass,
            load_render_pass,
            depth_image: None,
        })
    }

    /// Subpass the forward and lighting pipelines are built against.
    pub fn subpass(&self) -> Result<Subpass, RenderError> {
        Subpass::from(self.clear_render_pass.clone(), 0)
            .ok_or_else(|| RenderError::resource("default subpass", "render pass has no subpass 0"))
    }

    pub fn depth_image(&self) -> Option<Arc<ImageView<AttachmentImage>>> {
        self.depth_image.clone()
    }

    /// Wraps `final_image` for this frame, resizing the depth buffer when
    /// the image size changed.
    pub fn prepare(
        &mut self,
        final_image: Arc<dyn ImageViewAbstract>,
    ) -> Result<DefaultTarget, RenderError> {
        let dimensions = final_image.image().dimensions().width_height();
        let depth_image = match &self.depth_image {
            Some(depth) if depth.image().dimensions().width_height() == dimensions => depth.clone(),
            _ => {
                let image = AttachmentImage::with_usage(
                    self.gfx_queue.device().clone(),
                    dimensions,
                    vk_format(GBufferLayout::DEPTH_FORMAT),
                    ImageUsage {
                        transfer_dst: true,
                        ..ImageUsage::empty()
                    },
                )
                .map_err(|e| RenderError::resource("depth buffer", e))?;
                let view = ImageView::new_default(image)
                    .map_err(|e| RenderError::resource("depth buffer view", e))?;
                log::debug!("default depth buffer resized to {:?}", dimensions);
                self.depth_image = Some(view.clone());
                view
            }
        };

        let framebuffer = |render_pass: &Arc<RenderPass>| {
            Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![
                        final_image.clone(),
                        depth_image.clone() as Arc<dyn ImageViewAbstract>,
                    ],
                    ..Default::default()
                },
            )
            .map_err(|e| RenderError::resource("default framebuffer", e))
        };
        Ok(DefaultTarget {
            dimensions,
            clear_framebuffer: framebuffer(&self.clear_render_pass)?,
            load_framebuffer: framebuffer(&self.load_render_pass)?,
        })
    }

    /// Begins a pass on the default target; `None` keeps what is there.
    pub fn begin_render_pass(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        target: &DefaultTarget,
        clear_color: Option<[f32; 4]>,
    ) -> Result<Subpass, RenderError> {
        let (framebuffer, clear_values) = match clear_color {
            Some(color) => (
                target.clear_framebuffer.clone(),
                vec![Some(color.into()), Some(1.0f32.into())],
            ),
            None => (target.load_framebuffer.clone(), vec![None, None]),
        };
        let render_pass = framebuffer.render_pass().clone();
        builder
            .begin_render_pass(
                RenderPassBeginInfo {
                    clear_values,
                    ..RenderPassBeginInfo::framebuffer(framebuffer)
                },
                SubpassContents::SecondaryCommandBuffers,
            )
            .map_err(|e| RenderError::Command(e.to_string()))?;
        Subpass::from(render_pass, 0)
            .ok_or_else(|| RenderError::Command("default pass has no subpass".to_string()))
    }
}
