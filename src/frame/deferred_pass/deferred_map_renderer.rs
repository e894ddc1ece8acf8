use std::sync::Arc;

use vulkano::{
    command_buffer::{
        AutoCommandBufferBuilder, PrimaryAutoCommandBuffer, RenderPassBeginInfo, SubpassContents,
    },
    device::Queue,
    format::Format,
    image::{view::ImageView, AttachmentImage, ImageUsage, ImageViewAbstract},
    render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass},
};

use crate::frame::gbuffer::{GBufferAttachment, GBufferLayout, TargetFormat};
use crate::frame::RenderError;

pub fn vk_format(format: TargetFormat) -> Format {
    match format {
        TargetFormat::Rgba16Float => Format::R16G16B16A16_SFLOAT,
        TargetFormat::Rgba8Unorm => Format::R8G8B8A8_UNORM,
        TargetFormat::Depth16Unorm => Format::D16_UNORM,
    }
}

/// Images of one G-buffer resolution and the framebuffers over them.
pub struct GBufferTargets {
    pub layout: GBufferLayout,
    pub position_image: Arc<ImageView<AttachmentImage>>,
    pub normals_image: Arc<ImageView<AttachmentImage>>,
    pub albedo_specular_image: Arc<ImageView<AttachmentImage>>,
    pub depth_image: Arc<ImageView<AttachmentImage>>,
    clear_framebuffer: Arc<Framebuffer>,
    load_framebuffer: Arc<Framebuffer>,
}

impl GBufferTargets {
    pub fn view(&self, attachment: GBufferAttachment) -> Arc<ImageView<AttachmentImage>> {
        match attachment {
            GBufferAttachment::Position => self.position_image.clone(),
            GBufferAttachment::Normal => self.normals_image.clone(),
            GBufferAttachment::AlbedoSpecular => self.albedo_specular_image.clone(),
        }
    }
}

/// Owns the G-buffer render passes and, once created, its images.
pub struct DeferredMapRenderer {
    gfx_queue: Arc<Queue>,
    clear_render_pass: Arc<RenderPass>,
    load_render_pass: Arc<RenderPass>,
    targets: Option<GBufferTargets>,
}

impl DeferredMapRenderer {
    pub fn new(gfx_queue: Arc<Queue>) -> Result<DeferredMapRenderer, RenderError> {
        let device = gfx_queue.device().clone();
        let clear_render_pass = vulkano::ordered_passes_renderpass!(device.clone(),
            attachments: {
                position: {
                    load: Clear,
                    store: Store,
                    format: vk_format(GBufferAttachment::Position.format()),
                    samples: 1,
                },
                normals: {
                    load: Clear,
                    store: Store,
                    format: vk_format(GBufferAttachment::Normal.format()),
                    samples: 1,
                },
                albedo_specular: {
                    load: Clear,
                    store: Store,
                    format: vk_format(GBufferAttachment::AlbedoSpecular.format()),
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
                    color: [position, normals, albedo_specular],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )
        .map_err(|e| RenderError::resource("G-buffer render pass", e))?;

        // same attachments, keeps what a previous pass wrote
        let load_render_pass = vulkano::ordered_passes_renderpass!(device,
            attachments: {
                position: {
                    load: Load,
                    store: Store,
                    format: vk_format(GBufferAttachment::Position.format()),
                    samples: 1,
                },
                normals: {
                    load: Load,
                    store: Store,
                    format: vk_format(GBufferAttachment::Normal.format()),
                    samples: 1,
                },
                albedo_specular: {
                    load: Load,
                    store: Store,
                    format: vk_format(GBufferAttachment::AlbedoSpecular.format()),
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
                    color: [position, normals, albedo_specular],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )
        .map_err(|e| RenderError::resource("G-buffer render pass", e))?;

        Ok(DeferredMapRenderer {
            gfx_queue,
            clear_render_pass,
            load_render_pass,
            targets: None,
        })
    }

    /// Subpass the geometry pipeline is built against.
    pub fn subpass(&self) -> Result<Subpass, RenderError> {
        Subpass::from(self.clear_render_pass.clone(), 0)
            .ok_or_else(|| RenderError::resource("G-buffer subpass", "render pass has no subpass 0"))
    }

    pub fn targets(&self) -> Option<&GBufferTargets> {
        self.targets.as_ref()
    }

    /// Drops the current images and allocates new ones at `layout`. On
    /// failure the renderer is left without a G-buffer.
    pub fn recreate(&mut self, layout: &GBufferLayout) -> Result<(), RenderError> {
        self.targets = None;
        if layout.is_empty() {
            return Err(RenderError::EmptyGBuffer {
                width: layout.width,
                height: layout.height,
            });
        }

        let sampled = ImageUsage {
            sampled: true,
            ..ImageUsage::empty()
        };
        let position_image = self.attachment(layout, GBufferAttachment::Position.format(), sampled)?;
        let normals_image = self.attachment(layout, GBufferAttachment::Normal.format(), sampled)?;
        let albedo_specular_image =
            self.attachment(layout, GBufferAttachment::AlbedoSpecular.format(), sampled)?;
        let depth_image = self.attachment(
            layout,
            GBufferLayout::DEPTH_FORMAT,
            ImageUsage {
                transfer_src: true,
                ..ImageUsage::empty()
            },
        )?;

        let framebuffer = |render_pass: &Arc<RenderPass>| {
            Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![
                        position_image.clone() as Arc<dyn ImageViewAbstract>,
                        normals_image.clone() as Arc<dyn ImageViewAbstract>,
                        albedo_specular_image.clone() as Arc<dyn ImageViewAbstract>,
                        depth_image.clone() as Arc<dyn ImageViewAbstract>,
                    ],
                    ..Default::default()
                },
            )
            .map_err(|e| RenderError::resource("G-buffer framebuffer", e))
        };
        let clear_framebuffer = framebuffer(&self.clear_render_pass)?;
        let load_framebuffer = framebuffer(&self.load_render_pass)?;

        self.targets = Some(GBufferTargets {
            layout: *layout,
            position_image,
            normals_image,
            albedo_specular_image,
            depth_image,
            clear_framebuffer,
            load_framebuffer,
        });
        Ok(())
    }

    fn attachment(
        &self,
        layout: &GBufferLayout,
        format: TargetFormat,
        usage: ImageUsage,
    ) -> Result<Arc<ImageView<AttachmentImage>>, RenderError> {
        let image = AttachmentImage::with_usage(
            self.gfx_queue.device().clone(),
            layout.dimensions(),
            vk_format(format),
            usage,
        )
        .map_err(|e| RenderError::resource("G-buffer image", e))?;
        ImageView::new_default(image).map_err(|e| RenderError::resource("G-buffer image view", e))
    }

    /// Begins the G-buffer pass. `clear_color` clears every colour target
    /// (and depth to 1.0); `None` keeps their contents.
    pub fn begin_render_pass(
        &self,
        builder: &mut AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>,
        clear_color: Option<[f32; 4]>,
    ) -> Result<Subpass, RenderError> {
        let targets = self.targets.as_ref().ok_or(RenderError::EmptyGBuffer {
            width: 0,
            height: 0,
        })?;
        let (framebuffer, clear_values) = match clear_color {
            Some(color) => (
                targets.clear_framebuffer.clone(),
                vec![
                    Some(color.into()),
                    Some(color.into()),
                    Some(color.into()),
                    Some(1.0f32.into()),
                ],
            ),
            None => (targets.load_framebuffer.clone(), vec![None; 4]),
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
            .ok_or_else(|| RenderError::Command("G-buffer pass has no subpass".to_string()))
    }
}
