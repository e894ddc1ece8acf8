use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use vulkano::image::ImageViewAbstract;
use vulkano::impl_vertex;
use vulkano::sampler::{Filter, Sampler, SamplerAddressMode, SamplerCreateInfo};
use vulkano::{
    buffer::{BufferUsage, CpuAccessibleBuffer, CpuBufferPool, TypedBufferAccess},
    command_buffer::{
        AutoCommandBufferBuilder, CommandBufferInheritanceInfo, CommandBufferUsage,
        SecondaryAutoCommandBuffer,
    },
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    device::Queue,
    pipeline::{
        graphics::{
            input_assembly::InputAssemblyState,
            vertex_input::BuffersDefinition,
            viewport::{Viewport, ViewportState},
        },
        GraphicsPipeline, Pipeline, PipelineBindPoint,
    },
    render_pass::Subpass,
};

use crate::frame::gbuffer::GBufferAttachment;
use crate::frame::gpu_uniforms::FrameUniforms;
use crate::frame::RenderError;

/// Descriptor binding the lighting program samples `attachment` through.
pub fn sampler_binding(attachment: GBufferAttachment) -> u32 {
    match attachment {
        GBufferAttachment::Position => 1,
        GBufferAttachment::Normal => 2,
        GBufferAttachment::AlbedoSpecular => 3,
    }
}

/// Two triangles covering clip space.
pub const FULLSCREEN_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0] },
];

/// Composes the final image from the G-buffer with the scene lights.
pub struct LightingPass {
    gfx_queue: Arc<Queue>,
    pipeline: Arc<GraphicsPipeline>,
    vertex_buffer: Arc<CpuAccessibleBuffer<[QuadVertex]>>,
    uniform_buffer: CpuBufferPool<FrameUniforms>,
    sampler: Arc<Sampler>,
}

impl LightingPass {
    pub fn new(gfx_queue: Arc<Queue>, subpass: Subpass) -> Result<LightingPass, RenderError> {
        let device = gfx_queue.device().clone();
        let pipeline = LightingPass::create_pipeline(gfx_queue.clone(), subpass)?;
        let vertex_buffer = CpuAccessibleBuffer::from_iter(
            device.clone(),
            BufferUsage {
                vertex_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            FULLSCREEN_QUAD,
        )
        .map_err(|e| RenderError::resource("full-screen quad", e))?;
        let uniform_buffer = CpuBufferPool::<FrameUniforms>::new(
            device.clone(),
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::empty()
            },
        );
        // one texel of the G-buffer per pixel, never blended with the background
        let sampler = Sampler::new(
            device,
            SamplerCreateInfo {
                mag_filter: Filter::Nearest,
                min_filter: Filter::Nearest,
                address_mode: [SamplerAddressMode::ClampToEdge; 3],
                ..Default::default()
            },
        )
        .map_err(|e| RenderError::resource("G-buffer sampler", e))?;

        Ok(LightingPass {
            gfx_queue,
            pipeline,
            vertex_buffer,
            uniform_buffer,
            sampler,
        })
    }

    /// `inputs` pairs each descriptor binding with the image it samples.
    pub fn draw(
        &self,
        subpass: Subpass,
        viewport_dimensions: [u32; 2],
        uniforms: FrameUniforms,
        inputs: [(u32, Arc<dyn ImageViewAbstract>); 3],
    ) -> Result<SecondaryAutoCommandBuffer, RenderError> {
        let uniform_buffer_subbuffer = self
            .uniform_buffer
            .from_data(uniforms)
            .map_err(|e| RenderError::resource("uniform buffer", e))?;

        let [(b0, v0), (b1, v1), (b2, v2)] = inputs;
        let layout = self
            .pipeline
            .layout()
            .set_layouts()
            .get(0)
            .ok_or_else(|| RenderError::resource("descriptor set", "lighting pipeline has no set 0"))?;
        let descriptor_set = PersistentDescriptorSet::new(
            layout.clone(),
            [
                WriteDescriptorSet::buffer(0, uniform_buffer_subbuffer),
                WriteDescriptorSet::image_view_sampler(b0, v0, self.sampler.clone()),
                WriteDescriptorSet::image_view_sampler(b1, v1, self.sampler.clone()),
                WriteDescriptorSet::image_view_sampler(b2, v2, self.sampler.clone()),
            ],
        )
        .map_err(|e| RenderError::resource("descriptor set", e))?;

        let viewport = Viewport {
            origin: [0.0, 0.0],
            dimensions: [viewport_dimensions[0] as f32, viewport_dimensions[1] as f32],
            depth_range: 0.0..1.0,
        };

        let mut builder = AutoCommandBufferBuilder::secondary(
            self.gfx_queue.device().clone(),
            self.gfx_queue.queue_family_index(),
            CommandBufferUsage::MultipleSubmit,
            CommandBufferInheritanceInfo {
                render_pass: Some(subpass.into()),
                ..Default::default()
            },
        )
        .map_err(|e| RenderError::Command(e.to_string()))?;
        builder
            .set_viewport(0, [viewport])
            .bind_pipeline_graphics(self.pipeline.clone())
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                self.pipeline.layout().clone(),
                0,
                descriptor_set,
            )
            .bind_vertex_buffers(0, self.vertex_buffer.clone())
            .draw(self.vertex_buffer.len() as u32, 1, 0, 0)
            .map_err(|e| RenderError::Command(e.to_string()))?;
        builder.build().map_err(|e| RenderError::Command(e.to_string()))
    }

    fn create_pipeline(
        gfx_queue: Arc<Queue>,
        subpass: Subpass,
    ) -> Result<Arc<GraphicsPipeline>, RenderError> {
        let device = gfx_queue.device().clone();
        let vs = vs::load(device.clone()).map_err(|e| RenderError::resource("lighting shader", e))?;
        let fs = fs::load(device.clone()).map_err(|e| RenderError::resource("lighting shader", e))?;
        let vs_main = vs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("lighting shader", "no main"))?;
        let fs_main = fs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("lighting shader", "no main"))?;

        GraphicsPipeline::start()
            .vertex_input_state(BuffersDefinition::new().vertex::<QuadVertex>())
            .vertex_shader(vs_main, ())
            .input_assembly_state(InputAssemblyState::new())
            .viewport_state(ViewportState::viewport_dynamic_scissor_irrelevant())
            .fragment_shader(fs_main, ())
            .render_pass(subpass)
            .build(device)
            .map_err(|e| RenderError::resource("lighting pipeline", e))
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct QuadVertex {
    position: [f32; 2],
}
impl_vertex!(QuadVertex, position);

mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        src: "
#version 450

layout(location = 0) in vec2 position;

layout(location = 0) out vec2 v_uv;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
    v_uv = position * 0.5 + 0.5;
}"
    }
}

mod fs {
    vulkano_shaders::shader! {
        ty: "fragment",
        include: ["src/shaders"],
        src: "
#version 450

#include <frame_uniforms.glsl>
#include <lighting.glsl>

layout(set = 0, binding = 1) uniform sampler2D gPosition;
layout(set = 0, binding = 2) uniform sampler2D gNormal;
layout(set = 0, binding = 3) uniform sampler2D gAlbedoSpec;

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 f_color;

void main() {
    vec4 albedo_spec = texture(gAlbedoSpec, v_uv);
    // only the clear leaves a zero alpha
    if (albedo_spec.a == 0.0) {
        discard;
    }
    vec3 position = texture(gPosition, v_uv).xyz;
    vec3 normal = texture(gNormal, v_uv).xyz;
    vec3 albedo = albedo_spec.rgb;
    float specular = albedo_spec.a;

    vec3 color;
    switch (u.flags.w) {
        case 1: color = position; break;
        case 2: color = normal; break;
        case 3: color = albedo; break;
        case 4: color = vec3(specular); break;
        default: color = shade(position, normal, u.viewPos.xyz, albedo, specular); break;
    }
    f_color = vec4(color, 1.0);
}"
    }
}
