// Copyright (c) 2017 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use std::sync::Arc;

use vulkano::{
    buffer::{BufferUsage, CpuBufferPool},
    command_buffer::{
        AutoCommandBufferBuilder, CommandBufferInheritanceInfo, CommandBufferUsage,
        SecondaryAutoCommandBuffer,
    },
    descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet},
    device::Queue,
    pipeline::{
        graphics::{
            depth_stencil::DepthStencilState,
            input_assembly::InputAssemblyState,
            vertex_input::BuffersDefinition,
            viewport::{Viewport, ViewportState},
        },
        GraphicsPipeline, Pipeline, PipelineBindPoint,
    },
    render_pass::Subpass,
};

use crate::frame::gpu_uniforms::FrameUniforms;
use crate::frame::RenderError;
use crate::scene_pkg::mesh::{Color, Normal, Uv, Vertex};
use crate::system::mesh::GeometryBuffer;

/// Writes view-space position, normal and albedo/specular of every drawn
/// triangle into the G-buffer.
pub struct Object3DDeferredPass {
    gfx_queue: Arc<Queue>,
    pipeline: Arc<GraphicsPipeline>,
    uniform_buffer: CpuBufferPool<FrameUniforms>,
}

impl Object3DDeferredPass {
    pub fn new(gfx_queue: Arc<Queue>, subpass: Subpass) -> Result<Object3DDeferredPass, RenderError> {
        let pipeline = Object3DDeferredPass::create_pipeline(gfx_queue.clone(), subpass)?;
        let uniform_buffer = CpuBufferPool::<FrameUniforms>::new(
            gfx_queue.device().clone(),
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::empty()
            },
        );
        Ok(Object3DDeferredPass {
            gfx_queue,
            pipeline,
            uniform_buffer,
        })
    }

    /// Records one indexed draw inside `subpass`, which must be the open
    /// G-buffer pass.
    pub fn draw(
        &self,
        subpass: Subpass,
        viewport_dimensions: [u32; 2],
        uniforms: FrameUniforms,
        geometry: &GeometryBuffer,
    ) -> Result<SecondaryAutoCommandBuffer, RenderError> {
        let uniform_buffer_subbuffer = self
            .uniform_buffer
            .from_data(uniforms)
            .map_err(|e| RenderError::resource("uniform buffer", e))?;

        let layout = self
            .pipeline
            .layout()
            .set_layouts()
            .get(0)
            .ok_or_else(|| RenderError::resource("descriptor set", "geometry pipeline has no set 0"))?;
        let set = PersistentDescriptorSet::new(
            layout.clone(),
            [WriteDescriptorSet::buffer(0, uniform_buffer_subbuffer)],
        )
        .map_err(|e| RenderError::resource("descriptor set", e))?;

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
            .set_viewport(
                0,
                [Viewport {
                    origin: [0.0, 0.0],
                    dimensions: [viewport_dimensions[0] as f32, viewport_dimensions[1] as f32],
                    depth_range: 0.0..1.0,
                }],
            )
            .bind_pipeline_graphics(self.pipeline.clone())
            .bind_descriptor_sets(
                PipelineBindPoint::Graphics,
                self.pipeline.layout().clone(),
                0,
                set,
            )
            .bind_vertex_buffers(
                0,
                (
                    geometry.vertex_buffer.clone(),
                    geometry.color_buffer.clone(),
                    geometry.normals_buffer.clone(),
                    geometry.uv_buffer.clone(),
                ),
            )
            .bind_index_buffer(geometry.index_buffer.clone())
            .draw_indexed(geometry.index_count(), 1, 0, 0, 0)
            .map_err(|e| RenderError::Command(e.to_string()))?;
        builder.build().map_err(|e| RenderError::Command(e.to_string()))
    }

    fn create_pipeline(
        gfx_queue: Arc<Queue>,
        subpass: Subpass,
    ) -> Result<Arc<GraphicsPipeline>, RenderError> {
        let device = gfx_queue.device().clone();
        let vs = vs::load(device.clone()).map_err(|e| RenderError::resource("geometry shader", e))?;
        let fs = fs::load(device.clone()).map_err(|e| RenderError::resource("geometry shader", e))?;
        let vs_main = vs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("geometry shader", "no main"))?;
        let fs_main = fs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("geometry shader", "no main"))?;

        GraphicsPipeline::start()
            .vertex_input_state(
                BuffersDefinition::new()
                    .vertex::<Vertex>()
                    .vertex::<Color>()
                    .vertex::<Normal>()
                    .vertex::<Uv>(),
            )
            .vertex_shader(vs_main, ())
            .input_assembly_state(InputAssemblyState::new())
            .viewport_state(ViewportState::viewport_dynamic_scissor_irrelevant())
            .fragment_shader(fs_main, ())
            .depth_stencil_state(DepthStencilState::simple_depth_test())
            .render_pass(subpass)
            .build(device)
            .map_err(|e| RenderError::resource("geometry pipeline", e))
    }
}

mod vs {
    vulkano_shaders::shader! {
        ty: "vertex",
        include: ["src/shaders"],
        src: "
#version 450

#include <frame_uniforms.glsl>

layout(location = 0) in vec3 position;
layout(location = 1) in vec3 color;
layout(location = 2) in vec3 normal;

layout(location = 0) out vec3 v_position;
layout(location = 1) out vec3 v_normal;
layout(location = 2) out vec3 v_color;

void main() {
    mat4 model_view = u.view * u.model;
    vec4 view_position = model_view * vec4(position, 1.0);
    v_position = view_position.xyz;
    v_normal = normal_matrix(model_view) * normal;
    v_color = base_color(color);
    gl_Position = u.projection * view_position;
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

layout(location = 0) in vec3 v_position;
layout(location = 1) in vec3 v_normal;
layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 g_position;
layout(location = 1) out vec4 g_normal;
layout(location = 2) out vec4 g_albedo_spec;

void main() {
    g_position = vec4(v_position, 1.0);
    g_normal = vec4(normalize(v_normal), 1.0);
    g_albedo_spec = vec4(v_color, SPECULAR_STRENGTH);
}"
    }
}
