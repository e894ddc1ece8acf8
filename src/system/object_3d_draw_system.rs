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
    shader::{ShaderCreationError, ShaderModule},
};

use crate::frame::gpu_uniforms::FrameUniforms;
use crate::frame::program::ProgramKind;
use crate::frame::RenderError;
use crate::scene_pkg::mesh::{Color, Normal, Uv, Vertex};
use crate::system::mesh::GeometryBuffer;

fn loaded(
    module: Result<Arc<ShaderModule>, ShaderCreationError>,
) -> Result<Arc<ShaderModule>, RenderError> {
    module.map_err(|e| RenderError::resource("forward shader", e))
}

/// Forward pipelines drawing straight into the default target: Phong, flat
/// color and normal visualisation, all sharing one vertex stage.
pub struct Object3DDrawSystem {
    gfx_queue: Arc<Queue>,
    phong_pipeline: Arc<GraphicsPipeline>,
    color_pipeline: Arc<GraphicsPipeline>,
    normal_pipeline: Arc<GraphicsPipeline>,
    uniform_buffer: CpuBufferPool<FrameUniforms>,
}

impl Object3DDrawSystem {
    pub fn new(gfx_queue: Arc<Queue>, subpass: Subpass) -> Result<Object3DDrawSystem, RenderError> {
        let device = gfx_queue.device().clone();
        let vs = loaded(vs::load(device.clone()))?;
        let phong = loaded(fs_phong::load(device.clone()))?;
        let color = loaded(fs_color::load(device.clone()))?;
        let normal = loaded(fs_normal::load(device.clone()))?;

        let phong_pipeline = Object3DDrawSystem::create_pipeline(&gfx_queue, &subpass, &vs, &phong)?;
        let color_pipeline = Object3DDrawSystem::create_pipeline(&gfx_queue, &subpass, &vs, &color)?;
        let normal_pipeline =
            Object3DDrawSystem::create_pipeline(&gfx_queue, &subpass, &vs, &normal)?;

        let uniform_buffer = CpuBufferPool::<FrameUniforms>::new(
            device,
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::empty()
            },
        );

        Ok(Object3DDrawSystem {
            gfx_queue,
            phong_pipeline,
            color_pipeline,
            normal_pipeline,
            uniform_buffer,
        })
    }

    pub fn supports(kind: ProgramKind) -> bool {
        matches!(kind, ProgramKind::Phong | ProgramKind::Color | ProgramKind::Normal)
    }

    fn pipeline(&self, kind: ProgramKind) -> Option<&Arc<GraphicsPipeline>> {
        match kind {
            ProgramKind::Phong => Some(&self.phong_pipeline),
            ProgramKind::Color => Some(&self.color_pipeline),
            ProgramKind::Normal => Some(&self.normal_pipeline),
            ProgramKind::Geometry | ProgramKind::Lighting => None,
        }
    }

    pub fn draw(
        &self,
        kind: ProgramKind,
        subpass: Subpass,
        viewport_dimensions: [u32; 2],
        uniforms: FrameUniforms,
        geometry: &GeometryBuffer,
    ) -> Result<SecondaryAutoCommandBuffer, RenderError> {
        let pipeline = self
            .pipeline(kind)
            .ok_or_else(|| RenderError::Command(format!("{:?} is not a forward program", kind)))?
            .clone();

        let uniform_buffer_subbuffer = self
            .uniform_buffer
            .from_data(uniforms)
            .map_err(|e| RenderError::resource("uniform buffer", e))?;
        let layout = pipeline
            .layout()
            .set_layouts()
            .get(0)
            .ok_or_else(|| RenderError::resource("descriptor set", "forward pipeline has no set 0"))?;
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
            .bind_pipeline_graphics(pipeline.clone())
            .bind_descriptor_sets(PipelineBindPoint::Graphics, pipeline.layout().clone(), 0, set)
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
        gfx_queue: &Arc<Queue>,
        subpass: &Subpass,
        vs: &Arc<ShaderModule>,
        fs: &Arc<ShaderModule>,
    ) -> Result<Arc<GraphicsPipeline>, RenderError> {
        let vs_main = vs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("forward shader", "no main"))?;
        let fs_main = fs
            .entry_point("main")
            .ok_or_else(|| RenderError::resource("forward shader", "no main"))?;

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
            .render_pass(subpass.clone())
            .build(gfx_queue.device().clone())
            .map_err(|e| RenderError::resource("forward pipeline", e))
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

layout(location = 0) out vec3 v_world_pos;
layout(location = 1) out vec3 v_normal;
layout(location = 2) out vec3 v_color;

void main() {
    vec4 world = u.model * vec4(position, 1.0);
    v_world_pos = world.xyz;
    v_normal = normal_matrix(u.model) * normal;
    v_color = base_color(color);
    gl_Position = u.projection * u.view * world;
}"
    }
}

mod fs_phong {
    vulkano_shaders::shader! {
        ty: "fragment",
        include: ["src/shaders"],
        src: "
#version 450

#include <frame_uniforms.glsl>
#include <lighting.glsl>

layout(location = 0) in vec3 v_world_pos;
layout(location = 1) in vec3 v_normal;
layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 f_color;

void main() {
    f_color = vec4(shade(v_world_pos, v_normal, u.viewPos.xyz, v_color, SPECULAR_STRENGTH), 1.0);
}"
    }
}

mod fs_color {
    vulkano_shaders::shader! {
        ty: "fragment",
        src: "
#version 450

layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 f_color;

void main() {
    f_color = vec4(v_color, 1.0);
}"
    }
}

mod fs_normal {
    vulkano_shaders::shader! {
        ty: "fragment",
        src: "
#version 450

layout(location = 1) in vec3 v_normal;

layout(location = 0) out vec4 f_color;

void main() {
    f_color = vec4(normalize(v_normal) * 0.5 + 0.5, 1.0);
}"
    }
}
