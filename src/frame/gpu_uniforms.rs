//! std140 image of a program's uniform state.
//!
//! Every GLSL program in the crate declares the same `FrameUniforms` block
//! (see [`GLSL_BLOCK`]), so one packed struct serves all of them. Members are
//! vec4/ivec4/mat4 only, which keeps the Rust layout free of padding.

use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::scene_pkg::light::MAX_LIGHTS;

use super::uniforms::UniformBlock;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color: [f32; 4],
    /// constant, linear, quadratic, unused
    pub attenuation: [f32; 4],
    /// cutOff, outerCutOff, unused, unused
    pub cone: [f32; 4],
    /// type, unused, unused, unused
    pub kind: [i32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct FrameUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub object_color: [f32; 4],
    pub fog_color: [f32; 4],
    /// fogStart, fogEnd, unused, unused
    pub fog_range: [f32; 4],
    /// numLights, fogEnabled, useObjectColor, displayMode
    pub flags: [i32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

/// Shared GLSL declaration, `#include`d by every shader.
pub const GLSL_BLOCK: &str = include_str!("../shaders/frame_uniforms.glsl");

/// Maps GL clip space (y up, z in [-1, 1]) to Vulkan clip space
/// (y down, z in [0, 1]).
pub fn vulkan_clip_correction() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 0.5, 0.0, //
        0.0, 0.0, 0.5, 1.0,
    )
}

fn vec4(v: Vector3<f32>, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

fn zero3() -> Vector3<f32> {
    Vector3::new(0.0, 0.0, 0.0)
}

impl FrameUniforms {
    /// Packs the last written uniform values. Missing scalars and vectors
    /// pack as zero, missing matrices as identity.
    pub fn from_block(block: &UniformBlock) -> FrameUniforms {
        let matrix = |name: &str| -> [[f32; 4]; 4] {
            block.mat4(name).unwrap_or_else(Matrix4::identity).into()
        };
        let vector = |name: &str| block.vec3(name).unwrap_or_else(zero3);
        let float = |name: &str| block.float(name).unwrap_or(0.0);
        let int = |name: &str| block.int(name).unwrap_or(0);

        let num_lights = int("numLights").clamp(0, MAX_LIGHTS as i32);
        let mut lights = [GpuLight::default(); MAX_LIGHTS];
        for (slot, light) in lights.iter_mut().enumerate().take(num_lights as usize) {
            let field = |name: &str| format!("lights[{}].{}", slot, name);
            *light = GpuLight {
                position: vec4(vector(&field("position")), 1.0),
                direction: vec4(vector(&field("direction")), 0.0),
                color: vec4(vector(&field("color")), 1.0),
                attenuation: [
                    float(&field("constant")),
                    float(&field("linear")),
                    float(&field("quadratic")),
                    0.0,
                ],
                cone: [float(&field("cutOff")), float(&field("outerCutOff")), 0.0, 0.0],
                kind: [int(&field("type")), 0, 0, 0],
            };
        }

        FrameUniforms {
            projection: matrix("projection"),
            view: matrix("view"),
            model: matrix("model"),
            view_pos: vec4(vector("viewPos"), 1.0),
            object_color: vec4(vector("objectColor"), 1.0),
            fog_color: vec4(vector("fogColor"), 1.0),
            fog_range: [float("fogStart"), float("fogEnd"), 0.0, 0.0],
            flags: [
                num_lights,
                int("fogEnabled"),
                int("useObjectColor"),
                int("displayMode"),
            ],
            lights,
        }
    }

    /// Same uniforms with the projection rewritten for Vulkan clip space.
    pub fn for_vulkan(mut self) -> FrameUniforms {
        let projection = vulkan_clip_correction() * Matrix4::from(self.projection);
        self.projection = projection.into();
        self
    }

    /// Light count in `0..=MAX_LIGHTS`; the public `flags` may hold anything.
    pub fn num_lights(&self) -> usize {
        self.flags[0].clamp(0, MAX_LIGHTS as i32) as usize
    }

    pub fn fog_enabled(&self) -> bool {
        self.flags[1] != 0
    }

    pub fn use_object_color(&self) -> bool {
        self.flags[2] != 0
    }

    pub fn display_mode(&self) -> i32 {
        self.flags[3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniforms::ShaderProgram;
    use crate::scene_pkg::light::{Light, LightSpace, PointLight};
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    #[test]
    fn layout_matches_std140_block() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 96);
        assert_eq!(
            std::mem::size_of::<FrameUniforms>(),
            3 * 64 + 4 * 16 + 16 + MAX_LIGHTS * 96
        );
    }

    #[test]
    fn empty_block_packs_to_safe_defaults() {
        let packed = FrameUniforms::from_block(&UniformBlock::new());
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        assert_eq!(packed.model, identity);
        assert_eq!(packed.flags, [0, 0, 0, 0]);
        assert_eq!(packed.lights[0], GpuLight::default());
    }

    #[test]
    fn lights_pack_into_their_slots() {
        let mut block = UniformBlock::new();
        block.set_int("numLights", 2);
        let light = Light::from(PointLight::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.5, 0.5, 0.5),
        ));
        light.write_uniforms(&mut block, 1, LightSpace::World);

        let packed = FrameUniforms::from_block(&block);
        assert_eq!(packed.num_lights(), 2);
        assert_eq!(packed.lights[1].position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(packed.lights[1].kind[0], 1);
        assert_eq!(packed.lights[1].attenuation, [1.0, 0.09, 0.032, 0.0]);
        // slot 0 was never written
        assert_eq!(packed.lights[0].color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn light_count_is_clamped() {
        let mut block = UniformBlock::new();
        block.set_int("numLights", 400);
        assert_eq!(FrameUniforms::from_block(&block).num_lights(), MAX_LIGHTS);
        block.set_int("numLights", -3);
        assert_eq!(FrameUniforms::from_block(&block).num_lights(), 0);
    }

    #[test]
    fn hand_written_flags_stay_in_range() {
        let mut packed = FrameUniforms::from_block(&UniformBlock::new());
        packed.flags[0] = -7;
        assert_eq!(packed.num_lights(), 0);
        packed.flags[0] = 1000;
        assert_eq!(packed.num_lights(), MAX_LIGHTS);
    }

    #[test]
    fn glsl_block_declares_the_packed_members() {
        assert!(GLSL_BLOCK.contains(&format!("#define MAX_LIGHTS {}", MAX_LIGHTS)));
        for member in ["mat4 projection;", "vec4 fogRange;", "ivec4 flags;", "ivec4 kind;"] {
            assert!(GLSL_BLOCK.contains(member), "missing {}", member);
        }
    }

    #[test]
    fn clip_correction_flips_y_and_halves_depth() {
        let correction = vulkan_clip_correction();
        let near = correction * Vector4::new(0.0, 1.0, -1.0, 1.0);
        let far = correction * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert_relative_eq!(near.y, -1.0);
        assert_relative_eq!(near.z, 0.0);
        assert_relative_eq!(far.z, 1.0);
    }
}
