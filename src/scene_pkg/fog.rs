use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use crate::frame::uniforms::ShaderProgram;

/// Scene-wide linear fog.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fog {
    pub enabled: bool,
    pub color: [f32; 3],
    pub start: f32,
    pub end: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Fog {
            enabled: false,
            color: [0.5, 0.5, 0.5],
            start: 5.0,
            end: 30.0,
        }
    }
}

impl Fog {
    pub fn write_uniforms(&self, program: &mut dyn ShaderProgram) {
        program.set_bool("fogEnabled", self.enabled);
        program.set_vec3("fogColor", Vector3::from(self.color));
        program.set_float("fogStart", self.start);
        program.set_float("fogEnd", self.end);
    }

    /// Share of the surface color kept at `distance`: 1 up to `start`,
    /// 0 from `end` on. Same formula as the shaders.
    pub fn visibility(&self, distance: f32) -> f32 {
        fog_visibility(distance, self.start, self.end)
    }
}

pub fn fog_visibility(distance: f32, start: f32, end: f32) -> f32 {
    ((end - distance) / (end - start).max(1e-4)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniforms::UniformBlock;

    #[test]
    fn writes_all_four_uniforms() {
        let mut block = UniformBlock::new();
        Fog::default().write_uniforms(&mut block);
        assert_eq!(block.int("fogEnabled"), Some(0));
        assert_eq!(block.float("fogStart"), Some(5.0));
        assert_eq!(block.float("fogEnd"), Some(30.0));
        assert_eq!(block.vec3("fogColor"), Some(Vector3::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn visibility_is_linear_between_planes() {
        let fog = Fog {
            enabled: true,
            color: [0.0; 3],
            start: 10.0,
            end: 20.0,
        };
        assert_eq!(fog.visibility(2.0), 1.0);
        assert_eq!(fog.visibility(15.0), 0.5);
        assert_eq!(fog.visibility(40.0), 0.0);
    }
}
