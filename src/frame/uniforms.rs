//! Named-uniform contract between the scene and compiled shader programs.
//!
//! Programs are addressed by uniform *name* (`projection`, `lights[2].color`,
//! ...). Writing a name the program never declares is not an error: shader
//! authors are free to use any subset of the conventions, so every sink in
//! this module accepts arbitrary names and readers fall back to zero.

use std::collections::HashMap;

use cgmath::{Matrix4, Vector3, Vector4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Mat4(Matrix4<f32>),
}

/// Sink for named uniform writes on the currently bound program.
pub trait ShaderProgram {
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    /// Booleans travel as ints, as GLSL `bool` uniforms do.
    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Int(value as i32));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vector3<f32>) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    fn set_vec4(&mut self, name: &str, value: Vector4<f32>) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }
}

/// Persistent uniform state of one program: the last value written per name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformBlock {
    values: HashMap<String, UniformValue>,
}

impl UniformBlock {
    pub fn new() -> UniformBlock {
        UniformBlock {
            values: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name)? {
            UniformValue::Int(v) => Some(*v),
            UniformValue::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name)? {
            UniformValue::Float(v) => Some(*v),
            UniformValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vector3<f32>> {
        match self.values.get(name)? {
            UniformValue::Vec3(v) => Some(*v),
            UniformValue::Vec4(v) => Some(v.truncate()),
            _ => None,
        }
    }

    pub fn mat4(&self, name: &str) -> Option<Matrix4<f32>> {
        match self.values.get(name)? {
            UniformValue::Mat4(m) => Some(*m),
            _ => None,
        }
    }
}

impl ShaderProgram for UniformBlock {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_owned(), value);
            }
        }
    }
}

/// Accepts and drops every write. Bound when no program is active.
#[derive(Debug, Default)]
pub struct DiscardUniforms;

impl ShaderProgram for DiscardUniforms {
    fn set_uniform(&mut self, _name: &str, _value: UniformValue) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut block = UniformBlock::new();
        block.set_float("fogStart", 1.0);
        block.set_float("fogStart", 4.0);
        assert_eq!(block.float("fogStart"), Some(4.0));
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn bools_are_ints() {
        let mut block = UniformBlock::new();
        block.set_bool("fogEnabled", true);
        assert_eq!(block.get("fogEnabled"), Some(&UniformValue::Int(1)));
    }

    #[test]
    fn mismatched_reads_are_none() {
        let mut block = UniformBlock::new();
        block.set_vec3("viewPos", Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(block.mat4("viewPos"), None);
        assert_eq!(block.int("missing"), None);
    }
}
