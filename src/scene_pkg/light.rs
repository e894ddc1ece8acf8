use cgmath::{Matrix3, Matrix4, Vector3};

use crate::frame::uniforms::ShaderProgram;

/// Size of the `lights[]` array every lighting-aware program declares.
pub const MAX_LIGHTS: usize = 16;

pub const LIGHT_DIRECTIONAL: i32 = 0;
pub const LIGHT_POINT: i32 = 1;
pub const LIGHT_SPOT: i32 = 2;

/// Coordinate space light positions and directions are written in.
#[derive(Clone, Copy, Debug)]
pub enum LightSpace {
    World,
    /// Eye space of the given view matrix.
    View(Matrix4<f32>),
}

impl LightSpace {
    fn point(&self, p: Vector3<f32>) -> Vector3<f32> {
        match self {
            LightSpace::World => p,
            LightSpace::View(view) => (view * p.extend(1.0)).truncate(),
        }
    }

    fn direction(&self, d: Vector3<f32>) -> Vector3<f32> {
        match self {
            LightSpace::World => d,
            LightSpace::View(view) => upper_left(view) * d,
        }
    }
}

fn upper_left(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Attenuation {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }

    fn write(&self, program: &mut dyn ShaderProgram, base: &str) {
        program.set_float(&format!("{}.constant", base), self.constant);
        program.set_float(&format!("{}.linear", base), self.linear);
        program.set_float(&format!("{}.quadratic", base), self.quadratic);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
}

impl DirectionalLight {
    pub fn new(direction: Vector3<f32>, color: Vector3<f32>) -> DirectionalLight {
        DirectionalLight { direction, color }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn new(position: Vector3<f32>, color: Vector3<f32>) -> PointLight {
        PointLight {
            position,
            color,
            attenuation: Attenuation::default(),
        }
    }
}

/// Cone light. Cutoffs are kept as cosines with `outer <= inner`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub position: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub attenuation: Attenuation,
    cut_off: f32,
    outer_cut_off: f32,
}

impl SpotLight {
    pub fn new(position: Vector3<f32>, direction: Vector3<f32>, color: Vector3<f32>) -> SpotLight {
        SpotLight {
            position,
            direction,
            color,
            attenuation: Attenuation::default(),
            cut_off: cos_deg(12.5),
            outer_cut_off: cos_deg(15.0),
        }
    }

    /// Cosine of the inner cone half-angle.
    pub fn cut_off(&self) -> f32 {
        self.cut_off
    }

    /// Cosine of the outer cone half-angle.
    pub fn outer_cut_off(&self) -> f32 {
        self.outer_cut_off
    }

    /// Sets the inner half-angle; widens the outer cone if it would end up
    /// narrower than the inner one.
    pub fn set_cut_off_degrees(&mut self, degrees: f32) {
        self.cut_off = cos_deg(degrees);
        if self.outer_cut_off > self.cut_off {
            self.outer_cut_off = self.cut_off;
        }
    }

    /// Sets the outer half-angle; narrows the inner cone if needed.
    pub fn set_outer_cut_off_degrees(&mut self, degrees: f32) {
        self.outer_cut_off = cos_deg(degrees);
        if self.cut_off < self.outer_cut_off {
            self.cut_off = self.outer_cut_off;
        }
    }

    /// Smooth-edged cone intensity for `theta`, the cosine between the light
    /// direction and the direction towards the fragment.
    pub fn cone_intensity(&self, theta: f32) -> f32 {
        cone_intensity(theta, self.cut_off, self.outer_cut_off)
    }
}

/// Shared with the shaders: the cone edge width never drops below 1e-4.
pub fn cone_intensity(theta: f32, cut_off: f32, outer_cut_off: f32) -> f32 {
    let epsilon = (cut_off - outer_cut_off).max(1e-4);
    ((theta - outer_cut_off) / epsilon).clamp(0.0, 1.0)
}

fn cos_deg(degrees: f32) -> f32 {
    degrees.to_radians().cos()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn kind(&self) -> i32 {
        match self {
            Light::Directional(_) => LIGHT_DIRECTIONAL,
            Light::Point(_) => LIGHT_POINT,
            Light::Spot(_) => LIGHT_SPOT,
        }
    }

    pub fn color(&self) -> Vector3<f32> {
        match self {
            Light::Directional(l) => l.color,
            Light::Point(l) => l.color,
            Light::Spot(l) => l.color,
        }
    }

    pub fn set_color(&mut self, color: Vector3<f32>) {
        match self {
            Light::Directional(l) => l.color = color,
            Light::Point(l) => l.color = color,
            Light::Spot(l) => l.color = color,
        }
    }

    /// Writes `lights[slot]` on the bound program. Only the fields the
    /// variant defines are written.
    pub fn write_uniforms(&self, program: &mut dyn ShaderProgram, slot: usize, space: LightSpace) {
        let base = format!("lights[{}]", slot);
        program.set_int(&format!("{}.type", base), self.kind());
        match self {
            Light::Directional(light) => {
                program.set_vec3(&format!("{}.direction", base), space.direction(light.direction));
                program.set_vec3(&format!("{}.color", base), light.color);
            }
            Light::Point(light) => {
                program.set_vec3(&format!("{}.position", base), space.point(light.position));
                program.set_vec3(&format!("{}.color", base), light.color);
                light.attenuation.write(program, &base);
            }
            Light::Spot(light) => {
                program.set_vec3(&format!("{}.position", base), space.point(light.position));
                program.set_vec3(&format!("{}.direction", base), space.direction(light.direction));
                program.set_vec3(&format!("{}.color", base), light.color);
                light.attenuation.write(program, &base);
                program.set_float(&format!("{}.cutOff", base), light.cut_off);
                program.set_float(&format!("{}.outerCutOff", base), light.outer_cut_off);
            }
        }
    }
}

impl From<DirectionalLight> for Light {
    fn from(light: DirectionalLight) -> Self {
        Light::Directional(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Light::Point(light)
    }
}

impl From<SpotLight> for Light {
    fn from(light: SpotLight) -> Self {
        Light::Spot(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniforms::UniformBlock;
    use approx::assert_relative_eq;
    use cgmath::Point3;

    #[test]
    fn directional_writes_only_its_fields() {
        let mut block = UniformBlock::new();
        let light = Light::from(DirectionalLight::new(
            Vector3::new(-0.2, -1.0, -0.3),
            Vector3::new(1.0, 1.0, 1.0),
        ));
        light.write_uniforms(&mut block, 0, LightSpace::World);

        assert_eq!(block.int("lights[0].type"), Some(LIGHT_DIRECTIONAL));
        assert_eq!(block.vec3("lights[0].direction"), Some(Vector3::new(-0.2, -1.0, -0.3)));
        assert!(!block.contains("lights[0].position"));
        assert!(!block.contains("lights[0].constant"));
        assert_eq!(block.len(), 3);
    }

    #[test]
    fn spot_writes_everything() {
        let mut block = UniformBlock::new();
        let light = Light::from(SpotLight::new(
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(1.0, 0.5, 0.2),
        ));
        light.write_uniforms(&mut block, 3, LightSpace::World);

        assert_eq!(block.int("lights[3].type"), Some(LIGHT_SPOT));
        assert_eq!(block.len(), 9);
        assert_relative_eq!(block.float("lights[3].cutOff").unwrap_or(0.0), 0.976296, epsilon = 1e-5);
        assert_relative_eq!(
            block.float("lights[3].outerCutOff").unwrap_or(0.0),
            0.965926,
            epsilon = 1e-5
        );
        assert_eq!(block.float("lights[3].quadratic"), Some(0.032));
    }

    #[test]
    fn view_space_transforms_position_and_direction() {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let mut block = UniformBlock::new();
        let light = Light::from(SpotLight::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ));
        light.write_uniforms(&mut block, 0, LightSpace::View(view));

        let position = block.vec3("lights[0].position").unwrap_or(Vector3::new(9.0, 9.0, 9.0));
        assert_relative_eq!(position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(position.z, -5.0, epsilon = 1e-5);
        // translation must not leak into directions
        let direction = block.vec3("lights[0].direction").unwrap_or(Vector3::new(9.0, 9.0, 9.0));
        assert_relative_eq!(direction.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(direction.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(direction.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn cutoff_setters_keep_outer_cone_wider() {
        let mut spot = SpotLight::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        spot.set_cut_off_degrees(30.0);
        assert!(spot.outer_cut_off() <= spot.cut_off());
        assert_relative_eq!(spot.outer_cut_off(), spot.cut_off());

        spot.set_outer_cut_off_degrees(5.0);
        assert!(spot.outer_cut_off() <= spot.cut_off());
        assert_relative_eq!(spot.cut_off(), cos_deg(5.0));
    }

    #[test]
    fn cone_intensity_edges() {
        let spot = SpotLight::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert_relative_eq!(spot.cone_intensity(1.0), 1.0);
        assert_relative_eq!(spot.cone_intensity(0.5), 0.0);
        let mid = (spot.cut_off() + spot.outer_cut_off()) / 2.0;
        assert_relative_eq!(spot.cone_intensity(mid), 0.5, epsilon = 1e-3);
    }

    #[test]
    fn default_attenuation_at_ten_units() {
        let a = Attenuation::default();
        assert_relative_eq!(a.factor(0.0), 1.0);
        assert_relative_eq!(a.factor(10.0), 1.0 / (1.0 + 0.9 + 3.2));
    }
}
