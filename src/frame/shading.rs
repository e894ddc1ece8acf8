//! CPU mirror of the GLSL lighting model.
//!
//! These functions evaluate exactly what the forward Phong program and the
//! deferred geometry/lighting programs compute per pixel, reading the same
//! packed [`FrameUniforms`]. They let frame output be checked without a GPU.

use cgmath::{ElementWise, InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

use crate::scene_pkg::fog::fog_visibility;
use crate::scene_pkg::light::{cone_intensity, LIGHT_DIRECTIONAL, LIGHT_SPOT};

use super::gpu_uniforms::{FrameUniforms, GpuLight};

pub const AMBIENT_STRENGTH: f32 = 0.1;
pub const SPECULAR_STRENGTH: f32 = 0.5;
pub const SHININESS: f32 = 32.0;

/// One pixel of the three G-buffer targets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GBufferTexel {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    pub albedo_spec: [f32; 4],
}

impl GBufferTexel {
    /// Texel left by the clear before the geometry pass.
    pub fn background() -> GBufferTexel {
        GBufferTexel::default()
    }

    /// Zero alpha only ever comes from the clear.
    pub fn is_background(&self) -> bool {
        self.albedo_spec[3] == 0.0
    }
}

fn xyz(v: [f32; 4]) -> Vector3<f32> {
    Vector3::new(v[0], v[1], v[2])
}

fn reflect(incident: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}

fn mix(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a * (1.0 - t) + b * t
}

fn quantize_unorm8(value: f32) -> f32 {
    (value.clamp(0.0, 1.0) * 255.0).round() / 255.0
}

fn base_color(uniforms: &FrameUniforms, vertex_color: Vector3<f32>) -> Vector3<f32> {
    if uniforms.use_object_color() {
        xyz(uniforms.object_color)
    } else {
        vertex_color
    }
}

fn light_contribution(
    light: &GpuLight,
    frag_pos: Vector3<f32>,
    normal: Vector3<f32>,
    view_dir: Vector3<f32>,
    albedo: Vector3<f32>,
    specular_strength: f32,
) -> Vector3<f32> {
    let kind = light.kind[0];
    let color = xyz(light.color);
    let (to_light, attenuation) = if kind == LIGHT_DIRECTIONAL {
        ((-xyz(light.direction)).normalize(), 1.0)
    } else {
        let delta = xyz(light.position) - frag_pos;
        let distance = delta.magnitude();
        let [constant, linear, quadratic, _] = light.attenuation;
        (
            delta.normalize(),
            1.0 / (constant + linear * distance + quadratic * distance * distance),
        )
    };

    let diffuse = normal.dot(to_light).max(0.0);
    let reflected = reflect(-to_light, normal);
    let specular = view_dir.dot(reflected).max(0.0).powf(SHININESS);

    let intensity = if kind == LIGHT_SPOT {
        let theta = to_light.dot((-xyz(light.direction)).normalize());
        cone_intensity(theta, light.cone[0], light.cone[1])
    } else {
        1.0
    };

    let lit = color.mul_element_wise(albedo) * diffuse + color * (specular_strength * specular);
    lit * (attenuation * intensity)
}

fn apply_fog(uniforms: &FrameUniforms, color: Vector3<f32>, distance: f32) -> Vector3<f32> {
    if !uniforms.fog_enabled() {
        return color;
    }
    let visibility = fog_visibility(distance, uniforms.fog_range[0], uniforms.fog_range[1]);
    mix(xyz(uniforms.fog_color), color, visibility)
}

fn shade(
    uniforms: &FrameUniforms,
    frag_pos: Vector3<f32>,
    normal: Vector3<f32>,
    eye: Vector3<f32>,
    albedo: Vector3<f32>,
    specular_strength: f32,
) -> Vector3<f32> {
    let normal = normal.normalize();
    let view_dir = (eye - frag_pos).normalize();
    let mut result = albedo * AMBIENT_STRENGTH;
    for light in &uniforms.lights[..uniforms.num_lights()] {
        result += light_contribution(light, frag_pos, normal, view_dir, albedo, specular_strength);
    }
    apply_fog(uniforms, result, (eye - frag_pos).magnitude())
}

/// Forward Phong fragment for a world-space surface point.
pub fn shade_forward(
    uniforms: &FrameUniforms,
    world_pos: Vector3<f32>,
    world_normal: Vector3<f32>,
    vertex_color: Vector3<f32>,
) -> Vector3<f32> {
    let albedo = base_color(uniforms, vertex_color);
    shade(
        uniforms,
        world_pos,
        world_normal,
        xyz(uniforms.view_pos),
        albedo,
        SPECULAR_STRENGTH,
    )
}

/// World-space position and normal of an object-space vertex, as the
/// forward vertex stage produces them.
pub fn forward_vertex(
    uniforms: &FrameUniforms,
    local_pos: Vector3<f32>,
    local_normal: Vector3<f32>,
) -> (Vector3<f32>, Vector3<f32>) {
    let model = Matrix4::from(uniforms.model);
    let world_pos = (model * local_pos.extend(1.0)).truncate();
    (world_pos, normal_matrix(&model) * local_normal)
}

fn normal_matrix(m: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
    upper
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(upper)
}

/// What the geometry program writes for an object-space surface point.
pub fn geometry_pass_texel(
    uniforms: &FrameUniforms,
    local_pos: Vector3<f32>,
    local_normal: Vector3<f32>,
    vertex_color: Vector3<f32>,
) -> GBufferTexel {
    let model_view = Matrix4::from(uniforms.view) * Matrix4::from(uniforms.model);
    let view_pos: Vector4<f32> = model_view * local_pos.extend(1.0);
    let view_normal = (normal_matrix(&model_view) * local_normal).normalize();
    let albedo = base_color(uniforms, vertex_color);
    GBufferTexel {
        position: [view_pos.x, view_pos.y, view_pos.z, 1.0],
        normal: [view_normal.x, view_normal.y, view_normal.z, 1.0],
        albedo_spec: [
            quantize_unorm8(albedo.x),
            quantize_unorm8(albedo.y),
            quantize_unorm8(albedo.z),
            quantize_unorm8(SPECULAR_STRENGTH),
        ],
    }
}

/// Lighting-pass output for one texel, `None` where the program discards
/// (the pixel keeps the clear color).
pub fn shade_deferred(uniforms: &FrameUniforms, texel: &GBufferTexel) -> Option<Vector3<f32>> {
    if texel.is_background() {
        return None;
    }
    let position = xyz(texel.position);
    let normal = xyz(texel.normal);
    let albedo = xyz(texel.albedo_spec);
    let specular = texel.albedo_spec[3];
    let color = match uniforms.display_mode() {
        1 => position,
        2 => normal,
        3 => albedo,
        4 => Vector3::new(specular, specular, specular),
        _ => shade(uniforms, position, normal, xyz(uniforms.view_pos), albedo, specular),
    };
    Some(color)
}

/// Final pixel color of a deferred frame, background included.
pub fn resolve_deferred(
    uniforms: &FrameUniforms,
    texel: &GBufferTexel,
    clear_color: [f32; 4],
) -> Vector3<f32> {
    shade_deferred(uniforms, texel)
        .unwrap_or_else(|| Vector3::new(clear_color[0], clear_color[1], clear_color[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::uniforms::{ShaderProgram, UniformBlock};
    use crate::scene_pkg::light::{DirectionalLight, Light, LightSpace};
    use approx::assert_relative_eq;

    fn lit_block() -> UniformBlock {
        let mut block = UniformBlock::new();
        block.set_int("numLights", 1);
        Light::from(DirectionalLight::new(
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ))
        .write_uniforms(&mut block, 0, LightSpace::World);
        block.set_vec3("viewPos", Vector3::new(0.0, 5.0, 0.0));
        block
    }

    #[test]
    fn unlit_surface_gets_ambient_only() {
        let mut block = lit_block();
        block.set_int("numLights", 0);
        let uniforms = FrameUniforms::from_block(&block);
        let color = shade_forward(
            &uniforms,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 0.5, 0.0),
        );
        assert_relative_eq!(color.x, 0.1, epsilon = 1e-6);
        assert_relative_eq!(color.y, 0.05, epsilon = 1e-6);
    }

    #[test]
    fn negative_light_count_shades_ambient_only() {
        let mut uniforms = FrameUniforms::from_block(&lit_block());
        uniforms.flags[0] = -5;
        let color = shade_forward(
            &uniforms,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.5, 0.5, 0.5),
        );
        assert_relative_eq!(color.x, 0.05, epsilon = 1e-6);
    }

    #[test]
    fn overhead_sun_with_overhead_eye() {
        let uniforms = FrameUniforms::from_block(&lit_block());
        let color = shade_forward(
            &uniforms,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.5, 0.5, 0.5),
        );
        // ambient 0.05 + diffuse 0.5 + specular 0.5
        assert_relative_eq!(color.x, 1.05, epsilon = 1e-5);
    }

    #[test]
    fn fog_fades_to_fog_color() {
        let mut block = lit_block();
        block.set_bool("fogEnabled", true);
        block.set_vec3("fogColor", Vector3::new(0.0, 0.0, 1.0));
        block.set_float("fogStart", 1.0);
        block.set_float("fogEnd", 2.0);
        let uniforms = FrameUniforms::from_block(&block);
        let color = shade_forward(
            &uniforms,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert_relative_eq!(color.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(color.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn background_is_told_apart_by_alpha() {
        let uniforms = FrameUniforms::from_block(&lit_block());
        let texel = geometry_pass_texel(
            &uniforms,
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
        );
        // even a black surface keeps a non-zero alpha
        assert!(!texel.is_background());
        assert!(GBufferTexel::background().is_background());
        assert_eq!(shade_deferred(&uniforms, &GBufferTexel::background()), None);
        let clear = [0.2, 0.3, 0.3, 1.0];
        let resolved = resolve_deferred(&uniforms, &GBufferTexel::background(), clear);
        assert_eq!(resolved, Vector3::new(0.2, 0.3, 0.3));
    }

    #[test]
    fn display_modes_show_raw_channels() {
        let mut block = lit_block();
        block.set_int("displayMode", 4);
        let uniforms = FrameUniforms::from_block(&block);
        let texel = GBufferTexel {
            position: [1.0, 2.0, 3.0, 1.0],
            normal: [0.0, 0.0, 1.0, 1.0],
            albedo_spec: [0.25, 0.5, 0.75, 0.5],
        };
        assert_eq!(shade_deferred(&uniforms, &texel), Some(Vector3::new(0.5, 0.5, 0.5)));
    }
}
