//! Procedural meshes.

use std::f32::consts::PI;

use crate::scene_pkg::mesh::Mesh;

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Unit cube centred on the origin: 24 vertices so every face keeps its own
/// normal.
pub fn cube() -> Mesh {
    cube_sized(1.0)
}

pub fn cube_sized(size: f32) -> Mesh {
    let s = size / 2.0;
    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[-s, -s, s], [s, -s, s], [s, s, s], [-s, s, s]]),
        ([0.0, 0.0, -1.0], [[-s, -s, -s], [-s, s, -s], [s, s, -s], [s, -s, -s]]),
        ([-1.0, 0.0, 0.0], [[-s, -s, -s], [-s, -s, s], [-s, s, s], [-s, s, -s]]),
        ([1.0, 0.0, 0.0], [[s, -s, -s], [s, s, -s], [s, s, s], [s, -s, s]]),
        ([0.0, 1.0, 0.0], [[-s, s, -s], [-s, s, s], [s, s, s], [s, s, -s]]),
        ([0.0, -1.0, 0.0], [[-s, -s, -s], [s, -s, -s], [s, -s, s], [-s, -s, s]]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut mesh = Mesh::new();
    for (normal, corners) in faces {
        let first = mesh.vertex_count() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            mesh.push_vertex(*corner, WHITE, normal, uv);
        }
        mesh.push_triangle(first, first + 1, first + 2);
        mesh.push_triangle(first, first + 2, first + 3);
    }
    mesh
}

/// UV sphere with `resolution` sectors and `resolution / 2` stacks.
pub fn sphere(radius: f32, resolution: u32) -> Mesh {
    let sectors = resolution.max(3);
    let stacks = (resolution / 2).max(2);
    let sector_step = 2.0 * PI / sectors as f32;
    let stack_step = PI / stacks as f32;
    let inverse_radius = if radius != 0.0 { 1.0 / radius } else { 0.0 };

    let mut mesh = Mesh::new();
    for i in 0..=stacks {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let xz = radius * stack_angle.cos();
        let y = radius * stack_angle.sin();
        for j in 0..=sectors {
            let sector_angle = j as f32 * sector_step;
            let x = xz * sector_angle.cos();
            let z = xz * sector_angle.sin();
            mesh.push_vertex(
                [x, y, z],
                WHITE,
                [x * inverse_radius, y * inverse_radius, z * inverse_radius],
                [j as f32 / sectors as f32, i as f32 / stacks as f32],
            );
        }
    }

    for i in 0..stacks {
        let mut k1 = i * (sectors + 1);
        let mut k2 = k1 + sectors + 1;
        for _ in 0..sectors {
            if i != 0 {
                mesh.push_triangle(k1, k2, k1 + 1);
            }
            if i != stacks - 1 {
                mesh.push_triangle(k1 + 1, k2, k2 + 1);
            }
            k1 += 1;
            k2 += 1;
        }
    }
    mesh
}

/// Regular tetrahedron with one primary color per corner. Normals are left
/// at zero; it is meant for unlit programs.
pub fn tetrahedron() -> Mesh {
    let corners = [
        ([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]),
        ([-1.0, -1.0, 1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 1.0, -1.0], [0.0, 0.0, 1.0]),
        ([1.0, -1.0, -1.0], [1.0, 1.0, 0.0]),
    ];
    let mut mesh = Mesh::new();
    for (position, color) in corners {
        mesh.push_vertex(position, color, [0.0, 0.0, 0.0], [0.0, 0.0]);
    }
    for [a, b, c] in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
        mesh.push_triangle(a, b, c);
    }
    mesh
}
