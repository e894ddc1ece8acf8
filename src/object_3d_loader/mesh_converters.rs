use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scene_pkg::mesh::Mesh;

/// Color given to every vertex of a loaded model.
pub const DEFAULT_VERTEX_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Wavefront OBJ reader for `v`, `vt`, `vn` and `f` records. Other records
/// are skipped.
pub struct ObjFileToMeshConverter {
    path: PathBuf,
}

impl ObjFileToMeshConverter {
    pub fn new(path: impl Into<PathBuf>) -> ObjFileToMeshConverter {
        ObjFileToMeshConverter { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create_mesh(&self) -> Result<Mesh, LoadError> {
        let file = File::open(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mesh = parse_obj(BufReader::new(file)).map_err(|e| match e {
            LoadError::Io { source, .. } => LoadError::Io {
                path: self.path.clone(),
                source,
            },
            other => other,
        })?;
        log::info!(
            "loaded {} with {} vertices and {} indices",
            self.path.display(),
            mesh.vertex_count(),
            mesh.indices.len()
        );
        Ok(mesh)
    }
}

/// Face corner as zero-based (position, texcoord, normal) indices; `None`
/// where the corner leaves the field out.
type Corner = (Option<usize>, Option<usize>, Option<usize>);

#[derive(Default)]
struct ObjData {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

/// Parses OBJ text into a mesh. Polygons are fan-triangulated and repeated
/// corners share a vertex.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<Mesh, LoadError> {
    let mut data = ObjData::default();
    let mut mesh = Mesh::new();
    let mut corners: HashMap<Corner, u32> = HashMap::new();

    for (number, line) in reader.lines().enumerate() {
        let line_number = number + 1;
        let line = line.map_err(|source| LoadError::Io {
            path: PathBuf::new(),
            source,
        })?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => data.positions.push(parse_floats(parts, line_number)?),
            Some("vt") => data.uvs.push(parse_floats(parts, line_number)?),
            Some("vn") => data.normals.push(parse_floats(parts, line_number)?),
            Some("f") => {
                let face = parts
                    .map(|token| parse_corner(token, &data, line_number))
                    .collect::<Result<Vec<_>, _>>()?;
                if face.len() < 3 {
                    log::warn!("line {}: face with {} corners skipped", line_number, face.len());
                    continue;
                }
                for i in 1..face.len() - 1 {
                    for corner in [face[0], face[i], face[i + 1]] {
                        let index = *corners
                            .entry(corner)
                            .or_insert_with(|| push_corner(&mut mesh, &data, corner));
                        mesh.indices.push(index);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(mesh)
}

fn parse_floats<'a, I, const N: usize>(parts: I, line: usize) -> Result<[f32; N], LoadError>
where
    I: Iterator<Item = &'a str>,
{
    let mut values = [0.0f32; N];
    for (slot, token) in values.iter_mut().zip(parts) {
        *slot = token.parse::<f32>().map_err(|e| LoadError::Parse {
            line,
            message: format!("bad number '{}': {}", token, e),
        })?;
    }
    Ok(values)
}

/// Resolves a one-based (or negative, end-relative) OBJ index.
fn resolve_index(token: &str, len: usize, line: usize) -> Result<Option<usize>, LoadError> {
    if token.is_empty() {
        return Ok(None);
    }
    let value = token.parse::<i64>().map_err(|e| LoadError::Parse {
        line,
        message: format!("bad index '{}': {}", token, e),
    })?;
    let resolved = if value > 0 {
        Some(value as usize - 1)
    } else if value < 0 {
        (len as i64 + value).try_into().ok()
    } else {
        None
    };
    Ok(resolved)
}

fn parse_corner(token: &str, data: &ObjData, line: usize) -> Result<Corner, LoadError> {
    let mut fields = token.split('/');
    let position = resolve_index(fields.next().unwrap_or(""), data.positions.len(), line)?;
    let uv = resolve_index(fields.next().unwrap_or(""), data.uvs.len(), line)?;
    let normal = resolve_index(fields.next().unwrap_or(""), data.normals.len(), line)?;
    Ok((position, uv, normal))
}

fn push_corner(mesh: &mut Mesh, data: &ObjData, corner: Corner) -> u32 {
    let (position, uv, normal) = corner;
    let position = position
        .and_then(|i| data.positions.get(i).copied())
        .unwrap_or_default();
    let uv = uv.and_then(|i| data.uvs.get(i).copied()).unwrap_or_default();
    let normal = normal
        .and_then(|i| data.normals.get(i).copied())
        .unwrap_or_default();
    mesh.push_vertex(position, DEFAULT_VERTEX_COLOR, normal, uv)
}
