//! Mesh asset loading.
//!
//! Target meshes are loaded from Wavefront OBJ content and kept as plain
//! positions plus polygon faces. Faces are not triangulated so that face
//! samples match the polygons an artist selected.

use std::collections::HashMap;

use glam::DVec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    /// Compute the bounding box of a set of points. Empty input yields a
    /// degenerate box at the origin.
    pub fn from_points(points: &[DVec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }

        Self { min, max }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

/// Polygon mesh geometry attached to a scene node.
#[derive(Debug, Clone, Default)]
pub struct MeshAsset {
    /// Identifier, usually the file stem.
    pub id: String,
    /// Vertex positions in object space.
    pub positions: Vec<DVec3>,
    /// Polygon faces as vertex index lists.
    pub faces: Vec<Vec<usize>>,
    pub bounds: BoundingBox,
}

impl MeshAsset {
    pub fn new(id: impl Into<String>, positions: Vec<DVec3>, faces: Vec<Vec<usize>>) -> Self {
        let bounds = BoundingBox::from_points(&positions);
        Self {
            id: id.into(),
            positions,
            faces,
            bounds,
        }
    }

    /// Parse a mesh from OBJ content.
    ///
    /// All models in the file are merged into one mesh. `positions` follow
    /// the `v` lines of the file, so vertex `i` is the `i + 1`-th `v` line.
    /// Normals and texture coordinates never split a vertex.
    pub fn from_obj(id: impl Into<String>, obj_content: &str) -> Result<Self, String> {
        let mut cursor = std::io::Cursor::new(obj_content.as_bytes());

        let load_options = tobj::LoadOptions {
            triangulate: false,
            single_index: false,
            ..Default::default()
        };

        let (models, _materials) =
            tobj::load_obj_buf(&mut cursor, &load_options, |_| Ok((vec![], HashMap::new())))
                .map_err(|e| format!("Failed to parse OBJ: {}", e))?;

        let file_positions = scan_positions(obj_content)?;
        if file_positions.is_empty() {
            return Err("OBJ file contains no vertices".to_string());
        }

        // tobj compacts each model's positions by first reference. Equal
        // coordinates are interchangeable, so map back by bit pattern.
        let mut by_bits: HashMap<[u32; 3], usize> = HashMap::new();
        for (i, p) in file_positions.iter().enumerate() {
            by_bits.entry(p.map(f32::to_bits)).or_insert(i);
        }

        let mut faces = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let remap = mesh
                .positions
                .chunks_exact(3)
                .map(|p| {
                    by_bits
                        .get(&[p[0].to_bits(), p[1].to_bits(), p[2].to_bits()])
                        .copied()
                        .ok_or_else(|| {
                            format!("OBJ model '{}' references an unknown vertex", model.name)
                        })
                })
                .collect::<Result<Vec<usize>, String>>()?;

            let face = |indices: &[u32]| -> Result<Vec<usize>, String> {
                indices
                    .iter()
                    .map(|&i| {
                        remap.get(i as usize).copied().ok_or_else(|| {
                            format!("OBJ model '{}' has an out of range face index", model.name)
                        })
                    })
                    .collect()
            };

            // Without face_arities every face is a triangle.
            if mesh.face_arities.is_empty() {
                for tri in mesh.indices.chunks_exact(3) {
                    faces.push(face(tri)?);
                }
            } else {
                let mut start = 0usize;
                for &arity in &mesh.face_arities {
                    let end = start + arity as usize;
                    if end > mesh.indices.len() {
                        return Err(format!(
                            "OBJ model '{}' has truncated face index data",
                            model.name
                        ));
                    }
                    faces.push(face(&mesh.indices[start..end])?);
                    start = end;
                }
            }
        }

        let positions = file_positions
            .iter()
            .map(|p| DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect();

        Ok(Self::new(id, positions, faces))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Centroid of a face, or `None` if the face does not exist or references
    /// missing vertices.
    pub fn face_centroid(&self, face: usize) -> Option<DVec3> {
        let indices = self.faces.get(face)?;
        if indices.is_empty() {
            return None;
        }

        let mut sum = DVec3::ZERO;
        for &i in indices {
            sum += *self.positions.get(i)?;
        }
        Some(sum / indices.len() as f64)
    }

    /// Centroids of all faces, in face order. Broken faces are skipped.
    pub fn face_centroids(&self) -> Vec<DVec3> {
        (0..self.faces.len())
            .filter_map(|i| self.face_centroid(i))
            .collect()
    }
}

/// Positions of the `v` lines in file order, parsed the way tobj parses them
/// (a lone fourth value is a `w` divisor, three more are a vertex color).
fn scan_positions(obj_content: &str) -> Result<Vec<[f32; 3]>, String> {
    let mut positions = Vec::new();
    for (line_no, line) in obj_content.lines().enumerate() {
        let mut words = line.split_whitespace();
        if words.next() != Some("v") {
            continue;
        }

        let values = words
            .map(str::parse::<f32>)
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|e| format!("Bad vertex on line {}: {}", line_no + 1, e))?;
        let mut p = match values.as_slice() {
            [x, y, z, ..] => [*x, *y, *z],
            _ => return Err(format!("Bad vertex on line {}", line_no + 1)),
        };
        if let [_, _, _, w] = values.as_slice() {
            if *w != 0.0 {
                p = p.map(|c| c / w);
            }
        }
        positions.push(p);
    }
    Ok(positions)
}
