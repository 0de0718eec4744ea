//! Polyhedral die models.
//!
//! Every solid is described by its vertices and its face normals. A face is the
//! support polygon of a normal: all vertices lying on the plane furthest along
//! it. Faces are then paired with their most-opposite partner and numbered so
//! opposite faces sum to `N + 1`.

use std::collections::HashSet;

use glam::{Quat, Vec3};

use crate::api::types::DieKind;
use crate::error::EngineError;

/// Normals closer than this are treated as one face.
const COPLANAR_DOT: f32 = 0.998;
/// Plane distance tolerance when collecting a face's vertices.
const PLANE_EPSILON: f32 = 1e-4;
/// Hull points are deduplicated at this precision.
const HULL_PRECISION: f32 = 1e4;

/// One numbered face of a die.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieFace {
    pub value: u32,
    /// Face centroid in model space.
    pub center: Vec3,
    /// Outward unit normal in model space.
    pub normal: Vec3,
    /// Rotation that turns this face to point straight up.
    pub orientation: Quat,
}

/// Flat-shaded triangle mesh. Each face owns its own vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DieMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl DieMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaved `[px, py, pz, nx, ny, nz]` per index, as a triangle list.
    pub fn to_triangle_list(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.indices.len() * 6);
        for &i in &self.indices {
            out.extend_from_slice(&self.positions[i as usize]);
            out.extend_from_slice(&self.normals[i as usize]);
        }
        out
    }

    fn push_polygon(&mut self, polygon: &[Vec3], normal: Vec3) {
        let base = self.positions.len() as u32;
        for p in polygon {
            self.positions.push(p.to_array());
            self.normals.push(normal.to_array());
        }
        for i in 1..polygon.len().saturating_sub(1) as u32 {
            self.indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }
}

/// Mesh, collision hull and face table for one side count.
#[derive(Debug, Clone, PartialEq)]
pub struct DieModel {
    sides: u32,
    kind: Option<DieKind>,
    mesh: DieMesh,
    hull: Vec<Vec3>,
    faces: Vec<DieFace>,
}

impl DieModel {
    /// Build the model for a supported side count.
    pub fn build(sides: u32) -> Result<Self, EngineError> {
        let kind = DieKind::try_from(sides)?;
        let (vertices, normals) = solid(kind);
        let scale = kind.model_scale();
        let vertices: Vec<Vec3> = vertices.into_iter().map(|v| v * scale).collect();

        let polygons = support_polygons(&vertices, &normals);
        let mut mesh = DieMesh::default();
        for (normal, polygon) in &polygons {
            mesh.push_polygon(polygon, *normal);
        }
        let hull = dedup_points(mesh.positions.iter().map(|p| Vec3::from_array(*p)));

        let faces = assign_values(&polygons);
        if faces.len() != kind.face_count() {
            return Err(EngineError::Synthesis(format!(
                "d{} built {} faces, expected {}",
                sides,
                faces.len(),
                kind.face_count()
            )));
        }

        Ok(Self {
            sides,
            kind: Some(kind),
            mesh,
            hull,
            faces,
        })
    }

    /// Unit cube with no face table. Used for side counts the engine cannot build.
    pub fn fallback_cube(sides: u32) -> Self {
        let vertices = cube_vertices(0.5);
        let normals = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        let mut mesh = DieMesh::default();
        for (normal, polygon) in support_polygons(&vertices, &normals) {
            mesh.push_polygon(&polygon, normal);
        }
        Self {
            sides,
            kind: None,
            mesh,
            hull: vertices,
            faces: Vec::new(),
        }
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn kind(&self) -> Option<DieKind> {
        self.kind
    }

    pub fn mesh(&self) -> &DieMesh {
        &self.mesh
    }

    /// Convex hull point set for the collider.
    pub fn hull(&self) -> &[Vec3] {
        &self.hull
    }

    /// Faces ordered by value.
    pub fn faces(&self) -> &[DieFace] {
        &self.faces
    }

    pub fn face(&self, value: u32) -> Option<&DieFace> {
        self.faces.iter().find(|f| f.value == value)
    }

    /// The face pointing most nearly up under `rotation`.
    pub fn face_up(&self, rotation: Quat) -> Option<&DieFace> {
        self.faces
            .iter()
            .max_by(|a, b| (rotation * a.normal).y.total_cmp(&(rotation * b.normal).y))
    }

    /// Orientation showing `value` on top while keeping the heading of `current`.
    pub fn corrected_rotation(&self, value: u32, current: Quat) -> Option<Quat> {
        let face = self.face(value)?;
        Some((yaw_twist(current) * face.orientation).normalize())
    }
}

/// Twist component of `rotation` about world up.
pub fn yaw_twist(rotation: Quat) -> Quat {
    let len = (rotation.y * rotation.y + rotation.w * rotation.w).sqrt();
    if len < 1e-6 {
        return Quat::IDENTITY;
    }
    Quat::from_xyzw(0.0, rotation.y / len, 0.0, rotation.w / len)
}

// ---------------------------------------------------------------------------
// Solids
// ---------------------------------------------------------------------------

const PHI: f32 = 1.618_034;

fn solid(kind: DieKind) -> (Vec<Vec3>, Vec<Vec3>) {
    match kind {
        DieKind::D4 => {
            let vertices: Vec<Vec3> = [
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
            ]
            .iter()
            .map(|v| v.normalize())
            .collect();
            let normals = vertices.iter().map(|v| -*v).collect();
            (vertices, normals)
        }
        DieKind::D6 => (
            cube_vertices(0.5),
            vec![Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z],
        ),
        DieKind::D8 => (
            vec![Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z],
            cube_vertices(1.0).into_iter().map(|v| v.normalize()).collect(),
        ),
        DieKind::D12 => (
            dodecahedron_points().into_iter().map(|v| v.normalize()).collect(),
            icosahedron_points().into_iter().map(|v| v.normalize()).collect(),
        ),
        DieKind::D20 => (
            icosahedron_points().into_iter().map(|v| v.normalize()).collect(),
            dodecahedron_points().into_iter().map(|v| v.normalize()).collect(),
        ),
        DieKind::D10 | DieKind::D100 => trapezohedron(1.0, 1.0),
    }
}

fn cube_vertices(half: f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(8);
    for x in [-half, half] {
        for y in [-half, half] {
            for z in [-half, half] {
                out.push(Vec3::new(x, y, z));
            }
        }
    }
    out
}

/// Oriented so its vertices are the face directions of `dodecahedron_points`.
fn icosahedron_points() -> Vec<Vec3> {
    let mut out = Vec::with_capacity(12);
    for a in [-1.0, 1.0] {
        for b in [-PHI, PHI] {
            out.push(Vec3::new(0.0, b, a));
            out.push(Vec3::new(b, a, 0.0));
            out.push(Vec3::new(a, 0.0, b));
        }
    }
    out
}

fn dodecahedron_points() -> Vec<Vec3> {
    let inv = 1.0 / PHI;
    let mut out = cube_vertices(1.0);
    for a in [-inv, inv] {
        for b in [-PHI, PHI] {
            out.push(Vec3::new(0.0, a, b));
            out.push(Vec3::new(a, b, 0.0));
            out.push(Vec3::new(b, 0.0, a));
        }
    }
    out
}

/// Pentagonal trapezohedron with apexes on the y axis.
///
/// The ring height is chosen so each kite is planar:
/// `apex = ring_y * (1 + cos 36°) / (1 - cos 36°)`.
fn trapezohedron(radius: f32, apex: f32) -> (Vec<Vec3>, Vec<Vec3>) {
    let c = 36f32.to_radians().cos();
    let ring_y = apex * (1.0 - c) / (1.0 + c);
    let step = std::f32::consts::TAU / 5.0;
    let upper: Vec<Vec3> = (0..5)
        .map(|k| {
            let t = k as f32 * step;
            Vec3::new(radius * t.cos(), ring_y, radius * t.sin())
        })
        .collect();
    let lower: Vec<Vec3> = (0..5)
        .map(|k| {
            let t = k as f32 * step + step / 2.0;
            Vec3::new(radius * t.cos(), -ring_y, radius * t.sin())
        })
        .collect();
    let top = Vec3::new(0.0, apex, 0.0);
    let bottom = Vec3::new(0.0, -apex, 0.0);

    let mut normals = Vec::with_capacity(10);
    for k in 0..5 {
        normals.push(outward_normal(top, upper[k], upper[(k + 1) % 5]));
        normals.push(outward_normal(bottom, lower[k], lower[(k + 1) % 5]));
    }

    let mut vertices = vec![top, bottom];
    vertices.extend(upper);
    vertices.extend(lower);
    (vertices, normals)
}

fn outward_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let n = (b - a).cross(c - a).normalize();
    if n.dot(a + b + c) < 0.0 {
        -n
    } else {
        n
    }
}

// ---------------------------------------------------------------------------
// Faces
// ---------------------------------------------------------------------------

/// Support polygon for every distinct normal, wound counter-clockwise seen from outside.
fn support_polygons(vertices: &[Vec3], normals: &[Vec3]) -> Vec<(Vec3, Vec<Vec3>)> {
    let mut distinct: Vec<Vec3> = Vec::with_capacity(normals.len());
    for n in normals {
        let n = n.normalize();
        if !distinct.iter().any(|d| d.dot(n) > COPLANAR_DOT) {
            distinct.push(n);
        }
    }

    distinct
        .into_iter()
        .filter_map(|normal| {
            let reach = vertices
                .iter()
                .map(|v| v.dot(normal))
                .fold(f32::NEG_INFINITY, f32::max);
            let mut polygon: Vec<Vec3> = vertices
                .iter()
                .copied()
                .filter(|v| v.dot(normal) >= reach - PLANE_EPSILON)
                .collect();
            if polygon.len() < 3 {
                return None;
            }
            let center = centroid(&polygon);
            let u = (polygon[0] - center).normalize();
            let w = normal.cross(u);
            polygon.sort_by(|a, b| {
                let angle = |p: &Vec3| {
                    let d = *p - center;
                    d.dot(w).atan2(d.dot(u))
                };
                angle(a).total_cmp(&angle(b))
            });
            Some((normal, polygon))
        })
        .collect()
}

fn centroid(points: &[Vec3]) -> Vec3 {
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Pair each face with its most-opposite partner and number the pairs from the top down.
fn assign_values(polygons: &[(Vec3, Vec<Vec3>)]) -> Vec<DieFace> {
    let total = polygons.len() as u32;
    let normals: Vec<Vec3> = polygons.iter().map(|(n, _)| *n).collect();
    let mut used = vec![false; normals.len()];
    let mut pairs: Vec<(usize, Option<usize>)> = Vec::new();

    for i in 0..normals.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut best: Option<usize> = None;
        let mut best_dot = 1.0;
        for j in 0..normals.len() {
            if used[j] {
                continue;
            }
            let dot = normals[i].dot(normals[j]);
            if dot < best_dot {
                best_dot = dot;
                best = Some(j);
            }
        }
        if let Some(j) = best {
            used[j] = true;
        }
        pairs.push((i, best));
    }

    pairs.sort_by(|(a, _), (b, _)| {
        let (a, b) = (normals[*a], normals[*b]);
        b.y.total_cmp(&a.y)
            .then(b.z.total_cmp(&a.z))
            .then(b.x.total_cmp(&a.x))
    });

    let face = |index: usize, value: u32| {
        let normal = normals[index];
        DieFace {
            value,
            center: centroid(&polygons[index].1),
            normal,
            orientation: Quat::from_rotation_arc(normal, Vec3::Y),
        }
    };

    let mut faces = Vec::with_capacity(polygons.len());
    for (idx, (a, b)) in pairs.into_iter().enumerate() {
        let low = idx as u32 + 1;
        let high = total - idx as u32;
        match b {
            None => faces.push(face(a, low)),
            Some(b) => {
                let (upper, lower) = if normals[a].y >= normals[b].y { (a, b) } else { (b, a) };
                faces.push(face(upper, low));
                faces.push(face(lower, high));
            }
        }
    }
    faces.sort_by_key(|f| f.value);
    faces
}

fn dedup_points(points: impl Iterator<Item = Vec3>) -> Vec<Vec3> {
    let mut seen = HashSet::new();
    points
        .filter(|p| {
            let key = (
                (p.x * HULL_PRECISION).round() as i32,
                (p.y * HULL_PRECISION).round() as i32,
                (p.z * HULL_PRECISION).round() as i32,
            );
            seen.insert(key)
        })
        .collect()
}
