//! Seed icosahedron: 12 vertices and 20 root triangles with full neighbor
//! topology, plus the per-depth tower-over-horizon table used to bias
//! triangle centers toward the worst-case surface height.

use glam::DVec3;
use rustc_hash::FxHashMap;

use tellus_math::{Vec3I64, fixed_scale};

use crate::ids::{GroupId, TriangleId, VertexId};
use crate::pool::PoolIndex;
use crate::skeleton::TriangleSkeleton;

/// Number of seed vertices.
pub const ICO_VERTEX_COUNT: usize = 12;
/// Number of seed faces.
pub const ICO_FACE_COUNT: usize = 20;
/// Seed faces are packed four to a group.
pub const ICO_ROOT_GROUP_COUNT: usize = 5;

const PHI: f64 = 1.618_033_988_749_895;

/// Icosahedron vertices before normalization, in the three golden rectangles.
const VERTICES: [[f64; 3]; ICO_VERTEX_COUNT] = [
    [-1.0, PHI, 0.0],
    [1.0, PHI, 0.0],
    [-1.0, -PHI, 0.0],
    [1.0, -PHI, 0.0],
    [0.0, -1.0, PHI],
    [0.0, 1.0, PHI],
    [0.0, -1.0, -PHI],
    [0.0, 1.0, -PHI],
    [PHI, 0.0, -1.0],
    [PHI, 0.0, 1.0],
    [-PHI, 0.0, -1.0],
    [-PHI, 0.0, 1.0],
];

/// Faces with counter-clockwise winding seen from outside.
const FACES: [[usize; 3]; ICO_FACE_COUNT] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// A freshly seeded skeleton with its root groups and vertex geometry.
pub struct IcosahedronSeed {
    pub skeleton: TriangleSkeleton,
    pub root_groups: [GroupId; ICO_ROOT_GROUP_COUNT],
    /// Fixed-point position per vertex id (world units × 2^scale).
    pub positions: Vec<Vec3I64>,
    /// Unit outward normal per vertex id.
    pub normals: Vec<glam::Vec3>,
}

/// Build the 20-triangle seed mesh on a sphere of `radius` world units.
///
/// Faces are packed into five depth-0 groups in face-list order; neighbor
/// links are derived by matching shared edges, so every root triangle ends up
/// with exactly three symmetric neighbors.
#[must_use]
pub fn create_icosahedron(scale: u8, radius: f64) -> IcosahedronSeed {
    let mut skeleton = TriangleSkeleton::new();

    let vrtx: [VertexId; ICO_VERTEX_COUNT] =
        std::array::from_fn(|_| skeleton.vrtx_create_root());

    let mut positions = vec![Vec3I64::ZERO; ICO_VERTEX_COUNT];
    let mut normals = vec![glam::Vec3::ZERO; ICO_VERTEX_COUNT];
    let to_fixed = radius * fixed_scale(scale) as f64;
    for (i, raw) in VERTICES.iter().enumerate() {
        let dir = DVec3::from_array(*raw).normalize();
        positions[vrtx[i].index()] = Vec3I64::from_f64((dir * to_fixed).to_array());
        normals[vrtx[i].index()] = dir.as_vec3();
    }

    let root_groups: [GroupId; ICO_ROOT_GROUP_COUNT] = std::array::from_fn(|g| {
        let corners: [[VertexId; 3]; 4] =
            std::array::from_fn(|i| FACES[g * 4 + i].map(|v| vrtx[v]));
        skeleton.tri_group_create_root(corners)
    });

    // Each undirected vertex pair is shared by exactly two faces; link them.
    let mut edge_faces: FxHashMap<(usize, usize), Vec<(usize, usize)>> = FxHashMap::default();
    for (face, corners) in FACES.iter().enumerate() {
        for edge in 0..3 {
            let a = corners[edge];
            let b = corners[(edge + 1) % 3];
            let key = (a.min(b), a.max(b));
            edge_faces.entry(key).or_default().push((face, edge));
        }
    }
    for (key, faces) in &edge_faces {
        assert!(
            faces.len() == 2,
            "icosahedron edge {key:?} shared by {} faces",
            faces.len()
        );
        let (fa, ea) = faces[0];
        let (fb, eb) = faces[1];
        let ta = TriangleId::new(root_groups[fa / 4], (fa % 4) as u8);
        let tb = TriangleId::new(root_groups[fb / 4], (fb % 4) as u8);
        skeleton.set_neighbor(ta, ea, tb);
        skeleton.set_neighbor(tb, eb, ta);
    }

    IcosahedronSeed {
        skeleton,
        root_groups,
        positions,
        normals,
    }
}

/// Per-depth bound on how far the sphere bulges above the plane of a
/// triangle's corners, as a fraction of the radius.
///
/// Depth 0 uses the face-centroid-to-corner angle of the icosahedron; each
/// subdivision halves the subtended angle, so the bulge of a spherical cap of
/// that angular radius bounds the patch.
#[must_use]
pub fn tower_over_horizon_table(level_max: u8) -> Vec<f32> {
    assert!(level_max < 32, "no usable subdivision goes {level_max} levels deep");
    let face = FACES[0];
    let corner = DVec3::from_array(VERTICES[face[0]]).normalize();
    let centroid = (DVec3::from_array(VERTICES[face[0]])
        + DVec3::from_array(VERTICES[face[1]])
        + DVec3::from_array(VERTICES[face[2]]))
    .normalize();
    let beta0 = corner.dot(centroid).clamp(-1.0, 1.0).acos();

    (0..=level_max)
        .map(|depth| (1.0 - (beta0 / f64::from(1u32 << depth)).cos()) as f32)
        .collect()
}
