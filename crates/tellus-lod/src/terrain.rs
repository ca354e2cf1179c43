//! Terrain skeleton container: topology plus per-level index bitsets,
//! vertex geometry arrays, and distance-test centers.

use bitvec::vec::BitVec;
use glam::Vec3;

use tellus_icosphere::{
    GroupId, PoolIndex, TriangleId, TriangleSkeleton, create_icosahedron,
    tower_over_horizon_table,
};
use tellus_math::{Vec3I64, fixed_scale};

/// Per-level acceleration index over triangle ids.
///
/// Both bitsets are derived state and must stay true to the mesh after every
/// edit (checked by [`crate::debug_check_rules`]):
/// - `has_subdivided_neighbor` marks a **leaf** with at least one subdivided
///   neighbor;
/// - `has_leaf_neighbor` marks a **subdivided** triangle with at least one
///   leaf neighbor, which is the seed set for the unsubdivision floodfill.
#[derive(Debug, Clone, Default)]
pub struct Level {
    pub has_subdivided_neighbor: BitVec,
    pub has_leaf_neighbor: BitVec,
}

/// The whole terrain skeleton of one planet: topology, per-level indices,
/// vertex geometry, and per-triangle distance-test centers.
///
/// All arrays are indexed by raw vertex/triangle id; capacity grows with the
/// skeleton's id pools and never shrinks.
#[derive(Debug)]
pub struct TerrainSkeleton {
    pub skel: TriangleSkeleton,
    pub levels: Vec<Level>,
    /// The five seed groups of the icosahedron.
    pub root_groups: Vec<GroupId>,
    /// Conservative distance-test center per triangle id.
    pub sktri_center: Vec<Vec3I64>,
    /// Fixed-point position per vertex id (world units × 2^scale).
    pub positions: Vec<Vec3I64>,
    /// Unit outward normal per vertex id.
    pub normals: Vec<Vec3>,
    /// Fixed-point scale exponent for all positions and thresholds.
    pub scale: u8,
    /// Planet radius in world units.
    pub radius: f64,
    /// Maximum terrain height above the sphere, in world units.
    pub height_max: f32,
    /// Per-depth bound on sphere bulge above a triangle's corner plane.
    pub tower_over_horizon: Vec<f32>,
}

impl TerrainSkeleton {
    /// Seed a terrain skeleton with the 20-triangle icosahedron and
    /// `level_max` subdivision levels.
    #[must_use]
    pub fn new_icosphere(scale: u8, radius: f64, height_max: f32, level_max: u8) -> Self {
        assert!(level_max >= 1, "at least one subdivision level is required");
        let seed = create_icosahedron(scale, radius);
        let mut trn = Self {
            sktri_center: vec![Vec3I64::ZERO; seed.skeleton.tri_capacity()],
            levels: vec![Level::default(); level_max as usize],
            root_groups: seed.root_groups.to_vec(),
            positions: seed.positions,
            normals: seed.normals,
            skel: seed.skeleton,
            scale,
            radius,
            height_max,
            tower_over_horizon: tower_over_horizon_table(level_max),
        };
        for group in trn.root_groups.clone() {
            calc_sphere_tri_center(group, &mut trn);
        }
        trn
    }

    /// Number of subdivision levels (triangles of depth `level_max` exist but
    /// are never subdivided further).
    #[must_use]
    pub fn level_max(&self) -> u8 {
        self.levels.len() as u8
    }

    /// Number of triangles currently in the mesh.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.skel.group_ids().count() * 4
    }

    /// Grow the id-indexed arrays to the skeleton's current capacities.
    /// Called after every subdivision; existing entries are preserved.
    pub fn resize_storage(&mut self) {
        let tri_capacity = self.skel.tri_capacity();
        if self.sktri_center.len() < tri_capacity {
            self.sktri_center.resize(tri_capacity, Vec3I64::ZERO);
        }
        let vrtx_capacity = self.skel.vrtx_capacity();
        if self.positions.len() < vrtx_capacity {
            self.positions.resize(vrtx_capacity, Vec3I64::ZERO);
        }
        if self.normals.len() < vrtx_capacity {
            self.normals.resize(vrtx_capacity, Vec3::ZERO);
        }
    }
}

/// Recompute the distance-test centers of a group's four triangles.
///
/// Each center is the average of the corner positions (each divided by 3
/// before summing, so the fixed-point sum cannot overflow), lifted along the
/// averaged corner normal by half the worst-case surface height over the
/// corner plane. The lift biases distance culling toward the highest point a
/// subdivided patch can reach, keeping it conservative.
pub fn calc_sphere_tri_center(group_id: GroupId, trn: &mut TerrainSkeleton) {
    let group = trn.skel.tri_group_at(group_id);
    let depth = group.depth as usize;
    assert!(
        depth < trn.tower_over_horizon.len(),
        "group at depth {depth} exceeds the tower-over-horizon table"
    );
    let corner_sets: [[_; 3]; 4] = std::array::from_fn(|i| group.triangles[i].corners);

    let max_height = trn.height_max + trn.radius as f32 * trn.tower_over_horizon[depth];
    let lift = 0.5 * f64::from(max_height) * fixed_scale(trn.scale) as f64 / 3.0;

    for (sibling, corners) in corner_sets.into_iter().enumerate() {
        let [va, vb, vc] = corners.map(PoolIndex::index);
        let pos_avg =
            trn.positions[va] / 3 + trn.positions[vb] / 3 + trn.positions[vc] / 3;
        let nrm_sum = trn.normals[va] + trn.normals[vb] + trn.normals[vc];

        let rise = Vec3I64::from_f64((nrm_sum.as_dvec3() * lift).to_array());
        let id = TriangleId::new(group_id, sibling as u8);
        trn.sktri_center[id.index()] = pos_avg + rise;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_icosphere::ICO_ROOT_GROUP_COUNT;

    #[test]
    fn test_icosphere_seed_shape() {
        let trn = TerrainSkeleton::new_icosphere(10, 100.0, 0.0, 4);
        assert_eq!(trn.root_groups.len(), ICO_ROOT_GROUP_COUNT);
        assert_eq!(trn.triangle_count(), 20);
        assert_eq!(trn.level_max(), 4);
        assert_eq!(trn.levels.len(), 4);
        assert_eq!(trn.tower_over_horizon.len(), 5);
    }

    #[test]
    fn test_root_centers_sit_inside_the_sphere_but_outside_the_corner_plane() {
        let scale = 10;
        let radius = 100.0;
        let trn = TerrainSkeleton::new_icosphere(scale, radius, 0.0, 2);
        let fixed_radius = radius * fixed_scale(scale) as f64;
        // An icosahedron face's centroid sits at ~0.79 R; the lift adds about
        // half the depth-0 bulge, so centers land between those and R.
        for group in &trn.root_groups {
            for sibling in 0..4u8 {
                let id = TriangleId::new(*group, sibling);
                let len = trn.sktri_center[id.index()].magnitude_f64();
                assert!(
                    len > 0.80 * fixed_radius && len < fixed_radius,
                    "center at {} of R",
                    len / fixed_radius
                );
            }
        }
    }

    #[test]
    fn test_resize_storage_preserves_entries() {
        let mut trn = TerrainSkeleton::new_icosphere(10, 100.0, 0.0, 2);
        let first = trn.sktri_center[0];
        trn.resize_storage();
        assert_eq!(trn.sktri_center[0], first);
        assert!(trn.sktri_center.len() >= trn.skel.tri_capacity());
        assert!(trn.positions.len() >= trn.skel.vrtx_capacity());
    }
}
