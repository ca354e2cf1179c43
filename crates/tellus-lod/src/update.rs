//! Per-frame driver: the full unsubdivide-then-subdivide cycle for one
//! observer position.

use tracing::debug;

use tellus_math::Vec3I64;

use crate::scratchpad::SubdivScratchpad;
use crate::subdivide::subdivide_level_by_distance;
use crate::terrain::TerrainSkeleton;
use crate::unsubdivide::{
    unsubdivide_level_by_distance, unsubdivide_level_check_rules, unsubdivide_level_commit,
};

/// Run one full LOD update against the observer position.
///
/// First coarsens from the deepest level up to the root (a parent can only
/// unsubdivide once its children are leaves again), then refines from the
/// root down, reprocessing shallower levels whenever a Rule B cascade forces
/// one. The distance scratch is reset between the two sweeps because
/// subdivision recycles triangle ids freed by the coarsening.
///
/// # Panics
///
/// Panics if the scratchpad and terrain disagree on the level count.
pub fn update_terrain(pos: Vec3I64, trn: &mut TerrainSkeleton, sp: &mut SubdivScratchpad) {
    let level_max = sp.level_max();
    assert_eq!(
        level_max,
        trn.level_max(),
        "scratchpad and terrain were built for different level counts"
    );

    sp.reset_distance_checks(trn.skel.tri_capacity());
    for lvl in (0..level_max).rev() {
        unsubdivide_level_by_distance(lvl, pos, trn, sp);
        unsubdivide_level_check_rules(lvl, trn, sp);
        unsubdivide_level_commit(lvl, trn, sp);
    }

    sp.reset_distance_checks(trn.skel.tri_capacity());
    sp.seed_root_distance_checks(trn);
    sp.level_need_process = 0;
    for lvl in 0..level_max {
        subdivide_level_by_distance(pos, lvl, trn, sp);
    }

    debug!(
        triangles = trn.triangle_count(),
        distance_checks = sp.distance_check_count,
        "terrain update finished"
    );
}
