//! Distance oracle used by the LOD subdivision passes.

use crate::Vec3I64;

/// Returns true when `pos` is within `threshold` of `target`, inclusive.
///
/// The threshold is a plain fixed-point distance (same scale as the
/// positions). A per-axis Chebyshev test rejects far points before the exact
/// squared comparison; the exact test is widened to u128 so it cannot
/// overflow for any i64 inputs.
///
/// The comparison is inclusive at the boundary: a point exactly `threshold`
/// away counts as near. Subdivide/unsubdivide threshold pairs rely on this
/// for hysteresis: an observer sitting exactly on the unsubdivide threshold
/// keeps the triangle subdivided.
#[must_use]
pub fn is_distance_near(pos: Vec3I64, target: Vec3I64, threshold: u64) -> bool {
    let dx = pos.x.abs_diff(target.x);
    let dy = pos.y.abs_diff(target.y);
    let dz = pos.z.abs_diff(target.z);

    if dx > threshold || dy > threshold || dz > threshold {
        return false;
    }

    let sq = (dx as u128) * (dx as u128) + (dy as u128) * (dy as u128) + (dz as u128) * (dz as u128);
    sq <= (threshold as u128) * (threshold as u128)
}
