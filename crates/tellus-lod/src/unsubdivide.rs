//! Unsubdivision: three phases per level: distance floodfill candidate
//! selection, recursive rule vetoes, and the commit.

use tracing::trace;

use tellus_icosphere::{TriangleId, bit_clear, bit_set, bit_test, edge_children};
use tellus_math::{Vec3I64, is_distance_near};

use crate::scratchpad::SubdivScratchpad;
use crate::terrain::TerrainSkeleton;

/// Enqueue a triangle for the unsubdivision distance test if it qualifies:
/// subdivided, all four children leaves, and not yet enqueued this pass.
fn admit_candidate(trn: &TerrainSkeleton, sp: &mut SubdivScratchpad, l: usize, id: TriangleId) {
    if bit_test(&sp.distance_test_done, id.index()) {
        return;
    }
    let Some(children) = trn.skel.tri_at(id).children else {
        return;
    };
    let group = trn.skel.tri_group_at(children);
    if group.triangles.iter().any(|t| t.is_subdivided()) {
        return;
    }
    sp.levels[l].distance_test_next.push(id);
    bit_set(&mut sp.distance_test_done, id.index());
}

/// Phase one: floodfill the too-far region and collect candidates.
///
/// Seeds are the level's subdivided triangles that border a leaf, read
/// straight off `has_leaf_neighbor`. Every candidate found farther than the
/// unsubdivide threshold (the coarser one of the pair, for hysteresis) is marked
/// in `try_unsubdivide`, and its neighbors are enqueued in turn so a
/// connected far region is considered as a whole.
pub fn unsubdivide_level_by_distance(
    lvl: u8,
    pos: Vec3I64,
    trn: &TerrainSkeleton,
    sp: &mut SubdivScratchpad,
) {
    let l = lvl as usize;

    for index in trn.levels[l].has_leaf_neighbor.iter_ones() {
        admit_candidate(trn, sp, l, TriangleId::from_index(index));
    }

    let mut processing = std::mem::take(&mut sp.levels[l].distance_test_processing);
    while !sp.levels[l].distance_test_next.is_empty() {
        std::mem::swap(&mut processing, &mut sp.levels[l].distance_test_next);

        for &sktri_id in &processing {
            debug_assert!(
                trn.skel.is_subdivided(sktri_id),
                "leaves are never distance-tested for unsubdivision"
            );
            let center = trn.sktri_center[sktri_id.index()];
            sp.distance_check_count += 1;

            if !is_distance_near(pos, center, sp.distance_threshold_unsubdiv[l]) {
                bit_set(&mut sp.try_unsubdivide, sktri_id.index());

                let neighbors = trn.skel.tri_at(sktri_id).neighbors;
                for neighbor in neighbors.into_iter().flatten() {
                    admit_candidate(trn, sp, l, neighbor);
                }
            }
        }
        processing.clear();
    }
    sp.levels[l].distance_test_processing = processing;
}

/// Would removing `sktri_id`'s children break a neighbor rule, treating every
/// un-vetoed candidate as already unsubdivided?
fn violates_rules(trn: &TerrainSkeleton, sp: &SubdivScratchpad, sktri_id: TriangleId) -> bool {
    let tri = trn.skel.tri_at(sktri_id);
    let mut subdivided_neighbors = 0;

    for neighbor_id in tri.neighbors.iter().flatten() {
        let neighbor = trn.skel.tri_at(*neighbor_id);
        let stays_subdivided = neighbor.is_subdivided()
            && (!bit_test(&sp.try_unsubdivide, neighbor_id.index())
                || bit_test(&sp.cant_unsubdivide, neighbor_id.index()));
        if !stays_subdivided {
            continue;
        }
        subdivided_neighbors += 1;

        // Rule B: if the neighbor keeps a subdivided child on our shared
        // edge, this triangle cannot become a leaf next to it.
        let neighbor_edge = neighbor.find_neighbor_index(sktri_id);
        let group = trn.skel.tri_group_at(neighbor.children.expect("checked subdivided"));
        for sibling in edge_children(neighbor_edge) {
            if group.triangles[sibling as usize].is_subdivided() {
                return true;
            }
        }
    }

    // Rule A: as a leaf it may keep at most one subdivided neighbor.
    subdivided_neighbors >= 2
}

fn check_recurse(trn: &TerrainSkeleton, sp: &mut SubdivScratchpad, sktri_id: TriangleId) {
    if !violates_rules(trn, sp, sktri_id) {
        return;
    }
    bit_set(&mut sp.cant_unsubdivide, sktri_id.index());

    // Vetoing this triangle un-hides its subdivided state from every
    // neighboring candidate, which may now violate in turn.
    let neighbors = trn.skel.tri_at(sktri_id).neighbors;
    for neighbor in neighbors.into_iter().flatten() {
        if bit_test(&sp.try_unsubdivide, neighbor.index())
            && !bit_test(&sp.cant_unsubdivide, neighbor.index())
        {
            check_recurse(trn, sp, neighbor);
        }
    }
}

/// Phase two: propagate vetoes until no candidate violates Rule A or Rule B
/// under the assumption that all surviving candidates unsubdivide together.
pub fn unsubdivide_level_check_rules(
    _lvl: u8,
    trn: &TerrainSkeleton,
    sp: &mut SubdivScratchpad,
) {
    let candidates: Vec<usize> = sp.try_unsubdivide.iter_ones().collect();
    for index in candidates {
        if !bit_test(&sp.cant_unsubdivide, index) {
            check_recurse(trn, sp, TriangleId::from_index(index));
        }
    }
}

/// The triangle keeps its children (not a candidate, or vetoed).
fn stays_subdivided(sp: &SubdivScratchpad, id: TriangleId) -> bool {
    !bit_test(&sp.try_unsubdivide, id.index()) || bit_test(&sp.cant_unsubdivide, id.index())
}

/// Phase three: commit every surviving candidate: repair the level index,
/// notify the geometry hook, and remove the child group.
pub fn unsubdivide_level_commit(lvl: u8, trn: &mut TerrainSkeleton, sp: &mut SubdivScratchpad) {
    let l = lvl as usize;
    let committed: Vec<TriangleId> = sp
        .try_unsubdivide
        .iter_ones()
        .filter(|&index| !bit_test(&sp.cant_unsubdivide, index))
        .map(TriangleId::from_index)
        .collect();

    for &sktri_id in &committed {
        let tri = *trn.skel.tri_at(sktri_id);
        assert!(
            !bit_test(&trn.levels[l].has_subdivided_neighbor, sktri_id.index()),
            "{sktri_id} is subdivided yet carries a has-subdivided-neighbor bit"
        );

        for neighbor_id in tri.neighbors.into_iter().flatten() {
            if !stays_subdivided(sp, neighbor_id) {
                // Also being unsubdivided; its own commit handles it.
                continue;
            }
            let neighbor = *trn.skel.tri_at(neighbor_id);
            if neighbor.is_subdivided() {
                // The rule check let at most one of these through.
                bit_set(&mut trn.levels[l].has_leaf_neighbor, neighbor_id.index());
                bit_set(&mut trn.levels[l].has_subdivided_neighbor, sktri_id.index());
            } else {
                let neighbor_has_subdivided = neighbor.neighbors.iter().flatten().any(|&other| {
                    other != sktri_id
                        && stays_subdivided(sp, other)
                        && trn.skel.is_subdivided(other)
                });
                if neighbor_has_subdivided {
                    bit_set(&mut trn.levels[l].has_subdivided_neighbor, neighbor_id.index());
                } else {
                    bit_clear(&mut trn.levels[l].has_subdivided_neighbor, neighbor_id.index());
                }
            }
        }

        // The departing children were leaves with no subdivided neighbors;
        // anything else would have vetoed this triangle.
        let children = tri.children.expect("only subdivided triangles are committed");
        if l + 1 < trn.levels.len() {
            for sibling in 0..4u8 {
                let child = TriangleId::new(children, sibling);
                assert!(
                    !bit_test(&trn.levels[l + 1].has_subdivided_neighbor, child.index()),
                    "{child} still has a subdivided neighbor at commit time"
                );
                debug_assert!(!bit_test(&trn.levels[l + 1].has_leaf_neighbor, child.index()));
            }
        }

        bit_clear(&mut trn.levels[l].has_leaf_neighbor, sktri_id.index());

        sp.hooks.on_unsubdivide(sktri_id, tri, trn);
        trn.skel.tri_unsubdiv(sktri_id);
    }

    if !committed.is_empty() {
        trace!(level = lvl, count = committed.len(), "unsubdivided");
    }

    sp.try_unsubdivide.fill(false);
    sp.cant_unsubdivide.fill(false);
}
