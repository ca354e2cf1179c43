//! Subdivision: one-triangle subdivision with recursive neighbor-rule repair,
//! and the per-level distance-driven driver.

use tracing::trace;

use tellus_icosphere::{
    CENTER_SIBLING, GroupEdge, GroupId, TriangleId, bit_clear, bit_set, bit_test, bitvec_resize,
};
use tellus_math::{Vec3I64, is_distance_near};

use crate::scratchpad::SubdivScratchpad;
use crate::terrain::TerrainSkeleton;

/// Subdivide one leaf triangle, then repair the neighbor rules, recursively
/// subdividing whatever that requires.
///
/// Rule A repair stays on this level: a neighboring leaf that would end up
/// with two subdivided neighbors is subdivided too. Rule B repair moves one
/// level up: a missing neighbor means the parent's neighbor on that edge is
/// not subdivided yet, so it is subdivided at `lvl - 1` and
/// `level_need_process` is pulled back for the driver to reprocess from
/// there. Recursion terminates because Rule A only grows the subdivided set
/// within a level and Rule B strictly decreases the level.
///
/// # Panics
///
/// Panics if the triangle is already subdivided, or on any neighbor-rule
/// state that a consistent skeleton cannot produce.
pub fn subdivide(
    sktri_id: TriangleId,
    lvl: u8,
    has_next_level: bool,
    trn: &mut TerrainSkeleton,
    sp: &mut SubdivScratchpad,
) -> GroupId {
    let l = lvl as usize;
    let tri = *trn.skel.tri_at(sktri_id);
    assert!(!tri.is_subdivided(), "{sktri_id} is already subdivided");

    let neighbors = tri.neighbors;
    let corners = tri.corners;

    // Create or fetch the midpoint vertices of the three edges, then the
    // child group itself. The record copied above is stale from here on.
    let middles_new = trn.skel.vrtx_create_middles(corners);
    let group = trn.skel.tri_subdiv(sktri_id, middles_new.map(|m| m.id));
    trace!(%sktri_id, level = lvl, "subdivided");

    // Track the grown id spaces.
    let tri_capacity = trn.skel.tri_capacity();
    bitvec_resize(&mut sp.distance_test_done, tri_capacity);
    bitvec_resize(&mut trn.levels[l].has_subdivided_neighbor, tri_capacity);
    bitvec_resize(&mut trn.levels[l].has_leaf_neighbor, tri_capacity);
    trn.resize_storage();

    // Children of a non-deepest subdivision enter the next level's pass.
    if has_next_level {
        for sibling in 0..4u8 {
            let child = TriangleId::new(group, sibling);
            sp.levels[l + 1].distance_test_next.push(child);
            bit_set(&mut sp.distance_test_done, child.index());
        }
    }

    sp.hooks.on_subdivide(sktri_id, group, corners, middles_new, trn);

    // No longer a leaf.
    bit_clear(&mut trn.levels[l].has_subdivided_neighbor, sktri_id.index());

    let mut has_leaf_neighbor = false;

    // Cross-link against subdivided neighbors along all three edges.
    for self_edge in 0..3usize {
        let Some(neighbor_id) = neighbors[self_edge] else {
            continue;
        };
        let neighbor = *trn.skel.tri_at(neighbor_id);
        if let Some(neighbor_children) = neighbor.children {
            let neighbor_edge = neighbor.find_neighbor_index(sktri_id);
            let (self_pair, neighbor_pair) = trn.skel.tri_group_set_neighboring(
                GroupEdge { group, edge: self_edge },
                GroupEdge { group: neighbor_children, edge: neighbor_edge },
            );

            if has_next_level {
                // Both child pairs of the new seam: a subdivided child on
                // the neighbor side gives our fresh leaf child a subdivided
                // neighbor and itself gains a leaf neighbor.
                let second_subdivided = trn.skel.tri_at(neighbor_pair.second).is_subdivided();
                let first_subdivided = trn.skel.tri_at(neighbor_pair.first).is_subdivided();
                let next = &mut trn.levels[l + 1];
                if second_subdivided {
                    bit_set(&mut next.has_subdivided_neighbor, self_pair.first.index());
                    bit_set(&mut next.has_leaf_neighbor, neighbor_pair.second.index());
                }
                if first_subdivided {
                    bit_set(&mut next.has_subdivided_neighbor, self_pair.second.index());
                    bit_set(&mut next.has_leaf_neighbor, neighbor_pair.first.index());
                }
            }

            // The neighbor may have just lost its last leaf neighbor.
            let neighbor_rec = *trn.skel.tri_at(neighbor_id);
            let still_has_leaf = neighbor_rec
                .neighbors
                .iter()
                .flatten()
                .any(|&other| other != sktri_id && !trn.skel.is_subdivided(other));
            if still_has_leaf {
                bit_set(&mut trn.levels[l].has_leaf_neighbor, neighbor_id.index());
            } else {
                bit_clear(&mut trn.levels[l].has_leaf_neighbor, neighbor_id.index());
            }
        } else {
            has_leaf_neighbor = true;
            bit_set(&mut trn.levels[l].has_subdivided_neighbor, neighbor_id.index());
        }
    }

    if has_leaf_neighbor {
        bit_set(&mut trn.levels[l].has_leaf_neighbor, sktri_id.index());
    } else {
        bit_clear(&mut trn.levels[l].has_leaf_neighbor, sktri_id.index());
    }

    // Enforce Rule A and Rule B on each edge. Neighbors are re-fetched every
    // iteration: the recursion below can fill in edges that were empty.
    for self_edge in 0..3usize {
        if let Some(neighbor_id) = trn.skel.tri_at(sktri_id).neighbors[self_edge] {
            let neighbor = *trn.skel.tri_at(neighbor_id);
            if neighbor.is_subdivided() {
                continue;
            }

            // Rule A: together with this triangle, a second subdivided
            // neighbor would put the leaf over the limit.
            let other_subdivided = neighbor
                .neighbors
                .iter()
                .flatten()
                .any(|&other| other != sktri_id && trn.skel.is_subdivided(other));

            if other_subdivided {
                subdivide(neighbor_id, lvl, has_next_level, trn, sp);
                bit_set(&mut sp.distance_test_done, neighbor_id.index());
            } else if !bit_test(&sp.distance_test_done, neighbor_id.index()) {
                // No violation; let the distance pass decide it.
                sp.levels[l].distance_test_next.push(neighbor_id);
                bit_set(&mut sp.distance_test_done, neighbor_id.index());
            }
        } else {
            // Rule B: a missing neighbor means the parent's neighbor on this
            // edge is not subdivided. Only the center child tolerates that.
            assert_ne!(
                sktri_id.sibling(),
                CENTER_SIBLING,
                "center children are always surrounded by their siblings"
            );
            assert_ne!(lvl, 0, "root triangles always have neighbors");

            let parent = trn
                .skel
                .tri_group_at(sktri_id.group())
                .parent
                .expect("non-root group without a parent");
            let parent_neighbor = trn.skel.tri_at(parent).neighbors[self_edge]
                .expect("parent in a consistent skeleton has this neighbor");

            subdivide(parent_neighbor, lvl - 1, true, trn, sp);
            bit_set(&mut sp.distance_test_done, parent_neighbor.index());
            sp.level_need_process = sp.level_need_process.min(lvl - 1);
        }
    }

    group
}

/// Run the distance-driven subdivision pass for one level.
///
/// Drains the level's queue in BFS rounds. Near leaves are subdivided; near
/// already-subdivided triangles seed their children into the next level's
/// queue. Whenever a Rule B cascade pulls `level_need_process` below this
/// level, the shallower level is reprocessed before continuing here.
///
/// # Panics
///
/// Panics unless `lvl == level_need_process`; the driver must walk levels in
/// order from 0.
pub fn subdivide_level_by_distance(
    pos: Vec3I64,
    lvl: u8,
    trn: &mut TerrainSkeleton,
    sp: &mut SubdivScratchpad,
) {
    assert_eq!(lvl, sp.level_need_process, "levels must be processed in order");
    let l = lvl as usize;
    let has_next_level = lvl + 1 < sp.level_max();

    let mut processing = std::mem::take(&mut sp.levels[l].distance_test_processing);
    while !sp.levels[l].distance_test_next.is_empty() {
        std::mem::swap(&mut processing, &mut sp.levels[l].distance_test_next);

        for &sktri_id in &processing {
            debug_assert!(bit_test(&sp.distance_test_done, sktri_id.index()));
            let center = trn.sktri_center[sktri_id.index()];
            sp.distance_check_count += 1;

            if is_distance_near(pos, center, sp.distance_threshold_subdiv[l]) {
                let children = trn.skel.tri_at(sktri_id).children;
                if let Some(children) = children {
                    if has_next_level {
                        for sibling in 0..4u8 {
                            let child = TriangleId::new(children, sibling);
                            if !bit_test(&sp.distance_test_done, child.index()) {
                                sp.levels[l + 1].distance_test_next.push(child);
                                bit_set(&mut sp.distance_test_done, child.index());
                            }
                        }
                    }
                } else {
                    subdivide(sktri_id, lvl, has_next_level, trn, sp);
                }
            }

            // Finish any Rule B cascade before the next triangle.
            while sp.level_need_process != lvl {
                subdivide_level_by_distance(pos, sp.level_need_process, trn, sp);
            }
        }
        processing.clear();
    }
    sp.levels[l].distance_test_processing = processing;

    assert_eq!(lvl, sp.level_need_process);
    sp.level_need_process += 1;
}
