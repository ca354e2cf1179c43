//! Full invariant audit, re-deriving every rule from the raw mesh.

use tellus_icosphere::{TriangleId, bit_test};

use crate::terrain::TerrainSkeleton;

/// Walk every existing triangle and assert the neighbor rules, neighbor
/// symmetry, midpoint sharing, and the level-index bitsets.
///
/// This recounts everything from scratch rather than trusting any cached
/// state, so it is the authority when the engine and the index disagree.
/// Intended for debug builds and tests; cost is linear in mesh size.
///
/// # Panics
///
/// Panics on the first violated invariant.
pub fn debug_check_rules(trn: &TerrainSkeleton) {
    for group_id in trn.skel.group_ids() {
        let group = trn.skel.tri_group_at(group_id);
        for sibling in 0..4u8 {
            let sktri_id = TriangleId::new(group_id, sibling);
            let tri = &group.triangles[sibling as usize];

            let mut subdivided = 0;
            let mut leaves = 0;
            for edge in 0..3usize {
                match tri.neighbors[edge] {
                    Some(neighbor_id) => {
                        let neighbor = trn.skel.tri_at(neighbor_id);
                        assert!(
                            neighbor.neighbor_index_of(sktri_id).is_some(),
                            "{neighbor_id} does not link back to {sktri_id}"
                        );
                        if neighbor.is_subdivided() {
                            subdivided += 1;
                        } else {
                            leaves += 1;
                        }

                        // Adjacent subdivisions must share the edge midpoint.
                        if tri.is_subdivided() && neighbor.is_subdivided() {
                            let own =
                                trn.skel.group_middle(tri.children.unwrap(), edge);
                            let neighbor_edge = neighbor.find_neighbor_index(sktri_id);
                            let theirs = trn
                                .skel
                                .group_middle(neighbor.children.unwrap(), neighbor_edge);
                            assert_eq!(
                                own, theirs,
                                "midpoint mismatch across edge {edge} of {sktri_id}"
                            );
                        }
                    }
                    None => {
                        // A missing neighbor is only legal when the matching
                        // parent edge faces a leaf.
                        let parent = group
                            .parent
                            .expect("root triangles always have neighbors");
                        let parent_neighbor = trn.skel.tri_at(parent).neighbors[edge]
                            .expect("neighbor rule violated: parent edge has no neighbor");
                        assert!(
                            !trn.skel.is_subdivided(parent_neighbor),
                            "missing neighbor on edge {edge} of {sktri_id} although the \
                             matching parent edge is subdivided"
                        );
                    }
                }
            }

            if !tri.is_subdivided() {
                assert!(
                    subdivided < 2,
                    "{sktri_id} is a leaf with {subdivided} subdivided neighbors"
                );
            }

            if (group.depth as usize) < trn.levels.len() {
                let level = &trn.levels[group.depth as usize];
                if tri.is_subdivided() {
                    assert_eq!(
                        bit_test(&level.has_leaf_neighbor, sktri_id.index()),
                        leaves != 0,
                        "has_leaf_neighbor wrong for {sktri_id}"
                    );
                    assert!(
                        !bit_test(&level.has_subdivided_neighbor, sktri_id.index()),
                        "has_subdivided_neighbor set on subdivided {sktri_id}"
                    );
                } else {
                    assert_eq!(
                        bit_test(&level.has_subdivided_neighbor, sktri_id.index()),
                        subdivided != 0,
                        "has_subdivided_neighbor wrong for {sktri_id}"
                    );
                    assert!(
                        !bit_test(&level.has_leaf_neighbor, sktri_id.index()),
                        "has_leaf_neighbor set on leaf {sktri_id}"
                    );
                }
            }
        }
    }
}
