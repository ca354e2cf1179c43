//! Reusable work state for the distance-driven passes.

use bitvec::vec::BitVec;

use tellus_icosphere::{TriangleId, bit_set, bitvec_resize};

use crate::hooks::SubdivisionHooks;
use crate::terrain::TerrainSkeleton;

/// Double-buffered BFS queues for one level's distance pass.
#[derive(Debug, Default)]
pub struct ScratchpadLevel {
    pub distance_test_processing: Vec<TriangleId>,
    pub distance_test_next: Vec<TriangleId>,
}

/// Work state shared by the subdivision and unsubdivision passes.
///
/// The bitsets are not reset between frames automatically; the frame driver
/// resets `distance_test_done` before each sweep, and the unsubdivision
/// commit clears `try_unsubdivide` / `cant_unsubdivide` itself.
pub struct SubdivScratchpad {
    /// "Will not be enqueued again this pass"; set at enqueue time.
    pub distance_test_done: BitVec,
    /// Unsubdivision candidates found too far by the distance floodfill.
    pub try_unsubdivide: BitVec,
    /// Candidates vetoed because removing them would break a neighbor rule.
    pub cant_unsubdivide: BitVec,
    pub levels: Vec<ScratchpadLevel>,
    /// Per-level subdivide distance (fixed-point units).
    pub distance_threshold_subdiv: Vec<u64>,
    /// Per-level unsubdivide distance; strictly above the subdivide distance
    /// so an observer hovering between the two changes nothing.
    pub distance_threshold_unsubdiv: Vec<u64>,
    /// The shallowest level with pending work; a Rule B cascade pulls this
    /// back so the driver reprocesses from there.
    pub level_need_process: u8,
    /// Running count of distance tests, for profiling.
    pub distance_check_count: u64,
    pub hooks: Box<dyn SubdivisionHooks>,
}

impl SubdivScratchpad {
    /// Build a scratchpad for `subdiv.len()` levels.
    ///
    /// # Panics
    ///
    /// Panics if the threshold tables differ in length, are empty, or any
    /// level's unsubdivide threshold is not strictly above its subdivide
    /// threshold (the hysteresis contract).
    #[must_use]
    pub fn new(subdiv: Vec<u64>, unsubdiv: Vec<u64>, hooks: Box<dyn SubdivisionHooks>) -> Self {
        assert!(!subdiv.is_empty(), "must have at least one level");
        assert_eq!(
            subdiv.len(),
            unsubdiv.len(),
            "threshold tables must cover the same levels"
        );
        for (lvl, (s, u)) in subdiv.iter().zip(&unsubdiv).enumerate() {
            assert!(
                u > s,
                "level {lvl}: unsubdivide threshold {u} must exceed subdivide threshold {s}"
            );
        }
        Self {
            distance_test_done: BitVec::new(),
            try_unsubdivide: BitVec::new(),
            cant_unsubdivide: BitVec::new(),
            levels: (0..subdiv.len()).map(|_| ScratchpadLevel::default()).collect(),
            distance_threshold_subdiv: subdiv,
            distance_threshold_unsubdiv: unsubdiv,
            level_need_process: 0,
            distance_check_count: 0,
            hooks,
        }
    }

    /// Number of levels this scratchpad drives.
    #[must_use]
    pub fn level_max(&self) -> u8 {
        self.distance_threshold_subdiv.len() as u8
    }

    /// Forget which triangles were distance-checked, ahead of a new sweep.
    pub fn reset_distance_checks(&mut self, tri_capacity: usize) {
        self.distance_test_done.fill(false);
        bitvec_resize(&mut self.distance_test_done, tri_capacity);
    }

    /// Enqueue every root triangle into level 0's distance queue.
    pub fn seed_root_distance_checks(&mut self, trn: &TerrainSkeleton) {
        for &group in &trn.root_groups {
            for sibling in 0..4u8 {
                let id = TriangleId::new(group, sibling);
                self.levels[0].distance_test_next.push(id);
                bit_set(&mut self.distance_test_done, id.index());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;

    #[test]
    fn test_level_count_follows_thresholds() {
        let sp = SubdivScratchpad::new(vec![100, 50], vec![200, 100], Box::new(NoopHooks));
        assert_eq!(sp.level_max(), 2);
        assert_eq!(sp.levels.len(), 2);
    }

    #[test]
    #[should_panic]
    fn test_hysteresis_is_enforced() {
        // Equal thresholds would let the observer oscillate.
        let _ = SubdivScratchpad::new(vec![100], vec![100], Box::new(NoopHooks));
    }

    #[test]
    #[should_panic]
    fn test_mismatched_tables_panic() {
        let _ = SubdivScratchpad::new(vec![100, 50], vec![200], Box::new(NoopHooks));
    }

    #[test]
    fn test_seed_enqueues_all_roots_once() {
        let trn = TerrainSkeleton::new_icosphere(10, 100.0, 0.0, 2);
        let mut sp = SubdivScratchpad::new(vec![1, 1], vec![2, 2], Box::new(NoopHooks));
        sp.reset_distance_checks(trn.skel.tri_capacity());
        sp.seed_root_distance_checks(&trn);
        assert_eq!(sp.levels[0].distance_test_next.len(), 20);
        assert_eq!(sp.distance_test_done.count_ones(), 20);
    }
}
