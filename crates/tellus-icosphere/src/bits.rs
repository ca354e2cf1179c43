//! Growable bitset helpers for id-indexed sets.
//!
//! Ids are allocated faster than any one bitset is touched, so reads past the
//! end mean "unset" and writes grow the set on demand. Growth is batched to
//! the next power of two to amortize the frequent small capacity bumps that
//! subdivision produces.

use bitvec::vec::BitVec;

/// Read a bit, treating out-of-range as unset.
#[must_use]
pub fn bit_test(bits: &BitVec, index: usize) -> bool {
    bits.get(index).is_some_and(|bit| *bit)
}

/// Set a bit, growing the set if needed.
pub fn bit_set(bits: &mut BitVec, index: usize) {
    if index >= bits.len() {
        bitvec_resize(bits, index + 1);
    }
    bits.set(index, true);
}

/// Clear a bit; clearing past the end is a no-op.
pub fn bit_clear(bits: &mut BitVec, index: usize) {
    if index < bits.len() {
        bits.set(index, false);
    }
}

/// Grow the set to hold at least `capacity` bits, preserving existing bits.
/// Never shrinks.
pub fn bitvec_resize(bits: &mut BitVec, capacity: usize) {
    if bits.len() < capacity {
        bits.resize(capacity.next_power_of_two(), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_reads_as_unset() {
        let bits = BitVec::new();
        assert!(!bit_test(&bits, 0));
        assert!(!bit_test(&bits, 1000));
    }

    #[test]
    fn test_set_grows_and_preserves() {
        let mut bits = BitVec::new();
        bit_set(&mut bits, 3);
        bit_set(&mut bits, 100);
        assert!(bit_test(&bits, 3));
        assert!(bit_test(&bits, 100));
        assert!(!bit_test(&bits, 4));
        assert!(bits.len() >= 101);
    }

    #[test]
    fn test_resize_preserves_bits() {
        let mut bits = BitVec::new();
        bit_set(&mut bits, 5);
        bitvec_resize(&mut bits, 4096);
        assert!(bit_test(&bits, 5));
        assert!(bits.len() >= 4096);
    }

    #[test]
    fn test_clear_past_end_is_noop() {
        let mut bits = BitVec::new();
        bit_clear(&mut bits, 42);
        assert!(bits.is_empty());
    }
}
