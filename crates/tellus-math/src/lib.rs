//! Fixed-point i64 vector math and distance tests for the Tellus terrain engine.

mod distance;
mod vector;

pub use distance::is_distance_near;
pub use vector::{Vec3I64, distance_f64, distance_squared};

/// Conversion factor between world units and fixed-point coordinates.
///
/// Positions are stored as world units × `2^scale`; this returns `2^scale`.
///
/// # Panics
///
/// Panics in debug builds if `scale >= 63` (the factor would not fit i64).
#[must_use]
pub const fn fixed_scale(scale: u8) -> i64 {
    debug_assert!(scale < 63, "scale must leave headroom in i64");
    1i64 << scale
}
