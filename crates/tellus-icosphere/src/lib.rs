//! Recursive icosahedral triangle skeleton: id pools, triangle/group records,
//! midpoint deduplication, and bidirectional neighbor maintenance.
//!
//! The skeleton is pure topology. Positions, normals, and level-of-detail
//! state live one layer up; this crate guarantees that the triangle graph
//! stays consistent under subdivision and unsubdivision.

mod bits;
mod icosahedron;
mod ids;
mod pool;
mod skeleton;
mod triangle;

pub use bits::{bit_clear, bit_set, bit_test, bitvec_resize};
pub use icosahedron::{
    ICO_FACE_COUNT, ICO_ROOT_GROUP_COUNT, ICO_VERTEX_COUNT, IcosahedronSeed, create_icosahedron,
    tower_over_horizon_table,
};
pub use ids::{GroupId, TriangleId, VertexId};
pub use pool::{IdPool, PoolIndex};
pub use skeleton::TriangleSkeleton;
pub use triangle::{
    CENTER_SIBLING, EdgeChildren, GroupEdge, MidpointVertex, Triangle, TriangleGroup,
    edge_children,
};
