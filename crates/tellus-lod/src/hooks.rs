//! Geometry callbacks invoked on every structural change.
//!
//! The engine owns topology; positions and normals for new midpoint vertices
//! are produced by whatever implements [`SubdivisionHooks`]. Hooks are
//! registered at scratchpad construction and called synchronously; they may
//! read and write vertex geometry but must not mutate topology or re-enter
//! the engine.

use glam::DVec3;

use tellus_icosphere::{GroupId, MidpointVertex, PoolIndex, Triangle, TriangleId, VertexId};
use tellus_math::{Vec3I64, fixed_scale};

use crate::terrain::{TerrainSkeleton, calc_sphere_tri_center};

/// Callbacks for subdivision and unsubdivision events.
pub trait SubdivisionHooks {
    /// Called right after a subdivision created `group` under `parent`, with
    /// sibling links wired but before any cross-linking against neighbors.
    ///
    /// `middles[e]` is the midpoint of the parent's edge `e` (between
    /// `corners[e]` and `corners[(e+1)%3]`); entries flagged `is_new` have no
    /// geometry yet and the hook must initialize their position and normal.
    fn on_subdivide(
        &mut self,
        parent: TriangleId,
        group: GroupId,
        corners: [VertexId; 3],
        middles: [MidpointVertex; 3],
        trn: &mut TerrainSkeleton,
    );

    /// Called right before `tri`'s child group is removed; `record` is a copy
    /// of the triangle about to lose its children.
    ///
    /// The skeleton frees midpoint vertex ids on its own, but any external
    /// geometry resources are the hook's to release, typically for midpoints
    /// where [`tellus_icosphere::TriangleSkeleton::middle_ref_count`] is 1,
    /// meaning no other subdivided triangle still shares them.
    fn on_unsubdivide(&mut self, tri: TriangleId, record: Triangle, trn: &mut TerrainSkeleton);
}

/// Hooks that do nothing. Topology-only tests use these; with no positions
/// produced, distance tests see stale centers and every new triangle sits at
/// the origin.
#[derive(Debug, Default)]
pub struct NoopHooks;

impl SubdivisionHooks for NoopHooks {
    fn on_subdivide(
        &mut self,
        _parent: TriangleId,
        _group: GroupId,
        _corners: [VertexId; 3],
        _middles: [MidpointVertex; 3],
        _trn: &mut TerrainSkeleton,
    ) {
    }

    fn on_unsubdivide(&mut self, _tri: TriangleId, _record: Triangle, _trn: &mut TerrainSkeleton) {}
}

/// Canonical geometry hooks: project new midpoints onto the planet sphere
/// and refresh the new group's distance-test centers.
#[derive(Debug, Default)]
pub struct SphereProjector;

impl SubdivisionHooks for SphereProjector {
    fn on_subdivide(
        &mut self,
        _parent: TriangleId,
        group: GroupId,
        corners: [VertexId; 3],
        middles: [MidpointVertex; 3],
        trn: &mut TerrainSkeleton,
    ) {
        let to_fixed = trn.radius * fixed_scale(trn.scale) as f64;
        for (edge, mid) in middles.into_iter().enumerate() {
            if !mid.is_new {
                continue;
            }
            let a = trn.positions[corners[edge].index()];
            let b = trn.positions[corners[(edge + 1) % 3].index()];
            let between = DVec3::new(
                a.x as f64 + b.x as f64,
                a.y as f64 + b.y as f64,
                a.z as f64 + b.z as f64,
            );
            let dir = between.normalize();
            trn.positions[mid.id.index()] = Vec3I64::from_f64((dir * to_fixed).to_array());
            trn.normals[mid.id.index()] = dir.as_vec3();
        }
        calc_sphere_tri_center(group, trn);
    }

    fn on_unsubdivide(&mut self, _tri: TriangleId, _record: Triangle, _trn: &mut TerrainSkeleton) {
        // Positions and normals live in plain arrays owned by the terrain;
        // the skeleton recycles the vertex ids, nothing else to release.
    }
}
