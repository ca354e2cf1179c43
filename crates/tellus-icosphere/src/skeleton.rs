//! The skeleton store: vertex and group pools, record storage, midpoint
//! deduplication, and the subdivision/unsubdivision primitives.

use rustc_hash::FxHashMap;

use crate::ids::{GroupId, TriangleId, VertexId};
use crate::pool::{IdPool, PoolIndex};
use crate::triangle::{EdgeChildren, GroupEdge, MidpointVertex, Triangle, TriangleGroup};

/// Canonical key for the midpoint of an edge: the unordered corner pair.
fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Owns every triangle, group, and vertex of one terrain skeleton.
///
/// All access is handle-based: callers hold ids and re-fetch records after
/// any mutating call, since subdivision can grow and relocate the backing
/// storage. Mis-ordered calls (subdividing twice, unsubdividing under a
/// still-subdivided child) are contract violations and panic.
#[derive(Debug, Default)]
pub struct TriangleSkeleton {
    vrtx_ids: IdPool<VertexId>,
    tri_group_ids: IdPool<GroupId>,
    groups: Vec<TriangleGroup>,
    /// Midpoint vertex of each edge currently split by at least one
    /// subdivision, keyed on the unordered corner pair.
    middle_of_edge: FxHashMap<(VertexId, VertexId), VertexId>,
    /// Per vertex: how many subdivided triangles created or fetched it as
    /// their edge midpoint. Zero for seed vertices.
    middle_refs: Vec<u32>,
}

impl TriangleSkeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive upper bound on triangle-id indices; the size for
    /// triangle-indexed arrays and bitsets.
    #[must_use]
    pub fn tri_capacity(&self) -> usize {
        self.tri_group_ids.capacity() * 4
    }

    /// Exclusive upper bound on vertex-id indices.
    #[must_use]
    pub fn vrtx_capacity(&self) -> usize {
        self.vrtx_ids.capacity()
    }

    /// Whether the group backing this triangle id is currently allocated.
    #[must_use]
    pub fn tri_exists(&self, id: TriangleId) -> bool {
        self.tri_group_ids.exists(id.group())
    }

    /// Fetch a triangle record.
    ///
    /// # Panics
    ///
    /// Panics if the owning group does not exist.
    #[must_use]
    pub fn tri_at(&self, id: TriangleId) -> &Triangle {
        debug_assert!(self.tri_exists(id), "{id} does not exist");
        &self.groups[id.group().index()].triangles[id.sibling() as usize]
    }

    pub(crate) fn tri_at_mut(&mut self, id: TriangleId) -> &mut Triangle {
        debug_assert!(self.tri_exists(id), "{id} does not exist");
        &mut self.groups[id.group().index()].triangles[id.sibling() as usize]
    }

    /// Fetch a group record.
    #[must_use]
    pub fn tri_group_at(&self, id: GroupId) -> &TriangleGroup {
        debug_assert!(self.tri_group_ids.exists(id), "group {} does not exist", id.index());
        &self.groups[id.index()]
    }

    /// Whether the triangle exists and has a child group.
    #[must_use]
    pub fn is_subdivided(&self, id: TriangleId) -> bool {
        self.tri_exists(id) && self.tri_at(id).is_subdivided()
    }

    /// Iterate over all currently allocated group ids.
    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.tri_group_ids.iter()
    }

    /// Whether a group id is currently allocated.
    #[must_use]
    pub fn group_exists(&self, id: GroupId) -> bool {
        self.tri_group_ids.exists(id)
    }

    /// The midpoint vertex of a subdivided triangle's outer edge `e`,
    /// read off the center child's corners.
    #[must_use]
    pub fn group_middle(&self, group: GroupId, edge: usize) -> VertexId {
        debug_assert!(edge < 3);
        self.tri_group_at(group).triangles[3].corners[(edge + 2) % 3]
    }

    /// How many subdivided triangles currently hold `vrtx` as an edge
    /// midpoint (1 or 2 for live midpoints, 0 for seed vertices).
    ///
    /// Unsubdivision callbacks use this to decide whether they are releasing
    /// the last reference to the midpoint's geometry.
    #[must_use]
    pub fn middle_ref_count(&self, vrtx: VertexId) -> u32 {
        self.middle_refs.get(vrtx.index()).copied().unwrap_or(0)
    }

    /// Allocate a seed vertex (icosahedron corner). Never deduplicated and
    /// never released by the skeleton.
    pub fn vrtx_create_root(&mut self) -> VertexId {
        let id = self.vrtx_ids.create();
        self.grow_middle_refs(id);
        self.middle_refs[id.index()] = 0;
        id
    }

    /// Create or fetch the midpoint vertex of each of the three edges
    /// `(c0,c1)`, `(c1,c2)`, `(c2,c0)`, in that order.
    ///
    /// Two adjacent triangles asking for the midpoint of their shared edge
    /// receive the same vertex id; `is_new` is true only for the call that
    /// created it. Each call counts as one reference for the edge's midpoint,
    /// matched by `tri_unsubdiv` releasing it.
    pub fn vrtx_create_middles(&mut self, corners: [VertexId; 3]) -> [MidpointVertex; 3] {
        std::array::from_fn(|e| {
            let key = edge_key(corners[e], corners[(e + 1) % 3]);
            if let Some(&id) = self.middle_of_edge.get(&key) {
                self.middle_refs[id.index()] += 1;
                MidpointVertex { id, is_new: false }
            } else {
                let id = self.vrtx_ids.create();
                self.grow_middle_refs(id);
                self.middle_refs[id.index()] = 1;
                self.middle_of_edge.insert(key, id);
                MidpointVertex { id, is_new: true }
            }
        })
    }

    fn grow_middle_refs(&mut self, id: VertexId) {
        if self.middle_refs.len() <= id.index() {
            self.middle_refs.resize(id.index() + 1, 0);
        }
    }

    fn release_middle(&mut self, corner_a: VertexId, corner_b: VertexId, middle: VertexId) {
        let refs = &mut self.middle_refs[middle.index()];
        assert!(*refs > 0, "midpoint {} released more often than created", middle.index());
        *refs -= 1;
        if *refs == 0 {
            let removed = self.middle_of_edge.remove(&edge_key(corner_a, corner_b));
            debug_assert_eq!(removed, Some(middle), "midpoint map out of sync");
            self.vrtx_ids.remove(middle);
        }
    }

    /// Allocate a group without wiring any neighbor links. The icosahedron
    /// seed fills the links from its face adjacency; `tri_subdiv` wires the
    /// sibling links itself.
    pub(crate) fn tri_group_create(
        &mut self,
        depth: u8,
        parent: Option<TriangleId>,
        corners: [[VertexId; 3]; 4],
    ) -> GroupId {
        let id = self.tri_group_ids.create();
        if self.groups.len() <= id.index() {
            self.groups.resize(id.index() + 1, TriangleGroup::default());
        }
        let group = &mut self.groups[id.index()];
        *group = TriangleGroup {
            triangles: corners.map(|c| Triangle {
                corners: c,
                neighbors: [None; 3],
                children: None,
            }),
            parent,
            depth,
        };
        id
    }

    /// Allocate a root group of four seed faces at depth 0.
    pub fn tri_group_create_root(&mut self, corners: [[VertexId; 3]; 4]) -> GroupId {
        self.tri_group_create(0, None, corners)
    }

    /// Subdivide a leaf triangle into a new group of four children.
    ///
    /// `middles` are the midpoint vertices of edges 0, 1, 2 as returned by
    /// [`Self::vrtx_create_middles`] for this triangle's corners. Children
    /// are laid out so that parent edge `e` is covered by corner children `e`
    /// and `(e+1)%3` at their own edge `e`, and the center child (sibling 3)
    /// borders each corner child. Outer neighbor links start empty; callers
    /// cross-link against subdivided neighbors afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the triangle is already subdivided.
    pub fn tri_subdiv(&mut self, id: TriangleId, middles: [VertexId; 3]) -> GroupId {
        let parent = *self.tri_at(id);
        assert!(parent.children.is_none(), "{id} is already subdivided");

        let depth = self.tri_group_at(id.group()).depth + 1;
        let [v0, v1, v2] = parent.corners;
        let [m0, m1, m2] = middles;

        let group = self.tri_group_create(
            depth,
            Some(id),
            [
                [v0, m0, m2],
                [m0, v1, m1],
                [m2, m1, v2],
                [m1, m2, m0],
            ],
        );

        // Sibling links: corner child i borders the center on its edge
        // (i+1)%3; the center's edge j borders corner child (j+2)%3.
        let center = TriangleId::new(group, 3);
        let record = &mut self.groups[group.index()];
        for i in 0..3usize {
            record.triangles[i].neighbors[(i + 1) % 3] = Some(center);
            record.triangles[3].neighbors[i] = Some(TriangleId::new(group, ((i + 2) % 3) as u8));
        }

        self.tri_at_mut(id).children = Some(group);
        group
    }

    /// Remove a subdivided triangle's child group, restoring it to a leaf.
    ///
    /// Clears every neighbor back-link held by triangles outside the group,
    /// releases the group's three midpoint references (freeing a midpoint
    /// vertex once no adjacent subdivision holds it), and recycles the group
    /// id.
    ///
    /// # Panics
    ///
    /// Panics if the triangle is a leaf or if any child is still subdivided.
    pub fn tri_unsubdiv(&mut self, id: TriangleId) {
        let parent = *self.tri_at(id);
        let group = parent.children.unwrap_or_else(|| panic!("{id} is not subdivided"));
        let record = self.tri_group_at(group).clone();
        for (sibling, child) in record.triangles.iter().enumerate() {
            assert!(
                child.children.is_none(),
                "unsubdividing {id} while child {sibling} is still subdivided"
            );
        }

        // Unlink cross-group neighbors; sibling links die with the group.
        for sibling in 0..4u8 {
            let child_id = TriangleId::new(group, sibling);
            for neighbor in record.triangles[sibling as usize].neighbors.into_iter().flatten() {
                if neighbor.group() != group {
                    let rec = self.tri_at_mut(neighbor);
                    if let Some(edge) = rec.neighbor_index_of(child_id) {
                        rec.neighbors[edge] = None;
                    }
                }
            }
        }

        for e in 0..3usize {
            let middle = self.group_middle(group, e);
            self.release_middle(parent.corners[e], parent.corners[(e + 1) % 3], middle);
        }

        self.tri_group_ids.remove(group);
        self.groups[group.index()] = TriangleGroup::default();
        self.tri_at_mut(id).children = None;
    }

    /// Cross-link the children of two adjacent subdivided triangles along
    /// their shared edge.
    ///
    /// Each side contributes the two corner children covering its edge; the
    /// pairs are linked crosswise (`first` of one side faces `second` of the
    /// other, because the shared edge runs in opposite directions in the two
    /// triangles). Returns the child pair of each side so the caller can
    /// propagate level-index updates one level deeper.
    pub fn tri_group_set_neighboring(
        &mut self,
        a: GroupEdge,
        b: GroupEdge,
    ) -> (EdgeChildren, EdgeChildren) {
        debug_assert!(a.edge < 3 && b.edge < 3);
        debug_assert_eq!(
            self.group_middle(a.group, a.edge),
            self.group_middle(b.group, b.edge),
            "cross-linking groups that do not share an edge midpoint"
        );

        let a_pair = EdgeChildren {
            first: TriangleId::new(a.group, a.edge as u8),
            second: TriangleId::new(a.group, ((a.edge + 1) % 3) as u8),
        };
        let b_pair = EdgeChildren {
            first: TriangleId::new(b.group, b.edge as u8),
            second: TriangleId::new(b.group, ((b.edge + 1) % 3) as u8),
        };

        self.tri_at_mut(a_pair.first).neighbors[a.edge] = Some(b_pair.second);
        self.tri_at_mut(b_pair.second).neighbors[b.edge] = Some(a_pair.first);
        self.tri_at_mut(a_pair.second).neighbors[a.edge] = Some(b_pair.first);
        self.tri_at_mut(b_pair.first).neighbors[b.edge] = Some(a_pair.second);

        (a_pair, b_pair)
    }

    /// Set one directed neighbor link. Seed wiring only; subdivision paths
    /// keep links symmetric through the dedicated operations.
    pub fn set_neighbor(&mut self, tri: TriangleId, edge: usize, neighbor: TriangleId) {
        self.tri_at_mut(tri).neighbors[edge] = Some(neighbor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A lone parent triangle with three fresh corners.
    fn lone_triangle(skel: &mut TriangleSkeleton) -> TriangleId {
        let corners = [
            skel.vrtx_create_root(),
            skel.vrtx_create_root(),
            skel.vrtx_create_root(),
        ];
        let group = skel.tri_group_create_root([corners, [corners[0]; 3], [corners[0]; 3], [corners[0]; 3]]);
        TriangleId::new(group, 0)
    }

    fn subdivide(skel: &mut TriangleSkeleton, id: TriangleId) -> GroupId {
        let corners = skel.tri_at(id).corners;
        let middles = skel.vrtx_create_middles(corners).map(|m| m.id);
        skel.tri_subdiv(id, middles)
    }

    #[test]
    fn test_middles_are_deduplicated() {
        let mut skel = TriangleSkeleton::new();
        let a = skel.vrtx_create_root();
        let b = skel.vrtx_create_root();
        let c = skel.vrtx_create_root();
        let d = skel.vrtx_create_root();

        let first = skel.vrtx_create_middles([a, b, c]);
        assert!(first.iter().all(|m| m.is_new));

        // Triangle (b, a, d) shares edge (a, b); its edge 0 midpoint must be
        // the same vertex, fetched rather than created.
        let second = skel.vrtx_create_middles([b, a, d]);
        assert_eq!(second[0].id, first[0].id);
        assert!(!second[0].is_new);
        assert!(second[1].is_new);
        assert!(second[2].is_new);
        assert_eq!(skel.middle_ref_count(first[0].id), 2);
    }

    #[test]
    fn test_subdivision_child_layout() {
        let mut skel = TriangleSkeleton::new();
        let id = lone_triangle(&mut skel);
        let [v0, v1, v2] = skel.tri_at(id).corners;
        let middles = skel.vrtx_create_middles([v0, v1, v2]);
        let [m0, m1, m2] = middles.map(|m| m.id);
        let group = skel.tri_subdiv(id, [m0, m1, m2]);

        let g = skel.tri_group_at(group);
        assert_eq!(g.triangles[0].corners, [v0, m0, m2]);
        assert_eq!(g.triangles[1].corners, [m0, v1, m1]);
        assert_eq!(g.triangles[2].corners, [m2, m1, v2]);
        assert_eq!(g.triangles[3].corners, [m1, m2, m0]);
        assert_eq!(g.parent, Some(id));
        assert_eq!(g.depth, 1);
        assert_eq!(skel.tri_at(id).children, Some(group));

        // Midpoint of each outer edge is recoverable from the center child.
        assert_eq!(skel.group_middle(group, 0), m0);
        assert_eq!(skel.group_middle(group, 1), m1);
        assert_eq!(skel.group_middle(group, 2), m2);
    }

    #[test]
    fn test_center_child_borders_all_siblings() {
        let mut skel = TriangleSkeleton::new();
        let id = lone_triangle(&mut skel);
        let group = subdivide(&mut skel, id);

        let center = TriangleId::new(group, 3);
        for i in 0..3u8 {
            let corner_child = skel.tri_at(TriangleId::new(group, i));
            let edge = corner_child.find_neighbor_index(center);
            assert_eq!(edge, (i as usize + 1) % 3);
            // And the link is symmetric.
            let back = skel.tri_at(center).find_neighbor_index(TriangleId::new(group, i));
            assert_eq!(skel.tri_at(center).neighbors[back], Some(TriangleId::new(group, i)));
        }
        // Outer edges start unlinked.
        for i in 0..3usize {
            let corner_child = skel.tri_at(TriangleId::new(group, i as u8));
            assert_eq!(corner_child.neighbors.iter().flatten().count(), 1);
        }
    }

    #[test]
    #[should_panic]
    fn test_double_subdivision_panics() {
        let mut skel = TriangleSkeleton::new();
        let id = lone_triangle(&mut skel);
        subdivide(&mut skel, id);
        subdivide(&mut skel, id);
    }

    #[test]
    fn test_unsubdiv_releases_midpoints_and_group() {
        let mut skel = TriangleSkeleton::new();
        let id = lone_triangle(&mut skel);
        let vrtx_before = skel.vrtx_capacity();
        let group = subdivide(&mut skel, id);

        skel.tri_unsubdiv(id);
        assert!(skel.tri_at(id).children.is_none());
        assert!(!skel.group_exists(group));
        // Midpoint ids were recycled into the pool; re-subdividing reuses
        // both the group id and the vertex ids without growing capacity.
        let group2 = subdivide(&mut skel, id);
        assert_eq!(group2, group);
        assert_eq!(skel.vrtx_capacity(), vrtx_before + 3);
    }

    #[test]
    fn test_shared_midpoint_survives_one_side_unsubdiv() {
        let mut skel = TriangleSkeleton::new();
        let a = skel.vrtx_create_root();
        let b = skel.vrtx_create_root();
        let c = skel.vrtx_create_root();
        let d = skel.vrtx_create_root();
        // Two triangles sharing edge (a, b): (a,b,c) and (b,a,d).
        let group = skel.tri_group_create_root([[a, b, c], [b, a, d], [a, b, c], [a, b, c]]);
        let left = TriangleId::new(group, 0);
        let right = TriangleId::new(group, 1);
        skel.set_neighbor(left, 0, right);
        skel.set_neighbor(right, 0, left);

        let left_group = subdivide(&mut skel, left);
        let shared = skel.group_middle(left_group, 0);
        let _right_group = subdivide(&mut skel, right);
        assert_eq!(skel.middle_ref_count(shared), 2);

        skel.tri_unsubdiv(left);
        assert_eq!(skel.middle_ref_count(shared), 1);
        assert!(skel.vrtx_ids_alive(shared));

        skel.tri_unsubdiv(right);
        assert_eq!(skel.middle_ref_count(shared), 0);
        assert!(!skel.vrtx_ids_alive(shared));
    }

    #[test]
    fn test_cross_link_pairs_face_each_other() {
        let mut skel = TriangleSkeleton::new();
        let a = skel.vrtx_create_root();
        let b = skel.vrtx_create_root();
        let c = skel.vrtx_create_root();
        let d = skel.vrtx_create_root();
        let group = skel.tri_group_create_root([[a, b, c], [b, a, d], [a, b, c], [a, b, c]]);
        let left = TriangleId::new(group, 0);
        let right = TriangleId::new(group, 1);
        skel.set_neighbor(left, 0, right);
        skel.set_neighbor(right, 0, left);

        let lg = subdivide(&mut skel, left);
        let rg = subdivide(&mut skel, right);
        let (l_pair, r_pair) = skel.tri_group_set_neighboring(
            GroupEdge { group: lg, edge: 0 },
            GroupEdge { group: rg, edge: 0 },
        );

        assert_eq!(skel.tri_at(l_pair.first).neighbors[0], Some(r_pair.second));
        assert_eq!(skel.tri_at(l_pair.second).neighbors[0], Some(r_pair.first));
        assert_eq!(skel.tri_at(r_pair.first).neighbors[0], Some(l_pair.second));
        assert_eq!(skel.tri_at(r_pair.second).neighbors[0], Some(l_pair.first));

        // Facing children share a corner: left child 0 touches corner a,
        // right child 1 touches corner a as well.
        let lc = skel.tri_at(l_pair.first).corners;
        let rc = skel.tri_at(r_pair.second).corners;
        assert!(lc.contains(&a) && rc.contains(&a));

        // Unsubdividing one side must clear the other side's back-links.
        skel.tri_unsubdiv(left);
        assert_eq!(skel.tri_at(r_pair.first).neighbors[0], None);
        assert_eq!(skel.tri_at(r_pair.second).neighbors[0], None);
    }

    impl TriangleSkeleton {
        fn vrtx_ids_alive(&self, id: VertexId) -> bool {
            self.vrtx_ids.exists(id)
        }
    }
}
