use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{DensityError, Result};
use crate::geometry::PeriodicBox;
use crate::timing::{log_timing, start};

// Relative slack on the node pruning test. Node gaps and point distances are
// computed along different arithmetic paths and may disagree in the last ulp;
// a node is only skipped when it is clearly out of reach.
const PRUNE_SLACK: f64 = 1e-12;

/// One entry of a neighbour query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Minimum-image distance to the query point.
    pub distance: f64,
    /// Position of the neighbour in the indexed particle array.
    pub index: usize,
}

/// Result of a k-nearest query: found neighbours sorted by increasing
/// distance (ties by increasing index), at most `requested` of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighbourList {
    requested: usize,
    found: Vec<Neighbour>,
}

impl NeighbourList {
    pub(crate) fn from_candidates(requested: usize, mut found: Vec<Candidate>) -> Self {
        found.sort_unstable();
        found.truncate(requested);
        NeighbourList {
            requested,
            found: found
                .into_iter()
                .map(|c| Neighbour {
                    distance: c.dist2.sqrt(),
                    index: c.index,
                })
                .collect(),
        }
    }

    /// Number of slots asked for (`k`).
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Filled slots only.
    pub fn valid(&self) -> &[Neighbour] {
        &self.found
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// All `k` slots; unfilled ones are `None`.
    pub fn slots(&self) -> impl Iterator<Item = Option<&Neighbour>> + '_ {
        self.found
            .iter()
            .map(Some)
            .chain(std::iter::repeat(None).take(self.requested - self.found.len()))
    }

    /// The last valid entry, i.e. the farthest neighbour found.
    pub fn farthest(&self) -> Option<&Neighbour> {
        self.found.last()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.found.iter().map(|n| n.index)
    }
}

/// Heap entry ordered by `(dist2, index)`, so the heap top is the candidate
/// to evict first.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    pub dist2: f64,
    pub index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2
            .total_cmp(&other.dist2)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Bounded max-heap keeping the `k` best candidates seen so far.
pub(crate) struct CandidateHeap {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl CandidateHeap {
    pub(crate) fn new(k: usize) -> Self {
        CandidateHeap {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    #[inline]
    pub(crate) fn offer(&mut self, cand: Candidate) {
        if self.heap.len() < self.k {
            self.heap.push(cand);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if cand < *worst {
                *worst = cand;
            }
        }
    }

    /// Squared distance beyond which no candidate can enter any more.
    #[inline]
    fn bound2(&self, r2: f64) -> f64 {
        match self.heap.peek() {
            Some(worst) if self.heap.len() == self.k => worst.dist2.min(r2),
            _ => r2,
        }
    }

    pub(crate) fn into_list(self) -> NeighbourList {
        NeighbourList::from_candidates(self.k, self.heap.into_vec())
    }
}

#[derive(Clone, Debug)]
struct KdNode<const D: usize> {
    /// Tight bounding box of the wrapped points below this node.
    lo: [f64; D],
    hi: [f64; D],
    children: Option<[usize; 2]>, // indices into nodes vec
    /// Range into `PeriodicKdTree::order` covered by this subtree.
    start: usize,
    end: usize,
}

/// Median-split k-d tree over points in a periodic box.
///
/// Points are wrapped into the primary cell once at build time. Queries use
/// the minimum-image convention throughout: node pruning uses the periodic gap
/// from the query to each node's bounding box, so every periodic image is
/// covered without replicating points.
#[derive(Clone, Debug)]
pub struct PeriodicKdTree<const D: usize> {
    domain: PeriodicBox<D>,
    /// Wrapped positions, in input order.
    positions: Vec<[f64; D]>,
    /// Permutation of particle indices; every node owns a contiguous range.
    order: Vec<usize>,
    nodes: Vec<KdNode<D>>,
    leaf_capacity: usize,
}

impl<const D: usize> PeriodicKdTree<D> {
    pub fn build(
        positions: &[[f64; D]],
        domain: PeriodicBox<D>,
        leaf_capacity: usize,
    ) -> Result<Self> {
        Self::from_owned(positions.to_vec(), domain, leaf_capacity, false)
    }

    /// Build from owned positions. With `timing` set, build phases are
    /// reported through `tracing`.
    pub fn from_owned(
        mut positions: Vec<[f64; D]>,
        domain: PeriodicBox<D>,
        leaf_capacity: usize,
        timing: bool,
    ) -> Result<Self> {
        let t_all = start(timing);
        if positions.is_empty() {
            return Err(DensityError::invalid("cannot build an index over zero points"));
        }
        if let Some(i) = positions.iter().position(|p| p.iter().any(|x| !x.is_finite())) {
            return Err(DensityError::invalid(format!(
                "position of particle {i} is not finite"
            )));
        }

        let t0 = start(timing);
        for p in positions.iter_mut() {
            *p = domain.wrap(p);
        }
        log_timing("kdtree.wrap", t0);

        let n = positions.len();
        let mut tree = PeriodicKdTree {
            domain,
            positions,
            order: (0..n).collect(),
            nodes: Vec::with_capacity(2 * n / leaf_capacity.max(1) + 1),
            leaf_capacity: leaf_capacity.max(1),
        };
        let root = tree.make_node(0, n);
        tree.nodes.push(root);

        let t0 = start(timing);
        tree.build_recursive(0);
        log_timing("kdtree.build_recursive", t0);

        log_timing("kdtree.from_owned.total", t_all);
        tracing::trace!(points = n, nodes = tree.nodes.len(), "periodic kd-tree built");
        Ok(tree)
    }

    fn make_node(&self, start: usize, end: usize) -> KdNode<D> {
        let mut lo = [f64::INFINITY; D];
        let mut hi = [f64::NEG_INFINITY; D];
        for &pi in &self.order[start..end] {
            let p = &self.positions[pi];
            for i in 0..D {
                lo[i] = lo[i].min(p[i]);
                hi[i] = hi[i].max(p[i]);
            }
        }
        KdNode {
            lo,
            hi,
            children: None,
            start,
            end,
        }
    }

    fn subdivide_node(&mut self, node_idx: usize) -> bool {
        let (start, end, axis) = {
            let n = &self.nodes[node_idx];
            let mut axis = 0usize;
            let mut widest = n.hi[0] - n.lo[0];
            for i in 1..D {
                let w = n.hi[i] - n.lo[i];
                if w > widest {
                    widest = w;
                    axis = i;
                }
            }
            // All points coincide: nothing to split.
            if widest <= 0.0 {
                return false;
            }
            (n.start, n.end, axis)
        };

        let mid = start + (end - start) / 2;
        {
            let positions = &self.positions;
            self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
                positions[a][axis]
                    .total_cmp(&positions[b][axis])
                    .then(a.cmp(&b))
            });
        }

        let left = self.make_node(start, mid);
        let right = self.make_node(mid, end);
        let li = self.nodes.len();
        self.nodes.push(left);
        self.nodes.push(right);
        self.nodes[node_idx].children = Some([li, li + 1]);
        true
    }

    fn build_recursive(&mut self, node_idx: usize) {
        let should_subdivide = {
            let n = &self.nodes[node_idx];
            n.end - n.start > self.leaf_capacity
        };
        if !should_subdivide || !self.subdivide_node(node_idx) {
            return;
        }
        if let Some(children) = self.nodes[node_idx].children {
            for c in children {
                self.build_recursive(c);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn domain(&self) -> &PeriodicBox<D> {
        &self.domain
    }

    /// Indexed positions after wrapping into the primary cell.
    pub fn positions(&self) -> &[[f64; D]] {
        &self.positions
    }

    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Up to `k` nearest indexed points whose minimum-image distance to
    /// `point` is at most `radius`. `point` need not be wrapped.
    pub fn query(&self, point: &[f64; D], k: usize, radius: f64) -> NeighbourList {
        if k == 0 || radius.is_nan() || radius < 0.0 {
            return NeighbourList {
                requested: k,
                found: Vec::new(),
            };
        }
        let q = self.domain.wrap(point);
        let r2 = radius * radius;
        let mut best = CandidateHeap::new(k);
        let root = &self.nodes[0];
        let gap2 = self.domain.cell_gap2(&q, &root.lo, &root.hi);
        self.search(0, gap2, &q, r2, &mut best);
        best.into_list()
    }

    fn search(
        &self,
        node_idx: usize,
        gap2: f64,
        q: &[f64; D],
        r2: f64,
        best: &mut CandidateHeap,
    ) {
        if gap2 > best.bound2(r2) * (1.0 + PRUNE_SLACK) {
            return;
        }
        let node = &self.nodes[node_idx];
        match node.children {
            None => {
                for &pi in &self.order[node.start..node.end] {
                    let d2 = self.domain.distance2(q, &self.positions[pi]);
                    if d2 <= r2 {
                        best.offer(Candidate {
                            dist2: d2,
                            index: pi,
                        });
                    }
                }
            }
            Some([a, b]) => {
                let ga = self.domain.cell_gap2(q, &self.nodes[a].lo, &self.nodes[a].hi);
                let gb = self.domain.cell_gap2(q, &self.nodes[b].lo, &self.nodes[b].hi);
                // Nearer child first so the bound tightens early.
                if ga <= gb {
                    self.search(a, ga, q, r2, best);
                    self.search(b, gb, q, r2, best);
                } else {
                    self.search(b, gb, q, r2, best);
                    self.search(a, ga, q, r2, best);
                }
            }
        }
    }
}
