//! Brute-force O(N^2) references for the tree-based routines.

use rayon::prelude::*;

use crate::density::{accumulate, ParticleSet};
use crate::error::Result;
use crate::geometry::PeriodicBox;
use crate::kernel::SmoothingKernel;
use crate::tree::{Candidate, CandidateHeap, NeighbourList};

/// k nearest neighbours within `radius` by scanning every point.
/// Same ordering and tie-breaking as `PeriodicKdTree::query`.
pub fn direct_neighbours<const D: usize>(
    positions: &[[f64; D]],
    domain: &PeriodicBox<D>,
    query: &[f64; D],
    k: usize,
    radius: f64,
) -> NeighbourList {
    let wrapped: Vec<[f64; D]> = positions.iter().map(|p| domain.wrap(p)).collect();
    scan(&wrapped, domain, &domain.wrap(query), k, radius)
}

fn scan<const D: usize>(
    wrapped: &[[f64; D]],
    domain: &PeriodicBox<D>,
    q: &[f64; D],
    k: usize,
    radius: f64,
) -> NeighbourList {
    let mut best = CandidateHeap::new(k);
    if k > 0 && radius >= 0.0 {
        let r2 = radius * radius;
        for (j, p) in wrapped.iter().enumerate() {
            let d2 = domain.distance2(q, p);
            if d2 <= r2 {
                best.offer(Candidate { dist2: d2, index: j });
            }
        }
    }
    best.into_list()
}

/// Densities computed from brute-force neighbour lists.
pub fn direct_densities<const D: usize>(
    particles: &ParticleSet<'_, D>,
    domain: &PeriodicBox<D>,
    kernel: &SmoothingKernel,
    neighbour_cap: usize,
) -> Result<Vec<f64>> {
    let k = neighbour_cap.min(particles.len());
    let wrapped: Vec<[f64; D]> = particles.positions().iter().map(|p| domain.wrap(p)).collect();
    let hs = particles.smoothing_lengths();
    let masses = particles.masses();

    (0..particles.len())
        .into_par_iter()
        .map(|p| {
            let neighbours = scan(&wrapped, domain, &wrapped[p], k, kernel.gamma() * hs[p]);
            accumulate(p, neighbours, masses, kernel).map(|e| e.density)
        })
        .collect()
}
