use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::config::DensityConfig;
use crate::error::{DensityError, Result};
use crate::geometry::PeriodicBox;
use crate::kernel::SmoothingKernel;
use crate::timing::{log_timing, start};
use crate::tree::{NeighbourList, PeriodicKdTree};

/// Borrowed per-particle inputs. Particle order is the output order.
#[derive(Clone, Copy, Debug)]
pub struct ParticleSet<'a, const D: usize> {
    positions: &'a [[f64; D]],
    masses: &'a [f64],
    smoothing_lengths: &'a [f64],
}

impl<'a, const D: usize> ParticleSet<'a, D> {
    pub fn new(
        positions: &'a [[f64; D]],
        masses: &'a [f64],
        smoothing_lengths: &'a [f64],
    ) -> Result<Self> {
        let n = positions.len();
        if n == 0 {
            return Err(DensityError::invalid("particle set is empty"));
        }
        if masses.len() != n {
            return Err(DensityError::invalid(format!(
                "masses must be length {n}, got {}",
                masses.len()
            )));
        }
        if smoothing_lengths.len() != n {
            return Err(DensityError::invalid(format!(
                "smoothing lengths must be length {n}, got {}",
                smoothing_lengths.len()
            )));
        }
        if let Some(i) = masses.iter().position(|m| !(m.is_finite() && *m > 0.0)) {
            return Err(DensityError::invalid(format!(
                "mass of particle {i} must be positive and finite, got {}",
                masses[i]
            )));
        }
        if let Some(i) = smoothing_lengths
            .iter()
            .position(|h| !(h.is_finite() && *h > 0.0))
        {
            return Err(DensityError::invalid(format!(
                "smoothing length of particle {i} must be positive and finite, got {}",
                smoothing_lengths[i]
            )));
        }
        Ok(ParticleSet {
            positions,
            masses,
            smoothing_lengths,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &'a [[f64; D]] {
        self.positions
    }

    pub fn masses(&self) -> &'a [f64] {
        self.masses
    }

    pub fn smoothing_lengths(&self) -> &'a [f64] {
        self.smoothing_lengths
    }
}

/// Full breakdown of one particle's estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleDensity {
    pub density: f64,
    /// Adaptive support `H`: distance of the farthest neighbour used.
    pub support: f64,
    /// `m_p W(0, H)`, already included in `density`.
    pub self_contribution: f64,
    pub neighbours: NeighbourList,
}

/// Turn the neighbour list of particle `p` into its density.
pub(crate) fn accumulate(
    p: usize,
    neighbours: NeighbourList,
    masses: &[f64],
    kernel: &SmoothingKernel,
) -> Result<ParticleDensity> {
    let support = match neighbours.farthest() {
        Some(n) => n.distance,
        None => return Err(DensityError::NoNeighbors { particle: p }),
    };
    // Only the particle itself (or exact duplicates) found: no support.
    if !(support > 0.0) {
        return Err(DensityError::NoNeighbors { particle: p });
    }

    let mut density = 0.0f64;
    let mut self_contribution = 0.0f64;
    for n in neighbours.valid() {
        let c = masses[n.index] * kernel.weight_unchecked(n.distance, support);
        if n.index == p {
            self_contribution = c;
        }
        density += c;
    }
    Ok(ParticleDensity {
        density,
        support,
        self_contribution,
        neighbours,
    })
}

/// Per-particle SPH density over a periodic k-d tree.
///
/// Each particle queries up to `min(neighbour_cap, N)` neighbours inside
/// `gamma * h`, takes the farthest of them as its support `H` and sums
/// `m_j W(r_pj, H)`, itself included. One pass, `h` is not iterated.
pub struct DensityEstimator<'a, const D: usize> {
    particles: ParticleSet<'a, D>,
    index: PeriodicKdTree<D>,
    kernel: SmoothingKernel,
    neighbour_cap: usize,
    config: DensityConfig,
}

impl<'a, const D: usize> DensityEstimator<'a, D> {
    /// Build the index over `particles` and bind the configured kernel.
    pub fn new(
        particles: ParticleSet<'a, D>,
        domain: PeriodicBox<D>,
        config: &DensityConfig,
    ) -> Result<Self> {
        config.validate()?;
        let kernel = SmoothingKernel::new(config.kernel, D)?;
        let index = PeriodicKdTree::from_owned(
            particles.positions().to_vec(),
            domain,
            config.leaf_capacity,
            config.timing,
        )?;
        Self::from_parts(particles, index, kernel, config)
    }

    /// Assemble from an index built elsewhere. The index must hold exactly
    /// the particle positions, in particle order.
    pub fn from_parts(
        particles: ParticleSet<'a, D>,
        index: PeriodicKdTree<D>,
        kernel: SmoothingKernel,
        config: &DensityConfig,
    ) -> Result<Self> {
        config.validate()?;
        if kernel.dim() != D {
            return Err(DensityError::invalid(format!(
                "kernel is {}-dimensional but particles are {D}-dimensional",
                kernel.dim()
            )));
        }
        if index.len() != particles.len() {
            return Err(DensityError::invalid(format!(
                "index holds {} points but the particle set has {}",
                index.len(),
                particles.len()
            )));
        }
        let domain = index.domain();
        if let Some(i) = particles
            .positions()
            .iter()
            .zip(index.positions())
            .position(|(p, q)| domain.wrap(p) != *q)
        {
            return Err(DensityError::invalid(format!(
                "index position {i} does not match particle {i}"
            )));
        }
        Ok(DensityEstimator {
            neighbour_cap: config.neighbour_cap.min(particles.len()),
            particles,
            index,
            kernel,
            config: *config,
        })
    }

    pub fn index(&self) -> &PeriodicKdTree<D> {
        &self.index
    }

    pub fn kernel(&self) -> &SmoothingKernel {
        &self.kernel
    }

    /// Effective neighbour count `k = min(neighbour_cap, N)`.
    pub fn neighbour_cap(&self) -> usize {
        self.neighbour_cap
    }

    /// Estimate a single particle.
    pub fn particle(&self, p: usize) -> Result<ParticleDensity> {
        if p >= self.particles.len() {
            return Err(DensityError::invalid(format!(
                "particle {p} out of range for {} particles",
                self.particles.len()
            )));
        }
        let radius = self.kernel.gamma() * self.particles.smoothing_lengths[p];
        let neighbours = self
            .index
            .query(&self.particles.positions[p], self.neighbour_cap, radius);
        accumulate(p, neighbours, self.particles.masses, &self.kernel)
    }

    /// Densities for all particles, in input order. Fails as a whole if any
    /// particle has no neighbours.
    pub fn estimate(&self) -> Result<Vec<f64>> {
        self.estimate_with_cancel(&AtomicBool::new(false))
    }

    /// As [`estimate`](Self::estimate), checking `cancel` before each particle.
    pub fn estimate_with_cancel(&self, cancel: &AtomicBool) -> Result<Vec<f64>> {
        let n = self.particles.len();
        let _span = tracing::info_span!("density.estimate", n, dim = D, k = self.neighbour_cap)
            .entered();
        let t_all = start(self.config.timing);

        let fill = |p: usize, rho: &mut f64| -> Result<()> {
            if cancel.load(Ordering::Relaxed) {
                return Err(DensityError::Cancelled);
            }
            *rho = self.particle(p)?.density;
            Ok(())
        };

        let mut out = vec![0.0f64; n];
        if n < self.config.parallel_threshold {
            for (p, rho) in out.iter_mut().enumerate() {
                fill(p, rho)?;
            }
        } else {
            // Particles above the lowest known failure are skipped; those
            // below still run, so the reported failure does not depend on
            // scheduling.
            let first_failure = AtomicUsize::new(usize::MAX);
            let skipped = AtomicUsize::new(0);
            let failure = out
                .par_iter_mut()
                .enumerate()
                .filter_map(|(p, rho)| {
                    if p > first_failure.load(Ordering::Relaxed) {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        return None;
                    }
                    let err = fill(p, rho).err()?;
                    first_failure.fetch_min(p, Ordering::Relaxed);
                    Some((p, err))
                })
                .min_by_key(|(p, _)| *p);
            if let Some((p, err)) = failure {
                tracing::debug!(
                    particle = p,
                    skipped = skipped.load(Ordering::Relaxed),
                    "density estimate aborted"
                );
                return Err(err);
            }
        }

        log_timing("density.estimate.total", t_all);
        Ok(out)
    }
}

/// One-shot estimate: build the index, run every particle, drop the index.
pub fn estimate_density<const D: usize>(
    positions: &[[f64; D]],
    masses: &[f64],
    smoothing_lengths: &[f64],
    domain: PeriodicBox<D>,
    config: &DensityConfig,
) -> Result<Vec<f64>> {
    let particles = ParticleSet::new(positions, masses, smoothing_lengths)?;
    DensityEstimator::new(particles, domain, config)?.estimate()
}

/// Runtime-dimension entry point for row-major `N x dim` position buffers.
pub fn estimate_density_flat(
    positions: &[f64],
    dim: usize,
    masses: &[f64],
    smoothing_lengths: &[f64],
    boxsize: &[f64],
    config: &DensityConfig,
) -> Result<Vec<f64>> {
    match dim {
        1 => estimate_flat::<1>(positions, masses, smoothing_lengths, boxsize, config),
        2 => estimate_flat::<2>(positions, masses, smoothing_lengths, boxsize, config),
        3 => estimate_flat::<3>(positions, masses, smoothing_lengths, boxsize, config),
        _ => Err(DensityError::invalid(format!(
            "density estimation supports 1, 2 or 3 dimensions, got {dim}"
        ))),
    }
}

fn estimate_flat<const D: usize>(
    positions: &[f64],
    masses: &[f64],
    smoothing_lengths: &[f64],
    boxsize: &[f64],
    config: &DensityConfig,
) -> Result<Vec<f64>> {
    let points = unflatten::<D>(positions, masses.len())?;
    let domain = PeriodicBox::<D>::from_slice(boxsize)?;
    estimate_density(&points, masses, smoothing_lengths, domain, config)
}

pub(crate) fn unflatten<const D: usize>(flat: &[f64], n: usize) -> Result<Vec<[f64; D]>> {
    if flat.len() != n * D {
        return Err(DensityError::invalid(format!(
            "positions must hold {n} x {D} values, got {}",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(D)
        .map(|c| {
            let mut p = [0.0f64; D];
            p.copy_from_slice(c);
            p
        })
        .collect())
}
