//! Snapshot dataset naming.
//!
//! Snapshot writers renamed several datasets between format versions
//! (`Density` became `Densities`, and so on). Readers resolve the accepted
//! names once, in order, against what a file actually contains.

use crate::config::DensityConfig;
use crate::density::{DensityEstimator, ParticleSet};
use crate::error::{DensityError, Result};
use crate::geometry::PeriodicBox;

/// Outcome of resolving a field against the datasets present in a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldLookup<'a> {
    Present(&'a str),
    Absent,
}

impl<'a> FieldLookup<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, FieldLookup::Present(_))
    }

    pub fn name(&self) -> Option<&'a str> {
        match *self {
            FieldLookup::Present(name) => Some(name),
            FieldLookup::Absent => None,
        }
    }
}

/// Ordered list of dataset names under which one logical field is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldAliases {
    pub field: &'static str,
    /// Preferred name first.
    pub names: &'static [&'static str],
}

pub const DENSITY: FieldAliases = FieldAliases {
    field: "density",
    names: &["Density", "Densities"],
};

pub const SMOOTHING_LENGTH: FieldAliases = FieldAliases {
    field: "smoothing length",
    names: &["SmoothingLength", "SmoothingLengths"],
};

impl FieldAliases {
    pub fn resolve<'a>(&self, available: &[&'a str]) -> FieldLookup<'a> {
        first_present(self.names, available)
    }
}

/// First entry of `candidates` that appears in `available`.
pub fn first_present<'a, S: AsRef<str>>(
    candidates: &[S],
    available: &[&'a str],
) -> FieldLookup<'a> {
    candidates
        .iter()
        .find_map(|c| available.iter().find(|a| **a == c.as_ref()).copied())
        .map_or(FieldLookup::Absent, FieldLookup::Present)
}

/// Density handed to the plotting side: read from the snapshot when it has
/// one, otherwise estimated from the particles.
#[derive(Clone, Debug, PartialEq)]
pub enum DensitySource {
    Stored(Vec<f64>),
    Estimated(Vec<f64>),
}

impl DensitySource {
    pub fn resolve<const D: usize>(
        stored: Option<Vec<f64>>,
        particles: ParticleSet<'_, D>,
        domain: PeriodicBox<D>,
        config: &DensityConfig,
    ) -> Result<Self> {
        match stored {
            Some(rho) if rho.len() == particles.len() => Ok(DensitySource::Stored(rho)),
            Some(rho) => Err(DensityError::invalid(format!(
                "stored density has {} entries for {} particles",
                rho.len(),
                particles.len()
            ))),
            None => {
                tracing::info!(
                    n = particles.len(),
                    "snapshot has no density field, estimating it"
                );
                let rho = DensityEstimator::new(particles, domain, config)?.estimate()?;
                Ok(DensitySource::Estimated(rho))
            }
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, DensitySource::Estimated(_))
    }

    pub fn values(&self) -> &[f64] {
        match self {
            DensitySource::Stored(v) | DensitySource::Estimated(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        match self {
            DensitySource::Stored(v) | DensitySource::Estimated(v) => v,
        }
    }
}
