pub mod config;
pub mod density;
pub mod direct;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod kernel;
mod timing;
pub mod tree;

pub use crate::config::DensityConfig;
pub use crate::density::{
    estimate_density, estimate_density_flat, DensityEstimator, ParticleDensity, ParticleSet,
};
pub use crate::error::{DensityError, Result};
pub use crate::geometry::PeriodicBox;
pub use crate::kernel::{KernelKind, SmoothingKernel};
pub use crate::timing::TIMING_TARGET;
pub use crate::tree::{Neighbour, NeighbourList, PeriodicKdTree};
