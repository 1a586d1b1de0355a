use crate::error::{DensityError, Result};
use crate::kernel::KernelKind;

/// Neighbour cap used by the snapshot plotting tools.
pub const DEFAULT_NEIGHBOUR_CAP: usize = 50;
pub const DEFAULT_LEAF_CAPACITY: usize = 16;
/// Below this many particles the estimator loop runs serially.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// Explicit knobs for one density estimation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityConfig {
    pub kernel: KernelKind,
    /// Upper bound on neighbours per particle; clamped to N at run time.
    pub neighbour_cap: usize,
    /// Maximum number of points in a k-d tree leaf.
    pub leaf_capacity: usize,
    pub parallel_threshold: usize,
    /// Report build/estimate phase timings via `tracing::debug!`.
    pub timing: bool,
}

impl Default for DensityConfig {
    fn default() -> Self {
        DensityConfig {
            kernel: KernelKind::CubicSpline,
            neighbour_cap: DEFAULT_NEIGHBOUR_CAP,
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            timing: false,
        }
    }
}

impl DensityConfig {
    pub fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_neighbour_cap(mut self, cap: usize) -> Self {
        self.neighbour_cap = cap;
        self
    }

    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.neighbour_cap == 0 {
            return Err(DensityError::invalid("neighbour cap must be at least 1"));
        }
        if self.leaf_capacity == 0 {
            return Err(DensityError::invalid("leaf capacity must be at least 1"));
        }
        Ok(())
    }
}
