use ndarray::ArrayView2;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;

use sphdensity::fields::{first_present, FieldLookup};
use sphdensity::{estimate_density_flat, DensityConfig, DensityError, KernelKind, TIMING_TARGET};

fn to_py_err(err: DensityError) -> PyErr {
    match err {
        DensityError::InvalidInput(_) => PyValueError::new_err(err.to_string()),
        DensityError::NoNeighbors { .. } | DensityError::Cancelled => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

/// Helper: run a closure inside a dedicated rayon thread pool
/// when `threads > 0`; otherwise execute it on the global pool.
fn with_thread_pool<F, R>(threads: usize, f: F) -> PyResult<R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    if threads > 0 {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| {
                PyRuntimeError::new_err(format!("failed to build rayon thread pool: {e}"))
            })?;
        Ok(pool.install(f))
    } else {
        Ok(f())
    }
}

/// Print build and estimate timings to stderr. Leaves an already installed
/// global subscriber in place.
fn install_timing_log() {
    let _ = tracing_subscriber::registry()
        .with(Targets::new().with_target(TIMING_TARGET, LevelFilter::DEBUG))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// SPH density for every particle of a periodic snapshot.
///
/// `positions` is (N, d) with d in 1..=3, `boxsize` has d entries.
/// Raises ValueError for malformed input and RuntimeError when a particle
/// has no neighbour inside its kernel support.
#[pyfunction]
#[pyo3(signature = (
    positions,
    masses,
    smoothing_lengths,
    boxsize,
    kernel="cubic spline",
    neighbour_cap=50,
    leaf_capacity=16,
    threads=0,
    timing=false
))]
#[allow(clippy::too_many_arguments)]
pub fn compute_density<'py>(
    py: Python<'py>,
    positions: &PyArray2<f64>,
    masses: &PyArray1<f64>,
    smoothing_lengths: &PyArray1<f64>,
    boxsize: Vec<f64>,
    kernel: &str,
    neighbour_cap: usize,
    leaf_capacity: usize,
    threads: usize,
    timing: bool,
) -> PyResult<&'py PyArray1<f64>> {
    let arr: ArrayView2<'_, f64> = unsafe { positions.as_array() };
    let (n, dim) = (arr.shape()[0], arr.shape()[1]);
    if !(1..=3).contains(&dim) {
        return Err(PyValueError::new_err("positions must be (N,d) float64 array with d in 1..=3"));
    }
    // Row-major copy; also handles non-contiguous input.
    let pos: Vec<f64> = arr.iter().copied().collect();

    let masses_vec = unsafe { masses.as_slice()? }.to_vec();
    if masses_vec.len() != n {
        return Err(PyValueError::new_err("masses must be length N"));
    }
    let hs_vec = unsafe { smoothing_lengths.as_slice()? }.to_vec();
    if hs_vec.len() != n {
        return Err(PyValueError::new_err("smoothing_lengths must be length N"));
    }

    if timing {
        install_timing_log();
    }

    let config = DensityConfig::default()
        .with_kernel(kernel.parse::<KernelKind>().map_err(to_py_err)?)
        .with_neighbour_cap(neighbour_cap)
        .with_leaf_capacity(leaf_capacity)
        .with_timing(timing);

    let rho = py.allow_threads(|| {
        with_thread_pool(threads, || {
            estimate_density_flat(&pos, dim, &masses_vec, &hs_vec, &boxsize, &config)
        })
    })?;

    Ok(rho.map_err(to_py_err)?.into_pyarray(py))
}

/// Kernel support radius in units of the smoothing length.
#[pyfunction]
#[pyo3(signature = (kernel="cubic spline", ndim=3))]
pub fn kernel_gamma(kernel: &str, ndim: usize) -> PyResult<f64> {
    let kind = kernel.parse::<KernelKind>().map_err(to_py_err)?;
    kind.gamma(ndim).map_err(to_py_err)
}

/// First name of `candidates` present in `available`, or None.
#[pyfunction]
pub fn resolve_field(available: Vec<String>, candidates: Vec<String>) -> Option<String> {
    let names: Vec<&str> = available.iter().map(String::as_str).collect();
    match first_present(&candidates, &names) {
        FieldLookup::Present(name) => Some(name.to_owned()),
        FieldLookup::Absent => None,
    }
}
