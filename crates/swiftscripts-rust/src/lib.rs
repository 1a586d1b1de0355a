use pyo3::prelude::*;

mod density;

/// Python bindings entry point for the snapshot plotting scripts.
///
/// Exposes the Rust SPH density estimator used when a snapshot lacks a
/// stored density field, under the `swiftscripts._rust` namespace.
#[pymodule]
fn _rust<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(pyo3::wrap_pyfunction!(density::compute_density, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(density::kernel_gamma, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(density::resolve_field, m)?)?;
    m.add("DEFAULT_NEIGHBOUR_CAP", sphdensity::config::DEFAULT_NEIGHBOUR_CAP)?;

    Ok(())
}
