use std::time::Instant;

/// `tracing` target carrying build and estimate timings.
pub const TIMING_TARGET: &str = "sphdensity::timing";

#[inline]
pub(crate) fn start(enabled: bool) -> Option<Instant> {
    enabled.then(Instant::now)
}

#[inline]
pub(crate) fn log_timing(label: &str, t0: Option<Instant>) {
    if let Some(t0) = t0 {
        let dt = t0.elapsed();
        tracing::debug!(
            target: TIMING_TARGET,
            "{label}: {:.3} ms",
            dt.as_secs_f64() * 1e3
        );
    }
}
