use crate::error::{DensityError, Result};

/// Orthorhombic simulation box, periodic along every axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicBox<const D: usize> {
    extents: [f64; D],
    half: [f64; D],
}

impl<const D: usize> PeriodicBox<D> {
    pub fn new(extents: [f64; D]) -> Result<Self> {
        if D == 0 {
            return Err(DensityError::invalid("box must have at least one axis"));
        }
        for (axis, &l) in extents.iter().enumerate() {
            if !(l.is_finite() && l > 0.0) {
                return Err(DensityError::invalid(format!(
                    "box extent along axis {axis} must be positive and finite, got {l}"
                )));
            }
        }
        let mut half = [0.0f64; D];
        for (h, &l) in half.iter_mut().zip(extents.iter()) {
            *h = 0.5 * l;
        }
        Ok(PeriodicBox { extents, half })
    }

    /// Build from a runtime-length slice, as handed over by snapshot readers.
    pub fn from_slice(extents: &[f64]) -> Result<Self> {
        let arr: [f64; D] = extents.try_into().map_err(|_| {
            DensityError::invalid(format!(
                "box has {} extents but the particles are {D}-dimensional",
                extents.len()
            ))
        })?;
        Self::new(arr)
    }

    #[inline]
    pub fn extents(&self) -> &[f64; D] {
        &self.extents
    }

    pub fn volume(&self) -> f64 {
        self.extents.iter().product()
    }

    /// Map a position into `[0, L)` on every axis.
    #[inline]
    pub fn wrap(&self, p: &[f64; D]) -> [f64; D] {
        let mut out = [0.0f64; D];
        for i in 0..D {
            let l = self.extents[i];
            let mut x = p[i].rem_euclid(l);
            // rem_euclid rounds tiny negative inputs up to exactly `l`.
            if x >= l {
                x = 0.0;
            }
            out[i] = x;
        }
        out
    }

    /// Minimum-image separation along `axis` for two wrapped coordinates.
    #[inline]
    pub fn fold(&self, axis: usize, dx: f64) -> f64 {
        if dx > self.half[axis] {
            dx - self.extents[axis]
        } else if dx < -self.half[axis] {
            dx + self.extents[axis]
        } else {
            dx
        }
    }

    /// Squared minimum-image distance between two wrapped points.
    #[inline]
    pub fn distance2(&self, a: &[f64; D], b: &[f64; D]) -> f64 {
        let mut r2 = 0.0f64;
        for i in 0..D {
            let dx = self.fold(i, a[i] - b[i]);
            r2 = dx.mul_add(dx, r2);
        }
        r2
    }

    /// Minimum-image distance between two arbitrary (unwrapped) points.
    pub fn periodic_distance(&self, a: &[f64; D], b: &[f64; D]) -> f64 {
        self.distance2(&self.wrap(a), &self.wrap(b)).sqrt()
    }

    /// Periodic gap between wrapped coordinate `x` and the interval `[lo, hi]`,
    /// both inside `[0, L)` along `axis`.
    #[inline]
    pub(crate) fn interval_gap(&self, axis: usize, x: f64, lo: f64, hi: f64) -> f64 {
        let l = self.extents[axis];
        if x < lo {
            (lo - x).min(x + l - hi)
        } else if x > hi {
            (x - hi).min(lo + l - x)
        } else {
            0.0
        }
    }

    /// Lower bound on the squared minimum-image distance from a wrapped point
    /// to any point of the axis-aligned cell `[lo, hi]`.
    #[inline]
    pub(crate) fn cell_gap2(&self, q: &[f64; D], lo: &[f64; D], hi: &[f64; D]) -> f64 {
        let mut g2 = 0.0f64;
        for i in 0..D {
            let g = self.interval_gap(i, q[i], lo[i], hi[i]);
            g2 = g.mul_add(g, g2);
        }
        g2
    }
}
