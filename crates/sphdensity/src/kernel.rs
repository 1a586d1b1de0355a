use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{DensityError, Result};

/// Compact-support SPH kernel families.
///
/// All shapes are written in terms of `u = r / H`, where `H` is the radius at
/// which the kernel drops to zero. `gamma = H / h` relates that radius to the
/// particle smoothing length `h` (Dehnen & Aly 2012 convention).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// M4 cubic spline.
    #[default]
    CubicSpline,
    /// M5 quartic spline.
    QuarticSpline,
    /// M6 quintic spline.
    QuinticSpline,
}

impl KernelKind {
    pub const ALL: [KernelKind; 3] = [
        KernelKind::CubicSpline,
        KernelKind::QuarticSpline,
        KernelKind::QuinticSpline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KernelKind::CubicSpline => "cubic spline",
            KernelKind::QuarticSpline => "quartic spline",
            KernelKind::QuinticSpline => "quintic spline",
        }
    }

    /// Support radius in units of the smoothing length, `H / h`.
    pub fn gamma(self, dim: usize) -> Result<f64> {
        let table = match self {
            KernelKind::CubicSpline => [1.732051, 1.778002, 1.825742],
            KernelKind::QuarticSpline => [1.936492, 1.977173, 2.018932],
            KernelKind::QuinticSpline => [2.121321, 2.158131, 2.195775],
        };
        Ok(table[check_dim(dim)? - 1])
    }

    /// Normalisation so that the kernel integrates to one over its support
    /// when `H = 1`.
    fn norm(self, dim: usize) -> Result<f64> {
        let table = match self {
            KernelKind::CubicSpline => [8.0 / 3.0, 80.0 / (7.0 * PI), 16.0 / PI],
            KernelKind::QuarticSpline => [
                3125.0 / 768.0,
                46875.0 / (2398.0 * PI),
                15625.0 / (512.0 * PI),
            ],
            KernelKind::QuinticSpline => {
                [243.0 / 40.0, 15309.0 / (478.0 * PI), 2187.0 / (40.0 * PI)]
            }
        };
        Ok(table[check_dim(dim)? - 1])
    }

    /// Unnormalised shape for `0 <= u < 1`.
    #[inline]
    fn shape(self, u: f64) -> f64 {
        match self {
            KernelKind::CubicSpline => {
                let mut w = (1.0 - u).powi(3);
                if u < 0.5 {
                    w -= 4.0 * (0.5 - u).powi(3);
                }
                w
            }
            KernelKind::QuarticSpline => {
                let mut w = (1.0 - u).powi(4);
                if u < 0.6 {
                    w -= 5.0 * (0.6 - u).powi(4);
                }
                if u < 0.2 {
                    w += 10.0 * (0.2 - u).powi(4);
                }
                w
            }
            KernelKind::QuinticSpline => {
                let mut w = (1.0 - u).powi(5);
                if u < 2.0 / 3.0 {
                    w -= 6.0 * (2.0 / 3.0 - u).powi(5);
                }
                if u < 1.0 / 3.0 {
                    w += 15.0 * (1.0 / 3.0 - u).powi(5);
                }
                w
            }
        }
    }
}

#[inline]
fn check_dim(dim: usize) -> Result<usize> {
    if (1..=3).contains(&dim) {
        Ok(dim)
    } else {
        Err(DensityError::invalid(format!(
            "kernels are defined for 1, 2 or 3 dimensions, got {dim}"
        )))
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelKind {
    type Err = DensityError;

    /// Accepts e.g. `"cubic spline"`, `"Cubic_Spline"` or `"quintic-spline"`.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '_' | '-' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        KernelKind::ALL
            .into_iter()
            .find(|k| k.name() == key)
            .ok_or_else(|| DensityError::invalid(format!("unknown kernel '{s}'")))
    }
}

/// A kernel family bound to a spatial dimension, with its constants resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingKernel {
    kind: KernelKind,
    dim: usize,
    gamma: f64,
    norm: f64,
}

impl SmoothingKernel {
    pub fn new(kind: KernelKind, dim: usize) -> Result<Self> {
        Ok(SmoothingKernel {
            kind,
            dim,
            gamma: kind.gamma(dim)?,
            norm: kind.norm(dim)?,
        })
    }

    pub fn cubic_spline(dim: usize) -> Result<Self> {
        Self::new(KernelKind::CubicSpline, dim)
    }

    #[inline]
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `H / h` for this family and dimension.
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Kernel value `W(r, H)` in units of 1/length^d. Zero for `r >= H`.
    pub fn weight(&self, r: f64, support: f64) -> Result<f64> {
        if !(support.is_finite() && support > 0.0) {
            return Err(DensityError::invalid(format!(
                "kernel support radius must be positive and finite, got {support}"
            )));
        }
        Ok(self.weight_unchecked(r, support))
    }

    /// `weight` without validating `support`; the caller guarantees `support > 0`.
    #[inline]
    pub(crate) fn weight_unchecked(&self, r: f64, support: f64) -> f64 {
        let u = r.abs() / support;
        if u >= 1.0 {
            return 0.0;
        }
        self.norm * self.kind.shape(u) / support.powi(self.dim as i32)
    }
}
