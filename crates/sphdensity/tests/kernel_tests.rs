use std::f64::consts::PI;

use sphdensity::{DensityError, KernelKind, SmoothingKernel};

/// Simpson integral of the kernel over its support with H = 1.
fn kernel_volume(kernel: &SmoothingKernel) -> f64 {
    let steps = 20_000usize;
    let du = 1.0 / steps as f64;
    let shell = |u: f64| -> f64 {
        let w = kernel.weight(u, 1.0).unwrap();
        match kernel.dim() {
            1 => 2.0 * w,
            2 => 2.0 * PI * u * w,
            _ => 4.0 * PI * u * u * w,
        }
    };
    let mut s = shell(0.0) + shell(1.0);
    for i in 1..steps {
        let u = i as f64 * du;
        s += if i % 2 == 1 { 4.0 } else { 2.0 } * shell(u);
    }
    s * du / 3.0
}

#[test]
fn kernels_are_normalised() {
    for kind in KernelKind::ALL {
        for dim in 1..=3 {
            let kernel = SmoothingKernel::new(kind, dim).unwrap();
            let v = kernel_volume(&kernel);
            assert!((v - 1.0).abs() < 1e-8, "{kind} in {dim}D integrates to {v}");
        }
    }
}

#[test]
fn kernels_vanish_at_support_and_stay_non_negative() {
    for kind in KernelKind::ALL {
        for dim in 1..=3 {
            let kernel = SmoothingKernel::new(kind, dim).unwrap();
            let h = 0.7;
            assert_eq!(kernel.weight(h, h).unwrap(), 0.0);
            assert_eq!(kernel.weight(2.0 * h, h).unwrap(), 0.0);
            for i in 0..1000 {
                let r = h * i as f64 / 1000.0;
                let w = kernel.weight(r, h).unwrap();
                assert!(w.is_finite() && w >= 0.0, "{kind} {dim}D at r={r}: {w}");
            }
            // Approaches zero continuously at the edge.
            assert!(kernel.weight(h * (1.0 - 1e-6), h).unwrap() < 1e-12);
        }
    }
}

#[test]
fn kernels_are_continuous_across_pieces() {
    let breaks: [(KernelKind, &[f64]); 3] = [
        (KernelKind::CubicSpline, &[0.5]),
        (KernelKind::QuarticSpline, &[0.2, 0.6]),
        (KernelKind::QuinticSpline, &[1.0 / 3.0, 2.0 / 3.0]),
    ];
    for (kind, points) in breaks {
        let kernel = SmoothingKernel::new(kind, 3).unwrap();
        for &b in points {
            let below = kernel.weight(b - 1e-10, 1.0).unwrap();
            let above = kernel.weight(b + 1e-10, 1.0).unwrap();
            assert!((below - above).abs() < 1e-8, "{kind} jumps at u={b}");
        }
    }
}

#[test]
fn cubic_spline_reference_values() {
    let k1 = SmoothingKernel::cubic_spline(1).unwrap();
    let k3 = SmoothingKernel::cubic_spline(3).unwrap();
    assert!((k1.weight(0.0, 1.0).unwrap() - 4.0 / 3.0).abs() < 1e-14);
    assert!((k1.weight(0.0, 2.0).unwrap() - 2.0 / 3.0).abs() < 1e-14);
    assert!((k3.weight(0.0, 1.0).unwrap() - 8.0 / PI).abs() < 1e-14);
    // (1 - 3/4)^3 at u = 3/4.
    assert!((k1.weight(1.5, 2.0).unwrap() - (8.0 / 3.0) * 0.015625 / 2.0).abs() < 1e-14);
    // Scaling W(r, H) = W(r/H, 1) / H^d.
    let w = k3.weight(0.3, 1.5).unwrap();
    let w_unit = k3.weight(0.2, 1.0).unwrap();
    assert!((w - w_unit / 1.5f64.powi(3)).abs() < 1e-14);
}

#[test]
fn gamma_table() {
    let cubic = [1.732051, 1.778002, 1.825742];
    for (d, g) in cubic.iter().enumerate() {
        assert_eq!(KernelKind::CubicSpline.gamma(d + 1).unwrap(), *g);
        assert_eq!(SmoothingKernel::cubic_spline(d + 1).unwrap().gamma(), *g);
    }
    assert_eq!(KernelKind::QuinticSpline.gamma(3).unwrap(), 2.195775);
    assert!(matches!(
        KernelKind::CubicSpline.gamma(0),
        Err(DensityError::InvalidInput(_))
    ));
    assert!(matches!(
        SmoothingKernel::new(KernelKind::QuarticSpline, 4),
        Err(DensityError::InvalidInput(_))
    ));
}

#[test]
fn non_positive_support_is_rejected() {
    let kernel = SmoothingKernel::cubic_spline(2).unwrap();
    assert!(matches!(kernel.weight(0.0, 0.0), Err(DensityError::InvalidInput(_))));
    assert!(matches!(kernel.weight(0.1, -1.0), Err(DensityError::InvalidInput(_))));
    assert!(matches!(kernel.weight(0.1, f64::NAN), Err(DensityError::InvalidInput(_))));
}

#[test]
fn kernel_names_parse() {
    assert_eq!("cubic spline".parse::<KernelKind>().unwrap(), KernelKind::CubicSpline);
    assert_eq!("Quartic_Spline".parse::<KernelKind>().unwrap(), KernelKind::QuarticSpline);
    assert_eq!(" quintic-spline ".parse::<KernelKind>().unwrap(), KernelKind::QuinticSpline);
    assert!("wendland C2".parse::<KernelKind>().is_err());
    for kind in KernelKind::ALL {
        assert_eq!(kind.to_string().parse::<KernelKind>().unwrap(), kind);
    }
}
