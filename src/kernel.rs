// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Gaussian kernels for separable blur passes, uploaded with
//! `set_uniform_number_array`.

/// Share of the Gaussian mass that falls inside the kernel radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralMass {
    P90,
    P95,
    P98,
    P99,
    P995,
    P997,
    P999,
}

impl CentralMass {
    /// z score of the two-sided interval holding this mass
    pub fn z(self) -> f32 {
        match self {
            CentralMass::P90 => 1.644854,
            CentralMass::P95 => 1.959964,
            CentralMass::P98 => 2.326348,
            CentralMass::P99 => 2.575829,
            CentralMass::P995 => 2.807034,
            // 3 sigma rule of thumb
            CentralMass::P997 => 3.0,
            CentralMass::P999 => 3.290527,
        }
    }
}

/// Sigma such that `mass` of the distribution lies within `radius`.
/// Usually called with `CentralMass::P99`.
pub fn sigma_from_radius(radius: f32, mass: CentralMass) -> f32 {
    if radius <= 0.0 {
        return 1e-6;
    }
    radius / mass.z()
}

/// `2 * radius + 1` weights, symmetric, summing to 1.
///
/// A sigma that is not positive is clamped to 1e-6, which puts the whole
/// weight on the center tap.
pub fn build_gaussian_kernel(radius: u32, sigma: f32) -> Vec<f32> {
    let r = radius as i64;
    let sigma = if sigma > 0.0 { sigma } else { 1e-6 };
    let sigma2 = sigma * sigma * 2.0;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / sigma2).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Kernel whose radius covers `mass`, usually `CentralMass::P999`.
pub fn build_gaussian_kernel_from_radius(radius: u32, mass: CentralMass) -> Vec<f32> {
    build_gaussian_kernel(radius, sigma_from_radius(radius as f32, mass))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_shape() {
        for radius in [0u32, 1, 3, 7, 30] {
            let k = build_gaussian_kernel_from_radius(radius, CentralMass::P999);
            assert_eq!(k.len(), 2 * radius as usize + 1);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "radius {} sums to {}", radius, sum);
            for i in 0..k.len() / 2 {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
            }
            let center = radius as usize;
            assert!(k.iter().all(|v| *v <= k[center]));
        }
    }

    #[test]
    fn sigma_follows_z_table() {
        assert_eq!(sigma_from_radius(0.0, CentralMass::P99), 1e-6);
        assert_eq!(sigma_from_radius(-2.0, CentralMass::P90), 1e-6);
        assert!((sigma_from_radius(3.0, CentralMass::P997) - 1.0).abs() < 1e-6);
        assert!((sigma_from_radius(10.0, CentralMass::P99) - 10.0 / 2.575829).abs() < 1e-5);
    }

    #[test]
    fn zero_radius_is_identity() {
        assert_eq!(build_gaussian_kernel(0, 1.0), vec![1.0]);
    }

    #[test]
    fn degenerate_sigma_is_a_center_tap() {
        for sigma in [0.0, -1.0] {
            let k = build_gaussian_kernel(2, sigma);
            assert!(k.iter().all(|v| v.is_finite()));
            assert_eq!(k, vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        }
    }
}
