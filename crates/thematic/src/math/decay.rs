//! Distance decay functions and great-circle distance.
//!
//! ## Purpose
//!
//! This module provides the distance metric and the decay functions used by
//! the smoothing kernel. Stewart potentials weight a value by
//! `exp(-alpha d^beta)` or `(1 + alpha d)^(-beta)`; kernel density estimation
//! weights it by `k(d/h)/h` for a kernel `k` and a bandwidth `h`.
//!
//! ## Design notes
//!
//! * **Closed variant**: The decay is chosen once, as a [`DecayFn`], when the
//!   kernel is built; there is no dispatch on names at evaluation time.
//! * **Shared tag**: [`DecayFn::id`] is the numeric tag the GPU shader switches on.
//!
//! ## Invariants
//!
//! * Weights are non-negative and non-increasing in distance.
//! * Bounded KDE kernels return exactly zero for `|u| > 1`.
//!
//! ## Non-goals
//!
//! * This module does not validate alpha, beta or bandwidth (see `engine::validator`).

// External dependencies
use core::f64::consts::{LN_2, PI};

// ============================================================================
// Constants
// ============================================================================

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Degrees to radians.
const DEG_TO_RAD: f64 = PI / 180.0;

/// 1 / sqrt(2*pi), normalisation of the Gaussian kernel.
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

// ============================================================================
// Distance
// ============================================================================

/// Great-circle (haversine) distance in kilometres between two lon/lat points.
#[inline]
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lat1, lat2) = (lat1 * DEG_TO_RAD, lat2 * DEG_TO_RAD);
    let d_lat = lat2 - lat1;
    let d_lon = (lon2 - lon1) * DEG_TO_RAD;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Length in kilometres of an arc of `degrees` on a great circle.
#[inline]
pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees * DEG_TO_RAD * EARTH_RADIUS_KM
}

// ============================================================================
// Stewart Functions
// ============================================================================

/// Interaction function of a Stewart potential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StewartFunction {
    /// `exp(-alpha d^beta)` ("Gaussian" family when beta = 2).
    #[default]
    Exponential,

    /// `(1 + alpha d)^(-beta)`.
    Pareto,
}

impl StewartFunction {
    /// Get the name of the function.
    pub const fn name(&self) -> &'static str {
        match self {
            StewartFunction::Exponential => "Exponential",
            StewartFunction::Pareto => "Pareto",
        }
    }

    /// Alpha such that the weight halves at distance `span`.
    pub fn alpha_from_span(&self, span: f64, beta: f64) -> f64 {
        match self {
            StewartFunction::Exponential => LN_2 / span.powf(beta),
            StewartFunction::Pareto => (2.0f64.powf(1.0 / beta) - 1.0) / span,
        }
    }

    /// Decay variant evaluated by the kernel.
    pub const fn decay(&self) -> DecayFn {
        match self {
            StewartFunction::Exponential => DecayFn::Exponential,
            StewartFunction::Pareto => DecayFn::Pareto,
        }
    }
}

// ============================================================================
// KDE Kernels
// ============================================================================

/// Kernel of a kernel density estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdeKernel {
    /// Normal density: `exp(-u^2 / 2) / sqrt(2 pi)`.
    #[default]
    Gaussian,

    /// Triangular: `1 - |u|` for `|u| <= 1`.
    Triangular,

    /// Uniform: `1/2` for `|u| <= 1`.
    Uniform,
}

impl KdeKernel {
    /// Get the name of the kernel.
    pub const fn name(&self) -> &'static str {
        match self {
            KdeKernel::Gaussian => "Gaussian",
            KdeKernel::Triangular => "Triangular",
            KdeKernel::Uniform => "Uniform",
        }
    }

    /// Decay variant evaluated by the kernel.
    pub const fn decay(&self) -> DecayFn {
        match self {
            KdeKernel::Gaussian => DecayFn::Gaussian,
            KdeKernel::Triangular => DecayFn::Triangular,
            KdeKernel::Uniform => DecayFn::Uniform,
        }
    }
}

// ============================================================================
// Decay Function
// ============================================================================

/// Weight of a contribution as a function of distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayFn {
    /// Stewart exponential.
    Exponential,

    /// Stewart Pareto.
    Pareto,

    /// Gaussian KDE kernel.
    Gaussian,

    /// Triangular KDE kernel.
    Triangular,

    /// Uniform KDE kernel.
    Uniform,
}

impl DecayFn {
    /// Get the name of the decay function.
    pub const fn name(&self) -> &'static str {
        match self {
            DecayFn::Exponential => "Exponential",
            DecayFn::Pareto => "Pareto",
            DecayFn::Gaussian => "Gaussian",
            DecayFn::Triangular => "Triangular",
            DecayFn::Uniform => "Uniform",
        }
    }

    /// Numeric tag shared with the GPU shader.
    pub const fn id(&self) -> u32 {
        match self {
            DecayFn::Exponential => 0,
            DecayFn::Pareto => 1,
            DecayFn::Gaussian => 2,
            DecayFn::Triangular => 3,
            DecayFn::Uniform => 4,
        }
    }

    /// Whether this is a kernel density estimate.
    pub const fn is_kde(&self) -> bool {
        matches!(
            self,
            DecayFn::Gaussian | DecayFn::Triangular | DecayFn::Uniform
        )
    }
}

/// A decay function with its shape parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayKernel {
    /// Decay variant.
    pub function: DecayFn,

    /// Stewart alpha (ignored by KDE).
    pub alpha: f64,

    /// Stewart beta (ignored by KDE).
    pub beta: f64,

    /// KDE bandwidth in km (ignored by Stewart).
    pub bandwidth: f64,
}

impl DecayKernel {
    /// Stewart potential kernel.
    pub fn stewart(function: StewartFunction, alpha: f64, beta: f64) -> Self {
        Self {
            function: function.decay(),
            alpha,
            beta,
            bandwidth: 0.0,
        }
    }

    /// Kernel density estimation kernel.
    pub fn kde(kernel: KdeKernel, bandwidth: f64) -> Self {
        Self {
            function: kernel.decay(),
            alpha: 0.0,
            beta: 0.0,
            bandwidth,
        }
    }

    /// Distance in km that the kernel meaningfully covers: twice the
    /// half-weight distance of a Stewart function, three bandwidths for a
    /// Gaussian kernel, one bandwidth for a bounded kernel.
    pub fn reach_km(&self) -> f64 {
        match self.function {
            DecayFn::Exponential => 2.0 * (LN_2 / self.alpha).powf(1.0 / self.beta),
            DecayFn::Pareto => 2.0 * (2.0f64.powf(1.0 / self.beta) - 1.0) / self.alpha,
            DecayFn::Gaussian => 3.0 * self.bandwidth,
            DecayFn::Triangular | DecayFn::Uniform => self.bandwidth,
        }
    }

    /// Weight at `distance` km.
    #[inline]
    pub fn weight(&self, distance: f64) -> f64 {
        match self.function {
            DecayFn::Exponential => (-self.alpha * distance.powf(self.beta)).exp(),
            DecayFn::Pareto => (1.0 + self.alpha * distance).powf(-self.beta),
            DecayFn::Gaussian => {
                let u = distance / self.bandwidth;
                (-0.5 * u * u).exp() * INV_SQRT_2PI / self.bandwidth
            }
            DecayFn::Triangular => {
                let u = distance / self.bandwidth;
                if u <= 1.0 {
                    (1.0 - u) / self.bandwidth
                } else {
                    0.0
                }
            }
            DecayFn::Uniform => {
                if distance <= self.bandwidth {
                    0.5 / self.bandwidth
                } else {
                    0.0
                }
            }
        }
    }
}
