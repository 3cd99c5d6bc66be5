//! Execution engine for smoothing operations.
//!
//! ## Purpose
//!
//! This module provides the engine that turns a layer (or a raw point set)
//! into a [`SmoothedGrid`]: it reduces features to weighted input points,
//! samples the grid, runs the kernel pass on the selected backend and
//! finalizes the sums into one value per grid point.
//!
//! ## Design notes
//!
//! * **Explicit kernel**: The kernel pass takes immutable [`KernelInputs`] and
//!   a [`KernelConfig`] and returns owned [`KernelSums`]. It captures nothing.
//! * **Injected passes**: Accelerated passes (parallel CPU, GPU) are plain
//!   function pointers supplied through `custom_smooth_pass`.
//! * **Explicit fallback**: A failing or missing accelerated pass is surfaced
//!   as `ComputeBackendUnavailable` unless `cpu_fallback` is set, in which
//!   case the sequential pass runs and a warning is logged.
//!
//! ## Key concepts
//!
//! * **Plain mode**: `z = sum(v * w(d))`, scaled by the resolution in km for KDE.
//! * **Ratio mode**: `z = sum(v * w(d)) / sum(div * w(d))`; a near-zero
//!   denominator yields NaN (no-data). No resolution scaling, since it cancels.
//!   With unit divisors this is the plain potential divided by the potential
//!   of the point set, i.e. a distance-weighted mean of the values.
//! * **Degenerate extent**: a single point, or points sharing a latitude or a
//!   longitude, have a flat bounding box. Flat axes are widened to the longest
//!   axis, or to twice the kernel reach when every point coincides.
//!
//! ## Invariants
//!
//! * Input points only carry finite values (and finite divisors in ratio mode).
//! * Kernel sums have one entry per grid point.
//!
//! ## Non-goals
//!
//! * This module does not validate parameters (handled by `validator`).
//! * This module does not provide cancellation.

// External dependencies
use geo::Centroid;
use tracing::{debug, warn};

// Internal dependencies
use crate::algorithms::grid::{
    appropriate_resolution, make_grid, BBox, GridParameters, PointGrid, DEFAULT_GRID_CELLS,
};
use crate::engine::output::SmoothedGrid;
use crate::engine::validator::Validator;
use crate::math::decay::{degrees_to_km, haversine_km, DecayKernel};
use crate::primitives::backend::Backend;
use crate::primitives::errors::ThematicError;
use crate::primitives::layer::FeatureCollection;
use crate::primitives::series::finite_value;

/// Largest span, in degrees, given to a single-point extent.
const MAX_WIDENED_SPAN: f64 = 360.0;

/// Denominator magnitude below which a ratio cell is no-data.
pub const RATIO_EPSILON: f64 = 1e-12;

// ============================================================================
// Type Definitions
// ============================================================================

/// Decay function and shape parameters of a kernel pass.
pub type KernelConfig = DecayKernel;

/// Signature for custom smooth pass function
#[doc(hidden)]
pub type SmoothPassFn = fn(
    &KernelInputs,  // grid and input coordinates, values, divisors
    &KernelConfig,  // decay function and parameters
) -> Result<KernelSums, ThematicError>;

/// Signature of a progress callback.
pub type ProgressFn = fn(Progress);

/// Coarse lifecycle stage of a smoothing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Reducing features to input points.
    PreparingData,

    /// Sampling the grid.
    BuildingGrid,

    /// Running the kernel pass.
    RunningKernel {
        /// Backend executing the pass.
        backend: Backend,
    },

    /// Turning sums into grid values.
    Finalizing,
}

/// A weighted input point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputPoint {
    /// Longitude.
    pub lon: f64,

    /// Latitude.
    pub lat: f64,

    /// Value.
    pub value: f64,

    /// Divisor value (ratio mode).
    pub divisor: Option<f64>,
}

impl InputPoint {
    /// Point without divisor.
    pub fn new(lon: f64, lat: f64, value: f64) -> Self {
        Self {
            lon,
            lat,
            value,
            divisor: None,
        }
    }

    /// Set the divisor value.
    pub fn with_divisor(mut self, divisor: f64) -> Self {
        self.divisor = Some(divisor);
        self
    }
}

// ============================================================================
// Kernel Inputs and Sums
// ============================================================================

/// Immutable arrays consumed by a kernel pass.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInputs {
    /// Longitude of each grid point.
    pub grid_lon: Vec<f64>,

    /// Latitude of each grid point.
    pub grid_lat: Vec<f64>,

    /// Longitude of each input point.
    pub point_lon: Vec<f64>,

    /// Latitude of each input point.
    pub point_lat: Vec<f64>,

    /// Value of each input point.
    pub values: Vec<f64>,

    /// Divisor of each input point (ratio mode).
    pub divisors: Option<Vec<f64>>,
}

impl KernelInputs {
    /// Flatten a grid and a point set.
    ///
    /// Ratio mode is enabled when every point carries a divisor. Mixed sets
    /// are rejected by [`SmoothingExecutor::smooth_points`].
    pub fn new(points: &[InputPoint], grid: &PointGrid) -> Self {
        let (grid_lon, grid_lat) = grid.flattened();
        let divisors: Option<Vec<f64>> = if points.is_empty() {
            None
        } else {
            points.iter().map(|p| p.divisor).collect()
        };
        Self {
            grid_lon,
            grid_lat,
            point_lon: points.iter().map(|p| p.lon).collect(),
            point_lat: points.iter().map(|p| p.lat).collect(),
            values: points.iter().map(|p| p.value).collect(),
            divisors,
        }
    }

    /// Number of grid points.
    pub fn grid_len(&self) -> usize {
        self.grid_lon.len()
    }

    /// Number of input points.
    pub fn points_len(&self) -> usize {
        self.values.len()
    }
}

/// Owned output of a kernel pass.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelSums {
    /// Weighted sum of values per grid point.
    pub numerator: Vec<f64>,

    /// Weighted sum of divisors per grid point (ratio mode).
    pub denominator: Option<Vec<f64>>,
}

// ============================================================================
// Sequential Pass
// ============================================================================

/// Weighted sums at grid point `i`: `(sum v*w, sum div*w)`.
#[inline]
pub fn kernel_point_sums(inputs: &KernelInputs, config: &KernelConfig, i: usize) -> (f64, f64) {
    let (glon, glat) = (inputs.grid_lon[i], inputs.grid_lat[i]);
    let mut num = 0.0;
    let mut den = 0.0;
    for j in 0..inputs.points_len() {
        let d = haversine_km(inputs.point_lon[j], inputs.point_lat[j], glon, glat);
        let w = config.weight(d);
        num += inputs.values[j] * w;
        if let Some(divisors) = &inputs.divisors {
            den += divisors[j] * w;
        }
    }
    (num, den)
}

/// Reference pass: one grid point after the other.
pub fn smooth_pass_sequential(
    inputs: &KernelInputs,
    config: &KernelConfig,
) -> Result<KernelSums, ThematicError> {
    let (numerator, denominator): (Vec<f64>, Vec<f64>) = (0..inputs.grid_len())
        .map(|i| kernel_point_sums(inputs, config, i))
        .unzip();
    Ok(KernelSums {
        numerator,
        denominator: inputs.divisors.as_ref().map(|_| denominator),
    })
}

/// Turn kernel sums into grid values; returns the values and the no-data count.
pub fn finalize_sums(sums: KernelSums, config: &KernelConfig, resolution: f64) -> (Vec<f64>, usize) {
    match sums.denominator {
        Some(den) => {
            let mut no_data = 0;
            let z = sums
                .numerator
                .iter()
                .zip(&den)
                .map(|(&n, &d)| {
                    if d.abs() < RATIO_EPSILON || !(n / d).is_finite() {
                        no_data += 1;
                        f64::NAN
                    } else {
                        n / d
                    }
                })
                .collect();
            (z, no_data)
        }
        None if config.function.is_kde() => {
            let scale = degrees_to_km(resolution);
            (sums.numerator.iter().map(|v| v * scale).collect(), 0)
        }
        None => (sums.numerator, 0),
    }
}

// ============================================================================
// Input Preparation
// ============================================================================

/// Reduce a layer to input points.
///
/// Polygons are replaced by their area-weighted centroid. Features without a
/// centroid, a finite value or (when requested) a finite divisor are dropped;
/// the second element counts them.
pub fn prepare_points(
    layer: &FeatureCollection,
    variable: &str,
    divisor: Option<&str>,
) -> (Vec<InputPoint>, usize) {
    let mut points = Vec::with_capacity(layer.len());
    let mut excluded = 0;
    for feature in &layer.features {
        let value = finite_value(feature.numeric_property(variable));
        let div = divisor.map(|d| finite_value(feature.numeric_property(d)));
        let centroid = feature.geometry.centroid();
        match (centroid, value, div) {
            (Some(c), Some(v), None) => points.push(InputPoint::new(c.x(), c.y(), v)),
            (Some(c), Some(v), Some(Some(d))) => {
                points.push(InputPoint::new(c.x(), c.y(), v).with_divisor(d))
            }
            _ => excluded += 1,
        }
    }
    (points, excluded)
}

// ============================================================================
// Executor
// ============================================================================

/// Resolved configuration of a smoothing request.
#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    /// Decay function and parameters.
    pub kernel: KernelConfig,

    /// Grid spacing in degrees (derived from the extent when absent).
    pub resolution: Option<f64>,

    /// Explicit bounding box (the input extent is used otherwise).
    pub bbox: Option<BBox>,

    /// Padding fraction applied to the bounding box.
    pub pad: Option<f64>,

    /// Requested backend.
    pub backend: Backend,

    /// Whether an unavailable accelerated backend falls back to the CPU.
    pub cpu_fallback: bool,

    /// Progress callback.
    pub on_progress: Option<ProgressFn>,

    /// Accelerated pass for the requested backend.
    #[doc(hidden)]
    pub custom_smooth_pass: Option<SmoothPassFn>,
}

/// Runs smoothing requests.
#[derive(Debug, Clone)]
pub struct SmoothingExecutor {
    config: SmoothingConfig,
}

impl SmoothingExecutor {
    /// Create an executor from a resolved configuration.
    pub fn new(config: SmoothingConfig) -> Self {
        Self { config }
    }

    /// Configuration of this executor.
    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    fn report(&self, progress: Progress) {
        debug!(?progress, "smoothing");
        if let Some(callback) = self.config.on_progress {
            callback(progress);
        }
    }

    /// Smooth a layer on `variable`, optionally divided by `divisor`.
    pub fn smooth(
        &self,
        layer: &FeatureCollection,
        variable: &str,
        divisor: Option<&str>,
    ) -> Result<SmoothedGrid, ThematicError> {
        self.report(Progress::PreparingData);
        let (points, excluded) = prepare_points(layer, variable, divisor);
        if excluded > 0 {
            debug!(excluded, "features dropped before smoothing");
        }
        if points.is_empty() {
            return Err(ThematicError::EmptyInputSet);
        }

        self.report(Progress::BuildingGrid);
        let grid = make_grid(&self.grid_parameters(&points)?)?;

        let mut result = self.run(&points, &grid)?;
        result.excluded = excluded;
        Ok(result)
    }

    /// Smooth raw input points on an existing grid.
    ///
    /// Points with a non-finite coordinate, value or divisor are dropped.
    /// Ratio mode requires a divisor on every point; a mix of points with and
    /// without divisor is `InvalidInput`.
    pub fn smooth_points(
        &self,
        points: &[InputPoint],
        grid: &PointGrid,
    ) -> Result<SmoothedGrid, ThematicError> {
        self.report(Progress::PreparingData);
        let usable: Vec<InputPoint> = points
            .iter()
            .copied()
            .filter(|p| {
                p.lon.is_finite()
                    && p.lat.is_finite()
                    && p.value.is_finite()
                    && p.divisor.map_or(true, f64::is_finite)
            })
            .collect();
        let excluded = points.len() - usable.len();
        if usable.is_empty() {
            return Err(ThematicError::EmptyInputSet);
        }
        let with_divisor = usable.iter().filter(|p| p.divisor.is_some()).count();
        Validator::validate_divisor_presence(with_divisor, usable.len())?;
        let mut result = self.run(&usable, grid)?;
        result.excluded = excluded;
        Ok(result)
    }

    fn grid_parameters(&self, points: &[InputPoint]) -> Result<GridParameters, ThematicError> {
        let bbox = match self.config.bbox {
            Some(bbox) => bbox,
            None => {
                let (mut x_min, mut y_min) = (f64::INFINITY, f64::INFINITY);
                let (mut x_max, mut y_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for p in points {
                    x_min = x_min.min(p.lon);
                    y_min = y_min.min(p.lat);
                    x_max = x_max.max(p.lon);
                    y_max = y_max.max(p.lat);
                }
                let extent = BBox::new(x_min, y_min, x_max, y_max);
                let longest = extent.width().max(extent.height());
                let span = if longest > 0.0 {
                    longest
                } else {
                    let reach = self.config.kernel.reach_km() / degrees_to_km(1.0);
                    (2.0 * reach).min(MAX_WIDENED_SPAN)
                };
                extent.widened(span)
            }
        };
        let resolution = match self.config.resolution {
            Some(res) => res,
            None => appropriate_resolution(&bbox, DEFAULT_GRID_CELLS)?,
        };
        Ok(GridParameters {
            bbox,
            resolution,
            pad_fraction: self.config.pad,
        })
    }

    fn run(&self, points: &[InputPoint], grid: &PointGrid) -> Result<SmoothedGrid, ThematicError> {
        let inputs = KernelInputs::new(points, grid);
        debug!(
            grid_points = inputs.grid_len(),
            input_points = inputs.points_len(),
            decay = self.config.kernel.function.name(),
            ratio = inputs.divisors.is_some(),
            "running kernel pass"
        );

        let sums = self.run_pass(&inputs)?;

        self.report(Progress::Finalizing);
        let (z, no_data) = finalize_sums(sums, &self.config.kernel, grid.resolution);
        if no_data > 0 {
            debug!(no_data, "cells without denominator");
        }
        Ok(SmoothedGrid {
            grid: grid.clone(),
            z,
            no_data,
            excluded: 0,
        })
    }

    fn run_pass(&self, inputs: &KernelInputs) -> Result<KernelSums, ThematicError> {
        let kernel = &self.config.kernel;
        let backend = self.config.backend;

        let attempt = match (backend, self.config.custom_smooth_pass) {
            (_, Some(pass)) => {
                self.report(Progress::RunningKernel { backend });
                pass(inputs, kernel)
            }
            (Backend::CPU, None) => {
                self.report(Progress::RunningKernel { backend });
                return smooth_pass_sequential(inputs, kernel);
            }
            (Backend::GPU, None) => Err(ThematicError::ComputeBackendUnavailable(
                "no GPU pass is available in this build".to_string(),
            )),
        };

        match attempt {
            Err(ThematicError::ComputeBackendUnavailable(reason)) if self.config.cpu_fallback => {
                warn!("{} backend unavailable ({}), falling back to CPU", backend, reason);
                self.report(Progress::RunningKernel {
                    backend: Backend::CPU,
                });
                smooth_pass_sequential(inputs, kernel)
            }
            other => other,
        }
    }
}
