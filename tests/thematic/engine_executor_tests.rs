#![cfg(feature = "dev")]
//! Tests for the smoothing executor.
//!
//! These tests verify:
//! - Reduction of features to weighted input points
//! - Kernel sums and their finalization (plain, KDE scaling, ratio)
//! - Injection of custom passes and CPU fallback
//! - Progress reporting
//!
//! ## Test Organization
//!
//! 1. **Input Preparation** - Centroids and exclusion
//! 2. **Kernel Pass** - Sums and finalization
//! 3. **Executor** - Layers, point sets and errors
//! 4. **Backends** - Custom passes and fallback
//! 5. **Progress** - Lifecycle callbacks

use approx::assert_relative_eq;
use geo::{point, LineString, Polygon};
use std::sync::Mutex;

use thematic::internals::algorithms::grid::{make_grid, BBox, GridParameters, PointGrid};
use thematic::internals::engine::executor::{
    finalize_sums, kernel_point_sums, prepare_points, smooth_pass_sequential, InputPoint,
    KernelConfig, KernelInputs, KernelSums, Progress, SmoothingConfig, SmoothingExecutor,
};
use thematic::internals::math::decay::{
    degrees_to_km, haversine_km, DecayKernel, KdeKernel, StewartFunction,
};
use thematic::internals::primitives::backend::Backend;
use thematic::internals::primitives::errors::ThematicError;
use thematic::internals::primitives::layer::{Feature, FeatureCollection};

fn stewart() -> DecayKernel {
    DecayKernel::stewart(StewartFunction::Exponential, 0.01, 2.0)
}

fn config(kernel: DecayKernel) -> SmoothingConfig {
    SmoothingConfig {
        kernel,
        resolution: None,
        bbox: None,
        pad: None,
        backend: Backend::CPU,
        cpu_fallback: false,
        on_progress: None,
        custom_smooth_pass: None,
    }
}

fn line_grid(xs: Vec<f64>) -> PointGrid {
    PointGrid {
        width: xs.len(),
        height: 1,
        xs,
        ys: vec![0.0],
        resolution: 1.0,
    }
}

fn sample_points() -> Vec<InputPoint> {
    vec![
        InputPoint::new(0.0, 0.0, 10.0),
        InputPoint::new(1.0, 0.5, 4.0),
        InputPoint::new(2.0, 1.0, 1.0),
    ]
}

fn constant_pass(inputs: &KernelInputs, _: &KernelConfig) -> Result<KernelSums, ThematicError> {
    Ok(KernelSums {
        numerator: vec![7.0; inputs.grid_len()],
        denominator: None,
    })
}

fn unavailable_pass(_: &KernelInputs, _: &KernelConfig) -> Result<KernelSums, ThematicError> {
    Err(ThematicError::ComputeBackendUnavailable(
        "no adapter".to_string(),
    ))
}

// ============================================================================
// Input Preparation Tests
// ============================================================================

/// Test the reduction of a layer to input points.
///
/// Verifies:
/// - Points keep their coordinates, polygons use their centroid
/// - Missing or non-numeric values are excluded and counted
#[test]
fn test_prepare_points() {
    let square = Polygon::new(
        LineString::from(vec![(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)]),
        vec![],
    );
    let layer: FeatureCollection = vec![
        Feature::new(point! { x: 1.0, y: 1.0 }).with_property("pop", 5.0),
        Feature::new(square).with_property("pop", "12"),
        Feature::new(point! { x: 0.0, y: 0.0 }),
        Feature::new(point! { x: 0.0, y: 0.0 }).with_property("pop", "n/a"),
    ]
    .into_iter()
    .collect();

    let (points, excluded) = prepare_points(&layer, "pop", None);
    assert_eq!(excluded, 2);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0], InputPoint::new(1.0, 1.0, 5.0));
    assert_relative_eq!(points[1].lon, 3.0, epsilon = 1e-12);
    assert_relative_eq!(points[1].lat, 3.0, epsilon = 1e-12);
    assert_eq!(points[1].value, 12.0);
    assert_eq!(points[1].divisor, None);
}

/// Test that a divisor is required on every point in ratio mode.
#[test]
fn test_prepare_points_with_divisor() {
    let layer: FeatureCollection = vec![
        Feature::new(point! { x: 1.0, y: 1.0 })
            .with_property("pop", 5.0)
            .with_property("area", 2.0),
        Feature::new(point! { x: 2.0, y: 1.0 }).with_property("pop", 3.0),
    ]
    .into_iter()
    .collect();

    let (points, excluded) = prepare_points(&layer, "pop", Some("area"));
    assert_eq!(excluded, 1);
    assert_eq!(points, vec![InputPoint::new(1.0, 1.0, 5.0).with_divisor(2.0)]);
}

// ============================================================================
// Kernel Pass Tests
// ============================================================================

/// Test sums at a grid point that coincides with an input point.
#[test]
fn test_kernel_point_sums() {
    let points = vec![InputPoint::new(0.0, 0.0, 3.0).with_divisor(2.0)];
    let inputs = KernelInputs::new(&points, &line_grid(vec![0.0, 1.0]));
    assert_eq!(inputs.grid_len(), 2);
    assert_eq!(inputs.points_len(), 1);

    let (num, den) = kernel_point_sums(&inputs, &stewart(), 0);
    assert_relative_eq!(num, 3.0, epsilon = 1e-12);
    assert_relative_eq!(den, 2.0, epsilon = 1e-12);

    let (far, _) = kernel_point_sums(&inputs, &stewart(), 1);
    assert!(far < num && far > 0.0);
}

/// Test that ratio mode is only enabled when every point has a divisor.
#[test]
fn test_ratio_mode_detection() {
    let grid = line_grid(vec![0.0]);
    let mixed = vec![
        InputPoint::new(0.0, 0.0, 1.0).with_divisor(1.0),
        InputPoint::new(0.0, 0.0, 1.0),
    ];
    assert!(KernelInputs::new(&mixed, &grid).divisors.is_none());

    let sums = smooth_pass_sequential(&KernelInputs::new(&sample_points(), &grid), &stewart())
        .unwrap();
    assert_eq!(sums.numerator.len(), 1);
    assert!(sums.denominator.is_none());
}

/// Test finalization of plain sums.
///
/// Verifies that KDE sums are scaled by the resolution in km and Stewart
/// sums are returned as is.
#[test]
fn test_finalize_plain_sums() {
    let sums = KernelSums {
        numerator: vec![1.0, 2.0],
        denominator: None,
    };

    let (z, no_data) = finalize_sums(sums.clone(), &stewart(), 0.5);
    assert_eq!(z, vec![1.0, 2.0]);
    assert_eq!(no_data, 0);

    let kde = DecayKernel::kde(KdeKernel::Gaussian, 25.0);
    let (z, _) = finalize_sums(sums, &kde, 0.5);
    assert_relative_eq!(z[0], degrees_to_km(0.5), max_relative = 1e-12);
    assert_relative_eq!(z[1], 2.0 * degrees_to_km(0.5), max_relative = 1e-12);
}

/// Test finalization of ratio sums.
///
/// Verifies that a zero or near-zero denominator yields NaN and is counted.
#[test]
fn test_finalize_ratio_sums() {
    let sums = KernelSums {
        numerator: vec![2.0, 1.0, 0.0],
        denominator: Some(vec![4.0, 0.0, 1e-13]),
    };
    let (z, no_data) = finalize_sums(sums, &stewart(), 1.0);
    assert_relative_eq!(z[0], 0.5);
    assert!(z[1].is_nan());
    assert!(z[2].is_nan());
    assert_eq!(no_data, 2);
}

// ============================================================================
// Executor Tests
// ============================================================================

/// Test that unit divisors turn the plain potential into a weighted mean.
///
/// Verifies that the ratio result equals the plain potential of the values
/// divided by the plain potential of a unit-valued layer.
#[test]
fn test_ratio_equals_ratio_of_potentials() {
    let grid = make_grid(&GridParameters::new(BBox::new(0.0, 0.0, 2.0, 1.0), 0.25)).unwrap();
    let executor = SmoothingExecutor::new(config(stewart()));

    let values = executor.smooth_points(&sample_points(), &grid).unwrap();
    let ones: Vec<InputPoint> = sample_points()
        .iter()
        .map(|p| InputPoint::new(p.lon, p.lat, 1.0))
        .collect();
    let weights = executor.smooth_points(&ones, &grid).unwrap();
    let ratio_points: Vec<InputPoint> = sample_points()
        .iter()
        .map(|p| p.with_divisor(1.0))
        .collect();
    let ratio = executor.smooth_points(&ratio_points, &grid).unwrap();

    assert_eq!(ratio.z.len(), grid.len());
    for i in 0..grid.len() {
        assert_relative_eq!(ratio.z[i], values.z[i] / weights.z[i], max_relative = 1e-9);
    }
}

/// Test that unit divisors reproduce a constant field exactly.
///
/// Verifies that every cell equals the common value whatever the distance
/// to the points, for Stewart and KDE kernels.
#[test]
fn test_ratio_unit_divisors_constant_values() {
    let grid = make_grid(&GridParameters::new(BBox::new(-1.0, -1.0, 3.0, 2.0), 0.5)).unwrap();
    let points: Vec<InputPoint> = sample_points()
        .iter()
        .map(|p| InputPoint::new(p.lon, p.lat, 7.0).with_divisor(1.0))
        .collect();

    let kernels = [
        DecayKernel::stewart(StewartFunction::Pareto, 0.01, 2.0),
        DecayKernel::kde(KdeKernel::Gaussian, 150.0),
    ];
    for kernel in kernels {
        let result = SmoothingExecutor::new(config(kernel))
            .smooth_points(&points, &grid)
            .unwrap();
        assert_eq!(result.no_data, 0);
        for z in &result.z {
            assert_relative_eq!(*z, 7.0, max_relative = 1e-12);
        }
    }
}

/// Test that mixing points with and without divisor is rejected.
#[test]
fn test_mixed_divisors_rejected() {
    let executor = SmoothingExecutor::new(config(stewart()));
    let points = vec![
        InputPoint::new(0.0, 0.0, 1.0).with_divisor(2.0),
        InputPoint::new(1.0, 0.0, 1.0),
    ];

    assert!(matches!(
        executor
            .smooth_points(&points, &line_grid(vec![0.0, 1.0]))
            .unwrap_err(),
        ThematicError::InvalidInput(_)
    ));
}

/// Test that compact kernels leave distant ratio cells without data.
#[test]
fn test_ratio_no_data_outside_support() {
    let executor = SmoothingExecutor::new(config(DecayKernel::kde(KdeKernel::Uniform, 10.0)));
    let points = vec![InputPoint::new(0.0, 0.0, 6.0).with_divisor(3.0)];

    let result = executor
        .smooth_points(&points, &line_grid(vec![0.0, 5.0]))
        .unwrap();
    assert_relative_eq!(result.z[0], 2.0, epsilon = 1e-12);
    assert!(result.z[1].is_nan());
    assert_eq!(result.no_data, 1);
}

/// Test smoothing a layer end to end.
///
/// Verifies:
/// - The grid covers the layer extent at the requested resolution
/// - Excluded features are reported
/// - The potential peaks at the heaviest point
#[test]
fn test_smooth_layer() {
    let layer: FeatureCollection = vec![
        Feature::new(point! { x: 0.0, y: 0.0 }).with_property("pop", 100.0),
        Feature::new(point! { x: 2.0, y: 0.0 }).with_property("pop", 1.0),
        Feature::new(point! { x: 2.0, y: 1.0 }).with_property("pop", 1.0),
        Feature::new(point! { x: 1.0, y: 1.0 }),
    ]
    .into_iter()
    .collect();

    let mut cfg = config(stewart());
    cfg.resolution = Some(0.5);
    let result = SmoothingExecutor::new(cfg).smooth(&layer, "pop", None).unwrap();

    assert_eq!(result.excluded, 1);
    assert_eq!(result.no_data, 0);
    assert_eq!((result.width(), result.height()), (5, 3));
    assert_eq!(result.z.len(), 15);

    let peak = result
        .z
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(result.grid.coord(peak), (0.0, 0.0));
}

/// Test that a single point yields a radially symmetric field.
///
/// Verifies:
/// - Cells at equal distance from the point hold equal values
/// - Values never increase with distance
#[test]
fn test_single_point_radial_symmetry() {
    let grid = make_grid(&GridParameters::new(BBox::new(-2.0, -2.0, 2.0, 2.0), 0.5)).unwrap();
    assert_eq!((grid.width, grid.height), (9, 9));
    let points = vec![InputPoint::new(0.0, 0.0, 50.0)];
    let kernels = [
        DecayKernel::stewart(
            StewartFunction::Exponential,
            StewartFunction::Exponential.alpha_from_span(100.0, 2.0),
            2.0,
        ),
        DecayKernel::kde(KdeKernel::Gaussian, 120.0),
    ];

    for kernel in kernels {
        let result = SmoothingExecutor::new(config(kernel))
            .smooth_points(&points, &grid)
            .unwrap();

        let mut cells: Vec<(f64, f64)> = (0..grid.len())
            .map(|i| {
                let (x, y) = grid.coord(i);
                (haversine_km(0.0, 0.0, x, y), result.z[i])
            })
            .collect();
        cells.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut equidistant = 0;
        for w in cells.windows(2) {
            if (w[1].0 - w[0].0).abs() <= 1e-9 * w[1].0 {
                assert_relative_eq!(w[0].1, w[1].1, max_relative = 1e-12);
                equidistant += 1;
            } else {
                assert!(w[1].1 <= w[0].1);
            }
        }
        assert!(equidistant >= 40);

        let at = |col: usize, row: usize| result.z[row * grid.width + col];
        assert_relative_eq!(at(1, 4), at(7, 4), max_relative = 1e-12);
        assert_relative_eq!(at(4, 1), at(4, 7), max_relative = 1e-12);
        assert_relative_eq!(at(1, 4), at(4, 1), max_relative = 1e-12);
    }
}

/// Test smoothing a layer with a single point and no resolution.
///
/// Verifies that the flat extent is widened around the point and that the
/// field peaks on it.
#[test]
fn test_smooth_single_point_layer() {
    let layer: FeatureCollection = vec![Feature::new(point! { x: 2.0, y: 45.0 })
        .with_property("pop", 10.0)]
    .into_iter()
    .collect();

    let kernel = DecayKernel::stewart(
        StewartFunction::Exponential,
        StewartFunction::Exponential.alpha_from_span(50.0, 2.0),
        2.0,
    );
    let result = SmoothingExecutor::new(config(kernel))
        .smooth(&layer, "pop", None)
        .unwrap();

    assert_eq!(result.width(), result.height());
    assert!(result.width() > 1);

    let (x_min, x_max) = (result.grid.xs[0], result.grid.xs[result.width() - 1]);
    assert!(x_min < 2.0 && x_max > 2.0);
    assert_relative_eq!(x_max - x_min, 2.0 * 100.0 / degrees_to_km(1.0), max_relative = 1e-6);

    let peak = result
        .z
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    let (px, py) = result.grid.coord(peak);
    assert!((px - 2.0).abs() <= result.grid.resolution);
    assert!((py - 45.0).abs() <= result.grid.resolution);
}

/// Test smoothing points that share a latitude, with no resolution.
///
/// Verifies that the flat axis takes the extent of the other one.
#[test]
fn test_smooth_collinear_layer() {
    let layer: FeatureCollection = vec![
        Feature::new(point! { x: 0.0, y: 45.0 }).with_property("pop", 10.0),
        Feature::new(point! { x: 2.0, y: 45.0 }).with_property("pop", 20.0),
        Feature::new(point! { x: 4.0, y: 45.0 }).with_property("pop", 30.0),
    ]
    .into_iter()
    .collect();

    let result = SmoothingExecutor::new(config(stewart()))
        .smooth(&layer, "pop", None)
        .unwrap();

    assert_eq!(result.width(), result.height());
    assert!(result.height() > 1);
    let (y_min, y_max) = (result.grid.ys[0], result.grid.ys[result.height() - 1]);
    assert!(y_min < 45.0 && y_max > 45.0);
    assert_eq!(result.no_data, 0);
}

/// Test smoothing inputs that leave nothing to smooth.
#[test]
fn test_empty_input_set() {
    let executor = SmoothingExecutor::new(config(stewart()));
    let layer: FeatureCollection = vec![Feature::new(point! { x: 0.0, y: 0.0 })]
        .into_iter()
        .collect();

    assert_eq!(
        executor.smooth(&layer, "pop", None).unwrap_err(),
        ThematicError::EmptyInputSet
    );
    assert_eq!(
        executor
            .smooth(&FeatureCollection::default(), "pop", None)
            .unwrap_err(),
        ThematicError::EmptyInputSet
    );

    let nan = vec![InputPoint::new(0.0, f64::NAN, 1.0)];
    assert_eq!(
        executor
            .smooth_points(&nan, &line_grid(vec![0.0]))
            .unwrap_err(),
        ThematicError::EmptyInputSet
    );
}

/// Test that non-finite raw points are dropped and counted.
#[test]
fn test_smooth_points_excludes_non_finite() {
    let executor = SmoothingExecutor::new(config(stewart()));
    let mut points = sample_points();
    points.push(InputPoint::new(0.0, 0.0, f64::INFINITY));
    points.push(InputPoint::new(0.0, 0.0, 1.0).with_divisor(f64::NAN));

    let result = executor.smooth_points(&points, &line_grid(vec![0.0, 1.0])).unwrap();
    assert_eq!(result.excluded, 2);
}

// ============================================================================
// Backend Tests
// ============================================================================

/// Test that an injected pass replaces the sequential one.
#[test]
fn test_custom_pass_is_used() {
    let mut cfg = config(stewart());
    cfg.custom_smooth_pass = Some(constant_pass);
    let result = SmoothingExecutor::new(cfg)
        .smooth_points(&sample_points(), &line_grid(vec![0.0, 1.0, 2.0]))
        .unwrap();
    assert_eq!(result.z, vec![7.0, 7.0, 7.0]);
}

/// Test a GPU request without a GPU pass.
///
/// Verifies:
/// - The error is surfaced without fallback
/// - With fallback, the sequential result is returned
#[test]
fn test_gpu_unavailable_and_fallback() {
    let grid = line_grid(vec![0.0, 1.0, 2.0]);
    let mut cfg = config(stewart());
    cfg.backend = Backend::GPU;

    let err = SmoothingExecutor::new(cfg.clone())
        .smooth_points(&sample_points(), &grid)
        .unwrap_err();
    assert!(matches!(err, ThematicError::ComputeBackendUnavailable(_)));

    cfg.cpu_fallback = true;
    let fallback = SmoothingExecutor::new(cfg)
        .smooth_points(&sample_points(), &grid)
        .unwrap();
    let cpu = SmoothingExecutor::new(config(stewart()))
        .smooth_points(&sample_points(), &grid)
        .unwrap();
    assert_eq!(fallback.z, cpu.z);
}

/// Test that a failing injected pass falls back only when allowed.
#[test]
fn test_failing_pass_fallback() {
    let grid = line_grid(vec![0.0, 1.0]);
    let mut cfg = config(stewart());
    cfg.custom_smooth_pass = Some(unavailable_pass);

    assert!(SmoothingExecutor::new(cfg.clone())
        .smooth_points(&sample_points(), &grid)
        .is_err());

    cfg.cpu_fallback = true;
    let result = SmoothingExecutor::new(cfg)
        .smooth_points(&sample_points(), &grid)
        .unwrap();
    assert_eq!(result.z.len(), 2);
    assert!(result.z.iter().all(|v| v.is_finite()));
}

// ============================================================================
// Progress Tests
// ============================================================================

static EVENTS: Mutex<Vec<Progress>> = Mutex::new(Vec::new());

fn record(progress: Progress) {
    EVENTS.lock().unwrap().push(progress);
}

/// Test the lifecycle stages reported while smoothing a layer.
#[test]
fn test_progress_callback() {
    let layer: FeatureCollection = vec![
        Feature::new(point! { x: 0.0, y: 0.0 }).with_property("pop", 1.0),
        Feature::new(point! { x: 1.0, y: 1.0 }).with_property("pop", 2.0),
    ]
    .into_iter()
    .collect();

    let mut cfg = config(stewart());
    cfg.resolution = Some(0.5);
    cfg.on_progress = Some(record);
    SmoothingExecutor::new(cfg).smooth(&layer, "pop", None).unwrap();

    let events = EVENTS.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            Progress::PreparingData,
            Progress::BuildingGrid,
            Progress::RunningKernel {
                backend: Backend::CPU
            },
            Progress::Finalizing,
        ]
    );
}
