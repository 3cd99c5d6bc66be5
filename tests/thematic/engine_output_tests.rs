#![cfg(feature = "dev")]
//! Tests for result types.
//!
//! These tests verify:
//! - Derived quantities of classification results
//! - Rasters, summaries and default thresholds of smoothed grids
//! - Conversion of discontinuity results to line layers
//! - Human-readable display of every result
//!
//! ## Test Organization
//!
//! 1. **Classification Result** - Class lookup and conversion
//! 2. **Smoothed Grid** - Raster view, thresholds, isobands
//! 3. **Discontinuity Result** - Line layer
//! 4. **Display** - Formatting

use approx::assert_relative_eq;
use geo::{line_string, MultiLineString};
use serde_json::json;

use thematic::internals::algorithms::classification::{ClassificationMethod, IntervalClosure};
use thematic::internals::algorithms::combiner::ClassedVariable;
use thematic::internals::algorithms::discontinuity::{DiscontinuityEdge, DiscontinuityMode};
use thematic::internals::algorithms::grid::PointGrid;
use thematic::internals::engine::output::{
    ClassificationResult, DiscontinuityResult, SmoothedGrid,
};
use thematic::internals::primitives::errors::ThematicError;
use thematic::internals::primitives::layer::FeatureId;

fn quartiles() -> ClassificationResult<f64> {
    ClassificationResult {
        breaks: vec![1.0, 3.25, 5.5, 7.75, 10.0],
        entities_by_class: vec![3, 2, 2, 3],
        method: ClassificationMethod::Quantile,
        closure: IntervalClosure::Right,
        excluded: 1,
        outside: 0,
        palette: Some("Blues".to_string()),
        no_data_color: None,
    }
}

/// Smoothed grid of `width x height` with the given values.
fn smoothed(width: usize, height: usize, z: Vec<f64>) -> SmoothedGrid {
    SmoothedGrid {
        grid: PointGrid {
            width,
            height,
            xs: (0..width).map(|i| i as f64).collect(),
            ys: (0..height).map(|i| i as f64).collect(),
            resolution: 1.0,
        },
        z,
        no_data: 0,
        excluded: 0,
    }
}

fn discontinuities() -> DiscontinuityResult {
    let border = MultiLineString::new(vec![line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
    DiscontinuityResult {
        edges: vec![
            DiscontinuityEdge {
                feature_a: FeatureId::from("FR"),
                feature_b: FeatureId::from("BE"),
                geometry: border.clone(),
                value: 3.0,
            },
            DiscontinuityEdge {
                feature_a: FeatureId::from(7),
                feature_b: FeatureId::from(9),
                geometry: border,
                value: 1.5,
            },
        ],
        mode: DiscontinuityMode::Relative,
        skipped: 2,
    }
}

// ============================================================================
// Classification Result Tests
// ============================================================================

/// Test derived quantities of a classification result.
#[test]
fn test_classification_result_helpers() {
    let result = quartiles();
    assert_eq!(result.classes(), 4);
    assert_eq!(result.classified(), 10);
    assert_eq!(result.class_of(3.25), Some(0));
    assert_eq!(result.class_of(3.3), Some(1));
    assert_eq!(result.class_of(10.0), Some(3));
    assert_eq!(result.class_of(11.0), None);
}

/// Test conversion to a combinable variable.
#[test]
fn test_classification_result_to_classed_variable() {
    let result = quartiles();
    let variable = ClassedVariable::from(&result);
    assert_eq!(variable.breaks, result.breaks);
    assert_eq!(variable.closure, IntervalClosure::Right);
    assert_eq!(ClassedVariable::from(result).classes(), 4);
}

// ============================================================================
// Smoothed Grid Tests
// ============================================================================

/// Test the raster view of a smoothed grid.
///
/// Verifies row-major layout and shape mismatch detection.
#[test]
fn test_smoothed_grid_raster() {
    let grid = smoothed(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    let raster = grid.raster().unwrap();
    assert_eq!(raster.dim(), (2, 3));
    assert_eq!(raster[[1, 0]], 3.0);

    let broken = smoothed(3, 2, vec![0.0; 5]);
    assert!(matches!(
        broken.raster().unwrap_err(),
        ThematicError::InvalidGridShape { expected: (2, 3), .. }
    ));
}

/// Test the summary of finite grid values.
#[test]
fn test_smoothed_grid_summary() {
    let grid = smoothed(2, 2, vec![1.0, f64::NAN, 3.0, 5.0]);
    let summary = grid.summary().unwrap();
    assert_eq!(summary.population, 3);
    assert_eq!(summary.maximum, 5.0);
    assert_relative_eq!(summary.mean, 3.0);

    assert!(smoothed(1, 1, vec![f64::NAN]).summary().is_none());
}

/// Test default isoband thresholds.
///
/// Verifies:
/// - Rounded fractions of the maximum followed by the maximum
/// - Collapsed fractions on small ranges
/// - No thresholds without data
#[test]
fn test_default_thresholds() {
    let grid = smoothed(2, 1, vec![3.0, 1000.0]);
    assert_eq!(
        grid.default_thresholds(),
        vec![0.0, 40.0, 100.0, 250.0, 400.0, 550.0, 785.0, 925.0, 1000.0]
    );

    let small = smoothed(2, 1, vec![0.2, 1.0]);
    assert_eq!(small.default_thresholds(), vec![0.0, 1.0]);

    assert!(smoothed(1, 1, vec![f64::NAN]).default_thresholds().is_empty());
}

/// Test isobands of a smoothed grid.
#[test]
fn test_smoothed_grid_isobands() {
    let grid = smoothed(3, 2, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    let bands = grid.isobands(&[0.0, 1.0, 2.0], "density").unwrap();

    assert_eq!(bands.len(), 2);
    assert_eq!(bands.features[0].numeric_property("density"), Some(0.5));
    assert_eq!(bands.features[1].numeric_property("max_v"), Some(2.0));

    assert!(grid.isobands(&[1.0], "density").is_err());
    assert!(grid.isobands(&[2.0, 1.0], "density").is_err());
}

// ============================================================================
// Discontinuity Result Tests
// ============================================================================

/// Test the line layer of a discontinuity result.
///
/// Verifies that identifiers keep their JSON type.
#[test]
fn test_discontinuity_feature_collection() {
    let result = discontinuities();
    assert_eq!(result.len(), 2);
    assert!(!result.is_empty());
    assert_eq!(result.values(), vec![3.0, 1.5]);

    let layer = result.to_feature_collection();
    assert_eq!(layer.len(), 2);
    let first = &layer.features[0];
    assert_eq!(first.properties["value"], json!(3.0));
    assert_eq!(first.properties["ID-feature1"], json!("FR"));
    assert_eq!(first.properties["ID-feature2"], json!("BE"));
    assert_eq!(layer.features[1].properties["ID-feature1"], json!(7));
    assert!(matches!(
        first.geometry,
        geo::Geometry::MultiLineString(_)
    ));
}

// ============================================================================
// Display Tests
// ============================================================================

/// Test human-readable output of every result.
#[test]
fn test_result_display() {
    let text = quartiles().to_string();
    assert!(text.contains("Method:   Quantile"));
    assert!(text.contains("Classes:  4"));
    assert!(text.contains("Excluded: 1"));
    assert!(!text.contains("Outside"));

    let text = smoothed(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).to_string();
    assert!(text.contains("Grid:     3 x 2"));
    assert!(text.contains("Maximum:  5.000000"));

    let text = discontinuities().to_string();
    assert!(text.contains("Mode:    Relative"));
    assert!(text.contains("Skipped: 2"));
    assert!(text.contains("FR"));
}
