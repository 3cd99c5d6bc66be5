#![cfg(feature = "dev")]
//! Tests for sample-point grid generation.
//!
//! These tests verify:
//! - Centred sampling of boxes up to a hemisphere
//! - Stepped sampling of wider boxes
//! - Padding and clamping to the geographic domain
//! - Default resolution from a target cell count
//!
//! ## Test Organization
//!
//! 1. **Bounding Box** - Helpers and conversions
//! 2. **Sampling** - Centred and wide samplers
//! 3. **Padding** - Expansion and clamping
//! 4. **Errors** - Invalid parameters

use approx::assert_relative_eq;
use geo::{coord, Rect};

use thematic::internals::algorithms::grid::{
    appropriate_resolution, make_grid, BBox, GridParameters, DEFAULT_GRID_CELLS,
};
use thematic::internals::primitives::errors::ThematicError;

fn assert_axis(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = 1e-9);
    }
}

// ============================================================================
// Bounding Box Tests
// ============================================================================

/// Test bounding-box helpers.
#[test]
fn test_bbox_helpers() {
    let bbox = BBox::new(-10.0, 0.0, 10.0, 5.0);
    assert_eq!(bbox.width(), 20.0);
    assert_eq!(bbox.height(), 5.0);
    assert_eq!(bbox.area(), 100.0);
    assert!(bbox.is_valid());
    assert!(!BBox::new(1.0, 0.0, 0.0, 1.0).is_valid());
    assert!(!BBox::new(0.0, 0.0, f64::NAN, 1.0).is_valid());

    let rect = Rect::new(coord! { x: 1.0, y: 2.0 }, coord! { x: 3.0, y: 4.0 });
    assert_eq!(BBox::from(rect), BBox::new(1.0, 2.0, 3.0, 4.0));
}

// ============================================================================
// Sampling Tests
// ============================================================================

/// Test a box whose extent is a multiple of the resolution.
///
/// Verifies:
/// - Both corners are sampled
/// - Points are row-major (y outer, x inner)
#[test]
fn test_centred_grid_exact_fit() {
    let grid = make_grid(&GridParameters::new(BBox::new(0.0, 0.0, 10.0, 4.0), 2.0)).unwrap();

    assert_axis(&grid.xs, &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_axis(&grid.ys, &[0.0, 2.0, 4.0]);
    assert_eq!(grid.width, 6);
    assert_eq!(grid.height, 3);
    assert_eq!(grid.len(), 18);
    assert_eq!(grid.points().count(), grid.len());

    assert_eq!(grid.coord(0), (0.0, 0.0));
    assert_eq!(grid.coord(1), (2.0, 0.0));
    assert_eq!(grid.coord(6), (0.0, 2.0));

    let (lon, lat) = grid.flattened();
    assert_eq!(lon.len(), 18);
    assert_eq!((lon[7], lat[7]), grid.coord(7));
}

/// Test that the leftover extent is split evenly between both ends.
#[test]
fn test_centred_grid_leftover() {
    let grid = make_grid(&GridParameters::new(BBox::new(0.0, 0.0, 10.0, 10.0), 3.0)).unwrap();
    assert_axis(&grid.xs, &[0.5, 3.5, 6.5, 9.5]);
    assert_axis(&grid.ys, &[0.5, 3.5, 6.5, 9.5]);
}

/// Test a degenerate (zero-extent) box.
#[test]
fn test_degenerate_box_single_point() {
    let grid = make_grid(&GridParameters::new(BBox::new(3.0, 4.0, 3.0, 4.0), 1.0)).unwrap();
    assert_eq!(grid.len(), 1);
    assert_eq!(grid.coord(0), (3.0, 4.0));
}

/// Test the wide sampler on the whole globe.
///
/// Verifies that sampling starts at the minimum corner and stays in the domain.
#[test]
fn test_wide_grid_whole_globe() {
    let grid =
        make_grid(&GridParameters::new(BBox::new(-180.0, -90.0, 180.0, 90.0), 30.0)).unwrap();

    assert_eq!(grid.width, 13);
    assert_eq!(grid.height, 7);
    assert_eq!(grid.xs[0], -180.0);
    assert_eq!(grid.ys[0], -90.0);
    assert_relative_eq!(grid.xs[12], 180.0, epsilon = 1e-9);
    assert!(grid
        .points()
        .all(|p| (-180.0..=180.0).contains(&p.x()) && (-90.0..=90.0).contains(&p.y())));
}

/// Test the wide sampler when the resolution does not divide the extent.
#[test]
fn test_wide_grid_partial_step() {
    let grid = make_grid(&GridParameters::new(BBox::new(-100.0, 0.0, 100.0, 10.0), 70.0)).unwrap();
    assert_axis(&grid.xs, &[-100.0, -30.0, 40.0]);
}

// ============================================================================
// Padding Tests
// ============================================================================

/// Test padding of the box before sampling.
#[test]
fn test_padding_expands_box() {
    let params = GridParameters::new(BBox::new(0.0, 0.0, 10.0, 10.0), 1.0).with_pad(0.1);
    let grid = make_grid(&params).unwrap();
    assert_eq!(grid.width, 13);
    assert_relative_eq!(grid.xs[0], -1.0, epsilon = 1e-9);
    assert_relative_eq!(grid.xs[12], 11.0, epsilon = 1e-9);
}

/// Test that a padded box is clamped to the geographic domain.
#[test]
fn test_padding_is_clamped() {
    let params = GridParameters::new(BBox::new(170.0, 80.0, 180.0, 90.0), 1.0).with_pad(0.5);
    let grid = make_grid(&params).unwrap();

    assert_relative_eq!(grid.xs[0], 165.0, epsilon = 1e-9);
    assert_relative_eq!(grid.xs[grid.width - 1], 180.0, epsilon = 1e-9);
    assert_relative_eq!(grid.ys[grid.height - 1], 90.0, epsilon = 1e-9);
    assert!(grid.points().all(|p| p.x() <= 180.0 && p.y() <= 90.0));
}

// ============================================================================
// Resolution Tests
// ============================================================================

/// Test the default resolution: `sqrt(area / n)`.
#[test]
fn test_appropriate_resolution() {
    let bbox = BBox::new(0.0, 0.0, 100.0, 25.0);
    assert_relative_eq!(
        appropriate_resolution(&bbox, DEFAULT_GRID_CELLS).unwrap(),
        1.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(appropriate_resolution(&bbox, 100).unwrap(), 5.0);
}

/// Test default resolution errors.
#[test]
fn test_appropriate_resolution_errors() {
    let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(appropriate_resolution(&bbox, 0).is_err());
    assert!(appropriate_resolution(&BBox::new(1.0, 1.0, 1.0, 5.0), 10).is_err());
}

// ============================================================================
// Error Tests
// ============================================================================

/// Test invalid grid parameters.
///
/// Verifies that resolution, box and padding are each reported by name.
#[test]
fn test_make_grid_errors() {
    let bbox = BBox::new(0.0, 0.0, 1.0, 1.0);

    for res in [0.0, -1.0, f64::NAN] {
        assert!(matches!(
            make_grid(&GridParameters::new(bbox, res)).unwrap_err(),
            ThematicError::InvalidParameter { name: "resolution", .. }
        ));
    }
    assert!(matches!(
        make_grid(&GridParameters::new(BBox::new(1.0, 0.0, 0.0, 1.0), 0.1)).unwrap_err(),
        ThematicError::InvalidParameter { name: "bbox", .. }
    ));
    assert!(matches!(
        make_grid(&GridParameters::new(bbox, 0.1).with_pad(-0.2)).unwrap_err(),
        ThematicError::InvalidParameter { name: "pad", .. }
    ));
}
