//! Regular sample-point grid over a geographic bounding box.
//!
//! ## Purpose
//!
//! This module produces the grid of points on which the smoothing kernel is
//! evaluated, and whose values are later reshaped into a raster for isoband
//! extraction.
//!
//! ## Design notes
//!
//! * **Two samplers**: Boxes up to a hemisphere use a centred sampler (the
//!   leftover extent is split evenly between both sides). Wider boxes use an
//!   explicit nested loop from the minimum corner with the same spacing.
//! * **Row-major**: Points are ordered with y outer and x inner, so point `i`
//!   sits at column `i % width` and row `i / width`.
//!
//! ## Invariants
//!
//! * Every point lies within `[-180, 180] x [-90, 90]`.
//! * `points().count() == width * height`.
//!
//! ## Non-goals
//!
//! * This module does not project coordinates; spacing is in degrees.

// External dependencies
use geo::{Point, Rect};

// Internal dependencies
use crate::primitives::errors::ThematicError;

/// Longitude span above which the wide sampler is used.
const WIDE_LON_SPAN: f64 = 180.0;

/// Latitude span above which the wide sampler is used.
const WIDE_LAT_SPAN: f64 = 90.0;

/// Slack absorbing floating error when counting steps.
const STEP_EPSILON: f64 = 1e-9;

// ============================================================================
// Bounding Box
// ============================================================================

/// Axis-aligned bounding box in longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum longitude.
    pub x_min: f64,

    /// Minimum latitude.
    pub y_min: f64,

    /// Maximum longitude.
    pub x_max: f64,

    /// Maximum latitude.
    pub y_max: f64,
}

impl BBox {
    /// Create a bounding box.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Longitude extent.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Latitude extent.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether all corners are finite and the box is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }

    /// Expand each axis by `fraction` of its extent on both sides.
    pub fn padded(&self, fraction: f64) -> Self {
        let (dx, dy) = (self.width() * fraction, self.height() * fraction);
        Self::new(
            self.x_min - dx,
            self.y_min - dy,
            self.x_max + dx,
            self.y_max + dy,
        )
    }

    /// Give each flat axis an extent of `span`, centred on its coordinate.
    pub fn widened(&self, span: f64) -> Self {
        let half = span / 2.0;
        let (mut x_min, mut x_max) = (self.x_min, self.x_max);
        let (mut y_min, mut y_max) = (self.y_min, self.y_max);
        if self.width() <= 0.0 {
            (x_min, x_max) = (x_min - half, x_max + half);
        }
        if self.height() <= 0.0 {
            (y_min, y_max) = (y_min - half, y_max + half);
        }
        Self::new(x_min, y_min, x_max, y_max)
    }

    /// Clamp to the geographic domain.
    pub fn clamped(&self) -> Self {
        Self::new(
            self.x_min.clamp(-180.0, 180.0),
            self.y_min.clamp(-90.0, 90.0),
            self.x_max.clamp(-180.0, 180.0),
            self.y_max.clamp(-90.0, 90.0),
        )
    }
}

impl From<Rect<f64>> for BBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

// ============================================================================
// Grid Parameters
// ============================================================================

/// Parameters of a sample-point grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParameters {
    /// Area to sample.
    pub bbox: BBox,

    /// Spacing between points, in degrees.
    pub resolution: f64,

    /// Fraction of the extent added on each side before sampling.
    pub pad_fraction: Option<f64>,
}

impl GridParameters {
    /// Grid parameters without padding.
    pub fn new(bbox: BBox, resolution: f64) -> Self {
        Self {
            bbox,
            resolution,
            pad_fraction: None,
        }
    }

    /// Set the padding fraction.
    pub fn with_pad(mut self, fraction: f64) -> Self {
        self.pad_fraction = Some(fraction);
        self
    }
}

// ============================================================================
// Point Grid
// ============================================================================

/// Row-major grid of sample points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    /// Number of columns.
    pub width: usize,

    /// Number of rows.
    pub height: usize,

    /// Longitude of each column.
    pub xs: Vec<f64>,

    /// Latitude of each row.
    pub ys: Vec<f64>,

    /// Spacing between points, in degrees.
    pub resolution: f64,
}

impl PointGrid {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Whether the grid holds no point.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of point `i` (row-major).
    pub fn coord(&self, i: usize) -> (f64, f64) {
        (self.xs[i % self.width], self.ys[i / self.width])
    }

    /// Points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point<f64>> + '_ {
        self.ys
            .iter()
            .flat_map(move |&y| self.xs.iter().map(move |&x| Point::new(x, y)))
    }

    /// Flattened longitudes and latitudes of every point.
    pub fn flattened(&self) -> (Vec<f64>, Vec<f64>) {
        self.points().map(|p| (p.x(), p.y())).unzip()
    }
}

// ============================================================================
// Grid Generation
// ============================================================================

/// Build the sample-point grid described by `params`.
pub fn make_grid(params: &GridParameters) -> Result<PointGrid, ThematicError> {
    let res = params.resolution;
    if !res.is_finite() || res <= 0.0 {
        return Err(ThematicError::invalid_parameter(
            "resolution",
            res,
            "must be positive and finite",
        ));
    }
    if !params.bbox.is_valid() {
        return Err(ThematicError::invalid_parameter(
            "bbox",
            params.bbox.area(),
            "must be finite and not inverted",
        ));
    }

    let bbox = match params.pad_fraction {
        Some(pad) if !pad.is_finite() || pad < 0.0 => {
            return Err(ThematicError::invalid_parameter(
                "pad",
                pad,
                "must be non-negative and finite",
            ))
        }
        Some(pad) => params.bbox.padded(pad),
        None => params.bbox,
    }
    .clamped();

    let wide = bbox.width() > WIDE_LON_SPAN || bbox.height() > WIDE_LAT_SPAN;
    let (xs, ys) = if wide {
        (
            stepped_axis(bbox.x_min, bbox.x_max, res),
            stepped_axis(bbox.y_min, bbox.y_max, res),
        )
    } else {
        (
            centred_axis(bbox.x_min, bbox.x_max, res),
            centred_axis(bbox.y_min, bbox.y_max, res),
        )
    };

    Ok(PointGrid {
        width: xs.len(),
        height: ys.len(),
        xs,
        ys,
        resolution: res,
    })
}

/// Axis with the leftover extent split evenly between both ends.
fn centred_axis(min: f64, max: f64, res: f64) -> Vec<f64> {
    let extent = max - min;
    let steps = (extent / res + STEP_EPSILON).floor() as usize;
    let start = min + (extent - steps as f64 * res) / 2.0;
    (0..=steps)
        .map(|i| (start + i as f64 * res).min(max))
        .collect()
}

/// Axis stepping by `res` from `min` while inside the box.
fn stepped_axis(min: f64, max: f64, res: f64) -> Vec<f64> {
    let mut axis = Vec::new();
    let mut i = 0usize;
    loop {
        let v = min + i as f64 * res;
        if v > max + STEP_EPSILON * res {
            break;
        }
        axis.push(v.min(max));
        i += 1;
    }
    axis
}

/// Number of cells targeted when no resolution is given.
pub const DEFAULT_GRID_CELLS: usize = 2500;

/// Resolution giving roughly `n` cells over `bbox`: `sqrt(area / n)`.
pub fn appropriate_resolution(bbox: &BBox, n: usize) -> Result<f64, ThematicError> {
    if n == 0 {
        return Err(ThematicError::invalid_parameter(
            "cells",
            0.0,
            "must request at least one cell",
        ));
    }
    let area = bbox.area();
    if !area.is_finite() || area <= 0.0 {
        return Err(ThematicError::invalid_parameter(
            "bbox",
            area,
            "area must be positive and finite",
        ));
    }
    Ok((area / n as f64).sqrt())
}
