//! Output types for classification, smoothing and discontinuity operations.
//!
//! ## Purpose
//!
//! This module defines the immutable records returned to callers:
//! [`ClassificationResult`], [`SmoothedGrid`] and [`DiscontinuityResult`].
//!
//! ## Design notes
//!
//! * **Countable exclusion**: Every result reports how many inputs were
//!   dropped (non-finite values, missing adjacency values).
//! * **Ergonomics**: Implements `Display` for human-readable output.
//! * **Opaque styling**: Palette and no-data colour are carried, never read.
//!
//! ## Invariants
//!
//! * `entities_by_class.len() + 1 == breaks.len()`.
//! * `z.len() == grid.width * grid.height`.
//! * Discontinuity edges are sorted descending by value.
//!
//! ## Non-goals
//!
//! * This module does not perform calculations beyond light derivations.
//! * This module does not provide serialization/deserialization logic.

// External dependencies
use core::fmt::{Display, Formatter, Result};
use ndarray::ArrayView2;
use num_traits::Float;

// Internal dependencies
use crate::algorithms::classification::{class_of, ClassificationMethod, IntervalClosure};
use crate::algorithms::combiner::ClassedVariable;
use crate::algorithms::discontinuity::{DiscontinuityEdge, DiscontinuityMode};
use crate::algorithms::grid::PointGrid;
use crate::algorithms::isobands::{bands_to_features, extract_bands};
use crate::engine::validator::Validator;
use crate::math::stats::Summary;
use crate::primitives::errors::ThematicError;
use crate::primitives::layer::{Feature, FeatureCollection};
use crate::primitives::series::sort_floats;

/// Fractions of the maximum used as default isoband thresholds.
const DEFAULT_THRESHOLD_FRACTIONS: [f64; 8] = [0.0, 0.04, 0.1, 0.25, 0.4, 0.55, 0.785, 0.925];

// ============================================================================
// Classification Result
// ============================================================================

/// Breaks and per-class counts of a classified series.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult<T> {
    /// Strictly increasing class breaks (length = classes + 1).
    pub breaks: Vec<T>,

    /// Number of finite values per class.
    pub entities_by_class: Vec<usize>,

    /// Method used.
    pub method: ClassificationMethod,

    /// Closure used to assign values.
    pub closure: IntervalClosure,

    /// Number of null or non-finite entries excluded.
    pub excluded: usize,

    /// Number of finite values outside the breaks (manual breaks only).
    pub outside: usize,

    /// Palette reference.
    pub palette: Option<String>,

    /// No-data colour.
    pub no_data_color: Option<String>,
}

impl<T: Float> ClassificationResult<T> {
    /// Number of classes.
    pub fn classes(&self) -> usize {
        self.entities_by_class.len()
    }

    /// Class of a value under this result's closure.
    pub fn class_of(&self, value: T) -> Option<usize> {
        class_of(value, &self.breaks, self.closure)
    }

    /// Number of classified values.
    pub fn classified(&self) -> usize {
        self.entities_by_class.iter().sum()
    }
}

impl<T: Float> From<&ClassificationResult<T>> for ClassedVariable<T> {
    fn from(result: &ClassificationResult<T>) -> Self {
        ClassedVariable::new(result.breaks.clone(), result.closure)
    }
}

impl<T: Float> From<ClassificationResult<T>> for ClassedVariable<T> {
    fn from(result: ClassificationResult<T>) -> Self {
        ClassedVariable::new(result.breaks, result.closure)
    }
}

impl<T: Float + Display> Display for ClassificationResult<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Method:   {}", self.method.name())?;
        writeln!(f, "  Closure:  {:?}", self.closure)?;
        writeln!(f, "  Classes:  {}", self.classes())?;
        if self.excluded > 0 {
            writeln!(f, "  Excluded: {}", self.excluded)?;
        }
        if self.outside > 0 {
            writeln!(f, "  Outside:  {}", self.outside)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>14} {:>14} {:>8}", "From", "To", "Count")?;
        writeln!(f, "{}", "-".repeat(38))?;
        for (i, count) in self.entities_by_class.iter().enumerate() {
            writeln!(
                f,
                "{:>14.4} {:>14.4} {:>8}",
                self.breaks[i], self.breaks[i + 1], count
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Smoothed Grid
// ============================================================================

/// Scalar field sampled on a point grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedGrid {
    /// Sample points.
    pub grid: PointGrid,

    /// One value per grid point, row-major; NaN marks no-data.
    pub z: Vec<f64>,

    /// Number of no-data cells.
    pub no_data: usize,

    /// Number of input features dropped before smoothing.
    pub excluded: usize,
}

impl SmoothedGrid {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.grid.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Values as a `(height, width)` raster.
    pub fn raster(&self) -> core::result::Result<ArrayView2<'_, f64>, ThematicError> {
        let expected = (self.grid.height, self.grid.width);
        ArrayView2::from_shape(expected, &self.z).map_err(|_| ThematicError::InvalidGridShape {
            expected,
            got: (self.z.len(), 1),
        })
    }

    /// Summary of the finite values.
    pub fn summary(&self) -> Option<Summary<f64>> {
        let mut finite: Vec<f64> = self.z.iter().copied().filter(|v| v.is_finite()).collect();
        sort_floats(&mut finite);
        Summary::from_sorted(&finite)
    }

    /// Default isoband thresholds: rounded fractions of the maximum, then
    /// the maximum itself.
    pub fn default_thresholds(&self) -> Vec<f64> {
        let Some(summary) = self.summary() else {
            return Vec::new();
        };
        let max = summary.maximum;
        let mut thresholds: Vec<f64> = DEFAULT_THRESHOLD_FRACTIONS
            .iter()
            .map(|&d| (d * max).round())
            .filter(|&t| t < max)
            .collect();
        thresholds.push(max);
        if thresholds.len() < 2 {
            thresholds.insert(0, summary.minimum.min(0.0));
        }
        sort_floats(&mut thresholds);
        thresholds.dedup();
        thresholds
    }

    /// Isobands of this grid.
    pub fn isobands(
        &self,
        thresholds: &[f64],
        variable: &str,
    ) -> core::result::Result<FeatureCollection, ThematicError> {
        Validator::validate_thresholds(thresholds)?;
        let raster = self.raster()?;
        let bands = extract_bands(raster, &self.grid.xs, &self.grid.ys, thresholds);
        Ok(bands_to_features(&bands, variable))
    }
}

impl Display for SmoothedGrid {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Grid:     {} x {}", self.width(), self.height())?;
        writeln!(f, "  No-data:  {}", self.no_data)?;
        writeln!(f, "  Excluded: {}", self.excluded)?;
        if let Some(summary) = self.summary() {
            writeln!(f, "  Minimum:  {:.6}", summary.minimum)?;
            writeln!(f, "  Maximum:  {:.6}", summary.maximum)?;
        }
        Ok(())
    }
}

// ============================================================================
// Discontinuity Result
// ============================================================================

/// Scored borders of a polygon layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscontinuityResult {
    /// Edges, sorted descending by value.
    pub edges: Vec<DiscontinuityEdge>,

    /// Mode used.
    pub mode: DiscontinuityMode,

    /// Adjacent pairs skipped because of a missing value.
    pub skipped: usize,
}

impl DiscontinuityResult {
    /// Number of edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no edge was produced.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Values in output order.
    pub fn values(&self) -> Vec<f64> {
        self.edges.iter().map(|e| e.value).collect()
    }

    /// Line layer with `value`, `ID-feature1` and `ID-feature2` properties.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        self.edges
            .iter()
            .map(|e| {
                Feature::new(e.geometry.clone())
                    .with_property("value", e.value)
                    .with_property("ID-feature1", e.feature_a.to_json())
                    .with_property("ID-feature2", e.feature_b.to_json())
            })
            .collect()
    }
}

impl Display for DiscontinuityResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Mode:    {}", self.mode.name())?;
        writeln!(f, "  Edges:   {}", self.edges.len())?;
        writeln!(f, "  Skipped: {}", self.skipped)?;
        writeln!(f)?;
        writeln!(f, "{:>12} {:>12} {:>14}", "Feature 1", "Feature 2", "Value")?;
        writeln!(f, "{}", "-".repeat(40))?;
        for e in &self.edges {
            writeln!(
                f,
                "{:>12} {:>12} {:>14.6}",
                e.feature_a.to_string(),
                e.feature_b.to_string(),
                e.value
            )?;
        }
        Ok(())
    }
}
