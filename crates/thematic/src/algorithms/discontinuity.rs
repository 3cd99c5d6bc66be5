//! Shared-border mesh and discontinuity values.
//!
//! ## Purpose
//!
//! This module finds the borders shared by adjacent polygons of a layer and
//! scores each one by how much an attribute differs across it.
//!
//! ## Design notes
//!
//! * **Segment keys**: Polygon rings are snapped to a lattice over the layer
//!   extent; a segment is keyed by its unordered endpoints. The first feature
//!   to emit a segment owns it and any later feature emitting the same key is
//!   its neighbour along that segment.
//! * **Raw ordering**: Features are scanned in layer order, so the first
//!   ordering of a pair is always (earlier feature, later feature).
//! * **Geometry**: Border segments of a pair are chained back into lines,
//!   using the first original coordinate seen at each lattice point.
//!
//! ## Invariants
//!
//! * At most one border per unordered pair of features.
//! * Borders are listed in the order their pair was first encountered.
//!
//! ## Non-goals
//!
//! * Polygons that touch without sharing vertices (T-junctions) are not
//!   detected as neighbours along the unmatched part.

// External dependencies
use geo::{Coord, Geometry, LineString, MultiLineString, Polygon};
use std::collections::HashMap;

// Internal dependencies
use crate::algorithms::topology::{chain_segments, Lattice, LatticePoint};
use crate::primitives::layer::{FeatureCollection, FeatureId};
use crate::primitives::series::finite_value;

// ============================================================================
// Mode
// ============================================================================

/// Statistic computed across a border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscontinuityMode {
    /// `max(a / b, b / a)`.
    #[default]
    Relative,

    /// `max(a - b, b - a)`.
    Absolute,
}

impl DiscontinuityMode {
    /// Get the name of the mode.
    pub const fn name(&self) -> &'static str {
        match self {
            DiscontinuityMode::Relative => "Relative",
            DiscontinuityMode::Absolute => "Absolute",
        }
    }

    /// Discontinuity between two values.
    #[inline]
    pub fn value(&self, a: f64, b: f64) -> f64 {
        match self {
            DiscontinuityMode::Relative => (a / b).max(b / a),
            DiscontinuityMode::Absolute => (a - b).max(b - a),
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Border shared by two features (indices into the layer).
#[derive(Debug, Clone, PartialEq)]
pub struct SharedBorder {
    /// Feature that emitted the border first.
    pub first: usize,

    /// Neighbouring feature.
    pub second: usize,

    /// Border geometry.
    pub lines: MultiLineString<f64>,
}

/// Scored border between two features.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscontinuityEdge {
    /// Identifier of the first feature.
    pub feature_a: FeatureId,

    /// Identifier of the second feature.
    pub feature_b: FeatureId,

    /// Shared border.
    pub geometry: MultiLineString<f64>,

    /// Discontinuity value.
    pub value: f64,
}

/// Edges of a layer plus the number of pairs that could not be scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBorders {
    /// Edges, sorted descending by value.
    pub edges: Vec<DiscontinuityEdge>,

    /// Adjacent pairs skipped because a value was missing or the result NaN.
    pub skipped: usize,
}

// ============================================================================
// Shared Borders
// ============================================================================

fn polygons_of(geometry: &Geometry<f64>) -> Vec<&Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}

/// Whether the layer holds at least one polygon.
pub fn has_polygons(layer: &FeatureCollection) -> bool {
    layer
        .features
        .iter()
        .any(|f| !polygons_of(&f.geometry).is_empty())
}

/// Borders shared by adjacent polygons of `layer`.
pub fn shared_borders(layer: &FeatureCollection, quantization: f64) -> Vec<SharedBorder> {
    let Some(bbox) = layer.bounding_rect() else {
        return Vec::new();
    };
    let lattice = Lattice::new(bbox, quantization);

    type Segment = (LatticePoint, LatticePoint);
    let mut owner: HashMap<Segment, usize> = HashMap::new();
    let mut original: HashMap<LatticePoint, Coord<f64>> = HashMap::new();
    let mut pair_index: HashMap<(usize, usize), usize> = HashMap::new();
    let mut pairs: Vec<((usize, usize), Vec<Segment>)> = Vec::new();

    for (f, feature) in layer.features.iter().enumerate() {
        for polygon in polygons_of(&feature.geometry) {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
            for line in rings.flat_map(|ring| ring.lines()) {
                let (a, b) = (lattice.quantize(line.start), lattice.quantize(line.end));
                original.entry(a).or_insert(line.start);
                original.entry(b).or_insert(line.end);
                if a == b {
                    continue;
                }
                let key = if a < b { (a, b) } else { (b, a) };
                match owner.get(&key) {
                    None => {
                        owner.insert(key, f);
                    }
                    Some(&g) if g != f => {
                        let idx = *pair_index.entry((g, f)).or_insert_with(|| {
                            pairs.push(((g, f), Vec::new()));
                            pairs.len() - 1
                        });
                        pairs[idx].1.push(key);
                    }
                    Some(_) => {}
                }
            }
        }
    }

    pairs
        .into_iter()
        .map(|((first, second), segments)| {
            let lines = chain_segments(&segments)
                .into_iter()
                .map(|line| {
                    LineString::new(
                        line.iter()
                            .map(|p| original.get(p).copied().unwrap_or_else(|| lattice.dequantize(*p)))
                            .collect(),
                    )
                })
                .collect();
            SharedBorder {
                first,
                second,
                lines: MultiLineString::new(lines),
            }
        })
        .collect()
}

// ============================================================================
// Scoring
// ============================================================================

/// Score every shared border of `layer` on `variable`.
pub fn score_borders(
    layer: &FeatureCollection,
    variable: &str,
    mode: DiscontinuityMode,
    quantization: f64,
) -> ScoredBorders {
    let ids: Vec<FeatureId> = layer
        .features
        .iter()
        .enumerate()
        .map(|(i, f)| f.id.clone().unwrap_or(FeatureId::Number(i as u64)))
        .collect();
    let values: Vec<Option<f64>> = layer
        .numeric_series(variable)
        .into_iter()
        .map(finite_value)
        .collect();

    let mut skipped = 0;
    let mut edges = Vec::new();
    for border in shared_borders(layer, quantization) {
        let (Some(a), Some(b)) = (values[border.first], values[border.second]) else {
            skipped += 1;
            continue;
        };
        let value = mode.value(a, b);
        if value.is_nan() {
            skipped += 1;
            continue;
        }
        edges.push(DiscontinuityEdge {
            feature_a: ids[border.first].clone(),
            feature_b: ids[border.second].clone(),
            geometry: border.lines,
            value,
        });
    }

    edges.sort_by(|x, y| y.value.total_cmp(&x.value));
    ScoredBorders { edges, skipped }
}
