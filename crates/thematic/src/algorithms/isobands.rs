//! Isoband extraction from a scalar raster.
//!
//! ## Purpose
//!
//! This module converts a regular raster of values into one polygon layer per
//! consecutive pair of thresholds (marching triangles), then merges the pieces
//! of every band through the planar topology pass.
//!
//! ## Design notes
//!
//! * **Triangulated cells**: Each cell is split along its diagonal into two
//!   triangles. Inside a triangle the field is linear, so a band is a convex
//!   clip of the triangle and there is no saddle ambiguity.
//! * **Canonical crossings**: Crossings on an edge are interpolated from its
//!   lexicographically smaller end, so two triangles sharing that edge produce
//!   bit-identical points.
//! * **Merging**: Pieces are snapped to a lattice and their shared edges
//!   cancelled; collinear vertices are then dropped. This reduces vertex count
//!   and precision noise without touching the band count.
//!
//! ## Invariants
//!
//! * `thresholds.len() - 1` bands are returned, in threshold order, even when
//!   some of them are empty.
//! * A band covers `lower <= z < upper`; the last band also covers `upper`.
//! * Cells with a non-finite corner belong to no band.
//!
//! ## Non-goals
//!
//! * This module does not validate shapes or thresholds (see `engine::validator`).

// External dependencies
use geo::{MultiPolygon, Rect};
use ndarray::ArrayView2;

// Internal dependencies
use crate::algorithms::topology::{signed_area2, EdgeMesh, Lattice, LatticePoint};
use crate::primitives::layer::{Feature, FeatureCollection};

/// Lattice steps per axis used to merge band pieces.
pub const ISOBAND_QUANTIZATION: f64 = 1e6;

// ============================================================================
// Types
// ============================================================================

/// Polygonal region between two thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Lower threshold.
    pub lower: f64,

    /// Upper threshold.
    pub upper: f64,

    /// Region covered by the band.
    pub geometry: MultiPolygon<f64>,
}

impl Band {
    /// Middle of the band.
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Feature carrying `min_v`, `max_v`, `center_v` and `variable`.
    pub fn to_feature(&self, variable: &str) -> Feature {
        Feature::new(self.geometry.clone())
            .with_property("min_v", self.lower)
            .with_property("max_v", self.upper)
            .with_property("center_v", self.center())
            .with_property(variable, self.center())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertex {
    x: f64,
    y: f64,
    z: f64,
}

// ============================================================================
// Clipping
// ============================================================================

/// Point where the linear interpolant along `a-b` reaches `level`.
fn crossing(a: Vertex, b: Vertex, level: f64) -> Vertex {
    let (a, b) = if (a.x, a.y) <= (b.x, b.y) { (a, b) } else { (b, a) };
    let t = (level - a.z) / (b.z - a.z);
    Vertex {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
        z: level,
    }
}

/// Sutherland-Hodgman clip of a convex polygon against a value half-space.
fn clip(polygon: &[Vertex], inside: impl Fn(f64) -> bool, level: f64) -> Vec<Vertex> {
    let n = polygon.len();
    let mut out = Vec::with_capacity(n + 2);
    for i in 0..n {
        let prev = polygon[(i + n - 1) % n];
        let cur = polygon[i];
        let (prev_in, cur_in) = (inside(prev.z), inside(cur.z));
        if prev_in != cur_in {
            out.push(crossing(prev, cur, level));
        }
        if cur_in {
            out.push(cur);
        }
    }
    out
}

/// Part of a triangle where `lower <= z < upper` (or `<= upper` when closed).
fn clip_band(triangle: &[Vertex], lower: f64, upper: f64, closed: bool) -> Vec<Vertex> {
    let above = clip(triangle, |z| z >= lower, lower);
    if above.len() < 3 {
        return above;
    }
    if closed {
        clip(&above, |z| z <= upper, upper)
    } else {
        clip(&above, |z| z < upper, upper)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract one band per consecutive threshold pair.
///
/// `raster[[row, col]]` is the value at `(xs[col], ys[row])`.
pub fn extract_bands(
    raster: ArrayView2<f64>,
    xs: &[f64],
    ys: &[f64],
    thresholds: &[f64],
) -> Vec<Band> {
    let n_bands = thresholds.len().saturating_sub(1);
    let (rows, cols) = raster.dim();

    let lattice = Lattice::new(extent(xs, ys), ISOBAND_QUANTIZATION);
    let mut meshes: Vec<EdgeMesh> = (0..n_bands).map(|_| EdgeMesh::new()).collect();

    for r in 0..rows.saturating_sub(1) {
        for c in 0..cols.saturating_sub(1) {
            let corner = |rr: usize, cc: usize| Vertex {
                x: xs[cc],
                y: ys[rr],
                z: raster[[rr, cc]],
            };
            let cell = [
                corner(r, c),
                corner(r, c + 1),
                corner(r + 1, c + 1),
                corner(r + 1, c),
            ];
            if cell.iter().any(|v| !v.z.is_finite()) {
                continue;
            }
            let z_min = cell.iter().map(|v| v.z).fold(f64::INFINITY, f64::min);
            let z_max = cell.iter().map(|v| v.z).fold(f64::NEG_INFINITY, f64::max);
            let triangles = [[cell[0], cell[1], cell[2]], [cell[0], cell[2], cell[3]]];

            for (b, mesh) in meshes.iter_mut().enumerate() {
                let (lower, upper) = (thresholds[b], thresholds[b + 1]);
                let closed = b + 1 == n_bands;
                if z_max < lower || z_min > upper || (!closed && z_min >= upper) {
                    continue;
                }
                for triangle in &triangles {
                    let piece = clip_band(triangle, lower, upper, closed);
                    add_piece(mesh, &piece, &lattice);
                }
            }
        }
    }

    meshes
        .into_iter()
        .enumerate()
        .map(|(b, mesh)| Band {
            lower: thresholds[b],
            upper: thresholds[b + 1],
            geometry: mesh.into_multi_polygon(&lattice),
        })
        .collect()
}

/// Snap a piece to the lattice and add it counter-clockwise.
fn add_piece(mesh: &mut EdgeMesh, piece: &[Vertex], lattice: &Lattice) {
    if piece.len() < 3 {
        return;
    }
    let mut ring: Vec<LatticePoint> = piece
        .iter()
        .map(|v| lattice.quantize(geo::Coord { x: v.x, y: v.y }))
        .collect();
    ring.dedup();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    match signed_area2(&ring) {
        0 => {}
        a if a < 0 => {
            ring.reverse();
            mesh.add_ring(&ring);
        }
        _ => mesh.add_ring(&ring),
    }
}

fn extent(xs: &[f64], ys: &[f64]) -> Rect<f64> {
    let range = |v: &[f64]| {
        v.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        })
    };
    let ((x0, x1), (y0, y1)) = (range(xs), range(ys));
    if x0 > x1 || y0 > y1 {
        return Rect::new((0.0, 0.0), (0.0, 0.0));
    }
    Rect::new((x0, y0), (x1, y1))
}

/// Bands as a polygon layer.
pub fn bands_to_features(bands: &[Band], variable: &str) -> FeatureCollection {
    bands.iter().map(|b| b.to_feature(variable)).collect()
}
