//! Planar topology on a quantized integer lattice.
//!
//! ## Purpose
//!
//! This module provides the shared planar machinery of the isoband extractor
//! and the discontinuity engine: coordinate quantization, cancellation of
//! shared edges, chaining of edges into rings and lines, and the assembly of
//! rings into polygons with holes.
//!
//! ## Design notes
//!
//! * **Integer lattice**: Coordinates are snapped to a `q x q` lattice over a
//!   bounding box before any comparison, so floating noise never splits an
//!   edge that two pieces share. Orientation and containment use exact
//!   integer arithmetic.
//! * **Deterministic**: Ordered maps are used wherever iteration order
//!   reaches the output.
//!
//! ## Key concepts
//!
//! * **Edge cancellation**: Adding `a -> b` removes a pending `b -> a`. Once
//!   every piece of a region is added, only its outer boundary remains.
//! * **Orientation**: Counter-clockwise rings are shells, clockwise rings holes.
//!
//! ## Invariants
//!
//! * Rings returned by [`EdgeMesh::into_rings`] are simple (no repeated vertex).
//! * Collinear vertex removal never changes the area of a ring.

// External dependencies
use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Point on the integer lattice.
pub type LatticePoint = (i64, i64);

/// Default number of lattice steps per axis.
pub const DEFAULT_QUANTIZATION: f64 = 1e5;

// ============================================================================
// Lattice
// ============================================================================

/// Affine mapping between coordinates and lattice points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    x0: f64,
    y0: f64,
    kx: f64,
    ky: f64,
}

impl Lattice {
    /// Lattice of `quantization` steps per axis over `bbox`.
    pub fn new(bbox: Rect<f64>, quantization: f64) -> Self {
        let steps = (quantization - 1.0).max(1.0);
        let scale = |extent: f64| if extent > 0.0 { steps / extent } else { 1.0 };
        Self {
            x0: bbox.min().x,
            y0: bbox.min().y,
            kx: scale(bbox.width()),
            ky: scale(bbox.height()),
        }
    }

    /// Snap a coordinate to the lattice.
    #[inline]
    pub fn quantize(&self, c: Coord<f64>) -> LatticePoint {
        (
            ((c.x - self.x0) * self.kx).round() as i64,
            ((c.y - self.y0) * self.ky).round() as i64,
        )
    }

    /// Coordinate of a lattice point.
    #[inline]
    pub fn dequantize(&self, p: LatticePoint) -> Coord<f64> {
        Coord {
            x: self.x0 + p.0 as f64 / self.kx,
            y: self.y0 + p.1 as f64 / self.ky,
        }
    }
}

// ============================================================================
// Ring Geometry
// ============================================================================

/// Twice the signed area of an open ring (positive when counter-clockwise).
pub fn signed_area2(ring: &[LatticePoint]) -> i128 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 as i128 * b.1 as i128 - b.0 as i128 * a.1 as i128
        })
        .sum()
}

#[inline]
fn collinear(a: LatticePoint, b: LatticePoint, c: LatticePoint) -> bool {
    let (ux, uy) = ((b.0 - a.0) as i128, (b.1 - a.1) as i128);
    let (vx, vy) = ((c.0 - b.0) as i128, (c.1 - b.1) as i128);
    ux * vy - uy * vx == 0
}

/// Drop vertices lying on the straight line between their neighbours.
pub fn remove_collinear(ring: &[LatticePoint]) -> Vec<LatticePoint> {
    let mut out: Vec<LatticePoint> = Vec::with_capacity(ring.len());
    for &p in ring {
        if out.last() == Some(&p) {
            continue;
        }
        while out.len() >= 2 && collinear(out[out.len() - 2], out[out.len() - 1], p) {
            out.pop();
        }
        out.push(p);
    }
    loop {
        let n = out.len();
        if n < 3 {
            break;
        }
        if out[n - 1] == out[0] || collinear(out[n - 2], out[n - 1], out[0]) {
            out.pop();
        } else if collinear(out[n - 1], out[0], out[1]) {
            out.remove(0);
        } else {
            break;
        }
    }
    out
}

/// Even-odd containment of a point given in doubled lattice coordinates.
fn contains_doubled(ring: &[LatticePoint], p: (i128, i128)) -> bool {
    let (px, py) = p;
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let j = (i + n - 1) % n;
        let (xi, yi) = (2 * ring[i].0 as i128, 2 * ring[i].1 as i128);
        let (xj, yj) = (2 * ring[j].0 as i128, 2 * ring[j].1 as i128);
        if (yi > py) != (yj > py) {
            let lhs = (px - xi) * (yj - yi);
            let rhs = (py - yi) * (xj - xi);
            let crosses = if yj > yi { lhs < rhs } else { lhs > rhs };
            if crosses {
                inside = !inside;
            }
        }
    }
    inside
}

fn to_line_string(ring: &[LatticePoint], lattice: &Lattice) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring.iter().map(|&p| lattice.dequantize(p)).collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

// ============================================================================
// Edge Mesh
// ============================================================================

/// Multiset of directed lattice edges with cancellation of opposite edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeMesh {
    edges: BTreeMap<(LatticePoint, LatticePoint), usize>,
}

impl EdgeMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending directed edges.
    pub fn len(&self) -> usize {
        self.edges.values().sum()
    }

    /// Whether every edge has been cancelled.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Add the edges of an open ring.
    pub fn add_ring(&mut self, ring: &[LatticePoint]) {
        let n = ring.len();
        for i in 0..n {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            if a != b {
                self.add_edge(a, b);
            }
        }
    }

    fn add_edge(&mut self, a: LatticePoint, b: LatticePoint) {
        if let Some(count) = self.edges.get_mut(&(b, a)) {
            *count -= 1;
            if *count == 0 {
                self.edges.remove(&(b, a));
            }
        } else {
            *self.edges.entry((a, b)).or_insert(0) += 1;
        }
    }

    /// Chain the remaining edges into simple rings.
    ///
    /// A walk that revisits a vertex closes the loop behind it, so pinched
    /// boundaries come out as separate rings.
    pub fn into_rings(self) -> Vec<Vec<LatticePoint>> {
        let mut outgoing: BTreeMap<LatticePoint, Vec<LatticePoint>> = BTreeMap::new();
        for ((a, b), count) in self.edges {
            outgoing.entry(a).or_default().extend(std::iter::repeat(b).take(count));
        }
        for targets in outgoing.values_mut() {
            targets.reverse();
        }

        let mut rings = Vec::new();
        while let Some(start) = outgoing
            .iter()
            .find(|(_, targets)| !targets.is_empty())
            .map(|(&p, _)| p)
        {
            let mut path = vec![start];
            let mut position: HashMap<LatticePoint, usize> = HashMap::from([(start, 0)]);
            loop {
                let current = path[path.len() - 1];
                let Some(next) = outgoing.get_mut(&current).and_then(Vec::pop) else {
                    break;
                };
                if let Some(&k) = position.get(&next) {
                    for v in &path[k + 1..] {
                        position.remove(v);
                    }
                    let ring = path.split_off(k + 1);
                    let mut closed = vec![next];
                    closed.extend(ring);
                    if closed.len() >= 3 {
                        rings.push(closed);
                    }
                } else {
                    position.insert(next, path.len());
                    path.push(next);
                }
            }
            outgoing.retain(|_, targets| !targets.is_empty());
        }
        rings
    }

    /// Assemble the remaining edges into polygons.
    pub fn into_multi_polygon(self, lattice: &Lattice) -> MultiPolygon<f64> {
        assemble_polygons(self.into_rings(), lattice)
    }
}

/// Sort rings into shells and holes and build polygons.
///
/// Each hole goes to the smallest shell containing it; holes without a shell
/// are dropped.
pub fn assemble_polygons(rings: Vec<Vec<LatticePoint>>, lattice: &Lattice) -> MultiPolygon<f64> {
    let mut shells: Vec<(Vec<LatticePoint>, i128, Vec<Vec<LatticePoint>>)> = Vec::new();
    let mut holes = Vec::new();
    for ring in rings {
        let ring = remove_collinear(&ring);
        if ring.len() < 3 {
            continue;
        }
        match signed_area2(&ring) {
            a if a > 0 => shells.push((ring, a, Vec::new())),
            a if a < 0 => holes.push(ring),
            _ => {}
        }
    }

    for hole in holes {
        let midpoint = (
            hole[0].0 as i128 + hole[1].0 as i128,
            hole[0].1 as i128 + hole[1].1 as i128,
        );
        let owner = shells
            .iter_mut()
            .filter(|(shell, _, _)| contains_doubled(shell, midpoint))
            .min_by_key(|(_, area, _)| *area);
        if let Some((_, _, interiors)) = owner {
            interiors.push(hole);
        }
    }

    MultiPolygon::new(
        shells
            .into_iter()
            .map(|(shell, _, interiors)| {
                Polygon::new(
                    to_line_string(&shell, lattice),
                    interiors
                        .iter()
                        .map(|h| to_line_string(h, lattice))
                        .collect(),
                )
            })
            .collect(),
    )
}

// ============================================================================
// Line Chaining
// ============================================================================

/// Chain undirected segments into maximal lines.
///
/// Lines break at vertices whose degree is not two; closed loops come back
/// to their first vertex.
pub fn chain_segments(segments: &[(LatticePoint, LatticePoint)]) -> Vec<Vec<LatticePoint>> {
    let mut adjacency: BTreeMap<LatticePoint, Vec<LatticePoint>> = BTreeMap::new();
    for &(a, b) in segments {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }

    let key = |a: LatticePoint, b: LatticePoint| if a < b { (a, b) } else { (b, a) };
    let mut used: HashSet<(LatticePoint, LatticePoint)> = HashSet::new();
    let next_unused = |p: LatticePoint, used: &HashSet<_>| {
        adjacency[&p]
            .iter()
            .copied()
            .find(|&q| !used.contains(&key(p, q)))
    };

    let starts: Vec<LatticePoint> = adjacency
        .iter()
        .filter(|(_, n)| n.len() != 2)
        .map(|(&p, _)| p)
        .chain(adjacency.keys().copied())
        .collect();

    let mut lines = Vec::new();
    for start in starts {
        while let Some(first) = next_unused(start, &used) {
            let mut line = vec![start];
            let (mut current, mut next) = (start, first);
            loop {
                used.insert(key(current, next));
                line.push(next);
                current = next;
                match next_unused(current, &used) {
                    Some(n) if adjacency[&current].len() == 2 => next = n,
                    _ => break,
                }
            }
            lines.push(line);
        }
    }
    lines
}
