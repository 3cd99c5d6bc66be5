//! Classification methods: from a sorted finite series to class breaks.
//!
//! ## Purpose
//!
//! This module implements every supported discretisation method as a pure
//! function over an ascending slice of finite values, and the single
//! routine ([`class_of`]) that assigns a value to a class given final breaks
//! and an [`IntervalClosure`].
//!
//! ## Design notes
//!
//! * **Exhaustive dispatch**: [`compute_breaks`] matches on [`ClassificationMethod`];
//!   each arm calls one pure function.
//! * **Closure is authoritative**: methods produce boundaries; membership is
//!   decided by [`class_of`] only. Jenks is the one method whose inner break
//!   *values* depend on the closure, so that its natural groups survive
//!   assignment under either convention.
//! * **Deduplication**: coinciding raw breaks (ties) are merged, shrinking
//!   the class count, except for Q6 which must keep six classes.
//!
//! ## Key concepts
//!
//! * **Right closure** `(a, b]`: the first class also contains its lower bound.
//! * **Left closure** `[a, b)`: the last class also contains its upper bound.
//!
//! ## Invariants
//!
//! * Non-manual breaks are strictly increasing, start at or below the minimum
//!   and end at or above the maximum.
//! * `count_by_class` counts every value inside `[b0, bn]` exactly once.
//!
//! ## Non-goals
//!
//! * This module does not filter non-finite values (see `primitives::series`).
//! * This module does not choose palettes or legends.

// External dependencies
use core::str::FromStr;
use num_traits::Float;

// Internal dependencies
use crate::math::stats::{mean, population_std, quantile_sorted, Summary};
use crate::primitives::errors::ThematicError;
use crate::primitives::series::{count_unique, sort_floats};

// ============================================================================
// Method, Closure and Options
// ============================================================================

/// Discretisation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationMethod {
    /// Breaks at the `i/k` quantiles.
    #[default]
    Quantile,

    /// Breaks evenly spaced between minimum and maximum.
    EqualInterval,

    /// Fisher-Jenks natural breaks.
    Jenks,

    /// Optimal 1-D k-means, breaks between clusters.
    Ckmeans,

    /// Class widths following a geometric series.
    GeometricProgression,

    /// Class widths following an arithmetic series.
    ArithmeticProgression,

    /// Breaks at multiples of the standard deviation around the mean.
    StandardDeviation,

    /// Recursive split of the head of a heavy-tailed distribution.
    HeadTail,

    /// Round ("pretty") breaks.
    Pretty,

    /// Six classes: quartiles plus the 5% tails.
    Q6,

    /// Recursive split at the mean (class count is a power of two).
    NestedMeans,

    /// Caller-supplied breaks.
    Manual,
}

impl ClassificationMethod {
    /// Get the name of the method.
    pub const fn name(&self) -> &'static str {
        match self {
            ClassificationMethod::Quantile => "Quantile",
            ClassificationMethod::EqualInterval => "EqualInterval",
            ClassificationMethod::Jenks => "Jenks",
            ClassificationMethod::Ckmeans => "Ckmeans",
            ClassificationMethod::GeometricProgression => "GeometricProgression",
            ClassificationMethod::ArithmeticProgression => "ArithmeticProgression",
            ClassificationMethod::StandardDeviation => "StandardDeviation",
            ClassificationMethod::HeadTail => "HeadTail",
            ClassificationMethod::Pretty => "Pretty",
            ClassificationMethod::Q6 => "Q6",
            ClassificationMethod::NestedMeans => "NestedMeans",
            ClassificationMethod::Manual => "Manual",
        }
    }

    /// Whether the requested number of classes drives the method.
    pub const fn uses_classes(&self) -> bool {
        matches!(
            self,
            ClassificationMethod::Quantile
                | ClassificationMethod::EqualInterval
                | ClassificationMethod::Jenks
                | ClassificationMethod::Ckmeans
                | ClassificationMethod::GeometricProgression
                | ClassificationMethod::ArithmeticProgression
                | ClassificationMethod::Pretty
                | ClassificationMethod::NestedMeans
        )
    }
}

/// Which side of a class interval is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalClosure {
    /// `[a, b)`; the last class is `[a, b]`.
    Left,

    /// `(a, b]`; the first class is `[a, b]`.
    #[default]
    Right,
}

/// Position of the mean for the standard-deviation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeanPosition {
    /// A break sits on the mean.
    #[default]
    Boundary,

    /// A class is centred on the mean.
    Center,
}

/// Method parameters after builder defaults have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOptions<T> {
    /// Requested number of classes.
    pub classes: usize,

    /// Interval closure.
    pub closure: IntervalClosure,

    /// Standard-deviation amplitude (in sigmas).
    pub amplitude: T,

    /// Standard-deviation mean position.
    pub mean_position: MeanPosition,

    /// Manual breaks.
    pub breaks: Option<Vec<T>>,
}

/// Share of the subset above which head/tail recursion stops.
const HEAD_TAIL_RATIO: f64 = 0.4;

/// Upper bound on the number of standard-deviation steps across the range.
pub const MAX_STD_DEV_CLASSES: usize = 100;

/// Quantile probabilities of the Q6 method.
const Q6_PROBABILITIES: [f64; 7] = [0.0, 0.05, 0.25, 0.5, 0.75, 0.95, 1.0];

// ============================================================================
// Dispatch
// ============================================================================

/// Compute breaks for `method` over an ascending slice of finite values.
pub fn compute_breaks<T: Float>(
    method: ClassificationMethod,
    sorted: &[T],
    options: &MethodOptions<T>,
) -> Result<Vec<T>, ThematicError> {
    if sorted.is_empty() {
        return Err(ThematicError::EmptySeries);
    }

    if method == ClassificationMethod::Manual {
        return options
            .breaks
            .clone()
            .ok_or_else(|| ThematicError::InvalidBreaks("no breaks were provided".to_string()));
    }

    let unique = count_unique(sorted);
    if unique < 2 {
        return Err(ThematicError::TooFewUniqueValues {
            got: unique,
            min: 2,
        });
    }

    let k = options.classes;
    let raw = match method {
        ClassificationMethod::Quantile => quantile_breaks(sorted, k),
        ClassificationMethod::EqualInterval => equal_interval_breaks(sorted, k),
        ClassificationMethod::Jenks => {
            if unique < k {
                return Err(ThematicError::TooFewUniqueValues { got: unique, min: k });
            }
            jenks_breaks(sorted, k, options.closure)
        }
        ClassificationMethod::Ckmeans => {
            if unique < k {
                return Err(ThematicError::TooFewUniqueValues { got: unique, min: k });
            }
            ckmeans_breaks(sorted, k)
        }
        ClassificationMethod::GeometricProgression => geometric_breaks(sorted, k)?,
        ClassificationMethod::ArithmeticProgression => arithmetic_breaks(sorted, k),
        ClassificationMethod::StandardDeviation => {
            let step = options.amplitude * population_std(sorted);
            let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
            let classes = ((max - min) / step).to_f64().unwrap_or(f64::INFINITY);
            if !(classes <= MAX_STD_DEV_CLASSES as f64) {
                return Err(ThematicError::invalid_parameter(
                    "amplitude",
                    options.amplitude.to_f64().unwrap_or(f64::NAN),
                    "too small for the range of the series",
                ));
            }
            std_dev_breaks(sorted, options.amplitude, options.mean_position)
        }
        ClassificationMethod::HeadTail => head_tail_breaks(sorted),
        ClassificationMethod::Pretty => pretty_breaks(sorted, k),
        ClassificationMethod::Q6 => return q6_breaks(sorted, unique),
        ClassificationMethod::NestedMeans => nested_means_breaks(sorted, k)?,
        ClassificationMethod::Manual => unreachable!("manual breaks are returned above"),
    };

    Ok(dedup_breaks(raw))
}

/// Merge coinciding breaks.
fn dedup_breaks<T: Float>(mut breaks: Vec<T>) -> Vec<T> {
    breaks.dedup();
    breaks
}

// ============================================================================
// Methods
// ============================================================================

/// Breaks at the `i/k` quantiles.
pub fn quantile_breaks<T: Float>(sorted: &[T], k: usize) -> Vec<T> {
    let kf = T::from(k).unwrap();
    (0..=k)
        .map(|i| quantile_sorted(sorted, T::from(i).unwrap() / kf))
        .collect()
}

/// Breaks evenly spaced between minimum and maximum.
pub fn equal_interval_breaks<T: Float>(sorted: &[T], k: usize) -> Vec<T> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let step = (max - min) / T::from(k).unwrap();
    let mut breaks: Vec<T> = (0..k).map(|i| min + step * T::from(i).unwrap()).collect();
    breaks.push(max);
    breaks
}

/// Fisher-Jenks natural breaks.
///
/// Among equal optima the lowest split index wins.
pub fn jenks_breaks<T: Float>(sorted: &[T], k: usize, closure: IntervalClosure) -> Vec<T> {
    let n = sorted.len();
    let (min, max) = (sorted[0], sorted[n - 1]);
    if k <= 1 {
        return vec![min, max];
    }
    let starts = optimal_class_starts(sorted, k);

    let two = T::from(2.0).unwrap();
    let mut breaks = Vec::with_capacity(k + 1);
    breaks.push(min);
    for &start in &starts[1..] {
        let upper_of_lower = sorted[start - 1];
        let lower_of_upper = sorted[start];
        let prev = breaks[breaks.len() - 1];
        let b = match closure {
            IntervalClosure::Left => lower_of_upper,
            IntervalClosure::Right if upper_of_lower > prev => upper_of_lower,
            IntervalClosure::Right => (upper_of_lower + lower_of_upper) / two,
        };
        breaks.push(b);
    }
    breaks.push(max);
    breaks
}

/// Optimal 1-D k-means (Ckmeans): breaks halfway between adjacent clusters.
///
/// Uses the same partition as [`jenks_breaks`]; only the placement of the
/// inner breaks differs, and it does not depend on the closure.
pub fn ckmeans_breaks<T: Float>(sorted: &[T], k: usize) -> Vec<T> {
    let n = sorted.len();
    let (min, max) = (sorted[0], sorted[n - 1]);
    if k <= 1 {
        return vec![min, max];
    }
    let two = T::from(2.0).unwrap();

    let mut breaks = Vec::with_capacity(k + 1);
    breaks.push(min);
    for &start in &optimal_class_starts(sorted, k)[1..] {
        breaks.push((sorted[start - 1] + sorted[start]) / two);
    }
    breaks.push(max);
    breaks
}

/// Index of the first value of each class in the partition of `sorted` into
/// `k >= 2` classes minimising the total within-class sum of squares.
///
/// Dynamic programming over prefix sums, `O(k n^2)`.
fn optimal_class_starts<T: Float>(sorted: &[T], k: usize) -> Vec<usize> {
    let n = sorted.len();

    // Prefix sums of values and squares
    let mut s1 = vec![T::zero(); n + 1];
    let mut s2 = vec![T::zero(); n + 1];
    for (i, &v) in sorted.iter().enumerate() {
        s1[i + 1] = s1[i] + v;
        s2[i + 1] = s2[i] + v * v;
    }
    let ssd = |i: usize, j: usize| -> T {
        let m = T::from(j - i + 1).unwrap();
        let sum = s1[j + 1] - s1[i];
        (s2[j + 1] - s2[i] - sum * sum / m).max(T::zero())
    };

    // cost[c][j]: best cost of splitting sorted[0..=j] into c + 1 classes
    let mut cost = vec![vec![T::infinity(); n]; k];
    let mut split = vec![vec![0usize; n]; k];
    for j in 0..n {
        cost[0][j] = ssd(0, j);
    }
    for c in 1..k {
        for j in c..n {
            for i in c..=j {
                let candidate = cost[c - 1][i - 1] + ssd(i, j);
                if candidate < cost[c][j] {
                    cost[c][j] = candidate;
                    split[c][j] = i;
                }
            }
        }
    }

    // Backtrack class starts
    let mut starts = vec![0usize; k];
    let mut j = n - 1;
    for c in (1..k).rev() {
        starts[c] = split[c][j];
        j = starts[c] - 1;
    }
    starts
}

/// Breaks `min * r^i` with `r = (max / min)^(1/k)`.
pub fn geometric_breaks<T: Float>(sorted: &[T], k: usize) -> Result<Vec<T>, ThematicError> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if min <= T::zero() {
        return Err(ThematicError::invalid_parameter(
            "minimum",
            min.to_f64().unwrap_or(f64::NAN),
            "geometric progression requires strictly positive values",
        ));
    }
    let ratio = (max / min).powf(T::one() / T::from(k).unwrap());
    let mut breaks: Vec<T> = (0..k).map(|i| min * ratio.powi(i as i32)).collect();
    breaks.push(max);
    Ok(breaks)
}

/// Breaks whose class widths are `w, 2w, ..., kw`.
pub fn arithmetic_breaks<T: Float>(sorted: &[T], k: usize) -> Vec<T> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let units = T::from(k * (k + 1) / 2).unwrap();
    let w = (max - min) / units;
    let mut breaks: Vec<T> = (0..k)
        .map(|i| min + w * T::from(i * (i + 1) / 2).unwrap())
        .collect();
    breaks.push(max);
    breaks
}

/// Breaks at `mean + j * amplitude * sigma` (or half-steps when the mean is
/// a class centre), restricted to the open range of the data.
pub fn std_dev_breaks<T: Float>(sorted: &[T], amplitude: T, position: MeanPosition) -> Vec<T> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let avg = mean(sorted);
    let step = amplitude * population_std(sorted);
    let half = T::from(0.5).unwrap();

    let offset = match position {
        MeanPosition::Boundary => T::zero(),
        MeanPosition::Center => half * step,
    };

    let mut inner = Vec::new();
    let mut j = T::zero();
    loop {
        let down = avg - offset - j * step;
        if down <= min {
            break;
        }
        inner.push(down);
        j = j + T::one();
    }
    j = if position == MeanPosition::Boundary {
        T::one()
    } else {
        T::zero()
    };
    loop {
        let up = avg + offset + j * step;
        if up >= max {
            break;
        }
        inner.push(up);
        j = j + T::one();
    }
    sort_floats(&mut inner);

    let mut breaks = Vec::with_capacity(inner.len() + 2);
    breaks.push(min);
    breaks.extend(inner);
    breaks.push(max);
    breaks
}

/// Head/tail breaks: split at the mean and recurse into the values above it
/// while they stay a minority of the subset.
pub fn head_tail_breaks<T: Float>(sorted: &[T]) -> Vec<T> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let ratio = T::from(HEAD_TAIL_RATIO).unwrap();

    let mut breaks = vec![min];
    let mut subset = sorted.to_vec();
    loop {
        let m = mean(&subset);
        if m <= breaks[breaks.len() - 1] || m >= max {
            break;
        }
        breaks.push(m);

        let head: Vec<T> = subset.iter().copied().filter(|&v| v > m).collect();
        let share = T::from(head.len()).unwrap() / T::from(subset.len()).unwrap();
        if head.len() <= 1 || share > ratio {
            break;
        }
        subset = head;
    }
    breaks.push(max);
    breaks
}

/// Round breaks with a step of 1, 2 or 5 times a power of ten.
pub fn pretty_breaks<T: Float>(sorted: &[T], k: usize) -> Vec<T> {
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let raw_step = (max - min) / T::from(k.max(1)).unwrap();
    let magnitude = T::from(10.0).unwrap().powf(raw_step.log10().floor());
    let residual = raw_step / magnitude;
    let nice = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|&v| T::from(v).unwrap())
        .find(|&v| residual <= v)
        .unwrap_or_else(|| T::from(10.0).unwrap());
    let step = nice * magnitude;

    let mut lo = (min / step).floor() * step;
    if lo > min {
        lo = lo - step;
    }
    let mut hi = (max / step).ceil() * step;
    if hi < max {
        hi = hi + step;
    }

    let count = ((hi - lo) / step).round().to_usize().unwrap_or(1).max(1);
    let mut breaks: Vec<T> = (0..count).map(|i| lo + step * T::from(i).unwrap()).collect();
    breaks.push(hi);
    breaks
}

/// Q6: minimum, 5th, 25th, 50th, 75th, 95th percentiles and maximum.
pub fn q6_breaks<T: Float>(sorted: &[T], unique: usize) -> Result<Vec<T>, ThematicError> {
    if unique < 7 {
        return Err(ThematicError::TooFewUniqueValues { got: unique, min: 7 });
    }
    let breaks: Vec<T> = Q6_PROBABILITIES
        .iter()
        .map(|&p| quantile_sorted(sorted, T::from(p).unwrap()))
        .collect();
    if breaks.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ThematicError::InvalidInput(
            "tied values collapse Q6 classes".to_string(),
        ));
    }
    Ok(breaks)
}

/// Nested means: split at the mean, then split each half again.
pub fn nested_means_breaks<T: Float>(sorted: &[T], k: usize) -> Result<Vec<T>, ThematicError> {
    if !k.is_power_of_two() {
        return Err(ThematicError::invalid_parameter(
            "classes",
            k as f64,
            "nested means requires a power of two",
        ));
    }
    let depth = k.trailing_zeros();
    let mut breaks = vec![sorted[0]];
    nested_split(sorted, depth, &mut breaks);
    breaks.push(sorted[sorted.len() - 1]);
    Ok(breaks)
}

fn nested_split<T: Float>(values: &[T], depth: u32, out: &mut Vec<T>) {
    if depth == 0 || values.len() < 2 {
        return;
    }
    let m = mean(values);
    let cut = values.partition_point(|&v| v <= m);
    nested_split(&values[..cut], depth - 1, out);
    out.push(m);
    nested_split(&values[cut..], depth - 1, out);
}

// ============================================================================
// Class Assignment
// ============================================================================

/// Class index of `value`, or `None` when it is non-finite or outside the breaks.
pub fn class_of<T: Float>(value: T, breaks: &[T], closure: IntervalClosure) -> Option<usize> {
    let n = breaks.len().checked_sub(1)?;
    if n == 0 || !value.is_finite() || value < breaks[0] || value > breaks[n] {
        return None;
    }
    let class = match closure {
        IntervalClosure::Right => breaks[1..].partition_point(|&b| b < value),
        IntervalClosure::Left => breaks[..n].partition_point(|&b| b <= value) - 1,
    };
    Some(class.min(n - 1))
}

/// Per-class counts and the number of values falling outside the breaks.
pub fn count_by_class<T: Float>(
    values: &[T],
    breaks: &[T],
    closure: IntervalClosure,
) -> (Vec<usize>, usize) {
    let classes = breaks.len().saturating_sub(1);
    let mut counts = vec![0usize; classes];
    let mut outside = 0;
    for &v in values {
        match class_of(v, breaks, closure) {
            Some(c) => counts[c] += 1,
            None => outside += 1,
        }
    }
    (counts, outside)
}

// ============================================================================
// User-Defined Breaks
// ============================================================================

/// Parse breaks typed by a user, e.g. `"10-20-30"`.
///
/// Values are separated by `-` (or `- ` when the series has negative values).
/// Only values strictly inside the data range are kept; the minimum and the
/// maximum frame the result.
pub fn parse_breaks<T: Float + FromStr>(
    text: &str,
    summary: &Summary<T>,
) -> Result<Vec<T>, ThematicError> {
    let separator = if summary.has_negative() { "- " } else { "-" };

    let mut breaks = vec![summary.minimum];
    for token in text.split(separator).map(str::trim).filter(|t| !t.is_empty()) {
        let v: T = token
            .parse()
            .map_err(|_| ThematicError::InvalidBreaks(format!("cannot parse '{token}'")))?;
        if v > summary.minimum && v < summary.maximum {
            breaks.push(v);
        }
    }
    breaks.push(summary.maximum);
    sort_floats(&mut breaks);
    breaks.dedup();

    if breaks.len() < 3 {
        return Err(ThematicError::InvalidBreaks(
            "at least 2 classes are required".to_string(),
        ));
    }
    Ok(breaks)
}
