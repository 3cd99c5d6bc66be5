//! Descriptive statistics over finite series.
//!
//! ## Purpose
//!
//! This module provides the small set of statistics the classification
//! methods are built from: mean, population standard deviation, linearly
//! interpolated quantiles, and a [`Summary`] of a series.
//!
//! ## Invariants
//!
//! * Functions taking `sorted` expect an ascending slice of finite values.
//! * The standard deviation is the population one (no Bessel correction).
//!
//! ## Non-goals
//!
//! * This module does not filter non-finite values (see `primitives::series`).

// External dependencies
use core::fmt::{Display, Formatter, Result};
use num_traits::Float;

// Internal dependencies
use crate::primitives::series::count_unique;

// ============================================================================
// Moments
// ============================================================================

/// Arithmetic mean (NaN for an empty slice).
pub fn mean<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::nan();
    }
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    sum / T::from(values.len()).unwrap()
}

/// Population standard deviation (NaN for an empty slice).
pub fn population_std<T: Float>(values: &[T]) -> T {
    if values.is_empty() {
        return T::nan();
    }
    let m = mean(values);
    let ss = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - m) * (v - m));
    (ss / T::from(values.len()).unwrap()).sqrt()
}

// ============================================================================
// Order Statistics
// ============================================================================

/// Quantile `p` in [0, 1] of an ascending slice, interpolating linearly
/// between order statistics.
pub fn quantile_sorted<T: Float>(sorted: &[T], p: T) -> T {
    let n = sorted.len();
    match n {
        0 => T::nan(),
        1 => sorted[0],
        _ => {
            let p = p.max(T::zero()).min(T::one());
            let pos = p * T::from(n - 1).unwrap();
            let lo = pos.floor().to_usize().unwrap_or(0).min(n - 1);
            let hi = (lo + 1).min(n - 1);
            let frac = pos - T::from(lo).unwrap();
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

/// Median of an ascending slice.
pub fn median_sorted<T: Float>(sorted: &[T]) -> T {
    quantile_sorted(sorted, T::from(0.5).unwrap())
}

// ============================================================================
// Summary
// ============================================================================

/// Statistical summary of a finite series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary<T> {
    /// Number of finite values.
    pub population: usize,

    /// Number of distinct finite values.
    pub unique: usize,

    /// Smallest value.
    pub minimum: T,

    /// Largest value.
    pub maximum: T,

    /// Arithmetic mean.
    pub mean: T,

    /// Median.
    pub median: T,

    /// Population standard deviation.
    pub standard_deviation: T,
}

impl<T: Float> Summary<T> {
    /// Summarise an ascending slice; `None` when it is empty.
    pub fn from_sorted(sorted: &[T]) -> Option<Self> {
        let (&minimum, &maximum) = (sorted.first()?, sorted.last()?);
        Some(Self {
            population: sorted.len(),
            unique: count_unique(sorted),
            minimum,
            maximum,
            mean: mean(sorted),
            median: median_sorted(sorted),
            standard_deviation: population_std(sorted),
        })
    }

    /// Whether the series contains at least one negative value.
    pub fn has_negative(&self) -> bool {
        self.minimum < T::zero()
    }
}

impl<T: Float + Display> Display for Summary<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "  Population:  {}", self.population)?;
        writeln!(f, "  Unique:      {}", self.unique)?;
        writeln!(f, "  Minimum:     {}", self.minimum)?;
        writeln!(f, "  Maximum:     {}", self.maximum)?;
        writeln!(f, "  Mean:        {}", self.mean)?;
        writeln!(f, "  Median:      {}", self.median)?;
        write!(f, "  Std. dev.:   {}", self.standard_deviation)
    }
}
