//! Series input and the finite-value filter.
//!
//! ## Purpose
//!
//! This module provides a unified abstraction for attribute series, allowing
//! classification and smoothing to accept slices, vectors, nullable vectors
//! and ndarray views through a single interface. It is also the one place
//! where non-finite entries are removed from statistics.
//!
//! ## Design notes
//!
//! * **Single filter**: Classifier, smoothing engine and discontinuity engine
//!   all exclude values through [`FiniteSeries`].
//! * **Countable exclusion**: The filter reports how many entries it dropped.
//!
//! ## Invariants
//!
//! * `values.len() + excluded` equals the length of the original series.
//! * `values` only contains finite numbers, in their original order.
//!
//! ## Non-goals
//!
//! * This module does not impute missing values.

// External dependencies
use core::cmp::Ordering;
use ndarray::{ArrayBase, Data, Ix1};
use num_traits::Float;

// ============================================================================
// Finite Series
// ============================================================================

/// Finite values of a series together with the count of excluded entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteSeries<T> {
    /// Finite values, in input order.
    pub values: Vec<T>,

    /// Number of null, NaN or infinite entries that were dropped.
    pub excluded: usize,
}

impl<T: Float> FiniteSeries<T> {
    /// Filter an iterator of nullable values.
    pub fn collect<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Option<T>>,
    {
        let mut values = Vec::new();
        let mut excluded = 0;
        for v in iter {
            match finite_value(v) {
                Some(v) => values.push(v),
                None => excluded += 1,
            }
        }
        Self { values, excluded }
    }

    /// Number of finite values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no finite value remains.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted copy of the finite values.
    pub fn sorted(&self) -> Vec<T> {
        let mut sorted = self.values.clone();
        sort_floats(&mut sorted);
        sorted
    }
}

/// Keep a value only when it is present and finite.
#[inline]
pub fn finite_value<T: Float>(value: Option<T>) -> Option<T> {
    value.filter(|v| v.is_finite())
}

/// Sort finite floats in ascending order.
pub fn sort_floats<T: Float>(values: &mut [T]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

/// Count distinct values of an ascending slice.
pub fn count_unique<T: Float>(sorted: &[T]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| w[1] != w[0]).count()
}

// ============================================================================
// Series Input Trait
// ============================================================================

/// Trait for types that can be used as an attribute series.
pub trait SeriesInput<T: Float> {
    /// Filter the series to its finite values.
    fn finite_series(&self) -> FiniteSeries<T>;
}

impl<T: Float> SeriesInput<T> for [T] {
    fn finite_series(&self) -> FiniteSeries<T> {
        FiniteSeries::collect(self.iter().map(|&v| Some(v)))
    }
}

impl<T: Float> SeriesInput<T> for Vec<T> {
    fn finite_series(&self) -> FiniteSeries<T> {
        self.as_slice().finite_series()
    }
}

impl<T: Float> SeriesInput<T> for [Option<T>] {
    fn finite_series(&self) -> FiniteSeries<T> {
        FiniteSeries::collect(self.iter().copied())
    }
}

impl<T: Float> SeriesInput<T> for Vec<Option<T>> {
    fn finite_series(&self) -> FiniteSeries<T> {
        self.as_slice().finite_series()
    }
}

impl<T: Float, S> SeriesInput<T> for ArrayBase<S, Ix1>
where
    S: Data<Elem = T>,
{
    fn finite_series(&self) -> FiniteSeries<T> {
        FiniteSeries::collect(self.iter().map(|&v| Some(v)))
    }
}
