//! Parallel execution engine for thematic smoothing and classification.
//!
//! ## Purpose
//!
//! This module provides the parallel kernel pass that is injected into the
//! `thematic` crate's smoothing executor, and a batch classifier that runs
//! one classification per series across CPU cores.
//!
//! ## Design notes
//!
//! * **Implementation**: Provides a drop-in replacement for the sequential smoothing pass.
//! * **Parallelism**: Uses `rayon` for data-parallel execution across grid points.
//! * **Shared arithmetic**: Each grid point is evaluated by the same
//!   `kernel_point_sums` as the sequential pass, so both agree bit for bit.
//!
//! ## Key concepts
//!
//! * **Parallel Accumulation**: Grid points are independent; each one sums
//!   the weighted contributions of every input point.
//! * **Integration**: Plugs into the `thematic` executor via the `SmoothPassFn` hook.
//!
//! ## Invariants
//!
//! * Output order matches grid order (row-major).
//!
//! ## Non-goals
//!
//! * This module does not sample the grid or finalize sums (handled by `thematic::executor`).
//! * This module does not validate parameters (handled by `validator`).

// Feature-gated imports
#[cfg(feature = "cpu")]
use rayon::prelude::*;

// External dependencies
use num_traits::Float;
use tracing::debug;

// Export dependencies from thematic crate
use thematic::internals::api::{ClassificationResult, SeriesClassifier};
use thematic::internals::engine::executor::{kernel_point_sums, KernelConfig, KernelInputs, KernelSums};
use thematic::internals::primitives::errors::ThematicError;
use thematic::internals::primitives::series::SeriesInput;

// ============================================================================
// Parallel Smoothing Function
// ============================================================================

/// Perform a single kernel pass over all grid points in parallel.
#[cfg(feature = "cpu")]
pub fn smooth_pass_parallel(
    inputs: &KernelInputs,
    config: &KernelConfig,
) -> Result<KernelSums, ThematicError> {
    let (numerator, denominator): (Vec<f64>, Vec<f64>) = (0..inputs.grid_len())
        .into_par_iter()
        .map(|i| kernel_point_sums(inputs, config, i))
        .unzip();

    Ok(KernelSums {
        numerator,
        denominator: inputs.divisors.as_ref().map(|_| denominator),
    })
}

// ============================================================================
// Batch Classification
// ============================================================================

/// Classify several series with one classifier, one result per series.
pub fn classify_batch<T, S>(
    classifier: &SeriesClassifier<T>,
    series: &[S],
) -> Vec<Result<ClassificationResult<T>, ThematicError>>
where
    T: Float + Send + Sync,
    S: SeriesInput<T> + Sync,
{
    debug!(series = series.len(), "classifying batch");

    #[cfg(feature = "cpu")]
    {
        series.par_iter().map(|s| classifier.classify(s)).collect()
    }
    #[cfg(not(feature = "cpu"))]
    {
        series.iter().map(|s| classifier.classify(s)).collect()
    }
}
