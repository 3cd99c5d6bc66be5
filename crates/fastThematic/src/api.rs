//! High-level API for thematic computations with parallel execution support.
//!
//! ## Purpose
//!
//! This module provides the user-facing entry points of `fastThematic`. It
//! extends the `thematic` API with a smoothing builder that injects a
//! multi-threaded (rayon) or GPU (wgpu) kernel pass, and with batch
//! classification across CPU cores.
//!
//! ## Design notes
//!
//! * **Fluent Integration**: Re-uses the base `thematic` builder pattern and validation.
//! * **Parallel-First**: The CPU backend defaults to the rayon pass.
//! * **Feature-Gated**: Parallelism is configurable via crate features.
//!
//! ### Configuration Flow
//!
//! 1. Create a [`ParallelSmoothingBuilder`] via `Smoothing::new()`.
//! 2. Chain configuration methods (`.stewart()`, `.span()`, `.backend()`, etc.).
//! 3. Call `.build()`; the accelerated pass matching the backend is injected.

// Feature-gated imports
#[cfg(feature = "cpu")]
use crate::engine::executor::smooth_pass_parallel;
#[cfg(feature = "gpu")]
use crate::engine::gpu::smooth_pass_gpu;

// Export dependencies from thematic crate
use thematic::internals::api::SmoothingBuilder;

// Publicly re-exported types
pub use crate::engine::executor::classify_batch;
pub use thematic::internals::api::{
    isobands, summarize, BBox, Backend, ClassificationMethod, ClassificationResult,
    ClassifierBuilder, Combiner, DiscontinuityBuilder, DiscontinuityMode, DiscontinuityResult,
    Feature, FeatureCollection, FeatureId, InputPoint, IntervalClosure, JointClass, KdeKernel,
    MeanPosition, PointGrid, ProgressFn, SeriesClassifier, SmoothedGrid, SmoothingEngine,
    StewartFunction, Summary, ThematicError,
};

// ============================================================================
// Extended Smoothing Builder
// ============================================================================

/// Builder for smoothing with parallel and GPU support.
#[derive(Debug, Clone, Default)]
pub struct ParallelSmoothingBuilder {
    /// Base builder from the thematic crate
    pub base: SmoothingBuilder,

    /// Whether the CPU backend runs the rayon pass (default: true).
    pub parallel: Option<bool>,
}

impl ParallelSmoothingBuilder {
    /// Create a new builder with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parallel execution mode.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Set the execution backend.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.base = self.base.backend(backend);
        self
    }

    /// Allow falling back to the CPU when the backend is unavailable.
    pub fn cpu_fallback(mut self, enabled: bool) -> Self {
        self.base = self.base.cpu_fallback(enabled);
        self
    }

    // ========================================================================
    // Shared Setters
    // ========================================================================

    /// Use a Stewart potential with the given function.
    pub fn stewart(mut self, function: StewartFunction) -> Self {
        self.base = self.base.stewart(function);
        self
    }

    /// Use a kernel density estimate with the given kernel.
    pub fn kde(mut self, kernel: KdeKernel) -> Self {
        self.base = self.base.kde(kernel);
        self
    }

    /// Set the Stewart alpha.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.base = self.base.alpha(alpha);
        self
    }

    /// Set the Stewart beta.
    pub fn beta(mut self, beta: f64) -> Self {
        self.base = self.base.beta(beta);
        self
    }

    /// Set the distance (km) at which the Stewart weight halves.
    pub fn span(mut self, span: f64) -> Self {
        self.base = self.base.span(span);
        self
    }

    /// Set the KDE bandwidth (km).
    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.base = self.base.bandwidth(bandwidth);
        self
    }

    /// Set the grid spacing in degrees.
    pub fn resolution(mut self, resolution: f64) -> Self {
        self.base = self.base.resolution(resolution);
        self
    }

    /// Set the grid extent.
    pub fn bbox(mut self, bbox: BBox) -> Self {
        self.base = self.base.bbox(bbox);
        self
    }

    /// Pad the grid extent by a fraction of itself.
    pub fn pad(mut self, pad: f64) -> Self {
        self.base = self.base.pad(pad);
        self
    }

    /// Set a progress callback.
    pub fn on_progress(mut self, callback: ProgressFn) -> Self {
        self.base = self.base.on_progress(callback);
        self
    }

    // ========================================================================
    // Build Method
    // ========================================================================

    /// Build the smoothing engine with the accelerated pass for its backend.
    pub fn build(self) -> Result<SmoothingEngine, ThematicError> {
        let mut builder = self.base;

        match builder.backend.unwrap_or_default() {
            Backend::CPU => {
                #[cfg(feature = "cpu")]
                {
                    if self.parallel.unwrap_or(true) {
                        builder = builder.custom_smooth_pass(smooth_pass_parallel);
                    } else {
                        builder.custom_smooth_pass = None;
                    }
                }
                #[cfg(not(feature = "cpu"))]
                {
                    // Sequential pass when the cpu feature is disabled
                    builder.custom_smooth_pass = None;
                }
            }
            Backend::GPU => {
                #[cfg(feature = "gpu")]
                {
                    builder = builder.custom_smooth_pass(smooth_pass_gpu);
                }
                #[cfg(not(feature = "gpu"))]
                {
                    // The executor reports the missing backend (or falls back)
                    builder.custom_smooth_pass = None;
                }
            }
        }

        // Validation is centralized in the thematic crate
        builder.build()
    }
}
