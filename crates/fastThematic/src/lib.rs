//! # fastThematic: parallel and GPU execution for thematic maps
//!
//! Drop-in acceleration for the [`thematic`] crate: the same builders and
//! results, with the smoothing kernel evaluated across all CPU cores
//! (`cpu` feature, default) or on the GPU (`gpu` feature), and batch
//! classification of many series at once.
//!
//! ## Quick Start
//!
//! ```rust
//! use fastThematic::prelude::*;
//!
//! let points = vec![
//!     InputPoint::new(2.35, 48.85, 2100.0),
//!     InputPoint::new(4.83, 45.76, 520.0),
//! ];
//! let grid = PointGrid {
//!     width: 2,
//!     height: 1,
//!     xs: vec![2.0, 5.0],
//!     ys: vec![47.0],
//!     resolution: 3.0,
//! };
//!
//! let engine = Smoothing::new()
//!     .stewart(Pareto)
//!     .span(100.0)
//!     .build()?;                 // rayon pass on the CPU backend
//!
//! let smoothed = engine.smooth_points(&points, &grid)?;
//! assert_eq!(smoothed.z.len(), 2);
//! # Result::<(), ThematicError>::Ok(())
//! ```
//!
//! ## Backends
//!
//! * `CPU` (default): rayon pass; `.parallel(false)` selects the sequential pass.
//! * `GPU`: wgpu pass in single precision. Without an adapter the request fails
//!   with `ComputeBackendUnavailable` unless `.cpu_fallback(true)` is set.

#![allow(non_snake_case)]

/// GPU-accelerated execution engine.
#[cfg(feature = "gpu")]
pub mod gpu {
    pub use crate::engine::gpu::smooth_pass_gpu;
}

// Layer 4: Engine - accelerated kernel passes.
mod engine;

// High-level fluent API with parallel execution.
mod api;

// Standard fastThematic prelude.
pub mod prelude {
    pub use crate::api::{
        classify_batch, isobands, summarize, BBox,
        Backend::{CPU, GPU},
        ClassificationMethod::{
            ArithmeticProgression, Ckmeans, EqualInterval, GeometricProgression, HeadTail, Jenks,
            Manual, NestedMeans, Pretty, Q6, Quantile, StandardDeviation,
        },
        ClassificationResult, ClassifierBuilder as Classifier, Combiner,
        DiscontinuityBuilder as Discontinuity,
        DiscontinuityMode::{Absolute, Relative},
        DiscontinuityResult, Feature, FeatureCollection, FeatureId, InputPoint,
        IntervalClosure::{Left, Right},
        JointClass,
        KdeKernel::{Gaussian, Triangular, Uniform},
        MeanPosition::{Boundary, Center},
        ParallelSmoothingBuilder as Smoothing, PointGrid, SmoothedGrid,
        StewartFunction::{Exponential, Pareto},
        Summary, ThematicError,
    };
}

// Internal modules for development and testing.
//
// This module re-exports internal modules for development and testing purposes.
// It is only available with the `dev` feature enabled.
#[cfg(feature = "dev")]
pub mod internals {
    pub mod engine {
        pub use crate::engine::*;
    }
    pub mod api {
        pub use crate::api::*;
    }
}
