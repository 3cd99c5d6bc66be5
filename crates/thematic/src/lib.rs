//! # thematic: numeric core for thematic maps
//!
//! Classification, spatial smoothing, isobands and discontinuities for
//! choropleth, smoothed and discontinuity maps.
//!
//! ## What is in the box?
//!
//! * **Classification**: Turn an attribute series into class breaks with one
//!   of twelve discretisation methods (quantile, equal interval, Jenks,
//!   Ckmeans, geometric and arithmetic progressions, standard deviation, head/tail,
//!   pretty, Q6, nested means, manual).
//! * **Multivariate combination**: Nest two or three classified variables
//!   into a single joint class for bivariate and trivariate maps.
//! * **Smoothing**: Evaluate a Stewart potential or a kernel density
//!   estimate on a regular grid, in plain or ratio mode.
//! * **Isobands**: Contour a raster into one polygon feature per threshold
//!   interval.
//! * **Discontinuities**: Score every shared border of a polygon layer by
//!   the relative or absolute difference of its two neighbours.
//!
//! ## Quick Start
//!
//! ### Classification
//!
//! ```rust
//! use thematic::prelude::*;
//!
//! let values: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
//!
//! // Build the classifier
//! let classifier = Classifier::new()
//!     .method(Quantile)   // Equal counts per class
//!     .classes(4)         // Four classes
//!     .build()?;
//!
//! // Classify the series
//! let result = classifier.classify(&values)?;
//!
//! assert_eq!(result.breaks.len(), 5);
//! assert_eq!(result.classified(), 10);
//! println!("{}", result);
//! # Result::<(), ThematicError>::Ok(())
//! ```
//!
//! ### Smoothing and isobands
//!
//! ```rust
//! use geo::Point;
//! use thematic::prelude::*;
//!
//! let layer: FeatureCollection = vec![
//!     Feature::new(Point::new(2.35, 48.85)).with_property("pop", 2100.0),
//!     Feature::new(Point::new(4.83, 45.76)).with_property("pop", 520.0),
//!     Feature::new(Point::new(5.37, 43.30)).with_property("pop", 870.0),
//! ]
//! .into_iter()
//! .collect();
//!
//! let engine = Smoothing::new()
//!     .stewart(Exponential) // Stewart potential
//!     .span(75.0)           // Weight halves at 75 km
//!     .resolution(0.25)     // Grid spacing in degrees
//!     .build()?;
//!
//! let grid = engine.smooth(&layer, "pop", None)?;
//! let bands = grid.isobands(&grid.default_thresholds(), "pop")?;
//!
//! assert_eq!(grid.z.len(), grid.width() * grid.height());
//! assert!(!bands.is_empty());
//! # Result::<(), ThematicError>::Ok(())
//! ```
//!
//! ## Result and Error Handling
//!
//! Every entry point returns `Result<_, ThematicError>`. Null or non-finite
//! values are never an error: they are excluded and counted on the result.
//!
//! ## References
//!
//! - Stewart, J. Q. (1941). "An Inverse Distance Variation for Certain Social Influences"
//! - Jenks, G. F. (1967). "The Data Model Concept in Statistical Mapping"
//! - Jiang, B. (2013). "Head/tail Breaks: A New Classification Scheme for Data with a Heavy-tailed Distribution"

// Layer 1: Primitives - data structures and basic utilities.
mod primitives;

// Layer 2: Math - pure mathematical functions.
mod math;

// Layer 3: Algorithms - classification, grids, topology and contouring.
mod algorithms;

// Layer 4: Engine - orchestration, validation and results.
mod engine;

// High-level fluent API.
mod api;

// Standard thematic prelude.
pub mod prelude {
    pub use crate::api::{
        isobands, summarize, BBox,
        Backend::{CPU, GPU},
        ClassedVariable,
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
        SmoothedGrid, SmoothingBuilder as Smoothing,
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
    pub mod primitives {
        pub use crate::primitives::*;
    }
    pub mod math {
        pub use crate::math::*;
    }
    pub mod algorithms {
        pub use crate::algorithms::*;
    }
    pub mod engine {
        pub use crate::engine::*;
    }
    pub mod api {
        pub use crate::api::*;
    }
}
