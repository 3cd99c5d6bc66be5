//! Layer 3: Algorithms
//!
//! This layer implements the core logic for classification, multivariate
//! combination, grid sampling, isoband extraction and discontinuity scoring.
//! It contains the "business logic" of thematic mapping but is orchestrated
//! by the engine layer.

// Discretisation methods and class assignment.
pub mod classification;

// Joint classes of two or three classified variables.
pub mod combiner;

// Sample-point grid generation.
pub mod grid;

// Quantized planar topology shared by isobands and discontinuities.
pub mod topology;

// Marching-triangles isobands.
pub mod isobands;

// Shared borders and discontinuity values.
pub mod discontinuity;
