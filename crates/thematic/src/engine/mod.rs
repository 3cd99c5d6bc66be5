//! Layer 4: Engine
//!
//! # Purpose
//!
//! This layer orchestrates smoothing requests by coordinating between
//! primitives (layers, series) and algorithms (grid, kernels, isobands).
//! It also owns validation and the result records handed back to callers.
//!
//! # Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Engine ← You are here
//!   ↓
//! Layer 3: Algorithms
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Execution engine for smoothing.
pub mod executor;

/// Validation utilities.
pub mod validator;

/// Output types for thematic operations.
pub mod output;
