//! Error types for thematic computations.
//!
//! ## Purpose
//!
//! This module defines the error conditions that can occur while classifying
//! series, building grids, smoothing point sets, extracting isobands or
//! computing discontinuities.
//!
//! ## Design notes
//!
//! * **Contextual**: Errors include relevant values (e.g., expected vs. actual shapes).
//! * **Deferred**: Builder misconfiguration is stored and reported by `build()`.
//! * **Typed**: Every failure reaches the caller as a variant; nothing is retried.
//!
//! ## Key concepts
//!
//! 1. **Input validation**: Empty or all-null series, empty layers, bad rasters.
//! 2. **Parameter validation**: Classes, alpha, beta, bandwidth, resolution.
//! 3. **Backend availability**: GPU requested but no device could be acquired.
//!
//! ## Invariants
//!
//! * All variants provide sufficient context for diagnosis.
//! * Error messages are consistent in tone and formatting.
//!
//! ## Non-goals
//!
//! * This module does not perform the validation logic itself.
//! * This module does not provide error recovery or fallback strategies.

// External dependencies
use core::fmt::{Display, Formatter, Result};
use std::error::Error;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for thematic operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ThematicError {
    /// The series is empty or contains no finite value.
    EmptySeries,

    /// No usable input feature remained after filtering.
    EmptyInputSet,

    /// A numeric parameter is outside of its valid domain.
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// Value provided (NaN when not representable).
        value: f64,
        /// Constraint that was violated.
        reason: &'static str,
    },

    /// Manual breaks are malformed.
    InvalidBreaks(String),

    /// The scalar raster does not match the grid it was built from.
    InvalidGridShape {
        /// Expected (rows, columns).
        expected: (usize, usize),
        /// Actual (rows, columns).
        got: (usize, usize),
    },

    /// The requested compute backend could not be used.
    ComputeBackendUnavailable(String),

    /// The series has fewer distinct values than the method needs.
    TooFewUniqueValues {
        /// Number of distinct finite values.
        got: usize,
        /// Minimum required.
        min: usize,
    },

    /// Generic invalid input error with a descriptive message.
    InvalidInput(String),

    /// Parameter was set multiple times in the builder.
    DuplicateParameter {
        /// Name of the parameter that was set multiple times.
        parameter: &'static str,
    },
}

impl ThematicError {
    /// Shorthand for [`ThematicError::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

impl Display for ThematicError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::EmptySeries => write!(f, "Series is empty or contains no finite value"),
            Self::EmptyInputSet => write!(f, "No usable input feature"),
            Self::InvalidParameter {
                name,
                value,
                reason,
            } => write!(f, "Invalid {name}: {value} ({reason})"),
            Self::InvalidBreaks(msg) => write!(f, "Invalid breaks: {msg}"),
            Self::InvalidGridShape { expected, got } => write!(
                f,
                "Invalid grid shape: expected {}x{}, got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
            Self::ComputeBackendUnavailable(msg) => {
                write!(f, "Compute backend unavailable: {msg}")
            }
            Self::TooFewUniqueValues { got, min } => {
                write!(f, "Too few distinct values: got {got}, need at least {min}")
            }
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::DuplicateParameter { parameter } => {
                write!(
                    f,
                    "Parameter '{parameter}' was set multiple times. Each parameter can only be configured once."
                )
            }
        }
    }
}

// ============================================================================
// Standard Error Trait
// ============================================================================

impl Error for ThematicError {}
