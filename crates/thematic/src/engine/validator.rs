//! Input validation for thematic configuration and data.
//!
//! ## Purpose
//!
//! This module provides the validation functions run by the builders and the
//! raster entry points: class counts, manual breaks, kernel parameters, grid
//! parameters, isoband thresholds and raster shapes.
//!
//! ## Design notes
//!
//! * **Fail-Fast**: Validation stops at the first error encountered.
//! * **Efficiency**: Checks are ordered from cheap to expensive.
//!
//! ## Invariants
//!
//! * All validated inputs satisfy their respective mathematical constraints.
//! * Validation logic is deterministic and side-effect free.
//!
//! ## Non-goals
//!
//! * This module does not filter input data (see `primitives::series`).
//! * This module does not provide automatic correction of invalid inputs.

// External dependencies
use num_traits::Float;

// Internal dependencies
use crate::algorithms::grid::BBox;
use crate::primitives::errors::ThematicError;

// ============================================================================
// Validator
// ============================================================================

/// Validation utility for thematic configuration and input data.
///
/// All methods return `Result<(), ThematicError>` and fail fast upon
/// identifying the first violation.
pub struct Validator;

impl Validator {
    // ========================================================================
    // Classification
    // ========================================================================

    /// Validate the requested number of classes.
    pub fn validate_classes(classes: usize) -> Result<(), ThematicError> {
        if classes == 0 {
            return Err(ThematicError::invalid_parameter(
                "classes",
                0.0,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Validate manual breaks: at least 2 values, finite, strictly increasing.
    pub fn validate_breaks<T: Float>(breaks: &[T]) -> Result<(), ThematicError> {
        if breaks.len() < 2 {
            return Err(ThematicError::InvalidBreaks(format!(
                "need at least 2 values, got {}",
                breaks.len()
            )));
        }
        if let Some((i, b)) = breaks.iter().enumerate().find(|(_, b)| !b.is_finite()) {
            return Err(ThematicError::InvalidBreaks(format!(
                "breaks[{}]={} is not finite",
                i,
                b.to_f64().unwrap_or(f64::NAN)
            )));
        }
        if let Some(i) = breaks.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ThematicError::InvalidBreaks(format!(
                "breaks must be strictly increasing (breaks[{}] >= breaks[{}])",
                i,
                i + 1
            )));
        }
        Ok(())
    }

    /// Validate the standard-deviation amplitude.
    pub fn validate_amplitude<T: Float>(amplitude: T) -> Result<(), ThematicError> {
        Self::validate_positive(amplitude.to_f64().unwrap_or(f64::NAN), "amplitude")
    }

    // ========================================================================
    // Kernel and Grid
    // ========================================================================

    /// Validate a strictly positive finite parameter (alpha, beta, span,
    /// bandwidth, resolution).
    pub fn validate_positive(value: f64, name: &'static str) -> Result<(), ThematicError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ThematicError::invalid_parameter(
                name,
                value,
                "must be positive and finite",
            ));
        }
        Ok(())
    }

    /// Validate the bounding-box padding fraction.
    pub fn validate_pad(pad: f64) -> Result<(), ThematicError> {
        if !pad.is_finite() || pad < 0.0 {
            return Err(ThematicError::invalid_parameter(
                "pad",
                pad,
                "must be non-negative and finite",
            ));
        }
        Ok(())
    }

    /// Validate a bounding box.
    pub fn validate_bbox(bbox: &BBox) -> Result<(), ThematicError> {
        if !bbox.is_valid() {
            return Err(ThematicError::invalid_parameter(
                "bbox",
                bbox.area(),
                "must be finite and not inverted",
            ));
        }
        Ok(())
    }

    /// Validate that either every input point or none carries a divisor.
    pub fn validate_divisor_presence(with_divisor: usize, total: usize) -> Result<(), ThematicError> {
        if with_divisor != 0 && with_divisor != total {
            return Err(ThematicError::InvalidInput(format!(
                "{} of {} points carry a divisor; ratio mode needs all of them",
                with_divisor, total
            )));
        }
        Ok(())
    }

    /// Validate the topology quantization.
    pub fn validate_quantization(quantization: f64) -> Result<(), ThematicError> {
        if !quantization.is_finite() || quantization < 2.0 {
            return Err(ThematicError::invalid_parameter(
                "quantization",
                quantization,
                "must be at least 2",
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Isobands
    // ========================================================================

    /// Validate isoband thresholds: at least 2, finite, strictly increasing.
    pub fn validate_thresholds(thresholds: &[f64]) -> Result<(), ThematicError> {
        if thresholds.len() < 2 {
            return Err(ThematicError::invalid_parameter(
                "thresholds",
                thresholds.len() as f64,
                "need at least 2 thresholds",
            ));
        }
        if let Some(&t) = thresholds.iter().find(|t| !t.is_finite()) {
            return Err(ThematicError::invalid_parameter(
                "thresholds",
                t,
                "must be finite",
            ));
        }
        if let Some(w) = thresholds.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ThematicError::invalid_parameter(
                "thresholds",
                w[1],
                "must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// Validate that a raster matches its coordinate arrays.
    pub fn validate_raster_shape(
        shape: (usize, usize),
        xs_len: usize,
        ys_len: usize,
    ) -> Result<(), ThematicError> {
        let expected = (ys_len, xs_len);
        if shape != expected {
            return Err(ThematicError::InvalidGridShape {
                expected,
                got: shape,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Builder Validation
    // ========================================================================

    /// Validate that no parameter was set twice.
    pub fn validate_no_duplicates(
        duplicate_param: Option<&'static str>,
    ) -> Result<(), ThematicError> {
        if let Some(param) = duplicate_param {
            return Err(ThematicError::DuplicateParameter { parameter: param });
        }
        Ok(())
    }
}
