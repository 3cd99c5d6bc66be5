//! Execution backend configuration for the smoothing engine.
//!
//! ## Purpose
//!
//! This module defines the `Backend` enum used to select where the smoothing
//! kernel runs. The core crate only ships a sequential CPU pass; the GPU pass
//! is provided by the `fastThematic` extension crate through the
//! `custom_smooth_pass` hook.
//!
//! ## Invariants
//!
//! * The default backend is always `CPU`.
//! * Requesting `GPU` without an injected pass is an error, never a silent downgrade.

use core::fmt::{Display, Formatter, Result};

/// Execution backend for the smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum Backend {
    /// CPU execution (may still use parallelism via rayon in `fastThematic`).
    #[default]
    CPU,

    /// GPU execution (requires `fastThematic` with the `gpu` feature).
    GPU,
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Backend::CPU => write!(f, "CPU"),
            Backend::GPU => write!(f, "GPU"),
        }
    }
}
