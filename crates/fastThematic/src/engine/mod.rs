//! Layer 4: Engine
//!
//! This layer provides the accelerated kernel passes for thematic smoothing.
//! It distributes grid points across CPU cores or GPU hardware.

// Parallel execution engine using CPU threads
pub mod executor;

// GPU-accelerated execution engine using wgpu
#[cfg(feature = "gpu")]
pub mod gpu;
