#![cfg(feature = "dev")]
#![cfg(feature = "gpu")]
//! Tests for the GPU kernel pass.
//!
//! These tests verify:
//! - Agreement of the single-precision GPU sums with the CPU sums
//! - Ratio mode on the GPU
//! - Degenerate inputs that never reach the device
//!
//! Machines without a GPU adapter report `ComputeBackendUnavailable`; the
//! comparisons are skipped in that case.

use approx::assert_relative_eq;

use fastThematic::gpu::smooth_pass_gpu;
use fastThematic::prelude::*;
use thematic::internals::algorithms::grid::{make_grid, GridParameters};
use thematic::internals::engine::executor::{smooth_pass_sequential, KernelInputs, KernelSums};
use thematic::internals::math::decay::{DecayKernel, KdeKernel, StewartFunction};

fn inputs(ratio: bool) -> KernelInputs {
    let grid = make_grid(&GridParameters::new(BBox::new(0.0, 40.0, 8.0, 48.0), 0.5)).unwrap();
    let points: Vec<InputPoint> = (0..30)
        .map(|i| {
            let t = i as f64;
            let p = InputPoint::new((t * 0.61) % 8.0, 40.0 + (t * 0.29) % 8.0, 10.0 + t);
            if ratio {
                p.with_divisor(2.0 + t % 5.0)
            } else {
                p
            }
        })
        .collect();
    KernelInputs::new(&points, &grid)
}

/// Run the GPU pass, or `None` when no adapter is available.
fn run_gpu(inputs: &KernelInputs, kernel: &DecayKernel) -> Option<KernelSums> {
    match smooth_pass_gpu(inputs, kernel) {
        Ok(sums) => Some(sums),
        Err(ThematicError::ComputeBackendUnavailable(reason)) => {
            println!("GPU pass skipped: {}", reason);
            None
        }
        Err(other) => panic!("unexpected error: {}", other),
    }
}

/// Test that GPU sums match the CPU sums for every decay function.
#[test]
fn test_gpu_matches_cpu() {
    let inputs = inputs(false);
    let kernels = [
        DecayKernel::stewart(StewartFunction::Pareto, StewartFunction::Pareto.alpha_from_span(200.0, 2.0), 2.0),
        DecayKernel::stewart(StewartFunction::Exponential, 1e-5, 2.0),
        DecayKernel::kde(KdeKernel::Gaussian, 150.0),
        DecayKernel::kde(KdeKernel::Triangular, 400.0),
        DecayKernel::kde(KdeKernel::Uniform, 400.0),
    ];

    for kernel in &kernels {
        let Some(gpu) = run_gpu(&inputs, kernel) else {
            return;
        };
        let cpu = smooth_pass_sequential(&inputs, kernel).unwrap();
        assert_eq!(gpu.numerator.len(), cpu.numerator.len());
        for (g, c) in gpu.numerator.iter().zip(&cpu.numerator) {
            assert_relative_eq!(*g, *c, max_relative = 1e-3, epsilon = 1e-6);
        }
    }
}

/// Test ratio mode on the GPU.
#[test]
fn test_gpu_ratio_mode() {
    let inputs = inputs(true);
    let kernel = DecayKernel::stewart(StewartFunction::Pareto, 1e-4, 2.0);
    let Some(gpu) = run_gpu(&inputs, &kernel) else {
        return;
    };
    let cpu = smooth_pass_sequential(&inputs, &kernel).unwrap();

    let (gd, cd) = (gpu.denominator.unwrap(), cpu.denominator.unwrap());
    for i in 0..cd.len() {
        assert_relative_eq!(
            gpu.numerator[i] / gd[i],
            cpu.numerator[i] / cd[i],
            max_relative = 1e-3
        );
    }
}

/// Test that an empty point set yields zero sums without a device.
#[test]
fn test_gpu_empty_points() {
    let grid = make_grid(&GridParameters::new(BBox::new(0.0, 0.0, 1.0, 1.0), 0.5)).unwrap();
    let inputs = KernelInputs::new(&[], &grid);
    let sums = smooth_pass_gpu(&inputs, &DecayKernel::kde(KdeKernel::Gaussian, 10.0)).unwrap();
    assert_eq!(sums.numerator, vec![0.0; 9]);
    assert!(sums.denominator.is_none());
}

/// Test the smoothing builder on the GPU backend.
#[test]
fn test_gpu_builder() {
    let points = vec![
        InputPoint::new(2.35, 48.85, 2100.0),
        InputPoint::new(4.83, 45.76, 520.0),
    ];
    let grid = make_grid(&GridParameters::new(BBox::new(2.0, 45.0, 5.0, 49.0), 1.0)).unwrap();

    let result = Smoothing::new()
        .stewart(Pareto)
        .span(100.0)
        .backend(GPU)
        .build()
        .unwrap()
        .smooth_points(&points, &grid);

    match result {
        Ok(smoothed) => assert_eq!(smoothed.z.len(), grid.len()),
        Err(err) => assert!(matches!(err, ThematicError::ComputeBackendUnavailable(_))),
    }
}
