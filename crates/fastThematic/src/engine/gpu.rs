//! GPU-accelerated kernel pass for thematic smoothing.
//!
//! ## Purpose
//!
//! This module evaluates the smoothing kernel on the GPU with `wgpu`: one
//! invocation per grid point accumulates the weighted value and divisor sums
//! over every input point.
//!
//! ## Design notes
//!
//! * **Single precision**: Coordinates, values and sums are uploaded as `f32`.
//!   Results agree with the CPU passes to single-precision tolerance.
//! * **Persistent executor**: Device, pipeline and buffers are kept per thread
//!   and reused (and grown) across calls.
//! * **Explicit failure**: A missing adapter or a failed read-back is reported
//!   as `ComputeBackendUnavailable`, leaving the fallback decision to the executor.
//!

use bytemuck::{Pod, Zeroable};
use tracing::debug;

// Export dependencies from thematic crate
use thematic::internals::engine::executor::{KernelConfig, KernelInputs, KernelSums};
use thematic::internals::primitives::errors::ThematicError;

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, BufferDescriptor, BufferUsages,
    CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline, ComputePipelineDescriptor,
    Device, Instance, InstanceDescriptor, MapMode, PipelineLayoutDescriptor, PollType, Queue,
    RequestAdapterOptions, ShaderModuleDescriptor, ShaderSource, ShaderStages,
};

/// Invocations per workgroup, matching `@workgroup_size` in the shader.
const WORKGROUP_SIZE: u32 = 64;

/// Maximum workgroups per dispatch dimension.
const MAX_WORKGROUPS: u32 = 65_535;

// -----------------------------------------------------------------------------
// Shader Source (WGSL)
// -----------------------------------------------------------------------------
const SHADER_SOURCE: &str = r#"
struct Config {
    n_grid: u32,
    n_points: u32,
    decay: u32,    // 0 exponential, 1 pareto, 2 gaussian, 3 triangular, 4 uniform
    ratio: u32,
    alpha: f32,
    beta: f32,
    bandwidth: f32,
    padding: f32,
}

@group(0) @binding(0) var<uniform> config: Config;
@group(0) @binding(1) var<storage, read> grid: array<vec2<f32>>;    // (lon, lat)
@group(0) @binding(2) var<storage, read> points: array<vec4<f32>>;  // (lon, lat, value, divisor)
@group(0) @binding(3) var<storage, read_write> sums: array<vec2<f32>>;

const EARTH_RADIUS_KM: f32 = 6371.0;
const DEG_TO_RAD: f32 = 0.017453292519943295;
const INV_SQRT_2PI: f32 = 0.3989422804014327;

fn haversine_km(lon1: f32, lat1: f32, lon2: f32, lat2: f32) -> f32 {
    let p1 = lat1 * DEG_TO_RAD;
    let p2 = lat2 * DEG_TO_RAD;
    let s_lat = sin((p2 - p1) * 0.5);
    let s_lon = sin((lon2 - lon1) * DEG_TO_RAD * 0.5);
    let a = clamp(s_lat * s_lat + cos(p1) * cos(p2) * s_lon * s_lon, 0.0, 1.0);
    return EARTH_RADIUS_KM * 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
}

fn weight(d: f32) -> f32 {
    var w = 0.0;
    switch config.decay {
        case 0u: {
            if (d <= 0.0) {
                w = 1.0;
            } else {
                w = exp(-config.alpha * pow(d, config.beta));
            }
        }
        case 1u: {
            w = pow(1.0 + config.alpha * d, -config.beta);
        }
        case 2u: {
            let u = d / config.bandwidth;
            w = exp(-0.5 * u * u) * INV_SQRT_2PI / config.bandwidth;
        }
        case 3u: {
            let u = d / config.bandwidth;
            if (u <= 1.0) {
                w = (1.0 - u) / config.bandwidth;
            }
        }
        default: {
            if (d <= config.bandwidth) {
                w = 0.5 / config.bandwidth;
            }
        }
    }
    return w;
}

@compute @workgroup_size(64)
fn accumulate(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let i = global_id.x;
    if (i >= config.n_grid) {
        return;
    }

    let g = grid[i];
    var num = 0.0;
    var den = 0.0;
    for (var j = 0u; j < config.n_points; j = j + 1u) {
        let p = points[j];
        let w = weight(haversine_km(p.x, p.y, g.x, g.y));
        num = num + p.z * w;
        if (config.ratio != 0u) {
            den = den + p.w * w;
        }
    }
    sums[i] = vec2<f32>(num, den);
}
"#;

thread_local! {
    static THREAD_EXECUTOR: std::cell::RefCell<Option<GpuExecutor>> = const { std::cell::RefCell::new(None) };
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuConfig {
    n_grid: u32,
    n_points: u32,
    decay: u32,
    ratio: u32,
    alpha: f32,
    beta: f32,
    bandwidth: f32,
    padding: f32,
}

struct GpuExecutor {
    device: Device,
    queue: Queue,
    pipeline: ComputePipeline,

    config_buffer: Option<Buffer>,
    grid_buffer: Option<Buffer>,
    points_buffer: Option<Buffer>,
    sums_buffer: Option<Buffer>,
    staging_buffer: Option<Buffer>,

    bind_group: Option<BindGroup>,

    n_grid: u32,
}

impl GpuExecutor {
    async fn new() -> Result<Self, String> {
        let instance = Instance::new(&InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&RequestAdapterOptions::default())
            .await
            .map_err(|_| "no GPU adapter found".to_string())?;

        let (device, queue): (Device, Queue) = adapter
            .request_device(&Default::default())
            .await
            .map_err(|e| format!("device error: {:?}", e))?;

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Smoothing Shader"),
            source: ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let storage = |binding: u32, read_only: bool| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Smoothing Data"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, true),
                storage(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("accumulate"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("accumulate"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            config_buffer: None,
            grid_buffer: None,
            points_buffer: None,
            sums_buffer: None,
            staging_buffer: None,
            bind_group: None,
            n_grid: 0,
        })
    }

    /// Allocate `buffer_opt` if missing or too small; returns whether it was replaced.
    fn ensure_buffer_capacity(
        device: &Device,
        label: &str,
        buffer_opt: &mut Option<Buffer>,
        size_required: u64,
        usage: BufferUsages,
    ) -> bool {
        if buffer_opt
            .as_ref()
            .is_some_and(|buffer| buffer.size() >= size_required)
        {
            return false;
        }
        *buffer_opt = Some(device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: size_required,
            usage,
            mapped_at_creation: false,
        }));
        true
    }

    fn upload(&mut self, grid: &[[f32; 2]], points: &[[f32; 4]], config: GpuConfig) {
        let grid_bytes = std::mem::size_of_val(grid) as u64;
        let point_bytes = std::mem::size_of_val(points) as u64;
        let sums_bytes = (grid.len() * 2 * 4) as u64;

        let mut bg_needs_update = Self::ensure_buffer_capacity(
            &self.device,
            "Config",
            &mut self.config_buffer,
            std::mem::size_of::<GpuConfig>() as u64,
            BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        );
        bg_needs_update |= Self::ensure_buffer_capacity(
            &self.device,
            "Grid",
            &mut self.grid_buffer,
            grid_bytes,
            BufferUsages::STORAGE | BufferUsages::COPY_DST,
        );
        bg_needs_update |= Self::ensure_buffer_capacity(
            &self.device,
            "Points",
            &mut self.points_buffer,
            point_bytes,
            BufferUsages::STORAGE | BufferUsages::COPY_DST,
        );
        bg_needs_update |= Self::ensure_buffer_capacity(
            &self.device,
            "Sums",
            &mut self.sums_buffer,
            sums_bytes,
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        Self::ensure_buffer_capacity(
            &self.device,
            "Staging",
            &mut self.staging_buffer,
            sums_bytes,
            BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        );

        if let (Some(config_buf), Some(grid_buf), Some(points_buf)) = (
            self.config_buffer.as_ref(),
            self.grid_buffer.as_ref(),
            self.points_buffer.as_ref(),
        ) {
            self.queue
                .write_buffer(config_buf, 0, bytemuck::cast_slice(&[config]));
            self.queue.write_buffer(grid_buf, 0, bytemuck::cast_slice(grid));
            self.queue
                .write_buffer(points_buf, 0, bytemuck::cast_slice(points));
        }

        if bg_needs_update || self.bind_group.is_none() {
            if let (Some(config_buf), Some(grid_buf), Some(points_buf), Some(sums_buf)) = (
                self.config_buffer.as_ref(),
                self.grid_buffer.as_ref(),
                self.points_buffer.as_ref(),
                self.sums_buffer.as_ref(),
            ) {
                self.bind_group = Some(self.device.create_bind_group(&BindGroupDescriptor {
                    label: Some("Smoothing BG"),
                    layout: &self.pipeline.get_bind_group_layout(0),
                    entries: &[
                        BindGroupEntry {
                            binding: 0,
                            resource: config_buf.as_entire_binding(),
                        },
                        BindGroupEntry {
                            binding: 1,
                            resource: grid_buf.as_entire_binding(),
                        },
                        BindGroupEntry {
                            binding: 2,
                            resource: points_buf.as_entire_binding(),
                        },
                        BindGroupEntry {
                            binding: 3,
                            resource: sums_buf.as_entire_binding(),
                        },
                    ],
                }));
            }
        }

        self.n_grid = grid.len() as u32;
    }

    fn dispatch(&self) -> Option<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Smoothing Main"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor::default());
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, self.bind_group.as_ref()?, &[]);
            pass.dispatch_workgroups(self.n_grid.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Some(())
    }

    async fn download_sums(&self) -> Option<Vec<f32>> {
        let size = (self.n_grid as usize * 2 * 4) as u64;
        let sums = self.sums_buffer.as_ref()?;
        let staging = self.staging_buffer.as_ref()?;

        let mut encoder = self.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(sums, 0, staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..size);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        let _ = self.device.poll(PollType::Wait {
            submission_index: None,
            timeout: None,
        });

        if let Some(Ok(())) = rx.receive().await {
            let data = slice.get_mapped_range();
            let ret = bytemuck::cast_slice(&data).to_vec();
            drop(data);
            staging.unmap();
            Some(ret)
        } else {
            None
        }
    }
}

/// Perform a GPU-accelerated kernel pass.
pub fn smooth_pass_gpu(
    inputs: &KernelInputs,
    config: &KernelConfig,
) -> Result<KernelSums, ThematicError> {
    use pollster::block_on;

    let n_grid = inputs.grid_len();
    let ratio = inputs.divisors.is_some();
    if n_grid == 0 || inputs.points_len() == 0 {
        return Ok(KernelSums {
            numerator: vec![0.0; n_grid],
            denominator: ratio.then(|| vec![0.0; n_grid]),
        });
    }
    if (n_grid as u64).div_ceil(WORKGROUP_SIZE as u64) > MAX_WORKGROUPS as u64 {
        return Err(ThematicError::ComputeBackendUnavailable(format!(
            "grid of {} points exceeds a single GPU dispatch",
            n_grid
        )));
    }

    debug!(
        grid = n_grid,
        points = inputs.points_len(),
        ratio,
        "dispatching GPU kernel pass"
    );

    let grid: Vec<[f32; 2]> = inputs
        .grid_lon
        .iter()
        .zip(&inputs.grid_lat)
        .map(|(&lon, &lat)| [lon as f32, lat as f32])
        .collect();
    let points: Vec<[f32; 4]> = (0..inputs.points_len())
        .map(|j| {
            let divisor = inputs.divisors.as_ref().map_or(0.0, |d| d[j]);
            [
                inputs.point_lon[j] as f32,
                inputs.point_lat[j] as f32,
                inputs.values[j] as f32,
                divisor as f32,
            ]
        })
        .collect();

    let gpu_config = GpuConfig {
        n_grid: n_grid as u32,
        n_points: points.len() as u32,
        decay: config.function.id(),
        ratio: u32::from(ratio),
        alpha: config.alpha as f32,
        beta: config.beta as f32,
        bandwidth: config.bandwidth as f32,
        padding: 0.0,
    };

    // Persistent Thread-Local Executor
    THREAD_EXECUTOR.with(|cell| {
        let mut opt = cell.borrow_mut();
        if opt.is_none() {
            *opt = Some(
                block_on(GpuExecutor::new()).map_err(ThematicError::ComputeBackendUnavailable)?,
            );
        }
        let exec = opt.as_mut().ok_or_else(|| {
            ThematicError::ComputeBackendUnavailable("GPU executor is not initialised".to_string())
        })?;

        exec.upload(&grid, &points, gpu_config);
        let raw = exec
            .dispatch()
            .and_then(|_| block_on(exec.download_sums()))
            .ok_or_else(|| {
                ThematicError::ComputeBackendUnavailable(
                    "failed to read back GPU results".to_string(),
                )
            })?;

        let (numerator, denominator): (Vec<f64>, Vec<f64>) = raw
            .chunks_exact(2)
            .map(|pair| (pair[0] as f64, pair[1] as f64))
            .unzip();

        Ok(KernelSums {
            numerator,
            denominator: ratio.then_some(denominator),
        })
    })
}
