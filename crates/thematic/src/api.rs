//! High-level API for thematic computations.
//!
//! ## Purpose
//!
//! This module provides the primary user-facing entry points: fluent builders
//! for classification, smoothing and discontinuity, the multivariate
//! combiner, and the raster-to-isobands function.
//!
//! ## Design notes
//!
//! * **Ergonomic**: Fluent builders with sensible defaults for all parameters.
//! * **Validated**: Parameters are validated when `.build()` is called.
//! * **Deferred**: A parameter set twice is reported by `.build()`.
//!
//! ### Configuration Flow
//!
//! 1. Create a builder via `Classifier::new()`, `Smoothing::new()` or `Discontinuity::new()`.
//! 2. Chain configuration methods (`.method()`, `.classes()`, `.span()`, etc.).
//! 3. Call `.build()` and run the resulting engine on a series or a layer.

// External dependencies
use ndarray::ArrayView2;
use num_traits::Float;
use tracing::debug;

// Internal dependencies
use crate::algorithms::classification::{compute_breaks, count_by_class, MethodOptions};
use crate::algorithms::discontinuity::{has_polygons, score_borders};
use crate::algorithms::isobands::{bands_to_features, extract_bands};
use crate::engine::executor::{SmoothingConfig, SmoothingExecutor};
use crate::engine::validator::Validator;
use crate::math::decay::DecayKernel;
use crate::primitives::series::SeriesInput;

// Publicly re-exported types
pub use crate::algorithms::classification::{
    class_of, parse_breaks, ClassificationMethod, IntervalClosure, MeanPosition,
};
pub use crate::algorithms::combiner::{ClassedVariable, Combiner, JointClass};
pub use crate::algorithms::discontinuity::{DiscontinuityEdge, DiscontinuityMode};
pub use crate::algorithms::grid::{appropriate_resolution, make_grid, BBox, GridParameters, PointGrid};
pub use crate::algorithms::topology::DEFAULT_QUANTIZATION;
pub use crate::engine::executor::{InputPoint, Progress, ProgressFn, SmoothPassFn};
pub use crate::engine::output::{ClassificationResult, DiscontinuityResult, SmoothedGrid};
pub use crate::math::decay::{KdeKernel, StewartFunction};
pub use crate::math::stats::Summary;
pub use crate::primitives::backend::Backend;
pub use crate::primitives::errors::ThematicError;
pub use crate::primitives::layer::{Feature, FeatureCollection, FeatureId};

/// Number of classes used when none is requested.
pub const DEFAULT_CLASSES: usize = 5;

/// Stewart beta used when none is given.
pub const DEFAULT_BETA: f64 = 2.0;

// ============================================================================
// Classification
// ============================================================================

/// Fluent builder for configuring a classification.
#[derive(Debug, Clone)]
pub struct ClassifierBuilder<T> {
    /// Discretisation method (default: Quantile, or Manual when breaks are set).
    pub method: Option<ClassificationMethod>,

    /// Requested number of classes.
    pub classes: Option<usize>,

    /// Interval closure (default: Right).
    pub closure: Option<IntervalClosure>,

    /// Manual breaks.
    pub breaks: Option<Vec<T>>,

    /// Standard-deviation amplitude (default: 1).
    pub amplitude: Option<T>,

    /// Standard-deviation mean position (default: Boundary).
    pub mean_position: Option<MeanPosition>,

    /// Palette reference, carried to the result.
    pub palette: Option<String>,

    /// No-data colour, carried to the result.
    pub no_data_color: Option<String>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

impl<T: Float> Default for ClassifierBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> ClassifierBuilder<T> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            method: None,
            classes: None,
            closure: None,
            breaks: None,
            amplitude: None,
            mean_position: None,
            palette: None,
            no_data_color: None,
            duplicate_param: None,
        }
    }

    /// Set the discretisation method.
    pub fn method(mut self, method: ClassificationMethod) -> Self {
        if self.method.is_some() {
            self.duplicate_param = Some("method");
        }
        self.method = Some(method);
        self
    }

    /// Set the requested number of classes.
    pub fn classes(mut self, classes: usize) -> Self {
        if self.classes.is_some() {
            self.duplicate_param = Some("classes");
        }
        self.classes = Some(classes);
        self
    }

    /// Set the interval closure.
    pub fn closure(mut self, closure: IntervalClosure) -> Self {
        if self.closure.is_some() {
            self.duplicate_param = Some("closure");
        }
        self.closure = Some(closure);
        self
    }

    /// Set manual breaks.
    pub fn breaks(mut self, breaks: Vec<T>) -> Self {
        if self.breaks.is_some() {
            self.duplicate_param = Some("breaks");
        }
        self.breaks = Some(breaks);
        self
    }

    /// Set the standard-deviation amplitude.
    pub fn amplitude(mut self, amplitude: T) -> Self {
        if self.amplitude.is_some() {
            self.duplicate_param = Some("amplitude");
        }
        self.amplitude = Some(amplitude);
        self
    }

    /// Set the standard-deviation mean position.
    pub fn mean_position(mut self, position: MeanPosition) -> Self {
        if self.mean_position.is_some() {
            self.duplicate_param = Some("mean_position");
        }
        self.mean_position = Some(position);
        self
    }

    /// Set the palette reference.
    pub fn palette(mut self, palette: impl Into<String>) -> Self {
        self.palette = Some(palette.into());
        self
    }

    /// Set the no-data colour.
    pub fn no_data_color(mut self, color: impl Into<String>) -> Self {
        self.no_data_color = Some(color.into());
        self
    }

    /// Build the classifier.
    pub fn build(self) -> Result<SeriesClassifier<T>, ThematicError> {
        // Check for duplicate parameter configuration
        Validator::validate_no_duplicates(self.duplicate_param)?;

        let method = self.method.unwrap_or(if self.breaks.is_some() {
            ClassificationMethod::Manual
        } else {
            ClassificationMethod::Quantile
        });

        let classes = self.classes.unwrap_or(DEFAULT_CLASSES);
        Validator::validate_classes(classes)?;
        if method == ClassificationMethod::NestedMeans && !classes.is_power_of_two() {
            return Err(ThematicError::invalid_parameter(
                "classes",
                classes as f64,
                "nested means requires a power of two",
            ));
        }

        if method == ClassificationMethod::Manual {
            match &self.breaks {
                Some(breaks) => Validator::validate_breaks(breaks)?,
                None => {
                    return Err(ThematicError::InvalidBreaks(
                        "no breaks were provided".to_string(),
                    ))
                }
            }
        }

        let amplitude = self.amplitude.unwrap_or_else(T::one);
        Validator::validate_amplitude(amplitude)?;

        Ok(SeriesClassifier {
            method,
            options: MethodOptions {
                classes,
                closure: self.closure.unwrap_or_default(),
                amplitude,
                mean_position: self.mean_position.unwrap_or_default(),
                breaks: self.breaks,
            },
            palette: self.palette,
            no_data_color: self.no_data_color,
        })
    }
}

/// A validated classification configuration.
#[derive(Debug, Clone)]
pub struct SeriesClassifier<T> {
    method: ClassificationMethod,
    options: MethodOptions<T>,
    palette: Option<String>,
    no_data_color: Option<String>,
}

impl<T: Float> SeriesClassifier<T> {
    /// Method of this classifier.
    pub fn method(&self) -> ClassificationMethod {
        self.method
    }

    /// Classify a series.
    pub fn classify<S>(&self, series: &S) -> Result<ClassificationResult<T>, ThematicError>
    where
        S: SeriesInput<T> + ?Sized,
    {
        let finite = series.finite_series();
        if finite.is_empty() {
            return Err(ThematicError::EmptySeries);
        }
        let sorted = finite.sorted();

        let breaks = compute_breaks(self.method, &sorted, &self.options)?;
        let (entities_by_class, outside) = count_by_class(&sorted, &breaks, self.options.closure);

        debug!(
            method = self.method.name(),
            classes = entities_by_class.len(),
            excluded = finite.excluded,
            outside,
            "classified series"
        );

        Ok(ClassificationResult {
            breaks,
            entities_by_class,
            method: self.method,
            closure: self.options.closure,
            excluded: finite.excluded,
            outside,
            palette: self.palette.clone(),
            no_data_color: self.no_data_color.clone(),
        })
    }
}

/// Statistical summary of the finite values of a series.
pub fn summarize<T, S>(series: &S) -> Result<Summary<T>, ThematicError>
where
    T: Float,
    S: SeriesInput<T> + ?Sized,
{
    Summary::from_sorted(&series.finite_series().sorted()).ok_or(ThematicError::EmptySeries)
}

// ============================================================================
// Smoothing
// ============================================================================

/// Fluent builder for configuring a smoothing request.
#[derive(Debug, Clone, Default)]
pub struct SmoothingBuilder {
    /// Stewart potential function.
    pub stewart: Option<StewartFunction>,

    /// KDE kernel.
    pub kde: Option<KdeKernel>,

    /// Stewart alpha.
    pub alpha: Option<f64>,

    /// Stewart beta (default: 2).
    pub beta: Option<f64>,

    /// Distance (km) at which the Stewart weight halves.
    pub span: Option<f64>,

    /// KDE bandwidth (km).
    pub bandwidth: Option<f64>,

    /// Grid spacing in degrees.
    pub resolution: Option<f64>,

    /// Explicit grid extent.
    pub bbox: Option<BBox>,

    /// Padding fraction of the grid extent.
    pub pad: Option<f64>,

    /// Execution backend.
    pub backend: Option<Backend>,

    /// Whether an unavailable accelerated backend falls back to the CPU.
    pub cpu_fallback: Option<bool>,

    /// Progress callback.
    pub on_progress: Option<ProgressFn>,

    // ======================================
    // DEV
    // ======================================
    /// Custom smooth pass function.
    #[doc(hidden)]
    pub custom_smooth_pass: Option<SmoothPassFn>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(mut self, value: $ty) -> Self {
            if self.$name.is_some() {
                self.duplicate_param = Some(stringify!($name));
            }
            self.$name = Some(value);
            self
        }
    };
}

impl SmoothingBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    setter!(
        /// Use a Stewart potential with the given function.
        stewart: StewartFunction
    );
    setter!(
        /// Use a kernel density estimate with the given kernel.
        kde: KdeKernel
    );
    setter!(
        /// Set the Stewart alpha.
        alpha: f64
    );
    setter!(
        /// Set the Stewart beta.
        beta: f64
    );
    setter!(
        /// Set the distance (km) at which the Stewart weight halves.
        span: f64
    );
    setter!(
        /// Set the KDE bandwidth (km).
        bandwidth: f64
    );
    setter!(
        /// Set the grid spacing in degrees.
        resolution: f64
    );
    setter!(
        /// Set the grid extent.
        bbox: BBox
    );
    setter!(
        /// Pad the grid extent by a fraction of itself.
        pad: f64
    );
    setter!(
        /// Set the execution backend.
        backend: Backend
    );
    setter!(
        /// Allow falling back to the CPU when the backend is unavailable.
        cpu_fallback: bool
    );
    setter!(
        /// Set a progress callback.
        on_progress: ProgressFn
    );

    // ==========================
    // Development Options
    // ==========================

    /// Set a custom smooth pass function for execution (only for dev)
    #[doc(hidden)]
    pub fn custom_smooth_pass(mut self, pass: SmoothPassFn) -> Self {
        self.custom_smooth_pass = Some(pass);
        self
    }

    fn resolve_kernel(&self) -> Result<DecayKernel, ThematicError> {
        match (self.stewart, self.kde) {
            (Some(_), Some(_)) => Err(ThematicError::InvalidInput(
                "choose either a Stewart potential or a kernel density estimate".to_string(),
            )),
            (_, Some(kernel)) => {
                if self.alpha.is_some() || self.beta.is_some() || self.span.is_some() {
                    return Err(ThematicError::InvalidInput(
                        "alpha, beta and span only apply to Stewart potentials".to_string(),
                    ));
                }
                let bandwidth = self.bandwidth.ok_or_else(|| {
                    ThematicError::InvalidInput(
                        "kernel density estimation requires a bandwidth".to_string(),
                    )
                })?;
                Validator::validate_positive(bandwidth, "bandwidth")?;
                Ok(DecayKernel::kde(kernel, bandwidth))
            }
            (function, None) => {
                if self.bandwidth.is_some() {
                    return Err(ThematicError::InvalidInput(
                        "bandwidth only applies to kernel density estimation".to_string(),
                    ));
                }
                let function = function.unwrap_or_default();
                let beta = self.beta.unwrap_or(DEFAULT_BETA);
                Validator::validate_positive(beta, "beta")?;
                let alpha = match (self.alpha, self.span) {
                    (Some(alpha), None) => {
                        Validator::validate_positive(alpha, "alpha")?;
                        alpha
                    }
                    (None, Some(span)) => {
                        Validator::validate_positive(span, "span")?;
                        function.alpha_from_span(span, beta)
                    }
                    (Some(_), Some(_)) => {
                        return Err(ThematicError::InvalidInput(
                            "alpha and span are mutually exclusive".to_string(),
                        ))
                    }
                    (None, None) => {
                        return Err(ThematicError::InvalidInput(
                            "a Stewart potential requires alpha or span".to_string(),
                        ))
                    }
                };
                Ok(DecayKernel::stewart(function, alpha, beta))
            }
        }
    }

    /// Build the smoothing engine.
    pub fn build(self) -> Result<SmoothingEngine, ThematicError> {
        // Check for duplicate parameter configuration
        Validator::validate_no_duplicates(self.duplicate_param)?;

        let kernel = self.resolve_kernel()?;

        if let Some(res) = self.resolution {
            Validator::validate_positive(res, "resolution")?;
        }
        if let Some(bbox) = &self.bbox {
            Validator::validate_bbox(bbox)?;
        }
        if let Some(pad) = self.pad {
            Validator::validate_pad(pad)?;
        }

        Ok(SmoothingEngine {
            executor: SmoothingExecutor::new(SmoothingConfig {
                kernel,
                resolution: self.resolution,
                bbox: self.bbox,
                pad: self.pad,
                backend: self.backend.unwrap_or_default(),
                cpu_fallback: self.cpu_fallback.unwrap_or(false),
                on_progress: self.on_progress,
                custom_smooth_pass: self.custom_smooth_pass,
            }),
        })
    }
}

/// A validated smoothing configuration.
#[derive(Debug, Clone)]
pub struct SmoothingEngine {
    executor: SmoothingExecutor,
}

impl SmoothingEngine {
    /// Decay function and parameters in use.
    pub fn kernel(&self) -> DecayKernel {
        self.executor.config().kernel
    }

    /// Smooth `variable` over a layer, optionally as a ratio to `divisor`.
    pub fn smooth(
        &self,
        layer: &FeatureCollection,
        variable: &str,
        divisor: Option<&str>,
    ) -> Result<SmoothedGrid, ThematicError> {
        self.executor.smooth(layer, variable, divisor)
    }

    /// Smooth raw input points on an existing grid.
    pub fn smooth_points(
        &self,
        points: &[InputPoint],
        grid: &PointGrid,
    ) -> Result<SmoothedGrid, ThematicError> {
        self.executor.smooth_points(points, grid)
    }
}

// ============================================================================
// Isobands
// ============================================================================

/// Isobands of a raster whose value at `[[row, col]]` sits at `(xs[col], ys[row])`.
///
/// One `MultiPolygon` feature is returned per consecutive threshold pair,
/// with `min_v`, `max_v`, `center_v` and `variable` (= `center_v`) properties.
pub fn isobands(
    raster: ArrayView2<f64>,
    xs: &[f64],
    ys: &[f64],
    thresholds: &[f64],
    variable: &str,
) -> Result<FeatureCollection, ThematicError> {
    Validator::validate_raster_shape(raster.dim(), xs.len(), ys.len())?;
    Validator::validate_thresholds(thresholds)?;
    let bands = extract_bands(raster, xs, ys, thresholds);
    Ok(bands_to_features(&bands, variable))
}

// ============================================================================
// Discontinuity
// ============================================================================

/// Fluent builder for configuring a discontinuity computation.
#[derive(Debug, Clone, Default)]
pub struct DiscontinuityBuilder {
    /// Statistic (default: Relative).
    pub mode: Option<DiscontinuityMode>,

    /// Lattice steps per axis (default: 1e5).
    pub quantization: Option<f64>,

    /// Tracks if any parameter was set multiple times (for validation).
    #[doc(hidden)]
    pub duplicate_param: Option<&'static str>,
}

impl DiscontinuityBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    setter!(
        /// Set the statistic.
        mode: DiscontinuityMode
    );
    setter!(
        /// Set the number of lattice steps per axis.
        quantization: f64
    );

    /// Build the discontinuity engine.
    pub fn build(self) -> Result<DiscontinuityEngine, ThematicError> {
        Validator::validate_no_duplicates(self.duplicate_param)?;
        let quantization = self.quantization.unwrap_or(DEFAULT_QUANTIZATION);
        Validator::validate_quantization(quantization)?;
        Ok(DiscontinuityEngine {
            mode: self.mode.unwrap_or_default(),
            quantization,
        })
    }
}

/// A validated discontinuity configuration.
#[derive(Debug, Clone, Copy)]
pub struct DiscontinuityEngine {
    mode: DiscontinuityMode,
    quantization: f64,
}

impl DiscontinuityEngine {
    /// Score every shared border of a polygon layer on `variable`.
    pub fn compute(
        &self,
        layer: &FeatureCollection,
        variable: &str,
    ) -> Result<DiscontinuityResult, ThematicError> {
        if layer.is_empty() {
            return Err(ThematicError::EmptyInputSet);
        }
        if !has_polygons(layer) {
            return Err(ThematicError::InvalidInput(
                "discontinuities require a polygon layer".to_string(),
            ));
        }

        let scored = score_borders(layer, variable, self.mode, self.quantization);
        debug!(
            mode = self.mode.name(),
            edges = scored.edges.len(),
            skipped = scored.skipped,
            "computed discontinuities"
        );

        Ok(DiscontinuityResult {
            edges: scored.edges,
            mode: self.mode,
            skipped: scored.skipped,
        })
    }
}
