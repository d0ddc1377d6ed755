//! Benchmark driver.
//!
//! A run moves through typed phases, each consuming the previous one:
//!
//! ```text
//! RequestedTransform -> Resolved -> Planned -> WarmedUp -> Timed -> BenchmarkReport
//! ```
//!
//! A rejected descriptor never gets past [`Resolved::new`]. Device buffers,
//! scratch and the plan are owned by the phase values, so they are released
//! whichever phase fails or finishes.

use std::fmt;

use tracing::{debug, enabled, info, trace, warn, Level};

use crate::buffers::{buffer_sizes, format_buffer, gather, synthesize_input, zeroed, HostBuffers};
use crate::compare::Comparison;
use crate::engine::{Device, DeviceBuffer, ExecBuffers, FftEngine, PlanDescription};
use crate::error::{Result, RiderError, Stage};
use crate::layout;
use crate::reference;
use crate::types::{Placement, RequestedTransform, ResolvedTransform};
use crate::validate::validate;

/// Knobs of a run that are not part of the transform itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkOptions {
    /// Timed executions; the warm-up is not counted.
    pub ntrial: usize,
    /// Validator verbosity. Zero stops at the first failing check.
    pub verbosity: u32,
    /// Copy the output back after every trial and dump it at trace level.
    pub inspect_output: bool,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self { ntrial: 1, verbosity: 0, inspect_output: false }
    }
}

/// Operation-count factor: 2.5 when either side is real, 5.0 otherwise.
#[must_use]
pub fn flop_factor(transform: &ResolvedTransform) -> f64 {
    if transform.kind().is_real() {
        2.5
    } else {
        5.0
    }
}

/// Throughput of one execution from the standard FFT operation-count heuristic,
/// `batch * k * N * log2(N) / (1e6 * ms)`.
///
/// ```
/// # use fft_rider::bench::gflops;
/// let g = gflops(1, 5.0, 1024, 1.0);
/// assert!((g - 0.0512).abs() < 1e-12);
/// ```
#[must_use]
pub fn gflops(batch: usize, flop_factor: f64, total_elements: usize, elapsed_ms: f64) -> f64 {
    let n = total_elements as f64;
    batch as f64 * flop_factor * n * n.log2() / (1e6 * elapsed_ms)
}

/// Elapsed milliseconds of each timed trial, in trial order. Samples are only
/// ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingSamples(Vec<f64>);

impl TimingSamples {
    pub fn push(&mut self, elapsed_ms: f64) {
        self.0.push(elapsed_ms);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.0.iter().copied().reduce(f64::min)
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (!self.0.is_empty()).then(|| self.0.iter().sum::<f64>() / self.0.len() as f64)
    }
}

/// A resolved and validated transform.
#[derive(Debug, Clone)]
pub struct Resolved {
    transform: ResolvedTransform,
}

impl Resolved {
    /// Fills the defaults and validates. Diagnostics are logged at warn level
    /// and returned as an [`RiderError::InvalidDescriptor`].
    pub fn new(request: &RequestedTransform, verbosity: u32) -> Result<Self> {
        let transform = layout::resolve(request)?;
        let validation = validate(&transform, verbosity);
        for diagnostic in &validation.diagnostics {
            warn!(check = %diagnostic.check, "{}", diagnostic.message);
        }
        validation.into_result()?;
        info!(kind = %transform.kind(), lengths = ?transform.lengths(), "descriptor resolved");
        Ok(Self { transform })
    }

    #[must_use]
    pub fn transform(&self) -> &ResolvedTransform {
        &self.transform
    }

    /// Creates the plan and acquires every device buffer the run will use.
    pub fn plan<E: FftEngine>(self, engine: &E, options: BenchmarkOptions) -> Result<Planned<'_, E>> {
        let transform = self.transform;
        let device = engine.device();

        let description = PlanDescription::from_resolved(&transform);
        let plan = engine
            .create_plan(&description)
            .map_err(|e| RiderError::engine(Stage::Plan, e))?;

        let scratch_bytes = engine.scratch_bytes(&plan);
        let scratch = if scratch_bytes > 0 {
            Some(allocate(device, scratch_bytes)?)
        } else {
            None
        };
        debug!(scratch_bytes, "work buffer");

        let input = buffer_sizes(&transform, true)?
            .into_iter()
            .map(|bytes| allocate(device, bytes))
            .collect::<Result<Vec<_>>>()?;
        let output = match transform.placement() {
            Placement::InPlace => Vec::new(),
            Placement::OutOfPlace => buffer_sizes(&transform, false)?
                .into_iter()
                .map(|bytes| allocate(device, bytes))
                .collect::<Result<Vec<_>>>()?,
        };

        let host_input = synthesize_input(&transform)?;
        if enabled!(Level::DEBUG) {
            debug!(
                "input:\n{}",
                format_buffer(&host_input, transform.precision(), &transform.input_layout(), transform.batch())
            );
        }
        info!("plan created");

        Ok(Planned(Session {
            engine,
            transform,
            options,
            plan,
            scratch_bytes,
            scratch,
            input,
            output,
            host_input,
        }))
    }
}

fn allocate<D: Device>(device: &D, bytes: usize) -> Result<D::Buffer> {
    device
        .allocate(bytes)
        .map_err(|e| RiderError::allocation(Stage::Plan, bytes, e))
}

// Resources shared by the phases after planning.
struct Session<'e, E: FftEngine> {
    engine: &'e E,
    transform: ResolvedTransform,
    options: BenchmarkOptions,
    plan: E::Plan,
    scratch_bytes: usize,
    scratch: Option<DeviceBuffer<E>>,
    input: Vec<DeviceBuffer<E>>,
    output: Vec<DeviceBuffer<E>>,
    host_input: HostBuffers,
}

impl<'e, E: FftEngine> Session<'e, E> {
    fn upload(&mut self, stage: Stage) -> Result<()> {
        let engine = self.engine;
        let device = engine.device();
        for (dst, src) in self.input.iter_mut().zip(&self.host_input) {
            device
                .copy_to_device(dst, src)
                .map_err(|e| RiderError::transfer(stage, e))?;
        }
        Ok(())
    }

    fn execute(&mut self, stage: Stage) -> Result<()> {
        let buffers = match self.transform.placement() {
            Placement::InPlace => ExecBuffers::InPlace(&mut self.input),
            Placement::OutOfPlace => ExecBuffers::OutOfPlace {
                input: &mut self.input,
                output: &mut self.output,
            },
        };
        self.engine
            .execute(&self.plan, buffers, self.scratch.as_mut())
            .map_err(|e| RiderError::engine(stage, e))
    }

    // In-place results live in the input buffers, so those sizes bound the copy.
    fn download(&self, stage: Stage) -> Result<HostBuffers> {
        let device = self.engine.device();
        let (buffers, sizes) = match self.transform.placement() {
            Placement::InPlace => (&self.input, buffer_sizes(&self.transform, true)?),
            Placement::OutOfPlace => (&self.output, buffer_sizes(&self.transform, false)?),
        };
        buffers
            .iter()
            .zip(sizes)
            .map(|(src, bytes)| {
                let mut host = zeroed(bytes, stage)?;
                device
                    .copy_to_host(src, &mut host)
                    .map_err(|e| RiderError::transfer(stage, e))?;
                Ok(host)
            })
            .collect()
    }

    fn dump_output(&self, stage: Stage) -> Result<()> {
        let output = self.download(stage)?;
        let t = &self.transform;
        trace!(
            "{stage} output:\n{}",
            format_buffer(&output, t.precision(), &t.output_layout(), t.batch())
        );
        Ok(())
    }
}

/// Plan created, buffers acquired, input synthesized.
pub struct Planned<'e, E: FftEngine>(Session<'e, E>);

impl<'e, E: FftEngine> Planned<'e, E> {
    #[must_use]
    pub fn transform(&self) -> &ResolvedTransform {
        &self.0.transform
    }

    /// Scratch bytes the engine asked for.
    #[must_use]
    pub fn scratch_bytes(&self) -> usize {
        self.0.scratch_bytes
    }

    /// One untimed execution, absorbing first-call overhead such as kernel
    /// compilation.
    pub fn warm_up(mut self) -> Result<WarmedUp<'e, E>> {
        let session = &mut self.0;
        session.upload(Stage::WarmUp)?;
        session.execute(Stage::WarmUp)?;
        let engine = session.engine;
        let device = engine.device();
        let done = device.mark().map_err(|e| RiderError::engine(Stage::WarmUp, e))?;
        device.wait(&done).map_err(|e| RiderError::engine(Stage::WarmUp, e))?;
        info!("warm-up done");
        Ok(WarmedUp(self.0))
    }
}

/// Ready for timed trials.
pub struct WarmedUp<'e, E: FftEngine>(Session<'e, E>);

impl<'e, E: FftEngine> WarmedUp<'e, E> {
    /// Runs the configured number of trials strictly in sequence. The first
    /// failing trial aborts the run.
    pub fn time(mut self) -> Result<Timed<'e, E>> {
        let mut samples = TimingSamples::default();
        for i in 0..self.0.options.ntrial {
            let stage = Stage::Trial(i);
            let elapsed = trial(&mut self.0, stage)?;
            debug!(trial = i, elapsed_ms = elapsed, "trial done");
            samples.push(elapsed);
            if self.0.options.inspect_output && enabled!(Level::TRACE) {
                self.0.dump_output(stage)?;
            }
        }
        info!(trials = samples.len(), "timing done");
        Ok(Timed { session: self.0, samples })
    }
}

fn trial<E: FftEngine>(session: &mut Session<'_, E>, stage: Stage) -> Result<f64> {
    let engine = session.engine;
    let device = engine.device();
    session.upload(stage)?;
    let start = device.mark().map_err(|e| RiderError::engine(stage, e))?;
    session.execute(stage)?;
    let stop = device.mark().map_err(|e| RiderError::engine(stage, e))?;
    device.wait(&stop).map_err(|e| RiderError::engine(stage, e))?;
    device
        .elapsed_ms(&start, &stop)
        .map_err(|e| RiderError::engine(stage, e))
}

/// Trials done; the output of the last trial is still on the device.
pub struct Timed<'e, E: FftEngine> {
    session: Session<'e, E>,
    samples: TimingSamples,
}

impl<'e, E: FftEngine> Timed<'e, E> {
    #[must_use]
    pub fn samples(&self) -> &TimingSamples {
        &self.samples
    }

    /// Copies the output buffers back to the host.
    pub fn download_output(&self) -> Result<HostBuffers> {
        self.session.download(Stage::Compare)
    }

    /// Compares the device output against the CPU reference transform of the
    /// same input.
    pub fn verify(&self) -> Result<Comparison> {
        let t = &self.session.transform;
        let output = self.download_output()?;
        let input = gather(&self.session.host_input, t.precision(), &t.input_layout(), t.batch());
        let expected = reference::transform(t.kind(), t.lengths(), t.batch(), &input);
        let actual = gather(&output, t.precision(), &t.output_layout(), t.batch());
        let comparison = Comparison::new(&expected, &actual)?;
        debug!(nrmse = comparison.nrmse, "verified against reference");
        Ok(comparison)
    }

    /// Computes throughput and releases every device resource.
    #[must_use]
    pub fn finish(self) -> BenchmarkReport {
        let t = self.session.transform;
        let factor = flop_factor(&t);
        let gflops = self
            .samples
            .as_slice()
            .iter()
            .map(|&ms| gflops(t.batch(), factor, t.total_elements(), ms))
            .collect();
        BenchmarkReport {
            scratch_bytes: self.session.scratch_bytes,
            transform: t,
            samples: self.samples,
            gflops,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub transform: ResolvedTransform,
    pub scratch_bytes: usize,
    pub samples: TimingSamples,
    /// One entry per sample, same order.
    pub gflops: Vec<f64>,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Execution gpu time:")?;
        for ms in self.samples.as_slice() {
            write!(f, " {ms}")?;
        }
        writeln!(f, " ms")?;
        write!(f, "Execution gflops: ")?;
        for g in &self.gflops {
            write!(f, " {g}")?;
        }
        Ok(())
    }
}

/// Resolves, plans, warms up and times `request` on `engine`.
pub fn run<E: FftEngine>(
    engine: &E,
    request: &RequestedTransform,
    options: BenchmarkOptions,
) -> Result<BenchmarkReport> {
    let timed = Resolved::new(request, options.verbosity)?
        .plan(engine, options)?
        .warm_up()?
        .time()?;
    Ok(timed.finish())
}
