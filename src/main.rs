//! `rider`: times batched FFTs on an engine and reports throughput.
//!
//! ```bash
//! # 1024-point complex forward transform, 10 trials
//! rider --length 1024 -N 10
//!
//! # 2-D out-of-place real forward transform in double precision
//! rider --length 64 128 -t real-forward -o --double
//!
//! # planar complex on the GPU backend, checked against the CPU reference
//! cargo run --release --features wgpu -- --engine gpu --length 4096 --itype planar --otype planar --verify
//! ```

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fft_rider::bench::{BenchmarkOptions, Resolved};
use fft_rider::compare::Tolerance;
use fft_rider::engine::FftEngine;
use fft_rider::host::HostEngine;
use fft_rider::{ArrayKind, Placement, Precision, RequestedTransform, TransformKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineChoice {
    /// rustfft on host memory
    Host,
    /// CubeCL device (needs the `wgpu` or `cuda` feature)
    Gpu,
}

/// FFT benchmark rider
#[derive(Parser, Debug)]
#[command(name = "rider")]
#[command(about = "Time batched multi-dimensional FFTs and report throughput")]
#[command(version)]
struct Args {
    /// Transform lengths, slowest axis first
    #[arg(long, required = true, num_args = 1..)]
    length: Vec<usize>,

    /// Input strides, slowest axis first
    #[arg(long, num_args = 1..)]
    istride: Vec<usize>,

    /// Output strides, slowest axis first
    #[arg(long, num_args = 1..)]
    ostride: Vec<usize>,

    /// Input batch distance (0 derives it)
    #[arg(long, default_value_t = 0)]
    idist: usize,

    /// Output batch distance (0 derives it)
    #[arg(long, default_value_t = 0)]
    odist: usize,

    /// Logical size of each input buffer, in elements
    #[arg(long, num_args = 1..)]
    isize: Vec<usize>,

    /// Logical size of each output buffer, in elements
    #[arg(long, num_args = 1..)]
    osize: Vec<usize>,

    /// Input buffer offsets, in elements
    #[arg(long, num_args = 1..)]
    ioffset: Vec<usize>,

    /// Output buffer offsets, in elements
    #[arg(long, num_args = 1..)]
    ooffset: Vec<usize>,

    /// Number of transforms per execution
    #[arg(short, long = "batch-size", default_value_t = 1)]
    batch: usize,

    /// Transform type: 0 complex-forward, 1 complex-inverse, 2 real-forward,
    /// 3 real-inverse (index or name)
    #[arg(short, long = "transform-type", default_value = "complex-forward")]
    transform_type: TransformKind,

    /// Input array type: 0 interleaved, 1 planar, 2 real, 3 hermitian-interleaved,
    /// 4 hermitian-planar (index or name); derived when omitted
    #[arg(long)]
    itype: Option<ArrayKind>,

    /// Output array type (same values as --itype); derived when omitted
    #[arg(long)]
    otype: Option<ArrayKind>,

    /// Double precision (default single)
    #[arg(long)]
    double: bool,

    /// Out-of-place transform (default in-place)
    #[arg(short = 'o', long)]
    not_in_place: bool,

    /// Device id
    #[arg(long, default_value_t = 0)]
    device: usize,

    /// Number of timed trials
    #[arg(short = 'N', long, default_value_t = 1)]
    ntrial: usize,

    /// Verbosity: 1 info, 2 input dump, 3 per-trial output dump
    #[arg(long, default_value_t = 0)]
    verbose: u32,

    /// Check the last trial's output against the CPU reference
    #[arg(long)]
    verify: bool,

    /// Engine to benchmark
    #[arg(long, value_enum, default_value_t = EngineChoice::Host)]
    engine: EngineChoice,
}

impl Args {
    fn request(&self) -> RequestedTransform {
        RequestedTransform {
            precision: if self.double { Precision::Double } else { Precision::Single },
            placement: if self.not_in_place { Placement::OutOfPlace } else { Placement::InPlace },
            input_kind: self.itype,
            output_kind: self.otype,
            batch: self.batch,
            input_strides: self.istride.clone(),
            output_strides: self.ostride.clone(),
            input_distance: self.idist,
            output_distance: self.odist,
            input_offsets: self.ioffset.clone(),
            output_offsets: self.ooffset.clone(),
            input_sizes: self.isize.clone(),
            output_sizes: self.osize.clone(),
            ..RequestedTransform::new(self.length.clone(), self.transform_type)
        }
    }

    fn options(&self) -> BenchmarkOptions {
        BenchmarkOptions {
            ntrial: self.ntrial,
            verbosity: self.verbose,
            inspect_output: self.verbose > 2,
        }
    }
}

fn init_tracing(verbose: u32) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn drive<E: FftEngine>(engine: &E, args: &Args) -> Result<()> {
    let resolved = Resolved::new(&args.request(), args.verbose)?;
    let transform = resolved.transform().clone();
    println!("{transform}");
    info!(bytes = transform.needed_bytes()?, "estimated memory footprint");

    let timed = resolved.plan(engine, args.options())?.warm_up()?.time()?;
    let comparison = if args.verify { Some(timed.verify()?) } else { None };
    let report = timed.finish();
    println!("{report}");

    if let Some(comparison) = comparison {
        println!("{comparison}");
        let tolerance = Tolerance::new(transform.precision(), transform.total_elements());
        if !comparison.passes(&tolerance) {
            bail!(
                "output differs from the reference beyond tolerance (linf cutoff {:e}, l2 cutoff {:e})",
                tolerance.linf_cutoff(&comparison.reference),
                tolerance.l2_cutoff()
            );
        }
        println!("verification passed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.engine {
        EngineChoice::Host => {
            let engine = HostEngine::setup(args.device)?;
            drive(&engine, &args)
        }
        #[cfg(any(feature = "wgpu", feature = "cuda"))]
        EngineChoice::Gpu => {
            use fft_rider::gpu::{CubeclEngine, DefaultRuntime};
            let engine = CubeclEngine::<DefaultRuntime>::setup(Default::default(), args.device)?;
            drive(&engine, &args)
        }
        #[cfg(not(any(feature = "wgpu", feature = "cuda")))]
        EngineChoice::Gpu => bail!("built without a GPU backend; enable the `wgpu` or `cuda` feature"),
    }
}
