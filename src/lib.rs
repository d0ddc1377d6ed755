//! Benchmark harness for batched multi-dimensional FFTs.
//!
//! A [`RequestedTransform`] is resolved into a fully populated
//! [`ResolvedTransform`], validated, planned on an [`engine::FftEngine`],
//! warmed up and timed by the [`bench`] driver. Results can be checked against
//! the CPU reference with [`compare`].
//!
//! # Example
//!
//! ```
//! use fft_rider::bench::{run, BenchmarkOptions};
//! use fft_rider::host::HostEngine;
//! use fft_rider::{RequestedTransform, TransformKind};
//!
//! let engine = HostEngine::setup(0).unwrap();
//! let request = RequestedTransform::new(vec![64], TransformKind::ComplexForward);
//! let options = BenchmarkOptions { ntrial: 3, ..Default::default() };
//! let report = run(&engine, &request, options).unwrap();
//! assert_eq!(report.samples.len(), 3);
//! ```

pub mod bench;
pub mod buffers;
pub mod compare;
pub mod engine;
pub mod error;
pub mod host;
pub mod layout;
pub mod order;
pub mod reference;
pub mod types;
pub mod validate;

#[cfg(any(feature = "wgpu", feature = "cuda"))]
mod butterfly;
#[cfg(any(feature = "wgpu", feature = "cuda"))]
pub mod gpu;

pub use error::{EngineError, Result, RiderError, Stage};
pub use types::{
    ArrayKind, Placement, Precision, RequestedTransform, ResolvedTransform, SideLayout,
    TransformKind,
};
