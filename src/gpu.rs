//! CubeCL device engine.
//!
//! Supports 1-D power-of-two complex transforms in single precision, planar
//! storage, unit stride, contiguous batches and zero offsets, in either
//! placement. Anything else is refused at plan creation. Inverse transforms are
//! unnormalized.
//!
//! ### Launches per execution
//!
//! | N        | Launches |
//! |----------|----------|
//! | ≤ 1 024  | 3        |
//! | 4 096    | 5        |
//! | 65 536   | 9        |

use std::time::Instant;

use cubecl::future;
use cubecl::prelude::*;
use cubecl::server::Handle;
use tracing::{debug, info, warn};

use crate::butterfly::{
    bit_reverse_batch, butterfly_inner_batch, butterfly_stage_batch, copy_out_batch,
};
use crate::engine::{Device, EngineError, ExecBuffers, FftEngine, PlanDescription};
use crate::types::{ArrayKind, Precision};

// The general advice for WebGPU is to choose a workgroup size of 64
// Common sizes are 32, 64, 128, 256, or 512 threads per workgroup.
// Apple Metal supports a maximum workgroup size of 1024 threads.
const WORKGROUP_SIZE: u32 = 1024;

// Elements per shared-memory tile: 2 * 1024 * 4 bytes fits the 16 KiB
// per-workgroup minimum of WebGPU, Vulkan and Metal.
const TILE_BITS: usize = 10;
const TILE_SIZE: usize = 1 << TILE_BITS;

const REAL_BYTES: usize = std::mem::size_of::<f32>();

#[cfg(feature = "wgpu")]
pub type DefaultRuntime = cubecl::wgpu::WgpuRuntime;

#[cfg(all(feature = "cuda", not(feature = "wgpu")))]
pub type DefaultRuntime = cubecl::cuda::CudaRuntime;

/// A device allocation. The handle releases its memory when the last clone drops.
#[derive(Debug, Clone)]
pub struct GpuBuffer {
    handle: Handle,
    bytes: usize,
}

/// CubeCL device memory; markers are wall-clock instants taken after a full
/// client sync.
pub struct CubeclDevice<R: Runtime> {
    device: R::Device,
}

impl<R: Runtime> CubeclDevice<R> {
    fn sync(&self) -> Result<(), EngineError> {
        let client = R::client(&self.device);
        future::block_on(client.sync()).into_engine_result()
    }
}

/// Outcome of a client sync. Runtimes that can report a failed sync return a
/// `Result`; older ones return `()`.
trait SyncOutcome {
    fn into_engine_result(self) -> Result<(), EngineError>;
}

impl SyncOutcome for () {
    fn into_engine_result(self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<E: std::fmt::Debug> SyncOutcome for Result<(), E> {
    fn into_engine_result(self) -> Result<(), EngineError> {
        self.map_err(|e| EngineError::new(format!("device sync failed: {e:?}")))
    }
}

impl<R: Runtime> Device for CubeclDevice<R> {
    type Buffer = GpuBuffer;
    type Marker = Instant;

    fn allocate(&self, bytes: usize) -> Result<GpuBuffer, EngineError> {
        let client = R::client(&self.device);
        // Zero-sized bindings are not valid on every backend.
        let handle = client.empty(bytes.max(REAL_BYTES));
        Ok(GpuBuffer { handle, bytes })
    }

    fn copy_to_device(&self, dst: &mut GpuBuffer, src: &[u8]) -> Result<(), EngineError> {
        if src.len() > dst.bytes {
            return Err(EngineError::new(format!(
                "copy of {} bytes into a {}-byte buffer",
                src.len(),
                dst.bytes
            )));
        }
        let mut staged = vec![0u8; dst.bytes.max(REAL_BYTES)];
        staged[..src.len()].copy_from_slice(src);
        let client = R::client(&self.device);
        dst.handle = client.create_from_slice(&staged);
        Ok(())
    }

    fn copy_to_host(&self, src: &GpuBuffer, dst: &mut [u8]) -> Result<(), EngineError> {
        if dst.len() > src.bytes {
            return Err(EngineError::new(format!(
                "copy of {} bytes out of a {}-byte buffer",
                dst.len(),
                src.bytes
            )));
        }
        let client = R::client(&self.device);
        let read = client.read_one(src.handle.clone());
        let bytes: &[u8] = &read;
        dst.copy_from_slice(&bytes[..dst.len()]);
        Ok(())
    }

    fn mark(&self) -> Result<Instant, EngineError> {
        self.sync()?;
        Ok(Instant::now())
    }

    fn wait(&self, _marker: &Instant) -> Result<(), EngineError> {
        self.sync()
    }

    fn elapsed_ms(&self, start: &Instant, stop: &Instant) -> Result<f64, EngineError> {
        Ok(stop.saturating_duration_since(*start).as_secs_f64() * 1e3)
    }
}

/// Per-transform constants; every kernel is specialised on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuPlan {
    n: usize,
    bits: usize,
    batch: usize,
    forward: bool,
}

impl GpuPlan {
    fn total(&self) -> usize {
        self.n * self.batch
    }
}

/// Scoped CubeCL engine handle.
pub struct CubeclEngine<R: Runtime> {
    device: CubeclDevice<R>,
    id: usize,
}

impl<R: Runtime> CubeclEngine<R> {
    /// Acquires the runtime client for `device`. `id` only labels logs; the
    /// runtime's device value selects the hardware.
    pub fn setup(device: R::Device, id: usize) -> Result<Self, EngineError> {
        info!(device = id, "cubecl engine setup");
        let _ = R::client(&device);
        Ok(Self { device: CubeclDevice { device }, id })
    }
}

impl<R: Runtime> Drop for CubeclEngine<R> {
    fn drop(&mut self) {
        if let Err(e) = self.device.sync() {
            warn!(device = self.id, error = %e, "sync before cleanup failed");
        }
        info!(device = self.id, "cubecl engine cleanup");
    }
}

fn unsupported(what: impl std::fmt::Display) -> EngineError {
    EngineError::new(format!("cubecl engine does not support {what}"))
}

fn launch_failed(kernel: &str, error: impl std::fmt::Debug) -> EngineError {
    EngineError::new(format!("{kernel} launch failed: {error:?}"))
}

fn check_planar(name: &str, buffers: &[GpuBuffer], bytes: usize) -> Result<(), EngineError> {
    if buffers.len() != 2 {
        return Err(EngineError::new(format!(
            "{name}: planar data needs 2 buffers, got {}",
            buffers.len()
        )));
    }
    if let Some(short) = buffers.iter().find(|b| b.bytes < bytes) {
        return Err(EngineError::new(format!(
            "{name}: buffer holds {} bytes, plan needs {bytes}",
            short.bytes
        )));
    }
    Ok(())
}

impl<R: Runtime> FftEngine for CubeclEngine<R> {
    type Device = CubeclDevice<R>;
    type Plan = GpuPlan;

    fn device(&self) -> &CubeclDevice<R> {
        &self.device
    }

    fn create_plan(&self, description: &PlanDescription) -> Result<GpuPlan, EngineError> {
        let d = description;
        let layout = &d.layout;
        if d.kind.is_real() {
            return Err(unsupported(format_args!("{} transforms", d.kind)));
        }
        if d.precision != Precision::Single {
            return Err(unsupported(format_args!("{} precision", d.precision)));
        }
        let [n] = d.lengths[..] else {
            return Err(unsupported(format_args!("{}-dimensional transforms", d.lengths.len())));
        };
        if n < 2 || !n.is_power_of_two() {
            return Err(unsupported(format_args!("length {n}")));
        }
        if layout.input_kind != ArrayKind::Planar || layout.output_kind != ArrayKind::Planar {
            return Err(unsupported(format_args!(
                "{} -> {} storage",
                layout.input_kind, layout.output_kind
            )));
        }
        if layout.input_strides != [1] || layout.output_strides != [1] {
            return Err(unsupported("non-unit strides"));
        }
        if layout.input_distance != n || layout.output_distance != n {
            return Err(unsupported("non-contiguous batches"));
        }
        if layout.input_offsets.iter().chain(&layout.output_offsets).any(|&o| o != 0) {
            return Err(unsupported("buffer offsets"));
        }
        // Kernels index the planar work array (2 * total reals) with u32.
        let fits = n
            .checked_mul(d.batch)
            .and_then(|total| total.checked_mul(2))
            .is_some_and(|reals| u32::try_from(reals).is_ok());
        if !fits {
            return Err(unsupported(format_args!("{} batches of length {n}", d.batch)));
        }

        let plan = GpuPlan {
            n,
            bits: n.ilog2() as usize,
            batch: d.batch,
            forward: d.kind.is_forward(),
        };
        debug!(?plan, "cubecl plan created");
        Ok(plan)
    }

    fn scratch_bytes(&self, plan: &GpuPlan) -> usize {
        2 * plan.total() * REAL_BYTES
    }

    fn execute(
        &self,
        plan: &GpuPlan,
        buffers: ExecBuffers<'_, GpuBuffer>,
        scratch: Option<&mut GpuBuffer>,
    ) -> Result<(), EngineError> {
        let (input, output): (&[GpuBuffer], &[GpuBuffer]) = match buffers {
            ExecBuffers::InPlace(b) => (&*b, &*b),
            ExecBuffers::OutOfPlace { input, output } => (&*input, &*output),
        };
        let &GpuPlan { n, bits, batch, forward } = plan;
        let total = plan.total();
        check_planar("input", input, total * REAL_BYTES)?;
        check_planar("output", output, total * REAL_BYTES)?;
        let work = scratch.ok_or_else(|| EngineError::new("plan needs a work buffer"))?;
        if work.bytes < self.scratch_bytes(plan) {
            return Err(EngineError::new(format!(
                "work buffer holds {} bytes, plan needs {}",
                work.bytes,
                self.scratch_bytes(plan)
            )));
        }

        let client = R::client(&self.device.device);
        let per_element = ((total as u32) + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;

        unsafe {
            bit_reverse_batch::launch::<f32, R>(
                &client,
                CubeCount::Static(per_element, 1, 1),
                CubeDim::new_1d(WORKGROUP_SIZE),
                ArrayArg::from_raw_parts::<f32>(&input[0].handle, total, 1),
                ArrayArg::from_raw_parts::<f32>(&input[1].handle, total, 1),
                ArrayArg::from_raw_parts::<f32>(&work.handle, 2 * total, 1),
                n,
                bits,
                total,
            )
            .map_err(|e| launch_failed("bit-reverse", e))?;
        }

        // Stages with half-stride below TILE_SIZE / 2 run fused in shared memory.
        let inner_stages = bits.min(TILE_BITS);
        let tile = TILE_SIZE.min(n);
        let tiles = ((n / tile).max(1) * batch) as u32;
        unsafe {
            butterfly_inner_batch::launch::<f32, R>(
                &client,
                CubeCount::Static(tiles, 1, 1),
                CubeDim::new_1d((tile / 2) as u32),
                ArrayArg::from_raw_parts::<f32>(&work.handle, 2 * total, 1),
                n,
                tile,
                inner_stages,
                total,
                forward,
            )
            .map_err(|e| launch_failed("inner butterfly", e))?;
        }

        let per_pair = ((total / 2) as u32 + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE;
        for s in inner_stages..bits {
            unsafe {
                butterfly_stage_batch::launch::<f32, R>(
                    &client,
                    CubeCount::Static(per_pair, 1, 1),
                    CubeDim::new_1d(WORKGROUP_SIZE),
                    ArrayArg::from_raw_parts::<f32>(&work.handle, 2 * total, 1),
                    n,
                    1_usize << s,
                    batch,
                    forward,
                )
                .map_err(|e| launch_failed("outer butterfly", e))?;
            }
        }

        unsafe {
            copy_out_batch::launch::<f32, R>(
                &client,
                CubeCount::Static(per_element, 1, 1),
                CubeDim::new_1d(WORKGROUP_SIZE),
                ArrayArg::from_raw_parts::<f32>(&work.handle, 2 * total, 1),
                ArrayArg::from_raw_parts::<f32>(&output[0].handle, total, 1),
                ArrayArg::from_raw_parts::<f32>(&output[1].handle, total, 1),
                total,
            )
            .map_err(|e| launch_failed("copy-out", e))?;
        }
        Ok(())
    }
}
