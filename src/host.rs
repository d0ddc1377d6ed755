//! An engine that runs on host memory with the reference transforms.
//!
//! Useful as a stand-in device when no GPU backend is compiled in, and as the
//! baseline the harness itself is tested against. Execution is synchronous, so
//! markers are wall-clock instants.

use std::time::Instant;

use tracing::{debug, info};

use crate::buffers::{self, element_width, gather, scatter};
use crate::engine::{Device, EngineError, ExecBuffers, FftEngine, PlanDescription};
use crate::reference;
use crate::types::{Placement, SideLayout};

/// Host "device": byte vectors and wall-clock markers.
#[derive(Debug, Default)]
pub struct HostDevice;

impl Device for HostDevice {
    type Buffer = Vec<u8>;
    type Marker = Instant;

    fn allocate(&self, bytes: usize) -> Result<Vec<u8>, EngineError> {
        buffers::try_zeroed(bytes)
    }

    fn copy_to_device(&self, dst: &mut Vec<u8>, src: &[u8]) -> Result<(), EngineError> {
        if src.len() > dst.len() {
            return Err(EngineError::new(format!(
                "copy of {} bytes into a {}-byte buffer",
                src.len(),
                dst.len()
            )));
        }
        dst[..src.len()].copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host(&self, src: &Vec<u8>, dst: &mut [u8]) -> Result<(), EngineError> {
        if dst.len() > src.len() {
            return Err(EngineError::new(format!(
                "copy of {} bytes out of a {}-byte buffer",
                dst.len(),
                src.len()
            )));
        }
        dst.copy_from_slice(&src[..dst.len()]);
        Ok(())
    }

    fn mark(&self) -> Result<Instant, EngineError> {
        Ok(Instant::now())
    }

    fn wait(&self, _marker: &Instant) -> Result<(), EngineError> {
        Ok(())
    }

    fn elapsed_ms(&self, start: &Instant, stop: &Instant) -> Result<f64, EngineError> {
        Ok(stop.saturating_duration_since(*start).as_secs_f64() * 1e3)
    }
}

/// A plan: the description plus its row-major side layouts.
#[derive(Debug)]
pub struct HostPlan {
    description: PlanDescription,
    lengths: Vec<usize>,
    input: SideLayout,
    output: SideLayout,
    // Bytes of input-buffer footprint, per buffer; the in-place snapshot size.
    input_extent: Vec<usize>,
}

impl HostPlan {
    fn input_bytes(&self) -> usize {
        self.input_extent.iter().fold(0, |acc, &b| acc.saturating_add(b))
    }
}

/// Scoped engine handle: acquired once, cleaned up on drop.
#[derive(Debug)]
pub struct HostEngine {
    device: HostDevice,
    id: usize,
}

impl HostEngine {
    /// Sets up the engine on device `id`. The host has a single device; the id
    /// is only recorded.
    pub fn setup(id: usize) -> Result<Self, EngineError> {
        info!(device = id, "host engine setup");
        Ok(Self { device: HostDevice, id })
    }
}

impl Drop for HostEngine {
    fn drop(&mut self) {
        info!(device = self.id, "host engine cleanup");
    }
}

fn extent(side: &SideLayout, batch: usize, width: usize) -> Result<Vec<usize>, EngineError> {
    (0..side.kind.buffer_count())
        .map(|buffer| {
            side.required_elements(buffer, batch)
                .and_then(|elements| elements.checked_mul(width))
                .ok_or_else(|| EngineError::new(format!("extent of buffer {buffer} overflows")))
        })
        .collect()
}

fn check_extent(name: &str, buffers: &[Vec<u8>], needed: &[usize]) -> Result<(), EngineError> {
    if buffers.len() != needed.len() {
        return Err(EngineError::new(format!(
            "{name}: expected {} buffer(s), got {}",
            needed.len(),
            buffers.len()
        )));
    }
    for (i, (buffer, &bytes)) in buffers.iter().zip(needed).enumerate() {
        if buffer.len() < bytes {
            return Err(EngineError::new(format!(
                "{name}[{i}] holds {} bytes, layout needs {bytes}",
                buffer.len()
            )));
        }
    }
    Ok(())
}

impl FftEngine for HostEngine {
    type Device = HostDevice;
    type Plan = HostPlan;

    fn device(&self) -> &HostDevice {
        &self.device
    }

    fn create_plan(&self, description: &PlanDescription) -> Result<HostPlan, EngineError> {
        let dim = description.lengths.len();
        if dim == 0 || description.lengths.contains(&0) {
            return Err(EngineError::new("plan needs positive lengths"));
        }
        if description.layout.input_strides.len() != dim
            || description.layout.output_strides.len() != dim
        {
            return Err(EngineError::new("stride arity differs from transform dimension"));
        }
        let input = description.input_layout();
        let output = description.output_layout();
        let input_extent = extent(
            &input,
            description.batch,
            element_width(description.precision, input.kind),
        )?;
        debug!(lengths = ?description.lengths, batch = description.batch, "host plan created");
        Ok(HostPlan {
            lengths: description.user_lengths(),
            description: description.clone(),
            input,
            output,
            input_extent,
        })
    }

    fn scratch_bytes(&self, plan: &HostPlan) -> usize {
        match plan.description.placement {
            Placement::InPlace => plan.input_bytes(),
            Placement::OutOfPlace => 0,
        }
    }

    fn execute(
        &self,
        plan: &HostPlan,
        buffers: ExecBuffers<'_, Vec<u8>>,
        scratch: Option<&mut Vec<u8>>,
    ) -> Result<(), EngineError> {
        let d = &plan.description;
        let out_extent = extent(&plan.output, d.batch, element_width(d.precision, plan.output.kind))?;

        match buffers {
            ExecBuffers::OutOfPlace { input, output } => {
                check_extent("input", input, &plan.input_extent)?;
                check_extent("output", output, &out_extent)?;
                let data = gather(input, d.precision, &plan.input, d.batch);
                let result = reference::transform(d.kind, &plan.lengths, d.batch, &data);
                scatter(output, d.precision, &plan.output, d.batch, &result);
            }
            ExecBuffers::InPlace(buffers) => {
                check_extent("buffer", buffers, &plan.input_extent)?;
                check_extent("buffer", buffers, &out_extent)?;
                let scratch =
                    scratch.ok_or_else(|| EngineError::new("in-place plan needs a work buffer"))?;
                let needed = plan.input_bytes();
                if scratch.len() < needed {
                    return Err(EngineError::new(format!(
                        "work buffer holds {} bytes, plan needs {needed}",
                        scratch.len()
                    )));
                }
                // Reads come from a snapshot so they never see partially written output.
                let mut snapshot: Vec<&[u8]> = Vec::with_capacity(buffers.len());
                let mut rest = &mut scratch[..];
                for (buffer, &bytes) in buffers.iter().zip(&plan.input_extent) {
                    let (head, tail) = std::mem::take(&mut rest).split_at_mut(bytes);
                    head.copy_from_slice(&buffer[..bytes]);
                    snapshot.push(head);
                    rest = tail;
                }
                let data = gather(&snapshot, d.precision, &plan.input, d.batch);
                let result = reference::transform(d.kind, &plan.lengths, d.batch, &data);
                scatter(buffers, d.precision, &plan.output, d.batch, &result);
            }
        }
        Ok(())
    }
}
