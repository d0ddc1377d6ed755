//! Collaborator seams: the FFT engine, its device memory, and device timing.
//!
//! Device buffers, plans and engines release their resources on drop, so every
//! exit path of a run frees whatever it had acquired.

pub use crate::error::EngineError;

use crate::layout::side_lengths;
use crate::order::EngineAxes;
use crate::types::{
    ArrayKind, Placement, Precision, ResolvedTransform, SideLayout, TransformKind,
};

/// Device memory and timing.
pub trait Device {
    /// An owned device allocation, freed on drop.
    type Buffer;
    /// A point on the device timeline.
    type Marker;

    fn allocate(&self, bytes: usize) -> Result<Self::Buffer, EngineError>;

    /// Copies `src` to the start of `dst`.
    fn copy_to_device(&self, dst: &mut Self::Buffer, src: &[u8]) -> Result<(), EngineError>;

    /// Fills `dst` from the start of `src`.
    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<(), EngineError>;

    /// Records a marker after all work issued so far.
    fn mark(&self) -> Result<Self::Marker, EngineError>;

    /// Blocks until the device reaches `marker`.
    fn wait(&self, marker: &Self::Marker) -> Result<(), EngineError>;

    /// Milliseconds between two reached markers.
    fn elapsed_ms(&self, start: &Self::Marker, stop: &Self::Marker) -> Result<f64, EngineError>;
}

/// Buffers for one execution. In-place transforms read and write the same set.
pub enum ExecBuffers<'a, B> {
    InPlace(&'a mut [B]),
    OutOfPlace { input: &'a mut [B], output: &'a mut [B] },
}

/// Data layout handed to the engine alongside the plan request.
///
/// Strides are in engine (fastest-first) order; distances and offsets are
/// per-batch scalars and carry no axis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub input_kind: ArrayKind,
    pub output_kind: ArrayKind,
    pub input_offsets: Vec<usize>,
    pub output_offsets: Vec<usize>,
    pub input_strides: Vec<usize>,
    pub input_distance: usize,
    pub output_strides: Vec<usize>,
    pub output_distance: usize,
}

/// Everything an engine needs to build a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDescription {
    pub placement: Placement,
    pub kind: TransformKind,
    pub precision: Precision,
    /// Engine (fastest-first) order.
    pub lengths: Vec<usize>,
    pub batch: usize,
    pub layout: DataLayout,
}

impl PlanDescription {
    #[must_use]
    pub fn from_resolved(transform: &ResolvedTransform) -> Self {
        let axes = EngineAxes::of(transform);
        Self {
            placement: transform.placement(),
            kind: transform.kind(),
            precision: transform.precision(),
            lengths: axes.lengths,
            batch: transform.batch(),
            layout: DataLayout {
                input_kind: transform.input_kind(),
                output_kind: transform.output_kind(),
                input_offsets: transform.input_offsets().to_vec(),
                output_offsets: transform.output_offsets().to_vec(),
                input_strides: axes.input_strides,
                input_distance: transform.input_distance(),
                output_strides: axes.output_strides,
                output_distance: transform.output_distance(),
            },
        }
    }

    fn user_axes(&self) -> EngineAxes {
        EngineAxes {
            lengths: self.lengths.clone(),
            input_strides: self.layout.input_strides.clone(),
            output_strides: self.layout.output_strides.clone(),
        }
        .to_user_order()
    }

    /// Row-major lengths.
    #[must_use]
    pub fn user_lengths(&self) -> Vec<usize> {
        self.user_axes().lengths
    }

    /// Row-major addressing of the input side.
    #[must_use]
    pub fn input_layout(&self) -> SideLayout {
        let axes = self.user_axes();
        SideLayout {
            kind: self.layout.input_kind,
            lengths: side_lengths(&axes.lengths, self.kind, true),
            strides: axes.input_strides,
            distance: self.layout.input_distance,
            offsets: self.layout.input_offsets.clone(),
        }
    }

    /// Row-major addressing of the output side.
    #[must_use]
    pub fn output_layout(&self) -> SideLayout {
        let axes = self.user_axes();
        SideLayout {
            kind: self.layout.output_kind,
            lengths: side_lengths(&axes.lengths, self.kind, false),
            strides: axes.output_strides,
            distance: self.layout.output_distance,
            offsets: self.layout.output_offsets.clone(),
        }
    }
}

/// An FFT engine: plans transforms and executes them on its device.
///
/// Dropping a plan destroys it.
pub trait FftEngine {
    type Device: Device;
    type Plan;

    fn device(&self) -> &Self::Device;

    fn create_plan(&self, description: &PlanDescription) -> Result<Self::Plan, EngineError>;

    /// Scratch bytes the plan needs at execution time; zero for none.
    fn scratch_bytes(&self, plan: &Self::Plan) -> usize;

    fn execute(
        &self,
        plan: &Self::Plan,
        buffers: ExecBuffers<'_, <Self::Device as Device>::Buffer>,
        scratch: Option<&mut <Self::Device as Device>::Buffer>,
    ) -> Result<(), EngineError>;
}

/// Buffer type of an engine's device.
pub type DeviceBuffer<E> = <<E as FftEngine>::Device as Device>::Buffer;
