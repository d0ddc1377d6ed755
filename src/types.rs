//! Transform descriptor types: the requested (partial) form a caller hands in
//! and the resolved form produced once by [`crate::layout::resolve`].

use std::fmt;
use std::str::FromStr;

use crate::error::{RiderError, Stage};
use crate::layout;

/// Direction and domain of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    ComplexForward,
    ComplexInverse,
    RealForward,
    RealInverse,
}

impl TransformKind {
    pub const ALL: [TransformKind; 4] = [
        TransformKind::ComplexForward,
        TransformKind::ComplexInverse,
        TransformKind::RealForward,
        TransformKind::RealInverse,
    ];

    /// `true` when either side of the transform holds real-valued data.
    #[must_use]
    pub fn is_real(self) -> bool {
        matches!(self, TransformKind::RealForward | TransformKind::RealInverse)
    }

    #[must_use]
    pub fn is_forward(self) -> bool {
        matches!(self, TransformKind::ComplexForward | TransformKind::RealForward)
    }

    /// Array kinds used when the caller leaves them unset.
    #[must_use]
    pub fn default_array_kinds(self) -> (ArrayKind, ArrayKind) {
        match self {
            TransformKind::ComplexForward | TransformKind::ComplexInverse => {
                (ArrayKind::Interleaved, ArrayKind::Interleaved)
            }
            TransformKind::RealForward => (ArrayKind::Real, ArrayKind::HermitianInterleaved),
            TransformKind::RealInverse => (ArrayKind::HermitianInterleaved, ArrayKind::Real),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::ComplexForward => "complex-forward",
            TransformKind::ComplexInverse => "complex-inverse",
            TransformKind::RealForward => "real-forward",
            TransformKind::RealInverse => "real-inverse",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    /// Accepts the numeric index used by the command line (`0`..`3`) or the
    /// kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return TransformKind::ALL
                .get(index)
                .copied()
                .ok_or_else(|| format!("transform type index {index} out of range 0..=3"));
        }
        TransformKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown transform type `{s}`"))
    }
}

/// Floating-point width of every real component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Single,
    Double,
}

impl Precision {
    /// Bytes per real component.
    #[must_use]
    pub fn real_bytes(self) -> usize {
        match self {
            Precision::Single => std::mem::size_of::<f32>(),
            Precision::Double => std::mem::size_of::<f64>(),
        }
    }

    /// Machine epsilon of the precision, widened to `f64`.
    #[must_use]
    pub fn epsilon(self) -> f64 {
        match self {
            Precision::Single => f64::from(f32::EPSILON),
            Precision::Double => f64::EPSILON,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => f.write_str("single"),
            Precision::Double => f.write_str("double"),
        }
    }
}

/// Whether input and output share storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Placement {
    #[default]
    InPlace,
    OutOfPlace,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::InPlace => f.write_str("in-place"),
            Placement::OutOfPlace => f.write_str("out-of-place"),
        }
    }
}

/// Storage format of one side of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Interleaved,
    Planar,
    Real,
    HermitianInterleaved,
    HermitianPlanar,
}

impl ArrayKind {
    pub const ALL: [ArrayKind; 5] = [
        ArrayKind::Interleaved,
        ArrayKind::Planar,
        ArrayKind::Real,
        ArrayKind::HermitianInterleaved,
        ArrayKind::HermitianPlanar,
    ];

    #[must_use]
    pub fn is_planar(self) -> bool {
        matches!(self, ArrayKind::Planar | ArrayKind::HermitianPlanar)
    }

    #[must_use]
    pub fn is_hermitian(self) -> bool {
        matches!(self, ArrayKind::HermitianInterleaved | ArrayKind::HermitianPlanar)
    }

    /// Number of physical buffers: planar kinds keep real and imaginary parts apart.
    #[must_use]
    pub fn buffer_count(self) -> usize {
        if self.is_planar() {
            2
        } else {
            1
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ArrayKind::Interleaved => "interleaved",
            ArrayKind::Planar => "planar",
            ArrayKind::Real => "real",
            ArrayKind::HermitianInterleaved => "hermitian-interleaved",
            ArrayKind::HermitianPlanar => "hermitian-planar",
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ArrayKind {
    type Err = String;

    /// Accepts the numeric index used by the command line (`0`..`4`) or the
    /// kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return ArrayKind::ALL
                .get(index)
                .copied()
                .ok_or_else(|| format!("array type index {index} out of range 0..=4"));
        }
        ArrayKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown array type `{s}`"))
    }
}

/// A transform as the caller asked for it. Empty vectors and zero distances
/// mean "derive the default".
///
/// Lengths and strides are row-major: the last entry is the fastest-varying axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedTransform {
    pub lengths: Vec<usize>,
    pub kind: TransformKind,
    pub precision: Precision,
    pub placement: Placement,
    pub input_kind: Option<ArrayKind>,
    pub output_kind: Option<ArrayKind>,
    pub batch: usize,
    pub input_strides: Vec<usize>,
    pub output_strides: Vec<usize>,
    pub input_distance: usize,
    pub output_distance: usize,
    pub input_offsets: Vec<usize>,
    pub output_offsets: Vec<usize>,
    pub input_sizes: Vec<usize>,
    pub output_sizes: Vec<usize>,
}

impl RequestedTransform {
    /// Single-precision, in-place, batch of one; everything else derived.
    #[must_use]
    pub fn new(lengths: Vec<usize>, kind: TransformKind) -> Self {
        Self {
            lengths,
            kind,
            precision: Precision::Single,
            placement: Placement::InPlace,
            input_kind: None,
            output_kind: None,
            batch: 1,
            input_strides: Vec::new(),
            output_strides: Vec::new(),
            input_distance: 0,
            output_distance: 0,
            input_offsets: Vec::new(),
            output_offsets: Vec::new(),
            input_sizes: Vec::new(),
            output_sizes: Vec::new(),
        }
    }

    pub(crate) fn check_shape(&self) -> Result<(), RiderError> {
        if self.lengths.is_empty() {
            return Err(RiderError::invalid(Stage::Resolve, "at least one length is required"));
        }
        if let Some(axis) = self.lengths.iter().position(|&n| n == 0) {
            return Err(RiderError::invalid(
                Stage::Resolve,
                format!("length along axis {axis} must be positive"),
            ));
        }
        if self.batch == 0 {
            return Err(RiderError::invalid(Stage::Resolve, "batch count must be at least 1"));
        }
        let elements = self.lengths.iter().try_fold(self.batch, |acc, &n| acc.checked_mul(n));
        if elements.is_none() {
            return Err(RiderError::invalid(
                Stage::Resolve,
                format!(
                    "{} batch item(s) of lengths {:?} overflow the element count",
                    self.batch, self.lengths
                ),
            ));
        }
        Ok(())
    }
}

/// Addressing of one side (input or output) of a transform, row-major.
///
/// `lengths` are the logical element counts of this side: for a hermitian side
/// the innermost axis holds `n / 2 + 1` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideLayout {
    pub kind: ArrayKind,
    pub lengths: Vec<usize>,
    pub strides: Vec<usize>,
    pub distance: usize,
    pub offsets: Vec<usize>,
}

impl SideLayout {
    /// Number of logical elements in one batch item.
    #[must_use]
    pub fn elements(&self) -> usize {
        self.lengths.iter().product()
    }

    /// Smallest element count buffer `buffer` must hold for `batch` items, or
    /// `None` when it exceeds `usize`.
    #[must_use]
    pub fn required_elements(&self, buffer: usize, batch: usize) -> Option<usize> {
        let offset = self.offsets.get(buffer).copied().unwrap_or(0);
        batch
            .saturating_sub(1)
            .checked_mul(self.distance)?
            .checked_add(offset)?
            .checked_add(layout::span(&self.lengths, &self.strides)?)
    }
}

/// A fully populated transform. Only [`crate::layout::resolve`] builds one and
/// nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransform {
    pub(crate) lengths: Vec<usize>,
    pub(crate) kind: TransformKind,
    pub(crate) precision: Precision,
    pub(crate) placement: Placement,
    pub(crate) input_kind: ArrayKind,
    pub(crate) output_kind: ArrayKind,
    pub(crate) batch: usize,
    pub(crate) input_strides: Vec<usize>,
    pub(crate) output_strides: Vec<usize>,
    pub(crate) input_distance: usize,
    pub(crate) output_distance: usize,
    pub(crate) input_offsets: Vec<usize>,
    pub(crate) output_offsets: Vec<usize>,
    pub(crate) input_sizes: Vec<usize>,
    pub(crate) output_sizes: Vec<usize>,
}

impl ResolvedTransform {
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn input_kind(&self) -> ArrayKind {
        self.input_kind
    }

    pub fn output_kind(&self) -> ArrayKind {
        self.output_kind
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn input_strides(&self) -> &[usize] {
        &self.input_strides
    }

    pub fn output_strides(&self) -> &[usize] {
        &self.output_strides
    }

    pub fn input_distance(&self) -> usize {
        self.input_distance
    }

    pub fn output_distance(&self) -> usize {
        self.output_distance
    }

    pub fn input_offsets(&self) -> &[usize] {
        &self.input_offsets
    }

    pub fn output_offsets(&self) -> &[usize] {
        &self.output_offsets
    }

    /// Element counts of each physical input buffer.
    pub fn input_sizes(&self) -> &[usize] {
        &self.input_sizes
    }

    /// Element counts of each physical output buffer.
    pub fn output_sizes(&self) -> &[usize] {
        &self.output_sizes
    }

    /// Product of all transform lengths.
    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.lengths.iter().product()
    }

    #[must_use]
    pub fn input_lengths(&self) -> Vec<usize> {
        layout::side_lengths(&self.lengths, self.kind, true)
    }

    #[must_use]
    pub fn output_lengths(&self) -> Vec<usize> {
        layout::side_lengths(&self.lengths, self.kind, false)
    }

    #[must_use]
    pub fn input_layout(&self) -> SideLayout {
        SideLayout {
            kind: self.input_kind,
            lengths: self.input_lengths(),
            strides: self.input_strides.clone(),
            distance: self.input_distance,
            offsets: self.input_offsets.clone(),
        }
    }

    #[must_use]
    pub fn output_layout(&self) -> SideLayout {
        SideLayout {
            kind: self.output_kind,
            lengths: self.output_lengths(),
            strides: self.output_strides.clone(),
            distance: self.output_distance,
            offsets: self.output_offsets.clone(),
        }
    }

    /// Rough host + device memory footprint of one run, in bytes: host input,
    /// host output and reference copies plus the device buffers. Saturates at
    /// `usize::MAX`.
    pub fn needed_bytes(&self) -> Result<usize, RiderError> {
        let input = crate::buffers::buffer_sizes(self, true)?
            .into_iter()
            .fold(0usize, usize::saturating_add);
        let output = crate::buffers::buffer_sizes(self, false)?
            .into_iter()
            .fold(0usize, usize::saturating_add);
        let device = match self.placement {
            Placement::InPlace => input,
            Placement::OutOfPlace => input.saturating_add(output),
        };
        Ok(input
            .saturating_add(output)
            .saturating_mul(2)
            .saturating_add(device))
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, values: &[usize]) -> fmt::Result {
    write!(f, "{label}:")?;
    for v in values {
        write!(f, " {v}")?;
    }
    writeln!(f)
}

impl fmt::Display for ResolvedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.kind, self.precision, self.placement)?;
        write_list(f, "length", &self.lengths)?;
        writeln!(f, "batch: {}", self.batch)?;
        writeln!(f, "itype: {}", self.input_kind)?;
        write_list(f, "ilength", &self.input_lengths())?;
        write_list(f, "istride", &self.input_strides)?;
        writeln!(f, "idist: {}", self.input_distance)?;
        write_list(f, "ioffset", &self.input_offsets)?;
        write_list(f, "isize", &self.input_sizes)?;
        writeln!(f, "otype: {}", self.output_kind)?;
        write_list(f, "olength", &self.output_lengths())?;
        write_list(f, "ostride", &self.output_strides)?;
        writeln!(f, "odist: {}", self.output_distance)?;
        write_list(f, "ooffset", &self.output_offsets)?;
        write_list(f, "osize", &self.output_sizes)
    }
}
