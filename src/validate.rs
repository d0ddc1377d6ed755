//! Consistency checks over a resolved transform. Purely arithmetic: nothing here
//! touches a device or mutates the descriptor.

use std::fmt;

use crate::buffers::element_width;
use crate::error::{RiderError, Stage};
use crate::types::{ArrayKind, Placement, ResolvedTransform, SideLayout, TransformKind};

use crate::types::ArrayKind::{HermitianInterleaved, HermitianPlanar, Interleaved, Planar, Real};
use crate::types::TransformKind::{ComplexForward, ComplexInverse, RealForward, RealInverse};

/// Every `(transform, input, output)` array-kind combination an engine accepts.
/// Anything absent is forbidden.
const COMPATIBLE: [(TransformKind, ArrayKind, ArrayKind); 12] = [
    (ComplexForward, Interleaved, Interleaved),
    (ComplexForward, Interleaved, Planar),
    (ComplexForward, Planar, Interleaved),
    (ComplexForward, Planar, Planar),
    (ComplexInverse, Interleaved, Interleaved),
    (ComplexInverse, Interleaved, Planar),
    (ComplexInverse, Planar, Interleaved),
    (ComplexInverse, Planar, Planar),
    (RealForward, Real, HermitianInterleaved),
    (RealForward, Real, HermitianPlanar),
    (RealInverse, HermitianInterleaved, Real),
    (RealInverse, HermitianPlanar, Real),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Allowed,
    Forbidden,
}

/// Looks up an array-kind combination in the compatibility table.
///
/// ```
/// # use fft_rider::validate::{compatibility, Compatibility};
/// # use fft_rider::{ArrayKind, TransformKind};
/// assert_eq!(
///     compatibility(TransformKind::RealForward, ArrayKind::HermitianInterleaved, ArrayKind::Real),
///     Compatibility::Forbidden,
/// );
/// ```
#[must_use]
pub fn compatibility(kind: TransformKind, input: ArrayKind, output: ArrayKind) -> Compatibility {
    if COMPATIBLE.contains(&(kind, input, output)) {
        Compatibility::Allowed
    } else {
        Compatibility::Forbidden
    }
}

/// The four groups of checks, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    ArrayKinds,
    Counts,
    BufferSizes,
    Placement,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::ArrayKinds => f.write_str("array kinds"),
            Check::Counts => f.write_str("counts"),
            Check::BufferSizes => f.write_str("buffer sizes"),
            Check::Placement => f.write_str("placement"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub check: Check,
    pub message: String,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validation {
    pub diagnostics: Vec<Diagnostic>,
}

impl Validation {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Converts a failed validation into an `InvalidDescriptor` error listing
    /// every recorded diagnostic.
    pub fn into_result(self) -> crate::Result<()> {
        if self.ok() {
            return Ok(());
        }
        Err(RiderError::invalid(Stage::Validate, self.to_string()))
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", d.check, d.message)?;
        }
        Ok(())
    }
}

struct Collector {
    exhaustive: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    fn fail(&mut self, check: Check, message: String) {
        self.diagnostics.push(Diagnostic { check, message });
    }

    // A stop is requested once something failed and the caller wants the short form.
    fn stop(&self) -> bool {
        !self.exhaustive && !self.diagnostics.is_empty()
    }
}

/// Checks a resolved transform for internal consistency.
///
/// Checks run in groups: array kinds, counts, buffer sizes, placement. With
/// `verbosity == 0` checking stops after the first failing check group, which
/// may still have recorded several failures; otherwise every group runs and
/// every failure is recorded.
#[must_use]
pub fn validate(transform: &ResolvedTransform, verbosity: u32) -> Validation {
    let mut c = Collector { exhaustive: verbosity > 0, diagnostics: Vec::new() };

    check_array_kinds(transform, &mut c);
    if !c.stop() {
        check_counts(transform, &mut c);
    }
    if !c.stop() {
        check_buffer_sizes(transform, &mut c);
    }
    if !c.stop() {
        check_placement(transform, &mut c);
    }

    Validation { diagnostics: c.diagnostics }
}

fn check_array_kinds(t: &ResolvedTransform, c: &mut Collector) {
    if compatibility(t.kind, t.input_kind, t.output_kind) == Compatibility::Forbidden {
        c.fail(
            Check::ArrayKinds,
            format!(
                "{} transform cannot read {} input into {} output",
                t.kind, t.input_kind, t.output_kind
            ),
        );
    }
}

fn check_counts(t: &ResolvedTransform, c: &mut Collector) {
    let dim = t.lengths.len();
    for (side, strides) in [("istride", &t.input_strides), ("ostride", &t.output_strides)] {
        if strides.len() != dim {
            c.fail(
                Check::Counts,
                format!("{side} has {} entries for a {dim}-dimensional transform", strides.len()),
            );
        }
    }
    if t.input_strides.iter().chain(&t.output_strides).any(|&s| s == 0) {
        c.fail(Check::Counts, "strides must be positive".to_string());
    }
    let sides = [
        ("isize", t.input_kind, &t.input_sizes),
        ("ioffset", t.input_kind, &t.input_offsets),
        ("osize", t.output_kind, &t.output_sizes),
        ("ooffset", t.output_kind, &t.output_offsets),
    ];
    for (name, kind, values) in sides {
        if values.len() != kind.buffer_count() {
            c.fail(
                Check::Counts,
                format!(
                    "{name} has {} entries but {kind} storage uses {} buffer(s)",
                    values.len(),
                    kind.buffer_count()
                ),
            );
        }
    }
}

fn check_side_sizes(
    name: &str,
    layout: &SideLayout,
    sizes: &[usize],
    width: usize,
    batch: usize,
    c: &mut Collector,
) {
    for (buffer, &size) in sizes.iter().enumerate() {
        if size.checked_mul(width).is_none() {
            c.fail(
                Check::BufferSizes,
                format!("{name}[{buffer}] = {size} elements of {width} bytes overflows"),
            );
        }
        match layout.required_elements(buffer, batch) {
            None => c.fail(
                Check::BufferSizes,
                format!("{name}[{buffer}]: the layout reaches past the addressable range"),
            ),
            Some(required) if size < required => c.fail(
                Check::BufferSizes,
                format!("{name}[{buffer}] = {size} elements but the layout reaches {required}"),
            ),
            Some(_) => {}
        }
    }
}

fn check_buffer_sizes(t: &ResolvedTransform, c: &mut Collector) {
    let in_width = element_width(t.precision, t.input_kind);
    let out_width = element_width(t.precision, t.output_kind);
    check_side_sizes("isize", &t.input_layout(), &t.input_sizes, in_width, t.batch, c);
    check_side_sizes("osize", &t.output_layout(), &t.output_sizes, out_width, t.batch, c);
}

fn check_placement(t: &ResolvedTransform, c: &mut Collector) {
    if t.placement != Placement::InPlace {
        return;
    }
    if t.kind.is_real() {
        if t.input_strides.last() != Some(&1) || t.output_strides.last() != Some(&1) {
            c.fail(
                Check::Placement,
                "in-place real transforms require unit innermost strides".to_string(),
            );
        }
        if t.input_kind == HermitianPlanar || t.output_kind == HermitianPlanar {
            c.fail(
                Check::Placement,
                "in-place real transforms require hermitian-interleaved storage".to_string(),
            );
        }
        let ioffset = t.input_offsets.first().copied().unwrap_or(0);
        let ooffset = t.output_offsets.first().copied().unwrap_or(0);
        let consistent = match t.kind {
            RealForward => ooffset.checked_mul(2) == Some(ioffset),
            _ => ioffset.checked_mul(2) == Some(ooffset),
        };
        if !consistent {
            c.fail(
                Check::Placement,
                format!("in-place {} offsets disagree: ioffset {ioffset}, ooffset {ooffset}", t.kind),
            );
        }
    } else {
        if t.input_kind != t.output_kind {
            c.fail(
                Check::Placement,
                format!("in-place transforms cannot mix {} and {} storage", t.input_kind, t.output_kind),
            );
        }
        if t.input_strides != t.output_strides {
            c.fail(Check::Placement, "in-place transforms require identical strides".to_string());
        }
        if t.input_distance != t.output_distance {
            c.fail(Check::Placement, "in-place transforms require identical distances".to_string());
        }
        if t.input_offsets != t.output_offsets {
            c.fail(Check::Placement, "in-place transforms require identical offsets".to_string());
        }
    }

    // Output aliases the input buffers, so its footprint must fit in them.
    let output = t.output_layout();
    let in_width = element_width(t.precision, t.input_kind);
    let out_width = element_width(t.precision, t.output_kind);
    for (buffer, &size) in t.input_sizes.iter().enumerate().take(t.output_kind.buffer_count()) {
        let needed = output
            .required_elements(buffer, t.batch)
            .and_then(|n| n.checked_mul(out_width));
        let available = size.checked_mul(in_width);
        // Overflow on either side was already reported by the buffer-size check.
        if let (Some(needed), Some(available)) = (needed, available) {
            if needed > available {
                c.fail(
                    Check::Placement,
                    format!("in-place output needs {needed} bytes of input buffer {buffer}, which holds {available}"),
                );
            }
        }
    }
}
