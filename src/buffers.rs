//! Buffer provisioning: byte sizes of the physical buffers, synthetic host input,
//! and element access into host byte buffers for any [`SideLayout`].
//!
//! Host buffers are plain byte vectors, one per physical buffer, holding
//! native-endian `f32` or `f64` components:
//!
//! | kind                          | buffers | element                        |
//! |-------------------------------|---------|--------------------------------|
//! | interleaved / herm. interl.   | 1       | `re, im` adjacent              |
//! | planar / herm. planar         | 2       | `re` in buffer 0, `im` in 1    |
//! | real                          | 1       | one real                       |

use std::fmt::Write as _;

use num_complex::Complex;

use crate::error::{EngineError, Result, RiderError, Stage};
use crate::reference;
use crate::types::{ArrayKind, Precision, ResolvedTransform, SideLayout, TransformKind};

/// One byte vector per physical buffer.
pub type HostBuffers = Vec<Vec<u8>>;

/// Bytes per element of one physical buffer of `kind`.
///
/// ```
/// # use fft_rider::buffers::element_width;
/// # use fft_rider::{ArrayKind, Precision};
/// assert_eq!(element_width(Precision::Single, ArrayKind::Interleaved), 8);
/// assert_eq!(element_width(Precision::Double, ArrayKind::Planar), 8);
/// assert_eq!(element_width(Precision::Single, ArrayKind::Real), 4);
/// ```
#[must_use]
pub fn element_width(precision: Precision, kind: ArrayKind) -> usize {
    match kind {
        ArrayKind::Interleaved | ArrayKind::HermitianInterleaved => 2 * precision.real_bytes(),
        ArrayKind::Planar | ArrayKind::HermitianPlanar | ArrayKind::Real => precision.real_bytes(),
    }
}

/// Byte size of every physical input (`for_input`) or output buffer.
///
/// Fails when an element count times the element width exceeds `usize`; the
/// validator rejects such descriptors, so this only fires on unvalidated ones.
pub fn buffer_sizes(transform: &ResolvedTransform, for_input: bool) -> Result<Vec<usize>> {
    let (name, kind, sizes) = if for_input {
        ("isize", transform.input_kind(), transform.input_sizes())
    } else {
        ("osize", transform.output_kind(), transform.output_sizes())
    };
    let width = element_width(transform.precision(), kind);
    sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            n.checked_mul(width).ok_or_else(|| {
                RiderError::invalid(
                    Stage::Validate,
                    format!("{name}[{i}] = {n} elements of {width} bytes overflows"),
                )
            })
        })
        .collect()
}

/// A zero-filled byte vector, reporting exhaustion instead of aborting.
pub fn try_zeroed(bytes: usize) -> std::result::Result<Vec<u8>, EngineError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|e| EngineError::new(format!("host allocation of {bytes} bytes: {e}")))?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

/// [`try_zeroed`] with the failure attributed to `stage`.
pub fn zeroed(bytes: usize, stage: Stage) -> Result<Vec<u8>> {
    try_zeroed(bytes).map_err(|e| RiderError::allocation(stage, bytes, e))
}

/// Zero-filled host buffers matching [`buffer_sizes`]. Host staging belongs to
/// planning, so exhaustion is reported at [`Stage::Plan`].
pub fn allocate_host(transform: &ResolvedTransform, for_input: bool) -> Result<HostBuffers> {
    buffer_sizes(transform, for_input)?
        .into_iter()
        .map(|bytes| zeroed(bytes, Stage::Plan))
        .collect()
}

/// Linear element offset (relative to a batch item's start) of every logical
/// element, visited in row-major order.
#[must_use]
pub fn linear_offsets(lengths: &[usize], strides: &[usize]) -> Vec<usize> {
    let mut offsets = vec![0usize];
    for (&n, &s) in lengths.iter().zip(strides) {
        offsets = offsets
            .iter()
            .flat_map(|&base| (0..n).map(move |i| base + i * s))
            .collect();
    }
    offsets
}

fn read_real(buffer: &[u8], precision: Precision, index: usize) -> f64 {
    match precision {
        Precision::Single => {
            let at = index * 4;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&buffer[at..at + 4]);
            f64::from(f32::from_ne_bytes(raw))
        }
        Precision::Double => {
            let at = index * 8;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buffer[at..at + 8]);
            f64::from_ne_bytes(raw)
        }
    }
}

fn write_real(buffer: &mut [u8], precision: Precision, index: usize, value: f64) {
    match precision {
        Precision::Single => {
            let at = index * 4;
            buffer[at..at + 4].copy_from_slice(&(value as f32).to_ne_bytes());
        }
        Precision::Double => {
            let at = index * 8;
            buffer[at..at + 8].copy_from_slice(&value.to_ne_bytes());
        }
    }
}

// Element index of batch item `b` in physical buffer `buffer`; planar kinds
// share the strides across both buffers, each with its own offset.
fn item_base(side: &SideLayout, buffer: usize, b: usize) -> usize {
    side.offsets.get(buffer).copied().unwrap_or(0) + b * side.distance
}

fn read_element<B: AsRef<[u8]>>(
    buffers: &[B],
    precision: Precision,
    side: &SideLayout,
    b: usize,
    o: usize,
) -> Complex<f64> {
    let at = item_base(side, 0, b) + o;
    match side.kind {
        ArrayKind::Interleaved | ArrayKind::HermitianInterleaved => {
            let buf = buffers[0].as_ref();
            Complex::new(read_real(buf, precision, 2 * at), read_real(buf, precision, 2 * at + 1))
        }
        ArrayKind::Planar | ArrayKind::HermitianPlanar => Complex::new(
            read_real(buffers[0].as_ref(), precision, at),
            read_real(buffers[1].as_ref(), precision, item_base(side, 1, b) + o),
        ),
        ArrayKind::Real => Complex::new(read_real(buffers[0].as_ref(), precision, at), 0.0),
    }
}

fn write_element<B: AsMut<[u8]>>(
    buffers: &mut [B],
    precision: Precision,
    side: &SideLayout,
    b: usize,
    o: usize,
    value: Complex<f64>,
) {
    let at = item_base(side, 0, b) + o;
    match side.kind {
        ArrayKind::Interleaved | ArrayKind::HermitianInterleaved => {
            let buf = buffers[0].as_mut();
            write_real(buf, precision, 2 * at, value.re);
            write_real(buf, precision, 2 * at + 1, value.im);
        }
        ArrayKind::Planar | ArrayKind::HermitianPlanar => {
            let at1 = item_base(side, 1, b) + o;
            write_real(buffers[0].as_mut(), precision, at, value.re);
            write_real(buffers[1].as_mut(), precision, at1, value.im);
        }
        ArrayKind::Real => write_real(buffers[0].as_mut(), precision, at, value.re),
    }
}

/// Collects every logical element of `batch` items into one contiguous
/// row-major vector (batch-major).
///
/// Callers are expected to have validated that the buffers cover the layout.
#[must_use]
pub fn gather<B: AsRef<[u8]>>(
    buffers: &[B],
    precision: Precision,
    side: &SideLayout,
    batch: usize,
) -> Vec<Complex<f64>> {
    let offsets = linear_offsets(&side.lengths, &side.strides);
    let mut out = Vec::with_capacity(offsets.len() * batch);
    for b in 0..batch {
        out.extend(offsets.iter().map(|&o| read_element(buffers, precision, side, b, o)));
    }
    out
}

/// Inverse of [`gather`]: writes contiguous batch-major data into the layout.
/// Gaps and padding are left untouched.
pub fn scatter<B: AsMut<[u8]>>(
    buffers: &mut [B],
    precision: Precision,
    side: &SideLayout,
    batch: usize,
    data: &[Complex<f64>],
) {
    let offsets = linear_offsets(&side.lengths, &side.strides);
    for b in 0..batch {
        for (i, &o) in offsets.iter().enumerate() {
            write_element(buffers, precision, side, b, o, data[b * offsets.len() + i]);
        }
    }
}

/// Deterministic value for logical element `index` of batch item `b`.
/// Bounded to `[-0.5, 0.5)` per component; neighbouring elements always differ.
fn pattern(b: usize, index: usize) -> Complex<f64> {
    let re = ((index * 37 + b * 101 + 13) % 97) as f64 / 97.0 - 0.5;
    let im = ((index * 53 + b * 29 + 7) % 89) as f64 / 89.0 - 0.5;
    Complex::new(re, im)
}

/// Host input for a transform, reproducible across runs.
///
/// Complex inputs get the pattern directly, real inputs its real part. A
/// hermitian input is produced as the forward transform of a real pattern, so it
/// carries the conjugate symmetry an inverse real transform expects.
pub fn synthesize_input(transform: &ResolvedTransform) -> Result<HostBuffers> {
    let side = transform.input_layout();
    let batch = transform.batch();
    let mut buffers = allocate_host(transform, true)?;

    let count = batch.saturating_mul(side.elements());
    let mut data: Vec<Complex<f64>> = Vec::new();
    data.try_reserve_exact(count).map_err(|e| {
        let bytes = count.saturating_mul(std::mem::size_of::<Complex<f64>>());
        RiderError::allocation(Stage::Plan, bytes, EngineError::new(format!("host input staging: {e}")))
    })?;

    match transform.kind() {
        TransformKind::RealInverse => {
            let n: usize = transform.total_elements();
            for b in 0..batch {
                let real: Vec<f64> = (0..n).map(|i| pattern(b, i).re).collect();
                data.extend(reference::real_forward(transform.lengths(), &real));
            }
        }
        _ => {
            let n = side.elements();
            let real_only = side.kind == ArrayKind::Real;
            data.extend((0..batch).flat_map(|b| {
                (0..n).map(move |i| {
                    let v = pattern(b, i);
                    if real_only {
                        Complex::new(v.re, 0.0)
                    } else {
                        v
                    }
                })
            }));
        }
    }

    scatter(&mut buffers, transform.precision(), &side, batch, &data);
    Ok(buffers)
}

/// Human-readable dump of a side's logical elements: one block per batch item,
/// one line per innermost row.
#[must_use]
pub fn format_buffer<B: AsRef<[u8]>>(
    buffers: &[B],
    precision: Precision,
    side: &SideLayout,
    batch: usize,
) -> String {
    let data = gather(buffers, precision, side, batch);
    let row = side.lengths.last().copied().unwrap_or(1).max(1);
    let per_item = side.elements().max(1);
    let mut out = String::new();
    for (b, item) in data.chunks(per_item).enumerate() {
        let _ = writeln!(out, "batch {b}:");
        for line in item.chunks(row) {
            for v in line {
                if side.kind == ArrayKind::Real {
                    let _ = write!(out, "{} ", v.re);
                } else {
                    let _ = write!(out, "({},{}) ", v.re, v.im);
                }
            }
            out.push('\n');
        }
    }
    out
}
