//! Layout resolution: fills in the strides, batch distances, offsets and buffer
//! sizes a caller left unspecified.
//!
//! All sequences here are row-major (the last axis varies fastest). Conversion to
//! the engine's column-major order happens later, in [`crate::order`].
//!
//! ### Real / hermitian packing
//!
//! A real transform of innermost length `n` has a hermitian side holding only
//! `n / 2 + 1` complex values along that axis. When the transform is in-place the
//! real side shares storage with the hermitian side, so its innermost axis is
//! padded to `2 * (n / 2 + 1)` reals. The padding only affects the stride of the
//! axis directly outside the innermost one; further axes pack on top of that.
//!
//! | placement    | kind         | input innermost   | output innermost  |
//! |--------------|--------------|-------------------|-------------------|
//! | out-of-place | real-forward | `n` reals         | `n/2+1` complex   |
//! | in-place     | real-forward | `2(n/2+1)` reals  | `n/2+1` complex   |
//! | out-of-place | real-inverse | `n/2+1` complex   | `n` reals         |
//! | in-place     | real-inverse | `n/2+1` complex   | `2(n/2+1)` reals  |

use tracing::debug;

use crate::error::{Result, RiderError, Stage};
use crate::types::{Placement, RequestedTransform, ResolvedTransform, TransformKind};

/// Hermitian element count for a real axis of length `n`.
#[inline]
#[must_use]
pub fn hermitian_length(n: usize) -> usize {
    n / 2 + 1
}

/// Logical lengths of one side: the hermitian side of a real transform keeps
/// `n / 2 + 1` elements along the innermost axis.
///
/// ```
/// # use fft_rider::layout::side_lengths;
/// # use fft_rider::TransformKind;
/// assert_eq!(side_lengths(&[4, 8], TransformKind::RealForward, true), vec![4, 8]);
/// assert_eq!(side_lengths(&[4, 8], TransformKind::RealForward, false), vec![4, 5]);
/// assert_eq!(side_lengths(&[4, 8], TransformKind::RealInverse, true), vec![4, 5]);
/// ```
#[must_use]
pub fn side_lengths(lengths: &[usize], kind: TransformKind, is_input: bool) -> Vec<usize> {
    let mut side = lengths.to_vec();
    let hermitian = match kind {
        TransformKind::RealForward => !is_input,
        TransformKind::RealInverse => is_input,
        _ => false,
    };
    if hermitian {
        if let Some(last) = side.last_mut() {
            *last = hermitian_length(*last);
        }
    }
    side
}

/// `true` for the real side of an in-place real transform, whose innermost axis
/// is padded to hold the hermitian side as well.
#[must_use]
pub fn is_real_packed(placement: Placement, kind: TransformKind, is_input: bool) -> bool {
    placement == Placement::InPlace
        && match kind {
            TransformKind::RealForward => is_input,
            TransformKind::RealInverse => !is_input,
            _ => false,
        }
}

/// Returns `user_strides` unchanged when given, otherwise the unit-stride packing
/// of `lengths`.
///
/// With `real_packed`, the innermost length contributes `2 * (n / 2 + 1)` to the
/// stride of the next axis out instead of `n`.
///
/// ```
/// # use fft_rider::layout::resolve_strides;
/// assert_eq!(resolve_strides(&[2, 3, 4], &[], false).unwrap(), vec![12, 4, 1]);
/// assert_eq!(resolve_strides(&[4, 8], &[], true).unwrap(), vec![10, 1]);
/// assert_eq!(resolve_strides(&[4, 8], &[16, 2], false).unwrap(), vec![16, 2]);
/// assert!(resolve_strides(&[1 << 40, 1 << 40, 1 << 40], &[], false).is_err());
/// ```
pub fn resolve_strides(lengths: &[usize], user_strides: &[usize], real_packed: bool) -> Result<Vec<usize>> {
    if !user_strides.is_empty() {
        return Ok(user_strides.to_vec());
    }
    let dim = lengths.len();
    let mut strides = vec![1usize; dim];
    for axis in (0..dim.saturating_sub(1)).rev() {
        let mut inner = lengths[axis + 1];
        if real_packed && axis + 1 == dim - 1 {
            inner = padded_length(inner)?;
        }
        strides[axis] = strides[axis + 1]
            .checked_mul(inner)
            .ok_or_else(|| overflow(format!("stride of axis {axis}")))?;
    }
    Ok(strides)
}

/// Default distance between consecutive batch items: the largest
/// `length * stride` over the axes of this side, read off the resolved strides.
///
/// `lengths` are the full transform lengths; the side's hermitian halving and
/// in-place padding are applied here.
pub fn resolve_distance(
    placement: Placement,
    kind: TransformKind,
    lengths: &[usize],
    strides: &[usize],
    is_input: bool,
) -> Result<usize> {
    let mut side = side_lengths(lengths, kind, is_input);
    if is_real_packed(placement, kind, is_input) {
        if let (Some(last), Some(&n)) = (side.last_mut(), lengths.last()) {
            *last = padded_length(n)?;
        }
    }
    side.iter().zip(strides).try_fold(0, |distance: usize, (&n, &s)| -> Result<usize> {
        let extent = n.checked_mul(s).ok_or_else(|| overflow("batch distance".to_string()))?;
        Ok(distance.max(extent))
    })
}

/// Maximum reachable linear index of one batch item, plus one, or `None` when
/// that index does not fit in a `usize`.
///
/// ```
/// # use fft_rider::layout::span;
/// assert_eq!(span(&[16], &[1]), Some(16));
/// assert_eq!(span(&[4, 5], &[10, 1]), Some(35));
/// assert_eq!(span(&[3], &[usize::MAX]), None);
/// ```
#[must_use]
pub fn span(lengths: &[usize], strides: &[usize]) -> Option<usize> {
    lengths
        .iter()
        .zip(strides)
        .try_fold(1usize, |reach, (&n, &s)| {
            reach.checked_add(n.saturating_sub(1).checked_mul(s)?)
        })
}

// Innermost real length of an in-place real transform, padded to the hermitian side.
fn padded_length(n: usize) -> Result<usize> {
    hermitian_length(n)
        .checked_mul(2)
        .ok_or_else(|| overflow("padded innermost length".to_string()))
}

fn overflow(what: String) -> RiderError {
    RiderError::invalid(Stage::Resolve, format!("{what} overflows the addressable range"))
}

/// Completes a requested transform.
///
/// User-supplied strides, distances, offsets and sizes are copied as given; the
/// validator decides whether they are consistent. Only malformed shapes (empty or
/// zero lengths, zero batch) and defaults that overflow `usize` are rejected here.
pub fn resolve(request: &RequestedTransform) -> Result<ResolvedTransform> {
    request.check_shape()?;

    let kind = request.kind;
    let placement = request.placement;
    let (default_in, default_out) = kind.default_array_kinds();
    let input_kind = request.input_kind.unwrap_or(default_in);
    let output_kind = request.output_kind.unwrap_or(default_out);

    let input_strides = resolve_strides(
        &side_lengths(&request.lengths, kind, true),
        &request.input_strides,
        is_real_packed(placement, kind, true),
    )?;
    let output_strides = resolve_strides(
        &side_lengths(&request.lengths, kind, false),
        &request.output_strides,
        is_real_packed(placement, kind, false),
    )?;

    let input_distance = match request.input_distance {
        0 => resolve_distance(placement, kind, &request.lengths, &input_strides, true)?,
        d => d,
    };
    let output_distance = match request.output_distance {
        0 => resolve_distance(placement, kind, &request.lengths, &output_strides, false)?,
        d => d,
    };

    let input_offsets = default_offsets(&request.input_offsets, input_kind.buffer_count());
    let output_offsets = default_offsets(&request.output_offsets, output_kind.buffer_count());

    let input_sizes =
        default_sizes(&request.input_sizes, &input_offsets, request.batch, input_distance)?;
    let output_sizes =
        default_sizes(&request.output_sizes, &output_offsets, request.batch, output_distance)?;

    let resolved = ResolvedTransform {
        lengths: request.lengths.clone(),
        kind,
        precision: request.precision,
        placement,
        input_kind,
        output_kind,
        batch: request.batch,
        input_strides,
        output_strides,
        input_distance,
        output_distance,
        input_offsets,
        output_offsets,
        input_sizes,
        output_sizes,
    };
    debug!(
        istride = ?resolved.input_strides,
        ostride = ?resolved.output_strides,
        idist = resolved.input_distance,
        odist = resolved.output_distance,
        isize = ?resolved.input_sizes,
        osize = ?resolved.output_sizes,
        "resolved transform layout"
    );
    Ok(resolved)
}

fn default_offsets(user: &[usize], buffers: usize) -> Vec<usize> {
    if user.is_empty() {
        vec![0; buffers]
    } else {
        user.to_vec()
    }
}

// Each buffer holds its offset plus `batch` whole items.
fn default_sizes(
    user: &[usize],
    offsets: &[usize],
    batch: usize,
    distance: usize,
) -> Result<Vec<usize>> {
    if !user.is_empty() {
        return Ok(user.to_vec());
    }
    offsets
        .iter()
        .map(|&offset| {
            batch
                .checked_mul(distance)
                .and_then(|items| items.checked_add(offset))
                .ok_or_else(|| {
                    overflow(format!("buffer size for {batch} items at distance {distance}"))
                })
        })
        .collect()
}
