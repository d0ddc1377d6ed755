//! CPU reference transforms over contiguous row-major data, built on `rustfft`.
//!
//! Transforms are unnormalized in both directions: an inverse of a forward
//! transform of length `N` returns the input scaled by `N`.

use num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

use crate::layout::side_lengths;
use crate::types::TransformKind;

/// In-place multi-dimensional transform of one contiguous row-major item of
/// shape `shape`, one axis at a time.
pub fn fft_nd(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    shape: &[usize],
    direction: FftDirection,
) {
    let total: usize = shape.iter().product();
    debug_assert_eq!(data.len(), total);
    let mut line = Vec::new();
    for (axis, &n) in shape.iter().enumerate() {
        if n <= 1 {
            continue;
        }
        let fft = planner.plan_fft(n, direction);
        let inner: usize = shape[axis + 1..].iter().product();
        let outer = total / (n * inner);
        line.resize(n, Complex::new(0.0, 0.0));
        for o in 0..outer {
            for i in 0..inner {
                let base = o * n * inner + i;
                for (k, slot) in line.iter_mut().enumerate() {
                    *slot = data[base + k * inner];
                }
                fft.process(&mut line);
                for (k, v) in line.iter().enumerate() {
                    data[base + k * inner] = *v;
                }
            }
        }
    }
}

/// Row-major multi-index of linear position `flat` within `shape`.
fn unravel(mut flat: usize, shape: &[usize], index: &mut [usize]) {
    for (axis, &n) in shape.iter().enumerate().rev() {
        index[axis] = flat % n;
        flat /= n;
    }
}

fn ravel(index: &[usize], shape: &[usize]) -> usize {
    index.iter().zip(shape).fold(0, |acc, (&i, &n)| acc * n + i)
}

/// Forward transform of a real item of shape `lengths`, keeping the
/// `n / 2 + 1` hermitian half of the innermost axis.
#[must_use]
pub fn real_forward(lengths: &[usize], real: &[f64]) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::new();
    real_forward_with(&mut planner, lengths, real)
}

fn real_forward_with(
    planner: &mut FftPlanner<f64>,
    lengths: &[usize],
    real: &[f64],
) -> Vec<Complex<f64>> {
    let mut full: Vec<Complex<f64>> = real.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_nd(planner, &mut full, lengths, FftDirection::Forward);

    let half = side_lengths(lengths, TransformKind::RealForward, false);
    let mut index = vec![0; lengths.len()];
    (0..half.iter().product::<usize>())
        .map(|flat| {
            unravel(flat, &half, &mut index);
            full[ravel(&index, lengths)]
        })
        .collect()
}

/// Inverse transform of a hermitian item (innermost axis `n / 2 + 1`) back to
/// a real item of shape `lengths`. The missing half is rebuilt from conjugate
/// symmetry across every axis.
fn real_inverse_with(
    planner: &mut FftPlanner<f64>,
    lengths: &[usize],
    hermitian: &[Complex<f64>],
) -> Vec<f64> {
    let half = side_lengths(lengths, TransformKind::RealInverse, true);
    let total: usize = lengths.iter().product();
    let last = lengths.len() - 1;
    let mut index = vec![0; lengths.len()];
    let mut mirror = vec![0; lengths.len()];

    let mut full: Vec<Complex<f64>> = (0..total)
        .map(|flat| {
            unravel(flat, lengths, &mut index);
            if index[last] < half[last] {
                hermitian[ravel(&index, &half)]
            } else {
                for (axis, (&i, &n)) in index.iter().zip(lengths).enumerate() {
                    mirror[axis] = (n - i) % n;
                }
                hermitian[ravel(&mirror, &half)].conj()
            }
        })
        .collect();
    fft_nd(planner, &mut full, lengths, FftDirection::Inverse);
    full.into_iter().map(|v| v.re).collect()
}

/// Applies `kind` to `batch` contiguous items.
///
/// `input` holds `batch` items shaped like the input side, the result `batch`
/// items shaped like the output side (see [`side_lengths`]). Real sides carry
/// their values in the real part.
#[must_use]
pub fn transform(
    kind: TransformKind,
    lengths: &[usize],
    batch: usize,
    input: &[Complex<f64>],
) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::new();
    let in_elems: usize = side_lengths(lengths, kind, true).iter().product();
    let mut out = Vec::with_capacity(batch * side_lengths(lengths, kind, false).iter().product::<usize>());

    for item in input.chunks(in_elems).take(batch) {
        match kind {
            TransformKind::ComplexForward | TransformKind::ComplexInverse => {
                let direction = if kind.is_forward() {
                    FftDirection::Forward
                } else {
                    FftDirection::Inverse
                };
                let mut data = item.to_vec();
                fft_nd(&mut planner, &mut data, lengths, direction);
                out.extend(data);
            }
            TransformKind::RealForward => {
                let real: Vec<f64> = item.iter().map(|v| v.re).collect();
                out.extend(real_forward_with(&mut planner, lengths, &real));
            }
            TransformKind::RealInverse => {
                let real = real_inverse_with(&mut planner, lengths, item);
                out.extend(real.into_iter().map(|x| Complex::new(x, 0.0)));
            }
        }
    }
    out
}
