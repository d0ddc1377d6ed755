// Cooley-Tukey radix-2 DIT kernels over a batched planar work array.
//
// The work array holds `total = batch * n` real parts followed by `total`
// imaginary parts; signal `b` occupies `[b * n, (b + 1) * n)` in each half.
// A transform is: `bit_reverse_batch` (input -> work), `butterfly_inner_batch`
// for the stages that fit in a shared-memory tile, one `butterfly_stage_batch`
// per remaining stage, then `copy_out_batch` (work -> output).
use cubecl::prelude::*;
use std::f32::consts::PI;

/// Gathers planar input into the work array in bit-reversed order, per signal.
///
/// One thread per element: `work[b * n + rev(i)] = input[b * n + i]`.
#[cube(launch)]
pub fn bit_reverse_batch<F: Float>(
    real: &Array<F>,
    imag: &Array<F>,
    work: &mut Array<F>,
    #[comptime] n: usize,
    #[comptime] bits: usize,
    #[comptime] total: usize,
) {
    let tid = ABSOLUTE_POS;
    if tid < total {
        let signal = tid / n;
        let mut x = tid % n;
        let mut r: usize = 0;
        for _bit in 0..bits {
            r = (r << 1) | (x & 1);
            x = x >> 1;
        }
        let dst = signal * n + r;
        work[dst] = real[tid];
        work[total + dst] = imag[tid];
    }
}

/// Writes the work array back to planar output buffers.
#[cube(launch)]
pub fn copy_out_batch<F: Float>(
    work: &Array<F>,
    real: &mut Array<F>,
    imag: &mut Array<F>,
    #[comptime] total: usize,
) {
    let tid = ABSOLUTE_POS;
    if tid < total {
        real[tid] = work[tid];
        imag[tid] = work[total + tid];
    }
}

/// One DIT butterfly stage over global memory for every signal.
///
/// ```text
/// signal = tid / (n / 2)
/// pos    = tid % (n / 2)
/// k      = pos % half_stride
/// i      = (pos / half_stride) * (2 * half_stride) + k
/// j      = i + half_stride
///
/// W      = exp(sign · jπ · k / half_stride)     sign = -1 forward, +1 inverse
/// out[i] = in[i] + W · in[j]
/// out[j] = in[i] - W · in[j]
/// ```
///
/// Launch with `ceil(batch * n / 2 / WORKGROUP_SIZE)` cubes of
/// `WORKGROUP_SIZE` threads.
#[cube(launch)]
pub fn butterfly_stage_batch<F: Float>(
    work: &mut Array<F>,
    #[comptime] n: usize,
    #[comptime] half_stride: usize,
    #[comptime] batch: usize,
    #[comptime] forward: bool,
) {
    let tid = ABSOLUTE_POS;
    let total = batch * n;

    if tid < batch * (n / 2) {
        let signal = tid / (n / 2);
        let pos = tid % (n / 2);
        let base = signal * n;

        let k = pos % half_stride;
        let i = base + (pos / half_stride) * (half_stride * 2) + k;
        let j = i + half_stride;

        let sign = if forward { F::new(-1.0) } else { F::new(1.0) };
        let angle = sign * F::new(PI) * F::cast_from(k) / F::cast_from(half_stride);
        let cos_a = F::cos(angle);
        let sin_a = F::sin(angle);

        let ur = work[i];
        let ui = work[total + i];
        let vr = cos_a * work[j] - sin_a * work[total + j];
        let vi = sin_a * work[j] + cos_a * work[total + j];

        work[i] = ur + vr;
        work[total + i] = ui + vi;
        work[j] = ur - vr;
        work[total + j] = ui - vi;
    }
}

/// The first `stages` butterfly stages of every signal, fused in shared memory.
///
/// Each cube of `tile / 2` threads loads one `tile`-element slice of one
/// signal, runs all stages with a barrier between them, and stores it back.
///
/// ```text
/// local       = ABSOLUTE_POS % (tile / 2)
/// tile_global = ABSOLUTE_POS / (tile / 2)
/// base        = (tile_global / tiles_per_signal) * n + (tile_global % tiles_per_signal) * tile
/// ```
///
/// Launch with `tiles_per_signal * batch` cubes of `tile / 2` threads.
/// Shared memory: `2 * tile * sizeof(F)` bytes per cube.
#[cube(launch)]
pub fn butterfly_inner_batch<F: Float>(
    work: &mut Array<F>,
    #[comptime] n: usize,
    #[comptime] tile: usize,
    #[comptime] stages: usize,
    #[comptime] total: usize,
    #[comptime] forward: bool,
) {
    let mut s_real = SharedMemory::<F>::new(tile);
    let mut s_imag = SharedMemory::<F>::new(tile);

    let half_tile = tile / 2;
    let tiles_per_signal = (n / tile).max(1);

    let tid = ABSOLUTE_POS;
    let local = tid % half_tile;
    let tile_global = tid / half_tile;
    let base = (tile_global / tiles_per_signal) * n + (tile_global % tiles_per_signal) * tile;

    s_real[local] = work[base + local];
    s_real[local + half_tile] = work[base + local + half_tile];
    s_imag[local] = work[total + base + local];
    s_imag[local + half_tile] = work[total + base + local + half_tile];

    sync_cube();

    for s in 0..stages {
        let hs = 1_usize << s;

        let k = local % hs;
        let i = (local / hs) * (hs * 2) + k;
        let j = i + hs;

        let sign = if forward { F::new(-1.0) } else { F::new(1.0) };
        let angle = sign * F::new(PI) * F::cast_from(k) / F::cast_from(hs);
        let cos_a = F::cos(angle);
        let sin_a = F::sin(angle);

        let ur = s_real[i];
        let ui = s_imag[i];
        let vr = cos_a * s_real[j] - sin_a * s_imag[j];
        let vi = sin_a * s_real[j] + cos_a * s_imag[j];

        s_real[i] = ur + vr;
        s_imag[i] = ui + vi;
        s_real[j] = ur - vr;
        s_imag[j] = ui - vi;

        sync_cube();
    }

    work[base + local] = s_real[local];
    work[base + local + half_tile] = s_real[local + half_tile];
    work[total + base + local] = s_imag[local];
    work[total + base + local + half_tile] = s_imag[local + half_tile];
}
