//! Row-major ↔ column-major axis ordering.
//!
//! The command line and [`ResolvedTransform`] list axes slowest-first; engines
//! take them fastest-first. Only per-axis sequences (lengths, strides) are
//! reordered. Distances and offsets are per-batch scalars and stay as they are.

use crate::types::ResolvedTransform;

/// Reverses a per-axis sequence. Applying it twice gives back the input.
///
/// ```
/// # use fft_rider::order::to_engine_order;
/// assert_eq!(to_engine_order(&[64, 32, 16]), vec![16, 32, 64]);
/// assert_eq!(to_engine_order(&to_engine_order(&[3, 5])), vec![3, 5]);
/// ```
#[must_use]
pub fn to_engine_order<T: Clone>(sequence: &[T]) -> Vec<T> {
    sequence.iter().rev().cloned().collect()
}

/// Lengths and strides of a resolved transform in engine (fastest-first) order.
///
/// The three sequences are always reordered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAxes {
    pub lengths: Vec<usize>,
    pub input_strides: Vec<usize>,
    pub output_strides: Vec<usize>,
}

impl EngineAxes {
    #[must_use]
    pub fn of(transform: &ResolvedTransform) -> Self {
        Self {
            lengths: to_engine_order(transform.lengths()),
            input_strides: to_engine_order(transform.input_strides()),
            output_strides: to_engine_order(transform.output_strides()),
        }
    }

    /// The same axes back in row-major order.
    #[must_use]
    pub fn to_user_order(&self) -> EngineAxes {
        EngineAxes {
            lengths: to_engine_order(&self.lengths),
            input_strides: to_engine_order(&self.input_strides),
            output_strides: to_engine_order(&self.output_strides),
        }
    }
}
