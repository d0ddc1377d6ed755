//! Error metrics between a reference result and a candidate result.
//!
//! The metrics report; they do not judge. [`Tolerance`] is one acceptance
//! policy a caller may apply.

use std::fmt;

use num_complex::Complex;

use crate::error::{Result, RiderError, Stage};
use crate::types::Precision;

/// Normalized root-mean-square error:
/// `sqrt(mean(|ref - cand|²)) / max(|ref component|)`.
///
/// The peak is taken over the real and imaginary components separately. When
/// the reference is identically zero the plain RMS error is returned.
///
/// ```
/// # use fft_rider::compare::nrmse;
/// # use num_complex::Complex;
/// let a = vec![Complex::new(1.0, 2.0), Complex::new(-3.0, 0.5)];
/// assert_eq!(nrmse(&a, &a), 0.0);
/// ```
#[must_use]
pub fn nrmse(reference: &[Complex<f64>], candidate: &[Complex<f64>]) -> f64 {
    let n = reference.len().min(candidate.len());
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut peak = 0.0f64;
    for (r, c) in reference.iter().zip(candidate) {
        let d = r - c;
        sum += d.re * d.re + d.im * d.im;
        peak = peak.max(r.re.abs()).max(r.im.abs());
    }
    let rms = (sum / n as f64).sqrt();
    if peak > 0.0 {
        rms / peak
    } else {
        rms
    }
}

/// L2 and L-infinity norms of a vector, or of a difference.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VectorNorms {
    pub l_2: f64,
    pub l_inf: f64,
}

#[must_use]
pub fn norms(data: &[Complex<f64>]) -> VectorNorms {
    let (sum_sqr, l_inf) = data.iter().fold((0.0f64, 0.0f64), |(sum, peak), v| {
        (sum + v.norm_sqr(), peak.max(v.re.abs()).max(v.im.abs()))
    });
    VectorNorms { l_2: sum_sqr.sqrt(), l_inf }
}

/// Norms of `reference - candidate`.
#[must_use]
pub fn distance(reference: &[Complex<f64>], candidate: &[Complex<f64>]) -> VectorNorms {
    let diff: Vec<Complex<f64>> = reference.iter().zip(candidate).map(|(r, c)| r - c).collect();
    norms(&diff)
}

/// Acceptance cutoffs scaled by precision and transform size:
/// `linf < eps * |ref|_inf * ln(N)` and `l2 / |ref|_2 < sqrt(log2 N) * eps`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub epsilon: f64,
    pub total_elements: usize,
}

impl Tolerance {
    #[must_use]
    pub fn new(precision: Precision, total_elements: usize) -> Self {
        Self { epsilon: precision.epsilon(), total_elements }
    }

    // Sizes below 2 would give log factors of zero.
    fn n(&self) -> f64 {
        self.total_elements.max(2) as f64
    }

    #[must_use]
    pub fn linf_cutoff(&self, reference: &VectorNorms) -> f64 {
        self.epsilon * reference.l_inf * self.n().ln()
    }

    #[must_use]
    pub fn l2_cutoff(&self) -> f64 {
        self.n().log2().sqrt() * self.epsilon
    }
}

/// Result of comparing a candidate against a reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub nrmse: f64,
    pub reference: VectorNorms,
    pub candidate: VectorNorms,
    pub diff: VectorNorms,
}

impl Comparison {
    /// Fails when the two results have different element counts.
    pub fn new(reference: &[Complex<f64>], candidate: &[Complex<f64>]) -> Result<Self> {
        if reference.len() != candidate.len() {
            return Err(RiderError::invalid(
                Stage::Compare,
                format!(
                    "reference has {} elements, candidate {}",
                    reference.len(),
                    candidate.len()
                ),
            ));
        }
        Ok(Self {
            nrmse: nrmse(reference, candidate),
            reference: norms(reference),
            candidate: norms(candidate),
            diff: distance(reference, candidate),
        })
    }

    /// Applies `tolerance` to both norms. Non-finite candidates never pass.
    #[must_use]
    pub fn passes(&self, tolerance: &Tolerance) -> bool {
        if !self.candidate.l_2.is_finite() || !self.candidate.l_inf.is_finite() {
            return false;
        }
        let l2_relative = if self.reference.l_2 > 0.0 {
            self.diff.l_2 / self.reference.l_2
        } else {
            self.diff.l_2
        };
        self.diff.l_inf <= tolerance.linf_cutoff(&self.reference) && l2_relative <= tolerance.l2_cutoff()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "normalized root mean square error (nrmse): {:e}", self.nrmse)?;
        writeln!(f, "L2 diff: {:e}", self.diff.l_2)?;
        write!(f, "Linf diff: {:e}", self.diff.l_inf)
    }
}
