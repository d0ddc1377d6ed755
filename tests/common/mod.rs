//! Shared test helpers compiled into every integration-test binary.
//! Items may not all be used in every binary, so dead_code is suppressed.
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use fft_rider::engine::{Device, EngineError, ExecBuffers, FftEngine, PlanDescription};
use num_complex::Complex;

/// Maximum absolute error tolerated between f64 results and analytical values.
pub const EPSILON: f64 = 1e-9;

/// Looser bound for anything that went through single-precision storage.
pub const EPSILON_F32: f64 = 1e-4;

pub fn assert_approx(actual: f64, expected: f64, eps: f64, label: &str) {
    assert!(
        (actual - expected).abs() <= eps,
        "{}: got {:.9}, expected {:.9}  (diff {:.2e})",
        label,
        actual,
        expected,
        (actual - expected).abs(),
    );
}

pub fn assert_complex_approx(
    actual: &[Complex<f64>],
    expected: &[Complex<f64>],
    eps: f64,
    label: &str,
) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: length mismatch ({} vs {})",
        label,
        actual.len(),
        expected.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).norm() <= eps,
            "{}[{}]: got {:.6}, expected {:.6}  (diff {:.2e})",
            label,
            i,
            a,
            e,
            (a - e).norm(),
        );
    }
}

/// Naive O(N²) 1-D DFT, unnormalized; `sign` is -1 forward, +1 inverse.
pub fn naive_dft(input: &[Complex<f64>], sign: f64) -> Vec<Complex<f64>> {
    let n = input.len();
    (0..n)
        .map(|k| {
            input.iter().enumerate().fold(Complex::new(0.0, 0.0), |acc, (j, &x)| {
                let angle = sign * 2.0 * std::f64::consts::PI * (j * k) as f64 / n as f64;
                acc + x * Complex::new(angle.cos(), angle.sin())
            })
        })
        .collect()
}

// ── Mock engine ──────────────────────────────────────────────────────────────

/// Counters shared between a mock engine and the test observing it.
#[derive(Debug, Default, Clone)]
pub struct Probe {
    /// Device buffers currently alive.
    pub live_buffers: Rc<Cell<usize>>,
    /// Plans currently alive.
    pub live_plans: Rc<Cell<usize>>,
    /// Calls to `execute`, warm-up included.
    pub executions: Rc<Cell<usize>>,
    /// Host-to-device copies.
    pub uploads: Rc<Cell<usize>>,
    /// Simulated device clock in milliseconds.
    pub clock: Rc<Cell<f64>>,
}

pub struct MockBuffer {
    pub bytes: Vec<u8>,
    live: Rc<Cell<usize>>,
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

pub struct MockDevice {
    probe: Probe,
    allocations: Cell<usize>,
    fail_allocation_at: Option<usize>,
    /// Hands out buffers without backing memory; copies become no-ops.
    lazy: bool,
}

impl Device for MockDevice {
    type Buffer = MockBuffer;
    type Marker = f64;

    fn allocate(&self, bytes: usize) -> Result<MockBuffer, EngineError> {
        let index = self.allocations.get();
        self.allocations.set(index + 1);
        if self.fail_allocation_at == Some(index) {
            return Err(EngineError::new("out of device memory"));
        }
        let live = Rc::clone(&self.probe.live_buffers);
        live.set(live.get() + 1);
        let bytes = if self.lazy { Vec::new() } else { vec![0; bytes] };
        Ok(MockBuffer { bytes, live })
    }

    fn copy_to_device(&self, dst: &mut MockBuffer, src: &[u8]) -> Result<(), EngineError> {
        self.probe.uploads.set(self.probe.uploads.get() + 1);
        if !self.lazy {
            dst.bytes[..src.len()].copy_from_slice(src);
        }
        Ok(())
    }

    fn copy_to_host(&self, src: &MockBuffer, dst: &mut [u8]) -> Result<(), EngineError> {
        if !self.lazy {
            let n = dst.len();
            dst.copy_from_slice(&src.bytes[..n]);
        }
        Ok(())
    }

    fn mark(&self) -> Result<f64, EngineError> {
        Ok(self.probe.clock.get())
    }

    fn wait(&self, _marker: &f64) -> Result<(), EngineError> {
        Ok(())
    }

    fn elapsed_ms(&self, start: &f64, stop: &f64) -> Result<f64, EngineError> {
        Ok(stop - start)
    }
}

pub struct MockPlan {
    live: Rc<Cell<usize>>,
}

impl Drop for MockPlan {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

/// An engine that does no arithmetic: every execution advances the clock by
/// `execute_ms` and can be told to fail.
pub struct MockEngine {
    device: MockDevice,
    pub execute_ms: f64,
    pub scratch_bytes: usize,
    pub fail_plan: bool,
    /// Fails the n-th call to `execute` (0 is the warm-up).
    pub fail_execution_at: Option<usize>,
}

impl MockEngine {
    pub fn new(probe: &Probe) -> Self {
        Self {
            device: MockDevice {
                probe: probe.clone(),
                allocations: Cell::new(0),
                fail_allocation_at: None,
                lazy: false,
            },
            execute_ms: 1.0,
            scratch_bytes: 0,
            fail_plan: false,
            fail_execution_at: None,
        }
    }

    /// Fails the n-th allocation.
    pub fn fail_allocation_at(mut self, index: usize) -> Self {
        self.device.fail_allocation_at = Some(index);
        self
    }

    /// Device allocations of any size succeed without touching memory.
    pub fn lazy(mut self) -> Self {
        self.device.lazy = true;
        self
    }
}

impl FftEngine for MockEngine {
    type Device = MockDevice;
    type Plan = MockPlan;

    fn device(&self) -> &MockDevice {
        &self.device
    }

    fn create_plan(&self, _description: &PlanDescription) -> Result<MockPlan, EngineError> {
        if self.fail_plan {
            return Err(EngineError::new("plan rejected"));
        }
        let live = Rc::clone(&self.device.probe.live_plans);
        live.set(live.get() + 1);
        Ok(MockPlan { live })
    }

    fn scratch_bytes(&self, _plan: &MockPlan) -> usize {
        self.scratch_bytes
    }

    fn execute(
        &self,
        _plan: &MockPlan,
        _buffers: ExecBuffers<'_, MockBuffer>,
        _scratch: Option<&mut MockBuffer>,
    ) -> Result<(), EngineError> {
        let probe = &self.device.probe;
        let index = probe.executions.get();
        probe.executions.set(index + 1);
        if self.fail_execution_at == Some(index) {
            return Err(EngineError::new("kernel launch failed"));
        }
        probe.clock.set(probe.clock.get() + self.execute_ms);
        Ok(())
    }
}
