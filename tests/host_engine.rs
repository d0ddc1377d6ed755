use fft_rider::bench::{BenchmarkOptions, Resolved};
use fft_rider::buffers::{allocate_host, gather, scatter, synthesize_input};
use fft_rider::compare::Tolerance;
use fft_rider::engine::{Device, ExecBuffers, FftEngine, PlanDescription};
use fft_rider::host::HostEngine;
use fft_rider::layout::resolve;
use fft_rider::reference;
use fft_rider::{ArrayKind, Placement, Precision, RequestedTransform, TransformKind};
use num_complex::Complex;

mod common;
use common::{assert_complex_approx, naive_dft, EPSILON};

// ── Reference transforms ──────────────────────────────────────────────────────

#[test]
fn test_reference_matches_naive_dft() {
    let input: Vec<Complex<f64>> =
        (0..12).map(|i| Complex::new((i as f64).sin(), (i as f64 * 0.3).cos())).collect();
    let forward = reference::transform(TransformKind::ComplexForward, &[12], 1, &input);
    assert_complex_approx(&forward, &naive_dft(&input, -1.0), EPSILON, "forward");
    let inverse = reference::transform(TransformKind::ComplexInverse, &[12], 1, &input);
    assert_complex_approx(&inverse, &naive_dft(&input, 1.0), EPSILON, "inverse");
}

/// 2-D transform equals 1-D transforms over rows then columns.
#[test]
fn test_reference_2d_separable() {
    let (rows, cols) = (3, 4);
    let input: Vec<Complex<f64>> =
        (0..rows * cols).map(|i| Complex::new(i as f64, (i % 3) as f64)).collect();
    let got = reference::transform(TransformKind::ComplexForward, &[rows, cols], 1, &input);

    let mut expected: Vec<Complex<f64>> =
        input.chunks(cols).flat_map(|row| naive_dft(row, -1.0)).collect();
    for c in 0..cols {
        let column: Vec<_> = (0..rows).map(|r| expected[r * cols + c]).collect();
        for (r, v) in naive_dft(&column, -1.0).into_iter().enumerate() {
            expected[r * cols + c] = v;
        }
    }
    assert_complex_approx(&got, &expected, EPSILON, "2d");
}

#[test]
fn test_reference_real_round_trip_scales_by_n() {
    let lengths = [4, 6];
    let real: Vec<f64> = (0..24).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
    let half = reference::real_forward(&lengths, &real);
    assert_eq!(half.len(), 4 * 4);

    let back = reference::transform(TransformKind::RealInverse, &lengths, 1, &half);
    let expected: Vec<Complex<f64>> = real.iter().map(|&x| Complex::new(24.0 * x, 0.0)).collect();
    assert_complex_approx(&back, &expected, 1e-9, "real round trip");
}

// ── Engine execution ──────────────────────────────────────────────────────────

fn run_once(r: &RequestedTransform) -> (Vec<Complex<f64>>, Vec<Complex<f64>>) {
    let t = resolve(r).unwrap();
    let engine = HostEngine::setup(0).unwrap();
    let plan = engine.create_plan(&PlanDescription::from_resolved(&t)).unwrap();
    let mut scratch = match engine.scratch_bytes(&plan) {
        0 => None,
        bytes => Some(engine.device().allocate(bytes).unwrap()),
    };

    let mut input = synthesize_input(&t).unwrap();
    let expected = reference::transform(
        t.kind(),
        t.lengths(),
        t.batch(),
        &gather(&input, t.precision(), &t.input_layout(), t.batch()),
    );
    let got = match t.placement() {
        Placement::InPlace => {
            engine.execute(&plan, ExecBuffers::InPlace(&mut input), scratch.as_mut()).unwrap();
            gather(&input, t.precision(), &t.output_layout(), t.batch())
        }
        Placement::OutOfPlace => {
            let mut output = allocate_host(&t, false).unwrap();
            engine
                .execute(
                    &plan,
                    ExecBuffers::OutOfPlace { input: &mut input, output: &mut output },
                    scratch.as_mut(),
                )
                .unwrap();
            gather(&output, t.precision(), &t.output_layout(), t.batch())
        }
    };
    (got, expected)
}

#[test]
fn test_host_engine_complex_in_place() {
    let mut r = RequestedTransform::new(vec![16], TransformKind::ComplexForward);
    r.batch = 3;
    r.precision = Precision::Double;
    let (got, expected) = run_once(&r);
    assert_complex_approx(&got, &expected, EPSILON, "complex in-place");
}

#[test]
fn test_host_engine_real_forward_in_place_2d() {
    let mut r = RequestedTransform::new(vec![4, 8], TransformKind::RealForward);
    r.batch = 2;
    r.precision = Precision::Double;
    let (got, expected) = run_once(&r);
    assert_eq!(got.len(), 2 * 4 * 5);
    assert_complex_approx(&got, &expected, EPSILON, "real forward in-place");
}

#[test]
fn test_host_engine_real_inverse_in_place() {
    let mut r = RequestedTransform::new(vec![10], TransformKind::RealInverse);
    r.precision = Precision::Double;
    let (got, expected) = run_once(&r);
    assert_eq!(got.len(), 10);
    assert_complex_approx(&got, &expected, EPSILON, "real inverse in-place");
}

#[test]
fn test_host_engine_strided_planar_out_of_place() {
    let mut r = RequestedTransform::new(vec![4, 4], TransformKind::ComplexInverse);
    r.placement = Placement::OutOfPlace;
    r.precision = Precision::Double;
    r.input_kind = Some(ArrayKind::Planar);
    r.input_strides = vec![1, 5];
    r.input_distance = 21;
    r.input_offsets = vec![2, 7];
    r.batch = 2;
    let (got, expected) = run_once(&r);
    assert_complex_approx(&got, &expected, EPSILON, "strided planar");
}

#[test]
fn test_host_engine_rejects_short_buffers() {
    let t = resolve(&RequestedTransform::new(vec![8], TransformKind::ComplexForward)).unwrap();
    let engine = HostEngine::setup(0).unwrap();
    let plan = engine.create_plan(&PlanDescription::from_resolved(&t)).unwrap();
    let mut scratch = engine.device().allocate(engine.scratch_bytes(&plan)).unwrap();
    let mut short = vec![vec![0u8; 16]];
    assert!(engine
        .execute(&plan, ExecBuffers::InPlace(&mut short), Some(&mut scratch))
        .is_err());
    let mut enough = allocate_host(&t, true).unwrap();
    assert!(engine.execute(&plan, ExecBuffers::InPlace(&mut enough), None).is_err());
}

#[test]
fn test_host_device_copies() {
    let engine = HostEngine::setup(0).unwrap();
    let device = engine.device();
    let mut buffer = device.allocate(8).unwrap();
    device.copy_to_device(&mut buffer, &[1, 2, 3]).unwrap();
    let mut back = [0u8; 4];
    device.copy_to_host(&buffer, &mut back).unwrap();
    assert_eq!(back, [1, 2, 3, 0]);
    assert!(device.copy_to_device(&mut buffer, &[0; 9]).is_err());
}

// ── Full driver on the host engine ────────────────────────────────────────────

#[test]
fn test_driver_verifies_every_kind_and_placement() {
    let engine = HostEngine::setup(0).unwrap();
    for kind in TransformKind::ALL {
        for placement in [Placement::InPlace, Placement::OutOfPlace] {
            let mut r = RequestedTransform::new(vec![6, 16], kind);
            r.placement = placement;
            r.batch = 2;
            let options = BenchmarkOptions { ntrial: 2, ..Default::default() };
            let timed = Resolved::new(&r, 1)
                .unwrap()
                .plan(&engine, options)
                .unwrap()
                .warm_up()
                .unwrap()
                .time()
                .unwrap();
            let cmp = timed.verify().unwrap();
            let t = timed.finish().transform;
            assert!(
                cmp.passes(&Tolerance::new(t.precision(), t.total_elements())),
                "{kind} {placement}: {cmp}"
            );
        }
    }
}

/// Scatter into the in-place real layout and check the padding stays zero.
#[test]
fn test_real_in_place_padding_is_not_data() {
    let t = resolve(&RequestedTransform::new(vec![6], TransformKind::RealForward)).unwrap();
    let side = t.input_layout();
    let mut buffers = allocate_host(&t, true).unwrap();
    let data: Vec<Complex<f64>> = (1..=6).map(|i| Complex::new(i as f64, 0.0)).collect();
    scatter(&mut buffers, Precision::Single, &side, 1, &data);
    // Innermost axis padded to 2 * (6 / 2 + 1) = 8 reals.
    assert_eq!(buffers[0].len(), 8 * 4);
    assert!(buffers[0][24..].iter().all(|&b| b == 0));
}
