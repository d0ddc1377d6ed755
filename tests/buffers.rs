use fft_rider::buffers::{
    allocate_host, buffer_sizes, format_buffer, gather, linear_offsets, scatter, synthesize_input,
};
use fft_rider::layout::resolve;
use fft_rider::{ArrayKind, Placement, Precision, RequestedTransform, SideLayout, TransformKind};
use num_complex::Complex;

mod common;
use common::{assert_complex_approx, EPSILON, EPSILON_F32};

fn resolved(r: RequestedTransform) -> fft_rider::ResolvedTransform {
    resolve(&r).unwrap()
}

// ── Sizes ─────────────────────────────────────────────────────────────────────

#[test]
fn test_buffer_sizes_interleaved_single() {
    let t = resolved(RequestedTransform::new(vec![16], TransformKind::ComplexForward));
    assert_eq!(buffer_sizes(&t, true).unwrap(), vec![16 * 8]);
    assert_eq!(buffer_sizes(&t, false).unwrap(), vec![16 * 8]);
}

#[test]
fn test_buffer_sizes_planar_double() {
    let mut r = RequestedTransform::new(vec![16], TransformKind::ComplexForward);
    r.precision = Precision::Double;
    r.placement = Placement::OutOfPlace;
    r.output_kind = Some(ArrayKind::Planar);
    let t = resolved(r);
    assert_eq!(buffer_sizes(&t, true).unwrap(), vec![16 * 16]);
    assert_eq!(buffer_sizes(&t, false).unwrap(), vec![16 * 8, 16 * 8]);
}

/// In-place real forward: the padded real side and the hermitian side occupy
/// the same number of bytes.
#[test]
fn test_buffer_sizes_real_in_place_match() {
    let t = resolved(RequestedTransform::new(vec![8], TransformKind::RealForward));
    assert_eq!(buffer_sizes(&t, true).unwrap(), vec![40]);
    assert_eq!(buffer_sizes(&t, false).unwrap(), vec![40]);
}

#[test]
fn test_allocate_host_zero_filled() {
    let t = resolved(RequestedTransform::new(vec![4, 4], TransformKind::ComplexInverse));
    let buffers = allocate_host(&t, true).unwrap();
    assert_eq!(buffers.len(), 1);
    assert!(buffers[0].iter().all(|&b| b == 0));
}

// ── Element access ────────────────────────────────────────────────────────────

#[test]
fn test_linear_offsets_row_major() {
    assert_eq!(linear_offsets(&[2, 3], &[10, 1]), vec![0, 1, 2, 10, 11, 12]);
    assert_eq!(linear_offsets(&[3], &[2]), vec![0, 2, 4]);
}

#[test]
fn test_scatter_gather_strided_planar_with_offsets() {
    let side = SideLayout {
        kind: ArrayKind::Planar,
        lengths: vec![2, 2],
        strides: vec![4, 2],
        distance: 9,
        offsets: vec![1, 3],
    };
    let batch = 2;
    let mut buffers = vec![vec![0u8; 8 * 20], vec![0u8; 8 * 20]];
    let data: Vec<Complex<f64>> =
        (0..8).map(|i| Complex::new(i as f64, -(i as f64) * 0.5)).collect();

    scatter(&mut buffers, Precision::Double, &side, batch, &data);
    let back = gather(&buffers, Precision::Double, &side, batch);
    assert_complex_approx(&back, &data, EPSILON, "planar round trip");

    // Batch 1, element (1, 1): real at 1 + 9 + 4 + 2, imaginary at 3 + 9 + 4 + 2.
    let re = f64::from_ne_bytes(buffers[0][16 * 8..17 * 8].try_into().unwrap());
    let im = f64::from_ne_bytes(buffers[1][18 * 8..19 * 8].try_into().unwrap());
    assert_eq!(re, 7.0);
    assert_eq!(im, -3.5);
}

#[test]
fn test_scatter_leaves_padding_untouched() {
    let side = SideLayout {
        kind: ArrayKind::Real,
        lengths: vec![3],
        strides: vec![1],
        distance: 4,
        offsets: vec![0],
    };
    let mut buffers = vec![vec![0xffu8; 4 * 8]];
    let data: Vec<Complex<f64>> = (0..6).map(|i| Complex::new(i as f64, 0.0)).collect();
    scatter(&mut buffers, Precision::Single, &side, 2, &data);

    assert_eq!(&buffers[0][12..16], &[0xff; 4]);
    assert_eq!(&buffers[0][28..32], &[0xff; 4]);
    let back = gather(&buffers, Precision::Single, &side, 2);
    assert_complex_approx(&back, &data, EPSILON_F32, "real round trip");
}

// ── Synthetic input ───────────────────────────────────────────────────────────

#[test]
fn test_synthesize_input_is_reproducible() {
    let mut r = RequestedTransform::new(vec![32], TransformKind::ComplexForward);
    r.batch = 3;
    let t = resolved(r);
    assert_eq!(synthesize_input(&t).unwrap(), synthesize_input(&t).unwrap());
}

#[test]
fn test_synthesize_input_bounded_and_varied() {
    let mut r = RequestedTransform::new(vec![8, 8], TransformKind::ComplexForward);
    r.batch = 2;
    let t = resolved(r);
    let data = gather(&synthesize_input(&t).unwrap(), t.precision(), &t.input_layout(), t.batch());

    assert_eq!(data.len(), 128);
    assert!(data.iter().all(|v| v.re.abs() <= 0.5 && v.im.abs() <= 0.5));
    assert!(data.windows(2).all(|w| w[0] != w[1]));
    // Batch items differ from each other.
    assert_ne!(data[..64], data[64..]);
}

#[test]
fn test_synthesize_real_input_has_no_imaginary_part() {
    let mut r = RequestedTransform::new(vec![8], TransformKind::RealForward);
    r.placement = Placement::OutOfPlace;
    let t = resolved(r);
    let data = gather(&synthesize_input(&t).unwrap(), t.precision(), &t.input_layout(), 1);
    assert!(data.iter().all(|v| v.im == 0.0));
}

/// Hermitian input comes from a real signal, so its DC and Nyquist terms are real.
#[test]
fn test_synthesize_hermitian_input_is_symmetric() {
    let mut r = RequestedTransform::new(vec![8], TransformKind::RealInverse);
    r.placement = Placement::OutOfPlace;
    r.precision = Precision::Double;
    let t = resolved(r);
    let data = gather(&synthesize_input(&t).unwrap(), t.precision(), &t.input_layout(), 1);

    assert_eq!(data.len(), 5);
    assert!(data[0].im.abs() < EPSILON);
    assert!(data[4].im.abs() < EPSILON);
}

// ── Dumps ─────────────────────────────────────────────────────────────────────

#[test]
fn test_format_buffer_rows() {
    let mut r = RequestedTransform::new(vec![2, 3], TransformKind::RealForward);
    r.placement = Placement::OutOfPlace;
    r.batch = 2;
    let t = resolved(r);
    let text = format_buffer(&synthesize_input(&t).unwrap(), t.precision(), &t.input_layout(), t.batch());

    assert!(text.starts_with("batch 0:\n"));
    assert!(text.contains("batch 1:\n"));
    // Two batch headers plus two rows of three reals each.
    assert_eq!(text.lines().count(), 6);
    assert!(!text.contains('('));
}
