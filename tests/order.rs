use fft_rider::engine::PlanDescription;
use fft_rider::layout::resolve;
use fft_rider::order::{to_engine_order, EngineAxes};
use fft_rider::{Placement, RequestedTransform, TransformKind};
use proptest::prelude::*;

#[test]
fn test_engine_axes_reverse_lengths_and_strides() {
    let mut r = RequestedTransform::new(vec![2, 3, 4], TransformKind::ComplexForward);
    r.placement = Placement::OutOfPlace;
    r.output_strides = vec![1, 2, 6];
    r.output_distance = 24;
    let t = resolve(&r).unwrap();
    let axes = EngineAxes::of(&t);

    assert_eq!(axes.lengths, vec![4, 3, 2]);
    assert_eq!(axes.input_strides, vec![1, 4, 12]);
    assert_eq!(axes.output_strides, vec![6, 2, 1]);
    assert_eq!(axes.to_user_order().lengths, vec![2, 3, 4]);
}

/// Distances and offsets carry no axis order and reach the engine unchanged.
#[test]
fn test_plan_description_keeps_scalars() {
    let mut r = RequestedTransform::new(vec![4, 8], TransformKind::RealForward);
    r.batch = 3;
    let t = resolve(&r).unwrap();
    let d = PlanDescription::from_resolved(&t);

    assert_eq!(d.lengths, vec![8, 4]);
    assert_eq!(d.batch, 3);
    assert_eq!(d.layout.input_strides, vec![1, 10]);
    assert_eq!(d.layout.output_strides, vec![1, 5]);
    assert_eq!(d.layout.input_distance, t.input_distance());
    assert_eq!(d.layout.output_distance, t.output_distance());
    assert_eq!(d.layout.input_offsets, t.input_offsets());
    assert_eq!(d.user_lengths(), vec![4, 8]);
    assert_eq!(d.input_layout(), t.input_layout());
    assert_eq!(d.output_layout(), t.output_layout());
}

#[test]
fn test_engine_order_of_single_axis_is_identity() {
    assert_eq!(to_engine_order(&[17]), vec![17]);
    assert!(to_engine_order::<usize>(&[]).is_empty());
}

proptest! {
    #[test]
    fn prop_engine_order_is_an_involution(x in prop::collection::vec(any::<usize>(), 0..8)) {
        prop_assert_eq!(to_engine_order(&to_engine_order(&x)), x);
    }

    #[test]
    fn prop_engine_order_moves_last_axis_first(x in prop::collection::vec(any::<u32>(), 1..8)) {
        let reversed = to_engine_order(&x);
        prop_assert_eq!(reversed.first(), x.last());
        prop_assert_eq!(reversed.len(), x.len());
    }
}
