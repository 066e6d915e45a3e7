use buffer::{EntityKind, Matrix};
use codec::{flatten, parse, CommandBuilder, EntityId, UpdateTracker};
use proptest::prelude::*;

/// Opacity histories: 1..12 frames of `layers` values each.
fn history_strategy() -> impl Strategy<Value = Vec<Vec<f32>>> {
    (1usize..6).prop_flat_map(|layers| {
        prop::collection::vec(prop::collection::vec(-10.0f32..10.0, layers), 1..12)
    })
}

fn tracker_from(frames: &[Vec<f32>]) -> UpdateTracker {
    let id = EntityId::new("frame_layers").unwrap();
    let mut tracker = UpdateTracker::new();
    for (index, values) in frames.iter().enumerate() {
        let builder = if index == 0 {
            CommandBuilder::create(id.clone(), EntityKind::Frame)
        } else {
            CommandBuilder::update(id.clone(), EntityKind::Frame)
        };
        let opacity = Matrix::new(values.len(), 1, values.clone()).unwrap();
        tracker.record(builder.opacity(opacity).build().unwrap()).unwrap();
    }
    tracker
}

proptest! {
    #[test]
    fn prop_replay_error_within_tolerance(frames in history_strategy(), tolerance in 0.001f32..1.0) {
        let mut tracker = tracker_from(&frames);
        let id = EntityId::new("frame_layers").unwrap();
        let original = tracker.history(&id).unwrap().replay().unwrap();

        let infos = tracker.quantize(tolerance).unwrap();
        let info = &infos[&id];
        prop_assert!(info.within_tolerance());

        let quantized = tracker.history(&id).unwrap().replay().unwrap();
        prop_assert_eq!(quantized.len(), original.len());
        for (a, b) in original.iter().zip(&quantized) {
            let err = a.max_abs_diff(b).unwrap();
            prop_assert!(err <= tolerance + 1e-5, "error {} tolerance {}", err, tolerance);
        }
    }

    #[test]
    fn prop_requantize_does_not_grow(frames in history_strategy(), tolerance in 0.001f32..1.0) {
        let mut tracker = tracker_from(&frames);
        tracker.quantize(tolerance).unwrap();
        let once = tracker.total_size();
        tracker.quantize(tolerance).unwrap();
        prop_assert_eq!(tracker.total_size(), once);
    }

    #[test]
    fn prop_tightening_tolerance_keeps_size(
        frames in history_strategy(),
        tolerance in 0.001f32..1.0,
        factor in 0.01f32..=1.0,
    ) {
        let mut tracker = tracker_from(&frames);
        tracker.quantize(tolerance).unwrap();
        let once = tracker.total_size();
        let measured = tracker.measure();

        tracker.quantize(tolerance * factor).unwrap();
        prop_assert_eq!(tracker.total_size(), once);
        prop_assert_eq!(tracker.measure(), measured);
    }

    #[test]
    fn prop_container_preserves_measure(frames in history_strategy(), quantize in any::<bool>()) {
        let mut tracker = tracker_from(&frames);
        if quantize {
            tracker.quantize(0.01).unwrap();
        }
        let parsed = parse(&flatten(&tracker).unwrap()).unwrap();
        prop_assert_eq!(parsed.measure(), tracker.measure());
    }
}
