use buffer::{Channel, EntityKind, FloatMatrix, Matrix};
use codec::{flatten, parse, CommandBuilder, EntityId, ErrorKind, Frame, UpdateTracker};

const FRAMES: usize = 60;

fn jelly_id() -> EntityId {
    EntityId::new("jelly_base").unwrap()
}

/// Identity rows offset by one unit per row, then nudged per frame.
fn jelly_positions(frame: usize) -> FloatMatrix {
    let t = frame as f32;
    let rows: Vec<[f32; 3]> = (0..3)
        .map(|row| {
            let r = row as f32;
            let mut values = [r, r, r];
            values[row] += 1.0;
            values[0] += 0.013 * t * (r + 1.0);
            values[1] += (0.2 * t + r).sin() * 0.05;
            values[2] -= 0.007 * t;
            values
        })
        .collect();
    Matrix::from_rows(&rows)
}

fn jelly_tracker() -> UpdateTracker {
    let mut tracker = UpdateTracker::new();
    tracker
        .record(
            CommandBuilder::create(jelly_id(), EntityKind::Mesh)
                .positions(jelly_positions(0))
                .build()
                .unwrap(),
        )
        .unwrap();
    for frame in 1..FRAMES {
        tracker
            .record(
                CommandBuilder::update(jelly_id(), EntityKind::Mesh)
                    .positions(jelly_positions(frame))
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }
    tracker
}

fn replay(tracker: &UpdateTracker, id: &EntityId) -> Vec<Frame> {
    tracker.history(id).unwrap().replay().unwrap()
}

fn max_frame_error(a: &[Frame], b: &[Frame]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| x.max_abs_diff(y).unwrap())
        .fold(0.0, f32::max)
}

#[test]
fn jelly_base_quantizes_within_tolerance() {
    let mut tracker = jelly_tracker();
    let original = replay(&tracker, &jelly_id());
    assert_eq!(original.len(), FRAMES);

    let infos = tracker.quantize(0.01).unwrap();
    let info = &infos[&jelly_id()];
    assert!(info.quantized_size < info.original_size);
    assert!(info.within_tolerance());
    assert!(info.max_error <= 0.01);
    assert_eq!(tracker.measure()[&jelly_id()], info.quantized_size);

    let quantized = replay(&tracker, &jelly_id());
    assert!(max_frame_error(&original, &quantized) <= 0.01);
}

#[test]
fn quantized_history_survives_container() {
    let mut tracker = jelly_tracker();
    tracker.quantize(0.01).unwrap();

    let bytes = flatten(&tracker).unwrap();
    let parsed = parse(&bytes).unwrap();
    assert_eq!(parsed.measure(), tracker.measure());
    assert_eq!(replay(&parsed, &jelly_id()), replay(&tracker, &jelly_id()));
}

#[test]
fn requantizing_is_stable() {
    let mut tracker = jelly_tracker();
    tracker.quantize(0.01).unwrap();
    let once = tracker.total_size();
    let frames = replay(&tracker, &jelly_id());

    let infos = tracker.quantize(0.01).unwrap();
    assert_eq!(tracker.total_size(), once);
    assert_eq!(infos[&jelly_id()].max_error, 0.0);
    assert_eq!(replay(&tracker, &jelly_id()), frames);
}

#[test]
fn requantizing_tighter_keeps_size() {
    let mut tracker = jelly_tracker();
    tracker.quantize(0.05).unwrap();
    let once = tracker.total_size();
    let frames = replay(&tracker, &jelly_id());

    let infos = tracker.quantize(0.001).unwrap();
    let info = &infos[&jelly_id()];
    assert_eq!(tracker.total_size(), once);
    assert_eq!(info.original_size, info.quantized_size);
    assert_eq!(info.max_error, 0.0);
    assert_eq!(info.mean_error, 0.0);
    assert_eq!(replay(&tracker, &jelly_id()), frames);
}

#[test]
fn only_touched_channels_are_rewritten() {
    let id = EntityId::new("marbles_base").unwrap();
    let mut tracker = UpdateTracker::new();
    tracker
        .record(
            CommandBuilder::create(id.clone(), EntityKind::InstancedMesh)
                .positions(Matrix::from_rows(&[[0.0f32, 0.0, 0.0], [1.0, 1.0, 1.0]]))
                .colors(Matrix::from_rows(&[[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]]))
                .build()
                .unwrap(),
        )
        .unwrap();
    tracker
        .record(
            CommandBuilder::update(id.clone(), EntityKind::InstancedMesh)
                .positions(Matrix::from_rows(&[[0.5f32, 0.0, 0.0], [1.0, 1.5, 1.0]]))
                .build()
                .unwrap(),
        )
        .unwrap();

    tracker.quantize(0.01).unwrap();
    let history = tracker.history(&id).unwrap();
    let update = &history.commands()[1];
    assert!(update.channel(Channel::Positions).is_some());
    assert!(update.channel(Channel::Colors).is_none());

    let last = history.replay_final().unwrap();
    let colors = last.get(Channel::Colors).unwrap();
    assert!((colors.get(1, 1).unwrap() - 1.0).abs() <= 0.01);
}

#[test]
fn failed_quantize_leaves_tracker_unchanged() {
    let mut tracker = jelly_tracker();
    let before = tracker.measure();
    let err = tracker.quantize(-1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(tracker.measure(), before);
}
