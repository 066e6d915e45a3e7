//! Quantization engine: rewrites a history's float buffers as fixed-point deltas.
//!
//! For each channel of an entity, independently:
//!
//! 1. Replay the history and collect the reconstructed absolute buffer at
//!    every frame where the channel is present.
//! 2. Resolve the [`Tolerance`] against the channel's whole-history value range.
//! 3. Choose a step. The search starts at the analytic bound `2 * tolerance`
//!    (rounding error is at most `step / 2`). If the measured error at that
//!    step is within tolerance, the step doubles while it stays within
//!    tolerance; otherwise it halves until it is. Each candidate is measured
//!    against every frame, and at most [`MAX_STEP_EVALUATIONS`] candidates are
//!    measured. A floor step keeps every quantized value below `2^30` so values
//!    and deltas fit in `i32`. If no candidate meets the tolerance, the
//!    smallest step tried is used and the achieved error is reported.
//! 4. Re-emit the history: the first command touching the channel carries the
//!    quantized absolute values, and each later command touching it carries
//!    `q[n] - q[n-1]`. Deltas of quantized values keep reconstruction error at
//!    one rounding regardless of history length.
//!
//! A channel already quantized at a single step keeps its step and origin when
//! they reproduce the replayed values within tolerance, so quantizing twice
//! yields the same commands.

use buffer::{Channel, FloatMatrix, IntMatrix, Matrix};
use tracing::{debug, warn};

use crate::command::{ChannelData, ChannelSet, Command};
use crate::error::{CodecError, CodecResult, ToleranceReason};
use crate::history::{Frame, History};
use crate::types::EntityId;

/// Default tolerance as a fraction of a channel's value range.
pub const DEFAULT_RELATIVE_TOLERANCE: f32 = 0.005;

/// Upper bound on error measurements per channel.
pub const MAX_STEP_EVALUATIONS: u32 = 32;

/// Largest quantized magnitude the floor step permits.
const MAX_QUANTIZED_MAGNITUDE: f64 = (1u32 << 30) as f64;

/// Maximum reconstruction error allowed per element.
///
/// `relative` is a fraction of a channel's whole-history value range
/// (`max - min` over every element). When both are set the smaller resulting
/// absolute tolerance applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub relative: Option<f32>,
    pub absolute: Option<f32>,
}

impl Tolerance {
    #[must_use]
    pub const fn new(relative: Option<f32>, absolute: Option<f32>) -> Self {
        Self { relative, absolute }
    }

    #[must_use]
    pub const fn absolute(value: f32) -> Self {
        Self::new(None, Some(value))
    }

    #[must_use]
    pub const fn relative(value: f32) -> Self {
        Self::new(Some(value), None)
    }

    /// Checks that at least one bound is set and every set bound is positive.
    pub fn validate(&self) -> CodecResult<()> {
        if let Some(value) = self.relative {
            if !(value.is_finite() && value > 0.0) {
                return Err(CodecError::InvalidTolerance {
                    reason: ToleranceReason::Relative(value),
                });
            }
        }
        if let Some(value) = self.absolute {
            if !(value.is_finite() && value > 0.0) {
                return Err(CodecError::InvalidTolerance {
                    reason: ToleranceReason::Absolute(value),
                });
            }
        }
        if self.relative.is_none() && self.absolute.is_none() {
            return Err(CodecError::InvalidTolerance {
                reason: ToleranceReason::Missing,
            });
        }
        Ok(())
    }

    /// Absolute tolerance for a channel whose values span `range`.
    ///
    /// The result is clamped to `f32::MAX`.
    pub fn resolve(&self, range: f64) -> CodecResult<f32> {
        self.validate()?;
        let relative = self
            .relative
            .map(|fraction| (f64::from(fraction) * range).min(f64::from(f32::MAX)) as f32);
        match (relative, self.absolute) {
            (Some(r), Some(a)) => Ok(r.min(a)),
            (Some(r), None) => Ok(r),
            (None, Some(a)) => Ok(a),
            (None, None) => Err(CodecError::InvalidTolerance {
                reason: ToleranceReason::Missing,
            }),
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::relative(DEFAULT_RELATIVE_TOLERANCE)
    }
}

/// Options for [`crate::UpdateTracker::quantize_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantizeOptions {
    pub tolerance: Tolerance,
    /// Quantize only this entity.
    pub entity: Option<EntityId>,
}

impl QuantizeOptions {
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            entity: None,
        }
    }

    #[must_use]
    pub fn only(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Step chosen for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelQuantization {
    pub channel: Channel,
    pub step: f32,
    /// Resolved absolute tolerance.
    pub tolerance: f32,
    /// Largest reconstruction error over every frame.
    pub max_error: f32,
    /// Mean absolute reconstruction error over every element of every frame.
    pub mean_error: f32,
    /// Error measurements performed.
    pub evaluations: u32,
    pub within_tolerance: bool,
}

/// Per-entity quantization result.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationInfo {
    pub entity_id: EntityId,
    /// Smallest step over all channels.
    pub granularity: f32,
    /// Logical size before quantization.
    pub original_size: usize,
    /// Logical size after quantization.
    pub quantized_size: usize,
    /// Largest reconstruction error over all channels.
    pub max_error: f32,
    /// Mean absolute reconstruction error, weighted by element count.
    pub mean_error: f32,
    pub channels: Vec<ChannelQuantization>,
}

impl QuantizationInfo {
    /// `quantized_size / original_size`.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 1.0;
        }
        self.quantized_size as f64 / self.original_size as f64
    }

    #[must_use]
    pub fn within_tolerance(&self) -> bool {
        self.channels.iter().all(|c| c.within_tolerance)
    }
}

/// Quantizes one history.
///
/// Returns `None` for histories without channel data; they have nothing to shrink.
pub fn quantize_history(
    history: &History,
    tolerance: &Tolerance,
) -> CodecResult<Option<(History, QuantizationInfo)>> {
    tolerance.validate()?;
    if !history.has_channel_data() {
        return Ok(None);
    }

    let frames = history.replay()?;
    let mut plans: [Option<ChannelPlan>; Channel::COUNT] = Default::default();
    let mut channels = Vec::new();
    let mut error_sum = 0.0f64;
    let mut elements = 0usize;
    for channel in Channel::ALL {
        let Some(track) = Track::collect(&frames, channel) else {
            continue;
        };
        let plan = plan_channel(history, &track, tolerance)?;
        if !plan.report.within_tolerance {
            warn!(
                entity = %history.entity_id(),
                channel = channel.name(),
                step = plan.step,
                max_error = plan.report.max_error,
                tolerance = plan.report.tolerance,
                "no step within tolerance; using smallest step tried"
            );
        }
        error_sum += plan.error_sum;
        elements += plan.elements;
        channels.push(plan.report.clone());
        plans[channel.index()] = Some(plan);
    }

    let quantized = reemit(history, &frames, &plans)?;
    let info = QuantizationInfo {
        entity_id: history.entity_id().clone(),
        granularity: channels
            .iter()
            .map(|c| c.step)
            .fold(f32::INFINITY, f32::min),
        original_size: history.logical_size(),
        quantized_size: quantized.logical_size(),
        max_error: channels.iter().map(|c| c.max_error).fold(0.0, f32::max),
        mean_error: mean(error_sum, elements),
        channels,
    };
    debug!(
        entity = %info.entity_id,
        granularity = info.granularity,
        original_size = info.original_size,
        quantized_size = info.quantized_size,
        max_error = info.max_error,
        mean_error = info.mean_error,
        "quantized history"
    );
    Ok(Some((quantized, info)))
}

/// Frames where one channel is present. Presence persists once a channel appears.
struct Track<'a> {
    channel: Channel,
    values: Vec<&'a FloatMatrix>,
}

impl<'a> Track<'a> {
    fn collect(frames: &'a [Frame], channel: Channel) -> Option<Self> {
        let values: Vec<_> = frames.iter().filter_map(|f| f.get(channel)).collect();
        if values.is_empty() {
            None
        } else {
            Some(Self { channel, values })
        }
    }

    /// Per-column minimum, widest column span, and global value range.
    ///
    /// Spans are taken in `f64`; the difference of two finite `f32` values can
    /// exceed `f32::MAX`.
    fn bounds(&self) -> (Vec<f32>, f64, f64) {
        let cols = self.channel.width();
        let mut lo = vec![f32::INFINITY; cols];
        let mut hi = vec![f32::NEG_INFINITY; cols];
        for matrix in &self.values {
            for row in matrix.iter_rows() {
                for (col, &v) in row.iter().enumerate() {
                    lo[col] = lo[col].min(v);
                    hi[col] = hi[col].max(v);
                }
            }
        }
        // Zero-row buffers leave the bounds empty.
        for (min, max) in lo.iter_mut().zip(hi.iter_mut()) {
            if *min > *max {
                *min = 0.0;
                *max = 0.0;
            }
        }
        let span = lo
            .iter()
            .zip(&hi)
            .map(|(min, max)| f64::from(*max) - f64::from(*min))
            .fold(0.0f64, f64::max);
        let global_min = lo.iter().copied().fold(f32::INFINITY, f32::min);
        let global_max = hi.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let range = if global_min > global_max {
            0.0
        } else {
            f64::from(global_max) - f64::from(global_min)
        };
        (lo, span, range)
    }

    fn max_error(&self, step: f32, origin: &[f32]) -> CodecResult<f32> {
        let mut max = 0.0f32;
        for matrix in &self.values {
            max = max.max(buffer::reconstruction_error(matrix, step, origin)?);
        }
        Ok(max)
    }

    /// Sum of absolute reconstruction errors and the number of elements summed.
    fn error_sum(&self, step: f32, origin: &[f32]) -> CodecResult<(f64, usize)> {
        let mut sum = 0.0f64;
        let mut count = 0;
        for matrix in &self.values {
            let q = buffer::quantize_with_origin(matrix, step, origin)?;
            let restored = buffer::dequantize(&q, step, origin)?;
            sum += matrix
                .as_slice()
                .iter()
                .zip(restored.as_slice())
                .map(|(&a, &b)| (f64::from(a) - f64::from(b)).abs())
                .sum::<f64>();
            count += matrix.len();
        }
        Ok((sum, count))
    }
}

fn mean(sum: f64, count: usize) -> f32 {
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

struct ChannelPlan {
    step: f32,
    origin: Vec<f32>,
    error_sum: f64,
    elements: usize,
    report: ChannelQuantization,
}

fn plan_channel(
    history: &History,
    track: &Track<'_>,
    tolerance: &Tolerance,
) -> CodecResult<ChannelPlan> {
    let (column_min, span, range) = track.bounds();
    let tolerance = tolerance.resolve(range)?;

    if let Some((step, origin)) = existing_quantization(history, track.channel) {
        if let Ok(error) = track.max_error(step, &origin) {
            if error <= tolerance {
                let search = StepSearch {
                    step,
                    error,
                    evaluations: 1,
                    within_tolerance: true,
                };
                return finish_plan(track, origin, tolerance, search);
            }
        }
    }

    let search = search_step(track, &column_min, span, tolerance)?;
    finish_plan(track, column_min, tolerance, search)
}

fn finish_plan(
    track: &Track<'_>,
    origin: Vec<f32>,
    tolerance: f32,
    search: StepSearch,
) -> CodecResult<ChannelPlan> {
    let (error_sum, elements) = track.error_sum(search.step, &origin)?;
    Ok(ChannelPlan {
        step: search.step,
        origin,
        error_sum,
        elements,
        report: ChannelQuantization {
            channel: track.channel,
            step: search.step,
            tolerance,
            max_error: search.error,
            mean_error: mean(error_sum, elements),
            evaluations: search.evaluations,
            within_tolerance: search.within_tolerance,
        },
    })
}

/// Step and origin when every command touching `channel` is already quantized
/// at one step: an absolute first, deltas after.
fn existing_quantization(history: &History, channel: Channel) -> Option<(f32, Vec<f32>)> {
    let mut touching = history
        .commands()
        .iter()
        .filter_map(|command| command.channel(channel));
    let (step, origin) = match touching.next()? {
        ChannelData::QuantizedAbsolute { step, origin, .. } => (*step, origin.clone()),
        _ => return None,
    };
    let uniform = touching.all(|data| {
        matches!(data, ChannelData::QuantizedDelta { step: s, .. } if s.to_bits() == step.to_bits())
    });
    uniform.then_some((step, origin))
}

struct StepSearch {
    step: f32,
    error: f32,
    evaluations: u32,
    within_tolerance: bool,
}

fn floor_step(span: f64) -> f32 {
    (span / MAX_QUANTIZED_MAGNITUDE) as f32
}

fn search_step(
    track: &Track<'_>,
    origin: &[f32],
    span: f64,
    tolerance: f32,
) -> CodecResult<StepSearch> {
    let floor = floor_step(span);
    // Candidates stay finite even when the tolerance is near `f32::MAX`.
    let start = (2.0 * f64::from(tolerance)).min(f64::from(f32::MAX)) as f32;
    let mut step = start.max(floor);
    if !step.is_normal() {
        // Constant channels under a zero tolerance: any step is exact.
        step = floor.max(1.0);
    }
    // Past twice the span every value rounds to the origin.
    let ceiling = 2.0 * span;

    let mut evaluations = 1;
    let mut error = track.max_error(step, origin)?;

    if error <= tolerance {
        while evaluations < MAX_STEP_EVALUATIONS && f64::from(step) <= ceiling {
            let next = step * 2.0;
            if !next.is_finite() {
                break;
            }
            let next_error = track.max_error(next, origin)?;
            evaluations += 1;
            if next_error > tolerance {
                break;
            }
            step = next;
            error = next_error;
        }
        return Ok(StepSearch {
            step,
            error,
            evaluations,
            within_tolerance: true,
        });
    }

    while evaluations < MAX_STEP_EVALUATIONS {
        let next = step / 2.0;
        if next < floor || !next.is_normal() {
            break;
        }
        step = next;
        error = track.max_error(step, origin)?;
        evaluations += 1;
        if error <= tolerance {
            return Ok(StepSearch {
                step,
                error,
                evaluations,
                within_tolerance: true,
            });
        }
    }

    Ok(StepSearch {
        step,
        error,
        evaluations,
        within_tolerance: false,
    })
}

fn reemit(
    history: &History,
    frames: &[Frame],
    plans: &[Option<ChannelPlan>; Channel::COUNT],
) -> CodecResult<History> {
    let mut previous: [Option<IntMatrix>; Channel::COUNT] = Default::default();
    let mut commands = Vec::with_capacity(history.len());

    for (command, frame) in history.commands().iter().zip(frames) {
        let mut channels = ChannelSet::new();
        for (channel, _) in command.channels().iter() {
            let (Some(plan), Some(values)) = (&plans[channel.index()], frame.get(channel)) else {
                continue;
            };
            let q = buffer::quantize_with_origin(values, plan.step, &plan.origin)?;
            let data = match &previous[channel.index()] {
                None => ChannelData::QuantizedAbsolute {
                    step: plan.step,
                    origin: plan.origin.clone(),
                    values: q.clone(),
                },
                Some(prev) => ChannelData::QuantizedDelta {
                    step: plan.step,
                    values: subtract(&q, prev).ok_or_else(|| CodecError::QuantizedOverflow {
                        entity_id: history.entity_id().to_string(),
                        channel,
                    })?,
                },
            };
            previous[channel.index()] = Some(q);
            channels.insert(channel, data);
        }
        commands.push(Command::build(
            command.entity_id().clone(),
            command.kind(),
            command.entity_kind(),
            channels,
        )?);
    }

    History::from_commands(commands)
}

fn subtract(current: &IntMatrix, previous: &IntMatrix) -> Option<IntMatrix> {
    if current.shape() != previous.shape() {
        return None;
    }
    let data = current
        .as_slice()
        .iter()
        .zip(previous.as_slice())
        .map(|(&q, &p)| q.checked_sub(p))
        .collect::<Option<Vec<_>>>()?;
    Matrix::new(current.rows(), current.cols(), data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;
    use crate::error::ErrorKind;
    use buffer::EntityKind;

    fn id(name: &str) -> EntityId {
        EntityId::new(name).unwrap()
    }

    fn wave(frame: usize) -> FloatMatrix {
        let t = frame as f32 * 0.1;
        let data: Vec<f32> = (0..8)
            .flat_map(|v| {
                let x = v as f32 * 0.25;
                [x, (x + t).sin() * 0.5, 0.0]
            })
            .collect();
        Matrix::new(8, 3, data).unwrap()
    }

    fn wave_history(frames: usize) -> History {
        let mut commands = vec![CommandBuilder::create(id("jelly_base"), EntityKind::Mesh)
            .positions(wave(0))
            .build()
            .unwrap()];
        for n in 1..frames {
            commands.push(
                CommandBuilder::update(id("jelly_base"), EntityKind::Mesh)
                    .positions(wave(n))
                    .build()
                    .unwrap(),
            );
        }
        History::from_commands(commands).unwrap()
    }

    #[test]
    fn tolerance_resolution() {
        assert_eq!(Tolerance::absolute(0.1).resolve(100.0).unwrap(), 0.1);
        assert_eq!(Tolerance::relative(0.25).resolve(8.0).unwrap(), 2.0);
        let both = Tolerance::new(Some(0.25), Some(0.5));
        assert_eq!(both.resolve(8.0).unwrap(), 0.5);
        assert_eq!(both.resolve(1.0).unwrap(), 0.25);
        let wide = Tolerance::relative(2.0).resolve(f64::from(f32::MAX) * 2.0);
        assert_eq!(wide.unwrap(), f32::MAX);
        assert_eq!(
            Tolerance::default().relative,
            Some(DEFAULT_RELATIVE_TOLERANCE)
        );
    }

    #[test]
    fn tolerance_validation() {
        for bad in [
            Tolerance::new(None, None),
            Tolerance::absolute(0.0),
            Tolerance::absolute(f32::NAN),
            Tolerance::relative(-0.1),
        ] {
            let err = bad.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn quantized_history_stays_within_tolerance() {
        let history = wave_history(20);
        let (quantized, info) = quantize_history(&history, &Tolerance::absolute(0.01))
            .unwrap()
            .unwrap();
        assert!(info.within_tolerance());
        assert!(info.max_error <= 0.01);
        assert!(info.mean_error >= 0.0);
        assert!(info.mean_error <= info.max_error);
        for channel in &info.channels {
            assert!(channel.mean_error <= channel.max_error);
        }
        assert!(info.quantized_size < info.original_size);
        assert_eq!(info.original_size, history.logical_size());
        assert_eq!(info.quantized_size, quantized.logical_size());

        let before = history.replay().unwrap();
        let after = quantized.replay().unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert!(a.max_abs_diff(b).unwrap() <= 0.01);
        }
    }

    #[test]
    fn reemitted_commands_are_absolute_then_deltas() {
        let history = wave_history(3);
        let (quantized, info) = quantize_history(&history, &Tolerance::absolute(0.01))
            .unwrap()
            .unwrap();
        let commands = quantized.commands();
        assert!(matches!(
            commands[0].channel(Channel::Positions),
            Some(ChannelData::QuantizedAbsolute { .. })
        ));
        for command in &commands[1..] {
            assert!(matches!(
                command.channel(Channel::Positions),
                Some(ChannelData::QuantizedDelta { .. })
            ));
        }
        assert_eq!(info.granularity, info.channels[0].step);
    }

    #[test]
    fn step_search_doubles_to_largest_passing_step() {
        // Values on a 0.25 grid: steps 1/16, 1/8 and 1/4 are exact, 1/2 is not.
        let grid = Matrix::from_rows(&[[0.0f32, 0.25, 0.5], [0.75, 1.0, 0.25]]);
        let history = History::new(
            CommandBuilder::create(id("grid"), EntityKind::Mesh)
                .positions(grid)
                .build()
                .unwrap(),
        )
        .unwrap();
        let (_, info) = quantize_history(&history, &Tolerance::absolute(1.0 / 32.0))
            .unwrap()
            .unwrap();
        let channel = &info.channels[0];
        assert_eq!(channel.step, 0.25);
        assert_eq!(channel.max_error, 0.0);
        assert_eq!(channel.mean_error, 0.0);
        assert_eq!(channel.evaluations, 4);
        assert!(channel.within_tolerance);
    }

    #[test]
    fn single_command_history_is_quantized() {
        let history = wave_history(1);
        let (quantized, _) = quantize_history(&history, &Tolerance::default())
            .unwrap()
            .unwrap();
        assert_eq!(quantized.len(), 1);
        assert!(quantized.commands()[0]
            .channel(Channel::Positions)
            .is_some_and(ChannelData::is_quantized));
    }

    #[test]
    fn constant_channel_collapses_to_zero_deltas() {
        let still = Matrix::from_rows(&[[1.0f32], [1.0]]);
        let mut commands = vec![CommandBuilder::create(id("layers"), EntityKind::Frame)
            .opacity(still.clone())
            .build()
            .unwrap()];
        for _ in 0..4 {
            commands.push(
                CommandBuilder::update(id("layers"), EntityKind::Frame)
                    .opacity(still.clone())
                    .build()
                    .unwrap(),
            );
        }
        let history = History::from_commands(commands).unwrap();
        let (quantized, info) = quantize_history(&history, &Tolerance::default())
            .unwrap()
            .unwrap();
        assert_eq!(info.max_error, 0.0);
        assert_eq!(info.channels[0].evaluations, 1);
        for command in &quantized.commands()[1..] {
            match command.channel(Channel::Opacity) {
                Some(ChannelData::QuantizedDelta { values, .. }) => {
                    assert!(values.as_slice().iter().all(|&d| d == 0));
                }
                other => panic!("unexpected channel data {other:?}"),
            }
        }
    }

    #[test]
    fn untouched_channels_stay_untouched() {
        let colors = Matrix::from_rows(&[[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let positions = Matrix::from_rows(&[[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let history = History::from_commands([
            CommandBuilder::create(id("marbles"), EntityKind::InstancedMesh)
                .positions(positions.clone())
                .colors(colors)
                .build()
                .unwrap(),
            CommandBuilder::update(id("marbles"), EntityKind::InstancedMesh)
                .positions(positions)
                .build()
                .unwrap(),
        ])
        .unwrap();
        let (quantized, info) = quantize_history(&history, &Tolerance::absolute(0.001))
            .unwrap()
            .unwrap();
        assert_eq!(info.channels.len(), 2);
        assert!(quantized.commands()[1].channel(Channel::Colors).is_none());
    }

    #[test]
    fn requantizing_is_idempotent() {
        let history = wave_history(12);
        let tolerance = Tolerance::absolute(0.005);
        let (once, _) = quantize_history(&history, &tolerance).unwrap().unwrap();
        let (twice, info) = quantize_history(&once, &tolerance).unwrap().unwrap();
        assert_eq!(once, twice);
        assert_eq!(info.max_error, 0.0);
        assert_eq!(info.original_size, info.quantized_size);
    }

    #[test]
    fn history_without_channels_is_skipped() {
        let history = History::new(
            CommandBuilder::create(id("empty"), EntityKind::Frame)
                .build()
                .unwrap(),
        )
        .unwrap();
        assert!(quantize_history(&history, &Tolerance::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn floor_step_bounds_quantized_values() {
        // A tiny tolerance over a huge range forces the floor step.
        let wide = Matrix::from_rows(&[[-1.0e9f32], [1.0e9]]);
        let history = History::new(
            CommandBuilder::create(id("wide"), EntityKind::Frame)
                .opacity(wide)
                .build()
                .unwrap(),
        )
        .unwrap();
        let (quantized, info) = quantize_history(&history, &Tolerance::absolute(1.0e-6))
            .unwrap()
            .unwrap();
        let channel = &info.channels[0];
        assert!(!channel.within_tolerance);
        assert!(channel.step >= floor_step(2.0e9));
        assert!(quantized.replay_final().is_ok());
    }

    fn extreme_history() -> History {
        let extreme = Matrix::from_rows(&[[-3.0e38f32], [3.0e38]]);
        History::new(
            CommandBuilder::create(id("extreme"), EntityKind::Frame)
                .opacity(extreme)
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn values_near_f32_max_fall_back_to_smallest_step() {
        let history = extreme_history();
        let (quantized, info) = quantize_history(&history, &Tolerance::absolute(0.01))
            .unwrap()
            .unwrap();
        let channel = &info.channels[0];
        assert!(!channel.within_tolerance);
        assert!(!info.within_tolerance());
        assert!(channel.step.is_finite());
        assert!(channel.max_error.is_finite());
        assert!(info.mean_error.is_finite());
        assert!(quantized.replay_final().is_ok());
    }

    #[test]
    fn values_near_f32_max_under_relative_tolerance() {
        let history = extreme_history();
        let (quantized, info) = quantize_history(&history, &Tolerance::default())
            .unwrap()
            .unwrap();
        let channel = &info.channels[0];
        assert!(channel.tolerance.is_finite());
        assert!(channel.step.is_finite());
        assert!(channel.within_tolerance);
        assert!(channel.max_error <= channel.tolerance);
        assert!(quantized.replay_final().is_ok());
    }
}
