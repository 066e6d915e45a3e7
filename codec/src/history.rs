//! Per-entity command histories and replay.

use buffer::{Channel, EntityKind, FloatMatrix, IntMatrix, Matrix};

use crate::command::{ChannelData, Command};
use crate::error::{CodecError, CodecResult};
use crate::types::EntityId;

/// Reconstructed absolute buffers after replaying a prefix of a history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    slots: [Option<FloatMatrix>; Channel::COUNT],
}

impl Frame {
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&FloatMatrix> {
        self.slots[channel.index()].as_ref()
    }

    /// Present channels in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &FloatMatrix)> {
        Channel::ALL
            .into_iter()
            .zip(&self.slots)
            .filter_map(|(channel, slot)| slot.as_ref().map(|m| (channel, m)))
    }

    /// Largest elementwise difference across all channels.
    ///
    /// A channel present in only one frame counts as an infinite difference.
    pub fn max_abs_diff(&self, other: &Self) -> CodecResult<f32> {
        let mut max = 0.0f32;
        for (a, b) in self.slots.iter().zip(&other.slots) {
            match (a, b) {
                (Some(a), Some(b)) => max = max.max(a.max_abs_diff(b)?),
                (None, None) => {}
                _ => return Ok(f32::INFINITY),
            }
        }
        Ok(max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ChannelState {
    rows: usize,
    step: Option<f32>,
}

/// Ordered commands for one entity.
///
/// The first command is always a creation; every later command is an update
/// relative to the state reconstructed from everything before it. A channel
/// keeps its row count once present, and a quantized delta must follow a
/// quantized state with the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    commands: Vec<Command>,
    states: [Option<ChannelState>; Channel::COUNT],
}

impl History {
    /// Starts a history from its creation command.
    pub fn new(first: Command) -> CodecResult<Self> {
        if !first.is_create() {
            return Err(CodecError::UpdateBeforeCreate {
                entity_id: first.entity_id().to_string(),
            });
        }
        let mut history = Self {
            commands: Vec::new(),
            states: [None; Channel::COUNT],
        };
        history.states = history.next_states(&first)?;
        history.commands.push(first);
        Ok(history)
    }

    /// Builds a history from commands in temporal order.
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> CodecResult<Self> {
        let mut iter = commands.into_iter();
        let first = iter.next().ok_or(CodecError::EmptyHistory)?;
        let mut history = Self::new(first)?;
        for command in iter {
            history.push(command)?;
        }
        Ok(history)
    }

    /// Appends an update. The history is unchanged on error.
    pub fn push(&mut self, command: Command) -> CodecResult<()> {
        if command.entity_id() != self.entity_id() {
            return Err(CodecError::EntityMismatch {
                expected: self.entity_id().to_string(),
                found: command.entity_id().to_string(),
            });
        }
        if command.entity_kind() != self.entity_kind() {
            return Err(CodecError::EntityKindMismatch {
                entity_id: self.entity_id().to_string(),
                expected: self.entity_kind(),
                found: command.entity_kind(),
            });
        }
        if command.is_create() {
            return Err(CodecError::DuplicateCreate {
                entity_id: self.entity_id().to_string(),
                index: self.commands.len(),
            });
        }
        self.states = self.next_states(&command)?;
        self.commands.push(command);
        Ok(())
    }

    fn next_states(
        &self,
        command: &Command,
    ) -> CodecResult<[Option<ChannelState>; Channel::COUNT]> {
        let mut states = self.states;
        for (channel, data) in command.channels().iter() {
            let slot = &mut states[channel.index()];
            if let Some(state) = slot {
                if state.rows != data.rows() {
                    return Err(CodecError::ShapeChanged {
                        entity_id: command.entity_id().to_string(),
                        channel,
                        expected: state.rows,
                        actual: data.rows(),
                    });
                }
            }
            let step = match data {
                ChannelData::Absolute(_) => None,
                ChannelData::QuantizedAbsolute { step, .. } => Some(*step),
                ChannelData::QuantizedDelta { step, .. } => {
                    let base = (*slot).and_then(|state| state.step);
                    if base.map(f32::to_bits) != Some(step.to_bits()) {
                        return Err(CodecError::DeltaWithoutBase {
                            entity_id: command.entity_id().to_string(),
                            channel,
                        });
                    }
                    base
                }
            };
            *slot = Some(ChannelState {
                rows: data.rows(),
                step,
            });
        }
        Ok(states)
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        self.commands[0].entity_id()
    }

    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        self.commands[0].entity_kind()
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Always `false`; a history holds at least its creation command.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns `true` if any command carries channel data.
    #[must_use]
    pub fn has_channel_data(&self) -> bool {
        self.states.iter().any(Option::is_some)
    }

    /// Sum of every command's logical size.
    #[must_use]
    pub fn logical_size(&self) -> usize {
        self.commands.iter().map(Command::logical_size).sum()
    }

    /// Reconstructed state after each command, in order.
    pub fn replay(&self) -> CodecResult<Vec<Frame>> {
        let mut replayer = Replayer::new(self.entity_id());
        let mut frames = Vec::with_capacity(self.commands.len());
        for command in &self.commands {
            replayer.apply(command)?;
            frames.push(replayer.frame());
        }
        Ok(frames)
    }

    /// Reconstructed state after the last command.
    pub fn replay_final(&self) -> CodecResult<Frame> {
        let mut replayer = Replayer::new(self.entity_id());
        for command in &self.commands {
            replayer.apply(command)?;
        }
        Ok(replayer.frame())
    }
}

#[derive(Debug, Clone)]
struct QuantizedState {
    step: f32,
    origin: Vec<f32>,
    values: IntMatrix,
}

#[derive(Debug, Clone)]
struct ReplayChannel {
    values: FloatMatrix,
    quantized: Option<QuantizedState>,
}

struct Replayer<'a> {
    entity_id: &'a EntityId,
    channels: [Option<ReplayChannel>; Channel::COUNT],
}

impl<'a> Replayer<'a> {
    fn new(entity_id: &'a EntityId) -> Self {
        Self {
            entity_id,
            channels: Default::default(),
        }
    }

    fn apply(&mut self, command: &Command) -> CodecResult<()> {
        for (channel, data) in command.channels().iter() {
            let slot = &mut self.channels[channel.index()];
            let next = match data {
                ChannelData::Absolute(values) => ReplayChannel {
                    values: values.clone(),
                    quantized: None,
                },
                ChannelData::QuantizedAbsolute {
                    step,
                    origin,
                    values,
                } => ReplayChannel {
                    values: buffer::dequantize(values, *step, origin)?,
                    quantized: Some(QuantizedState {
                        step: *step,
                        origin: origin.clone(),
                        values: values.clone(),
                    }),
                },
                ChannelData::QuantizedDelta { step, values } => {
                    let base = slot
                        .as_ref()
                        .and_then(|state| state.quantized.as_ref())
                        .ok_or_else(|| CodecError::DeltaWithoutBase {
                            entity_id: self.entity_id.to_string(),
                            channel,
                        })?;
                    let summed = add_deltas(&base.values, values).ok_or_else(|| {
                        CodecError::QuantizedOverflow {
                            entity_id: self.entity_id.to_string(),
                            channel,
                        }
                    })?;
                    ReplayChannel {
                        values: buffer::dequantize(&summed, *step, &base.origin)?,
                        quantized: Some(QuantizedState {
                            step: *step,
                            origin: base.origin.clone(),
                            values: summed,
                        }),
                    }
                }
            };
            *slot = Some(next);
        }
        Ok(())
    }

    fn frame(&self) -> Frame {
        let mut frame = Frame::default();
        for (slot, channel) in frame.slots.iter_mut().zip(&self.channels) {
            *slot = channel.as_ref().map(|c| c.values.clone());
        }
        frame
    }
}

fn add_deltas(base: &IntMatrix, deltas: &IntMatrix) -> Option<IntMatrix> {
    if base.shape() != deltas.shape() {
        return None;
    }
    let data = base
        .as_slice()
        .iter()
        .zip(deltas.as_slice())
        .map(|(&q, &d)| q.checked_add(d))
        .collect::<Option<Vec<_>>>()?;
    Matrix::new(base.rows(), base.cols(), data).ok()
}
