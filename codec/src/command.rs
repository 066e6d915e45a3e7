//! Immutable update commands and their binary payloads.
//!
//! # Payload layout
//!
//! ```text
//! channel_mask u8
//! per present channel, in channel order:
//!   encoding u8 | rows varu32 | cols u8 | data
//!
//! encoding 0 (absolute)            : rows*cols f32
//! encoding 1 (quantized absolute)  : step f32 | cols f32 origin | rows*cols zigzag varints
//! encoding 2 (quantized delta)     : step f32 | rows*cols zigzag varints
//! ```
//!
//! An absent channel means "not present" in a creation and "no change" in an
//! update. The payload is encoded once when the command is built, and
//! `logical_size` is fixed from that encoding.

use buffer::{Channel, EntityKind, FloatMatrix, IntMatrix, Matrix};
use bytestream::{ByteReader, ByteWriter};

use crate::error::{CodecError, CodecResult};
use crate::types::{CommandKind, EntityId};

/// Per-command framing inside a block: kind(1) + entity_kind(1) + payload_len(4).
pub const COMMAND_HEADER_SIZE: usize = 1 + 1 + 4;

const ENCODING_ABSOLUTE: u8 = 0;
const ENCODING_QUANTIZED_ABSOLUTE: u8 = 1;
const ENCODING_QUANTIZED_DELTA: u8 = 2;

/// Buffer contents for one channel of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    /// Full floating-point values.
    Absolute(FloatMatrix),
    /// Quantized values: `value = q * step + origin[col]`.
    QuantizedAbsolute {
        step: f32,
        origin: Vec<f32>,
        values: IntMatrix,
    },
    /// Quantized difference from the previous quantized state of the channel.
    QuantizedDelta { step: f32, values: IntMatrix },
}

impl ChannelData {
    #[must_use]
    pub fn rows(&self) -> usize {
        match self {
            Self::Absolute(m) => m.rows(),
            Self::QuantizedAbsolute { values, .. } | Self::QuantizedDelta { values, .. } => {
                values.rows()
            }
        }
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        match self {
            Self::Absolute(m) => m.cols(),
            Self::QuantizedAbsolute { values, .. } | Self::QuantizedDelta { values, .. } => {
                values.cols()
            }
        }
    }

    /// Quantization step, if quantized.
    #[must_use]
    pub const fn step(&self) -> Option<f32> {
        match self {
            Self::Absolute(_) => None,
            Self::QuantizedAbsolute { step, .. } | Self::QuantizedDelta { step, .. } => Some(*step),
        }
    }

    #[must_use]
    pub const fn is_quantized(&self) -> bool {
        !matches!(self, Self::Absolute(_))
    }

    const fn encoding(&self) -> u8 {
        match self {
            Self::Absolute(_) => ENCODING_ABSOLUTE,
            Self::QuantizedAbsolute { .. } => ENCODING_QUANTIZED_ABSOLUTE,
            Self::QuantizedDelta { .. } => ENCODING_QUANTIZED_DELTA,
        }
    }
}

/// Optional buffer per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    slots: [Option<ChannelData>; Channel::COUNT],
}

impl ChannelSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, channel: Channel, data: ChannelData) -> Self {
        self.insert(channel, data);
        self
    }

    /// Sets a channel, returning the previous data.
    pub fn insert(&mut self, channel: Channel, data: ChannelData) -> Option<ChannelData> {
        self.slots[channel.index()].replace(data)
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&ChannelData> {
        self.slots[channel.index()].as_ref()
    }

    #[must_use]
    pub fn contains(&self, channel: Channel) -> bool {
        self.slots[channel.index()].is_some()
    }

    /// Present channels in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelData)> {
        Channel::ALL
            .into_iter()
            .zip(&self.slots)
            .filter_map(|(channel, slot)| slot.as_ref().map(|data| (channel, data)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Bit mask of present channels.
    #[must_use]
    pub fn mask(&self) -> u8 {
        self.iter().fold(0, |mask, (channel, _)| mask | channel.flag())
    }
}

/// An immutable creation or update record for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    entity_id: EntityId,
    kind: CommandKind,
    entity_kind: EntityKind,
    channels: ChannelSet,
    payload: Vec<u8>,
    logical_size: usize,
}

impl Command {
    /// Creates a full-snapshot command from floating-point buffers.
    pub fn create(
        entity_id: EntityId,
        entity_kind: EntityKind,
        channels: ChannelSet,
    ) -> CodecResult<Self> {
        reject_quantized(&channels)?;
        Self::build(entity_id, CommandKind::Create, entity_kind, channels)
    }

    /// Creates an update carrying only the changed buffers.
    pub fn update(
        entity_id: EntityId,
        entity_kind: EntityKind,
        channels: ChannelSet,
    ) -> CodecResult<Self> {
        reject_quantized(&channels)?;
        Self::build(entity_id, CommandKind::Update, entity_kind, channels)
    }

    /// Validates and encodes a command with any channel encoding.
    pub(crate) fn build(
        entity_id: EntityId,
        kind: CommandKind,
        entity_kind: EntityKind,
        channels: ChannelSet,
    ) -> CodecResult<Self> {
        validate_channels(kind, entity_kind, &channels)?;
        let payload = encode_payload(&channels)?;
        let logical_size = COMMAND_HEADER_SIZE + payload.len();
        Ok(Self {
            entity_id,
            kind,
            entity_kind,
            channels,
            payload,
            logical_size,
        })
    }

    /// Decodes a command from a payload read out of a container.
    pub(crate) fn decode(
        entity_id: EntityId,
        kind: CommandKind,
        entity_kind: EntityKind,
        payload: &[u8],
    ) -> CodecResult<Self> {
        let channels = decode_payload(payload)?;
        validate_channels(kind, entity_kind, &channels)?;
        Ok(Self {
            entity_id,
            kind,
            entity_kind,
            channels,
            payload: payload.to_vec(),
            logical_size: COMMAND_HEADER_SIZE + payload.len(),
        })
    }

    #[must_use]
    pub const fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        self.kind
    }

    #[must_use]
    pub const fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    #[must_use]
    pub const fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    #[must_use]
    pub fn channel(&self, channel: Channel) -> Option<&ChannelData> {
        self.channels.get(channel)
    }

    /// Encoded channel payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Bytes this command occupies in an uncompressed block body.
    #[must_use]
    pub const fn logical_size(&self) -> usize {
        self.logical_size
    }

    #[must_use]
    pub fn is_create(&self) -> bool {
        self.kind == CommandKind::Create
    }
}

/// Builder for commands carrying floating-point buffers.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    entity_id: EntityId,
    kind: CommandKind,
    entity_kind: EntityKind,
    channels: ChannelSet,
}

impl CommandBuilder {
    #[must_use]
    pub fn create(entity_id: EntityId, entity_kind: EntityKind) -> Self {
        Self::new(entity_id, CommandKind::Create, entity_kind)
    }

    #[must_use]
    pub fn update(entity_id: EntityId, entity_kind: EntityKind) -> Self {
        Self::new(entity_id, CommandKind::Update, entity_kind)
    }

    fn new(entity_id: EntityId, kind: CommandKind, entity_kind: EntityKind) -> Self {
        Self {
            entity_id,
            kind,
            entity_kind,
            channels: ChannelSet::new(),
        }
    }

    #[must_use]
    pub fn channel(mut self, channel: Channel, values: FloatMatrix) -> Self {
        self.channels.insert(channel, ChannelData::Absolute(values));
        self
    }

    #[must_use]
    pub fn positions(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Positions, values)
    }

    #[must_use]
    pub fn normals(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Normals, values)
    }

    #[must_use]
    pub fn colors(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Colors, values)
    }

    #[must_use]
    pub fn rotations(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Rotations, values)
    }

    #[must_use]
    pub fn opacity(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Opacity, values)
    }

    #[must_use]
    pub fn visibility(self, values: FloatMatrix) -> Self {
        self.channel(Channel::Visibility, values)
    }

    pub fn build(self) -> CodecResult<Command> {
        match self.kind {
            CommandKind::Create => Command::create(self.entity_id, self.entity_kind, self.channels),
            CommandKind::Update => Command::update(self.entity_id, self.entity_kind, self.channels),
        }
    }
}

fn reject_quantized(channels: &ChannelSet) -> CodecResult<()> {
    match channels.iter().find(|(_, data)| data.is_quantized()) {
        Some((channel, _)) => Err(CodecError::QuantizedInput { channel }),
        None => Ok(()),
    }
}

fn validate_channels(
    kind: CommandKind,
    entity_kind: EntityKind,
    channels: &ChannelSet,
) -> CodecResult<()> {
    let mut rows: Option<usize> = None;
    for (channel, data) in channels.iter() {
        if !entity_kind.allows(channel) {
            return Err(CodecError::ChannelNotAllowed {
                channel,
                entity_kind,
            });
        }
        if data.cols() != channel.width() {
            return Err(CodecError::ChannelWidth {
                channel,
                expected: channel.width(),
                actual: data.cols(),
            });
        }
        match rows {
            Some(expected) if expected != data.rows() => {
                return Err(CodecError::RowCountMismatch {
                    channel,
                    expected,
                    actual: data.rows(),
                });
            }
            _ => rows = Some(data.rows()),
        }

        match data {
            ChannelData::Absolute(values) => {
                if let Some((row, col)) = values.find_non_finite() {
                    return Err(buffer::BufferError::NonFiniteValue { row, col }.into());
                }
            }
            ChannelData::QuantizedAbsolute { step, origin, .. } => {
                buffer::validate_step(*step)?;
                if origin.len() != data.cols() {
                    return Err(buffer::BufferError::OriginLength {
                        expected: data.cols(),
                        actual: origin.len(),
                    }
                    .into());
                }
                if let Some(col) = origin.iter().position(|v| !v.is_finite()) {
                    return Err(buffer::BufferError::NonFiniteOrigin { col }.into());
                }
            }
            ChannelData::QuantizedDelta { step, .. } => {
                buffer::validate_step(*step)?;
                if kind == CommandKind::Create {
                    return Err(CodecError::DeltaInCreate { channel });
                }
            }
        }
    }
    Ok(())
}

fn encode_payload(channels: &ChannelSet) -> CodecResult<Vec<u8>> {
    let mut writer = ByteWriter::new();
    writer.write_u8(channels.mask());
    for (_, data) in channels.iter() {
        let rows = u32::try_from(data.rows()).map_err(|_| {
            CodecError::Encode(wire::EncodeError::LengthOverflow {
                length: data.rows(),
            })
        })?;
        writer.write_u8(data.encoding());
        writer.write_varu32(rows);
        // Widths are validated against the channel, so they fit in a byte.
        writer.write_u8(data.cols() as u8);
        match data {
            ChannelData::Absolute(values) => {
                for &v in values.as_slice() {
                    writer.write_f32(v);
                }
            }
            ChannelData::QuantizedAbsolute {
                step,
                origin,
                values,
            } => {
                writer.write_f32(*step);
                for &o in origin {
                    writer.write_f32(o);
                }
                write_ints(&mut writer, values);
            }
            ChannelData::QuantizedDelta { step, values } => {
                writer.write_f32(*step);
                write_ints(&mut writer, values);
            }
        }
    }
    Ok(writer.finish())
}

fn write_ints(writer: &mut ByteWriter, values: &IntMatrix) {
    for &q in values.as_slice() {
        writer.write_vars32(q);
    }
}

fn decode_payload(payload: &[u8]) -> CodecResult<ChannelSet> {
    let mut reader = ByteReader::new(payload);
    let mask = reader.read_u8()?;
    if mask & !Channel::full_mask() != 0 {
        return Err(CodecError::InvalidChannelMask { mask });
    }

    let mut channels = ChannelSet::new();
    for channel in Channel::from_mask(mask) {
        let encoding = reader.read_u8()?;
        let rows = reader.read_varu32()? as usize;
        let cols = usize::from(reader.read_u8()?);
        if cols != channel.width() {
            return Err(CodecError::ChannelWidth {
                channel,
                expected: channel.width(),
                actual: cols,
            });
        }

        // Every element takes at least one byte, four when stored as f32.
        let min_element = if encoding == ENCODING_ABSOLUTE { 4 } else { 1 };
        let count = rows
            .checked_mul(cols)
            .filter(|count| count.saturating_mul(min_element) <= reader.remaining())
            .ok_or(CodecError::ChannelTooLarge { channel, rows })?;

        let data = match encoding {
            ENCODING_ABSOLUTE => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(reader.read_f32()?);
                }
                ChannelData::Absolute(Matrix::new(rows, cols, values)?)
            }
            ENCODING_QUANTIZED_ABSOLUTE => {
                let step = reader.read_f32()?;
                let mut origin = Vec::with_capacity(cols);
                for _ in 0..cols {
                    origin.push(reader.read_f32()?);
                }
                let values = read_ints(&mut reader, rows, cols, count)?;
                ChannelData::QuantizedAbsolute {
                    step,
                    origin,
                    values,
                }
            }
            ENCODING_QUANTIZED_DELTA => {
                let step = reader.read_f32()?;
                let values = read_ints(&mut reader, rows, cols, count)?;
                ChannelData::QuantizedDelta { step, values }
            }
            tag => return Err(CodecError::UnknownChannelEncoding { tag }),
        };
        channels.insert(channel, data);
    }

    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            consumed: reader.position(),
            total: payload.len(),
        });
    }
    Ok(channels)
}

fn read_ints(
    reader: &mut ByteReader<'_>,
    rows: usize,
    cols: usize,
    count: usize,
) -> CodecResult<IntMatrix> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(reader.read_vars32()?);
    }
    Ok(Matrix::new(rows, cols, values)?)
}
