//! Flattening trackers into containers and parsing them back.
//!
//! Each entity becomes one block named after its id. The uncompressed block
//! body is:
//!
//! ```text
//! command_count varu32
//! per command: kind u8 | entity_kind u8 | payload_len u32 | payload
//! ```
//!
//! so each command occupies exactly its logical size. The body is deflated as
//! a whole and its digest recorded in the manifest.

use buffer::EntityKind;
use bytestream::{ByteError, ByteReader, ByteWriter};
use tracing::debug;
use wire::{decode_container, ContainerWriter, Limits};

use crate::command::{Command, COMMAND_HEADER_SIZE};
use crate::error::{CodecError, CodecResult};
use crate::history::History;
use crate::tracker::UpdateTracker;
use crate::types::{CommandKind, EntityId};

/// Serializes every history, first-created-first.
pub fn flatten(tracker: &UpdateTracker) -> CodecResult<Vec<u8>> {
    let mut writer = ContainerWriter::new();
    for history in tracker.histories() {
        let body = encode_body(history)?;
        let compressed = buffer::deflate(&body)?;
        debug!(
            entity = %history.entity_id(),
            commands = history.len(),
            uncompressed = body.len(),
            compressed = compressed.len(),
            "write block"
        );
        writer.push_block(
            history.entity_id().as_str(),
            body.len(),
            &compressed,
            buffer::digest(&body),
        )?;
    }
    Ok(writer.finish()?)
}

/// Parses a container with default limits.
pub fn parse(bytes: &[u8]) -> CodecResult<UpdateTracker> {
    parse_with_limits(bytes, &Limits::default())
}

/// Parses a container, enforcing `limits` before allocating.
pub fn parse_with_limits(bytes: &[u8], limits: &Limits) -> CodecResult<UpdateTracker> {
    let container = decode_container(bytes, limits)?;
    let mut tracker = UpdateTracker::new();
    for (entry, block) in container.manifest.entries.iter().zip(&container.blocks) {
        let body = buffer::inflate(block.compressed, block.uncompressed_len as usize)?;
        let actual = buffer::digest(&body);
        if actual != entry.digest {
            return Err(CodecError::DigestMismatch {
                name: entry.name.clone(),
                expected: entry.digest,
                actual,
            });
        }
        let history = decode_body(block.name, &body).map_err(|err| err.in_block(block.name))?;
        tracker
            .insert(history)
            .map_err(|err| err.in_block(block.name))?;
    }
    debug!(
        entities = tracker.len(),
        bytes = bytes.len(),
        "parsed container"
    );
    Ok(tracker)
}

fn encode_body(history: &History) -> CodecResult<Vec<u8>> {
    let mut writer = ByteWriter::with_capacity(5 + history.logical_size());
    let count = u32::try_from(history.len()).map_err(|_| {
        CodecError::Encode(wire::EncodeError::LengthOverflow {
            length: history.len(),
        })
    })?;
    writer.write_varu32(count);
    for command in history.commands() {
        writer.write_u8(command.kind().raw());
        writer.write_u8(command.entity_kind().raw());
        writer.write_len_u32(command.payload().len()).map_err(|_| {
            CodecError::Encode(wire::EncodeError::LengthOverflow {
                length: command.payload().len(),
            })
        })?;
        writer.write_bytes(command.payload());
    }
    Ok(writer.finish())
}

fn decode_body(name: &str, body: &[u8]) -> CodecResult<History> {
    let entity_id = EntityId::new(name)?;
    let mut reader = ByteReader::new(body);
    let count = reader.read_varu32()? as usize;
    let needed = count.saturating_mul(COMMAND_HEADER_SIZE);
    if needed > reader.remaining() {
        return Err(ByteError::UnexpectedEof {
            requested: needed,
            available: reader.remaining(),
        }
        .into());
    }

    let mut commands = Vec::with_capacity(count);
    for _ in 0..count {
        let raw_kind = reader.read_u8()?;
        let kind =
            CommandKind::from_raw(raw_kind).ok_or(CodecError::UnknownCommandKind { raw: raw_kind })?;
        let raw_entity = reader.read_u8()?;
        let entity_kind = EntityKind::from_raw(raw_entity)
            .ok_or(CodecError::UnknownEntityKind { raw: raw_entity })?;
        let len = reader.read_u32()? as usize;
        let payload = reader.read_bytes(len)?;
        commands.push(Command::decode(
            entity_id.clone(),
            kind,
            entity_kind,
            payload,
        )?);
    }

    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            consumed: reader.position(),
            total: body.len(),
        });
    }
    History::from_commands(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;
    use crate::error::ErrorKind;
    use buffer::Matrix;

    fn id(name: &str) -> EntityId {
        EntityId::new(name).unwrap()
    }

    fn sample_tracker() -> UpdateTracker {
        let mut tracker = UpdateTracker::new();
        tracker
            .record(
                CommandBuilder::create(id("layers"), EntityKind::Frame)
                    .opacity(Matrix::from_rows(&[[1.0f32], [0.5]]))
                    .visibility(Matrix::from_rows(&[[1.0f32], [1.0]]))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        tracker
            .record(
                CommandBuilder::update(id("layers"), EntityKind::Frame)
                    .opacity(Matrix::from_rows(&[[0.75f32], [0.5]]))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        tracker
    }

    #[test]
    fn body_size_is_varint_plus_logical_size() {
        let tracker = sample_tracker();
        let history = tracker.history(&id("layers")).unwrap();
        let body = encode_body(history).unwrap();
        assert_eq!(body.len(), 1 + history.logical_size());
    }

    #[test]
    fn flatten_parse_roundtrip() {
        let tracker = sample_tracker();
        let bytes = flatten(&tracker).unwrap();
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.measure(), tracker.measure());
        assert_eq!(
            parsed.history(&id("layers")),
            tracker.history(&id("layers"))
        );
    }

    #[test]
    fn empty_tracker_roundtrip() {
        let bytes = flatten(&UpdateTracker::new()).unwrap();
        assert!(parse(&bytes).unwrap().is_empty());
    }

    #[test]
    fn decode_body_rejects_unknown_kinds() {
        let err = decode_body("a", &[1, 9, 1, 1, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, CodecError::UnknownCommandKind { raw: 9 });

        let err = decode_body("a", &[1, 1, 7, 1, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, CodecError::UnknownEntityKind { raw: 7 });
    }

    #[test]
    fn decode_body_rejects_trailing_bytes() {
        let tracker = sample_tracker();
        let mut body = encode_body(tracker.history(&id("layers")).unwrap()).unwrap();
        body.push(0);
        assert!(matches!(
            decode_body("layers", &body),
            Err(CodecError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn decode_body_rejects_inflated_count() {
        let err = decode_body("a", &[100, 1, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn decode_body_requires_creation_first() {
        // One update command with an empty channel mask.
        let err = decode_body("a", &[1, 2, 3, 1, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::UpdateBeforeCreate { .. }));
        assert_eq!(err.in_block("a").kind(), ErrorKind::CorruptData);
    }
}
