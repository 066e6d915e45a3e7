//! Command histories, quantization, and containers for scenepack.
//!
//! This is the main crate that ties together bytestream, buffer, and wire to
//! record animated scene state and write it out compactly.
//!
//! # Features
//!
//! - Creation and update [`Command`]s over typed channel buffers
//! - Per-entity [`History`] with validated ordering and frame replay
//! - Tolerance-bounded quantization of whole histories
//! - [`flatten`]/[`parse`] of an [`UpdateTracker`] to and from a container
//!
//! # Design Principles
//!
//! - **Correctness first** - Replayed frames stay within the requested tolerance.
//! - **Atomic mutation** - A failed record or quantize leaves the tracker unchanged.
//! - **Deterministic** - Same inputs produce same bytes.
//!
//! # Example
//!
//! ```
//! use buffer::{EntityKind, Matrix};
//! use codec::{flatten, parse, CommandBuilder, EntityId, UpdateTracker};
//!
//! let id = EntityId::new("layers").unwrap();
//! let mut tracker = UpdateTracker::new();
//! tracker
//!     .record(
//!         CommandBuilder::create(id.clone(), EntityKind::Frame)
//!             .opacity(Matrix::from_rows(&[[1.0f32], [0.25]]))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! tracker.quantize(0.01).unwrap();
//!
//! let bytes = flatten(&tracker).unwrap();
//! let parsed = parse(&bytes).unwrap();
//! assert_eq!(parsed.measure(), tracker.measure());
//! ```

mod command;
mod container;
mod error;
mod history;
mod quantize;
mod tracker;
mod types;

pub use command::{ChannelData, ChannelSet, Command, CommandBuilder, COMMAND_HEADER_SIZE};
pub use container::{flatten, parse, parse_with_limits};
pub use error::{CodecError, CodecResult, EntityIdReason, ErrorKind, ToleranceReason};
pub use history::{Frame, History};
pub use quantize::{
    quantize_history, ChannelQuantization, QuantizationInfo, QuantizeOptions, Tolerance,
    DEFAULT_RELATIVE_TOLERANCE, MAX_STEP_EVALUATIONS,
};
pub use tracker::UpdateTracker;
pub use types::{CommandKind, EntityId, MAX_ENTITY_ID_LEN};
pub use wire::Limits;
