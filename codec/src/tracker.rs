//! Entity-keyed store of command histories.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{CodecError, CodecResult};
use crate::history::History;
use crate::quantize::{quantize_history, QuantizationInfo, QuantizeOptions, Tolerance};
use crate::types::EntityId;

/// Owns every entity's history, in first-created-first order.
#[derive(Debug, Clone, Default)]
pub struct UpdateTracker {
    histories: Vec<History>,
    index: HashMap<EntityId, usize>,
}

impl UpdateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command to its entity's history.
    ///
    /// The first command recorded for an entity must be a creation.
    pub fn record(&mut self, command: Command) -> CodecResult<()> {
        trace!(
            entity = %command.entity_id(),
            kind = command.kind().name(),
            logical_size = command.logical_size(),
            "record command"
        );
        match self.index.get(command.entity_id()) {
            Some(&slot) => self.histories[slot].push(command),
            None => {
                let history = History::new(command)?;
                self.insert_new(history);
                Ok(())
            }
        }
    }

    /// Adds a history for an entity that is not tracked yet.
    pub(crate) fn insert(&mut self, history: History) -> CodecResult<()> {
        if self.index.contains_key(history.entity_id()) {
            return Err(CodecError::DuplicateEntity {
                entity_id: history.entity_id().to_string(),
            });
        }
        self.insert_new(history);
        Ok(())
    }

    fn insert_new(&mut self, history: History) {
        self.index
            .insert(history.entity_id().clone(), self.histories.len());
        self.histories.push(history);
    }

    /// Total logical size per entity.
    #[must_use]
    pub fn measure(&self) -> BTreeMap<EntityId, usize> {
        self.histories
            .iter()
            .map(|history| (history.entity_id().clone(), history.logical_size()))
            .collect()
    }

    /// Sum of every history's logical size.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.histories.iter().map(History::logical_size).sum()
    }

    /// Swaps an entity's whole history.
    pub fn replace_history(&mut self, entity_id: &EntityId, history: History) -> CodecResult<()> {
        let slot = *self
            .index
            .get(entity_id)
            .ok_or_else(|| CodecError::UnknownEntity {
                entity_id: entity_id.to_string(),
            })?;
        if history.entity_id() != entity_id {
            return Err(CodecError::EntityMismatch {
                expected: entity_id.to_string(),
                found: history.entity_id().to_string(),
            });
        }
        self.histories[slot] = history;
        Ok(())
    }

    #[must_use]
    pub fn history(&self, entity_id: &EntityId) -> Option<&History> {
        self.index.get(entity_id).map(|&slot| &self.histories[slot])
    }

    /// Histories in first-created-first order.
    pub fn histories(&self) -> impl Iterator<Item = &History> {
        self.histories.iter()
    }

    /// Entity ids in first-created-first order.
    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.histories.iter().map(History::entity_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Quantizes every entity to an absolute tolerance.
    pub fn quantize(&mut self, tolerance: f32) -> CodecResult<BTreeMap<EntityId, QuantizationInfo>> {
        self.quantize_with(&QuantizeOptions::new(Tolerance::absolute(tolerance)))
    }

    /// Quantizes every entity (or the one selected) and replaces their histories.
    ///
    /// Nothing is replaced unless every entity quantizes successfully. Entities
    /// without channel data are left as they are and omitted from the result.
    pub fn quantize_with(
        &mut self,
        options: &QuantizeOptions,
    ) -> CodecResult<BTreeMap<EntityId, QuantizationInfo>> {
        options.tolerance.validate()?;
        let selected: Vec<usize> = match &options.entity {
            Some(entity_id) => vec![*self.index.get(entity_id).ok_or_else(|| {
                CodecError::UnknownEntity {
                    entity_id: entity_id.to_string(),
                }
            })?],
            None => (0..self.histories.len()).collect(),
        };

        let mut rewritten = Vec::with_capacity(selected.len());
        for slot in selected {
            if let Some(result) = quantize_history(&self.histories[slot], &options.tolerance)? {
                rewritten.push((slot, result));
            }
        }

        let mut infos = BTreeMap::new();
        for (slot, (history, info)) in rewritten {
            self.histories[slot] = history;
            infos.insert(info.entity_id.clone(), info);
        }
        debug!(
            entities = infos.len(),
            total_size = self.total_size(),
            "quantized tracker"
        );
        Ok(infos)
    }
}
