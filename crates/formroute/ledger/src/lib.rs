//! Audit Ledger - append-only record of accepted state transitions
//!
//! The ledger is the accountability backbone of the routing core: every
//! accepted transition (submit, decision, completion) appends one entry.
//! Entries are write-once; no update or delete operation exists in the
//! contract, and timelines are reconstructed by reading entries back in
//! `(timestamp, sequence)` order.

#![deny(unsafe_code)]

use chrono::Utc;
use formroute_types::{
    AuditAction, AuditEntry, EntityKind, PersonId, RoutingError, RoutingResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// The append-only audit ledger.
///
/// Interior mutability keeps `record` usable behind a shared reference from
/// concurrent routing operations; the per-submission ordering guarantee
/// comes from the engine serializing transitions per submission, while the
/// global `sequence` makes the stored order explicit.
pub struct AuditLedger {
    entries: RwLock<Vec<AuditEntry>>,
    entity_index: RwLock<HashMap<(EntityKind, String), Vec<usize>>>,
    actor_index: RwLock<HashMap<PersonId, Vec<usize>>>,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            entity_index: RwLock::new(HashMap::new()),
            actor_index: RwLock::new(HashMap::new()),
        }
    }

    /// Append one entry. The ledger assigns the id, the global sequence
    /// number, and the timestamp at write time, and returns the stored
    /// entry.
    pub fn record(
        &self,
        entity_id: impl Into<String>,
        entity_kind: EntityKind,
        action: AuditAction,
        actor: Option<PersonId>,
        snapshot: Option<Value>,
    ) -> RoutingResult<AuditEntry> {
        let entity_id = entity_id.into();

        let mut entries = self.entries.write().map_err(|_| RoutingError::LockPoisoned)?;
        let index = entries.len();

        let entry = AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            sequence: index as u64,
            entity_id: entity_id.clone(),
            entity_kind,
            action,
            actor: actor.clone(),
            timestamp: Utc::now(),
            snapshot,
        };

        let mut entity_index = self
            .entity_index
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?;
        entity_index
            .entry((entity_kind, entity_id))
            .or_default()
            .push(index);

        if let Some(actor) = actor {
            let mut actor_index = self
                .actor_index
                .write()
                .map_err(|_| RoutingError::LockPoisoned)?;
            actor_index.entry(actor).or_default().push(index);
        }

        entries.push(entry.clone());
        Ok(entry)
    }

    /// Chronological history for one entity, oldest first.
    ///
    /// Sorted by `(timestamp, sequence)` so same-instant writes keep their
    /// accepted order.
    pub fn timeline(&self, entity_id: &str, entity_kind: EntityKind) -> RoutingResult<Vec<AuditEntry>> {
        let entries = self.entries.read().map_err(|_| RoutingError::LockPoisoned)?;
        let entity_index = self
            .entity_index
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?;

        let mut timeline: Vec<AuditEntry> = entity_index
            .get(&(entity_kind, entity_id.to_string()))
            .map(|indexes| indexes.iter().map(|&i| entries[i].clone()).collect())
            .unwrap_or_default();

        timeline.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.sequence.cmp(&b.sequence)));
        Ok(timeline)
    }

    /// Every entry attributed to one actor, oldest first
    pub fn entries_for_actor(&self, actor: &PersonId) -> RoutingResult<Vec<AuditEntry>> {
        let entries = self.entries.read().map_err(|_| RoutingError::LockPoisoned)?;
        let actor_index = self
            .actor_index
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?;

        Ok(actor_index
            .get(actor)
            .map(|indexes| indexes.iter().map(|&i| entries[i].clone()).collect())
            .unwrap_or_default())
    }

    /// Total number of entries ever recorded
    pub fn len(&self) -> RoutingResult<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .len())
    }

    pub fn is_empty(&self) -> RoutingResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}
