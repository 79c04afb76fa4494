//! Bounded multi-level undo/redo over store edits.
//!
//! A state machine over two stacks of [`ChangeSet`]s with fixed capacity
//! (30, the product's stated guarantee). One changeset is one logical user
//! action: a single field edit, or a bulk reset producing many records
//! atomically.
//!
//! Key invariants:
//! - `apply` validates every edit before mutating anything, so a changeset
//!   is all-or-nothing.
//! - Undo/redo replay previously committed values and bypass validation:
//!   they restore history, they do not accept new input.
//! - Capacity eviction drops the oldest history entry only; store state is
//!   never touched by truncation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{EditError, SettingsStore};

/// Default history depth.
pub const HISTORY_CAPACITY: usize = 30;

/// One applied value change. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub token: String,
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
}

/// Ordered, non-empty records produced by one logical user action. The
/// atomic unit of undo/redo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// None if `records` is empty; a changeset always holds at least one
    /// record.
    pub fn new(records: Vec<ChangeRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        false // by construction
    }
}

/// Undo/redo outcome on an empty stack. A signal, not a fault: callers
/// typically surface it as "nothing to undo".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    Empty,
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Empty => write!(f, "nothing to undo or redo"),
        }
    }
}

/// Bounded undo/redo manager. Process-lifetime scoped: discarded on
/// document reload or explicit [`History::clear`].
#[derive(Debug)]
pub struct History {
    undo: VecDeque<ChangeSet>,
    redo: Vec<ChangeSet>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
            capacity,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Apply one logical action: validate every edit, then mutate the store
    /// and record a single changeset. Edits proposing the value already
    /// held are dropped; if every edit is a no-op, nothing is recorded and
    /// `Ok(None)` is returned.
    ///
    /// On any validation failure nothing is applied and nothing recorded.
    pub fn apply(
        &mut self,
        store: &mut SettingsStore,
        edits: &[(String, String)],
    ) -> Result<Option<ChangeSet>, EditError> {
        // Validate the whole batch against constraints before touching the
        // store. Constraint checks do not depend on current values, so
        // checking up front is equivalent to checking at apply time.
        for (token, value) in edits {
            let setting = store
                .get(token)
                .ok_or_else(|| EditError::UnknownToken(token.clone()))?;
            crate::validation::validate(setting, value)?;
        }

        let mut records = Vec::with_capacity(edits.len());
        for (token, value) in edits {
            // Cannot fail: validated above. No-ops return Ok(None).
            if let Ok(Some(record)) = store.set_value(token, value) {
                records.push(record);
            }
        }

        match ChangeSet::new(records) {
            Some(set) => {
                self.push(set.clone());
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    /// Record an externally built changeset (e.g. a bulk reset assembled
    /// from `reset_to_default` records) as one undoable action. The records
    /// are assumed to be already applied to the store.
    pub fn record(&mut self, set: ChangeSet) {
        self.push(set);
    }

    fn push(&mut self, set: ChangeSet) {
        if self.undo.len() == self.capacity {
            // History truncation only; current store values are unaffected.
            self.undo.pop_front();
        }
        self.undo.push_back(set);
        self.redo.clear();
    }

    /// Revert the most recent changeset: `from` values re-applied in
    /// reverse record order, validation bypassed. Returns the number of
    /// records reverted.
    pub fn undo(&mut self, store: &mut SettingsStore) -> Result<usize, HistoryError> {
        let set = self.undo.pop_back().ok_or(HistoryError::Empty)?;
        for record in set.records().iter().rev() {
            store.restore_unchecked(&record.token, &record.from);
        }
        let n = set.len();
        self.redo.push(set);
        Ok(n)
    }

    /// Re-apply the most recently undone changeset: `to` values in original
    /// record order. Returns the number of records re-applied.
    pub fn redo(&mut self, store: &mut SettingsStore) -> Result<usize, HistoryError> {
        let set = self.redo.pop().ok_or(HistoryError::Empty)?;
        for record in set.records() {
            store.restore_unchecked(&record.token, &record.to);
        }
        let n = set.len();
        // Re-entering the undo stack does not clear redo.
        if self.undo.len() == self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(set);
        Ok(n)
    }
}
