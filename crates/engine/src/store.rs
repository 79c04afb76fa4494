//! Settings store - the canonical owner of the loaded document.
//!
//! The store is the single source of truth for current values. All
//! mutation funnels through it so the validation boundary holds: a value
//! that fails validation never lands, and the store is left untouched on
//! rejection.
//!
//! Key invariants:
//! - Document structure never changes after `load`; only values do.
//! - `set_value` validates before mutating; no silent clamping.
//! - `restore_unchecked` is the history-replay path only; it bypasses
//!   validation but still re-derives the setting's `valid` flag.
//! - Reads (`get`, `page`, `dirty_settings`) are side-effect-free
//!   snapshots of the store at call time.

use chrono::Utc;
use rustc_hash::FxHashMap;

use crate::document::Document;
use crate::history::ChangeRecord;
use crate::setting::Setting;
use crate::validation::{self, ValidationError};

/// Error from a store edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Token not present in the loaded document.
    UnknownToken(String),
    /// Proposed value rejected by the validation engine.
    Rejected(ValidationError),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::UnknownToken(token) => write!(f, "unknown token {token}"),
            EditError::Rejected(reason) => write!(f, "{reason}"),
        }
    }
}

impl From<ValidationError> for EditError {
    fn from(e: ValidationError) -> Self {
        EditError::Rejected(e)
    }
}

/// Canonical in-memory settings store for one loaded document.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    document: Document,
    /// token -> block index. Built once at load. On duplicate tokens the
    /// first occurrence wins; later blocks stay in the document (and
    /// round-trip verbatim) but are not addressable.
    index: FxHashMap<String, usize>,
    /// Block indices of settings, in document order.
    order: Vec<usize>,
}

impl SettingsStore {
    pub fn load(document: Document) -> Self {
        let mut index = FxHashMap::default();
        let mut order = Vec::with_capacity(document.setting_count());
        for setting in document.settings() {
            order.push(setting.block_index);
            index
                .entry(setting.token.clone())
                .or_insert(setting.block_index);
        }
        Self {
            document,
            index,
            order,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&Setting> {
        self.index
            .get(token)
            .and_then(|&i| self.document.setting_at(i))
    }

    /// Settings in document order.
    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.order
            .iter()
            .filter_map(|&i| self.document.setting_at(i))
    }

    /// Settings whose current value differs from the loaded one, in
    /// document order.
    pub fn dirty_settings(&self) -> impl Iterator<Item = &Setting> {
        self.settings().filter(|s| s.is_dirty())
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty_settings().count()
    }

    /// First dirty setting holding an invalid value, if any. The exporter
    /// refuses to produce output while this returns `Some`.
    pub fn dirty_invalid(&self) -> Option<&Setting> {
        self.dirty_settings().find(|s| !s.is_valid())
    }

    /// One page of the filtered projection, in document order. Pure view:
    /// repeated calls return identical slices as long as the store is not
    /// mutated in between. Nothing is materialized beyond the page itself.
    pub fn page<'a, F>(&'a self, offset: usize, limit: usize, mut filter: F) -> Vec<&'a Setting>
    where
        F: FnMut(&Setting) -> bool,
    {
        self.settings()
            .filter(|s| filter(s))
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Validated edit. Returns `Ok(None)` when the proposed value is the
    /// value already held - no mutation, nothing for history to record.
    pub fn set_value(&mut self, token: &str, value: &str) -> Result<Option<ChangeRecord>, EditError> {
        let block_index = *self
            .index
            .get(token)
            .ok_or_else(|| EditError::UnknownToken(token.to_string()))?;
        // Unwrap-free: the index only ever points at setting blocks.
        let Some(setting) = self.document.setting_at(block_index) else {
            return Err(EditError::UnknownToken(token.to_string()));
        };
        validation::validate(setting, value)?;
        if setting.current_value() == value {
            return Ok(None);
        }
        let record = ChangeRecord {
            token: setting.token.clone(),
            from: setting.current_value().to_string(),
            to: value.to_string(),
            at: Utc::now(),
        };
        if let Some(setting) = self.document.setting_at_mut(block_index) {
            setting.set_current(value.to_string());
        }
        Ok(Some(record))
    }

    /// Revert one setting to its originally loaded value. The original was
    /// captured before any edit, so this bypasses validation the same way
    /// history replay does.
    pub fn reset_to_default(&mut self, token: &str) -> Result<Option<ChangeRecord>, EditError> {
        let block_index = *self
            .index
            .get(token)
            .ok_or_else(|| EditError::UnknownToken(token.to_string()))?;
        let Some(setting) = self.document.setting_at(block_index) else {
            return Err(EditError::UnknownToken(token.to_string()));
        };
        if !setting.is_dirty() {
            return Ok(None);
        }
        let record = ChangeRecord {
            token: setting.token.clone(),
            from: setting.current_value().to_string(),
            to: setting.original_value().to_string(),
            at: Utc::now(),
        };
        let value = record.to.clone();
        if let Some(setting) = self.document.setting_at_mut(block_index) {
            setting.set_current(value);
        }
        Ok(Some(record))
    }

    /// History-replay mutation: applies a previously committed value
    /// without re-validating it. Restoring history is not accepting new
    /// input. The `valid` flag is still re-derived, so if constraints and
    /// history ever disagree the setting is flagged rather than trusted.
    ///
    /// Returns false if the token is unknown (stale history after reload).
    pub fn restore_unchecked(&mut self, token: &str, value: &str) -> bool {
        let Some(&block_index) = self.index.get(token) else {
            return false;
        };
        match self.document.setting_at_mut(block_index) {
            Some(setting) => {
                setting.set_current(value.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness;
    use crate::validation::ValidationError;

    #[test]
    fn test_load_builds_index_in_document_order() {
        let store = harness::sample_store();
        assert_eq!(store.len(), 4);
        let tokens: Vec<&str> = store.settings().map(|s| s.token.as_str()).collect();
        assert_eq!(tokens, vec!["0x014C", "0x0230", "0x0301", "0x0412"]);
        assert!(store.get("0x0230").is_some());
        assert!(store.get("0xFFFF").is_none());
    }

    #[test]
    fn test_set_value_records_change_and_marks_dirty() {
        let mut store = harness::sample_store();
        let record = store.set_value("0x014C", "00").unwrap().unwrap();
        assert_eq!(record.from, "01");
        assert_eq!(record.to, "00");
        let s = store.get("0x014C").unwrap();
        assert!(s.is_dirty());
        assert!(s.is_valid());
        assert_eq!(s.current_value(), "00");
    }

    #[test]
    fn test_rejected_edit_leaves_store_untouched() {
        let mut store = harness::sample_store();
        let err = store.set_value("0x0230", "999").unwrap_err();
        assert_eq!(err, EditError::Rejected(ValidationError::OutOfRange));
        let s = store.get("0x0230").unwrap();
        assert!(!s.is_dirty());
        assert_eq!(s.current_value(), "24");
    }

    #[test]
    fn test_unknown_token_is_reported() {
        let mut store = harness::sample_store();
        assert_eq!(
            store.set_value("0xBEEF", "1"),
            Err(EditError::UnknownToken("0xBEEF".to_string()))
        );
    }

    #[test]
    fn test_same_value_edit_is_a_no_op() {
        let mut store = harness::sample_store();
        assert!(store.set_value("0x014C", "00").unwrap().is_some());
        // Second identical edit: still one dirty entry, no new record.
        assert!(store.set_value("0x014C", "00").unwrap().is_none());
        assert_eq!(store.dirty_count(), 1);
    }

    #[test]
    fn test_reset_to_default_restores_loaded_value() {
        let mut store = harness::sample_store();
        store.set_value("0x0230", "12").unwrap();
        assert_eq!(store.dirty_count(), 1);
        let record = store.reset_to_default("0x0230").unwrap().unwrap();
        assert_eq!(record.to, "24");
        assert_eq!(store.dirty_count(), 0);
        // Already clean: nothing to do.
        assert!(store.reset_to_default("0x0230").unwrap().is_none());
    }

    #[test]
    fn test_page_is_a_stable_filtered_window() {
        let store = harness::sample_store();
        let all = store.page(0, 10, |_| true);
        assert_eq!(all.len(), 4);
        let window = store.page(1, 2, |_| true);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].token, "0x0230");
        assert_eq!(window[1].token, "0x0301");
        // Same call, same result.
        let again = store.page(1, 2, |_| true);
        assert_eq!(
            window.iter().map(|s| &s.token).collect::<Vec<_>>(),
            again.iter().map(|s| &s.token).collect::<Vec<_>>()
        );
        let options_only = store.page(0, 10, |s| s.current_label().is_some());
        assert_eq!(options_only.len(), 2);
    }

    #[test]
    fn test_restore_unchecked_flags_invalid_values() {
        let mut store = harness::sample_store();
        // Replay of a value that no longer satisfies the constraint: the
        // store accepts it (trusted history) but flags it.
        assert!(store.restore_unchecked("0x0230", "999"));
        let s = store.get("0x0230").unwrap();
        assert_eq!(s.current_value(), "999");
        assert!(!s.is_valid());
        assert!(!store.restore_unchecked("0xBEEF", "1"));
    }
}
