//! Setting records - one configurable BIOS item each.
//!
//! A `Setting` pairs the decoded fields of one export block (token, name,
//! help text, constraint) with its live editing state (current value, dirty
//! and valid flags). The raw bytes the setting was decoded from stay with
//! the owning [`Document`](crate::document::Document) block so untouched
//! settings re-serialize exactly.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::category::{self, Category};
use crate::validation;

/// One labeled choice of an Option setting.
///
/// `value` is the raw stored selector (e.g. "01"), `label` the display
/// text (e.g. "Enabled"). Identity is the value, never the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Kind of a setting plus its kind-specific constraint data.
///
/// A closed variant so validation dispatch is exhaustive: there is no
/// "unknown kind" state a value can hide in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKind {
    /// Enumerated choice among fixed labeled values, in source order.
    Option { choices: Vec<Choice> },
    /// Bounded integer. `step > 1` restricts values to `min + k*step`.
    Numeric { min: i64, max: i64, step: i64 },
    /// Free-form string bounded by length; characters restricted to the
    /// printable ASCII class the import tool accepts.
    Text { max_len: usize },
}

impl SettingKind {
    /// Short display name for listings.
    pub fn label(&self) -> &'static str {
        match self {
            SettingKind::Option { .. } => "option",
            SettingKind::Numeric { .. } => "numeric",
            SettingKind::Text { .. } => "text",
        }
    }
}

/// One configurable BIOS item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Stable identifier assigned by the source format, unique per document.
    pub token: String,
    /// Display name ("Setup Question" in the source format).
    pub name: String,
    /// Help text ("Help String" in the source format).
    pub description: String,
    pub kind: SettingKind,
    /// NVRAM offset, kept verbatim for display and reconstruction.
    pub offset: String,
    /// Field width in bytes, kept verbatim.
    pub width: String,
    /// Factory default descriptor, kept verbatim.
    pub bios_default: String,

    original_value: String,
    current_value: String,
    /// False when `current_value` violates `kind`'s constraint. The store
    /// never holds an out-of-constraint value without this flag being down.
    valid: bool,

    /// Index of the originating block within the document.
    pub(crate) block_index: usize,

    /// Derived categories, computed on first request.
    #[serde(skip)]
    categories: OnceLock<Vec<Category>>,
}

impl Setting {
    /// Build a setting fresh from the codec. `current` becomes both the
    /// original and current value; validity is derived immediately so a
    /// file whose own value violates its own constraint is flagged, not
    /// silently trusted.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: SettingKind,
        offset: impl Into<String>,
        width: impl Into<String>,
        bios_default: impl Into<String>,
        current: impl Into<String>,
    ) -> Self {
        let current = current.into();
        let valid = validation::validate_value(&kind, &current).is_ok();
        Self {
            token: token.into(),
            name: name.into(),
            description: description.into(),
            kind,
            offset: offset.into(),
            width: width.into(),
            bios_default: bios_default.into(),
            original_value: current.clone(),
            current_value: current,
            valid,
            block_index: 0,
            categories: OnceLock::new(),
        }
    }

    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    /// True when the current value differs from the originally loaded one.
    pub fn is_dirty(&self) -> bool {
        self.current_value != self.original_value
    }

    /// True when the current value satisfies this setting's constraint.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// For an Option setting, the label of the active choice.
    pub fn current_label(&self) -> Option<&str> {
        match &self.kind {
            SettingKind::Option { choices } => choices
                .iter()
                .find(|c| c.value == self.current_value)
                .map(|c| c.label.as_str()),
            _ => None,
        }
    }

    /// Derived categories. Computed from (name, description) on first call
    /// and cached for the document's lifetime.
    pub fn categories(&self) -> &[Category] {
        self.categories
            .get_or_init(|| category::derive_categories(&self.name, &self.description))
    }

    /// Store-internal mutation path. Callers are responsible for validation
    /// policy; this only keeps the `valid` flag in sync with the new value.
    pub(crate) fn set_current(&mut self, value: String) {
        self.valid = validation::validate_value(&self.kind, &value).is_ok();
        self.current_value = value;
    }
}
