//! The Document - one loaded export file.
//!
//! A document is the ordered sequence of blocks the codec decoded, each
//! block either a recognized setting or an opaque verbatim span (header
//! noise, skipped content). The raw bytes of every block are retained, so
//! re-serializing an unedited document reproduces the input exactly.
//!
//! Structure is frozen after load: blocks are never added, removed, or
//! reordered. Only setting values mutate, through the store.

use serde::{Deserialize, Serialize};

use crate::setting::Setting;

/// Best-effort parsed header fields. All optional; the verbatim preamble is
/// what serialization uses, these exist for display and changeset headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub script_file_name: Option<String>,
    pub created_on: Option<String>,
    pub utility: Option<String>,
    pub crc32: Option<String>,
}

/// One parsed region of the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// A decoded setting plus the exact bytes it was decoded from.
    Setting { setting: Setting, raw: String },
    /// Bytes preserved as-is: content the codec did not (or was told not
    /// to) decode.
    Opaque(String),
}

impl Block {
    pub fn as_setting(&self) -> Option<&Setting> {
        match self {
            Block::Setting { setting, .. } => Some(setting),
            Block::Opaque(_) => None,
        }
    }
}

/// Full in-memory representation of one loaded export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Every byte before the first setting block, verbatim.
    preamble: String,
    header: HeaderInfo,
    blocks: Vec<Block>,
}

impl Document {
    /// Assemble a document from codec output. Settings are stamped with
    /// their block index here; the index is their stable address for the
    /// store and search index.
    pub fn new(preamble: String, header: HeaderInfo, mut blocks: Vec<Block>) -> Self {
        for (i, block) in blocks.iter_mut().enumerate() {
            if let Block::Setting { setting, .. } = block {
                setting.block_index = i;
            }
        }
        Self {
            preamble,
            header,
            blocks,
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Settings in document order.
    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.blocks.iter().filter_map(Block::as_setting)
    }

    pub fn setting_count(&self) -> usize {
        self.settings().count()
    }

    pub(crate) fn setting_at(&self, block_index: usize) -> Option<&Setting> {
        self.blocks.get(block_index).and_then(Block::as_setting)
    }

    pub(crate) fn setting_at_mut(&mut self, block_index: usize) -> Option<&mut Setting> {
        match self.blocks.get_mut(block_index) {
            Some(Block::Setting { setting, .. }) => Some(setting),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::SettingKind;

    #[test]
    fn test_block_indices_are_stamped_in_order() {
        let doc = Document::new(
            "// header\n".to_string(),
            HeaderInfo::default(),
            vec![
                Block::Opaque("// comment\n".to_string()),
                Block::Setting {
                    setting: Setting::new(
                        "0x0001",
                        "A",
                        "",
                        SettingKind::Text { max_len: 4 },
                        "",
                        "",
                        "",
                        "a",
                    ),
                    raw: String::new(),
                },
                Block::Setting {
                    setting: Setting::new(
                        "0x0002",
                        "B",
                        "",
                        SettingKind::Text { max_len: 4 },
                        "",
                        "",
                        "",
                        "b",
                    ),
                    raw: String::new(),
                },
            ],
        );
        let indices: Vec<usize> = doc.settings().map(|s| s.block_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(doc.setting_count(), 2);
        assert!(doc.setting_at(0).is_none());
        assert_eq!(doc.setting_at(1).map(|s| s.token.as_str()), Some("0x0001"));
    }
}
