//! Test fixtures shared by the engine's unit tests.

use crate::document::{Block, Document, HeaderInfo};
use crate::setting::{Choice, Setting, SettingKind};
use crate::store::SettingsStore;

/// A small document covering all three setting kinds:
/// - 0x014C "CSM Support"            Option  (00 Disabled / 01 Enabled), current 01
/// - 0x0230 "Patrol Scrub Interval"  Numeric (0..=100), current 24
/// - 0x0301 "Memory Frequency Control" Option (00 Auto / 01 1333 / 02 1600), current 00
/// - 0x0412 "Asset Tag"              Text    (max 8), current "default"
pub fn sample_document() -> Document {
    let blocks = vec![
        Block::Setting {
            setting: Setting::new(
                "0x014C",
                "CSM Support",
                "Enables or Disables CSM Support.",
                SettingKind::Option {
                    choices: vec![Choice::new("00", "Disabled"), Choice::new("01", "Enabled")],
                },
                "0x00AF",
                "0x01",
                "[01]Enabled",
                "01",
            ),
            raw: String::new(),
        },
        Block::Setting {
            setting: Setting::new(
                "0x0230",
                "Patrol Scrub Interval",
                "Interval in hours, range:0 ~ 100",
                SettingKind::Numeric { min: 0, max: 100, step: 1 },
                "0x0140",
                "0x01",
                "24",
                "24",
            ),
            raw: String::new(),
        },
        Block::Setting {
            setting: Setting::new(
                "0x0301",
                "Memory Frequency Control",
                "Select the DRAM operating frequency.",
                SettingKind::Option {
                    choices: vec![
                        Choice::new("00", "Auto"),
                        Choice::new("01", "1333MHz"),
                        Choice::new("02", "1600MHz"),
                    ],
                },
                "0x0200",
                "0x01",
                "[00]Auto",
                "00",
            ),
            raw: String::new(),
        },
        Block::Setting {
            setting: Setting::new(
                "0x0412",
                "Asset Tag",
                "Chassis asset tag string.",
                SettingKind::Text { max_len: 8 },
                "0x0300",
                "0x08",
                "default",
                "default",
            ),
            raw: String::new(),
        },
    ];
    Document::new("// fixture\n".to_string(), HeaderInfo::default(), blocks)
}

pub fn sample_store() -> SettingsStore {
    SettingsStore::load(sample_document())
}
