//! Minimal changeset export for the external restore utility.
//!
//! A changeset is a valid import file that carries only the dirty settings'
//! blocks, in document order, under a regenerated header. Re-submitting the
//! whole export would work too, but every extra line is extra risk surface
//! on a BIOS write, so the payload stays minimal.
//!
//! Export is all-or-nothing: if any dirty setting holds a value that
//! violates its own constraint, no text is produced.

use chrono::Local;

use nvredit_engine::document::Block;
use nvredit_engine::store::SettingsStore;

use crate::scewin;

/// Refusal to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// A dirty setting currently holds an invalid value. Unsafe changesets
    /// must never be exportable.
    DirtyInvalidSettingPresent { token: String },
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::DirtyInvalidSettingPresent { token } => {
                write!(f, "dirty setting {token} holds an invalid value; refusing to export")
            }
        }
    }
}

const DEFAULT_UTILITY: &str = "AMISCE Utility. Ver 5.05.01.0002";
const DEFAULT_CRC: &str = "67B9B44E";

/// Produce the minimal changeset text for the store's dirty settings.
pub fn export(store: &SettingsStore) -> Result<String, ExportError> {
    if let Some(bad) = store.dirty_invalid() {
        return Err(ExportError::DirtyInvalidSettingPresent {
            token: bad.token.clone(),
        });
    }

    let header = store.document().header();
    let mut out = String::new();
    out.push_str("// Script File Name : nvram_changeset.txt\n");
    out.push_str(&format!(
        "// Created on {}\n",
        Local::now().format("%a %b %d %H:%M:%S %Y")
    ));
    out.push_str(&format!(
        "// {}\n",
        header.utility.as_deref().unwrap_or(DEFAULT_UTILITY)
    ));
    out.push_str("// Copyright (c) 2021 AMI. All rights reserved.\n");
    out.push_str(&format!(
        "HIICrc32= {}\n\n",
        header.crc32.as_deref().unwrap_or(DEFAULT_CRC)
    ));

    for block in store.document().blocks() {
        if let Block::Setting { setting, raw } = block {
            if setting.is_dirty() {
                out.push_str(&scewin::rewrite_block(raw, setting));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scewin::parse;
    use nvredit_engine::store::SettingsStore;

    const SAMPLE: &str = "// Script File Name : nvram.txt\n\
// Created on Mon Jan 01 12:00:00 2024\n\
// AMISCE Utility. Ver 5.05.01.0002\n\
// Copyright (c) 2021 AMI. All rights reserved.\n\
HIICrc32= 1A2B3C4D\n\
\n\
Setup Question\t= CSM Support\n\
Help String\t= Enables or Disables CSM Support.\n\
Token\t= 0x014C\t// Do NOT change this line\n\
Offset\t= 0x00AF\n\
Width\t= 0x01\n\
BIOS Default\t= [01]Enabled\n\
Options\t= [00]Disabled\t// Move \"*\" to the desired Option\n\
\t *[01]Enabled\n\
\n\
Setup Question\t= Patrol Scrub Interval\n\
Help String\t= Interval in hours, range:0 ~ 24\n\
Token\t= 0x0230\t// Do NOT change this line\n\
Offset\t= 0x0140\n\
Width\t= 0x01\n\
BIOS Default\t= 24\n\
Value\t= <24>\n";

    #[test]
    fn test_export_contains_only_dirty_blocks() {
        let mut store = SettingsStore::load(parse(SAMPLE).unwrap());
        store.set_value("0x0230", "12").unwrap();
        let out = export(&store).unwrap();

        assert!(out.contains("Token\t= 0x0230"));
        assert!(out.contains("Value\t= <12>"));
        // Clean setting omitted entirely.
        assert!(!out.contains("CSM Support"));
        // Original CRC carried over.
        assert!(out.contains("HIICrc32= 1A2B3C4D"));
    }

    #[test]
    fn test_exported_changeset_is_itself_parseable() {
        let mut store = SettingsStore::load(parse(SAMPLE).unwrap());
        store.set_value("0x014C", "00").unwrap();
        store.set_value("0x0230", "12").unwrap();
        let out = export(&store).unwrap();

        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed.setting_count(), 2);
        let values: Vec<&str> = reparsed.settings().map(|s| s.current_value()).collect();
        assert_eq!(values, vec!["00", "12"]);
    }

    #[test]
    fn test_export_refuses_dirty_invalid_settings() {
        let mut store = SettingsStore::load(parse(SAMPLE).unwrap());
        store.set_value("0x0230", "12").unwrap();
        // Simulate trusted-history replay of a value the current constraint
        // rejects: the store flags it, and export must refuse.
        assert!(store.restore_unchecked("0x0230", "999"));
        let err = export(&store).unwrap_err();
        assert_eq!(
            err,
            ExportError::DirtyInvalidSettingPresent {
                token: "0x0230".to_string()
            }
        );
    }

    #[test]
    fn test_no_dirty_settings_exports_header_only() {
        let store = SettingsStore::load(parse(SAMPLE).unwrap());
        let out = export(&store).unwrap();
        assert!(!out.contains("Setup Question"));
        assert!(out.starts_with("// Script File Name"));
    }
}
