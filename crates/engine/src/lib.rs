//! Settings document engine.
//!
//! Owns the parsed document, validates edits, derives categories, serves
//! ranked search, and keeps a bounded undo/redo history. All mutation goes
//! through [`store::SettingsStore`] on a single logical owner thread;
//! reads are side-effect-free and safe to share.
//!
//! Text encoding and decoding of the vendor export format live in the
//! `nvredit-io` crate; file and process plumbing live in the CLI.

pub mod category;
pub mod document;
pub mod history;
pub mod search;
pub mod setting;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod harness;
