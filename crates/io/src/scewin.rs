//! Codec for the AMISCE/SCEWIN NVRAM export format.
//!
//! The format is line oriented: a free-form header, then one block per
//! setting, each block introduced by a `Setup Question` line. Blocks carry
//! tab-separated `Key = value` fields, enumerated options as `[value]Label`
//! lines with a `*` marking the active choice, and numeric/text values as
//! `Value = <...>`.
//!
//! ## Round-trip law
//!
//! Every block's exact byte span is retained on parse. Serializing an
//! unedited document reproduces the input byte for byte; serializing after
//! edits rewrites only the affected blocks, and inside those only the `*`
//! marker or the `<...>` payload. Comments, tabs and spacing are never
//! reflowed - the import tool is picky and a reflowed line is a corrupted
//! line.

use std::sync::OnceLock;

use regex::Regex;

use nvredit_engine::document::{Block, Document, HeaderInfo};
use nvredit_engine::setting::{Choice, Setting, SettingKind};
use nvredit_engine::validation::parse_integer;

/// Parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A block inside the settings section could not be decomposed.
    /// `line` is the 1-based line number of the block's first line.
    MalformedSetting { line: usize, reason: String },
    /// The input has no settings section at all (empty or truncated file).
    UnexpectedEof,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MalformedSetting { line, reason } => {
                write!(f, "malformed setting at line {line}: {reason}")
            }
            ParseError::UnexpectedEof => write!(f, "no settings section found"),
        }
    }
}

/// What to do with a block that fails to decompose. The codec never skips
/// silently; skipping is a policy the caller opts into, and skipped blocks
/// are preserved verbatim so the round-trip law still holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// First malformed block aborts the parse.
    Abort,
    /// Malformed blocks become opaque spans and are reported.
    Skip,
}

/// Result of a policy-driven parse.
#[derive(Debug)]
pub struct ParseOutcome {
    pub document: Document,
    /// Errors for blocks kept as opaque spans (Skip policy only).
    pub skipped: Vec<ParseError>,
}

/// Strict parse: any malformed setting block aborts.
pub fn parse(text: &str) -> Result<Document, ParseError> {
    parse_with(text, MalformedPolicy::Abort).map(|o| o.document)
}

/// Parse with an explicit malformed-block policy.
pub fn parse_with(text: &str, policy: MalformedPolicy) -> Result<ParseOutcome, ParseError> {
    // Block starts: byte offset of every top-level `Setup Question` line.
    let mut starts: Vec<usize> = Vec::new();
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        if is_block_start(line) {
            starts.push(offset);
        }
        offset += line.len();
    }
    if starts.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }

    let preamble = &text[..starts[0]];
    let header = parse_header(preamble);

    let mut blocks = Vec::with_capacity(starts.len());
    let mut skipped = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let raw = &text[start..end];
        let line_no = 1 + text[..start].matches('\n').count();
        match decode_block(raw, line_no) {
            Ok(setting) => blocks.push(Block::Setting {
                setting,
                raw: raw.to_string(),
            }),
            Err(e) => match policy {
                MalformedPolicy::Abort => return Err(e),
                MalformedPolicy::Skip => {
                    skipped.push(e);
                    blocks.push(Block::Opaque(raw.to_string()));
                }
            },
        }
    }

    Ok(ParseOutcome {
        document: Document::new(preamble.to_string(), header, blocks),
        skipped,
    })
}

/// Serialize a document back to export text. Clean blocks pass through
/// verbatim; dirty blocks are spliced minimally.
pub fn serialize(document: &Document) -> String {
    let mut out = String::with_capacity(document.preamble().len() + document.blocks().len() * 128);
    out.push_str(document.preamble());
    for block in document.blocks() {
        match block {
            Block::Opaque(raw) => out.push_str(raw),
            Block::Setting { setting, raw } => {
                if setting.is_dirty() {
                    out.push_str(&rewrite_block(raw, setting));
                } else {
                    out.push_str(raw);
                }
            }
        }
    }
    out
}

fn is_block_start(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("Setup Question") && t["Setup Question".len()..].trim_start().starts_with('=')
}

/// Code portion of a line: everything before an inline `//` comment.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    }
}

/// `Key<ws>= value` field accessor; None when the line is a different key.
fn field_value<'a>(code: &'a str, key: &str) -> Option<&'a str> {
    let t = code.trim_start();
    let rest = t.strip_prefix(key)?;
    let rest = rest.trim_start();
    Some(rest.strip_prefix('=')?.trim())
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]([^/\r\n]*)").unwrap())
}

fn range_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)range\s*[:=]?\s*(\d+)\s*[~-]\s*(\d+)").unwrap())
}

fn step_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)step\s*[:=]?\s*(\d+)").unwrap())
}

fn parse_header(preamble: &str) -> HeaderInfo {
    let mut header = HeaderInfo::default();
    for line in preamble.lines() {
        let t = line.trim();
        if t.contains("Script File Name") {
            if let Some((_, v)) = t.split_once(':') {
                header.script_file_name = Some(v.trim().to_string());
            }
        } else if let Some(i) = t.find("Created on") {
            header.created_on = Some(t[i + "Created on".len()..].trim().to_string());
        } else if t.contains("AMISCE Utility") {
            header.utility = Some(t.trim_start_matches('/').trim().to_string());
        } else if t.starts_with("HIICrc32") {
            if let Some((_, v)) = t.split_once('=') {
                header.crc32 = Some(v.trim().to_string());
            }
        }
    }
    header
}

fn decode_block(raw: &str, line_no: usize) -> Result<Setting, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedSetting {
        line: line_no,
        reason: reason.to_string(),
    };

    let mut name = String::new();
    let mut help = String::new();
    let mut token = String::new();
    let mut offset = String::new();
    let mut width = String::new();
    let mut bios_default = String::new();
    let mut choices: Vec<Choice> = Vec::new();
    let mut starred: Option<String> = None;
    let mut value: Option<String> = None;
    let mut in_options = false;

    for line in raw.lines() {
        let code = strip_comment(line);
        let t = code.trim();
        if t.is_empty() {
            continue; // blank or fully commented line
        }
        if let Some(v) = field_value(code, "Setup Question") {
            name = v.to_string();
        } else if let Some(v) = field_value(code, "Help String") {
            help = v.to_string();
        } else if let Some(v) = field_value(code, "Token") {
            token = v.to_string();
        } else if let Some(v) = field_value(code, "Offset") {
            offset = v.to_string();
        } else if let Some(v) = field_value(code, "Width") {
            width = v.to_string();
        } else if let Some(v) = field_value(code, "BIOS Default") {
            bios_default = v.to_string();
        } else if let Some(v) = field_value(code, "Value") {
            value = Some(extract_angle_value(v));
        } else if t.starts_with("Options") || (in_options && t.contains('[')) {
            in_options = true;
            if let Some(caps) = option_re().captures(code) {
                let choice_value = caps[1].trim().to_string();
                let label = caps[2].trim().to_string();
                if code.contains('*') {
                    starred = Some(choice_value.clone());
                }
                choices.push(Choice::new(choice_value, label));
            }
        }
        // Anything else is tolerated noise within the block; the verbatim
        // span preserves it.
    }

    if name.is_empty() {
        return Err(malformed("missing Setup Question"));
    }
    if token.is_empty() {
        return Err(malformed("missing Token"));
    }

    let (kind, current) = if !choices.is_empty() {
        let current = starred
            .or_else(|| {
                // No marker: fall back to the BIOS default's bracket value,
                // then to the first choice.
                option_re()
                    .captures(&bios_default)
                    .map(|c| c[1].trim().to_string())
            })
            .or_else(|| choices.first().map(|c| c.value.clone()));
        match current {
            Some(current) => (SettingKind::Option { choices }, current),
            None => return Err(malformed("options present but no current value")),
        }
    } else if let Some(v) = value {
        decode_scalar(&name, &help, &width, v)
    } else {
        return Err(malformed("no Options or Value line"));
    };

    Ok(Setting::new(
        token,
        name,
        help,
        kind,
        offset,
        width,
        bios_default,
        current,
    ))
}

/// Kind inference for `Value = <...>` blocks: integers become Numeric with
/// bounds from the help-string `range:a ~ b` hint (else the field width);
/// 0/1 flags described as Enabled/Disabled are promoted to Option settings;
/// everything else is width-bounded Text.
fn decode_scalar(name: &str, help: &str, width: &str, v: String) -> (SettingKind, String) {
    let width_bytes = parse_integer(width).filter(|&w| w > 0).unwrap_or(8) as u32;

    match parse_integer(&v) {
        Some(n) => {
            if (n == 0 || n == 1) && mentions_enabled_disabled(name, help) {
                let choices = vec![Choice::new("1", "Enabled"), Choice::new("0", "Disabled")];
                return (SettingKind::Option { choices }, n.to_string());
            }
            let (min, max) = match range_hint_re().captures(help) {
                Some(caps) => {
                    let lo = caps[1].parse::<i64>().unwrap_or(0);
                    let hi = caps[2].parse::<i64>().unwrap_or(i64::MAX);
                    (lo.min(hi), lo.max(hi))
                }
                None => (0, width_max(width_bytes)),
            };
            let step = step_hint_re()
                .captures(help)
                .and_then(|caps| caps[1].parse::<i64>().ok())
                .filter(|&s| s > 0)
                .unwrap_or(1);
            (SettingKind::Numeric { min, max, step }, v)
        }
        None => (
            SettingKind::Text {
                max_len: width_bytes as usize,
            },
            v,
        ),
    }
}

/// Largest value representable in `bytes` bytes, saturating at i64::MAX.
fn width_max(bytes: u32) -> i64 {
    let bits = bytes.saturating_mul(8);
    if bits >= 63 {
        i64::MAX
    } else {
        (1i64 << bits) - 1
    }
}

fn mentions_enabled_disabled(name: &str, help: &str) -> bool {
    let haystack = format!("{} {}", name, help).to_lowercase();
    haystack.contains("enabled") && haystack.contains("disabled")
}

fn extract_angle_value(v: &str) -> String {
    if let (Some(open), Some(close)) = (v.find('<'), v.rfind('>')) {
        if open < close {
            return v[open + 1..close].to_string();
        }
    }
    v.to_string()
}

/// Re-emit one block with the minimal splice for its current value.
///
/// Blocks carrying a `Value` line (numeric, text, and promoted 0/1 flags)
/// get the `<...>` payload replaced. Option blocks get the `*` marker moved:
/// the old marker is removed from the code portion of its line and a new
/// one inserted directly before the active choice's `[`.
pub(crate) fn rewrite_block(raw: &str, setting: &Setting) -> String {
    let has_value_line = raw
        .lines()
        .any(|l| field_value(strip_comment(l), "Value").is_some());
    if has_value_line {
        rewrite_value_line(raw, setting.current_value())
    } else {
        rewrite_star_marker(raw, setting.current_value())
    }
}

fn rewrite_value_line(raw: &str, current: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for line in raw.split_inclusive('\n') {
        let code_end = line.find("//").unwrap_or(line.len());
        let code = &line[..code_end];
        if field_value(code, "Value").is_some() {
            if let (Some(open), Some(close)) = (code.find('<'), code.rfind('>')) {
                if open < close {
                    out.push_str(&line[..open + 1]);
                    out.push_str(current);
                    out.push_str(&line[close..]);
                    continue;
                }
            }
            // No angle brackets: replace everything after `=` in the code
            // portion, keep any comment.
            if let Some(eq) = code.find('=') {
                out.push_str(&line[..eq + 1]);
                out.push(' ');
                out.push_str(current);
                out.push_str(&line[code_end..]);
                continue;
            }
        }
        out.push_str(line);
    }
    out
}

fn rewrite_star_marker(raw: &str, current: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    for line in raw.split_inclusive('\n') {
        let code_end = line.find("//").unwrap_or(line.len());
        let code = &line[..code_end];
        let t = code.trim_start();
        let is_option_line = !t.is_empty()
            && (t.starts_with("Options")
                || t.starts_with('[')
                || (t.starts_with('*') && t[1..].trim_start().starts_with('[')))
            && code.contains('[');
        if !is_option_line {
            out.push_str(line);
            continue;
        }

        // Drop any existing marker from the code portion.
        let mut new_code = match code.find('*') {
            Some(i) => {
                let mut s = String::with_capacity(code.len());
                s.push_str(&code[..i]);
                s.push_str(&code[i + 1..]);
                s
            }
            None => code.to_string(),
        };
        // Mark this line if it carries the active choice.
        let is_active = option_re()
            .captures(&new_code)
            .map(|caps| caps[1].trim() == current)
            .unwrap_or(false);
        if is_active {
            if let Some(bracket) = new_code.find('[') {
                new_code.insert(bracket, '*');
            }
        }
        out.push_str(&new_code);
        out.push_str(&line[code_end..]);
    }
    out
}
