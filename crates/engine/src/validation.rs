//! Input validation for proposed setting values.
//!
//! Pure functions over (constraint, proposed value) - no I/O, no shared
//! state, callable concurrently without coordination. The store calls
//! [`validate`] before every mutation; a rejected value never reaches
//! storage.
//!
//! ## Case sensitivity
//!
//! Option matching is case-sensitive and exact: "01" != "1", "Enabled"
//! labels play no part in identity. Search is the forgiving layer;
//! validation is not.

use crate::setting::{Setting, SettingKind};

/// Reason a proposed value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Proposed value is not one of the Option setting's allowed values.
    NotAnAllowedOption,
    /// Integer outside [min, max], or unreachable by the declared step.
    OutOfRange,
    /// Proposed value for a Numeric setting does not parse as an integer.
    NotAnInteger,
    /// Text value exceeds the maximum length.
    TooLong,
    /// Text value contains a character outside the allowed class.
    IllegalCharacter,
    /// Empty proposals are rejected for every kind; a BIOS setting can
    /// never be legitimately blank.
    EmptyValue,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotAnAllowedOption => write!(f, "value is not an allowed option"),
            ValidationError::OutOfRange => write!(f, "value is out of range"),
            ValidationError::NotAnInteger => write!(f, "value is not an integer"),
            ValidationError::TooLong => write!(f, "value exceeds the maximum length"),
            ValidationError::IllegalCharacter => write!(f, "value contains an illegal character"),
            ValidationError::EmptyValue => write!(f, "value must not be empty"),
        }
    }
}

/// Validate a proposed value against a setting's constraint.
pub fn validate(setting: &Setting, proposed: &str) -> Result<(), ValidationError> {
    validate_value(&setting.kind, proposed)
}

/// Validate against a bare constraint, without a full `Setting` in hand.
pub fn validate_value(kind: &SettingKind, proposed: &str) -> Result<(), ValidationError> {
    if proposed.is_empty() {
        return Err(ValidationError::EmptyValue);
    }
    match kind {
        SettingKind::Option { choices } => {
            if choices.iter().any(|c| c.value == proposed) {
                Ok(())
            } else {
                Err(ValidationError::NotAnAllowedOption)
            }
        }
        SettingKind::Numeric { min, max, step } => {
            let v = parse_integer(proposed).ok_or(ValidationError::NotAnInteger)?;
            if v < *min || v > *max {
                return Err(ValidationError::OutOfRange);
            }
            if *step > 1 && (v - *min) % *step != 0 {
                return Err(ValidationError::OutOfRange);
            }
            Ok(())
        }
        SettingKind::Text { max_len } => {
            if proposed.chars().count() > *max_len {
                return Err(ValidationError::TooLong);
            }
            if proposed.chars().any(|c| !is_allowed_text_char(c)) {
                return Err(ValidationError::IllegalCharacter);
            }
            Ok(())
        }
    }
}

/// Parse an integer the way the export format writes them: plain decimal
/// (optionally signed) or `0x`-prefixed hex.
pub fn parse_integer(s: &str) -> Option<i64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let (sign, body) = match t.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, t.strip_prefix('+').unwrap_or(t)),
    };
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<i64>().ok()?
    };
    magnitude.checked_mul(sign)
}

/// Character class the import tool accepts in free-form values:
/// printable ASCII, no control characters.
fn is_allowed_text_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control()
}
