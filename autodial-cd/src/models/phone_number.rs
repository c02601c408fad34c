//! Canonical dialable phone number
//!
//! Grammar accepted for raw input:
//! - optional leading `+`
//! - digits, with ` `, `-`, `.`, `(`, `)` tolerated as punctuation
//! - 7 to 15 digits once punctuation is stripped
//!
//! The canonical form keeps only the `+` (if present) and the digits.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_DIGITS: usize = 7;
pub const MAX_DIGITS: usize = 15;

/// Why a raw entry was not accepted as a phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Nothing left after trimming
    Empty,
    /// Characters outside the number grammar, or a misplaced `+`
    InvalidFormat,
    /// Fewer than 7 digits
    TooShort,
    /// More than 15 digits
    TooLong,
    /// Same canonical number already accepted earlier in the list
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::Empty => "empty entry",
            RejectReason::InvalidFormat => "invalid format",
            RejectReason::TooShort => "too few digits",
            RejectReason::TooLong => "too many digits",
            RejectReason::Duplicate => "duplicate number",
        };
        f.write_str(text)
    }
}

/// Immutable, canonical dialable number (`+` optional, then digits only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and canonicalize a raw entry
    ///
    /// When `country_code` is given and the entry carries no `+`, a bare
    /// 10-digit national number becomes `+<cc><digits>` and a number that
    /// already starts with the country code gains a leading `+`.
    pub fn parse(raw: &str, country_code: Option<&str>) -> Result<Self, RejectReason> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RejectReason::Empty);
        }

        let (has_plus, body) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(RejectReason::InvalidFormat),
            }
        }
        if digits.is_empty() {
            return Err(RejectReason::InvalidFormat);
        }

        let canonical = match (has_plus, country_code) {
            (true, _) => format!("+{}", digits),
            (false, Some(cc)) if digits.len() == 10 => format!("+{}{}", cc, digits),
            (false, Some(cc)) if digits.len() == 10 + cc.len() && digits.starts_with(cc) => {
                format!("+{}", digits)
            }
            (false, _) => digits,
        };

        let digit_count = canonical.len() - usize::from(canonical.starts_with('+'));
        if digit_count < MIN_DIGITS {
            return Err(RejectReason::TooShort);
        }
        if digit_count > MAX_DIGITS {
            return Err(RejectReason::TooLong);
        }

        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, without the leading `+`
    pub fn digits(&self) -> &str {
        self.0.trim_start_matches('+')
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
