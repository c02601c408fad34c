//! Number list validation
//!
//! Turns raw operator input into canonical numbers. Partial bad input never
//! fails the whole list: malformed entries are reported next to the
//! accepted ones and the caller decides what an empty result means.

use autodial_common::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::{PhoneNumber, RejectReason};

/// Raw entry that did not make it into the accepted list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub raw: String,
    pub reason: RejectReason,
}

/// Result of normalizing one submitted list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedNumbers {
    /// Accepted numbers, in input order
    pub accepted: Vec<PhoneNumber>,
    pub rejected: Vec<RejectedEntry>,
}

/// Number list validator
#[derive(Debug, Clone, Default)]
pub struct NumberListValidator {
    country_code: Option<String>,
}

impl NumberListValidator {
    /// Create a validator, optionally applying a default country code
    ///
    /// The country code may be written with or without a leading `+` and
    /// must be 1-3 digits.
    pub fn new(country_code: Option<&str>) -> Result<Self> {
        let country_code = match country_code.map(|cc| cc.trim().trim_start_matches('+')) {
            None | Some("") => None,
            Some(cc) if (1..=3).contains(&cc.len()) && cc.bytes().all(|b| b.is_ascii_digit()) => {
                Some(cc.to_string())
            }
            Some(cc) => {
                return Err(Error::InvalidInput(format!(
                    "default_country_code must be 1-3 digits, got '{}'",
                    cc
                )))
            }
        };
        Ok(Self { country_code })
    }

    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    /// Parse a single entry with this validator's country code
    pub fn parse_one(&self, raw: &str) -> std::result::Result<PhoneNumber, RejectReason> {
        PhoneNumber::parse(raw, self.country_code())
    }

    /// Normalize a list of raw entries
    ///
    /// Entries containing line breaks are split into lines. Blank lines are
    /// dropped silently. Repeated numbers are kept once (first occurrence).
    pub fn normalize<I, S>(&self, raw: I) -> NormalizedNumbers
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = NormalizedNumbers::default();
        let mut seen = HashSet::new();

        for entry in raw {
            for line in entry.as_ref().lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match self.parse_one(line) {
                    Ok(number) if seen.insert(number.clone()) => result.accepted.push(number),
                    Ok(_) => result.rejected.push(RejectedEntry {
                        raw: line.to_string(),
                        reason: RejectReason::Duplicate,
                    }),
                    Err(reason) => result.rejected.push(RejectedEntry {
                        raw: line.to_string(),
                        reason,
                    }),
                }
            }
        }

        tracing::debug!(
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            "Normalized number list"
        );
        result
    }
}
