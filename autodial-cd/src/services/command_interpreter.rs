//! Free-form command interpretation
//!
//! Turns typed or transcribed text ("please dial 1-800-555-1234 now") into a
//! [`DialIntent`]. A dialable number is both required and sufficient; action
//! verbs ("call", "dial", "make a call to", ...) only serve to pick the target
//! when several distinct numbers appear.
//!
//! Resolution when more than one distinct number is present:
//! 1. exactly one number directly follows an action verb → that number
//! 2. otherwise, under [`AmbiguityPolicy::First`] the first occurrence wins
//!    (the first verb-anchored one if several are anchored); under
//!    [`AmbiguityPolicy::Reject`] the command fails with `AmbiguousCommand`.

use autodial_common::config::AmbiguityPolicy;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::{DialIntent, PhoneNumber, RejectReason};
use crate::services::NumberListValidator;

/// Digit runs with light punctuation and at most one space between groups
static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\+?\(?\d(?:[().\-]*\s?[().\-]*\d)*\)?").expect("candidate regex")
});

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("token regex"));

/// Action verb phrase immediately preceding a number
static VERB_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:call|dial|ring|phone)(?:\s+(?:to|up|number|at))*[\s:,\-]*$")
        .expect("verb regex")
});

static SPOKEN_DIGIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(zero|one|two|three|four|five|six|seven|eight|nine)\b")
        .expect("spoken digit regex")
});

static VOICE_OFF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:without|no|disable|skip)\s+(?:the\s+)?(?:ai\s+)?voice\b|\bhuman\s+voice\b")
        .expect("voice-off regex")
});

static VOICE_ON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:with|use|using|enable)\s+(?:the\s+)?(?:ai\s+)?voice\b")
        .expect("voice-on regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("No phone number found in command")]
    NoNumberFound,

    #[error("Command contains several numbers ({}), cannot tell which one to call", .candidates.join(", "))]
    AmbiguousCommand { candidates: Vec<String> },
}

/// Number found in the text and whether an action verb led to it
#[derive(Debug, Clone)]
struct Candidate {
    number: PhoneNumber,
    anchored: bool,
}

/// Command interpreter
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    validator: NumberListValidator,
    policy: AmbiguityPolicy,
    default_voice: bool,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(NumberListValidator::default(), AmbiguityPolicy::First)
    }
}

impl CommandInterpreter {
    pub fn new(validator: NumberListValidator, policy: AmbiguityPolicy) -> Self {
        Self {
            validator,
            policy,
            default_voice: true,
        }
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Interpret one command
    ///
    /// Pure: no I/O, same input always yields the same result.
    pub fn interpret(&self, text: &str) -> Result<DialIntent, InterpretError> {
        let text = spoken_digits_to_numerals(&text.to_lowercase());

        let candidates = self.find_candidates(&text);
        let number = self.choose(candidates)?;

        let voice_preference = if VOICE_OFF_RE.is_match(&text) {
            false
        } else if VOICE_ON_RE.is_match(&text) {
            true
        } else {
            self.default_voice
        };

        tracing::debug!(number = %number, voice_preference, "Interpreted command");
        Ok(DialIntent {
            number,
            voice_preference,
        })
    }

    /// Distinct valid numbers in order of first appearance
    fn find_candidates(&self, text: &str) -> Vec<Candidate> {
        let mut found: Vec<Candidate> = Vec::new();
        let mut push = |number: PhoneNumber, start: usize| {
            let anchored = VERB_SUFFIX_RE.is_match(&text[..start]);
            match found.iter_mut().find(|c| c.number == number) {
                Some(existing) => existing.anchored |= anchored,
                None => found.push(Candidate { number, anchored }),
            }
        };

        for m in CANDIDATE_RE.find_iter(text) {
            let run = self.strip_trailing_count(m.as_str());
            match self.validator.parse_one(run) {
                Ok(number) => push(number, m.start()),
                // Two numbers separated by one space read as a single run
                Err(RejectReason::TooLong) => {
                    for token in TOKEN_RE.find_iter(run) {
                        if let Ok(number) = self.validator.parse_one(token.as_str()) {
                            push(number, m.start() + token.start());
                        }
                    }
                }
                Err(_) => {}
            }
        }
        found
    }

    /// Drop a trailing 1-2 digit group that reads as a count or stray word
    /// ("call 1800 555 1234 2 times")
    ///
    /// The group is only dropped when it is shorter than the group before it
    /// and the rest of the run is a valid number on its own, so evenly grouped
    /// numbers like "01 23 45 67 89" stay whole.
    fn strip_trailing_count<'a>(&self, run: &'a str) -> &'a str {
        let groups: Vec<_> = TOKEN_RE.find_iter(run).collect();
        let [.., previous, last] = groups.as_slice() else {
            return run;
        };

        let last_digits = digit_count(last.as_str());
        if last_digits > 2 || digit_count(previous.as_str()) <= last_digits {
            return run;
        }

        let head = run[..last.start()].trim_end();
        match self.validator.parse_one(head) {
            Ok(_) => head,
            Err(_) => run,
        }
    }

    fn choose(&self, candidates: Vec<Candidate>) -> Result<PhoneNumber, InterpretError> {
        if candidates.len() <= 1 {
            return candidates
                .into_iter()
                .next()
                .map(|c| c.number)
                .ok_or(InterpretError::NoNumberFound);
        }

        let anchored: Vec<&Candidate> = candidates.iter().filter(|c| c.anchored).collect();
        if anchored.len() == 1 {
            return Ok(anchored[0].number.clone());
        }

        match self.policy {
            AmbiguityPolicy::First => Ok(anchored
                .first()
                .copied()
                .unwrap_or(&candidates[0])
                .number
                .clone()),
            AmbiguityPolicy::Reject => Err(InterpretError::AmbiguousCommand {
                candidates: candidates.iter().map(|c| c.number.to_string()).collect(),
            }),
        }
    }
}

fn digit_count(group: &str) -> usize {
    group.bytes().filter(u8::is_ascii_digit).count()
}

/// "one eight hundred" style transcripts: map digit words to numerals
fn spoken_digits_to_numerals(text: &str) -> String {
    SPOKEN_DIGIT_RE
        .replace_all(text, |caps: &Captures| {
            match &caps[1] {
                "zero" => "0",
                "one" => "1",
                "two" => "2",
                "three" => "3",
                "four" => "4",
                "five" => "5",
                "six" => "6",
                "seven" => "7",
                "eight" => "8",
                _ => "9",
            }
            .to_string()
        })
        .into_owned()
}
