//! Parsed instruction to dial one number

use serde::Serialize;

use super::PhoneNumber;

/// Produced by the command interpreter, consumed by single-number submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialIntent {
    pub number: PhoneNumber,
    pub voice_preference: bool,
}

impl DialIntent {
    /// Replace the voice preference with an explicit caller choice, if any
    pub fn with_voice_override(mut self, voice: Option<bool>) -> Self {
        if let Some(voice) = voice {
            self.voice_preference = voice;
        }
        self
    }
}
