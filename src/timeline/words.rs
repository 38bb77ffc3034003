use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{CaptionError, CaptionResult};

/// One transcribed word with its spoken interval in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordToken {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl WordToken {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// Validated, start-ordered word sequence for one video.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WordTimeline {
    words: Vec<WordToken>,
}

impl WordTimeline {
    /// Validate and wrap `words`.
    ///
    /// Words must have finite, non-negative times with `start < end`, and be ordered by
    /// non-decreasing `start`.
    pub fn new(words: Vec<WordToken>) -> CaptionResult<Self> {
        for (i, w) in words.iter().enumerate() {
            if !w.start.is_finite() || !w.end.is_finite() {
                return Err(CaptionError::timeline(format!(
                    "word #{i} \"{}\" has non-finite times",
                    w.text
                )));
            }
            if w.start < 0.0 {
                return Err(CaptionError::timeline(format!(
                    "word #{i} \"{}\" starts before 0s",
                    w.text
                )));
            }
            if w.start >= w.end {
                return Err(CaptionError::timeline(format!(
                    "word #{i} \"{}\" must have start < end (got {} >= {})",
                    w.text, w.start, w.end
                )));
            }
            if i > 0 && w.start < words[i - 1].start {
                return Err(CaptionError::timeline(format!(
                    "word #{i} \"{}\" starts before the previous word",
                    w.text
                )));
            }
        }
        Ok(Self { words })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a word file: a bare array of words or an object with a `words` array.
    pub fn from_json_str(json: &str) -> CaptionResult<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WordFile {
            Bare(Vec<WordToken>),
            Wrapped { words: Vec<WordToken> },
        }

        let file: WordFile = serde_json::from_str(json)
            .map_err(|e| CaptionError::timeline(format!("malformed word json: {e}")))?;
        let words = match file {
            WordFile::Bare(words) | WordFile::Wrapped { words } => words,
        };
        Self::new(words)
    }

    pub fn load(path: &Path) -> CaptionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CaptionError::timeline(format!("failed to read words '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn words(&self) -> &[WordToken] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Latest word end, or 0 for an empty timeline.
    pub fn end_secs(&self) -> f64 {
        self.words.iter().map(|w| w.end).fold(0.0, f64::max)
    }
}

const STRIP_CHARS: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
];

/// Text actually drawn for a word: trimmed, optionally stripped of surrounding punctuation and
/// uppercased. A word that would become empty keeps its trimmed raw text.
pub fn display_text(raw: &str, strip_punctuation: bool, uppercase: bool) -> String {
    let trimmed = raw.trim();
    let mut s = if strip_punctuation {
        trimmed.trim_matches(STRIP_CHARS)
    } else {
        trimmed
    };
    if s.is_empty() {
        s = trimmed;
    }
    if uppercase {
        s.to_uppercase()
    } else {
        s.to_owned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/words.rs"]
mod tests;
