use std::fmt;

pub type CaptionResult<T> = Result<T, CaptionError>;

#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("layout overflow: {0}")]
    LayoutOverflow(String),

    #[error("timeline error: {0}")]
    Timeline(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaptionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::LayoutOverflow(msg.into())
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Config errors abort a whole run; every other error only fails the current video.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(self, Self::ConfigValidation(_))
    }
}

/// Non-fatal condition reported alongside a successful layout.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptionWarning {
    /// The word timeline had no words; the video passes through without captions.
    EmptyTimeline,
    /// A single word is wider than the usable line width and was placed alone on its line.
    #[serde(rename_all = "camelCase")]
    LineOverflow {
        block: usize,
        line: usize,
        word: usize,
        text: String,
        width_px: f32,
        max_width_px: f32,
    },
}

impl fmt::Display for CaptionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTimeline => write!(f, "word timeline is empty; no captions rendered"),
            Self::LineOverflow {
                block,
                line,
                word,
                text,
                width_px,
                max_width_px,
            } => write!(
                f,
                "word #{word} \"{text}\" ({width_px:.1}px) exceeds usable width {max_width_px:.1}px \
                 (block {block}, line {line})"
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
