use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::geometry::aspect::AspectMismatch;
use crate::style::color::Color;

/// Horizontal placement of each line inside the safe zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical placement of the whole block inside the safe zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// How the active word is emphasized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationKind {
    /// Active word scales up from `popScaleFrom` to `popScaleTo` in the highlight color.
    #[default]
    Pop,
    /// Highlight color fades in (and back out before the next word).
    Fade,
    /// A rounded box grows behind the active word from left to right.
    HighlightSweep,
    /// Active word switches to the highlight color without transition.
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowStyle {
    pub color: Color,
    pub offset: [f32; 2],
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            color: Color::rgba(0, 0, 0, 0xE6),
            offset: [6.0, 6.0],
        }
    }
}

/// Safe-zone margins as fractions of the padded frame size.
///
/// The defaults keep captions clear of the UI chrome short-form players draw over the video
/// (252/756/120/240 px at 1080x1920).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeZoneMargins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for SafeZoneMargins {
    fn default() -> Self {
        Self {
            top: 252.0 / 1920.0,
            bottom: 756.0 / 1920.0,
            left: 120.0 / 1080.0,
            right: 240.0 / 1080.0,
        }
    }
}

impl SafeZoneMargins {
    fn validate(&self) -> CaptionResult<()> {
        for (name, v) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !v.is_finite() || !(0.0..1.0).contains(&v) {
                return Err(CaptionError::config(format!(
                    "safeZoneMargins.{name} must be a fraction in [0, 1), got {v}"
                )));
            }
        }
        if self.top + self.bottom >= 1.0 {
            return Err(CaptionError::config(
                "safeZoneMargins top + bottom must be < 1",
            ));
        }
        if self.left + self.right >= 1.0 {
            return Err(CaptionError::config(
                "safeZoneMargins left + right must be < 1",
            ));
        }
        Ok(())
    }
}

/// Target frame aspect ratio `num:den` (width:height).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const VERTICAL: Self = Self { num: 9, den: 16 };

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::VERTICAL
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.num, self.den)
    }
}

impl Serialize for AspectRatio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Pair([u32; 2]),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => {
                let (n, d) = s
                    .split_once(':')
                    .ok_or_else(|| serde::de::Error::custom("aspect ratio must look like \"9:16\""))?;
                let num = n.trim().parse::<u32>().map_err(serde::de::Error::custom)?;
                let den = d.trim().parse::<u32>().map_err(serde::de::Error::custom)?;
                Ok(Self { num, den })
            }
            Repr::Pair([num, den]) => Ok(Self { num, den }),
        }
    }
}

/// Validated, typed style options for one run.
///
/// Keys are camelCase in JSON; unknown keys are ignored and missing keys take the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub font: PathBuf,
    pub font_size: f32,
    pub scale_font_to_width: bool,
    pub reference_width: u32,

    pub primary_color: Color,
    pub highlight_color: Color,
    pub highlight_box_color: Color,
    pub highlight_padding: [f32; 2],
    pub highlight_radius: f32,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub shadow: Option<ShadowStyle>,
    pub line_spacing: f32,

    pub max_lines_per_block: usize,
    pub max_line_width: Option<f32>,
    pub max_chars_per_line: Option<usize>,
    pub max_words_per_block: Option<usize>,
    pub max_block_duration_ms: Option<f64>,
    pub max_gap_ms: Option<f64>,
    pub strict_layout: bool,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    pub uppercase: bool,
    pub strip_punctuation: bool,

    pub animation_kind: AnimationKind,
    pub animation_duration_ms: f64,
    pub easing: Ease,
    pub pop_scale_from: f64,
    pub pop_scale_to: f64,
    pub hold_active_until_next_word: bool,

    pub safe_zone_margins: SafeZoneMargins,
    pub target_aspect_ratio: AspectRatio,
    pub aspect_tolerance: f64,
    /// When false, sources of any ratio are captioned at their own size.
    pub enforce_target_aspect: bool,
    /// When true, a source off the target ratio fails instead of being padded.
    pub reject_invalid_aspect: bool,
    pub padding_color: Color,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font: PathBuf::from("fonts/ArchivoBlack-Regular.ttf"),
            font_size: 80.0,
            scale_font_to_width: true,
            reference_width: 1080,
            primary_color: Color::WHITE,
            highlight_color: Color::rgb(0xFF, 0xD4, 0x00),
            highlight_box_color: Color::rgb(0x58, 0x46, 0xDD),
            highlight_padding: [10.0, 5.0],
            highlight_radius: 15.0,
            stroke_color: Color::BLACK,
            stroke_width: 10.0,
            shadow: Some(ShadowStyle::default()),
            line_spacing: 10.0,
            max_lines_per_block: 2,
            max_line_width: None,
            max_chars_per_line: None,
            max_words_per_block: Some(6),
            max_block_duration_ms: Some(1500.0),
            max_gap_ms: Some(200.0),
            strict_layout: false,
            horizontal_align: HorizontalAlign::Center,
            vertical_align: VerticalAlign::Center,
            uppercase: true,
            strip_punctuation: true,
            animation_kind: AnimationKind::Pop,
            animation_duration_ms: 300.0,
            easing: Ease::OutCubic,
            pop_scale_from: 0.8,
            pop_scale_to: 1.0,
            hold_active_until_next_word: true,
            safe_zone_margins: SafeZoneMargins::default(),
            target_aspect_ratio: AspectRatio::VERTICAL,
            aspect_tolerance: 0.02,
            enforce_target_aspect: true,
            reject_invalid_aspect: false,
            padding_color: Color::BLACK,
        }
    }
}

impl StyleConfig {
    /// Parse and validate a style from JSON text. The font path is not checked.
    pub fn from_json_str(json: &str) -> CaptionResult<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CaptionError::config(format!("style json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a style file, resolve a relative `font` against the file's directory, validate, and
    /// check that the font exists.
    #[tracing::instrument]
    pub fn load(path: &Path) -> CaptionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CaptionError::config(format!("failed to read style '{}': {e}", path.display()))
        })?;
        let mut cfg = Self::from_json_str(&text)?;
        if cfg.font.is_relative()
            && let Some(dir) = path.parent()
        {
            let beside = dir.join(&cfg.font);
            if beside.exists() {
                cfg.font = beside;
            }
        }
        cfg.check_font_exists()?;
        tracing::debug!(font = %cfg.font.display(), kind = ?cfg.animation_kind, "style loaded");
        Ok(cfg)
    }

    pub fn check_font_exists(&self) -> CaptionResult<()> {
        if !self.font.is_file() {
            return Err(CaptionError::config(format!(
                "font '{}' does not exist",
                self.font.display()
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> CaptionResult<()> {
        fn positive(name: &str, v: f64) -> CaptionResult<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(CaptionError::config(format!(
                    "{name} must be finite and > 0, got {v}"
                )));
            }
            Ok(())
        }
        fn non_negative(name: &str, v: f64) -> CaptionResult<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(CaptionError::config(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
            Ok(())
        }

        if self.font.as_os_str().is_empty() {
            return Err(CaptionError::config("font must be set"));
        }
        positive("fontSize", f64::from(self.font_size))?;
        if self.reference_width == 0 {
            return Err(CaptionError::config("referenceWidth must be > 0"));
        }
        non_negative("strokeWidth", f64::from(self.stroke_width))?;
        non_negative("lineSpacing", f64::from(self.line_spacing))?;
        non_negative("highlightPadding[0]", f64::from(self.highlight_padding[0]))?;
        non_negative("highlightPadding[1]", f64::from(self.highlight_padding[1]))?;
        non_negative("highlightRadius", f64::from(self.highlight_radius))?;
        if let Some(shadow) = &self.shadow
            && !(shadow.offset[0].is_finite() && shadow.offset[1].is_finite())
        {
            return Err(CaptionError::config("shadow.offset must be finite"));
        }

        if self.max_lines_per_block == 0 {
            return Err(CaptionError::config("maxLinesPerBlock must be >= 1"));
        }
        if let Some(w) = self.max_line_width {
            positive("maxLineWidth", f64::from(w))?;
        }
        if self.max_chars_per_line == Some(0) {
            return Err(CaptionError::config("maxCharsPerLine must be >= 1 when set"));
        }
        if self.max_words_per_block == Some(0) {
            return Err(CaptionError::config("maxWordsPerBlock must be >= 1 when set"));
        }
        if let Some(ms) = self.max_block_duration_ms {
            positive("maxBlockDurationMs", ms)?;
        }
        if let Some(ms) = self.max_gap_ms {
            non_negative("maxGapMs", ms)?;
        }

        non_negative("animationDurationMs", self.animation_duration_ms)?;
        positive("popScaleFrom", self.pop_scale_from)?;
        positive("popScaleTo", self.pop_scale_to)?;

        self.safe_zone_margins.validate()?;
        if self.target_aspect_ratio.num == 0 || self.target_aspect_ratio.den == 0 {
            return Err(CaptionError::config(
                "targetAspectRatio width and height must be > 0",
            ));
        }
        non_negative("aspectTolerance", self.aspect_tolerance)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> CaptionResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CaptionError::serde(e.to_string()))
    }

    /// Copy of this style with every pixel-valued option resolved for a padded frame of
    /// `padded_width`.
    ///
    /// With `scaleFontToWidth`, sizes are authored against `referenceWidth` and scaled linearly;
    /// the returned style has `scaleFontToWidth` cleared so resolving twice is a no-op.
    pub fn resolved_for_width(&self, padded_width: u32) -> Self {
        let mut out = self.clone();
        if !self.scale_font_to_width {
            return out;
        }
        let k = padded_width as f32 / self.reference_width as f32;
        out.font_size *= k;
        out.stroke_width *= k;
        out.line_spacing *= k;
        out.highlight_padding = [self.highlight_padding[0] * k, self.highlight_padding[1] * k];
        out.highlight_radius *= k;
        out.max_line_width = self.max_line_width.map(|w| w * k);
        if let Some(shadow) = out.shadow.as_mut() {
            shadow.offset = [shadow.offset[0] * k, shadow.offset[1] * k];
        }
        out.scale_font_to_width = false;
        out
    }

    /// Handling of sources whose ratio misses `targetAspectRatio`.
    pub fn aspect_mismatch(&self) -> AspectMismatch {
        match (self.enforce_target_aspect, self.reject_invalid_aspect) {
            (false, _) => AspectMismatch::Keep,
            (true, true) => AspectMismatch::Reject,
            (true, false) => AspectMismatch::Pad,
        }
    }

    pub fn animation_duration_secs(&self) -> f64 {
        self.animation_duration_ms / 1000.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/style/config.rs"]
mod tests;
