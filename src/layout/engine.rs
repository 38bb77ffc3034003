use serde::Serialize;

use crate::foundation::error::{CaptionError, CaptionResult, CaptionWarning};
use crate::geometry::aspect::SafeZoneRect;
use crate::style::config::{HorizontalAlign, StyleConfig, VerticalAlign};
use crate::text::shaper::{FontMetrics, GlyphRun, TextShaper};
use crate::timeline::words::{WordTimeline, WordToken, display_text};

const WIDTH_EPS: f32 = 1e-3;

/// A word with its shaped glyphs, positioned inside its line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedWord {
    /// Index into the word timeline.
    pub index: usize,
    /// Display text (cleaned and transformed).
    pub text: String,
    /// Offset from the line's `start_x`.
    pub x: f32,
    pub width: f32,
    #[serde(skip)]
    pub glyphs: GlyphRun,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub words: Vec<PlacedWord>,
    pub baseline_y: f32,
    pub start_x: f32,
    pub measured_width: f32,
    /// Set when the line holds one word wider than the usable width.
    pub overflow: bool,
}

/// A group of consecutive words shown together, broken into lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionBlock {
    /// Timeline index of the first word.
    pub first_word: usize,
    pub words: Vec<WordToken>,
    pub lines: Vec<Line>,
    /// Visible from `start` (inclusive) to `end` (exclusive), in seconds.
    pub start: f64,
    pub end: f64,
}

impl CaptionBlock {
    pub fn contains_time(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn placed_words(&self) -> impl Iterator<Item = (&Line, &PlacedWord)> {
        self.lines
            .iter()
            .flat_map(|line| line.words.iter().map(move |w| (line, w)))
    }
}

/// Layout of a whole timeline for one frame geometry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub blocks: Vec<CaptionBlock>,
    pub warnings: Vec<CaptionWarning>,
    pub font_size_px: f32,
    pub metrics: FontMetrics,
    pub safe_zone: SafeZoneRect,
    pub usable_width: f32,
}

impl Layout {
    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(|b| b.words.len()).sum()
    }
}

#[derive(Default)]
struct PendingLine {
    words: Vec<PlacedWord>,
    width: f32,
    chars: usize,
}

impl PendingLine {
    fn fits(&self, width: f32, chars: usize, space: f32, limits: &Limits) -> bool {
        if self.words.is_empty() {
            return true;
        }
        if self.width + space + width > limits.usable_width + WIDTH_EPS {
            return false;
        }
        match limits.max_chars {
            Some(max) => self.chars + 1 + chars <= max,
            None => true,
        }
    }

    fn push(&mut self, mut word: PlacedWord, chars: usize, space: f32) {
        if self.words.is_empty() {
            word.x = 0.0;
            self.width = word.width;
            self.chars = chars;
        } else {
            word.x = self.width + space;
            self.width += space + word.width;
            self.chars += 1 + chars;
        }
        self.words.push(word);
    }

    fn is_overflow(&self, limits: &Limits) -> bool {
        self.words.len() == 1
            && (self.width > limits.usable_width + WIDTH_EPS
                || limits.max_chars.is_some_and(|m| self.chars > m))
    }
}

struct PendingBlock {
    first_word: usize,
    words: Vec<WordToken>,
    lines: Vec<PendingLine>,
}

impl PendingBlock {
    fn new(first_word: usize) -> Self {
        Self {
            first_word,
            words: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Whether `next` has to open a new block regardless of line space.
    fn closes_before(&self, next: &WordToken, style: &StyleConfig) -> bool {
        let (Some(first), Some(last)) = (self.words.first(), self.words.last()) else {
            return false;
        };
        if style
            .max_words_per_block
            .is_some_and(|max| self.words.len() >= max)
        {
            return true;
        }
        if style
            .max_block_duration_ms
            .is_some_and(|ms| next.end - first.start > ms / 1000.0)
        {
            return true;
        }
        style
            .max_gap_ms
            .is_some_and(|ms| next.start - last.end > ms / 1000.0)
    }
}

struct Limits {
    usable_width: f32,
    max_chars: Option<usize>,
}

/// Group the timeline into caption blocks and position every word.
///
/// `style` must already be resolved for the frame width (see
/// [`StyleConfig::resolved_for_width`]); its `font_size` is used as-is.
#[tracing::instrument(skip_all, fields(words = timeline.len()))]
pub fn layout_timeline(
    timeline: &WordTimeline,
    style: &StyleConfig,
    safe_zone: SafeZoneRect,
    shaper: &mut dyn TextShaper,
) -> CaptionResult<Layout> {
    let size = style.font_size;
    let metrics = shaper.metrics(size)?;
    let space = shaper.shape(" ", size)?.advance;
    let limits = Limits {
        usable_width: match style.max_line_width {
            Some(w) => w.min(safe_zone.width as f32),
            None => safe_zone.width as f32,
        },
        max_chars: style.max_chars_per_line,
    };

    let mut layout = Layout {
        blocks: Vec::new(),
        warnings: Vec::new(),
        font_size_px: size,
        metrics,
        safe_zone,
        usable_width: limits.usable_width,
    };

    if timeline.is_empty() {
        tracing::warn!("word timeline is empty; video will pass through without captions");
        layout.warnings.push(CaptionWarning::EmptyTimeline);
        return Ok(layout);
    }

    let mut current: Option<PendingBlock> = None;
    for (i, token) in timeline.words().iter().enumerate() {
        let text = display_text(&token.text, style.strip_punctuation, style.uppercase);
        let shaped = shaper.shape(&text, size)?;
        let chars = text.chars().count();
        let placed = PlacedWord {
            index: i,
            text,
            x: 0.0,
            width: shaped.advance,
            glyphs: shaped.glyphs.into(),
        };

        if let Some(block) = current.take_if(|b| b.closes_before(token, style)) {
            finish_block(block, style, &limits, &mut layout)?;
        }
        let mut block = current.take().unwrap_or_else(|| PendingBlock::new(i));

        let fits_last = block
            .lines
            .last()
            .is_some_and(|l| l.fits(placed.width, chars, space, &limits));
        if !fits_last {
            if block.lines.len() >= style.max_lines_per_block {
                finish_block(block, style, &limits, &mut layout)?;
                block = PendingBlock::new(i);
            }
            block.lines.push(PendingLine::default());
        }
        if let Some(line) = block.lines.last_mut() {
            line.push(placed, chars, space);
        }
        block.words.push(token.clone());
        current = Some(block);
    }
    if let Some(block) = current {
        finish_block(block, style, &limits, &mut layout)?;
    }

    Ok(layout)
}

fn finish_block(
    block: PendingBlock,
    style: &StyleConfig,
    limits: &Limits,
    layout: &mut Layout,
) -> CaptionResult<()> {
    let (Some(first), Some(last)) = (block.words.first(), block.words.last()) else {
        return Ok(());
    };
    let (start, end) = (first.start, last.end);
    let block_index = layout.blocks.len();
    let safe = layout.safe_zone;

    let n = block.lines.len() as f32;
    let line_height = layout.metrics.line_height();
    let block_height = n * line_height + (n - 1.0).max(0.0) * style.line_spacing;
    let group_top = match style.vertical_align {
        VerticalAlign::Top => safe.y as f32,
        VerticalAlign::Center => safe.y as f32 + (safe.height as f32 - block_height) / 2.0,
        VerticalAlign::Bottom => safe.bottom() as f32 - block_height,
    }
    .max(safe.y as f32);

    let mut lines = Vec::with_capacity(block.lines.len());
    for (li, pending) in block.lines.into_iter().enumerate() {
        let overflow = pending.is_overflow(limits);
        if overflow {
            let word = &pending.words[0];
            let warning = CaptionWarning::LineOverflow {
                block: block_index,
                line: li,
                word: word.index,
                text: word.text.clone(),
                width_px: pending.width,
                max_width_px: limits.usable_width,
            };
            if style.strict_layout {
                return Err(CaptionError::overflow(warning.to_string()));
            }
            tracing::warn!(%warning, "caption line overflows the safe zone");
            layout.warnings.push(warning);
        }

        let width = pending.width;
        let start_x = match style.horizontal_align {
            HorizontalAlign::Left => safe.x as f32,
            HorizontalAlign::Center => safe.x as f32 + (safe.width as f32 - width) / 2.0,
            HorizontalAlign::Right => safe.right() as f32 - width,
        }
        .max(safe.x as f32);

        lines.push(Line {
            words: pending.words,
            baseline_y: group_top
                + layout.metrics.ascent
                + li as f32 * (line_height + style.line_spacing),
            start_x,
            measured_width: width,
            overflow,
        });
    }

    tracing::debug!(
        block = block_index,
        words = block.words.len(),
        lines = lines.len(),
        start,
        end,
        "caption block laid out"
    );
    layout.blocks.push(CaptionBlock {
        first_word: block.first_word,
        words: block.words,
        lines,
        start,
        end,
    });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/layout/engine.rs"]
mod tests;
