//! Text shaping seam between the layout engine and the font stack.

use std::borrow::Cow;
use std::sync::Arc;

use crate::assets::font::LoadedFont;
use crate::foundation::error::{CaptionError, CaptionResult};

/// A glyph positioned relative to the word origin (left edge, on the baseline).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Shaped run for one word.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    /// Horizontal advance in pixels.
    pub advance: f32,
    pub glyphs: Vec<ShapedGlyph>,
}

/// Vertical font metrics at one size, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl FontMetrics {
    pub fn line_height(self) -> f32 {
        self.ascent + self.descent
    }
}

/// Measures and shapes text for layout.
pub trait TextShaper {
    fn shape(&mut self, text: &str, size_px: f32) -> CaptionResult<ShapedText>;
    fn metrics(&mut self, size_px: f32) -> CaptionResult<FontMetrics>;
}

/// `parley`-backed shaper over a single loaded font.
pub struct FontShaper {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family_name: String,
}

impl FontShaper {
    pub fn new(font: &LoadedFont) -> CaptionResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(font.bytes().to_vec()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            CaptionError::config(format!(
                "no font families registered from '{}'",
                font.path().display()
            ))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CaptionError::config("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    fn build(&mut self, text: &str, size_px: f32) -> CaptionResult<parley::Layout<()>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CaptionError::config("font size must be finite and > 0"));
        }
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl TextShaper for FontShaper {
    fn shape(&mut self, text: &str, size_px: f32) -> CaptionResult<ShapedText> {
        let layout = self.build(text, size_px)?;
        let mut out = ShapedText::default();
        for line in layout.lines() {
            let baseline = line.metrics().baseline;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                for g in run.positioned_glyphs() {
                    out.glyphs.push(ShapedGlyph {
                        id: g.id,
                        x: g.x,
                        y: g.y - baseline,
                    });
                    out.advance += g.advance;
                }
            }
        }
        Ok(out)
    }

    fn metrics(&mut self, size_px: f32) -> CaptionResult<FontMetrics> {
        let layout = self.build("Hg", size_px)?;
        let line = layout
            .lines()
            .next()
            .ok_or_else(|| CaptionError::config("font produced no line metrics"))?;
        let m = line.metrics();
        Ok(FontMetrics {
            ascent: m.ascent,
            descent: m.descent,
        })
    }
}

/// Deterministic shaper with a fixed advance per character and no glyphs.
///
/// Lays text out without any font file, for previews and tests. Words shaped with it render
/// only their highlight boxes.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceShaper {
    /// Advance of one character as a fraction of the font size.
    pub advance_em: f32,
    pub ascent_em: f32,
    pub descent_em: f32,
}

impl Default for FixedAdvanceShaper {
    fn default() -> Self {
        Self {
            advance_em: 0.6,
            ascent_em: 0.8,
            descent_em: 0.2,
        }
    }
}

impl TextShaper for FixedAdvanceShaper {
    fn shape(&mut self, text: &str, size_px: f32) -> CaptionResult<ShapedText> {
        Ok(ShapedText {
            advance: text.chars().count() as f32 * self.advance_em * size_px,
            glyphs: Vec::new(),
        })
    }

    fn metrics(&mut self, size_px: f32) -> CaptionResult<FontMetrics> {
        Ok(FontMetrics {
            ascent: self.ascent_em * size_px,
            descent: self.descent_em * size_px,
        })
    }
}

/// Glyph list shared between a layout and every frame that draws it.
pub type GlyphRun = Arc<[ShapedGlyph]>;

#[cfg(test)]
#[path = "../../tests/unit/text/shaper.rs"]
mod tests;
