use vello_cpu::kurbo::{Affine, BezPath, Join, RoundedRect, Shape, Stroke};

use crate::animation::resolver::{RenderState, WordPhase, WordState};
use crate::assets::font::LoadedFont;
use crate::foundation::core::Canvas;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::foundation::math::lerp;
use crate::layout::engine::{Layout, Line, PlacedWord};
use crate::render::backend::FrameRGBA;
use crate::style::color::Color;
use crate::style::config::{AnimationKind, StyleConfig};
use crate::text::shaper::FontMetrics;

/// Draws caption overlays: transparent premultiplied frames with only the visible block on them.
///
/// Holds no per-frame state; [`OverlayRenderer::render`] is a pure function of its inputs.
#[derive(Clone)]
pub struct OverlayRenderer {
    font: vello_cpu::peniko::FontData,
    style: StyleConfig,
    canvas: Canvas,
    width: u16,
    height: u16,
}

/// Reusable rasterization buffers, one per worker thread.
pub(crate) struct RenderScratch {
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

impl RenderScratch {
    pub(crate) fn new(renderer: &OverlayRenderer) -> Self {
        Self {
            ctx: vello_cpu::RenderContext::new(renderer.width, renderer.height),
            pixmap: vello_cpu::Pixmap::new(renderer.width, renderer.height),
        }
    }
}

impl OverlayRenderer {
    /// `style` must be resolved for `canvas.width` (same style the layout was computed with).
    pub fn new(font: &LoadedFont, style: &StyleConfig, canvas: Canvas) -> CaptionResult<Self> {
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| CaptionError::geometry("overlay width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| CaptionError::geometry("overlay height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(CaptionError::geometry("overlay canvas must be non-empty"));
        }
        Ok(Self {
            font: font.font_data(),
            style: style.clone(),
            canvas,
            width,
            height,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn render(&self, layout: &Layout, state: &RenderState) -> CaptionResult<FrameRGBA> {
        let mut scratch = RenderScratch::new(self);
        self.render_with(&mut scratch, layout, state)
    }

    pub(crate) fn render_with(
        &self,
        scratch: &mut RenderScratch,
        layout: &Layout,
        state: &RenderState,
    ) -> CaptionResult<FrameRGBA> {
        let block = layout.blocks.get(state.block).ok_or_else(|| {
            CaptionError::media(format!("render state refers to missing block {}", state.block))
        })?;
        if state.words.len() != block.words.len() {
            return Err(CaptionError::media(
                "render state word count does not match its block",
            ));
        }

        let ctx = &mut scratch.ctx;
        ctx.reset();

        let safe = layout.safe_zone;
        let clip = vello_cpu::kurbo::Rect::new(safe.x, safe.y, safe.right(), safe.bottom())
            .to_path(0.1);
        ctx.set_transform(Affine::IDENTITY);
        ctx.push_clip_layer(&clip);

        for (line, word) in block.placed_words() {
            let ws = state.words[word.index - block.first_word];
            self.draw_word(ctx, layout.metrics, line, word, ws);
        }

        ctx.pop_layer();
        ctx.flush();
        scratch.pixmap.data_as_u8_slice_mut().fill(0);
        ctx.render_to_pixmap(&mut scratch.pixmap);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: scratch.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_word(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        metrics: FontMetrics,
        line: &Line,
        word: &PlacedWord,
        ws: WordState,
    ) {
        let style = &self.style;
        let origin = Affine::translate((
            f64::from(line.start_x + word.x),
            f64::from(line.baseline_y),
        ));
        let active = ws.phase == WordPhase::Active;
        let p = ws.progress;

        let transform = if active && style.animation_kind == AnimationKind::Pop {
            let s = lerp(style.pop_scale_from, style.pop_scale_to, p);
            let cx = f64::from(word.width) / 2.0;
            let cy = -f64::from(metrics.ascent - metrics.descent) / 2.0;
            origin
                * Affine::translate((cx, cy))
                * Affine::scale(s)
                * Affine::translate((-cx, -cy))
        } else {
            origin
        };

        if active && style.animation_kind == AnimationKind::HighlightSweep {
            self.draw_sweep_box(ctx, origin, metrics, word, p);
        }

        if word.glyphs.is_empty() {
            return;
        }

        if let Some(shadow) = &style.shadow {
            let offset = Affine::translate((
                f64::from(shadow.offset[0]),
                f64::from(shadow.offset[1]),
            ));
            self.fill_glyphs(ctx, offset * transform, word, shadow.color);
        }
        if style.stroke_width > 0.0 {
            ctx.set_transform(transform);
            ctx.set_paint(style.stroke_color.to_cpu_paint());
            ctx.set_stroke(
                Stroke::new(f64::from(style.stroke_width) * 2.0).with_join(Join::Round),
            );
            ctx.glyph_run(&self.font)
                .font_size(style.font_size)
                .stroke_glyphs(cpu_glyphs(word));
        }

        match (active, style.animation_kind) {
            (false, _) => self.fill_glyphs(ctx, transform, word, style.primary_color),
            (true, AnimationKind::Fade) => {
                self.fill_glyphs(ctx, transform, word, style.primary_color);
                let opacity = p.clamp(0.0, 1.0) as f32;
                if opacity > 0.0 {
                    ctx.push_opacity_layer(opacity);
                    self.fill_glyphs(ctx, transform, word, style.highlight_color);
                    ctx.pop_layer();
                }
            }
            (true, _) => self.fill_glyphs(ctx, transform, word, style.highlight_color),
        }
    }

    fn fill_glyphs(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        transform: Affine,
        word: &PlacedWord,
        color: Color,
    ) {
        ctx.set_transform(transform);
        ctx.set_paint(color.to_cpu_paint());
        ctx.glyph_run(&self.font)
            .font_size(self.style.font_size)
            .fill_glyphs(cpu_glyphs(word));
    }

    fn draw_sweep_box(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        origin: Affine,
        metrics: FontMetrics,
        word: &PlacedWord,
        progress: f64,
    ) {
        let style = &self.style;
        let pad_x = f64::from(style.highlight_padding[0]);
        let pad_y = f64::from(style.highlight_padding[1]);
        let full = f64::from(word.width) + 2.0 * pad_x;
        let w = full * progress.clamp(0.0, 1.0);
        if w <= 0.0 {
            return;
        }
        let x0 = -pad_x;
        let y0 = -f64::from(metrics.ascent) - pad_y;
        let y1 = f64::from(metrics.descent) + pad_y;
        let radius = f64::from(style.highlight_radius)
            .min(w / 2.0)
            .min((y1 - y0) / 2.0);
        let path: BezPath = RoundedRect::new(x0, y0, x0 + w, y1, radius).to_path(0.1);

        ctx.set_transform(origin);
        ctx.set_paint(style.highlight_box_color.to_cpu_paint());
        ctx.fill_path(&path);
    }
}

fn cpu_glyphs(word: &PlacedWord) -> impl Iterator<Item = vello_cpu::Glyph> + '_ {
    word.glyphs.iter().map(|g| vello_cpu::Glyph {
        id: g.id,
        x: g.x,
        y: g.y,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
