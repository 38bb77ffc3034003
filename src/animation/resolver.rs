use serde::Serialize;

use crate::animation::ease::Ease;
use crate::foundation::math::Fnv1a64;
use crate::layout::engine::{CaptionBlock, Layout};
use crate::style::config::{AnimationKind, StyleConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WordPhase {
    Pending,
    Active,
    Spoken,
}

/// Phase of one word plus its eased animation progress (only meaningful while active).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WordState {
    pub phase: WordPhase,
    pub progress: f64,
}

impl WordState {
    const PENDING: Self = Self {
        phase: WordPhase::Pending,
        progress: 0.0,
    };
    const SPOKEN: Self = Self {
        phase: WordPhase::Spoken,
        progress: 0.0,
    };
}

/// What to draw at one instant: the visible block and the state of each of its words.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub block: usize,
    /// Parallel to the block's words.
    pub words: Vec<WordState>,
}

impl RenderState {
    /// Position of the active word within the block, if any.
    pub fn active_word(&self) -> Option<usize> {
        self.words.iter().position(|w| w.phase == WordPhase::Active)
    }

    /// Stable content hash; equal states draw identical overlays.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(self.block as u64);
        for w in &self.words {
            h.write_u8(w.phase as u8);
            h.write_f64(w.progress);
        }
        h.finish()
    }
}

/// Timing parameters of the resolver, extracted from the style once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTiming {
    pub kind: AnimationKind,
    pub duration_secs: f64,
    pub easing: Ease,
    pub hold_until_next_word: bool,
}

impl AnimationTiming {
    pub fn from_style(style: &StyleConfig) -> Self {
        Self {
            kind: style.animation_kind,
            duration_secs: style.animation_duration_secs(),
            easing: style.easing,
            hold_until_next_word: style.hold_active_until_next_word,
        }
    }
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self::from_style(&StyleConfig::default())
    }
}

/// Index of the block visible at `t`, if any.
///
/// Spans are half-open `[start, end)`; where spans overlap the later block wins. An earlier block
/// whose span outlasts the blocks after it stays visible once they end.
pub fn find_block(blocks: &[CaptionBlock], t: f64) -> Option<usize> {
    if !t.is_finite() {
        return None;
    }
    let after = blocks.partition_point(|b| b.start <= t);
    let idx = after.checked_sub(1)?;
    if blocks[idx].contains_time(t) {
        return Some(idx);
    }
    blocks[..idx].iter().rposition(|b| b.contains_time(t))
}

/// Time at which word `i` of `block` stops being active.
pub fn effective_end(block: &CaptionBlock, i: usize, hold_until_next_word: bool) -> f64 {
    let word = &block.words[i];
    match block.words.get(i + 1) {
        Some(next) if hold_until_next_word => next.start,
        Some(next) => word.end.min(next.start),
        None => word.end,
    }
}

/// Per-word states of `block` at time `t`.
pub fn resolve_block(block: &CaptionBlock, t: f64, timing: &AnimationTiming) -> Vec<WordState> {
    (0..block.words.len())
        .map(|i| {
            let start = block.words[i].start;
            let eff_end = effective_end(block, i, timing.hold_until_next_word);
            if t >= eff_end {
                WordState::SPOKEN
            } else if t >= start {
                WordState {
                    phase: WordPhase::Active,
                    progress: active_progress(t, start, eff_end, timing),
                }
            } else {
                WordState::PENDING
            }
        })
        .collect()
}

fn active_progress(t: f64, start: f64, eff_end: f64, timing: &AnimationTiming) -> f64 {
    let d = timing.duration_secs;
    if timing.kind == AnimationKind::None || d <= 0.0 {
        return 1.0;
    }
    let entry = ((t - start) / d).clamp(0.0, 1.0);
    match timing.kind {
        AnimationKind::Fade => {
            let exit = ((eff_end - t) / d).clamp(0.0, 1.0);
            timing.easing.apply(entry.min(exit))
        }
        _ => timing.easing.apply(entry),
    }
}

/// Render state at `t`, or `None` when no block is visible.
pub fn resolve(layout: &Layout, t: f64, timing: &AnimationTiming) -> Option<RenderState> {
    let block = find_block(&layout.blocks, t)?;
    Some(RenderState {
        block,
        words: resolve_block(&layout.blocks[block], t, timing),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/resolver.rs"]
mod tests;
