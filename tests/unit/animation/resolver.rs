use super::*;
use crate::timeline::words::WordToken;

fn block(words: &[(f64, f64)]) -> CaptionBlock {
    let words: Vec<WordToken> = words
        .iter()
        .enumerate()
        .map(|(i, (s, e))| WordToken::new(format!("w{i}"), *s, *e))
        .collect();
    CaptionBlock {
        first_word: 0,
        start: words[0].start,
        end: words[words.len() - 1].end,
        words,
        lines: Vec::new(),
    }
}

fn timing(kind: AnimationKind) -> AnimationTiming {
    AnimationTiming {
        kind,
        duration_secs: 0.3,
        easing: Ease::Linear,
        hold_until_next_word: true,
    }
}

fn phases(states: &[WordState]) -> Vec<WordPhase> {
    states.iter().map(|s| s.phase).collect()
}

#[test]
fn phases_follow_word_timing() {
    let b = block(&[(0.0, 0.5), (0.5, 1.0)]);
    let t = timing(AnimationKind::Pop);
    assert_eq!(
        phases(&resolve_block(&b, 0.2, &t)),
        vec![WordPhase::Active, WordPhase::Pending]
    );
    assert_eq!(
        phases(&resolve_block(&b, 0.8, &t)),
        vec![WordPhase::Spoken, WordPhase::Active]
    );
    assert_eq!(
        phases(&resolve_block(&b, 1.0, &t)),
        vec![WordPhase::Spoken, WordPhase::Spoken]
    );
}

#[test]
fn hold_keeps_word_active_through_gaps() {
    let b = block(&[(0.0, 0.2), (0.6, 1.0)]);
    let held = resolve_block(&b, 0.4, &timing(AnimationKind::Pop));
    assert_eq!(phases(&held), vec![WordPhase::Active, WordPhase::Pending]);

    let t = AnimationTiming {
        hold_until_next_word: false,
        ..timing(AnimationKind::Pop)
    };
    let released = resolve_block(&b, 0.4, &t);
    assert_eq!(phases(&released), vec![WordPhase::Spoken, WordPhase::Pending]);
}

#[test]
fn overlapping_words_never_share_the_active_phase() {
    let b = block(&[(0.0, 0.9), (0.3, 0.6), (0.3, 1.2)]);
    for hold in [true, false] {
        let t = AnimationTiming {
            hold_until_next_word: hold,
            ..timing(AnimationKind::Pop)
        };
        for i in 0..=130 {
            let states = resolve_block(&b, i as f64 / 100.0, &t);
            let active = states.iter().filter(|s| s.phase == WordPhase::Active).count();
            assert!(active <= 1, "t={} hold={hold}", i as f64 / 100.0);
        }
    }
}

#[test]
fn pop_progress_ramps_over_animation_duration() {
    let b = block(&[(1.0, 2.0)]);
    let t = timing(AnimationKind::Pop);
    let at = |s: f64| resolve_block(&b, s, &t)[0].progress;
    assert_eq!(at(1.0), 0.0);
    assert!((at(1.15) - 0.5).abs() < 1e-9);
    assert_eq!(at(1.3), 1.0);
    assert_eq!(at(1.9), 1.0);
}

#[test]
fn fade_progress_is_symmetric_about_the_active_interval() {
    let b = block(&[(0.0, 1.0), (1.0, 2.0)]);
    let t = timing(AnimationKind::Fade);
    let at = |s: f64| resolve_block(&b, s, &t)[0].progress;
    assert!((at(0.15) - 0.5).abs() < 1e-9);
    assert_eq!(at(0.5), 1.0);
    assert!((at(0.85) - 0.5).abs() < 1e-9);
}

#[test]
fn none_kind_and_zero_duration_give_full_progress() {
    let b = block(&[(0.0, 1.0)]);
    assert_eq!(resolve_block(&b, 0.0, &timing(AnimationKind::None))[0].progress, 1.0);
    let t = AnimationTiming {
        duration_secs: 0.0,
        ..timing(AnimationKind::Pop)
    };
    assert_eq!(resolve_block(&b, 0.0, &t)[0].progress, 1.0);
}

#[test]
fn easing_is_applied_to_progress() {
    let b = block(&[(0.0, 1.0)]);
    let t = AnimationTiming {
        easing: Ease::OutCubic,
        ..timing(AnimationKind::HighlightSweep)
    };
    assert!((resolve_block(&b, 0.15, &t)[0].progress - 0.875).abs() < 1e-9);
}

#[test]
fn block_lookup_uses_half_open_spans() {
    let blocks = vec![block(&[(0.0, 1.0)]), block(&[(2.0, 3.0)]), block(&[(3.0, 4.0)])];
    assert_eq!(find_block(&blocks, -0.1), None);
    assert_eq!(find_block(&blocks, 0.0), Some(0));
    assert_eq!(find_block(&blocks, 0.999), Some(0));
    assert_eq!(find_block(&blocks, 1.0), None);
    assert_eq!(find_block(&blocks, 1.5), None);
    assert_eq!(find_block(&blocks, 3.0), Some(2));
    assert_eq!(find_block(&blocks, 4.0), None);
    assert_eq!(find_block(&blocks, f64::NAN), None);
    assert_eq!(find_block(&[], 0.0), None);
}

#[test]
fn later_block_wins_when_spans_overlap() {
    let blocks = vec![block(&[(0.0, 2.0)]), block(&[(1.0, 3.0)])];
    assert_eq!(find_block(&blocks, 1.5), Some(1));
    assert_eq!(find_block(&blocks, 0.5), Some(0));
}

#[test]
fn earlier_block_shows_after_a_shorter_later_block_ends() {
    let blocks = vec![
        block(&[(0.0, 3.0)]),
        block(&[(1.0, 1.2)]),
        block(&[(1.5, 1.8)]),
        block(&[(5.0, 6.0)]),
    ];
    assert_eq!(find_block(&blocks, 1.1), Some(1));
    assert_eq!(find_block(&blocks, 1.3), Some(0));
    assert_eq!(find_block(&blocks, 1.6), Some(2));
    assert_eq!(find_block(&blocks, 2.0), Some(0));
    assert_eq!(find_block(&blocks, 3.0), None);
    assert_eq!(find_block(&blocks, 4.0), None);
}

#[test]
fn long_word_stays_captioned_past_a_short_overlapping_word() {
    let style = StyleConfig {
        max_words_per_block: Some(1),
        scale_font_to_width: false,
        ..StyleConfig::default()
    };
    let tl = crate::timeline::words::WordTimeline::new(vec![
        WordToken::new("long", 0.0, 3.0),
        WordToken::new("short", 1.0, 1.2),
    ])
    .unwrap();
    let safe = crate::geometry::aspect::SafeZoneRect {
        x: 0.0,
        y: 0.0,
        width: 1000.0,
        height: 1000.0,
    };
    let layout = crate::layout::engine::layout_timeline(
        &tl,
        &style,
        safe,
        &mut crate::text::shaper::FixedAdvanceShaper::default(),
    )
    .unwrap();
    assert_eq!(layout.blocks.len(), 2);

    let state = resolve(&layout, 2.0, &AnimationTiming::from_style(&style)).unwrap();
    assert_eq!(state.block, 0);
    assert_eq!(state.active_word(), Some(0));
}

#[test]
fn resolve_is_idempotent_and_fingerprints_match() {
    let layout = Layout {
        blocks: vec![block(&[(0.0, 0.5), (0.5, 1.0)])],
        warnings: Vec::new(),
        font_size_px: 80.0,
        metrics: crate::text::shaper::FontMetrics {
            ascent: 64.0,
            descent: 16.0,
        },
        safe_zone: crate::geometry::aspect::SafeZoneRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        },
        usable_width: 100.0,
    };
    let t = AnimationTiming::default();
    let a = resolve(&layout, 0.42, &t).unwrap();
    let b = resolve(&layout, 0.42, &t).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.active_word(), Some(0));
    let c = resolve(&layout, 0.6, &t).unwrap();
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert!(resolve(&layout, 1.5, &t).is_none());
}
