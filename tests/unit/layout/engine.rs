use super::*;
use crate::text::shaper::FixedAdvanceShaper;

fn safe() -> SafeZoneRect {
    SafeZoneRect {
        x: 100.0,
        y: 200.0,
        width: 600.0,
        height: 1000.0,
    }
}

fn style() -> StyleConfig {
    StyleConfig {
        font_size: 100.0,
        scale_font_to_width: false,
        line_spacing: 0.0,
        max_words_per_block: None,
        max_block_duration_ms: None,
        max_gap_ms: None,
        uppercase: false,
        ..StyleConfig::default()
    }
}

fn words(texts: &[&str]) -> WordTimeline {
    WordTimeline::new(
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| WordToken::new(*t, i as f64 * 0.5, i as f64 * 0.5 + 0.4))
            .collect(),
    )
    .unwrap()
}

fn run(tl: &WordTimeline, style: &StyleConfig) -> CaptionResult<Layout> {
    layout_timeline(tl, style, safe(), &mut FixedAdvanceShaper::default())
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-2
}

#[test]
fn two_short_words_share_one_line() {
    let tl = words(&["hi", "yo"]);
    let layout = run(&tl, &style()).unwrap();
    assert_eq!(layout.blocks.len(), 1);
    let b = &layout.blocks[0];
    assert_eq!(b.lines.len(), 1);
    assert_eq!(b.lines[0].words.len(), 2);
    assert!(approx(b.lines[0].measured_width, 120.0 + 60.0 + 120.0));
    assert!(approx(b.lines[0].words[1].x, 180.0));
    assert_eq!(b.start, 0.0);
    assert_eq!(b.end, 0.9);
}

#[test]
fn greedy_wrapping_fills_lines_then_blocks() {
    let tl = words(&["aaaa", "bbbb", "cccc", "dddd", "eeee", "ffff", "gggg", "hhhh"]);
    let layout = run(&tl, &style()).unwrap();
    assert_eq!(layout.blocks.len(), 2);
    for b in &layout.blocks {
        assert_eq!(b.lines.len(), 2);
        for line in &b.lines {
            assert_eq!(line.words.len(), 2);
            assert!(line.measured_width <= 600.0);
            assert!(!line.overflow);
        }
    }
    assert_eq!(layout.blocks[1].first_word, 4);
}

#[test]
fn every_word_lands_in_exactly_one_line_in_order() {
    let tl = words(&["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "g", "hh", "iii"]);
    let layout = run(&tl, &style()).unwrap();
    let indices: Vec<usize> = layout
        .blocks
        .iter()
        .flat_map(|b| b.placed_words().map(|(_, w)| w.index))
        .collect();
    assert_eq!(indices, (0..tl.len()).collect::<Vec<_>>());
    assert_eq!(layout.word_count(), tl.len());
    for b in &layout.blocks {
        assert!(b.lines.len() <= 2);
        let from_lines: Vec<usize> = b.placed_words().map(|(_, w)| w.index).collect();
        let from_words: Vec<usize> = (b.first_word..b.first_word + b.words.len()).collect();
        assert_eq!(from_lines, from_words);
    }
}

#[test]
fn max_words_per_block_closes_blocks() {
    let tl = words(&["a", "b", "c", "d", "e"]);
    let layout = run(
        &tl,
        &StyleConfig {
            max_words_per_block: Some(2),
            ..style()
        },
    )
    .unwrap();
    let sizes: Vec<usize> = layout.blocks.iter().map(|b| b.words.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn long_silence_closes_block() {
    let tl = WordTimeline::new(vec![
        WordToken::new("a", 0.0, 0.3),
        WordToken::new("b", 0.35, 0.6),
        WordToken::new("c", 2.0, 2.4),
    ])
    .unwrap();
    let layout = run(
        &tl,
        &StyleConfig {
            max_gap_ms: Some(200.0),
            ..style()
        },
    )
    .unwrap();
    let sizes: Vec<usize> = layout.blocks.iter().map(|b| b.words.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(layout.blocks[1].start, 2.0);
}

#[test]
fn block_duration_limit_is_measured_from_block_start() {
    let tl = words(&["a", "b", "c", "d"]);
    // Word ends: 0.4, 0.9, 1.4, 1.9.
    let layout = run(
        &tl,
        &StyleConfig {
            max_block_duration_ms: Some(1000.0),
            ..style()
        },
    )
    .unwrap();
    let sizes: Vec<usize> = layout.blocks.iter().map(|b| b.words.len()).collect();
    assert_eq!(sizes, vec![2, 2]);
}

#[test]
fn oversized_word_is_alone_and_flagged() {
    let tl = words(&["hi", "abcdefghijklmnopqrst", "yo"]);
    let layout = run(&tl, &style()).unwrap();
    let lines: Vec<&Line> = layout.blocks.iter().flat_map(|b| b.lines.iter()).collect();
    let over: Vec<&&Line> = lines.iter().filter(|l| l.overflow).collect();
    assert_eq!(over.len(), 1);
    assert_eq!(over[0].words.len(), 1);
    assert_eq!(over[0].words[0].index, 1);
    assert!(approx(over[0].start_x, 100.0));
    assert!(matches!(
        layout.warnings.as_slice(),
        [CaptionWarning::LineOverflow { word: 1, .. }]
    ));
    for l in lines.iter().filter(|l| !l.overflow) {
        assert!(l.measured_width <= 600.0);
    }
}

#[test]
fn strict_layout_turns_overflow_into_error() {
    let tl = words(&["abcdefghijklmnopqrst"]);
    let err = run(
        &tl,
        &StyleConfig {
            strict_layout: true,
            ..style()
        },
    )
    .unwrap_err();
    assert!(matches!(err, CaptionError::LayoutOverflow(_)));
}

#[test]
fn max_chars_per_line_wraps_before_width_does() {
    let tl = words(&["ab", "cd", "ef"]);
    let layout = run(
        &tl,
        &StyleConfig {
            max_chars_per_line: Some(5),
            ..style()
        },
    )
    .unwrap();
    let b = &layout.blocks[0];
    assert_eq!(b.lines.len(), 2);
    assert_eq!(b.lines[0].words.len(), 2);
    assert_eq!(layout.blocks.len(), 1);
}

#[test]
fn max_line_width_narrows_usable_width() {
    let tl = words(&["aaaa", "bbbb"]);
    let layout = run(
        &tl,
        &StyleConfig {
            max_line_width: Some(400.0),
            ..style()
        },
    )
    .unwrap();
    assert!(approx(layout.usable_width, 400.0));
    assert_eq!(layout.blocks[0].lines.len(), 2);
}

#[test]
fn horizontal_alignment_positions_lines_in_safe_zone() {
    let tl = words(&["abcde"]);
    let w = 300.0;
    for (align, expect) in [
        (HorizontalAlign::Left, 100.0),
        (HorizontalAlign::Center, 100.0 + (600.0 - w) / 2.0),
        (HorizontalAlign::Right, 700.0 - w),
    ] {
        let layout = run(
            &tl,
            &StyleConfig {
                horizontal_align: align,
                ..style()
            },
        )
        .unwrap();
        assert!(approx(layout.blocks[0].lines[0].start_x, expect), "{align:?}");
    }
}

#[test]
fn vertical_alignment_positions_block_group() {
    let tl = words(&["abc"]);
    for (align, baseline) in [
        (VerticalAlign::Top, 280.0),
        (VerticalAlign::Center, 650.0 + 80.0),
        (VerticalAlign::Bottom, 1200.0 - 100.0 + 80.0),
    ] {
        let layout = run(
            &tl,
            &StyleConfig {
                vertical_align: align,
                ..style()
            },
        )
        .unwrap();
        assert!(
            approx(layout.blocks[0].lines[0].baseline_y, baseline),
            "{align:?}: {}",
            layout.blocks[0].lines[0].baseline_y
        );
    }
}

#[test]
fn line_spacing_separates_baselines() {
    let tl = words(&["aaaa", "bbbb", "cccc"]);
    let layout = run(
        &tl,
        &StyleConfig {
            line_spacing: 10.0,
            ..style()
        },
    )
    .unwrap();
    let lines = &layout.blocks[0].lines;
    assert_eq!(lines.len(), 2);
    assert!(approx(lines[1].baseline_y - lines[0].baseline_y, 110.0));
}

#[test]
fn display_text_is_what_gets_measured() {
    let tl = words(&["hello,"]);
    let layout = run(
        &tl,
        &StyleConfig {
            uppercase: true,
            ..style()
        },
    )
    .unwrap();
    let w = &layout.blocks[0].lines[0].words[0];
    assert_eq!(w.text, "HELLO");
    assert!(approx(w.width, 300.0));
}

#[test]
fn empty_timeline_yields_no_blocks_and_a_warning() {
    let layout = run(&WordTimeline::empty(), &style()).unwrap();
    assert!(layout.blocks.is_empty());
    assert_eq!(layout.warnings, vec![CaptionWarning::EmptyTimeline]);
}
