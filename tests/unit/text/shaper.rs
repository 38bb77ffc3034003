use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn fixed_advance_scales_with_chars_and_size() {
    let mut s = FixedAdvanceShaper::default();
    let a = s.shape("HELLO", 100.0).unwrap();
    assert!(approx(a.advance, 300.0));
    assert!(a.glyphs.is_empty());
    assert!(approx(s.shape(" ", 100.0).unwrap().advance, 60.0));
    assert_eq!(s.shape("", 100.0).unwrap().advance, 0.0);
}

#[test]
fn fixed_advance_counts_chars_not_bytes() {
    let mut s = FixedAdvanceShaper {
        advance_em: 1.0,
        ..FixedAdvanceShaper::default()
    };
    assert_eq!(s.shape("ÜBER", 10.0).unwrap().advance, 40.0);
}

#[test]
fn metrics_sum_to_line_height() {
    let mut s = FixedAdvanceShaper::default();
    let m = s.metrics(50.0).unwrap();
    assert!(approx(m.ascent, 40.0));
    assert!(approx(m.descent, 10.0));
    assert!(approx(m.line_height(), 50.0));
}
