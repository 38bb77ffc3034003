use super::*;

#[test]
fn accepts_bare_array_with_word_alias() {
    let tl = WordTimeline::from_json_str(
        r#"[{"word": "Hello", "start": 0.0, "end": 0.5, "probability": 0.9},
            {"text": "world", "start": 0.5, "end": 1.0}]"#,
    )
    .unwrap();
    assert_eq!(tl.len(), 2);
    assert_eq!(tl.words()[0].text, "Hello");
    assert_eq!(tl.words()[1].text, "world");
    assert_eq!(tl.end_secs(), 1.0);
}

#[test]
fn accepts_wrapped_object() {
    let tl = WordTimeline::from_json_str(r#"{"words": [{"word": "hi", "start": 1, "end": 2}]}"#)
        .unwrap();
    assert_eq!(tl.words(), &[WordToken::new("hi", 1.0, 2.0)]);
}

#[test]
fn empty_inputs_give_empty_timeline() {
    assert!(WordTimeline::from_json_str("[]").unwrap().is_empty());
    assert!(WordTimeline::from_json_str(r#"{"words": []}"#).unwrap().is_empty());
    assert_eq!(WordTimeline::empty().end_secs(), 0.0);
}

#[test]
fn rejects_bad_intervals_and_ordering() {
    let cases = [
        vec![WordToken::new("a", 1.0, 1.0)],
        vec![WordToken::new("a", 1.0, 0.5)],
        vec![WordToken::new("a", -0.1, 0.5)],
        vec![WordToken::new("a", f64::NAN, 0.5)],
        vec![WordToken::new("a", 1.0, 2.0), WordToken::new("b", 0.5, 2.5)],
    ];
    for words in cases {
        let err = WordTimeline::new(words.clone()).unwrap_err();
        assert!(matches!(err, CaptionError::Timeline(_)), "{words:?}");
    }
}

#[test]
fn equal_starts_keep_input_order() {
    let tl = WordTimeline::new(vec![
        WordToken::new("first", 1.0, 1.2),
        WordToken::new("second", 1.0, 1.4),
    ])
    .unwrap();
    assert_eq!(tl.words()[0].text, "first");
}

#[test]
fn malformed_json_is_a_timeline_error() {
    let err = WordTimeline::from_json_str(r#"[{"start": 0, "end": 1}]"#).unwrap_err();
    assert!(matches!(err, CaptionError::Timeline(_)));
    let err = WordTimeline::from_json_str("not json").unwrap_err();
    assert!(err.to_string().contains("malformed word json"));
}

#[test]
fn display_text_strips_and_uppercases() {
    assert_eq!(display_text(" hello, ", true, true), "HELLO");
    assert_eq!(display_text("\u{201C}wow!\u{201D}", true, true), "WOW");
    assert_eq!(display_text("don't", true, false), "don't");
    assert_eq!(display_text("ok?", false, false), "ok?");
    assert_eq!(display_text("...", true, true), "...");
    assert_eq!(display_text("straße", false, true), "STRASSE");
}
