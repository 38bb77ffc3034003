use super::*;
use crate::foundation::core::Fps;

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::new(30, 1).unwrap(),
    }
}

fn as_strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn flatten_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &[0u8; 4], [0, 0, 0, 255]).is_err());
}

#[test]
fn sink_config_validation_catches_bad_values() {
    assert!(validate_sink_config(&cfg(0, 10)).is_err());
    assert!(validate_sink_config(&cfg(11, 10)).is_err());
    assert!(validate_sink_config(&cfg(1080, 1920)).is_ok());
}

#[test]
fn args_without_audio_disable_audio() {
    let opts = FfmpegSinkOpts::new("out/a.mp4");
    let args = as_strings(&encoder_args(&opts, &cfg(1080, 1920)));
    assert_eq!(args[0], "-y");
    assert!(args.contains(&"-an".to_owned()));
    assert!(args.contains(&"1080x1920".to_owned()));
    assert!(args.contains(&"30/1".to_owned()));
    assert!(!args.iter().any(|a| a == "aac"));
    assert_eq!(args.last().map(String::as_str), Some("out/a.mp4"));
}

#[test]
fn args_with_audio_map_source_track() {
    let mut opts = FfmpegSinkOpts::new("out/a.mp4").with_audio_from("in/a.mov");
    opts.overwrite = false;
    let args = as_strings(&encoder_args(&opts, &cfg(1080, 1920)));
    assert_eq!(args[0], "-n");
    let pos = args.iter().position(|a| a == "in/a.mov").unwrap();
    assert_eq!(args[pos - 1], "-i");
    assert!(args.contains(&"1:a:0?".to_owned()));
    assert!(args.contains(&"-shortest".to_owned()));
    assert!(!args.contains(&"-an".to_owned()));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("unused.mp4"));
    let frame = FrameRGBA::from_raw(2, 2, vec![0; 16], true).unwrap();
    assert!(sink.push_frame(FrameIndex(0), &frame).is_err());
    assert!(sink.end().is_err());
}

#[test]
fn ensure_parent_dir_accepts_bare_file_name() {
    ensure_parent_dir(Path::new("out.mp4")).unwrap();
}
