use super::*;
use crate::text::shaper::FixedAdvanceShaper;
use crate::timeline::words::WordToken;
use std::sync::atomic::{AtomicUsize, Ordering};

fn scratch_dir(label: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "wordreel_{label}_{}_{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

fn hello_world() -> WordTimeline {
    WordTimeline::new(vec![
        WordToken::new("Hello", 0.0, 0.5),
        WordToken::new("world", 0.5, 1.0),
    ])
    .unwrap()
}

#[test]
fn plan_pads_landscape_and_scales_style() {
    let style = StyleConfig::default();
    let plan = plan_captions(
        1920,
        1080,
        &hello_world(),
        &style,
        &mut FixedAdvanceShaper::default(),
    )
    .unwrap();
    assert_eq!(plan.geometry.pad.padded_width, 1920);
    assert!(plan.geometry.pad.padded_height > 1080);
    assert!(plan.style.font_size > style.font_size);
    assert_eq!(plan.layout.blocks.len(), 1);
    assert_eq!(plan.layout.font_size_px, plan.style.font_size);
}

#[test]
fn plan_passes_vertical_source_through() {
    let plan = plan_captions(
        1080,
        1920,
        &hello_world(),
        &StyleConfig::default(),
        &mut FixedAdvanceShaper::default(),
    )
    .unwrap();
    assert!(plan.geometry.pad.is_passthrough());
    assert_eq!(plan.geometry.pad.canvas().width, 1080);
}

#[test]
fn plan_rejects_invalid_dimensions() {
    let err = plan_captions(
        0,
        1920,
        &hello_world(),
        &StyleConfig::default(),
        &mut FixedAdvanceShaper::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CaptionError::InvalidGeometry(_)));
}

#[test]
fn video_extensions_match_case_insensitively() {
    assert!(is_video_path(Path::new("a/b.MP4")));
    assert!(is_video_path(Path::new("clip.webm")));
    assert!(!is_video_path(Path::new("clip.words.json")));
    assert!(!is_video_path(Path::new("noext")));
}

#[test]
fn scan_finds_videos_recursively_in_sorted_order() {
    let dir = scratch_dir("scan");
    touch(&dir.join("b.mov"));
    touch(&dir.join("a.mp4"));
    touch(&dir.join("a.words.json"));
    touch(&dir.join("nested/c.mkv"));
    touch(&dir.join("nested/notes.txt"));

    let found = scan_videos(&dir).unwrap();
    assert_eq!(
        found,
        vec![dir.join("a.mp4"), dir.join("b.mov"), dir.join("nested/c.mkv")]
    );
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scan_of_missing_directory_is_an_error() {
    assert!(scan_videos(Path::new("/definitely/not/here")).is_err());
}

#[test]
fn word_and_output_paths_follow_the_video_name() {
    let video = Path::new("/in/day1/clip.mov");
    assert_eq!(words_path_for(video), PathBuf::from("/in/day1/clip.words.json"));
    assert_eq!(
        output_path_for(video, Path::new("/in"), Path::new("/out")),
        PathBuf::from("/out/day1/clip.mp4")
    );
    assert_eq!(
        temp_output_path(Path::new("/out/clip.mp4")).unwrap(),
        PathBuf::from("/out/.clip.partial.mp4")
    );
}

#[test]
fn temp_guard_removes_file_unless_disarmed() {
    let dir = scratch_dir("guard");
    let kept = dir.join("kept");
    let dropped = dir.join("dropped");
    touch(&kept);
    touch(&dropped);
    {
        let _g = TempFileGuard(Some(dropped.clone()));
        let mut g = TempFileGuard(Some(kept.clone()));
        g.0 = None;
    }
    assert!(kept.exists());
    assert!(!dropped.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn batch_isolates_per_video_failures() {
    let dir = scratch_dir("batch");
    touch(&dir.join("in/broken.mp4"));
    std::fs::write(dir.join("in/broken.words.json"), "[]").unwrap();
    touch(&dir.join("in/nowords.mov"));

    let pipeline = CaptionPipeline::new(
        StyleConfig::default(),
        LoadedFont::from_bytes("none", Vec::new()),
        PipelineOpts::default(),
    )
    .unwrap();
    let report = pipeline
        .process_dir(&dir.join("in"), &dir.join("out"))
        .unwrap();

    assert_eq!(report.total(), 2);
    assert!(!report.all_succeeded());
    assert_eq!(report.failed.len(), 2);
    assert!(!dir.join("out/broken.mp4").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_directory_yields_empty_report() {
    let dir = scratch_dir("empty");
    let pipeline = CaptionPipeline::new(
        StyleConfig::default(),
        LoadedFont::from_bytes("none", Vec::new()),
        PipelineOpts::default(),
    )
    .unwrap();
    let report = pipeline.process_dir(&dir, &dir.join("out")).unwrap();
    assert_eq!(report.total(), 0);
    assert!(report.all_succeeded());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn plan_honors_aspect_options() {
    let reject = StyleConfig {
        reject_invalid_aspect: true,
        ..StyleConfig::default()
    };
    let err = plan_captions(
        1920,
        1080,
        &hello_world(),
        &reject,
        &mut FixedAdvanceShaper::default(),
    )
    .unwrap_err();
    assert!(matches!(err, CaptionError::InvalidGeometry(_)));
    assert!(!err.is_fatal_for_batch());

    let keep = StyleConfig {
        enforce_target_aspect: false,
        ..StyleConfig::default()
    };
    let plan = plan_captions(
        1920,
        1080,
        &hello_world(),
        &keep,
        &mut FixedAdvanceShaper::default(),
    )
    .unwrap();
    assert_eq!(plan.geometry.pad.canvas().height, 1080);
    assert!(plan.geometry.pad.is_passthrough());
}

#[cfg(unix)]
#[test]
fn scan_does_not_follow_symlink_cycles() {
    let dir = scratch_dir("symlink_cycle");
    touch(&dir.join("a.mp4"));
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::os::unix::fs::symlink(&dir, dir.join("sub/loop")).unwrap();
    std::os::unix::fs::symlink(dir.join("a.mp4"), dir.join("sub/alias.mp4")).unwrap();

    let found = scan_videos(&dir).unwrap();
    assert_eq!(found, vec![dir.join("a.mp4")]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn batch_reports_inputs_that_share_an_output() {
    let dir = scratch_dir("collide");
    touch(&dir.join("in/clip.mov"));
    touch(&dir.join("in/clip.mp4"));
    std::fs::write(dir.join("in/clip.words.json"), "[]").unwrap();

    let pipeline = CaptionPipeline::new(
        StyleConfig::default(),
        LoadedFont::from_bytes("none", Vec::new()),
        PipelineOpts::default(),
    )
    .unwrap();
    let report = pipeline
        .process_dir(&dir.join("in"), &dir.join("out"))
        .unwrap();

    assert_eq!(report.total(), 2);
    let (second, msg) = report
        .failed
        .iter()
        .find(|(v, _)| v.ends_with("clip.mp4"))
        .unwrap();
    assert_eq!(second, &dir.join("in/clip.mp4"));
    assert!(msg.contains("clip.mov"), "{msg}");
    assert!(msg.contains("already produced"), "{msg}");
    let _ = std::fs::remove_dir_all(&dir);
}
