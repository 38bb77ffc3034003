use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::animation::resolver::AnimationTiming;
use crate::assets::font::LoadedFont;
use crate::assets::media::{PaddedFrameReader, VideoSourceInfo, probe_video};
use crate::encode::compositor::CompositingSink;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{CaptionError, CaptionResult, CaptionWarning};
use crate::geometry::aspect::{FrameGeometry, PadGeometry, resolve_geometry};
use crate::layout::engine::{Layout, layout_timeline};
use crate::render::cpu::OverlayRenderer;
use crate::session::caption_session::{CaptionSession, RenderStats, SessionOpts};
use crate::style::config::StyleConfig;
use crate::text::shaper::{FontShaper, TextShaper};
use crate::timeline::words::WordTimeline;

/// Input extensions picked up by [`CaptionPipeline::process_dir`] (case-insensitive).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Geometry, resolved style and layout for one source size.
#[derive(Clone, Debug)]
pub struct CaptionPlan {
    pub geometry: FrameGeometry,
    /// Style scaled for the padded frame width.
    pub style: StyleConfig,
    pub layout: Layout,
}

/// Resolve padding and safe zone for a `width`x`height` source, then lay out `timeline` in it.
pub fn plan_captions(
    width: i64,
    height: i64,
    timeline: &WordTimeline,
    style: &StyleConfig,
    shaper: &mut dyn TextShaper,
) -> CaptionResult<CaptionPlan> {
    let geometry = resolve_geometry(
        width,
        height,
        style.target_aspect_ratio,
        &style.safe_zone_margins,
        style.aspect_tolerance,
        style.aspect_mismatch(),
    )?;
    let style = style.resolved_for_width(geometry.pad.padded_width);
    let layout = layout_timeline(timeline, &style, geometry.safe_zone, shaper)?;
    Ok(CaptionPlan {
        geometry,
        style,
        layout,
    })
}

#[derive(Clone, Debug, Default)]
pub struct PipelineOpts {
    pub session: SessionOpts,
    /// Replace existing outputs instead of failing the video.
    pub overwrite: bool,
}

/// Outcome of one successfully captioned video.
#[derive(Clone, Debug)]
pub struct VideoReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub pad: PadGeometry,
    pub stats: RenderStats,
    pub warnings: Vec<CaptionWarning>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<VideoReport>,
    /// Failed inputs with their error message.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Captions videos end to end: probe, lay out, render, composite and encode.
pub struct CaptionPipeline {
    style: StyleConfig,
    font: LoadedFont,
    opts: PipelineOpts,
}

impl CaptionPipeline {
    pub fn new(style: StyleConfig, font: LoadedFont, opts: PipelineOpts) -> CaptionResult<Self> {
        style.validate()?;
        Ok(Self { style, font, opts })
    }

    /// Load the font named by `style` and build a pipeline. An unusable font fails here, before
    /// any video is touched.
    pub fn from_style(style: StyleConfig, opts: PipelineOpts) -> CaptionResult<Self> {
        let font = LoadedFont::load(&style.font)?;
        FontShaper::new(&font)?;
        Self::new(style, font, opts)
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    /// Plan captions for `words` over a source of the given size, shaping with the loaded font.
    pub fn plan(
        &self,
        width: i64,
        height: i64,
        words: &WordTimeline,
    ) -> CaptionResult<CaptionPlan> {
        let mut shaper = FontShaper::new(&self.font)?;
        plan_captions(width, height, words, &self.style, &mut shaper)
    }

    /// Session that renders overlays for `plan` at the source frame rate.
    pub fn session_for(
        &self,
        plan: CaptionPlan,
        info: &VideoSourceInfo,
    ) -> CaptionResult<CaptionSession> {
        let renderer =
            OverlayRenderer::new(&self.font, &plan.style, plan.geometry.pad.canvas())?;
        Ok(CaptionSession::new(
            Arc::new(plan.layout),
            AnimationTiming::from_style(&plan.style),
            renderer,
            info.fps,
            self.opts.session.clone(),
        ))
    }

    /// Caption `input` with `words` and write the result to `output`.
    ///
    /// Encodes into a hidden temporary file beside `output` and renames it into place only on
    /// success; nothing is left at `output` on failure.
    #[tracing::instrument(skip(self, input, words, output), fields(input = %input.display()))]
    pub fn process_video(
        &self,
        input: &Path,
        words: &WordTimeline,
        output: &Path,
    ) -> CaptionResult<VideoReport> {
        if !self.opts.overwrite && output.exists() {
            return Err(CaptionError::media(format!(
                "output file '{}' already exists",
                output.display()
            )));
        }

        let info = probe_video(input)?;
        let frames = info.frame_count();
        if frames == 0 {
            return Err(CaptionError::media(format!(
                "'{}' has no frames",
                input.display()
            )));
        }
        if words.end_secs() > info.duration_secs {
            tracing::warn!(
                words_end = words.end_secs(),
                video_end = info.duration_secs,
                "word timeline runs past the end of the video; late words are dropped"
            );
        }

        let plan = self.plan(i64::from(info.width), i64::from(info.height), words)?;
        let pad = plan.geometry.pad;
        let warnings = plan.layout.warnings.clone();
        let session = self.session_for(plan, &info)?;

        let tmp = temp_output_path(output)?;
        let mut guard = TempFileGuard(Some(tmp.clone()));

        let bg = self.style.padding_color;
        let mut sink_opts = FfmpegSinkOpts::new(&tmp);
        sink_opts.bg_rgba = [bg.r, bg.g, bg.b, 255];
        if info.has_audio {
            sink_opts = sink_opts.with_audio_from(input);
        }
        let reader = PaddedFrameReader::spawn(&info, &pad, self.style.padding_color)?;
        let mut sink = CompositingSink::new(reader, FfmpegSink::new(sink_opts));

        let range = FrameRange::new(FrameIndex(0), FrameIndex(frames))?;
        let stats = session.render_range(range, &mut sink)?;

        if self.opts.overwrite && output.exists() {
            remove_file(output)?;
        }
        std::fs::rename(&tmp, output).map_err(|e| {
            CaptionError::media(format!(
                "failed to move '{}' to '{}': {e}",
                tmp.display(),
                output.display()
            ))
        })?;
        guard.0 = None;

        tracing::info!(
            output = %output.display(),
            padded = %format!("{}x{}", pad.padded_width, pad.padded_height),
            frames = stats.frames_total,
            rendered = stats.frames_rendered,
            "captioned video"
        );
        Ok(VideoReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            pad,
            stats,
            warnings,
        })
    }

    /// Caption every video under `input_dir`, mirroring its layout into `output_dir`.
    ///
    /// Each video reads its words from `<stem>.words.json` beside it. A failing video is logged and
    /// recorded; only config errors stop the batch. When two inputs map to the same output (say
    /// `clip.mov` and `clip.mp4`), the first in path order keeps it and the other fails.
    #[tracing::instrument(skip(self, input_dir, output_dir), fields(input = %input_dir.display()))]
    pub fn process_dir(&self, input_dir: &Path, output_dir: &Path) -> CaptionResult<BatchReport> {
        let videos = scan_videos(input_dir)?;
        if videos.is_empty() {
            tracing::warn!("no videos found");
        }

        let mut report = BatchReport::default();
        let mut claimed = HashMap::<PathBuf, PathBuf>::new();
        for video in videos {
            let output = output_path_for(&video, input_dir, output_dir);
            if let Some(first) = claimed.get(&output) {
                let msg = format!(
                    "output '{}' is already produced by '{}'",
                    output.display(),
                    first.display()
                );
                tracing::warn!(video = %video.display(), "{msg}");
                report.failed.push((video, msg));
                continue;
            }
            claimed.insert(output.clone(), video.clone());

            let result = WordTimeline::load(&words_path_for(&video))
                .and_then(|words| self.process_video(&video, &words, &output));
            match result {
                Ok(r) => report.succeeded.push(r),
                Err(e) if e.is_fatal_for_batch() => return Err(e),
                Err(e) => {
                    tracing::warn!(video = %video.display(), error = %e, "video failed");
                    report.failed.push((video, e.to_string()));
                }
            }
        }

        tracing::info!(
            total = report.total(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}

/// Videos under `dir` (recursive), sorted by path. Symlinks are not followed.
pub fn scan_videos(dir: &Path) -> CaptionResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            CaptionError::media(format!("failed to scan '{}': {e}", dir.display()))
        })?;
        if entry.file_type().is_file() && is_video_path(entry.path()) {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|v| v.eq_ignore_ascii_case(ext))
        })
}

/// `<stem>.words.json` next to `video`.
pub fn words_path_for(video: &Path) -> PathBuf {
    video.with_file_name(format!("{}.words.json", file_stem(video)))
}

/// `<output_dir>/<relative dir>/<stem>.mp4` for a video found under `input_dir`.
pub fn output_path_for(video: &Path, input_dir: &Path, output_dir: &Path) -> PathBuf {
    let rel_dir = video
        .parent()
        .and_then(|p| p.strip_prefix(input_dir).ok())
        .unwrap_or_else(|| Path::new(""));
    output_dir
        .join(rel_dir)
        .join(format!("{}.mp4", file_stem(video)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn temp_output_path(output: &Path) -> CaptionResult<PathBuf> {
    let name = output
        .file_stem()
        .ok_or_else(|| CaptionError::media(format!("invalid output path '{}'", output.display())))?;
    Ok(output.with_file_name(format!(".{}.partial.mp4", name.to_string_lossy())))
}

fn remove_file(path: &Path) -> CaptionResult<()> {
    use anyhow::Context as _;
    std::fs::remove_file(path)
        .with_context(|| format!("failed to replace '{}'", path.display()))?;
    Ok(())
}

/// Removes the wrapped path on drop unless disarmed.
struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/pipeline.rs"]
mod tests;
