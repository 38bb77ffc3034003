//! wordreel burns word-synchronized, animated captions into short-form video.
//!
//! A run loads a [`StyleConfig`] and a font once, then for each video:
//!
//! - pads the frame to the target aspect ratio and derives the caption safe zone
//!   ([`resolve_geometry`])
//! - groups the [`WordTimeline`] into caption blocks and lines ([`layout_timeline`])
//! - resolves per-word animation state for every output frame ([`resolve`])
//! - rasterizes transparent overlays ([`OverlayRenderer`]) and streams them, in order, through a
//!   [`CaptionSession`] into a compositing ffmpeg encoder
#![forbid(unsafe_code)]

mod animation;
mod assets;
mod batch;
mod encode;
mod foundation;
mod geometry;
mod layout;
mod render;
mod session;
mod style;
mod text;
mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8Premul};
pub use crate::foundation::error::{CaptionError, CaptionResult, CaptionWarning};

pub use crate::animation::ease::Ease;
pub use crate::animation::resolver::{
    AnimationTiming, RenderState, WordPhase, WordState, effective_end, find_block, resolve,
    resolve_block,
};
pub use crate::assets::font::LoadedFont;
pub use crate::assets::media::{
    PaddedFrameReader, VideoSourceInfo, is_ffprobe_on_path, probe_video,
};
pub use crate::batch::pipeline::{
    BatchReport, CaptionPipeline, CaptionPlan, PipelineOpts, VIDEO_EXTENSIONS, VideoReport,
    is_video_path, output_path_for, plan_captions, scan_videos, words_path_for,
};
pub use crate::encode::compositor::{CompositingSink, FrameSource};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{
    FrameSink, InMemoryOverlaySink, InMemorySink, OverlaySink, SinkConfig,
};
pub use crate::geometry::aspect::{
    AspectMismatch, FrameGeometry, Orientation, PadGeometry, SafeZoneRect, resolve_geometry,
};
pub use crate::layout::engine::{CaptionBlock, Layout, Line, PlacedWord, layout_timeline};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::cpu::OverlayRenderer;
pub use crate::session::caption_session::{CaptionSession, RenderStats, SessionOpts};
pub use crate::style::color::Color;
pub use crate::style::config::{
    AnimationKind, AspectRatio, HorizontalAlign, SafeZoneMargins, ShadowStyle, StyleConfig,
    VerticalAlign,
};
pub use crate::text::shaper::{
    FixedAdvanceShaper, FontMetrics, FontShaper, ShapedGlyph, ShapedText, TextShaper,
};
pub use crate::timeline::words::{WordTimeline, WordToken, display_text};
