use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::CaptionResult;
use crate::render::backend::FrameRGBA;

/// Configuration provided to a sink at the start of a range render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

/// Consumer of finished output frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()>;
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> CaptionResult<()>;
    fn end(&mut self) -> CaptionResult<()>;
}

/// Consumer of caption overlays, one call per output frame.
///
/// `overlay` is `None` for frames with no visible caption. Same ordering contract as
/// [`FrameSink`].
pub trait OverlaySink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()>;
    fn push_overlay(&mut self, idx: FrameIndex, overlay: Option<&FrameRGBA>) -> CaptionResult<()>;
    fn end(&mut self) -> CaptionResult<()>;
}

/// In-memory frame sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> CaptionResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CaptionResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// In-memory overlay sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryOverlaySink {
    cfg: Option<SinkConfig>,
    overlays: Vec<(FrameIndex, Option<FrameRGBA>)>,
}

impl InMemoryOverlaySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn overlays(&self) -> &[(FrameIndex, Option<FrameRGBA>)] {
        &self.overlays
    }
}

impl OverlaySink for InMemoryOverlaySink {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()> {
        self.cfg = Some(cfg);
        self.overlays.clear();
        Ok(())
    }

    fn push_overlay(&mut self, idx: FrameIndex, overlay: Option<&FrameRGBA>) -> CaptionResult<()> {
        self.overlays.push((idx, overlay.cloned()));
        Ok(())
    }

    fn end(&mut self) -> CaptionResult<()> {
        Ok(())
    }
}
