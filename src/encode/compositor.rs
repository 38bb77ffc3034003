use crate::encode::sink::{FrameSink, OverlaySink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::render::backend::FrameRGBA;
use crate::render::composite::over_in_place;

/// Producer of padded, opaque source frames in presentation order.
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> CaptionResult<Option<FrameRGBA>>;

    /// Release the source. Called once after the last frame has been consumed.
    fn finish(&mut self) -> CaptionResult<()> {
        Ok(())
    }
}

/// Blends caption overlays onto source frames and forwards the result to an inner [`FrameSink`].
///
/// When the source ends before the requested range does, the last source frame is repeated.
pub struct CompositingSink<R: FrameSource, S: FrameSink> {
    source: R,
    inner: S,
    last: Option<FrameRGBA>,
    source_done: bool,
    repeated: u64,
}

impl<R: FrameSource, S: FrameSink> CompositingSink<R, S> {
    pub fn new(source: R, inner: S) -> Self {
        Self {
            source,
            inner,
            last: None,
            source_done: false,
            repeated: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn advance_source(&mut self) -> CaptionResult<()> {
        if self.source_done {
            self.repeated += 1;
            return Ok(());
        }
        match self.source.next_frame()? {
            Some(frame) => self.last = Some(frame),
            None => {
                self.source_done = true;
                self.repeated += 1;
            }
        }
        Ok(())
    }
}

impl<R: FrameSource, S: FrameSink> OverlaySink for CompositingSink<R, S> {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()> {
        self.last = None;
        self.source_done = false;
        self.repeated = 0;
        self.inner.begin(cfg)
    }

    fn push_overlay(&mut self, idx: FrameIndex, overlay: Option<&FrameRGBA>) -> CaptionResult<()> {
        self.advance_source()?;
        let base = self.last.as_ref().ok_or_else(|| {
            CaptionError::media("source video produced no frames before the caption range")
        })?;

        let Some(overlay) = overlay else {
            return self.inner.push_frame(idx, base);
        };
        if overlay.width != base.width || overlay.height != base.height {
            return Err(CaptionError::media(format!(
                "overlay is {}x{} but padded source frame is {}x{}",
                overlay.width, overlay.height, base.width, base.height
            )));
        }

        let mut composed = base.clone();
        over_in_place(&mut composed.data, &overlay.data)?;
        self.inner.push_frame(idx, &composed)
    }

    fn end(&mut self) -> CaptionResult<()> {
        if self.repeated > 0 {
            tracing::debug!(
                frames = self.repeated,
                "source ended early; repeated last frame"
            );
        }
        self.source.finish()?;
        self.inner.end()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/compositor.rs"]
mod tests;
