use std::collections::HashMap;
use std::sync::{Arc, mpsc};

use rayon::prelude::*;

use crate::animation::resolver::{AnimationTiming, RenderState, resolve};
use crate::encode::sink::{OverlaySink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::layout::engine::Layout;
use crate::render::backend::FrameRGBA;
use crate::render::cpu::{OverlayRenderer, RenderScratch};

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Options controlling [`CaptionSession::render_range`].
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Render overlays on a dedicated rayon pool.
    pub parallel: bool,
    /// Frames planned and rendered per chunk.
    pub chunk_size: usize,
    /// Worker thread count. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Render each distinct caption state once per chunk and reuse the pixels.
    pub static_frame_elision: bool,
    /// Bounded channel capacity between workers and the writer thread.
    pub channel_capacity: usize,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 64,
            threads: None,
            static_frame_elision: true,
            channel_capacity: 8,
        }
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    /// Frames the renderer was invoked for.
    pub frames_rendered: u64,
    /// Frames that reused an identical overlay from the same chunk.
    pub frames_elided: u64,
    /// Frames with no visible caption block.
    pub frames_blank: u64,
}

impl RenderStats {
    fn add(&mut self, other: RenderStats) {
        self.frames_total += other.frames_total;
        self.frames_rendered += other.frames_rendered;
        self.frames_elided += other.frames_elided;
        self.frames_blank += other.frames_blank;
    }
}

/// Renders caption overlays for a laid-out timeline, one per output frame.
pub struct CaptionSession {
    layout: Arc<Layout>,
    timing: AnimationTiming,
    renderer: OverlayRenderer,
    fps: Fps,
    opts: SessionOpts,
}

impl CaptionSession {
    pub fn new(
        layout: Arc<Layout>,
        timing: AnimationTiming,
        renderer: OverlayRenderer,
        fps: Fps,
        opts: SessionOpts,
    ) -> Self {
        Self {
            layout,
            timing,
            renderer,
            fps,
            opts,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Caption state at frame `idx`, or `None` when no block is visible.
    pub fn state_at(&self, idx: FrameIndex) -> Option<RenderState> {
        resolve(&self.layout, self.fps.frame_time_secs(idx), &self.timing)
    }

    /// Overlay for frame `idx`. `None` means the frame carries no caption.
    pub fn overlay_at(&self, idx: FrameIndex) -> CaptionResult<Option<FrameRGBA>> {
        self.overlay_at_time(self.fps.frame_time_secs(idx))
    }

    /// Overlay at an arbitrary time in seconds.
    pub fn overlay_at_time(&self, t: f64) -> CaptionResult<Option<FrameRGBA>> {
        resolve(&self.layout, t, &self.timing)
            .map(|state| self.renderer.render(&self.layout, &state))
            .transpose()
    }

    /// Render `range` and stream overlays into `sink` in strictly increasing frame order.
    ///
    /// With `parallel`, workers finish out of order; a writer thread reorders them through a
    /// bounded channel. A failing sink disconnects the channel and stops the workers.
    pub fn render_range(
        &self,
        range: FrameRange,
        sink: &mut dyn OverlaySink,
    ) -> CaptionResult<RenderStats> {
        if range.is_empty() {
            return Err(CaptionError::media("render_range range must be non-empty"));
        }

        let canvas = self.renderer.canvas();
        let cfg = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
        };

        let cap = self.opts.channel_capacity.max(1);
        let bytes_per_frame = (canvas.rgba_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = normalized_chunk_size(self.opts.chunk_size)
            .min(max_chunk_by_mem)
            .min(range.len_frames());

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };

        std::thread::scope(|scope| -> CaptionResult<RenderStats> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let range_start = range.start.0;
            let range_end = range.end.0;

            let writer = scope.spawn(move || -> Result<(), WriterFailure> {
                sink.begin(cfg).map_err(WriterFailure::Sink)?;

                let mut next = range_start;
                let mut pending = HashMap::<u64, Option<Arc<FrameRGBA>>>::new();
                while next < range_end {
                    if !pending.contains_key(&next) {
                        let msg = rx.recv().map_err(|_| WriterFailure::Disconnected)?;
                        pending.insert(msg.idx.0, msg.overlay);
                    }
                    while let Some(overlay) = pending.remove(&next) {
                        sink.push_overlay(FrameIndex(next), overlay.as_deref())
                            .map_err(WriterFailure::Sink)?;
                        next += 1;
                    }
                }

                sink.end().map_err(WriterFailure::Sink)
            });

            let mut stats = RenderStats::default();
            let mut produce = || -> CaptionResult<()> {
                let mut chunk_start = range_start;
                while chunk_start < range_end {
                    let chunk_end = (chunk_start + chunk_size).min(range_end);
                    let chunk_stats = match (pool.as_ref(), self.opts.static_frame_elision) {
                        (pool, true) => {
                            self.render_chunk_elided(pool, &tx, chunk_start, chunk_end)?
                        }
                        (Some(pool), false) => {
                            self.render_chunk_parallel(pool, &tx, chunk_start, chunk_end)?
                        }
                        (None, false) => {
                            self.render_chunk_sequential(&tx, chunk_start, chunk_end)?
                        }
                    };
                    stats.add(chunk_stats);
                    chunk_start = chunk_end;
                }
                Ok(())
            };
            let produce_res = produce();

            drop(tx);
            let writer_res = writer
                .join()
                .map_err(|_| CaptionError::media("encoder thread panicked"))?;

            match (produce_res, writer_res) {
                (_, Err(WriterFailure::Sink(e))) => Err(e),
                (Err(e), _) => Err(e),
                (Ok(()), Err(WriterFailure::Disconnected)) => Err(CaptionError::media(
                    "encoder channel disconnected unexpectedly",
                )),
                (Ok(()), Ok(())) => {
                    tracing::debug!(
                        total = stats.frames_total,
                        rendered = stats.frames_rendered,
                        elided = stats.frames_elided,
                        blank = stats.frames_blank,
                        "caption range rendered"
                    );
                    Ok(stats)
                }
            }
        })
    }

    fn render_chunk_sequential(
        &self,
        tx: &mpsc::SyncSender<FrameMsg>,
        start: u64,
        end: u64,
    ) -> CaptionResult<RenderStats> {
        let mut scratch = RenderScratch::new(&self.renderer);
        let mut stats = RenderStats {
            frames_total: end - start,
            ..RenderStats::default()
        };
        for f in start..end {
            let overlay = match self.state_at(FrameIndex(f)) {
                Some(state) => {
                    stats.frames_rendered += 1;
                    Some(Arc::new(self.renderer.render_with(
                        &mut scratch,
                        &self.layout,
                        &state,
                    )?))
                }
                None => {
                    stats.frames_blank += 1;
                    None
                }
            };
            send(tx, FrameIndex(f), overlay)?;
        }
        Ok(stats)
    }

    fn render_chunk_parallel(
        &self,
        pool: &rayon::ThreadPool,
        tx: &mpsc::SyncSender<FrameMsg>,
        start: u64,
        end: u64,
    ) -> CaptionResult<RenderStats> {
        let blank = (start..end)
            .filter(|&f| self.state_at(FrameIndex(f)).is_none())
            .count() as u64;
        let tx = tx.clone();
        pool.install(|| {
            (start..end).into_par_iter().try_for_each_init(
                || RenderScratch::new(&self.renderer),
                move |scratch, f| -> CaptionResult<()> {
                    let overlay = self
                        .state_at(FrameIndex(f))
                        .map(|state| self.renderer.render_with(scratch, &self.layout, &state))
                        .transpose()?
                        .map(Arc::new);
                    send(&tx, FrameIndex(f), overlay)
                },
            )
        })?;
        Ok(RenderStats {
            frames_total: end - start,
            frames_rendered: end - start - blank,
            frames_elided: 0,
            frames_blank: blank,
        })
    }

    /// Plan the chunk, render each distinct state once, then send every frame in order.
    fn render_chunk_elided(
        &self,
        pool: Option<&rayon::ThreadPool>,
        tx: &mpsc::SyncSender<FrameMsg>,
        start: u64,
        end: u64,
    ) -> CaptionResult<RenderStats> {
        let mut unique = Vec::<RenderState>::new();
        let mut seen = HashMap::<u64, usize>::new();
        let mut frame_to_unique = Vec::<Option<usize>>::with_capacity((end - start) as usize);

        for f in start..end {
            let slot = self.state_at(FrameIndex(f)).map(|state| {
                *seen.entry(state.fingerprint()).or_insert_with(|| {
                    unique.push(state);
                    unique.len() - 1
                })
            });
            frame_to_unique.push(slot);
        }

        let render_one = |scratch: &mut RenderScratch, state: &RenderState| {
            self.renderer
                .render_with(scratch, &self.layout, state)
                .map(Arc::new)
        };
        let rendered: Vec<Arc<FrameRGBA>> = match pool {
            Some(pool) => pool.install(|| {
                unique
                    .par_iter()
                    .map_init(|| RenderScratch::new(&self.renderer), render_one)
                    .collect::<CaptionResult<Vec<_>>>()
            })?,
            None => {
                let mut scratch = RenderScratch::new(&self.renderer);
                unique
                    .iter()
                    .map(|state| render_one(&mut scratch, state))
                    .collect::<CaptionResult<Vec<_>>>()?
            }
        };

        let mut stats = RenderStats {
            frames_total: end - start,
            frames_rendered: rendered.len() as u64,
            ..RenderStats::default()
        };
        for (f, slot) in (start..end).zip(frame_to_unique) {
            match slot {
                Some(u) => send(tx, FrameIndex(f), Some(rendered[u].clone()))?,
                None => {
                    stats.frames_blank += 1;
                    send(tx, FrameIndex(f), None)?;
                }
            }
        }
        stats.frames_elided = stats.frames_total - stats.frames_blank - stats.frames_rendered;
        Ok(stats)
    }
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    overlay: Option<Arc<FrameRGBA>>,
}

enum WriterFailure {
    Disconnected,
    Sink(CaptionError),
}

fn send(
    tx: &mpsc::SyncSender<FrameMsg>,
    idx: FrameIndex,
    overlay: Option<Arc<FrameRGBA>>,
) -> CaptionResult<()> {
    tx.send(FrameMsg { idx, overlay })
        .map_err(|_| CaptionError::media("encoder thread is not accepting frames"))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    chunk_size.max(1) as u64
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> CaptionResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(CaptionError::config("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CaptionError::media(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/session/caption_session.rs"]
mod tests;
