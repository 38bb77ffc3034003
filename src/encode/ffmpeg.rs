use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Background used to flatten any remaining alpha (straight RGBA8).
    pub bg_rgba: [u8; 4],
    /// Source video whose audio track, if any, is copied into the output.
    pub audio_source: Option<PathBuf>,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            audio_source: None,
        }
    }

    pub fn with_audio_from(mut self, source: impl Into<PathBuf>) -> Self {
        self.audio_source = Some(source.into());
        self
    }
}

/// Streams finished frames into the system `ffmpeg` as raw RGBA on stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

fn validate_sink_config(cfg: &SinkConfig) -> CaptionResult<()> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(CaptionError::media("fps must be non-zero"));
    }
    if cfg.width == 0 || cfg.height == 0 {
        return Err(CaptionError::media(
            "ffmpeg sink width/height must be non-zero",
        ));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        return Err(CaptionError::media(
            "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
        ));
    }
    Ok(())
}

/// Full argument list for the encoder process.
pub(crate) fn encoder_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: &str| args.push(OsString::from(s));

    push(if opts.overwrite { "-y" } else { "-n" });
    push("-loglevel");
    push("error");
    push("-f");
    push("rawvideo");
    push("-pix_fmt");
    push("rgba");
    push("-s");
    push(&format!("{}x{}", cfg.width, cfg.height));
    push("-r");
    push(&format!("{}/{}", cfg.fps.num, cfg.fps.den));
    push("-i");
    push("pipe:0");

    match opts.audio_source.as_ref() {
        Some(source) => {
            args.push(OsString::from("-i"));
            args.push(source.as_os_str().to_owned());
            for a in ["-map", "0:v:0", "-map", "1:a:0?", "-c:a", "aac", "-shortest"] {
                args.push(OsString::from(a));
            }
        }
        None => args.push(OsString::from("-an")),
    }

    for a in [
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
        "-f",
        "mp4",
    ] {
        args.push(OsString::from(a));
    }
    args.push(opts.out_path.as_os_str().to_owned());
    args
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> CaptionResult<()> {
        validate_sink_config(&cfg)?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(CaptionError::media(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(CaptionError::media(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args(encoder_args(&self.opts, &cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CaptionError::media(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CaptionError::media("failed to open ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptionError::media("failed to open ffmpeg stderr"))?;

        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            audio = self.opts.audio_source.is_some(),
            "ffmpeg encoder started"
        );

        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(spawn_stderr_drain(stderr));
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> CaptionResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CaptionError::media("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(CaptionError::media(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CaptionError::media(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(CaptionError::media(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let bytes: &[u8] = if frame.premultiplied {
            flatten_premul_over_bg_to_opaque_rgba8(
                &mut self.scratch,
                &frame.data,
                self.opts.bg_rgba,
            )?;
            &self.scratch
        } else {
            &frame.data
        };

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CaptionError::media("ffmpeg sink is already finalized"));
        };
        stdin.write_all(bytes).map_err(|e| {
            CaptionError::media(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> CaptionResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CaptionError::media("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| CaptionError::media(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = join_stderr_drain(self.stderr_drain.take())?;

        if !status.success() {
            return Err(CaptionError::media(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        self.cfg = None;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub(crate) fn spawn_stderr_drain<R: Read + Send + 'static>(
    mut stderr: R,
) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    })
}

pub(crate) fn join_stderr_drain(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> CaptionResult<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| CaptionError::media("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| CaptionError::media(format!("ffmpeg stderr read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> CaptionResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CaptionError::media(
            "flatten expects equal-length rgba8 buffers",
        ));
    }
    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        if s[3] == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - u16::from(s[3]);
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> CaptionResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
