use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::compositor::FrameSource;
use crate::encode::ffmpeg::{join_stderr_drain, spawn_stderr_drain};
use crate::foundation::core::Fps;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::geometry::aspect::PadGeometry;
use crate::render::backend::FrameRGBA;
use crate::style::color::Color;

/// Stream properties of a source video, as reported by ffprobe.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Nominal (`r_frame_rate`) rate; the output is encoded at this rate.
    pub fps: Fps,
    /// Average rate over the stream, when ffprobe reports one.
    pub avg_fps: Option<Fps>,
    pub duration_secs: f64,
    pub has_audio: bool,
}

impl VideoSourceInfo {
    /// Number of output frames covering the source duration.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_ceil(self.duration_secs)
    }

    /// Heuristic: nominal and average rates disagree by more than 1%.
    pub fn is_variable_frame_rate(&self) -> bool {
        match self.avg_fps {
            Some(avg) => {
                let nominal = self.fps.as_f64();
                (nominal - avg.as_f64()).abs() > nominal * 0.01
            }
            None => false,
        }
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[tracing::instrument(skip(source_path), fields(path = %source_path.display()))]
pub fn probe_video(source_path: &Path) -> CaptionResult<VideoSourceInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| CaptionError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(CaptionError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let info = parse_probe_json(source_path, &out.stdout)?;
    if info.is_variable_frame_rate() {
        tracing::warn!(
            nominal = info.fps.as_f64(),
            average = info.avg_fps.map(Fps::as_f64),
            "source looks variable-frame-rate; output is resampled to the nominal rate"
        );
    }
    tracing::debug!(
        width = info.width,
        height = info.height,
        fps = info.fps.as_f64(),
        duration = info.duration_secs,
        audio = info.has_audio,
        "probed source video"
    );
    Ok(info)
}

pub(crate) fn parse_probe_json(source_path: &Path, json: &[u8]) -> CaptionResult<VideoSourceInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| CaptionError::media(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CaptionError::media("no video stream found"))?;
    let width = video
        .width
        .ok_or_else(|| CaptionError::media("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| CaptionError::media("missing video height from ffprobe"))?;

    let (num, den) = parse_ff_ratio(video.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| CaptionError::media("invalid video r_frame_rate"))?;
    let fps = Fps::new(num, den)?;
    let avg_fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_ff_ratio)
        .and_then(|(n, d)| Fps::new(n, d).ok());

    let parse_secs = |s: &Option<String>| {
        s.as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
    };
    let duration_secs = parse_secs(&video.duration)
        .or_else(|| parsed.format.as_ref().and_then(|f| parse_secs(&f.duration)))
        .ok_or_else(|| CaptionError::media("ffprobe reported no usable duration"))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps,
        avg_fps,
        duration_secs,
        has_audio,
    })
}

/// Parse an ffmpeg rational such as `30000/1001`. A bare integer means `n/1`.
pub(crate) fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let (num, den) = match s.split_once('/') {
        Some((n, d)) => (n.trim().parse::<u32>().ok()?, d.trim().parse::<u32>().ok()?),
        None => (s.parse::<u32>().ok()?, 1),
    };
    (num > 0 && den > 0).then_some((num, den))
}

/// `-vf` filter chain that pads the source to the 9:16 canvas and fixes the frame rate.
pub(crate) fn pad_filter(pad: &PadGeometry, color: Color, fps: Fps) -> String {
    format!(
        "pad={}:{}:{}:{}:color={},fps={}/{}",
        pad.padded_width,
        pad.padded_height,
        pad.pad_left,
        pad.pad_top,
        color.to_ffmpeg(),
        fps.num,
        fps.den
    )
}

/// Decodes a source video through ffmpeg, padded to the caption canvas, as opaque RGBA frames.
pub struct PaddedFrameReader {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
    eof: bool,
}

impl PaddedFrameReader {
    pub fn spawn(info: &VideoSourceInfo, pad: &PadGeometry, color: Color) -> CaptionResult<Self> {
        let filter = pad_filter(pad, color, info.fps);
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&info.source_path)
            .args([
                "-map",
                "0:v:0",
                "-vf",
                filter.as_str(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CaptionError::media(format!("failed to spawn ffmpeg decoder: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptionError::media("failed to open ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptionError::media("failed to open ffmpeg stderr"))?;

        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(spawn_stderr_drain(stderr)),
            width: pad.padded_width,
            height: pad.padded_height,
            frame_len: pad.canvas().rgba_len(),
            frames_read: 0,
            eof: false,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

/// Fill `buf` from `r`. Returns the number of bytes read, short only at end of stream.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl FrameSource for PaddedFrameReader {
    fn next_frame(&mut self) -> CaptionResult<Option<FrameRGBA>> {
        if self.eof {
            return Ok(None);
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; self.frame_len];
        let n = read_full(stdout, &mut buf)
            .map_err(|e| CaptionError::media(format!("failed to read decoded frame: {e}")))?;
        if n < self.frame_len {
            if n > 0 {
                tracing::warn!(bytes = n, "discarding truncated trailing frame from decoder");
            }
            self.eof = true;
            return Ok(None);
        }
        self.frames_read += 1;
        FrameRGBA::from_raw(self.width, self.height, buf, false).map(Some)
    }

    fn finish(&mut self) -> CaptionResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        // Frames past the caption range are not needed.
        if !self.eof {
            let _ = child.kill();
        }
        let status = child
            .wait()
            .map_err(|e| CaptionError::media(format!("failed to wait for ffmpeg decoder: {e}")))?;
        let stderr = join_stderr_drain(self.stderr_drain.take())?;
        if self.eof && !status.success() {
            return Err(CaptionError::media(format!(
                "ffmpeg decoder exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for PaddedFrameReader {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
