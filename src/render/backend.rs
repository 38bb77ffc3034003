use crate::foundation::core::Canvas;
use crate::foundation::error::{CaptionError, CaptionResult};

/// A frame of RGBA8 pixels in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Whether color channels are premultiplied by alpha (overlays are; decoded frames are opaque).
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.rgba_len()],
            premultiplied: true,
        }
    }

    /// Wrap decoded bytes, checking their length against the dimensions.
    pub fn from_raw(
        width: u32,
        height: u32,
        data: Vec<u8>,
        premultiplied: bool,
    ) -> CaptionResult<Self> {
        let expected = Canvas { width, height }.rgba_len();
        if data.len() != expected {
            return Err(CaptionError::media(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied,
        })
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data
            .get(i..i + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// True when no pixel has any coverage.
    pub fn is_fully_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Straight-alpha copy of the pixels, suitable for PNG output.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
