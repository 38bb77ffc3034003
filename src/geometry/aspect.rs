use serde::Serialize;

use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::foundation::math::ceil_even;
use crate::style::config::{AspectRatio, SafeZoneMargins};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn classify(width: u32, height: u32) -> Self {
        let ratio = f64::from(width) / f64::from(height);
        if ratio < 0.7 {
            Self::Portrait
        } else if ratio > 1.3 {
            Self::Landscape
        } else {
            Self::Square
        }
    }
}

/// What to do with a source whose ratio is outside the tolerance of the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AspectMismatch {
    /// Letterbox or pillarbox to the target ratio.
    #[default]
    Pad,
    /// Fail the video with [`CaptionError::InvalidGeometry`].
    Reject,
    /// Leave the frame at its source size.
    Keep,
}

/// Symmetric padding that brings a source frame to the target aspect ratio. Never crops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PadGeometry {
    pub source_width: u32,
    pub source_height: u32,
    pub padded_width: u32,
    pub padded_height: u32,
    pub pad_top: u32,
    pub pad_left: u32,
    pub orientation: Orientation,
}

impl PadGeometry {
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.padded_width,
            height: self.padded_height,
        }
    }

    /// True when the source already matches the target and only even-rounding may apply.
    pub fn is_passthrough(&self) -> bool {
        self.pad_top == 0 && self.pad_left == 0
    }

    pub fn pad_bottom(&self) -> u32 {
        self.padded_height - self.source_height - self.pad_top
    }

    pub fn pad_right(&self) -> u32 {
        self.padded_width - self.source_width - self.pad_left
    }
}

/// Region of the padded frame where captions may be drawn, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SafeZoneRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SafeZoneRect {
    pub fn from_margins(canvas: Canvas, m: &SafeZoneMargins) -> Self {
        let w = f64::from(canvas.width);
        let h = f64::from(canvas.height);
        Self {
            x: m.left * w,
            y: m.top * h,
            width: w * (1.0 - m.left - m.right),
            height: h * (1.0 - m.top - m.bottom),
        }
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_within(&self, canvas: Canvas) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= f64::from(canvas.width) + 1e-9
            && self.bottom() <= f64::from(canvas.height) + 1e-9
    }
}

/// Padding plus safe zone, computed once per video before layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameGeometry {
    pub pad: PadGeometry,
    pub safe_zone: SafeZoneRect,
}

/// Compute the padding needed to reach `target` and the safe zone inside the padded frame.
///
/// Ratios within `tolerance` of the target count as matching; `on_mismatch` decides the rest.
/// Padded dimensions are rounded up to even values (yuv420p needs them); the rounding pixel lands
/// on the bottom/right edge.
pub fn resolve_geometry(
    width: i64,
    height: i64,
    target: AspectRatio,
    margins: &SafeZoneMargins,
    tolerance: f64,
    on_mismatch: AspectMismatch,
) -> CaptionResult<FrameGeometry> {
    if width <= 0 || height <= 0 {
        return Err(CaptionError::geometry(format!(
            "source dimensions must be > 0, got {width}x{height}"
        )));
    }
    if target.num == 0 || target.den == 0 {
        return Err(CaptionError::geometry("target aspect ratio must be > 0"));
    }
    let (src_w, src_h) = (
        u32::try_from(width).map_err(|_| CaptionError::geometry("source width too large"))?,
        u32::try_from(height).map_err(|_| CaptionError::geometry("source height too large"))?,
    );

    let ratio = f64::from(src_w) / f64::from(src_h);
    let target_ratio = target.as_f64();
    let (w64, h64) = (u64::from(src_w), u64::from(src_h));
    let (num, den) = (u64::from(target.num), u64::from(target.den));

    let matches = (ratio - target_ratio).abs() <= tolerance;
    if !matches {
        tracing::warn!(
            ratio,
            target = target_ratio,
            policy = ?on_mismatch,
            "source is not {target}"
        );
        if on_mismatch == AspectMismatch::Reject {
            return Err(CaptionError::geometry(format!(
                "source must be {target}, got {src_w}x{src_h} (ratio {ratio:.4})"
            )));
        }
    }

    let (padded_w, padded_h) = if matches || on_mismatch == AspectMismatch::Keep {
        (ceil_even(w64), ceil_even(h64))
    } else if ratio > target_ratio {
        // Too wide: letterbox.
        (ceil_even(w64), ceil_even((w64 * den).div_ceil(num)))
    } else {
        // Too tall: pillarbox.
        (ceil_even((h64 * num).div_ceil(den)), ceil_even(h64))
    };
    let padded_width = u32::try_from(padded_w)
        .map_err(|_| CaptionError::geometry("padded width overflows u32"))?;
    let padded_height = u32::try_from(padded_h)
        .map_err(|_| CaptionError::geometry("padded height overflows u32"))?;

    let pad = PadGeometry {
        source_width: src_w,
        source_height: src_h,
        padded_width,
        padded_height,
        pad_top: (padded_height - src_h) / 2,
        pad_left: (padded_width - src_w) / 2,
        orientation: Orientation::classify(src_w, src_h),
    };
    // Even-rounding alone must not shift the picture.
    let pad = if padded_height - src_h <= 1 && padded_width - src_w <= 1 {
        PadGeometry {
            pad_top: 0,
            pad_left: 0,
            ..pad
        }
    } else {
        pad
    };

    let safe_zone = SafeZoneRect::from_margins(pad.canvas(), margins);
    if !safe_zone.is_within(pad.canvas()) || safe_zone.width <= 0.0 || safe_zone.height <= 0.0 {
        return Err(CaptionError::geometry(format!(
            "safe zone {safe_zone:?} does not fit a {padded_width}x{padded_height} frame"
        )));
    }

    tracing::debug!(
        src = %format!("{src_w}x{src_h}"),
        padded = %format!("{padded_width}x{padded_height}"),
        pad_top = pad.pad_top,
        pad_left = pad.pad_left,
        orientation = ?pad.orientation,
        "frame geometry resolved"
    );

    Ok(FrameGeometry { pad, safe_zone })
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/aspect.rs"]
mod tests;
