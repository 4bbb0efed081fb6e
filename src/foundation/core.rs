use std::cmp::Ordering;

use crate::foundation::error::{FlatviewError, FlatviewResult};

pub use kurbo::{Affine, Vec2};

/// Rational media timestamp `value / timescale` seconds.
///
/// Comparison is exact (cross-multiplied in `i128`), so values with different timescales order
/// correctly.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaTime {
    /// Tick count.
    pub value: i64,
    /// Ticks per second, must be non-zero.
    pub timescale: u32,
}

impl MediaTime {
    /// Zero seconds.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    /// Create a validated media time.
    pub fn new(value: i64, timescale: u32) -> FlatviewResult<Self> {
        if timescale == 0 {
            return Err(FlatviewError::validation("MediaTime timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    /// Millisecond-precision time. Always valid.
    pub const fn from_millis(ms: i64) -> Self {
        Self {
            value: ms,
            timescale: 1_000,
        }
    }

    /// Quantize `secs` to `timescale` ticks (round to nearest).
    pub fn from_secs_f64(secs: f64, timescale: u32) -> FlatviewResult<Self> {
        if !secs.is_finite() {
            return Err(FlatviewError::validation(format!(
                "MediaTime seconds must be finite, got {secs}"
            )));
        }
        Self::new((secs * f64::from(timescale)).round() as i64, timescale)
    }

    /// Whether this value can be used as a timestamp at all.
    pub fn is_valid(self) -> bool {
        self.timescale != 0
    }

    /// Convert to floating-point seconds.
    pub fn as_secs_f64(self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.value as f64 / f64::from(self.timescale)
    }

    /// Difference `self - other` in seconds.
    pub fn secs_since(self, other: Self) -> f64 {
        self.as_secs_f64() - other.as_secs_f64()
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.value) * i128::from(other.timescale);
        let rhs = i128::from(other.value) * i128::from(self.timescale);
        lhs.cmp(&rhs)
    }
}

impl std::fmt::Display for MediaTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> FlatviewResult<Self> {
        if den == 0 {
            return Err(FlatviewError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(FlatviewError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse the `num/den` notation used by container probes (e.g. `"30000/1001"`).
    pub fn parse_ratio(s: &str) -> FlatviewResult<Self> {
        let (num, den) = s.split_once('/').unwrap_or((s, "1"));
        let num = num
            .trim()
            .parse::<u32>()
            .map_err(|e| FlatviewError::validation(format!("invalid fps numerator '{s}': {e}")))?;
        let den = den.trim().parse::<u32>().map_err(|e| {
            FlatviewError::validation(format!("invalid fps denominator '{s}': {e}"))
        })?;
        Self::new(num, den)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Timestamp of frame `n` counted from zero, in a `num`-based timescale.
    pub fn frame_time(self, n: u64) -> MediaTime {
        MediaTime {
            value: (n as i64).saturating_mul(i64::from(self.den)),
            timescale: self.num,
        }
    }
}

/// Integer pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a size value.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return `true` when both sides are even (yuv420p-compatible).
    pub fn is_even(self) -> bool {
        self.width.is_multiple_of(2) && self.height.is_multiple_of(2)
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Preferred display transform of a video track.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Orientation {
    /// Affine display transform; only the linear part affects geometry.
    pub transform: Affine,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Orientation {
    /// No rotation or flip.
    pub fn identity() -> Self {
        Self {
            transform: Affine::IDENTITY,
        }
    }

    /// Build from a display rotation in degrees, counter-clockwise as display matrices report it.
    pub fn from_display_rotation(degrees: f64) -> Self {
        Self {
            transform: Affine::rotate(degrees.to_radians()),
        }
    }

    /// Rotation encoded by the transform, in degrees, normalized to `(-180, 180]`.
    pub fn rotation_degrees(self) -> f64 {
        let [a, b, _, _, _, _] = self.transform.as_coeffs();
        let mut deg = b.atan2(a).to_degrees();
        if deg <= -180.0 {
            deg += 360.0;
        }
        // Snap float noise from trig round-trips (e.g. 89.99999999).
        let snapped = deg.round();
        if (deg - snapped).abs() < 1e-6 {
            snapped
        } else {
            deg
        }
    }

    /// Return `true` when the transform mirrors the image.
    pub fn is_mirrored(self) -> bool {
        self.transform.determinant() < 0.0
    }

    /// Apply the linear part to `size` and take absolute width/height.
    pub fn apply_to_size(self, size: PixelSize) -> PixelSize {
        let [a, b, c, d, _, _] = self.transform.as_coeffs();
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let v = Vec2::new(a * w + c * h, b * w + d * h);
        PixelSize::new(v.x.abs().round() as u32, v.y.abs().round() as u32)
    }
}

/// Orientation and natural size of the source video track.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackGeometry {
    /// Preferred display transform.
    pub orientation: Orientation,
    /// Coded (natural) pixel size of one view.
    pub natural_size: PixelSize,
}

impl TrackGeometry {
    /// Natural size transformed by the orientation, with absolute dimensions.
    pub fn applied_size(self) -> PixelSize {
        self.orientation.apply_to_size(self.natural_size)
    }

    /// Fixed output geometry of a side-by-side session: `(applied.width, applied.height / 2)`.
    pub fn output_size(self) -> PixelSize {
        let applied = self.applied_size();
        PixelSize::new(applied.width, applied.height / 2)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
