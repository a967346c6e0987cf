use num_rational::Rational64;

use crate::shared::constants::DEFAULT_TIME_BASE_DEN;
use crate::shared::error::VideoError;

/// Rational unit of the integer PTS grid, in seconds per tick.
///
/// Fixed for the lifetime of a stream. `to_pts` truncates toward zero and
/// `to_seconds` is exact, so `to_seconds(to_pts(x))` is within one tick of `x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeBase {
    num: i32,
    den: i32,
}

impl TimeBase {
    pub fn new(num: i32, den: i32) -> Self {
        assert!(num > 0 && den > 0, "time base must be positive");
        Self { num, den }
    }

    /// Fallible form of [`TimeBase::new`] for values read from a container.
    pub fn try_new(num: i32, den: i32) -> Result<Self, VideoError> {
        if num > 0 && den > 0 {
            Ok(Self { num, den })
        } else {
            Err(VideoError::InvalidTimeBase { num, den })
        }
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    pub fn as_ratio(&self) -> Rational64 {
        Rational64::new(self.num as i64, self.den as i64)
    }

    pub fn to_pts(&self, seconds: Rational64) -> i64 {
        // seconds / (num / den), widened so large denominators cannot overflow
        let numer = *seconds.numer() as i128 * self.den as i128;
        let denom = *seconds.denom() as i128 * self.num as i128;
        (numer / denom) as i64
    }

    pub fn to_seconds(&self, pts: i64) -> Rational64 {
        Rational64::new(pts * self.num as i64, self.den as i64)
    }

    pub fn to_pts_f64(&self, seconds: f64) -> i64 {
        (seconds * self.den as f64 / self.num as f64).trunc() as i64
    }

    pub fn to_seconds_f64(&self, pts: i64) -> f64 {
        pts as f64 * self.num as f64 / self.den as f64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new(1, DEFAULT_TIME_BASE_DEN)
    }
}

impl From<TimeBase> for ffmpeg_next::Rational {
    fn from(tb: TimeBase) -> Self {
        ffmpeg_next::Rational(tb.num, tb.den)
    }
}

impl TryFrom<ffmpeg_next::Rational> for TimeBase {
    type Error = VideoError;

    fn try_from(r: ffmpeg_next::Rational) -> Result<Self, Self::Error> {
        Self::try_new(r.numerator(), r.denominator())
    }
}

impl std::fmt::Display for TimeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
