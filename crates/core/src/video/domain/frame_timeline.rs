use num_rational::Rational64;

use crate::shared::constants::{DUPLICATE_TOLERANCE_DENOM, DUPLICATE_TOLERANCE_NUMER};
use crate::shared::error::VideoError;
use crate::shared::time_base::TimeBase;
use crate::shared::timestamp::Timestamp;

/// A caller timestamp normalised once into both grid ticks and seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTime {
    pub pts: i64,
    pub seconds: Rational64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Accept,
    /// Too close to (or before) the last accepted frame at `previous` ticks.
    Duplicate { previous: i64 },
}

/// Maps caller timestamps onto a writer's PTS grid and filters duplicates.
///
/// `last_pts` only moves on `commit`, which the writer calls after the frame
/// reached the muxer, so accepted PTS values are strictly increasing.
#[derive(Clone, Debug)]
pub struct FrameTimeline {
    time_base: TimeBase,
    nominal_fps: Option<f64>,
    tolerance_pts: i64,
    last_pts: Option<i64>,
}

impl FrameTimeline {
    pub fn new(time_base: TimeBase, nominal_fps: Option<f64>) -> Result<Self, VideoError> {
        if let Some(fps) = nominal_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(VideoError::InvalidFrameRate(fps));
            }
        }
        let tolerance = Rational64::new(DUPLICATE_TOLERANCE_NUMER, DUPLICATE_TOLERANCE_DENOM);
        Ok(Self {
            time_base,
            nominal_fps,
            tolerance_pts: time_base.to_pts(tolerance),
            last_pts: None,
        })
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    pub fn last_pts(&self) -> Option<i64> {
        self.last_pts
    }

    pub fn tolerance_pts(&self) -> i64 {
        self.tolerance_pts
    }

    pub fn resolve(&self, timestamp: Timestamp) -> Result<ResolvedTime, VideoError> {
        let pts = match timestamp {
            Timestamp::GridUnits(pts) => pts,
            Timestamp::Seconds(seconds) => self.time_base.to_pts(seconds),
            Timestamp::Unspecified => {
                let fps = self.nominal_fps.ok_or(VideoError::MissingFrameRate)?;
                match self.last_pts {
                    None => 0,
                    Some(last) => last
                        .checked_add(self.frame_interval_pts(fps)?)
                        .ok_or_else(|| VideoError::InvalidTimestamp {
                            reason: format!("next frame after {last} ticks overflows the grid"),
                        })?,
                }
            }
        };
        if pts < 0 {
            return Err(VideoError::InvalidTimestamp {
                reason: format!("negative presentation time ({pts} ticks)"),
            });
        }
        let seconds = match timestamp {
            Timestamp::Seconds(seconds) => seconds,
            _ => self.time_base.to_seconds(pts),
        };
        Ok(ResolvedTime { pts, seconds })
    }

    pub fn classify(&self, time: &ResolvedTime) -> Admission {
        match self.last_pts {
            Some(previous) if time.pts - previous < self.tolerance_pts => {
                Admission::Duplicate { previous }
            }
            _ => Admission::Accept,
        }
    }

    pub fn commit(&mut self, time: &ResolvedTime) {
        debug_assert!(self.last_pts.map_or(true, |last| time.pts > last));
        self.last_pts = Some(time.pts);
    }

    fn frame_interval_pts(&self, fps: f64) -> Result<i64, VideoError> {
        let rate = Rational64::approximate_float(fps).ok_or(VideoError::InvalidFrameRate(fps))?;
        Ok(self.time_base.to_pts(rate.recip()))
    }
}
