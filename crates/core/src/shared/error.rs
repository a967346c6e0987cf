use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("no timestamp given and no nominal frame rate configured")]
    MissingFrameRate,
    #[error("invalid nominal frame rate: {0}")]
    InvalidFrameRate(f64),
    #[error("invalid timestamp: {reason}")]
    InvalidTimestamp { reason: String },
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },
    #[error("frame is {actual:?} but the stream was fixed at {expected:?}")]
    GeometryMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("session for {path} is already closed")]
    SessionClosed { path: PathBuf },
    #[error("frame not found at {at_seconds:.3}s in {path}")]
    FrameNotFound { path: PathBuf, at_seconds: f64 },
    #[error("no video stream found in {path}")]
    NoVideoStream { path: PathBuf },
    #[error("invalid time base {num}/{den}")]
    InvalidTimeBase { num: i32, den: i32 },
    #[error("session for {path} failed while starting its stream and cannot be written")]
    SessionBroken { path: PathBuf },
    #[error("no usable video encoder registered")]
    EncoderNotFound,
    #[error("ffmpeg: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl VideoError {
    /// Errors caused by the caller's input or call sequence; retrying the
    /// same call cannot succeed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingFrameRate
                | Self::InvalidFrameRate(_)
                | Self::InvalidTimestamp { .. }
                | Self::InvalidFrame { .. }
                | Self::GeometryMismatch { .. }
                | Self::SessionClosed { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FrameNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(VideoError::MissingFrameRate.is_precondition());
        assert!(VideoError::GeometryMismatch {
            expected: (64, 48),
            actual: (32, 24)
        }
        .is_precondition());
        assert!(!VideoError::EncoderNotFound.is_precondition());
        assert!(!VideoError::Io(std::io::Error::other("disk")).is_precondition());
    }

    #[test]
    fn test_not_found_message_names_time_and_path() {
        let err = VideoError::FrameNotFound {
            path: PathBuf::from("/tmp/a.mp4"),
            at_seconds: 2.5,
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "frame not found at 2.500s in /tmp/a.mp4");
    }
}
