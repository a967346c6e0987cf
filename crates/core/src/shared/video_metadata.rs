use std::path::PathBuf;

use num_rational::Rational64;

use crate::shared::time_base::TimeBase;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub time_base: TimeBase,
    /// Container-reported average rate; 0.0 when unknown.
    pub average_fps: f64,
    /// Number of video packets in the stream.
    pub total_frames: usize,
    /// Presentation time of the latest frame, `None` for an empty stream.
    pub last_frame_time: Option<Rational64>,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 1920,
            height: 1080,
            time_base: TimeBase::default(),
            average_fps: 60.0,
            total_frames,
            last_frame_time: (total_frames > 0).then(|| Rational64::new(total_frames as i64 - 1, 60)),
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/test.mp4")),
        }
    }

    #[test]
    fn test_construction() {
        let meta = metadata(900);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.total_frames, 900);
        assert_eq!(meta.last_frame_time, Some(Rational64::new(899, 60)));
        assert!(!meta.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let meta = metadata(10);
        let cloned = meta.clone();
        assert_eq!(meta, cloned);
    }

    #[test]
    fn test_empty_stream() {
        let meta = metadata(0);
        assert!(meta.is_empty());
        assert_eq!(meta.last_frame_time, None);
    }
}
