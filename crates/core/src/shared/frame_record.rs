use std::path::{Path, PathBuf};

use num_rational::Rational64;

/// A frame committed to (or deliberately skipped by) a writer: where it went
/// and when it belongs, without pixel data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRecord {
    source_path: PathBuf,
    timestamp: Rational64,
}

impl FrameRecord {
    pub fn new(source_path: impl Into<PathBuf>, timestamp: Rational64) -> Self {
        Self {
            source_path: source_path.into(),
            timestamp,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Seconds since stream start.
    pub fn timestamp(&self) -> Rational64 {
        self.timestamp
    }

    pub fn timestamp_f64(&self) -> f64 {
        *self.timestamp.numer() as f64 / *self.timestamp.denom() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_construction_and_accessors() {
        let record = FrameRecord::new("/tmp/out.mp4", Rational64::new(1, 60));
        assert_eq!(record.source_path(), Path::new("/tmp/out.mp4"));
        assert_eq!(record.timestamp(), Rational64::new(1, 60));
        assert_relative_eq!(record.timestamp_f64(), 1.0 / 60.0);
    }
}
