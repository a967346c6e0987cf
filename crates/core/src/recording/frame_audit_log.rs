use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::constants::AUDIT_LOG_EXTENSION;

/// Plain-text sidecar listing every frame a recording observed, one
/// `"<timestamp_ns>, (<height>, <width>, <channels>)"` line each.
///
/// Created empty at the start of every recording so stale lines from a
/// previous session never survive.
pub struct FrameAuditLog {
    path: PathBuf,
    file: LineWriter<File>,
}

impl FrameAuditLog {
    pub fn sidecar_path(video_path: &Path) -> PathBuf {
        video_path.with_extension(AUDIT_LOG_EXTENSION)
    }

    /// Truncates (or creates) the sidecar next to `video_path`.
    pub fn create(video_path: &Path) -> io::Result<Self> {
        let path = Self::sidecar_path(video_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: LineWriter::new(file),
        })
    }

    /// Deletes a leftover sidecar for `video_path`, if any.
    pub fn remove_stale(video_path: &Path) -> io::Result<()> {
        match std::fs::remove_file(Self::sidecar_path(video_path)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, timestamp: Duration, shape: (usize, usize, usize)) -> io::Result<()> {
        let (h, w, c) = shape;
        writeln!(self.file, "{}, ({h}, {w}, {c})", timestamp.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_swaps_extension() {
        assert_eq!(
            FrameAuditLog::sidecar_path(Path::new("/tmp/rec/video.mp4")),
            PathBuf::from("/tmp/rec/video.txt")
        );
    }

    #[test]
    fn test_lines_are_written_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");

        let mut log = FrameAuditLog::create(&video).unwrap();
        log.append(Duration::from_nanos(1_500), (1080, 1920, 3)).unwrap();
        log.append(Duration::from_nanos(2_500), (1080, 1920, 3)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "1500, (1080, 1920, 3)\n2500, (1080, 1920, 3)\n");
    }

    #[test]
    fn test_create_truncates_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(FrameAuditLog::sidecar_path(&video), "stale\n").unwrap();

        let log = FrameAuditLog::create(&video).unwrap();
        assert_eq!(std::fs::read_to_string(log.path()).unwrap(), "");
    }

    #[test]
    fn test_remove_stale_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        FrameAuditLog::remove_stale(&video).unwrap();

        std::fs::write(FrameAuditLog::sidecar_path(&video), "stale\n").unwrap();
        FrameAuditLog::remove_stale(&video).unwrap();
        assert!(!FrameAuditLog::sidecar_path(&video).exists());
    }
}
