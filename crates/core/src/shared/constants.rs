use std::time::Duration;

/// Denominator of the stream time base. Orders of magnitude above any
/// capture rate so PTS truncation stays well below the duplicate tolerance.
pub const DEFAULT_TIME_BASE_DEN: i32 = 60_000;

/// Frames closer than this (in seconds, as `numer / denom`) to the last
/// accepted frame are dropped as duplicates.
pub const DUPLICATE_TOLERANCE_NUMER: i64 = 1;
pub const DUPLICATE_TOLERANCE_DENOM: i64 = 120;

/// Key frame every N frames to bound seek latency.
pub const GOP_SIZE: u32 = 6;

pub const BIT_RATE: usize = 20 * (1 << 20);

pub const CAPTURE_QUEUE_CAPACITY: usize = 100;
pub const QUEUE_POLL_TIMEOUT: Duration = Duration::from_secs(1);

pub const READER_CACHE_CAPACITY: usize = 128;

/// Extension of the per-recording audit sidecar (`video.mp4` -> `video.txt`).
pub const AUDIT_LOG_EXTENSION: &str = "txt";
