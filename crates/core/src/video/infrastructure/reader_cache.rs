use std::collections::VecDeque;
use std::path::Path;

use crate::shared::constants::READER_CACHE_CAPACITY;
use crate::shared::error::VideoError;
use crate::video::domain::video_session::VideoSession;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

/// Caller-owned, bounded cache of open readers keyed by path.
///
/// Reopening a container costs a demux pass, so repeated lookups into the
/// same recordings keep their readers around. Opening a new path at
/// capacity closes the least recently used reader. Paths are compared as
/// given, without canonicalisation.
pub struct ReaderCache {
    capacity: usize,
    // least recently used at the front
    readers: VecDeque<FfmpegReader>,
}

impl ReaderCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readers: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.readers.iter().any(|r| r.path() == path)
    }

    /// Returns the cached reader for `path`, opening it on a miss.
    pub fn get_or_open(&mut self, path: &Path) -> Result<&mut FfmpegReader, VideoError> {
        let reader = match self.readers.iter().position(|r| r.path() == path) {
            Some(index) => self.readers.remove(index),
            None => None,
        };

        let reader = match reader {
            Some(reader) => reader,
            None => {
                let reader = FfmpegReader::open(path)?;
                if self.readers.len() >= self.capacity {
                    if let Some(evicted) = self.readers.pop_front() {
                        log::debug!("Evicting reader for {}", evicted.path().display());
                    }
                }
                reader
            }
        };

        self.readers.push_back(reader);
        let newest = self.readers.len() - 1;
        Ok(&mut self.readers[newest])
    }

    /// Drops the reader for `path`; returns whether one was cached.
    pub fn evict(&mut self, path: &Path) -> bool {
        match self.readers.iter().position(|r| r.path() == path) {
            Some(index) => {
                self.readers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.readers.clear();
    }
}

impl Default for ReaderCache {
    fn default() -> Self {
        Self::new(READER_CACHE_CAPACITY)
    }
}
