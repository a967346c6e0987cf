use std::path::Path;

use crate::shared::frame::Frame;

/// Saves single frames as still images (snapshots of decoded video).
pub trait ImageWriter: Send {
    /// Writes `frame` to `path`, optionally resized to `size` (width, height).
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
