use std::path::Path;

use crate::shared::time_base::TimeBase;

/// Capability shared by read and write sessions on one container file.
pub trait VideoSession {
    fn path(&self) -> &Path;

    fn time_base(&self) -> TimeBase;
}
