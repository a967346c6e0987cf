pub mod constants;
pub mod error;
pub mod frame;
pub mod frame_record;
pub mod time_base;
pub mod timestamp;
pub mod video_metadata;
