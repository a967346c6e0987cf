pub mod control;
pub mod recording;
pub mod shared;
pub mod video;
