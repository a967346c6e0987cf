pub mod decoded_frame;
pub mod frame_timeline;
pub mod image_writer;
pub mod video_reader;
pub mod video_session;
pub mod video_writer;
