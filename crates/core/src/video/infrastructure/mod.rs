pub mod ffmpeg_reader;
pub mod ffmpeg_writer;
pub mod image_file_writer;
pub mod reader_cache;
