use std::path::Path;

use crate::shared::frame::{Frame, PixelOrder};
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
///
/// BGR frames are swapped to RGB first. Supports optional resizing for
/// thumbnails.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("cannot save {}-channel frame", frame.channels()).into());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut data = frame.data().to_vec();
        if frame.order() == PixelOrder::Bgr {
            for pixel in data.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), data)
            .ok_or("Failed to create image from frame data")?;

        let img = if let Some((w, h)) = size {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, order: PixelOrder, px: [u8; 3]) -> Frame {
        let data = px
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Frame::new(data, width, height, 3, order)
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots").join("out.png");
        let frame = make_frame(100, 80, PixelOrder::Rgb, [50, 100, 200]);
        ImageFileWriter::new().write(&path, &frame, None).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_roundtrip_preserves_rgb_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = make_frame(50, 50, PixelOrder::Rgb, [50, 100, 200]);
        ImageFileWriter::new().write(&path, &frame, None).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_bgr_frame_saved_as_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bgr.png");
        let frame = make_frame(4, 4, PixelOrder::Bgr, [200, 100, 50]);
        ImageFileWriter::new().write(&path, &frame, None).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(3, 3).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_with_resize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        let frame = make_frame(200, 200, PixelOrder::Rgb, [128, 128, 128]);
        ImageFileWriter::new()
            .write(&path, &frame, Some((64, 64)))
            .unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 64);
    }

    #[test]
    fn test_non_rgb_frame_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0u8; 4], 1, 1, 4, PixelOrder::Rgb);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("x.png"), &frame, None)
            .is_err());
    }
}
