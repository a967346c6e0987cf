use ndarray::{Array3, ArrayView3, ArrayViewMut3};

use crate::shared::error::VideoError;

/// Channel order of a 3-channel pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PixelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl PixelOrder {
    pub fn ffmpeg_format(self) -> ffmpeg_next::format::Pixel {
        match self {
            Self::Rgb => ffmpeg_next::format::Pixel::RGB24,
            Self::Bgr => ffmpeg_next::format::Pixel::BGR24,
        }
    }
}

/// A single video frame: contiguous bytes in row-major `H×W×C` order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    order: PixelOrder,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, order: PixelOrder) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            order,
        }
    }

    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, 3, PixelOrder::Rgb)
    }

    pub fn bgr(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, 3, PixelOrder::Bgr)
    }

    /// Builds a frame from an `(height, width, channels)` array in logical
    /// (row-major) order, whatever its memory layout.
    pub fn from_ndarray(array: Array3<u8>, order: PixelOrder) -> Result<Self, VideoError> {
        let (h, w, c) = array.dim();
        let (Ok(height), Ok(width), Ok(channels)) =
            (u32::try_from(h), u32::try_from(w), u8::try_from(c))
        else {
            return Err(VideoError::InvalidFrame {
                reason: format!("array shape {:?} out of range", (h, w, c)),
            });
        };
        let data: Vec<u8> = array.iter().copied().collect();
        Ok(Self::new(data, width, height, channels, order))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn order(&self) -> PixelOrder {
        self.order
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Checks the frame is something the encoder can take: 3 channels,
    /// non-empty, even sides (yuv420p), and a buffer matching its shape.
    pub fn validate_encodable(&self) -> Result<(), VideoError> {
        let reason = if self.channels != 3 {
            format!("expected 3 channels, got {}", self.channels)
        } else if self.width == 0 || self.height == 0 {
            format!("empty frame {}x{}", self.width, self.height)
        } else if self.width % 2 != 0 || self.height % 2 != 0 {
            format!(
                "yuv420p needs even dimensions, got {}x{}",
                self.width, self.height
            )
        } else if self.data.len() != self.shape().0 * self.shape().1 * self.shape().2 {
            format!(
                "buffer holds {} bytes, shape {:?} needs {}",
                self.data.len(),
                self.shape(),
                self.shape().0 * self.shape().1 * self.shape().2
            )
        } else {
            return Ok(());
        };
        Err(VideoError::InvalidFrame { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::rgb(data.clone(), 2, 2);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.order(), PixelOrder::Rgb);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_bgr_order_maps_to_ffmpeg_format() {
        let frame = Frame::bgr(vec![0u8; 12], 2, 2);
        assert_eq!(
            frame.order().ffmpeg_format(),
            ffmpeg_next::format::Pixel::BGR24
        );
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::rgb(data, 2, 2);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::rgb(vec![0u8; 24], 4, 2);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::rgb(vec![0u8; 12], 2, 2);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[0, 1, 2]] = 128;
        }
        assert_eq!(frame.as_ndarray()[[0, 1, 2]], 128);
    }

    #[test]
    fn test_from_ndarray_keeps_pixel_positions() {
        let mut array = Array3::<u8>::zeros((2, 4, 3));
        array[[1, 3, 0]] = 200;
        let frame = Frame::from_ndarray(array, PixelOrder::Rgb).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));
        assert_eq!(frame.as_ndarray()[[1, 3, 0]], 200);
    }

    #[test]
    fn test_from_ndarray_non_standard_layout() {
        let mut array = Array3::<u8>::zeros((4, 2, 3));
        array[[3, 1, 2]] = 7;
        let transposed = array.permuted_axes([1, 0, 2]).to_owned();
        let frame = Frame::from_ndarray(transposed, PixelOrder::Bgr).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));
        assert_eq!(frame.as_ndarray()[[1, 3, 2]], 7);
    }

    #[test]
    fn test_validate_encodable_accepts_even_rgb() {
        assert!(Frame::rgb(vec![0u8; 64 * 48 * 3], 64, 48)
            .validate_encodable()
            .is_ok());
    }

    #[test]
    fn test_validate_encodable_rejects_odd_sides() {
        let err = Frame::rgb(vec![0u8; 3 * 2 * 3], 3, 2)
            .validate_encodable()
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn test_validate_encodable_rejects_four_channels() {
        let frame = Frame::new(vec![0u8; 2 * 2 * 4], 2, 2, 4, PixelOrder::Rgb);
        assert!(matches!(
            frame.validate_encodable(),
            Err(VideoError::InvalidFrame { .. })
        ));
    }
}
