use num_rational::Rational64;

use crate::shared::frame::Frame;

/// A frame decoded from a container, in RGB order.
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    pub frame: Frame,
    /// Ticks of the stream time base.
    pub pts: i64,
    /// Seconds since stream start.
    pub time: Rational64,
    pub key_frame: bool,
}

impl DecodedFrame {
    pub fn time_f64(&self) -> f64 {
        *self.time.numer() as f64 / *self.time.denom() as f64
    }
}
