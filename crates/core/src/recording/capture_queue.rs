use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::frame::Frame;

/// A raw frame plus the capture clock reading at its arrival.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    /// Monotonic clock reading; only differences between frames matter.
    pub timestamp: Duration,
    pub frame: Frame,
}

impl CapturedFrame {
    pub fn new(timestamp: Duration, frame: Frame) -> Self {
        Self { timestamp, frame }
    }

    pub fn from_nanos(nanos: u64, frame: Frame) -> Self {
        Self::new(Duration::from_nanos(nanos), frame)
    }
}

/// Capture-side handle of the bounded queue feeding a recording.
///
/// `offer` never blocks: a full queue drops the frame so capture keeps
/// pace regardless of disk latency.
#[derive(Clone)]
pub struct FrameProducer {
    tx: Sender<CapturedFrame>,
    dropped: Arc<AtomicUsize>,
}

impl FrameProducer {
    /// Returns `false` when the frame was dropped (queue full or the
    /// recording has stopped).
    pub fn offer(&self, frame: CapturedFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("Capture queue full, dropped frame ({dropped} so far)");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> usize {
        self.tx.len()
    }
}

/// Creates the queue; the receiver goes to the writer thread.
pub fn capture_queue(capacity: usize) -> (FrameProducer, Receiver<CapturedFrame>, Arc<AtomicUsize>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    let producer = FrameProducer {
        tx,
        dropped: Arc::clone(&dropped),
    };
    (producer, rx, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(nanos: u64) -> CapturedFrame {
        CapturedFrame::from_nanos(nanos, Frame::rgb(vec![0u8; 12], 2, 2))
    }

    #[test]
    fn test_offer_enqueues_until_full_then_drops() {
        let (producer, rx, dropped) = capture_queue(2);
        assert!(producer.offer(captured(1)));
        assert!(producer.offer(captured(2)));
        assert!(!producer.offer(captured(3)));

        assert_eq!(producer.queued(), 2);
        assert_eq!(producer.dropped_frames(), 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
        let kept: Vec<_> = rx.try_iter().map(|c| c.timestamp.as_nanos()).collect();
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn test_clones_share_drop_counter() {
        let (producer, _rx, _) = capture_queue(1);
        let other = producer.clone();
        producer.offer(captured(1));
        other.offer(captured(2));
        assert_eq!(producer.dropped_frames(), 1);
    }

    #[test]
    fn test_offer_after_receiver_gone_is_rejected_not_counted() {
        let (producer, rx, _) = capture_queue(4);
        drop(rx);
        assert!(!producer.offer(captured(1)));
        assert_eq!(producer.dropped_frames(), 0);
    }
}
