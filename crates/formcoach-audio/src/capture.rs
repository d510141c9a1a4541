//! Microphone block encoding, gated by connection state.

use crate::wire::{AudioChunk, CAPTURE_SAMPLE_RATE_HZ};

/// Encodes captured microphone blocks for the coaching channel.
///
/// The encoder holds a connection flag owned by the session: blocks that
/// arrive while the channel is not open are dropped, never buffered. The
/// flag check makes the audio callback a constant-time no-op when offline.
#[derive(Debug, Clone)]
pub struct CaptureEncoder {
    sample_rate: u32,
    connected: bool,
}

impl CaptureEncoder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            connected: false,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Encode one captured block, or `None` while disconnected.
    pub fn encode_block(&self, samples: &[f32]) -> Option<AudioChunk> {
        if !self.connected {
            return None;
        }
        Some(AudioChunk::from_samples(samples, self.sample_rate))
    }
}

impl Default for CaptureEncoder {
    fn default() -> Self {
        Self::new(CAPTURE_SAMPLE_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_dropped_while_disconnected() {
        let encoder = CaptureEncoder::default();
        assert!(!encoder.is_connected());
        assert!(encoder.encode_block(&[0.1, 0.2, 0.3]).is_none());
    }

    #[test]
    fn test_blocks_encoded_while_connected() {
        let mut encoder = CaptureEncoder::default();
        encoder.set_connected(true);

        let chunk = encoder.encode_block(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(chunk.sample_rate, CAPTURE_SAMPLE_RATE_HZ);
        assert_eq!(chunk.samples().unwrap().len(), 3);
    }

    #[test]
    fn test_disconnect_drops_again_without_buffering() {
        let mut encoder = CaptureEncoder::new(16_000);
        encoder.set_connected(true);
        assert!(encoder.encode_block(&[0.5]).is_some());

        encoder.set_connected(false);
        assert!(encoder.encode_block(&[0.5]).is_none());

        // Reconnecting encodes only the new block; nothing stale appears.
        encoder.set_connected(true);
        let chunk = encoder.encode_block(&[0.25]).unwrap();
        assert_eq!(chunk.samples().unwrap().len(), 1);
    }
}
