//! PCM wire codec for the coaching channel.
//!
//! Outbound microphone audio and inbound synthesized speech share one wire
//! shape: mono 16-bit signed little-endian PCM, base64-encoded with the
//! standard alphabet, tagged with its sample rate. Float samples are in
//! [-1, 1]; conversion rounds to the nearest PCM step and saturates at the
//! i16 range.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use formcoach_core::{Error, Result};

/// Microphone capture rate (Hz).
pub const CAPTURE_SAMPLE_RATE_HZ: u32 = 16_000;

/// Sample rate of inbound synthesized speech (Hz).
pub const PLAYBACK_SAMPLE_RATE_HZ: u32 = 24_000;

/// Samples per block delivered by the audio-capture callback.
pub const CAPTURE_BLOCK_SAMPLES: usize = 4_096;

/// Full-scale factor between float samples and 16-bit PCM.
const PCM_SCALE: f32 = 32_768.0;

/// One audio block on the coaching channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Base64-encoded 16-bit signed little-endian PCM.
    pub data: String,
    /// Samples per second.
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Encode float samples into a wire chunk.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            data: BASE64.encode(pcm_from_f32(samples)),
            sample_rate,
        }
    }

    /// Decode the chunk back into float samples.
    pub fn samples(&self) -> Result<Vec<f32>> {
        let bytes = BASE64
            .decode(&self.data)
            .map_err(|e| Error::AudioDecode(format!("bad base64 payload: {e}")))?;
        f32_from_pcm(&bytes)
    }
}

/// Convert float samples in [-1, 1] to 16-bit signed PCM bytes.
pub fn pcm_from_f32(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * PCM_SCALE)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert 16-bit signed little-endian PCM bytes to float samples.
pub fn f32_from_pcm(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::AudioDecode(format!(
            "odd PCM byte count: {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_conversion_known_values() {
        let bytes = pcm_from_f32(&[0.0, 0.5, -0.5, 1.0, -1.0]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        // +1.0 saturates to i16::MAX; -1.0 lands exactly on i16::MIN.
        assert_eq!(values, vec![0, 16_384, -16_384, 32_767, -32_768]);
    }

    #[test]
    fn test_pcm_saturates_out_of_range_input() {
        let bytes = pcm_from_f32(&[1.7, -2.3]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(values, vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_chunk_round_trip_within_quantization() {
        let samples = [0.25_f32, -0.75, 0.999];
        let chunk = AudioChunk::from_samples(&samples, PLAYBACK_SAMPLE_RATE_HZ);
        let decoded = chunk.samples().unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (raw, back) in samples.iter().zip(&decoded) {
            assert!((raw - back).abs() < 1.0 / PCM_SCALE);
        }
    }

    #[test]
    fn test_known_base64_payload() {
        // A single zero sample is two zero bytes.
        let chunk = AudioChunk::from_samples(&[0.0], CAPTURE_SAMPLE_RATE_HZ);
        assert_eq!(chunk.data, "AAA=");
        assert_eq!(chunk.samples().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_bad_base64_is_a_decode_error() {
        let chunk = AudioChunk {
            data: "not base64!!".to_string(),
            sample_rate: PLAYBACK_SAMPLE_RATE_HZ,
        };
        assert!(matches!(chunk.samples(), Err(Error::AudioDecode(_))));
    }

    #[test]
    fn test_odd_byte_count_is_a_decode_error() {
        let chunk = AudioChunk {
            data: BASE64.encode([0u8, 0, 7]),
            sample_rate: PLAYBACK_SAMPLE_RATE_HZ,
        };
        let err = chunk.samples().unwrap_err();
        assert!(err.to_string().contains("odd PCM byte count"));
    }
}
