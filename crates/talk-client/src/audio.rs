//! Decoding helpers for inbound PCM audio chunks.

use crate::error::ClientError;
use crate::protocol::DEFAULT_SAMPLE_RATE;
use base64::Engine;

/// Decodes a base64 `audioStream` payload into little-endian f32 samples.
///
/// The payload must be a whole number of 4-byte samples; anything else is a
/// [`ClientError::Decode`] and the chunk is dropped by the caller.
pub fn decode_f32_chunk(data: &str) -> Result<Vec<f32>, ClientError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ClientError::Decode(format!("invalid base64: {e}")))?;
    if bytes.len() % 4 != 0 {
        return Err(ClientError::Decode(format!(
            "chunk of {} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Returns the usable sample rate for a chunk, falling back to the default
/// when the server declares a non-positive one.
pub fn effective_sample_rate(declared: i64) -> u32 {
    if declared <= 0 {
        tracing::warn!(
            declared,
            "server declared a non-positive sample rate, using default"
        );
        DEFAULT_SAMPLE_RATE
    } else {
        declared as u32
    }
}
