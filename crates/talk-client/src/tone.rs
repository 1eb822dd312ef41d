//! Test-tone generation: a sine clip encoded as a WAV `audioIn` payload.

use crate::protocol::OutboundMessage;
use base64::Engine;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Frequency of the generated test tone.
pub const TONE_FREQUENCY_HZ: f32 = 440.0;

/// Generates `duration_secs` of a mono sine wave at [`TONE_FREQUENCY_HZ`].
pub fn sine_samples(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let total = (duration_secs * sample_rate as f32) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (t * TONE_FREQUENCY_HZ * 2.0 * std::f32::consts::PI).sin()
        })
        .collect()
}

/// Encodes mono f32 samples as a 16-bit PCM WAV file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let v = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Builds the `audioIn` message carrying the test tone.
pub fn test_tone_message(
    duration_secs: f32,
    sample_rate: u32,
) -> Result<OutboundMessage, hound::Error> {
    let samples = sine_samples(duration_secs, sample_rate);
    let wav = encode_wav(&samples, sample_rate)?;
    let data = base64::engine::general_purpose::STANDARD.encode(&wav);
    Ok(OutboundMessage::AudioIn { data })
}
