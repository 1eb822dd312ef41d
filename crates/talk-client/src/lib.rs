//! Client for a conversational voice-agent service.
//!
//! One [`session::Session`] owns one WebSocket connection to the service. It
//! performs the setup handshake, dispatches the inbound message stream, and
//! plays synthesized audio through a caller-supplied [`playback::AudioSink`]
//! via a gap-free FIFO playback queue. Once the server reports the session
//! ready, a short locally generated test tone is sent upstream as WAV.
//!
//! The modules:
//!
//! - `protocol`: the JSON message format spoken on the wire.
//! - `session`: connection lifecycle and the receive/dispatch loop.
//! - `playback`: the chunk queue, the drain loop, and the device seam.
//! - `audio`: decoding of inbound PCM payloads.
//! - `tone`: test-tone generation and WAV encoding.

pub mod audio;
pub mod error;
pub mod playback;
pub mod protocol;
pub mod session;
pub mod tone;

pub use error::ClientError;
pub use playback::{AudioClip, AudioSink, PLAYBACK_SAMPLE_RATE};
pub use session::{Session, SessionConfig};
