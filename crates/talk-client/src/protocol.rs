//! Wire types for the talk voice-agent protocol.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// WebSocket endpoint template; `{agentId}` is replaced with the target agent.
pub const ENDPOINT_TEMPLATE: &str = "wss://api.play.ai/v1/talk/{agentId}";

/// Sample rate requested in the setup handshake, and assumed for inbound
/// chunks whose declared rate is non-positive.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Messages sent from the client to the voice service.
#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Session handshake. Must be the first message on the connection.
    #[serde(rename = "setup", rename_all = "camelCase")]
    Setup {
        api_key: String,
        output_format: String,
        output_sample_rate: u32,
        input_encoding: String,
    },
    /// A base64-encoded audio clip for the agent to listen to.
    #[serde(rename = "audioIn")]
    AudioIn { data: String },
}

impl OutboundMessage {
    /// Builds the setup handshake: raw f32 output at the given rate,
    /// containerized audio input.
    pub fn setup(api_key: &SecretString, output_sample_rate: u32) -> Self {
        Self::Setup {
            api_key: api_key.expose_secret().to_owned(),
            output_format: "raw".to_owned(),
            output_sample_rate,
            input_encoding: "media-container".to_owned(),
        }
    }
}

/// Messages received from the voice service, discriminated by `type`.
///
/// Extra fields the server attaches to any variant are ignored.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// An explicit error reported by the server. The session stays open.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: i64,
        #[serde(default)]
        message: String,
    },
    /// The user started speaking; current playback should be interrupted.
    #[serde(rename = "voiceActivityStart")]
    VoiceActivityStart,
    /// The user stopped speaking.
    #[serde(rename = "voiceActivityEnd")]
    VoiceActivityEnd,
    /// The server is about to stream a fresh response; pending audio is stale.
    #[serde(rename = "newAudioStream")]
    NewAudioStream,
    /// One chunk of base64-encoded little-endian f32 PCM.
    #[serde(rename = "audioStream", rename_all = "camelCase")]
    AudioStream {
        #[serde(default)]
        data: String,
        #[serde(default)]
        sample_rate: i64,
    },
    /// The session is ready for input.
    #[serde(rename = "init", rename_all = "camelCase")]
    Init {
        #[serde(default)]
        conversation_id: Option<String>,
    },
}
