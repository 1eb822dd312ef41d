//! Manages the WebSocket connection lifecycle for one voice-agent session.

use crate::{
    audio,
    error::ClientError,
    playback::{self, AudioSink, PLAYBACK_SAMPLE_RATE, PlaybackQueue},
    protocol::{DEFAULT_SAMPLE_RATE, ENDPOINT_TEMPLATE, InboundMessage, OutboundMessage},
    tone,
};
use futures_util::{Sink, SinkExt, StreamExt};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    WebSocketStream, connect_async,
    tungstenite::{self, protocol::Message as WsMessage},
};
use tracing::{debug, error, info, warn};

/// Seconds of test tone sent once the session reports readiness.
const TEST_TONE_SECS: f32 = 1.0;

/// Connection parameters for one session.
pub struct SessionConfig {
    /// Endpoint template containing the `{agentId}` placeholder.
    pub endpoint: String,
    /// Identifier of the agent to talk to.
    pub agent_id: String,
    /// API credential sent in the setup handshake.
    pub api_key: SecretString,
    /// Output sample rate requested from the server.
    pub output_sample_rate: u32,
}

impl SessionConfig {
    pub fn new(agent_id: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            endpoint: ENDPOINT_TEMPLATE.to_owned(),
            agent_id: agent_id.into(),
            api_key,
            output_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// The concrete WebSocket URL for this session.
    pub fn url(&self) -> String {
        self.endpoint.replace("{agentId}", &self.agent_id)
    }
}

/// A live connection to the voice service.
///
/// Owns the spawned receive/dispatch task. Dropping the session, or calling
/// [`Session::close`], aborts any in-flight receive and releases the
/// transport.
pub struct Session {
    task: Option<JoinHandle<()>>,
    queue: Arc<PlaybackQueue>,
}

impl Session {
    /// Opens the WebSocket, performs the setup handshake, and spawns the
    /// receive/dispatch loop. A single attempt: a failed session is never
    /// retried here, the caller decides whether to `connect` again.
    pub async fn connect(
        config: SessionConfig,
        sink: Arc<dyn AudioSink>,
    ) -> Result<Self, ClientError> {
        let (mut ws, _) = connect_async(config.url()).await?;
        info!(agent_id = %config.agent_id, "connected to voice service");

        // The setup handshake must be the first message on the wire.
        let setup = OutboundMessage::setup(&config.api_key, config.output_sample_rate);
        send_msg(&mut ws, &setup).await?;

        let queue = Arc::new(PlaybackQueue::new());
        let state = SessionState::new(queue.clone(), sink);
        let task = tokio::spawn(async move {
            match receive_loop(ws, state).await {
                Ok(()) => info!("voice session ended"),
                Err(e) => error!(error = %e, "voice session terminated"),
            }
        });

        Ok(Self {
            task: Some(task),
            queue,
        })
    }

    /// Aborts the receive task and drops the transport. Safe to call more
    /// than once, and on a session that never became usable.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("voice session closed");
        }
    }

    /// Resolves when the receive loop has terminated on its own, e.g. after
    /// a server hangup.
    pub async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }

    /// Chunks decoded but not yet handed to the device.
    pub fn pending_chunks(&self) -> usize {
        self.queue.pending_chunks()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Serializes one outbound message and sends it as a text frame.
async fn send_msg<T>(tx: &mut T, msg: &OutboundMessage) -> Result<(), ClientError>
where
    T: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let serialized = serde_json::to_string(msg)?;
    tx.send(WsMessage::Text(serialized.into())).await?;
    Ok(())
}

/// Dispatcher state for one session: the playback queue, the device sink,
/// and the readiness/test-tone latches.
struct SessionState {
    queue: Arc<PlaybackQueue>,
    sink: Arc<dyn AudioSink>,
    ready: bool,
    tone_sent: bool,
}

impl SessionState {
    fn new(queue: Arc<PlaybackQueue>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            queue,
            sink,
            ready: false,
            tone_sent: false,
        }
    }

    /// Classifies one complete logical message and runs its dispatch arm.
    async fn handle_text<T>(&mut self, text: &str, tx: &mut T) -> Result<(), ClientError>
    where
        T: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        match serde_json::from_str::<InboundMessage>(text)? {
            InboundMessage::Error { code, message } => {
                let err = ClientError::Server { code, message };
                error!(error = %err, "server reported an error");
            }
            InboundMessage::VoiceActivityStart => {
                if self.sink.is_playing() {
                    info!("voice activity started, interrupting playback");
                    self.sink.stop();
                } else {
                    debug!("voice activity started");
                }
            }
            InboundMessage::VoiceActivityEnd => debug!("voice activity ended"),
            InboundMessage::NewAudioStream => {
                info!("new audio stream announced, dropping pending playback");
                self.queue.reset();
                self.sink.stop();
            }
            InboundMessage::AudioStream { data, sample_rate } => {
                let samples = audio::decode_f32_chunk(&data)?;
                let declared = audio::effective_sample_rate(sample_rate);
                if declared != PLAYBACK_SAMPLE_RATE {
                    debug!(
                        declared,
                        playback = PLAYBACK_SAMPLE_RATE,
                        "declared stream rate differs from playback rate"
                    );
                }
                if let Some(epoch) = self.queue.push(samples) {
                    tokio::spawn(playback::drain(self.queue.clone(), self.sink.clone(), epoch));
                }
            }
            InboundMessage::Init { conversation_id } => {
                info!(
                    conversation_id = conversation_id.as_deref().unwrap_or("<none>"),
                    "session ready"
                );
                self.ready = true;
                self.send_test_tone(tx).await;
            }
        }
        Ok(())
    }

    /// Sends the one-off test tone. Logs and does nothing when the session
    /// is not ready yet or the tone already went out.
    async fn send_test_tone<T>(&mut self, tx: &mut T)
    where
        T: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        if !self.ready {
            warn!("test tone requested before the session was ready");
            return;
        }
        if self.tone_sent {
            debug!("test tone already sent");
            return;
        }
        self.tone_sent = true;
        let msg = match tone::test_tone_message(TEST_TONE_SECS, DEFAULT_SAMPLE_RATE) {
            Ok(msg) => msg,
            Err(e) => {
                error!(error = %e, "failed to build test tone");
                return;
            }
        };
        if let Err(e) = send_msg(tx, &msg).await {
            error!(error = %e, "failed to send test tone");
        }
    }
}

/// Consumes inbound frames until the transport closes, errors, or the task
/// is aborted. Failures local to one message are logged and skipped; only
/// transport failures end the session.
async fn receive_loop<S>(ws: WebSocketStream<S>, mut state: SessionState) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut tx, mut rx) = ws.split();
    while let Some(frame) = rx.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                if let Err(e) = state.handle_text(&text, &mut tx).await {
                    warn!(error = %e, "failed to process message");
                }
            }
            Ok(WsMessage::Close(frame)) => {
                info!(?frame, "server closed the session");
                break;
            }
            Ok(WsMessage::Ping(_) | WsMessage::Pong(_)) => {}
            Ok(other) => debug!(?other, "ignoring non-text frame"),
            Err(e) => {
                error!(error = %e, "transport error while receiving");
                return Err(e.into());
            }
        }
    }
    Ok(())
}
