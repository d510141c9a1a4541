//! Coaching channel abstraction.
//!
//! The live coach is reached over an opaque bidirectional channel: outbound
//! carries encoded microphone blocks and short text cues, inbound carries
//! the coach's synthesized speech. The transport itself (WebRTC, websocket,
//! vendor SDK) lives outside this crate behind [`CoachingChannel`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use formcoach_audio::AudioChunk;
use formcoach_core::{Error, Result};

/// Lifecycle state of the coaching connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    Error,
}

/// Trait for live coaching transports.
///
/// Implementations own their reconnect policy; the session never retries a
/// failed channel on its own.
#[async_trait]
pub trait CoachingChannel: Send + Sync {
    /// Open the connection to the coaching service.
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;

    /// Current connection state.
    fn state(&self) -> ChannelState;

    /// Send one encoded microphone block to the coach.
    async fn send_audio(&mut self, chunk: AudioChunk) -> Result<()>;

    /// Send a short text cue, e.g. a rep announcement.
    async fn send_cue(&mut self, text: &str) -> Result<()>;

    /// Receive the next synthesized speech chunk (blocking).
    async fn recv(&mut self) -> Option<AudioChunk>;

    /// Receive a synthesized speech chunk if one is pending (non-blocking).
    fn try_recv(&mut self) -> Option<AudioChunk>;
}

/// In-process coaching channel for tests and offline sessions.
///
/// Records everything sent to the coach and plays back speech scripted with
/// [`script_speech`](SimulatedCoachingChannel::script_speech).
pub struct SimulatedCoachingChannel {
    state: ChannelState,
    fail_connect: bool,
    sent_audio: Vec<AudioChunk>,
    sent_cues: Vec<String>,
    inbound_tx: mpsc::Sender<AudioChunk>,
    inbound_rx: mpsc::Receiver<AudioChunk>,
}

impl SimulatedCoachingChannel {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        Self {
            state: ChannelState::Disconnected,
            fail_connect: false,
            sent_audio: Vec::new(),
            sent_cues: Vec::new(),
            inbound_tx,
            inbound_rx,
        }
    }

    /// Make the next `connect` fail and leave the channel in `Error`.
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Queue a speech chunk as if the coach had spoken.
    pub fn script_speech(&self, chunk: AudioChunk) -> Result<()> {
        self.inbound_tx
            .try_send(chunk)
            .map_err(|e| Error::Channel(format!("scripted speech queue full: {e}")))
    }

    /// Force a connection state, e.g. to simulate a transport drop.
    pub fn set_state(&mut self, state: ChannelState) {
        self.state = state;
    }

    /// Every audio chunk sent to the coach, in send order.
    pub fn sent_audio(&self) -> &[AudioChunk] {
        &self.sent_audio
    }

    /// Every text cue sent to the coach, in send order.
    pub fn sent_cues(&self) -> &[String] {
        &self.sent_cues
    }
}

impl Default for SimulatedCoachingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoachingChannel for SimulatedCoachingChannel {
    async fn connect(&mut self) -> Result<()> {
        if self.fail_connect {
            self.state = ChannelState::Error;
            return Err(Error::Channel("simulated connect failure".into()));
        }
        self.state = ChannelState::Open;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state = ChannelState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    async fn send_audio(&mut self, chunk: AudioChunk) -> Result<()> {
        if self.state != ChannelState::Open {
            return Err(Error::Channel("channel is not open".into()));
        }
        self.sent_audio.push(chunk);
        Ok(())
    }

    async fn send_cue(&mut self, text: &str) -> Result<()> {
        if self.state != ChannelState::Open {
            return Err(Error::Channel("channel is not open".into()));
        }
        self.sent_cues.push(text.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Option<AudioChunk> {
        self.inbound_rx.recv().await
    }

    fn try_recv(&mut self) -> Option<AudioChunk> {
        self.inbound_rx.try_recv().ok()
    }
}
