//! Voice connection lifecycle and the playback drain loop.
//!
//! The connected voice destination is process-wide singleton state; every
//! mutation of it goes through [`PlaybackWorker`]. The drain loop plays one
//! stream to completion before pulling the next item, which gives strict
//! FIFO playback with no overlapping streams.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::{Actor, Capability, ChatMessage, ChatPort, VoiceConnection};
use crate::queue::AsyncQueue;

/// Why a join request was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("You must be in a voice channel to do that!")]
    NotInVoice,
    #[error("I'm already connected to a voice channel!")]
    AlreadyConnected,
    #[error("I'm not allowed to connect or speak in your voice channel!")]
    MissingPermission,
    #[error("Failed to connect: {0}")]
    ConnectFailed(String),
}

/// Why a leave request was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaveError {
    #[error("I'm not in a voice channel!")]
    NotConnected,
    #[error("You must be in my voice channel to do that!")]
    WrongChannel,
}

#[derive(Default)]
struct VoiceState {
    connection: Option<Arc<dyn VoiceConnection>>,
    drain: Option<JoinHandle<()>>,
}

/// Owns the voice connection and drains the playback queue.
pub struct PlaybackWorker {
    chat: Arc<dyn ChatPort>,
    queue: Arc<AsyncQueue<String>>,
    state: Mutex<VoiceState>,
}

impl PlaybackWorker {
    pub fn new(chat: Arc<dyn ChatPort>) -> Arc<Self> {
        Arc::new(Self {
            chat,
            queue: Arc::new(AsyncQueue::new()),
            state: Mutex::new(VoiceState::default()),
        })
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connection.is_some()
    }

    /// Destination of the current connection, if any.
    pub async fn destination(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .connection
            .as_ref()
            .map(|c| c.destination().to_string())
    }

    /// Number of audio items waiting to be played.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Connect to the requester's voice destination and start draining.
    ///
    /// Preconditions: the requester is in a voice destination, the bot is
    /// not already connected, and the bot may connect and speak there. Each
    /// unmet precondition fails with the matching [`JoinError`] and leaves
    /// the state untouched.
    pub async fn join(self: &Arc<Self>, msg: &ChatMessage) -> Result<(), JoinError> {
        let destination = msg.author_voice.as_deref().ok_or(JoinError::NotInVoice)?;

        let mut state = self.state.lock().await;
        if state.connection.is_some() {
            return Err(JoinError::AlreadyConnected);
        }
        let can_connect = self
            .chat
            .has_capability(destination, Actor::Bot, Capability::Connect)
            .await;
        let can_speak = self
            .chat
            .has_capability(destination, Actor::Bot, Capability::Speak)
            .await;
        if !can_connect || !can_speak {
            return Err(JoinError::MissingPermission);
        }

        let connection = self
            .chat
            .join_voice(destination)
            .await
            .map_err(|e| JoinError::ConnectFailed(e.to_string()))?;
        info!(target: "voice", destination = %destination, "Connected to voice destination");

        let worker = Arc::clone(self);
        let conn = Arc::clone(&connection);
        state.connection = Some(connection);
        state.drain = Some(tokio::spawn(async move {
            worker.drain(conn).await;
        }));
        Ok(())
    }

    /// Disconnect from the current destination.
    ///
    /// Only valid from the destination the bot is connected to. Clears the
    /// playback queue so no stale audio plays after a reconnect.
    pub async fn leave(&self, msg: &ChatMessage) -> Result<(), LeaveError> {
        let (connection, drain) = {
            let mut state = self.state.lock().await;
            let destination = match state.connection.as_ref() {
                Some(conn) => conn.destination().to_string(),
                None => return Err(LeaveError::NotConnected),
            };
            if msg.author_voice.as_deref() != Some(destination.as_str()) {
                return Err(LeaveError::WrongChannel);
            }
            (state.connection.take(), state.drain.take())
        };

        self.queue.stop();
        if let Some(drain) = drain {
            drain.abort();
        }
        if let Some(connection) = connection {
            if let Err(e) = connection.disconnect().await {
                warn!(target: "voice", error = %e, "Disconnect failed");
            }
            info!(target: "voice", destination = %connection.destination(), "Left voice destination");
        }
        Ok(())
    }

    /// Queue an audio reference for playback, joining first when needed.
    ///
    /// A failed implicit join aborts the enqueue; the audio is never queued.
    pub async fn enqueue(self: &Arc<Self>, msg: &ChatMessage, audio_url: String) -> Result<(), JoinError> {
        if !self.is_connected().await {
            self.join(msg).await?;
        }
        self.queue.push(audio_url);
        Ok(())
    }

    // Drain loop: one stream at a time, strict FIFO. Exits when the queue
    // is stopped (leave) and then tears the connection down if leave has
    // not already done so.
    async fn drain(self: Arc<Self>, connection: Arc<dyn VoiceConnection>) {
        loop {
            let Some(audio_url) = self.queue.next_item().await else {
                break;
            };
            debug!(target: "voice", url = %audio_url, "Starting playback");
            if let Err(e) = connection.play(&audio_url).await {
                warn!(target: "voice", url = %audio_url, error = %e, "Playback failed");
            }
        }
        self.finish(connection).await;
    }

    // Drain-loop exit path: release the connection unless leave() already
    // swapped it out.
    async fn finish(&self, connection: Arc<dyn VoiceConnection>) {
        let still_current = {
            let mut state = self.state.lock().await;
            match state.connection.as_ref() {
                Some(current) if Arc::ptr_eq(current, &connection) => {
                    state.connection = None;
                    state.drain = None;
                    true
                }
                _ => false,
            }
        };
        if still_current {
            if let Err(e) = connection.disconnect().await {
                warn!(target: "voice", error = %e, "Disconnect failed");
            }
            info!(target: "voice", destination = %connection.destination(), "Drain loop finished, disconnected");
        }
    }
}
