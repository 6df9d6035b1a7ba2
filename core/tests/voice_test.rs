use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parrot_core::voice::{JoinError, LeaveError};
use parrot_core::{
    Actor, Capability, ChatMessage, ChatPort, PlaybackWorker, Result, VoiceConnection,
};
use tokio::sync::Semaphore;
use tokio::time::sleep;

// Voice connection whose play() blocks until the test releases the
// end-of-stream gate, so stream overlap is observable.
struct FakeConnection {
    destination: String,
    started: Mutex<Vec<String>>,
    gate: Semaphore,
    disconnected: AtomicBool,
}

impl FakeConnection {
    fn new(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
            started: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
            disconnected: AtomicBool::new(false),
        }
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    // Fire the end-of-stream event for the oldest in-flight play.
    fn finish_stream(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn play(&self, audio_url: &str) -> Result<()> {
        self.started.lock().unwrap().push(audio_url.to_string());
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeChat {
    can_connect: bool,
    can_speak: bool,
    connection: Mutex<Option<Arc<FakeConnection>>>,
}

impl FakeChat {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            can_connect: true,
            can_speak: true,
            connection: Mutex::new(None),
        })
    }

    fn without_connect_permission() -> Arc<Self> {
        Arc::new(Self {
            can_connect: false,
            can_speak: true,
            connection: Mutex::new(None),
        })
    }

    fn connection(&self) -> Arc<FakeConnection> {
        self.connection
            .lock()
            .unwrap()
            .clone()
            .expect("no connection was opened")
    }
}

#[async_trait]
impl ChatPort for FakeChat {
    async fn send_message(&self, _channel: &str, _text: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_message(&self, _channel: &str, _message_id: &str) -> Result<()> {
        Ok(())
    }

    async fn join_voice(&self, destination: &str) -> Result<Arc<dyn VoiceConnection>> {
        let conn = Arc::new(FakeConnection::new(destination));
        *self.connection.lock().unwrap() = Some(Arc::clone(&conn));
        Ok(conn)
    }

    async fn has_capability(
        &self,
        _destination: &str,
        actor: Actor<'_>,
        capability: Capability,
    ) -> bool {
        match (actor, capability) {
            (Actor::Bot, Capability::Connect) => self.can_connect,
            (Actor::Bot, Capability::Speak) => self.can_speak,
            _ => true,
        }
    }
}

fn msg_in(voice: Option<&str>) -> ChatMessage {
    ChatMessage {
        channel: "general".to_string(),
        id: "1".to_string(),
        author: "alice".to_string(),
        author_voice: voice.map(|v| v.to_string()),
        content: String::new(),
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn join_requires_a_voice_destination() {
    let worker = PlaybackWorker::new(FakeChat::new());
    let err = worker.join(&msg_in(None)).await.unwrap_err();
    assert_eq!(err, JoinError::NotInVoice);
    assert!(!worker.is_connected().await);
}

#[tokio::test]
async fn join_rejected_while_already_connected() {
    let worker = PlaybackWorker::new(FakeChat::new());
    worker.join(&msg_in(Some("voice-1"))).await.unwrap();
    let err = worker.join(&msg_in(Some("voice-2"))).await.unwrap_err();
    assert_eq!(err, JoinError::AlreadyConnected);
    assert_eq!(worker.destination().await.as_deref(), Some("voice-1"));
}

#[tokio::test]
async fn join_requires_connect_and_speak_capability() {
    let worker = PlaybackWorker::new(FakeChat::without_connect_permission());
    let err = worker.join(&msg_in(Some("voice-1"))).await.unwrap_err();
    assert_eq!(err, JoinError::MissingPermission);
    assert!(!worker.is_connected().await);
}

#[tokio::test]
async fn playback_is_strictly_serial_fifo() {
    let chat = FakeChat::new();
    let worker = PlaybackWorker::new(chat.clone());
    let msg = msg_in(Some("voice-1"));

    worker.enqueue(&msg, "audio-a".to_string()).await.unwrap();
    worker.enqueue(&msg, "audio-b".to_string()).await.unwrap();

    let conn = chat.connection();
    assert!(wait_until(|| conn.started() == vec!["audio-a"]).await);

    // B must not start while A's stream is still open
    sleep(Duration::from_millis(100)).await;
    assert_eq!(conn.started(), vec!["audio-a"]);

    conn.finish_stream();
    assert!(wait_until(|| conn.started() == vec!["audio-a", "audio-b"]).await);
    conn.finish_stream();
}

#[tokio::test]
async fn leave_from_other_destination_is_rejected() {
    let worker = PlaybackWorker::new(FakeChat::new());
    worker.join(&msg_in(Some("voice-1"))).await.unwrap();

    let err = worker.leave(&msg_in(Some("voice-2"))).await.unwrap_err();
    assert_eq!(err, LeaveError::WrongChannel);
    assert!(worker.is_connected().await, "bot must stay connected");
}

#[tokio::test]
async fn leave_clears_queue_and_disconnects() {
    let chat = FakeChat::new();
    let worker = PlaybackWorker::new(chat.clone());
    let msg = msg_in(Some("voice-1"));

    worker.enqueue(&msg, "audio-a".to_string()).await.unwrap();
    let conn = chat.connection();
    assert!(wait_until(|| conn.started() == vec!["audio-a"]).await);

    // Two stale items behind the in-flight stream
    worker.enqueue(&msg, "audio-b".to_string()).await.unwrap();
    worker.enqueue(&msg, "audio-c".to_string()).await.unwrap();

    worker.leave(&msg).await.unwrap();
    assert!(!worker.is_connected().await);
    assert_eq!(worker.queue_len(), 0, "pending audio must be discarded");
    assert!(conn.disconnected.load(Ordering::SeqCst));
}

#[tokio::test]
async fn leave_without_connection_is_rejected() {
    let worker = PlaybackWorker::new(FakeChat::new());
    let err = worker.leave(&msg_in(Some("voice-1"))).await.unwrap_err();
    assert_eq!(err, LeaveError::NotConnected);
}

#[tokio::test]
async fn failed_implicit_join_aborts_enqueue() {
    let worker = PlaybackWorker::new(FakeChat::new());
    let err = worker
        .enqueue(&msg_in(None), "audio-a".to_string())
        .await
        .unwrap_err();
    assert_eq!(err, JoinError::NotInVoice);
    assert_eq!(worker.queue_len(), 0, "nothing may be queued");
    assert!(!worker.is_connected().await);
}

#[tokio::test]
async fn enqueue_joins_implicitly_when_disconnected() {
    let chat = FakeChat::new();
    let worker = PlaybackWorker::new(chat.clone());

    worker
        .enqueue(&msg_in(Some("voice-1")), "audio-a".to_string())
        .await
        .unwrap();
    assert!(worker.is_connected().await);

    let conn = chat.connection();
    assert!(wait_until(|| conn.started() == vec!["audio-a"]).await);
    conn.finish_stream();
}
