//! One live connection to the peer.
//!
//! A [`Session`] performs the user-info handshake over a [`Link`] and then
//! runs three tasks until teardown: a receiver decoding inbound frames, a
//! sender draining the [`Outbox`], and a heartbeat that keeps the link warm
//! and detects a silent peer. Connection state is published through a
//! [`watch`] channel; inbound chat and game traffic arrives on
//! [`SessionEvents`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::codec::{self, FrameDecoder, FrameError};
use crate::config::SessionConfig;
use crate::protocol::{GameMessage, Message, TrafficClass, UserInfo};
use crate::transport::{Link, LinkError};

mod outbox;
mod stats;
mod tasks;

pub use outbox::{Outbox, OutboxClosed};
pub use stats::{ClassCounts, SessionStats};

/// Connection lifecycle. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Handshaking,
    Active,
    Closing,
    Closed,
}

/// Failures that end a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("peer did not send its user info within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("no traffic from the peer for {0:?}")]
    HeartbeatTimeout(Duration),
    #[error("the peer closed the connection")]
    LinkClosed,
    #[error("link failure: {0}")]
    LinkFailed(String),
    #[error("the connection is not active")]
    NotActive,
    #[error("could not encode message: {0}")]
    Encode(#[from] FrameError),
}

impl From<LinkError> for ConnectionError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Closed => ConnectionError::LinkClosed,
            other => ConnectionError::LinkFailed(other.to_string()),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    LocalShutdown,
    Failed(ConnectionError),
}

impl DisconnectReason {
    /// A local shutdown or an orderly hang-up by the peer. Timeouts and I/O
    /// failures are not clean.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            DisconnectReason::LocalShutdown | DisconnectReason::Failed(ConnectionError::LinkClosed)
        )
    }
}

/// Inbound traffic for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Chat(String),
    Game(GameMessage),
    /// The peer re-announced its user info.
    PeerInfo(UserInfo),
    /// Always the last event of a session.
    Disconnected(DisconnectReason),
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    config: SessionConfig,
    local: UserInfo,
    peer: Mutex<UserInfo>,
    link_peer: String,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    reason: Mutex<Option<DisconnectReason>>,
    outbox: Outbox,
    stats: Mutex<SessionStats>,
    last_seen: Mutex<Instant>,
    events: mpsc::UnboundedSender<SessionEvent>,
    video: watch::Sender<Option<Bytes>>,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if next > *current {
                debug!(from = ?*current, to = ?next, "connection state");
                *current = next;
                true
            } else {
                false
            }
        });
    }

    /// Record why the session is ending and start teardown. The first
    /// reason wins; later calls only re-signal.
    fn fail(&self, reason: DisconnectReason) {
        {
            let mut slot = lock(&self.reason);
            if slot.is_none() {
                match &reason {
                    DisconnectReason::LocalShutdown => info!("closing session"),
                    DisconnectReason::Failed(e) => warn!(error = %e, "connection failed"),
                }
                *slot = Some(reason);
            }
        }
        self.set_state(ConnectionState::Closing);
        self.shutdown.send_replace(true);
    }

    fn touch(&self) {
        *lock(&self.last_seen) = Instant::now();
    }

    fn enqueue(&self, msg: &Message) -> Result<(), ConnectionError> {
        if *self.state.borrow() != ConnectionState::Active {
            return Err(ConnectionError::NotActive);
        }
        let frame = codec::encode_message(msg)?;
        self.outbox
            .push(msg.class(), frame)
            .map_err(|OutboxClosed| ConnectionError::NotActive)
    }
}

/// Handle to a running session. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.shared.link_peer)
            .field("state", &self.state())
            .finish()
    }
}

/// Receiving side of a session: chat, game and lifecycle events in arrival
/// order, plus the most recent video frame.
#[derive(Debug)]
pub struct SessionEvents {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    video: watch::Receiver<Option<Bytes>>,
}

impl SessionEvents {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// The newest video frame not yet taken. Older unread frames are gone.
    pub fn latest_video(&mut self) -> Option<Bytes> {
        if self.video.has_changed().unwrap_or(false) {
            self.video.borrow_and_update().clone()
        } else {
            None
        }
    }

    /// A receiver that wakes whenever a new video frame lands.
    pub fn video_watch(&self) -> watch::Receiver<Option<Bytes>> {
        self.video.clone()
    }
}

impl Session {
    /// Exchange user info over `link` and start the session tasks.
    ///
    /// Fails with [`ConnectionError::HandshakeTimeout`] if the peer's user
    /// info does not arrive within `config.handshake_timeout`; the link is
    /// released and the connection never becomes active.
    pub async fn establish(
        link: Link,
        local: UserInfo,
        config: SessionConfig,
    ) -> Result<(Session, SessionEvents), ConnectionError> {
        let link_peer = link.peer().to_string();
        let (state, _) = watch::channel(ConnectionState::Connecting);
        state.send_replace(ConnectionState::Handshaking);
        debug!(peer = %link_peer, "handshaking");

        let (mut reader, mut writer) = link.into_split();
        let mut decoder = FrameDecoder::new(config.max_frame_len);
        let hello = codec::encode_message(&Message::UserInfo(local.clone()))?;

        let mut early = Vec::new();
        let handshake = async {
            writer.write(&hello).await?;
            tasks::await_user_info(
                &mut *reader,
                &mut decoder,
                config.read_chunk,
                &mut early,
            )
            .await
        };
        let peer = match timeout(config.handshake_timeout, handshake).await {
            Ok(Ok(peer)) => peer,
            Ok(Err(e)) => {
                warn!(error = %e, "handshake failed");
                let _ = writer.shutdown().await;
                return Err(e);
            }
            Err(_) => {
                let e = ConnectionError::HandshakeTimeout(config.handshake_timeout);
                warn!(error = %e, "handshake failed");
                let _ = writer.shutdown().await;
                return Err(e);
            }
        };
        info!(peer = %link_peer, name = %peer.name, "session active");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (video_tx, video_rx) = watch::channel(None);
        let (shutdown, _) = watch::channel(false);
        let mut stats = SessionStats::default();
        stats.record_sent(TrafficClass::Control, hello.len());

        let shared = Arc::new(Shared {
            config,
            local,
            peer: Mutex::new(peer),
            link_peer,
            state,
            shutdown,
            reason: Mutex::new(None),
            outbox: Outbox::new(),
            stats: Mutex::new(stats),
            last_seen: Mutex::new(Instant::now()),
            events: events_tx,
            video: video_tx,
        });
        shared.set_state(ConnectionState::Active);
        for msg in early {
            tasks::dispatch(&shared, msg);
        }

        let receiver = tokio::spawn(tasks::receive_loop(shared.clone(), reader, decoder));
        let sender = tokio::spawn(tasks::send_loop(shared.clone(), writer));
        let heartbeat = tokio::spawn(tasks::heartbeat_loop(shared.clone()));
        tokio::spawn(tasks::supervise(shared.clone(), receiver, sender, heartbeat));

        Ok((
            Session { shared },
            SessionEvents {
                events: events_rx,
                video: video_rx,
            },
        ))
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    pub fn local(&self) -> &UserInfo {
        &self.shared.local
    }

    /// The peer's most recently announced user info.
    pub fn peer(&self) -> UserInfo {
        lock(&self.shared.peer).clone()
    }

    /// Remote address of the underlying link.
    pub fn peer_addr(&self) -> &str {
        &self.shared.link_peer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> SessionStats {
        let mut stats = *lock(&self.shared.stats);
        stats.video_dropped = self.shared.outbox.video_dropped();
        stats
    }

    /// Set once the session has started closing.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        lock(&self.shared.reason).clone()
    }

    /// Queue a message. Fails with [`ConnectionError::NotActive`] once
    /// teardown has begun.
    pub fn send(&self, msg: Message) -> Result<(), ConnectionError> {
        self.shared.enqueue(&msg)
    }

    pub fn send_chat(&self, text: impl Into<String>) -> Result<(), ConnectionError> {
        self.send(Message::Chat(text.into()))
    }

    pub fn send_game(&self, msg: GameMessage) -> Result<(), ConnectionError> {
        self.send(Message::Game(msg))
    }

    /// Queue a video frame, replacing any frame still waiting to be sent.
    pub fn send_video(&self, frame: Bytes) -> Result<(), ConnectionError> {
        self.send(Message::VideoFrame(frame))
    }

    /// Tear the session down and wait until it is closed. Safe to call any
    /// number of times from any clone.
    pub async fn shutdown(&self) {
        self.shared.fail(DisconnectReason::LocalShutdown);
        self.closed().await;
    }

    /// Wait until the session reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|s| *s == ConnectionState::Closed).await;
    }
}
