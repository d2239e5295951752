use std::time::Duration;

use ascii_whisper::session::{Outbox, OutboxClosed};
use ascii_whisper::{
    codec, ConnectionError, ConnectionState, DisconnectReason, Frame, GameMessage, Link, Message,
    MessageType, Session, SessionConfig, SessionEvent, SessionEvents, TrafficClass, UserInfo,
};
use bytes::Bytes;
use tokio::time::{sleep, timeout};

fn fast() -> SessionConfig {
    SessionConfig {
        heartbeat_interval: Duration::from_millis(50),
        heartbeat_timeout_factor: 3,
        handshake_timeout: Duration::from_millis(300),
        drain_timeout: Duration::from_millis(300),
        ..SessionConfig::default()
    }
}

async fn pair() -> ((Session, SessionEvents), (Session, SessionEvents)) {
    let (a, b) = Link::in_memory_pair();
    let (alice, bob) = tokio::join!(
        Session::establish(a, UserInfo::new("alice"), fast()),
        Session::establish(b, UserInfo::new("bob"), fast()),
    );
    (alice.unwrap(), bob.unwrap())
}

/// Handshake from a bare link that then does whatever the test wants.
async fn raw_peer() -> (Session, SessionEvents, Link) {
    let (a, mut raw) = Link::in_memory_pair();
    let hello = codec::encode_message(&Message::UserInfo(UserInfo::new("raw"))).unwrap();
    raw.write(&hello).await.unwrap();
    let (session, events) = Session::establish(a, UserInfo::new("alice"), fast())
        .await
        .unwrap();
    (session, events, raw)
}

async fn next(events: &mut SessionEvents) -> SessionEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event stream ended")
}

async fn disconnected(events: &mut SessionEvents) -> DisconnectReason {
    loop {
        if let SessionEvent::Disconnected(reason) = next(events).await {
            return reason;
        }
    }
}

#[tokio::test]
async fn handshake_exchanges_user_info() {
    let ((alice, _), (bob, _)) = pair().await;
    assert!(alice.is_active());
    assert!(bob.is_active());
    assert_eq!(alice.peer().name, "bob");
    assert_eq!(bob.peer().name, "alice");
    assert_eq!(alice.local().name, "alice");
}

#[tokio::test]
async fn order_is_kept_within_each_class() {
    let ((alice, _), (_bob, mut bob_events)) = pair().await;
    alice.send_chat("one").unwrap();
    alice.send_game(GameMessage::Invite).unwrap();
    alice.send_chat("two").unwrap();
    alice.send_game(GameMessage::PlacementComplete).unwrap();
    alice.send_chat("three").unwrap();

    let mut chats = Vec::new();
    let mut games = Vec::new();
    while chats.len() + games.len() < 5 {
        match next(&mut bob_events).await {
            SessionEvent::Chat(text) => chats.push(text),
            SessionEvent::Game(msg) => games.push(msg),
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(chats, ["one", "two", "three"]);
    assert_eq!(
        games,
        [GameMessage::Invite, GameMessage::PlacementComplete]
    );
}

#[tokio::test]
async fn silent_peer_fails_the_handshake() {
    let (a, _raw) = Link::in_memory_pair();
    let err = Session::establish(a, UserInfo::new("alice"), fast())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConnectionError::HandshakeTimeout(Duration::from_millis(300))
    );
}

#[tokio::test]
async fn vanished_peer_fails_the_handshake() {
    let (a, raw) = Link::in_memory_pair();
    drop(raw);
    let err = Session::establish(a, UserInfo::new("alice"), fast())
        .await
        .unwrap_err();
    assert_eq!(err, ConnectionError::LinkClosed);
}

#[tokio::test]
async fn heartbeats_keep_an_idle_session_alive() {
    let ((alice, _ae), (bob, _be)) = pair().await;
    sleep(fast().heartbeat_timeout() * 3).await;
    assert!(alice.is_active());
    assert!(bob.is_active());
    assert!(alice.stats().frames_received.control > 0);
}

#[tokio::test]
async fn silence_after_handshake_is_a_heartbeat_timeout() {
    let (session, mut events, _raw) = raw_peer().await;
    let reason = disconnected(&mut events).await;
    assert_eq!(
        reason,
        DisconnectReason::Failed(ConnectionError::HeartbeatTimeout(
            fast().heartbeat_timeout()
        ))
    );
    assert!(!reason.is_clean());
    assert_eq!(session.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn end_of_stream_disconnects() {
    let (session, mut events, raw) = raw_peer().await;
    let mut state = session.subscribe_state();
    assert_eq!(*state.borrow(), ConnectionState::Active);
    drop(raw);
    let reason = disconnected(&mut events).await;
    assert_eq!(reason, DisconnectReason::Failed(ConnectionError::LinkClosed));
    assert!(reason.is_clean());
    timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .expect("state never reached closed")
    .unwrap();
    session.closed().await;
    assert!(!session.is_active());
}

#[test]
fn only_orderly_endings_are_clean() {
    assert!(DisconnectReason::LocalShutdown.is_clean());
    assert!(DisconnectReason::Failed(ConnectionError::LinkClosed).is_clean());
    assert!(!DisconnectReason::Failed(ConnectionError::LinkFailed("reset".into())).is_clean());
    assert!(
        !DisconnectReason::Failed(ConnectionError::HeartbeatTimeout(Duration::from_secs(3)))
            .is_clean()
    );
}

#[tokio::test]
async fn shutdown_is_idempotent_and_reaches_the_peer() {
    let ((alice, mut alice_events), (bob, mut bob_events)) = pair().await;
    alice.shutdown().await;
    alice.shutdown().await;
    assert_eq!(alice.state(), ConnectionState::Closed);
    assert_eq!(
        disconnected(&mut alice_events).await,
        DisconnectReason::LocalShutdown
    );
    sleep(Duration::from_millis(50)).await;
    assert_eq!(alice_events.try_recv(), None);

    assert_eq!(
        disconnected(&mut bob_events).await,
        DisconnectReason::Failed(ConnectionError::LinkClosed)
    );
    assert_eq!(alice.send_chat("late"), Err(ConnectionError::NotActive));
    assert_eq!(bob.send_chat("late"), Err(ConnectionError::NotActive));
}

#[tokio::test]
async fn malformed_frame_is_dropped_and_session_continues() {
    let (session, mut events, mut raw) = raw_peer().await;
    let bad = codec::encode(&Frame::new(MessageType::Chat, vec![0xFF, 0xFE])).unwrap();
    raw.write(&bad).await.unwrap();
    raw.write(&codec::encode_message(&Message::Chat("still here".into())).unwrap())
        .await
        .unwrap();

    assert_eq!(
        next(&mut events).await,
        SessionEvent::Chat("still here".into())
    );
    assert_eq!(session.stats().decode_errors, 1);
    assert!(session.is_active());
}

#[tokio::test]
async fn peer_info_updates_are_reported() {
    let (session, mut events, mut raw) = raw_peer().await;
    let mut info = UserInfo::new("renamed");
    info.chat_color = "green".into();
    raw.write(&codec::encode_message(&Message::UserInfo(info.clone())).unwrap())
        .await
        .unwrap();
    assert_eq!(next(&mut events).await, SessionEvent::PeerInfo(info));
    assert_eq!(session.peer().name, "renamed");
}

#[tokio::test]
async fn newest_video_frame_arrives() {
    let ((alice, _), (_bob, mut bob_events)) = pair().await;
    for i in 0..20 {
        alice
            .send_video(Bytes::from(format!("frame-{i}")))
            .unwrap();
    }
    let mut video = bob_events.video_watch();
    timeout(
        Duration::from_secs(2),
        video.wait_for(|v| v.as_deref() == Some(&b"frame-19"[..])),
    )
    .await
    .expect("last frame never arrived")
    .unwrap();
    assert_eq!(bob_events.latest_video().as_deref(), Some(&b"frame-19"[..]));
    assert_eq!(bob_events.latest_video(), None);
}

#[tokio::test]
async fn receiver_reports_traffic_per_class() {
    let ((alice, _), (bob, mut bob_events)) = pair().await;
    alice.send_chat("hi").unwrap();
    assert_eq!(next(&mut bob_events).await, SessionEvent::Chat("hi".into()));
    let stats = bob.stats();
    assert_eq!(stats.frames_received.get(TrafficClass::Chat), 1);
    assert_eq!(stats.bytes_received.chat, 5 + 2);
    assert_eq!(stats.frames_received.game, 0);
}

#[test]
fn outbox_keeps_only_the_newest_video_frame() {
    let outbox = Outbox::new();
    outbox
        .push(TrafficClass::Video, Bytes::from_static(b"old"))
        .unwrap();
    outbox
        .push(TrafficClass::Video, Bytes::from_static(b"new"))
        .unwrap();
    assert_eq!(outbox.len(TrafficClass::Video), 1);
    assert_eq!(outbox.queued_video(), Some(Bytes::from_static(b"new")));
    assert_eq!(outbox.video_dropped(), 1);
}

#[tokio::test]
async fn outbox_pops_by_priority_then_closes() {
    let outbox = Outbox::new();
    outbox.push(TrafficClass::Video, Bytes::from_static(b"v")).unwrap();
    outbox.push(TrafficClass::Chat, Bytes::from_static(b"c1")).unwrap();
    outbox.push(TrafficClass::Game, Bytes::from_static(b"g")).unwrap();
    outbox.push(TrafficClass::Chat, Bytes::from_static(b"c2")).unwrap();
    outbox.push(TrafficClass::Control, Bytes::from_static(b"h")).unwrap();
    outbox.close();
    assert_eq!(
        outbox.push(TrafficClass::Chat, Bytes::from_static(b"late")),
        Err(OutboxClosed)
    );

    let mut order = Vec::new();
    while let Some((class, frame)) = outbox.pop().await {
        order.push((class, frame));
    }
    let classes: Vec<TrafficClass> = order.iter().map(|(c, _)| *c).collect();
    assert_eq!(
        classes,
        [
            TrafficClass::Control,
            TrafficClass::Game,
            TrafficClass::Chat,
            TrafficClass::Chat,
            TrafficClass::Video,
        ]
    );
    assert_eq!(order[2].1, Bytes::from_static(b"c1"));
    assert!(outbox.is_empty());
}
