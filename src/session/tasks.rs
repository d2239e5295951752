use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::codec::{self, FrameDecoder};
use crate::config::HEADER_LEN;
use crate::protocol::{Message, TrafficClass, UserInfo};
use crate::transport::{LinkReader, LinkWriter, ReadOutcome};

use super::{lock, ConnectionError, ConnectionState, DisconnectReason, SessionEvent, Shared};

/// Resolves once `rx` reads `true` or its sender is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Read until the peer's user info arrives. Other messages seen first are
/// kept in `early` for delivery once the session is up.
pub(super) async fn await_user_info(
    reader: &mut dyn LinkReader,
    decoder: &mut FrameDecoder,
    chunk: usize,
    early: &mut Vec<Message>,
) -> Result<UserInfo, ConnectionError> {
    loop {
        loop {
            match decoder.next_message() {
                Ok(Some(Message::UserInfo(info))) => return Ok(info),
                Ok(Some(Message::Heartbeat)) => {}
                Ok(Some(other)) => early.push(other),
                Ok(None) => break,
                Err(e) => warn!(error = %e, "dropping malformed frame during handshake"),
            }
        }
        match reader.read(chunk).await? {
            ReadOutcome::Data(bytes) => decoder.feed(&bytes),
            ReadOutcome::Eof => return Err(ConnectionError::LinkClosed),
        }
    }
}

pub(super) fn dispatch(shared: &Shared, msg: Message) {
    let event = match msg {
        Message::Heartbeat => {
            trace!("heartbeat");
            return;
        }
        Message::VideoFrame(frame) => {
            shared.video.send_replace(Some(frame));
            return;
        }
        Message::UserInfo(info) => {
            debug!(name = %info.name, "peer updated user info");
            *lock(&shared.peer) = info.clone();
            SessionEvent::PeerInfo(info)
        }
        Message::Chat(text) => SessionEvent::Chat(text),
        Message::Game(game) => {
            debug!(?game, "game message received");
            SessionEvent::Game(game)
        }
    };
    let _ = shared.events.send(event);
}

fn drain_decoder(shared: &Shared, decoder: &mut FrameDecoder) {
    loop {
        let frame = match decoder.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                lock(&shared.stats).decode_errors += 1;
                continue;
            }
        };
        lock(&shared.stats).record_received(frame.kind.class(), HEADER_LEN + frame.payload.len());
        match Message::from_frame(frame) {
            Ok(msg) => dispatch(shared, msg),
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                lock(&shared.stats).decode_errors += 1;
            }
        }
    }
}

pub(super) async fn receive_loop(
    shared: Arc<Shared>,
    mut reader: Box<dyn LinkReader>,
    mut decoder: FrameDecoder,
) {
    drain_decoder(&shared, &mut decoder);
    let mut shutdown = shared.shutdown.subscribe();
    let chunk = shared.config.read_chunk;
    loop {
        let outcome = tokio::select! {
            r = reader.read(chunk) => r,
            _ = stopped(&mut shutdown) => break,
        };
        match outcome {
            Ok(ReadOutcome::Data(bytes)) => {
                shared.touch();
                decoder.feed(&bytes);
                drain_decoder(&shared, &mut decoder);
            }
            Ok(ReadOutcome::Eof) => {
                shared.fail(DisconnectReason::Failed(ConnectionError::LinkClosed));
                break;
            }
            Err(e) => {
                shared.fail(DisconnectReason::Failed(e.into()));
                break;
            }
        }
    }
    debug!("receiver stopped");
}

pub(super) async fn send_loop(shared: Arc<Shared>, mut writer: Box<dyn LinkWriter>) {
    while let Some((class, frame)) = shared.outbox.pop().await {
        if let Err(e) = writer.write(&frame).await {
            shared.fail(DisconnectReason::Failed(e.into()));
            break;
        }
        lock(&shared.stats).record_sent(class, frame.len());
    }
    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "link shutdown");
    }
    debug!("sender stopped");
}

pub(super) async fn heartbeat_loop(shared: Arc<Shared>) {
    let period = shared.config.heartbeat_interval;
    let limit = shared.config.heartbeat_timeout();
    let beat = match codec::encode_message(&Message::Heartbeat) {
        Ok(beat) => beat,
        Err(e) => {
            warn!(error = %e, "cannot encode heartbeat");
            return;
        }
    };
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shutdown = shared.shutdown.subscribe();
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stopped(&mut shutdown) => return,
        }
        let silent = lock(&shared.last_seen).elapsed();
        if silent > limit {
            warn!(?silent, "peer went silent");
            shared.fail(DisconnectReason::Failed(ConnectionError::HeartbeatTimeout(
                limit,
            )));
            return;
        }
        if shared.outbox.push(TrafficClass::Control, beat.clone()).is_err() {
            return;
        }
    }
}

/// Waits for the shutdown signal, then drains the outbox best effort,
/// stops every task and publishes the final state and event.
pub(super) async fn supervise(
    shared: Arc<Shared>,
    receiver: JoinHandle<()>,
    mut sender: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
) {
    let mut shutdown = shared.shutdown.subscribe();
    stopped(&mut shutdown).await;
    shared.set_state(ConnectionState::Closing);

    heartbeat.abort();
    shared.outbox.close();
    if timeout(shared.config.drain_timeout, &mut sender).await.is_err() {
        warn!("outbox drain timed out");
        sender.abort();
    }
    receiver.abort();
    let _ = receiver.await;

    shared.set_state(ConnectionState::Closed);
    let reason = lock(&shared.reason)
        .clone()
        .unwrap_or(DisconnectReason::LocalShutdown);
    debug!(?reason, "session closed");
    let _ = shared.events.send(SessionEvent::Disconnected(reason));
}
