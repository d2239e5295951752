use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::Notify;
use tracing::trace;

use crate::protocol::TrafficClass;

use super::lock;

/// Outbound frames waiting for the sender task, one queue per traffic class.
///
/// Control, game and chat queues are FIFO and lossless. The video slot holds
/// at most one frame: a newer frame replaces one that has not been sent yet.
#[derive(Debug, Default)]
pub struct Outbox {
    inner: Mutex<Queues>,
    ready: Notify,
}

#[derive(Debug, Default)]
struct Queues {
    control: VecDeque<Bytes>,
    game: VecDeque<Bytes>,
    chat: VecDeque<Bytes>,
    video: Option<Bytes>,
    video_dropped: u64,
    closed: bool,
}

/// Returned when pushing into a closed outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxClosed;

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an encoded frame. Video frames go through the drop-oldest slot.
    pub fn push(&self, class: TrafficClass, frame: Bytes) -> Result<(), OutboxClosed> {
        {
            let mut q = lock(&self.inner);
            if q.closed {
                return Err(OutboxClosed);
            }
            match class {
                TrafficClass::Control => q.control.push_back(frame),
                TrafficClass::Game => q.game.push_back(frame),
                TrafficClass::Chat => q.chat.push_back(frame),
                TrafficClass::Video => {
                    if q.video.replace(frame).is_some() {
                        q.video_dropped += 1;
                        trace!("replaced unsent video frame");
                    }
                }
            }
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Next frame to write, control first and video last. Waits while all
    /// queues are empty; `None` once closed and drained.
    pub async fn pop(&self) -> Option<(TrafficClass, Bytes)> {
        loop {
            {
                let mut q = lock(&self.inner);
                if let Some(next) = q.take_next() {
                    return Some(next);
                }
                if q.closed {
                    return None;
                }
            }
            self.ready.notified().await;
        }
    }

    /// Stop accepting frames. Frames already queued can still be popped.
    pub fn close(&self) {
        lock(&self.inner).closed = true;
        self.ready.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner).closed
    }

    /// Frames currently queued for `class`.
    pub fn len(&self, class: TrafficClass) -> usize {
        let q = lock(&self.inner);
        match class {
            TrafficClass::Control => q.control.len(),
            TrafficClass::Game => q.game.len(),
            TrafficClass::Chat => q.chat.len(),
            TrafficClass::Video => usize::from(q.video.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        let q = lock(&self.inner);
        q.control.is_empty() && q.game.is_empty() && q.chat.is_empty() && q.video.is_none()
    }

    /// The video frame waiting to be sent, if any.
    pub fn queued_video(&self) -> Option<Bytes> {
        lock(&self.inner).video.clone()
    }

    /// Video frames overwritten before they were sent.
    pub fn video_dropped(&self) -> u64 {
        lock(&self.inner).video_dropped
    }
}

impl Queues {
    fn take_next(&mut self) -> Option<(TrafficClass, Bytes)> {
        if let Some(f) = self.control.pop_front() {
            return Some((TrafficClass::Control, f));
        }
        if let Some(f) = self.game.pop_front() {
            return Some((TrafficClass::Game, f));
        }
        if let Some(f) = self.chat.pop_front() {
            return Some((TrafficClass::Chat, f));
        }
        self.video.take().map(|f| (TrafficClass::Video, f))
    }
}
