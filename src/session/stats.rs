use crate::protocol::TrafficClass;

/// Per-class counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
    pub control: u64,
    pub video: u64,
    pub chat: u64,
    pub game: u64,
}

impl ClassCounts {
    pub fn get(&self, class: TrafficClass) -> u64 {
        match class {
            TrafficClass::Control => self.control,
            TrafficClass::Video => self.video,
            TrafficClass::Chat => self.chat,
            TrafficClass::Game => self.game,
        }
    }

    pub(crate) fn add(&mut self, class: TrafficClass, n: u64) {
        let slot = match class {
            TrafficClass::Control => &mut self.control,
            TrafficClass::Video => &mut self.video,
            TrafficClass::Chat => &mut self.chat,
            TrafficClass::Game => &mut self.game,
        };
        *slot += n;
    }
}

/// Traffic counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_sent: ClassCounts,
    pub bytes_sent: ClassCounts,
    pub frames_received: ClassCounts,
    pub bytes_received: ClassCounts,
    /// Video frames replaced in the outbox before being sent.
    pub video_dropped: u64,
    /// Inbound frames dropped as malformed.
    pub decode_errors: u64,
}

impl SessionStats {
    pub(crate) fn record_sent(&mut self, class: TrafficClass, len: usize) {
        self.frames_sent.add(class, 1);
        self.bytes_sent.add(class, len as u64);
    }

    pub(crate) fn record_received(&mut self, class: TrafficClass, len: usize) {
        self.frames_received.add(class, 1);
        self.bytes_received.add(class, len as u64);
    }
}
