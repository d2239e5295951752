use std::time::Duration;

use crate::ship::ShipKind;

pub const BOARD_SIZE: u8 = 10;
pub const NUM_SHIPS: usize = 5;

/// Fleet in placement order.
pub const FLEET: [ShipKind; NUM_SHIPS] = [
    ShipKind::Carrier,
    ShipKind::Battleship,
    ShipKind::Cruiser,
    ShipKind::Submarine,
    ShipKind::Destroyer,
];

/// Total number of ship segments used in the standard configuration.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Default TCP port for host and connect modes.
pub const DEFAULT_PORT: u16 = 5000;

/// Wire header: 1 byte type tag + 4 bytes big-endian payload length.
pub const HEADER_LEN: usize = 5;

/// Default maximum payload size (4 MiB) to prevent excessive memory allocation.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Tunables for a single peer connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often a heartbeat is emitted.
    pub heartbeat_interval: Duration,
    /// The peer is declared dead after `heartbeat_interval * heartbeat_timeout_factor`
    /// without any inbound traffic.
    pub heartbeat_timeout_factor: u32,
    /// Grace period for the peer's user-info during the handshake.
    pub handshake_timeout: Duration,
    /// Largest payload accepted from the peer.
    pub max_frame_len: u32,
    /// Bytes requested from the link per read.
    pub read_chunk: usize,
    /// Upper bound on best-effort draining of queued sends during teardown.
    pub drain_timeout: Duration,
}

impl SessionConfig {
    /// Silence threshold after which the connection is considered dead.
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_interval * self.heartbeat_timeout_factor
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_timeout_factor: 3,
            handshake_timeout: Duration::from_secs(10),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_chunk: 8 * 1024,
            drain_timeout: Duration::from_secs(2),
        }
    }
}

/// Tunables for the game coordinator.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Artificial pause before each AI move.
    pub ai_delay: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ai_delay: Duration::from_secs(1),
        }
    }
}
