pub mod ai;
pub mod bitboard;
pub mod board;
pub mod codec;
mod common;
mod config;
pub mod coord;
pub mod coordinator;
pub mod game;
pub mod input;
mod logging;
pub mod protocol;
pub mod render;
pub mod session;
mod ship;
pub mod transport;
pub mod video;

pub use ai::{AiOpponent, TargetState};
pub use bitboard::{BitBoard, Grid};
pub use board::{AttackBoard, Board, Cell, ShipId, ViewCell};
pub use codec::{decode, decode_message, encode, encode_message, FrameDecoder, FrameError};
pub use common::*;
pub use config::*;
pub use coord::{Coord, CoordError, Direction};
pub use coordinator::{Coordinator, Notice, Role};
pub use game::{GameState, Mode, Outcome, Phase, Turn};
pub use input::{Action, Command, InputError, ParsedInput};
pub use logging::init_logging;
pub use protocol::{
    AttackReport, Frame, GameMessage, Message, MessageType, TrafficClass, UserInfo, Winner,
};
pub use session::{
    ConnectionError, ConnectionState, DisconnectReason, Session, SessionEvent, SessionEvents,
    SessionStats,
};
pub use ship::*;
pub use transport::{Link, LinkError, LinkListener, ReadOutcome};
