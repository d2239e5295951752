//! Typed messages exchanged between the two peers and their payload
//! encodings. Framing lives in [`crate::codec`].

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::codec::FrameError;
use crate::common::AttackResult;
use crate::coord::Coord;

/// One-byte type tag at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    VideoFrame = 0x01,
    Chat = 0x02,
    Heartbeat = 0x03,
    UserInfo = 0x04,
    GameInvite = 0x05,
    InviteAccept = 0x06,
    InviteDecline = 0x07,
    Attack = 0x08,
    AttackResult = 0x09,
    GameOver = 0x0A,
    PlacementComplete = 0x0B,
    GameQuit = 0x0C,
}

/// Traffic classes, each with its own outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// Heartbeat and user-info.
    Control,
    Video,
    Chat,
    Game,
}

impl MessageType {
    pub const ALL: [MessageType; 12] = [
        MessageType::VideoFrame,
        MessageType::Chat,
        MessageType::Heartbeat,
        MessageType::UserInfo,
        MessageType::GameInvite,
        MessageType::InviteAccept,
        MessageType::InviteDecline,
        MessageType::Attack,
        MessageType::AttackResult,
        MessageType::GameOver,
        MessageType::PlacementComplete,
        MessageType::GameQuit,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<MessageType> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn class(self) -> TrafficClass {
        match self {
            MessageType::Heartbeat | MessageType::UserInfo => TrafficClass::Control,
            MessageType::VideoFrame => TrafficClass::Video,
            MessageType::Chat => TrafficClass::Chat,
            _ => TrafficClass::Game,
        }
    }
}

/// A raw frame: type tag plus opaque payload. The length field on the wire
/// is always `payload.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageType,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn empty(kind: MessageType) -> Self {
        Self::new(kind, Bytes::new())
    }
}

/// Display name and colours announced during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub chat_color: String,
    pub theme_color: String,
}

impl UserInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chat_color: "white".into(),
            theme_color: "default".into(),
        }
    }
}

/// Defender's answer to an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    pub coord: Coord,
    pub result: AttackResult,
}

/// Who won, relative to the peer sending the game-over message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Sender,
    Receiver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    Invite,
    Accept,
    Decline,
    PlacementComplete,
    Attack(Coord),
    AttackResult(AttackReport),
    GameOver { winner: Winner },
    Quit,
}

impl GameMessage {
    pub fn kind(&self) -> MessageType {
        match self {
            GameMessage::Invite => MessageType::GameInvite,
            GameMessage::Accept => MessageType::InviteAccept,
            GameMessage::Decline => MessageType::InviteDecline,
            GameMessage::PlacementComplete => MessageType::PlacementComplete,
            GameMessage::Attack(_) => MessageType::Attack,
            GameMessage::AttackResult(_) => MessageType::AttackResult,
            GameMessage::GameOver { .. } => MessageType::GameOver,
            GameMessage::Quit => MessageType::GameQuit,
        }
    }
}

/// Every message a peer can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Compressed character-grid frame, opaque to the session.
    VideoFrame(Bytes),
    Chat(String),
    Heartbeat,
    UserInfo(UserInfo),
    Game(GameMessage),
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::VideoFrame(_) => MessageType::VideoFrame,
            Message::Chat(_) => MessageType::Chat,
            Message::Heartbeat => MessageType::Heartbeat,
            Message::UserInfo(_) => MessageType::UserInfo,
            Message::Game(g) => g.kind(),
        }
    }

    pub fn class(&self) -> TrafficClass {
        self.kind().class()
    }

    /// Serialize the payload for this message.
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let kind = self.kind();
        let payload = match self {
            Message::VideoFrame(data) => data.clone(),
            Message::Chat(text) => Bytes::copy_from_slice(text.as_bytes()),
            Message::UserInfo(info) => serde_json::to_vec(info)
                .map_err(|e| FrameError::payload(kind, e))?
                .into(),
            Message::Game(GameMessage::Attack(coord)) => to_bincode(kind, coord)?,
            Message::Game(GameMessage::AttackResult(report)) => to_bincode(kind, report)?,
            Message::Game(GameMessage::GameOver { winner }) => to_bincode(kind, winner)?,
            Message::Heartbeat
            | Message::Game(
                GameMessage::Invite
                | GameMessage::Accept
                | GameMessage::Decline
                | GameMessage::PlacementComplete
                | GameMessage::Quit,
            ) => Bytes::new(),
        };
        Ok(Frame { kind, payload })
    }

    /// Parse a frame's payload according to its type tag. Payloads of
    /// empty-bodied messages are ignored.
    pub fn from_frame(frame: Frame) -> Result<Message, FrameError> {
        let Frame { kind, payload } = frame;
        Ok(match kind {
            MessageType::VideoFrame => Message::VideoFrame(payload),
            MessageType::Chat => Message::Chat(
                String::from_utf8(payload.to_vec()).map_err(|e| FrameError::payload(kind, e))?,
            ),
            MessageType::Heartbeat => Message::Heartbeat,
            MessageType::UserInfo => Message::UserInfo(
                serde_json::from_slice(&payload).map_err(|e| FrameError::payload(kind, e))?,
            ),
            MessageType::GameInvite => Message::Game(GameMessage::Invite),
            MessageType::InviteAccept => Message::Game(GameMessage::Accept),
            MessageType::InviteDecline => Message::Game(GameMessage::Decline),
            MessageType::PlacementComplete => Message::Game(GameMessage::PlacementComplete),
            MessageType::GameQuit => Message::Game(GameMessage::Quit),
            MessageType::Attack => {
                let coord: Coord = from_bincode(kind, &payload)?;
                Message::Game(GameMessage::Attack(checked(kind, coord)?))
            }
            MessageType::AttackResult => {
                let report: AttackReport = from_bincode(kind, &payload)?;
                checked(kind, report.coord)?;
                Message::Game(GameMessage::AttackResult(report))
            }
            MessageType::GameOver => Message::Game(GameMessage::GameOver {
                winner: from_bincode(kind, &payload)?,
            }),
        })
    }
}

impl From<GameMessage> for Message {
    fn from(msg: GameMessage) -> Self {
        Message::Game(msg)
    }
}

fn to_bincode<T: Serialize>(kind: MessageType, value: &T) -> Result<Bytes, FrameError> {
    bincode::serialize(value)
        .map(Bytes::from)
        .map_err(|e| FrameError::payload(kind, e))
}

fn from_bincode<T: DeserializeOwned>(kind: MessageType, payload: &[u8]) -> Result<T, FrameError> {
    bincode::deserialize(payload).map_err(|e| FrameError::payload(kind, e))
}

fn checked(kind: MessageType, coord: Coord) -> Result<Coord, FrameError> {
    Coord::new(coord.row, coord.col).ok_or_else(|| {
        FrameError::payload(
            kind,
            format!("coordinate ({}, {}) is off the board", coord.row, coord.col),
        )
    })
}
