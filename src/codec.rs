//! Wire framing: `[type: u8][length: u32 BE][payload]`.
//!
//! [`encode`] and [`decode`] work on whole frames; [`FrameDecoder`] accepts a
//! byte stream in arbitrary chunks and yields frames as they complete.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::{DEFAULT_MAX_FRAME_LEN, HEADER_LEN};
use crate::protocol::{Frame, Message, MessageType};

/// Malformed wire data. Every variant is recoverable: the offending frame is
/// dropped and decoding continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
    #[error("frame payload of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: u32, max: u32 },
    #[error("payload of {0} bytes does not fit the length field")]
    TooLarge(usize),
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),
    #[error("bad {kind:?} payload: {reason}")]
    Payload { kind: MessageType, reason: String },
}

impl FrameError {
    pub(crate) fn payload(kind: MessageType, reason: impl ToString) -> Self {
        FrameError::Payload {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// The header's length field for a payload of `len` bytes.
pub fn length_field(len: usize) -> Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::TooLarge(len))
}

/// Serialize a frame. Deterministic; fails only when the payload is too
/// long for the length field.
pub fn encode(frame: &Frame) -> Result<Bytes, FrameError> {
    let len = length_field(frame.payload.len())?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + frame.payload.len());
    buf.put_u8(frame.kind.tag());
    buf.put_u32(len);
    buf.put_slice(&frame.payload);
    Ok(buf.freeze())
}

/// Serialize a typed message.
pub fn encode_message(msg: &Message) -> Result<Bytes, FrameError> {
    encode(&msg.to_frame()?)
}

/// Read one header, returning `(tag, payload_len)`.
fn header(buf: &[u8]) -> Result<(u8, u32), FrameError> {
    if buf.len() < HEADER_LEN {
        return Err(FrameError::Truncated {
            needed: HEADER_LEN,
            available: buf.len(),
        });
    }
    let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    Ok((buf[0], len))
}

/// Decode the first complete frame in `buf`, returning it with the number of
/// bytes it occupied.
pub fn decode(buf: &[u8], max_len: u32) -> Result<(Frame, usize), FrameError> {
    let (tag, len) = header(buf)?;
    if len > max_len {
        return Err(FrameError::Oversized { len, max: max_len });
    }
    let kind = MessageType::from_tag(tag).ok_or(FrameError::UnknownType(tag))?;
    let total = HEADER_LEN + len as usize;
    if buf.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: buf.len(),
        });
    }
    let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..total]);
    Ok((Frame { kind, payload }, total))
}

/// Decode the first complete frame in `buf` into a typed message.
pub fn decode_message(buf: &[u8], max_len: u32) -> Result<(Message, usize), FrameError> {
    let (frame, used) = decode(buf, max_len)?;
    Ok((Message::from_frame(frame)?, used))
}

/// Incremental stream decoder.
///
/// Frames with an unknown tag or an oversized length are reported once as an
/// error and then skipped by their declared length; oversized payloads are
/// discarded as they arrive rather than buffered.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_len: u32,
    skip: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    pub fn new(max_len: u32) -> Self {
        Self {
            buf: BytesMut::new(),
            max_len,
            skip: 0,
        }
    }

    /// Append bytes read from the link.
    pub fn feed(&mut self, mut data: &[u8]) {
        if self.skip > 0 {
            let n = self.skip.min(data.len());
            self.skip -= n;
            data = &data[n..];
        }
        self.buf.extend_from_slice(data);
    }

    /// Bytes held for a frame that is not yet complete.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete frame, `Ok(None)` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.skip > 0 || self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let (tag, len) = header(&self.buf)?;
        if len > self.max_len {
            self.buf.advance(HEADER_LEN);
            let available = self.buf.len().min(len as usize);
            self.buf.advance(available);
            self.skip = len as usize - available;
            return Err(FrameError::Oversized {
                len,
                max: self.max_len,
            });
        }
        let total = HEADER_LEN + len as usize;
        if self.buf.len() < total {
            return Ok(None);
        }
        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(len as usize).freeze();
        match MessageType::from_tag(tag) {
            Some(kind) => Ok(Some(Frame { kind, payload })),
            None => Err(FrameError::UnknownType(tag)),
        }
    }

    /// Next complete frame parsed into a typed message.
    pub fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        self.next_frame()?.map(Message::from_frame).transpose()
    }
}
