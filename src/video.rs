//! Video frames as compressed character grids.
//!
//! Capture and image-to-text conversion are external; [`FrameSource`] is the
//! seam they plug into. The session only ever sees the compressed bytes.

use bytes::Bytes;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

/// A rendered frame: rows of text of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    pub rows: Vec<String>,
}

impl TextFrame {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoError {
    #[error("frame decompression failed: {0}")]
    Decompress(String),
    #[error("frame is not valid UTF-8 text")]
    NotText,
}

/// Compress a frame for the wire.
pub fn compress(frame: &TextFrame) -> Bytes {
    compress_prepend_size(frame.rows.join("\n").as_bytes()).into()
}

/// Inverse of [`compress`].
pub fn decompress(data: &[u8]) -> Result<TextFrame, VideoError> {
    let raw = decompress_size_prepended(data).map_err(|e| VideoError::Decompress(e.to_string()))?;
    let text = String::from_utf8(raw).map_err(|_| VideoError::NotText)?;
    Ok(TextFrame::new(text.split('\n').map(str::to_string).collect()))
}

/// Produces frames on demand, e.g. a webcam followed by a text-art
/// converter.
pub trait FrameSource: Send {
    /// The next frame, or `None` if the source has nothing to show.
    fn next_frame(&mut self) -> Option<TextFrame>;
}

/// Stand-in source with no camera: a bordered card carrying the user's name
/// and a frame counter.
#[derive(Debug, Clone)]
pub struct PlaceholderSource {
    label: String,
    width: usize,
    height: usize,
    tick: u64,
}

impl PlaceholderSource {
    pub fn new(label: impl Into<String>, width: usize, height: usize) -> Self {
        Self {
            label: label.into(),
            width: width.max(4),
            height: height.max(3),
            tick: 0,
        }
    }
}

impl FrameSource for PlaceholderSource {
    fn next_frame(&mut self) -> Option<TextFrame> {
        self.tick += 1;
        let inner = self.width - 2;
        let border = format!("+{}+", "-".repeat(inner));
        let mut rows = Vec::with_capacity(self.height);
        rows.push(border.clone());
        let middle = (self.height - 2) / 2;
        for i in 0..self.height - 2 {
            let text = match i {
                i if i == middle => self.label.clone(),
                i if i == middle + 1 => format!("#{}", self.tick),
                _ => String::new(),
            };
            let text: String = text.chars().take(inner).collect();
            rows.push(format!("|{:^inner$}|", text));
        }
        rows.push(border);
        Some(TextFrame::new(rows))
    }
}
