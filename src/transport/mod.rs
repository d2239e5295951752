//! The duplex byte stream between the two peers.
//!
//! A [`Link`] is built by listening for exactly one connection, by dialing a
//! peer, or as an in-memory pair for tests. It splits into a reader and a
//! writer half so the session can drive them from separate tasks.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub mod in_memory;
pub mod tcp;

pub use tcp::LinkListener;

/// Result of a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(Bytes),
    /// The peer closed its side. Every later read reports `Eof` again.
    Eof,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("failed to listen on {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("failed to accept a connection: {0}")]
    Accept(#[source] io::Error),
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("link I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("link is closed")]
    Closed,
}

#[async_trait::async_trait]
pub trait LinkReader: Send {
    /// Read up to `max` bytes. Blocks until at least one byte or end of
    /// stream.
    async fn read(&mut self, max: usize) -> Result<ReadOutcome, LinkError>;
}

#[async_trait::async_trait]
pub trait LinkWriter: Send {
    /// Write all of `data`.
    async fn write(&mut self, data: &[u8]) -> Result<(), LinkError>;
    /// Flush and close the write side. Further writes fail with
    /// [`LinkError::Closed`].
    async fn shutdown(&mut self) -> Result<(), LinkError>;
}

/// Reader half over any tokio byte stream.
pub struct StreamReader<R> {
    inner: R,
    eof: bool,
}

impl<R> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, eof: false }
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> LinkReader for StreamReader<R> {
    async fn read(&mut self, max: usize) -> Result<ReadOutcome, LinkError> {
        if self.eof {
            return Ok(ReadOutcome::Eof);
        }
        let mut buf = vec![0u8; max.max(1)];
        match self.inner.read(&mut buf).await {
            Ok(0) => {
                self.eof = true;
                Ok(ReadOutcome::Eof)
            }
            Ok(n) => {
                buf.truncate(n);
                Ok(ReadOutcome::Data(buf.into()))
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionReset
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::UnexpectedEof
                ) =>
            {
                self.eof = true;
                Ok(ReadOutcome::Eof)
            }
            Err(e) => Err(LinkError::Io(e)),
        }
    }
}

/// Writer half over any tokio byte stream.
pub struct StreamWriter<W> {
    inner: W,
    closed: bool,
}

impl<W> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            closed: false,
        }
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> LinkWriter for StreamWriter<W> {
    async fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        if self.closed {
            return Err(LinkError::Closed);
        }
        match self.inner.write_all(data).await {
            Ok(()) => Ok(()),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                ) =>
            {
                self.closed = true;
                Err(LinkError::Closed)
            }
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    async fn shutdown(&mut self) -> Result<(), LinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.shutdown().await?;
        Ok(())
    }
}

/// One bidirectional connection to the peer.
pub struct Link {
    reader: Box<dyn LinkReader>,
    writer: Box<dyn LinkWriter>,
    peer: String,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("peer", &self.peer).finish()
    }
}

impl Link {
    /// Wrap any duplex stream. `peer` is a label for logs.
    pub fn from_stream<S>(stream: S, peer: impl Into<String>) -> Link
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (r, w) = tokio::io::split(stream);
        Link::from_parts(
            Box::new(StreamReader::new(r)),
            Box::new(StreamWriter::new(w)),
            peer,
        )
    }

    /// Join independent read and write halves, e.g. two one-way pipes.
    pub fn from_parts(
        reader: Box<dyn LinkReader>,
        writer: Box<dyn LinkWriter>,
        peer: impl Into<String>,
    ) -> Link {
        Link {
            reader,
            writer,
            peer: peer.into(),
        }
    }

    /// Bind `addr`, accept exactly one connection, then stop listening.
    pub async fn listen(addr: &str) -> Result<Link, LinkError> {
        LinkListener::bind(addr).await?.accept().await
    }

    /// Connect to a listening peer.
    pub async fn dial(addr: &str) -> Result<Link, LinkError> {
        tcp::dial(addr).await
    }

    /// Two links connected back to back in memory.
    pub fn in_memory_pair() -> (Link, Link) {
        in_memory::pair()
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub async fn read(&mut self, max: usize) -> Result<ReadOutcome, LinkError> {
        self.reader.read(max).await
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.writer.write(data).await
    }

    pub async fn shutdown(&mut self) -> Result<(), LinkError> {
        self.writer.shutdown().await
    }

    pub fn into_split(self) -> (Box<dyn LinkReader>, Box<dyn LinkWriter>) {
        (self.reader, self.writer)
    }
}
