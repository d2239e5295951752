use crate::transport::Link;

/// Buffer size of each direction of the in-memory pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Two links joined by an in-memory duplex pipe. Dropping or shutting down
/// one side shows up as end of stream on the other.
pub fn pair() -> (Link, Link) {
    let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
    (Link::from_stream(a, "memory:a"), Link::from_stream(b, "memory:b"))
}
