use std::time::Duration;

use ascii_whisper::transport::{StreamReader, StreamWriter};
use ascii_whisper::{Link, LinkError, LinkListener, ReadOutcome};
use tokio::time::timeout;

async fn read_exact(link: &mut Link, n: usize) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    while out.len() < n {
        match link.read(n - out.len()).await? {
            ReadOutcome::Data(bytes) => out.extend_from_slice(&bytes),
            ReadOutcome::Eof => anyhow::bail!("end of stream after {} bytes", out.len()),
        }
    }
    Ok(out)
}

async fn tcp_pair() -> anyhow::Result<(Link, Link, String)> {
    let listener = LinkListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let (host, client) = tokio::join!(listener.accept(), Link::dial(&addr));
    Ok((host?, client?, addr))
}

#[tokio::test]
async fn tcp_link_carries_bytes_both_ways() -> anyhow::Result<()> {
    let (mut host, mut client, _) = tcp_pair().await?;

    client.write(b"ping").await?;
    assert_eq!(read_exact(&mut host, 4).await?, b"ping");
    host.write(b"pong!").await?;
    assert_eq!(read_exact(&mut client, 5).await?, b"pong!");
    Ok(())
}

#[tokio::test]
async fn end_of_stream_is_sticky() -> anyhow::Result<()> {
    let (mut host, mut client, _) = tcp_pair().await?;

    client.shutdown().await?;
    assert_eq!(host.read(64).await?, ReadOutcome::Eof);
    assert_eq!(host.read(64).await?, ReadOutcome::Eof);
    assert!(matches!(client.write(b"x").await, Err(LinkError::Closed)));
    Ok(())
}

#[tokio::test]
async fn host_accepts_a_single_peer() -> anyhow::Result<()> {
    let (_host, _first, addr) = tcp_pair().await?;

    let second = timeout(Duration::from_secs(2), Link::dial(&addr)).await?;
    assert!(matches!(second, Err(LinkError::Connect { .. })));
    Ok(())
}

#[tokio::test]
async fn dialing_a_closed_port_fails() -> anyhow::Result<()> {
    let addr = {
        let listener = LinkListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?.to_string()
    };
    let err = Link::dial(&addr).await.unwrap_err();
    assert!(matches!(err, LinkError::Connect { addr: a, .. } if a == addr));
    Ok(())
}

#[tokio::test]
async fn binding_a_used_port_fails() -> anyhow::Result<()> {
    let first = LinkListener::bind("127.0.0.1:0").await?;
    let addr = first.local_addr()?.to_string();
    let err = LinkListener::bind(&addr).await.err();
    assert!(matches!(err, Some(LinkError::Bind { .. })));
    Ok(())
}

#[tokio::test]
async fn dropped_memory_link_reads_as_end_of_stream() -> anyhow::Result<()> {
    let (mut a, b) = Link::in_memory_pair();
    assert_eq!(a.peer(), "memory:a");
    drop(b);
    assert_eq!(a.read(16).await?, ReadOutcome::Eof);
    assert!(matches!(a.write(b"gone").await, Err(LinkError::Closed)));
    Ok(())
}

#[tokio::test]
async fn link_from_separate_halves() -> anyhow::Result<()> {
    let (a_end, b_end) = tokio::io::duplex(1024);
    let (back_a, back_b) = tokio::io::duplex(1024);
    let (_, to_b) = tokio::io::split(a_end);
    let (from_a, _) = tokio::io::split(b_end);
    let (_, to_a) = tokio::io::split(back_b);
    let (from_b, _) = tokio::io::split(back_a);
    let mut a = Link::from_parts(
        Box::new(StreamReader::new(from_b)),
        Box::new(StreamWriter::new(to_b)),
        "pipe:a",
    );
    let mut b = Link::from_parts(
        Box::new(StreamReader::new(from_a)),
        Box::new(StreamWriter::new(to_a)),
        "pipe:b",
    );
    assert_eq!(b.peer(), "pipe:b");

    a.write(b"over").await?;
    assert_eq!(read_exact(&mut b, 4).await?, b"over");
    b.write(b"back").await?;
    assert_eq!(read_exact(&mut a, 4).await?, b"back");

    a.shutdown().await?;
    assert_eq!(b.read(16).await?, ReadOutcome::Eof);
    Ok(())
}
