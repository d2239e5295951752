use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::transport::{Link, LinkError};

/// A bound port waiting for its single peer.
pub struct LinkListener {
    listener: TcpListener,
}

impl LinkListener {
    pub async fn bind(addr: &str) -> Result<LinkListener, LinkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| LinkError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "listening for a peer");
        Ok(LinkListener { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one connection. The listening socket is closed on return.
    pub async fn accept(self) -> Result<Link, LinkError> {
        let (stream, peer) = self.listener.accept().await.map_err(LinkError::Accept)?;
        drop(self.listener);
        info!(%peer, "peer connected");
        Ok(from_tcp(stream, peer))
    }
}

pub async fn dial(addr: &str) -> Result<Link, LinkError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| LinkError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    let peer = stream.peer_addr()?;
    info!(%peer, "connected to peer");
    Ok(from_tcp(stream, peer))
}

fn from_tcp(stream: TcpStream, peer: SocketAddr) -> Link {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "could not disable Nagle");
    }
    Link::from_stream(stream, peer.to_string())
}
