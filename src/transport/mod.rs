// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Connection strategies for internal API requests
//!
//! A request either uses the default network dialer (TCP to the URL's host
//! and port) or carries a custom [`Dialer`] that overrides how the connection
//! is made. The Unix socket dialer ignores the URL entirely: its host and
//! port are placeholders the HTTP layer needs, nothing more.

mod tls;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

use crate::config::{InternalConfig, Protocol};
use crate::context::CallContext;
use crate::error::Result;

pub use tls::{handshake, NoVerifier, TlsClientConfig};

/// Byte stream an HTTP/1 connection can run over
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized> Io for T {}

/// An established connection
pub type Connection = Box<dyn Io>;

/// Establishes connections for a request
#[async_trait]
pub trait Dialer: Send + Sync + fmt::Debug {
    /// Connect without a cancellation context
    async fn dial(&self, network: &str, addr: &str) -> Result<Connection>;

    /// Connect, giving up as soon as `ctx` is done
    async fn dial_context(&self, ctx: &CallContext, network: &str, addr: &str)
        -> Result<Connection>;
}

/// Default network dialer
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, _network: &str, addr: &str) -> Result<Connection> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    async fn dial_context(
        &self,
        ctx: &CallContext,
        network: &str,
        addr: &str,
    ) -> Result<Connection> {
        ctx.run(self.dial(network, addr)).await
    }
}

/// Dialer that always connects to one Unix domain socket
#[derive(Debug, Clone)]
pub struct UnixDialer {
    path: PathBuf,
}

impl UnixDialer {
    /// Create a dialer for the socket at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Socket path every dial targets
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Dialer for UnixDialer {
    async fn dial(&self, _network: &str, _addr: &str) -> Result<Connection> {
        let stream = UnixStream::connect(&self.path).await?;
        Ok(Box::new(stream))
    }

    async fn dial_context(
        &self,
        ctx: &CallContext,
        network: &str,
        addr: &str,
    ) -> Result<Connection> {
        ctx.run(self.dial(network, addr)).await
    }
}

/// Connection strategy chosen once per client from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Default TCP dialing to the URL's host and port
    Network,
    /// Every connection goes to the Unix socket at `path`
    UnixSocket { path: PathBuf },
}

impl Transport {
    /// Select the strategy for a configuration
    pub fn from_config(config: &InternalConfig) -> Self {
        match config.protocol {
            Protocol::UnixSocket => Transport::UnixSocket {
                path: PathBuf::from(&config.http_addr),
            },
            Protocol::Http | Protocol::Https => Transport::Network,
        }
    }

    /// Dialer overriding the default transport, if this strategy needs one
    pub fn dialer(&self) -> Option<Arc<dyn Dialer>> {
        match self {
            Transport::Network => None,
            Transport::UnixSocket { path } => {
                debug!(socket = %path.display(), "using unix socket transport");
                Some(Arc::new(UnixDialer::new(path.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    use super::*;
    use crate::error::Error;

    #[test]
    fn test_transport_from_config() {
        let config = InternalConfig::new();
        assert_eq!(Transport::from_config(&config), Transport::Network);
        assert!(Transport::from_config(&config).dialer().is_none());

        let config = InternalConfig::unix_socket("/run/forge/http.sock");
        assert_eq!(
            Transport::from_config(&config),
            Transport::UnixSocket {
                path: PathBuf::from("/run/forge/http.sock")
            }
        );
    }

    #[tokio::test]
    async fn test_unix_dialer_ignores_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("internal.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4];
                stream.read_exact(&mut buf).await.unwrap();
                seen.push(buf);
            }
            seen
        });

        let dialer = UnixDialer::new(&path);

        let mut conn = dialer.dial("tcp", "example.com:443").await.unwrap();
        conn.write_all(b"one!").await.unwrap();

        let ctx = CallContext::background();
        let mut conn = dialer
            .dial_context(&ctx, "tcp6", "[2001:db8::1]:80")
            .await
            .unwrap();
        conn.write_all(b"two!").await.unwrap();

        let seen = server.await.unwrap();
        assert_eq!(seen, vec![*b"one!", *b"two!"]);
    }

    #[tokio::test]
    async fn test_unix_dialer_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let dialer = UnixDialer::new(dir.path().join("absent.sock"));

        let err = dialer
            .dial("tcp", "localhost:3000")
            .await
            .err()
            .expect("dial to a missing socket should fail");
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_dial_context_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("internal.sock");
        let _listener = UnixListener::bind(&path).unwrap();

        let ctx = CallContext::background();
        ctx.cancel();

        let err = UnixDialer::new(&path)
            .dial_context(&ctx, "tcp", "localhost:3000")
            .await
            .err()
            .expect("cancelled dial should fail");
        assert!(matches!(err, Error::Cancelled));
    }
}
