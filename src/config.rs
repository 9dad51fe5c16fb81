// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Process configuration consumed by the internal API client
//!
//! [`InternalConfig`] is built once at startup and shared read-only. The only
//! mutable piece is the [`InternalToken`] handle, which lets the secret be
//! rotated without rebuilding clients.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use crate::error::{Error, ErrorContext, Result};

/// Environment variable names read by [`InternalConfig::from_env`]
pub mod vars {
    pub const INTERNAL_TOKEN: &str = "FORGE_INTERNAL_TOKEN";
    pub const INTERNAL_TOKEN_URI: &str = "FORGE_INTERNAL_TOKEN_URI";
    pub const DOMAIN: &str = "FORGE_DOMAIN";
    pub const PROTOCOL: &str = "FORGE_PROTOCOL";
    pub const HTTP_ADDR: &str = "FORGE_HTTP_ADDR";
    pub const HTTP_PORT: &str = "FORGE_HTTP_PORT";
    pub const LOCAL_ROOT_URL: &str = "FORGE_LOCAL_ROOT_URL";
}

/// How the web process is served, and therefore how to reach it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain HTTP on a TCP socket
    #[default]
    Http,
    /// HTTPS on a TCP socket
    Https,
    /// HTTP on a Unix domain socket at the bind address
    UnixSocket,
}

impl Protocol {
    /// URL scheme used to reach the server locally
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http | Protocol::UnixSocket => "http",
        }
    }

    /// Check if connections go through a Unix domain socket
    pub fn is_unix_socket(&self) -> bool {
        matches!(self, Protocol::UnixSocket)
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "unix" => Ok(Protocol::UnixSocket),
            other => Err(Error::config(format!("unknown protocol '{}'", other))),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
            Protocol::UnixSocket => write!(f, "unix"),
        }
    }
}

/// Shared secret presented to the internal API
///
/// Cloning shares the underlying value; [`InternalToken::set`] on any clone
/// is seen by every request built afterwards.
#[derive(Clone, Default)]
pub struct InternalToken {
    secret: Arc<RwLock<String>>,
}

impl InternalToken {
    /// Create a token handle
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(RwLock::new(secret.into())),
        }
    }

    /// Load the token from a URI. Only `file:` is supported; the file content
    /// is trimmed and must not be empty.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let parsed = Url::parse(uri)
            .map_err(|e| Error::config(format!("invalid internal token URI '{}': {}", uri, e)))?;
        if parsed.scheme() != "file" {
            return Err(Error::config(format!(
                "unsupported internal token URI scheme '{}'",
                parsed.scheme()
            )));
        }

        let path = PathBuf::from(parsed.path());
        let content = std::fs::read_to_string(&path)
            .context(&format!("reading internal token from {}", path.display()))?;
        let secret = content.trim();
        if secret.is_empty() {
            return Err(Error::config(format!(
                "internal token file {} is empty",
                path.display()
            )));
        }

        Ok(Self::new(secret))
    }

    /// Current secret
    pub fn get(&self) -> String {
        self.secret.read().clone()
    }

    /// Replace the secret for all holders of this handle
    pub fn set(&self, secret: impl Into<String>) {
        *self.secret.write() = secret.into();
    }

    /// Check if no secret is configured
    pub fn is_empty(&self) -> bool {
        self.secret.read().is_empty()
    }
}

impl fmt::Debug for InternalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InternalToken(***)")
    }
}

/// Configuration for reaching the internal API
#[derive(Debug, Clone)]
pub struct InternalConfig {
    /// Bearer secret
    pub internal_token: InternalToken,
    /// Deployment domain, presented as TLS server name
    pub domain: String,
    /// Serving protocol
    pub protocol: Protocol,
    /// Bind address; the socket path when `protocol` is `UnixSocket`
    pub http_addr: String,
    /// Bind port (ignored for Unix sockets)
    pub http_port: String,
    /// Explicit base URL for internal calls; derived when unset
    pub local_root_url: Option<String>,
}

impl Default for InternalConfig {
    fn default() -> Self {
        Self {
            internal_token: InternalToken::default(),
            domain: "localhost".to_string(),
            protocol: Protocol::Http,
            http_addr: "0.0.0.0".to_string(),
            http_port: "3000".to_string(),
            local_root_url: None,
        }
    }
}

impl InternalConfig {
    /// Create a new config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the internal token
    pub fn internal_token(mut self, secret: impl Into<String>) -> Self {
        self.internal_token = InternalToken::new(secret);
        self
    }

    /// Share an existing token handle
    pub fn token_handle(mut self, token: InternalToken) -> Self {
        self.internal_token = token;
        self
    }

    /// Set the domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the protocol
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the bind address (socket path for Unix sockets)
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Set the bind port
    pub fn http_port(mut self, port: impl Into<String>) -> Self {
        self.http_port = port.into();
        self
    }

    /// Set an explicit base URL for internal calls
    pub fn local_root_url(mut self, url: impl Into<String>) -> Self {
        self.local_root_url = Some(url.into());
        self
    }

    /// Shorthand for a Unix socket deployment
    pub fn unix_socket(path: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::UnixSocket,
            http_addr: path.into(),
            ..Default::default()
        }
    }

    /// Read configuration from `FORGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(uri) = env::var(vars::INTERNAL_TOKEN_URI) {
            if !uri.trim().is_empty() {
                config.internal_token = InternalToken::from_uri(uri.trim())?;
            }
        }
        if config.internal_token.is_empty() {
            if let Ok(token) = env::var(vars::INTERNAL_TOKEN) {
                config.internal_token = InternalToken::new(token);
            }
        }
        if let Ok(domain) = env::var(vars::DOMAIN) {
            config.domain = domain;
        }
        if let Ok(protocol) = env::var(vars::PROTOCOL) {
            config.protocol = protocol.parse()?;
        }
        if let Ok(addr) = env::var(vars::HTTP_ADDR) {
            config.http_addr = addr;
        }
        if let Ok(port) = env::var(vars::HTTP_PORT) {
            config.http_port = port;
        }
        if let Ok(url) = env::var(vars::LOCAL_ROOT_URL) {
            if !url.is_empty() {
                config.local_root_url = Some(url);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise only fail at dispatch time
    pub fn validate(&self) -> Result<()> {
        if self.protocol.is_unix_socket() && self.http_addr.is_empty() {
            return Err(Error::config("unix socket protocol requires a socket path"));
        }
        if let Some(ref url) = self.local_root_url {
            Url::parse(url)
                .map_err(|e| Error::config(format!("invalid local root URL '{}': {}", url, e)))?;
        }
        Ok(())
    }

    /// Base URL for internal calls, always ending in `/`
    pub fn local_url(&self) -> String {
        if let Some(ref url) = self.local_root_url {
            if url.ends_with('/') {
                return url.clone();
            }
            return format!("{}/", url);
        }

        match self.protocol {
            Protocol::UnixSocket => "http://unix/".to_string(),
            Protocol::Http | Protocol::Https => {
                let host = match self.http_addr.as_str() {
                    "" | "0.0.0.0" => "localhost",
                    addr => addr,
                };
                format!("{}://{}:{}/", self.protocol.scheme(), host, self.http_port)
            }
        }
    }

    /// Socket path when serving over a Unix socket
    pub fn socket_path(&self) -> Option<PathBuf> {
        match self.protocol {
            Protocol::UnixSocket => Some(PathBuf::from(&self.http_addr)),
            _ => None,
        }
    }
}
