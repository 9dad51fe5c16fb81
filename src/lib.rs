// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # forge-internal - Internal API Client
//!
//! Builds and sends requests from a forge's web-facing process to its own
//! privileged, same-host internal API.
//!
//! ## Features
//!
//! - Bearer auth: shared internal token, read at build time so it can rotate
//! - Transport selection: TCP (optionally TLS) or a Unix domain socket
//! - Internal TLS: server name pinned to the configured domain, chain not verified
//! - Cancellation: every dial, handshake and read observes the caller's context
//! - Error envelopes: `{"err": "..."}` bodies decoded without ever failing
//! - Manager calls: shutdown, restart, flush queues, logging control
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_internal::{CallContext, InternalConfig, PrivateClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InternalConfig::unix_socket("/run/forge/http.sock")
//!         .internal_token("s3cret")
//!         .domain("git.example.com");
//!     let client = PrivateClient::new(config);
//!
//!     let ctx = CallContext::background();
//!     let message = client.restart(&ctx).await?;
//!     println!("{}", message);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod private;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience

// Configuration
pub use config::{InternalConfig, InternalToken, Protocol};

// Cancellation
pub use context::CallContext;

// Errors
pub use error::{Error, ErrorContext, Result};

// HTTP
pub use crate::http::{Request, Response};

// Internal API
pub use private::{decode_json_error, ErrorEnvelope, FlushOptions, PrivateClient};

// Transport
pub use transport::{Connection, Dialer, TcpDialer, TlsClientConfig, Transport, UnixDialer};

/// forge-internal version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
