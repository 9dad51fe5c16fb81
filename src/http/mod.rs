// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP layer for internal API calls
//!
//! A [`Request`] carries everything one call needs: its cancellation context,
//! headers, optional TLS settings and an optional transport override.
//! [`Request::send`] opens a fresh HTTP/1 connection for that single call.

mod request;
mod response;

pub use request::Request;
pub use response::Response;

/// User agent sent on internal requests
pub const DEFAULT_USER_AGENT: &str = concat!("forge-internal/", env!("CARGO_PKG_VERSION"));
