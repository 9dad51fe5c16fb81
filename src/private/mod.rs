// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Client for the forge's same-host internal API
//!
//! Every internal call is built the same way:
//!
//! 1. [`PrivateClient::new_request`] binds the call context and sets
//!    `Authorization: Bearer <internal token>`, reading the token at build
//!    time so rotation takes effect without a restart.
//! 2. [`PrivateClient::new_internal_request`] adds TLS settings that skip
//!    certificate verification but present the configured domain as server
//!    name, and in Unix socket mode overrides the transport so every dial
//!    lands on the configured socket path.
//!
//! Certificate verification is off. The internal API must only be reachable
//! from the local host; its certificate does not chain to a public root.

mod manager;

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::InternalConfig;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::transport::{Dialer, TlsClientConfig, Transport};

pub use manager::FlushOptions;

/// Error body returned by the internal API: `{"err": "<message>"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub err: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode the error envelope of an internal API response.
///
/// Only the first JSON value of the body is read; anything after it is
/// ignored. Never fails: when the body is not a valid envelope, the decoder's
/// own error description becomes the message, so callers always have
/// something to report.
pub fn decode_json_error(response: &Response) -> ErrorEnvelope {
    let mut values =
        serde_json::Deserializer::from_slice(&response.body).into_iter::<ErrorEnvelope>();
    match values.next() {
        Some(Ok(envelope)) => envelope,
        Some(Err(e)) => ErrorEnvelope { err: e.to_string() },
        // Blank body: report the decoder's end-of-input error.
        None => ErrorEnvelope {
            err: serde_json::from_slice::<ErrorEnvelope>(&response.body)
                .err()
                .map_or_else(|| "EOF".to_string(), |e| e.to_string()),
        },
    }
}

/// Builds authenticated requests to the internal API
///
/// The transport strategy is selected once from the configuration; cloning
/// is cheap and clones share configuration and token.
#[derive(Debug, Clone)]
pub struct PrivateClient {
    config: Arc<InternalConfig>,
    transport: Transport,
    dialer: Option<Arc<dyn Dialer>>,
}

impl PrivateClient {
    /// Create a client, selecting the transport from `config.protocol`
    pub fn new(config: InternalConfig) -> Self {
        let transport = Transport::from_config(&config);
        let dialer = transport.dialer();
        Self {
            config: Arc::new(config),
            transport,
            dialer,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &InternalConfig {
        &self.config
    }

    /// Selected transport strategy
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Absolute URL of an internal API path, e.g. `manager/shutdown`
    pub fn internal_url(&self, path: &str) -> String {
        format!(
            "{}api/internal/{}",
            self.config.local_url(),
            path.trim_start_matches('/')
        )
    }

    /// Authenticated request bound to `ctx`. No I/O happens here.
    pub fn new_request(&self, ctx: &CallContext, url: &str, method: &str) -> Result<Request> {
        let token = self.config.internal_token.get();
        Request::new(url, method)?
            .with_context(ctx.clone())
            .bearer_auth(&token)
    }

    /// Authenticated request with the internal TLS settings and, in Unix
    /// socket mode, the socket transport override.
    pub fn new_internal_request(
        &self,
        ctx: &CallContext,
        url: &str,
        method: &str,
    ) -> Result<Request> {
        let mut req = self
            .new_request(ctx, url, method)?
            .set_tls_client_config(TlsClientConfig::insecure(&self.config.domain));

        if let Some(ref dialer) = self.dialer {
            req = req.set_transport(dialer.clone());
        }

        debug!(
            method = %req.method,
            url = %req.url,
            transport = ?self.transport,
            "built internal request"
        );
        Ok(req)
    }

    /// Send `req`; anything but 200 becomes [`Error::Internal`] carrying the
    /// decoded envelope message.
    pub(crate) async fn call(&self, req: Request) -> Result<Response> {
        let resp = req.send().await?;
        if resp.status != http::StatusCode::OK {
            debug!(
                status = resp.status_code(),
                content_type = resp.content_type().unwrap_or("-"),
                "internal API rejected call"
            );
            let envelope = decode_json_error(&resp);
            return Err(Error::internal(resp.status_code(), envelope.err));
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use url::Url;

    use super::*;
    use crate::config::{InternalToken, Protocol};
    use crate::transport::UnixDialer;

    fn response(body: &'static str) -> Response {
        Response::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Bytes::from(body),
            Url::parse("http://localhost:3000/api/internal/manager/shutdown").unwrap(),
            1,
        )
    }

    #[test]
    fn test_decode_envelope() {
        assert_eq!(decode_json_error(&response(r#"{"err":"boom"}"#)).err, "boom");
        assert_eq!(decode_json_error(&response(r#"{"other":1}"#)).err, "");
        assert_eq!(decode_json_error(&response(r#"{"err":null}"#)).err, "");
    }

    #[test]
    fn test_decode_envelope_reads_first_value_only() {
        assert_eq!(
            decode_json_error(&response(r#"{"err":"boom"}garbage"#)).err,
            "boom"
        );
        assert_eq!(
            decode_json_error(&response("{\"err\":\"boom\"}\n{\"err\":\"second\"}")).err,
            "boom"
        );
        assert_eq!(
            decode_json_error(&response("  {\"err\":\"padded\"}\n")).err,
            "padded"
        );
    }

    #[test]
    fn test_decode_envelope_degrades_to_parse_error() {
        let expected = serde_json::from_slice::<ErrorEnvelope>(b"")
            .unwrap_err()
            .to_string();
        let envelope = decode_json_error(&response(""));
        assert!(!envelope.err.is_empty());
        assert_eq!(envelope.err, expected);

        let envelope = decode_json_error(&response(" \n"));
        assert!(envelope.err.starts_with("EOF"));

        let envelope = decode_json_error(&response("<html>502 Bad Gateway</html>"));
        assert!(!envelope.err.is_empty());

        let envelope = decode_json_error(&response(r#"{"err":42}"#));
        assert!(envelope.err.contains("invalid type"));
    }

    #[test]
    fn test_bearer_header_tracks_rotation() {
        let token = InternalToken::new("first-secret");
        let client = PrivateClient::new(InternalConfig::new().token_handle(token.clone()));
        let ctx = CallContext::background();
        let url = client.internal_url("manager/shutdown");

        let first = client.new_request(&ctx, &url, "POST").unwrap();
        token.set("second-secret");
        let second = client.new_request(&ctx, &url, "POST").unwrap();

        assert_eq!(first.authorization(), Some("Bearer first-secret"));
        assert_eq!(second.authorization(), Some("Bearer second-secret"));
    }

    #[test]
    fn test_new_request_propagates_construction_errors() {
        let client = PrivateClient::new(InternalConfig::new().internal_token("s"));
        let ctx = CallContext::background();

        assert!(matches!(
            client.new_request(&ctx, "::not-a-url::", "GET"),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            client.new_request(&ctx, "http://localhost/", "BAD METHOD"),
            Err(Error::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_network_mode_has_no_transport_override() {
        let client = PrivateClient::new(
            InternalConfig::new()
                .internal_token("s")
                .protocol(Protocol::Https)
                .domain("git.example.com"),
        );
        let ctx = CallContext::background();
        let req = client
            .new_internal_request(&ctx, &client.internal_url("manager/restart"), "POST")
            .unwrap();

        assert!(req.transport().is_none());
        assert_eq!(
            req.tls_client_config(),
            Some(&TlsClientConfig::insecure("git.example.com"))
        );
        assert!(req.url.as_str().starts_with("https://localhost:3000/api/internal/"));
    }

    #[test]
    fn test_unix_mode_overrides_transport() {
        let client = PrivateClient::new(
            InternalConfig::unix_socket("/run/forge/http.sock")
                .internal_token("s")
                .domain("git.example.com"),
        );
        let ctx = CallContext::background();
        let req = client
            .new_internal_request(&ctx, &client.internal_url("manager/restart"), "POST")
            .unwrap();

        assert_eq!(
            client.transport(),
            &Transport::UnixSocket {
                path: PathBuf::from("/run/forge/http.sock")
            }
        );
        assert!(req.transport().is_some());
        assert_eq!(
            format!("{:?}", req.transport().unwrap()),
            format!("{:?}", UnixDialer::new("/run/forge/http.sock"))
        );
        let tls = req.tls_client_config().unwrap();
        assert!(tls.insecure_skip_verify);
        assert_eq!(tls.server_name, "git.example.com");
        assert_eq!(req.url.as_str(), "http://unix/api/internal/manager/restart");
    }

    #[tokio::test]
    async fn test_concurrent_construction() {
        let client = PrivateClient::new(
            InternalConfig::unix_socket("/run/forge/http.sock").internal_token("shared"),
        );

        let handles: Vec<_> = (0..128)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let ctx = CallContext::background();
                    let url = client.internal_url(&format!("manager/op-{}", i));
                    client.new_internal_request(&ctx, &url, "POST")
                })
            })
            .collect();

        let requests: Vec<Request> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|res| res.unwrap().unwrap())
            .collect();

        assert_eq!(requests.len(), 128);
        for (i, req) in requests.iter().enumerate() {
            assert_eq!(req.authorization(), Some("Bearer shared"));
            assert_eq!(req.url.path(), format!("/api/internal/manager/op-{}", i));
            assert!(req.transport().is_some());
        }
    }
}
