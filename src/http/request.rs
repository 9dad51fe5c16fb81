// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP request type and dispatch

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::{self, Either};
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tracing::debug;
use url::{Position, Url};

use super::response::Response;
use super::DEFAULT_USER_AGENT;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::transport::{handshake, Dialer, TcpDialer, TlsClientConfig};

/// One outbound call, built step by step and consumed by [`Request::send`]
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
    /// Request timeout
    pub timeout: Option<Duration>,
    context: CallContext,
    tls: Option<TlsClientConfig>,
    transport: Option<Arc<dyn Dialer>>,
}

impl Request {
    /// Create a request. Malformed URLs and methods are rejected here.
    pub fn new(url: impl AsRef<str>, method: impl AsRef<str>) -> Result<Self> {
        let method = method.as_ref();
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;
        let url = Url::parse(url.as_ref())?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        Ok(Self {
            method,
            url,
            headers,
            body: None,
            timeout: None,
            context: CallContext::background(),
            tls: None,
            transport: None,
        })
    }

    /// Bind the request to a cancellation context
    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.context = ctx;
        self
    }

    /// Set a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref();
        let header_name =
            HeaderName::try_from(name).map_err(|e| Error::invalid_header(name, e))?;
        let header_value =
            HeaderValue::try_from(value.as_ref()).map_err(|e| Error::invalid_header(name, e))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Set `Authorization: Bearer <token>`
    pub fn bearer_auth(mut self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| Error::invalid_header(AUTHORIZATION.as_str(), e))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        let json = serde_json::to_vec(data)?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach TLS settings, used when the URL is `https`
    pub fn set_tls_client_config(mut self, tls: TlsClientConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Override how the connection is established
    pub fn set_transport(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.transport = Some(dialer);
        self
    }

    /// Cancellation context
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// TLS settings, if attached
    pub fn tls_client_config(&self) -> Option<&TlsClientConfig> {
        self.tls.as_ref()
    }

    /// Transport override, if any
    pub fn transport(&self) -> Option<&Arc<dyn Dialer>> {
        self.transport.as_ref()
    }

    /// Authorization header value
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }

    /// Dispatch the request on a fresh connection.
    ///
    /// Non-success statuses are returned as responses, not errors. Dial, TLS
    /// and protocol failures are errors, as is the context ending first.
    pub async fn send(self) -> Result<Response> {
        let context = self.context.clone();
        let url = self.url.to_string();
        let timeout = self.timeout;
        let exchange = self.exchange();

        context
            .run(async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, exchange).await.map_err(|_| {
                        Error::timeout_with_url("internal request", millis(limit), url)
                    })?,
                    None => exchange.await,
                }
            })
            .await
    }

    async fn exchange(self) -> Result<Response> {
        let start = Instant::now();
        let scheme = self.url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::other(format!("unsupported URL scheme '{}'", scheme)));
        }

        let addr = dial_address(&self.url)?;
        let stream = match self.transport {
            Some(ref dialer) => dialer.dial_context(&self.context, "tcp", &addr).await?,
            None => TcpDialer.dial_context(&self.context, "tcp", &addr).await?,
        };

        let stream = if scheme == "https" {
            let tls = match self.tls {
                Some(ref tls) => tls.clone(),
                None => TlsClientConfig::new(self.url.host_str().unwrap_or_default()),
            };
            handshake(stream, &tls).await?
        } else {
            stream
        };

        let request = self.to_hyper()?;
        let (mut sender, conn) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream)).await?;

        let roundtrip = Box::pin(async move {
            let response = sender.send_request(request).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, body))
        });

        // Drive the connection in this task; nothing outlives the call.
        let (parts, body) = match future::select(roundtrip, Box::pin(conn)).await {
            Either::Left((res, _conn)) => res?,
            Either::Right((res, roundtrip)) => {
                res?;
                roundtrip.await?
            }
        };

        let response_time = millis(start.elapsed());
        debug!(
            method = %self.method,
            url = %self.url,
            status = parts.status.as_u16(),
            response_time_ms = response_time,
            "internal request finished"
        );

        Ok(Response::new(
            parts.status,
            parts.headers,
            body,
            self.url,
            response_time,
        ))
    }

    fn to_hyper(&self) -> Result<hyper::Request<Full<Bytes>>> {
        let target: Uri = self.url[Position::BeforePath..Position::AfterQuery].parse()?;

        let mut request = hyper::Request::new(Full::new(self.body.clone().unwrap_or_default()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = target;
        *request.headers_mut() = self.headers.clone();

        if !request.headers().contains_key(HOST) {
            let host = &self.url[Position::BeforeHost..Position::AfterPort];
            let value = HeaderValue::from_str(host).map_err(|e| Error::invalid_header("host", e))?;
            request.headers_mut().insert(HOST, value);
        }

        Ok(request)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `host:port` the default dialer connects to
fn dial_address(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::other(format!("URL has no host: {}", url)))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::other(format!("URL has no port: {}", url)))?;
    Ok(format!("{}:{}", host, port))
}
