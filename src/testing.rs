// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Test servers over a Unix domain socket and over loopback TLS

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rcgen::{CertificateParams, KeyPair};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;

type Handler = Arc<dyn Fn(&Parts) -> (StatusCode, String) + Send + Sync>;

/// Serve HTTP/1 on `listener` until the test runtime shuts down.
///
/// `handler` sees the request head and returns a status and body.
pub(crate) fn serve_unix<F>(listener: UnixListener, handler: F)
where
    F: Fn(&Parts) -> (StatusCode, String) + Send + Sync + 'static,
{
    let handler: Handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_connection(stream, handler.clone()));
        }
    });
}

/// Serve HTTPS on `listener` with a fresh self-signed certificate for
/// `cert_name`.
///
/// The returned channel yields the SNI name of every completed handshake.
pub(crate) fn serve_tls<F>(
    listener: TcpListener,
    cert_name: &str,
    handler: F,
) -> mpsc::UnboundedReceiver<Option<String>>
where
    F: Fn(&Parts) -> (StatusCode, String) + Send + Sync + 'static,
{
    let acceptor = TlsAcceptor::from(Arc::new(self_signed_server_config(cert_name)));
    let handler: Handler = Arc::new(handler);
    let (names, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let handler = handler.clone();
            let names = names.clone();
            tokio::spawn(async move {
                let Ok(stream) = acceptor.accept(stream).await else {
                    return;
                };
                let _ = names.send(stream.get_ref().1.server_name().map(str::to_owned));
                serve_connection(stream, handler).await;
            });
        }
    });

    rx
}

fn self_signed_server_config(cert_name: &str) -> ServerConfig {
    let params = CertificateParams::new(vec![cert_name.to_string()]).expect("certificate params");
    let key_pair = KeyPair::generate().expect("key generation");
    let cert = params.self_signed(&key_pair).expect("self-signing");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .expect("server certificate");
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    config
}

async fn serve_connection<S>(stream: S, handler: Handler)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let handler = handler.clone();
        async move {
            let (parts, _body) = req.into_parts();
            let (status, body) = handler(&parts);
            let mut resp = hyper::Response::new(Full::new(Bytes::from(body)));
            *resp.status_mut() = status;
            Ok::<_, Infallible>(resp)
        }
    });
    let _ = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await;
}
