// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TLS client settings for internal requests

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::debug;

use super::Connection;
use crate::error::{Error, Result};

/// TLS client configuration attached to a request
///
/// Only used when the request URL is `https`. The server name is presented
/// via SNI whether or not the certificate is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsClientConfig {
    /// Skip certificate chain and hostname verification (dangerous!)
    pub insecure_skip_verify: bool,
    /// Name sent as SNI and, when verifying, checked against the certificate
    pub server_name: String,
}

impl TlsClientConfig {
    /// Verifying configuration against the webpki roots
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            insecure_skip_verify: false,
            server_name: server_name.into(),
        }
    }

    /// Configuration that accepts any certificate the peer presents
    pub fn insecure(server_name: impl Into<String>) -> Self {
        Self {
            insecure_skip_verify: true,
            server_name: server_name.into(),
        }
    }

    /// Build the rustls client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let provider = Arc::new(ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::tls(&self.server_name, e))?;

        let mut config = if self.insecure_skip_verify {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier::new(
                    provider.signature_verification_algorithms,
                )))
                .with_no_client_auth()
        } else {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        };
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(config)
    }

    /// Parsed server name
    pub fn server_name(&self) -> Result<ServerName<'static>> {
        ServerName::try_from(self.server_name.as_str())
            .map(|name| name.to_owned())
            .map_err(|e| Error::tls(&self.server_name, e))
    }
}

/// Wrap an established connection in TLS
pub async fn handshake(stream: Connection, tls: &TlsClientConfig) -> Result<Connection> {
    let connector = TlsConnector::from(Arc::new(tls.client_config()?));
    let server_name = tls.server_name()?;

    debug!(
        server_name = %tls.server_name,
        verify = !tls.insecure_skip_verify,
        "starting TLS handshake"
    );

    let stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|e| Error::tls(&tls.server_name, e))?;

    Ok(Box::new(stream))
}

/// Certificate verifier that trusts any chain.
///
/// Handshake signatures are still checked against the presented certificate,
/// so the peer must hold the matching private key.
#[derive(Debug)]
pub struct NoVerifier {
    algorithms: WebPkiSupportedAlgorithms,
}

impl NoVerifier {
    /// Create a verifier using the given signature algorithms
    pub fn new(algorithms: WebPkiSupportedAlgorithms) -> Self {
        Self { algorithms }
    }
}

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
