//! Outbound WebSocket connections to the television.
//!
//! Covers the two device-side endpoints a session may open: the primary
//! control connection and the pointer input socket.  Both go through
//! [`connect_tv`], which applies the device trust policy.
//!
//! # Trust policy
//!
//! webOS televisions present self-signed certificates on their secure control
//! port.  Certificate validation is therefore disabled for device-side
//! connections only; the server side of the proxy is unaffected.  The scheme
//! rule: the standard control port gets `wss://`, any other port `ws://`.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// The established device-side stream type shared by both endpoints.
pub type TvStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The control port on which the television speaks TLS.
pub const SECURE_PORT: u16 = 3001;

// ── Trust policy ──────────────────────────────────────────────────────────────

/// Certificate verifier that accepts any device certificate.
///
/// Televisions ship self-signed certificates with no CA chain to pin, so the
/// usual webpki validation cannot succeed against them.
#[derive(Debug)]
struct NoCertVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Builds the TLS connector carrying the device trust policy.
///
/// The ring provider is selected explicitly so the configuration does not
/// depend on a process-level provider default.
fn tls_connector() -> anyhow::Result<Connector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("failed to build TLS client configuration")?
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();
    config
        .dangerous()
        .set_certificate_verifier(Arc::new(NoCertVerification));
    Ok(Connector::Rustls(Arc::new(config)))
}

// ── Connection ────────────────────────────────────────────────────────────────

/// Opens a device-side WebSocket to `url`.
///
/// The trust policy is supplied for `wss://` URLs; plain `ws://` URLs ignore
/// it.
///
/// # Errors
///
/// Returns an error when the TCP connect, TLS handshake, or WebSocket
/// upgrade fails.
pub async fn connect_tv(url: &str) -> anyhow::Result<TvStream> {
    debug!("connecting to device at {url}");
    let connector = tls_connector()?;
    let (stream, _response) = connect_async_tls_with_config(url, None, false, Some(connector))
        .await
        .with_context(|| format!("failed to connect to device at {url}"))?;
    Ok(stream)
}

// ── URL construction ──────────────────────────────────────────────────────────

/// Builds the primary control URL for a television.
///
/// `wss://` on the secure control port, `ws://` on anything else (test
/// fixtures, non-standard firmware).
pub fn control_url(ip: Ipv4Addr, port: u16) -> String {
    if port == SECURE_PORT {
        format!("wss://{ip}:{port}")
    } else {
        format!("ws://{ip}:{port}")
    }
}

/// Resolves a negotiated input-socket path against the primary connection.
///
/// Televisions usually return an absolute `wss://` URL, which passes through
/// untouched.  A bare path is resolved against the primary connection's host,
/// port, and scheme.
pub fn resolve_input_socket_url(path: &str, ip: Ipv4Addr, port: u16) -> String {
    if path.starts_with("ws://") || path.starts_with("wss://") {
        return path.to_string();
    }
    let scheme = if port == SECURE_PORT { "wss" } else { "ws" };
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{scheme}://{ip}:{port}/{path}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
