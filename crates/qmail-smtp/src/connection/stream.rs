//! TCP and TLS stream setup.

use crate::error::{Error, Result};
use crate::types::RelayAddress;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};
use tracing::debug;

/// Connects to a relay over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(relay: &RelayAddress) -> Result<TcpStream> {
    debug!(relay = %relay, "connecting");
    let stream = TcpStream::connect((relay.host(), relay.port())).await?;
    Ok(stream)
}

/// Connects to a relay over TLS (implicit TLS, usually port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(relay: &RelayAddress) -> Result<TlsStream<TcpStream>> {
    let tcp_stream = connect(relay).await?;
    upgrade_to_tls(tcp_stream, relay.host()).await
}

/// Runs a TLS handshake over an established TCP stream.
///
/// # Errors
///
/// Returns an error if the hostname is not a valid server name or the
/// handshake fails.
pub async fn upgrade_to_tls(stream: TcpStream, hostname: &str) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    debug!(hostname, "starting TLS handshake");
    let tls_stream = tls_connector().connect(server_name, stream).await?;
    Ok(tls_stream)
}

/// Creates a TLS connector with the Mozilla root certificates.
fn tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
