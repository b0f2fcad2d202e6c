//! TLS termination for the wss listener

use comet_common::{AppError, AppResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls::crypto::ring::default_provider;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

/// Build an acceptor from a PEM certificate chain and private key
pub fn load_acceptor(
    cert_file: impl AsRef<Path>,
    key_file: impl AsRef<Path>,
) -> AppResult<TlsAcceptor> {
    let cert_file = cert_file.as_ref();
    let key_file = key_file.as_ref();

    let mut certs = BufReader::new(File::open(cert_file)?);
    let certs = rustls_pemfile::certs(&mut certs).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(AppError::tls(format!("no certificate in {}", cert_file.display())));
    }

    let mut key = BufReader::new(File::open(key_file)?);
    let key = rustls_pemfile::private_key(&mut key)?
        .ok_or_else(|| AppError::tls(format!("no private key in {}", key_file.display())))?;

    let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(AppError::tls)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(AppError::tls)?;

    tracing::info!(cert = %cert_file.display(), "tls configured");
    Ok(TlsAcceptor::from(Arc::new(config)))
}
