//! TLS material shared by both endpoints.
//!
//! The certificate chain and private key are read once at startup. The
//! content endpoint hands the raw PEM to tiny_http; the reload endpoint
//! builds a rustls `ServerConfig` from the parsed DER.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::pem::{self, PemObject};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file `{0}` not found")]
    MissingCertificate(PathBuf),

    #[error("private key file `{0}` not found")]
    MissingKey(PathBuf),

    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("no PEM certificate found in `{0}`")]
    NoCertificates(PathBuf),

    #[error("invalid certificate in `{0}`: {1:?}")]
    InvalidCertificate(PathBuf, pem::Error),

    #[error("invalid private key in `{0}`: {1:?}")]
    InvalidKey(PathBuf, pem::Error),

    #[error("certificate rejected: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Certificate chain plus private key, loaded from PEM files.
pub struct TlsMaterial {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl TlsMaterial {
    /// Load and parse both files. Nothing is bound before this succeeds.
    pub fn load(cert: &Path, key: &Path) -> Result<Self, TlsError> {
        if !cert.is_file() {
            return Err(TlsError::MissingCertificate(cert.to_path_buf()));
        }
        if !key.is_file() {
            return Err(TlsError::MissingKey(key.to_path_buf()));
        }

        let cert_pem = read(cert)?;
        let key_pem = read(key)?;

        let certs = CertificateDer::pem_slice_iter(&cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::InvalidCertificate(cert.to_path_buf(), e))?;
        if certs.is_empty() {
            return Err(TlsError::NoCertificates(cert.to_path_buf()));
        }

        let key_der = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| TlsError::InvalidKey(key.to_path_buf(), e))?;

        crate::debug!("serve"; "loaded {} certificate(s) from {}", certs.len(), cert.display());

        Ok(Self {
            cert_pem,
            key_pem,
            certs,
            key: key_der,
        })
    }

    /// PEM pair for the content endpoint.
    pub fn ssl_config(&self) -> tiny_http::SslConfig {
        tiny_http::SslConfig {
            certificate: self.cert_pem.clone(),
            private_key: self.key_pem.clone(),
        }
    }

    /// rustls configuration for the reload endpoint.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(self.certs.clone(), self.key.clone_key())?;
        Ok(Arc::new(config))
    }

    pub fn acceptor(&self) -> Result<TlsAcceptor, TlsError> {
        Ok(TlsAcceptor::from(self.server_config()?))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|e| TlsError::Io(path.to_path_buf(), e))
}
