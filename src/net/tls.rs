//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("failed to build rustls config: {0}")]
    Rustls(#[source] std::io::Error),
}

/// Load TLS configuration from certificate and key files.
///
/// Both files are checked up front so a bad path or an empty PEM is reported
/// by name instead of as a generic rustls failure.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    let certs = read_pem(cert_path, |reader| {
        rustls_pemfile::certs(reader).collect::<Result<Vec<_>, _>>()
    })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.to_path_buf()));
    }

    let key = read_pem(key_path, |reader| rustls_pemfile::private_key(reader))?;
    if key.is_none() {
        return Err(TlsError::NoPrivateKey(key_path.to_path_buf()));
    }

    tracing::debug!(
        cert = ?cert_path,
        key = ?key_path,
        certificates = certs.len(),
        "TLS credentials loaded"
    );

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Rustls)
}

fn read_pem<T>(
    path: &Path,
    parse: impl FnOnce(&mut BufReader<File>) -> std::io::Result<T>,
) -> Result<T, TlsError> {
    let read_err = |source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    parse(&mut BufReader::new(file)).map_err(read_err)
}
