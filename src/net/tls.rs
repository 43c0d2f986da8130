//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load TLS configuration from certificate and key files.
///
/// Both files are checked up front so a missing file is reported by name
/// rather than as a PEM parse failure.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::debug!(cert = ?cert_path, key = ?key_path, "TLS credentials loaded");
    Ok(config)
}

/// Load credentials when TLS is enabled, `None` otherwise.
pub async fn from_config(tls: &TlsConfig) -> Result<Option<RustlsConfig>, std::io::Error> {
    if !tls.enabled {
        return Ok(None);
    }
    load_tls_config(Path::new(&tls.cert_file), Path::new(&tls.key_file))
        .await
        .map(Some)
}
