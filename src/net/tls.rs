//! TLS configuration and certificate loading.
//!
//! Missing or empty certificate material is not an error: the listener
//! downgrades to plain HTTP and says so in the log.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load TLS material, or `None` when the listener should serve plain HTTP.
pub async fn load_tls_config(tls: Option<&TlsConfig>) -> Result<Option<RustlsConfig>, std::io::Error> {
    let Some(tls) = tls else {
        return Ok(None);
    };

    let cert_path = Path::new(&tls.cert_file);
    let key_path = Path::new(&tls.key_file);
    if tls.cert_file.is_empty() || tls.key_file.is_empty() || !cert_path.exists() || !key_path.exists() {
        tracing::warn!(
            cert_file = %tls.cert_file,
            key_file = %tls.key_file,
            "TLS material missing, downgrading to plain HTTP"
        );
        return Ok(None);
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_tls_configured() {
        assert!(load_tls_config(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_files_downgrade() {
        let tls = TlsConfig {
            cert_file: "/nonexistent/cert.pem".into(),
            key_file: "/nonexistent/key.pem".into(),
        };
        assert!(load_tls_config(Some(&tls)).await.unwrap().is_none());
    }
}
