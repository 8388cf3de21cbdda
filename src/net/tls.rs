//! TLS configuration and certificate loading.

use std::io::{self, BufReader};
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load TLS configuration from PEM certificate and key files.
///
/// Both files are checked up front so a misconfigured listener fails at
/// startup with a pointed message instead of on the first handshake.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    check_pem_contains_cert(cert_path)?;
    check_pem_contains_key(key_path)?;

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

fn check_pem_contains_cert(path: &Path) -> Result<(), io::Error> {
    let file = std::fs::File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("certificate file {:?}: {}", path, e))
    })?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in {:?}", path),
        ));
    }
    Ok(())
}

fn check_pem_contains_key(path: &Path) -> Result<(), io::Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("private key file {:?}: {}", path, e)))?;
    let mut reader = BufReader::new(file);
    match rustls_pemfile::private_key(&mut reader)? {
        Some(_) => Ok(()),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no private key found in {:?}", path),
        )),
    }
}
