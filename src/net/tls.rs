//! TLS server policy construction.
//!
//! # Responsibilities
//! - Load the PEM certificate chain and private key from configured paths
//! - Parse the optional CA bundle into a client trust pool
//! - Require and verify client certificates when client auth is enabled
//!
//! The built [`rustls::ServerConfig`] is owned by the server handle and never
//! mutated after construction.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

use crate::config::TlsSettings;
use crate::error::ServerError;

/// Build a [`ServerConfig`] from the resolved TLS settings.
pub(crate) fn build_server_config(tls: &TlsSettings) -> Result<Arc<ServerConfig>, ServerError> {
    let keypair_err = |reason: String| ServerError::TlsKeyPair {
        cert_file: tls.cert_file.clone(),
        key_file: tls.key_file.clone(),
        reason,
    };

    let certs = load_cert_chain(&tls.cert_file).map_err(&keypair_err)?;
    let key = load_private_key(&tls.key_file).map_err(&keypair_err)?;

    let provider = Arc::new(ring::default_provider());
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| keypair_err(e.to_string()))?;

    let builder = match &tls.ca_file {
        Some(path) if tls.client_auth => {
            let roots = load_ca_pool(path)?;
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .map_err(|_| ServerError::CaFileInvalid { path: path.clone() })?;
            builder.with_client_cert_verifier(verifier)
        }
        Some(path) => {
            // The pool is still required to parse so a bad bundle fails at
            // construction, but without client auth no certificate is
            // requested from clients.
            let _extra_anchors = load_ca_pool(path)?;
            builder.with_no_client_auth()
        }
        None => builder.with_no_client_auth(),
    };

    let mut config = builder
        .with_single_cert(certs, key)
        .map_err(|e| keypair_err(e.to_string()))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn load_cert_chain(path: &str) -> Result<Vec<CertificateDer<'static>>, String> {
    let file = File::open(path).map_err(|e| format!("cannot open '{path}': {e}"))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("cannot parse '{path}': {e}"))?;
    if certs.is_empty() {
        return Err(format!("'{path}' contains no certificates"));
    }
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, String> {
    let file = File::open(path).map_err(|e| format!("cannot open '{path}': {e}"))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| format!("cannot parse '{path}': {e}"))?
        .ok_or_else(|| format!("'{path}' contains no private key"))
}

/// Read and parse the CA bundle. A missing file and a present-but-invalid
/// file are distinct failures.
fn load_ca_pool(path: &str) -> Result<RootCertStore, ServerError> {
    let file = File::open(path).map_err(|e| ServerError::CaFileNotFound {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ServerError::CaFileInvalid {
            path: path.to_string(),
        })?;

    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots
            .add(cert)
            .map_err(|_| ServerError::CaFileInvalid {
                path: path.to_string(),
            })?;
    }
    if roots.is_empty() {
        return Err(ServerError::CaFileInvalid {
            path: path.to_string(),
        });
    }
    Ok(roots)
}
