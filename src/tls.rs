//! The pinned TLS client profile.
//!
//! The Labs endpoint sits behind bot protection that fingerprints the TLS
//! handshake. Both the polling handshake and the WebSocket use a TLS 1.3-only
//! profile offering a single cipher suite and a single key-exchange group.

use std::sync::Arc;

use rustls::crypto::ring::{cipher_suite, default_provider, kx_group};
use rustls::{ClientConfig, RootCertStore};

use crate::error::{Error, Result};

/// Build the TLS 1.3 / `TLS_AES_128_GCM_SHA256` / X25519 client profile.
///
/// Trust anchors come from the platform certificate store.
pub fn pinned_client_config() -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        tracing::warn!(error = %err, "failed to load a native certificate");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "loaded native trust anchors");
    if roots.is_empty() {
        tracing::warn!("no usable root certificates found; TLS handshakes will fail");
    }

    let mut provider = default_provider();
    provider.cipher_suites = vec![cipher_suite::TLS13_AES_128_GCM_SHA256];
    provider.kx_groups = vec![kx_group::X25519];

    let config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13])
        .map_err(|e| {
            Error::transport(
                format!("Failed to build TLS profile: {e}"),
                Some(Box::new(e)),
            )
        })?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(config)
}
