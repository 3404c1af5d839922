//! TLS trust policy.
//!
//! Maps [`CertificateCheck`] and the hostname flag onto a rustls client
//! configuration. The strict case uses the stock webpki verifier; every
//! relaxed case wraps it in [`PolicyVerifier`], which still checks handshake
//! signatures.
//!
//! `Optional` validates a presented chain exactly like `Required`; TLS servers
//! always present one, so the two only differ in name.

use std::path::Path;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use super::config::{CertificateCheck, ServerConfig};
use crate::{Error, Result};

/// Creates a TLS connector honouring the configured trust policy.
pub fn create_tls_connector(config: &ServerConfig) -> Result<TlsConnector> {
    let strict = config.certificate_check != CertificateCheck::None && config.hostname_check;
    let client_config = if strict {
        rustls::ClientConfig::builder()
            .with_root_certificates(Arc::new(root_store(config.ca_file.as_deref())?))
            .with_no_client_auth()
    } else {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(PolicyVerifier::new(config)?))
            .with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(client_config)))
}

/// Builds the trust anchors: the CA bundle when given, Mozilla roots otherwise.
fn root_store(ca_file: Option<&Path>) -> Result<RootCertStore> {
    let Some(path) = ca_file else {
        return Ok(RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        });
    };

    let mut store = RootCertStore::empty();
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| Error::Certificate(format!("{}: {e}", path.display())))?;
    for cert in certs {
        let cert = cert.map_err(|e| Error::Certificate(format!("{}: {e}", path.display())))?;
        store
            .add(cert)
            .map_err(|e| Error::Certificate(format!("{}: {e}", path.display())))?;
    }

    if store.is_empty() {
        return Err(Error::Certificate(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(store)
}

const fn is_name_mismatch(err: &CertificateError) -> bool {
    matches!(
        err,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

/// Verifier for the relaxed trust modes.
#[derive(Debug)]
struct PolicyVerifier {
    inner: Arc<WebPkiServerVerifier>,
    check: CertificateCheck,
    hostname_check: bool,
}

impl PolicyVerifier {
    fn new(config: &ServerConfig) -> Result<Self> {
        let roots = Arc::new(root_store(config.ca_file.as_deref())?);
        let inner = WebPkiServerVerifier::builder(roots)
            .build()
            .map_err(|e| Error::Certificate(e.to_string()))?;
        Ok(Self {
            inner,
            check: config.certificate_check,
            hostname_check: config.hostname_check,
        })
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if self.check == CertificateCheck::None {
            return Ok(ServerCertVerified::assertion());
        }

        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(verified) => Ok(verified),
            Err(rustls::Error::InvalidCertificate(err))
                if !self.hostname_check && is_name_mismatch(&err) =>
            {
                tracing::debug!(server = ?server_name, "ignoring certificate name mismatch");
                Ok(ServerCertVerified::assertion())
            }
            Err(err) => Err(err),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
