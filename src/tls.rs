// SPDX-License-Identifier: MIT
// Shared rustls client config. This is a security-assessment tool probing
// hosts it does not already trust, so peer certificates are never verified.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

use crate::error::ScanError;

#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// Builds the one `ClientConfig` the whole process shares. Cheap to clone via
/// `Arc`, expensive to rebuild per connection, so callers cache this.
pub fn insecure_client_config() -> Arc<ClientConfig> {
    let mut cfg = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier))
        .with_no_client_auth();
    cfg.alpn_protocols.clear();
    Arc::new(cfg)
}

/// Turns an `original_target` / literal IP string into the `ServerName` rustls
/// needs for SNI. Falls back to the literal IP form when the target has no
/// usable hostname.
pub fn server_name(name: &str) -> Result<ServerName<'static>, ScanError> {
    ServerName::try_from(name.to_string())
        .map_err(|_| ScanError::tls(format!("invalid server name {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_name_accepts_hostname() {
        assert!(server_name("example.com").is_ok());
    }

    #[test]
    fn server_name_accepts_ip_literal() {
        assert!(server_name("127.0.0.1").is_ok());
    }
}
