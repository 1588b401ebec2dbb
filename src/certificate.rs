//! PKCS#12 certificate loading.
//!
//! A [`CertificateStore`] opens password-protected PKCS#12 containers and
//! yields a [`Certificate`]: the private key, the signer certificate, the
//! issuer chain and the metadata shown on stamps and on the protocol page.
//!
//! Key material never leaves this module in serialized form. The password is
//! copied into a zeroizing buffer for the duration of the parse only.

use crate::config::ExpiryPolicy;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, Private};
use openssl::provider::Provider;
use openssl::x509::{X509Ref, X509VerifyResult, X509};
use std::fmt;
use x509_parser::prelude::*;
use zeroize::Zeroizing;

/// Format used for validity dates in human-readable output.
pub const VALIDITY_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Public key algorithm of the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// RSA key
    Rsa,
    /// Elliptic curve key
    Ec,
    /// Any other algorithm OpenSSL can sign with
    Other,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Rsa => write!(f, "RSA"),
            KeyType::Ec => write!(f, "EC"),
            KeyType::Other => write!(f, "other"),
        }
    }
}

/// Human-facing facts about a signing certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateMetadata {
    /// Subject common name
    pub subject_cn: Option<String>,
    /// Subject organization
    pub subject_org: Option<String>,
    /// Subject country code
    pub subject_country: Option<String>,
    /// Issuer common name
    pub issuer_cn: Option<String>,
    /// Issuer organization
    pub issuer_org: Option<String>,
    /// Start of the validity window
    pub not_before: DateTime<Utc>,
    /// End of the validity window
    pub not_after: DateTime<Utc>,
    /// Serial number in uppercase hex without leading zeros
    pub serial_hex: String,
    /// Algorithm of the signing key
    pub key_type: KeyType,
}

impl CertificateMetadata {
    /// Parse metadata from a DER-encoded certificate.
    pub fn from_der(der: &[u8], key_type: KeyType) -> Result<Self> {
        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| Error::InvalidCertificate(format!("cannot parse X.509: {}", e)))?;

        let validity = cert.validity();
        let not_before = asn1_to_utc(&validity.not_before)?;
        let not_after = asn1_to_utc(&validity.not_after)?;

        Ok(Self {
            subject_cn: first_attr(cert.subject().iter_common_name()),
            subject_org: first_attr(cert.subject().iter_organization()),
            subject_country: first_attr(cert.subject().iter_country()),
            issuer_cn: first_attr(cert.issuer().iter_common_name()),
            issuer_org: first_attr(cert.issuer().iter_organization()),
            not_before,
            not_after,
            serial_hex: serial_to_hex(cert.raw_serial()),
            key_type,
        })
    }

    /// Whether `now` lies inside the validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Validity start as `dd.mm.YYYY HH:MM`.
    pub fn valid_from_display(&self) -> String {
        self.not_before.format(VALIDITY_FORMAT).to_string()
    }

    /// Validity end as `dd.mm.YYYY HH:MM`.
    pub fn valid_until_display(&self) -> String {
        self.not_after.format(VALIDITY_FORMAT).to_string()
    }
}

fn first_attr<'a, 'b>(
    mut attrs: impl Iterator<Item = &'b AttributeTypeAndValue<'a>>,
) -> Option<String>
where
    'a: 'b,
{
    attrs
        .find_map(|attr| attr.as_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn asn1_to_utc(time: &ASN1Time) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| Error::InvalidCertificate("validity date out of range".to_string()))
}

fn serial_to_hex(raw: &[u8]) -> String {
    let hex: String = raw.iter().map(|b| format!("{:02X}", b)).collect();
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A decrypted signing identity.
pub struct Certificate {
    key: PKey<Private>,
    signer: X509,
    chain: Vec<X509>,
    metadata: CertificateMetadata,
}

impl Certificate {
    /// Assemble a certificate from its parts.
    ///
    /// Fails when the key does not belong to the certificate.
    pub fn from_parts(key: PKey<Private>, signer: X509, extra: Vec<X509>) -> Result<Self> {
        let public = signer
            .public_key()
            .map_err(|e| Error::InvalidCertificate(format!("unreadable public key: {}", e)))?;
        if !key.public_eq(&public) {
            return Err(Error::InvalidCertificate(
                "private key does not match certificate".to_string(),
            ));
        }

        let key_type = match key.id() {
            Id::RSA => KeyType::Rsa,
            Id::EC => KeyType::Ec,
            _ => KeyType::Other,
        };
        let der = signer
            .to_der()
            .map_err(|e| Error::InvalidCertificate(e.to_string()))?;
        let metadata = CertificateMetadata::from_der(&der, key_type)?;
        let chain = order_chain(&signer, extra);

        Ok(Self {
            key,
            signer,
            chain,
            metadata,
        })
    }

    /// Parsed metadata.
    pub fn metadata(&self) -> &CertificateMetadata {
        &self.metadata
    }

    /// Algorithm of the signing key.
    pub fn key_type(&self) -> KeyType {
        self.metadata.key_type
    }

    /// The signer certificate.
    pub fn signer(&self) -> &X509Ref {
        &self.signer
    }

    /// DER encoding of the signer certificate.
    pub fn signer_der(&self) -> Result<Vec<u8>> {
        self.signer
            .to_der()
            .map_err(|e| Error::InvalidCertificate(e.to_string()))
    }

    /// Issuer chain, closest issuer first.
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    pub(crate) fn private_key(&self) -> &PKey<Private> {
        &self.key
    }

    /// Name to print on stamps.
    ///
    /// Uses the subject common name, then `fallback`. Fails with
    /// [`Error::EmptySignerName`] when neither is usable.
    pub fn display_name(&self, fallback: Option<&str>) -> Result<String> {
        self.metadata
            .subject_cn
            .as_deref()
            .or(fallback)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or(Error::EmptySignerName)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("key", &"[REDACTED]")
            .field("metadata", &self.metadata)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

/// Walk issuer links from the signer upwards; anything unlinked goes last.
fn order_chain(signer: &X509Ref, mut pool: Vec<X509>) -> Vec<X509> {
    let signer_der = signer.to_der().ok();
    pool.retain(|c| c.to_der().ok() != signer_der);

    let mut ordered: Vec<X509> = Vec::with_capacity(pool.len());
    let mut current = signer.to_owned();
    loop {
        // self-issued certificates end the walk
        if current.issued(&current) == X509VerifyResult::OK {
            break;
        }
        let Some(pos) = pool
            .iter()
            .position(|candidate| candidate.issued(&current) == X509VerifyResult::OK)
        else {
            break;
        };
        let issuer = pool.remove(pos);
        current = issuer.clone();
        ordered.push(issuer);
    }
    ordered.extend(pool);
    ordered
}

/// Opens PKCS#12 containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateStore {
    expiry_policy: ExpiryPolicy,
}

impl CertificateStore {
    /// Create a store with the given validity policy.
    pub fn new(expiry_policy: ExpiryPolicy) -> Self {
        Self { expiry_policy }
    }

    /// Load and decrypt a PKCS#12 container, checking validity against now.
    pub fn load(&self, bytes: &[u8], password: &str) -> Result<Certificate> {
        self.load_at(bytes, password, Utc::now())
    }

    /// Load and decrypt a PKCS#12 container, checking validity against `now`.
    pub fn load_at(&self, bytes: &[u8], password: &str, now: DateTime<Utc>) -> Result<Certificate> {
        if bytes.is_empty() {
            return Err(Error::InvalidCertificate("empty container".to_string()));
        }
        let container = Pkcs12::from_der(bytes)
            .map_err(|e| Error::InvalidCertificate(format!("not a PKCS#12 container: {}", e)))?;

        // OpenSSL cannot pass an interior NUL through to the KDF
        if password.contains('\0') {
            return Err(Error::WrongPassword);
        }
        let secret = Zeroizing::new(password.to_string());

        // RC2 and 3DES containers from older exporters need the legacy provider
        let _legacy = Provider::try_load(None, "legacy", true).ok();
        let parsed = container.parse2(&secret).map_err(|e| {
            log::debug!("PKCS#12 decryption failed: {}", e);
            Error::WrongPassword
        })?;
        drop(secret);

        let key = parsed
            .pkey
            .ok_or_else(|| Error::InvalidCertificate("container has no private key".to_string()))?;
        let signer = parsed
            .cert
            .ok_or_else(|| Error::InvalidCertificate("container has no certificate".to_string()))?;
        let extra: Vec<X509> = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        let certificate = Certificate::from_parts(key, signer, extra)?;
        let meta = certificate.metadata();
        if !meta.is_valid_at(now) {
            match self.expiry_policy {
                ExpiryPolicy::Reject => {
                    return Err(Error::ExpiredCertificate {
                        not_before: meta.valid_from_display(),
                        not_after: meta.valid_until_display(),
                    });
                },
                ExpiryPolicy::Ignore => {
                    log::warn!(
                        "Certificate is outside its validity window ({} - {})",
                        meta.valid_from_display(),
                        meta.valid_until_display()
                    );
                },
            }
        }

        log::info!(
            "Loaded {} certificate (serial {}, {} chain certificates)",
            meta.key_type,
            meta.serial_hex,
            certificate.chain().len()
        );
        Ok(certificate)
    }

    /// Load a container and resolve the signer name for one signing run.
    pub fn open_session(
        &self,
        bytes: &[u8],
        password: &str,
        fallback_name: Option<&str>,
    ) -> Result<SigningSession> {
        let certificate = self.load(bytes, password)?;
        SigningSession::new(certificate, fallback_name)
    }
}

/// The certificate and signer name owned by one signing run.
///
/// Dropping or closing the session releases the key.
#[derive(Debug)]
pub struct SigningSession {
    certificate: Certificate,
    signer_name: String,
}

impl SigningSession {
    /// Wrap an already loaded certificate.
    pub fn new(certificate: Certificate, fallback_name: Option<&str>) -> Result<Self> {
        let signer_name = certificate.display_name(fallback_name)?;
        log::debug!("Opened signing session");
        Ok(Self {
            certificate,
            signer_name,
        })
    }

    /// The loaded certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Name printed on stamps.
    pub fn signer_name(&self) -> &str {
        &self.signer_name
    }

    /// End the session and release the key.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for SigningSession {
    fn drop(&mut self) {
        log::debug!("Closed signing session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_hex_strips_leading_zeros() {
        assert_eq!(serial_to_hex(&[0x00, 0x0A, 0xBC]), "ABC");
        assert_eq!(serial_to_hex(&[0x01]), "1");
        assert_eq!(serial_to_hex(&[0x00]), "0");
        assert_eq!(serial_to_hex(&[]), "0");
    }

    #[test]
    fn test_garbage_is_invalid_certificate() {
        let store = CertificateStore::default();
        let err = store.load(b"definitely not der", "pw").unwrap_err();
        assert!(matches!(err, Error::InvalidCertificate(_)));

        let err = store.load(&[], "pw").unwrap_err();
        assert!(matches!(err, Error::InvalidCertificate(_)));
    }

    #[test]
    fn test_key_type_display() {
        assert_eq!(KeyType::Rsa.to_string(), "RSA");
        assert_eq!(KeyType::Ec.to_string(), "EC");
    }

    #[test]
    fn test_session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SigningSession>();
        assert_send::<Certificate>();
    }
}
