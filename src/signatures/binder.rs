//! Cryptographic binding of signed bytes.
//!
//! The signer only knows which bytes to sign; turning them into a signature
//! container is delegated to a [`SignatureBinder`]. The production binder is
//! [`Pkcs7Binder`], which produces a detached PKCS#7 `SignedData` with
//! OpenSSL.

use super::byterange::MIN_SIGNATURE_SIZE;
use crate::certificate::Certificate;
use crate::error::{Error, Result};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::X509;

/// Produces the DER signature container written into `/Contents`.
pub trait SignatureBinder {
    /// Sign the concatenated ByteRange slices.
    fn bind(&self, signed_bytes: &[u8]) -> Result<Vec<u8>>;

    /// Upper bound for the DER size of [`bind`](Self::bind) output.
    fn estimated_size(&self) -> usize;
}

/// Detached PKCS#7 signatures (`adbe.pkcs7.detached`).
#[derive(Debug)]
pub struct Pkcs7Binder<'a> {
    certificate: &'a Certificate,
}

impl<'a> Pkcs7Binder<'a> {
    /// Bind with the given signing identity.
    pub fn new(certificate: &'a Certificate) -> Self {
        Self { certificate }
    }

    fn chain_stack(&self) -> Result<Stack<X509>> {
        let mut stack = Stack::new().map_err(|e| Error::CryptoBindFailure(e.to_string()))?;
        for cert in self.certificate.chain() {
            stack
                .push(cert.clone())
                .map_err(|e| Error::CryptoBindFailure(e.to_string()))?;
        }
        Ok(stack)
    }
}

impl SignatureBinder for Pkcs7Binder<'_> {
    fn bind(&self, signed_bytes: &[u8]) -> Result<Vec<u8>> {
        let chain = self.chain_stack()?;
        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY;
        let pkcs7 = Pkcs7::sign(
            self.certificate.signer(),
            self.certificate.private_key(),
            &chain,
            signed_bytes,
            flags,
        )
        .map_err(|e| Error::CryptoBindFailure(e.to_string()))?;
        let der = pkcs7
            .to_der()
            .map_err(|e| Error::CryptoBindFailure(e.to_string()))?;
        log::debug!("Bound {} signed bytes into {} bytes of PKCS#7", signed_bytes.len(), der.len());
        Ok(der)
    }

    fn estimated_size(&self) -> usize {
        let certs: usize = std::iter::once(self.certificate.signer().to_der())
            .chain(self.certificate.chain().iter().map(|c| c.to_der()))
            .map(|der| der.map(|d| d.len()).unwrap_or(2048))
            .sum();
        let key_bytes = self.certificate.private_key().size();
        // signed attributes, algorithm identifiers and DER framing
        (certs + key_bytes + 2048).max(MIN_SIGNATURE_SIZE)
    }
}
