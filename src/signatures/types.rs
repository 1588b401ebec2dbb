//! Digital signature types and data structures.

/// Sub-filter written into every signature dictionary.
pub const SUB_FILTER: &str = "adbe.pkcs7.detached";

/// Signature handler written as `/Filter`.
pub const FILTER: &str = "Adobe.PPKLite";

/// Information read from a signature dictionary.
#[derive(Debug, Clone, Default)]
pub struct SignatureInfo {
    /// Name of the signer (`/Name`)
    pub signer_name: Option<String>,
    /// Signing time (`/M`)
    pub signing_time: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Signing location
    pub location: Option<String>,
    /// Sub-filter name
    pub sub_filter: Option<String>,
    /// Byte range of the signed data
    pub byte_range: Vec<i64>,
    /// Whether the signature carries a `/P 1` MDP transform
    pub forbids_changes: bool,
}

/// Result of verifying one signature.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    /// Fully qualified name of the signature field
    pub field_name: String,
    /// Common name of the signing certificate
    pub signer_cn: Option<String>,
    /// Signature dictionary contents
    pub signature_info: SignatureInfo,
    /// Whether the signed ranges reach the end of the file
    pub covers_whole_document: bool,
    /// Overall verification status
    pub status: VerificationStatus,
    /// SHA-256 of the signed ranges, uppercase hex
    pub digest_hex: Option<String>,
    /// Verification messages (errors, warnings)
    pub messages: Vec<String>,
}

impl VerificationResult {
    /// An unverified result for `field_name`.
    pub fn new(field_name: impl Into<String>, signature_info: SignatureInfo) -> Self {
        Self {
            field_name: field_name.into(),
            signer_cn: None,
            signature_info,
            covers_whole_document: false,
            status: VerificationStatus::Unknown,
            digest_hex: None,
            messages: Vec::new(),
        }
    }

    /// Byte range as a fixed array, when it has four entries.
    pub fn byte_range(&self) -> Option<[i64; 4]> {
        self.signature_info.byte_range.as_slice().try_into().ok()
    }

    /// Record a failure.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = VerificationStatus::Invalid;
        self.messages.push(message.into());
    }
}

/// Verification status of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Signature is valid
    Valid,
    /// Signature is invalid (cryptographically or structurally)
    Invalid,
    /// Signature could not be checked
    Unknown,
}

impl VerificationStatus {
    /// Check if the status indicates a valid signature.
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationStatus::Valid)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            VerificationStatus::Valid => "valid",
            VerificationStatus::Invalid => "INVALID",
            VerificationStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_status() {
        assert!(VerificationStatus::Valid.is_valid());
        assert!(!VerificationStatus::Invalid.is_valid());
        assert!(!VerificationStatus::Unknown.is_valid());
        assert_eq!(VerificationStatus::Invalid.to_string(), "INVALID");
    }

    #[test]
    fn test_result_byte_range() {
        let info = SignatureInfo {
            byte_range: vec![0, 10, 20, 30],
            ..Default::default()
        };
        let mut result = VerificationResult::new("Signature_1", info);
        assert_eq!(result.byte_range(), Some([0, 10, 20, 30]));

        result.fail("digest mismatch");
        assert_eq!(result.status, VerificationStatus::Invalid);
        assert_eq!(result.messages, vec!["digest mismatch".to_string()]);

        let short = VerificationResult::new("x", SignatureInfo::default());
        assert_eq!(short.byte_range(), None);
    }
}
