//! Configuration for signing runs.
//!
//! [`SigningOptions`] are the per-batch switches a caller passes with each
//! request. [`EngineConfig`] holds the longer-lived engine settings: stamp
//! geometry, field naming, the signature reason and the certificate policy.
//! Both deserialize from JSON so front ends can keep them in a file.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-batch signing switches.
///
/// Stamp fonts are not chosen here. The signer name is drawn in the Base-14
/// Times-Italic, which viewers supply and which is not embedded, unless
/// [`EngineConfig::script_font`] names a TrueType file to embed instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningOptions {
    /// Append a final seal revision that forbids further changes.
    pub lock_after_signing: bool,

    /// Append a summary page before the first signature is applied.
    pub include_protocol_page: bool,
}

impl SigningOptions {
    /// Create options with everything disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the document after signing.
    pub fn with_lock(mut self, enable: bool) -> Self {
        self.lock_after_signing = enable;
        self
    }

    /// Append the protocol page.
    pub fn with_protocol_page(mut self, enable: bool) -> Self {
        self.include_protocol_page = enable;
        self
    }
}

/// What to do with a certificate outside its validity window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Use the certificate as presented.
    #[default]
    Ignore,
    /// Refuse certificates that are not yet valid or already expired.
    Reject,
}

/// Width and height of a stamp in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StampSize {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl StampSize {
    /// Create a stamp size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Default size of a full signature stamp.
pub const SIGNATURE_SIZE: StampSize = StampSize::new(150.0, 50.0);

/// Default size of an initials stamp.
pub const INITIALS_SIZE: StampSize = StampSize::new(50.0, 35.0);

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `/Reason` written into every signature dictionary.
    pub reason: String,

    /// Optional `/Location` written into every signature dictionary.
    pub location: Option<String>,

    /// Prefix for generated signature field names.
    pub field_prefix: String,

    /// Name of the invisible seal field added by the locker.
    pub seal_field_name: String,

    /// Size of a full signature stamp.
    pub signature_size: StampSize,

    /// Size of an initials stamp.
    pub initials_size: StampSize,

    /// Distance of corner-anchored initials from the page edges.
    pub corner_margin: f32,

    /// TrueType file used for the signer-name line.
    ///
    /// `None` falls back to the standard Times-Italic.
    pub script_font: Option<PathBuf>,

    /// Small attribution line at the bottom of signature stamps.
    pub attribution: String,

    /// Display name used when the certificate has no common name.
    pub fallback_name: Option<String>,

    /// Certificate validity policy.
    pub expiry_policy: ExpiryPolicy,

    /// Extra bytes reserved in `/Contents` on top of the estimate.
    pub contents_reserve: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reason: "Electronically signed".to_string(),
            location: None,
            field_prefix: "Signature_".to_string(),
            seal_field_name: "Lock_Seal".to_string(),
            signature_size: SIGNATURE_SIZE,
            initials_size: INITIALS_SIZE,
            corner_margin: 20.0,
            script_font: None,
            attribution: "github.com/keboola/esignature".to_string(),
            fallback_name: None,
            expiry_policy: ExpiryPolicy::Ignore,
            contents_reserve: 0,
        }
    }
}

impl EngineConfig {
    /// Create configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the signing reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Use a TrueType file for the signer-name line.
    pub fn with_script_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_font = Some(path.into());
        self
    }

    /// Set the fallback display name.
    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = Some(name.into());
        self
    }

    /// Set the certificate validity policy.
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    /// Reserve extra bytes in `/Contents` on top of the binder estimate.
    pub fn with_contents_reserve(mut self, bytes: usize) -> Self {
        self.contents_reserve = bytes;
        self
    }
}
