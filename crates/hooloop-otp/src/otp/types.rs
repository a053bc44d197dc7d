//! Core types for the OTP engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri_name())
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Name used in the `algorithm=` parameter of `otpauth://` URIs.
    pub fn uri_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether a secret is used for time-based or counter-based codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    #[default]
    Totp,
    Hotp,
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Totp => write!(f, "totp"),
            Self::Hotp => write!(f, "hotp"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Code
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A fixed-width, zero-padded numeric passcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Render `value` left-padded with `0` to exactly `digits` characters.
    pub(crate) fn from_value(value: u32, digits: u8) -> Self {
        Code(format!("{:0>width$}", value, width = digits as usize))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Split the code in the middle for display (e.g. "123 456").
    pub fn grouped(&self) -> String {
        if self.0.len() <= 4 {
            return self.0.clone();
        }
        let mid = self.0.len() / 2;
        format!("{} {}", &self.0[..mid], &self.0[mid..])
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Code {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Code {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<Code> for String {
    fn from(c: Code) -> String {
        c.0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated TOTP code with timing info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub code: Code,
    /// Seconds until the code rolls over.
    pub remaining_seconds: u32,
    pub period: u32,
    /// Progress as fraction 0.0–1.0 (1.0 = about to expire).
    pub progress: f64,
    /// The time step the code was generated for.
    pub counter: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of checking a candidate code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    /// Matched counter minus the current counter (0 = exact).
    pub drift: i64,
    /// The counter value that matched (if any).
    pub matched_counter: Option<u64>,
}

impl VerifyResult {
    pub fn rejected() -> Self {
        Self {
            valid: false,
            drift: 0,
            matched_counter: None,
        }
    }

    pub fn matched(counter: u64, base: u64) -> Self {
        Self {
            valid: true,
            drift: (counter as i128 - base as i128) as i64,
            matched_counter: Some(counter),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Error type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpErrorKind {
    /// Empty or malformed secret supplied to generation/validation.
    InvalidSecret,
    /// Candidate is not exactly `digits` ASCII digits.
    InvalidCandidateFormat,
    /// The OS random source failed during provisioning.
    EntropyUnavailable,
    /// Out-of-range period, digits, secret size or issuer.
    InvalidConfig,
    InvalidUri,
    NotFound,
    DuplicateAccount,
    StorageError,
    IoError,
}

/// Crate-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpError {
    pub kind: OtpErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

pub type OtpResult<T> = Result<T, OtpError>;

impl OtpError {
    pub fn new(kind: OtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn invalid_secret(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::InvalidSecret, msg)
    }

    pub fn invalid_candidate(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::InvalidCandidateFormat, msg)
    }

    pub fn entropy_unavailable(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::EntropyUnavailable, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::InvalidConfig, msg)
    }

    pub fn invalid_uri(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::InvalidUri, msg)
    }

    pub fn not_found(account: &str) -> Self {
        Self::new(
            OtpErrorKind::NotFound,
            format!("No secret enrolled for account '{}'", account),
        )
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(OtpErrorKind::StorageError, msg)
    }

    pub fn is_kind(&self, kind: OtpErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(d) = &self.detail {
            write!(f, " ({})", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for OtpError {}

impl From<std::io::Error> for OtpError {
    fn from(e: std::io::Error) -> Self {
        Self::new(OtpErrorKind::IoError, e.to_string())
    }
}

impl From<serde_json::Error> for OtpError {
    fn from(e: serde_json::Error) -> Self {
        Self::storage(format!("JSON: {}", e))
    }
}

impl From<OtpError> for String {
    fn from(e: OtpError) -> String {
        e.to_string()
    }
}
