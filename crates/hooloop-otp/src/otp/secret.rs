//! Shared-secret key material and enrollment-time provisioning.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::otp::config::OtpConfig;
use crate::otp::types::*;
use crate::otp::uri;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw HMAC key bytes for one account. Never empty; wiped on drop.
#[derive(Clone)]
pub struct Secret {
    bytes: Zeroizing<Vec<u8>>,
}

impl Secret {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> OtpResult<Self> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(OtpError::invalid_secret("Secret must not be empty"));
        }
        Ok(Self { bytes })
    }

    /// Decode base-32 text (case-insensitive; spaces, dashes and `=` padding ignored).
    pub fn from_base32(text: &str) -> OtpResult<Self> {
        let cleaned = normalise_base32(text);
        if cleaned.is_empty() {
            return Err(OtpError::invalid_secret("Secret must not be empty"));
        }
        if !cleaned.chars().all(|c| matches!(c, 'A'..='Z' | '2'..='7')) {
            return Err(OtpError::invalid_secret("Invalid base-32 secret"));
        }
        let decoded = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned)
            .ok_or_else(|| OtpError::invalid_secret("Invalid base-32 secret"))?;
        Self::from_bytes(decoded)
    }

    /// Fill `size` bytes from the OS CSPRNG.
    pub fn generate(size: usize) -> OtpResult<Self> {
        Self::generate_with(&mut OsRng, size)
    }

    /// Fill `size` bytes from the given generator.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R, size: usize) -> OtpResult<Self> {
        if size == 0 {
            return Err(OtpError::invalid_config("Secret size must be at least 1 byte"));
        }
        let mut buf = Zeroizing::new(vec![0u8; size]);
        rng.try_fill_bytes(buf.as_mut_slice()).map_err(|e| {
            OtpError::entropy_unavailable("Secure random source failed").with_detail(e.to_string())
        })?;
        Ok(Self { bytes: buf })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Upper-case RFC 4648 base-32 without padding.
    pub fn to_base32(&self) -> String {
        base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &self.bytes)
    }

    /// Short SHA-256 fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.as_slice());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.len() == other.bytes.len()
            && bool::from(self.bytes.as_slice().ct_eq(other.bytes.as_slice()))
    }
}

impl Eq for Secret {}

/// Upper-case and strip spaces, dashes and trailing `=` padding.
pub fn normalise_base32(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '\t'))
        .collect::<String>()
        .trim_end_matches('=')
        .to_uppercase()
}

/// Check if a string decodes as a non-empty base-32 secret.
pub fn is_valid_base32(text: &str) -> bool {
    Secret::from_base32(text).is_ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Provisioning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A freshly enrolled secret and the URI to hand to an authenticator app.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub account_name: String,
    pub issuer: String,
    pub secret: Secret,
    pub uri: String,
}

impl Provisioned {
    pub fn secret_base32(&self) -> String {
        self.secret.to_base32()
    }
}

/// Generate `secret_size` random bytes for `account_name` and build its
/// `otpauth://totp/...` provisioning URI.
pub fn provision(
    account_name: &str,
    issuer: &str,
    secret_size: usize,
    config: &OtpConfig,
) -> OtpResult<Provisioned> {
    provision_with_rng(&mut OsRng, account_name, issuer, secret_size, config)
}

/// `provision` with an explicit random source.
pub fn provision_with_rng<R: RngCore + ?Sized>(
    rng: &mut R,
    account_name: &str,
    issuer: &str,
    secret_size: usize,
    config: &OtpConfig,
) -> OtpResult<Provisioned> {
    if account_name.is_empty() {
        return Err(OtpError::invalid_config("Account name must not be empty"));
    }
    if issuer.is_empty() {
        return Err(OtpError::invalid_config("Issuer must not be empty"));
    }
    let secret = Secret::generate_with(rng, secret_size)?;
    let uri = uri::build_provisioning_uri(account_name, issuer, &secret, config);
    log::debug!(
        "Provisioned {}-byte secret {} for '{}'",
        secret.len(),
        secret.fingerprint(),
        account_name
    );
    Ok(Provisioned {
        account_name: account_name.to_string(),
        issuer: issuer.to_string(),
        secret,
        uri,
    })
}
