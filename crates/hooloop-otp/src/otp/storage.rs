//! Per-account secret persistence.
//!
//! [`SecretStore`] is the seam between the engine and whatever holds
//! enrolled secrets. [`SecretVault`] is the bundled in-memory store with
//! JSON serialisation and load/save helpers for a file on disk.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::otp::secret::Secret;
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One enrolled account. The secret is held as unpadded base-32 text.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountSecret {
    pub account_id: String,
    pub secret: String,
    #[serde(default)]
    pub otp_type: OtpType,
    /// Next expected HOTP counter. Unused for TOTP.
    #[serde(default)]
    pub counter: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountSecret {
    pub fn new_totp(account_id: impl Into<String>, secret: &Secret) -> Self {
        let now = Utc::now();
        Self {
            account_id: account_id.into(),
            secret: secret.to_base32(),
            otp_type: OtpType::Totp,
            counter: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_hotp(account_id: impl Into<String>, secret: &Secret, counter: u64) -> Self {
        let mut record = Self::new_totp(account_id, secret);
        record.otp_type = OtpType::Hotp;
        record.counter = counter;
        record
    }

    /// Decode the stored base-32 text back into key bytes.
    pub fn decode_secret(&self) -> OtpResult<Secret> {
        Secret::from_base32(&self.secret)
    }
}

impl fmt::Debug for AccountSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSecret")
            .field("account_id", &self.account_id)
            .field("secret", &"<redacted>")
            .field("otp_type", &self.otp_type)
            .field("counter", &self.counter)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Drop for AccountSecret {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Store boundary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Keyed storage for enrolled secrets.
pub trait SecretStore: Send {
    /// Fetch the record for `account_id` (`NotFound` if absent).
    fn load_secret(&self, account_id: &str) -> OtpResult<AccountSecret>;

    /// Insert a new record (`DuplicateAccount` if the id is taken).
    fn store_secret(&mut self, record: AccountSecret) -> OtpResult<()>;

    /// Delete and return the record for `account_id`.
    fn remove_secret(&mut self, account_id: &str) -> OtpResult<AccountSecret>;

    /// Advance the stored HOTP counter. Counters never move backwards.
    fn update_counter(&mut self, account_id: &str, counter: u64) -> OtpResult<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Vault
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Vault bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultMeta {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub account_count: usize,
}

impl Default for VaultMeta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: 1,
            created_at: now,
            updated_at: now,
            account_count: 0,
        }
    }
}

/// In-memory secret vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretVault {
    pub meta: VaultMeta,
    accounts: Vec<AccountSecret>,
}

impl SecretVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountSecret> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.get(account_id).is_some()
    }

    /// Enrolled account ids, in insertion order.
    pub fn account_ids(&self) -> Vec<&str> {
        self.accounts.iter().map(|a| a.account_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // ── Serialisation ────────────────────────────────────────────

    pub fn to_json(&self) -> OtpResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            OtpError::storage(format!("JSON serialise: {}", e))
        })
    }

    pub fn from_json(json: &str) -> OtpResult<Self> {
        let mut vault: Self = serde_json::from_str(json).map_err(|e| {
            OtpError::storage(format!("JSON deserialise: {}", e))
        })?;
        vault.meta.account_count = vault.accounts.len();
        Ok(vault)
    }

    /// Read a vault file. A missing file yields an empty vault.
    pub fn load_from(path: impl AsRef<Path>) -> OtpResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No vault at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        let vault = Self::from_json(&json)?;
        log::debug!("Loaded {} account(s) from {}", vault.len(), path.display());
        Ok(vault)
    }

    /// Write the vault to `path`, replacing any existing file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> OtpResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        log::debug!("Saved {} account(s) to {}", self.len(), path.display());
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    fn get_mut(&mut self, account_id: &str) -> Option<&mut AccountSecret> {
        self.accounts.iter_mut().find(|a| a.account_id == account_id)
    }

    fn touch(&mut self) {
        self.meta.account_count = self.accounts.len();
        self.meta.updated_at = Utc::now();
    }
}

impl SecretStore for SecretVault {
    fn load_secret(&self, account_id: &str) -> OtpResult<AccountSecret> {
        self.get(account_id)
            .cloned()
            .ok_or_else(|| OtpError::not_found(account_id))
    }

    fn store_secret(&mut self, record: AccountSecret) -> OtpResult<()> {
        if record.account_id.is_empty() {
            return Err(OtpError::storage("Account id must not be empty"));
        }
        if self.contains(&record.account_id) {
            return Err(OtpError::new(
                OtpErrorKind::DuplicateAccount,
                format!("Account '{}' is already enrolled", record.account_id),
            ));
        }
        self.accounts.push(record);
        self.touch();
        Ok(())
    }

    fn remove_secret(&mut self, account_id: &str) -> OtpResult<AccountSecret> {
        let pos = self
            .accounts
            .iter()
            .position(|a| a.account_id == account_id)
            .ok_or_else(|| OtpError::not_found(account_id))?;
        let record = self.accounts.remove(pos);
        self.touch();
        Ok(record)
    }

    fn update_counter(&mut self, account_id: &str, counter: u64) -> OtpResult<()> {
        let record = self
            .get_mut(account_id)
            .ok_or_else(|| OtpError::not_found(account_id))?;
        if counter < record.counter {
            return Err(OtpError::storage("Counter may not move backwards").with_detail(format!(
                "stored {}, requested {}",
                record.counter, counter
            )));
        }
        record.counter = counter;
        record.updated_at = Utc::now();
        self.touch();
        Ok(())
    }
}
