//! Account-level orchestrator: owns the secret store, the clock and the
//! shared configuration, and delegates to the pure engine modules.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::otp::clock::{Clock, SystemClock};
use crate::otp::config::OtpConfig;
use crate::otp::core;
use crate::otp::secret::{self, Provisioned};
use crate::otp::storage::{AccountSecret, SecretStore, SecretVault};
use crate::otp::types::*;
use crate::otp::uri;
use crate::otp::window;

/// Thread-safe service state.
pub type OtpServiceState = Arc<Mutex<OtpService>>;

/// Central OTP service.
pub struct OtpService {
    config: Arc<OtpConfig>,
    clock: Arc<dyn Clock>,
    store: Box<dyn SecretStore>,
}

impl OtpService {
    /// Create a service over an empty [`SecretVault`] and the system clock,
    /// wrapped in `Arc<Mutex<_>>`.
    pub fn new(config: OtpConfig) -> OtpResult<OtpServiceState> {
        let svc = Self::with_parts(config, Arc::new(SystemClock), Box::new(SecretVault::new()))?;
        Ok(Arc::new(Mutex::new(svc)))
    }

    /// Assemble a service from explicit collaborators.
    pub fn with_parts(
        config: OtpConfig,
        clock: Arc<dyn Clock>,
        store: Box<dyn SecretStore>,
    ) -> OtpResult<Self> {
        config.validate()?;
        log::info!(
            "OTP service ready: {} digits, {}s period, {}, skew {}",
            config.digits(),
            config.period(),
            config.algorithm(),
            config.skew()
        );
        Ok(Self {
            config: Arc::new(config),
            clock,
            store,
        })
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Enrollment
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Generate and store a fresh TOTP secret for `account_id`.
    pub fn enroll(&mut self, account_id: &str) -> OtpResult<Provisioned> {
        if self.store.load_secret(account_id).is_ok() {
            return Err(duplicate(account_id));
        }
        let provisioned = secret::provision(
            account_id,
            self.config.issuer(),
            self.config.secret_size(),
            &self.config,
        )?;
        self.store
            .store_secret(AccountSecret::new_totp(account_id, &provisioned.secret))?;
        log::info!(
            "Enrolled account '{}' (secret {})",
            account_id,
            provisioned.secret.fingerprint()
        );
        Ok(provisioned)
    }

    /// Enroll an account from an existing `otpauth://` URI.
    ///
    /// The URI's algorithm, digit count and (for TOTP) period must match the
    /// service configuration.
    pub fn import_uri(&mut self, account_id: &str, otpauth_uri: &str) -> OtpResult<()> {
        let parsed = uri::parse_provisioning_uri(otpauth_uri)?;
        if parsed.algorithm != self.config.algorithm() || parsed.digits != self.config.digits() {
            return Err(OtpError::invalid_config("URI parameters differ from service config")
                .with_detail(format!("{} / {} digits", parsed.algorithm, parsed.digits)));
        }
        if parsed.otp_type == OtpType::Totp && parsed.period != self.config.period() {
            return Err(OtpError::invalid_config("URI period differs from service config")
                .with_detail(format!("{}s", parsed.period)));
        }
        let secret = parsed.decode_secret()?;
        let record = match parsed.otp_type {
            OtpType::Totp => AccountSecret::new_totp(account_id, &secret),
            OtpType::Hotp => AccountSecret::new_hotp(account_id, &secret, parsed.counter),
        };
        self.store.store_secret(record)?;
        log::info!(
            "Imported {} account '{}' (secret {})",
            parsed.otp_type,
            account_id,
            secret.fingerprint()
        );
        Ok(())
    }

    /// Forget an account's secret.
    pub fn remove(&mut self, account_id: &str) -> OtpResult<()> {
        self.store.remove_secret(account_id)?;
        log::info!("Removed account '{}'", account_id);
        Ok(())
    }

    pub fn is_enrolled(&self, account_id: &str) -> bool {
        self.store.load_secret(account_id).is_ok()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Code generation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Current TOTP code for a time-based account.
    pub fn generate_code(&self, account_id: &str) -> OtpResult<GeneratedCode> {
        let record = self.load_totp(account_id)?;
        let secret = record.decode_secret()?;
        core::generate_code_at(&secret, self.clock.now_unix(), &self.config)
    }

    /// Every code currently accepted for a time-based account.
    pub fn window_codes(&self, account_id: &str) -> OtpResult<Vec<Code>> {
        let record = self.load_totp(account_id)?;
        let secret = record.decode_secret()?;
        window::enumerate_window(&secret, self.clock.now_unix(), &self.config)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Verification
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Check a submitted code. HOTP accounts look ahead `skew` counters and
    /// advance the stored counter past a match.
    pub fn verify(&mut self, account_id: &str, candidate: &str) -> OtpResult<VerifyResult> {
        let record = self.store.load_secret(account_id)?;
        let secret = record.decode_secret()?;

        let result = match record.otp_type {
            OtpType::Totp => {
                window::verify(&secret, candidate, self.clock.now_unix(), &self.config)?
            }
            OtpType::Hotp => {
                let result = window::verify_hotp(
                    &secret,
                    candidate,
                    record.counter,
                    self.config.skew(),
                    &self.config,
                )?;
                if let Some(matched) = result.matched_counter {
                    let next = matched.checked_add(1).ok_or_else(|| {
                        OtpError::storage(format!("Counter exhausted for '{}'", account_id))
                    })?;
                    self.store.update_counter(account_id, next)?;
                }
                result
            }
        };

        if result.valid {
            log::info!("Code accepted for '{}' (drift {})", account_id, result.drift);
        } else {
            log::warn!("Code rejected for '{}'", account_id);
        }
        Ok(result)
    }

    /// [`verify`](Self::verify), reduced to accept/reject.
    pub fn validate(&mut self, account_id: &str, candidate: &str) -> OtpResult<bool> {
        self.verify(account_id, candidate).map(|r| r.valid)
    }

    // ── Internal ─────────────────────────────────────────────────

    fn load_totp(&self, account_id: &str) -> OtpResult<AccountSecret> {
        let record = self.store.load_secret(account_id)?;
        if record.otp_type != OtpType::Totp {
            return Err(OtpError::invalid_config(format!(
                "Account '{}' is counter-based",
                account_id
            )));
        }
        Ok(record)
    }
}

fn duplicate(account_id: &str) -> OtpError {
    OtpError::new(
        OtpErrorKind::DuplicateAccount,
        format!("Account '{}' is already enrolled", account_id),
    )
}
