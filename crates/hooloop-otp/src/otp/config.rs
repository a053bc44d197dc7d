//! Immutable algorithm configuration shared by every OTP operation.
//!
//! Built once at process start (defaults, a JSON document, or the
//! `HOOLOOP_OTP_*` environment), validated, then only ever read.

use serde::{Deserialize, Serialize};

use crate::otp::types::*;

pub const DEFAULT_PERIOD: u32 = 30;
pub const DEFAULT_DIGITS: u8 = 6;
pub const DEFAULT_SKEW: u32 = 10;
pub const DEFAULT_ISSUER: &str = "Hooloop.com";
pub const DEFAULT_SECRET_SIZE: usize = 32;

/// `10^9 - 1` still fits the 31-bit truncated value; 10 digits would not.
pub const MAX_DIGITS: u8 = 9;
/// Largest accepted skew, in periods on each side of the current step.
pub const MAX_SKEW: u32 = 100;

pub const ENV_PERIOD: &str = "HOOLOOP_OTP_PERIOD";
pub const ENV_DIGITS: &str = "HOOLOOP_OTP_DIGITS";
pub const ENV_ALGORITHM: &str = "HOOLOOP_OTP_ALGORITHM";
pub const ENV_SKEW: &str = "HOOLOOP_OTP_SKEW";
pub const ENV_ISSUER: &str = "HOOLOOP_OTP_ISSUER";
pub const ENV_SECRET_SIZE: &str = "HOOLOOP_OTP_SECRET_SIZE";

/// Parameters governing generation, provisioning and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    period: u32,
    digits: u8,
    algorithm: Algorithm,
    skew: u32,
    issuer: String,
    secret_size: usize,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            digits: DEFAULT_DIGITS,
            algorithm: Algorithm::Sha1,
            skew: DEFAULT_SKEW,
            issuer: DEFAULT_ISSUER.to_string(),
            secret_size: DEFAULT_SECRET_SIZE,
        }
    }
}

impl OtpConfig {
    // ── Accessors ────────────────────────────────────────────────

    /// Seconds per time step.
    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn digits(&self) -> u8 {
        self.digits
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Periods of tolerance on each side of the current counter.
    pub fn skew(&self) -> u32 {
        self.skew
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Bytes of random key material generated per enrollment.
    pub fn secret_size(&self) -> usize {
        self.secret_size
    }

    // ── Builders ─────────────────────────────────────────────────

    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_skew(mut self, skew: u32) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_secret_size(mut self, bytes: usize) -> Self {
        self.secret_size = bytes;
        self
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Defaults overlaid with any `HOOLOOP_OTP_*` environment variables.
    pub fn from_env() -> OtpResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> OtpResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_PERIOD) {
            cfg.period = parse_number(ENV_PERIOD, &v)?;
        }
        if let Some(v) = lookup(ENV_DIGITS) {
            cfg.digits = parse_number(ENV_DIGITS, &v)?;
        }
        if let Some(v) = lookup(ENV_ALGORITHM) {
            cfg.algorithm = Algorithm::from_str_loose(&v).ok_or_else(|| {
                OtpError::invalid_config(format!("{} has unknown algorithm '{}'", ENV_ALGORITHM, v))
            })?;
        }
        if let Some(v) = lookup(ENV_SKEW) {
            cfg.skew = parse_number(ENV_SKEW, &v)?;
        }
        if let Some(v) = lookup(ENV_ISSUER) {
            cfg.issuer = v.trim().to_string();
        }
        if let Some(v) = lookup(ENV_SECRET_SIZE) {
            cfg.secret_size = parse_number(ENV_SECRET_SIZE, &v)?;
        }
        cfg.validate()?;
        log::debug!(
            "OTP config: period={}s digits={} algorithm={} skew={}",
            cfg.period,
            cfg.digits,
            cfg.algorithm,
            cfg.skew
        );
        Ok(cfg)
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> OtpResult<Self> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| {
            OtpError::invalid_config(format!("Invalid OTP config JSON: {}", e))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every parameter is usable.
    pub fn validate(&self) -> OtpResult<()> {
        if self.period == 0 {
            return Err(OtpError::invalid_config("period must be at least 1 second"));
        }
        if self.digits == 0 || self.digits > MAX_DIGITS {
            return Err(OtpError::invalid_config(format!(
                "digits must be between 1 and {}, got {}",
                MAX_DIGITS, self.digits
            )));
        }
        if self.skew > MAX_SKEW {
            return Err(OtpError::invalid_config(format!(
                "skew must be at most {} periods, got {}",
                MAX_SKEW, self.skew
            )));
        }
        if self.secret_size == 0 {
            return Err(OtpError::invalid_config("secret size must be at least 1 byte"));
        }
        if self.issuer.trim().is_empty() {
            return Err(OtpError::invalid_config("issuer must not be empty"));
        }
        Ok(())
    }

    /// Number of counters in the validation window, `2 * skew + 1`.
    pub fn window_len(&self) -> u64 {
        2 * self.skew as u64 + 1
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> OtpResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| OtpError::invalid_config(format!("{} is not a valid number: '{}'", key, raw)))
}
