//! # Hooloop – One-Time Passcode Engine
//!
//! Time-based and counter-based one-time passcodes for account enrollment
//! and login checks:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP generation with SHA-1, SHA-256, SHA-512
//! - **Skew window** – symmetric `[-skew, +skew]` validation and enumeration
//! - **Provisioning** – CSPRNG secrets and `otpauth://` URIs for authenticator apps
//! - **Secret store** – pluggable per-account store with a JSON-backed vault
//! - **Service** – account-level facade shared as `Arc<Mutex<_>>`

pub mod otp;
