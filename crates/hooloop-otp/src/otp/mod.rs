//! OTP engine: sub-modules.

pub mod types;
pub mod config;
pub mod clock;
pub mod core;
pub mod secret;
pub mod uri;
pub mod window;
pub mod storage;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use config::OtpConfig;
pub use clock::{Clock, FixedClock, SystemClock};
pub use secret::{provision, Provisioned, Secret};
pub use service::{OtpService, OtpServiceState};
pub use storage::{SecretStore, SecretVault};
