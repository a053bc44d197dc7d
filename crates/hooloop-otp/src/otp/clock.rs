//! Time source and time-step arithmetic (RFC 6238 §4).

use chrono::Utc;

/// Source of "now" in whole seconds since the Unix epoch (UTC).
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

/// Wall clock. Instants before the epoch read as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_unix(&self) -> u64 {
        (**self).now_unix()
    }
}

/// Time-step counter for a unix timestamp: `floor(unix_seconds / period)`.
///
/// `period` must be non-zero; a zero period yields step 0 rather than a panic.
/// Validated configs never carry one.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds.checked_div(period as u64).unwrap_or(0)
}

/// Seconds remaining before the step containing `unix_seconds` expires.
/// Zero for a zero period.
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = period as u64;
    unix_seconds
        .checked_rem(p)
        .map(|elapsed| (p - elapsed) as u32)
        .unwrap_or(0)
}

/// Progress fraction (0.0 = fresh code, 1.0 = about to expire).
/// Zero for a zero period.
pub fn progress_fraction_at(unix_seconds: u64, period: u32) -> f64 {
    match unix_seconds.checked_rem(period as u64) {
        Some(elapsed) => elapsed as f64 / period as f64,
        None => 0.0,
    }
}
