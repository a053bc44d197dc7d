//! Skew-window validation.
//!
//! A candidate is accepted if it matches the code of any counter in
//! `[counter - skew, counter + skew]`. Validation and enumeration walk the
//! same [`window_counters`] sequence (0, +1, −1, +2, −2, …) so they never
//! disagree about which codes are acceptable.

use subtle::ConstantTimeEq;

use crate::otp::clock::Clock;
use crate::otp::config::OtpConfig;
use crate::otp::core;
use crate::otp::secret::Secret;
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Window
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Offsets in probe order: `0, +1, -1, +2, -2, …, +skew, -skew`.
pub fn window_offsets(skew: u32) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=skew as i64).flat_map(|k| [k, -k]))
}

/// Counters in probe order. Offsets that would leave the `u64` range are
/// dropped rather than wrapped.
pub fn window_counters(counter: u64, skew: u32) -> impl Iterator<Item = u64> {
    window_offsets(skew).filter_map(move |offset| {
        if offset >= 0 {
            counter.checked_add(offset as u64)
        } else {
            counter.checked_sub(offset.unsigned_abs())
        }
    })
}

/// Every code acceptable at `now`, in probe order.
pub fn enumerate_window(secret: &Secret, now: u64, config: &OtpConfig) -> OtpResult<Vec<Code>> {
    let counter = core::step_for(now, config)?;
    let codes = window_counters(counter, config.skew())
        .map(|c| core::hotp(secret, c, config.digits(), config.algorithm()))
        .collect::<OtpResult<Vec<_>>>()?;
    log::debug!(
        "Enumerated {} codes around counter {} for secret {}",
        codes.len(),
        counter,
        secret.fingerprint()
    );
    Ok(codes)
}

/// [`enumerate_window`] at the clock's current time.
pub fn enumerate_window_now(
    secret: &Secret,
    clock: &dyn Clock,
    config: &OtpConfig,
) -> OtpResult<Vec<Code>> {
    enumerate_window(secret, clock.now_unix(), config)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A candidate must be exactly `digits` ASCII digits.
pub fn check_candidate(candidate: &str, digits: u8) -> OtpResult<()> {
    if candidate.len() != digits as usize || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OtpError::invalid_candidate(format!(
            "Expected {} decimal digits",
            digits
        )));
    }
    Ok(())
}

/// Whether `candidate` is acceptable at `now`.
///
/// A wrong code and a malformed candidate both yield `Ok(false)`; errors
/// are reserved for an unusable secret or configuration.
pub fn validate(secret: &Secret, candidate: &str, now: u64, config: &OtpConfig) -> OtpResult<bool> {
    verify(secret, candidate, now, config).map(|r| r.valid)
}

/// [`validate`] with `now` read once from `clock`.
pub fn validate_now(
    secret: &Secret,
    candidate: &str,
    clock: &dyn Clock,
    config: &OtpConfig,
) -> OtpResult<bool> {
    validate(secret, candidate, clock.now_unix(), config)
}

/// Like [`validate`], but reports which counter matched and the drift.
pub fn verify(
    secret: &Secret,
    candidate: &str,
    now: u64,
    config: &OtpConfig,
) -> OtpResult<VerifyResult> {
    let base = core::step_for(now, config)?;
    let counters = window_counters(base, config.skew());
    match_candidate(secret, candidate, base, counters, config)
}

/// Counter-based verification: only counters at or after `counter` (up to
/// `look_ahead` steps) are tried, since an event counter never moves back.
/// On success the caller should persist `matched_counter + 1`.
///
/// `u64::MAX` marks an exhausted counter and never matches, so
/// `matched_counter + 1` always fits.
pub fn verify_hotp(
    secret: &Secret,
    candidate: &str,
    counter: u64,
    look_ahead: u32,
    config: &OtpConfig,
) -> OtpResult<VerifyResult> {
    let counters = (0..=look_ahead as u64)
        .filter_map(move |k| counter.checked_add(k))
        .filter(|c| *c < u64::MAX);
    match_candidate(secret, candidate, counter, counters, config)
}

fn match_candidate(
    secret: &Secret,
    candidate: &str,
    base: u64,
    counters: impl Iterator<Item = u64>,
    config: &OtpConfig,
) -> OtpResult<VerifyResult> {
    let (digits, algo) = (config.digits(), config.algorithm());

    if let Err(e) = check_candidate(candidate, digits) {
        // Spend the same HMAC work as a wrong code before rejecting.
        for c in counters {
            core::hotp(secret, c, digits, algo)?;
        }
        log::debug!("Rejected candidate for secret {}: {}", secret.fingerprint(), e);
        return Ok(VerifyResult::rejected());
    }

    for c in counters {
        let code = core::hotp(secret, c, digits, algo)?;
        if constant_time_eq(code.as_bytes(), candidate.as_bytes()) {
            let result = VerifyResult::matched(c, base);
            log::debug!(
                "Candidate matched counter {} (drift {}) for secret {}",
                c,
                result.drift,
                secret.fingerprint()
            );
            return Ok(result);
        }
    }
    Ok(VerifyResult::rejected())
}

/// Constant-time comparison (to prevent timing attacks on code verification).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
