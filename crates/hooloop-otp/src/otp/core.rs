//! Core OTP generation: RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! HMAC over the big-endian counter with SHA-1, SHA-256 or SHA-512,
//! followed by RFC 4226 §5.3 dynamic truncation.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::otp::clock;
use crate::otp::config::{OtpConfig, MAX_DIGITS};
use crate::otp::secret::Secret;
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Raw HMAC-OTP (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the HOTP code for `counter`.
pub fn hotp(secret: &Secret, counter: u64, digits: u8, algo: Algorithm) -> OtpResult<Code> {
    hotp_raw(secret.as_bytes(), counter, digits, algo)
}

/// Compute the HOTP code from raw key bytes.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algo: Algorithm) -> OtpResult<Code> {
    if key.is_empty() {
        return Err(OtpError::invalid_secret("Secret must not be empty"));
    }
    if digits == 0 || digits > MAX_DIGITS {
        return Err(OtpError::invalid_config(format!(
            "digits must be between 1 and {}, got {}",
            MAX_DIGITS, digits
        )));
    }
    let digest = compute_hmac(key, &counter.to_be_bytes(), algo)?;
    Ok(Code::from_value(truncate(&digest) % 10u32.pow(digits as u32), digits))
}

/// Compute HMAC(key, message) using the specified algorithm.
fn compute_hmac(key: &[u8], data: &[u8], algo: Algorithm) -> OtpResult<Vec<u8>> {
    let digest = match algo {
        Algorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| hmac_rejected(&e))?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|e| hmac_rejected(&e))?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).map_err(|e| hmac_rejected(&e))?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(digest)
}

fn hmac_rejected(e: &dyn std::fmt::Display) -> OtpError {
    OtpError::invalid_secret("HMAC rejected the secret").with_detail(e.to_string())
}

/// Dynamic truncation: the 31-bit value at the offset named by the low
/// nibble of the last byte. Digests are at least 20 bytes, so
/// `offset + 3 <= 18` is always in range.
fn truncate(digest: &[u8]) -> u32 {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP (time-based, RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Time step for `unix_seconds`, refusing a zero period.
pub(crate) fn step_for(unix_seconds: u64, config: &OtpConfig) -> OtpResult<u64> {
    if config.period() == 0 {
        return Err(OtpError::invalid_config("period must be at least 1 second"));
    }
    Ok(clock::time_step_at(unix_seconds, config.period()))
}

/// TOTP code at an explicit unix timestamp.
pub fn totp_at(secret: &Secret, unix_seconds: u64, config: &OtpConfig) -> OtpResult<Code> {
    let step = step_for(unix_seconds, config)?;
    hotp(secret, step, config.digits(), config.algorithm())
}

/// TOTP code plus rollover timing at an explicit unix timestamp.
pub fn generate_code_at(
    secret: &Secret,
    unix_seconds: u64,
    config: &OtpConfig,
) -> OtpResult<GeneratedCode> {
    let period = config.period();
    let counter = step_for(unix_seconds, config)?;
    let code = hotp(secret, counter, config.digits(), config.algorithm())?;
    Ok(GeneratedCode {
        code,
        remaining_seconds: clock::seconds_remaining_at(unix_seconds, period),
        period,
        progress: clock::progress_fraction_at(unix_seconds, period),
        counter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── RFC 4226 test vectors (Appendix D) ───────────────────────

    const RFC_SECRET: &[u8] = b"12345678901234567890";

    fn rfc_secret() -> Secret {
        Secret::from_bytes(RFC_SECRET.to_vec()).unwrap()
    }

    #[test]
    fn rfc4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314",
            "254676", "287922", "162583", "399871", "520489",
        ];
        let secret = rfc_secret();
        for (counter, exp) in expected.iter().enumerate() {
            let code = hotp(&secret, counter as u64, 6, Algorithm::Sha1).unwrap();
            assert_eq!(code, *exp, "HOTP mismatch at counter {}", counter);
        }
    }

    #[test]
    fn rfc4226_truncation_intermediate() {
        // Appendix D, count 0: HMAC = cc93cf18508d94934c64b65d8ba7667fb7cde4b0
        let digest = hex::decode("cc93cf18508d94934c64b65d8ba7667fb7cde4b0").unwrap();
        assert_eq!(truncate(&digest), 0x4c93cf18);
    }

    // ── RFC 6238 test vectors (Appendix B) ───────────────────────

    fn rfc6238(secret: &[u8], unix: u64, algo: Algorithm) -> String {
        let secret = Secret::from_bytes(secret.to_vec()).unwrap();
        let cfg = OtpConfig::default().with_digits(8).with_algorithm(algo);
        totp_at(&secret, unix, &cfg).unwrap().into_string()
    }

    #[test]
    fn rfc6238_totp_sha1() {
        assert_eq!(rfc6238(RFC_SECRET, 59, Algorithm::Sha1), "94287082");
        assert_eq!(rfc6238(RFC_SECRET, 1_111_111_109, Algorithm::Sha1), "07081804");
        assert_eq!(rfc6238(RFC_SECRET, 20_000_000_000, Algorithm::Sha1), "65353130");
    }

    #[test]
    fn rfc6238_totp_sha256() {
        let key = b"12345678901234567890123456789012";
        assert_eq!(rfc6238(key, 59, Algorithm::Sha256), "46119246");
        assert_eq!(rfc6238(key, 1_234_567_890, Algorithm::Sha256), "91819424");
    }

    #[test]
    fn rfc6238_totp_sha512() {
        let key = b"1234567890123456789012345678901234567890123456789012345678901234";
        assert_eq!(rfc6238(key, 59, Algorithm::Sha512), "90693936");
        assert_eq!(rfc6238(key, 2_000_000_000, Algorithm::Sha512), "38618901");
    }

    // ── Format and determinism ───────────────────────────────────

    #[test]
    fn codes_have_exact_width() {
        let secret = rfc_secret();
        for digits in 1..=MAX_DIGITS {
            for counter in 0..50u64 {
                let code = hotp(&secret, counter, digits, Algorithm::Sha1).unwrap();
                assert_eq!(code.len(), digits as usize);
                assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn leading_zero_preserved() {
        // RFC 6238 SHA-1 at T=1111111109 truncates to 07081804.
        let secret = rfc_secret();
        let code = hotp(&secret, 37_037_036, 8, Algorithm::Sha1).unwrap();
        assert_eq!(code, "07081804");
        let short = hotp(&secret, 37_037_036, 6, Algorithm::Sha1).unwrap();
        assert_eq!(short, "081804");
    }

    #[test]
    fn hotp_is_deterministic() {
        let secret = Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap();
        let a = hotp(&secret, 123_456, 6, Algorithm::Sha256).unwrap();
        let b = hotp(&secret, 123_456, 6, Algorithm::Sha256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hotp_max_counter() {
        let secret = rfc_secret();
        assert_eq!(hotp(&secret, u64::MAX, 6, Algorithm::Sha1).unwrap().len(), 6);
    }

    // ── Failure modes ────────────────────────────────────────────

    #[test]
    fn empty_key_is_invalid_secret() {
        let err = hotp_raw(&[], 0, 6, Algorithm::Sha1).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidSecret);
    }

    #[test]
    fn out_of_range_digits_rejected() {
        assert!(hotp_raw(RFC_SECRET, 0, 0, Algorithm::Sha1).is_err());
        assert!(hotp_raw(RFC_SECRET, 0, 10, Algorithm::Sha1).is_err());
    }

    #[test]
    fn zero_period_rejected() {
        let cfg = OtpConfig::default().with_period(0);
        let err = totp_at(&rfc_secret(), 59, &cfg).unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::InvalidConfig);
    }

    // ── TOTP helpers ─────────────────────────────────────────────

    #[test]
    fn same_step_same_code() {
        let secret = rfc_secret();
        let cfg = OtpConfig::default();
        let first = totp_at(&secret, 30, &cfg).unwrap();
        for t in 31..60 {
            assert_eq!(totp_at(&secret, t, &cfg).unwrap(), first);
        }
        assert_ne!(totp_at(&secret, 60, &cfg).unwrap(), first);
    }

    #[test]
    fn generated_code_timing() {
        let secret = rfc_secret();
        let generated = generate_code_at(&secret, 59, &OtpConfig::default()).unwrap();
        assert_eq!(generated.code, "287082");
        assert_eq!(generated.counter, 1);
        assert_eq!(generated.remaining_seconds, 1);
        assert_eq!(generated.period, 30);
    }
}
