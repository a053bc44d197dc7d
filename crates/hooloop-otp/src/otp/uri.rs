//! `otpauth://` provisioning URIs per the Google Authenticator key-URI
//! format:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>
//!
//! Format: `otpauth://totp/ISSUER:ACCOUNT?secret=BASE32&issuer=ISSUER&algorithm=SHA1&digits=6&period=30`

use crate::otp::config::OtpConfig;
use crate::otp::secret::{normalise_base32, Secret};
use crate::otp::types::*;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the TOTP provisioning URI for an enrolled secret. Every
/// parameter is written out, defaults included.
pub fn build_provisioning_uri(
    account_name: &str,
    issuer: &str,
    secret: &Secret,
    config: &OtpConfig,
) -> String {
    let issuer = url_encode(issuer);
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm={}&digits={}&period={}",
        issuer,
        url_encode(account_name),
        secret.to_base32(),
        issuer,
        config.algorithm().uri_name(),
        config.digits(),
        config.period()
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fields recovered from an `otpauth://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub otp_type: OtpType,
    pub account_name: String,
    pub issuer: Option<String>,
    /// Normalised base-32 secret (upper-case, no padding).
    pub secret: String,
    pub algorithm: Algorithm,
    pub digits: u8,
    pub period: u32,
    /// HOTP only.
    pub counter: u64,
}

impl ParsedUri {
    pub fn decode_secret(&self) -> OtpResult<Secret> {
        Secret::from_base32(&self.secret)
    }
}

/// Parse an `otpauth://` URI.
pub fn parse_provisioning_uri(uri: &str) -> OtpResult<ParsedUri> {
    let url = url::Url::parse(uri)
        .map_err(|e| OtpError::invalid_uri(format!("Invalid URI: {}", e)))?;

    if url.scheme() != "otpauth" {
        return Err(OtpError::invalid_uri(format!(
            "Expected scheme 'otpauth', got '{}'",
            url.scheme()
        )));
    }

    let otp_type = match url.host_str() {
        Some("totp") => OtpType::Totp,
        Some("hotp") => OtpType::Hotp,
        other => {
            return Err(OtpError::invalid_uri(format!(
                "Unknown OTP type: {:?}",
                other
            )))
        }
    };

    let mut secret = None;
    let mut param_issuer = None;
    let mut algorithm = Algorithm::Sha1;
    let mut digits = 6u8;
    let mut period = 30u32;
    let mut counter = 0u64;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(normalise_base32(&value)),
            "issuer" => {
                param_issuer = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            "algorithm" => {
                algorithm = Algorithm::from_str_loose(&value).ok_or_else(|| {
                    OtpError::invalid_uri(format!("Unsupported algorithm '{}'", value))
                })?;
            }
            "digits" => {
                digits = value
                    .parse::<u8>()
                    .ok()
                    .filter(|d| (1..=crate::otp::config::MAX_DIGITS).contains(d))
                    .ok_or_else(|| OtpError::invalid_uri(format!("Invalid digits '{}'", value)))?;
            }
            "period" => {
                period = value
                    .parse::<u32>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| OtpError::invalid_uri(format!("Invalid period '{}'", value)))?;
            }
            "counter" => {
                counter = value
                    .parse::<u64>()
                    .map_err(|_| OtpError::invalid_uri(format!("Invalid counter '{}'", value)))?;
            }
            _ => {}
        }
    }

    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OtpError::invalid_uri("Missing 'secret' parameter"))?;

    let label = url.path();
    let label = label.strip_prefix('/').unwrap_or(label);
    let (path_issuer, account_name) = split_label(label, param_issuer.as_deref());

    Ok(ParsedUri {
        otp_type,
        account_name,
        // Query parameter wins over the path prefix.
        issuer: param_issuer.or(path_issuer),
        secret,
        algorithm,
        digits,
        period,
        counter,
    })
}

/// Split a still percent-encoded label into issuer and account.
///
/// A literal `:` separates them. Without one, an encoded `%3A` is the
/// separator; if the decoded label starts with `issuer_hint` and a colon,
/// that whole prefix is the issuer, so an issuer that itself contains a
/// colon is kept intact.
fn split_label(raw: &str, issuer_hint: Option<&str>) -> (Option<String>, String) {
    if let Some((iss, acct)) = raw.split_once(':') {
        return (Some(decode_trimmed(iss)), decode_trimmed(acct));
    }

    let decoded = url_decode(raw);
    let decoded = decoded.trim();
    if let Some(hint) = issuer_hint {
        if let Some(rest) = decoded.strip_prefix(hint).and_then(|r| r.strip_prefix(':')) {
            return (Some(hint.to_string()), rest.trim().to_string());
        }
    }

    // `to_ascii_uppercase` keeps byte offsets, so `pos` indexes `raw` too.
    match raw.to_ascii_uppercase().find("%3A") {
        Some(pos) => (
            Some(decode_trimmed(&raw[..pos])),
            decode_trimmed(&raw[pos + 3..]),
        ),
        None => (None, decoded.to_string()),
    }
}

fn decode_trimmed(s: &str) -> String {
    url_decode(s).trim().to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  URL encoding helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn url_encode(s: &str) -> String {
    let mut output = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                output.push(byte as char);
            }
            _ => output.push_str(&format!("%{:02X}", byte)),
        }
    }
    output
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc_secret() -> Secret {
        Secret::from_bytes(b"12345678901234567890".to_vec()).unwrap()
    }

    // ── Generate ─────────────────────────────────────────────────

    #[test]
    fn build_default_uri_exact() {
        let uri = build_provisioning_uri(
            "alice@example.com",
            "Hooloop.com",
            &rfc_secret(),
            &OtpConfig::default(),
        );
        assert_eq!(
            uri,
            "otpauth://totp/Hooloop.com:alice%40example.com?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=Hooloop.com&algorithm=SHA1&digits=6&period=30"
        );
    }

    #[test]
    fn build_uri_escapes_issuer_and_account() {
        let uri = build_provisioning_uri(
            "my user",
            "My Corp:EU",
            &rfc_secret(),
            &OtpConfig::default(),
        );
        assert!(uri.starts_with("otpauth://totp/My%20Corp%3AEU:my%20user?"));
        assert!(uri.contains("&issuer=My%20Corp%3AEU&"));
        let parsed = parse_provisioning_uri(&uri).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("My Corp:EU"));
        assert_eq!(parsed.account_name, "my user");
    }

    #[test]
    fn build_uri_reflects_config() {
        let cfg = OtpConfig::default()
            .with_algorithm(Algorithm::Sha256)
            .with_digits(8)
            .with_period(60);
        let uri = build_provisioning_uri("u", "X", &rfc_secret(), &cfg);
        assert!(uri.ends_with("&algorithm=SHA256&digits=8&period=60"));
    }

    // ── Parse ────────────────────────────────────────────────────

    #[test]
    fn parse_basic_totp() {
        let uri = "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example";
        let parsed = parse_provisioning_uri(uri).unwrap();
        assert_eq!(parsed.otp_type, OtpType::Totp);
        assert_eq!(parsed.account_name, "alice@example.com");
        assert_eq!(parsed.issuer.as_deref(), Some("Example"));
        assert_eq!(parsed.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(parsed.algorithm, Algorithm::Sha1);
        assert_eq!(parsed.digits, 6);
        assert_eq!(parsed.period, 30);
    }

    #[test]
    fn parse_hotp_with_counter() {
        let uri = "otpauth://hotp/TestLabel?secret=jbsw-y3dp-ehpk-3pxp&counter=42";
        let parsed = parse_provisioning_uri(uri).unwrap();
        assert_eq!(parsed.otp_type, OtpType::Hotp);
        assert_eq!(parsed.counter, 42);
        assert_eq!(parsed.account_name, "TestLabel");
        assert_eq!(parsed.secret, "JBSWY3DPEHPK3PXP");
        assert!(parsed.issuer.is_none());
    }

    #[test]
    fn parse_encoded_path() {
        let uri = "otpauth://totp/My%20Corp:my%20user?secret=JBSWY3DPEHPK3PXP";
        let parsed = parse_provisioning_uri(uri).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("My Corp"));
        assert_eq!(parsed.account_name, "my user");
    }

    #[test]
    fn parse_encoded_colon_separator() {
        let uri = "otpauth://totp/Example%3Aalice@google.com?secret=JBSWY3DPEHPK3PXP";
        let parsed = parse_provisioning_uri(uri).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("Example"));
        assert_eq!(parsed.account_name, "alice@google.com");

        let lower = parse_provisioning_uri("otpauth://totp/Example%3aalice?secret=JBSWY3DPEHPK3PXP")
            .unwrap();
        assert_eq!(lower.issuer.as_deref(), Some("Example"));
        assert_eq!(lower.account_name, "alice");
    }

    #[test]
    fn parse_encoded_colon_prefers_issuer_param() {
        let uri = "otpauth://totp/My%20Corp%3AEU%3Abob?secret=JBSWY3DPEHPK3PXP&issuer=My%20Corp%3AEU";
        let parsed = parse_provisioning_uri(uri).unwrap();
        assert_eq!(parsed.issuer.as_deref(), Some("My Corp:EU"));
        assert_eq!(parsed.account_name, "bob");

        // Without the parameter the first encoded colon separates.
        let bare = parse_provisioning_uri("otpauth://totp/My%20Corp%3AEU%3Abob?secret=JBSWY3DPEHPK3PXP")
            .unwrap();
        assert_eq!(bare.issuer.as_deref(), Some("My Corp"));
        assert_eq!(bare.account_name, "EU:bob");
    }

    #[test]
    fn parse_trims_issuer_param() {
        let padded = parse_provisioning_uri(
            "otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP&issuer=%20Example%20",
        )
        .unwrap();
        let plain = parse_provisioning_uri(
            "otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP&issuer=Example",
        )
        .unwrap();
        assert_eq!(padded, plain);

        let blank = parse_provisioning_uri(
            "otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP&issuer=%20",
        )
        .unwrap();
        assert_eq!(blank.issuer.as_deref(), Some("Example"));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse_provisioning_uri("https://example.com").is_err());
        assert!(parse_provisioning_uri("otpauth://totp/Test?issuer=X").is_err());
        assert!(parse_provisioning_uri("otpauth://unknown/Test?secret=ABC").is_err());
        assert!(parse_provisioning_uri("not a url at all").is_err());
        assert!(parse_provisioning_uri("otpauth://totp/T?secret=ABC&digits=12").is_err());
        assert!(parse_provisioning_uri("otpauth://totp/T?secret=ABC&period=0").is_err());
        assert!(parse_provisioning_uri("otpauth://totp/T?secret=ABC&algorithm=MD5").is_err());
    }

    #[test]
    fn build_parse_roundtrip() {
        let secret = rfc_secret();
        let cfg = OtpConfig::default().with_algorithm(Algorithm::Sha512).with_digits(8);
        let uri = build_provisioning_uri("user@mail.com", "Hooloop Games", &secret, &cfg);
        let parsed = parse_provisioning_uri(&uri).unwrap();
        assert_eq!(parsed.account_name, "user@mail.com");
        assert_eq!(parsed.issuer.as_deref(), Some("Hooloop Games"));
        assert_eq!(parsed.algorithm, Algorithm::Sha512);
        assert_eq!(parsed.digits, 8);
        assert_eq!(parsed.period, 30);
        assert_eq!(parsed.decode_secret().unwrap(), secret);
    }

    // ── URL encoding helpers ─────────────────────────────────────

    #[test]
    fn url_encode_basic() {
        assert_eq!(url_encode("hello"), "hello");
        assert_eq!(url_encode("Hooloop.com"), "Hooloop.com");
        assert_eq!(url_encode("hello world"), "hello%20world");
        assert_eq!(url_encode("a@b"), "a%40b");
        assert_eq!(url_encode("é"), "%C3%A9");
    }

    #[test]
    fn url_decode_basic() {
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("a%40b"), "a@b");
        assert_eq!(url_decode("no+plus"), "no plus");
        assert_eq!(url_decode("%C3%A9"), "é");
        assert_eq!(url_decode("100%"), "100%");
    }
}
