//! TOTP engine for multi-factor authentication
//!
//! Secrets are 160-bit, base32-encoded, and never persisted until the owner
//! has proven possession by submitting a valid code (see the enable flow in
//! `routes::auth`). Verification tolerates ±2 time steps of clock drift.

use std::io::Cursor;

use qrcode::QrCode;
use totp_rs::{Algorithm, Secret, TOTP};

/// RFC 6238 parameters: 6 digits over 30-second steps.
pub const TOTP_DIGITS: usize = 6;
pub const TOTP_STEP: u64 = 30;

/// Accepted drift in time steps on either side of "now" (±60 seconds).
pub const TOTP_SKEW: u8 = 2;

/// Issuer shown in authenticator apps.
pub const TOTP_ISSUER: &str = "Forgeboard";

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("invalid TOTP secret")]
    InvalidSecret,
    #[error("failed to render provisioning image: {0}")]
    Qr(String),
    #[error("system clock is before the Unix epoch")]
    Clock,
}

/// Generate a fresh base32-encoded shared secret (160 bits of entropy).
pub fn generate_secret() -> String {
    match Secret::generate_secret().to_encoded() {
        Secret::Encoded(encoded) => encoded,
        // to_encoded always yields the Encoded variant
        Secret::Raw(_) => unreachable!(),
    }
}

fn build_totp(secret_base32: &str, account: &str) -> Result<TOTP, TotpError> {
    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|_| TotpError::InvalidSecret)?;

    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret,
        Some(TOTP_ISSUER.to_string()),
        account.to_string(),
    )
    .map_err(|_| TotpError::InvalidSecret)
}

/// Build the otpauth:// provisioning URI for authenticator-app enrollment.
pub fn provisioning_uri(secret_base32: &str, account: &str) -> Result<String, TotpError> {
    Ok(build_totp(secret_base32, account)?.get_url())
}

/// Render a provisioning URI as a scannable PNG matrix barcode.
pub fn render_qr_png(uri: &str) -> Result<Vec<u8>, TotpError> {
    let code = QrCode::new(uri.as_bytes()).map_err(|e| TotpError::Qr(e.to_string()))?;
    let img = code
        .render::<image::Luma<u8>>()
        .min_dimensions(200, 200)
        .build();

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| TotpError::Qr(e.to_string()))?;

    Ok(png)
}

/// Verify a submitted code against the current time window.
pub fn verify_code(secret_base32: &str, code: &str, account: &str) -> Result<bool, TotpError> {
    if !is_well_formed(code) {
        return Ok(false);
    }

    build_totp(secret_base32, account)?
        .check_current(code)
        .map_err(|_| TotpError::Clock)
}

/// Verify against an explicit Unix timestamp. Used by the login path's
/// tests to pin the window boundaries without racing the wall clock.
pub(crate) fn verify_code_at(
    secret_base32: &str,
    code: &str,
    account: &str,
    timestamp: u64,
) -> Result<bool, TotpError> {
    if !is_well_formed(code) {
        return Ok(false);
    }

    Ok(build_totp(secret_base32, account)?.check(code, timestamp))
}

/// Codes are exactly six ASCII digits; anything else is rejected before the
/// algorithm runs.
fn is_well_formed(code: &str) -> bool {
    code.len() == TOTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Step-aligned so the generated code's window is unambiguous.
    const T: u64 = 1_700_000_010 - (1_700_000_010 % TOTP_STEP);
    const ACCOUNT: &str = "dev1";

    fn code_at(secret: &str, timestamp: u64) -> String {
        build_totp(secret, ACCOUNT).unwrap().generate(timestamp)
    }

    #[test]
    fn generated_secret_is_base32_and_long_enough() {
        let secret = generate_secret();
        // 160 bits -> 32 base32 characters.
        assert_eq!(secret.len(), 32);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn secrets_are_unique_per_call() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn provisioning_uri_embeds_issuer_and_account() {
        let secret = generate_secret();
        let uri = provisioning_uri(&secret, "dev1").unwrap();

        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("Forgeboard"));
        assert!(uri.contains("dev1"));
        assert!(uri.contains(&secret));
    }

    #[test]
    fn qr_render_produces_png() {
        let secret = generate_secret();
        let uri = provisioning_uri(&secret, "dev1").unwrap();
        let png = render_qr_png(&uri).unwrap();

        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn current_code_verifies() {
        let secret = generate_secret();
        let code = code_at(&secret, T);
        assert!(verify_code_at(&secret, &code, ACCOUNT, T).unwrap());
    }

    #[test]
    fn window_tolerates_sixty_seconds_of_drift() {
        let secret = generate_secret();
        let code = code_at(&secret, T);

        assert!(verify_code_at(&secret, &code, ACCOUNT, T + 60).unwrap());
        assert!(verify_code_at(&secret, &code, ACCOUNT, T - 60).unwrap());
    }

    #[test]
    fn window_rejects_beyond_two_steps() {
        let secret = generate_secret();
        let code = code_at(&secret, T);

        assert!(!verify_code_at(&secret, &code, ACCOUNT, T + 90).unwrap());
        assert!(!verify_code_at(&secret, &code, ACCOUNT, T - 90).unwrap());
    }

    #[test]
    fn malformed_codes_short_circuit_to_false() {
        let secret = generate_secret();

        for code in ["12345", "1234567", "12345a", "abcdef", "", "12 456"] {
            assert!(
                !verify_code_at(&secret, code, ACCOUNT, T).unwrap(),
                "{code:?} should be rejected without running the algorithm"
            );
        }
    }

    #[test]
    fn invalid_secret_is_an_error_not_a_mismatch() {
        let result = verify_code_at("not base32!!", "123456", ACCOUNT, T);
        assert!(matches!(result, Err(TotpError::InvalidSecret)));
    }
}
