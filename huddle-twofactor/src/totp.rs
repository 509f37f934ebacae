//! RFC 6238 time-based one-time passwords (HMAC-SHA1, 30 s step, 6 digits).

use base32::Alphabet;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Time-step size in seconds.
pub const TOTP_STEP_SECS: i64 = 30;

/// Number of code digits.
pub const TOTP_DIGITS: u32 = 6;

/// Verifies a submitted token against a base32 secret at the current time.
///
/// The token must be exactly 6 ASCII digits; anything else is rejected
/// before any HMAC work. The current time step and its two neighbors are
/// accepted — ±1 step is the only clock-skew accommodation.
#[must_use]
pub fn verify_token(secret_b32: &str, token: &str) -> bool {
    verify_token_at(secret_b32, token, chrono::Utc::now().timestamp())
}

/// Verifies a token at an explicit unix time. Used by tests exercising the
/// tolerance window.
#[must_use]
pub fn verify_token_at(secret_b32: &str, token: &str, unix_time: i64) -> bool {
    if token.len() != TOTP_DIGITS as usize || !token.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(secret) = decode_secret(secret_b32) else {
        return false;
    };

    let step = unix_time / TOTP_STEP_SECS;
    for candidate_step in [step - 1, step, step + 1] {
        if candidate_step < 0 {
            continue;
        }
        if hotp(&secret, candidate_step as u64) == token {
            return true;
        }
    }
    false
}

/// Computes the code for a base32 secret at a unix time. Returns `None` for
/// an undecodable secret.
#[must_use]
pub fn token_at(secret_b32: &str, unix_time: i64) -> Option<String> {
    let secret = decode_secret(secret_b32)?;
    let step = unix_time / TOTP_STEP_SECS;
    if step < 0 {
        return None;
    }
    Some(hotp(&secret, step as u64))
}

fn decode_secret(secret_b32: &str) -> Option<Vec<u8>> {
    base32::decode(
        Alphabet::Rfc4648 { padding: false },
        &secret_b32.to_ascii_uppercase(),
    )
}

/// RFC 4226 HOTP with dynamic truncation, zero-padded to 6 digits.
fn hotp(secret: &[u8], counter: u64) -> String {
    // HMAC accepts any key length; new_from_slice cannot fail for Hmac.
    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let bin = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    format!("{:06}", bin % 10u32.pow(TOTP_DIGITS))
}
