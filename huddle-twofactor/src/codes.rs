//! Secret and backup-code generation.

use base32::Alphabet;
use rand::Rng;

/// Length of a backup code.
pub const BACKUP_CODE_LEN: usize = 8;

/// Bytes of entropy in a fresh TOTP secret (160 bits, SHA-1 block-friendly).
const SECRET_BYTES: usize = 20;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a fresh random base32 secret. Pure; nothing is persisted until
/// enrollment completes.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    base32::encode(Alphabet::Rfc4648 { padding: false }, &bytes)
}

/// Generates `n` independent random backup codes (8 uppercase alphanumeric
/// characters each). Pure.
#[must_use]
pub fn generate_backup_codes(n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            (0..BACKUP_CODE_LEN)
                .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
                .collect()
        })
        .collect()
}

/// Builds the `otpauth://` URI the UI renders as a QR code.
#[must_use]
pub fn provisioning_uri(secret: &str, account: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}\
         &algorithm=SHA1&digits=6&period=30"
    )
}
