//! Password-reset token generation.

use rand::RngCore;
use rand::rngs::OsRng;

/// Generate an unguessable, URL-safe reset token (32 random bytes, hex).
pub fn generate_reset_token() -> String {
    use core::fmt::Write;

    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
