//! Session key fingerprinting for operational visibility.
//!
//! A truncated SHA-256 digest of the signing half of the key lets operators
//! confirm which key a running instance uses without exposing the key
//! material. The fingerprint is logged once at startup.

use actix_web::cookie::Key;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

/// First 8 bytes of the SHA-256 of the key's signing material, as 16
/// lowercase hex characters.
///
/// # Examples
///
/// ```rust
/// use actix_web::cookie::Key;
/// use backend::inbound::http::session_config::fingerprint::key_fingerprint;
///
/// let fp = key_fingerprint(&Key::generate());
/// assert_eq!(fp.len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn same_key_same_fingerprint() {
        let key = Key::derive_from(&[b'a'; 64]);
        assert_eq!(key_fingerprint(&key), key_fingerprint(&key));
    }

    #[rstest]
    fn fingerprint_is_short_lowercase_hex() {
        let fp = key_fingerprint(&Key::generate());
        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[rstest]
    fn different_keys_differ() {
        let a = Key::derive_from(&[b'a'; 64]);
        let b = Key::derive_from(&[b'b'; 64]);
        assert_ne!(key_fingerprint(&a), key_fingerprint(&b));
    }
}
