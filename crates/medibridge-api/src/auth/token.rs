//! Opaque session tokens
//!
//! A token is 32 bytes from the OS CSPRNG, base64url-encoded without padding.
//! Only its SHA-256 digest is ever persisted, so a leaked session table does
//! not yield usable cookies.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
#[error("Secure random source unavailable: {0}")]
pub struct EntropyError(String);

/// Draw a fresh session token
///
/// Collisions are not checked; the 2^256 keyspace makes them negligible.
pub fn generate_session_token() -> Result<String, EntropyError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EntropyError(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Storage key for a token (lowercase hex SHA-256)
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_encodes_32_bytes() {
        let token = generate_session_token().unwrap();
        assert_eq!(token.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..100)
            .map(|_| generate_session_token().unwrap())
            .collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest, token_digest("abc"));
        assert_ne!(digest, token_digest("abd"));
    }
}
