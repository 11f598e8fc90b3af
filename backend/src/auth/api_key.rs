use axum::http::HeaderMap;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Header carrying the facade service key.
pub const API_KEY_HEADER: &str = "x-api-key";

const KEY_PREFIX: &str = "tp_";

/// Checks `X-Api-Key` against a stored SHA-256 digest.
///
/// Only the digest is kept in configuration and memory.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyVerifier {
    digest: Option<Vec<u8>>,
}

impl ApiKeyVerifier {
    /// Build from the hex digest in config. An unset or malformed digest
    /// disables key access.
    pub fn new(digest_hex: Option<&str>) -> Self {
        let digest = digest_hex.and_then(|hex_str| match hex::decode(hex_str.trim()) {
            Ok(bytes) if bytes.len() == 32 => Some(bytes),
            _ => {
                tracing::warn!("Ignoring malformed facade.api_key_sha256");
                None
            }
        });
        Self { digest }
    }

    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether the request presents the service key.
    pub fn verify(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.digest else {
            return false;
        };
        let Some(presented) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) else {
            return false;
        };

        let actual = Sha256::digest(presented.trim().as_bytes());
        // Compare every byte regardless of where the first mismatch is.
        actual
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Create a random service key. Returns `(key, sha256_hex)`.
pub fn generate_api_key() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let key = format!("{}{}", KEY_PREFIX, hex::encode(bytes));
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    (key, digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key.parse().unwrap());
        headers
    }

    #[test]
    fn test_generated_key_verifies() {
        let (key, digest) = generate_api_key();
        assert!(key.starts_with("tp_"));
        assert_eq!(digest.len(), 64);

        let verifier = ApiKeyVerifier::new(Some(&digest));
        assert!(verifier.is_enabled());
        assert!(verifier.verify(&headers_with_key(&key)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (_, digest) = generate_api_key();
        let verifier = ApiKeyVerifier::new(Some(&digest));
        assert!(!verifier.verify(&headers_with_key("tp_nope")));
        assert!(!verifier.verify(&HeaderMap::new()));
    }

    #[test]
    fn test_disabled_verifier_rejects_everything() {
        let (key, _) = generate_api_key();
        let verifier = ApiKeyVerifier::new(None);
        assert!(!verifier.is_enabled());
        assert!(!verifier.verify(&headers_with_key(&key)));
    }

    #[test]
    fn test_malformed_digest_disables() {
        assert!(!ApiKeyVerifier::new(Some("not-hex")).is_enabled());
        assert!(!ApiKeyVerifier::new(Some("abcd")).is_enabled());
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_api_key().0, generate_api_key().0);
    }
}
