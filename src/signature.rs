use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Computes the lower-case hex HMAC-SHA256 signature of a request body.
///
/// This is the reference signature the provider is expected to send in the
/// `X-Signature` header, keyed by the shared webhook secret.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook payload signature.
///
/// Returns `false` for mismatched or malformed signatures; never errors, so
/// the ingestion path can treat it as a pure predicate. Uses constant-time
/// comparison to prevent timing attacks.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let expected = compute_signature(secret, body);
    expected.as_bytes().ct_eq(signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_verifies() {
        let secret = "testsecret";
        let body = br#"{"message_id":"m1"}"#;

        let sig = compute_signature(secret, body);
        assert_eq!(sig.len(), 64); // 32 bytes = 64 hex chars
        assert!(verify_signature(secret, body, &sig));
    }

    #[test]
    fn test_single_byte_mutation_fails() {
        let secret = "testsecret";
        let body = b"payload bytes".to_vec();
        let sig = compute_signature(secret, &body);

        let mut mutated = body.clone();
        mutated[0] ^= 0x01;
        assert!(!verify_signature(secret, &mutated, &sig));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let body = b"payload bytes";
        let sig = compute_signature("secret-a", body);
        assert!(!verify_signature("secret-b", body, &sig));
    }

    #[test]
    fn test_malformed_signature_is_false_not_error() {
        assert!(!verify_signature("testsecret", b"body", ""));
        assert!(!verify_signature("testsecret", b"body", "123"));
        assert!(!verify_signature("testsecret", b"body", "not-hex-at-all"));
    }
}
