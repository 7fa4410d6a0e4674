/// Session token generation
///
/// Tokens are derived from the account identity plus 32 bytes of OS
/// randomness and the issue instant, digested with SHA-256 and hex-encoded.
/// The digest keeps tokens fixed-width and opaque; the randomness makes them
/// unguessable and never reused, even for back-to-back logins by the same
/// account.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of an issued token in characters (hex-encoded SHA-256)
pub const TOKEN_LENGTH: usize = 64;

/// Generates an opaque session token for an account.
pub fn generate_token(account_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(issued_at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    hasher.update(entropy);
    hex::encode(hasher.finalize())
}

/// Validates the shape of a presented token before any lookup.
///
/// Cheap rejection of obviously malformed input; real validation is the
/// session lookup itself.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token(Uuid::new_v4(), Utc::now());
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(is_well_formed(&token));
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let account = Uuid::new_v4();
        let at = Utc::now();
        // Same account, same instant: the entropy alone must differ them.
        assert_ne!(generate_token(account, at), generate_token(account, at));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc123"));
        assert!(!is_well_formed(&"g".repeat(TOKEN_LENGTH)));
        assert!(!is_well_formed(&"a".repeat(TOKEN_LENGTH + 1)));
    }
}
