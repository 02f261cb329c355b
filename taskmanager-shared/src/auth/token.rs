/// Single-use opaque tokens for email verification and password reset
///
/// The unhashed value goes out to the user inside a link. Only its SHA-256
/// digest and an expiry are stored. Consuming a token clears both columns,
/// so a second use of the same value finds nothing.
///
/// # Example
///
/// ```
/// use taskmanager_shared::auth::token::{generate_temporary_token, hash_token};
///
/// let token = generate_temporary_token();
/// assert_eq!(token.unhashed.len(), 40);
/// assert_eq!(hash_token(&token.unhashed), token.hashed);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a token (hex-encoded to twice as many chars)
const TOKEN_BYTES: usize = 20;

/// How long a verification or reset token stays valid
pub const TOKEN_EXPIRY_MINUTES: i64 = 20;

/// A generated token: the value to send and the value to store
#[derive(Debug, Clone)]
pub struct TemporaryToken {
    /// Hex string handed to the user; never persisted
    pub unhashed: String,

    /// SHA-256 hex digest of `unhashed`; persisted
    pub hashed: String,

    pub expires_at: DateTime<Utc>,
}

/// Generates a new random token with a 20 minute expiry
pub fn generate_temporary_token() -> TemporaryToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let unhashed = hex::encode(bytes);
    let hashed = hash_token(&unhashed);

    TemporaryToken {
        unhashed,
        hashed,
        expires_at: Utc::now() + Duration::minutes(TOKEN_EXPIRY_MINUTES),
    }
}

/// Hashes a presented token for lookup
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
