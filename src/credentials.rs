// 🔐 Credential Store - salted one-way PIN hashing
//
// The raw PIN never leaves this module: callers get back a salt and a hash,
// and verification re-derives the hash with the stored salt.

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

// ============================================================================
// CREDENTIAL
// ============================================================================

/// Stored credential for one customer record (salt + SHA-512 hex digest).
///
/// Deliberately not `Serialize`: credentials stay inside the registry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: String,
    hash: String,
}

impl Credential {
    /// Derive a credential for a new account with a fresh salt
    pub fn create(pin: &str) -> Self {
        let (hash, salt) = derive(pin, None);
        Credential { salt, hash }
    }

    /// Check a presented PIN against this credential
    pub fn verify(&self, pin: &str) -> bool {
        verify(pin, &self.salt, &self.hash)
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("salt", &self.salt)
            .field("hash", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// HASHING
// ============================================================================

/// Generate a random 128-bit salt in hex form
pub fn generate_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash `pin ‖ salt`, generating the salt when none is given.
///
/// Returns `(hash, salt)`. Deterministic for the same pin and salt.
pub fn derive(pin: &str, salt: Option<&str>) -> (String, String) {
    let salt = match salt {
        Some(existing) => existing.to_string(),
        None => generate_salt(),
    };

    let mut hasher = Sha512::new();
    hasher.update(pin.as_bytes());
    hasher.update(salt.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    (hash, salt)
}

/// Recompute the hash for `pin` with `salt` and compare in constant time
pub fn verify(pin: &str, salt: &str, expected_hash: &str) -> bool {
    let (hash, _) = derive(pin, Some(salt));
    constant_time_eq(&hash, expected_hash)
}

/// Compare two strings without early exit on the first differing byte
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ============================================================================
// TESTS
// ============================================================================
