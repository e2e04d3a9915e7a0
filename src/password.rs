// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login password hashing.
//!
//! bcrypt with a fixed cost verifies who the user is; it is deliberately a
//! different function from the Argon2id KDF that derives the master key, so
//! the stored verifier can never double as key material.

/// bcrypt cost factor for login passwords.
const PASSWORD_COST: u32 = 14;

/// Hash a login password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, PASSWORD_COST)
}

/// Verify a login password against its stored hash.
///
/// The comparison inside bcrypt is constant-time. Malformed hashes verify
/// as `false` rather than erroring, so storage corruption cannot be told
/// apart from a wrong password by the caller.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("password123").unwrap();

        assert_ne!(hash, "password123");
        assert!(hash.starts_with("$2"));
        assert!(verify_password("password123", &hash));
        assert!(!verify_password("password124", &hash));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("password123", "not-a-bcrypt-hash"));
        assert!(!verify_password("password123", ""));
    }
}
