use argon2::{
    password_hash::{Output, PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Salt and digest as stored on the user row.
#[derive(Debug, Clone)]
pub struct SaltedHash {
    pub salt: String,
    pub digest: String,
}

/// Generate a fresh salt and hash `plain` with it.
pub fn hash_password(plain: &str) -> anyhow::Result<SaltedHash> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = digest(plain, salt.as_str())?;
    Ok(SaltedHash {
        salt: salt.as_str().to_string(),
        digest,
    })
}

/// Recompute the digest of `plain` under a stored salt.
pub fn digest(plain: &str, salt: &str) -> anyhow::Result<String> {
    Ok(raw_digest(plain, salt)?.to_string())
}

pub fn verify_password(plain: &str, salt: &str, stored_digest: &str) -> anyhow::Result<bool> {
    let expected = Output::b64_decode(stored_digest).map_err(|e| {
        error!(error = %e, "stored digest is not valid b64");
        anyhow::anyhow!(e.to_string())
    })?;
    // Output's PartialEq compares in constant time
    Ok(raw_digest(plain, salt)? == expected)
}

fn raw_digest(plain: &str, salt: &str) -> anyhow::Result<Output> {
    let salt = SaltString::from_b64(salt).map_err(|e| {
        error!(error = %e, "argon2 salt parse error");
        anyhow::anyhow!(e.to_string())
    })?;
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?;
    hash.hash
        .ok_or_else(|| anyhow::anyhow!("argon2 produced no output"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let stored = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &stored.salt, &stored.digest).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let stored = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &stored.salt, &stored.digest)
            .expect("verify should not error"));
    }

    #[test]
    fn digest_is_deterministic_for_a_given_salt() {
        let stored = hash_password("pw1").unwrap();
        assert_eq!(digest("pw1", &stored.salt).unwrap(), stored.digest);
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn verify_errors_on_malformed_digest() {
        let stored = hash_password("anything").unwrap();
        let err = verify_password("anything", &stored.salt, "not a digest!").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
