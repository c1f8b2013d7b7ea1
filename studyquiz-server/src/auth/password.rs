//! Native account password digests
//!
//! bcrypt strings carry their own salt and cost, so a single column holds
//! everything needed to verify.

use super::AuthError;

pub use bcrypt::DEFAULT_COST;

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// False for a wrong password and for a digest bcrypt can't read.
pub fn verify_password(password: &str, digest: &str) -> bool {
    match bcrypt::verify(password, digest) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "stored password digest is not valid bcrypt");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // lowest cost bcrypt accepts, keeps the tests fast
    const TEST_COST: u32 = 4;

    #[test]
    fn verify_matches_hash() {
        let digest = hash_password("correct horse", TEST_COST).unwrap();
        assert!(digest.starts_with("$2"));
        assert!(verify_password("correct horse", &digest));
        assert!(!verify_password("wrong horse", &digest));
    }

    #[test]
    fn same_password_gets_distinct_digests() {
        let a = hash_password("hunter22", TEST_COST).unwrap();
        let b = hash_password("hunter22", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("hunter22", &a));
        assert!(verify_password("hunter22", &b));
    }

    #[test]
    fn legacy_or_garbage_digest_never_verifies() {
        // 32 hex chars, the shape of an md5 digest
        assert!(!verify_password("hunter22", "5f4dcc3b5aa765d61d8327deb882cf99"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn invalid_cost_is_an_error() {
        assert!(matches!(
            hash_password("hunter22", 99),
            Err(AuthError::PasswordHash(_))
        ));
    }
}
