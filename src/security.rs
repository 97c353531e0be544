//! Password hashing and the allowed-domain email check.
//! Secrets only ever exist here as Argon2 PHC strings; callers never see or
//! store plaintext beyond the verification call itself.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Accepts an email only when it ends with the configured domain suffix and
/// has a non-empty local part. The suffix must include the leading '@'
/// (see `config::normalize_domain`); format validation beyond that stays at
/// the intake boundary.
pub fn is_allowed_email(email: &str, domain: &str) -> bool {
    email.len() > domain.len() && email.ends_with(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let phc = hash_password("s3cr3t!").expect("hash");
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "s3cr3t!"));
        assert!(!verify_password(&phc, "wrong"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn allowed_email_requires_exact_suffix_and_local_part() {
        assert!(is_allowed_email("student1@college.edu", "@college.edu"));
        assert!(!is_allowed_email("student1@gmail.com", "@college.edu"));
        // no local part
        assert!(!is_allowed_email("@college.edu", "@college.edu"));
        // a longer domain must not sneak past the suffix check
        assert!(!is_allowed_email("someone@evilcollege.edu", "@college.edu"));
    }
}
