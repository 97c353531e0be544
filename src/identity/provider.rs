use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;

use super::store::IdentityStore;

/// Terminal outcome of a secret check. `Rejected` means the verifier
/// answered and said no; transport-level trouble is `VerifyError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Confirmed,
    Rejected,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("credential verifier unavailable: {0}")]
    Unavailable(String),
    #[error("credential verifier protocol error: {0}")]
    Protocol(String),
}

/// Secret-verification capability behind the gate. Two implementations:
/// the identity store's own credential check, and the external provider's
/// REST endpoint. Which one the gate holds is decided once at composition
/// time from configuration, never per request.
pub trait CredentialVerifier: Send + Sync {
    fn verify<'a>(&'a self, email: &'a str, secret: &'a str)
        -> BoxFuture<'a, Result<Verification, VerifyError>>;
}

/// Verifies against the identity store's stored credential.
pub struct LocalVerifier {
    store: Arc<dyn IdentityStore>,
}

impl LocalVerifier {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

impl CredentialVerifier for LocalVerifier {
    fn verify<'a>(&'a self, email: &'a str, secret: &'a str)
        -> BoxFuture<'a, Result<Verification, VerifyError>>
    {
        Box::pin(async move {
            match self.store.verify_secret(email, secret) {
                Ok(true) => Ok(Verification::Confirmed),
                Ok(false) => Ok(Verification::Rejected),
                Err(e) => Err(VerifyError::Unavailable(e.to_string())),
            }
        })
    }
}

/// Verifies against the external auth provider's password-grant endpoint.
/// 2xx is a verified assertion, 4xx a rejection; anything else (transport
/// failure, 5xx) surfaces as unavailable so the caller may retry.
pub struct RestVerifier {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestVerifier {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key }
    }
}

impl CredentialVerifier for RestVerifier {
    fn verify<'a>(&'a self, email: &'a str, secret: &'a str)
        -> BoxFuture<'a, Result<Verification, VerifyError>>
    {
        Box::pin(async move {
            let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
            let resp = self
                .http
                .post(&url)
                .header("apikey", self.api_key.as_str())
                .json(&serde_json::json!({ "email": email, "password": secret }))
                .send()
                .await
                .map_err(|e| VerifyError::Unavailable(e.to_string()))?;

            let status = resp.status();
            if status.is_success() {
                Ok(Verification::Confirmed)
            } else if status.is_client_error() {
                Ok(Verification::Rejected)
            } else {
                Err(VerifyError::Unavailable(format!("provider returned {}", status)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{MemoryIdentityStore, NewIdentity, Role};

    #[tokio::test]
    async fn local_verifier_answers_from_the_store() {
        let store = Arc::new(MemoryIdentityStore::new("@college.edu".to_string()));
        store
            .register(NewIdentity {
                email: "a@college.edu".to_string(),
                username: "alice".to_string(),
                password: "pw".to_string(),
                role: Role::Student,
                department: String::new(),
                student_id: None,
            })
            .unwrap();

        let v = LocalVerifier::new(store);
        assert_eq!(v.verify("a@college.edu", "pw").await.unwrap(), Verification::Confirmed);
        assert_eq!(v.verify("a@college.edu", "nope").await.unwrap(), Verification::Rejected);
        // unknown email is a plain rejection at this seam; classification is the gate's job
        assert_eq!(v.verify("b@college.edu", "pw").await.unwrap(), Verification::Rejected);
    }
}
