use std::sync::Arc;

use tracing::{info, warn};

use super::principal::{Destination, Principal, Role};
use super::provider::{CredentialVerifier, Verification};
use super::session::{Session, SessionManager};
use super::store::IdentityStore;

/// Why an attempt was denied. `UnknownIdentity` and `BadSecret` stay
/// distinct here and in logs, but share one caller-facing string so the
/// login surface cannot be used to enumerate accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    UnknownIdentity,
    BadSecret,
    RoleMismatch,
    ProviderUnavailable,
}

impl DenyReason {
    pub fn user_message(self) -> &'static str {
        match self {
            DenyReason::UnknownIdentity | DenyReason::BadSecret => "Invalid email or password.",
            DenyReason::RoleMismatch => "Invalid role for this account.",
            DenyReason::ProviderUnavailable => "Sign-in is temporarily unavailable. Please try again.",
        }
    }

    pub fn retryable(self) -> bool {
        matches!(self, DenyReason::ProviderUnavailable)
    }

    fn log_tag(self) -> &'static str {
        match self {
            DenyReason::UnknownIdentity => "unknown_identity",
            DenyReason::BadSecret => "bad_secret",
            DenyReason::RoleMismatch => "role_mismatch",
            DenyReason::ProviderUnavailable => "provider_unavailable",
        }
    }
}

/// One authentication attempt's outcome, produced and consumed within a
/// single request. Nothing here is persisted.
#[derive(Debug, Clone)]
pub enum AuthDecision {
    Granted {
        principal: Principal,
        destination: Destination,
        session: Session,
    },
    Denied {
        reason: DenyReason,
    },
}

/// The credential & role gate. Stateless between calls: the store, the
/// verifier chosen at composition time and the session manager are its only
/// collaborators, and none of its own data is mutated by a call.
pub struct CredentialGate {
    store: Arc<dyn IdentityStore>,
    verifier: Arc<dyn CredentialVerifier>,
    sessions: SessionManager,
}

impl CredentialGate {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        verifier: Arc<dyn CredentialVerifier>,
        sessions: SessionManager,
    ) -> Self {
        Self { store, verifier, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Decide whether (email, secret, claimed_role) establishes a session,
    /// and where to land afterwards.
    ///
    /// Order matters: a claimed role outside the closed set is refused
    /// before any verification work, since no account can hold it. The
    /// role-equality check itself runs only after the secret verified, so a
    /// valid student picking "admin" at the prompt is told about the role,
    /// not about the credential.
    pub async fn authenticate(&self, email: &str, secret: &str, claimed_role: &str) -> AuthDecision {
        let Some(claimed) = Role::parse(claimed_role) else {
            warn!(target: "gate", "denied email={} reason=role_mismatch claimed='{}'", email, claimed_role);
            return AuthDecision::Denied { reason: DenyReason::RoleMismatch };
        };

        let verified = match self.verifier.verify(email, secret).await {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "gate", "denied email={} reason=provider_unavailable err={}", email, e);
                return AuthDecision::Denied { reason: DenyReason::ProviderUnavailable };
            }
        };

        if verified == Verification::Rejected {
            // Classify for the log line only; the caller-facing text is the
            // same either way.
            let reason = if self.store.find_by_email(email).is_none() {
                DenyReason::UnknownIdentity
            } else {
                DenyReason::BadSecret
            };
            warn!(target: "gate", "denied email={} reason={}", email, reason.log_tag());
            return AuthDecision::Denied { reason };
        }

        // The verifier vouched for the secret; the canonical record still
        // decides. A provider-known email with no local record is denied,
        // never auto-provisioned.
        let Some(identity) = self.store.find_by_email(email) else {
            warn!(target: "gate", "denied email={} reason=unknown_identity (verified upstream, no local record)", email);
            return AuthDecision::Denied { reason: DenyReason::UnknownIdentity };
        };

        if identity.role != claimed {
            warn!(
                target: "gate",
                "denied email={} reason=role_mismatch claimed={} stored={}",
                email,
                claimed.as_str(),
                identity.role.as_str()
            );
            return AuthDecision::Denied { reason: DenyReason::RoleMismatch };
        }

        let principal = identity.principal();
        let session = self.sessions.issue(principal.clone());
        let destination = identity.role.destination();
        info!(
            target: "gate",
            "granted email={} role={} dest={} sid={}",
            principal.email,
            principal.role.as_str(),
            destination.path(),
            session.session_id
        );
        AuthDecision::Granted { principal, destination, session }
    }
}
