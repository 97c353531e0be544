use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::tprintln;

use super::principal::Principal;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Default)]
struct SessionMaps {
    by_token: HashMap<String, Session>,
    // email -> tokens, so one account's sessions can be revoked together
    by_email: HashMap<String, HashSet<String>>,
}

fn gen_id() -> String {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Issues and tracks opaque session tokens. Owns its maps rather than
/// leaning on module-level statics, so two managers in one process (tests,
/// mostly) cannot see each other's sessions.
#[derive(Clone)]
pub struct SessionManager {
    ttl: Duration,
    maps: Arc<RwLock<SessionMaps>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, maps: Arc::new(RwLock::new(SessionMaps::default())) }
    }

    pub fn issue(&self, principal: Principal) -> Session {
        let now = Instant::now();
        let sid = gen_id();
        let token = gen_id();
        let sess = Session {
            session_id: sid.clone(),
            token: token.clone(),
            principal: principal.clone(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut m = self.maps.write();
            m.by_token.insert(token.clone(), sess.clone());
            m.by_email.entry(principal.email.clone()).or_default().insert(token);
        }
        tprintln!("session.issue email={} sid={} ttl_secs={}", principal.email, sid, self.ttl.as_secs());
        sess
    }

    /// Resolve a token to its principal. Expired entries are dropped on the
    /// way out rather than by a background sweeper.
    pub fn validate(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        let mut expired: Option<String> = None;
        let out = {
            let m = self.maps.read();
            match m.by_token.get(token) {
                Some(sess) if sess.expires_at > now => Some(sess.principal.clone()),
                Some(_) => {
                    expired = Some(token.to_string());
                    None
                }
                None => None,
            }
        };
        if let Some(t) = expired {
            self.drop_token(&t);
        }
        out
    }

    pub fn logout(&self, token: &str) -> bool {
        self.drop_token(token)
    }

    /// Destroy every session bound to an email. Returns how many were dropped.
    pub fn revoke_all(&self, email: &str) -> usize {
        let mut m = self.maps.write();
        let Some(tokens) = m.by_email.remove(email) else { return 0 };
        let mut count = 0usize;
        for t in tokens {
            if m.by_token.remove(&t).is_some() {
                count += 1;
            }
        }
        tprintln!("session.revoke email={} count={}", email, count);
        count
    }

    fn drop_token(&self, token: &str) -> bool {
        let mut m = self.maps.write();
        let Some(sess) = m.by_token.remove(token) else { return false };
        if let Some(set) = m.by_email.get_mut(&sess.principal.email) {
            set.remove(token);
            if set.is_empty() {
                m.by_email.remove(&sess.principal.email);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;

    fn principal(email: &str) -> Principal {
        Principal { email: email.to_string(), username: email.split('@').next().unwrap().to_string(), role: Role::Student }
    }

    #[test]
    fn issue_then_validate_roundtrip() {
        let sm = SessionManager::default();
        let sess = sm.issue(principal("a@college.edu"));
        assert_ne!(sess.session_id, sess.token);
        let p = sm.validate(&sess.token).expect("live session");
        assert_eq!(p.email, "a@college.edu");
    }

    #[test]
    fn logout_destroys_the_session() {
        let sm = SessionManager::default();
        let sess = sm.issue(principal("a@college.edu"));
        assert!(sm.logout(&sess.token));
        assert!(sm.validate(&sess.token).is_none());
        // second logout is a no-op
        assert!(!sm.logout(&sess.token));
    }

    #[test]
    fn expired_sessions_are_pruned_on_validate() {
        let sm = SessionManager::new(Duration::from_secs(0));
        let sess = sm.issue(principal("a@college.edu"));
        assert!(sm.validate(&sess.token).is_none());
        // already pruned, so not counted by a later revoke
        assert_eq!(sm.revoke_all("a@college.edu"), 0);
    }

    #[test]
    fn revoke_all_counts_only_live_sessions() {
        let sm = SessionManager::default();
        let s1 = sm.issue(principal("a@college.edu"));
        let _s2 = sm.issue(principal("a@college.edu"));
        let other = sm.issue(principal("b@college.edu"));
        sm.logout(&s1.token);
        assert_eq!(sm.revoke_all("a@college.edu"), 1);
        // unrelated account untouched
        assert!(sm.validate(&other.token).is_some());
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let sm = SessionManager::default();
        let a = sm.issue(principal("a@college.edu"));
        let b = sm.issue(principal("a@college.edu"));
        assert_ne!(a.token, b.token);
    }
}
