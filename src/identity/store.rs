use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::security;

use super::principal::{Principal, Role};

/// A stored account record. The credential only exists as an Argon2 PHC
/// string; comparison goes through `verify_secret`, never through the caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub department: String,
    /// Students only; admins and organizers never carry one.
    pub student_id: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn principal(&self) -> Principal {
        Principal {
            email: self.email.clone(),
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Read side of the identity store as the gate sees it: existence lookup and
/// delegated secret comparison. The gate never mutates identity state.
pub trait IdentityStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<Identity>;
    fn verify_secret(&self, email: &str, secret: &str) -> Result<bool>;
}

/// Registration input. The secret arrives in plaintext and leaves this module
/// as a PHC string.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub department: String,
    pub student_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Email must be from {0} domain.")]
    DomainNotAllowed(String),
    #[error("An account with this email already exists.")]
    EmailTaken,
    #[error("This username is already taken.")]
    UsernameTaken,
    #[error("This student ID is already registered.")]
    StudentIdTaken,
    #[error("could not hash the password: {0}")]
    Hashing(String),
}

/// In-memory identity store keyed by email. Backing the gate with a real
/// relational store is a deployment concern; everything role- and
/// credential-shaped lives behind the `IdentityStore` seam either way.
pub struct MemoryIdentityStore {
    email_domain: String,
    users: RwLock<HashMap<String, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new(email_domain: String) -> Self {
        Self { email_domain, users: RwLock::new(HashMap::new()) }
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Create an account under the intake rules: allowed-domain email,
    /// unique email/username, unique student id, students only. Non-student
    /// roles never carry a student id, whatever the caller sent.
    pub fn register(&self, new: NewIdentity) -> Result<Identity, RegisterError> {
        if !security::is_allowed_email(&new.email, &self.email_domain) {
            return Err(RegisterError::DomainNotAllowed(self.email_domain.clone()));
        }

        let student_id = match new.role {
            Role::Student => new.student_id.filter(|s| !s.trim().is_empty()).map(|s| s.trim().to_string()),
            Role::Admin | Role::Organizer => None,
        };

        let mut users = self.users.write();
        if users.contains_key(&new.email) {
            return Err(RegisterError::EmailTaken);
        }
        if users.values().any(|u| u.username == new.username) {
            return Err(RegisterError::UsernameTaken);
        }
        if let Some(sid) = &student_id {
            if users.values().any(|u| u.student_id.as_deref() == Some(sid.as_str())) {
                return Err(RegisterError::StudentIdTaken);
            }
        }

        let password_hash = security::hash_password(&new.password)
            .map_err(|e| RegisterError::Hashing(e.to_string()))?;
        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            email: new.email,
            username: new.username,
            password_hash,
            role: new.role,
            department: new.department,
            student_id,
            verified: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(identity.email.clone(), identity.clone());
        Ok(identity)
    }

    /// First-start seeding so an empty store is reachable. Bypasses the
    /// intake duplicate checks (the store is empty) but not the hashing.
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<Identity> {
        let username = email.split('@').next().unwrap_or("admin").to_string();
        let password_hash = security::hash_password(password)?;
        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username,
            password_hash,
            role: Role::Admin,
            department: String::new(),
            student_id: None,
            verified: true,
            created_at: now,
            updated_at: now,
        };
        self.users.write().insert(identity.email.clone(), identity.clone());
        Ok(identity)
    }

    /// Flip the email-confirmation flag; code delivery itself is external.
    pub fn mark_verified(&self, email: &str) -> bool {
        let mut users = self.users.write();
        match users.get_mut(email) {
            Some(u) => {
                u.verified = true;
                u.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn find_by_email(&self, email: &str) -> Option<Identity> {
        self.users.read().get(email).cloned()
    }

    fn verify_secret(&self, email: &str, secret: &str) -> Result<bool> {
        let Some(identity) = self.find_by_email(email) else { return Ok(false) };
        Ok(security::verify_password(&identity.password_hash, secret))
    }
}
