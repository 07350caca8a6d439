//! Credential storage for the bearer session.
//!
//! # Design
//! The client never owns the session. It reads the token through the
//! `CredentialStore` trait at send time and clears it through the same trait
//! when the server answers 401, so tests can swap in their own store.

use std::sync::{PoisonError, RwLock};

use crate::types::{Profile, Session};

pub trait CredentialStore: Send + Sync {
    /// Current bearer token, if a session is active.
    fn token(&self) -> Option<String>;

    fn profile(&self) -> Option<Profile>;

    fn store(&self, session: Session);

    /// Drop the token and the cached profile.
    fn clear(&self);
}

/// Process-local store guarded by an `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

// A poisoned lock still holds a consistent `Option<Session>`, so readers and
// writers recover the guard instead of propagating the panic.
impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Option<String> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        session.as_ref().map(|s| s.access_token.clone())
    }

    fn profile(&self) -> Option<Profile> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        session.as_ref().map(|s| s.profile.clone())
    }

    fn store(&self, session: Session) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
