//! Request and failure hooks around the transport.
//!
//! # Design
//! `ApiService` runs every outgoing request through `on_request` and every
//! failure through `on_failure`, in registration order. Both built-in hooks
//! receive the `CredentialStore` explicitly instead of reaching for global
//! state:
//!
//! - `BearerAuth` attaches `Authorization: Bearer <token>` when a token is
//!   present and leaves the request untouched otherwise.
//! - `ClearOnUnauthorized` clears the store when a failure has status 401.
//!
//! Both are installed by `ApiService::new` ahead of any caller-supplied hook.

use std::sync::Arc;

use tracing::warn;

use crate::credentials::CredentialStore;
use crate::error::ApiFailure;
use crate::http::HttpRequest;

pub trait Interceptor: Send + Sync {
    fn on_request(&self, _request: &mut HttpRequest) {}

    /// Runs before the failure reaches the caller.
    fn on_failure(&self, _failure: &ApiFailure) {}
}

pub struct BearerAuth {
    store: Arc<dyn CredentialStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl Interceptor for BearerAuth {
    fn on_request(&self, request: &mut HttpRequest) {
        if let Some(token) = self.store.token().filter(|token| !token.is_empty()) {
            request.set_header("authorization", format!("Bearer {token}"));
        }
    }
}

pub struct ClearOnUnauthorized {
    store: Arc<dyn CredentialStore>,
}

impl ClearOnUnauthorized {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

impl Interceptor for ClearOnUnauthorized {
    fn on_failure(&self, failure: &ApiFailure) {
        if failure.is_unauthorized() {
            warn!("authentication rejected, clearing stored credentials");
            self.store.clear();
        }
    }
}
