//! Blocking API client core for the user-management service.
//!
//! # Overview
//! `UsersClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `ApiService` wraps it
//! with a `Transport`, a `CredentialStore` and an interceptor chain, and is
//! what an application calls.
//!
//! # Design
//! - Success bodies may or may not be wrapped as `{data: ...}`; `envelope`
//!   normalizes both, and list responses never fail on shape mismatches.
//! - Every failure, whether transport or HTTP status, reaches the caller as
//!   one `ApiFailure` with a display-ready message.
//! - A 401 clears the credential store through an interceptor that is always
//!   installed.
//! - `form` carries the console's validation rules for CPF, dates and e-mail.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod cpf;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod form;
pub mod http;
pub mod interceptor;
pub mod service;
pub mod transport;
pub mod types;

pub use client::UsersClient;
pub use config::ClientConfig;
pub use cpf::{format_cpf_input, Cpf, CpfError};
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::{ApiFailure, TransportError};
pub use form::{FormErrors, FormField, UserForm};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::Interceptor;
pub use service::ApiService;
pub use transport::{Transport, UreqTransport};
pub use types::{
    format_birth_date, CreateUser, Credentials, Gender, Page, Profile, Session, UpdateUser, UserPage, UserRecord,
};
