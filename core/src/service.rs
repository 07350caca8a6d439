//! Executing client: transport, credentials and interceptors around
//! `UsersClient`.
//!
//! # Design
//! Every operation follows the same pipeline in `dispatch`:
//!
//! 1. `UsersClient::build_*` produces the request;
//! 2. request interceptors run (bearer token attached here);
//! 3. the `Transport` performs the round-trip;
//! 4. a transport error or non-2xx status becomes one `ApiFailure`, and the
//!    failure interceptors run before it is returned (401 clears the store);
//! 5. `UsersClient::parse_*` unwraps the 2xx body.
//!
//! Operations are blocking and independent: no retries, no cancellation, and
//! no state shared between calls other than the credential store.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::client::UsersClient;
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::ApiFailure;
use crate::http::{HttpRequest, HttpResponse};
use crate::interceptor::{BearerAuth, ClearOnUnauthorized, Interceptor};
use crate::transport::{Transport, UreqTransport};
use crate::types::{CreateUser, Credentials, Profile, Session, UpdateUser, UserPage, UserRecord};

pub struct ApiService {
    client: UsersClient,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiService {
    /// Build a service over `transport`. The bearer and 401 interceptors are
    /// always installed first.
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(BearerAuth::new(store.clone())),
            Arc::new(ClearOnUnauthorized::new(store.clone())),
        ];
        Self {
            client: UsersClient::from_config(config),
            transport,
            store,
            interceptors,
        }
    }

    /// A service using the blocking `ureq` transport configured from `config`.
    pub fn with_ureq(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::new(config, transport, store)
    }

    /// Append a hook that runs after the built-in ones.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn client(&self) -> &UsersClient {
        &self.client
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    pub fn login(&self, credentials: &Credentials) -> Result<Session, ApiFailure> {
        let request = self.client.build_login(credentials)?;
        let response = self.dispatch(request)?;
        self.client.parse_login(response)
    }

    #[instrument(skip_all)]
    pub fn list_users(&self) -> Result<UserPage, ApiFailure> {
        let response = self.dispatch(self.client.build_list_users())?;
        self.client.parse_list_users(response)
    }

    #[instrument(skip(self))]
    pub fn get_user(&self, id: &str) -> Result<UserRecord, ApiFailure> {
        let response = self.dispatch(self.client.build_get_user(id))?;
        self.client.parse_get_user(response)
    }

    #[instrument(skip_all)]
    pub fn create_user(&self, input: &CreateUser) -> Result<UserRecord, ApiFailure> {
        let request = self.client.build_create_user(input)?;
        let response = self.dispatch(request)?;
        self.client.parse_create_user(response)
    }

    #[instrument(skip(self, input))]
    pub fn update_user(&self, id: &str, input: &UpdateUser) -> Result<UserRecord, ApiFailure> {
        let request = self.client.build_update_user(id, input)?;
        let response = self.dispatch(request)?;
        self.client.parse_update_user(response)
    }

    #[instrument(skip(self))]
    pub fn delete_user(&self, id: &str) -> Result<(), ApiFailure> {
        let response = self.dispatch(self.client.build_delete_user(id))?;
        self.client.parse_delete_user(response)
    }

    /// Log in and keep the resulting session in the credential store.
    pub fn sign_in(&self, credentials: &Credentials) -> Result<Session, ApiFailure> {
        let session = self.login(credentials)?;
        self.store.store(session.clone());
        Ok(session)
    }

    pub fn sign_out(&self) {
        self.store.clear();
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.token().is_some()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.store.profile()
    }

    fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, ApiFailure> {
        for interceptor in &self.interceptors {
            interceptor.on_request(&mut request);
        }

        let outcome = match self.transport.send(&request) {
            Ok(response) => {
                debug!(method = %request.method, url = %request.path, status = response.status, "response received");
                self.client.check_status(&response).map(|()| response)
            }
            Err(err) => {
                debug!(method = %request.method, url = %request.path, error = %err, "transport failed");
                Err(ApiFailure::from_transport(&err, self.client.fallback_message()))
            }
        };

        outcome.inspect_err(|failure| {
            for interceptor in &self.interceptors {
                interceptor.on_failure(failure);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use serde_json::{json, Value};

    use super::*;
    use crate::cpf::Cpf;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::TransportError;
    use crate::http::HttpMethod;

    /// Replays canned outcomes and records every request it was given.
    #[derive(Default)]
    struct FakeTransport {
        outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            let fake = Self::default();
            fake.push(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            Arc::new(fake)
        }

        fn failing(message: &str) -> Arc<Self> {
            let fake = Self::default();
            fake.push(Err(TransportError::new(message)));
            Arc::new(fake)
        }

        fn push(&self, outcome: Result<HttpResponse, TransportError>) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        fn last_request(&self) -> HttpRequest {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no canned response")))
        }
    }

    /// Records the store state observed when each failure hook ran.
    struct TokenProbe {
        store: Arc<dyn CredentialStore>,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl Interceptor for TokenProbe {
        fn on_failure(&self, _failure: &ApiFailure) {
            self.seen.lock().unwrap().push(self.store.token());
        }
    }

    const RECORD: &str = r#"{"id":"u-1","name":"Ana","cpf":"11122233344","birthDate":"2000-01-01"}"#;

    fn session() -> Session {
        Session {
            access_token: "tok".to_string(),
            profile: Profile {
                id: "1".to_string(),
                email: "admin@example.com".to_string(),
                is_active: true,
            },
        }
    }

    fn service(transport: Arc<FakeTransport>, store: Arc<MemoryCredentialStore>) -> ApiService {
        ApiService::new(&ClientConfig::new("http://api.local"), transport, store)
    }

    #[test]
    fn bearer_token_is_read_at_send_time() {
        let transport = FakeTransport::replying(200, "[]");
        transport.push(Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: "[]".to_string(),
        }));
        let store = Arc::new(MemoryCredentialStore::new());
        let api = service(transport.clone(), store.clone());

        api.list_users().unwrap();
        assert_eq!(transport.last_request().header("authorization"), None);

        store.store(session());
        api.list_users().unwrap();
        assert_eq!(transport.last_request().header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn unauthorized_clears_store_before_caller_sees_failure() {
        let transport = FakeTransport::replying(401, r#"{"message":"Unauthorized","statusCode":401}"#);
        let store = Arc::new(MemoryCredentialStore::with_session(session()));
        let api = service(transport, store.clone());

        let err = api.get_user("u-1").unwrap_err();
        assert_eq!(err.status, Some(401));
        assert_eq!(err.message, "Unauthorized");
        assert_eq!(store.token(), None);
        assert!(!api.is_authenticated());
    }

    #[test]
    fn caller_hooks_run_after_credentials_are_cleared() {
        let transport = FakeTransport::replying(401, "");
        let store = Arc::new(MemoryCredentialStore::with_session(session()));
        let probe = Arc::new(TokenProbe {
            store: store.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let api = service(transport, store).with_interceptor(probe.clone());

        api.delete_user("u-1").unwrap_err();
        assert_eq!(*probe.seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn validation_failure_joins_messages() {
        let transport = FakeTransport::replying(400, r#"{"message":["A","B"],"statusCode":400}"#);
        let store = Arc::new(MemoryCredentialStore::with_session(session()));
        let api = service(transport, store.clone());

        let input = CreateUser::new(
            "Ana",
            Cpf::parse("11122233344").unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        );
        let err = api.create_user(&input).unwrap_err();
        assert_eq!(err.message, "A\nB");
        assert_eq!(err.status, Some(400));
        assert!(store.token().is_some());
    }

    #[test]
    fn transport_failure_uses_transport_message_then_fallback() {
        let store = Arc::new(MemoryCredentialStore::new());
        let api = service(FakeTransport::failing("connection refused"), store.clone());
        let err = api.list_users().unwrap_err();
        assert_eq!(err.message, "connection refused");
        assert_eq!(err.status, None);
        assert_eq!(err.payload, None);

        let config = ClientConfig::new("http://api.local").with_fallback_message("Erro ao carregar usuários");
        let api = ApiService::new(&config, FakeTransport::failing(""), store);
        assert_eq!(api.list_users().unwrap_err().message, "Erro ao carregar usuários");
    }

    #[test]
    fn create_user_request_omits_blank_optionals() {
        let transport = FakeTransport::replying(201, &format!(r#"{{"data":{RECORD}}}"#));
        let api = service(transport.clone(), Arc::new(MemoryCredentialStore::new()));

        let input = CreateUser::new(
            "Ana",
            Cpf::parse("11122233344").unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        )
        .email("");
        let created = api.create_user(&input).unwrap();
        assert_eq!(created.id, "u-1");

        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ana", "cpf": "11122233344", "birthDate": "2000-01-01"}));
    }

    #[test]
    fn delete_resolves_without_unwrapping() {
        let transport = FakeTransport::replying(200, "{ not json");
        let api = service(transport, Arc::new(MemoryCredentialStore::new()));
        assert_eq!(api.delete_user("u-1"), Ok(()));
    }

    #[test]
    fn sign_in_stores_session_and_sign_out_clears_it() {
        let transport = FakeTransport::replying(
            201,
            r#"{"data":{"access_token":"tok","user":{"id":"1","email":"admin@example.com","isActive":true}}}"#,
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let api = service(transport.clone(), store.clone());

        let session = api.sign_in(&Credentials::new("admin@example.com", "secret")).unwrap();
        assert_eq!(session.access_token, "tok");
        assert!(api.is_authenticated());
        assert_eq!(api.current_profile().map(|p| p.id), Some("1".to_string()));
        assert_eq!(transport.last_request().path, "http://api.local/auth/login");

        api.sign_out();
        assert!(!api.is_authenticated());
        assert_eq!(api.current_profile(), None);
    }

    #[test]
    fn login_does_not_touch_store() {
        let transport = FakeTransport::replying(
            200,
            r#"{"access_token":"tok","user":{"id":"1","email":"admin@example.com","isActive":true}}"#,
        );
        let store = Arc::new(MemoryCredentialStore::new());
        let api = service(transport, store.clone());
        api.login(&Credentials::new("admin@example.com", "secret")).unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn update_user_unwraps_envelope() {
        let transport = FakeTransport::replying(200, &format!(r#"{{"message":"ok","data":{RECORD}}}"#));
        let api = service(transport.clone(), Arc::new(MemoryCredentialStore::new()));
        let updated = api.update_user("u-1", &UpdateUser::new().name("Ana")).unwrap();
        assert_eq!(updated.name, "Ana");
        assert_eq!(transport.last_request().method, HttpMethod::Put);
    }
}
