//! Stateless HTTP request builder and response parser for the users API.
//!
//! # Design
//! `UsersClient` holds only the base URL and the fallback failure message.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`, so
//! the wire contract is deterministic and testable without I/O. `ApiService`
//! adds the transport, credentials and interceptors on top.
//!
//! Every `parse_*` accepts any 2xx status. Single-object responses are
//! unwrapped with `envelope::unwrap_data`; the list response is normalized
//! with `envelope::normalize_list`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ClientConfig, DEFAULT_FALLBACK_MESSAGE};
use crate::envelope::{normalize_list, parse_body, unwrap_data};
use crate::error::ApiFailure;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateUser, Credentials, Session, UpdateUser, UserPage, UserRecord};

#[derive(Debug, Clone)]
pub struct UsersClient {
    base_url: String,
    fallback_message: String,
}

impl UsersClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fallback_message: config.fallback_message.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiFailure> {
        self.json_request(HttpMethod::Post, "/auth/login".to_string(), credentials)
    }

    pub fn build_list_users(&self) -> HttpRequest {
        self.bare_request(HttpMethod::Get, "/users".to_string())
    }

    pub fn build_get_user(&self, id: &str) -> HttpRequest {
        self.bare_request(HttpMethod::Get, format!("/users/{id}"))
    }

    pub fn build_create_user(&self, input: &CreateUser) -> Result<HttpRequest, ApiFailure> {
        self.json_request(HttpMethod::Post, "/users".to_string(), input)
    }

    pub fn build_update_user(&self, id: &str, input: &UpdateUser) -> Result<HttpRequest, ApiFailure> {
        self.json_request(HttpMethod::Put, format!("/users/{id}"), input)
    }

    pub fn build_delete_user(&self, id: &str) -> HttpRequest {
        self.bare_request(HttpMethod::Delete, format!("/users/{id}"))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<Session, ApiFailure> {
        self.parse_single(response)
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<UserPage, ApiFailure> {
        self.check_status(&response)?;
        Ok(normalize_list(parse_body(&response.body)))
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<UserRecord, ApiFailure> {
        self.parse_single(response)
    }

    pub fn parse_create_user(&self, response: HttpResponse) -> Result<UserRecord, ApiFailure> {
        self.parse_single(response)
    }

    pub fn parse_update_user(&self, response: HttpResponse) -> Result<UserRecord, ApiFailure> {
        self.parse_single(response)
    }

    /// The body of a successful delete is never inspected.
    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<(), ApiFailure> {
        self.check_status(&response)
    }

    /// Map a non-2xx response to an `ApiFailure`.
    pub fn check_status(&self, response: &HttpResponse) -> Result<(), ApiFailure> {
        if response.is_success() {
            return Ok(());
        }
        Err(ApiFailure::from_status(response.status, &response.body, &self.fallback_message))
    }

    fn parse_single<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiFailure> {
        self.check_status(&response)?;
        let payload = unwrap_data(parse_body(&response.body));
        serde_json::from_value(payload).map_err(|e| ApiFailure::decode(response.status, &response.body, &e))
    }

    fn bare_request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<B: Serialize>(&self, method: HttpMethod, path: String, body: &B) -> Result<HttpRequest, ApiFailure> {
        let body = serde_json::to_string(body).map_err(|e| ApiFailure::encode(&e))?;
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    use super::*;
    use crate::cpf::Cpf;

    fn client() -> UsersClient {
        UsersClient::new("http://localhost:3000")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    const RECORD: &str = r#"{"id":"u-1","name":"Ana","cpf":"11122233344","birthDate":"2000-01-01"}"#;

    #[test]
    fn build_list_users_produces_correct_request() {
        let req = client().build_list_users();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/users");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_get_and_delete_use_id_path() {
        let req = client().build_get_user("u-1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/users/u-1");

        let req = client().build_delete_user("u-1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/users/u-1");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_login_posts_credentials() {
        let req = client()
            .build_login(&Credentials::new("admin@example.com", "secret"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/auth/login");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "admin@example.com", "password": "secret"}));
    }

    #[test]
    fn build_create_user_omits_blank_email() {
        let input = CreateUser::new(
            "Ana",
            Cpf::parse("11122233344").unwrap(),
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        )
        .email("");
        let req = client().build_create_user(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/users");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ana", "cpf": "11122233344", "birthDate": "2000-01-01"}));
        assert!(body.get("email").is_none());
    }

    #[test]
    fn build_update_user_sends_present_fields_only() {
        let input = UpdateUser::new().name("Ana Maria").nationality("");
        let req = client().build_update_user("u-1", &input).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/users/u-1");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Ana Maria"}));
    }

    #[test]
    fn parse_single_accepts_both_envelopes() {
        let bare = client().parse_get_user(response(200, RECORD)).unwrap();
        let wrapped = client()
            .parse_get_user(response(200, &format!(r#"{{"data":{RECORD},"message":"ok"}}"#)))
            .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.name, "Ana");

        let created = client().parse_create_user(response(201, RECORD)).unwrap();
        let updated = client()
            .parse_update_user(response(200, &format!(r#"{{"data":{RECORD}}}"#)))
            .unwrap();
        assert_eq!(created, updated);
    }

    #[test]
    fn parse_login_accepts_both_envelopes() {
        let session = r#"{"access_token":"tok","user":{"id":"1","email":"a@b.com","isActive":true}}"#;
        let bare = client().parse_login(response(200, session)).unwrap();
        let wrapped = client()
            .parse_login(response(201, &format!(r#"{{"data":{session}}}"#)))
            .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.access_token, "tok");
    }

    #[test]
    fn parse_list_users_normalizes() {
        let page = client()
            .parse_list_users(response(200, &format!(r#"{{"data":[{RECORD}],"total":7}}"#)))
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 7);

        let page = client().parse_list_users(response(200, "")).unwrap();
        assert_eq!(page, UserPage::default());

        let mixed = format!(r#"{{"data":[{RECORD},{{"id":"u-2","name":"Bia","cpf":"123","birthDate":"2001-02-03"}}],"total":2}}"#);
        let page = client().parse_list_users(response(200, &mixed)).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 2);
    }

    #[test]
    fn parse_failure_derives_message() {
        let err = client()
            .parse_create_user(response(400, r#"{"message":["A","B"],"statusCode":400}"#))
            .unwrap_err();
        assert_eq!(err.message, "A\nB");
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn parse_get_user_not_found() {
        let err = client()
            .parse_get_user(response(404, r#"{"message":"Usuário não encontrado","statusCode":404}"#))
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "Usuário não encontrado");
    }

    #[test]
    fn parse_delete_ignores_body() {
        assert!(client().parse_delete_user(response(204, "")).is_ok());
        assert!(client().parse_delete_user(response(200, "not json")).is_ok());
        let err = client().parse_delete_user(response(404, "")).unwrap_err();
        assert_eq!(err.message, "Request failed with status code 404");
    }

    #[test]
    fn parse_get_user_bad_body_is_failure() {
        let err = client().parse_get_user(response(200, r#"{"data":null}"#)).unwrap_err();
        assert_eq!(err.status, Some(200));
        assert!(err.message.starts_with("invalid response body"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = UsersClient::new("http://localhost:3000/");
        assert_eq!(client.build_list_users().path, "http://localhost:3000/users");
    }

    #[test]
    fn from_config_uses_fallback_message() {
        let config = ClientConfig::new("http://api.local").with_fallback_message("Erro ao carregar usuário");
        let client = UsersClient::from_config(&config);
        assert_eq!(client.fallback_message(), "Erro ao carregar usuário");
        assert_eq!(client.base_url(), "http://api.local");
    }
}
