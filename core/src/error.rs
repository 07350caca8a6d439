//! Error types for the users API client.
//!
//! # Design
//! Callers see exactly one failure type, `ApiFailure`. Transport failures and
//! non-2xx responses are both collapsed into it, and the display message is
//! derived once, here, with a fixed precedence (see `failure_message`).
//! `TransportError` exists only on the `Transport` seam.

use serde_json::Value;
use thiserror::Error;

/// A failure to obtain any HTTP response (DNS, refused connection, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The single error value returned by every `ApiService` operation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiFailure {
    /// Human-readable message, meant to be displayed verbatim.
    pub message: String,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// Raw response body: parsed JSON when possible, otherwise the text.
    pub payload: Option<Value>,
}

impl ApiFailure {
    /// Build a failure from a non-2xx response.
    pub fn from_status(status: u16, body: &str, fallback: &str) -> Self {
        let payload = raw_payload(body);
        let transport_message = format!("Request failed with status code {status}");
        Self {
            message: failure_message(payload.as_ref(), Some(&transport_message), fallback),
            status: Some(status),
            payload,
        }
    }

    /// Build a failure from a transport error; there is no body to inspect.
    pub fn from_transport(err: &TransportError, fallback: &str) -> Self {
        Self {
            message: failure_message(None, Some(err.message()), fallback),
            status: None,
            payload: None,
        }
    }

    /// A 2xx body that could not be decoded into the expected type.
    pub(crate) fn decode(status: u16, body: &str, err: &serde_json::Error) -> Self {
        Self {
            message: format!("invalid response body: {err}"),
            status: Some(status),
            payload: raw_payload(body),
        }
    }

    /// A request payload that could not be encoded.
    pub(crate) fn encode(err: &serde_json::Error) -> Self {
        Self {
            message: format!("invalid request body: {err}"),
            status: None,
            payload: None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

/// Derive the display message for a failure.
///
/// Precedence: a `message` array in the body (joined with newlines), a
/// `message` string in the body, the transport's own message, then
/// `fallback`. Empty transport messages count as absent.
pub fn failure_message(payload: Option<&Value>, transport_message: Option<&str>, fallback: &str) -> String {
    match payload.and_then(|body| body.get("message")) {
        Some(Value::Array(parts)) => {
            return parts
                .iter()
                .map(|part| match part {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n");
        }
        Some(Value::String(message)) => return message.clone(),
        _ => {}
    }

    match transport_message {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => fallback.to_string(),
    }
}

fn raw_payload(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
