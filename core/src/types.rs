//! Domain DTOs for the users API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch schema drift between the two crates. Wire names
//! are camelCase except for the login response, which uses `access_token`
//! and `user`.
//!
//! Request payloads (`CreateUser`, `UpdateUser`) are builders with private
//! fields: an optional field is only stored when it is non-empty, so blank
//! form inputs never reach the server as `""`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::cpf::Cpf;

/// A user record as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub cpf: Cpf,
    #[serde(deserialize_with = "calendar_date")]
    pub birth_date: NaiveDate,
    #[serde(default, deserialize_with = "non_blank", skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "non_blank", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "non_blank", skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, deserialize_with = "non_blank", skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    /// Display label used by the console.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Masculino",
            Gender::Female => "Feminino",
            Gender::Other => "Outro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGender(pub String);

impl fmt::Display for UnknownGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gender code {:?}", self.0)
    }
}

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "O" => Ok(Gender::Other),
            other => Err(UnknownGender(other.to_string())),
        }
    }
}

/// Login request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: bearer token plus the minimal user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(rename = "user", alias = "profile")]
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
}

/// Canonical result of a list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: usize,
    /// Informational message from the envelope, when the server sends one.
    pub message: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
            message: None,
        }
    }
}

pub type UserPage = Page<UserRecord>;

/// Request payload for creating a user.
///
/// Required fields go through `new`; optional setters ignore empty strings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    name: String,
    cpf: Cpf,
    birth_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nationality: Option<String>,
}

impl CreateUser {
    pub fn new(name: impl Into<String>, cpf: Cpf, birth_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            cpf,
            birth_date,
            gender: None,
            email: None,
            place_of_birth: None,
            nationality: None,
        }
    }

    pub fn gender(mut self, gender: Option<Gender>) -> Self {
        self.gender = gender;
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = present(email);
        self
    }

    pub fn place_of_birth(mut self, place_of_birth: impl Into<String>) -> Self {
        self.place_of_birth = present(place_of_birth);
        self
    }

    pub fn nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = present(nationality);
        self
    }
}

/// Request payload for updating a user. Only the fields that were set (and
/// non-empty) are serialized; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpf: Option<Cpf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nationality: Option<String>,
}

impl UpdateUser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = present(name);
        self
    }

    pub fn cpf(mut self, cpf: Cpf) -> Self {
        self.cpf = Some(cpf);
        self
    }

    pub fn birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn gender(mut self, gender: Option<Gender>) -> Self {
        if gender.is_some() {
            self.gender = gender;
        }
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = present(email);
        self
    }

    pub fn place_of_birth(mut self, place_of_birth: impl Into<String>) -> Self {
        self.place_of_birth = present(place_of_birth);
        self
    }

    pub fn nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = present(nationality);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn present(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    (!value.is_empty()).then_some(value)
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as an ISO
/// timestamp, keeping only the date part.
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let date_part = input.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// `dd/mm/yyyy`, as shown in the user list.
pub fn format_birth_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn calendar_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid calendar date {raw:?}")))
}

/// `null`, missing and blank strings all become `None`.
fn non_blank<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}
