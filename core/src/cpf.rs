//! Brazilian taxpayer identifier (CPF).
//!
//! Stored as exactly 11 ASCII digits; punctuation only appears in
//! `formatted()`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const CPF_DIGITS: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpfError {
    #[error("CPF é obrigatório")]
    Empty,

    #[error("CPF deve ter 11 dígitos")]
    Length(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl Cpf {
    /// Strip every non-digit and require exactly 11 digits.
    pub fn parse(input: &str) -> Result<Self, CpfError> {
        if input.trim().is_empty() {
            return Err(CpfError::Empty);
        }
        let digits = digits_only(input);
        if digits.len() != CPF_DIGITS {
            return Err(CpfError::Length(digits.len()));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `000.000.000-00`
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Cpf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cpf {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Live input mask for a CPF text field.
///
/// Exactly 11 digits are rendered as `000.000.000-00`, fewer are returned as
/// bare digits, and anything longer is returned untouched.
pub fn format_cpf_input(input: &str) -> String {
    let digits = digits_only(input);
    match digits.len() {
        CPF_DIGITS => Cpf(digits).formatted(),
        n if n < CPF_DIGITS => digits,
        _ => input.to_string(),
    }
}

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}
