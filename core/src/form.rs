//! Create/edit form state, validation and conversion to request payloads.
//!
//! `UserForm` keeps raw text exactly as typed. `validate` reports every
//! failing field at once, keyed by `FormField`, with the console's messages.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::cpf::{format_cpf_input, Cpf, CpfError};
use crate::types::{parse_calendar_date, CreateUser, Gender, UpdateUser, UserRecord};

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const NAME_REQUIRED: &str = "Nome é obrigatório";
const BIRTH_DATE_REQUIRED: &str = "Data de nascimento é obrigatória";
const BIRTH_DATE_INVALID: &str = "Data de nascimento inválida";
const EMAIL_INVALID: &str = "Email deve ter um formato válido";
const GENDER_INVALID: &str = "Gênero inválido";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Name,
    Cpf,
    BirthDate,
    Email,
    Gender,
}

impl FormField {
    /// Wire/input name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Cpf => "cpf",
            FormField::BirthDate => "birthDate",
            FormField::Email => "email",
            FormField::Gender => "gender",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<FormField, String>,
}

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.values().map(String::as_str).collect();
        f.write_str(&messages.join("\n"))
    }
}

impl std::error::Error for FormErrors {}

/// Raw form inputs. Empty strings mean "not filled in".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub name: String,
    pub gender: String,
    pub email: String,
    pub birth_date: String,
    pub place_of_birth: String,
    pub nationality: String,
    pub cpf: String,
}

/// Fields that passed validation, in typed form.
struct Validated {
    cpf: Option<Cpf>,
    birth_date: NaiveDate,
    gender: Option<Gender>,
}

impl UserForm {
    /// Pre-fill the edit form from an existing record.
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            gender: record.gender.map(|g| g.as_str().to_string()).unwrap_or_default(),
            email: record.email.clone().unwrap_or_default(),
            birth_date: record.birth_date.format("%Y-%m-%d").to_string(),
            place_of_birth: record.place_of_birth.clone().unwrap_or_default(),
            nationality: record.nationality.clone().unwrap_or_default(),
            cpf: record.cpf.formatted(),
        }
    }

    /// Apply the CPF input mask to whatever was typed.
    pub fn set_cpf_input(&mut self, input: &str) {
        self.cpf = format_cpf_input(input);
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        self.check(true).map(|_| ())
    }

    pub fn into_create_user(self) -> Result<CreateUser, FormErrors> {
        let Validated {
            cpf: Some(cpf),
            birth_date,
            gender,
        } = self.check(true)?
        else {
            let mut errors = FormErrors::default();
            errors.insert(FormField::Cpf, CpfError::Empty.to_string());
            return Err(errors);
        };
        Ok(CreateUser::new(self.name.trim(), cpf, birth_date)
            .gender(gender)
            .email(self.email)
            .place_of_birth(self.place_of_birth)
            .nationality(self.nationality))
    }

    /// The CPF is not resent on edit, so it is not validated here either.
    pub fn into_update_user(self) -> Result<UpdateUser, FormErrors> {
        let validated = self.check(false)?;
        Ok(UpdateUser::new()
            .name(self.name.trim())
            .birth_date(validated.birth_date)
            .gender(validated.gender)
            .email(self.email)
            .place_of_birth(self.place_of_birth)
            .nationality(self.nationality))
    }

    fn check(&self, require_cpf: bool) -> Result<Validated, FormErrors> {
        let mut errors = FormErrors::default();

        if self.name.trim().is_empty() {
            errors.insert(FormField::Name, NAME_REQUIRED);
        }

        let cpf = if require_cpf {
            match Cpf::parse(&self.cpf) {
                Ok(cpf) => Some(cpf),
                Err(err) => {
                    errors.insert(FormField::Cpf, err.to_string());
                    None
                }
            }
        } else {
            None
        };

        let birth_date = if self.birth_date.trim().is_empty() {
            errors.insert(FormField::BirthDate, BIRTH_DATE_REQUIRED);
            None
        } else {
            let parsed = parse_calendar_date(&self.birth_date);
            if parsed.is_none() {
                errors.insert(FormField::BirthDate, BIRTH_DATE_INVALID);
            }
            parsed
        };

        if !self.email.is_empty() && !EMAIL_SHAPE.is_match(&self.email) {
            errors.insert(FormField::Email, EMAIL_INVALID);
        }

        let gender = if self.gender.is_empty() {
            None
        } else {
            match self.gender.parse::<Gender>() {
                Ok(gender) => Some(gender),
                Err(_) => {
                    errors.insert(FormField::Gender, GENDER_INVALID);
                    None
                }
            }
        };

        match birth_date {
            Some(birth_date) if errors.is_empty() => Ok(Validated { cpf, birth_date, gender }),
            _ => Err(errors),
        }
    }
}
