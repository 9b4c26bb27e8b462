//! Purpose: Field-level and cross-record validation for contact form values.
//! Exports: `Field`, `FieldResult`, `FieldErrors`, `validate_field`, `validate_draft`,
//! `is_valid_email`.
//! Role: Pure functions; never touches the network or store state.
//! Invariants: Results are a deterministic function of the inputs.
//! Invariants: Email syntax is checked before the duplicate check.
use super::error::{Error, ErrorKind};
use super::record::{Contact, ContactDraft, ContactId};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const MIN_PHONE_LEN: usize = 10;

pub const MSG_FULL_NAME_REQUIRED: &str = "Please enter a full name.";
pub const MSG_EMAIL_REQUIRED: &str = "Please enter an email address.";
pub const MSG_EMAIL_INVALID: &str = "Please enter a valid email address.";
pub const MSG_EMAIL_DUPLICATE: &str = "A contact with this email already exists.";
pub const MSG_PHONE_INVALID: &str = "Please enter a valid phone number.";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Field {
    FullName,
    Email,
    Phone,
    Address,
    Avatar,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::Address,
        Field::Avatar,
    ];

    /// Form field name as the presentation layer knows it.
    pub fn name(self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Address => "address",
            Field::Avatar => "avatar",
        }
    }

    pub fn value(self, draft: &ContactDraft) -> &str {
        match self {
            Field::FullName => &draft.full_name,
            Field::Email => &draft.email,
            Field::Phone => &draft.phone,
            Field::Address => &draft.address,
            Field::Avatar => &draft.avatar,
        }
    }

    pub fn value_mut(self, draft: &mut ContactDraft) -> &mut String {
        match self {
            Field::FullName => &mut draft.full_name,
            Field::Email => &mut draft.email,
            Field::Phone => &mut draft.phone,
            Field::Address => &mut draft.address,
            Field::Avatar => &mut draft.avatar,
        }
    }

    // Only these fields get a positive "valid" marker in the form.
    fn marks_valid(self) -> bool {
        matches!(self, Field::FullName | Field::Email | Field::Phone)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fullName" | "full_name" => Ok(Field::FullName),
            "email" => Ok(Field::Email),
            "phone" => Ok(Field::Phone),
            "address" => Ok(Field::Address),
            "avatar" => Ok(Field::Avatar),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown contact field `{other}`"))
                .with_hint("Use one of: fullName, email, phone, address, avatar.")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldResult {
    Valid,
    Invalid(String),
}

impl FieldResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldResult::Valid)
    }

    fn invalid(message: &str) -> Self {
        FieldResult::Invalid(message.to_string())
    }
}

/// Derived per-field state for one form session.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldErrors {
    errors: BTreeMap<Field, String>,
    valid: BTreeSet<Field>,
}

impl FieldErrors {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_marked_valid(&self, field: Field) -> bool {
        self.valid.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }

    /// Replace the state of one field with a fresh result.
    pub fn record(&mut self, field: Field, value: &str, result: FieldResult) {
        match result {
            FieldResult::Valid => {
                self.errors.remove(&field);
                if field.marks_valid() && !value.is_empty() {
                    self.valid.insert(field);
                } else {
                    self.valid.remove(&field);
                }
            }
            FieldResult::Invalid(message) => {
                self.errors.insert(field, message);
                self.valid.remove(&field);
            }
        }
    }

    /// Collapse into a single error naming the first invalid field.
    pub fn to_error(&self) -> Option<Error> {
        let (field, message) = self.iter().next()?;
        let mut err = Error::new(ErrorKind::Validation)
            .with_message(message.to_string())
            .with_field(field.name());
        if self.len() > 1 {
            err = err.with_hint(format!("{} fields need attention.", self.len()));
        }
        Some(err)
    }
}

pub fn validate_field(
    field: Field,
    value: &str,
    existing: &[Contact],
    excluded_id: Option<&ContactId>,
) -> FieldResult {
    match field {
        Field::FullName => {
            if value.trim().is_empty() {
                FieldResult::invalid(MSG_FULL_NAME_REQUIRED)
            } else {
                FieldResult::Valid
            }
        }
        Field::Email => {
            if value.trim().is_empty() {
                FieldResult::invalid(MSG_EMAIL_REQUIRED)
            } else if !is_valid_email(value) {
                FieldResult::invalid(MSG_EMAIL_INVALID)
            } else if is_duplicate_email(value, existing, excluded_id) {
                FieldResult::invalid(MSG_EMAIL_DUPLICATE)
            } else {
                FieldResult::Valid
            }
        }
        Field::Phone => {
            if !value.is_empty() && value.chars().count() < MIN_PHONE_LEN {
                FieldResult::invalid(MSG_PHONE_INVALID)
            } else {
                FieldResult::Valid
            }
        }
        Field::Address | Field::Avatar => FieldResult::Valid,
    }
}

pub fn validate_draft(draft: &ContactDraft, existing: &[Contact]) -> FieldErrors {
    let mut errors = FieldErrors::default();
    for field in Field::ALL {
        let value = field.value(draft);
        let result = validate_field(field, value, existing, draft.id.as_ref());
        errors.record(field, value, result);
    }
    errors
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        // Something, an `@`, something, a dot, something; no whitespace or extra `@`.
        let pattern = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

fn is_duplicate_email(value: &str, existing: &[Contact], excluded_id: Option<&ContactId>) -> bool {
    let needle = value.to_lowercase();
    existing
        .iter()
        .filter(|contact| Some(&contact.id) != excluded_id)
        .any(|contact| contact.email.to_lowercase() == needle)
}
