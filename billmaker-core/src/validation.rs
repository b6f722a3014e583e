//! Validation System - closed validator registry
//!
//! Validators are pure `&str -> ValidationOutcome` checks selected by
//! `ValidatorKind`. Every validator except `Required` accepts an empty
//! value; required-ness is opt-in per field.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-+()]{10,}$").expect("Invalid regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(\.\d*)?|\.\d+)$").expect("Invalid regex"));

// 2 digits, 5 letters, 4 digits, 1 letter, 1 alphanumeric, literal Z, 1 alphanumeric.
static GSTIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][0-9A-Z]Z[0-9A-Z]$").expect("Invalid regex")
});

static PINCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("Invalid regex"));

/// Result of one validator applied to one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub message: String,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidatorKind {
    Required,
    Email,
    Phone,
    Number,
    Gstin,
    Pincode,
    MinLength(usize),
    MaxLength(usize),
}

impl ValidatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValidatorKind::Required => "required",
            ValidatorKind::Email => "email",
            ValidatorKind::Phone => "phone",
            ValidatorKind::Number => "number",
            ValidatorKind::Gstin => "gstin",
            ValidatorKind::Pincode => "pincode",
            ValidatorKind::MinLength(_) => "minLength",
            ValidatorKind::MaxLength(_) => "maxLength",
        }
    }

    pub fn validate(&self, value: &str) -> ValidationOutcome {
        let value = value.trim();
        match self {
            ValidatorKind::Required => required(value),
            _ if value.is_empty() => ValidationOutcome::pass(),
            ValidatorKind::Email => matches(&EMAIL, value, "Please enter a valid email address"),
            ValidatorKind::Phone => matches(&PHONE, value, "Please enter a valid phone number"),
            ValidatorKind::Number => matches(&NUMBER, value, "Please enter a valid number"),
            ValidatorKind::Gstin => matches(&GSTIN, value, "Please enter a valid GSTIN"),
            ValidatorKind::Pincode => {
                matches(&PINCODE, value, "Please enter a valid 6-digit PIN code")
            }
            ValidatorKind::MinLength(min) => {
                if value.chars().count() < *min {
                    ValidationOutcome::fail(format!("Must be at least {min} characters"))
                } else {
                    ValidationOutcome::pass()
                }
            }
            ValidatorKind::MaxLength(max) => {
                if value.chars().count() > *max {
                    ValidationOutcome::fail(format!("Must be at most {max} characters"))
                } else {
                    ValidationOutcome::pass()
                }
            }
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorKind::MinLength(n) | ValidatorKind::MaxLength(n) => {
                write!(f, "{}({})", self.name(), n)
            }
            _ => f.write_str(self.name()),
        }
    }
}

fn required(value: &str) -> ValidationOutcome {
    if value.is_empty() {
        ValidationOutcome::fail("This field is required")
    } else {
        ValidationOutcome::pass()
    }
}

fn matches(pattern: &Regex, value: &str, message: &str) -> ValidationOutcome {
    if pattern.is_match(value) {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(message)
    }
}

/// Run `validators` in declaration order and stop at the first failure.
pub fn first_failure(validators: &[ValidatorKind], value: &str) -> Option<ValidationOutcome> {
    validators
        .iter()
        .map(|v| v.validate(value))
        .find(|outcome| !outcome.valid)
}

/// Aggregated outcome of validating a whole form: one message per invalid field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValidation {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl FormValidation {
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    pub fn failure(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
