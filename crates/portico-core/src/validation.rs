//! Form validation.
//!
//! A [`Validator`] checks the fields of a submitted form against chained
//! rules and collects one message per failing field. Rules other than
//! [`required`](Validator::required) only look at fields that were sent,
//! so an optional field may be left out.
//!
//! # Example
//!
//! ```rust
//! use portico_core::types::FormData;
//! use portico_core::validation::Validator;
//!
//! let mut form = FormData::new();
//! form.insert("email".into(), "not-an-email".into());
//!
//! let errors = Validator::new(&form)
//!     .required("name", None)
//!     .email("email", None)
//!     .finish()
//!     .unwrap_err();
//!
//! assert_eq!(errors.get("name"), Some("The name field is required."));
//! assert!(errors.get("email").is_some());
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use crate::types::FormData;

/// Per-field messages of a failed validation, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// The message of `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Records a failure for `field` unless it already has one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Whether no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Failing fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Chained rules over one form.
///
/// The first failing rule of a field sets its message; later rules for the
/// same field do not override it.
#[derive(Debug)]
pub struct Validator<'a> {
    data: &'a FormData,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    /// Starts validating `data`.
    #[must_use]
    pub fn new(data: &'a FormData) -> Self {
        Self {
            data,
            errors: ValidationErrors::default(),
        }
    }

    fn value(&self, field: &str) -> Option<&'a str> {
        self.data.get(field).map(String::as_str)
    }

    fn check(
        mut self,
        field: &str,
        passes: impl FnOnce(&str) -> bool,
        message: Option<&str>,
        default: impl FnOnce() -> String,
    ) -> Self {
        if let Some(value) = self.value(field) {
            if !passes(value) {
                let message = message.map_or_else(default, str::to_string);
                self.errors.add(field, message);
            }
        }
        self
    }

    /// The field is present and not blank.
    #[must_use]
    pub fn required(mut self, field: &str, message: Option<&str>) -> Self {
        if self.value(field).map_or(true, |v| v.trim().is_empty()) {
            let message = message.map_or_else(
                || format!("The {field} field is required."),
                str::to_string,
            );
            self.errors.add(field, message);
        }
        self
    }

    /// The field looks like an email address.
    #[must_use]
    pub fn email(self, field: &str, message: Option<&str>) -> Self {
        self.check(field, is_email, message, || {
            format!("The {field} field must be a valid email address.")
        })
    }

    /// The field has at least `length` characters.
    #[must_use]
    pub fn min(self, field: &str, length: usize, message: Option<&str>) -> Self {
        self.check(
            field,
            |v| v.chars().count() >= length,
            message,
            || format!("The {field} field must be at least {length} characters."),
        )
    }

    /// The field has at most `length` characters.
    #[must_use]
    pub fn max(self, field: &str, length: usize, message: Option<&str>) -> Self {
        self.check(
            field,
            |v| v.chars().count() <= length,
            message,
            || format!("The {field} field must not exceed {length} characters."),
        )
    }

    /// The field parses as a number.
    #[must_use]
    pub fn numeric(self, field: &str, message: Option<&str>) -> Self {
        self.check(
            field,
            |v| v.trim().parse::<f64>().is_ok_and(f64::is_finite),
            message,
            || format!("The {field} field must be numeric."),
        )
    }

    /// The field matches `pattern`.
    #[must_use]
    pub fn pattern(self, field: &str, pattern: &Regex, message: Option<&str>) -> Self {
        self.check(
            field,
            |v| pattern.is_match(v),
            message,
            || format!("The {field} field has an invalid format."),
        )
    }

    /// The field equals `other`. Nothing is checked unless both were sent.
    #[must_use]
    pub fn matches(self, field: &str, other: &str, message: Option<&str>) -> Self {
        let Some(expected) = self.value(other) else {
            return self;
        };
        self.check(
            field,
            |v| v == expected,
            message,
            || format!("The {field} field must match {other}."),
        )
    }

    /// The field is one of `options`.
    #[must_use]
    pub fn in_list(self, field: &str, options: &[&str], message: Option<&str>) -> Self {
        self.check(
            field,
            |v| options.contains(&v),
            message,
            || format!("The {field} field has an invalid value."),
        )
    }

    /// The field passes a custom check.
    #[must_use]
    pub fn rule(self, field: &str, passes: impl FnOnce(&str) -> bool, message: &str) -> Self {
        self.check(field, passes, Some(message), String::new)
    }

    /// Adds a failure decided outside the rule set, such as a uniqueness check.
    #[must_use]
    pub fn fail(mut self, field: &str, message: &str) -> Self {
        self.errors.add(field, message);
        self
    }

    /// Whether every rule passed so far.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The collected errors, or `Ok` when there are none.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationErrors`] when any rule failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// `local@domain.tld`, without whitespace, with a dotted domain.
fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}
