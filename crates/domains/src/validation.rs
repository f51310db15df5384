//! # Validation
//!
//! A small declarative rule builder over [`FormData`]. Rules for one field
//! run in the order they are declared; every violation is recorded, so a
//! caller sees all problems with a submission at once.
//!
//! ```
//! use domains::{FormData, Validator};
//!
//! let form = FormData::new().with("title", "");
//! let mut v = Validator::new(&form);
//! v.text("title").min_len(1, "Title is required").max_len(100, "Title is too long");
//! let errors = v.finish().unwrap_err();
//! assert!(errors.field_errors().unwrap().contains("title"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ActionError, FieldErrors, Result};
use crate::form::{FormData, FormValue};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    // Loose: one `@`, no whitespace, a dot in the domain part.
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

pub struct Validator<'f> {
    form: &'f FormData,
    errors: FieldErrors,
}

impl<'f> Validator<'f> {
    pub fn new(form: &'f FormData) -> Self {
        Self {
            form,
            errors: FieldErrors::new(),
        }
    }

    /// Rules for a required text field. A missing field records `Required`.
    pub fn text<'v>(&'v mut self, field: &'v str) -> TextRules<'v, 'f> {
        let value = self.read_text(field, true);
        TextRules {
            validator: self,
            field,
            value,
        }
    }

    /// Rules for a text field that is only checked when supplied.
    pub fn optional_text<'v>(&'v mut self, field: &'v str) -> TextRules<'v, 'f> {
        let value = self.read_text(field, false);
        TextRules {
            validator: self,
            field,
            value,
        }
    }

    pub fn number<'v>(&'v mut self, field: &'v str) -> NumberRules<'v, 'f> {
        let value = match self.form.get(field) {
            None => {
                self.errors.push(field, "Required");
                None
            }
            Some(_) => match self.form.number(field) {
                Some(n) => Some(n),
                None => {
                    self.errors.push(field, "Expected a number");
                    None
                }
            },
        };
        NumberRules {
            validator: self,
            field,
            value,
        }
    }

    /// A boolean field. When `required` is false a missing field is accepted
    /// (callers treat it as `false`).
    pub fn flag(&mut self, field: &str, required: bool) -> &mut Self {
        match self.form.get(field) {
            None if required => self.errors.push(field, "Required"),
            None => {}
            Some(_) => {
                if self.form.flag(field).is_none() {
                    self.errors.push(field, "Expected a boolean");
                }
            }
        }
        self
    }

    pub fn list<'v>(&'v mut self, field: &'v str) -> ListRules<'v, 'f> {
        let len = self.form.list(field).len();
        ListRules {
            validator: self,
            field,
            len,
        }
    }

    /// Records an arbitrary violation against `field`.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(field, message);
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ActionError::Validation(self.errors))
        }
    }

    fn read_text(&mut self, field: &str, required: bool) -> Option<&'f str> {
        let form = self.form;
        match form.get(field) {
            None => {
                if required {
                    self.errors.push(field, "Required");
                }
                None
            }
            Some(FormValue::Text(s)) => Some(s.as_str()),
            Some(_) => {
                self.errors.push(field, "Expected text");
                None
            }
        }
    }
}

pub struct TextRules<'v, 'f> {
    validator: &'v mut Validator<'f>,
    field: &'v str,
    value: Option<&'f str>,
}

impl<'v, 'f> TextRules<'v, 'f> {
    pub fn min_len(self, min: usize, message: &str) -> Self {
        self.check(|v| v.chars().count() >= min, message)
    }

    pub fn max_len(self, max: usize, message: &str) -> Self {
        self.check(|v| v.chars().count() <= max, message)
    }

    pub fn email(self, message: &str) -> Self {
        self.check(is_valid_email, message)
    }

    pub fn one_of(self, allowed: &[&str], message: &str) -> Self {
        self.check(|v| allowed.iter().any(|candidate| *candidate == v), message)
    }

    fn check(self, rule: impl Fn(&str) -> bool, message: &str) -> Self {
        if let Some(value) = self.value {
            if !rule(value) {
                self.validator.errors.push(self.field, message);
            }
        }
        self
    }
}

pub struct NumberRules<'v, 'f> {
    validator: &'v mut Validator<'f>,
    field: &'v str,
    value: Option<f64>,
}

impl<'v, 'f> NumberRules<'v, 'f> {
    /// Inclusive range.
    pub fn range(self, min: f64, max: f64, message: &str) -> Self {
        if let Some(n) = self.value {
            if n < min || n > max {
                self.validator.errors.push(self.field, message);
            }
        }
        self
    }

    pub fn integer(self, message: &str) -> Self {
        if let Some(n) = self.value {
            if n.fract() != 0.0 {
                self.validator.errors.push(self.field, message);
            }
        }
        self
    }
}

pub struct ListRules<'v, 'f> {
    validator: &'v mut Validator<'f>,
    field: &'v str,
    len: usize,
}

impl<'v, 'f> ListRules<'v, 'f> {
    pub fn max_items(self, max: usize, message: &str) -> Self {
        if self.len > max {
            self.validator.errors.push(self.field, message);
        }
        self
    }
}
