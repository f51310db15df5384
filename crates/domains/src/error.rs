//! # ActionError
//!
//! The failure taxonomy for every action. Two tiers matter to callers:
//! input-shape violations carry per-field messages, everything else carries a
//! single message. None of these escape the action boundary as a panic.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const EMAIL_TAKEN: &str = "This email address is already in use";
pub const USER_MISSING: &str = "User does not exist";
pub const POST_MISSING: &str = "Post does not exist";
pub const AUTHOR_MISSING: &str = "Author does not exist";
pub const ADMIN_ONLY: &str = "Permission denied: only administrators can delete users";
/// The stored record moved on between read and write.
pub const USER_CHANGED: &str = "User was modified concurrently";

/// Field name to the ordered list of violations found for it.
///
/// Fields keep the order in which their first violation was recorded, which
/// is the order the schema declares them. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        match self.0.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message.into()),
            None => self.0.push((field.to_owned(), vec![message.into()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldErrorsVisitor;

        impl<'de> Visitor<'de> for FieldErrorsVisitor {
            type Value = FieldErrors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to message lists")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields: Vec<(String, Vec<String>)> = Vec::new();
                while let Some((field, messages)) = access.next_entry::<String, Vec<String>>()? {
                    match fields.iter_mut().find(|(name, _)| *name == field) {
                        Some((_, existing)) => existing.extend(messages),
                        None => fields.push((field, messages)),
                    }
                }
                Ok(FieldErrors(fields))
            }
        }

        deserializer.deserialize_map(FieldErrorsVisitor)
    }
}

/// The primary error type for all action operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Input did not satisfy the declared schema.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    /// A uniqueness rule was violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced parent entity does not exist.
    #[error("missing parent: {0}")]
    MissingParent(String),

    /// The target of a delete, update or toggle does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The acting user lacks the role an action requires.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Store failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// The single human-readable message, or `None` for validation failures.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Validation(_) => None,
            Self::Conflict(m)
            | Self::MissingParent(m)
            | Self::NotFound(m)
            | Self::Forbidden(m)
            | Self::Internal(m) => Some(m),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// A specialized Result type for action logic.
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_accumulate_per_field_in_order() {
        let mut errors = FieldErrors::new();
        errors.push("name", "too short");
        errors.push("name", "bad characters");
        errors.push("email", "invalid");
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("name").unwrap(),
            &["too short".to_string(), "bad characters".to_string()]
        );
    }

    #[test]
    fn fields_keep_first_seen_order() {
        let mut errors = FieldErrors::new();
        errors.push("title", "Please enter a title");
        errors.push("content", "too short");
        errors.push("title", "again");
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["title", "content"]);

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            json,
            r#"{"title":["Please enter a title","again"],"content":["too short"]}"#
        );
        let back: FieldErrors = serde_json::from_str(&json).unwrap();
        assert_eq!(back, errors);
    }

    #[test]
    fn validation_has_no_single_message() {
        let err = ActionError::Validation(FieldErrors::new());
        assert!(err.message().is_none());
        assert_eq!(
            ActionError::NotFound("Post does not exist".into()).message(),
            Some("Post does not exist")
        );
    }
}
