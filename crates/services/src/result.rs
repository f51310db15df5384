//! The structured result every action surfaces to its caller.

use domains::{ActionError, FieldErrors};
use serde::Serialize;

/// `{ success, data?, error?, validationErrors? }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<FieldErrors>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            validation_errors: None,
        }
    }

    pub fn failed(err: ActionError) -> Self {
        match err {
            ActionError::Validation(errors) => Self {
                success: false,
                data: None,
                error: None,
                validation_errors: Some(errors),
            },
            other => Self {
                success: false,
                data: None,
                error: other.message().map(str::to_owned),
                validation_errors: None,
            },
        }
    }
}

impl<T> From<Result<T, ActionError>> for ActionResult<T> {
    fn from(result: Result<T, ActionError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_use_the_field_map() {
        let mut errors = FieldErrors::new();
        errors.push("title", "Title is required");
        let result: ActionResult<()> = Err(ActionError::Validation(errors)).into();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["validationErrors"]["title"][0], "Title is required");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn domain_failures_use_a_single_message() {
        let result: ActionResult<()> =
            Err(ActionError::Conflict("Email already in use".into())).into();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "Email already in use");
        assert!(json.get("validationErrors").is_none());
    }

    #[test]
    fn success_carries_data() {
        let json = serde_json::to_value(ActionResult::ok(7)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 7 }));
    }
}
