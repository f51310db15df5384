//! Turning action outcomes into HTTP responses, and reading form input.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use domains::{ActionError, FormData, Result};
use serde::Serialize;
use services::ActionResult;

/// Status code for a failed action.
pub fn status_of(err: &ActionError) -> StatusCode {
    match err {
        ActionError::Validation(_) | ActionError::MissingParent(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ActionError::Conflict(_) => StatusCode::CONFLICT,
        ActionError::NotFound(_) => StatusCode::NOT_FOUND,
        ActionError::Forbidden(_) => StatusCode::FORBIDDEN,
        ActionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wraps `result` in the `ActionResult` envelope; `ok` is the success status.
pub fn respond<T: Serialize>(result: Result<T>, ok: StatusCode) -> Response {
    let status = match &result {
        Ok(_) => ok,
        Err(err) => status_of(err),
    };
    (status, Json(ActionResult::from(result))).into_response()
}

/// A malformed body or query string, reported in the same envelope.
pub fn bad_request(message: impl Into<String>) -> Response {
    let envelope = ActionResult::<()> {
        success: false,
        data: None,
        error: Some(message.into()),
        validation_errors: None,
    };
    (StatusCode::BAD_REQUEST, Json(envelope)).into_response()
}

/// Form input accepted as either a JSON object or a URL-encoded body.
#[derive(Debug, Clone)]
pub struct ActionForm(pub FormData);

impl<S> FromRequest<S> for ActionForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(form) = Json::<FormData>::from_request(req, state)
                .await
                .map_err(|rejection: JsonRejection| bad_request(rejection.body_text()))?;
            Ok(Self(form))
        } else {
            let Form(form) = Form::<FormData>::from_request(req, state)
                .await
                .map_err(|rejection: FormRejection| bad_request(rejection.body_text()))?;
            Ok(Self(form))
        }
    }
}
