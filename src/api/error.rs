//! Maps [`Error`] onto `{code, message, details}` JSON responses.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Message shown for every 5xx response.
const INTERNAL_MESSAGE: &str = "Internal server error";

fn details(error: &Error) -> Option<Value> {
    match error {
        Error::Validation { issues, .. } => Some(json!({ "issues": issues })),
        Error::ForeignRelationInvalid { field } => Some(json!({ "field": field })),
        _ => None,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = %self, code = self.code(), "Request failed");
            INTERNAL_MESSAGE.to_string()
        };

        let mut body = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = details(&self) {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_field("query", rejection.body_text())
    }
}
