use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use peerfund_directory::FieldError;
use peerfund_infra::command_dispatcher::DispatchError;
use peerfund_infra::directory::DirectoryError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        // Business-rule failures are client errors with their specific message.
        DispatchError::RuleViolation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "rule_violation", msg)
        }
        DispatchError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized")
        }
        DispatchError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DispatchError::Deserialize(_)
        | DispatchError::Store(_)
        | DispatchError::StreamIsolation(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error")
        }
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    match err {
        DirectoryError::DuplicateIdentity | DirectoryError::DuplicateBankKeys => {
            json_error(StatusCode::BAD_REQUEST, "rule_violation", err.to_string())
        }
        DirectoryError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DirectoryError::Unavailable => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error")
        }
    }
}

/// Field-level validation failures: report every bad field at once.
pub fn validation_errors_to_response(fields: Vec<FieldError>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "fields": fields,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
