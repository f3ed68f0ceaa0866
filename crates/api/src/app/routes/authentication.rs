use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use peerfund_auth::{PrincipalId, Role, generate_reset_token, hash_password, verify_password};
use peerfund_core::UserId;
use peerfund_directory::{UserProfile, validate_signup};
use peerfund_infra::directory::{DirectoryStore, ResetToken};

use crate::app::services::{AppServices, RegistrationError};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/login", post(login))
        .route("/reset", post(reset))
        .route("/password-reset/:user_id/:token", post(password_reset))
        .route("/admin/login", post(admin_login))
}

async fn sign_up(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SignUpRequest>,
) -> axum::response::Response {
    if let Err(fields) = validate_signup(&body.username, &body.email, &body.password) {
        return errors::validation_errors_to_response(fields);
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("password hashing failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error",
            );
        }
    };

    let profile = UserProfile::new(
        UserId::new(),
        body.username.trim().to_string(),
        body.email,
        password_hash,
        Utc::now(),
    );
    let user_id = profile.user_id;
    let username = profile.username.clone();
    let email = profile.email.clone();

    match services.register_user(profile) {
        Ok(()) => {}
        Err(RegistrationError::Directory(e)) => return errors::directory_error_to_response(e),
        Err(RegistrationError::Ledger(e)) => return errors::dispatch_error_to_response(e),
    }

    let token = match services.issue_token(user_id.into(), vec![Role::new("user")]) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error",
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "username": username,
            "email": email,
        })),
    )
        .into_response()
}

async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let Some(user) = services.directory().find_user_by_email(&body.email) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Input correct credentials");
    };

    if !verify_password(&body.password, &user.password_hash) {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "rule_violation",
            "Input correct credentials",
        );
    }

    let token = match services.issue_token(user.user_id.into(), vec![Role::new("user")]) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error",
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "username": user.username,
            "email": user.email,
        })),
    )
        .into_response()
}

async fn reset(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ResetRequest>,
) -> axum::response::Response {
    let Some(user) = services.directory().find_user_by_email(&body.email) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Input correct credentials");
    };

    let token = generate_reset_token();
    if let Err(e) = services.directory().put_reset_token(ResetToken {
        user_id: user.user_id,
        token: token.clone(),
        created_at: Utc::now(),
    }) {
        return errors::directory_error_to_response(e);
    }

    let link = format!(
        "{}/authenticate/password-reset/{}/{}",
        services.base_url(),
        user.user_id,
        token
    );
    if let Err(e) = services.mailer().send(&user.email, "Password reset", &link) {
        tracing::error!("reset mail delivery failed: {e}");
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal Server Error",
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "password reset link sent to your email account",
        })),
    )
        .into_response()
}

async fn password_reset(
    Extension(services): Extension<Arc<AppServices>>,
    Path((user_id, token)): Path<(String, String)>,
    Json(body): Json<dto::PasswordResetRequest>,
) -> axum::response::Response {
    if body.password.trim().chars().count() < 5 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Enter a valid password",
        );
    }

    let Ok(user_id) = user_id.parse::<UserId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id");
    };

    if services.directory().find_user_by_id(user_id).is_none()
        || !services.directory().take_reset_token(user_id, &token)
    {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "rule_violation",
            "invalid or expired link",
        );
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("password hashing failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error",
            );
        }
    };

    if let Err(e) = services.directory().update_password(user_id, password_hash) {
        return errors::directory_error_to_response(e);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "password reset successful" })),
    )
        .into_response()
}

async fn admin_login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    if !services.admin_credentials_match(&body.email, &body.password) {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Input correct credentials");
    }

    let token = match services.issue_token(PrincipalId::new(), vec![Role::new("admin")]) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal Server Error",
            );
        }
    };

    (StatusCode::OK, Json(serde_json::json!({ "token": token }))).into_response()
}
