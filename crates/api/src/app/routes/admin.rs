use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;

use peerfund_auth::Permission;
use peerfund_core::UserId;
use peerfund_infra::directory::DirectoryStore;
use peerfund_ledger::{
    BlockAccount, IncrementAllotedAmt, IncrementLockedAmt, LedgerCommand, SetAllotedAmt,
    SetLockedAmt, SettleWithdrawal, UnblockAccount,
};

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/bank-details", get(get_user_bank_details))
        .route("/users/:id/ledger", get(get_user_ledger))
        .route("/users/:id/block", post(block_user))
        .route("/users/:id/unblock", post(unblock_user))
        .route("/users/:id/withdrawals/settle", post(settle_withdrawal))
        .route("/balances/alloted", put(set_alloted))
        .route("/balances/alloted/increments", post(increment_alloted))
        .route("/balances/locked", put(set_locked))
        .route("/balances/locked/increments", post(increment_locked))
}

/// Gate a read-only admin operation behind a permission.
fn guard_read(
    caller: &CallerContext,
    permission: &'static str,
) -> Result<(), axum::response::Response> {
    let auth = CmdAuth { inner: (), required: vec![Permission::new(permission)] };
    crate::authz::authorize_command(caller, &auth)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

fn parse_user_id(id: &str) -> Result<UserId, axum::response::Response> {
    id.parse::<UserId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"))
}

/// Resolve the target of an email-addressed balance edit.
fn user_by_email(
    services: &AppServices,
    email: &str,
) -> Result<UserId, axum::response::Response> {
    services
        .directory()
        .find_user_by_email(email)
        .map(|u| u.user_id)
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"))
}

/// Authorize + dispatch a ledger command, then answer with the updated
/// ledger. All admin-side mutations share this shape.
fn dispatch_and_render(
    services: &AppServices,
    caller: &CallerContext,
    user_id: UserId,
    command: LedgerCommand,
    permission: &'static str,
) -> axum::response::Response {
    let cmd_auth = CmdAuth {
        inner: command,
        required: vec![Permission::new(permission)],
    };
    if let Err(e) = crate::authz::authorize_command(caller, &cmd_auth) {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    if let Err(e) = services.dispatch_ledger(user_id, cmd_auth.inner) {
        return errors::dispatch_error_to_response(e);
    }

    match services.load_ledger(user_id) {
        Ok(Some(account)) => (StatusCode::OK, Json(dto::ledger_to_json(&account))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no ledger record for the user",
        ),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "directory.users.list") {
        return resp;
    }

    let items: Vec<_> = services
        .directory()
        .list_users()
        .iter()
        .map(dto::user_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

async fn get_user_bank_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "directory.bank_details.read") {
        return resp;
    }
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if services.directory().find_user_by_id(user_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found");
    }

    match services.directory().bank_details(user_id) {
        Some(details) => {
            (StatusCode::OK, Json(dto::bank_details_to_json(&details))).into_response()
        }
        None => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no bank details for the user",
        ),
    }
}

async fn get_user_ledger(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "ledger.read") {
        return resp;
    }
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.load_ledger(user_id) {
        Ok(Some(account)) => (StatusCode::OK, Json(dto::ledger_to_json(&account))).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no ledger record for the user",
        ),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

async fn set_alloted(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::EditAmountRequest>,
) -> axum::response::Response {
    // Authorize before resolving the email: directory contents are not an
    // oracle for unauthorized callers.
    if let Err(resp) = guard_read(&caller, "ledger.edit") {
        return resp;
    }
    let user_id = match user_by_email(&services, &body.email) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::SetAlloted(SetAllotedAmt {
            user_id,
            value: body.amount,
            occurred_at: Utc::now(),
        }),
        "ledger.edit",
    )
}

async fn increment_alloted(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::IncrementAmountRequest>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "ledger.edit") {
        return resp;
    }
    let user_id = match user_by_email(&services, &body.email) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::IncrementAlloted(IncrementAllotedAmt {
            user_id,
            delta: body.delta,
            occurred_at: Utc::now(),
        }),
        "ledger.edit",
    )
}

async fn set_locked(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::EditAmountRequest>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "ledger.edit") {
        return resp;
    }
    let user_id = match user_by_email(&services, &body.email) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::SetLocked(SetLockedAmt {
            user_id,
            value: body.amount,
            occurred_at: Utc::now(),
        }),
        "ledger.edit",
    )
}

async fn increment_locked(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::IncrementAmountRequest>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "ledger.edit") {
        return resp;
    }
    let user_id = match user_by_email(&services, &body.email) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::IncrementLocked(IncrementLockedAmt {
            user_id,
            delta: body.delta,
            occurred_at: Utc::now(),
        }),
        "ledger.edit",
    )
}

async fn block_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::Block(BlockAccount { user_id, occurred_at: Utc::now() }),
        "directory.users.block",
    )
}

async fn unblock_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::Unblock(UnblockAccount { user_id, occurred_at: Utc::now() }),
        "directory.users.block",
    )
}

async fn settle_withdrawal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    dispatch_and_render(
        &services,
        &caller,
        user_id,
        LedgerCommand::SettleWithdrawal(SettleWithdrawal { user_id, occurred_at: Utc::now() }),
        "ledger.settle",
    )
}

async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard_read(&caller, "directory.users.delete") {
        return resp;
    }
    let user_id = match parse_user_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if let Err(e) = services.delete_user(user_id) {
        return errors::directory_error_to_response(e);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "user and all associated records deleted" })),
    )
        .into_response()
}
