use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use peerfund_infra::directory::DirectoryStore;
use peerfund_ledger::{LedgerCommand, MarkBankDetailsAdded, RequestWithdrawal};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/bank-details", put(put_bank_details))
        .route("/kyc", put(put_kyc))
        .route("/beneficiaries", post(post_beneficiary).get(get_beneficiaries))
        .route("/balance", get(get_balance))
        .route("/withdrawals", post(post_withdrawal))
}

async fn put_bank_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::BankDetailsRequest>,
) -> axum::response::Response {
    let details = body.into_record(caller.user_id());
    if let Err(fields) = details.validate() {
        return errors::validation_errors_to_response(fields);
    }

    if let Err(e) = services.directory().upsert_bank_details(details) {
        return errors::directory_error_to_response(e);
    }

    // Record the flag on the ledger: it gates withdrawal requests.
    if let Err(e) = services.dispatch_ledger(
        caller.user_id(),
        LedgerCommand::MarkBankDetailsAdded(MarkBankDetailsAdded {
            user_id: caller.user_id(),
            occurred_at: Utc::now(),
        }),
    ) {
        return errors::dispatch_error_to_response(e);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Details added successfully" })),
    )
        .into_response()
}

async fn put_kyc(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::KycRequest>,
) -> axum::response::Response {
    let record = body.into_record(caller.user_id());
    if let Err(fields) = record.validate() {
        return errors::validation_errors_to_response(fields);
    }

    if let Err(e) = services.directory().upsert_kyc(record) {
        return errors::directory_error_to_response(e);
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "KYC added successfully" })),
    )
        .into_response()
}

async fn post_beneficiary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::BeneficiaryRequest>,
) -> axum::response::Response {
    let beneficiary: peerfund_directory::Beneficiary = body.into();
    if let Err(fields) = beneficiary.validate() {
        return errors::validation_errors_to_response(fields);
    }

    if let Err(e) = services
        .directory()
        .append_beneficiary(caller.user_id(), beneficiary.clone())
    {
        return errors::directory_error_to_response(e);
    }

    (StatusCode::CREATED, Json(dto::beneficiary_to_json(&beneficiary))).into_response()
}

async fn get_beneficiaries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    let items: Vec<_> = services
        .directory()
        .beneficiaries(caller.user_id())
        .iter()
        .map(dto::beneficiary_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

async fn get_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.load_ledger(caller.user_id()) {
        Ok(Some(account)) => {
            (StatusCode::OK, Json(dto::balance_status_to_json(&account))).into_response()
        }
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no ledger record for the user",
        ),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

async fn post_withdrawal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    body: Option<Json<dto::RequestWithdrawalRequest>>,
) -> axum::response::Response {
    let Json(body) = body.unwrap_or_default();
    let user_id = caller.user_id();

    if let Err(e) = services.dispatch_ledger(
        user_id,
        LedgerCommand::RequestWithdrawal(RequestWithdrawal {
            user_id,
            amount: body.amount,
            occurred_at: Utc::now(),
        }),
    ) {
        return errors::dispatch_error_to_response(e);
    }

    // Read the request back from the freshly appended stream.
    let pending = match services.load_ledger(user_id) {
        Ok(Some(account)) => account.pending_request().cloned(),
        Ok(None) => None,
        Err(e) => return errors::dispatch_error_to_response(e),
    };
    let Some(pending) = pending else {
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal Server Error",
        );
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "userId": user_id.to_string(),
            "amount": pending.amount,
            "status": pending.status.to_string(),
            "createdAt": pending.created_at,
        })),
    )
        .into_response()
}
