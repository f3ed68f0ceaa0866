use serde::Deserialize;

use peerfund_core::UserId;
use peerfund_directory::{BankDetails, Beneficiary, KycRecord, UserProfile};
use peerfund_ledger::LedgerAccount;

// -------------------------
// Request DTOs
// -------------------------
//
// Wire casing is camelCase throughout: the JSON contract predates this
// implementation (`allotedAmt`, `availToWithdraw`, ...).

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetailsRequest {
    pub acc_holder_name: String,
    pub bank_name: String,
    pub account_no: String,
    pub ifsc: String,
    pub account_type: String,
}

impl BankDetailsRequest {
    pub fn into_record(self, user_id: UserId) -> BankDetails {
        BankDetails {
            user_id,
            acc_holder_name: self.acc_holder_name,
            bank_name: self.bank_name,
            account_no: self.account_no,
            ifsc: self.ifsc,
            account_type: self.account_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequest {
    pub acc_holder_name: String,
    pub mobile_no: String,
    pub pan: String,
    pub aadhar: String,
}

impl KycRequest {
    pub fn into_record(self, user_id: UserId) -> KycRecord {
        KycRecord {
            user_id,
            acc_holder_name: self.acc_holder_name,
            mobile_no: self.mobile_no,
            pan: self.pan,
            aadhar: self.aadhar,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryRequest {
    pub beneficiary_name: String,
    pub mobile_no: String,
    pub account_no: String,
    pub address: String,
    pub state: String,
    pub zip: String,
    pub bank_name: String,
    pub branch_name: String,
    pub ifsc: String,
    pub account_type: String,
}

impl From<BeneficiaryRequest> for Beneficiary {
    fn from(value: BeneficiaryRequest) -> Self {
        Beneficiary {
            beneficiary_name: value.beneficiary_name,
            mobile_no: value.mobile_no,
            account_no: value.account_no,
            address: value.address,
            state: value.state,
            zip: value.zip,
            bank_name: value.bank_name,
            branch_name: value.branch_name,
            ifsc: value.ifsc,
            account_type: value.account_type,
        }
    }
}

/// `amount` omitted requests the full available balance.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithdrawalRequest {
    pub amount: Option<i64>,
}

/// Admin balance edit, targeting a user by email (overwrite semantics).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAmountRequest {
    pub email: String,
    pub amount: i64,
}

/// Admin balance edit, targeting a user by email (additive semantics).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementAmountRequest {
    pub email: String,
    pub delta: i64,
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_to_json(profile: &UserProfile) -> serde_json::Value {
    serde_json::json!({
        "userId": profile.user_id.to_string(),
        "username": profile.username,
        "email": profile.email,
        "createdAt": profile.created_at,
    })
}

pub fn bank_details_to_json(details: &BankDetails) -> serde_json::Value {
    serde_json::json!({
        "userId": details.user_id.to_string(),
        "accHolderName": details.acc_holder_name,
        "bankName": details.bank_name,
        "accountNo": details.account_no,
        "ifsc": details.ifsc,
        "accountType": details.account_type,
    })
}

pub fn kyc_to_json(record: &KycRecord) -> serde_json::Value {
    serde_json::json!({
        "userId": record.user_id.to_string(),
        "accHolderName": record.acc_holder_name,
        "mobileNo": record.mobile_no,
        "pan": record.pan,
        "aadhar": record.aadhar,
    })
}

pub fn beneficiary_to_json(beneficiary: &Beneficiary) -> serde_json::Value {
    serde_json::json!({
        "beneficiaryName": beneficiary.beneficiary_name,
        "mobileNo": beneficiary.mobile_no,
        "accountNo": beneficiary.account_no,
        "address": beneficiary.address,
        "state": beneficiary.state,
        "zip": beneficiary.zip,
        "bankName": beneficiary.bank_name,
        "branchName": beneficiary.branch_name,
        "ifsc": beneficiary.ifsc,
        "accountType": beneficiary.account_type,
    })
}

/// The user-facing balance summary.
pub fn balance_status_to_json(account: &LedgerAccount) -> serde_json::Value {
    serde_json::json!({
        "allotedAmt": account.alloted_amt(),
        "lockedAmt": account.locked_amt(),
        "availToWithdraw": account.avail_to_withdraw(),
        "disbursedAmt": account.disbursed_amt(),
    })
}

/// The full ledger view (admin-side), including the transaction history and
/// any pending withdrawal request.
pub fn ledger_to_json(account: &LedgerAccount) -> serde_json::Value {
    let transactions: Vec<_> = account
        .transactions()
        .iter()
        .map(|t| {
            serde_json::json!({
                "createdAt": t.created_at,
                "amount": t.amount,
                "status": t.status.to_string(),
            })
        })
        .collect();

    let pending = account.pending_request().map(|p| {
        serde_json::json!({
            "amount": p.amount,
            "status": p.status.to_string(),
            "createdAt": p.created_at,
        })
    });

    serde_json::json!({
        "userId": account.user_id().to_string(),
        "allotedAmt": account.alloted_amt(),
        "lockedAmt": account.locked_amt(),
        "disbursedAmt": account.disbursed_amt(),
        "availToWithdraw": account.avail_to_withdraw(),
        "isBlocked": account.is_blocked(),
        "transactions": transactions,
        "pendingRequest": pending,
    })
}
