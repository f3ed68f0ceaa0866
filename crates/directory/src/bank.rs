use serde::{Deserialize, Serialize};

use peerfund_core::UserId;

use crate::validation::{FieldError, FieldErrors};

/// Bank details on file for a user (at most one record per user).
///
/// `account_no` and `ifsc` are unique across the whole directory; the storage
/// layer enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub user_id: UserId,
    pub acc_holder_name: String,
    pub bank_name: String,
    pub account_no: String,
    pub ifsc: String,
    pub account_type: String,
}

impl BankDetails {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_min_len("accHolderName", &self.acc_holder_name, 3, "Enter a valid name");
        errors.require_min_len("accountNo", &self.account_no, 10, "Enter a valid acc no.");
        errors.require_min_len("bankName", &self.bank_name, 2, "Enter a valid name");
        errors.require_min_len("ifsc", &self.ifsc, 4, "IFSC invalid");
        errors.require_min_len(
            "accountType",
            &self.account_type,
            7,
            "Please select your bank account type",
        );
        errors.into_result()
    }
}
