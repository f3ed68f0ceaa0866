use serde::{Deserialize, Serialize};

use crate::validation::{FieldError, FieldErrors};

/// A payout beneficiary.
///
/// Each user owns an ordered list of these; `account_no` and `ifsc` are
/// unique across the whole directory (storage-enforced).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
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

impl Beneficiary {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_min_len("beneficiaryName", &self.beneficiary_name, 3, "Enter a valid name");
        errors.require_digits("mobileNo", &self.mobile_no, 10, "Enter a valid mobile number");
        errors.require_min_len("accountNo", &self.account_no, 10, "Enter a valid acc no.");
        errors.require_min_len("address", &self.address, 3, "Enter a valid address");
        errors.require_min_len("state", &self.state, 2, "Enter a valid state");
        errors.require_digits("zip", &self.zip, 6, "Enter a valid ZIP code");
        errors.require_min_len("bankName", &self.bank_name, 2, "Enter a valid name");
        errors.require_min_len("branchName", &self.branch_name, 2, "Enter a valid branch");
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

#[cfg(test)]
mod tests {
    use super::*;

    fn beneficiary() -> Beneficiary {
        Beneficiary {
            beneficiary_name: "Ravi Kumar".to_string(),
            mobile_no: "9876543210".to_string(),
            account_no: "9912345678".to_string(),
            address: "12 MG Road".to_string(),
            state: "Karnataka".to_string(),
            zip: "560001".to_string(),
            bank_name: "HDFC".to_string(),
            branch_name: "Indiranagar".to_string(),
            ifsc: "HDFC0000123".to_string(),
            account_type: "Savings account".to_string(),
        }
    }

    #[test]
    fn complete_beneficiary_validates() {
        assert!(beneficiary().validate().is_ok());
    }

    #[test]
    fn bad_zip_is_rejected() {
        let mut b = beneficiary();
        b.zip = "56001".to_string();
        let errors = b.validate().unwrap_err();
        assert_eq!(errors[0].field, "zip");
    }
}
