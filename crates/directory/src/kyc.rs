use serde::{Deserialize, Serialize};

use peerfund_core::UserId;

use crate::validation::{FieldError, FieldErrors};

/// KYC record for a user (at most one per user, upserted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub user_id: UserId,
    pub acc_holder_name: String,
    pub mobile_no: String,
    pub pan: String,
    pub aadhar: String,
}

impl KycRecord {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = FieldErrors::new();
        errors.require_min_len("accHolderName", &self.acc_holder_name, 3, "Enter a valid name");
        errors.require_digits("mobileNo", &self.mobile_no, 10, "Enter a valid mobile number");
        errors.require_min_len("pan", &self.pan, 10, "Enter a valid PAN");
        errors.require_digits("aadhar", &self.aadhar, 12, "Enter a valid Aadhar number");
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_record_validates() {
        let record = KycRecord {
            user_id: UserId::new(),
            acc_holder_name: "Asha Rao".to_string(),
            mobile_no: "9876543210".to_string(),
            pan: "ABCDE1234F".to_string(),
            aadhar: "123412341234".to_string(),
        };
        assert!(record.validate().is_ok());
    }

    #[test]
    fn bad_mobile_and_aadhar_are_both_reported() {
        let record = KycRecord {
            user_id: UserId::new(),
            acc_holder_name: "Asha Rao".to_string(),
            mobile_no: "98".to_string(),
            pan: "ABCDE1234F".to_string(),
            aadhar: "12x".to_string(),
        };
        let errors = record.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["mobileNo", "aadhar"]);
    }
}
