//! `peerfund-directory` — account directory records.
//!
//! Plain keyed records owned by a user id: profile, bank details, KYC, and
//! beneficiaries. No algorithmic behavior lives here beyond field validation;
//! uniqueness and persistence are the storage layer's concern.

pub mod bank;
pub mod beneficiary;
pub mod kyc;
pub mod profile;
pub mod validation;

pub use bank::BankDetails;
pub use beneficiary::Beneficiary;
pub use kyc::KycRecord;
pub use profile::{UserProfile, validate_signup};
pub use validation::{FieldError, FieldErrors};
