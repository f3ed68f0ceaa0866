use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use peerfund_core::UserId;
use peerfund_directory::{BankDetails, Beneficiary, KycRecord, UserProfile};

/// A pending password-reset token for a user (one at a time, consumed on use).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Another user already registered this email or username.
    #[error("Email or Username already exist")]
    DuplicateIdentity,

    /// Another record already uses this account number or IFSC code.
    #[error("account number or IFSC code already in use")]
    DuplicateBankKeys,

    #[error("{0}")]
    NotFound(String),

    #[error("directory storage unavailable")]
    Unavailable,
}

/// Keyed CRUD over the per-user directory records.
///
/// Uniqueness rules live behind this boundary: (email, username) across
/// users, and account-number/IFSC across bank details and beneficiaries.
/// `delete_user_data` removes every record owned by the user as one
/// operation; no partially-deleted user is ever observable.
pub trait DirectoryStore: Send + Sync {
    fn create_user(&self, profile: UserProfile) -> Result<(), DirectoryError>;
    fn find_user_by_id(&self, user_id: UserId) -> Option<UserProfile>;
    fn find_user_by_email(&self, email: &str) -> Option<UserProfile>;
    fn list_users(&self) -> Vec<UserProfile>;
    fn update_password(&self, user_id: UserId, password_hash: String)
    -> Result<(), DirectoryError>;

    fn upsert_bank_details(&self, details: BankDetails) -> Result<(), DirectoryError>;
    fn bank_details(&self, user_id: UserId) -> Option<BankDetails>;

    fn upsert_kyc(&self, record: KycRecord) -> Result<(), DirectoryError>;
    fn kyc(&self, user_id: UserId) -> Option<KycRecord>;

    fn append_beneficiary(
        &self,
        user_id: UserId,
        beneficiary: Beneficiary,
    ) -> Result<(), DirectoryError>;
    fn beneficiaries(&self, user_id: UserId) -> Vec<Beneficiary>;

    fn put_reset_token(&self, token: ResetToken) -> Result<(), DirectoryError>;
    /// Verify and consume the reset token; true only when it matched.
    fn take_reset_token(&self, user_id: UserId, token: &str) -> bool;

    /// Cascade-delete every record owned by the user.
    fn delete_user_data(&self, user_id: UserId) -> Result<(), DirectoryError>;
}

impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    fn create_user(&self, profile: UserProfile) -> Result<(), DirectoryError> {
        (**self).create_user(profile)
    }

    fn find_user_by_id(&self, user_id: UserId) -> Option<UserProfile> {
        (**self).find_user_by_id(user_id)
    }

    fn find_user_by_email(&self, email: &str) -> Option<UserProfile> {
        (**self).find_user_by_email(email)
    }

    fn list_users(&self) -> Vec<UserProfile> {
        (**self).list_users()
    }

    fn update_password(
        &self,
        user_id: UserId,
        password_hash: String,
    ) -> Result<(), DirectoryError> {
        (**self).update_password(user_id, password_hash)
    }

    fn upsert_bank_details(&self, details: BankDetails) -> Result<(), DirectoryError> {
        (**self).upsert_bank_details(details)
    }

    fn bank_details(&self, user_id: UserId) -> Option<BankDetails> {
        (**self).bank_details(user_id)
    }

    fn upsert_kyc(&self, record: KycRecord) -> Result<(), DirectoryError> {
        (**self).upsert_kyc(record)
    }

    fn kyc(&self, user_id: UserId) -> Option<KycRecord> {
        (**self).kyc(user_id)
    }

    fn append_beneficiary(
        &self,
        user_id: UserId,
        beneficiary: Beneficiary,
    ) -> Result<(), DirectoryError> {
        (**self).append_beneficiary(user_id, beneficiary)
    }

    fn beneficiaries(&self, user_id: UserId) -> Vec<Beneficiary> {
        (**self).beneficiaries(user_id)
    }

    fn put_reset_token(&self, token: ResetToken) -> Result<(), DirectoryError> {
        (**self).put_reset_token(token)
    }

    fn take_reset_token(&self, user_id: UserId, token: &str) -> bool {
        (**self).take_reset_token(user_id, token)
    }

    fn delete_user_data(&self, user_id: UserId) -> Result<(), DirectoryError> {
        (**self).delete_user_data(user_id)
    }
}
