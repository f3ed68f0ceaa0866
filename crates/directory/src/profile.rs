use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use peerfund_core::UserId;

use crate::validation::{FieldError, FieldErrors};

/// A registered platform user.
///
/// `password_hash` is the PHC-format output of the auth crate's hasher; the
/// plaintext never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            email: email.into().trim().to_lowercase(),
            password_hash: password_hash.into(),
            created_at,
        }
    }
}

/// Validate raw sign-up input before any hashing or storage happens.
pub fn validate_signup(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), Vec<FieldError>> {
    let mut errors = FieldErrors::new();
    errors.require_email("email", email, "Enter a valid email");
    errors.require_min_len("username", username, 5, "Enter a valid username");
    errors.require_min_len("password", password, 5, "Enter a valid password");
    errors.into_result()
}
