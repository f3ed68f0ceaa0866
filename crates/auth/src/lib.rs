//! `peerfund-auth` — authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to mint/verify tokens, hash passwords, and answer policy questions, but
//! not where requests come from or where records live.

pub mod claims;
pub mod password;
pub mod principal;
pub mod rbac;
pub mod reset;
pub mod token;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{PasswordHashError, hash_password, verify_password};
pub use principal::PrincipalId;
pub use rbac::{AuthzError, CommandAuthorization, Permission, Principal, Role, authorize};
pub use reset::generate_reset_token;
pub use token::{Hs256Jwt, JwtValidator};
