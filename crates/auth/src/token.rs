//! HS256 token signing/verification on top of the claims model.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Token verification boundary used by the HTTP middleware.
pub trait JwtValidator: Send + Sync {
    /// Verify the token signature and validate its claims against `now`.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 token signer/verifier.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Sign a claims set into a compact token.
    pub fn sign(&self, claims: &JwtClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Time-window checks are done deterministically by `validate_claims`;
        // jsonwebtoken only verifies the signature here. The claims carry
        // RFC 3339 timestamps rather than the registered `exp`/`nbf` fields.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = Default::default();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrincipalId, Role};
    use chrono::Duration;

    fn fresh_claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: PrincipalId::new(),
            roles: vec![Role::new("user")],
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn sign_then_validate_round_trips_claims() {
        let jwt = Hs256Jwt::new("test-secret");
        let claims = fresh_claims();

        let token = jwt.sign(&claims).unwrap();
        let decoded = jwt.validate(&token, Utc::now()).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signer = Hs256Jwt::new("secret-a");
        let verifier = Hs256Jwt::new("secret-b");

        let token = signer.sign(&fresh_claims()).unwrap();
        let err = verifier.validate(&token, Utc::now()).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_rejected_after_decode() {
        let jwt = Hs256Jwt::new("test-secret");
        let mut claims = fresh_claims();
        claims.issued_at = Utc::now() - Duration::hours(2);
        claims.expires_at = Utc::now() - Duration::hours(1);

        let token = jwt.sign(&claims).unwrap();
        let err = jwt.validate(&token, Utc::now()).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn garbage_token_is_malformed() {
        let jwt = Hs256Jwt::new("test-secret");
        let err = jwt.validate("not-a-token", Utc::now()).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }
}
